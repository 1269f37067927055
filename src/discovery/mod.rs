//! Finding the feeds behind an arbitrary URL.
//!
//! A page served as `text/html` is scanned for `<link rel="alternate">`
//! announcements and every announced feed is fetched once to confirm its
//! dialect. Anything else is taken to be a feed itself and sniffed.

pub mod links;
pub mod sniff;

pub use links::scan_links;
pub use sniff::{sniff, sniff_reader};

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::Result;
use crate::domain::{FeedType, FoundFeed};
use crate::fetcher::Fetcher;

#[derive(Clone)]
pub struct Discoverer {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
}

impl Discoverer {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>) -> Self {
        Self { fetcher }
    }

    /// Candidate feeds for `url`. An empty list means nothing usable was
    /// found; only an invalid URL or a failed first fetch is an error.
    pub async fn discover(&self, url: &str) -> Result<Vec<FoundFeed>> {
        let base = Url::parse(url)?;
        let document = self.fetcher.fetch(base.as_str()).await?;

        if !document.is_html() {
            let feed_type = sniff(&document.body);
            debug!("{} is not HTML, sniffed as {}", url, feed_type);
            return Ok(vec![FoundFeed::new(url, url, feed_type)]);
        }

        let page = String::from_utf8_lossy(&document.body);
        let candidates = scan_links(&page, &base);

        if candidates.is_empty() {
            // servers sometimes label feed documents text/html
            let feed_type = sniff(&document.body);
            if feed_type.is_known() {
                info!("{} is served as HTML but reads as {}", url, feed_type);
                return Ok(vec![FoundFeed::new(url, url, feed_type)]);
            }
            info!("No feeds found at {}", url);
            return Ok(Vec::new());
        }

        debug!("{} announces {} feed(s)", url, candidates.len());
        Ok(self.confirm(candidates).await)
    }

    /// Fetch every candidate and replace its announced type with the
    /// sniffed one. Candidates that cannot be fetched stay in the list
    /// with an unknown type.
    async fn confirm(&self, candidates: Vec<FoundFeed>) -> Vec<FoundFeed> {
        let checks = candidates.into_iter().map(|mut candidate| async move {
            candidate.feed_type = match self.fetcher.fetch(&candidate.url).await {
                Ok(document) => sniff(&document.body),
                Err(e) => {
                    warn!("Could not fetch candidate {}: {}", candidate.url, e);
                    FeedType::Unknown
                }
            };
            candidate
        });

        join_all(checks).await
    }
}

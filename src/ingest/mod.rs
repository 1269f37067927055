//! Article ingestion: fetch a feed, map its entries, store them.
//!
//! A failed feed never stops anything else. Errors come back from
//! [`Ingestor::refresh_feed`] for callers that want them, and are logged
//! and dropped by the aggregate entry points.

pub mod pool;
pub mod tracker;

pub use pool::RefreshPool;
pub use tracker::{FetchGuard, FetchStateTracker, ALL_FEEDS};

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::app::{NoveltyError, Result};
use crate::domain::Feed;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::{RetentionPolicy, Store};

pub struct Ingestor {
    store: Arc<dyn Store + Send + Sync>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    retention: RetentionPolicy,
    tracker: FetchStateTracker,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        retention: RetentionPolicy,
        tracker: FetchStateTracker,
    ) -> Self {
        Self {
            store,
            fetcher,
            normalizer: Normalizer::new(),
            retention,
            tracker,
        }
    }

    pub fn tracker(&self) -> &FetchStateTracker {
        &self.tracker
    }

    /// Fetch, normalize and store one feed. Returns the number of new
    /// articles. A feed of unknown type keeps the type it was read as.
    pub async fn ingest(&self, feed: &Feed) -> Result<usize> {
        let document = self.fetcher.fetch(&feed.url).await?;
        let now = Utc::now();

        let normalized =
            self.normalizer
                .normalize(feed.id, feed.feed_type, &document.body, now)?;

        if normalized.feed_type != feed.feed_type {
            info!("Feed {} detected as {}", feed.url, normalized.feed_type);
            self.store.update_feed_type(feed.id, normalized.feed_type)?;
        }

        let inserted =
            self.store
                .insert_articles(feed.id, &normalized.articles, &self.retention, now)?;

        info!("Added {} new articles from {}", inserted, feed.url);
        Ok(inserted)
    }

    /// Ingest `feed` with its fetching flag raised. `Ok(None)` means a
    /// refresh of the same feed was already running and nothing was done.
    pub async fn refresh_feed(&self, feed: &Feed) -> Result<Option<usize>> {
        let Some(_guard) = self.tracker.begin(feed.id) else {
            debug!("Feed {} is already refreshing", feed.url);
            return Ok(None);
        };

        self.ingest(feed).await.map(Some)
    }

    /// Refresh every starred feed one after the other, under the
    /// [`ALL_FEEDS`] flag. Returns the number of new articles.
    pub async fn refresh_my_feeds(&self) -> usize {
        let Some(_guard) = self.tracker.begin(ALL_FEEDS) else {
            debug!("My feeds are already refreshing");
            return 0;
        };

        let feeds = match self.store.get_my_feeds() {
            Ok(feeds) => feeds,
            Err(e) => {
                warn!("Could not load my feeds: {}", e);
                return 0;
            }
        };

        let mut total = 0;
        for feed in &feeds {
            match self.refresh_feed(feed).await {
                Ok(count) => total += count.unwrap_or(0),
                Err(e) => warn!("Failed to refresh {}: {}", feed.url, e),
            }
        }

        info!("Refreshed {} feeds, {} new articles", feeds.len(), total);
        total
    }

    /// [`ALL_FEEDS`] refreshes my feeds, any other id that one feed.
    /// Failures are logged, never returned.
    pub async fn refresh(&self, feed_id: i64) -> usize {
        if feed_id == ALL_FEEDS {
            return self.refresh_my_feeds().await;
        }

        let result = match self.store.get_feed(feed_id) {
            Ok(Some(feed)) => self.refresh_feed(&feed).await,
            Ok(None) => Err(NoveltyError::FeedNotFound(feed_id)),
            Err(e) => Err(e),
        };

        match result {
            Ok(count) => count.unwrap_or(0),
            Err(e) => {
                warn!("Failed to refresh feed {}: {}", feed_id, e);
                0
            }
        }
    }
}

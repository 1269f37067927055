pub mod http_fetcher;

pub use http_fetcher::HttpFetcher;

use async_trait::async_trait;

use crate::app::Result;

/// A successfully fetched resource.
#[derive(Debug, Clone, Default)]
pub struct FetchedDocument {
    /// Raw `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedDocument {
    pub fn new(content_type: Option<String>, body: Vec<u8>) -> Self {
        Self { content_type, body }
    }

    /// `text/html`, ignoring parameters such as `charset` and letter case.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
            .unwrap_or(false)
    }
}

#[async_trait]
pub trait Fetcher {
    /// GET `url`. Non-2xx responses are errors.
    async fn fetch(&self, url: &str) -> Result<FetchedDocument>;
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_CHARSET, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

use crate::app::{NoveltyError, Result};
use crate::config::FetchConfig;
use crate::fetcher::{FetchedDocument, Fetcher};

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8,*"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| NoveltyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        debug!("--> GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if let Err(e) = response.error_for_status_ref() {
            debug!("<-- {} {}", status, url);
            return Err(e.into());
        }

        let body = response.bytes().await?.to_vec();

        debug!(
            "<-- {} {} ({}, {} bytes)",
            status,
            url,
            content_type.as_deref().unwrap_or("no content type"),
            body.len()
        );

        Ok(FetchedDocument::new(content_type, body))
    }
}

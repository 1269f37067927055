use serde::{Deserialize, Serialize};

use super::stable_id;

/// Syndication dialect of a feed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    #[default]
    Unknown,
    Rss,
    Atom,
}

impl FeedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::Unknown => "unknown",
            FeedType::Rss => "rss",
            FeedType::Atom => "atom",
        }
    }

    /// Unrecognised values map to [`FeedType::Unknown`] so a stale row never
    /// blocks a refresh; detection simply runs again.
    pub fn parse(value: &str) -> Self {
        match value {
            "rss" => FeedType::Rss,
            "atom" => FeedType::Atom,
            _ => FeedType::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FeedType::Unknown)
    }
}

impl std::fmt::Display for FeedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub feed_type: FeedType,
    pub page: i64,
    pub is_starred: bool,
}

impl Feed {
    pub fn new(title: String, url: String, feed_type: FeedType, page: i64) -> Self {
        Self {
            id: Self::generate_id(&url),
            title,
            url,
            feed_type,
            page,
            is_starred: true,
        }
    }

    /// Feed identity is derived from the URL: a different URL is a different feed.
    pub fn generate_id(url: &str) -> i64 {
        stable_id(&[url.as_bytes()])
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

/// A candidate feed produced by discovery, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundFeed {
    pub title: String,
    pub url: String,
    pub feed_type: FeedType,
}

impl FoundFeed {
    pub fn new(title: impl Into<String>, url: impl Into<String>, feed_type: FeedType) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            feed_type,
        }
    }

    pub fn into_feed(self, page: i64) -> Feed {
        Feed::new(self.title, self.url, self.feed_type, page)
    }
}

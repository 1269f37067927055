use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stable_id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub title: String,
    /// Cleaned body, limited HTML with `<br>` as the only line break.
    pub text: String,
    pub author: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub upd_date: Option<DateTime<Utc>>,
    pub link: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl Article {
    pub fn new(feed_id: i64, source_key: &str, saved_at: DateTime<Utc>) -> Self {
        Self {
            id: Self::generate_id(feed_id, source_key),
            feed_id,
            title: String::new(),
            text: String::new(),
            author: None,
            pub_date: saved_at,
            upd_date: None,
            link: None,
            saved_at,
        }
    }

    /// Generate a deterministic ID from the entry key (guid, link or title)
    /// and the owning feed, so the same guid in two feeds never collides.
    pub fn generate_id(feed_id: i64, source_key: &str) -> i64 {
        stable_id(&[source_key.as_bytes(), &feed_id.to_be_bytes()])
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// An article joined with its feed title and local state, as read back from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub feed_title: String,
    pub is_read: bool,
    pub is_starred: bool,
}

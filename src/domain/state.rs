use serde::{Deserialize, Serialize};

/// Local per-article flags, stored apart from the article body so that
/// re-ingesting the same identity never resets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleState {
    pub article_id: i64,
    pub feed_id: i64,
    pub is_read: bool,
    pub is_starred: bool,
}

impl ArticleState {
    pub fn new(article_id: i64, feed_id: i64) -> Self {
        Self {
            article_id,
            feed_id,
            is_read: false,
            is_starred: false,
        }
    }
}

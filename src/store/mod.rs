pub mod sqlite;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;

use crate::app::Result;
use crate::config::RetentionConfig;
use crate::domain::{Article, ArticleState, ArticleView, Feed, FeedType};

pub use sqlite::SqliteStore;

/// Emitted after every committed write so readers can re-run their queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    FeedsChanged,
    ArticlesChanged { feed_id: i64 },
}

/// Pruning rules applied in the same transaction as every article insert.
/// Starred articles are exempt from both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Duration,
    pub max_articles_per_feed: usize,
}

impl RetentionPolicy {
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.max_age
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from(&RetentionConfig::default())
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            max_age: Duration::days(config.max_age_days),
            max_articles_per_feed: config.max_articles_per_feed,
        }
    }
}

pub trait Store {
    // Feed operations

    /// Insert unless a feed with the same id exists. The feed is placed
    /// after every existing one; returns whether a row was written.
    fn add_feed(&self, feed: &Feed) -> Result<bool>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    /// All feeds by display position.
    fn get_all_feeds(&self) -> Result<Vec<Feed>>;
    /// Starred feeds by display position.
    fn get_my_feeds(&self) -> Result<Vec<Feed>>;
    /// Rename, and when `url` differs, replace the feed with a new identity
    /// at the same position. Articles of the old identity are dropped.
    fn update_feed(&self, id: i64, title: &str, url: &str) -> Result<Feed>;
    fn update_feed_type(&self, id: i64, feed_type: FeedType) -> Result<()>;
    fn set_feed_starred(&self, id: i64, is_starred: bool) -> Result<()>;
    fn swap_feed_pages(&self, a: i64, b: i64) -> Result<()>;
    /// Delete with articles and state, then close the gap in positions.
    fn delete_feed(&self, id: i64) -> Result<()>;

    // Article operations

    /// Insert-or-ignore the batch and prune, atomically. Returns the number
    /// of articles that were new.
    fn insert_articles(
        &self,
        feed_id: i64,
        articles: &[Article],
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> Result<usize>;
    fn get_article(&self, id: i64) -> Result<Option<ArticleView>>;
    /// Newest first.
    fn get_articles(&self, feed_id: i64) -> Result<Vec<ArticleView>>;
    /// Articles of starred feeds, newest first.
    fn get_my_news(&self) -> Result<Vec<ArticleView>>;
    fn get_starred_articles(&self) -> Result<Vec<ArticleView>>;

    // State operations
    fn get_article_state(&self, article_id: i64) -> Result<Option<ArticleState>>;
    fn set_read(&self, article_id: i64, is_read: bool) -> Result<()>;
    fn set_starred(&self, article_id: i64, is_starred: bool) -> Result<()>;
    fn get_unread_count(&self, feed_id: i64) -> Result<i64>;

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

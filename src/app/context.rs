use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use crate::app::error::{NoveltyError, Result};
use crate::config::Config;
use crate::discovery::Discoverer;
use crate::domain::FoundFeed;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::ingest::{FetchStateTracker, Ingestor, RefreshPool};
use crate::store::sqlite::SqliteStore;
use crate::store::RetentionPolicy;

/// Discovery results: `None` while searching or after a reset,
/// `Some(vec![])` when nothing was found.
pub type FoundFeeds = Option<Vec<FoundFeed>>;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub discoverer: Discoverer,
    pub ingestor: Arc<Ingestor>,
    pub pool: RefreshPool,
    pub tracker: FetchStateTracker,
    feeds_found: watch::Sender<FoundFeeds>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.database.path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.fetch)?);
        Ok(Self::with_parts(config, store, fetcher))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.fetch)?);
        Ok(Self::with_parts(config, store, fetcher))
    }

    /// Wire everything around an existing store and fetcher.
    pub fn with_parts(
        config: Config,
        store: Arc<SqliteStore>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
    ) -> Self {
        let tracker = FetchStateTracker::new();
        let ingestor = Arc::new(Ingestor::new(
            store.clone(),
            fetcher.clone(),
            RetentionPolicy::from(&config.retention),
            tracker.clone(),
        ));
        let pool = RefreshPool::with_workers(ingestor.clone(), config.fetch.workers);
        let discoverer = Discoverer::new(fetcher.clone());
        let (feeds_found, _) = watch::channel(None);

        Self {
            config,
            store,
            fetcher,
            discoverer,
            ingestor,
            pool,
            tracker,
            feeds_found,
        }
    }

    /// Run discovery for `url` and publish the outcome. Failures publish an
    /// empty list after being logged.
    pub async fn find_feeds(&self, url: &str) -> Vec<FoundFeed> {
        self.feeds_found.send_replace(None);

        let found = match self.discoverer.discover(url).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Feed discovery for {} failed: {}", url, e);
                Vec::new()
            }
        };

        self.feeds_found.send_replace(Some(found.clone()));
        found
    }

    pub fn clear_found_feeds(&self) {
        self.feeds_found.send_replace(None);
    }

    pub fn subscribe_found_feeds(&self) -> watch::Receiver<FoundFeeds> {
        self.feeds_found.subscribe()
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| NoveltyError::Config("Could not find data directory".into()))?;
        let novelty_dir = data_dir.join("novelty");
        std::fs::create_dir_all(&novelty_dir)?;
        Ok(novelty_dir.join("novelty.db"))
    }
}

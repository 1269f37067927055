use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::app::{NoveltyError, Result};
use crate::domain::Feed;
use crate::ingest::Ingestor;

pub const DEFAULT_WORKERS: usize = 4;

/// Fixed number of concurrent refreshes. Each submitted refresh is its own
/// task and runs to completion.
#[derive(Clone)]
pub struct RefreshPool {
    ingestor: Arc<Ingestor>,
    semaphore: Arc<Semaphore>,
}

impl RefreshPool {
    pub fn new(ingestor: Arc<Ingestor>) -> Self {
        Self::with_workers(ingestor, DEFAULT_WORKERS)
    }

    pub fn with_workers(ingestor: Arc<Ingestor>, workers: usize) -> Self {
        Self {
            ingestor,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Queue [`Ingestor::refresh`] for `feed_id`. The handle may be dropped.
    pub fn submit(&self, feed_id: i64) -> JoinHandle<usize> {
        let ingestor = self.ingestor.clone();
        let semaphore = self.semaphore.clone();

        tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                error!("Refresh pool closed, dropping refresh of {}", feed_id);
                return 0;
            };
            ingestor.refresh(feed_id).await
        })
    }

    /// Refresh `feeds` concurrently and wait for all of them.
    pub async fn refresh_all(&self, feeds: Vec<Feed>) -> Vec<(i64, Result<Option<usize>>)> {
        let mut handles = Vec::new();

        for feed in feeds {
            let ingestor = self.ingestor.clone();
            let semaphore = self.semaphore.clone();

            let handle = tokio::spawn(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => ingestor.refresh_feed(&feed).await,
                    Err(e) => Err(NoveltyError::Other(e.to_string())),
                };
                if let Err(e) = &result {
                    warn!("Failed to refresh {}: {}", feed.url, e);
                }
                (feed.id, result)
            });

            handles.push(handle);
        }

        let mut results = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("Task join error: {}", e);
                }
            }
        }

        results
    }
}

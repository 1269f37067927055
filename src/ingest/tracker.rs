use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

/// Tracker key for the aggregate "my feeds" refresh.
pub const ALL_FEEDS: i64 = 0;

/// Observable "refreshing" flag per feed id. Nothing is persisted: every
/// flag starts out false.
#[derive(Clone, Default)]
pub struct FetchStateTracker {
    flags: Arc<Mutex<HashMap<i64, watch::Sender<bool>>>>,
}

impl FetchStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, feed_id: i64) -> watch::Receiver<bool> {
        self.lock()
            .entry(feed_id)
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    pub fn is_fetching(&self, feed_id: i64) -> bool {
        self.lock()
            .get(&feed_id)
            .map(|flag| *flag.borrow())
            .unwrap_or(false)
    }

    /// Raise the flag for `feed_id`. Returns `None` while a refresh of the
    /// same id is already running; the flag drops back to false when the
    /// returned guard goes out of scope, however the refresh ends.
    pub fn begin(&self, feed_id: i64) -> Option<FetchGuard> {
        let mut flags = self.lock();
        let flag = flags
            .entry(feed_id)
            .or_insert_with(|| watch::channel(false).0);

        if *flag.borrow() {
            return None;
        }
        flag.send_replace(true);

        Some(FetchGuard {
            tracker: self.clone(),
            feed_id,
        })
    }

    fn finish(&self, feed_id: i64) {
        if let Some(flag) = self.lock().get(&feed_id) {
            flag.send_replace(false);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, watch::Sender<bool>>> {
        // the map stays consistent even if a holder panicked
        self.flags.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[must_use = "the fetching flag is cleared as soon as the guard is dropped"]
pub struct FetchGuard {
    tracker: FetchStateTracker,
    feed_id: i64,
}

impl FetchGuard {
    pub fn feed_id(&self) -> i64 {
        self.feed_id
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        self.tracker.finish(self.feed_id);
    }
}

use ahash::AHashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::bucket::{BucketParams, TokenBucket};

struct ClientEntry {
    limiter: Arc<TokenBucket>,
    last_seen: Instant,
}

/// Per-client token buckets keyed by client identity.
///
/// All reads and writes of the map go through one exclusive lock. The lock
/// covers the whole lookup-or-insert sequence, so two first requests from the
/// same client can never create two buckets (which would double its burst).
/// Token consumption happens on the returned bucket after the lock is released.
pub struct ClientLimiterTable {
    params: BucketParams,
    clients: Mutex<AHashMap<String, ClientEntry>>,
}

impl ClientLimiterTable {
    pub fn new(params: BucketParams) -> Self {
        Self {
            params,
            clients: Mutex::new(AHashMap::new()),
        }
    }

    /// Return the bucket for `identity`, creating it if needed, and mark the
    /// client as seen now.
    pub fn get_or_create(&self, identity: &str) -> Arc<TokenBucket> {
        self.get_or_create_at(identity, Instant::now())
    }

    pub fn get_or_create_at(&self, identity: &str, now: Instant) -> Arc<TokenBucket> {
        let mut clients = self.lock();
        match clients.get_mut(identity) {
            Some(entry) => {
                entry.last_seen = now;
                Arc::clone(&entry.limiter)
            }
            None => {
                let limiter = Arc::new(TokenBucket::new_at(self.params, now));
                clients.insert(
                    identity.to_string(),
                    ClientEntry {
                        limiter: Arc::clone(&limiter),
                        last_seen: now,
                    },
                );
                limiter
            }
        }
    }

    /// Remove every client idle for longer than `threshold`.
    ///
    /// Returns the number of evicted entries.
    pub fn evict_stale(&self, threshold: Duration) -> usize {
        self.evict_stale_at(Instant::now(), threshold)
    }

    pub fn evict_stale_at(&self, now: Instant, threshold: Duration) -> usize {
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= threshold);
        before.saturating_sub(clients.len())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.lock().contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn params(&self) -> BucketParams {
        self.params
    }

    // A panic while holding the lock cannot leave an entry half-written.
    fn lock(&self) -> MutexGuard<'_, AHashMap<String, ClientEntry>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

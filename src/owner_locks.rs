use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-owner-key async mutexes.
///
/// The cart get-or-create sequence is a check-then-create on shared state,
/// so two first-touch requests for the same owner can race into duplicate
/// active carts. Holding the owner's lock for the duration of the check and
/// insert closes that window. This plays the role a `SELECT ... FOR UPDATE`
/// on the cart row would play on a database that supports it (SQLite does
/// not), and it is correct for a single-process deployment; a multi-node
/// deployment would swap this for database row locks behind the same call
/// site.
#[derive(Clone, Default)]
pub struct OwnerLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, waiting if another request holds it.
    /// The guard releases on drop.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

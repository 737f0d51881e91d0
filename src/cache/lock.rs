use std::sync::Arc;
use std::time::Duration;

use super::CacheStore;

/// Expiry for per-user write locks. A holder that never releases (crash,
/// dropped connection) frees the key after this long.
pub const WRITE_LOCK_TTL: Duration = Duration::from_secs(5);

/// Lock key for a user's product writes. One in-flight write per user.
#[must_use]
pub fn write_lock_key(user_id: i64) -> String {
    format!("write-lock:{user_id}")
}

/// Advisory mutual exclusion built on the cache store's set-if-absent.
///
/// Coarse per-key locking only: it serializes one user's writes against each
/// other, not two users' writes against the same row.
#[derive(Clone)]
pub struct LockManager {
    cache: Arc<dyn CacheStore>,
}

impl LockManager {
    #[must_use]
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self { cache }
    }

    /// Attempts to take the lock. `None` means another holder has it; callers
    /// surface that as a retryable busy signal without touching storage.
    pub fn acquire(&self, key: &str, ttl: Duration) -> Option<LockGuard> {
        let owner = uuid::Uuid::new_v4().to_string();

        if !self.cache.add(key, owner.clone(), ttl) {
            return None;
        }

        Some(LockGuard {
            cache: Arc::clone(&self.cache),
            key: key.to_string(),
            owner,
        })
    }
}

/// Held lock; released on drop, so every exit path gives it back.
pub struct LockGuard {
    cache: Arc<dyn CacheStore>,
    key: String,
    owner: String,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Only release if we still own the key. After TTL expiry a successor
        // may hold it, and their lock is not ours to remove.
        if self.cache.get(&self.key).as_deref() == Some(self.owner.as_str()) {
            self.cache.forget(&self.key);
        }
    }
}

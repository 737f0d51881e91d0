mod lock;
mod memory;

pub use lock::{LockGuard, LockManager, WRITE_LOCK_TTL, write_lock_key};
pub use memory::MemoryCache;

use std::time::Duration;

/// Key/value cache with TTL expiry.
///
/// Injected wherever cached reads or advisory locks are needed, so tests can
/// substitute their own clock-free implementations. `add` is the atomic
/// set-if-absent primitive the lock manager is built on.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String, ttl: Duration);
    /// Stores the value only if the key is absent (or expired). Returns true
    /// if this call stored the value.
    fn add(&self, key: &str, value: String, ttl: Duration) -> bool;
    /// Removes the key. Returns true if a live entry was removed.
    fn forget(&self, key: &str) -> bool;
}

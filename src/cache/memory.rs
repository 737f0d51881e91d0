use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::CacheStore;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process cache store. Expired entries are dropped lazily on access.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries();
        let now = Instant::now();

        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: String, ttl: Duration) {
        self.entries().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn add(&self, key: &str, value: String, ttl: Duration) -> bool {
        let mut entries = self.entries();
        let now = Instant::now();

        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(now) {
                return false;
            }
        }

        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        true
    }

    fn forget(&self, key: &str) -> bool {
        let mut entries = self.entries();
        let now = Instant::now();

        match entries.remove(key) {
            Some(entry) => !entry.is_expired(now),
            None => false,
        }
    }
}

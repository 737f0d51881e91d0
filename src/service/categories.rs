use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::error::Result;
use crate::store::Store;
use crate::types::Category;

pub const CATEGORY_CACHE_KEY: &str = "categories";
/// Categories are seeded once and effectively static, so the cached list can
/// live a full day. No invalidation on writes.
pub const CATEGORY_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Read path for the category list, served through the cache store.
#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn Store>,
    cache: Arc<dyn CacheStore>,
}

impl CategoryService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn CacheStore>) -> Self {
        Self { store, cache }
    }

    pub fn get_all(&self) -> Result<Vec<Category>> {
        if let Some(raw) = self.cache.get(CATEGORY_CACHE_KEY) {
            match serde_json::from_str(&raw) {
                Ok(categories) => return Ok(categories),
                Err(e) => {
                    tracing::warn!("Discarding undecodable category cache entry: {e}");
                    self.cache.forget(CATEGORY_CACHE_KEY);
                }
            }
        }

        let categories = self.store.list_categories()?;
        self.cache.put(
            CATEGORY_CACHE_KEY,
            serde_json::to_string(&categories)?,
            CATEGORY_CACHE_TTL,
        );
        Ok(categories)
    }
}

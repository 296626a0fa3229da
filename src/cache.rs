//! In-memory caching using moka
//!
//! Regions are read on every quote creation and change rarely, so they are
//! cached with a TTL and refreshed by a background warmer.

use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::CacheConfig;
use crate::quotes::models::Region;
use crate::quotes::store::QuoteStore;

/// Application cache holding region defaults
#[derive(Clone)]
pub struct AppCache {
    /// Regions (code -> Region)
    pub regions: Cache<String, Arc<Region>>,
}

impl AppCache {
    /// Create a new cache instance with configured TTLs
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            regions: Cache::builder()
                .max_capacity(500)
                .time_to_live(config.region_ttl)
                .time_to_idle(config.region_ttl / 2)
                .build(),
        }
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            regions_size: self.regions.entry_count(),
        }
    }
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub regions_size: u64,
}

/// Start background cache warmer
///
/// Warms the cache on startup and refreshes every `refresh` period.
pub async fn start_cache_warmer(cache: AppCache, store: Arc<dyn QuoteStore>, refresh: Duration) {
    let mut interval = interval(refresh);
    loop {
        // First tick fires immediately, which doubles as the initial warm-up
        interval.tick().await;
        warm_cache(&cache, store.as_ref()).await;
    }
}

/// Warm the cache with every known region
///
/// Only missing entries are filled. A present entry was written by a lookup
/// or a save and may be newer than the list read here.
pub async fn warm_cache(cache: &AppCache, store: &dyn QuoteStore) {
    info!("Starting cache warm-up...");

    match store.list_regions().await {
        Ok(regions) => {
            for region in regions {
                cache
                    .regions
                    .entry(region.code.clone())
                    .or_insert(Arc::new(region))
                    .await;
            }
        }
        Err(e) => warn!("Failed to warm region cache: {}", e),
    }

    cache.regions.run_pending_tasks().await;
    info!("Cache warm-up complete. Stats: {:?}", cache.stats());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::memory::MemoryQuoteStore;
    use rust_decimal_macros::dec;

    fn region(code: &str) -> Region {
        Region {
            code: code.to_string(),
            name: code.to_string(),
            currency_code: "USD".to_string(),
            regional_multiplier: dec!(1.1),
        }
    }

    #[tokio::test]
    async fn test_warm_cache_loads_every_region() {
        let cache = AppCache::default();
        let store = MemoryQuoteStore::with_regions([region("US-CA"), region("US-OR")]);

        warm_cache(&cache, &store).await;

        assert_eq!(cache.stats().regions_size, 2);
        assert!(cache.regions.get("US-OR").await.is_some());
    }

    #[tokio::test]
    async fn test_warm_cache_keeps_newer_cached_region() {
        let cache = AppCache::default();
        // Store still holds the old multiplier when the warmer reads it
        let store = MemoryQuoteStore::with_regions([region("US-CA")]);
        let saved = Region {
            regional_multiplier: dec!(1.4),
            ..region("US-CA")
        };
        cache
            .regions
            .insert(saved.code.clone(), Arc::new(saved))
            .await;

        warm_cache(&cache, &store).await;

        let cached = cache.regions.get("US-CA").await.unwrap();
        assert_eq!(cached.regional_multiplier, dec!(1.4));
    }
}

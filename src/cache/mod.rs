//! Cache layer
//!
//! Second-level entity cache for blogkit. Cached data is grouped into named
//! regions, one per entity plus one per cached association:
//!
//! | region             | key          | value              |
//! |--------------------|--------------|--------------------|
//! | `usersByLogin`     | login        | `User`             |
//! | `usersByEmail`     | email        | `User`             |
//! | `User`             | user id      | `User`             |
//! | `Authority`        | name         | `Authority`        |
//! | `User.authorities` | user id      | authority names    |
//! | `Blog`             | blog id      | `Blog`             |
//! | `Tag`              | tag id       | `Tag`              |
//! | `Entry`            | entry id     | `Entry`            |
//! | `Entry.tags`       | entry id     | the entry's `Tag`s |
//!
//! Every region is an in-process moka cache with the same configured
//! maximum entry count and time-to-live.
//!
//! # Usage
//!
//! ```rust,ignore
//! use blogkit::cache::{create_cache, regions, CacheLayer};
//! use blogkit::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default());
//! cache.region(regions::BLOG).set("1", &blog).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Region names
pub mod regions {
    pub const USERS_BY_LOGIN: &str = "usersByLogin";
    pub const USERS_BY_EMAIL: &str = "usersByEmail";
    pub const USER: &str = "User";
    pub const AUTHORITY: &str = "Authority";
    pub const USER_AUTHORITIES: &str = "User.authorities";
    pub const BLOG: &str = "Blog";
    pub const TAG: &str = "Tag";
    pub const ENTRY: &str = "Entry";
    pub const ENTRY_TAGS: &str = "Entry.tags";

    /// Every region created at startup
    pub const ALL: &[&str] = &[
        USERS_BY_LOGIN,
        USERS_BY_EMAIL,
        USER,
        AUTHORITY,
        USER_AUTHORITIES,
        BLOG,
        TAG,
        ENTRY,
        ENTRY_TAGS,
    ];
}

/// Cache layer trait
///
/// This trait defines the interface for cache implementations.
/// Its methods are generic, so it cannot be used as a trait object.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

/// The set of cache regions
#[derive(Debug)]
pub struct CacheManager {
    regions: HashMap<&'static str, MemoryCache>,
    /// Returned for names that were never configured; always empty
    fallback: MemoryCache,
}

impl CacheManager {
    /// Create every region in [`regions::ALL`] with the same policy
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let regions = regions::ALL
            .iter()
            .map(|name| (*name, MemoryCache::with_capacity_and_ttl(max_entries, ttl)))
            .collect();

        Self {
            regions,
            fallback: MemoryCache::with_capacity_and_ttl(0, ttl),
        }
    }

    /// Look up a region by name
    pub fn region(&self, name: &str) -> &MemoryCache {
        match self.regions.get(name) {
            Some(cache) => cache,
            None => {
                tracing::warn!("Unknown cache region '{}'", name);
                &self.fallback
            }
        }
    }

    pub fn region_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.regions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Empty every region
    pub async fn clear_all(&self) -> Result<()> {
        for cache in self.regions.values() {
            cache.clear().await?;
        }
        Ok(())
    }
}

/// Create the cache regions from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<CacheManager> {
    let ttl = Duration::from_secs(config.ttl_seconds);
    tracing::debug!(
        "Creating {} cache regions (max_entries={}, ttl={:?})",
        regions::ALL.len(),
        config.max_entries,
        ttl
    );
    Arc::new(CacheManager::new(config.max_entries, ttl))
}

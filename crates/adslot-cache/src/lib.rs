//! Versioned stale-while-revalidate cache for auction ads.
//!
//! Ads fetched for a placement are stored as a JSON envelope under
//! `ad_auction_cache[_<placement>]` in a string key/value storage (browser
//! local storage semantics). Reads classify the entry by age:
//!
//! - younger than the fresh TTL: served as a hit
//! - up to the stale TTL: served, flagged for background revalidation
//! - older: removed and reported as a miss
//!
//! # Example
//!
//! ```rust,ignore
//! use adslot_cache::{AdCache, MemoryStorage};
//!
//! let cache = AdCache::new(MemoryStorage::new(), config.cache.clone());
//! cache.set(&ads, Some("sidebar"))?;
//!
//! let lookup = cache.get(Some("sidebar"));
//! if lookup.needs_revalidation() {
//!     // refetch in the background
//! }
//! ```

mod ad_cache;
mod envelope;
mod error;
mod freshness;
mod storage;

pub use ad_cache::{cache_key, AdCache};
pub use envelope::{CacheEnvelope, CACHE_VERSION};
pub use error::CacheError;
pub use freshness::{CacheLookup, CacheStatus, Freshness};
pub use storage::{CacheStorage, FileStorage, MemoryStorage};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{AdCache, CacheError, CacheLookup, CacheStatus, CacheStorage, MemoryStorage};
}

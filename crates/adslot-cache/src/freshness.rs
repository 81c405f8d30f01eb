//! Freshness classification and lookup results.

use std::time::Duration;

use adslot_core::{AuctionAd, CacheConfig};
use serde::{Deserialize, Serialize};

/// Age bucket of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Younger than the fresh TTL.
    Fresh,
    /// Past the fresh TTL but still within the stale TTL.
    Stale,
    /// Too old to serve.
    Expired,
}

impl Freshness {
    /// Classify an entry of the given age.
    pub fn classify(age: Duration, config: &CacheConfig) -> Self {
        if age < config.fresh_ttl() {
            Self::Fresh
        } else if age <= config.stale_ttl() {
            Self::Stale
        } else {
            Self::Expired
        }
    }
}

/// Status of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Fresh cache hit.
    Hit,
    /// Stale hit (serving while revalidating).
    Stale,
    /// Nothing usable in the cache.
    Miss,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Stale => write!(f, "STALE"),
            Self::Miss => write!(f, "MISS"),
        }
    }
}

/// Result of a cache read.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    /// Cached ads; empty on a miss.
    pub ads: Vec<AuctionAd>,
    /// Lookup status.
    pub status: CacheStatus,
    /// Age of the entry, when one was found.
    pub age: Option<Duration>,
}

impl CacheLookup {
    /// Create a hit result.
    pub fn hit(ads: Vec<AuctionAd>, age: Duration) -> Self {
        Self {
            ads,
            status: CacheStatus::Hit,
            age: Some(age),
        }
    }

    /// Create a stale result.
    pub fn stale(ads: Vec<AuctionAd>, age: Duration) -> Self {
        Self {
            ads,
            status: CacheStatus::Stale,
            age: Some(age),
        }
    }

    /// Create a miss result.
    pub fn miss() -> Self {
        Self {
            ads: Vec::new(),
            status: CacheStatus::Miss,
            age: None,
        }
    }

    /// Check if the lookup returned usable ads.
    pub fn is_usable(&self) -> bool {
        self.status != CacheStatus::Miss
    }

    /// Check if the caller should refetch in the background.
    pub fn needs_revalidation(&self) -> bool {
        self.status == CacheStatus::Stale
    }
}

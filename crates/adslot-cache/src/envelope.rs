//! Persisted cache envelope.

use adslot_core::AuctionAd;
use serde::{Deserialize, Serialize};

/// Envelope schema version. Entries with any other version are discarded.
pub const CACHE_VERSION: u32 = 1;

/// What is written under a cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEnvelope {
    /// Schema version.
    pub version: u32,
    /// Write time in epoch milliseconds.
    pub timestamp: i64,
    /// Cached ads.
    pub ads: Vec<AuctionAd>,
    /// Placement the ads were fetched for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_slug: Option<String>,
}

impl CacheEnvelope {
    /// Wrap ads written at `timestamp`.
    pub fn new(ads: Vec<AuctionAd>, timestamp: i64, placement_slug: Option<String>) -> Self {
        Self {
            version: CACHE_VERSION,
            timestamp,
            ads,
            placement_slug,
        }
    }

    /// Check if the envelope was written by this schema version.
    pub fn is_current(&self) -> bool {
        self.version == CACHE_VERSION
    }
}

//! Cache-first ad auction controller for feed slots.
//!
//! `AdAuction` ties the pieces together for one placement:
//!
//! 1. `load()` serves cached ads when present, refetching stale ones in the
//!    background, and falls back to the campaign store on a miss.
//! 2. `get_next_ad()` / `get_ads_for_feed()` draw ads for consecutive slots,
//!    recording session impressions for frequency capping.
//! 3. `track_impression()` / `track_click()` bump remote counters without
//!    blocking the caller.
//!
//! Store failures never surface: the slot just stays empty.
//!
//! # Example
//!
//! ```rust,ignore
//! use adslot_engine::AdAuction;
//!
//! let auction = AdAuction::new(store, cache, &config).with_placement("feed");
//! auction.load().await;
//!
//! for result in auction.get_ads_for_feed(3, &location) {
//!     auction.track_impression(&result.ad.id);
//! }
//! ```

mod controller;

pub use controller::{AdAuction, LoadOutcome};

// Re-export the types callers handle directly.
pub use adslot_auction::{AuctionResult, ScoreBreakdown, SessionState, TargetingOutcome};
pub use adslot_cache::CacheStatus;
pub use adslot_core::{AdId, AuctionAd, UserLocation};

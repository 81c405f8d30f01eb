//! Core abstractions for the adslot auction engine.
//!
//! This crate provides the types shared by every other adslot crate:
//! - `AuctionAd` / `AdType` - A sponsored creative competing for a slot
//! - `UserLocation` - Administrative-area location used for targeting
//! - `EngineConfig` - Scoring, selection, cache and store settings
//! - `Clock` - Time source, swappable in tests

mod ad;
mod clock;
mod config;
mod error;
mod ids;

pub use ad::*;
pub use clock::*;
pub use config::*;
pub use error::CoreError;
pub use ids::AdId;

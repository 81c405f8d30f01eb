//! Slot auction for sponsored creatives.
//!
//! This crate provides:
//! - `score_ad` - Bid x priority x CTR with targeting and frequency adjustments
//! - `Auctioneer` - Forced national slots and the weighted random draw
//! - `SessionState` - Per-session impression counts used for frequency capping
//!
//! # Example
//!
//! ```ignore
//! use adslot_auction::{Auctioneer, SessionState};
//! use adslot_core::{AuctionAd, UserLocation};
//!
//! let ads = vec![
//!     AuctionAd::national("n1", 4.0),
//!     AuctionAd::local("l1", 6.0).with_voivodeship("pomorskie"),
//! ];
//! let location = UserLocation::unknown().with_voivodeship("pomorskie");
//! let mut session = SessionState::new();
//!
//! let auctioneer = Auctioneer::default();
//! if let Some(result) = auctioneer.run(&ads, &location, 1, &session, &mut rand::thread_rng()) {
//!     session.record_impression(&result.ad.id);
//! }
//! ```

mod scoring;
mod selection;
mod session;

pub use scoring::*;
pub use selection::*;
pub use session::SessionState;

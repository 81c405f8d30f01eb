//! Campaign store access for the adslot auction engine.
//!
//! This crate provides:
//! - `CampaignRow` - Campaign as stored, with its activity window
//! - `CampaignStore` - Async read/counter interface the engine talks to
//! - `MemoryCampaignStore` - In-process store for tools and tests
//! - `RestCampaignStore` - Hosted database REST endpoint client

mod campaign;
mod error;
mod memory;
mod rest;
mod store;

pub use campaign::*;
pub use error::StoreError;
pub use memory::MemoryCampaignStore;
pub use rest::RestCampaignStore;
pub use store::*;

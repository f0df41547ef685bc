//! Core data types for the otcbook market.
//!
//! All amounts use fixed-point representation (u64 scaled by 10^8) and the
//! `Offer` type implements SSZ serialization for deterministic state roots.
//!
//! ## Types
//!
//! - [`Offer`]: a standing request to exchange one asset for another
//! - [`Pair`]: directional `(sell, buy)` asset pair
//! - [`MarketEvent`]: append-only audit record
//! - [`price`]: checked fixed-point arithmetic and the cross-multiplied
//!   price comparator

mod event;
mod offer;
pub mod price;

pub use event::MarketEvent;
pub use offer::{AccountId, AssetId, Offer, OfferId, Pair};

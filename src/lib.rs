//! # otcbook
//!
//! Continuous double-auction market for fungible asset pairs.
//!
//! ## Architecture
//!
//! - **Types**: Core data structures (Offer, Pair, MarketEvent) and
//!   fixed-point price math
//! - **Book**: Slab-backed offer store with a pair-keyed sorted index,
//!   an unsorted staging list and tombstoned removal
//! - **Market**: Escrowed trade execution, the price-crossing matching
//!   walk, fees and administration
//! - **Oracle**: Ring-buffered cumulative price samples answering TWAP,
//!   VWAP and blended average queries
//!
//! ## Design Principles
//!
//! 1. **Determinism**: All operations produce identical results for identical inputs
//! 2. **No Floating Point**: All math uses fixed-point arithmetic (10^8 scaling)
//! 3. **No Division in Comparisons**: Price ordering via u128 cross-multiplication
//! 4. **Synchronous Execution**: Every entrypoint runs to completion atomically

// ============================================================================
// Module declarations
// ============================================================================

/// Core data types: Offer, Pair, MarketEvent, fixed-point price math
pub mod types;

/// Order store, sorted index, staging list, tombstones
pub mod book;

/// Trade execution, matching engine, fees, administration
pub mod market;

/// Rolling average-price oracle
pub mod oracle;

/// Market and book error types
pub mod error;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use book::{Book, TOMBSTONE_GRACE};
pub use error::{MarketError, Result};
pub use market::{Gatekeeper, Ledger, Market, MemoryLedger, SingleAdmin};
pub use oracle::{PriceOracle, ORACLE_CAPACITY, SAMPLE_INTERVAL};
pub use types::{AccountId, AssetId, MarketEvent, Offer, OfferId, Pair};

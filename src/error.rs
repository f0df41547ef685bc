//! Market error types.
//!
//! Every failure is synchronous and call-aborting: a returned error means
//! the operation made no state change. There is no partial-success path;
//! callers wanting partial fills re-invoke with a smaller quantity.

use thiserror::Error;

use crate::types::OfferId;

/// Errors surfaced by market and book operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    /// A foundational trade path was re-entered within the same call
    #[error("reentrant call")]
    Reentrancy,

    /// The market-lifetime gate reports closed
    #[error("market is closed")]
    Closed,

    /// No active offer with this identifier
    #[error("offer {0} is not active")]
    Inactive(OfferId),

    /// Caller does not own the offer and no bypass applies
    #[error("offer {0} can only be cancelled by its owner")]
    NotOwner(OfferId),

    /// An amount was zero where a positive amount is required
    #[error("amount must be non-zero")]
    ZeroAmount,

    /// Offer would trade an asset against itself
    #[error("sell and buy asset must differ")]
    SameAsset,

    /// Sell amount is below the dust floor for its asset
    #[error("sell amount below dust floor")]
    BelowDust,

    /// Requested quantity exceeds the offer's remaining sell amount
    #[error("quantity exceeds remaining amount of offer {0}")]
    ExcessQuantity(OfferId),

    /// Checked arithmetic overflowed or underflowed
    #[error("arithmetic overflow")]
    Overflow,

    /// The asset ledger refused a transfer
    #[error("asset transfer failed")]
    TransferFailed,

    /// Caller is not authorized for an administrative mutation
    #[error("caller is not authorized")]
    Unauthorized,

    /// Taking offers is administratively disabled
    #[error("buying is disabled")]
    BuyDisabled,

    /// Matching is administratively disabled
    #[error("matching is disabled")]
    MatchingDisabled,

    /// Offer is already present in the sorted index
    #[error("offer {0} is already ranked")]
    AlreadyRanked(OfferId),

    /// Offer is not present in the sorted index
    #[error("offer {0} is not ranked")]
    NotRanked(OfferId),

    /// Offer is not on the unsorted staging list
    #[error("offer {0} is not staged")]
    NotStaged(OfferId),

    /// Offer is already on the unsorted staging list
    #[error("offer {0} is already staged")]
    AlreadyStaged(OfferId),

    /// No tombstoned rank node exists for this identifier
    #[error("offer {0} has no tombstoned rank node")]
    NotTombstoned(OfferId),

    /// Tombstone is younger than the purge grace window
    #[error("tombstone for offer {0} is still within its grace window")]
    TombstoneFresh(OfferId),

    /// Rank node cannot be purged while the offer is live
    #[error("offer {0} is still active")]
    StillActive(OfferId),

    /// Not enough oracle history to answer the query
    #[error("insufficient oracle history for pair")]
    NoOracleHistory,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MarketError>;

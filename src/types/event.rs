//! Audit events emitted by the market.
//!
//! Every state-changing operation appends one or more events to the
//! market's log. The log is append-only and meant for external indexers;
//! nothing in the engine reads it back. Events serialize to tagged JSON.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, AssetId, OfferId};

/// An audit record for a single state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// A new offer entered the book
    OfferCreated {
        id: OfferId,
        owner: AccountId,
        sell_amount: u64,
        sell_asset: AssetId,
        buy_amount: u64,
        buy_asset: AssetId,
    },

    /// An offer was partially filled and its amounts shrank
    OfferBumped {
        id: OfferId,
        sell_amount: u64,
        buy_amount: u64,
    },

    /// A trade executed against a resting offer
    Trade {
        id: OfferId,
        maker: AccountId,
        taker: AccountId,
        sell_asset: AssetId,
        buy_asset: AssetId,
        /// Amount of `sell_asset` delivered to the taker
        quantity: u64,
        /// Amount of `buy_asset` paid by the taker (fee included)
        spend: u64,
    },

    /// An offer left the book before being fully filled
    OfferCancelled {
        id: OfferId,
        owner: AccountId,
        refund: u64,
    },

    /// A fee was charged on the buy side of a trade
    FeeCharged {
        id: OfferId,
        taker: AccountId,
        recipient: AccountId,
        asset: AssetId,
        amount: u64,
    },

    /// An offer was spliced into the sorted index
    Sorted { id: OfferId },

    /// An offer was unlinked from the sorted index (tombstoned)
    Unsorted { id: OfferId },

    /// A keeper promoted a staged offer into the sorted index
    Inserted { id: OfferId, keeper: AccountId },

    /// A stale tombstone was purged
    RankDeleted { id: OfferId },

    /// The per-asset dust floor changed
    DustLimitSet { asset: AssetId, limit: u64 },

    /// The fee rate changed
    FeeRateSet { bps: u64 },

    /// The fee recipient changed
    FeeRecipientSet { recipient: AccountId },

    /// Matching was enabled or disabled
    MatchingToggled { enabled: bool },

    /// Taking offers was enabled or disabled
    BuyToggled { enabled: bool },
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_roundtrip() {
        let event = MarketEvent::Trade {
            id: 3,
            maker: 1,
            taker: 2,
            sell_asset: 10,
            buy_asset: 20,
            quantity: 5_000_000_000,
            spend: 10_000_000_000,
        };

        let json = serde_json::to_string(&event).expect("Failed to serialize");
        let back: MarketEvent = serde_json::from_str(&json).expect("Failed to deserialize");

        assert_eq!(event, back);
    }

    #[test]
    fn test_event_tag() {
        let event = MarketEvent::Sorted { id: 7 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"sorted""#), "unexpected json: {}", json);
    }
}

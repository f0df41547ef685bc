//! Offer type for the continuous double-auction market.
//!
//! ## SSZ Serialization
//!
//! `Offer` derives `SimpleSerialize` from ssz_rs for deterministic encoding.
//! The encoded form feeds the book's SHA-256 state root, so every field is a
//! fixed-size basic type (u64, little-endian).
//!
//! ## Fixed-Point Representation
//!
//! Amounts are stored as u64 scaled by 10^8 (see `types::price::SCALE`).
//! The ask-equivalent price of an offer is `buy_amount / sell_amount`; the
//! book never stores that ratio, it is recomputed by cross-multiplication.

use ssz_rs::prelude::*;

/// Offer identifier. Monotonically increasing, assigned by the book,
/// never reused even after the offer's storage is cleared.
pub type OfferId = u64;

/// Account identifier as assigned by the host ledger.
pub type AccountId = u64;

/// Fungible asset identifier as assigned by the host ledger.
pub type AssetId = u64;

/// Ordered asset pair `(sell, buy)`.
///
/// The pair is directional: offers selling A for B and offers selling B
/// for A live in two independent sorted indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    /// Asset the maker is selling
    pub sell: AssetId,
    /// Asset the maker wants in return
    pub buy: AssetId,
}

impl Pair {
    /// Create a pair
    #[inline]
    pub fn new(sell: AssetId, buy: AssetId) -> Self {
        Self { sell, buy }
    }

    /// The counter-side pair (what takers of this pair are offering)
    #[inline]
    pub fn opposite(self) -> Self {
        Self {
            sell: self.buy,
            buy: self.sell,
        }
    }
}

/// A standing request to exchange a fixed amount of one asset for a fixed
/// amount of another.
///
/// An offer exists from creation until fully filled or cancelled, at which
/// point its storage is cleared and the identifier becomes permanently
/// inactive. Partial fills shrink `sell_amount` and `buy_amount` in
/// proportion, so the ask price of a live offer never changes.
///
/// ## Example
///
/// ```
/// use otcbook::types::Offer;
///
/// // Sell 100.0 of asset 1 for 200.0 of asset 2
/// let offer = Offer::new(1, 7, 10_000_000_000, 1, 20_000_000_000, 2, 0);
/// assert_eq!(offer.pair().sell, 1);
/// assert_eq!(offer.pair().buy, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, SimpleSerialize)]
pub struct Offer {
    /// Unique offer identifier (assigned by the book)
    pub id: u64,

    /// Maker account that owns this offer
    pub owner: u64,

    /// Remaining amount of `sell_asset` on offer (fixed-point, 10^8)
    pub sell_amount: u64,

    /// Asset being sold
    pub sell_asset: u64,

    /// Remaining amount of `buy_asset` wanted in return (fixed-point, 10^8)
    pub buy_amount: u64,

    /// Asset wanted in return
    pub buy_asset: u64,

    /// Host timestamp at creation
    pub created_at: u64,
}

impl Offer {
    /// Create a new offer
    pub fn new(
        id: OfferId,
        owner: AccountId,
        sell_amount: u64,
        sell_asset: AssetId,
        buy_amount: u64,
        buy_asset: AssetId,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            owner,
            sell_amount,
            sell_asset,
            buy_amount,
            buy_asset,
            created_at,
        }
    }

    /// The ordered pair this offer trades on
    #[inline]
    pub fn pair(&self) -> Pair {
        Pair::new(self.sell_asset, self.buy_asset)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_new() {
        let offer = Offer::new(1, 7, 10_000_000_000, 1, 20_000_000_000, 2, 99);

        assert_eq!(offer.id, 1);
        assert_eq!(offer.owner, 7);
        assert_eq!(offer.sell_amount, 10_000_000_000);
        assert_eq!(offer.sell_asset, 1);
        assert_eq!(offer.buy_amount, 20_000_000_000);
        assert_eq!(offer.buy_asset, 2);
        assert_eq!(offer.created_at, 99);
    }

    #[test]
    fn test_pair_opposite() {
        let pair = Pair::new(1, 2);
        assert_eq!(pair.opposite(), Pair::new(2, 1));
        assert_eq!(pair.opposite().opposite(), pair);
    }

    #[test]
    fn test_offer_ssz_roundtrip() {
        let offer = Offer::new(42, 7, 10_000_000_000, 1, 20_000_000_000, 2, 99);

        let serialized = ssz_rs::serialize(&offer).expect("Failed to serialize");
        let deserialized: Offer = ssz_rs::deserialize(&serialized).expect("Failed to deserialize");

        assert_eq!(offer, deserialized);
    }

    #[test]
    fn test_offer_deterministic_serialization() {
        let offer = Offer::new(42, 7, 10_000_000_000, 1, 20_000_000_000, 2, 99);

        let bytes1 = ssz_rs::serialize(&offer).expect("Failed to serialize");
        let bytes2 = ssz_rs::serialize(&offer).expect("Failed to serialize");

        assert_eq!(bytes1, bytes2, "SSZ serialization must be deterministic");
    }

    #[test]
    fn test_offer_ssz_size() {
        let offer = Offer::new(1, 7, 10_000_000_000, 1, 20_000_000_000, 2, 0);
        let bytes = ssz_rs::serialize(&offer).expect("Failed to serialize");

        // 7 u64 fields, 8 bytes each
        assert_eq!(bytes.len(), 56, "Offer should serialize to 56 bytes");
    }
}

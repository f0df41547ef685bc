//! Arena nodes for offer storage and the sorted index.
//!
//! ## Design
//!
//! Offers live in a `Slab` and are addressed externally by their `OfferId`.
//! Slab slots are reused after removal; offer identifiers never are, so all
//! linked-list pointers here hold identifiers, not slab keys, and resolve
//! through the book's id index.
//!
//! `RankNode` is the sorted-index node. It outlives its offer: `unsort`
//! tombstones the node instead of deleting it, because a matching walk in
//! the same call may still hold the identifier. A keeper purges the node
//! once the tombstone has aged past the grace window.

use crate::types::{Offer, OfferId, Pair};

/// Offer wrapper stored in the slab.
///
/// `next_unsorted` is the singly-linked staging-list pointer. An offer is
/// on the staging list iff this pointer is set or the offer is the list
/// head; it is never simultaneously staged and ranked.
#[derive(Debug, Clone)]
pub struct OfferNode {
    /// The offer data
    pub offer: Offer,

    /// Next entry in the unsorted staging list
    pub next_unsorted: Option<OfferId>,
}

impl OfferNode {
    /// Wrap an offer (not staged, not ranked)
    #[inline]
    pub fn new(offer: Offer) -> Self {
        Self {
            offer,
            next_unsorted: None,
        }
    }
}

/// Sorted-index node, one per ranked offer, keyed by the same identifier
/// space as offers.
///
/// `next` points toward the better end of the pair's list (ties: older);
/// `prev` points toward the worse end (ties: newer). The pair's `best`
/// offer has `next == None`; the worst has `prev == None`.
#[derive(Debug, Clone)]
pub struct RankNode {
    /// Pair whose index this node belongs to
    pub pair: Pair,

    /// Next better-priced (or older at equal price) offer
    pub next: Option<OfferId>,

    /// Next worse-priced (or newer at equal price) offer
    pub prev: Option<OfferId>,

    /// Height at which the node was unlinked; `None` while linked
    pub tombstone: Option<u64>,
}

impl RankNode {
    /// Create an unlinked, live node for `pair`
    #[inline]
    pub fn new(pair: Pair) -> Self {
        Self {
            pair,
            next: None,
            prev: None,
            tombstone: None,
        }
    }

    /// True once `unsort` has unlinked this node
    #[inline]
    pub fn is_tombstoned(&self) -> bool {
        self.tombstone.is_some()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Offer;

    #[test]
    fn test_offer_node_new() {
        let offer = Offer::new(1, 7, 100, 1, 200, 2, 0);
        let node = OfferNode::new(offer.clone());

        assert_eq!(node.offer, offer);
        assert!(node.next_unsorted.is_none());
    }

    #[test]
    fn test_rank_node_new() {
        let node = RankNode::new(Pair::new(1, 2));

        assert!(node.next.is_none());
        assert!(node.prev.is_none());
        assert!(!node.is_tombstoned());
    }

    #[test]
    fn test_rank_node_tombstone() {
        let mut node = RankNode::new(Pair::new(1, 2));
        node.tombstone = Some(50);

        assert!(node.is_tombstoned());
        assert_eq!(node.tombstone, Some(50));
    }
}

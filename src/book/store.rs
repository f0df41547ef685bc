//! Offer store: slab-backed arena, staging list, dust floors, state root.
//!
//! ## Architecture
//!
//! - **Slab**: pre-allocatable storage for O(1) offer operations
//! - **HashMap id index**: offer id to slab key, O(1) lookup and removal
//! - **Staging list**: singly linked unsorted list for offers awaiting a
//!   keeper's price rank
//!
//! Offer identifiers increase monotonically and are never reused, even
//! though slab slots are. The sorted-index state (`rank`, `best`, `span`)
//! also lives here so the whole book is one explicit store object; the
//! ranking operations themselves are in [`crate::book::index`].

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use slab::Slab;

use crate::book::node::{OfferNode, RankNode};
use crate::error::{MarketError, Result};
use crate::types::price::checked_sub;
use crate::types::{AccountId, AssetId, Offer, OfferId, Pair};

/// Number of heights a tombstone must age before it can be purged.
pub const TOMBSTONE_GRACE: u64 = 10;

/// The order store and pair-keyed sorted index.
///
/// All per-pair mutable state (`best`, `span`, dust floors) is explicit
/// here, passed by reference into every operation; nothing is ambient.
#[derive(Debug, Default)]
pub struct Book {
    /// Offer storage; slots are reused, identifiers are not
    offers: Slab<OfferNode>,

    /// Offer id to slab key
    id_index: HashMap<OfferId, usize>,

    /// Sorted-index nodes, including tombstoned ones awaiting purge
    pub(crate) rank: HashMap<OfferId, RankNode>,

    /// Best (head) offer per pair
    pub(crate) best: HashMap<Pair, OfferId>,

    /// Live sorted-offer count per pair
    pub(crate) span: HashMap<Pair, u64>,

    /// Minimum sell amount per sell asset
    dust: HashMap<AssetId, u64>,

    /// Head of the unsorted staging list
    staged_head: Option<OfferId>,

    /// Tail of the unsorted staging list; the tail's `next_unsorted` is
    /// `None`, so membership needs this to stay O(1)
    staged_tail: Option<OfferId>,

    /// Next offer identifier
    next_id: OfferId,
}

impl Book {
    /// Create an empty book
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Create a book with pre-allocated offer capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            offers: Slab::with_capacity(capacity),
            id_index: HashMap::with_capacity(capacity),
            next_id: 1,
            ..Self::default()
        }
    }

    // ========================================================================
    // Offer lifecycle
    // ========================================================================

    /// Store a new offer and return its identifier.
    ///
    /// The offer starts out neither ranked nor staged. Validation (amounts,
    /// dust floor, escrow) is the market layer's job.
    pub fn create(
        &mut self,
        owner: AccountId,
        sell_amount: u64,
        sell_asset: AssetId,
        buy_amount: u64,
        buy_asset: AssetId,
        created_at: u64,
    ) -> OfferId {
        let id = self.next_id;
        self.next_id += 1;

        let offer = Offer::new(id, owner, sell_amount, sell_asset, buy_amount, buy_asset, created_at);
        let key = self.offers.insert(OfferNode::new(offer));
        self.id_index.insert(id, key);
        id
    }

    /// Clear an offer's storage, deactivating its identifier forever.
    ///
    /// The offer must already be off the sorted index and the staging list.
    pub fn remove(&mut self, id: OfferId) -> Option<Offer> {
        debug_assert!(!self.is_ranked(id), "removing a ranked offer");
        debug_assert!(!self.is_staged(id), "removing a staged offer");

        let key = self.id_index.remove(&id)?;
        Some(self.offers.remove(key).offer)
    }

    /// Look up an active offer
    #[inline]
    pub fn offer(&self, id: OfferId) -> Option<&Offer> {
        let key = *self.id_index.get(&id)?;
        self.offers.get(key).map(|node| &node.offer)
    }

    /// An identifier is active from creation until fill/cancel clears it
    #[inline]
    pub fn is_active(&self, id: OfferId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Shrink an offer after a partial fill.
    ///
    /// Subtracts `quantity` from the sell side and `spend` from the buy
    /// side, keeping the ask price constant up to rounding. Returns the
    /// remaining `(sell_amount, buy_amount)`.
    pub fn apply_fill(&mut self, id: OfferId, quantity: u64, spend: u64) -> Result<(u64, u64)> {
        let key = *self.id_index.get(&id).ok_or(MarketError::Inactive(id))?;
        let offer = &mut self.offers[key].offer;

        offer.sell_amount =
            checked_sub(offer.sell_amount, quantity).ok_or(MarketError::Overflow)?;
        offer.buy_amount = checked_sub(offer.buy_amount, spend).ok_or(MarketError::Overflow)?;
        Ok((offer.sell_amount, offer.buy_amount))
    }

    /// Number of active offers
    #[inline]
    pub fn len(&self) -> usize {
        self.offers.len()
    }

    /// True when no offers are active
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    /// Next identifier the book will assign
    #[inline]
    pub fn peek_next_id(&self) -> OfferId {
        self.next_id
    }

    // ========================================================================
    // Unsorted staging list
    // ========================================================================

    /// Push an offer onto the staging list head in O(1).
    ///
    /// Staged offers are tradeable but invisible to the matching walk until
    /// a keeper ranks them.
    pub fn stage(&mut self, id: OfferId) -> Result<()> {
        if !self.is_active(id) {
            return Err(MarketError::Inactive(id));
        }
        if self.is_ranked(id) {
            return Err(MarketError::AlreadyRanked(id));
        }
        if self.is_staged(id) {
            // Pushing twice would cycle the list
            return Err(MarketError::AlreadyStaged(id));
        }

        let key = self.id_index[&id];
        self.offers[key].next_unsorted = self.staged_head;
        if self.staged_head.is_none() {
            self.staged_tail = Some(id);
        }
        self.staged_head = Some(id);
        Ok(())
    }

    /// Remove an offer from the staging list.
    ///
    /// O(n) in the staging list length; the list only holds offers between
    /// creation and keeper insertion, so it stays short in practice.
    pub fn hide(&mut self, id: OfferId) -> Result<()> {
        if self.staged_head == Some(id) {
            let key = self.id_index[&id];
            self.staged_head = self.offers[key].next_unsorted.take();
            if self.staged_head.is_none() {
                self.staged_tail = None;
            }
            return Ok(());
        }

        // Walk to the predecessor
        let mut cursor = self.staged_head;
        while let Some(cur) = cursor {
            let cur_key = self.id_index[&cur];
            let next = self.offers[cur_key].next_unsorted;
            if next == Some(id) {
                let id_key = self.id_index[&id];
                let skip = self.offers[id_key].next_unsorted.take();
                self.offers[cur_key].next_unsorted = skip;
                if self.staged_tail == Some(id) {
                    self.staged_tail = Some(cur);
                }
                return Ok(());
            }
            cursor = next;
        }
        Err(MarketError::NotStaged(id))
    }

    /// True when the offer sits on the staging list
    #[inline]
    pub fn is_staged(&self, id: OfferId) -> bool {
        if self.staged_head == Some(id) || self.staged_tail == Some(id) {
            return true;
        }
        match self.id_index.get(&id) {
            Some(&key) => self.offers[key].next_unsorted.is_some(),
            None => false,
        }
    }

    /// Head of the staging list
    #[inline]
    pub fn staged_head(&self) -> Option<OfferId> {
        self.staged_head
    }

    /// Successor of `id` on the staging list
    #[inline]
    pub fn next_staged(&self, id: OfferId) -> Option<OfferId> {
        let key = *self.id_index.get(&id)?;
        self.offers[key].next_unsorted
    }

    // ========================================================================
    // Dust floors
    // ========================================================================

    /// Set the minimum sell amount for offers selling `asset`
    pub fn set_dust(&mut self, asset: AssetId, limit: u64) {
        self.dust.insert(asset, limit);
    }

    /// Dust floor for `asset` (0 when unset)
    #[inline]
    pub fn dust_limit(&self, asset: AssetId) -> u64 {
        self.dust.get(&asset).copied().unwrap_or(0)
    }

    // ========================================================================
    // State root
    // ========================================================================

    /// SHA-256 over the SSZ encoding of every active offer in id order.
    ///
    /// Deterministic across hosts: same offer set, same root. Consumed by
    /// external verifiers, never by the engine itself.
    pub fn state_root(&self) -> [u8; 32] {
        let mut ids: Vec<OfferId> = self.id_index.keys().copied().collect();
        ids.sort_unstable();

        let mut hasher = Sha256::new();
        for id in ids {
            if let Some(offer) = self.offer(id) {
                // Fixed-size container of u64 fields; encoding cannot fail
                let bytes = ssz_rs::serialize(offer)
                    .expect("SSZ encoding of a fixed-size offer is infallible");
                hasher.update(&bytes);
            }
        }

        let mut root = [0u8; 32];
        root.copy_from_slice(&hasher.finalize());
        root
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

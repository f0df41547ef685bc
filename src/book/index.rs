//! Pair-keyed sorted index over the offer store.
//!
//! ## Structure
//!
//! Each pair's ranked offers form a doubly linked list in an arena of
//! [`RankNode`]s keyed by offer id: `best[pair]` heads the list, `prev`
//! pointers walk toward worse prices, `next` toward better. Among equal
//! prices the older offer sits closer to `best`, so the matcher consumes
//! oldest first. This replaces a balanced tree deliberately: O(1) splicing
//! once the neighbor is known, at the cost of a linear scan when no usable
//! position hint is supplied.
//!
//! ## Tombstones
//!
//! `unsort` unlinks a node from its neighbors but leaves the node (with its
//! now-stale pointers) in the arena, stamped with the current height. A
//! matching walk in the same call may still reference the identifier, and
//! a stale position hint may legitimately start on a tombstoned node and
//! walk out of it. `purge_tombstone` reclaims the node once the offer is
//! inactive and the tombstone has aged past [`TOMBSTONE_GRACE`] heights.

use crate::book::node::RankNode;
use crate::book::store::{Book, TOMBSTONE_GRACE};
use crate::error::{MarketError, Result};
use crate::types::price::priced_le;
use crate::types::{Offer, OfferId, Pair};

impl Book {
    // ========================================================================
    // Queries
    // ========================================================================

    /// Best (head) offer of the pair's sorted list
    #[inline]
    pub fn best(&self, pair: Pair) -> Option<OfferId> {
        self.best.get(&pair).copied()
    }

    /// Count of live sorted offers for the pair
    #[inline]
    pub fn depth(&self, pair: Pair) -> u64 {
        self.span.get(&pair).copied().unwrap_or(0)
    }

    /// Next better-priced (ties: older) ranked offer
    pub fn better(&self, id: OfferId) -> Option<OfferId> {
        let node = self.rank.get(&id)?;
        if node.is_tombstoned() {
            return None;
        }
        node.next
    }

    /// Next worse-priced (ties: newer) ranked offer
    pub fn worse(&self, id: OfferId) -> Option<OfferId> {
        let node = self.rank.get(&id)?;
        if node.is_tombstoned() {
            return None;
        }
        node.prev
    }

    /// An offer is ranked iff it has a live rank node with a neighbor
    /// pointer, or it is its pair's `best`.
    pub fn is_ranked(&self, id: OfferId) -> bool {
        match self.rank.get(&id) {
            Some(node) if !node.is_tombstoned() => {
                node.next.is_some()
                    || node.prev.is_some()
                    || self.best.get(&node.pair) == Some(&id)
            }
            _ => false,
        }
    }

    /// Height stamp of a tombstoned rank node, if any
    pub fn tombstone_height(&self, id: OfferId) -> Option<u64> {
        self.rank.get(&id).and_then(|node| node.tombstone)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Splice an active, unranked offer into its pair's sorted list.
    ///
    /// `hint` is an optional neighbor the caller computed off-line; a good
    /// hint turns the linear scan into a short local walk. A bad hint is
    /// harmless -- `locate` falls back to scanning from `best`.
    ///
    /// Fails without touching the index if the offer is inactive or already
    /// ranked.
    pub fn insert_sorted(&mut self, id: OfferId, hint: Option<OfferId>) -> Result<()> {
        let offer = self.offer(id).ok_or(MarketError::Inactive(id))?.clone();
        if self.is_ranked(id) {
            return Err(MarketError::AlreadyRanked(id));
        }
        debug_assert!(!self.is_staged(id), "staged offer must be hidden before ranking");

        let pair = offer.pair();
        let mut node = RankNode::new(pair);

        match self.locate(&offer, hint) {
            // No better neighbor: the offer becomes the pair's best
            None => {
                let old_best = self.best.get(&pair).copied();
                node.prev = old_best;
                if let Some(ob) = old_best {
                    if let Some(ob_node) = self.rank.get_mut(&ob) {
                        ob_node.next = Some(id);
                    }
                }
                self.best.insert(pair, id);
            }
            // Splice in on the worse side of the located neighbor
            Some(better) => {
                let old_worse = self.rank.get(&better).and_then(|n| n.prev);
                node.next = Some(better);
                node.prev = old_worse;
                if let Some(w) = old_worse {
                    if let Some(w_node) = self.rank.get_mut(&w) {
                        w_node.next = Some(id);
                    }
                }
                if let Some(b_node) = self.rank.get_mut(&better) {
                    b_node.prev = Some(id);
                }
            }
        }

        self.rank.insert(id, node);
        *self.span.entry(pair).or_insert(0) += 1;
        Ok(())
    }

    /// Unlink a ranked offer from its pair's list, tombstoning the node at
    /// `height` instead of deleting it.
    pub fn unsort(&mut self, id: OfferId, height: u64) -> Result<()> {
        if !self.is_ranked(id) {
            return Err(MarketError::NotRanked(id));
        }
        let node = self.rank.get(&id).cloned().ok_or(MarketError::NotRanked(id))?;
        let pair = node.pair;

        let span = self.span.get(&pair).copied().unwrap_or(0);
        if span == 0 {
            return Err(MarketError::NotRanked(id));
        }

        if self.best.get(&pair) == Some(&id) {
            // The head moves worse-ward
            match node.prev {
                Some(p) => {
                    self.best.insert(pair, p);
                }
                None => {
                    self.best.remove(&pair);
                }
            }
        } else if let Some(n) = node.next {
            if let Some(n_node) = self.rank.get_mut(&n) {
                n_node.prev = node.prev;
            }
        }
        if let Some(p) = node.prev {
            if let Some(p_node) = self.rank.get_mut(&p) {
                p_node.next = node.next;
            }
        }

        self.span.insert(pair, span - 1);
        if let Some(own) = self.rank.get_mut(&id) {
            // Stale next/prev pointers are kept on purpose: hint walks may
            // still route through this node until it is purged.
            own.tombstone = Some(height);
        }
        Ok(())
    }

    /// Reclaim a tombstoned rank node.
    ///
    /// Valid only once the offer is inactive and the tombstone is older
    /// than the grace window. Purging twice fails cleanly.
    pub fn purge_tombstone(&mut self, id: OfferId, height: u64) -> Result<()> {
        let node = self.rank.get(&id).ok_or(MarketError::NotTombstoned(id))?;
        let stamped = node.tombstone.ok_or(MarketError::NotTombstoned(id))?;

        if self.is_active(id) {
            return Err(MarketError::StillActive(id));
        }
        if height <= stamped + TOMBSTONE_GRACE {
            return Err(MarketError::TombstoneFresh(id));
        }

        self.rank.remove(&id);
        Ok(())
    }

    // ========================================================================
    // Locate
    // ========================================================================

    /// Find the insertion point for `offer`: the worst ranked offer still
    /// priced better than or equal to it (`None` when `offer` beats the
    /// pair's best).
    ///
    /// With no usable hint this scans from `best` worse-ward. With a hint
    /// it first walks worse-ward out of any tombstoned or inactive nodes,
    /// then walks locally in whichever direction the price comparison
    /// demands, an O(k) operation for a hint k positions off.
    pub fn locate(&self, offer: &Offer, hint: Option<OfferId>) -> Option<OfferId> {
        let pair = offer.pair();

        let mut pos = match hint {
            Some(h) if h != offer.id => h,
            _ => return self.scan_from_best(offer),
        };

        // Skip out of tombstoned/inactive territory, worse-ward
        loop {
            match self.rank.get(&pos) {
                Some(node) if node.pair == pair => {
                    if self.is_active(pos) && self.is_ranked(pos) {
                        break;
                    }
                    match node.prev {
                        Some(p) => pos = p,
                        // Ran off the worse end without finding an active
                        // node; fall back to the full scan
                        None => return self.scan_from_best(offer),
                    }
                }
                // Unknown id or wrong pair: the hint is unusable
                _ => return self.scan_from_best(offer),
            }
        }

        if self.target_le(offer, pos) {
            // The hint is better than or equal to the target: walk
            // worse-ward to the last node that still is
            let mut better = pos;
            let mut cursor = self.rank.get(&pos).and_then(|n| n.prev);
            while let Some(c) = cursor {
                if !self.target_le(offer, c) {
                    break;
                }
                better = c;
                cursor = self.rank.get(&c).and_then(|n| n.prev);
            }
            Some(better)
        } else {
            // The hint is worse than the target: walk better-ward to the
            // first node priced better than or equal to it
            let mut cursor = Some(pos);
            while let Some(c) = cursor {
                if self.target_le(offer, c) {
                    return Some(c);
                }
                cursor = self.rank.get(&c).and_then(|n| n.next);
            }
            None
        }
    }

    /// Full scan from `best` worse-ward; the no-hint (and bad-hint) path.
    fn scan_from_best(&self, offer: &Offer) -> Option<OfferId> {
        let pair = offer.pair();
        let mut top = self.best.get(&pair).copied();
        let mut better = None;

        while let Some(t) = top {
            if !self.target_le(offer, t) {
                break;
            }
            better = Some(t);
            top = self.rank.get(&t).and_then(|n| n.prev);
        }
        better
    }

    /// True when the target offer is priced worse than or equal to the
    /// ranked offer `id` (so the target belongs on `id`'s worse side).
    /// Equal prices compare true, which is what places a newcomer behind
    /// its equal-priced elders.
    fn target_le(&self, offer: &Offer, id: OfferId) -> bool {
        match self.offer(id) {
            Some(other) => priced_le(
                offer.buy_amount,
                offer.sell_amount,
                other.buy_amount,
                other.sell_amount,
            ),
            None => false,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const PAIR: Pair = Pair { sell: 1, buy: 2 };

    /// Create an offer selling 100 units at the given buy amount (price =
    /// buy/100) and rank it with the given hint.
    fn post(book: &mut Book, buy_amount: u64, hint: Option<OfferId>) -> OfferId {
        let id = book.create(1, 100, 1, buy_amount, 2, id_seed(book));
        book.insert_sorted(id, hint).unwrap();
        id
    }

    fn id_seed(book: &Book) -> u64 {
        book.peek_next_id()
    }

    /// Walk the pair's list from best via `worse` pointers
    fn walk(book: &Book, pair: Pair) -> Vec<OfferId> {
        let mut out = Vec::new();
        let mut cursor = book.best(pair);
        while let Some(id) = cursor {
            out.push(id);
            cursor = book.worse(id);
        }
        out
    }

    /// Ordering invariant: prices non-increasing (in taker rate) from best
    fn assert_sorted(book: &Book, pair: Pair) {
        let ids = walk(book, pair);
        for pear in ids.windows(2) {
            let hi = book.offer(pear[0]).unwrap();
            let lo = book.offer(pear[1]).unwrap();
            assert!(
                priced_le(lo.buy_amount, lo.sell_amount, hi.buy_amount, hi.sell_amount),
                "ordering violated between {} and {}",
                pear[0],
                pear[1]
            );
        }
        assert_eq!(book.depth(pair), ids.len() as u64, "span out of sync");
    }

    #[test]
    fn test_insert_single_becomes_best() {
        let mut book = Book::new();
        let id = post(&mut book, 200, None);

        assert_eq!(book.best(PAIR), Some(id));
        assert!(book.is_ranked(id));
        assert_eq!(book.depth(PAIR), 1);
        assert_eq!(book.better(id), None);
        assert_eq!(book.worse(id), None);
    }

    #[test]
    fn test_insert_orders_by_price() {
        let mut book = Book::new();

        // Lower buy amount for the same sell amount = better for the taker
        let worst = post(&mut book, 300, None);
        let best = post(&mut book, 100, None);
        let mid = post(&mut book, 200, None);

        assert_eq!(walk(&book, PAIR), vec![best, mid, worst]);
        assert_sorted(&book, PAIR);
    }

    #[test]
    fn test_equal_price_ties_go_behind_elders() {
        let mut book = Book::new();

        let older = post(&mut book, 200, None);
        let newer = post(&mut book, 200, None);

        // Walking from best hits the older offer first
        assert_eq!(walk(&book, PAIR), vec![older, newer]);
    }

    #[test]
    fn test_insert_already_ranked_fails_without_mutation() {
        let mut book = Book::new();
        let id = post(&mut book, 200, None);

        let before = walk(&book, PAIR);
        assert_eq!(book.insert_sorted(id, None), Err(MarketError::AlreadyRanked(id)));
        assert_eq!(walk(&book, PAIR), before);
        assert_eq!(book.depth(PAIR), 1);
    }

    #[test]
    fn test_insert_with_good_hint() {
        let mut book = Book::new();

        let a = post(&mut book, 100, None);
        let b = post(&mut book, 200, None);
        let c = post(&mut book, 400, None);

        // Target priced 300 belongs between b and c; hint at the far end
        let id = book.create(1, 100, 1, 300, 2, 9);
        book.insert_sorted(id, Some(c)).unwrap();

        assert_sorted(&book, PAIR);
        assert_eq!(book.best(PAIR), Some(a));
        assert_eq!(book.better(id), Some(b));
        assert_eq!(book.worse(id), Some(c));
    }

    #[test]
    fn test_insert_with_hint_on_wrong_side() {
        let mut book = Book::new();

        let a = post(&mut book, 100, None);
        let b = post(&mut book, 400, None);

        // Hint points at the worse offer but the target beats it; the
        // locate walk moves better-ward
        let id = book.create(1, 100, 1, 200, 2, 9);
        book.insert_sorted(id, Some(b)).unwrap();

        assert_eq!(walk(&book, PAIR), vec![a, id, b]);
        assert_sorted(&book, PAIR);
    }

    #[test]
    fn test_insert_with_garbage_hint_falls_back() {
        let mut book = Book::new();

        let a = post(&mut book, 200, None);
        // Hint references an id that was never ranked
        let id = book.create(1, 100, 1, 100, 2, 9);
        book.insert_sorted(id, Some(9999)).unwrap();

        assert_eq!(walk(&book, PAIR), vec![id, a]);
    }

    #[test]
    fn test_insert_with_wrong_pair_hint_falls_back() {
        let mut book = Book::new();

        let _other = {
            let id = book.create(1, 100, 3, 200, 4, 0);
            book.insert_sorted(id, None).unwrap();
            id
        };
        let a = post(&mut book, 200, None);

        let id = book.create(1, 100, 1, 100, 2, 9);
        book.insert_sorted(id, Some(_other)).unwrap();

        assert_eq!(walk(&book, PAIR), vec![id, a]);
    }

    #[test]
    fn test_unsort_head_moves_best() {
        let mut book = Book::new();

        let best = post(&mut book, 100, None);
        let second = post(&mut book, 200, None);

        book.unsort(best, 5).unwrap();

        assert_eq!(book.best(PAIR), Some(second));
        assert!(!book.is_ranked(best));
        assert_eq!(book.depth(PAIR), 1);
        assert_eq!(book.tombstone_height(best), Some(5));
        assert_sorted(&book, PAIR);
    }

    #[test]
    fn test_unsort_middle_relinks_neighbors() {
        let mut book = Book::new();

        let a = post(&mut book, 100, None);
        let b = post(&mut book, 200, None);
        let c = post(&mut book, 300, None);

        book.unsort(b, 5).unwrap();

        assert_eq!(walk(&book, PAIR), vec![a, c]);
        assert_eq!(book.worse(a), Some(c));
        assert_eq!(book.better(c), Some(a));
        assert_sorted(&book, PAIR);
    }

    #[test]
    fn test_unsort_last_empties_pair() {
        let mut book = Book::new();

        let id = post(&mut book, 100, None);
        book.unsort(id, 5).unwrap();

        assert_eq!(book.best(PAIR), None);
        assert_eq!(book.depth(PAIR), 0);
    }

    #[test]
    fn test_unsort_unranked_fails() {
        let mut book = Book::new();
        let id = book.create(1, 100, 1, 200, 2, 0);

        assert_eq!(book.unsort(id, 5), Err(MarketError::NotRanked(id)));
    }

    #[test]
    fn test_unsort_twice_fails() {
        let mut book = Book::new();
        let id = post(&mut book, 100, None);

        book.unsort(id, 5).unwrap();
        assert_eq!(book.unsort(id, 6), Err(MarketError::NotRanked(id)));
    }

    #[test]
    fn test_purge_requires_inactive_and_aged() {
        let mut book = Book::new();
        let id = post(&mut book, 100, None);
        book.unsort(id, 5).unwrap();

        // Offer still active
        assert_eq!(book.purge_tombstone(id, 100), Err(MarketError::StillActive(id)));
        book.remove(id);

        // Grace ends strictly after stamp + 10
        assert_eq!(book.purge_tombstone(id, 15), Err(MarketError::TombstoneFresh(id)));
        book.purge_tombstone(id, 16).unwrap();

        // Purging again is a clean failure, not corruption
        assert_eq!(book.purge_tombstone(id, 16), Err(MarketError::NotTombstoned(id)));
    }

    #[test]
    fn test_purge_live_node_fails() {
        let mut book = Book::new();
        let id = post(&mut book, 100, None);

        assert_eq!(book.purge_tombstone(id, 100), Err(MarketError::NotTombstoned(id)));
        assert!(book.is_ranked(id));
    }

    #[test]
    fn test_hint_walks_out_of_tombstones() {
        let mut book = Book::new();

        let a = post(&mut book, 100, None);
        let b = post(&mut book, 200, None);
        let c = post(&mut book, 300, None);

        // Tombstone b; a hint pointing at it must still resolve
        book.unsort(b, 5).unwrap();
        book.remove(b);

        let id = book.create(1, 100, 1, 250, 2, 9);
        book.insert_sorted(id, Some(b)).unwrap();

        assert_eq!(walk(&book, PAIR), vec![a, id, c]);
        assert_sorted(&book, PAIR);
    }

    #[test]
    fn test_span_counts_only_live_nodes() {
        let mut book = Book::new();

        let ids: Vec<_> = (0..5).map(|i| post(&mut book, 100 + i * 50, None)).collect();
        assert_eq!(book.depth(PAIR), 5);

        book.unsort(ids[2], 5).unwrap();
        book.unsort(ids[0], 5).unwrap();

        assert_eq!(book.depth(PAIR), 3);
        assert_eq!(walk(&book, PAIR).len(), 3);
        assert_sorted(&book, PAIR);
    }

    #[test]
    fn test_pairs_are_independent() {
        let mut book = Book::new();

        let ab = post(&mut book, 200, None);
        let ba = {
            let id = book.create(1, 100, 2, 200, 1, 0);
            book.insert_sorted(id, None).unwrap();
            id
        };

        assert_eq!(book.best(PAIR), Some(ab));
        assert_eq!(book.best(PAIR.opposite()), Some(ba));
        assert_eq!(book.depth(PAIR), 1);
        assert_eq!(book.depth(PAIR.opposite()), 1);
    }
}

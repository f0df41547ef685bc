//! Matching engine: price-crossing entrypoints and keeper operations.
//!
//! These are the outer entrypoints layered over the foundational paths in
//! `base`. They assert the reentrancy flag is clear but do not raise it;
//! the inner `buy`, `cancel` and offer-creation calls they delegate to do
//! the raising, so a callback reentering from a transfer is still caught.
//!
//! ## Crossing walk
//!
//! An incoming offer repeatedly takes the best resting offer of the
//! opposite pair for as long as the prices cross, shrinking its own
//! amounts proportionally after each fill. Whatever survives above the
//! dust floor is spliced into the sorted index as a resting offer.
//!
//! The walk is all-or-nothing on taker funds: before its first fill it
//! escrows the taker's whole sell amount into the market account, so the
//! one transfer that can fail on funds happens before any book mutation.
//! Every fill, the rested residual and the final refund then settle from
//! balances the market already holds.

use std::cmp;

use tracing::debug;

use crate::error::{MarketError, Result};
use crate::market::base::Market;
use crate::market::traits::{Gatekeeper, Ledger};
use crate::types::price::mul_div;
use crate::types::{AccountId, AssetId, MarketEvent, OfferId, Pair};

impl<L: Ledger, G: Gatekeeper> Market<L, G> {
    /// Create an offer without a position hint.
    ///
    /// With matching enabled the offer is stored on the unsorted staging
    /// list, priced but unranked, awaiting keeper insertion; it is
    /// takeable immediately. With matching disabled this degrades to a
    /// plain unranked offer.
    pub fn offer(
        &mut self,
        owner: AccountId,
        sell_amount: u64,
        sell_asset: AssetId,
        buy_amount: u64,
        buy_asset: AssetId,
    ) -> Result<OfferId> {
        self.assert_unlocked()?;
        let id = self.offer_base(owner, sell_amount, sell_asset, buy_amount, buy_asset)?;
        if self.matching_enabled {
            self.book.stage(id)?;
        }
        Ok(id)
    }

    /// Create an offer with a position hint, matching eagerly with
    /// rounding tolerance. Returns the resting residual's id, if any.
    pub fn offer_at(
        &mut self,
        owner: AccountId,
        sell_amount: u64,
        sell_asset: AssetId,
        buy_amount: u64,
        buy_asset: AssetId,
        pos: Option<OfferId>,
    ) -> Result<Option<OfferId>> {
        self.offer_with(owner, sell_amount, sell_asset, buy_amount, buy_asset, pos, true)
    }

    /// Create an offer with a position hint and explicit rounding policy.
    ///
    /// `rounding` controls whether the crossing check tolerates the
    /// one-unit error introduced by integer division of a shrunk taker:
    /// with it off, only exactly crossing prices match.
    #[allow(clippy::too_many_arguments)]
    pub fn offer_with(
        &mut self,
        owner: AccountId,
        sell_amount: u64,
        sell_asset: AssetId,
        buy_amount: u64,
        buy_asset: AssetId,
        pos: Option<OfferId>,
        rounding: bool,
    ) -> Result<Option<OfferId>> {
        self.assert_unlocked()?;
        if !self.matching_enabled {
            return Err(MarketError::MatchingDisabled);
        }
        if sell_amount == 0 || buy_amount == 0 {
            return Err(MarketError::ZeroAmount);
        }
        if sell_asset == buy_asset {
            return Err(MarketError::SameAsset);
        }
        if sell_amount < self.book.dust_limit(sell_asset) {
            return Err(MarketError::BelowDust);
        }
        self.matcho(owner, sell_amount, sell_asset, buy_amount, buy_asset, pos, rounding)
    }

    /// Cross the incoming offer against the opposite side, then rest the
    /// residual.
    fn matcho(
        &mut self,
        taker: AccountId,
        mut t_sell: u64,
        sell_asset: AssetId,
        mut t_buy: u64,
        buy_asset: AssetId,
        pos: Option<OfferId>,
        rounding: bool,
    ) -> Result<Option<OfferId>> {
        if self.gate_closed() {
            return Err(MarketError::Closed);
        }

        // Resting offers that sell what the taker buys
        let counter = Pair::new(buy_asset, sell_asset);

        // Sell-asset amount the market account holds for this walk. The
        // whole commitment is escrowed before the first fill, keeping the
        // call all-or-nothing: a taker who cannot fund it fails here, with
        // the book untouched.
        let mut escrow: u64 = 0;
        let mut funded = false;

        while let Some(best_id) = self.book.best(counter) {
            let maker = self
                .book
                .offer(best_id)
                .ok_or(MarketError::Inactive(best_id))?
                .clone();
            let m_sell = maker.sell_amount as u128;
            let m_buy = maker.buy_amount as u128;

            // Prices cross when the maker asks no more per unit than the
            // taker offers; the tolerance absorbs the one-unit rounding
            // error a shrunk taker accumulates per iteration
            let lhs = m_buy * t_buy as u128;
            let mut rhs = t_sell as u128 * m_sell;
            if rounding {
                rhs += m_buy + m_sell + t_buy as u128 + t_sell as u128;
            }
            if lhs > rhs {
                break;
            }

            let quantity = cmp::min(maker.sell_amount, t_buy);
            if quantity == 0 {
                break;
            }
            // Bounded by the maker's buy amount, so the widening division
            // cannot overflow
            let spend = mul_div(quantity, maker.buy_amount, maker.sell_amount)
                .ok_or(MarketError::Overflow)?;
            if spend == 0 {
                // Too small to settle
                break;
            }

            if !funded {
                if !self.buying_enabled() {
                    return Err(MarketError::BuyDisabled);
                }
                if !self.ledger.transfer(sell_asset, taker, self.account, t_sell) {
                    return Err(MarketError::TransferFailed);
                }
                escrow = t_sell;
                funded = true;
            }
            if spend > escrow {
                // The rounding tolerance can price a fill a few units past
                // the taker's committed amount; settle it only if the taker
                // covers the difference, otherwise stop crossing
                if !self.ledger.transfer(sell_asset, taker, self.account, spend - escrow) {
                    break;
                }
                escrow = spend;
            }

            self.buy_funded(taker, best_id, quantity)?;
            escrow -= spend;
            debug!(best_id, quantity, "crossed against best offer");

            // Shrink the taker proportionally, rounding the sell side down
            let t_buy_prev = t_buy;
            t_buy -= quantity;
            t_sell = mul_div(t_buy, t_sell, t_buy_prev).ok_or(MarketError::Overflow)?;
            if t_buy == 0 || t_sell == 0 {
                break;
            }
        }

        if !funded {
            // Nothing crossed: rest the offer whole, escrowing as usual
            if t_sell > 0 && t_buy > 0 && t_sell >= self.book.dust_limit(sell_asset) {
                let id = self.offer_base(taker, t_sell, sell_asset, t_buy, buy_asset)?;
                self.book.insert_sorted(id, pos)?;
                self.events.push(MarketEvent::Sorted { id });
                debug!(id, t_sell, t_buy, "residual offer rested");
                return Ok(Some(id));
            }
            return Ok(None);
        }

        // The walk ran on escrowed funds: the residual's backing already
        // sits in the market account, and whatever it does not cover goes
        // back to the taker
        let rest = cmp::min(t_sell, escrow);
        let mut residual = None;
        if t_buy > 0 && rest > 0 && rest >= self.book.dust_limit(sell_asset) {
            let id = self.offer_funded(taker, rest, sell_asset, t_buy, buy_asset)?;
            self.book.insert_sorted(id, pos)?;
            self.events.push(MarketEvent::Sorted { id });
            debug!(id, rest, t_buy, "residual offer rested");
            escrow -= rest;
            residual = Some(id);
        }
        if escrow > 0 && !self.ledger.transfer(sell_asset, self.account, taker, escrow) {
            return Err(MarketError::TransferFailed);
        }
        Ok(residual)
    }

    // ========================================================================
    // Keeper operations
    // ========================================================================

    /// Promote a staged offer into the sorted index at `pos`.
    ///
    /// Anyone may call this; `keeper` is recorded for attribution. The
    /// offer must be active and staged.
    pub fn insert(&mut self, keeper: AccountId, id: OfferId, pos: Option<OfferId>) -> Result<()> {
        self.assert_unlocked()?;
        if !self.book.is_active(id) {
            return Err(MarketError::Inactive(id));
        }
        if !self.book.is_staged(id) {
            return Err(MarketError::NotStaged(id));
        }
        self.book.hide(id)?;
        self.book.insert_sorted(id, pos)?;
        self.events.push(MarketEvent::Inserted { id, keeper });
        self.events.push(MarketEvent::Sorted { id });
        debug!(id, keeper, "staged offer inserted");
        Ok(())
    }

    /// Purge a stale tombstoned rank node once its grace window elapsed.
    pub fn del_rank(&mut self, id: OfferId) -> Result<()> {
        self.assert_unlocked()?;
        self.book.purge_tombstone(id, self.height())?;
        self.events.push(MarketEvent::RankDeleted { id });
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

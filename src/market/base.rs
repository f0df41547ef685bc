//! Foundational trade layer: escrowed offer creation, taking, cancelling.
//!
//! ## Call model
//!
//! Each public entrypoint executes as one atomic unit: the host ledger
//! sequences calls, so there is no internal scheduling. A reentrancy flag
//! guards the foundational paths; the matching layer's entrypoints assert
//! it is clear but never raise it themselves, relying on this layer's
//! guard to catch reentry through a transfer callback.
//!
//! ## Escrow
//!
//! Creating an offer moves the sell amount into the market's own account.
//! A take routes the taker's payment through the market account as well,
//! so exactly one transfer per call can fail on funds: everything after it
//! spends balances the market already holds. The matching walk extends the
//! same discipline across multiple fills by escrowing the taker's full
//! commitment up front and settling every fill through the `_funded`
//! variants, which skip the taker-side transfer.

use tracing::debug;

use crate::book::Book;
use crate::error::{MarketError, Result};
use crate::market::traits::{Gatekeeper, Ledger};
use crate::oracle::PriceOracle;
use crate::types::price::{mul_div, BPS_DENOM, SCALE};
use crate::types::{AccountId, AssetId, MarketEvent, Offer, OfferId, Pair};

/// The continuous double-auction market.
///
/// Owns the order book, the oracle, configuration, the audit-event log,
/// the reentrancy flag and the transient dust-victim sentinel. Generic
/// over the host's asset ledger and authorization gate.
#[derive(Debug)]
pub struct Market<L: Ledger, G: Gatekeeper> {
    pub(crate) book: Book,
    pub(crate) oracle: PriceOracle,
    pub(crate) ledger: L,
    gate: G,

    /// The market's own (escrow) account
    pub(crate) account: AccountId,

    fee_bps: u64,
    fee_recipient: AccountId,
    pub(crate) matching_enabled: bool,
    buy_enabled: bool,

    /// Reentrancy flag for the foundational trade paths
    pub(crate) locked: bool,

    /// Id allowed to bypass the owner check in `cancel` for exactly the
    /// current call: the offer being auto-cancelled as dust
    dust_victim: Option<OfferId>,

    timestamp: u64,
    height: u64,

    pub(crate) events: Vec<MarketEvent>,
}

impl<L: Ledger, G: Gatekeeper> Market<L, G> {
    /// Create a market escrowing funds in `account`.
    ///
    /// Fees start at zero with the market account as recipient; matching
    /// and buying start enabled.
    pub fn new(ledger: L, gate: G, account: AccountId) -> Self {
        Self {
            book: Book::new(),
            oracle: PriceOracle::new(),
            ledger,
            gate,
            account,
            fee_bps: 0,
            fee_recipient: account,
            matching_enabled: true,
            buy_enabled: true,
            locked: false,
            dust_victim: None,
            timestamp: 0,
            height: 0,
            events: Vec::new(),
        }
    }

    /// Advance host time and height; called by the host between calls.
    pub fn advance_to(&mut self, timestamp: u64, height: u64) {
        self.timestamp = timestamp;
        self.height = height;
    }

    /// Current host timestamp
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Current host height
    #[inline]
    pub fn height(&self) -> u64 {
        self.height
    }

    // ========================================================================
    // Reentrancy guard
    // ========================================================================

    /// Raise the reentrancy flag; fails when already raised.
    fn enter(&mut self) -> Result<()> {
        if self.locked {
            return Err(MarketError::Reentrancy);
        }
        self.locked = true;
        Ok(())
    }

    /// Outer (matching-layer) entrypoints check the flag without raising
    /// it; the inner paths they call do the raising.
    pub(crate) fn assert_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(MarketError::Reentrancy);
        }
        Ok(())
    }

    /// Whether the host gate has closed the market
    pub(crate) fn gate_closed(&self) -> bool {
        self.gate.is_closed()
    }

    /// Whether takes are currently allowed
    pub(crate) fn buying_enabled(&self) -> bool {
        self.buy_enabled
    }

    // ========================================================================
    // Foundational entrypoints
    // ========================================================================

    /// Create a plain offer: escrow the sell amount and store it, neither
    /// ranked nor staged. The matching layer builds its variants on this.
    pub(crate) fn offer_base(
        &mut self,
        owner: AccountId,
        sell_amount: u64,
        sell_asset: AssetId,
        buy_amount: u64,
        buy_asset: AssetId,
    ) -> Result<OfferId> {
        self.enter()?;
        let out = self.create_locked(owner, sell_amount, sell_asset, buy_amount, buy_asset, false);
        self.locked = false;
        out
    }

    /// Create an offer whose sell amount the market account already holds.
    ///
    /// Used by the matching walk to rest a residual out of the taker's
    /// up-front escrow without transferring twice.
    pub(crate) fn offer_funded(
        &mut self,
        owner: AccountId,
        sell_amount: u64,
        sell_asset: AssetId,
        buy_amount: u64,
        buy_asset: AssetId,
    ) -> Result<OfferId> {
        self.enter()?;
        let out = self.create_locked(owner, sell_amount, sell_asset, buy_amount, buy_asset, true);
        self.locked = false;
        out
    }

    /// Accept `quantity` of an active offer's sell amount.
    ///
    /// Works on any active offer, ranked or staged. Pays the maker the
    /// proportional buy amount less the fee, releases escrow to the taker,
    /// shrinks or removes the offer, feeds the oracle and sweeps dust.
    pub fn buy(&mut self, taker: AccountId, id: OfferId, quantity: u64) -> Result<()> {
        self.enter()?;
        let out = self.buy_locked(taker, id, quantity, false);
        self.locked = false;
        out
    }

    /// Take an offer paying out of funds the market account already holds.
    ///
    /// The matching walk escrows the taker's whole commitment before its
    /// first fill; each fill then settles from that escrow, so no transfer
    /// inside the walk can fail on taker funds.
    pub(crate) fn buy_funded(&mut self, taker: AccountId, id: OfferId, quantity: u64) -> Result<()> {
        self.enter()?;
        let out = self.buy_locked(taker, id, quantity, true);
        self.locked = false;
        out
    }

    /// Cancel an active offer, refunding the remaining escrow exactly.
    ///
    /// Only the owner may cancel, unless the market has closed or the
    /// offer is the current call's dust victim.
    pub fn cancel(&mut self, caller: AccountId, id: OfferId) -> Result<()> {
        self.enter()?;
        let out = self.cancel_locked(caller, id);
        self.locked = false;
        out
    }

    // ========================================================================
    // Locked implementations
    // ========================================================================

    fn create_locked(
        &mut self,
        owner: AccountId,
        sell_amount: u64,
        sell_asset: AssetId,
        buy_amount: u64,
        buy_asset: AssetId,
        funded: bool,
    ) -> Result<OfferId> {
        if self.gate.is_closed() {
            return Err(MarketError::Closed);
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

        if !funded
            && !self
                .ledger
                .transfer(sell_asset, owner, self.account, sell_amount)
        {
            return Err(MarketError::TransferFailed);
        }

        let id = self
            .book
            .create(owner, sell_amount, sell_asset, buy_amount, buy_asset, self.timestamp);
        self.events.push(MarketEvent::OfferCreated {
            id,
            owner,
            sell_amount,
            sell_asset,
            buy_amount,
            buy_asset,
        });
        debug!(id, owner, sell_amount, buy_amount, "offer created");
        Ok(id)
    }

    fn buy_locked(&mut self, taker: AccountId, id: OfferId, quantity: u64, funded: bool) -> Result<()> {
        if self.gate.is_closed() {
            return Err(MarketError::Closed);
        }
        if !self.buy_enabled {
            return Err(MarketError::BuyDisabled);
        }
        let offer = self.book.offer(id).cloned().ok_or(MarketError::Inactive(id))?;
        if quantity == 0 {
            return Err(MarketError::ZeroAmount);
        }
        if quantity > offer.sell_amount {
            return Err(MarketError::ExcessQuantity(id));
        }

        let spend = mul_div(quantity, offer.buy_amount, offer.sell_amount)
            .ok_or(MarketError::Overflow)?;
        if spend == 0 {
            return Err(MarketError::ZeroAmount);
        }
        let fee = mul_div(spend, self.fee_bps, BPS_DENOM).ok_or(MarketError::Overflow)?;

        // Route the taker's payment through the market account so the
        // first transfer is the only one that can fail on funds; a funded
        // take already holds the payment there
        if !funded && !self.ledger.transfer(offer.buy_asset, taker, self.account, spend) {
            return Err(MarketError::TransferFailed);
        }
        if !self
            .ledger
            .transfer(offer.buy_asset, self.account, offer.owner, spend - fee)
        {
            return Err(MarketError::TransferFailed);
        }
        if fee > 0
            && !self
                .ledger
                .transfer(offer.buy_asset, self.account, self.fee_recipient, fee)
        {
            return Err(MarketError::TransferFailed);
        }
        if !self
            .ledger
            .transfer(offer.sell_asset, self.account, taker, quantity)
        {
            return Err(MarketError::TransferFailed);
        }

        // Oracle observation at the pre-fill offer price
        if let Some(price) = mul_div(offer.buy_amount, SCALE, offer.sell_amount) {
            self.oracle
                .record(offer.pair(), price, quantity, spend, self.timestamp);
        }

        self.events.push(MarketEvent::Trade {
            id,
            maker: offer.owner,
            taker,
            sell_asset: offer.sell_asset,
            buy_asset: offer.buy_asset,
            quantity,
            spend,
        });
        if fee > 0 {
            self.events.push(MarketEvent::FeeCharged {
                id,
                taker,
                recipient: self.fee_recipient,
                asset: offer.buy_asset,
                amount: fee,
            });
        }
        debug!(id, taker, quantity, spend, fee, "offer taken");

        if quantity == offer.sell_amount {
            // Fully filled: retire the offer
            if self.book.is_ranked(id) {
                self.book.unsort(id, self.height)?;
                self.events.push(MarketEvent::Unsorted { id });
            } else if self.book.is_staged(id) {
                self.book.hide(id)?;
            }
            self.book.remove(id);
        } else {
            let (sell_rem, buy_rem) = self.book.apply_fill(id, quantity, spend)?;
            self.events.push(MarketEvent::OfferBumped {
                id,
                sell_amount: sell_rem,
                buy_amount: buy_rem,
            });

            // Dust sweep: remainders below the floor are auto-cancelled
            // and refunded within the same call
            if sell_rem < self.book.dust_limit(offer.sell_asset) {
                self.dust_victim = Some(id);
                let swept = self.cancel_locked(taker, id);
                self.dust_victim = None;
                swept?;
            }
        }
        Ok(())
    }

    fn cancel_locked(&mut self, caller: AccountId, id: OfferId) -> Result<()> {
        let offer = self.book.offer(id).cloned().ok_or(MarketError::Inactive(id))?;

        let may_cancel =
            caller == offer.owner || self.gate.is_closed() || self.dust_victim == Some(id);
        if !may_cancel {
            return Err(MarketError::NotOwner(id));
        }

        if self.book.is_ranked(id) {
            self.book.unsort(id, self.height)?;
            self.events.push(MarketEvent::Unsorted { id });
        } else if self.book.is_staged(id) {
            self.book.hide(id)?;
        }

        if !self
            .ledger
            .transfer(offer.sell_asset, self.account, offer.owner, offer.sell_amount)
        {
            return Err(MarketError::TransferFailed);
        }

        self.book.remove(id);
        self.events.push(MarketEvent::OfferCancelled {
            id,
            owner: offer.owner,
            refund: offer.sell_amount,
        });
        debug!(id, caller, refund = offer.sell_amount, "offer cancelled");
        Ok(())
    }

    // ========================================================================
    // Administrative setters
    // ========================================================================

    fn authorize(&self, caller: AccountId) -> Result<()> {
        if !self.gate.is_authorized(caller) {
            return Err(MarketError::Unauthorized);
        }
        Ok(())
    }

    /// Set the fee rate in basis points of the buy-side amount
    pub fn set_fee_rate(&mut self, caller: AccountId, bps: u64) -> Result<()> {
        self.authorize(caller)?;
        if bps >= BPS_DENOM {
            return Err(MarketError::Overflow);
        }
        self.fee_bps = bps;
        self.events.push(MarketEvent::FeeRateSet { bps });
        Ok(())
    }

    /// Set the account fees are paid to
    pub fn set_fee_recipient(&mut self, caller: AccountId, recipient: AccountId) -> Result<()> {
        self.authorize(caller)?;
        self.fee_recipient = recipient;
        self.events.push(MarketEvent::FeeRecipientSet { recipient });
        Ok(())
    }

    /// Enable or disable the matching engine (minimal offers fall back to
    /// plain unranked offers while disabled)
    pub fn set_matching_enabled(&mut self, caller: AccountId, enabled: bool) -> Result<()> {
        self.authorize(caller)?;
        self.matching_enabled = enabled;
        self.events.push(MarketEvent::MatchingToggled { enabled });
        Ok(())
    }

    /// Enable or disable taking offers
    pub fn set_buy_enabled(&mut self, caller: AccountId, enabled: bool) -> Result<()> {
        self.authorize(caller)?;
        self.buy_enabled = enabled;
        self.events.push(MarketEvent::BuyToggled { enabled });
        Ok(())
    }

    /// Set the minimum sell amount for offers selling `asset`
    pub fn set_dust_limit(&mut self, caller: AccountId, asset: AssetId, limit: u64) -> Result<()> {
        self.authorize(caller)?;
        self.book.set_dust(asset, limit);
        self.events.push(MarketEvent::DustLimitSet { asset, limit });
        Ok(())
    }

    // ========================================================================
    // Read-only accessors
    // ========================================================================

    /// The order book
    #[inline]
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// The host ledger
    #[inline]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// An active offer by id
    #[inline]
    pub fn get_offer(&self, id: OfferId) -> Option<&Offer> {
        self.book.offer(id)
    }

    /// Best offer of a pair
    #[inline]
    pub fn best_offer(&self, pair: Pair) -> Option<OfferId> {
        self.book.best(pair)
    }

    /// Live sorted depth of a pair
    #[inline]
    pub fn depth(&self, pair: Pair) -> u64 {
        self.book.depth(pair)
    }

    /// Dust floor of an asset
    #[inline]
    pub fn dust_limit(&self, asset: AssetId) -> u64 {
        self.book.dust_limit(asset)
    }

    /// Current fee rate in basis points
    #[inline]
    pub fn fee_rate(&self) -> u64 {
        self.fee_bps
    }

    /// Time-weighted average price over the trailing `age` window
    pub fn twap(&self, pair: Pair, age: u64) -> Result<u64> {
        self.oracle.twap(pair, self.timestamp, age)
    }

    /// Volume-weighted average price over the trailing `age` window
    pub fn vwap(&self, pair: Pair, age: u64) -> Result<u64> {
        self.oracle.vwap(pair, self.timestamp, age)
    }

    /// Blended average price; see [`PriceOracle::awap`]
    pub fn awap(&self, pair: Pair, age: u64, weight: u64) -> Result<u64> {
        self.oracle.awap(pair, self.timestamp, age, weight)
    }

    /// Audit-event log since the last drain
    #[inline]
    pub fn events(&self) -> &[MarketEvent] {
        &self.events
    }

    /// Hand the buffered audit events to an indexer
    pub fn drain_events(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.events)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

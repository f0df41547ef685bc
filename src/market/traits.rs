//! Collaborator seams: asset ledger and authorization gate.
//!
//! The market consumes these at its boundary and specifies nothing about
//! their internals. Both are expected to fail loudly: a `false` return
//! from a transfer aborts the whole call.

use std::collections::HashMap;

use crate::types::price::checked_add;
use crate::types::{AccountId, AssetId};

/// Asset transfer capability supplied by the host.
///
/// The market escrows sell amounts in its own account, so the only
/// primitive it needs is a third-party transfer. Implementations must not
/// silently swallow failures.
pub trait Ledger {
    /// Move `amount` of `asset` from `from` to `to`; true on success
    fn transfer(&mut self, asset: AssetId, from: AccountId, to: AccountId, amount: u64) -> bool;
}

/// Authorization and market-lifetime gate.
pub trait Gatekeeper {
    /// May `account` perform administrative mutations?
    fn is_authorized(&self, account: AccountId) -> bool;

    /// Is the market closed to new offers and buys? Always false in this
    /// variant; hosts may override.
    fn is_closed(&self) -> bool {
        false
    }
}

// ============================================================================
// Reference implementations
// ============================================================================

/// In-memory balance ledger for tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: HashMap<(AssetId, AccountId), u64>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `account` with `amount` of `asset`
    pub fn deposit(&mut self, asset: AssetId, account: AccountId, amount: u64) {
        *self.balances.entry((asset, account)).or_insert(0) += amount;
    }

    /// Current balance of `account` in `asset`
    pub fn balance_of(&self, asset: AssetId, account: AccountId) -> u64 {
        self.balances.get(&(asset, account)).copied().unwrap_or(0)
    }
}

impl Ledger for MemoryLedger {
    fn transfer(&mut self, asset: AssetId, from: AccountId, to: AccountId, amount: u64) -> bool {
        if amount == 0 {
            return true;
        }
        let src = self.balances.get(&(asset, from)).copied().unwrap_or(0);
        if src < amount {
            return false;
        }
        if from == to {
            return true;
        }
        let dst = self.balances.get(&(asset, to)).copied().unwrap_or(0);
        // Refuse rather than wrap when the credit would overflow
        let Some(credited) = checked_add(dst, amount) else {
            return false;
        };
        self.balances.insert((asset, from), src - amount);
        self.balances.insert((asset, to), credited);
        true
    }
}

/// Gate with a single administrative account and a market that never
/// closes.
#[derive(Debug, Clone, Copy)]
pub struct SingleAdmin {
    admin: AccountId,
}

impl SingleAdmin {
    /// Gate administered by `admin`
    pub fn new(admin: AccountId) -> Self {
        Self { admin }
    }
}

impl Gatekeeper for SingleAdmin {
    fn is_authorized(&self, account: AccountId) -> bool {
        account == self.admin
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_ledger_transfer() {
        let mut ledger = MemoryLedger::new();
        ledger.deposit(1, 10, 500);

        assert!(ledger.transfer(1, 10, 20, 200));
        assert_eq!(ledger.balance_of(1, 10), 300);
        assert_eq!(ledger.balance_of(1, 20), 200);
    }

    #[test]
    fn test_memory_ledger_insufficient_balance_fails_loudly() {
        let mut ledger = MemoryLedger::new();
        ledger.deposit(1, 10, 100);

        assert!(!ledger.transfer(1, 10, 20, 200));
        // Nothing moved
        assert_eq!(ledger.balance_of(1, 10), 100);
        assert_eq!(ledger.balance_of(1, 20), 0);
    }

    #[test]
    fn test_memory_ledger_zero_transfer_is_noop() {
        let mut ledger = MemoryLedger::new();
        assert!(ledger.transfer(1, 10, 20, 0));
    }

    #[test]
    fn test_memory_ledger_refuses_overflowing_credit() {
        let mut ledger = MemoryLedger::new();
        ledger.deposit(1, 10, 500);
        ledger.deposit(1, 20, u64::MAX);

        assert!(!ledger.transfer(1, 10, 20, 500));
        // Nothing moved
        assert_eq!(ledger.balance_of(1, 10), 500);
        assert_eq!(ledger.balance_of(1, 20), u64::MAX);
    }

    #[test]
    fn test_memory_ledger_self_transfer_is_noop() {
        let mut ledger = MemoryLedger::new();
        ledger.deposit(1, 10, 100);

        assert!(ledger.transfer(1, 10, 10, 100));
        assert!(!ledger.transfer(1, 10, 10, 101));
        assert_eq!(ledger.balance_of(1, 10), 100);
    }

    #[test]
    fn test_single_admin_gate() {
        let gate = SingleAdmin::new(42);
        assert!(gate.is_authorized(42));
        assert!(!gate.is_authorized(43));
        assert!(!gate.is_closed());
    }
}

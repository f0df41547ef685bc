//! Market layer: trade execution, matching, fees, administration.
//!
//! Split in two tiers over the same [`Market`] struct:
//! - `base`: foundational offer creation, `buy` and `cancel`, each
//!   guarded by the reentrancy flag
//! - `matching`: the crossing walk and keeper operations, layered on the
//!   foundational paths

pub mod base;
pub mod matching;
pub mod traits;

pub use base::Market;
pub use traits::{Gatekeeper, Ledger, MemoryLedger, SingleAdmin};

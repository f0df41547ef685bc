//! Order store and pair-keyed sorted index.
//!
//! ## Architecture
//!
//! - **Slab-backed store**: offers in an arena, addressed by monotonically
//!   increasing identifiers that are never reused
//! - **Sorted index**: one doubly linked list per `(sell, buy)` pair,
//!   price-ordered with oldest-first ties, maintained under insert, cancel
//!   and partial-fill mutation
//! - **Unsorted staging list**: offers whose caller could not compute a
//!   price rank, awaiting keeper insertion
//! - **Tombstones**: two-phase removal (logical unlink, physical reclaim
//!   after a grace window)
//!
//! ## Complexity
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | Create / remove / lookup by id | O(1) |
//! | Insert sorted, usable hint | O(k) local walk |
//! | Insert sorted, no hint | O(n) scan from best |
//! | Unsort / best lookup | O(1) |
//! | Stage | O(1) |
//! | Hide | O(staging length) |

pub mod index;
pub mod node;
pub mod store;

pub use node::{OfferNode, RankNode};
pub use store::{Book, TOMBSTONE_GRACE};

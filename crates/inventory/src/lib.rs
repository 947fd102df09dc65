//! The authoritative stock ledger.
//!
//! All stock mutation in the service funnels through [`InventoryLedger`].
//! Reservation is a single atomic compare-and-decrement against the product
//! document; a read-then-write pair is unsafe under concurrent checkout of
//! the same product and is never used.

pub mod ledger;

pub use ledger::{AdjustOp, Adjustment, InventoryLedger, LedgerStats, StockLevel};

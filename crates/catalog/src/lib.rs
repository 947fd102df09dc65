//! Products and their stock records.
//!
//! The catalog is deliberately thin: the product document carries the stock
//! record, but every stock mutation goes through the inventory ledger. This
//! crate only owns the shape of the data and the pure availability rules.

pub mod product;

pub use product::{Availability, Product, StockRecord, Variation};

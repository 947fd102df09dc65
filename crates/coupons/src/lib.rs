//! Coupon validation and discount pricing.
//!
//! Validation is a pure read (safe for live cart re-pricing); redemption,
//! the `used_count` increment, is a separate atomic conditional write that
//! only order creation performs.

pub mod coupon;
pub mod engine;

pub use coupon::{Coupon, Discount};
pub use engine::{CouponEngine, CouponError, CustomerUsage, Quote};

//! The order lifecycle.
//!
//! [`Order`] is the document and carries the state machine; [`OrderWorkflow`]
//! is the service that drives it, reserving stock all-or-nothing on creation
//! and releasing it on cancellation and completed returns.

pub mod number;
pub mod order;
pub mod workflow;

pub use order::{
    CancelledBy, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ReturnDecision,
    ReturnStatus, ReturnType, TrackingEntry,
};
pub use workflow::{CheckoutItem, CheckoutRequest, OrderCouponUsage, OrderWorkflow};

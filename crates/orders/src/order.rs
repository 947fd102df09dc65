use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CustomerId, DomainError, DomainResult, Entity, OrderId, ProductId};

/// Lifecycle state of an order.
///
/// `cancelled` and `returned` are terminal; there are no backward
/// transitions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }

    /// The full transition table. Only adjacent forward hops and the two
    /// cancellation edges exist; `delivered -> returned` is reachable solely
    /// through the return sub-flow.
    pub fn can_transition(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Returned)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Card,
    Wallet,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    /// Goods come back and stock is restored on completion.
    Return,
    /// A replacement ships out; net stock does not change.
    Exchange,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

/// Outcome of a back-office review of a pending return request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnDecision {
    Approved,
    Rejected,
}

/// Who cancelled an order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Customer,
    Admin,
}

/// One order line. Prices are snapshots taken at checkout, in the currency's
/// smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variation_selector: Option<String>,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
}

impl OrderItem {
    pub fn new(
        product_id: ProductId,
        variation_selector: Option<String>,
        quantity: u32,
        unit_price: u64,
    ) -> Self {
        Self {
            product_id,
            variation_selector,
            quantity,
            unit_price,
            line_total: unit_price * u64::from(quantity),
        }
    }
}

/// Append-only shipment tracking entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEntry {
    pub status: OrderStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Order document.
///
/// Orders are never deleted; the totals satisfy
/// `total = subtotal + shipping_cost + vat - discount` at all times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    /// `None` for guest checkout.
    pub customer_id: Option<CustomerId>,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Coupon referenced by normalized code, not by id.
    pub coupon_code: Option<String>,
    pub shipping_address: String,
    pub subtotal: u64,
    pub shipping_cost: u64,
    pub vat: u64,
    pub discount: u64,
    pub total: u64,
    pub return_type: Option<ReturnType>,
    pub return_status: Option<ReturnStatus>,
    pub return_reason: Option<String>,
    pub tracking_history: Vec<TrackingEntry>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<CancelledBy>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Assemble a freshly placed order. Stock reservation and coupon
    /// redemption have already happened by the time this runs; it only
    /// validates its own inputs and computes the total.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        order_number: String,
        customer_id: Option<CustomerId>,
        items: Vec<OrderItem>,
        payment_method: PaymentMethod,
        coupon_code: Option<String>,
        shipping_address: String,
        shipping_cost: u64,
        vat: u64,
        discount: u64,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("an order needs at least one item"));
        }
        if shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping address cannot be empty"));
        }
        let subtotal: u64 = items.iter().map(|i| i.line_total).sum();
        if discount > subtotal {
            return Err(DomainError::validation(
                "discount cannot exceed the order subtotal",
            ));
        }

        let now = Utc::now();
        let mut order = Self {
            id: OrderId::new(),
            order_number,
            customer_id,
            items,
            status: OrderStatus::Pending,
            payment_method,
            payment_status: PaymentStatus::Pending,
            coupon_code,
            shipping_address,
            subtotal,
            shipping_cost,
            vat,
            discount,
            total: subtotal + shipping_cost + vat - discount,
            return_type: None,
            return_status: None,
            return_reason: None,
            tracking_history: Vec::new(),
            cancelled_at: None,
            cancelled_by: None,
            delivered_at: None,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        order.append_tracking("Order placed");
        Ok(order)
    }

    /// Append a tracking entry for the order's current status.
    pub fn append_tracking(&mut self, message: impl Into<String>) {
        self.tracking_history.push(TrackingEntry {
            status: self.status,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &OrderId {
        &self.id
    }
}

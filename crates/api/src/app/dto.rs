use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use storefront_catalog::Product;
use storefront_coupons::{Coupon, Discount};
use storefront_core::ProductId;
use storefront_inventory::{Adjustment, LedgerStats, StockLevel};
use storefront_orders::{Order, OrderStatus, ReturnDecision, ReturnType, TrackingEntry};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: String,
    pub regular_price: u64,
    pub sale_price: Option<u64>,
    #[serde(default)]
    pub initial_stock: u32,
    #[serde(default)]
    pub low_stock_alert: u32,
    #[serde(default)]
    pub variations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub total_stock: Option<u32>,
    pub low_stock_alert: Option<u32>,
    pub availability: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub action: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateCouponRequest {
    pub code: String,
    pub discount: Discount,
    #[serde(default)]
    pub min_purchase_amount: u64,
    pub usage_limit: Option<u64>,
    pub usage_limit_per_user: Option<u64>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SetCouponEnabledRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal: u64,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub return_type: ReturnType,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewReturnRequest {
    pub decision: ReturnDecision,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(product: &Product) -> Value {
    json!({
        "id": product.id.to_string(),
        "name": product.name,
        "slug": product.slug,
        "regular_price": product.regular_price,
        "sale_price": product.sale_price,
        "published": product.published,
        "variations": product.variations.iter().map(|v| json!({
            "id": v.id.to_string(),
            "selector": v.selector,
        })).collect::<Vec<_>>(),
        "stock": {
            "total_stock": product.stock.total_stock,
            "low_stock_alert": product.stock.low_stock_alert,
            "availability": product.stock.availability.as_str(),
        },
        "created_at": product.created_at.to_rfc3339(),
        "updated_at": product.updated_at.to_rfc3339(),
    })
}

pub fn stock_to_json(product_id: ProductId, level: StockLevel) -> Value {
    json!({
        "product_id": product_id.to_string(),
        "total_stock": level.total_stock,
        "low_stock_alert": level.low_stock_alert,
        "availability": level.availability.as_str(),
    })
}

pub fn adjustment_to_json(product: &Product, adjustment: Adjustment) -> Value {
    json!({
        "product": product_to_json(product),
        "previous_stock": adjustment.previous_stock,
        "new_stock": adjustment.new_stock,
    })
}

pub fn stats_to_json(stats: LedgerStats) -> Value {
    json!({
        "in_stock": stats.in_stock,
        "low_stock": stats.low_stock,
        "out_of_stock": stats.out_of_stock,
        "total_units": stats.total_units,
        "total_value": stats.total_value,
    })
}

pub fn order_to_json(order: &Order) -> Value {
    json!({
        "id": order.id.to_string(),
        "order_number": order.order_number,
        "customer_id": order.customer_id.map(|id| id.to_string()),
        "items": order.items.iter().map(|i| json!({
            "product_id": i.product_id.to_string(),
            "variation_selector": i.variation_selector,
            "quantity": i.quantity,
            "unit_price": i.unit_price,
            "line_total": i.line_total,
        })).collect::<Vec<_>>(),
        "status": order.status.as_str(),
        "payment_method": order.payment_method,
        "payment_status": order.payment_status,
        "coupon_code": order.coupon_code,
        "shipping_address": order.shipping_address,
        "subtotal": order.subtotal,
        "shipping_cost": order.shipping_cost,
        "vat": order.vat,
        "discount": order.discount,
        "total": order.total,
        "return_type": order.return_type,
        "return_status": order.return_status,
        "return_reason": order.return_reason,
        "cancelled_at": order.cancelled_at.map(|t| t.to_rfc3339()),
        "cancelled_by": order.cancelled_by,
        "delivered_at": order.delivered_at.map(|t| t.to_rfc3339()),
        "created_at": order.created_at.to_rfc3339(),
        "updated_at": order.updated_at.to_rfc3339(),
    })
}

pub fn tracking_to_json(status: OrderStatus, history: &[TrackingEntry]) -> Value {
    json!({
        "status": status.as_str(),
        "tracking_history": history.iter().map(|e| json!({
            "status": e.status.as_str(),
            "message": e.message,
            "timestamp": e.timestamp.to_rfc3339(),
        })).collect::<Vec<_>>(),
    })
}

pub fn coupon_to_json(coupon: &Coupon) -> Value {
    json!({
        "id": coupon.id.to_string(),
        "code": coupon.code,
        "discount": coupon.discount,
        "min_purchase_amount": coupon.min_purchase_amount,
        "usage_limit": coupon.usage_limit,
        "usage_limit_per_user": coupon.usage_limit_per_user,
        "used_count": coupon.used_count,
        "starts_at": coupon.starts_at.to_rfc3339(),
        "ends_at": coupon.ends_at.to_rfc3339(),
        "enabled": coupon.enabled,
        "created_at": coupon.created_at.to_rfc3339(),
    })
}

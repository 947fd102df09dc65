use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use storefront_auth::Actor;
use storefront_catalog::Product;
use storefront_core::{CustomerId, DomainError, DomainResult, OrderId, ProductId};
use storefront_coupons::{Coupon, CouponEngine, CustomerUsage};
use storefront_inventory::InventoryLedger;
use storefront_store::{Collection, SequenceProvider};

use crate::number;
use crate::order::{
    CancelledBy, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ReturnDecision,
    ReturnStatus, ReturnType, TrackingEntry,
};

/// One checkout line as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub variation_selector: Option<String>,
    pub quantity: u32,
}

/// Checkout submission. Shipping cost and VAT are computed upstream (carrier
/// and tax tables are external collaborators) and arrive as amounts in the
/// currency's smallest unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub shipping_cost: u64,
    #[serde(default)]
    pub vat: u64,
}

/// Per-customer coupon usage, counted over the customer's non-cancelled
/// orders carrying the code. The order collection is the source of truth;
/// cancelling an order frees the per-customer slot.
#[derive(Debug, Clone)]
pub struct OrderCouponUsage<O> {
    orders: O,
}

impl<O> OrderCouponUsage<O> {
    pub fn new(orders: O) -> Self {
        Self { orders }
    }
}

impl<O> CustomerUsage for OrderCouponUsage<O>
where
    O: Collection<Order>,
{
    fn redemption_count(&self, code: &str, customer: CustomerId) -> u64 {
        self.orders.count(|o| {
            o.customer_id == Some(customer)
                && o.coupon_code.as_deref() == Some(code)
                && o.status != OrderStatus::Cancelled
        }) as u64
    }
}

/// The order lifecycle service.
///
/// Owns the only code paths that move stock and coupon counters together:
/// creation reserves per line all-or-nothing, cancellation and completed
/// returns release. Every state flip happens inside a single conditional
/// store update, so concurrent callers cannot double-release.
#[derive(Clone)]
pub struct OrderWorkflow<P, O, C> {
    products: P,
    orders: O,
    ledger: InventoryLedger<P>,
    coupons: CouponEngine<C, OrderCouponUsage<O>>,
    sequences: Arc<dyn SequenceProvider>,
}

impl<P, O, C> OrderWorkflow<P, O, C>
where
    P: Collection<Product> + Clone,
    O: Collection<Order> + Clone,
    C: Collection<Coupon>,
{
    pub fn new(products: P, orders: O, coupons: C, sequences: Arc<dyn SequenceProvider>) -> Self {
        let ledger = InventoryLedger::new(products.clone());
        let coupons = CouponEngine::new(coupons, OrderCouponUsage::new(orders.clone()));
        Self {
            products,
            orders,
            ledger,
            coupons,
            sequences,
        }
    }

    pub fn ledger(&self) -> &InventoryLedger<P> {
        &self.ledger
    }

    pub fn coupons(&self) -> &CouponEngine<C, OrderCouponUsage<O>> {
        &self.coupons
    }

    /// Place an order.
    ///
    /// Validation and pricing happen before any stock moves; reservation is
    /// per line with compensating releases, so a shortfall on line N undoes
    /// lines 1..N and reports the failing product. On any later failure the
    /// reservations and the coupon redemption are unwound, leaving no net
    /// stock change.
    pub fn create(&self, req: CheckoutRequest, actor: &Actor) -> DomainResult<Order> {
        if req.items.is_empty() {
            return Err(DomainError::validation("an order needs at least one item"));
        }
        if req.shipping_address.trim().is_empty() {
            return Err(DomainError::validation("shipping address cannot be empty"));
        }

        let mut items = Vec::with_capacity(req.items.len());
        for line in &req.items {
            if line.quantity == 0 {
                return Err(DomainError::validation("item quantity must be at least 1"));
            }
            let product = self
                .products
                .get(&line.product_id)
                .filter(|p| p.published)
                .ok_or_else(|| DomainError::not_found("product"))?;
            if let Some(selector) = &line.variation_selector {
                if !product.has_variation(selector) {
                    return Err(DomainError::validation(format!(
                        "product '{}' has no variation '{selector}'",
                        product.slug
                    )));
                }
            }
            items.push(OrderItem::new(
                line.product_id,
                line.variation_selector.clone(),
                line.quantity,
                product.unit_price(),
            ));
        }
        let subtotal: u64 = items.iter().map(|i| i.line_total).sum();

        // Price the coupon before touching stock; redemption comes after the
        // reservations succeed.
        let discount = match &req.coupon_code {
            Some(code) => {
                self.coupons
                    .validate(code, subtotal, actor.customer_id(), Utc::now())?
                    .discount_amount
            }
            None => 0,
        };

        let mut reserved: Vec<(ProductId, u32)> = Vec::new();
        for item in &items {
            if let Err(err) = self.ledger.reserve(item.product_id, item.quantity) {
                self.unwind(&reserved, None);
                return Err(err);
            }
            reserved.push((item.product_id, item.quantity));
        }

        let coupon_code = match req.coupon_code {
            Some(code) => match self.coupons.redeem(&code) {
                Ok(coupon) => Some(coupon.code),
                Err(err) => {
                    self.unwind(&reserved, None);
                    return Err(err.into());
                }
            },
            None => None,
        };

        let today = Utc::now().date_naive();
        let sequence = self.sequences.next(&number::sequence_key(today));
        let order = match Order::place(
            number::order_number(today, sequence),
            actor.customer_id(),
            items,
            req.payment_method,
            coupon_code.clone(),
            req.shipping_address,
            req.shipping_cost,
            req.vat,
            discount,
        ) {
            Ok(order) => order,
            Err(err) => {
                self.unwind(&reserved, coupon_code.as_deref());
                return Err(err);
            }
        };

        if let Err(err) = self.orders.insert(order.clone()) {
            self.unwind(&reserved, coupon_code.as_deref());
            return Err(DomainError::internal(err.to_string()));
        }

        tracing::info!(
            order_number = %order.order_number,
            items = order.items.len(),
            total = order.total,
            "order placed"
        );
        Ok(order)
    }

    fn unwind(&self, reserved: &[(ProductId, u32)], coupon_code: Option<&str>) {
        // Release in reverse; a release can only fail if the product was
        // deleted meanwhile, in which case its stock record is gone anyway.
        for (product_id, quantity) in reserved.iter().rev() {
            let _ = self.ledger.release(*product_id, *quantity);
        }
        if let Some(code) = coupon_code {
            self.coupons.release_redemption(code);
        }
    }

    /// Fetch one order, enforcing ownership. Guest orders are visible to
    /// admins only.
    pub fn get(&self, order_id: OrderId, actor: &Actor) -> DomainResult<Order> {
        let order = self
            .orders
            .get(&order_id)
            .ok_or_else(|| DomainError::not_found("order"))?;
        if !actor.owns(order.customer_id) {
            return Err(DomainError::forbidden("you do not own this order"));
        }
        Ok(order)
    }

    /// Orders visible to the actor: everything for admins, own orders for
    /// customers, nothing for guests.
    pub fn list_for(&self, actor: &Actor) -> Vec<Order> {
        if actor.is_admin() {
            return self.orders.list();
        }
        match actor.customer_id() {
            Some(customer) => self.orders.find(|o| o.customer_id == Some(customer)),
            None => Vec::new(),
        }
    }

    /// Cancel a pending or processing order, releasing every line.
    ///
    /// The status flip is a conditional update; only the caller that wins it
    /// performs the releases, so stock comes back exactly once.
    pub fn cancel(
        &self,
        order_id: OrderId,
        actor: &Actor,
        reason: Option<String>,
    ) -> DomainResult<Order> {
        self.get(order_id, actor)?;

        let cancelled_by = if actor.is_admin() {
            CancelledBy::Admin
        } else {
            CancelledBy::Customer
        };
        let updated = self
            .orders
            .update(&order_id, |o| match o.status {
                OrderStatus::Cancelled => Err(DomainError::invalid_transition(
                    "order is already cancelled",
                )),
                OrderStatus::Returned => Err(DomainError::invalid_transition(
                    "a returned order cannot be cancelled",
                )),
                OrderStatus::Shipped => Err(DomainError::invalid_transition(
                    "a shipped order cannot be cancelled; contact support",
                )),
                OrderStatus::Delivered => Err(DomainError::invalid_transition(
                    "a delivered order cannot be cancelled; request a return instead",
                )),
                OrderStatus::Pending | OrderStatus::Processing => {
                    o.status = OrderStatus::Cancelled;
                    o.cancelled_at = Some(Utc::now());
                    o.cancelled_by = Some(cancelled_by);
                    if o.payment_status == PaymentStatus::Paid {
                        o.payment_status = PaymentStatus::Refunded;
                    }
                    if let Some(reason) = &reason {
                        o.notes.push(format!("Cancellation reason: {reason}"));
                    }
                    o.append_tracking("Order cancelled");
                    o.touch();
                    Ok(())
                }
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("order")))?;

        for item in &updated.items {
            let _ = self.ledger.release(item.product_id, item.quantity);
        }
        tracing::info!(order_number = %updated.order_number, "order cancelled");
        Ok(updated)
    }

    /// Admin fulfilment drive: advance the order one forward hop.
    pub fn update_status(&self, order_id: OrderId, new_status: OrderStatus) -> DomainResult<Order> {
        if matches!(new_status, OrderStatus::Cancelled | OrderStatus::Returned) {
            return Err(DomainError::validation(
                "use the cancellation or return flow for that status",
            ));
        }

        self.orders
            .update(&order_id, |o| {
                if !o.status.can_transition(new_status) {
                    return Err(DomainError::invalid_transition(format!(
                        "cannot move order from {} to {}",
                        o.status, new_status
                    )));
                }
                o.status = new_status;
                let message = match new_status {
                    OrderStatus::Processing => "Order confirmed and processing",
                    OrderStatus::Shipped => "Order shipped",
                    OrderStatus::Delivered => {
                        o.delivered_at = Some(Utc::now());
                        "Order delivered"
                    }
                    _ => "Order updated",
                };
                o.append_tracking(message);
                o.touch();
                Ok(())
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("order")))
    }

    /// Open a return request on a delivered order.
    pub fn request_return(
        &self,
        order_id: OrderId,
        actor: &Actor,
        return_type: ReturnType,
        reason: String,
    ) -> DomainResult<Order> {
        self.get(order_id, actor)?;
        if reason.trim().is_empty() {
            return Err(DomainError::validation("return reason cannot be empty"));
        }

        self.orders
            .update(&order_id, |o| {
                if o.status != OrderStatus::Delivered {
                    return Err(DomainError::invalid_transition(
                        "only delivered orders can be returned",
                    ));
                }
                if o.return_status.is_some() {
                    return Err(DomainError::conflict(
                        "a return has already been requested for this order",
                    ));
                }
                o.return_type = Some(return_type);
                o.return_status = Some(ReturnStatus::Pending);
                o.return_reason = Some(reason.clone());
                o.append_tracking("Return requested");
                o.touch();
                Ok(())
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("order")))
    }

    /// Withdraw a return request that has not been reviewed yet. No stock or
    /// payment effect.
    pub fn cancel_return_request(&self, order_id: OrderId, actor: &Actor) -> DomainResult<Order> {
        self.get(order_id, actor)?;

        self.orders
            .update(&order_id, |o| match o.return_status {
                Some(ReturnStatus::Pending) => {
                    o.return_type = None;
                    o.return_status = None;
                    o.return_reason = None;
                    o.append_tracking("Return request cancelled");
                    o.touch();
                    Ok(())
                }
                Some(_) => Err(DomainError::invalid_transition(
                    "the return request has already been reviewed",
                )),
                None => Err(DomainError::not_found("return request")),
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("order")))
    }

    /// Back-office review of a pending return request.
    pub fn review_return(&self, order_id: OrderId, decision: ReturnDecision) -> DomainResult<Order> {
        self.orders
            .update(&order_id, |o| {
                if o.return_status != Some(ReturnStatus::Pending) {
                    return Err(DomainError::invalid_transition(
                        "only a pending return request can be reviewed",
                    ));
                }
                let (status, message) = match decision {
                    ReturnDecision::Approved => (ReturnStatus::Approved, "Return request approved"),
                    ReturnDecision::Rejected => (ReturnStatus::Rejected, "Return request rejected"),
                };
                o.return_status = Some(status);
                o.append_tracking(message);
                o.touch();
                Ok(())
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("order")))
    }

    /// Close out an approved return. A `return` restores stock and moves the
    /// order to its terminal state; an `exchange` ships a replacement, so the
    /// net stock does not change and the order stays delivered.
    pub fn complete_return(&self, order_id: OrderId) -> DomainResult<Order> {
        let updated = self
            .orders
            .update(&order_id, |o| {
                if o.return_status != Some(ReturnStatus::Approved) {
                    return Err(DomainError::invalid_transition(
                        "only an approved return can be completed",
                    ));
                }
                o.return_status = Some(ReturnStatus::Completed);
                if o.return_type == Some(ReturnType::Return) {
                    o.status = OrderStatus::Returned;
                    if o.payment_status == PaymentStatus::Paid {
                        o.payment_status = PaymentStatus::Refunded;
                    }
                    o.append_tracking("Return completed; refund issued");
                } else {
                    o.append_tracking("Exchange completed");
                }
                o.touch();
                Ok(())
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("order")))?;

        if updated.return_type == Some(ReturnType::Return) {
            for item in &updated.items {
                let _ = self.ledger.release(item.product_id, item.quantity);
            }
        }
        Ok(updated)
    }

    /// Tracking history, ascending by timestamp, with an entry for the
    /// current status synthesized when the stored history lacks one.
    pub fn tracking(
        &self,
        order_id: OrderId,
        actor: &Actor,
    ) -> DomainResult<(OrderStatus, Vec<TrackingEntry>)> {
        let order = self.get(order_id, actor)?;
        let mut history = order.tracking_history.clone();
        history.sort_by_key(|e| e.timestamp);
        if !history.iter().any(|e| e.status == order.status) {
            history.push(TrackingEntry {
                status: order.status,
                message: format!("Order {}", order.status),
                timestamp: Utc::now(),
            });
        }
        Ok((order.status, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use storefront_auth::Role;
    use storefront_catalog::Variation;
    use storefront_coupons::{CouponError, Discount};
    use storefront_core::VariationId;
    use storefront_store::{InMemoryCollection, InMemorySequences};

    type Products = Arc<InMemoryCollection<Product>>;
    type Orders = Arc<InMemoryCollection<Order>>;
    type Coupons = Arc<InMemoryCollection<Coupon>>;
    type Workflow = OrderWorkflow<Products, Orders, Coupons>;

    struct Harness {
        workflow: Workflow,
        products: Products,
        orders: Orders,
        coupons: Coupons,
    }

    fn harness() -> Harness {
        let products: Products = Arc::new(InMemoryCollection::new());
        let orders: Orders = Arc::new(InMemoryCollection::new());
        let coupons: Coupons = Arc::new(InMemoryCollection::new());
        let workflow = OrderWorkflow::new(
            products.clone(),
            orders.clone(),
            coupons.clone(),
            Arc::new(InMemorySequences::new()),
        );
        Harness {
            workflow,
            products,
            orders,
            coupons,
        }
    }

    impl Harness {
        fn seed_product(&self, stock: u32, price: u64) -> ProductId {
            let product = Product::publish(
                format!("Product {stock}-{price}"),
                format!("product-{}", ProductId::new()),
                price,
                None,
                stock,
                2,
                Vec::new(),
            )
            .unwrap();
            let id = product.id;
            self.products.insert(product).unwrap();
            id
        }

        fn seed_coupon(&self, coupon: Coupon) {
            self.coupons.insert(coupon).unwrap();
        }

        fn stock_of(&self, id: ProductId) -> u32 {
            self.workflow.ledger().stock(id).unwrap().total_stock
        }

        fn mark_paid(&self, order_id: OrderId) {
            self.orders
                .update(&order_id, |o| {
                    o.payment_status = PaymentStatus::Paid;
                    Ok::<(), DomainError>(())
                })
                .ok()
                .unwrap();
        }

        fn deliver(&self, order_id: OrderId) {
            for status in [
                OrderStatus::Processing,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
            ] {
                self.workflow.update_status(order_id, status).unwrap();
            }
        }
    }

    fn checkout(items: &[(ProductId, u32)]) -> CheckoutRequest {
        CheckoutRequest {
            items: items
                .iter()
                .map(|(product_id, quantity)| CheckoutItem {
                    product_id: *product_id,
                    variation_selector: None,
                    quantity: *quantity,
                })
                .collect(),
            shipping_address: "1 Test Lane".to_string(),
            payment_method: PaymentMethod::Card,
            coupon_code: None,
            shipping_cost: 0,
            vat: 0,
        }
    }

    fn customer() -> Actor {
        Actor::authenticated(CustomerId::new(), vec![Role::new("customer")])
    }

    fn admin() -> Actor {
        Actor::authenticated(CustomerId::new(), vec![Role::admin()])
    }

    fn coupon(code: &str, discount: Discount) -> Coupon {
        let now = Utc::now();
        Coupon::new(
            code,
            discount,
            0,
            None,
            None,
            now - Duration::days(1),
            now + Duration::days(1),
        )
        .unwrap()
    }

    #[test]
    fn create_places_pending_order_and_decrements_stock() {
        let h = harness();
        let id = h.seed_product(10, 500);

        let order = h.workflow.create(checkout(&[(id, 3)]), &customer()).unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.subtotal, 1_500);
        assert_eq!(order.total, 1_500);
        assert_eq!(order.tracking_history[0].message, "Order placed");
        assert_eq!(h.stock_of(id), 7);
    }

    #[test]
    fn order_numbers_are_sequential_for_the_day() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();

        let first = h.workflow.create(checkout(&[(id, 1)]), &actor).unwrap();
        let second = h.workflow.create(checkout(&[(id, 1)]), &actor).unwrap();

        let prefix = format!("ORD-{}-", Utc::now().date_naive().format("%Y%m%d"));
        assert_eq!(first.order_number, format!("{prefix}0001"));
        assert_eq!(second.order_number, format!("{prefix}0002"));
    }

    #[test]
    fn sale_price_is_snapshotted_per_line() {
        let h = harness();
        let product = Product::publish("Sale", "sale", 1_000, Some(800), 5, 2, Vec::new()).unwrap();
        let id = product.id;
        h.products.insert(product).unwrap();

        let order = h.workflow.create(checkout(&[(id, 2)]), &customer()).unwrap();
        assert_eq!(order.items[0].unit_price, 800);
        assert_eq!(order.subtotal, 1_600);
    }

    #[test]
    fn unknown_and_unpublished_products_are_not_found() {
        let h = harness();
        assert_eq!(
            h.workflow
                .create(checkout(&[(ProductId::new(), 1)]), &customer())
                .unwrap_err(),
            DomainError::not_found("product")
        );

        let mut product = Product::publish("Draft", "draft", 100, None, 5, 2, Vec::new()).unwrap();
        product.published = false;
        let id = product.id;
        h.products.insert(product).unwrap();
        assert_eq!(
            h.workflow
                .create(checkout(&[(id, 1)]), &customer())
                .unwrap_err(),
            DomainError::not_found("product")
        );
    }

    #[test]
    fn unknown_variation_is_rejected_before_any_reservation() {
        let h = harness();
        let product = Product::publish(
            "Shirt",
            "shirt",
            2_000,
            None,
            5,
            2,
            vec![Variation {
                id: VariationId::new(),
                selector: "XL".to_string(),
            }],
        )
        .unwrap();
        let id = product.id;
        h.products.insert(product).unwrap();

        let mut req = checkout(&[(id, 1)]);
        req.items[0].variation_selector = Some("S".to_string());
        assert!(matches!(
            h.workflow.create(req, &customer()),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(h.stock_of(id), 5);
    }

    #[test]
    fn multi_item_shortfall_rolls_back_every_reservation() {
        let h = harness();
        let plenty = h.seed_product(10, 500);
        let scarce = h.seed_product(1, 300);

        let err = h
            .workflow
            .create(checkout(&[(plenty, 2), (scarce, 3)]), &customer())
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product_id: scarce,
                available: 1,
                requested: 3,
            }
        );
        assert_eq!(h.stock_of(plenty), 10);
        assert_eq!(h.stock_of(scarce), 1);
        assert!(h.orders.list().is_empty());
    }

    #[test]
    fn coupon_discounts_the_total_and_redeems_once() {
        let h = harness();
        let id = h.seed_product(10, 1_000);
        h.seed_coupon(coupon(
            "TEN",
            Discount::Percent {
                value: 10,
                max_discount_amount: None,
            },
        ));

        let mut req = checkout(&[(id, 2)]);
        req.coupon_code = Some("ten".to_string());
        let order = h.workflow.create(req, &customer()).unwrap();

        assert_eq!(order.coupon_code.as_deref(), Some("TEN"));
        assert_eq!(order.discount, 200);
        assert_eq!(order.total, 1_800);
        assert_eq!(h.workflow.coupons().list()[0].used_count, 1);
    }

    #[test]
    fn ineligible_coupon_fails_checkout_before_stock_moves() {
        let h = harness();
        let id = h.seed_product(10, 1_000);
        let mut exhausted = coupon("GONE", Discount::Fixed { amount: 100 });
        exhausted.usage_limit = Some(1);
        exhausted.used_count = 1;
        h.seed_coupon(exhausted);

        let mut req = checkout(&[(id, 1)]);
        req.coupon_code = Some("GONE".to_string());
        let err = h.workflow.create(req, &customer()).unwrap_err();

        assert_eq!(
            err,
            DomainError::from(CouponError::UsageLimitReached)
        );
        assert_eq!(h.stock_of(id), 10);
        assert!(h.orders.list().is_empty());
    }

    #[test]
    fn per_user_cap_counts_non_cancelled_orders() {
        let h = harness();
        let id = h.seed_product(10, 1_000);
        let mut once = coupon("ONCE", Discount::Fixed { amount: 100 });
        once.usage_limit_per_user = Some(1);
        h.seed_coupon(once);
        let actor = customer();

        let mut req = checkout(&[(id, 1)]);
        req.coupon_code = Some("ONCE".to_string());
        let first = h.workflow.create(req.clone(), &actor).unwrap();

        assert_eq!(
            h.workflow.create(req.clone(), &actor).unwrap_err(),
            DomainError::from(CouponError::PerUserLimitReached)
        );

        // Cancelling the first order frees the per-customer slot.
        h.workflow.cancel(first.id, &actor, None).unwrap();
        assert!(h.workflow.create(req, &actor).is_ok());
    }

    #[test]
    fn cancel_releases_stock_and_records_who_and_when() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 4)]), &actor).unwrap();
        assert_eq!(h.stock_of(id), 6);
        h.mark_paid(order.id);

        let cancelled = h
            .workflow
            .cancel(order.id, &actor, Some("changed my mind".to_string()))
            .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.cancelled_by, Some(CancelledBy::Customer));
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert!(cancelled.notes[0].contains("changed my mind"));
        assert_eq!(h.stock_of(id), 10);
    }

    #[test]
    fn cancel_is_not_repeatable() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 4)]), &actor).unwrap();

        h.workflow.cancel(order.id, &actor, None).unwrap();
        assert!(matches!(
            h.workflow.cancel(order.id, &actor, None),
            Err(DomainError::InvalidTransition(_))
        ));
        // Stock released exactly once.
        assert_eq!(h.stock_of(id), 10);
    }

    #[test]
    fn cancel_requires_ownership() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let owner = customer();
        let order = h.workflow.create(checkout(&[(id, 1)]), &owner).unwrap();

        assert!(matches!(
            h.workflow.cancel(order.id, &customer(), None),
            Err(DomainError::Forbidden(_))
        ));
        // Admins may cancel any order.
        assert!(h.workflow.cancel(order.id, &admin(), None).is_ok());
        assert_eq!(
            h.orders.get(&order.id).unwrap().cancelled_by,
            Some(CancelledBy::Admin)
        );
    }

    #[test]
    fn shipped_and_delivered_orders_cannot_be_cancelled() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 1)]), &actor).unwrap();

        h.workflow
            .update_status(order.id, OrderStatus::Processing)
            .unwrap();
        h.workflow
            .update_status(order.id, OrderStatus::Shipped)
            .unwrap();
        let err = h.workflow.cancel(order.id, &actor, None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(ref msg) if msg.contains("shipped")));

        h.workflow
            .update_status(order.id, OrderStatus::Delivered)
            .unwrap();
        let err = h.workflow.cancel(order.id, &actor, None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(ref msg) if msg.contains("return")));
        assert_eq!(h.stock_of(id), 9);
    }

    #[test]
    fn fulfilment_moves_forward_one_hop_at_a_time() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let order = h.workflow.create(checkout(&[(id, 1)]), &customer()).unwrap();

        // Skipping a hop is rejected.
        assert!(matches!(
            h.workflow.update_status(order.id, OrderStatus::Shipped),
            Err(DomainError::InvalidTransition(_))
        ));

        h.deliver(order.id);
        let delivered = h.orders.get(&order.id).unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(delivered.delivered_at.is_some());
        // Placed + three fulfilment hops.
        assert_eq!(delivered.tracking_history.len(), 4);

        // No backward moves.
        assert!(matches!(
            h.workflow.update_status(order.id, OrderStatus::Processing),
            Err(DomainError::InvalidTransition(_))
        ));
    }

    #[test]
    fn update_status_refuses_terminal_targets() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let order = h.workflow.create(checkout(&[(id, 1)]), &customer()).unwrap();

        assert!(matches!(
            h.workflow.update_status(order.id, OrderStatus::Cancelled),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            h.workflow.update_status(order.id, OrderStatus::Returned),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn return_requires_a_delivered_order() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 1)]), &actor).unwrap();

        assert!(matches!(
            h.workflow
                .request_return(order.id, &actor, ReturnType::Return, "broken".to_string()),
            Err(DomainError::InvalidTransition(_))
        ));
    }

    #[test]
    fn duplicate_return_request_conflicts() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 1)]), &actor).unwrap();
        h.deliver(order.id);

        h.workflow
            .request_return(order.id, &actor, ReturnType::Return, "broken".to_string())
            .unwrap();
        assert!(matches!(
            h.workflow
                .request_return(order.id, &actor, ReturnType::Return, "again".to_string()),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn completed_return_restores_stock_and_refunds() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 3)]), &actor).unwrap();
        h.mark_paid(order.id);
        h.deliver(order.id);
        assert_eq!(h.stock_of(id), 7);

        h.workflow
            .request_return(order.id, &actor, ReturnType::Return, "broken".to_string())
            .unwrap();
        h.workflow
            .review_return(order.id, ReturnDecision::Approved)
            .unwrap();
        let completed = h.workflow.complete_return(order.id).unwrap();

        assert_eq!(completed.status, OrderStatus::Returned);
        assert_eq!(completed.return_status, Some(ReturnStatus::Completed));
        assert_eq!(completed.payment_status, PaymentStatus::Refunded);
        assert_eq!(h.stock_of(id), 10);
    }

    #[test]
    fn exchange_completion_keeps_net_stock() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 2)]), &actor).unwrap();
        h.deliver(order.id);

        h.workflow
            .request_return(order.id, &actor, ReturnType::Exchange, "wrong size".to_string())
            .unwrap();
        h.workflow
            .review_return(order.id, ReturnDecision::Approved)
            .unwrap();
        let completed = h.workflow.complete_return(order.id).unwrap();

        // A replacement ships out, so the returned units do not re-enter.
        assert_eq!(completed.status, OrderStatus::Delivered);
        assert_eq!(completed.return_status, Some(ReturnStatus::Completed));
        assert_eq!(h.stock_of(id), 8);
    }

    #[test]
    fn return_review_and_completion_follow_the_sub_flow() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 1)]), &actor).unwrap();
        h.deliver(order.id);

        // Nothing to review or complete yet.
        assert!(h
            .workflow
            .review_return(order.id, ReturnDecision::Approved)
            .is_err());
        assert!(h.workflow.complete_return(order.id).is_err());

        h.workflow
            .request_return(order.id, &actor, ReturnType::Return, "broken".to_string())
            .unwrap();
        // Completion requires approval first.
        assert!(h.workflow.complete_return(order.id).is_err());

        let rejected = h
            .workflow
            .review_return(order.id, ReturnDecision::Rejected)
            .unwrap();
        assert_eq!(rejected.return_status, Some(ReturnStatus::Rejected));
        assert!(h.workflow.complete_return(order.id).is_err());
        // Rejection is final for this request.
        assert!(h
            .workflow
            .review_return(order.id, ReturnDecision::Approved)
            .is_err());
    }

    #[test]
    fn withdrawing_a_return_request_clears_the_sub_state() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 1)]), &actor).unwrap();
        h.deliver(order.id);

        // Nothing to withdraw yet.
        assert_eq!(
            h.workflow
                .cancel_return_request(order.id, &actor)
                .unwrap_err(),
            DomainError::not_found("return request")
        );

        h.workflow
            .request_return(order.id, &actor, ReturnType::Return, "broken".to_string())
            .unwrap();
        let cleared = h.workflow.cancel_return_request(order.id, &actor).unwrap();
        assert_eq!(cleared.return_status, None);
        assert_eq!(cleared.return_type, None);
        assert_eq!(cleared.return_reason, None);
        assert_eq!(cleared.status, OrderStatus::Delivered);

        // Once reviewed, the request can no longer be withdrawn.
        h.workflow
            .request_return(order.id, &actor, ReturnType::Return, "still broken".to_string())
            .unwrap();
        h.workflow
            .review_return(order.id, ReturnDecision::Approved)
            .unwrap();
        assert!(matches!(
            h.workflow.cancel_return_request(order.id, &actor),
            Err(DomainError::InvalidTransition(_))
        ));
    }

    #[test]
    fn tracking_is_sorted_and_synthesizes_the_current_status() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let actor = customer();
        let order = h.workflow.create(checkout(&[(id, 1)]), &actor).unwrap();

        // Flip the status behind the workflow's back to simulate history
        // written before tracking entries existed.
        h.orders
            .update(&order.id, |o| {
                o.status = OrderStatus::Shipped;
                Ok::<(), DomainError>(())
            })
            .ok()
            .unwrap();

        let (status, history) = h.workflow.tracking(order.id, &actor).unwrap();
        assert_eq!(status, OrderStatus::Shipped);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(history.last().unwrap().status, OrderStatus::Shipped);
        assert_eq!(history.last().unwrap().message, "Order shipped".to_string());
    }

    #[test]
    fn guest_orders_are_admin_only() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let order = h
            .workflow
            .create(checkout(&[(id, 1)]), &Actor::guest())
            .unwrap();
        assert_eq!(order.customer_id, None);

        assert!(matches!(
            h.workflow.get(order.id, &Actor::guest()),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            h.workflow.get(order.id, &customer()),
            Err(DomainError::Forbidden(_))
        ));
        assert!(h.workflow.get(order.id, &admin()).is_ok());
    }

    #[test]
    fn listing_is_scoped_to_the_actor() {
        let h = harness();
        let id = h.seed_product(10, 500);
        let alice = customer();
        let bob = customer();
        h.workflow.create(checkout(&[(id, 1)]), &alice).unwrap();
        h.workflow.create(checkout(&[(id, 1)]), &alice).unwrap();
        h.workflow.create(checkout(&[(id, 1)]), &bob).unwrap();

        assert_eq!(h.workflow.list_for(&alice).len(), 2);
        assert_eq!(h.workflow.list_for(&bob).len(), 1);
        assert_eq!(h.workflow.list_for(&admin()).len(), 3);
        assert!(h.workflow.list_for(&Actor::guest()).is_empty());
    }
}

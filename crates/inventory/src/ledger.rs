use serde::{Deserialize, Serialize};

use storefront_catalog::{Availability, Product};
use storefront_core::{DomainError, DomainResult, ProductId};
use storefront_store::{Collection, UpdateError};

/// Snapshot of a product's stock record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub total_stock: u32,
    pub low_stock_alert: u32,
    pub availability: Availability,
}

impl From<&Product> for StockLevel {
    fn from(product: &Product) -> Self {
        Self {
            total_stock: product.stock.total_stock,
            low_stock_alert: product.stock.low_stock_alert,
            availability: product.stock.availability,
        }
    }
}

/// Administrative bulk adjustment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustOp {
    Add,
    Subtract,
    Set,
}

/// Before/after record returned by [`InventoryLedger::bulk_adjust`] for
/// auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub previous_stock: u32,
    pub new_stock: u32,
}

/// Aggregate stock statistics across the whole catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub in_stock: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub total_units: u64,
    /// `Σ stock × regular_price`, in the currency's smallest unit.
    pub total_value: u64,
}

/// The authoritative stock counter service.
///
/// Generic over the product collection so tests can run against the
/// in-memory backend and production against whatever implements
/// [`Collection`].
#[derive(Debug, Clone)]
pub struct InventoryLedger<S> {
    products: S,
}

impl<S> InventoryLedger<S>
where
    S: Collection<Product>,
{
    pub fn new(products: S) -> Self {
        Self { products }
    }

    /// Current stock level; `NotFound` if the product does not exist.
    pub fn stock(&self, product_id: ProductId) -> DomainResult<StockLevel> {
        self.products
            .get(&product_id)
            .map(|p| StockLevel::from(&p))
            .ok_or_else(|| DomainError::not_found("product"))
    }

    /// Atomically verify `total_stock >= quantity` and decrement.
    ///
    /// On shortfall the stock record is untouched and the error names what
    /// was available versus requested. Availability is re-derived in the
    /// same step.
    pub fn reserve(&self, product_id: ProductId, quantity: u32) -> DomainResult<StockLevel> {
        if quantity == 0 {
            return Err(DomainError::validation("reserve quantity must be at least 1"));
        }

        let updated = self
            .products
            .update(&product_id, |p| {
                if p.stock.total_stock < quantity {
                    return Err(DomainError::InsufficientStock {
                        product_id,
                        available: p.stock.total_stock,
                        requested: quantity,
                    });
                }
                p.stock.total_stock -= quantity;
                p.stock.recompute_availability();
                p.touch();
                Ok(())
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("product")))?;

        if updated.stock.is_low() {
            tracing::warn!(
                product_id = %product_id,
                remaining = updated.stock.total_stock,
                threshold = updated.stock.low_stock_alert,
                "product stock at or below alert threshold"
            );
        }

        Ok(StockLevel::from(&updated))
    }

    /// The inverse of [`reserve`](Self::reserve): a pure increment.
    ///
    /// Safe to call even when the originating reservation is no longer
    /// traceable; idempotency is the caller's responsibility.
    pub fn release(&self, product_id: ProductId, quantity: u32) -> DomainResult<StockLevel> {
        if quantity == 0 {
            return Err(DomainError::validation("release quantity must be at least 1"));
        }

        let updated = self
            .products
            .update(&product_id, |p| {
                p.stock.total_stock = p.stock.total_stock.saturating_add(quantity);
                p.stock.recompute_availability();
                p.touch();
                Ok::<(), DomainError>(())
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("product")))?;

        Ok(StockLevel::from(&updated))
    }

    /// Administrative override of the stock record.
    ///
    /// A `new_total` of `None` leaves the live count alone, so a
    /// threshold-only or availability-only edit cannot clobber a
    /// reservation that lands concurrently. The count-versus-availability
    /// check runs against the count the write actually commits: zero stock
    /// forces `out_of_stock` unless an explicit override (preorder) is
    /// supplied, and a positive total rejects an `out_of_stock` override.
    pub fn set_stock(
        &self,
        product_id: ProductId,
        new_total: Option<u32>,
        new_low_stock_alert: Option<u32>,
        availability: Option<Availability>,
    ) -> DomainResult<StockLevel> {
        let updated = self
            .products
            .update(&product_id, |p| {
                let total = new_total.unwrap_or(p.stock.total_stock);
                match (total, availability) {
                    (0, Some(Availability::InStock)) => {
                        return Err(DomainError::validation(
                            "a product with zero stock cannot be marked in stock",
                        ));
                    }
                    (1.., Some(Availability::OutOfStock)) => {
                        return Err(DomainError::validation(
                            "a product with stock on hand cannot be marked out of stock",
                        ));
                    }
                    _ => {}
                }

                p.stock.total_stock = total;
                if let Some(alert) = new_low_stock_alert {
                    p.stock.low_stock_alert = alert;
                }
                match availability {
                    Some(explicit) => p.stock.availability = explicit,
                    None => p.stock.recompute_availability(),
                }
                p.touch();
                Ok(())
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("product")))?;

        Ok(StockLevel::from(&updated))
    }

    /// Administrative relative adjustment; `subtract` clamps at zero.
    pub fn bulk_adjust(
        &self,
        product_id: ProductId,
        op: AdjustOp,
        quantity: u32,
    ) -> DomainResult<Adjustment> {
        let mut previous = 0u32;
        let updated = self
            .products
            .update(&product_id, |p| {
                previous = p.stock.total_stock;
                p.stock.total_stock = match op {
                    AdjustOp::Add => p.stock.total_stock.saturating_add(quantity),
                    AdjustOp::Subtract => p.stock.total_stock.saturating_sub(quantity),
                    AdjustOp::Set => quantity,
                };
                p.stock.recompute_availability();
                p.touch();
                Ok::<(), DomainError>(())
            })
            .map_err(|e| e.into_inner(|| DomainError::not_found("product")))?;

        Ok(Adjustment {
            previous_stock: previous,
            new_stock: updated.stock.total_stock,
        })
    }

    /// Aggregate stock statistics over all products.
    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats::default();
        for product in self.products.list() {
            let stock = &product.stock;
            if stock.total_stock == 0 {
                stats.out_of_stock += 1;
            } else if stock.is_low() {
                stats.low_stock += 1;
            } else {
                stats.in_stock += 1;
            }
            stats.total_units += u64::from(stock.total_stock);
            stats.total_value += u64::from(stock.total_stock) * product.regular_price;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use storefront_store::InMemoryCollection;

    type Products = Arc<InMemoryCollection<Product>>;

    fn ledger_with(products: &[(u32, u64)]) -> (InventoryLedger<Products>, Vec<ProductId>) {
        let coll: Products = Arc::new(InMemoryCollection::new());
        let mut ids = Vec::new();
        for (i, (stock, price)) in products.iter().enumerate() {
            let product = Product::publish(
                format!("Product {i}"),
                format!("product-{i}"),
                *price,
                None,
                *stock,
                3,
                Vec::new(),
            )
            .unwrap();
            ids.push(product.id);
            coll.insert(product).unwrap();
        }
        (InventoryLedger::new(coll), ids)
    }

    #[test]
    fn reserve_decrements_and_reports_level() {
        let (ledger, ids) = ledger_with(&[(5, 1_000)]);
        let level = ledger.reserve(ids[0], 3).unwrap();
        assert_eq!(level.total_stock, 2);
        assert_eq!(level.availability, Availability::InStock);
    }

    #[test]
    fn reserve_to_zero_goes_out_of_stock() {
        let (ledger, ids) = ledger_with(&[(3, 1_000)]);
        let level = ledger.reserve(ids[0], 3).unwrap();
        assert_eq!(level.total_stock, 0);
        assert_eq!(level.availability, Availability::OutOfStock);
    }

    #[test]
    fn reserve_shortfall_names_available_and_requested() {
        let (ledger, ids) = ledger_with(&[(2, 1_000)]);
        let err = ledger.reserve(ids[0], 3).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                product_id: ids[0],
                available: 2,
                requested: 3,
            }
        );
        // Stock unchanged after the rejected reservation.
        assert_eq!(ledger.stock(ids[0]).unwrap().total_stock, 2);
    }

    #[test]
    fn reserve_unknown_product_is_not_found() {
        let (ledger, _) = ledger_with(&[]);
        assert_eq!(
            ledger.reserve(ProductId::new(), 1).unwrap_err(),
            DomainError::not_found("product")
        );
    }

    #[test]
    fn reserve_zero_quantity_is_rejected() {
        let (ledger, ids) = ledger_with(&[(5, 1_000)]);
        assert!(matches!(
            ledger.reserve(ids[0], 0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn release_restores_reserve_exactly() {
        let (ledger, ids) = ledger_with(&[(5, 1_000)]);
        ledger.reserve(ids[0], 4).unwrap();
        let level = ledger.release(ids[0], 4).unwrap();
        assert_eq!(level.total_stock, 5);
        assert_eq!(level.availability, Availability::InStock);
    }

    #[test]
    fn release_flips_out_of_stock_back_to_in_stock() {
        let (ledger, ids) = ledger_with(&[(1, 1_000)]);
        ledger.reserve(ids[0], 1).unwrap();
        assert_eq!(
            ledger.stock(ids[0]).unwrap().availability,
            Availability::OutOfStock
        );
        let level = ledger.release(ids[0], 1).unwrap();
        assert_eq!(level.availability, Availability::InStock);
    }

    #[test]
    fn set_stock_zero_defaults_to_out_of_stock_unless_overridden() {
        let (ledger, ids) = ledger_with(&[(5, 1_000)]);

        let level = ledger.set_stock(ids[0], Some(0), None, None).unwrap();
        assert_eq!(level.availability, Availability::OutOfStock);

        let level = ledger
            .set_stock(ids[0], Some(0), None, Some(Availability::Preorder))
            .unwrap();
        assert_eq!(level.availability, Availability::Preorder);
    }

    #[test]
    fn set_stock_rejects_contradictory_overrides() {
        let (ledger, ids) = ledger_with(&[(5, 1_000)]);
        assert!(ledger
            .set_stock(ids[0], Some(0), None, Some(Availability::InStock))
            .is_err());
        assert!(ledger
            .set_stock(ids[0], Some(4), None, Some(Availability::OutOfStock))
            .is_err());
    }

    #[test]
    fn threshold_only_update_keeps_the_live_count() {
        let (ledger, ids) = ledger_with(&[(5, 1_000)]);
        ledger.reserve(ids[0], 3).unwrap();

        let level = ledger.set_stock(ids[0], None, Some(1), None).unwrap();
        assert_eq!(level.total_stock, 2);
        assert_eq!(level.low_stock_alert, 1);
    }

    #[test]
    fn availability_override_without_a_total_checks_the_live_count() {
        let (ledger, ids) = ledger_with(&[(1, 1_000)]);
        ledger.reserve(ids[0], 1).unwrap();

        // Count is now zero, so marking in stock without raising it fails.
        assert!(ledger
            .set_stock(ids[0], None, None, Some(Availability::InStock))
            .is_err());
        let level = ledger
            .set_stock(ids[0], None, None, Some(Availability::Preorder))
            .unwrap();
        assert_eq!(level.total_stock, 0);
        assert_eq!(level.availability, Availability::Preorder);
    }

    #[test]
    fn threshold_updates_race_with_reservations_without_resurrecting_stock() {
        let (ledger, ids) = ledger_with(&[(40, 1_000)]);
        let ledger = Arc::new(ledger);
        let id = ids[0];

        let tuner = {
            let ledger = ledger.clone();
            std::thread::spawn(move || {
                for alert in 0..100u32 {
                    ledger.set_stock(id, None, Some(alert % 5), None).unwrap();
                }
            })
        };

        let mut handles = Vec::new();
        for _ in 0..4 {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || {
                (0..10).filter(|_| ledger.reserve(id, 1).is_ok()).count()
            }));
        }

        let won: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        tuner.join().unwrap();

        assert_eq!(won, 40);
        assert_eq!(ledger.stock(id).unwrap().total_stock, 0);
    }

    #[test]
    fn bulk_adjust_reports_previous_and_new() {
        let (ledger, ids) = ledger_with(&[(10, 1_000)]);

        let adj = ledger.bulk_adjust(ids[0], AdjustOp::Add, 5).unwrap();
        assert_eq!((adj.previous_stock, adj.new_stock), (10, 15));

        let adj = ledger.bulk_adjust(ids[0], AdjustOp::Subtract, 20).unwrap();
        assert_eq!((adj.previous_stock, adj.new_stock), (15, 0));
        assert_eq!(
            ledger.stock(ids[0]).unwrap().availability,
            Availability::OutOfStock
        );

        let adj = ledger.bulk_adjust(ids[0], AdjustOp::Set, 7).unwrap();
        assert_eq!((adj.previous_stock, adj.new_stock), (0, 7));
    }

    #[test]
    fn stats_partitions_products_and_sums_value() {
        // stock/price: healthy, low (<= alert of 3), out.
        let (ledger, _) = ledger_with(&[(10, 100), (2, 200), (0, 300)]);
        let stats = ledger.stats();
        assert_eq!(stats.in_stock, 1);
        assert_eq!(stats.low_stock, 1);
        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.total_units, 12);
        assert_eq!(stats.total_value, 10 * 100 + 2 * 200);
    }

    #[test]
    fn concurrent_reserves_never_oversell() {
        let (ledger, ids) = ledger_with(&[(50, 1_000)]);
        let ledger = Arc::new(ledger);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            let id = ids[0];
            handles.push(std::thread::spawn(move || {
                (0..10).filter(|_| ledger.reserve(id, 1).is_ok()).count()
            }));
        }

        let won: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(won, 50);
        let level = ledger.stock(ids[0]).unwrap();
        assert_eq!(level.total_stock, 0);
        assert_eq!(level.availability, Availability::OutOfStock);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Reserve(u32),
            Release(u32),
            Set(u32),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1u32..=10).prop_map(Op::Reserve),
                (1u32..=10).prop_map(Op::Release),
                (0u32..=30).prop_map(Op::Set),
            ]
        }

        proptest! {
            /// After any op sequence: stock is representable (never negative
            /// by type) and availability matches the zero/non-zero rule.
            #[test]
            fn availability_matches_stock_after_any_sequence(
                initial in 0u32..=20,
                ops in proptest::collection::vec(op_strategy(), 1..40),
            ) {
                let (ledger, ids) = ledger_with(&[(initial, 500)]);
                for op in ops {
                    let _ = match op {
                        Op::Reserve(n) => ledger.reserve(ids[0], n),
                        Op::Release(n) => ledger.release(ids[0], n),
                        Op::Set(n) => ledger.set_stock(ids[0], Some(n), None, None),
                    };
                    let level = ledger.stock(ids[0]).unwrap();
                    prop_assert_eq!(
                        level.availability == Availability::OutOfStock,
                        level.total_stock == 0
                    );
                }
            }

            /// Reserve then release restores the starting level exactly.
            #[test]
            fn reserve_release_round_trip(initial in 1u32..=50, n in 1u32..=50) {
                prop_assume!(n <= initial);
                let (ledger, ids) = ledger_with(&[(initial, 500)]);
                ledger.reserve(ids[0], n).unwrap();
                ledger.release(ids[0], n).unwrap();
                prop_assert_eq!(ledger.stock(ids[0]).unwrap().total_stock, initial);
            }
        }
    }
}

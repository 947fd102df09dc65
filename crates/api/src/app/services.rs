use std::sync::Arc;

use storefront_catalog::Product;
use storefront_coupons::{Coupon, CouponEngine};
use storefront_inventory::InventoryLedger;
use storefront_orders::{Order, OrderCouponUsage, OrderWorkflow};
use storefront_store::{InMemoryCollection, InMemorySequences};

pub type Products = Arc<InMemoryCollection<Product>>;
pub type Orders = Arc<InMemoryCollection<Order>>;
pub type Coupons = Arc<InMemoryCollection<Coupon>>;

pub type Workflow = OrderWorkflow<Products, Orders, Coupons>;

/// Shared service graph behind the routes.
///
/// The workflow owns the ledger and coupon engine so that checkout,
/// cancellation and returns move stock and coupon counters through one code
/// path; the routes that only read or administer reach the same instances
/// through the accessors.
#[derive(Clone)]
pub struct AppServices {
    pub products: Products,
    pub workflow: Workflow,
}

impl AppServices {
    pub fn ledger(&self) -> &InventoryLedger<Products> {
        self.workflow.ledger()
    }

    pub fn coupons(&self) -> &CouponEngine<Coupons, OrderCouponUsage<Orders>> {
        self.workflow.coupons()
    }
}

/// In-memory wiring; a document database backend slots in behind the same
/// collection trait.
pub fn build_services() -> AppServices {
    let products: Products = Arc::new(InMemoryCollection::new());
    let orders: Orders = Arc::new(InMemoryCollection::new());
    let coupons: Coupons = Arc::new(InMemoryCollection::new());
    let sequences = Arc::new(InMemorySequences::new());

    let workflow = OrderWorkflow::new(products.clone(), orders, coupons, sequences);

    AppServices { products, workflow }
}

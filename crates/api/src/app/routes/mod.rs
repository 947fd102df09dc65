use axum::{Router, routing::get};

pub mod coupons;
pub mod inventory;
pub mod orders;
pub mod products;
pub mod system;

/// Router for all actor-resolved endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/products", products::router())
        .nest("/inventory", inventory::router())
        .nest("/orders", orders::router())
        .nest("/coupons", coupons::router())
}

//! API-side role guards.
//!
//! Ownership checks live in the domain services ([`storefront_orders`] knows
//! who owns an order); routes only gate on role before calling in.

use axum::http::StatusCode;

use storefront_auth::Actor;

use crate::app::errors::json_error;

/// Require the `admin` role. Guests get a 401, authenticated non-admins a
/// 403.
pub fn require_admin(actor: &Actor) -> Result<(), axum::response::Response> {
    if actor.is_admin() {
        return Ok(());
    }
    if actor.customer_id().is_none() {
        return Err(json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "authentication required",
        ));
    }
    Err(json_error(
        StatusCode::FORBIDDEN,
        "forbidden",
        "admin role required",
    ))
}

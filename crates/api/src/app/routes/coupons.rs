use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;

use storefront_core::{CouponId, DomainError};
use storefront_coupons::Coupon;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_coupon).get(list_coupons))
        .route("/validate", post(validate_coupon))
        .route("/:id", axum::routing::put(set_enabled).delete(delete_coupon))
}

/// Guest-capable cart re-pricing check. Never mutates `used_count`.
pub async fn validate_coupon(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::ValidateCouponRequest>,
) -> axum::response::Response {
    let quote = match services.coupons().validate(
        &body.code,
        body.subtotal,
        ctx.actor().customer_id(),
        Utc::now(),
    ) {
        Ok(quote) => quote,
        Err(e) => return errors::domain_error_to_response(DomainError::from(e)),
    };

    Json(serde_json::json!({
        "valid": true,
        "discount_amount": quote.discount_amount,
        "coupon": dto::coupon_to_json(&quote.coupon),
    }))
    .into_response()
}

pub async fn create_coupon(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::CreateCouponRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }

    let coupon = match Coupon::new(
        &body.code,
        body.discount,
        body.min_purchase_amount,
        body.usage_limit,
        body.usage_limit_per_user,
        body.starts_at,
        body.ends_at,
    ) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.coupons().create(coupon) {
        Ok(coupon) => (StatusCode::CREATED, Json(dto::coupon_to_json(&coupon))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_coupons(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }

    let coupons = services.coupons().list();
    Json(coupons.iter().map(dto::coupon_to_json).collect::<Vec<_>>()).into_response()
}

pub async fn set_enabled(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetCouponEnabledRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }
    let coupon_id: CouponId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid coupon id");
        }
    };

    match services.coupons().set_enabled(coupon_id, body.enabled) {
        Ok(coupon) => Json(dto::coupon_to_json(&coupon)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_coupon(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }
    let coupon_id: CouponId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid coupon id");
        }
    };

    match services.coupons().delete(coupon_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_core::ProductId;
use storefront_store::Collection;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .route(
            "/:id",
            get(get_stock).put(set_stock).patch(adjust_stock),
        )
}

pub async fn get_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }

    Json(dto::stats_to_json(services.ledger().stats())).into_response()
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };

    match services.ledger().stock(product_id) {
        Ok(level) => Json(dto::stock_to_json(product_id, level)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn set_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SetStockRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };

    let availability = match body.availability.as_deref() {
        Some(s) => match errors::parse_availability(s) {
            Ok(a) => Some(a),
            Err(resp) => return resp,
        },
        None => None,
    };

    // An omitted total keeps the current count; the ledger resolves it
    // inside the same conditional write so a concurrent reservation is
    // never written back over.
    if let Err(e) = services.ledger().set_stock(
        product_id,
        body.total_stock,
        body.low_stock_alert,
        availability,
    ) {
        return errors::domain_error_to_response(e);
    }

    match services.products.get(&product_id) {
        Some(product) => Json(dto::product_to_json(&product)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };

    let op = match errors::parse_adjust_op(&body.action) {
        Ok(op) => op,
        Err(resp) => return resp,
    };

    let adjustment = match services.ledger().bulk_adjust(product_id, op, body.quantity) {
        Ok(adjustment) => adjustment,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.get(&product_id) {
        Some(product) => Json(dto::adjustment_to_json(&product, adjustment)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
    }
}

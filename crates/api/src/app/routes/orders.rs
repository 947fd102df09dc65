use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use storefront_core::OrderId;
use storefront_orders::CheckoutRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/cancel", put(cancel_order))
        .route(
            "/:id/return",
            post(request_return).delete(cancel_return).put(review_return),
        )
        .route("/:id/return/complete", post(complete_return))
        .route("/:id/status", put(update_status))
        .route("/:id/tracking", get(get_tracking))
}

fn parse_order_id(id: &str) -> Result<OrderId, axum::response::Response> {
    id.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id")
    })
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<CheckoutRequest>,
) -> axum::response::Response {
    // Guest checkout is allowed; the order simply has no owner.
    match services.workflow.create(body, ctx.actor()) {
        Ok(order) => (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> axum::response::Response {
    let orders = services.workflow.list_for(ctx.actor());
    Json(orders.iter().map(dto::order_to_json).collect::<Vec<_>>()).into_response()
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.workflow.get(order_id, ctx.actor()) {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CancelOrderRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.workflow.cancel(order_id, ctx.actor(), body.reason) {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.workflow.update_status(order_id, body.status) {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn request_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReturnRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .workflow
        .request_return(order_id, ctx.actor(), body.return_type, body.reason)
    {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn cancel_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.workflow.cancel_return_request(order_id, ctx.actor()) {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn review_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReviewReturnRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.workflow.review_return(order_id, body.decision) {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn complete_return(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.workflow.complete_return(order_id) {
        Ok(order) => Json(dto::order_to_json(&order)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_tracking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.workflow.tracking(order_id, ctx.actor()) {
        Ok((status, history)) => Json(dto::tracking_to_json(status, &history)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

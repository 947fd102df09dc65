use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_catalog::Availability;
use storefront_core::DomainError;
use storefront_inventory::AdjustOp;

/// Map a domain failure onto the HTTP contract. Status codes are part of the
/// API: illegal transitions and shortfalls are the caller's fault (400),
/// duplicates conflict (409).
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidTransition(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_transition", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InsufficientStock { .. } => {
            let msg = err.to_string();
            json_error(StatusCode::BAD_REQUEST, "insufficient_stock", msg)
        }
        DomainError::NotFound(resource) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{resource} not found"))
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        DomainError::Unauthorized => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required")
        }
        DomainError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_availability(s: &str) -> Result<Availability, axum::response::Response> {
    match s {
        "in_stock" => Ok(Availability::InStock),
        "out_of_stock" => Ok(Availability::OutOfStock),
        "preorder" => Ok(Availability::Preorder),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_availability",
            "availability must be one of: in_stock, out_of_stock, preorder",
        )),
    }
}

pub fn parse_adjust_op(s: &str) -> Result<AdjustOp, axum::response::Response> {
    match s {
        "add" => Ok(AdjustOp::Add),
        "subtract" => Ok(AdjustOp::Subtract),
        "set" => Ok(AdjustOp::Set),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_action",
            "action must be one of: add, subtract, set",
        )),
    }
}

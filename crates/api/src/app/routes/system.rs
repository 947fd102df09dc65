use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::context::ActorContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<ActorContext>) -> impl IntoResponse {
    let actor = ctx.actor();
    Json(serde_json::json!({
        "customer_id": actor.customer_id().map(|id| id.to_string()),
        "roles": actor.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "guest": actor.customer_id().is_none(),
    }))
}

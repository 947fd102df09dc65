use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use storefront_catalog::{Product, Variation};
use storefront_core::{ProductId, VariationId};
use storefront_store::{Collection, StoreError};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::require_admin(ctx.actor()) {
        return resp;
    }

    let variations = body
        .variations
        .into_iter()
        .map(|selector| Variation {
            id: VariationId::new(),
            selector,
        })
        .collect();

    let product = match Product::publish(
        body.name,
        body.slug,
        body.regular_price,
        body.sale_price,
        body.initial_stock,
        body.low_stock_alert,
        variations,
    ) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    // Slugs are unique across the catalog.
    if !services
        .products
        .find(|p| p.slug == product.slug)
        .is_empty()
    {
        return errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("product slug '{}' already exists", product.slug),
        );
    }

    match services.products.insert(product.clone()) {
        Ok(()) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(StoreError::Duplicate(id)) => errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("product {id} already exists"),
        ),
        Err(e) => errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            e.to_string(),
        ),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
) -> axum::response::Response {
    // Storefront callers see the published catalog; admins see drafts too.
    let products = if ctx.actor().is_admin() {
        services.products.list()
    } else {
        services.products.find(|p| p.published)
    };

    Json(products.iter().map(dto::product_to_json).collect::<Vec<_>>()).into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id");
        }
    };

    match services
        .products
        .get(&product_id)
        .filter(|p| p.published || ctx.actor().is_admin())
    {
        Some(product) => Json(dto::product_to_json(&product)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
    }
}

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use storefront_auth::{Actor, JwtClaims, validate_claims};

use crate::context::ActorContext;

#[derive(Clone)]
pub struct AuthState {
    decoding_key: Arc<DecodingKey>,
}

impl AuthState {
    pub fn new(jwt_secret: &[u8]) -> Self {
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(jwt_secret)),
        }
    }
}

/// Resolve the caller and attach an [`ActorContext`] to the request.
///
/// A missing `Authorization` header is a guest, not an error; guest-capable
/// routes (checkout, coupon validation) accept those, admin routes reject
/// them downstream. A header that is present but malformed or carries an
/// invalid token is a 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let actor = match extract_bearer(req.headers())? {
        Some(token) => {
            let claims = decode_claims(token, &state.decoding_key)?;
            validate_claims(&claims, Utc::now()).map_err(|_e| StatusCode::UNAUTHORIZED)?;
            Actor::authenticated(claims.sub, claims.roles)
        }
        None => Actor::guest(),
    };

    req.extensions_mut().insert(ActorContext::new(actor));

    Ok(next.run(req).await)
}

fn decode_claims(token: &str, key: &DecodingKey) -> Result<JwtClaims, StatusCode> {
    // Expiry lives in our own claim fields, checked by `validate_claims`;
    // the registered `exp` claim is not required.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<JwtClaims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|_e| StatusCode::UNAUTHORIZED)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, StatusCode> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Some(token))
}

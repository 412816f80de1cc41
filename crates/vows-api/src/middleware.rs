use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use vows_types::api::Claims;
use vows_types::models::Role;

use crate::AppState;
use crate::error::ApiError;

/// Extract and validate the bearer token, stashing the claims as a request
/// extension for downstream handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Layered inside `require_auth`; rejects non-admin callers.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(ApiError::Unauthorized)?;

    if claims.role != Role::Admin {
        return Err(ApiError::Forbidden("admin access required".into()));
    }

    Ok(next.run(req).await)
}

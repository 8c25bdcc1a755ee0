//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, verifies the access token,
//! and injects `Identity` into request extensions for downstream
//! handlers. Anything short of a valid token is a 403.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};

/// Require a valid access token.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Forbidden)?
        .to_string();

    let claims = ctx.auth.verify_access(&token)?;

    req.extensions_mut().insert(Identity {
        account_id: claims.sub,
        username: claims.username,
    });

    Ok(next.run(req).await)
}

//! services/api/src/web/middleware.rs
//!
//! Authentication and error-detail middleware.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use docsum_core::bearer_token;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ApiError, ErrorDetail};
use crate::web::state::AppState;

/// Error bodies are tiny JSON objects; anything bigger is passed through untouched.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// The bearer token, owned so that the request is not borrowed across `.await`.
fn authorization(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string)
}

/// Middleware that validates the bearer token and resolves the caller.
///
/// If valid, inserts the `UserIdentity` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = authorization(&req);
    let identity = state.gate.authenticate(token.as_deref()).await?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Like [`require_auth`] but never rejects: inserts `Option<UserIdentity>`.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = authorization(&req);
    let identity = state.gate.authenticate_optional(token.as_deref()).await;
    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Development only: copies the hidden detail of an internal error into the
/// JSON body as `error`.
pub async fn expose_error_details(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not buffer error body: {}", e);
            return parts.status.into_response();
        }
    };

    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(mut map)) => {
            map.insert("error".to_string(), Value::String(detail));
            Body::from(Value::Object(map).to_string())
        }
        _ => Body::from(bytes),
    };

    let mut response = Response::from_parts(parts, body);
    response.headers_mut().remove(header::CONTENT_LENGTH);
    response
}

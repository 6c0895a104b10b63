//! services/api/src/web/mod.rs
//!
//! HTTP layer: handlers, middleware and the assembled router.

pub mod auth;
pub mod documents;
pub mod middleware;
pub mod rest;
pub mod resumes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::web::rest::ApiDoc;
use crate::web::state::AppState;

pub use middleware::{expose_error_details, optional_auth, require_auth};

/// Room for multipart boundaries and headers on top of the file itself, so that
/// oversized files reach the stager and are rejected with a clear message.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Builds the complete application: API routes, health, Swagger UI, CORS and
/// the body limit.
pub fn router(state: Arc<AppState>) -> Result<Router, ConfigError> {
    let config = state.config.clone();

    let origin = config.frontend_url.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("FRONTEND_URL".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/users/register", post(auth::register_handler))
        .route("/api/users/login", post(auth::login_handler));

    // Anonymous callers are fine, a valid token is noted
    let open_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), optional_auth));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/api/users/profile",
            get(auth::get_profile_handler).put(auth::update_profile_handler),
        )
        .route("/api/documents", get(documents::list_documents_handler))
        .route("/api/documents/upload", post(documents::upload_document_handler))
        .route(
            "/api/documents/{id}",
            get(documents::get_document_handler).delete(documents::delete_document_handler),
        )
        .route("/api/resumes", get(resumes::list_resumes_handler))
        .route("/api/resumes/generate", post(resumes::generate_resume_handler))
        .route(
            "/api/resumes/document/{document_id}",
            get(resumes::resume_for_document_handler),
        )
        .route("/api/resumes/{id}", get(resumes::get_resume_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let body_limit = usize::try_from(config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD))
        .unwrap_or(usize::MAX);

    let mut api_router = Router::new()
        .merge(public_routes)
        .merge(open_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    if config.development {
        api_router = api_router.layer(axum_middleware::from_fn(expose_error_details));
    }

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors))
}

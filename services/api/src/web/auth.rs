//! services/api/src/web/auth.rs
//!
//! Account endpoints: registration, login and the caller's own profile.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use docsum_core::domain::{ProfileUpdate, UserIdentity};
use docsum_core::ports::PortError;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::rest::{AuthResponse, UserResponse};
use crate::web::state::AppState;

const MIN_PASSWORD_CHARS: usize = 6;

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default, alias = "nom")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "mot_de_passe")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "mot_de_passe")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default, alias = "nom")]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::Validation("A valid email address is required".to_string())),
    }
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, password_hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/users/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request or email already in use"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let name = req.name.trim();
    let email = normalize_email(&req.email);
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Name, email and password are required".to_string(),
        ));
    }
    validate_email(&email)?;
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state.users.create_user(name, &email, &password_hash).await?;
    let token = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created successfully".to_string(),
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/users/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(req) = payload?;
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let credentials = match state.users.get_user_by_email(&email).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => return Err(ApiError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&req.password, &credentials.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens.issue(credentials.user.id)?;
    info!(user_id = %credentials.user.id, "User logged in");

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: credentials.user.into(),
    }))
}

/// GET /api/users/profile - The authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "Profile retrieved", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.get_user_by_id(identity.user_id).await?;
    Ok(Json(UserResponse {
        message: "Profile retrieved successfully".to_string(),
        user: user.into(),
    }))
}

/// PUT /api/users/profile - Update name and/or email
#[utoipa::path(
    put,
    path = "/api/users/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid email or email already in use"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(req) = payload?;
    // Blank fields are left unchanged.
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let email = req
        .email
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty());
    if let Some(email) = &email {
        validate_email(email)?;
    }

    let user = state
        .users
        .update_user(identity.user_id, ProfileUpdate { name, email })
        .await?;
    info!(user_id = %user.id, "Profile updated");

    Ok(Json(UserResponse {
        message: "Profile updated successfully".to_string(),
        user: user.into(),
    }))
}

//! services/api/src/web/rest.rs
//!
//! Contains the response payloads shared by the REST handlers, the health
//! endpoint, and the master definition for the OpenAPI specification.

use axum::{response::Json, Extension};
use chrono::{DateTime, Utc};
use docsum_core::domain::{
    Document, DocumentMeta, KeyPoint, Suggestion, SummaryWithDocument, User, UserIdentity,
};
use serde::Serialize;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::{auth, documents, resumes};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::get_profile_handler,
        auth::update_profile_handler,
        documents::upload_document_handler,
        documents::list_documents_handler,
        documents::get_document_handler,
        documents::delete_document_handler,
        resumes::generate_resume_handler,
        resumes::list_resumes_handler,
        resumes::resume_for_document_handler,
        resumes::get_resume_handler,
    ),
    components(
        schemas(
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::UpdateProfileRequest,
            resumes::GenerateRequest,
            UserDto,
            DocumentDto,
            DocumentMetaDto,
            KeyPointDto,
            SuggestionDto,
            ResumeDto,
            MessageResponse,
            AuthResponse,
            UserResponse,
            DocumentResponse,
            DocumentListResponse,
            ResumeResponse,
            ResumeListResponse,
            HealthResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Document Summary API", description = "Upload documents and generate AI summaries with suggested actions.")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role.as_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A document as seen by its owner. The storage path stays on the server.
#[derive(Serialize, ToSchema)]
pub struct DocumentDto {
    pub id: Uuid,
    pub original_filename: String,
    pub declared_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Document> for DocumentDto {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            original_filename: doc.original_filename,
            declared_type: doc.declared_type.to_string(),
            size_bytes: doc.size_bytes,
            uploaded_at: doc.uploaded_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DocumentMetaDto {
    pub id: Uuid,
    pub original_filename: String,
    pub declared_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<DocumentMeta> for DocumentMetaDto {
    fn from(meta: DocumentMeta) -> Self {
        Self {
            id: meta.id,
            original_filename: meta.original_filename,
            declared_type: meta.declared_type.to_string(),
            uploaded_at: meta.uploaded_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct KeyPointDto {
    pub text: String,
    /// 1 (low) to 5 (high).
    pub importance: u8,
}

impl From<KeyPoint> for KeyPointDto {
    fn from(point: KeyPoint) -> Self {
        Self {
            text: point.text,
            importance: point.importance,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SuggestionDto {
    pub action: String,
    /// One of `urgent`, `important`, `normal`, `information`.
    pub category: String,
}

impl From<Suggestion> for SuggestionDto {
    fn from(suggestion: Suggestion) -> Self {
        Self {
            action: suggestion.action,
            category: suggestion.category.as_str().to_string(),
        }
    }
}

/// A summary ("résumé") joined with the metadata of its document.
#[derive(Serialize, ToSchema)]
pub struct ResumeDto {
    pub id: Uuid,
    pub document: DocumentMetaDto,
    pub content: String,
    pub generated_at: DateTime<Utc>,
    pub key_points: Vec<KeyPointDto>,
    pub suggestions: Vec<SuggestionDto>,
}

impl From<SummaryWithDocument> for ResumeDto {
    fn from(joined: SummaryWithDocument) -> Self {
        let SummaryWithDocument { summary, document } = joined;
        Self {
            id: summary.id,
            document: document.into(),
            content: summary.content,
            generated_at: summary.generated_at,
            key_points: summary.key_points.into_iter().map(Into::into).collect(),
            suggestions: summary.suggestions.into_iter().map(Into::into).collect(),
        }
    }
}

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserDto,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub message: String,
    pub user: UserDto,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    pub message: String,
    pub document: DocumentDto,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub message: String,
    pub documents: Vec<DocumentDto>,
}

#[derive(Serialize, ToSchema)]
pub struct ResumeResponse {
    pub message: String,
    pub resume: ResumeDto,
}

#[derive(Serialize, ToSchema)]
pub struct ResumeListResponse {
    pub message: String,
    pub resumes: Vec<ResumeDto>,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Whether the request carried a valid bearer token.
    pub authenticated: bool,
}

//=========================================================================================
// Health
//=========================================================================================

/// Liveness of this service. Accepts, but never requires, a bearer token.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_handler(
    Extension(identity): Extension<Option<UserIdentity>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        authenticated: identity.is_some(),
    })
}

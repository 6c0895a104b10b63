//! services/api/src/web/resumes.rs
//!
//! Handlers for generating and reading document summaries ("résumés").

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use docsum_core::domain::UserIdentity;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::rest::{ResumeListResponse, ResumeResponse};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct GenerateRequest {
    #[serde(default, rename = "documentId", alias = "document_id")]
    pub document_id: Option<String>,
}

impl GenerateRequest {
    fn document_id(&self) -> Result<Uuid, ApiError> {
        let raw = self
            .document_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::Validation("Document id is required".to_string()))?;
        Uuid::parse_str(raw)
            .map_err(|_| ApiError::Validation(format!("Invalid document id '{}'", raw)))
    }
}

/// Generate the summary of a document, or return the existing one.
#[utoipa::path(
    post,
    path = "/api/resumes/generate",
    request_body = GenerateRequest,
    responses(
        (status = 201, description = "Summary generated", body = ResumeResponse),
        (status = 200, description = "Summary already existed", body = ResumeResponse),
        (status = 400, description = "Missing or invalid document id"),
        (status = 403, description = "Document belongs to another user"),
        (status = 404, description = "Document or its file not found"),
        (status = 500, description = "Summarization service failure")
    ),
    security(("bearer" = []))
)]
pub async fn generate_resume_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let document_id = req.document_id()?;
    let generated = state
        .pipeline
        .generate_summary(document_id, identity.user_id)
        .await?;

    let (status, message) = if generated.created {
        info!(%document_id, summary_id = %generated.summary.summary.id, "Summary generated");
        (StatusCode::CREATED, "Summary generated successfully")
    } else {
        (StatusCode::OK, "A summary already exists for this document")
    };

    Ok((
        status,
        Json(ResumeResponse {
            message: message.to_string(),
            resume: generated.summary.into(),
        }),
    ))
}

/// List the summaries of the caller's documents, most recent first.
#[utoipa::path(
    get,
    path = "/api/resumes",
    responses(
        (status = 200, description = "Summaries of the caller", body = ResumeListResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn list_resumes_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
) -> Result<Json<ResumeListResponse>, ApiError> {
    let summaries = state.pipeline.list_summaries(identity.user_id).await?;
    Ok(Json(ResumeListResponse {
        message: "Summaries retrieved successfully".to_string(),
        resumes: summaries.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/resumes/document/{documentId}",
    params(("documentId" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "The summary of the document", body = ResumeResponse),
        (status = 403, description = "Document belongs to another user"),
        (status = 404, description = "Document or summary not found")
    ),
    security(("bearer" = []))
)]
pub async fn resume_for_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<ResumeResponse>, ApiError> {
    let summary = state
        .pipeline
        .summary_for_document(document_id, identity.user_id)
        .await?;
    Ok(Json(ResumeResponse {
        message: "Summary retrieved successfully".to_string(),
        resume: summary.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/resumes/{id}",
    params(("id" = Uuid, Path, description = "Summary id")),
    responses(
        (status = 200, description = "The summary", body = ResumeResponse),
        (status = 403, description = "Summary of another user's document"),
        (status = 404, description = "Summary not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_resume_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumeResponse>, ApiError> {
    let summary = state.pipeline.summary_by_id(id, identity.user_id).await?;
    Ok(Json(ResumeResponse {
        message: "Summary retrieved successfully".to_string(),
        resume: summary.into(),
    }))
}

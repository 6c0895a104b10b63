//! services/api/src/web/documents.rs
//!
//! Handlers for uploading, listing, reading and deleting documents.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use docsum_core::domain::UserIdentity;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::rest::{DocumentListResponse, DocumentResponse, MessageResponse};
use crate::web::state::AppState;

/// Name of the multipart field carrying the file.
pub const UPLOAD_FIELD: &str = "document";

/// Upload a document.
///
/// Accepts a multipart/form-data request whose `document` part holds a PDF,
/// DOC, DOCX or TXT file.
#[utoipa::path(
    post,
    path = "/api/documents/upload",
    request_body(content_type = "multipart/form-data", description = "The document to upload, in the `document` field."),
    responses(
        (status = 201, description = "Document uploaded", body = DocumentResponse),
        (status = 400, description = "No file, unsupported type or file too large"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read multipart data: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("untitled").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read file bytes: {}", e)))?;

        let document = state
            .pipeline
            .upload_document(identity.user_id, &data, &file_name, &content_type)
            .await?;

        return Ok((
            StatusCode::CREATED,
            Json(DocumentResponse {
                message: "Document uploaded successfully".to_string(),
                document: document.into(),
            }),
        ));
    }

    Err(ApiError::Validation(format!(
        "No file provided in the '{}' field",
        UPLOAD_FIELD
    )))
}

/// List the caller's documents, most recent first.
#[utoipa::path(
    get,
    path = "/api/documents",
    responses(
        (status = 200, description = "Documents of the caller", body = DocumentListResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents = state.pipeline.list_documents(identity.user_id).await?;
    Ok(Json(DocumentListResponse {
        message: "Documents retrieved successfully".to_string(),
        documents: documents.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "The document", body = DocumentResponse),
        (status = 403, description = "Document belongs to another user"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let document = state.pipeline.get_document(id, identity.user_id).await?;
    Ok(Json(DocumentResponse {
        message: "Document retrieved successfully".to_string(),
        document: document.into(),
    }))
}

/// Delete a document, its stored file and its summary.
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document deleted", body = MessageResponse),
        (status = 403, description = "Document belongs to another user"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_document_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.pipeline.delete_document(id, identity.user_id).await?;
    Ok(Json(MessageResponse {
        message: "Document deleted successfully".to_string(),
    }))
}

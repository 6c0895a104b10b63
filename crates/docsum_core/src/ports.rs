//! crates/docsum_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::{
    Document, NewDocument, NewSummary, ProfileUpdate, StorageHandle, Summary, User,
    UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all store operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Store Ports
//=========================================================================================

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Creates a user. Fails with `Conflict` when the email is already taken.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    /// Applies a profile update. Fails with `Conflict` when the new email belongs
    /// to another user.
    async fn update_user(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(&self, document: NewDocument) -> PortResult<Document>;

    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document>;

    /// Documents owned by `owner_id`, most recent upload first.
    async fn list_documents_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Document>>;

    /// Deletes the document row together with its summary, if any.
    async fn delete_document(&self, document_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Inserts a summary. Fails with `Conflict` when one already exists for the document.
    async fn insert_summary(&self, summary: NewSummary) -> PortResult<Summary>;

    async fn find_summary_by_document(&self, document_id: Uuid) -> PortResult<Option<Summary>>;

    async fn get_summary_by_id(&self, summary_id: Uuid) -> PortResult<Summary>;

    /// Summaries belonging to any of `document_ids`, most recently generated first.
    async fn list_summaries_by_documents(&self, document_ids: &[Uuid]) -> PortResult<Vec<Summary>>;
}

//=========================================================================================
// File Staging Port
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Unsupported file type '{0}'. Only PDF, DOC, DOCX and TXT files are accepted.")]
    UnsupportedType(String),
    #[error("File is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait FileStager: Send + Sync {
    /// Validates and writes an uploaded file to durable storage.
    async fn stage(
        &self,
        bytes: &[u8],
        original_name: &str,
        declared_mime: &str,
        owner_id: Uuid,
    ) -> Result<StorageHandle, StageError>;

    /// Deletes the bytes behind `handle`. Already absent is not an error.
    async fn release(&self, handle: &StorageHandle) -> Result<(), StageError>;

    async fn exists(&self, handle: &StorageHandle) -> bool;
}

//=========================================================================================
// Summarization Port
//=========================================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SummarizeError {
    #[error("Staged file not found: {0}")]
    FileMissing(String),
    #[error("Summarization service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Summarization service timed out after {0:?}")]
    Timeout(Duration),
    #[error("Summarization service error ({status}): {message}")]
    UpstreamError { status: u16, message: String },
    #[error("Malformed summarization response: {0}")]
    MalformedResponse(String),
    #[error("Summarization transport error: {0}")]
    TransportError(String),
}

impl SummarizeError {
    /// Whether a caller may reasonably try the same request again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            SummarizeError::ServiceUnavailable(_) | SummarizeError::Timeout(_) => true,
            SummarizeError::UpstreamError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[async_trait]
pub trait SummarizationService: Send + Sync {
    /// Sends the staged file to the summarization service and returns the summary text.
    async fn summarize(&self, handle: &StorageHandle) -> Result<String, SummarizeError>;
}

//=========================================================================================
// Token Port
//=========================================================================================

/// Why a bearer token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,
    #[error("Token expired")]
    Expired,
}

pub trait TokenService: Send + Sync {
    fn issue(&self, user_id: Uuid) -> PortResult<String>;

    /// Verifies signature and expiry, returning the user id the token was issued for.
    fn verify(&self, token: &str) -> Result<Uuid, TokenError>;
}

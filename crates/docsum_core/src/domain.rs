//! crates/docsum_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// MIME types accepted by the file stager.
pub const SUPPORTED_MIME_TYPES: [&str; 4] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Returns true when `mime` is one of [`SUPPORTED_MIME_TYPES`].
pub fn is_supported_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or("").trim();
    SUPPORTED_MIME_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(essence))
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Represents a user - used throughout app. Never carries the password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Fields a user may change on their own profile. `None` leaves the field as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// The identity resolved from a bearer token by the access gate.
#[derive(Debug, Clone, PartialEq)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserIdentity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

//=========================================================================================
// Documents
//=========================================================================================

/// The document type derived from the original file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Pdf,
    Doc,
    Docx,
    Txt,
    Unknown,
}

impl DocumentType {
    /// Maps the extension of `filename` (case-insensitive) to a type.
    pub fn from_filename(filename: &str) -> Self {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => DocumentType::Pdf,
            "doc" => DocumentType::Doc,
            "docx" => DocumentType::Docx,
            "txt" => DocumentType::Txt,
            _ => DocumentType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Doc => "doc",
            DocumentType::Docx => "docx",
            DocumentType::Txt => "txt",
            DocumentType::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "pdf" => DocumentType::Pdf,
            "doc" => DocumentType::Doc,
            "docx" => DocumentType::Docx,
            "txt" => DocumentType::Txt,
            _ => DocumentType::Unknown,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata of an uploaded document. The bytes live at `storage_path`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub original_filename: String,
    pub declared_type: DocumentType,
    pub size_bytes: u64,
    pub storage_path: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn storage_handle(&self) -> StorageHandle {
        StorageHandle {
            path: PathBuf::from(&self.storage_path),
            size_bytes: self.size_bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: Uuid,
    pub original_filename: String,
    pub declared_type: DocumentType,
    pub size_bytes: u64,
    pub storage_path: String,
}

/// A reference to bytes written by the file stager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageHandle {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl StorageHandle {
    /// The file name portion of the stored path, used when forwarding the file.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

//=========================================================================================
// Summaries
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionCategory {
    Urgent,
    Important,
    Normal,
    Information,
}

impl SuggestionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionCategory::Urgent => "urgent",
            SuggestionCategory::Important => "important",
            SuggestionCategory::Normal => "normal",
            SuggestionCategory::Information => "information",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "urgent" => Some(SuggestionCategory::Urgent),
            "important" => Some(SuggestionCategory::Important),
            "normal" => Some(SuggestionCategory::Normal),
            "information" => Some(SuggestionCategory::Information),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub action: String,
    pub category: SuggestionCategory,
}

/// A key sentence of a summary. `importance` is always within 1..=5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPoint {
    pub text: String,
    pub importance: u8,
}

/// A generated summary. At most one exists per document.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub generated_at: DateTime<Utc>,
    pub key_points: Vec<KeyPoint>,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone)]
pub struct NewSummary {
    pub document_id: Uuid,
    pub content: String,
    pub key_points: Vec<KeyPoint>,
    pub suggestions: Vec<Suggestion>,
}

/// Minimal document metadata joined onto summaries for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    pub id: Uuid,
    pub original_filename: String,
    pub declared_type: DocumentType,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Document> for DocumentMeta {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            original_filename: doc.original_filename.clone(),
            declared_type: doc.declared_type,
            uploaded_at: doc.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryWithDocument {
    pub summary: Summary,
    pub document: DocumentMeta,
}

//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the store ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docsum_core::domain::{
    Document, DocumentType, KeyPoint, NewDocument, NewSummary, ProfileUpdate, Role, Suggestion,
    SuggestionCategory, Summary, User, UserCredentials,
};
use docsum_core::ports::{CredentialStore, DocumentStore, PortError, PortResult, SummaryStore};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements all three store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a failed write, turning unique-constraint violations into `Conflict`.
fn write_error(e: sqlx::Error, conflict_message: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            PortError::Conflict(conflict_message.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";
const DOCUMENT_COLUMNS: &str =
    "id, owner_id, original_filename, declared_type, size_bytes, storage_path, uploaded_at";
const SUMMARY_COLUMNS: &str = "id, document_id, content, key_points, suggestions, generated_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_credentials(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                name: self.name,
                email: self.email,
                role: Role::parse(&self.role).unwrap_or_default(),
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        }
    }

    fn to_domain(self) -> User {
        self.to_credentials().user
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    owner_id: Uuid,
    original_filename: String,
    declared_type: String,
    size_bytes: i64,
    storage_path: String,
    uploaded_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            owner_id: self.owner_id,
            original_filename: self.original_filename,
            declared_type: DocumentType::parse(&self.declared_type),
            size_bytes: self.size_bytes.max(0) as u64,
            storage_path: self.storage_path,
            uploaded_at: self.uploaded_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct KeyPointRecord {
    text: String,
    importance: u8,
}

#[derive(Serialize, Deserialize)]
struct SuggestionRecord {
    action: String,
    category: String,
}

#[derive(FromRow)]
struct SummaryRecord {
    id: Uuid,
    document_id: Uuid,
    content: String,
    key_points: Json<Vec<KeyPointRecord>>,
    suggestions: Json<Vec<SuggestionRecord>>,
    generated_at: DateTime<Utc>,
}
impl SummaryRecord {
    fn to_domain(self) -> Summary {
        Summary {
            id: self.id,
            document_id: self.document_id,
            content: self.content,
            generated_at: self.generated_at,
            key_points: self
                .key_points
                .0
                .into_iter()
                .map(|k| KeyPoint {
                    text: k.text,
                    importance: k.importance.clamp(1, 5),
                })
                .collect(),
            suggestions: self
                .suggestions
                .0
                .into_iter()
                .map(|s| Suggestion {
                    action: s.action,
                    category: SuggestionCategory::parse(&s.category)
                        .unwrap_or(SuggestionCategory::Information),
                })
                .collect(),
        }
    }
}

//=========================================================================================
// `CredentialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialStore for DbAdapter {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, role) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .bind(Role::User.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "This email is already in use"))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))?;
        Ok(record.to_credentials())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn update_user(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), updated_at = now() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(update.name)
            .bind(update.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, "This email is already in use"))?
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn create_document(&self, document: NewDocument) -> PortResult<Document> {
        let sql = format!(
            "INSERT INTO documents (id, owner_id, original_filename, declared_type, size_bytes, storage_path) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            DOCUMENT_COLUMNS
        );
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(document.owner_id)
            .bind(&document.original_filename)
            .bind(document.declared_type.as_str())
            .bind(document.size_bytes as i64)
            .bind(&document.storage_path)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document> {
        let sql = format!("SELECT {} FROM documents WHERE id = $1", DOCUMENT_COLUMNS);
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Document {} not found", document_id))
                }
                _ => PortError::Unexpected(e.to_string()),
            })?;
        Ok(record.to_domain())
    }

    async fn list_documents_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Document>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE owner_id = $1 ORDER BY uploaded_at DESC",
            DOCUMENT_COLUMNS
        );
        let records = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let documents = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(documents)
    }

    async fn delete_document(&self, document_id: Uuid) -> PortResult<()> {
        // The summary goes with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Document {} not found", document_id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `SummaryStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummaryStore for DbAdapter {
    async fn insert_summary(&self, summary: NewSummary) -> PortResult<Summary> {
        let key_points: Vec<KeyPointRecord> = summary
            .key_points
            .into_iter()
            .map(|k| KeyPointRecord {
                text: k.text,
                importance: k.importance,
            })
            .collect();
        let suggestions: Vec<SuggestionRecord> = summary
            .suggestions
            .into_iter()
            .map(|s| SuggestionRecord {
                action: s.action,
                category: s.category.as_str().to_string(),
            })
            .collect();

        let sql = format!(
            "INSERT INTO summaries (id, document_id, content, key_points, suggestions) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            SUMMARY_COLUMNS
        );
        let record = sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(summary.document_id)
            .bind(&summary.content)
            .bind(Json(key_points))
            .bind(Json(suggestions))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(e, "A summary already exists for this document"))?;
        Ok(record.to_domain())
    }

    async fn find_summary_by_document(&self, document_id: Uuid) -> PortResult<Option<Summary>> {
        let sql = format!("SELECT {} FROM summaries WHERE document_id = $1", SUMMARY_COLUMNS);
        let record = sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.map(|r| r.to_domain()))
    }

    async fn get_summary_by_id(&self, summary_id: Uuid) -> PortResult<Summary> {
        let sql = format!("SELECT {} FROM summaries WHERE id = $1", SUMMARY_COLUMNS);
        let record = sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(summary_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Summary {} not found", summary_id)))?;
        Ok(record.to_domain())
    }

    async fn list_summaries_by_documents(&self, document_ids: &[Uuid]) -> PortResult<Vec<Summary>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM summaries WHERE document_id = ANY($1) ORDER BY generated_at DESC",
            SUMMARY_COLUMNS
        );
        let records = sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(document_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let summaries = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(summaries)
    }
}

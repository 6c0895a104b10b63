//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the store ports, used when no `DATABASE_URL`
//! is configured and by the HTTP tests. Enforces the same uniqueness rules as
//! the Postgres schema: one user per email, one summary per document.

use async_trait::async_trait;
use chrono::Utc;
use docsum_core::domain::{
    Document, NewDocument, NewSummary, ProfileUpdate, Role, Summary, User, UserCredentials,
};
use docsum_core::ports::{CredentialStore, DocumentStore, PortError, PortResult, SummaryStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserCredentials>,
    documents: HashMap<Uuid, Document>,
    summaries: HashMap<Uuid, Summary>,
}

/// Every operation takes the lock once and never holds it across an `.await`.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("memory store lock poisoned".to_string()))
    }
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|c| c.user.email == email && Some(c.user.id) != except)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User> {
        let mut tables = self.tables()?;
        if tables.email_taken(email, None) {
            return Err(PortError::Conflict("This email is already in use".to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables()?
            .users
            .values()
            .find(|c| c.user.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.tables()?
            .users
            .get(&user_id)
            .map(|c| c.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_user(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<User> {
        let mut tables = self.tables()?;
        if let Some(email) = &update.email {
            if tables.email_taken(email, Some(user_id)) {
                return Err(PortError::Conflict("This email is already in use".to_string()));
            }
        }
        let credentials = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        if let Some(name) = update.name {
            credentials.user.name = name;
        }
        if let Some(email) = update.email {
            credentials.user.email = email;
        }
        credentials.user.updated_at = Utc::now();
        Ok(credentials.user.clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(&self, document: NewDocument) -> PortResult<Document> {
        let mut tables = self.tables()?;
        if !tables.users.contains_key(&document.owner_id) {
            return Err(PortError::NotFound(format!("User {} not found", document.owner_id)));
        }
        let document = Document {
            id: Uuid::new_v4(),
            owner_id: document.owner_id,
            original_filename: document.original_filename,
            declared_type: document.declared_type,
            size_bytes: document.size_bytes,
            storage_path: document.storage_path,
            uploaded_at: Utc::now(),
        };
        tables.documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document> {
        self.tables()?
            .documents
            .get(&document_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))
    }

    async fn list_documents_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .tables()?
            .documents
            .values()
            .filter(|d| d.owner_id == owner_id)
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(documents)
    }

    async fn delete_document(&self, document_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables()?;
        if tables.documents.remove(&document_id).is_none() {
            return Err(PortError::NotFound(format!("Document {} not found", document_id)));
        }
        tables.summaries.retain(|_, s| s.document_id != document_id);
        Ok(())
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn insert_summary(&self, summary: NewSummary) -> PortResult<Summary> {
        let mut tables = self.tables()?;
        if tables
            .summaries
            .values()
            .any(|s| s.document_id == summary.document_id)
        {
            return Err(PortError::Conflict(
                "A summary already exists for this document".to_string(),
            ));
        }
        let summary = Summary {
            id: Uuid::new_v4(),
            document_id: summary.document_id,
            content: summary.content,
            generated_at: Utc::now(),
            key_points: summary.key_points,
            suggestions: summary.suggestions,
        };
        tables.summaries.insert(summary.id, summary.clone());
        Ok(summary)
    }

    async fn find_summary_by_document(&self, document_id: Uuid) -> PortResult<Option<Summary>> {
        Ok(self
            .tables()?
            .summaries
            .values()
            .find(|s| s.document_id == document_id)
            .cloned())
    }

    async fn get_summary_by_id(&self, summary_id: Uuid) -> PortResult<Summary> {
        self.tables()?
            .summaries
            .get(&summary_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Summary {} not found", summary_id)))
    }

    async fn list_summaries_by_documents(&self, document_ids: &[Uuid]) -> PortResult<Vec<Summary>> {
        let mut summaries: Vec<Summary> = self
            .tables()?
            .summaries
            .values()
            .filter(|s| document_ids.contains(&s.document_id))
            .cloned()
            .collect();
        summaries.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        Ok(summaries)
    }
}

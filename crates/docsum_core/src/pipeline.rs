//! crates/docsum_core/src/pipeline.rs
//!
//! The document pipeline: upload, owner-scoped retrieval, and summary generation
//! (stager -> summarizer -> heuristics -> summary store).

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    Document, DocumentMeta, DocumentType, NewDocument, NewSummary, Summary, SummaryWithDocument,
};
use crate::heuristics;
use crate::ports::{
    DocumentStore, FileStager, PortError, StageError, SummarizationService, SummarizeError,
    SummaryStore,
};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Access denied")]
    Forbidden,
    #[error("Document file not found on the server: {0}")]
    FileMissing(String),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error("Summary generation failed for document {document_id}: {source}")]
    Summarization {
        document_id: Uuid,
        #[source]
        source: SummarizeError,
    },
    #[error(transparent)]
    Store(#[from] PortError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// The result of a generate request.
#[derive(Debug, Clone)]
pub struct GeneratedSummary {
    pub summary: SummaryWithDocument,
    /// False when the summary already existed and was returned as is.
    pub created: bool,
}

#[derive(Clone)]
pub struct DocumentPipeline {
    documents: Arc<dyn DocumentStore>,
    summaries: Arc<dyn SummaryStore>,
    stager: Arc<dyn FileStager>,
    summarizer: Arc<dyn SummarizationService>,
}

impl DocumentPipeline {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        summaries: Arc<dyn SummaryStore>,
        stager: Arc<dyn FileStager>,
        summarizer: Arc<dyn SummarizationService>,
    ) -> Self {
        Self {
            documents,
            summaries,
            stager,
            summarizer,
        }
    }

    //=====================================================================================
    // Documents
    //=====================================================================================

    /// Stages the bytes and records the document. The staged file is released
    /// if the document cannot be recorded.
    pub async fn upload_document(
        &self,
        owner_id: Uuid,
        bytes: &[u8],
        original_filename: &str,
        declared_mime: &str,
    ) -> PipelineResult<Document> {
        let original_filename = original_filename.trim();
        if original_filename.is_empty() {
            return Err(PipelineError::Validation("A file name is required".to_string()));
        }

        let handle = self
            .stager
            .stage(bytes, original_filename, declared_mime, owner_id)
            .await?;

        let new_document = NewDocument {
            owner_id,
            original_filename: original_filename.to_string(),
            declared_type: DocumentType::from_filename(original_filename),
            size_bytes: handle.size_bytes,
            storage_path: handle.path.to_string_lossy().into_owned(),
        };

        match self.documents.create_document(new_document).await {
            Ok(document) => {
                info!(document_id = %document.id, owner_id = %owner_id, "Document uploaded");
                Ok(document)
            }
            Err(e) => {
                error!("Failed to record document {}: {:?}", original_filename, e);
                if let Err(release_err) = self.stager.release(&handle).await {
                    error!("Failed to release staged file {:?}: {:?}", handle.path, release_err);
                }
                Err(e.into())
            }
        }
    }

    pub async fn get_document(&self, document_id: Uuid, user_id: Uuid) -> PipelineResult<Document> {
        self.owned_document(document_id, user_id).await
    }

    pub async fn list_documents(&self, user_id: Uuid) -> PipelineResult<Vec<Document>> {
        Ok(self.documents.list_documents_by_owner(user_id).await?)
    }

    /// Deletes the document and its summary, then releases the file. A file that
    /// cannot be released is logged and left behind; no row ever points at a
    /// released file.
    pub async fn delete_document(&self, document_id: Uuid, user_id: Uuid) -> PipelineResult<()> {
        let document = self.owned_document(document_id, user_id).await?;
        self.documents.delete_document(document.id).await?;
        if let Err(e) = self.stager.release(&document.storage_handle()).await {
            warn!(document_id = %document.id, "Failed to release {}: {}", document.storage_path, e);
        }
        info!(document_id = %document.id, "Document deleted");
        Ok(())
    }

    //=====================================================================================
    // Summaries
    //=====================================================================================

    /// Generates the summary of a document, or returns the existing one.
    pub async fn generate_summary(
        &self,
        document_id: Uuid,
        user_id: Uuid,
    ) -> PipelineResult<GeneratedSummary> {
        let document = self.owned_document(document_id, user_id).await?;

        if let Some(existing) = self.summaries.find_summary_by_document(document.id).await? {
            return Ok(GeneratedSummary {
                summary: join(existing, &document),
                created: false,
            });
        }

        let handle = document.storage_handle();
        if !self.stager.exists(&handle).await {
            warn!(document_id = %document.id, "Staged file missing: {:?}", handle.path);
            return Err(PipelineError::FileMissing(document.storage_path.clone()));
        }

        info!(document_id = %document.id, "Generating summary for {}", document.original_filename);
        let content = self.summarizer.summarize(&handle).await.map_err(|source| {
            error!(document_id = %document.id, "Summarization failed: {}", source);
            PipelineError::Summarization {
                document_id: document.id,
                source,
            }
        })?;

        let derived = heuristics::derive(&content);
        let new_summary = NewSummary {
            document_id: document.id,
            content,
            key_points: derived.key_points,
            suggestions: derived.suggestions,
        };

        match self.summaries.insert_summary(new_summary).await {
            Ok(summary) => {
                info!(document_id = %document.id, summary_id = %summary.id, "Summary generated");
                Ok(GeneratedSummary {
                    summary: join(summary, &document),
                    created: true,
                })
            }
            // A concurrent request won the insert; hand back its row.
            Err(PortError::Conflict(_)) => {
                let winner = self
                    .summaries
                    .find_summary_by_document(document.id)
                    .await?
                    .ok_or_else(|| {
                        PortError::Unexpected(format!(
                            "Summary for document {} conflicted but could not be read back",
                            document.id
                        ))
                    })?;
                Ok(GeneratedSummary {
                    summary: join(winner, &document),
                    created: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn summary_for_document(
        &self,
        document_id: Uuid,
        user_id: Uuid,
    ) -> PipelineResult<SummaryWithDocument> {
        let document = self.owned_document(document_id, user_id).await?;
        let summary = self
            .summaries
            .find_summary_by_document(document.id)
            .await?
            .ok_or_else(|| {
                PipelineError::NotFound("No summary found for this document".to_string())
            })?;
        Ok(join(summary, &document))
    }

    pub async fn summary_by_id(
        &self,
        summary_id: Uuid,
        user_id: Uuid,
    ) -> PipelineResult<SummaryWithDocument> {
        let summary = self
            .summaries
            .get_summary_by_id(summary_id)
            .await
            .map_err(|e| not_found(e, "Summary not found"))?;
        let document = self.owned_document(summary.document_id, user_id).await?;
        Ok(join(summary, &document))
    }

    /// Summaries of every document the user owns, newest first.
    pub async fn list_summaries(&self, user_id: Uuid) -> PipelineResult<Vec<SummaryWithDocument>> {
        let documents: HashMap<Uuid, Document> = self
            .documents
            .list_documents_by_owner(user_id)
            .await?
            .into_iter()
            .map(|doc| (doc.id, doc))
            .collect();
        let ids: Vec<Uuid> = documents.keys().copied().collect();

        let mut summaries = self.summaries.list_summaries_by_documents(&ids).await?;
        summaries.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));

        Ok(summaries
            .into_iter()
            .filter_map(|summary| {
                let document = documents.get(&summary.document_id)?;
                Some(join(summary, document))
            })
            .collect())
    }

    /// Loads a document and checks it belongs to `user_id`.
    async fn owned_document(&self, document_id: Uuid, user_id: Uuid) -> PipelineResult<Document> {
        let document = self
            .documents
            .get_document_by_id(document_id)
            .await
            .map_err(|e| not_found(e, "Document not found"))?;
        if document.owner_id != user_id {
            warn!(document_id = %document_id, user_id = %user_id, "Denied access to document");
            return Err(PipelineError::Forbidden);
        }
        Ok(document)
    }
}

fn not_found(err: PortError, message: &str) -> PipelineError {
    match err {
        PortError::NotFound(_) => PipelineError::NotFound(message.to_string()),
        other => PipelineError::Store(other),
    }
}

fn join(summary: Summary, document: &Document) -> SummaryWithDocument {
    SummaryWithDocument {
        summary,
        document: DocumentMeta::from(document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StorageHandle, SuggestionCategory};
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    //=====================================================================================
    // Fakes
    //=====================================================================================

    #[derive(Default)]
    struct FakeDocuments {
        rows: Mutex<Vec<Document>>,
        fail_create: bool,
        fail_delete: bool,
    }

    #[async_trait]
    impl DocumentStore for FakeDocuments {
        async fn create_document(&self, doc: NewDocument) -> PortResult<Document> {
            if self.fail_create {
                return Err(PortError::Unexpected("disk full".to_string()));
            }
            let document = Document {
                id: Uuid::new_v4(),
                owner_id: doc.owner_id,
                original_filename: doc.original_filename,
                declared_type: doc.declared_type,
                size_bytes: doc.size_bytes,
                storage_path: doc.storage_path,
                uploaded_at: Utc::now(),
            };
            self.rows.lock().unwrap().push(document.clone());
            Ok(document)
        }

        async fn get_document_by_id(&self, id: Uuid) -> PortResult<Document> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("Document {} not found", id)))
        }

        async fn list_documents_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Document>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|d| d.owner_id == owner_id)
                .cloned()
                .collect())
        }

        async fn delete_document(&self, id: Uuid) -> PortResult<()> {
            if self.fail_delete {
                return Err(PortError::Unexpected("connection reset".to_string()));
            }
            self.rows.lock().unwrap().retain(|d| d.id != id);
            Ok(())
        }
    }

    /// A summary store that can pretend to lose the insert race once.
    #[derive(Default)]
    struct FakeSummaries {
        rows: Mutex<Vec<Summary>>,
        hide_first_lookup: Mutex<Option<Summary>>,
    }

    #[async_trait]
    impl SummaryStore for FakeSummaries {
        async fn insert_summary(&self, new: NewSummary) -> PortResult<Summary> {
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|s| s.document_id == new.document_id) {
                return Err(PortError::Conflict("summary exists".to_string()));
            }
            let summary = Summary {
                id: Uuid::new_v4(),
                document_id: new.document_id,
                content: new.content,
                generated_at: Utc::now(),
                key_points: new.key_points,
                suggestions: new.suggestions,
            };
            rows.push(summary.clone());
            Ok(summary)
        }

        async fn find_summary_by_document(&self, document_id: Uuid) -> PortResult<Option<Summary>> {
            if let Some(hidden) = self.hide_first_lookup.lock().unwrap().take() {
                // Simulate a concurrent winner inserting between lookup and insert.
                self.rows.lock().unwrap().push(hidden);
                return Ok(None);
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.document_id == document_id)
                .cloned())
        }

        async fn get_summary_by_id(&self, id: Uuid) -> PortResult<Summary> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(|| PortError::NotFound(format!("Summary {} not found", id)))
        }

        async fn list_summaries_by_documents(&self, ids: &[Uuid]) -> PortResult<Vec<Summary>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|s| ids.contains(&s.document_id))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeStager {
        files: Mutex<HashSet<PathBuf>>,
    }

    #[async_trait]
    impl FileStager for FakeStager {
        async fn stage(
            &self,
            bytes: &[u8],
            original_name: &str,
            declared_mime: &str,
            _owner_id: Uuid,
        ) -> Result<StorageHandle, StageError> {
            if !crate::domain::is_supported_mime(declared_mime) {
                return Err(StageError::UnsupportedType(declared_mime.to_string()));
            }
            let path = PathBuf::from(format!("/staged/{}-{}", Uuid::new_v4(), original_name));
            self.files.lock().unwrap().insert(path.clone());
            Ok(StorageHandle {
                path,
                size_bytes: bytes.len() as u64,
            })
        }

        async fn release(&self, handle: &StorageHandle) -> Result<(), StageError> {
            self.files.lock().unwrap().remove(&handle.path);
            Ok(())
        }

        async fn exists(&self, handle: &StorageHandle) -> bool {
            self.files.lock().unwrap().contains(&handle.path)
        }
    }

    struct FakeSummarizer {
        reply: Result<String, SummarizeError>,
        calls: AtomicUsize,
    }

    impl FakeSummarizer {
        fn replying(reply: Result<String, SummarizeError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SummarizationService for FakeSummarizer {
        async fn summarize(&self, _handle: &StorageHandle) -> Result<String, SummarizeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct Harness {
        pipeline: DocumentPipeline,
        summaries: Arc<FakeSummaries>,
        stager: Arc<FakeStager>,
        summarizer: Arc<FakeSummarizer>,
    }

    const SUMMARY_TEXT: &str =
        "Respecter la conformité avant la date limite. Le rapport décrit les étapes suivantes.";

    fn harness_with(
        documents: FakeDocuments,
        reply: Result<String, SummarizeError>,
    ) -> Harness {
        let summaries = Arc::new(FakeSummaries::default());
        let stager = Arc::new(FakeStager::default());
        let summarizer = Arc::new(FakeSummarizer::replying(reply));
        let pipeline = DocumentPipeline::new(
            Arc::new(documents),
            summaries.clone(),
            stager.clone(),
            summarizer.clone(),
        );
        Harness {
            pipeline,
            summaries,
            stager,
            summarizer,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeDocuments::default(), Ok(SUMMARY_TEXT.to_string()))
    }

    async fn upload(h: &Harness, owner: Uuid) -> Document {
        h.pipeline
            .upload_document(owner, b"%PDF-1.4", "report.pdf", "application/pdf")
            .await
            .unwrap()
    }

    //=====================================================================================
    // Documents
    //=====================================================================================

    #[tokio::test]
    async fn uploaded_document_round_trips_and_deletes() {
        let h = harness();
        let owner = Uuid::new_v4();
        let doc = upload(&h, owner).await;
        assert_eq!(doc.declared_type, DocumentType::Pdf);
        assert_eq!(doc.size_bytes, 8);

        let fetched = h.pipeline.get_document(doc.id, owner).await.unwrap();
        assert_eq!(fetched, doc);

        h.pipeline.delete_document(doc.id, owner).await.unwrap();
        assert!(h.pipeline.list_documents(owner).await.unwrap().is_empty());
        assert!(!h.stager.exists(&doc.storage_handle()).await);
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected_without_staging() {
        let h = harness();
        let err = h
            .pipeline
            .upload_document(Uuid::new_v4(), b"png", "image.png", "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Stage(StageError::UnsupportedType(_))));
        assert!(h.stager.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_record_releases_staged_file() {
        let documents = FakeDocuments {
            fail_create: true,
            ..Default::default()
        };
        let h = harness_with(documents, Ok(SUMMARY_TEXT.to_string()));
        let err = h
            .pipeline
            .upload_document(Uuid::new_v4(), b"hello", "notes.txt", "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Store(PortError::Unexpected(_))));
        assert!(h.stager.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_file() {
        let documents = FakeDocuments {
            fail_delete: true,
            ..Default::default()
        };
        let h = harness_with(documents, Ok(SUMMARY_TEXT.to_string()));
        let owner = Uuid::new_v4();
        let doc = upload(&h, owner).await;

        let err = h.pipeline.delete_document(doc.id, owner).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(PortError::Unexpected(_))));
        assert!(h.stager.exists(&doc.storage_handle()).await);
        assert_eq!(h.pipeline.get_document(doc.id, owner).await.unwrap(), doc);
    }

    #[tokio::test]
    async fn other_users_cannot_read_or_delete() {
        let h = harness();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let doc = upload(&h, owner).await;

        assert!(matches!(
            h.pipeline.get_document(doc.id, intruder).await,
            Err(PipelineError::Forbidden)
        ));
        assert!(matches!(
            h.pipeline.delete_document(doc.id, intruder).await,
            Err(PipelineError::Forbidden)
        ));
        assert!(h.stager.exists(&doc.storage_handle()).await);
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.pipeline.get_document(Uuid::new_v4(), Uuid::new_v4()).await,
            Err(PipelineError::NotFound(_))
        ));
    }

    //=====================================================================================
    // Summaries
    //=====================================================================================

    #[tokio::test]
    async fn generate_is_idempotent() {
        let h = harness();
        let owner = Uuid::new_v4();
        let doc = upload(&h, owner).await;

        let first = h.pipeline.generate_summary(doc.id, owner).await.unwrap();
        let second = h.pipeline.generate_summary(doc.id, owner).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.summary.summary.id, second.summary.summary.id);
        assert_eq!(h.summaries.rows.lock().unwrap().len(), 1);
        assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generated_summary_carries_heuristics_and_document_meta() {
        let h = harness();
        let owner = Uuid::new_v4();
        let doc = upload(&h, owner).await;

        let generated = h.pipeline.generate_summary(doc.id, owner).await.unwrap();
        let summary = &generated.summary.summary;
        assert_eq!(summary.content, SUMMARY_TEXT);
        let categories: Vec<_> = summary.suggestions.iter().map(|s| s.category).collect();
        assert_eq!(
            categories,
            vec![SuggestionCategory::Important, SuggestionCategory::Urgent]
        );
        assert_eq!(summary.key_points.len(), 2);
        assert_eq!(generated.summary.document.original_filename, "report.pdf");
        assert_eq!(generated.summary.document.declared_type, DocumentType::Pdf);
    }

    #[tokio::test]
    async fn losing_the_insert_race_returns_the_winner() {
        let h = harness();
        let owner = Uuid::new_v4();
        let doc = upload(&h, owner).await;
        let winner = Summary {
            id: Uuid::new_v4(),
            document_id: doc.id,
            content: "winner".to_string(),
            generated_at: Utc::now(),
            key_points: vec![],
            suggestions: vec![],
        };
        *h.summaries.hide_first_lookup.lock().unwrap() = Some(winner.clone());

        let generated = h.pipeline.generate_summary(doc.id, owner).await.unwrap();
        assert!(!generated.created);
        assert_eq!(generated.summary.summary.id, winner.id);
        assert_eq!(h.summaries.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_short_circuits_before_summarizer() {
        let h = harness();
        let owner = Uuid::new_v4();
        let doc = upload(&h, owner).await;
        h.stager.files.lock().unwrap().clear();

        let err = h.pipeline.generate_summary(doc.id, owner).await.unwrap_err();
        assert!(matches!(err, PipelineError::FileMissing(_)));
        assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn summarizer_errors_propagate_unchanged() {
        let h = harness_with(
            FakeDocuments::default(),
            Err(SummarizeError::ServiceUnavailable("connection refused".to_string())),
        );
        let owner = Uuid::new_v4();
        let doc = upload(&h, owner).await;

        match h.pipeline.generate_summary(doc.id, owner).await.unwrap_err() {
            PipelineError::Summarization {
                document_id,
                source,
            } => {
                assert_eq!(document_id, doc.id);
                assert_eq!(
                    source,
                    SummarizeError::ServiceUnavailable("connection refused".to_string())
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(h.summaries.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn summaries_are_owner_scoped() {
        let h = harness();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let doc = upload(&h, owner).await;
        let generated = h.pipeline.generate_summary(doc.id, owner).await.unwrap();
        let summary_id = generated.summary.summary.id;

        assert!(matches!(
            h.pipeline.generate_summary(doc.id, intruder).await,
            Err(PipelineError::Forbidden)
        ));
        assert!(matches!(
            h.pipeline.summary_for_document(doc.id, intruder).await,
            Err(PipelineError::Forbidden)
        ));
        assert!(matches!(
            h.pipeline.summary_by_id(summary_id, intruder).await,
            Err(PipelineError::Forbidden)
        ));
        assert!(h.pipeline.list_summaries(intruder).await.unwrap().is_empty());

        let by_doc = h.pipeline.summary_for_document(doc.id, owner).await.unwrap();
        let by_id = h.pipeline.summary_by_id(summary_id, owner).await.unwrap();
        assert_eq!(by_doc, by_id);
    }

    #[tokio::test]
    async fn summary_lookups_report_not_found() {
        let h = harness();
        let owner = Uuid::new_v4();
        let doc = upload(&h, owner).await;
        assert!(matches!(
            h.pipeline.summary_for_document(doc.id, owner).await,
            Err(PipelineError::NotFound(_))
        ));
        assert!(matches!(
            h.pipeline.summary_by_id(Uuid::new_v4(), owner).await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_summaries_is_newest_first() {
        let h = harness();
        let owner = Uuid::new_v4();
        let older = upload(&h, owner).await;
        let newer = upload(&h, owner).await;
        h.pipeline.generate_summary(older.id, owner).await.unwrap();
        h.pipeline.generate_summary(newer.id, owner).await.unwrap();
        {
            let mut rows = h.summaries.rows.lock().unwrap();
            for row in rows.iter_mut() {
                if row.document_id == older.id {
                    row.generated_at = Utc::now() - Duration::hours(1);
                }
            }
        }

        let listed = h.pipeline.list_summaries(owner).await.unwrap();
        let order: Vec<Uuid> = listed.iter().map(|s| s.document.id).collect();
        assert_eq!(order, vec![newer.id, older.id]);
    }
}

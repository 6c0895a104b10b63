pub mod access;
pub mod domain;
pub mod heuristics;
pub mod pipeline;
pub mod ports;

pub use access::{bearer_token, AccessGate, AuthError};
pub use domain::{
    Document, DocumentMeta, DocumentType, KeyPoint, NewDocument, NewSummary, ProfileUpdate, Role,
    StorageHandle, Suggestion, SuggestionCategory, Summary, SummaryWithDocument, User,
    UserCredentials, UserIdentity,
};
pub use pipeline::{DocumentPipeline, GeneratedSummary, PipelineError, PipelineResult};
pub use ports::{
    CredentialStore, DocumentStore, FileStager, PortError, PortResult, StageError,
    SummarizationService, SummarizeError, SummaryStore, TokenError, TokenService,
};

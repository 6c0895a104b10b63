pub mod db;
pub mod file_stager;
pub mod jwt;
pub mod memory;
pub mod summarizer;

pub use db::DbAdapter;
pub use file_stager::LocalFileStager;
pub use jwt::JwtTokenService;
pub use memory::MemoryStore;
pub use summarizer::HttpSummarizer;

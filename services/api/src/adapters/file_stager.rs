//! services/api/src/adapters/file_stager.rs
//!
//! Local filesystem implementation of the `FileStager` port.

use async_trait::async_trait;
use chrono::Utc;
use docsum_core::domain::{is_supported_mime, StorageHandle};
use docsum_core::ports::{FileStager, StageError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// Writes uploads under a single directory with collision-resistant names.
pub struct LocalFileStager {
    base_path: PathBuf,
    max_bytes: u64,
}

impl LocalFileStager {
    pub fn new(base_path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            base_path: base_path.into(),
            max_bytes,
        }
    }

    /// `document-<millis>-<random><.ext>`, keeping the original extension.
    fn staged_name(original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default();
        format!(
            "document-{}-{}{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        )
    }
}

#[async_trait]
impl FileStager for LocalFileStager {
    async fn stage(
        &self,
        bytes: &[u8],
        original_name: &str,
        declared_mime: &str,
        owner_id: Uuid,
    ) -> Result<StorageHandle, StageError> {
        if !is_supported_mime(declared_mime) {
            warn!("Rejected upload {} with type '{}'", original_name, declared_mime);
            return Err(StageError::UnsupportedType(declared_mime.to_string()));
        }
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            warn!("Rejected upload {} of {} bytes", original_name, size);
            return Err(StageError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }

        fs::create_dir_all(&self.base_path).await?;
        let handle = StorageHandle {
            path: self.base_path.join(Self::staged_name(original_name)),
            size_bytes: size,
        };

        if let Err(e) = fs::write(&handle.path, bytes).await {
            self.release(&handle).await.ok();
            return Err(StageError::Io(e));
        }

        info!(owner_id = %owner_id, "Staged {} at {:?}", original_name, handle.path);
        Ok(handle)
    }

    async fn release(&self, handle: &StorageHandle) -> Result<(), StageError> {
        match fs::remove_file(&handle.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StageError::Io(e)),
        }
    }

    async fn exists(&self, handle: &StorageHandle) -> bool {
        fs::try_exists(&handle.path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_entries(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn stage_writes_bytes_with_original_extension() {
        let dir = TempDir::new().unwrap();
        let stager = LocalFileStager::new(dir.path(), 1024);

        let handle = stager
            .stage(b"hello world", "Notes.TXT", "text/plain", Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(handle.size_bytes, 11);
        assert!(handle.file_name().starts_with("document-"));
        assert!(handle.file_name().ends_with(".txt"));
        assert_eq!(std::fs::read(&handle.path).unwrap(), b"hello world");
        assert!(stager.exists(&handle).await);
    }

    #[tokio::test]
    async fn concurrent_names_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let stager = LocalFileStager::new(dir.path(), 1024);
        let owner = Uuid::new_v4();

        let (a, b) = tokio::join!(
            stager.stage(b"a", "same.pdf", "application/pdf", owner),
            stager.stage(b"b", "same.pdf", "application/pdf", owner),
        );
        assert_ne!(a.unwrap().path, b.unwrap().path);
        assert_eq!(dir_entries(&dir), 2);
    }

    #[tokio::test]
    async fn unsupported_type_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let stager = LocalFileStager::new(dir.path(), 1024);

        let err = stager
            .stage(b"\x89PNG", "photo.png", "image/png", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::UnsupportedType(_)));
        assert_eq!(dir_entries(&dir), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let stager = LocalFileStager::new(dir.path(), 4);

        let err = stager
            .stage(b"12345", "big.txt", "text/plain", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::TooLarge { size: 5, limit: 4 }));
        assert_eq!(dir_entries(&dir), 0);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let stager = LocalFileStager::new(dir.path(), 1024);
        let handle = stager
            .stage(b"data", "a.pdf", "application/pdf", Uuid::new_v4())
            .await
            .unwrap();

        stager.release(&handle).await.unwrap();
        assert!(!stager.exists(&handle).await);
        stager.release(&handle).await.unwrap();
    }
}

//! Staging area for uploaded attachments.
//!
//! Files live on disk only for the duration of one send. Every staged file
//! is removed exactly once: by [`AttachmentStage::release`] after dispatch,
//! or by `Drop` if the stage is abandoned before that.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DeliveryError;

/// An uploaded file held in memory until it is staged.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A file written to temporary storage for one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAttachment {
    /// Name the visitor uploaded it under; used as the attachment filename.
    pub original_name: String,
    pub temporary_path: PathBuf,
    pub size_bytes: u64,
}

/// Owns the staged files of a single send.
#[derive(Debug)]
pub struct AttachmentStage {
    dir: PathBuf,
    files: Vec<StagedAttachment>,
}

impl AttachmentStage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
        }
    }

    pub fn attachments(&self) -> &[StagedAttachment] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write `upload` under a unique name in the staging directory.
    pub async fn stage(&mut self, upload: &Upload) -> Result<&StagedAttachment, DeliveryError> {
        let staging_err = |source| DeliveryError::Staging {
            name: upload.file_name.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).await.map_err(staging_err)?;

        let path = self
            .dir
            .join(format!("{}-{}", Uuid::new_v4(), sanitize_file_name(&upload.file_name)));

        if let Err(e) = fs::write(&path, &upload.bytes).await {
            // A partial write may have left the file behind.
            discard_partial(&path).await;
            return Err(staging_err(e));
        }

        debug!(name = %upload.file_name, path = %path.display(), "Attachment staged");
        self.files.push(StagedAttachment {
            original_name: upload.file_name.clone(),
            temporary_path: path,
            size_bytes: upload.bytes.len() as u64,
        });
        Ok(&self.files[self.files.len() - 1])
    }

    /// Stage every upload, in order.
    pub async fn stage_all(&mut self, uploads: &[Upload]) -> Result<(), DeliveryError> {
        for upload in uploads {
            self.stage(upload).await?;
        }
        Ok(())
    }

    /// Remove every staged file. Removal failures are logged and swallowed.
    ///
    /// Returns how many files were actually removed.
    pub async fn release(mut self) -> usize {
        let files = std::mem::take(&mut self.files);
        let mut removed = 0;
        for file in files {
            match fs::remove_file(&file.temporary_path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    path = %file.temporary_path.display(),
                    error = %e,
                    "Failed to remove staged attachment"
                ),
            }
        }
        removed
    }
}

impl Drop for AttachmentStage {
    fn drop(&mut self) {
        for file in self.files.drain(..) {
            if let Err(e) = std::fs::remove_file(&file.temporary_path) {
                warn!(
                    path = %file.temporary_path.display(),
                    error = %e,
                    "Failed to remove abandoned attachment"
                );
            }
        }
    }
}

/// Remove a file whose write failed. Returns whether nothing is left at `path`.
async fn discard_partial(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove partially staged attachment"
            );
            false
        }
    }
}

/// Keep the last path component and replace anything unusual with `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn stage_writes_file_with_metadata() {
        let tmp = TempDir::new().unwrap();
        let mut stage = AttachmentStage::new(tmp.path());

        let staged = stage.stage(&Upload::new("notes.txt", b"hello".to_vec())).await.unwrap().clone();
        assert_eq!(staged.original_name, "notes.txt");
        assert_eq!(staged.size_bytes, 5);
        assert!(staged.temporary_path.starts_with(tmp.path()));
        assert_eq!(std::fs::read(&staged.temporary_path).unwrap(), b"hello");

        assert_eq!(stage.release().await, 1);
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn same_name_twice_gets_distinct_paths() {
        let tmp = TempDir::new().unwrap();
        let mut stage = AttachmentStage::new(tmp.path());
        let uploads = vec![Upload::new("a.pdf", b"1".to_vec()), Upload::new("a.pdf", b"2".to_vec())];
        stage.stage_all(&uploads).await.unwrap();

        let paths: Vec<_> = stage.attachments().iter().map(|a| &a.temporary_path).collect();
        assert_ne!(paths[0], paths[1]);
        assert_eq!(entries(tmp.path()), 2);
        assert_eq!(stage.release().await, 2);
    }

    #[tokio::test]
    async fn drop_removes_unreleased_files() {
        let tmp = TempDir::new().unwrap();
        {
            let mut stage = AttachmentStage::new(tmp.path());
            stage.stage(&Upload::new("x.bin", vec![0u8; 16])).await.unwrap();
            assert_eq!(entries(tmp.path()), 1);
        }
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn release_tolerates_already_removed_file() {
        let tmp = TempDir::new().unwrap();
        let mut stage = AttachmentStage::new(tmp.path());
        let path = stage
            .stage(&Upload::new("gone.txt", b"x".to_vec()))
            .await
            .unwrap()
            .temporary_path
            .clone();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(stage.release().await, 0);
    }

    #[tokio::test]
    async fn staging_directory_is_created() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("uploads/nested");
        let mut stage = AttachmentStage::new(&dir);
        stage.stage(&Upload::new("a.txt", b"a".to_vec())).await.unwrap();
        assert!(dir.is_dir());
        stage.release().await;
    }

    #[tokio::test]
    async fn discard_partial_reports_leftovers() {
        let tmp = TempDir::new().unwrap();
        let partial = tmp.path().join("partial.bin");
        std::fs::write(&partial, b"half").unwrap();

        assert!(discard_partial(&partial).await);
        assert!(!partial.exists());
        assert!(discard_partial(&partial).await);

        // A directory cannot be removed as a file; the failure is logged, not raised.
        let dir = tmp.path().join("not-a-file");
        std::fs::create_dir(&dir).unwrap();
        assert!(!discard_partial(&dir).await);
        assert!(dir.exists());
    }

    #[tokio::test]
    async fn unusable_staging_dir_is_a_staging_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("uploads");
        std::fs::write(&blocker, b"i am a file").unwrap();

        let mut stage = AttachmentStage::new(&blocker);
        let err = stage.stage(&Upload::new("a.txt", b"a".to_vec())).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Staging { ref name, .. } if name == "a.txt"));
        assert!(stage.is_empty());
    }

    #[test]
    fn sanitize_strips_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my report (final).pdf"), "my_report__final_.pdf");
        assert_eq!(sanitize_file_name(".."), "attachment");
        assert_eq!(sanitize_file_name(""), "attachment");
    }
}

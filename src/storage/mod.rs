//! Document store.
//!
//! Uploaded documents live outside the submission record; the record
//! only carries an opaque attachment reference. The filesystem backend
//! writes under a single upload folder with a generated reference.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{Error, Result};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist an uploaded document and return its opaque reference.
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String>;

    /// Load a document back by reference. `NotFound` for unknown refs;
    /// authorization is the policy engine's job, not the store's.
    async fn fetch(&self, attachment_ref: &str) -> Result<Vec<u8>>;

    /// Drop a stored document. Unknown refs are not an error: the
    /// record deletion has already committed when this runs.
    async fn remove(&self, attachment_ref: &str) -> Result<()>;
}

pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn generate_ref(filename: &str) -> String {
        format!(
            "{}_{}_{}",
            Utc::now().format("%Y%m%d"),
            &Uuid::new_v4().to_string()[..8],
            sanitize(filename)
        )
    }

    fn path_for(&self, attachment_ref: &str) -> Result<PathBuf> {
        // Refs are single path components; anything else never came
        // from `generate_ref`.
        if attachment_ref.is_empty()
            || attachment_ref.contains("..")
            || attachment_ref.contains('/')
            || attachment_ref.contains('\\')
        {
            return Err(Error::NotFound);
        }
        Ok(self.root.join(attachment_ref))
    }
}

fn sanitize(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let attachment_ref = Self::generate_ref(filename);
        let path = self.root.join(&attachment_ref);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::DependencyUnavailable(format!("document write failed: {}", e)))?;
        Ok(attachment_ref)
    }

    async fn fetch(&self, attachment_ref: &str) -> Result<Vec<u8>> {
        let path = self.path_for(attachment_ref)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound),
            Err(e) => Err(Error::DependencyUnavailable(format!(
                "document read failed: {}",
                e
            ))),
        }
    }

    async fn remove(&self, attachment_ref: &str) -> Result<()> {
        let path = self.path_for(attachment_ref)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::DependencyUnavailable(format!(
                "document delete failed: {}",
                e
            ))),
        }
    }
}

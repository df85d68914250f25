//! File hosting service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::ReceiptFile;
use thiserror::Error;

/// A file stored by the hosting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Public URL of the hosted file.
    pub url: String,
    /// Identifier assigned by the hosting service.
    pub file_id: String,
}

/// Upload failures. Checkout never fails because of one.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Upload service unavailable: {0}")]
    Unavailable(String),
}

/// Trait for hosting uploaded files.
#[async_trait]
pub trait UploadService: Send + Sync {
    /// Stores a file under a folder with search tags.
    async fn upload(
        &self,
        file: &ReceiptFile,
        folder: &str,
        tags: &[String],
    ) -> Result<UploadedFile, UploadError>;
}

#[derive(Debug, Default)]
struct InMemoryUploadState {
    files: HashMap<String, (String, Vec<String>)>,
    next_id: u32,
    fail_on_upload: bool,
}

/// In-memory file hosting for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUploadService {
    state: Arc<RwLock<InMemoryUploadState>>,
}

impl InMemoryUploadService {
    /// Creates a new in-memory upload service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on upload calls.
    pub fn set_fail_on_upload(&self, fail: bool) {
        if let Ok(mut state) = self.state.write() {
            state.fail_on_upload = fail;
        }
    }

    /// Returns the number of stored files.
    pub fn file_count(&self) -> usize {
        self.state.read().map_or(0, |state| state.files.len())
    }

    /// Returns the tags a file was stored with.
    pub fn tags_of(&self, file_id: &str) -> Option<Vec<String>> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.files.get(file_id).map(|(_, tags)| tags.clone()))
    }
}

#[async_trait]
impl UploadService for InMemoryUploadService {
    async fn upload(
        &self,
        file: &ReceiptFile,
        folder: &str,
        tags: &[String],
    ) -> Result<UploadedFile, UploadError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| UploadError::Unavailable("state lock poisoned".to_string()))?;

        if state.fail_on_upload {
            return Err(UploadError::Unavailable("simulated outage".to_string()));
        }
        if file.bytes.is_empty() {
            return Err(UploadError::Rejected(format!("{} is empty", file.file_name)));
        }

        state.next_id += 1;
        let file_id = format!("FILE-{:04}", state.next_id);
        let url = format!("memory://{folder}/{file_id}/{}", file.file_name);
        state
            .files
            .insert(file_id.clone(), (url.clone(), tags.to_vec()));

        Ok(UploadedFile { url, file_id })
    }
}

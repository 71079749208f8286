use std::path::Path;
use std::sync::Arc;

/// A read-only view of an item in remote storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub title: String,
    pub parent_folder_id: String,
    pub is_folder: bool,
}

/// Errors from the remote storage capability. None of these are recovered
/// locally; they abort the sync run.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

/// Remote file store that staging directories are mirrored from.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human-readable label identifying this store.
    fn label(&self) -> &str;

    /// Immediate children of a folder. Trashed items are never returned.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError>;

    /// Download a file's content to `destination`, replacing any existing file.
    async fn download(&self, file_id: &str, destination: &Path) -> Result<(), RemoteError>;
}

#[async_trait::async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError> {
        (**self).list_children(folder_id).await
    }

    async fn download(&self, file_id: &str, destination: &Path) -> Result<(), RemoteError> {
        (**self).download(file_id, destination).await
    }
}

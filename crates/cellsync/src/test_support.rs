use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{RemoteError, RemoteFile, RemoteStore};

/// In-memory remote store for testing. Children keep insertion order.
pub struct InMemoryRemote {
    label: String,
    children: HashMap<String, Vec<RemoteFile>>,
    contents: HashMap<String, Vec<u8>>,
    failing: Vec<String>,
    downloads: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: HashMap::new(),
            contents: HashMap::new(),
            failing: Vec::new(),
            downloads: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn add_file(&mut self, parent: &str, id: &str, title: &str, content: &[u8]) {
        self.push_child(parent, id, title, false);
        self.contents.insert(id.to_owned(), content.to_vec());
    }

    pub fn add_folder(&mut self, parent: &str, id: &str, title: &str) {
        self.push_child(parent, id, title, true);
    }

    /// Make downloads of `id` fail with a network error.
    pub fn fail_download(&mut self, id: &str) {
        self.failing.push(id.to_owned());
    }

    /// IDs downloaded so far, in order.
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn push_child(&mut self, parent: &str, id: &str, title: &str, is_folder: bool) {
        self.children
            .entry(parent.to_owned())
            .or_default()
            .push(RemoteFile {
                id: id.to_owned(),
                title: title.to_owned(),
                parent_folder_id: parent.to_owned(),
                is_folder,
            });
    }
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryRemote {
    fn label(&self) -> &str {
        &self.label
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.children.get(folder_id).cloned().unwrap_or_default())
    }

    async fn download(&self, file_id: &str, destination: &Path) -> Result<(), RemoteError> {
        if self.failing.iter().any(|id| id == file_id) {
            return Err(RemoteError::Network(format!("download of {file_id} failed")));
        }

        let content = self
            .contents
            .get(file_id)
            .ok_or_else(|| RemoteError::Other(format!("no such file: {file_id}")))?;

        std::fs::write(destination, content).map_err(|e| RemoteError::Io(e.to_string()))?;
        self.downloads.lock().unwrap().push(file_id.to_owned());
        Ok(())
    }
}

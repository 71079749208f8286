use std::io::Write;
use std::path::Path;

use cellsync::{RemoteError, RemoteFile, RemoteStore};

use crate::files::FileListResponse;

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType)";
const PAGE_SIZE: &str = "1000";

/// HTTP client for the Google Drive v3 files API.
///
/// Authentication is a pre-issued OAuth bearer token; obtaining and
/// refreshing it is left to the caller.
pub struct DriveClient {
    client: reqwest::Client,
    token: Option<String>,
    api_base_url: Option<String>,
}

impl DriveClient {
    pub fn new(token: Option<String>, api_base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            api_base_url,
        }
    }

    fn api_base(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or("https://www.googleapis.com")
    }

    fn build_request(&self, url: reqwest::Url) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url).header("User-Agent", "cellsync");

        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        req
    }

    fn list_url(&self, folder_id: &str, page_token: Option<&str>) -> Result<reqwest::Url, RemoteError> {
        let query = children_query(folder_id);
        let mut params = vec![
            ("q", query.as_str()),
            ("fields", LIST_FIELDS),
            ("pageSize", PAGE_SIZE),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        reqwest::Url::parse_with_params(&format!("{}/drive/v3/files", self.api_base()), &params)
            .map_err(|e| RemoteError::Other(format!("invalid Drive URL: {e}")))
    }

    fn download_url(&self, file_id: &str) -> Result<reqwest::Url, RemoteError> {
        reqwest::Url::parse_with_params(
            &format!("{}/drive/v3/files/{}", self.api_base(), file_id),
            &[("alt", "media")],
        )
        .map_err(|e| RemoteError::Other(format!("invalid Drive URL: {e}")))
    }

    async fn send(&self, url: reqwest::Url) -> Result<reqwest::Response, RemoteError> {
        let response = self
            .build_request(url)
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_else(|_| "unknown".into());
        match status.as_u16() {
            401 | 403 => Err(RemoteError::Auth(format!("HTTP {status}: {body}"))),
            _ => Err(RemoteError::Network(format!("HTTP {status}: {body}"))),
        }
    }
}

/// Drive search expression for the non-trashed children of a folder.
fn children_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and trashed=false")
}

#[async_trait::async_trait]
impl RemoteStore for DriveClient {
    fn label(&self) -> &str {
        "google-drive"
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>, RemoteError> {
        let mut children = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = self.list_url(folder_id, page_token.as_deref())?;
            let page: FileListResponse = self
                .send(url)
                .await?
                .json()
                .await
                .map_err(|e| RemoteError::Parse(e.to_string()))?;

            children.extend(page.files.into_iter().map(|f| RemoteFile {
                is_folder: f.mime_type == FOLDER_MIME_TYPE,
                id: f.id,
                title: f.name,
                parent_folder_id: folder_id.to_owned(),
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(folder = folder_id, count = children.len(), "listed Drive folder");
        Ok(children)
    }

    async fn download(&self, file_id: &str, destination: &Path) -> Result<(), RemoteError> {
        let url = self.download_url(file_id)?;
        let mut response = self.send(url).await?;

        // Stage next to the destination so a cut-off body never replaces a
        // good local copy. The staged file is removed on drop.
        let dir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut staged = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| RemoteError::Io(format!("{}: {e}", dir.display())))?;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| RemoteError::Network(format!("failed to read file body: {e}")))?
        {
            staged
                .write_all(&chunk)
                .map_err(|e| RemoteError::Io(format!("{}: {e}", destination.display())))?;
        }

        staged
            .persist(destination)
            .map_err(|e| RemoteError::Io(format!("{}: {}", destination.display(), e.error)))?;
        Ok(())
    }
}

use serde::Deserialize;

/// Response from the Drive files listing.
/// `GET /drive/v3/files?q=...&fields=nextPageToken,files(id,name,mimeType)`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// A single file or folder in the listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

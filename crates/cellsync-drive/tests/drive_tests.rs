use std::io::{Read, Write};
use std::net::TcpListener;

use cellsync::{RemoteError, RemoteStore};
use cellsync_drive::{DriveClient, FOLDER_MIME_TYPE};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> DriveClient {
    DriveClient::new(Some("test-token".into()), Some(server.uri()))
}

/// Serves one response that promises more bytes than it sends, then hangs up.
fn truncating_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\nContent-Type: application/zip\r\n\r\nPARTIAL",
            );
            let _ = stream.flush();
        }
    });
    format!("http://{addr}")
}

fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn lists_children_of_folder() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "'root-id' in parents and trashed=false"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"id": "f1", "name": "export_20240101.zip", "mimeType": "application/zip"},
                {"id": "d1", "name": "nokia", "mimeType": FOLDER_MIME_TYPE}
            ]
        })))
        .mount(&server)
        .await;

    let children = client_for(&server).list_children("root-id").await.unwrap();

    assert_eq!(children.len(), 2);
    assert_eq!(children[0].id, "f1");
    assert_eq!(children[0].title, "export_20240101.zip");
    assert_eq!(children[0].parent_folder_id, "root-id");
    assert!(!children[0].is_folder);
    assert!(children[1].is_folder);
}

#[tokio::test]
async fn follows_page_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "a", "name": "a.zip", "mimeType": "application/zip"}],
            "nextPageToken": "page-2"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "b", "name": "b.zip", "mimeType": "application/zip"}]
        })))
        .mount(&server)
        .await;

    let children = client_for(&server).list_children("root-id").await.unwrap();
    let ids: Vec<&str> = children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn empty_folder_lists_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let children = client_for(&server).list_children("root-id").await.unwrap();
    assert!(children.is_empty());
}

#[tokio::test]
async fn unauthorized_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_children("root-id").await.unwrap_err();
    assert!(matches!(err, RemoteError::Auth(_)));
}

#[tokio::test]
async fn malformed_listing_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_children("root-id").await.unwrap_err();
    assert!(matches!(err, RemoteError::Parse(_)));
}

#[tokio::test]
async fn downloads_file_content() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/f1"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"zip-bytes".to_vec(), "application/zip"))
        .mount(&server)
        .await;

    let destination = dir.path().join("export.zip");
    client_for(&server).download("f1", &destination).await.unwrap();

    assert_eq!(std::fs::read(&destination).unwrap(), b"zip-bytes");
}

#[tokio::test]
async fn download_overwrites_existing_file() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("export.zip");
    std::fs::write(&destination, b"old and much longer content").unwrap();

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/f1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"new".to_vec(), "application/zip"))
        .mount(&server)
        .await;

    client_for(&server).download("f1", &destination).await.unwrap();
    assert_eq!(std::fs::read(&destination).unwrap(), b"new");
}

#[tokio::test]
async fn download_not_found_is_an_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .download("missing", &dir.path().join("x.zip"))
        .await;
    assert!(matches!(result, Err(RemoteError::Network(_))));
}

#[tokio::test]
async fn truncated_download_keeps_previous_copy() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("export.zip");
    std::fs::write(&destination, b"previous good copy").unwrap();

    let client = DriveClient::new(None, Some(truncating_server()));
    let result = client.download("f1", &destination).await;

    assert!(matches!(result, Err(RemoteError::Network(_))), "{result:?}");
    assert_eq!(std::fs::read(&destination).unwrap(), b"previous good copy");
    assert_eq!(dir_entries(dir.path()), vec!["export.zip"]);
}

#[tokio::test]
async fn truncated_download_leaves_no_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("export.zip");

    let client = DriveClient::new(None, Some(truncating_server()));
    assert!(client.download("f1", &destination).await.is_err());

    assert!(!destination.exists());
    assert!(dir_entries(dir.path()).is_empty());
}

#[tokio::test]
async fn handles_network_error() {
    let client = DriveClient::new(None, Some("http://127.0.0.1:1".into()));
    let result = client.list_children("root-id").await;
    assert!(matches!(result, Err(RemoteError::Network(_))));
}

//! HTTP client wrapper for the Drive v3 API.

use crate::drive::listing::stream_files;
use crate::drive::types::{DriveError, RemoteDocumentListing};
use async_trait::async_trait;
use futures_util::{StreamExt, pin_mut};
use reqwest::{Client, Method, Url};

const PDF_MIME_TYPE: &str = "application/pdf";

/// Read access to the folder holding the source documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Enumerate every PDF in the configured folder, keyed by document name.
    async fn list_documents(&self) -> Result<RemoteDocumentListing, DriveError>;

    /// Download the raw bytes of one document.
    async fn download(&self, remote_id: &str) -> Result<Vec<u8>, DriveError>;
}

/// Lightweight HTTP client for the Drive operations used by the sync.
pub struct DriveService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    access_token: String,
    folder_id: String,
}

impl DriveService {
    /// Construct a client for `folder_id` against the given Drive API base URL.
    pub fn with_base_url(
        base_url: &str,
        access_token: impl Into<String>,
        folder_id: impl Into<String>,
    ) -> Result<Self, DriveError> {
        let client = Client::builder().user_agent("drive-pdf-sync/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(DriveError::InvalidUrl)?;
        let folder_id = folder_id.into();
        tracing::debug!(url = %base_url, folder = %folder_id, "Initialized Drive HTTP client");

        Ok(Self {
            client,
            base_url,
            access_token: access_token.into(),
            folder_id,
        })
    }

    /// Drive search expression selecting the PDFs directly inside the folder.
    pub fn folder_query(&self) -> String {
        let folder = self.folder_id.replace('\\', "\\\\").replace('\'', "\\'");
        format!("'{folder}' in parents and mimeType='{PDF_MIME_TYPE}' and trashed=false")
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }
}

#[async_trait]
impl DocumentSource for DriveService {
    async fn list_documents(&self) -> Result<RemoteDocumentListing, DriveError> {
        let stream = stream_files(self, self.folder_query());
        pin_mut!(stream);

        let mut listing = RemoteDocumentListing::new();
        while let Some(file) = stream.next().await {
            let file = file?;
            if let Some(previous) = listing.insert(file.name.clone(), file.id) {
                tracing::warn!(
                    document = %file.name,
                    replaced = %previous,
                    "Duplicate document name in folder; keeping the later entry"
                );
            }
        }

        tracing::debug!(folder = %self.folder_id, documents = listing.len(), "Listed Drive folder");
        Ok(listing)
    }

    async fn download(&self, remote_id: &str) -> Result<Vec<u8>, DriveError> {
        let response = self
            .request(Method::GET, &format!("files/{remote_id}"))
            .query(&[("alt", "media")])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            tracing::debug!(remote_id, bytes = bytes.len(), "Downloaded document");
            Ok(bytes.to_vec())
        } else {
            let body = response.text().await.unwrap_or_default();
            let error = DriveError::from_status(status, body);
            tracing::error!(remote_id, error = %error, "Drive download failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    #[test]
    fn folder_query_selects_pdfs_in_folder() {
        let service =
            DriveService::with_base_url("https://www.googleapis.com/drive/v3/", "t", "abc")
                .expect("service");
        assert_eq!(
            service.folder_query(),
            "'abc' in parents and mimeType='application/pdf' and trashed=false"
        );
    }

    #[tokio::test]
    async fn list_documents_maps_names_to_ids() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/files")
                    .header("authorization", "Bearer token-1")
                    .query_param(
                        "q",
                        "'folder-1' in parents and mimeType='application/pdf' and trashed=false",
                    );
                then.status(200).json_body(json!({
                    "files": [
                        { "id": "id2", "name": "B.pdf" },
                        { "id": "id1", "name": "A.pdf" }
                    ]
                }));
            })
            .await;

        let service = DriveService::with_base_url(&server.base_url(), "token-1", "folder-1")
            .expect("service");
        let listing = service.list_documents().await.expect("listing");

        mock.assert();
        let entries: Vec<_> = listing.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(entries, vec![("A.pdf", "id1"), ("B.pdf", "id2")]);
    }

    #[tokio::test]
    async fn list_documents_reports_rejected_credentials() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/files");
                then.status(401).body("invalid token");
            })
            .await;

        let service = DriveService::with_base_url(&server.base_url(), "stale", "folder-1")
            .expect("service");
        let error = service.list_documents().await.unwrap_err();

        assert!(matches!(error, DriveError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn download_fetches_media() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/files/id1")
                    .query_param("alt", "media");
                then.status(200).body("%PDF-1.4");
            })
            .await;

        let service = DriveService::with_base_url(&server.base_url(), "token", "folder-1")
            .expect("service");
        let bytes = service.download("id1").await.expect("download");

        mock.assert();
        assert_eq!(bytes, b"%PDF-1.4");
    }
}

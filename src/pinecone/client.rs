//! HTTP client wrapper for a Pinecone serverless index.

use crate::config::Config;
use crate::pinecone::types::{
    DescribeIndexResponse, PineconeError, UpsertRequest, UpsertResponse, VectorRecord,
};
use async_trait::async_trait;
use reqwest::{Client, Method, Url};

const API_VERSION: &str = "2024-07";

/// Write access to the vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace `records`, returning how many the index accepted.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, PineconeError>;
}

/// Lightweight HTTP client for the Pinecone data plane.
pub struct PineconeService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) namespace: Option<String>,
}

impl PineconeService {
    /// Connect to the configured index, resolving its host through the control plane when
    /// `PINECONE_INDEX_HOST` is not set.
    pub async fn connect(config: &Config) -> Result<Self, PineconeError> {
        let client = Client::builder().user_agent("drive-pdf-sync/0.1").build()?;

        let host = match &config.pinecone_index_host {
            Some(host) => host.clone(),
            None => {
                describe_index_host(
                    &client,
                    &config.pinecone_controller_url,
                    &config.pinecone_api_key,
                    &config.pinecone_index_name,
                )
                .await?
            }
        };

        let base_url = normalize_host(&host).map_err(PineconeError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            index = %config.pinecone_index_name,
            namespace = ?config.pinecone_namespace,
            "Initialized Pinecone HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.pinecone_api_key.clone(),
            namespace: config.pinecone_namespace.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        authorized(
            &self.client,
            method,
            format_endpoint(&self.base_url, path),
            &self.api_key,
        )
    }
}

#[async_trait]
impl VectorIndex for PineconeService {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, PineconeError> {
        let record_count = records.len();
        let response = self
            .request(Method::POST, "vectors/upsert")
            .json(&UpsertRequest {
                vectors: &records,
                namespace: self.namespace.as_deref(),
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let UpsertResponse { upserted_count } = response.json().await?;
            tracing::debug!(records = record_count, upserted_count, "Vectors upserted");
            Ok(upserted_count)
        } else {
            let body = response.text().await.unwrap_or_default();
            let error = PineconeError::from_status(status, body);
            tracing::error!(error = %error, "Pinecone upsert failed");
            Err(error)
        }
    }
}

/// Ask the control plane for the data-plane host of `index_name`.
async fn describe_index_host(
    client: &Client,
    controller_url: &str,
    api_key: &str,
    index_name: &str,
) -> Result<String, PineconeError> {
    let url = format_endpoint(controller_url, &format!("indexes/{index_name}"));
    let response = authorized(client, Method::GET, url, api_key).send().await?;

    let status = response.status();
    if status.is_success() {
        let DescribeIndexResponse { host } = response.json().await?;
        tracing::debug!(index = index_name, host = %host, "Resolved Pinecone index host");
        Ok(host)
    } else {
        let body = response.text().await.unwrap_or_default();
        let error = PineconeError::from_status(status, body);
        tracing::error!(index = index_name, error = %error, "Failed to describe Pinecone index");
        Err(error)
    }
}

fn authorized(
    client: &Client,
    method: Method,
    url: String,
    api_key: &str,
) -> reqwest::RequestBuilder {
    client
        .request(method, url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
}

/// Control-plane hosts come back without a scheme; default them to HTTPS.
fn normalize_host(host: &str) -> Result<String, String> {
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    let mut parsed = Url::parse(&with_scheme).map_err(|err| err.to_string())?;
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
    use crate::pinecone::types::RecordMetadata;
    use httpmock::{Method::GET, Method::POST, MockServer};
    use serde_json::json;
    use std::path::PathBuf;

    fn config(controller_url: String, index_host: Option<String>) -> Config {
        Config {
            openai_api_key: "sk".into(),
            openai_base_url: "http://127.0.0.1:9/v1".into(),
            embedding_model: "text-embedding-ada-002".into(),
            pinecone_api_key: "pc-key".into(),
            pinecone_index_name: "integrationai".into(),
            pinecone_index_host: index_host,
            pinecone_controller_url: controller_url,
            pinecone_namespace: Some("docs".into()),
            drive_folder_id: "folder".into(),
            drive_api_url: "http://127.0.0.1:9".into(),
            drive_access_token: None,
            client_secrets_file: PathBuf::from("client_secrets.json"),
            credentials_file: PathBuf::from("credentials.json"),
            oauth_port: 8080,
            ledger_path: PathBuf::from("ledger.json"),
            index_batch_size: 64,
        }
    }

    #[test]
    fn normalize_host_adds_https_scheme() {
        assert_eq!(
            normalize_host("integrationai-abc.svc.pinecone.io").expect("url"),
            "https://integrationai-abc.svc.pinecone.io/"
        );
        assert_eq!(
            normalize_host("http://localhost:5080/").expect("url"),
            "http://localhost:5080/"
        );
    }

    #[tokio::test]
    async fn connect_resolves_host_through_control_plane() {
        let controller = MockServer::start_async().await;
        let data_plane = MockServer::start_async().await;
        let host = data_plane.base_url();

        let describe = controller
            .mock_async(move |when, then| {
                when.method(GET)
                    .path("/indexes/integrationai")
                    .header("api-key", "pc-key");
                then.status(200).json_body(json!({
                    "name": "integrationai",
                    "dimension": 1536,
                    "host": host
                }));
            })
            .await;

        let service = PineconeService::connect(&config(controller.base_url(), None))
            .await
            .expect("connect");

        describe.assert();
        assert_eq!(
            service.base_url.trim_end_matches('/'),
            data_plane.base_url().trim_end_matches('/')
        );
    }

    #[tokio::test]
    async fn upsert_sends_vectors_with_metadata() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/vectors/upsert")
                    .header("api-key", "pc-key")
                    .json_body(json!({
                        "vectors": [{
                            "id": "rec-1",
                            "values": [0.5, 0.25],
                            "metadata": { "text": "hello", "source": "A.pdf" }
                        }],
                        "namespace": "docs"
                    }));
                then.status(200).json_body(json!({ "upsertedCount": 1 }));
            })
            .await;

        let service = PineconeService::connect(&config(
            "http://127.0.0.1:9".into(),
            Some(server.base_url()),
        ))
        .await
        .expect("connect");

        let upserted = service
            .upsert(vec![VectorRecord {
                id: "rec-1".into(),
                values: vec![0.5, 0.25],
                metadata: RecordMetadata {
                    text: "hello".into(),
                    source: "A.pdf".into(),
                },
            }])
            .await
            .expect("upsert");

        mock.assert();
        assert_eq!(upserted, 1);
    }

    #[tokio::test]
    async fn upsert_surfaces_server_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/vectors/upsert");
                then.status(500).body("boom");
            })
            .await;

        let service = PineconeService::connect(&config(
            "http://127.0.0.1:9".into(),
            Some(server.base_url()),
        ))
        .await
        .expect("connect");

        let error = service.upsert(Vec::new()).await.unwrap_err();
        assert!(matches!(error, PineconeError::UnexpectedStatus { .. }));
    }
}

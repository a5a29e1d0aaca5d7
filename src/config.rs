use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_PINECONE_INDEX_NAME: &str = "integrationai";
const DEFAULT_PINECONE_CONTROLLER_URL: &str = "https://api.pinecone.io";
const DEFAULT_DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_CLIENT_SECRETS_FILE: &str = "client_secrets.json";
const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
const DEFAULT_OAUTH_PORT: u16 = 8080;
const DEFAULT_LEDGER_PATH: &str = "data/processed_documents.json";
const DEFAULT_INDEX_BATCH_SIZE: usize = 64;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for a sync run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key for the OpenAI embeddings endpoint.
    pub openai_api_key: String,
    /// Base URL of the OpenAI-compatible API (without the `/embeddings` suffix).
    pub openai_base_url: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// API key used for both the Pinecone control and data planes.
    pub pinecone_api_key: String,
    /// Name of the Pinecone index receiving the fragments.
    pub pinecone_index_name: String,
    /// Explicit data-plane host; resolved through the control plane when absent.
    pub pinecone_index_host: Option<String>,
    /// Base URL of the Pinecone control plane.
    pub pinecone_controller_url: String,
    /// Optional namespace inside the index.
    pub pinecone_namespace: Option<String>,
    /// Identifier of the Drive folder holding the PDFs.
    pub drive_folder_id: String,
    /// Base URL of the Drive v3 API.
    pub drive_api_url: String,
    /// Pre-issued access token; skips the OAuth flow when present.
    pub drive_access_token: Option<String>,
    /// Google OAuth client secrets file (installed-app format).
    pub client_secrets_file: PathBuf,
    /// Cache file holding the refresh token obtained on first run.
    pub credentials_file: PathBuf,
    /// Local port used by the OAuth redirect listener.
    pub oauth_port: u16,
    /// Location of the processed-documents ledger.
    pub ledger_path: PathBuf,
    /// Number of fragments embedded and upserted per request.
    pub index_batch_size: usize,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            openai_api_key: load_env("OPENAI_API_KEY")?,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            pinecone_api_key: load_env("PINECONE_API_KEY")?,
            pinecone_index_name: load_env_optional("PINECONE_INDEX_NAME")
                .unwrap_or_else(|| DEFAULT_PINECONE_INDEX_NAME.to_string()),
            pinecone_index_host: load_env_optional("PINECONE_INDEX_HOST"),
            pinecone_controller_url: load_env_optional("PINECONE_CONTROLLER_URL")
                .unwrap_or_else(|| DEFAULT_PINECONE_CONTROLLER_URL.to_string()),
            pinecone_namespace: load_env_optional("PINECONE_NAMESPACE"),
            drive_folder_id: load_env("DRIVE_FOLDER_ID")?,
            drive_api_url: load_env_optional("DRIVE_API_URL")
                .unwrap_or_else(|| DEFAULT_DRIVE_API_URL.to_string()),
            drive_access_token: load_env_optional("GOOGLE_DRIVE_ACCESS_TOKEN"),
            client_secrets_file: load_env_optional("GOOGLE_CLIENT_SECRETS_FILE")
                .unwrap_or_else(|| DEFAULT_CLIENT_SECRETS_FILE.to_string())
                .into(),
            credentials_file: load_env_optional("GOOGLE_CREDENTIALS_FILE")
                .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string())
                .into(),
            oauth_port: load_env_optional("GOOGLE_OAUTH_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("GOOGLE_OAUTH_PORT".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_OAUTH_PORT),
            ledger_path: load_env_optional("PROCESSED_LEDGER_PATH")
                .unwrap_or_else(|| DEFAULT_LEDGER_PATH.to_string())
                .into(),
            index_batch_size: load_env_optional("INDEX_BATCH_SIZE")
                .map(|value| match value.parse::<usize>() {
                    Ok(size) if size > 0 => Ok(size),
                    _ => Err(ConfigError::InvalidValue("INDEX_BATCH_SIZE".into())),
                })
                .transpose()?
                .unwrap_or(DEFAULT_INDEX_BATCH_SIZE),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Load `.env` (when present) and build the configuration from the environment.
pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        folder = %config.drive_folder_id,
        index = %config.pinecone_index_name,
        model = %config.embedding_model,
        ledger = %config.ledger_path.display(),
        batch_size = config.index_batch_size,
        "Loaded configuration"
    );
    Ok(config)
}

//! OAuth 2.0 access for the Drive API.
//!
//! Resolution order:
//!
//! 1. A pre-issued token (`GOOGLE_DRIVE_ACCESS_TOKEN`) is used verbatim.
//! 2. A cached refresh token (`GOOGLE_CREDENTIALS_FILE`) is exchanged for a fresh access token.
//! 3. Otherwise the installed-application flow runs: the consent URL is printed and opened in
//!    the browser, a one-shot local server receives the redirect, and the authorization code is
//!    exchanged. The refresh token is cached so later runs stay non-interactive.

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::Config;

const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Errors raised while obtaining Drive credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Client secrets file could not be read.
    #[error("Failed to read client secrets {path}: {source}")]
    ClientSecretsUnreadable {
        /// Path of the secrets file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// Client secrets file did not contain an `installed` or `web` client.
    #[error("Invalid client secrets {path}: {reason}")]
    InvalidClientSecrets {
        /// Path of the secrets file.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },
    /// Credentials cache could not be read or written.
    #[error("Credentials cache {path} failed: {source}")]
    CredentialsCache {
        /// Path of the credentials cache.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Token endpoint refused the grant.
    #[error("Token endpoint rejected the request ({status}): {body}")]
    TokenRejected {
        /// HTTP status returned by the token endpoint.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The browser redirect did not carry an authorization code.
    #[error("Authorization was not granted: {0}")]
    Denied(String),
    /// The local redirect listener could not be started.
    #[error("Failed to start OAuth callback listener on port {port}: {source}")]
    Listener {
        /// Port the listener attempted to bind.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// OAuth client registration loaded from a Google `client_secrets.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Consent endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ClientSecrets {
    /// Parse a Google client secrets file (`installed` section preferred over `web`).
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            AuthError::ClientSecretsUnreadable {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let file: ClientSecretsFile =
            serde_json::from_str(&raw).map_err(|err| AuthError::InvalidClientSecrets {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        file.installed
            .or(file.web)
            .ok_or_else(|| AuthError::InvalidClientSecrets {
                path: path.to_path_buf(),
                reason: "expected an `installed` or `web` client".to_string(),
            })
    }
}

/// Cached credentials persisted after the first interactive authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    /// Long-lived refresh token.
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// Obtains bearer tokens for the Drive API.
pub struct DriveAuthenticator {
    client: Client,
    access_token: Option<String>,
    client_secrets_file: PathBuf,
    credentials_file: PathBuf,
    port: u16,
}

impl DriveAuthenticator {
    /// Build an authenticator from the runtime configuration.
    pub fn new(config: &Config) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder().user_agent("drive-pdf-sync/0.1").build()?,
            access_token: config.drive_access_token.clone(),
            client_secrets_file: config.client_secrets_file.clone(),
            credentials_file: config.credentials_file.clone(),
            port: config.oauth_port,
        })
    }

    /// Return an access token, running the interactive flow when nothing is cached.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        if let Some(token) = &self.access_token {
            tracing::debug!("Using access token from environment");
            return Ok(token.clone());
        }

        let secrets = ClientSecrets::from_file(&self.client_secrets_file)?;
        if let Some(stored) = self.load_cached()? {
            tracing::debug!(path = %self.credentials_file.display(), "Refreshing cached Drive credentials");
            match self.refresh(&secrets, &stored.refresh_token).await {
                Ok(token) => return Ok(token),
                Err(error) if should_reauthorize(&error) => {
                    tracing::warn!(
                        path = %self.credentials_file.display(),
                        error = %error,
                        "Cached refresh token was revoked or expired; discarding it"
                    );
                    self.discard_cached()?;
                }
                Err(error) => return Err(error),
            }
        }

        tracing::info!("No cached Drive credentials; starting browser authorization");
        self.authorize_interactively(&secrets).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(
        &self,
        secrets: &ClientSecrets,
        refresh_token: &str,
    ) -> Result<String, AuthError> {
        let token = self
            .request_token(
                secrets,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ],
            )
            .await?;
        Ok(token.access_token)
    }

    async fn authorize_interactively(&self, secrets: &ClientSecrets) -> Result<String, AuthError> {
        let redirect_uri = redirect_uri(self.port);
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, self.port))
            .await
            .map_err(|source| AuthError::Listener {
                port: self.port,
                source,
            })?;

        let consent_url = authorization_url(secrets, &redirect_uri)?;
        println!("Abra el siguiente enlace para autorizar el acceso a Google Drive:\n{consent_url}");
        if let Err(err) = open::that(consent_url.as_str()) {
            tracing::warn!(error = %err, "Could not open browser; use the printed URL");
        }

        let (sender, mut receiver) = mpsc::channel(1);
        let server = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, callback_router(sender)).await {
                tracing::error!(error = %err, "OAuth callback server stopped");
            }
        });

        let outcome = receiver.recv().await;
        server.abort();
        let code = match outcome {
            Some(Ok(code)) => code,
            Some(Err(reason)) => return Err(AuthError::Denied(reason)),
            None => return Err(AuthError::Denied("callback server exited".to_string())),
        };

        let token = self
            .request_token(
                secrets,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code.as_str()),
                    ("redirect_uri", redirect_uri.as_str()),
                ],
            )
            .await?;

        match &token.refresh_token {
            Some(refresh_token) => self.store_cached(&StoredCredentials {
                refresh_token: refresh_token.clone(),
            })?,
            None => tracing::warn!("Token response carried no refresh token; nothing cached"),
        }
        Ok(token.access_token)
    }

    async fn request_token(
        &self,
        secrets: &ClientSecrets,
        grant: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let mut form = vec![
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .client
            .post(&secrets.token_uri)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let token: TokenResponse = response.json().await?;
            tracing::debug!(expires_in = ?token.expires_in, "Obtained Drive access token");
            Ok(token)
        } else {
            let body = response.text().await.unwrap_or_default();
            let error = AuthError::TokenRejected { status, body };
            tracing::error!(error = %error, "Token request failed");
            Err(error)
        }
    }

    fn load_cached(&self) -> Result<Option<StoredCredentials>, AuthError> {
        match std::fs::read_to_string(&self.credentials_file) {
            Ok(raw) => match serde_json::from_str::<StoredCredentials>(&raw) {
                Ok(stored) => Ok(Some(stored)),
                Err(err) => {
                    tracing::warn!(
                        path = %self.credentials_file.display(),
                        error = %err,
                        "Ignoring unreadable credentials cache"
                    );
                    Ok(None)
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AuthError::CredentialsCache {
                path: self.credentials_file.clone(),
                source,
            }),
        }
    }

    fn store_cached(&self, stored: &StoredCredentials) -> Result<(), AuthError> {
        let to_cache_error = |source: io::Error| AuthError::CredentialsCache {
            path: self.credentials_file.clone(),
            source,
        };
        let raw = serde_json::to_string_pretty(stored).map_err(|err| to_cache_error(err.into()))?;
        std::fs::write(&self.credentials_file, raw).map_err(to_cache_error)?;
        tracing::info!(path = %self.credentials_file.display(), "Cached Drive credentials");
        Ok(())
    }

    fn discard_cached(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.credentials_file) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AuthError::CredentialsCache {
                path: self.credentials_file.clone(),
                source,
            }),
        }
    }
}

/// A refresh rejected with `invalid_grant` means the cached grant is dead; only a new consent
/// can recover.
fn should_reauthorize(error: &AuthError) -> bool {
    matches!(
        error,
        AuthError::TokenRejected { status, body }
            if *status == StatusCode::BAD_REQUEST && body.contains("invalid_grant")
    )
}

// Must name the same loopback address the callback listener binds.
fn redirect_uri(port: u16) -> String {
    format!("http://{}:{port}/", Ipv4Addr::LOCALHOST)
}

/// Build the consent URL for the installed-application flow.
pub fn authorization_url(secrets: &ClientSecrets, redirect_uri: &str) -> Result<Url, AuthError> {
    Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", DRIVE_READONLY_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|err| AuthError::Denied(format!("invalid auth_uri: {err}")))
}

type CallbackSender = mpsc::Sender<Result<String, String>>;

fn callback_router(sender: CallbackSender) -> Router {
    Router::new()
        .route("/", get(handle_callback))
        .with_state(sender)
}

async fn handle_callback(
    State(sender): State<CallbackSender>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let outcome = match (params.code, params.error) {
        (Some(code), _) => Ok(code),
        (None, Some(error)) => Err(error),
        (None, None) => Err("missing authorization code".to_string()),
    };
    let granted = outcome.is_ok();
    let _ = sender.try_send(outcome);

    if granted {
        Html("<p>Autorización completada. Puede cerrar esta ventana.</p>")
    } else {
        Html("<p>La autorización no fue concedida.</p>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode as HttpStatus};
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;
    use tower::ServiceExt;

    fn secrets(token_uri: String) -> ClientSecrets {
        ClientSecrets {
            client_id: "client-1".into(),
            client_secret: "secret-1".into(),
            auth_uri: DEFAULT_AUTH_URI.into(),
            token_uri,
        }
    }

    fn authenticator(dir: &Path, access_token: Option<&str>) -> DriveAuthenticator {
        DriveAuthenticator {
            client: Client::new(),
            access_token: access_token.map(str::to_string),
            client_secrets_file: dir.join("client_secrets.json"),
            credentials_file: dir.join("credentials.json"),
            port: 0,
        }
    }

    #[test]
    fn client_secrets_prefers_installed_section() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client_secrets.json");
        std::fs::write(
            &path,
            json!({
                "installed": {
                    "client_id": "abc.apps.googleusercontent.com",
                    "client_secret": "shh",
                    "token_uri": "https://oauth2.googleapis.com/token"
                }
            })
            .to_string(),
        )
        .expect("write");

        let parsed = ClientSecrets::from_file(&path).expect("secrets");
        assert_eq!(parsed.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(parsed.auth_uri, DEFAULT_AUTH_URI);
    }

    #[test]
    fn client_secrets_without_client_section_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("client_secrets.json");
        std::fs::write(&path, "{}").expect("write");

        let error = ClientSecrets::from_file(&path).unwrap_err();
        assert!(matches!(error, AuthError::InvalidClientSecrets { .. }));
    }

    #[test]
    fn authorization_url_requests_offline_readonly_access() {
        let url = authorization_url(&secrets(DEFAULT_TOKEN_URI.into()), &redirect_uri(8080))
            .expect("url");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("access_type".into(), "offline".into())));
        assert!(pairs.contains(&("scope".into(), DRIVE_READONLY_SCOPE.into())));
        assert!(pairs.contains(&("redirect_uri".into(), "http://127.0.0.1:8080/".into())));
    }

    #[tokio::test]
    async fn environment_token_short_circuits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = authenticator(dir.path(), Some("preissued"));

        assert_eq!(auth.access_token().await.expect("token"), "preissued");
    }

    #[tokio::test]
    async fn cached_refresh_token_is_exchanged() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .body_contains("grant_type=refresh_token")
                    .body_contains("refresh_token=cached-refresh");
                then.status(200).json_body(json!({
                    "access_token": "fresh-access",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                }));
            })
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("client_secrets.json"),
            json!({
                "installed": {
                    "client_id": "client-1",
                    "client_secret": "secret-1",
                    "token_uri": server.url("/token")
                }
            })
            .to_string(),
        )
        .expect("write secrets");
        std::fs::write(
            dir.path().join("credentials.json"),
            json!({ "refresh_token": "cached-refresh" }).to_string(),
        )
        .expect("write credentials");

        let token = authenticator(dir.path(), None)
            .access_token()
            .await
            .expect("token");

        mock.assert();
        assert_eq!(token, "fresh-access");
    }

    #[tokio::test]
    async fn rejected_refresh_surfaces_token_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(400).json_body(json!({ "error": "invalid_grant" }));
            })
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let error = authenticator(dir.path(), None)
            .refresh(&secrets(server.url("/token")), "revoked")
            .await
            .unwrap_err();

        assert!(matches!(error, AuthError::TokenRejected { status, .. } if status == StatusCode::BAD_REQUEST));
        assert!(should_reauthorize(&error));
    }

    #[tokio::test]
    async fn token_endpoint_outage_does_not_trigger_reauthorization() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(503).body("backend unavailable");
            })
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let error = authenticator(dir.path(), None)
            .refresh(&secrets(server.url("/token")), "still-valid")
            .await
            .unwrap_err();

        assert!(!should_reauthorize(&error));
    }

    #[test]
    fn invalid_client_is_not_fixed_by_reauthorizing() {
        let error = AuthError::TokenRejected {
            status: StatusCode::UNAUTHORIZED,
            body: r#"{"error":"invalid_client"}"#.into(),
        };
        assert!(!should_reauthorize(&error));
    }

    #[test]
    fn discarding_cache_removes_the_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let auth = authenticator(dir.path(), None);
        auth.store_cached(&StoredCredentials {
            refresh_token: "revoked".into(),
        })
        .expect("store");

        auth.discard_cached().expect("discard");
        assert!(!dir.path().join("credentials.json").exists());
        assert!(auth.load_cached().expect("load").is_none());
        auth.discard_cached().expect("discard again");
    }

    #[test]
    fn redirect_uri_matches_the_bound_loopback_address() {
        assert_eq!(redirect_uri(8080), "http://127.0.0.1:8080/");
    }

    #[tokio::test]
    async fn callback_forwards_authorization_code() {
        let (sender, mut receiver) = mpsc::channel(1);
        let response = callback_router(sender)
            .oneshot(
                Request::builder()
                    .uri("/?code=auth-code-1&scope=drive")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), HttpStatus::OK);
        assert_eq!(receiver.recv().await, Some(Ok("auth-code-1".to_string())));
    }

    #[tokio::test]
    async fn callback_forwards_denial() {
        let (sender, mut receiver) = mpsc::channel(1);
        callback_router(sender)
            .oneshot(
                Request::builder()
                    .uri("/?error=access_denied")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(receiver.recv().await, Some(Err("access_denied".to_string())));
    }
}

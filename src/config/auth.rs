// Application Default Credentials for the Runtime Configuration spike
//
// This module discovers ambient Google Cloud credentials, mints OAuth2 access
// tokens from them and resolves the project the spike runs against.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::types::EnvVars;
use super::{process_env, EnvLookup};
use crate::error::Error;

/// Broad platform scope
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Runtime Configuration service scope
pub const RUNTIMECONFIG_SCOPE: &str = "https://www.googleapis.com/auth/cloudruntimeconfig";

/// Google's OAuth2 token endpoint
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Well-known ADC file written by `gcloud auth application-default login`
pub const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const METADATA_FLAVOR: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Tokens this close to expiry are fetched again
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// Authentication failures
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential source was found in the environment
    #[error("could not find default credentials; set {} or run `gcloud auth application-default login`", EnvVars::APPLICATION_CREDENTIALS)]
    NotFound,

    /// A credentials file could not be read or parsed
    #[error("invalid credentials file {path}: {message}")]
    InvalidFile { path: PathBuf, message: String },

    /// The service-account assertion could not be signed
    #[error("failed to sign JWT assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The token endpoint could not be reached
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token endpoint rejected the request
    #[error("token endpoint returned {status}: {body}")]
    TokenRejected { status: u16, body: String },
}

/// An OAuth2 access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// When the token stops being valid; `None` means it does not expire
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Check if the token expires within the given number of seconds
    pub fn expires_within(&self, seconds: i64) -> bool {
        self.expires_at
            .map(|at| Utc::now() + Duration::seconds(seconds) >= at)
            .unwrap_or(false)
    }
}

/// Source of bearer tokens for API requests
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently valid access token
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Token source that always yields the same token
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}

/// Mints a fresh token from a credential
#[async_trait]
pub(crate) trait TokenFetcher: Send + Sync {
    async fn fetch(&self) -> Result<AccessToken, AuthError>;
}

/// Reuses a fetched token until it nears expiry
pub(crate) struct CachingTokenSource {
    fetcher: Box<dyn TokenFetcher>,
    cached: Mutex<Option<AccessToken>>,
}

impl CachingTokenSource {
    pub(crate) fn new(fetcher: Box<dyn TokenFetcher>) -> Self {
        Self {
            fetcher,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl TokenSource for CachingTokenSource {
    async fn access_token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.expires_within(EXPIRY_MARGIN_SECONDS) {
                return Ok(token.token.clone());
            }
            tracing::debug!("Access token expires soon, fetching a new one");
        }

        let token = self.fetcher.fetch().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_access_token(self) -> AccessToken {
        AccessToken {
            token: self.access_token,
            expires_at: self.expires_in.map(|s| Utc::now() + Duration::seconds(s)),
        }
    }
}

async fn read_token_response(response: reqwest::Response) -> Result<AccessToken, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::TokenRejected {
            status: status.as_u16(),
            body,
        });
    }
    let token: TokenResponse = response.json().await?;
    Ok(token.into_access_token())
}

/// Contents of a JSON credentials file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
}

impl CredentialsFile {
    /// Parse a credentials file from disk
    pub fn from_path(path: &Path) -> Result<Self, AuthError> {
        let invalid = |message: String| AuthError::InvalidFile {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))
    }

    /// Project recorded in the file; only service-account keys carry one
    pub fn project_id(&self) -> Option<&str> {
        match self {
            CredentialsFile::ServiceAccount(key) => key.project_id.as_deref(),
            CredentialsFile::AuthorizedUser(_) => None,
        }
    }
}

/// Service-account key, as downloaded from the console
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// User credentials from `gcloud auth application-default login`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserKey {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Exchanges a signed JWT assertion for an access token
struct ServiceAccountFetcher {
    http: reqwest::Client,
    key: ServiceAccountKey,
    scopes: Vec<String>,
}

impl ServiceAccountFetcher {
    fn assertion(&self) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(&header, &claims, &key)?)
    }
}

#[async_trait]
impl TokenFetcher for ServiceAccountFetcher {
    async fn fetch(&self) -> Result<AccessToken, AuthError> {
        tracing::debug!(client_email = %self.key.client_email, "Fetching service account token");
        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        read_token_response(response).await
    }
}

/// Exchanges a refresh token for an access token
struct AuthorizedUserFetcher {
    http: reqwest::Client,
    key: AuthorizedUserKey,
}

#[async_trait]
impl TokenFetcher for AuthorizedUserFetcher {
    async fn fetch(&self) -> Result<AccessToken, AuthError> {
        tracing::debug!("Refreshing user access token");
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.key.client_id.as_str()),
                ("client_secret", self.key.client_secret.as_str()),
                ("refresh_token", self.key.refresh_token.as_str()),
            ])
            .send()
            .await?;
        read_token_response(response).await
    }
}

/// Asks the GCE metadata server for the default service account's token
struct MetadataFetcher {
    http: reqwest::Client,
    host: String,
    scopes: Vec<String>,
}

#[async_trait]
impl TokenFetcher for MetadataFetcher {
    async fn fetch(&self) -> Result<AccessToken, AuthError> {
        tracing::debug!(host = %self.host, "Fetching token from metadata server");
        let url = format!(
            "http://{}/computeMetadata/v1/instance/service-accounts/default/token",
            self.host
        );
        let response = self
            .http
            .get(url)
            .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
            .query(&[("scopes", self.scopes.join(","))])
            .send()
            .await?;
        read_token_response(response).await
    }
}

/// Resolved credentials: a token source and the project it belongs to
#[derive(Clone)]
pub struct Credentials {
    pub token_source: Arc<dyn TokenSource>,
    pub project_id: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

/// Something that can discover ambient credentials
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn find_default_credentials(&self, scopes: &[&str]) -> Result<Credentials, AuthError>;
}

/// Google's Application Default Credentials lookup
pub struct ApplicationDefaultCredentials {
    http: reqwest::Client,
    env: Arc<EnvLookup>,
}

impl std::fmt::Debug for ApplicationDefaultCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationDefaultCredentials").finish_non_exhaustive()
    }
}

impl ApplicationDefaultCredentials {
    /// Discover credentials from the process environment
    pub fn new() -> Self {
        Self::with_env(Arc::new(process_env))
    }

    /// Discover credentials using a custom environment lookup
    pub fn with_env(env: Arc<EnvLookup>) -> Self {
        Self {
            http: reqwest::Client::new(),
            env,
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|v| !v.is_empty())
    }

    /// Location of the gcloud well-known credentials file
    pub fn well_known_file(&self) -> Option<PathBuf> {
        let dir = if let Some(dir) = self.var(EnvVars::CLOUDSDK_CONFIG) {
            PathBuf::from(dir)
        } else if cfg!(windows) {
            PathBuf::from(self.var(EnvVars::APPDATA)?).join("gcloud")
        } else {
            dirs::home_dir()?.join(".config").join("gcloud")
        };
        Some(dir.join(WELL_KNOWN_FILE))
    }

    fn load_file(&self, path: &Path, scopes: &[&str]) -> Result<Credentials, AuthError> {
        let file = CredentialsFile::from_path(path)?;
        let project_id = file.project_id().map(str::to_string);

        let fetcher: Box<dyn TokenFetcher> = match file {
            CredentialsFile::ServiceAccount(key) => {
                tracing::debug!(client_email = %key.client_email, "Using service account key");
                Box::new(ServiceAccountFetcher {
                    http: self.http.clone(),
                    key,
                    scopes: scopes.iter().map(|s| s.to_string()).collect(),
                })
            }
            CredentialsFile::AuthorizedUser(key) => {
                tracing::debug!("Using authorized user credentials");
                Box::new(AuthorizedUserFetcher {
                    http: self.http.clone(),
                    key,
                })
            }
        };

        Ok(Credentials {
            token_source: Arc::new(CachingTokenSource::new(fetcher)),
            project_id,
        })
    }

    /// Probe the metadata server; `None` when not running on GCE
    async fn probe_metadata(&self, scopes: &[&str]) -> Option<Credentials> {
        let host = self
            .var(EnvVars::METADATA_HOST)
            .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
        let url = format!("http://{}/computeMetadata/v1/project/project-id", host);

        let response = self
            .http
            .get(url)
            .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await;

        let response = match response {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::debug!(status = resp.status().as_u16(), "Metadata server probe rejected");
                return None;
            }
            Err(e) => {
                tracing::debug!("Metadata server not reachable: {}", e);
                return None;
            }
        };

        let project_id = response
            .text()
            .await
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Some(Credentials {
            token_source: Arc::new(CachingTokenSource::new(Box::new(MetadataFetcher {
                http: self.http.clone(),
                host,
                scopes: scopes.iter().map(|s| s.to_string()).collect(),
            }))),
            project_id,
        })
    }
}

impl Default for ApplicationDefaultCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialSource for ApplicationDefaultCredentials {
    async fn find_default_credentials(&self, scopes: &[&str]) -> Result<Credentials, AuthError> {
        if let Some(path) = self.var(EnvVars::APPLICATION_CREDENTIALS) {
            tracing::debug!("Loading credentials from {}", path);
            return self.load_file(Path::new(&path), scopes);
        }

        if let Some(path) = self.well_known_file().filter(|p| p.exists()) {
            tracing::debug!("Loading credentials from {:?}", path);
            return self.load_file(&path, scopes);
        }

        if let Some(credentials) = self.probe_metadata(scopes).await {
            tracing::debug!("Using metadata server credentials");
            return Ok(credentials);
        }

        Err(AuthError::NotFound)
    }
}

/// Resolve credentials and make sure a project is known
///
/// When the credentials do not name a project, `GOOGLE_CLOUD_PROJECT` is used
/// instead. No API call is made before this succeeds.
pub async fn authenticate(
    source: &dyn CredentialSource,
    scopes: &[&str],
    env: &EnvLookup,
) -> Result<Credentials, Error> {
    let mut credentials = source
        .find_default_credentials(scopes)
        .await
        .map_err(|e| Error::Credentials(e.to_string()))?;

    if credentials.project_id.as_deref().unwrap_or_default().is_empty() {
        tracing::info!(
            "Could not find project ID from runtime environment, trying the {} environment variable instead",
            EnvVars::PROJECT
        );
        credentials.project_id = env(EnvVars::PROJECT);
    }

    match credentials.project_id.as_deref() {
        Some(project) if !project.is_empty() => Ok(credentials),
        _ => Err(Error::MissingProjectId {
            var: EnvVars::PROJECT,
        }),
    }
}

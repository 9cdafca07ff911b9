// Runtime Configuration API module
//
// This module defines the API surface the spike talks to, its payload types
// and the reqwest-backed client that implements it.

pub mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{connect, AuthenticatedClient, RuntimeConfigClient, RuntimeConfigClientConfig};
pub use types::*;

/// Default service endpoint
pub const DEFAULT_ENDPOINT: &str = "https://runtimeconfig.googleapis.com";

/// API version path segment
pub const API_VERSION: &str = "v1beta1";

/// Failure of a single remote call
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An access token could not be obtained
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The service answered with a non-success status
    #[error("googleapi: Error {code}: {message}")]
    Service {
        code: u16,
        status: Option<String>,
        message: String,
    },

    /// The response body did not match the expected schema
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status reported by the service, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Service { code, .. } => Some(*code),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Operations of the Runtime Configuration API used by the spike
#[async_trait]
pub trait RuntimeConfigApi: Send + Sync {
    /// `projects.configs.create` under `parent` (`projects/<id>`)
    async fn create_config(
        &self,
        parent: &str,
        config: &RuntimeConfig,
    ) -> Result<RuntimeConfig, ApiError>;

    /// `projects.configs.list`, all pages
    async fn list_configs(&self, parent: &str) -> Result<Vec<RuntimeConfig>, ApiError>;

    /// `projects.configs.setIamPolicy`; replaces the whole policy
    async fn set_iam_policy(
        &self,
        resource: &str,
        request: &SetIamPolicyRequest,
    ) -> Result<Policy, ApiError>;

    /// `projects.configs.variables.create` under a config path
    async fn create_variable(&self, parent: &str, variable: &Variable)
        -> Result<Variable, ApiError>;

    /// `projects.configs.variables.get`
    async fn get_variable(&self, name: &str) -> Result<Variable, ApiError>;

    /// `projects.configs.variables.delete`
    async fn delete_variable(&self, name: &str) -> Result<(), ApiError>;

    /// `projects.configs.delete`
    async fn delete_config(&self, name: &str) -> Result<(), ApiError>;
}

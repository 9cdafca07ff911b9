// Runtime Configuration API client built on reqwest
//
// Each method maps one REST call of the v1beta1 surface. Requests are
// authorized with a bearer token from the configured token source.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::types::{
    ErrorEnvelope, ListConfigsResponse, Policy, RuntimeConfig, SetIamPolicyRequest, Variable,
};
use super::{ApiError, RuntimeConfigApi, API_VERSION, DEFAULT_ENDPOINT};
use crate::config::auth::{
    authenticate, CredentialSource, TokenSource, CLOUD_PLATFORM_SCOPE, RUNTIMECONFIG_SCOPE,
};
use crate::config::EnvLookup;
use crate::error::{Error, Operation};

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct RuntimeConfigClientConfig {
    /// Service root, without the version segment
    pub endpoint: String,
    /// Per-request timeout; unset means wait indefinitely
    pub timeout: Option<Duration>,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for RuntimeConfigClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: None,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Authenticated client for the Runtime Configuration API
#[derive(Clone)]
pub struct RuntimeConfigClient {
    http: Client,
    config: RuntimeConfigClientConfig,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for RuntimeConfigClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfigClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RuntimeConfigClient {
    /// Create a new client bound to the configured endpoint
    pub fn new(
        config: RuntimeConfigClientConfig,
        tokens: Arc<dyn TokenSource>,
    ) -> Result<Self, reqwest::Error> {
        debug!(endpoint = %config.endpoint, "Creating Runtime Configuration API client");

        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    /// Build the full URL for a resource path
    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            API_VERSION,
            path.trim_start_matches('/')
        )
    }

    /// Start an authorized request
    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;

        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    /// Send a request and map non-success statuses to `ApiError::Service`
    async fn send(&self, operation: Operation, request: RequestBuilder) -> Result<Response, ApiError> {
        debug!(method = operation.method_name(), "Sending request");
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            trace!(method = operation.method_name(), status = status.as_u16(), "Request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(
            method = operation.method_name(),
            status = status.as_u16(),
            "Request rejected by service"
        );

        Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => ApiError::Service {
                code: if envelope.error.code == 0 {
                    status.as_u16()
                } else {
                    envelope.error.code
                },
                status: envelope.error.status,
                message: envelope.error.message,
            },
            Err(_) => ApiError::Service {
                code: status.as_u16(),
                status: None,
                message: if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body.trim().to_string()
                },
            },
        })
    }

    /// Send a request and decode its JSON body
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(operation, request).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait::async_trait]
impl RuntimeConfigApi for RuntimeConfigClient {
    async fn create_config(
        &self,
        parent: &str,
        config: &RuntimeConfig,
    ) -> Result<RuntimeConfig, ApiError> {
        let request = self
            .request(Method::POST, &format!("{}/configs", parent))
            .await?
            .json(config);
        self.send_json(Operation::CreateConfig, request).await
    }

    async fn list_configs(&self, parent: &str) -> Result<Vec<RuntimeConfig>, ApiError> {
        let path = format!("{}/configs", parent);
        let mut configs = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut request = self.request(Method::GET, &path).await?;
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListConfigsResponse = self.send_json(Operation::ListConfigs, request).await?;
            page_token = page.next_page().map(str::to_string);
            configs.extend(page.configs);

            match &page_token {
                None => break,
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    warn!(page_token = %token, "Service repeated a page token, stopping listing");
                    break;
                }
                Some(_) => {}
            }
        }

        Ok(configs)
    }

    async fn set_iam_policy(
        &self,
        resource: &str,
        request: &SetIamPolicyRequest,
    ) -> Result<Policy, ApiError> {
        let builder = self
            .request(Method::POST, &format!("{}:setIamPolicy", resource))
            .await?
            .json(request);
        self.send_json(Operation::SetIamPolicy, builder).await
    }

    async fn create_variable(
        &self,
        parent: &str,
        variable: &Variable,
    ) -> Result<Variable, ApiError> {
        let request = self
            .request(Method::POST, &format!("{}/variables", parent))
            .await?
            .json(variable);
        self.send_json(Operation::CreateVariable, request).await
    }

    async fn get_variable(&self, name: &str) -> Result<Variable, ApiError> {
        let request = self.request(Method::GET, name).await?;
        self.send_json(Operation::GetVariable, request).await
    }

    async fn delete_variable(&self, name: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, name).await?;
        self.send(Operation::DeleteVariable, request).await?;
        Ok(())
    }

    async fn delete_config(&self, name: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, name).await?;
        self.send(Operation::DeleteConfig, request).await?;
        Ok(())
    }
}

/// An API client together with the project it was resolved for
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    pub client: RuntimeConfigClient,
    pub project_id: String,
}

/// Resolve Application Default Credentials and build a client from them
///
/// Requests the platform scope and the Runtime Configuration scope. Fails
/// before any API call when no project can be determined.
pub async fn connect(
    source: &dyn CredentialSource,
    config: RuntimeConfigClientConfig,
    env: &EnvLookup,
) -> crate::error::Result<AuthenticatedClient> {
    let credentials = authenticate(source, &[CLOUD_PLATFORM_SCOPE, RUNTIMECONFIG_SCOPE], env).await?;
    let project_id = credentials.project_id.unwrap_or_default();

    let client = RuntimeConfigClient::new(config, credentials.token_source)
        .map_err(Error::ClientConstruction)?;

    info!(project_id = %project_id, "Runtime Configuration API client ready");
    Ok(AuthenticatedClient { client, project_id })
}

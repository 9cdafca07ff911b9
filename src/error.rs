// Error types for the Runtime Configuration spike
//
// Every failure in the run is surfaced as an `Error` and handed back to the
// binary, which is the only place that decides on the exit status.

use thiserror::Error;

use crate::runtimeconfig::ApiError;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Remote operation issued against the Runtime Configuration API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateConfig,
    ListConfigs,
    SetIamPolicy,
    CreateVariable,
    GetVariable,
    DeleteVariable,
    DeleteConfig,
}

impl Operation {
    /// Wire-level method name, as used by the service
    pub fn method_name(&self) -> &'static str {
        match self {
            Operation::CreateConfig => "projects.configs.create",
            Operation::ListConfigs => "projects.configs.list",
            Operation::SetIamPolicy => "projects.configs.setIamPolicy",
            Operation::CreateVariable => "projects.configs.variables.create",
            Operation::GetVariable => "projects.configs.variables.get",
            Operation::DeleteVariable => "projects.configs.variables.delete",
            Operation::DeleteConfig => "projects.configs.delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::CreateConfig => write!(f, "create config"),
            Operation::ListConfigs => write!(f, "retrieve list of configs"),
            Operation::SetIamPolicy => write!(f, "set config IAM policy"),
            Operation::CreateVariable => write!(f, "create config variable"),
            Operation::GetVariable => write!(f, "get config variable"),
            Operation::DeleteVariable => write!(f, "delete config variable"),
            Operation::DeleteConfig => write!(f, "delete config"),
        }
    }
}

/// Top-level error for a spike run
#[derive(Debug, Error)]
pub enum Error {
    /// No usable Application Default Credentials
    #[error("Failed to find default credentials: {0}")]
    Credentials(String),

    /// Neither the credentials nor the fallback variable carried a project
    #[error("Environment variable {var} must contain your project ID")]
    MissingProjectId { var: &'static str },

    /// The HTTP transport could not be built
    #[error("Failed to create Runtime Configuration API client: {0}")]
    ClientConstruction(#[source] reqwest::Error),

    /// A remote call failed
    #[error("Failed to {operation}: {source}")]
    Remote {
        operation: Operation,
        #[source]
        source: ApiError,
    },

    /// The returned policy could not be rendered as JSON
    #[error("Failed to marshal policy as JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Settings could not be loaded
    #[error("Failed to load settings: {0}")]
    Settings(String),

    /// Writing progress output failed
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an API error with the operation that produced it
    pub fn remote(operation: Operation, source: ApiError) -> Self {
        Error::Remote { operation, source }
    }

    /// The failed remote operation, if this error came from one
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Remote { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        1
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Settings(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_message_names_operation() {
        let err = Error::remote(
            Operation::CreateConfig,
            ApiError::Service {
                code: 403,
                status: Some("PERMISSION_DENIED".to_string()),
                message: "caller lacks permission".to_string(),
            },
        );

        assert_eq!(err.operation(), Some(Operation::CreateConfig));
        let message = err.to_string();
        assert!(message.starts_with("Failed to create config:"));
        assert!(message.contains("caller lacks permission"));
    }

    #[test]
    fn test_missing_project_message() {
        let err = Error::MissingProjectId {
            var: "GOOGLE_CLOUD_PROJECT",
        };
        assert_eq!(
            err.to_string(),
            "Environment variable GOOGLE_CLOUD_PROJECT must contain your project ID"
        );
        assert_eq!(err.operation(), None);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_operation_method_names() {
        assert_eq!(Operation::SetIamPolicy.method_name(), "projects.configs.setIamPolicy");
        assert_eq!(Operation::GetVariable.to_string(), "get config variable");
    }
}

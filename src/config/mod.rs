// Configuration module for the Runtime Configuration spike
//
// This module handles Application Default Credentials, settings files and
// environment overrides.

pub mod auth;
pub mod manager;
pub mod types;

// Re-export commonly used types
pub use auth::{
    authenticate, AccessToken, ApplicationDefaultCredentials, AuthError, CredentialSource,
    Credentials, StaticTokenSource, TokenSource,
};
pub use manager::{SettingsLoader, SettingsOverrides};
pub use types::{EnvVars, LogLevel, Settings, SpikeSettings};

/// Lookup for environment variables, injectable in tests
pub type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Read a variable from the process environment
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

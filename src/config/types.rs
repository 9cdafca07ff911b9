// Configuration types for the Runtime Configuration spike
//
// This module defines the settings that shape a run: where the API lives,
// how requests behave, and the fixed values the demo sequence uses.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::runtimeconfig::DEFAULT_ENDPOINT;
use crate::utils::duration_secs;

/// Log level for the spike
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Values used by the demo sequence itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeSettings {
    /// Description given to the created config
    pub config_description: String,
    /// Short name of the variable created under the config
    pub variable_name: String,
    /// Text value stored in that variable
    pub variable_text: String,
    /// Role granted on the config
    pub role: String,
    /// Account id of the service account receiving the role
    pub service_account_id: String,
    /// Delete already-created resources when a later step fails
    pub cleanup_on_failure: bool,
}

impl Default for SpikeSettings {
    fn default() -> Self {
        Self {
            config_description: "Configuration created via API".to_string(),
            variable_name: "myvar1".to_string(),
            variable_text: "mysecret1".to_string(),
            role: "roles/viewer".to_string(),
            service_account_id: "runtimeconfig-spike".to_string(),
            cleanup_on_failure: false,
        }
    }
}

impl SpikeSettings {
    /// Email of the service account in the given project
    pub fn service_account_email(&self, project_id: &str) -> String {
        format!(
            "{}@{}.iam.gserviceaccount.com",
            self.service_account_id, project_id
        )
    }

    /// IAM member string for the service account
    pub fn service_account_member(&self, project_id: &str) -> String {
        format!("serviceAccount:{}", self.service_account_email(project_id))
    }
}

/// Complete settings for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Runtime Configuration API root
    pub endpoint: String,
    /// Per-request timeout in seconds; unset waits indefinitely
    #[serde(
        rename = "request_timeout_secs",
        with = "duration_secs",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_timeout: Option<Duration>,
    /// Default log level when no filter is given
    pub log_level: LogLevel,
    /// Demo sequence values
    pub spike: SpikeSettings,
    /// File the settings were read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: None,
            log_level: LogLevel::default(),
            spike: SpikeSettings::default(),
            source: None,
        }
    }
}

/// Environment variable names read by the spike
pub struct EnvVars;

impl EnvVars {
    pub const PROJECT: &'static str = "GOOGLE_CLOUD_PROJECT";
    pub const APPLICATION_CREDENTIALS: &'static str = "GOOGLE_APPLICATION_CREDENTIALS";
    pub const CLOUDSDK_CONFIG: &'static str = "CLOUDSDK_CONFIG";
    pub const APPDATA: &'static str = "APPDATA";
    pub const METADATA_HOST: &'static str = "GCE_METADATA_HOST";
    pub const ENDPOINT: &'static str = "RUNTIMECONFIG_ENDPOINT";
    pub const CONFIG_FILE: &'static str = "RUNTIMECONFIG_SPIKE_CONFIG";
    pub const LOG: &'static str = "RUNTIMECONFIG_SPIKE_LOG";
    pub const CLEANUP: &'static str = "RUNTIMECONFIG_SPIKE_CLEANUP";
}

/// Configuration file paths and names
pub struct ConfigPaths;

impl ConfigPaths {
    /// Directory name under the platform config dir
    pub const CONFIG_DIR_NAME: &'static str = "runtimeconfig-spike";

    /// Settings file name
    pub const CONFIG_FILE: &'static str = "config.toml";

    /// Get the default configuration directory
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::CONFIG_DIR_NAME))
            .context("Failed to determine config directory")
    }

    /// Get the default settings file path
    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join(Self::CONFIG_FILE))
    }
}

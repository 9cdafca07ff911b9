// Settings loader for the Runtime Configuration spike
//
// Settings are layered: built-in defaults, then an optional TOML file, then
// environment variables, then command-line overrides.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::{ConfigPaths, EnvVars, Settings};
use super::EnvLookup;

/// Overrides given on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub endpoint: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub cleanup_on_failure: Option<bool>,
}

/// Loads settings from their sources
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    /// File given explicitly; it must exist
    explicit_file: Option<PathBuf>,
}

impl SettingsLoader {
    /// Create a loader, optionally bound to an explicit settings file
    pub fn new(explicit_file: Option<PathBuf>) -> Self {
        Self { explicit_file }
    }

    /// Load settings from every source
    pub fn load(&self, env: &EnvLookup, overrides: &SettingsOverrides) -> Result<Settings> {
        let mut settings = match self.resolve_file(env)? {
            Some(path) => {
                let mut settings = Self::read_file(&path)?;
                settings.source = Some(path);
                settings
            }
            None => Settings::default(),
        };

        Self::apply_env(&mut settings, env)?;
        Self::apply_overrides(&mut settings, overrides);
        Ok(settings)
    }

    /// Pick the settings file to read, if any
    fn resolve_file(&self, env: &EnvLookup) -> Result<Option<PathBuf>> {
        if let Some(path) = &self.explicit_file {
            return Ok(Some(path.clone()));
        }

        if let Some(path) = env(EnvVars::CONFIG_FILE).filter(|p| !p.is_empty()) {
            return Ok(Some(PathBuf::from(path)));
        }

        // The default file is optional
        match ConfigPaths::default_config_file() {
            Ok(path) if path.exists() => Ok(Some(path)),
            _ => Ok(None),
        }
    }

    /// Parse a TOML settings file
    fn read_file(path: &Path) -> Result<Settings> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    fn apply_env(settings: &mut Settings, env: &EnvLookup) -> Result<()> {
        if let Some(endpoint) = env(EnvVars::ENDPOINT).filter(|e| !e.is_empty()) {
            settings.endpoint = endpoint;
        }

        if let Some(cleanup) = env(EnvVars::CLEANUP).filter(|c| !c.is_empty()) {
            settings.spike.cleanup_on_failure = parse_bool(&cleanup)
                .with_context(|| format!("Invalid value for {}", EnvVars::CLEANUP))?;
        }

        Ok(())
    }

    fn apply_overrides(settings: &mut Settings, overrides: &SettingsOverrides) {
        if let Some(endpoint) = &overrides.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if let Some(secs) = overrides.request_timeout_secs {
            settings.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(cleanup) = overrides.cleanup_on_failure {
            settings.spike.cleanup_on_failure = cleanup;
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

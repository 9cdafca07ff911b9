// Resource tracking types for the Runtime Configuration spike
//
// This module defines the remote resources a run creates, how their paths
// are composed, and what a teardown reports.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Kinds of remote resource created by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// A config under `projects/<id>/configs`
    Config,
    /// A variable under a config
    Variable,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Config => write!(f, "config"),
            ResourceType::Variable => write!(f, "variable"),
        }
    }
}

/// A resource known to exist remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedResource {
    pub resource_type: ResourceType,
    /// Full resource path
    pub path: String,
    pub created_at: DateTime<Utc>,
}

impl TrackedResource {
    pub fn new(resource_type: ResourceType, path: impl Into<String>) -> Self {
        Self {
            resource_type,
            path: path.into(),
            created_at: Utc::now(),
        }
    }

    /// Whole seconds since the resource was created
    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.created_at).num_seconds().max(0)
    }
}

/// Result of a best-effort teardown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupResult {
    /// Paths deleted, in deletion order
    pub deleted: Vec<String>,
    /// Paths that could not be deleted, with the reason
    pub failed: Vec<(String, String)>,
}

impl CleanupResult {
    /// Whether every tracked resource was removed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Resource paths used by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNaming {
    /// `projects/<id>`
    pub project_path: String,
    /// `projects/<id>/configs/config-<uuid>`
    pub config_path: String,
    /// `<config_path>/variables/<name>`
    pub variable_path: String,
}

impl ResourceNaming {
    /// Prefix of every generated config name
    pub const CONFIG_PREFIX: &'static str = "config-";

    /// Compose paths for a fresh run with a random config name
    pub fn generate(project_id: &str, variable_name: &str) -> Self {
        Self::with_id(project_id, Uuid::new_v4(), variable_name)
    }

    /// Compose paths for a given config id
    pub fn with_id(project_id: &str, id: Uuid, variable_name: &str) -> Self {
        let project_path = format!("projects/{}", project_id);
        let config_path = format!("{}/configs/{}{}", project_path, Self::CONFIG_PREFIX, id);
        let variable_path = format!("{}/variables/{}", config_path, variable_name);

        Self {
            project_path,
            config_path,
            variable_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_paths() {
        let naming = ResourceNaming::generate("test-proj", "myvar1");

        assert_eq!(naming.project_path, "projects/test-proj");
        assert!(naming
            .config_path
            .starts_with("projects/test-proj/configs/config-"));
        let id = naming
            .config_path
            .strip_prefix("projects/test-proj/configs/config-")
            .unwrap();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(
            naming.variable_path,
            format!("{}/variables/myvar1", naming.config_path)
        );
    }

    #[test]
    fn test_generated_paths_are_unique() {
        let first = ResourceNaming::generate("test-proj", "myvar1");
        let second = ResourceNaming::generate("test-proj", "myvar1");
        assert_ne!(first.config_path, second.config_path);
    }

    #[test]
    fn test_paths_for_given_id() {
        let id = Uuid::new_v4();
        let naming = ResourceNaming::with_id("p", id, "v");
        assert_eq!(naming.config_path, format!("projects/p/configs/config-{}", id));
        assert_eq!(naming.variable_path, format!("projects/p/configs/config-{}/variables/v", id));
    }

    #[test]
    fn test_tracked_resource_age() {
        let mut resource = TrackedResource::new(ResourceType::Config, "projects/p/configs/c");
        assert_eq!(resource.age_seconds(), 0);

        resource.created_at = Utc::now() - chrono::Duration::seconds(90);
        assert!(resource.age_seconds() >= 90);
    }

    #[test]
    fn test_cleanup_result() {
        let mut result = CleanupResult::default();
        assert!(result.is_complete());
        result
            .failed
            .push(("projects/p/configs/c".to_string(), "boom".to_string()));
        assert!(!result.is_complete());
    }

    #[test]
    fn test_resource_type_display() {
        assert_eq!(ResourceType::Config.to_string(), "config");
        assert_eq!(ResourceType::Variable.to_string(), "variable");
    }
}

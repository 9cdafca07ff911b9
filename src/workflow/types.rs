// Workflow types for the Runtime Configuration spike

use crate::runtimeconfig::Policy;

/// What a successful run observed
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeReport {
    pub project_id: String,
    pub config_path: String,
    pub variable_path: String,
    /// Names returned by the list call
    pub listed_configs: Vec<String>,
    /// Policy as returned by the service
    pub policy: Policy,
    /// Text returned by the variable read
    pub variable_text: String,
}

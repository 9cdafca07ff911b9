// Resource tracking for the Runtime Configuration spike
//
// Records the remote resources a run has created so a failed run can tear
// them down again.

use tracing::debug;

use super::types::{ResourceType, TrackedResource};

/// In-memory record of resources created by the current run
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    resources: Vec<TrackedResource>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly created resource
    pub fn track(&mut self, resource_type: ResourceType, path: impl Into<String>) {
        let resource = TrackedResource::new(resource_type, path);
        debug!(kind = %resource.resource_type, path = %resource.path, "Tracking resource");
        self.resources.push(resource);
    }

    /// Forget a resource once it has been deleted
    pub fn untrack(&mut self, path: &str) -> Option<TrackedResource> {
        let index = self.resources.iter().position(|r| r.path == path)?;
        debug!(path = %path, "Untracking resource");
        Some(self.resources.remove(index))
    }

    /// Tracked resources, oldest first
    pub fn resources(&self) -> &[TrackedResource] {
        &self.resources
    }

    /// Tracked resources in teardown order, newest first
    pub fn teardown_order(&self) -> impl Iterator<Item = &TrackedResource> {
        self.resources.iter().rev()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}

// Best-effort teardown for the Runtime Configuration spike
//
// Deletes tracked resources newest first. A failed delete is recorded and
// the teardown moves on to the next resource.

use tracing::{info, warn};

use super::tracker::ResourceTracker;
use super::types::{CleanupResult, ResourceType};
use crate::runtimeconfig::RuntimeConfigApi;

/// Delete every tracked resource, ignoring individual failures
pub async fn teardown(api: &dyn RuntimeConfigApi, tracker: &mut ResourceTracker) -> CleanupResult {
    let mut result = CleanupResult::default();
    let pending: Vec<_> = tracker.teardown_order().cloned().collect();

    for resource in pending {
        info!(kind = %resource.resource_type, path = %resource.path, "Tearing down resource");

        let outcome = match resource.resource_type {
            ResourceType::Variable => api.delete_variable(&resource.path).await,
            ResourceType::Config => api.delete_config(&resource.path).await,
        };

        match outcome {
            Ok(()) => {
                tracker.untrack(&resource.path);
                result.deleted.push(resource.path);
            }
            Err(e) => {
                warn!(path = %resource.path, "Failed to tear down resource: {}", e);
                result.failed.push((resource.path, e.to_string()));
            }
        }
    }

    result
}

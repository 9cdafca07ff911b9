// Resource module for the Runtime Configuration spike
//
// This module tracks the configs and variables a run creates so they can be
// torn down when a later step fails.

pub mod cleanup;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use cleanup::teardown;
pub use tracker::ResourceTracker;
pub use types::{CleanupResult, ResourceNaming, ResourceType, TrackedResource};

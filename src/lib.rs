//! Runtime Configuration spike library
//!
//! This library provides the pieces of the Runtime Configuration API spike:
//! Application Default Credentials, an authenticated API client, and the
//! demo sequence that creates, inspects and removes a config and variable.

pub mod config;
pub mod error;
pub mod resource;
pub mod runtimeconfig;
pub mod utils;
pub mod workflow;

// Re-export main types for convenience
pub use config::{ApplicationDefaultCredentials, Settings, SettingsLoader};
pub use error::{Error, Operation, Result};
pub use resource::ResourceTracker;
pub use runtimeconfig::{connect, AuthenticatedClient, RuntimeConfigApi, RuntimeConfigClient};
pub use workflow::{run_spike, SpikeExecutor, SpikeReport};

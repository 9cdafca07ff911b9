// Workflow module for the Runtime Configuration spike
//
// This module drives the demo sequence against any `RuntimeConfigApi`.

pub mod executor;
pub mod types;

// Re-export commonly used types
pub use executor::{run_spike, SpikeExecutor};
pub use types::SpikeReport;

// Shared helpers for the Runtime Configuration spike

pub mod serde_helpers;

pub use serde_helpers::{duration_secs, optional_base64};

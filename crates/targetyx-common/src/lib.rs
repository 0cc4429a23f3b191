//! targetyx-common: Shared error taxonomy, identifier validation, retry policy
//! and the allowlisted HTTP client used by every targetyx crate.

pub mod error;
pub mod ids;
pub mod retry;
pub mod sandbox;

// Re-export commonly used types
pub use error::{Result, TargetyxError};
pub use retry::{RetryConfig, Retryer};

//! Access policy error types.

use thiserror::Error;

/// Errors that can occur while loading or validating a route policy.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The policy file could not be read.
    #[error("failed to read policy: {0}")]
    Io(#[from] std::io::Error),

    /// The policy document is not valid JSON for the policy schema.
    #[error("malformed policy: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The policy parsed but violates a structural rule.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// The policy schema version is not supported by this build.
    #[error("unsupported policy version {found} (supported: {min}..={max})")]
    UnsupportedVersion {
        /// Version found in the document.
        found: u32,
        /// Lowest supported version.
        min: u32,
        /// Highest supported version.
        max: u32,
    },
}

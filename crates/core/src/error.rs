//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A repository identity part was empty or not usable as a storage key.
    #[error("Invalid repository {field}: {reason}")]
    InvalidIdentity {
        /// Which part of the identity was rejected (`owner` or `name`).
        field: &'static str,
        /// Human readable reason.
        reason: &'static str,
    },

    /// The report body was not a JSON document of the expected shape.
    #[error("Malformed report: {0}")]
    MalformedReport(String),

    /// Unknown badge message style.
    #[error("Unknown message style: {0} (expected letterGrade or percentage)")]
    UnknownMessageStyle(String),

    /// Canonical JSON encoding failed.
    #[error("Canonicalization failed: {0}")]
    Canonicalization(String),
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;

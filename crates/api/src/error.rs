//! Tagged error kinds and their HTTP mapping.
//!
//! Every failure carries an [`ErrorKind`] callers branch on, a human readable message and
//! optionally the underlying cause. The JSON body shape is shared by every endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::store::StoreError;

/// Failure classes of the intake and badge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request body or parameters could not be decoded.
    MalformedInput,
    /// The verifier rejected the report.
    Unauthorized,
    /// The verifier failed without reaching a verdict.
    VerificationFault,
    /// A required query parameter was missing or empty.
    MissingParameter,
    /// The store refused the write.
    StorageWriteFailure,
    /// The store could not produce a report. Badge lookups degrade this to "unavailable".
    StorageReadFailure,
}

impl ErrorKind {
    /// HTTP status the kind maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            ErrorKind::MalformedInput | ErrorKind::MissingParameter => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::VerificationFault | ErrorKind::StorageWriteFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // Badge lookups degrade read failures to the unavailable badge, so no response is
            // ever built from this kind; the mapping keeps the taxonomy total.
            ErrorKind::StorageReadFailure => StatusCode::NOT_FOUND,
        }
    }

    /// Machine readable code used in error bodies.
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::VerificationFault => "verification_fault",
            ErrorKind::MissingParameter => "missing_parameter",
            ErrorKind::StorageWriteFailure => "storage_write_failure",
            ErrorKind::StorageReadFailure => "storage_read_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned by dispatcher operations and rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    details: Option<serde_json::Value>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    /// Create an error of `kind`.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Attach structured details to the response body.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark which ingest stage failed.
    pub fn at_stage(self, stage: &'static str) -> Self {
        self.with_details(serde_json::json!({ "stage": stage }))
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured details, if any.
    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }

    /// Request body or parameter could not be decoded.
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput, message)
    }

    /// The verifier rejected the report.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message).at_stage("verify")
    }

    /// The verifier failed internally.
    pub fn verification_fault(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::VerificationFault, message).at_stage("verify")
    }

    /// A required parameter is absent.
    pub fn missing_parameter(parameter: &'static str) -> Self {
        Self::new(
            ErrorKind::MissingParameter,
            format!("Missing required parameter: {}", parameter),
        )
        .with_details(serde_json::json!({ "parameter": parameter }))
    }

    /// The store rejected the write.
    pub fn storage_write_failure(err: StoreError) -> Self {
        Self::new(ErrorKind::StorageWriteFailure, err.to_string())
            .at_stage("persist")
            .with_source(err)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Failure description attached to error responses for the request logger.
#[derive(Debug, Clone)]
pub struct FailureNote(pub String);

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let note = FailureNote(self.to_string());
        let body = ErrorResponse {
            error: ErrorInfo {
                code: self.kind.code(),
                message: self.message,
                details: self.details,
            },
        };

        let mut response = (self.kind.status(), Json(body)).into_response();
        response.extensions_mut().insert(note);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_status_mapping() {
        assert_eq!(ErrorKind::MalformedInput.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorKind::VerificationFault.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ErrorKind::MissingParameter.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorKind::StorageWriteFailure.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_parameter_names_parameter() {
        let err = ApiError::missing_parameter("owner");
        assert_eq!(err.kind(), ErrorKind::MissingParameter);
        assert!(err.message().contains("owner"));
        assert_eq!(err.details().unwrap()["parameter"], "owner");
    }

    #[test]
    fn test_response_carries_failure_note() {
        let response = ApiError::unauthorized("Invalid signature").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let note = response.extensions().get::<FailureNote>().unwrap();
        assert_eq!(note.0, "unauthorized: Invalid signature");
    }

    #[test]
    fn test_source_is_exposed() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = ApiError::new(ErrorKind::StorageWriteFailure, "write failed").with_source(io);
        assert_eq!(err.source().unwrap().to_string(), "disk full");
    }
}

//! Error types for the Hyperping provider.

use thiserror::Error;

use crate::client::ClientError;
use crate::schema::Diagnostic;

/// Result alias used by provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while serving provider requests.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal error in the protocol layer.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// The provider is missing or has invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// A call to the Hyperping API failed.
    #[error("{0}")]
    Api(#[from] ClientError),

    /// The handler already produced user-facing diagnostics.
    #[error("{}", summarize(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// Resource already exists (create conflict).
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Permission denied (authentication/authorization failure).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Quota or rate limit exceeded.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from the host.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.summary.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// Get the error message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Sdk(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::Transport(_err) => "transport error (see Debug output)",
            Self::Api(_err) => "API error (see Display output)",
            Self::Diagnostics(diags) => diags.first().map(|d| d.summary.as_str()).unwrap_or(""),
            Self::AlreadyExists(msg) => msg,
            Self::PermissionDenied(msg) => msg,
            Self::ResourceExhausted(msg) => msg,
            Self::Unavailable(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::FailedPrecondition(msg) => msg,
            Self::Unimplemented(msg) => msg,
            Self::InvalidRequest(msg) => msg,
        }
    }

    /// Convert the error into the diagnostics reported to the host.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::Diagnostics(diags) => diags,
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

impl From<Diagnostic> for ProviderError {
    fn from(diagnostic: Diagnostic) -> Self {
        Self::Diagnostics(vec![diagnostic])
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Sdk(msg) => tonic::Status::internal(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Api(err) => {
                let msg = err.to_string();
                if err.is_not_found() {
                    tonic::Status::not_found(msg)
                } else if err.is_unauthorized() {
                    tonic::Status::permission_denied(msg)
                } else if err.is_rate_limited() {
                    tonic::Status::resource_exhausted(msg)
                } else if err.is_validation() {
                    tonic::Status::invalid_argument(msg)
                } else if err.is_server_error() || err.is_circuit_open() {
                    tonic::Status::unavailable(msg)
                } else {
                    tonic::Status::internal(msg)
                }
            },
            ProviderError::Diagnostics(diags) => tonic::Status::failed_precondition(summarize(&diags)),
            ProviderError::AlreadyExists(msg) => tonic::Status::already_exists(msg),
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::ResourceExhausted(msg) => tonic::Status::resource_exhausted(msg),
            ProviderError::Unavailable(msg) => tonic::Status::unavailable(msg),
            ProviderError::DeadlineExceeded(msg) => tonic::Status::deadline_exceeded(msg),
            ProviderError::FailedPrecondition(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::Unimplemented(msg) => tonic::Status::unimplemented(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("mon_123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: mon_123");

        let err = ProviderError::UnknownResource("hyperping_widget".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: hyperping_widget");

        let err = ProviderError::Configuration("provider not configured".to_string());
        assert_eq!(format!("{}", err), "Configuration error: provider not configured");
    }

    #[test]
    fn test_api_error_display_passes_through() {
        let err: ProviderError = ClientError::Api(ApiError::new(503, "upstream down")).into();
        assert_eq!(err.to_string(), "API error (status 503): upstream down");
    }

    #[test]
    fn test_api_error_to_status() {
        let cases = [
            (404, tonic::Code::NotFound),
            (401, tonic::Code::PermissionDenied),
            (403, tonic::Code::PermissionDenied),
            (429, tonic::Code::ResourceExhausted),
            (422, tonic::Code::InvalidArgument),
            (502, tonic::Code::Unavailable),
            (418, tonic::Code::Internal),
        ];
        for (code, expected) in cases {
            let err: ProviderError = ClientError::Api(ApiError::new(code, "boom")).into();
            let status: tonic::Status = err.into();
            assert_eq!(status.code(), expected, "status {}", code);
        }

        let err: ProviderError = ClientError::CircuitOpen.context("failed to list monitors").into();
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }

    #[test]
    fn test_diagnostics_variant_keeps_diagnostics() {
        let err = ProviderError::Diagnostics(vec![
            Diagnostic::error("Invalid Start Date").with_attribute("start_date"),
            Diagnostic::warning("Past Start Date"),
        ]);
        assert_eq!(err.to_string(), "Invalid Start Date; Past Start Date");
        assert_eq!(err.message(), "Invalid Start Date");

        let diags = err.into_diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].attribute.as_deref(), Some("start_date"));
    }

    #[test]
    fn test_plain_errors_become_single_diagnostic() {
        let diags = ProviderError::Validation("bad".to_string()).into_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "Validation error: bad");
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::Validation("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Configuration("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::Sdk("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Internal);

        let status: tonic::Status = ProviderError::ResourceExhausted("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::InvalidRequest("bad request".to_string());
        assert_eq!(err.message(), "bad request");
        assert_eq!(format!("{}", err), "Invalid request: bad request");
    }
}

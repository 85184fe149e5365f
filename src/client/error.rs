//! Error model for the Hyperping REST client.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned by [`HyperpingClient`](super::HyperpingClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The API answered with a non-success status.
    #[error("{0}")]
    Api(ApiError),

    /// The request never produced a response (connect, TLS, timeout).
    #[error("request failed: {}", sanitize_message(.0))]
    Request(String),

    #[error("failed to marshal request: {0}")]
    Encode(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("response body exceeds maximum size of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("{0}")]
    InvalidId(String),

    /// Client-side request validation failed before anything was sent.
    #[error("{0}")]
    InvalidInput(String),

    /// The circuit breaker is rejecting calls after repeated failures.
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// The half-open circuit already admitted its request budget.
    #[error("too many requests")]
    TooManyRequests,

    /// An error annotated with the operation that produced it.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Wrap the error with a description of the failed operation,
    /// e.g. `failed to get monitor mon_123`.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The API error at the root of this error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Context { source, .. } => source.api_error(),
            _ => None,
        }
    }

    /// HTTP status of the underlying API error.
    pub fn status_code(&self) -> Option<u16> {
        self.api_error().map(|e| e.status_code)
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status_code() == Some(429)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.status_code(), Some(400) | Some(422))
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_some_and(|s| s >= 500)
    }

    /// The request was refused locally by the circuit breaker.
    pub fn is_circuit_open(&self) -> bool {
        match self {
            Self::CircuitOpen | Self::TooManyRequests => true,
            Self::Context { source, .. } => source.is_circuit_open(),
            _ => false,
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

/// A field-level validation failure reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationDetail {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub message: String,
}

/// A non-2xx response from the Hyperping API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
    pub details: Vec<ValidationDetail>,
    /// Seconds to wait before retrying; only set for 429 responses.
    pub retry_after: u64,
}

impl ApiError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            details: Vec::new(),
            retry_after: 0,
        }
    }

    pub fn with_details(mut self, details: Vec<ValidationDetail>) -> Self {
        self.details = details;
        self
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            retry_after,
            ..Self::new(429, "rate limit exceeded")
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = sanitize_message(&self.message);
        if self.status_code == 429 && self.retry_after > 0 {
            return write!(
                f,
                "API error (status {}): {} - retry after {} seconds",
                self.status_code, message, self.retry_after
            );
        }
        if !self.details.is_empty() {
            return write!(
                f,
                "API error (status {}): {} - {} validation errors",
                self.status_code,
                message,
                self.details.len()
            );
        }
        write!(f, "API error (status {}): {}", self.status_code, message)
    }
}

impl std::error::Error for ApiError {}

static API_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk_[a-zA-Z0-9_-]+").expect("api key pattern"));
static AUTH_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Authorization:\s+Bearer\s+[^\s]+").expect("authorization header pattern")
});
static BEARER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Bearer\s+(?:[^\s]*[0-9_-][^\s]*|[^\s]{32,})").expect("bearer pattern")
});
static URL_CREDENTIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"://[^:]+:[^@]+@").expect("url credential pattern"));

/// Redact API keys, bearer tokens and URL credentials from a message.
///
/// The order matters: the `Authorization:` form is rewritten before the
/// bare `Bearer` form so the header keeps a readable shape.
pub fn sanitize_message(msg: &str) -> String {
    let msg = API_KEY.replace_all(msg, "sk_***REDACTED***");
    let msg = AUTH_HEADER.replace_all(&msg, "Authorization: ***REDACTED***");
    let msg = BEARER.replace_all(&msg, "Bearer ***REDACTED***");
    URL_CREDENTIALS
        .replace_all(&msg, "://***REDACTED***@")
        .into_owned()
}

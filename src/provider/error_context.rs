//! Classification of API failures.
//!
//! Each failure is sorted into a category from its status code and message,
//! and the category picks the troubleshooting advice shown to the user.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::client::ClientError;

/// Seconds to wait when a rate limit response gives no usable hint.
pub const DEFAULT_RETRY_AFTER: u64 = 60;

static RETRY_AFTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"retry after (\d+) seconds?").expect("retry-after pattern")
});

static STATUS_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"status (\d{3})").expect("status code pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    AuthError,
    RateLimit,
    ServerError,
    Validation,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::AuthError => "auth_error",
            Self::RateLimit => "rate_limit",
            Self::ServerError => "server_error",
            Self::Validation => "validation",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong, where, and what the user can do about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub category: ErrorCategory,
    /// Zero when no status applies.
    pub http_status: u16,
    /// Only set for rate limits.
    pub retry_after: u64,
    pub resource_type: String,
    pub resource_id: String,
    pub operation: String,
    pub message: String,
}

impl ErrorContext {
    /// Classify `err`. `None` yields an `Unknown` context with no message.
    pub fn detect(
        resource_type: &str,
        resource_id: &str,
        operation: &str,
        err: Option<&ClientError>,
    ) -> Self {
        let mut ctx = Self {
            category: ErrorCategory::Unknown,
            http_status: 0,
            retry_after: 0,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            operation: operation.to_string(),
            message: String::new(),
        };
        let Some(err) = err else {
            return ctx;
        };
        ctx.message = err.to_string();
        let message = Some(ctx.message.as_str());

        if err.is_not_found() {
            ctx.category = ErrorCategory::NotFound;
            ctx.http_status = 404;
        } else if err.is_unauthorized() {
            ctx.category = ErrorCategory::AuthError;
            ctx.http_status = match err.status_code() {
                Some(code) => code,
                None if ctx.message.contains("403") => 403,
                None => 401,
            };
        } else if err.is_rate_limited() {
            ctx.category = ErrorCategory::RateLimit;
            ctx.http_status = 429;
            ctx.retry_after = extract_retry_after(message);
        } else if err.is_server_error() {
            ctx.category = ErrorCategory::ServerError;
            ctx.http_status = extract_status_code(message, 500);
        } else if err.is_validation() {
            ctx.category = ErrorCategory::Validation;
            ctx.http_status = extract_status_code(message, 400);
        }
        ctx
    }

    /// The numbered troubleshooting block appended to error details.
    pub fn troubleshooting(&self) -> String {
        let steps = match self.category {
            ErrorCategory::NotFound => self.not_found_steps(),
            ErrorCategory::AuthError => self.auth_steps(),
            ErrorCategory::RateLimit => self.rate_limit_steps(),
            ErrorCategory::ServerError => server_error_steps(),
            ErrorCategory::Validation => self.validation_steps(),
            ErrorCategory::Unknown => generic_steps(),
        };
        format!("Troubleshooting:\n{}\n", steps.join("\n"))
    }

    fn not_found_steps(&self) -> Vec<String> {
        let mut steps = vec![
            format!(
                "1. Verify the {} still exists in the Hyperping dashboard: {}",
                self.resource_type,
                dashboard_url(&self.resource_type)
            ),
            "2. Check if the resource was deleted outside of Terraform".to_string(),
        ];
        if !self.resource_id.is_empty() {
            steps.push(format!(
                "3. Verify the resource ID is correct: {}",
                self.resource_id
            ));
            steps.push(
                "4. Try viewing the resource state: terraform state show <resource_address>"
                    .to_string(),
            );
        }
        steps.push(
            "5. If the resource was deleted manually, remove it from Terraform state or recreate it"
                .to_string(),
        );
        steps
    }

    fn auth_steps(&self) -> Vec<String> {
        let mut steps: Vec<String> = [
            "1. Verify your HYPERPING_API_KEY environment variable is set:",
            "   $ echo $HYPERPING_API_KEY",
            "2. Confirm your API key format is correct (starts with 'sk_')",
            "3. Test your API key with curl:",
            "   $ curl -H \"Authorization: Bearer $HYPERPING_API_KEY\" https://api.hyperping.io/v1/monitors",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        if self.http_status == 403 {
            steps.push(
                "4. Verify your API key has the required permissions for this operation"
                    .to_string(),
            );
            steps.push(format!(
                "5. Check if your account has access to {} resources",
                self.resource_type
            ));
        } else {
            steps.push(
                "4. If the key is invalid, generate a new one at: https://app.hyperping.io/settings/api"
                    .to_string(),
            );
        }
        steps
    }

    fn rate_limit_steps(&self) -> Vec<String> {
        let wait = if self.retry_after == 0 {
            DEFAULT_RETRY_AFTER
        } else {
            self.retry_after
        };
        vec![
            format!("1. Wait {} seconds before retrying", wait),
            "2. Reduce the number of parallel operations:".to_string(),
            "   $ terraform apply -parallelism=1".to_string(),
            "3. Consider batching your operations to reduce API calls".to_string(),
            "4. Review Hyperping rate limits documentation: https://docs.hyperping.io/api/rate-limits"
                .to_string(),
        ]
    }

    fn validation_steps(&self) -> Vec<String> {
        let mut steps = vec![
            "1. Review the error message for specific field validation failures".to_string(),
            "2. Check that all required fields are provided".to_string(),
            format!(
                "3. Consult the {} documentation for valid field values",
                self.resource_type
            ),
            "4. Common validation issues:".to_string(),
        ];
        let hints: &[&str] = match self.resource_type.as_str() {
            "Monitor" => &[
                "   - URL must be valid and accessible",
                "   - Frequency must be one of: 10, 20, 30, 60, 120, 180, 300, 600, 1800, 3600, 21600, 43200, 86400",
                "   - Regions must be valid Hyperping region codes",
            ],
            "Incident" => &[
                "   - Title must be 1-255 characters",
                "   - Type must be one of: outage, incident",
            ],
            "Maintenance Window" => &[
                "   - start_date and end_date must be valid ISO 8601 timestamps",
                "   - end_date must be after start_date",
                "   - Name must be 1-255 characters",
            ],
            _ => &["   - Check field types and value constraints"],
        };
        steps.extend(hints.iter().map(|s| s.to_string()));
        steps.push("5. Review documentation: https://docs.hyperping.io".to_string());
        steps
    }
}

fn server_error_steps() -> Vec<String> {
    [
        "1. Check Hyperping service status: https://status.hyperping.app",
        "2. Wait a few moments and retry the operation",
        "3. If the error persists, check for any ongoing incidents",
        "4. Contact Hyperping support if the issue continues: https://hyperping.io/support",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn generic_steps() -> Vec<String> {
    [
        "1. Review the error message for specific details",
        "2. Check network connectivity to Hyperping API",
        "3. Verify your API key is valid and has required permissions",
        "4. Check Hyperping service status: https://status.hyperping.app",
        "5. Re-run with RUST_LOG=hyperping_provider=debug for request-level logs",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn dashboard_url(resource_type: &str) -> &'static str {
    match resource_type {
        "Monitor" => "https://app.hyperping.io/monitors",
        "Incident" | "Incident Update" => "https://app.hyperping.io/incidents",
        "Maintenance Window" => "https://app.hyperping.io/maintenance",
        "Status Page" | "Status Page Subscriber" => "https://app.hyperping.io/statuspages",
        "Healthcheck" => "https://app.hyperping.io/healthchecks",
        "Outage" => "https://app.hyperping.io/outages",
        _ => "https://app.hyperping.io",
    }
}

/// Seconds from a `retry after N second(s)` phrase, else [`DEFAULT_RETRY_AFTER`].
pub fn extract_retry_after(message: Option<&str>) -> u64 {
    let Some(message) = message else {
        return DEFAULT_RETRY_AFTER;
    };
    RETRY_AFTER_PATTERN
        .captures(&message.to_lowercase())
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Status from a `status NNN` phrase, else `default`.
pub fn extract_status_code(message: Option<&str>, default: u16) -> u16 {
    message
        .and_then(|m| STATUS_CODE_PATTERN.captures(m))
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(default)
}

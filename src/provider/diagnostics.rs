//! User-facing diagnostics for failed API calls.
//!
//! Every detail carries the error text, its category and the troubleshooting
//! block built by [`ErrorContext`].

use std::fmt;

use crate::client::ClientError;
use crate::schema::Diagnostic;

use super::error_context::{ErrorCategory, ErrorContext};

fn context_block(ctx: &ErrorContext) -> String {
    let mut block = format!("Category: {}", ctx.category);
    if ctx.category == ErrorCategory::RateLimit {
        block.push_str(&format!(" (retry after {} seconds)", ctx.retry_after));
    }
    block.push_str("\n\n");
    block.push_str(&ctx.troubleshooting());
    block
}

pub fn create_error(resource_type: &str, err: &ClientError) -> Diagnostic {
    let ctx = ErrorContext::detect(resource_type, "", "create", Some(err));
    Diagnostic::error(format!("Failed to Create {}", resource_type)).with_detail(format!(
        "Unable to create {}, got error: {}\n\n{}",
        resource_type,
        err,
        context_block(&ctx)
    ))
}

pub fn read_error(resource_type: &str, id: &str, err: &ClientError) -> Diagnostic {
    let ctx = ErrorContext::detect(resource_type, id, "read", Some(err));
    Diagnostic::error(format!("Failed to Read {}", resource_type)).with_detail(format!(
        "Unable to read {} (ID: {}), got error: {}\n\n{}",
        resource_type,
        id,
        err,
        context_block(&ctx)
    ))
}

pub fn update_error(resource_type: &str, id: &str, err: impl fmt::Display) -> Diagnostic {
    Diagnostic::error(format!("Failed to Update {}", resource_type)).with_detail(format!(
        "Unable to update {} (ID: {}), got error: {}",
        resource_type, id, err
    ))
}

/// Like [`update_error`] but for API failures, with category and advice.
pub fn update_api_error(resource_type: &str, id: &str, err: &ClientError) -> Diagnostic {
    let ctx = ErrorContext::detect(resource_type, id, "update", Some(err));
    Diagnostic::error(format!("Failed to Update {}", resource_type)).with_detail(format!(
        "Unable to update {} (ID: {}), got error: {}\n\n{}",
        resource_type,
        id,
        err,
        context_block(&ctx)
    ))
}

pub fn delete_error(resource_type: &str, id: &str, err: &ClientError) -> Diagnostic {
    let ctx = ErrorContext::detect(resource_type, id, "delete", Some(err));
    Diagnostic::error(format!("Failed to Delete {}", resource_type)).with_detail(format!(
        "Unable to delete {} (ID: {}), got error: {}\n\n{}",
        resource_type,
        id,
        err,
        context_block(&ctx)
    ))
}

pub fn list_error(resource_type: &str, err: &ClientError) -> Diagnostic {
    let ctx = ErrorContext::detect(resource_type, "", "list", Some(err));
    Diagnostic::error(format!("Failed to List {}", resource_type)).with_detail(format!(
        "Unable to list {}, got error: {}\n\n{}",
        resource_type,
        err,
        context_block(&ctx)
    ))
}

/// `type_suffix` is the resource type name without the `hyperping_` prefix,
/// used in the suggested import command.
pub fn read_after_create_error(
    resource_type: &str,
    type_suffix: &str,
    id: &str,
    err: &ClientError,
) -> Diagnostic {
    Diagnostic::error(format!("{} Created But Read Failed", resource_type)).with_detail(format!(
        "{} was created successfully (ID: {}) but reading it back failed: {}\n\n\
         The resource exists in Hyperping but may not be in Terraform state. \
         You may need to import it manually:\n  terraform import hyperping_{}.example {}",
        resource_type, id, err, type_suffix, id
    ))
}

pub fn read_after_update_error(resource_type: &str, id: &str, err: &ClientError) -> Diagnostic {
    Diagnostic::error(format!("{} Updated But Read Failed", resource_type)).with_detail(format!(
        "{} was updated successfully (ID: {}) but reading the updated state failed: {}\n\n\
         The resource was modified in Hyperping. Run 'terraform refresh' to sync the state.",
        resource_type, id, err
    ))
}

pub fn config_error(message: impl fmt::Display) -> Diagnostic {
    Diagnostic::error("Configuration Error").with_detail(format!(
        "{}\n\nCheck the provider configuration and try again.",
        message
    ))
}

pub fn validation_error(field: &str, message: impl Into<String>) -> Diagnostic {
    Diagnostic::error(format!("Invalid {}", field))
        .with_detail(message)
        .with_attribute(field)
}

pub fn import_error(resource_type: &str, err: impl fmt::Display) -> Diagnostic {
    Diagnostic::error("Import Failed").with_detail(format!(
        "Cannot import {}: {}\n\nVerify the import ID format is correct. \
         See the resource documentation for import examples.",
        resource_type, err
    ))
}

/// Warning for a delete that found nothing to delete.
pub fn not_found_warning(resource_type: &str, message: impl Into<String>) -> Diagnostic {
    Diagnostic::warning(format!("{} Not Found", resource_type)).with_detail(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_create_error_includes_category_and_steps() {
        let err = ClientError::from(ApiError::rate_limited(30)).context("failed to create monitor");
        let diag = create_error("Monitor", &err);
        assert_eq!(diag.summary, "Failed to Create Monitor");
        let detail = diag.detail.unwrap();
        assert!(detail.starts_with("Unable to create Monitor, got error: failed to create monitor"));
        assert!(detail.contains("Category: rate_limit (retry after 30 seconds)"));
        assert!(detail.contains("Troubleshooting:\n1. Wait 30 seconds before retrying"));
    }

    #[test]
    fn test_read_error_mentions_id() {
        let err = ClientError::from(ApiError::new(500, "boom"));
        let diag = read_error("Healthcheck", "tok_1", &err);
        let detail = diag.detail.unwrap();
        assert!(detail.contains("(ID: tok_1)"));
        assert!(detail.contains("Category: server_error"));
        assert!(detail.contains("status.hyperping.app"));
    }

    #[test]
    fn test_read_after_create_suggests_import() {
        let err = ClientError::from(ApiError::new(502, "bad gateway"));
        let diag = read_after_create_error("Incident", "incident", "inci_1", &err);
        assert_eq!(diag.summary, "Incident Created But Read Failed");
        assert!(diag
            .detail
            .unwrap()
            .contains("terraform import hyperping_incident.example inci_1"));
    }

    #[test]
    fn test_small_builders() {
        let diag = validation_error("base_url", "must be https");
        assert_eq!(diag.summary, "Invalid base_url");
        assert_eq!(diag.attribute.as_deref(), Some("base_url"));

        let diag = import_error("Monitor", "resource ID must not be empty");
        assert_eq!(diag.summary, "Import Failed");
        assert!(diag.detail.unwrap().starts_with("Cannot import Monitor: resource ID"));

        let diag = not_found_warning("Incident", "already gone");
        assert_eq!(diag.severity, DiagnosticSeverity::Warning);
        assert_eq!(diag.summary, "Incident Not Found");

        assert_eq!(config_error("x").summary, "Configuration Error");
    }
}

//! In-process harness for driving a [`ProviderService`] without a gRPC
//! server.
//!
//! ```ignore
//! let tester = ProviderTester::new(HyperpingProvider::with_transport(Arc::new(mock)));
//! tester.configure(json!({"api_key": "sk_test"})).await.unwrap();
//!
//! let plan = tester.plan_create("hyperping_monitor", config).await.unwrap();
//! let created = tester.create("hyperping_monitor", plan.planned_state).await.unwrap();
//! assert_eq!(created.state["protocol"], "http");
//! ```

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, StateResponse};

pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// `Err` carries only the error diagnostics; warnings are dropped.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a create. The proposed state doubles as the config.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<StateResponse, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<StateResponse, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<StateResponse, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Returns the warnings the delete produced.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    pub async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .upgrade_resource_state(resource_type, version, state)
            .await
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<StateResponse, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Plan, create, then read back. Returns the state after the read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        let read = self.read(resource_type, created.state).await?;
        Ok(read.state)
    }

    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        self.plan_delete(resource_type, current_state.clone()).await?;
        self.delete(resource_type, current_state).await
    }
}

/// Failure of a tester call that reports diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("{}", describe(.0))]
    Diagnostics(Vec<Diagnostic>),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn describe(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("Operation failed with {} diagnostic(s):", diagnostics.len());
    for diag in diagnostics {
        out.push_str(&format!("\n  [{:?}] {}", diag.severity, diag.summary));
        if let Some(detail) = &diag.detail {
            out.push_str(&format!(": {}", detail));
        }
        if let Some(attr) = &diag.attribute {
            out.push_str(&format!(" (at {})", attr));
        }
    }
    out
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// # Panics
///
/// Panics if no error diagnostic's summary contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

/// # Panics
///
/// Panics if no warning's summary equals `summary`.
pub fn assert_has_warning(diagnostics: &[Diagnostic], summary: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| matches!(d.severity, DiagnosticSeverity::Warning) && d.summary == summary),
        "Expected warning '{}', got: {:?}",
        summary,
        diagnostics.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// The diagnostics carried by a failed call.
///
/// # Panics
///
/// Panics if `err` is not [`ProviderError::Diagnostics`].
pub fn error_diagnostics(err: ProviderError) -> Vec<Diagnostic> {
    match err {
        ProviderError::Diagnostics(diags) => diags,
        other => panic!("Expected diagnostics, got: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use crate::types::AttributeChange;
    use serde_json::json;

    struct StaticProvider;

    #[async_trait::async_trait]
    impl ProviderService for StaticProvider {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new().with_resource(
                "hyperping_static",
                Schema::v0()
                    .with_attribute("name", Attribute::required_string())
                    .with_attribute("id", Attribute::computed_string()),
            )
        }

        async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            if config.get("api_key").is_none() {
                return Ok(vec![Diagnostic::error("Missing Hyperping API Key")]);
            }
            Ok(vec![Diagnostic::warning("Using test key")])
        }

        async fn plan(
            &self,
            _resource_type: &str,
            prior_state: Option<Value>,
            proposed_state: Value,
            _config: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(match prior_state {
                None => PlanResult::with_changes(
                    proposed_state.clone(),
                    vec![AttributeChange::added("name", proposed_state["name"].clone())],
                    false,
                ),
                Some(prior) => PlanResult::no_change(prior),
            })
        }

        async fn create(&self, _t: &str, planned: Value) -> Result<StateResponse, ProviderError> {
            let mut state = planned;
            state["id"] = json!("st_1");
            Ok(StateResponse::new(state))
        }

        async fn read(&self, _t: &str, current: Value) -> Result<StateResponse, ProviderError> {
            Ok(StateResponse::new(current))
        }

        async fn update(
            &self,
            _t: &str,
            _prior: Value,
            planned: Value,
        ) -> Result<StateResponse, ProviderError> {
            Ok(StateResponse::new(planned))
        }

        async fn delete(&self, _t: &str, _current: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            Ok(vec![Diagnostic::warning("Static Resource Deleted")])
        }
    }

    #[tokio::test]
    async fn test_configure_splits_errors_from_warnings() {
        let tester = ProviderTester::new(StaticProvider);
        assert!(tester.configure(json!({"api_key": "sk_test"})).await.is_ok());

        let err = tester.configure(json!({})).await.unwrap_err();
        match err {
            TestError::Diagnostics(diags) => assert_error_contains(&diags, "Missing Hyperping API Key"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_create_and_delete() {
        let tester = ProviderTester::new(StaticProvider);
        let state = tester
            .lifecycle_create("hyperping_static", json!({"name": "one"}))
            .await
            .unwrap();
        assert_eq!(state["id"], "st_1");

        let warnings = tester.lifecycle_delete("hyperping_static", state).await.unwrap();
        assert_has_warning(&warnings, "Static Resource Deleted");
    }

    #[tokio::test]
    async fn test_plan_assertions() {
        let tester = ProviderTester::new(StaticProvider);
        let plan = tester
            .plan_create("hyperping_static", json!({"name": "one"}))
            .await
            .unwrap();
        assert_plan_creates(&plan);
        assert_plan_changes_attribute(&plan, "name");

        let plan = tester
            .plan_update("hyperping_static", json!({"name": "one"}), json!({"name": "one"}))
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
        assert_plan_updates_in_place(&plan);
    }

    #[test]
    fn test_resource_types_come_from_schema() {
        let tester = ProviderTester::new(StaticProvider);
        assert_eq!(tester.resource_types(), vec!["hyperping_static".to_string()]);
        assert!(tester.data_source_types().is_empty());
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("Invalid Base URL").with_attribute("base_url")
        ]);
        let text = err.to_string();
        assert!(text.contains("Invalid Base URL"));
        assert!(text.contains("(at base_url)"));
    }
}

//! The Hyperping provider.
//!
//! [`HyperpingProvider`] implements [`ProviderService`] by dispatching each
//! operation to a registered [`Resource`] or [`DataSource`] keyed by type
//! name. Planning is shared: every resource is planned from its schema by
//! [`plan::plan_resource`] after config validation.

pub mod config;
pub mod diagnostics;
pub mod diff;
pub mod error_context;
pub mod filters;
pub mod mapping;
pub mod plan;
pub mod statuspage_mapping;

mod data_sources;
mod resources;

use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::{validate_resource_id, HttpTransport, HyperpingClient, ReqwestTransport};
use crate::error::{ProviderError, Result};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{strip_unknown, ImportedResource, PlanResult, StateResponse};
use crate::validation;

use self::config::{build_client, provider_schema, resolve_base_url, ProviderConfig};

/// A managed Hyperping object.
#[async_trait]
pub trait Resource: Send + Sync {
    /// `hyperping_<entity>`.
    fn type_name(&self) -> &'static str;

    /// Name used in diagnostics, e.g. `Monitor`.
    fn display_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Cross-attribute checks the schema cannot express.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    async fn create(&self, client: &HyperpingClient, planned: Value) -> Result<StateResponse>;

    /// Returns [`StateResponse::removed`] when the object is gone.
    async fn read(&self, client: &HyperpingClient, current: Value) -> Result<StateResponse>;

    async fn update(
        &self,
        client: &HyperpingClient,
        prior: Value,
        planned: Value,
    ) -> Result<StateResponse>;

    /// Returns warnings.
    async fn delete(&self, client: &HyperpingClient, current: Value) -> Result<Vec<Diagnostic>>;

    /// Import by id: validate it, then read.
    async fn import(&self, client: &HyperpingClient, id: &str) -> Result<StateResponse> {
        validate_resource_id(id)
            .map_err(|e| diagnostics::import_error(self.display_name(), e))?;
        self.read(client, json!({ "id": id })).await
    }
}

/// A read-only lookup.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let _ = config;
        Vec::new()
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse>;
}

/// Decode a state or config value. Unknown values read as null and a null
/// value yields the default.
pub(crate) fn parse_state<T: DeserializeOwned + Default>(value: &Value) -> Result<T> {
    match strip_unknown(value) {
        Value::Null => Ok(T::default()),
        other => Ok(serde_json::from_value(other)?),
    }
}

pub(crate) fn to_state<T: Serialize>(state: &T) -> Result<Value> {
    Ok(serde_json::to_value(state)?)
}

pub(crate) fn require_id(id: Option<&str>, resource_type: &str) -> Result<String> {
    match id {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ProviderError::InvalidRequest(format!(
            "{} state has no id",
            resource_type
        ))),
    }
}

pub(crate) fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|d| d.severity == DiagnosticSeverity::Error)
}

/// `Err` with every diagnostic when any of them is an error, otherwise the
/// warnings back.
pub(crate) fn fail_on_errors(diagnostics: Vec<Diagnostic>) -> Result<Vec<Diagnostic>> {
    if has_errors(&diagnostics) {
        Err(ProviderError::Diagnostics(diagnostics))
    } else {
        Ok(diagnostics)
    }
}

pub struct HyperpingProvider {
    client: RwLock<Option<HyperpingClient>>,
    transport: Option<Arc<dyn HttpTransport>>,
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
}

impl Default for HyperpingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperpingProvider {
    /// A provider that talks to the API over `reqwest` once configured.
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            transport: None,
            resources: resources::all()
                .into_iter()
                .map(|r| (r.type_name(), r))
                .collect(),
            data_sources: data_sources::all()
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
        }
    }

    /// Send every request through `transport` instead of the network.
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport: Some(transport),
            ..Self::new()
        }
    }

    async fn client(&self) -> Result<HyperpingClient> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "provider is not configured; call Configure before using resources".to_string(),
            )
        })
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource> {
        self.resources
            .get(resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&dyn DataSource> {
        self.data_sources
            .get(data_source_type)
            .map(|d| d.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

#[async_trait]
impl ProviderService for HyperpingProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = self.resources.values().fold(
            ProviderSchema::new().with_provider_config(provider_schema()),
            |schema, r| schema.with_resource(r.type_name(), r.schema()),
        );
        self.data_sources
            .values()
            .fold(schema, |schema, d| schema.with_data_source(d.type_name(), d.schema()))
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>> {
        let mut diagnostics = validation::validate(&provider_schema(), &config);
        if let Ok(cfg) = ProviderConfig::from_value(&config) {
            if let Err(diag) = resolve_base_url(cfg.base_url.as_deref()) {
                diagnostics.push(diag);
            }
        }
        Ok(diagnostics)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>> {
        let cfg = match ProviderConfig::from_value(&config) {
            Ok(cfg) => cfg,
            Err(e) => return Ok(vec![diagnostics::config_error(e)]),
        };
        let transport: Arc<dyn HttpTransport> = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(ReqwestTransport::new()?),
        };
        let user_agent = env::var(config::USER_AGENT_ENV).ok();
        let client = match build_client(
            &cfg,
            env::var(config::API_KEY_ENV).ok(),
            user_agent.as_deref(),
            transport,
        ) {
            Ok(client) => client,
            Err(diag) => return Ok(vec![diag]),
        };
        info!(base_url = %client.base_url(), "Configured Hyperping client");
        *self.client.write().await = Some(client);
        Ok(vec![])
    }

    async fn stop(&self) -> Result<()> {
        info!("Hyperping provider stopping");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = validation::validate(&resource.schema(), &config);
        diagnostics.extend(resource.validate(&config));
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult> {
        let resource = self.resource(resource_type)?;
        let schema = resource.schema();
        if proposed_state.is_null() {
            return Ok(plan::plan_resource(&schema, prior_state.as_ref(), &proposed_state));
        }

        let mut diagnostics = validation::validate(&schema, &config);
        diagnostics.extend(resource.validate(&config));
        let warnings = fail_on_errors(diagnostics)?;

        let result = plan::plan_resource(&schema, prior_state.as_ref(), &proposed_state);
        debug!(
            resource_type,
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "Planned resource"
        );
        Ok(result.with_diagnostics(warnings))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<StateResponse> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.create(&client, planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<StateResponse> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.read(&client, current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<StateResponse> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.update(&client, prior_state, planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<Vec<Diagnostic>> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.delete(&client, current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let response = resource.import(&client, id).await?;
        if response.is_removed() {
            return Err(diagnostics::import_error(
                resource.display_name(),
                format!("{} {} not found", resource.display_name(), id),
            )
            .into());
        }
        Ok(vec![ImportedResource::new(resource_type, response.state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>> {
        let data_source = self.data_source(data_source_type)?;
        let mut diagnostics = validation::validate(&data_source.schema(), &config);
        diagnostics.extend(data_source.validate(&config));
        Ok(diagnostics)
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<StateResponse> {
        let data_source = self.data_source(data_source_type)?;
        let client = self.client().await?;
        data_source.read(&client, config).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use serde_json::json;

    use super::HyperpingProvider;
    use crate::client::MockHttpTransport;
    use crate::testing::ProviderTester;

    /// A configured tester whose requests go to `mock`.
    pub async fn tester(mock: MockHttpTransport) -> ProviderTester<HyperpingProvider> {
        let tester = ProviderTester::new(HyperpingProvider::with_transport(Arc::new(mock)));
        tester
            .configure(json!({"api_key": "sk_test_key", "base_url": "https://api.hyperping.io"}))
            .await
            .unwrap();
        tester
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::tester;
    use super::*;
    use crate::client::test_support::{ok, path_of};
    use crate::client::MockHttpTransport;
    use crate::testing::{
        assert_error_contains, assert_plan_creates, assert_plan_replaces, error_diagnostics,
        ProviderTester,
    };
    use crate::types::UNKNOWN_VALUE;
    use reqwest::Method;

    #[test]
    fn test_registry_covers_every_type() {
        let tester = ProviderTester::new(HyperpingProvider::new());
        let mut resources = tester.resource_types();
        resources.sort();
        assert_eq!(
            resources,
            vec![
                "hyperping_healthcheck",
                "hyperping_incident",
                "hyperping_incident_update",
                "hyperping_maintenance",
                "hyperping_monitor",
                "hyperping_outage",
                "hyperping_statuspage",
                "hyperping_statuspage_subscriber",
            ]
        );
        let data_sources = tester.data_source_types();
        assert_eq!(data_sources.len(), 15);
        assert!(data_sources.contains(&"hyperping_statuspage_subscribers".to_string()));
        assert!(data_sources.contains(&"hyperping_monitor_reports".to_string()));
        assert!(tester.schema().provider.block.attributes["api_key"].flags.sensitive);
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let tester = ProviderTester::new(HyperpingProvider::new());
        let err = tester
            .create("hyperping_monitor", json!({"name": "api"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let tester = tester(MockHttpTransport::new()).await;
        let err = tester.read("hyperping_widget", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown resource type: hyperping_widget");
        let err = tester
            .read_data_source("hyperping_widgets", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_configure_rejects_foreign_base_url() {
        let tester = ProviderTester::new(HyperpingProvider::with_transport(Arc::new(
            MockHttpTransport::new(),
        )));
        let config = json!({"api_key": "sk_x", "base_url": "https://evil.example"});

        let err = tester.validate_provider_config(config.clone()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid Base URL"));

        let err = tester.configure(config).await.unwrap_err();
        assert!(err.to_string().contains("Invalid Base URL"));
    }

    #[tokio::test]
    async fn test_plan_create_fills_defaults() {
        let tester = tester(MockHttpTransport::new()).await;
        let plan = tester
            .plan_create(
                "hyperping_monitor",
                json!({"name": "api", "url": "https://example.com"}),
            )
            .await
            .unwrap();
        assert_plan_creates(&plan);
        assert_eq!(plan.planned_state["protocol"], "http");
        assert_eq!(plan.planned_state["check_frequency"], 60);
        assert_eq!(plan.planned_state["follow_redirects"], true);
        assert_eq!(plan.planned_state["id"], UNKNOWN_VALUE);
    }

    #[tokio::test]
    async fn test_plan_rejects_invalid_config() {
        let tester = tester(MockHttpTransport::new()).await;
        let err = tester
            .plan_create(
                "hyperping_monitor",
                json!({"name": "db", "url": "db.internal", "protocol": "port", "check_frequency": 45}),
            )
            .await
            .unwrap_err();
        let diags = error_diagnostics(err);
        assert_error_contains(&diags, "Missing Port");
        assert_error_contains(&diags, "Invalid Attribute Value Match");
    }

    #[tokio::test]
    async fn test_plan_force_new_replaces() {
        let tester = tester(MockHttpTransport::new()).await;
        let prior = json!({
            "id": "out_1",
            "monitor_uuid": "mon_abc123",
            "start_date": "2030-01-01T00:00:00Z",
            "status_code": 500,
            "description": "db down",
        });
        let mut proposed = prior.clone();
        proposed["description"] = json!("db degraded");
        let plan = tester
            .plan_update("hyperping_outage", prior, proposed)
            .await
            .unwrap();
        assert_plan_replaces(&plan);
    }

    #[tokio::test]
    async fn test_import_reads_by_id() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v1/monitors/mon_1")
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(json!({
                        "uuid": "mon_1",
                        "name": "api",
                        "url": "https://example.com",
                        "protocol": "http",
                        "http_method": "GET",
                        "check_frequency": 60,
                        "expected_status_code": "2xx",
                        "follow_redirects": true,
                    }))
                })
            });
        let tester = tester(mock).await;

        let imported = tester
            .import_resource("hyperping_monitor", "mon_1")
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].state["name"], "api");

        let err = tester
            .import_resource("hyperping_monitor", "../etc")
            .await
            .unwrap_err();
        assert_error_contains(&error_diagnostics(err), "Import Failed");
    }
}

//! `hyperping_healthcheck` and `hyperping_healthchecks`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::client::HyperpingClient;
use crate::error::Result;
use crate::schema::{Attribute, Block, Diagnostic, Schema};
use crate::types::StateResponse;

use crate::provider::diagnostics::{list_error, read_error};
use crate::provider::filters::{filter_block, Filter};
use crate::provider::mapping::{healthcheck_to_state, HealthcheckState};
use crate::provider::{to_state, DataSource};

use super::{filter_diagnostics, list_schema, list_state, lookup_id, lookup_schema};

fn healthcheck_item() -> Block {
    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("name", Attribute::computed_string())
        .with_attribute("ping_url", Attribute::computed_string())
        .with_attribute("cron", Attribute::computed_string())
        .with_attribute("timezone", Attribute::computed_string())
        .with_attribute("period_value", Attribute::computed_int64())
        .with_attribute("period_type", Attribute::computed_string())
        .with_attribute("grace_period_value", Attribute::computed_int64())
        .with_attribute("grace_period_type", Attribute::computed_string())
        .with_attribute("escalation_policy", Attribute::computed_string())
        .with_attribute("is_paused", Attribute::computed_bool())
        .with_attribute("is_down", Attribute::computed_bool())
        .with_attribute("period", Attribute::computed_int64())
        .with_attribute("grace_period", Attribute::computed_int64())
        .with_attribute("last_ping", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
}

pub(crate) struct HealthcheckDataSource;

#[async_trait]
impl DataSource for HealthcheckDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_healthcheck"
    }

    fn schema(&self) -> Schema {
        lookup_schema(healthcheck_item())
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let id = lookup_id(&config)?;
        let hc = client
            .get_healthcheck(&id)
            .await
            .map_err(|e| read_error("Healthcheck", &id, &e))?;
        Ok(StateResponse::new(to_state(&healthcheck_to_state(&hc))?))
    }
}

pub(crate) struct HealthchecksDataSource;

#[async_trait]
impl DataSource for HealthchecksDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_healthchecks"
    }

    fn schema(&self) -> Schema {
        list_schema(
            "healthchecks",
            healthcheck_item(),
            filter_block(
                "Filter criteria for healthchecks",
                &[("status", "Filter by status (up, down)")],
            ),
        )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        filter_diagnostics(config)
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let filter = Filter::from_config(&config)?;
        let healthchecks = client
            .list_healthchecks()
            .await
            .map_err(|e| list_error("Healthchecks", &e))?;
        let items: Vec<HealthcheckState> = healthchecks
            .iter()
            .filter(|hc| filter.matches_healthcheck(hc))
            .map(healthcheck_to_state)
            .collect();
        debug!(total = healthchecks.len(), matched = items.len(), "Listed healthchecks");
        Ok(StateResponse::new(list_state(&config, "healthchecks", &items)?))
    }
}

#[cfg(test)]
mod tests {
    use crate::client::test_support::{ok, path_of};
    use crate::client::MockHttpTransport;
    use crate::provider::test_support::tester;
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_down_filter() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v2/healthchecks")
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(json!({"healthchecks": [
                        {"uuid": "tok_backup1", "name": "backup", "isDown": true, "tz": "UTC", "cron": "0 2 * * *"},
                        {"uuid": "tok_report1", "name": "report", "isDown": false, "periodValue": 1, "periodType": "days"}
                    ]}))
                })
            });
        let tester = tester(mock).await;

        let read = tester
            .read_data_source("hyperping_healthchecks", json!({"filter": {"status": "down"}}))
            .await
            .unwrap();
        let items = read.state["healthchecks"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "tok_backup1");
        assert_eq!(items[0]["timezone"], "UTC");
        assert!(items[0]["period_value"].is_null());
    }
}

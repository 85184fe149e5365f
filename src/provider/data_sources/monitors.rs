//! `hyperping_monitor` and `hyperping_monitors`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::client::HyperpingClient;
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, Block, Diagnostic, NestedBlock, Schema};
use crate::types::StateResponse;

use crate::provider::diagnostics::{list_error, read_error};
use crate::provider::filters::{monitor_filter_block, Filter};
use crate::provider::mapping::{monitor_to_state, MonitorState};
use crate::provider::{to_state, DataSource};

use super::{filter_diagnostics, list_schema, list_state, lookup_id, lookup_schema};

fn monitor_item() -> Block {
    let headers = NestedBlock::list(
        Block::new()
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("value", Attribute::computed_string()),
    )
    .computed();
    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("name", Attribute::computed_string())
        .with_attribute("url", Attribute::computed_string())
        .with_attribute("protocol", Attribute::computed_string())
        .with_attribute("http_method", Attribute::computed_string())
        .with_attribute("check_frequency", Attribute::computed_int64())
        .with_attribute("regions", Attribute::string_list(AttributeFlags::computed()))
        .with_attribute("request_body", Attribute::computed_string())
        .with_attribute("expected_status_code", Attribute::computed_string())
        .with_attribute("follow_redirects", Attribute::computed_bool())
        .with_attribute("paused", Attribute::computed_bool())
        .with_attribute("port", Attribute::computed_int64())
        .with_attribute("alerts_wait", Attribute::computed_int64())
        .with_attribute("escalation_policy", Attribute::computed_string())
        .with_attribute("required_keyword", Attribute::computed_string())
        .with_attribute("status", Attribute::computed_string())
        .with_attribute(
            "ssl_expiration",
            Attribute::computed_int64().with_description("Days until the certificate expires"),
        )
        .with_block("request_headers", headers)
}

pub(crate) struct MonitorDataSource;

#[async_trait]
impl DataSource for MonitorDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_monitor"
    }

    fn schema(&self) -> Schema {
        lookup_schema(monitor_item().with_description("Look up a monitor by id"))
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let id = lookup_id(&config)?;
        let monitor = client
            .get_monitor(&id)
            .await
            .map_err(|e| read_error("Monitor", &id, &e))?;
        Ok(StateResponse::new(to_state(&monitor_to_state(&monitor))?))
    }
}

pub(crate) struct MonitorsDataSource;

#[async_trait]
impl DataSource for MonitorsDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_monitors"
    }

    fn schema(&self) -> Schema {
        list_schema("monitors", monitor_item(), monitor_filter_block())
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        filter_diagnostics(config)
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let filter = Filter::from_config(&config)?;
        let monitors = client
            .list_monitors()
            .await
            .map_err(|e| list_error("Monitors", &e))?;
        let items: Vec<MonitorState> = monitors
            .iter()
            .filter(|m| filter.matches_monitor(m))
            .map(monitor_to_state)
            .collect();
        debug!(total = monitors.len(), matched = items.len(), "Listed monitors");
        Ok(StateResponse::new(list_state(&config, "monitors", &items)?))
    }
}

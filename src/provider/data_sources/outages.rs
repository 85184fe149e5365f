//! `hyperping_outage` and `hyperping_outages`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::client::HyperpingClient;
use crate::error::Result;
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};
use crate::types::StateResponse;

use crate::provider::diagnostics::{list_error, read_error};
use crate::provider::filters::{filter_block, Filter};
use crate::provider::mapping::{outage_to_state, OutageState};
use crate::provider::{to_state, DataSource};

use super::{filter_diagnostics, list_schema, list_state, lookup_id, lookup_schema};

fn outage_item() -> Block {
    let monitor = NestedBlock::single(
        Block::new()
            .with_attribute("uuid", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("url", Attribute::computed_string())
            .with_attribute("protocol", Attribute::computed_string()),
    )
    .computed();
    let acknowledged_by = NestedBlock::single(
        Block::new()
            .with_attribute("uuid", Attribute::computed_string())
            .with_attribute("email", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string()),
    )
    .computed();
    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("monitor_uuid", Attribute::computed_string())
        .with_attribute("start_date", Attribute::computed_string())
        .with_attribute("end_date", Attribute::computed_string())
        .with_attribute("status_code", Attribute::computed_int64())
        .with_attribute("description", Attribute::computed_string())
        .with_attribute("escalation_policy_uuid", Attribute::computed_string())
        .with_attribute("outage_type", Attribute::computed_string())
        .with_attribute("is_resolved", Attribute::computed_bool())
        .with_attribute("duration_ms", Attribute::computed_int64())
        .with_attribute("detected_location", Attribute::computed_string())
        .with_block("monitor", monitor)
        .with_block("acknowledged_by", acknowledged_by)
}

pub(crate) struct OutageDataSource;

#[async_trait]
impl DataSource for OutageDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_outage"
    }

    fn schema(&self) -> Schema {
        lookup_schema(outage_item())
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let id = lookup_id(&config)?;
        let outage = client
            .get_outage(&id)
            .await
            .map_err(|e| read_error("Outage", &id, &e))?;
        Ok(StateResponse::new(to_state(&outage_to_state(&outage))?))
    }
}

pub(crate) struct OutagesDataSource;

#[async_trait]
impl DataSource for OutagesDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_outages"
    }

    fn schema(&self) -> Schema {
        list_schema(
            "outages",
            outage_item(),
            filter_block(
                "Filter criteria for outages; name_regex matches the monitor name",
                &[("monitor_uuid", "Only outages of this monitor")],
            ),
        )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        filter_diagnostics(config)
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let filter = Filter::from_config(&config)?;
        let outages = client
            .list_outages()
            .await
            .map_err(|e| list_error("Outages", &e))?;
        let items: Vec<OutageState> = outages
            .iter()
            .filter(|o| filter.matches_outage(o))
            .map(outage_to_state)
            .collect();
        debug!(total = outages.len(), matched = items.len(), "Listed outages");
        Ok(StateResponse::new(list_state(&config, "outages", &items)?))
    }
}

//! `hyperping_outage`: a manually declared outage on a monitor.
//!
//! Outages cannot be edited, so every input forces replacement. They also
//! cannot be removed once recorded; destroy only drops them from state.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::{CreateOutageRequest, HyperpingClient};
use crate::error::Result;
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};
use crate::types::StateResponse;
use crate::validators::Validator;

use crate::provider::diagnostics::{create_error, read_after_create_error, read_error};
use crate::provider::mapping::{outage_to_state, OutageState};
use crate::provider::{parse_state, require_id, to_state, Resource};

const RESOURCE: &str = "Outage";
const MANUAL_OUTAGE: &str = "manual";

pub(crate) struct OutageResource;

fn monitor_reference_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_description("The monitor the outage belongs to")
            .with_attribute("uuid", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("url", Attribute::computed_string())
            .with_attribute("protocol", Attribute::computed_string()),
    )
    .computed()
}

fn acknowledged_by_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_description("User who acknowledged the outage")
            .with_attribute("uuid", Attribute::computed_string())
            .with_attribute("email", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string()),
    )
    .computed()
}

fn outage_schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "monitor_uuid",
            Attribute::required_string()
                .with_force_new()
                .with_validator(Validator::ResourceId),
        )
        .with_attribute(
            "start_date",
            Attribute::required_string()
                .with_description("ISO 8601 start time")
                .with_force_new()
                .with_validator(Validator::Iso8601),
        )
        .with_attribute(
            "end_date",
            Attribute::optional_string()
                .with_description("ISO 8601 end time; unset for an ongoing outage")
                .with_force_new()
                .with_validator(Validator::Iso8601),
        )
        .with_attribute(
            "status_code",
            Attribute::required_int64()
                .with_force_new()
                .with_validator(Validator::Int64Between(100, 599)),
        )
        .with_attribute("description", Attribute::required_string().with_force_new())
        .with_attribute(
            "escalation_policy_uuid",
            Attribute::optional_string().with_force_new(),
        )
        .with_attribute("outage_type", Attribute::computed_string())
        .with_attribute("is_resolved", Attribute::computed_bool())
        .with_attribute("duration_ms", Attribute::computed_int64())
        .with_attribute("detected_location", Attribute::computed_string())
        .with_block("monitor", monitor_reference_block())
        .with_block("acknowledged_by", acknowledged_by_block())
}

#[async_trait]
impl Resource for OutageResource {
    fn type_name(&self) -> &'static str {
        "hyperping_outage"
    }

    fn display_name(&self) -> &'static str {
        RESOURCE
    }

    fn schema(&self) -> Schema {
        outage_schema()
    }

    async fn create(&self, client: &HyperpingClient, planned: Value) -> Result<StateResponse> {
        let plan: OutageState = parse_state(&planned)?;
        let req = CreateOutageRequest {
            monitor_uuid: plan.monitor_uuid.unwrap_or_default(),
            start_date: plan.start_date.unwrap_or_default(),
            end_date: plan.end_date,
            status_code: plan.status_code.unwrap_or_default(),
            description: plan.description.unwrap_or_default(),
            outage_type: MANUAL_OUTAGE.to_string(),
            escalation_policy_uuid: plan.escalation_policy_uuid,
        };
        let created = client
            .create_outage(&req)
            .await
            .map_err(|e| create_error(RESOURCE, &e))?;
        let outage = client
            .get_outage(&created.uuid)
            .await
            .map_err(|e| read_after_create_error(RESOURCE, "outage", &created.uuid, &e))?;

        info!(outage_id = %outage.uuid, monitor = %req.monitor_uuid, "Created outage");
        Ok(StateResponse::new(to_state(&outage_to_state(&outage))?))
    }

    async fn read(&self, client: &HyperpingClient, current: Value) -> Result<StateResponse> {
        let state: OutageState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.get_outage(&id).await {
            Ok(outage) => Ok(StateResponse::new(to_state(&outage_to_state(&outage))?)),
            Err(e) if e.is_not_found() => {
                warn!(outage_id = %id, "Outage no longer exists, removing from state");
                Ok(StateResponse::removed())
            },
            Err(e) => Err(read_error(RESOURCE, &id, &e).into()),
        }
    }

    async fn update(
        &self,
        _client: &HyperpingClient,
        _prior: Value,
        _planned: Value,
    ) -> Result<StateResponse> {
        Err(Diagnostic::error("Unexpected Update Call")
            .with_detail(
                "Outages cannot be updated in place. Every attribute forces replacement; \
                 this is a provider bug.",
            )
            .into())
    }

    async fn delete(&self, _client: &HyperpingClient, current: Value) -> Result<Vec<Diagnostic>> {
        let state: OutageState = parse_state(&current)?;
        let id = state.id.unwrap_or_default();
        info!(outage_id = %id, "Removing outage from state");
        Ok(vec![Diagnostic::warning("Outage removed from state only").with_detail(format!(
            "The Hyperping API has no DELETE /v1/outages/{} for recorded outages. \
             Outage {} remains in Hyperping history; resolve it there if it is still open.",
            id, id
        ))])
    }
}

//! `hyperping_maintenance`: a scheduled maintenance window.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::{
    CreateMaintenanceRequest, HyperpingClient, LocalizedText, ALLOWED_NOTIFICATION_OPTIONS,
    DEFAULT_NOTIFY_BEFORE_MINUTES, MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH,
};
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, Diagnostic, Schema};
use crate::types::{is_unknown, StateResponse};
use crate::validators::Validator;

use crate::provider::diagnostics::{
    create_error, delete_error, not_found_warning, read_after_update_error, read_error,
    update_api_error,
};
use crate::provider::diff::maintenance_update;
use crate::provider::mapping::{merge_maintenance, MaintenanceState};
use crate::provider::{parse_state, require_id, to_state, Resource};

const RESOURCE: &str = "Maintenance";

/// Windows longer than this get a warning.
const LONG_WINDOW_HOURS: i64 = 7 * 24;

pub(crate) struct MaintenanceResource;

fn maintenance_schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string().with_validator(Validator::LengthBetween(1, MAX_NAME_LENGTH)),
        )
        .with_attribute(
            "title",
            Attribute::optional_string()
                .with_description("Title shown on status pages")
                .with_validator(Validator::LengthBetween(1, MAX_NAME_LENGTH)),
        )
        .with_attribute(
            "text",
            Attribute::optional_string().with_validator(Validator::LengthBetween(1, MAX_MESSAGE_LENGTH)),
        )
        .with_attribute(
            "start_date",
            Attribute::required_string().with_validator(Validator::Iso8601),
        )
        .with_attribute(
            "end_date",
            Attribute::required_string().with_validator(Validator::Iso8601),
        )
        .with_attribute(
            "monitors",
            Attribute::string_list(AttributeFlags::required())
                .with_description("UUIDs of monitors silenced during the window"),
        )
        .with_attribute("status_pages", Attribute::string_list(AttributeFlags::optional()))
        .with_attribute(
            "notification_option",
            Attribute::optional_computed_string()
                .with_default(json!("scheduled"))
                .with_validator(Validator::OneOf(ALLOWED_NOTIFICATION_OPTIONS)),
        )
        .with_attribute(
            "notification_minutes",
            Attribute::optional_computed_int64()
                .with_description("Minutes before the start to notify subscribers")
                .with_default(json!(DEFAULT_NOTIFY_BEFORE_MINUTES))
                .with_validator(Validator::Int64AtLeast(1)),
        )
}

fn parse_date(
    config: &Value,
    name: &str,
    summary: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<DateTime<FixedOffset>> {
    let value = config.get(name)?;
    if is_unknown(value) {
        return None;
    }
    let raw = value.as_str()?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(date) => Some(date),
        Err(e) => {
            diagnostics.push(
                Diagnostic::error(summary)
                    .with_detail(format!("Could not parse {} as ISO 8601 time: {}", name, e))
                    .with_attribute(name),
            );
            None
        },
    }
}

/// Date checks against `now`: an ordered range is required; a past start
/// or a window over a week only warns.
fn check_window(config: &Value, now: DateTime<Utc>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let start = parse_date(config, "start_date", "Invalid Start Date", &mut diagnostics);
    let end = parse_date(config, "end_date", "Invalid End Date", &mut diagnostics);
    let (Some(start), Some(end)) = (start, end) else {
        return diagnostics;
    };

    if end <= start {
        diagnostics.push(
            Diagnostic::error("Invalid Date Range")
                .with_detail("end_date must be after start_date")
                .with_attribute("end_date"),
        );
        return diagnostics;
    }

    if start < now {
        diagnostics.push(
            Diagnostic::warning("Past Start Date")
                .with_detail(format!(
                    "start_date is in the past ({}). This maintenance window may not trigger as \
                     expected. Consider using a future date for scheduled maintenance.",
                    start.to_rfc3339()
                ))
                .with_attribute("start_date"),
        );
    }

    let duration = end - start;
    if duration.num_hours() > LONG_WINDOW_HOURS {
        let hours = duration.num_hours();
        diagnostics.push(
            Diagnostic::warning("Long Maintenance Window")
                .with_detail(format!(
                    "Maintenance window duration is {}h ({:.1} days). Consider breaking long \
                     maintenance into multiple shorter windows for better visibility.",
                    hours,
                    hours as f64 / 24.0
                ))
                .with_attribute("end_date"),
        );
    }
    diagnostics
}

#[async_trait]
impl Resource for MaintenanceResource {
    fn type_name(&self) -> &'static str {
        "hyperping_maintenance"
    }

    fn display_name(&self) -> &'static str {
        RESOURCE
    }

    fn schema(&self) -> Schema {
        maintenance_schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        check_window(config, Utc::now())
    }

    async fn create(&self, client: &HyperpingClient, planned: Value) -> Result<StateResponse> {
        let mut plan: MaintenanceState = parse_state(&planned)?;
        let req = CreateMaintenanceRequest {
            name: plan.name.clone().unwrap_or_default(),
            title: LocalizedText::en(plan.title.clone().unwrap_or_default()),
            text: LocalizedText::en(plan.text.clone().unwrap_or_default()),
            start_date: plan.start_date.clone().unwrap_or_default(),
            end_date: plan.end_date.clone().unwrap_or_default(),
            monitors: plan.monitors.clone().unwrap_or_default(),
            status_pages: plan.status_pages.clone().unwrap_or_default(),
            notification_option: plan.notification_option.clone().unwrap_or_default(),
            notification_minutes: plan.notification_minutes,
        };
        let maintenance = client
            .create_maintenance(&req)
            .await
            .map_err(|e| create_error(RESOURCE, &e))?;

        merge_maintenance(&maintenance, &mut plan);
        info!(maintenance_id = %maintenance.uuid, "Created maintenance window");
        Ok(StateResponse::new(to_state(&plan)?))
    }

    async fn read(&self, client: &HyperpingClient, current: Value) -> Result<StateResponse> {
        let mut state: MaintenanceState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.get_maintenance(&id).await {
            Ok(mw) => {
                merge_maintenance(&mw, &mut state);
                Ok(StateResponse::new(to_state(&state)?))
            },
            Err(e) if e.is_not_found() => {
                warn!(maintenance_id = %id, "Maintenance window no longer exists, removing from state");
                Ok(StateResponse::removed())
            },
            Err(e) => Err(read_error(RESOURCE, &id, &e).into()),
        }
    }

    async fn update(
        &self,
        client: &HyperpingClient,
        prior: Value,
        planned: Value,
    ) -> Result<StateResponse> {
        let prior: MaintenanceState = parse_state(&prior)?;
        let mut plan: MaintenanceState = parse_state(&planned)?;
        let id = require_id(prior.id.as_deref(), RESOURCE)?;

        let req = maintenance_update(&plan, &prior);
        if req.is_empty() {
            debug!(maintenance_id = %id, "No maintenance fields changed");
        } else {
            client
                .update_maintenance(&id, &req)
                .await
                .map_err(|e| update_api_error(RESOURCE, &id, &e))?;
        }

        let mw = client
            .get_maintenance(&id)
            .await
            .map_err(|e| read_after_update_error(RESOURCE, &id, &e))?;
        merge_maintenance(&mw, &mut plan);
        Ok(StateResponse::new(to_state(&plan)?))
    }

    async fn delete(&self, client: &HyperpingClient, current: Value) -> Result<Vec<Diagnostic>> {
        let state: MaintenanceState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.delete_maintenance(&id).await {
            Ok(()) => {
                info!(maintenance_id = %id, "Deleted maintenance window");
                Ok(Vec::new())
            },
            Err(e) if e.is_not_found() => Ok(vec![not_found_warning(
                RESOURCE,
                format!("Maintenance window {} was already deleted", id),
            )]),
            Err(e) => Err(delete_error(RESOURCE, &id, &e).into()),
        }
    }
}

//! `hyperping_healthcheck`: a dead man's switch pinged by cron jobs.
//!
//! A schedule is either `cron` + `timezone` or `period_value` +
//! `period_type`, never both. Pausing is a separate endpoint, so the pause
//! state is applied after the create or update call.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::client::{
    CreateHealthcheckRequest, HyperpingClient, ALLOWED_PERIOD_TYPES, MAX_NAME_LENGTH,
};
use crate::error::Result;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::StateResponse;
use crate::validators::Validator;

use crate::provider::diagnostics::{
    create_error, delete_error, not_found_warning, read_after_create_error,
    read_after_update_error, read_error, update_api_error,
};
use crate::provider::diff::healthcheck_update;
use crate::provider::mapping::{healthcheck_to_state, HealthcheckState};
use crate::provider::{parse_state, require_id, to_state, Resource};

const RESOURCE: &str = "Healthcheck";

pub(crate) struct HealthcheckResource;

fn healthcheck_schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string().with_description("Healthcheck UUID"))
        .with_attribute(
            "name",
            Attribute::required_string().with_validator(Validator::LengthBetween(1, MAX_NAME_LENGTH)),
        )
        .with_attribute(
            "ping_url",
            Attribute::computed_string().with_description("URL the monitored job must ping"),
        )
        .with_attribute(
            "cron",
            Attribute::optional_string()
                .with_description("Cron expression of the expected schedule. Requires timezone.")
                .with_validator(Validator::Cron),
        )
        .with_attribute(
            "timezone",
            Attribute::optional_string()
                .with_description("IANA timezone of the cron schedule")
                .with_validator(Validator::Timezone),
        )
        .with_attribute(
            "period_value",
            Attribute::optional_int64()
                .with_description("Expected interval between pings. Requires period_type.")
                .with_validator(Validator::Int64AtLeast(1)),
        )
        .with_attribute(
            "period_type",
            Attribute::optional_string().with_validator(Validator::OneOf(ALLOWED_PERIOD_TYPES)),
        )
        .with_attribute(
            "grace_period_value",
            Attribute::required_int64()
                .with_description("How late a ping may be before the check goes down")
                .with_validator(Validator::Int64AtLeast(0)),
        )
        .with_attribute(
            "grace_period_type",
            Attribute::required_string().with_validator(Validator::OneOf(ALLOWED_PERIOD_TYPES)),
        )
        .with_attribute(
            "escalation_policy",
            Attribute::optional_string().with_description("Escalation policy UUID"),
        )
        .with_attribute(
            "is_paused",
            Attribute::optional_computed_bool().with_default(json!(false)),
        )
        .with_attribute("is_down", Attribute::computed_bool())
        .with_attribute(
            "period",
            Attribute::computed_int64().with_description("Period in seconds"),
        )
        .with_attribute(
            "grace_period",
            Attribute::computed_int64().with_description("Grace period in seconds"),
        )
        .with_attribute("last_ping", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
}

/// The schedule error for a config, if any. `has` reports whether an
/// attribute is set.
fn schedule_error(has: impl Fn(&str) -> bool) -> Option<&'static str> {
    let (cron, tz) = (has("cron"), has("timezone"));
    let (period_value, period_type) = (has("period_value"), has("period_type"));

    if (cron || tz) && (period_value || period_type) {
        Some("specify either (cron + tz) or (period_value + period_type), not both")
    } else if cron && !tz {
        Some("tz is required when cron is set")
    } else if tz && !cron {
        Some("cron is required when tz is set")
    } else if period_value && !period_type {
        Some("period_type is required when period_value is set")
    } else if period_type && !period_value {
        Some("period_value is required when period_type is set")
    } else if !cron && !period_value {
        Some("either cron or period_value must be specified")
    } else {
        None
    }
}

fn invalid_schedule(message: &str) -> Diagnostic {
    Diagnostic::error("Invalid Configuration").with_detail(message)
}

fn state_schedule_error(state: &HealthcheckState) -> Option<&'static str> {
    schedule_error(|name| match name {
        "cron" => state.cron.as_deref().is_some_and(|s| !s.is_empty()),
        "timezone" => state.timezone.as_deref().is_some_and(|s| !s.is_empty()),
        "period_value" => state.period_value.is_some(),
        "period_type" => state.period_type.is_some(),
        _ => false,
    })
}

#[async_trait]
impl Resource for HealthcheckResource {
    fn type_name(&self) -> &'static str {
        "hyperping_healthcheck"
    }

    fn display_name(&self) -> &'static str {
        RESOURCE
    }

    fn schema(&self) -> Schema {
        healthcheck_schema()
    }

    /// Unknown values count as set; the check runs again on apply.
    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let has = |name: &str| match config.get(name) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };
        schedule_error(has)
            .map(|msg| vec![invalid_schedule(msg)])
            .unwrap_or_default()
    }

    async fn create(&self, client: &HyperpingClient, planned: Value) -> Result<StateResponse> {
        let plan: HealthcheckState = parse_state(&planned)?;
        if let Some(msg) = state_schedule_error(&plan) {
            return Err(invalid_schedule(msg).into());
        }

        let req = CreateHealthcheckRequest {
            name: plan.name.clone().unwrap_or_default(),
            cron: plan.cron.clone(),
            tz: plan.timezone.clone(),
            period_value: plan.period_value,
            period_type: plan.period_type.clone(),
            grace_period_value: plan.grace_period_value.unwrap_or_default(),
            grace_period_type: plan.grace_period_type.clone().unwrap_or_default(),
            escalation_policy: plan.escalation_policy.clone(),
        };
        let created = client
            .create_healthcheck(&req)
            .await
            .map_err(|e| create_error(RESOURCE, &e))?;
        let mut healthcheck = client
            .get_healthcheck(&created.uuid)
            .await
            .map_err(|e| read_after_create_error(RESOURCE, "healthcheck", &created.uuid, &e))?;

        let mut warnings = Vec::new();
        if plan.is_paused == Some(true) {
            match client.pause_healthcheck(&healthcheck.uuid).await {
                Ok(_) => healthcheck.is_paused = true,
                Err(e) => {
                    warn!(healthcheck_id = %healthcheck.uuid, error = %e, "Pause after create failed");
                    warnings.push(Diagnostic::warning("Healthcheck created but not paused").with_detail(
                        format!(
                            "Healthcheck {} was created successfully but the pause request failed: {}. \
                             The resource is active. Set is_paused = true again on next apply to retry.",
                            healthcheck.uuid, e
                        ),
                    ));
                },
            }
        }

        info!(healthcheck_id = %healthcheck.uuid, "Created healthcheck");
        Ok(StateResponse::new(to_state(&healthcheck_to_state(&healthcheck))?)
            .with_diagnostics(warnings))
    }

    async fn read(&self, client: &HyperpingClient, current: Value) -> Result<StateResponse> {
        let state: HealthcheckState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.get_healthcheck(&id).await {
            Ok(hc) => Ok(StateResponse::new(to_state(&healthcheck_to_state(&hc))?)),
            Err(e) if e.is_not_found() => {
                warn!(healthcheck_id = %id, "Healthcheck no longer exists, removing from state");
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
        let prior: HealthcheckState = parse_state(&prior)?;
        let plan: HealthcheckState = parse_state(&planned)?;
        let id = require_id(prior.id.as_deref(), RESOURCE)?;
        if let Some(msg) = state_schedule_error(&plan) {
            return Err(invalid_schedule(msg).into());
        }

        if let Some(req) = healthcheck_update(&plan, &prior) {
            client
                .update_healthcheck(&id, &req)
                .await
                .map_err(|e| update_api_error(RESOURCE, &id, &e))?;
        }

        let mut warnings = Vec::new();
        let want_paused = plan.is_paused.unwrap_or(false);
        if plan.is_paused.is_some() && prior.is_paused != plan.is_paused {
            let (result, summary, verb) = if want_paused {
                (client.pause_healthcheck(&id).await, "Failed to pause healthcheck", "pause")
            } else {
                (client.resume_healthcheck(&id).await, "Failed to resume healthcheck", "resume")
            };
            if let Err(e) = result {
                warnings.push(Diagnostic::warning(summary).with_detail(format!(
                    "Healthcheck {} updates applied but {} failed: {}. Retry on next apply.",
                    id, verb, e
                )));
            }
        }

        let healthcheck = client
            .get_healthcheck(&id)
            .await
            .map_err(|e| read_after_update_error(RESOURCE, &id, &e))?;
        Ok(StateResponse::new(to_state(&healthcheck_to_state(&healthcheck))?)
            .with_diagnostics(warnings))
    }

    async fn delete(&self, client: &HyperpingClient, current: Value) -> Result<Vec<Diagnostic>> {
        let state: HealthcheckState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.delete_healthcheck(&id).await {
            Ok(()) => {},
            Err(e) if e.is_not_found() => {
                return Ok(vec![not_found_warning(
                    RESOURCE,
                    format!("Healthcheck {} was already deleted", id),
                )]);
            },
            Err(e) => return Err(delete_error(RESOURCE, &id, &e).into()),
        }
        info!(healthcheck_id = %id, "Deleted healthcheck");
        let ping_url = state.ping_url.unwrap_or_default();
        Ok(vec![Diagnostic::warning("Healthcheck deleted, ping URL is now inactive")
            .with_detail(format!(
                "Any cron job or script still pinging {} will now fail. \
                 Remove those pings from your jobs.",
                ping_url
            ))])
    }
}

//! Cron healthchecks: `/v2/healthchecks`.

use serde::{Deserialize, Serialize};

use super::error::ClientError;
use super::models::{nullable, validate_string_length, EscalationPolicyReference, MAX_NAME_LENGTH};
use super::{decode_list, validate_resource_id, ActionResponse, HyperpingClient};

const HEALTHCHECKS_PATH: &str = "/v2/healthchecks";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Healthcheck {
    pub uuid: String,
    pub name: String,
    /// Generated URL the monitored job pings.
    #[serde(deserialize_with = "nullable")]
    pub ping_url: String,
    #[serde(deserialize_with = "nullable")]
    pub cron: String,
    #[serde(deserialize_with = "nullable")]
    pub tz: String,
    pub period_value: Option<i64>,
    #[serde(deserialize_with = "nullable")]
    pub period_type: String,
    /// Derived period in seconds.
    #[serde(deserialize_with = "nullable")]
    pub period: i64,
    #[serde(deserialize_with = "nullable")]
    pub grace_period: i64,
    #[serde(deserialize_with = "nullable")]
    pub grace_period_value: i64,
    #[serde(deserialize_with = "nullable")]
    pub grace_period_type: String,
    pub is_down: bool,
    pub is_paused: bool,
    #[serde(deserialize_with = "nullable")]
    pub last_ping: String,
    #[serde(deserialize_with = "nullable")]
    pub due_date: String,
    #[serde(deserialize_with = "nullable")]
    pub created_at: String,
    #[serde(deserialize_with = "nullable")]
    pub last_log_start_date: String,
    #[serde(deserialize_with = "nullable")]
    pub last_log_end_date: String,
    pub escalation_policy: Option<EscalationPolicyReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHealthcheckRequest {
    pub name: String,
    /// Either `cron` + `tz` or `period_value` + `period_type` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_type: Option<String>,
    pub grace_period_value: i64,
    pub grace_period_type: String,
    /// Escalation policy uuid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<String>,
}

impl CreateHealthcheckRequest {
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_string_length("name", &self.name, MAX_NAME_LENGTH)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHealthcheckRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_period_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<String>,
}

#[derive(Deserialize)]
struct HealthcheckEnvelope {
    healthcheck: Healthcheck,
}

impl HyperpingClient {
    pub async fn list_healthchecks(&self) -> Result<Vec<Healthcheck>, ClientError> {
        let body = self
            .get_raw(HEALTHCHECKS_PATH)
            .await
            .map_err(|e| e.context("failed to list healthchecks"))?;
        decode_list(&body, &["healthchecks", "data"])
            .map_err(|e| e.context("failed to parse healthchecks response"))
    }

    pub async fn get_healthcheck(&self, id: &str) -> Result<Healthcheck, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("GetHealthcheck"))?;
        self.get::<HealthcheckEnvelope>(&format!("{}/{}", HEALTHCHECKS_PATH, id))
            .await
            .map(|env| env.healthcheck)
            .map_err(|e| e.context("failed to get healthcheck"))
    }

    pub async fn create_healthcheck(
        &self,
        req: &CreateHealthcheckRequest,
    ) -> Result<Healthcheck, ClientError> {
        req.validate().map_err(|e| e.context("CreateHealthcheck"))?;
        self.post::<_, HealthcheckEnvelope>(HEALTHCHECKS_PATH, req)
            .await
            .map(|env| env.healthcheck)
            .map_err(|e| e.context("failed to create healthcheck"))
    }

    pub async fn update_healthcheck(
        &self,
        id: &str,
        req: &UpdateHealthcheckRequest,
    ) -> Result<Healthcheck, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("UpdateHealthcheck"))?;
        self.put(&format!("{}/{}", HEALTHCHECKS_PATH, id), req)
            .await
            .map_err(|e| e.context("failed to update healthcheck"))
    }

    pub async fn delete_healthcheck(&self, id: &str) -> Result<(), ClientError> {
        validate_resource_id(id).map_err(|e| e.context("DeleteHealthcheck"))?;
        self.delete(&format!("{}/{}", HEALTHCHECKS_PATH, id))
            .await
            .map_err(|e| e.context("failed to delete healthcheck"))
    }

    pub async fn pause_healthcheck(&self, id: &str) -> Result<ActionResponse, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("PauseHealthcheck"))?;
        self.post_action(&format!("{}/{}/pause", HEALTHCHECKS_PATH, id))
            .await
            .map_err(|e| e.context("failed to pause healthcheck"))
    }

    pub async fn resume_healthcheck(&self, id: &str) -> Result<ActionResponse, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("ResumeHealthcheck"))?;
        self.post_action(&format!("{}/{}/resume", HEALTHCHECKS_PATH, id))
            .await
            .map_err(|e| e.context("failed to resume healthcheck"))
    }
}

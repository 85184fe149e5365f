//! Outages: `/v1/outages`.
//!
//! Monitor outages are raised by the platform; manual outages are created
//! through the API and must be resolved explicitly.

use serde::{Deserialize, Serialize};

use super::error::ClientError;
use super::models::{
    nullable, validate_string_length, EscalationPolicyReference, MAX_MESSAGE_LENGTH,
};
use super::{decode_list, validate_resource_id, ActionResponse, HyperpingClient};

const OUTAGES_PATH: &str = "/v1/outages";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Outage {
    pub uuid: String,
    pub start_date: String,
    /// `None` while the outage is ongoing.
    pub end_date: Option<String>,
    pub duration_ms: i64,
    pub status_code: i64,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub outage_type: String,
    pub is_resolved: bool,
    #[serde(deserialize_with = "nullable")]
    pub detected_location: String,
    /// Comma separated.
    #[serde(deserialize_with = "nullable")]
    pub confirmed_locations: String,
    pub acknowledged_at: Option<String>,
    pub acknowledged_by: Option<AcknowledgedByUser>,
    #[serde(deserialize_with = "nullable")]
    pub monitor: MonitorReference,
    pub escalation_policy: Option<EscalationPolicyReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcknowledgedByUser {
    pub uuid: String,
    pub email: String,
    pub name: String,
}

/// The monitor summary embedded in an outage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorReference {
    pub uuid: String,
    pub name: String,
    pub url: String,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutageRequest {
    pub monitor_uuid: String,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub status_code: i64,
    pub description: String,
    pub outage_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_policy_uuid: Option<String>,
}

impl CreateOutageRequest {
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_string_length("description", &self.description, MAX_MESSAGE_LENGTH)
    }
}

impl HyperpingClient {
    pub async fn list_outages(&self) -> Result<Vec<Outage>, ClientError> {
        let body = self
            .get_raw(OUTAGES_PATH)
            .await
            .map_err(|e| e.context("failed to list outages"))?;
        decode_list(&body, &["outages", "data"])
            .map_err(|e| e.context("failed to parse outages response"))
    }

    pub async fn get_outage(&self, id: &str) -> Result<Outage, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("GetOutage"))?;
        self.get(&format!("{}/{}", OUTAGES_PATH, id))
            .await
            .map_err(|e| e.context("failed to get outage"))
    }

    pub async fn create_outage(&self, req: &CreateOutageRequest) -> Result<Outage, ClientError> {
        req.validate().map_err(|e| e.context("CreateOutage"))?;
        self.post(OUTAGES_PATH, req)
            .await
            .map_err(|e| e.context("failed to create outage"))
    }

    pub async fn delete_outage(&self, id: &str) -> Result<(), ClientError> {
        validate_resource_id(id).map_err(|e| e.context("DeleteOutage"))?;
        self.delete(&format!("{}/{}", OUTAGES_PATH, id))
            .await
            .map_err(|e| e.context("failed to delete outage"))
    }

    pub async fn acknowledge_outage(&self, id: &str) -> Result<ActionResponse, ClientError> {
        self.outage_action(id, "acknowledge").await
    }

    pub async fn unacknowledge_outage(&self, id: &str) -> Result<ActionResponse, ClientError> {
        self.outage_action(id, "unacknowledge").await
    }

    pub async fn resolve_outage(&self, id: &str) -> Result<ActionResponse, ClientError> {
        self.outage_action(id, "resolve").await
    }

    /// Trigger the next escalation step.
    pub async fn escalate_outage(&self, id: &str) -> Result<ActionResponse, ClientError> {
        self.outage_action(id, "escalate").await
    }

    async fn outage_action(&self, id: &str, action: &str) -> Result<ActionResponse, ClientError> {
        validate_resource_id(id).map_err(|e| e.context(format!("{} outage", action)))?;
        self.post_action(&format!("{}/{}/{}", OUTAGES_PATH, id, action))
            .await
            .map_err(|e| e.context(format!("failed to {} outage", action)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::MockHttpTransport;
    use super::*;
    use reqwest::Method;
    use serde_json::json;

    fn outage_json() -> serde_json::Value {
        json!({
            "uuid": "out_123",
            "startDate": "2026-01-10T10:00:00Z",
            "endDate": null,
            "durationMs": 0,
            "statusCode": 503,
            "description": "Database unreachable",
            "outageType": "manual",
            "isResolved": false,
            "detectedLocation": "paris",
            "confirmedLocations": "paris,london",
            "acknowledgedAt": null,
            "acknowledgedBy": null,
            "monitor": {"uuid": "mon_1", "name": "API", "url": "https://example.com", "protocol": "http"},
            "escalationPolicy": null
        })
    }

    #[test]
    fn test_outage_decodes_nulls() {
        let outage: Outage = serde_json::from_value(outage_json()).unwrap();
        assert_eq!(outage.end_date, None);
        assert_eq!(outage.acknowledged_by, None);
        assert_eq!(outage.monitor.uuid, "mon_1");
    }

    #[tokio::test]
    async fn test_create_outage_payload() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::POST
                    && path_of(r) == "/v1/outages"
                    && r.json_body()
                        == Some(json!({
                            "monitorUuid": "mon_1",
                            "startDate": "2026-01-10T10:00:00Z",
                            "statusCode": 503,
                            "description": "Database unreachable",
                            "outageType": "manual"
                        }))
            })
            .returning(|_| Box::pin(async { ok(outage_json()) }));

        let req = CreateOutageRequest {
            monitor_uuid: "mon_1".into(),
            start_date: "2026-01-10T10:00:00Z".into(),
            status_code: 503,
            description: "Database unreachable".into(),
            outage_type: "manual".into(),
            ..Default::default()
        };
        let outage = client(mock).create_outage(&req).await.unwrap();
        assert_eq!(outage.uuid, "out_123");
    }

    #[tokio::test]
    async fn test_outage_actions_hit_their_paths() {
        let mut mock = MockHttpTransport::new();
        for action in ["acknowledge", "unacknowledge", "resolve", "escalate"] {
            let expected = format!("/v1/outages/out_123/{}", action);
            mock.expect_send()
                .withf(move |r| r.method == Method::POST && path_of(r) == expected)
                .times(1)
                .returning(|_| Box::pin(async { ok(json!({"message": "ok", "uuid": "out_123"})) }));
        }

        let c = client(mock);
        c.acknowledge_outage("out_123").await.unwrap();
        c.unacknowledge_outage("out_123").await.unwrap();
        c.resolve_outage("out_123").await.unwrap();
        c.escalate_outage("out_123").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_outage_rejects_bad_id() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::DELETE && path_of(r) == "/v1/outages/out_123")
            .times(1)
            .returning(|_| Box::pin(async { ok(json!({})) }));

        let c = client(mock);
        c.delete_outage("out_123").await.unwrap();
        let err = c.delete_outage("../monitors").await.unwrap_err();
        assert!(err.to_string().starts_with("DeleteOutage"));
    }
}

//! Uptime monitors: `/v1/monitors`.

use serde::{Deserialize, Serialize};

use super::error::ClientError;
use super::models::{
    nullable, validate_string_length, FlexibleString, RequestHeader, MAX_NAME_LENGTH,
    MAX_URL_LENGTH,
};
use super::{decode_list, validate_resource_id, HyperpingClient};

const MONITORS_PATH: &str = "/v1/monitors";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Monitor {
    pub uuid: String,
    pub name: String,
    pub url: String,
    pub protocol: String,
    #[serde(rename = "projectUuid", skip_serializing_if = "String::is_empty")]
    pub project_uuid: String,
    #[serde(deserialize_with = "nullable")]
    pub http_method: String,
    #[serde(deserialize_with = "nullable")]
    pub regions: Vec<String>,
    pub check_frequency: i64,
    #[serde(deserialize_with = "nullable")]
    pub request_headers: Vec<RequestHeader>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub request_body: String,
    pub follow_redirects: bool,
    pub expected_status_code: FlexibleString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_keyword: Option<String>,
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(deserialize_with = "nullable")]
    pub alerts_wait: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<String>,
    /// `up` or `down`. Read-only.
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// Days until the TLS certificate expires. Read-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_expiration: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateMonitorRequest {
    pub name: String,
    pub url: String,
    pub protocol: String,
    #[serde(rename = "projectUuid", skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_frequency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<Vec<RequestHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_keyword: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts_wait: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<String>,
}

impl CreateMonitorRequest {
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_string_length("name", &self.name, MAX_NAME_LENGTH)?;
        validate_string_length("url", &self.url, MAX_URL_LENGTH)
    }
}

/// Partial update. `None` fields are left untouched by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateMonitorRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(rename = "projectUuid", skip_serializing_if = "Option::is_none")]
    pub project_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_frequency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<Vec<RequestHeader>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_status_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts_wait: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_policy: Option<String>,
}

impl UpdateMonitorRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl HyperpingClient {
    pub async fn list_monitors(&self) -> Result<Vec<Monitor>, ClientError> {
        let body = self
            .get_raw(MONITORS_PATH)
            .await
            .map_err(|e| e.context("failed to list monitors"))?;
        decode_list(&body, &["monitors", "data"])
            .map_err(|e| e.context("failed to parse monitors response"))
    }

    pub async fn get_monitor(&self, id: &str) -> Result<Monitor, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("GetMonitor"))?;
        self.get(&format!("{}/{}", MONITORS_PATH, id))
            .await
            .map_err(|e| e.context(format!("failed to get monitor {}", id)))
    }

    pub async fn create_monitor(&self, req: &CreateMonitorRequest) -> Result<Monitor, ClientError> {
        req.validate().map_err(|e| e.context("CreateMonitor"))?;
        self.post(MONITORS_PATH, req)
            .await
            .map_err(|e| e.context("failed to create monitor"))
    }

    pub async fn update_monitor(
        &self,
        id: &str,
        req: &UpdateMonitorRequest,
    ) -> Result<Monitor, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("UpdateMonitor"))?;
        self.put(&format!("{}/{}", MONITORS_PATH, id), req)
            .await
            .map_err(|e| e.context(format!("failed to update monitor {}", id)))
    }

    pub async fn delete_monitor(&self, id: &str) -> Result<(), ClientError> {
        validate_resource_id(id).map_err(|e| e.context("DeleteMonitor"))?;
        self.delete(&format!("{}/{}", MONITORS_PATH, id))
            .await
            .map_err(|e| e.context(format!("failed to delete monitor {}", id)))
    }

    pub async fn pause_monitor(&self, id: &str) -> Result<Monitor, ClientError> {
        let req = UpdateMonitorRequest {
            paused: Some(true),
            ..Default::default()
        };
        self.update_monitor(id, &req).await
    }

    pub async fn resume_monitor(&self, id: &str) -> Result<Monitor, ClientError> {
        let req = UpdateMonitorRequest {
            paused: Some(false),
            ..Default::default()
        };
        self.update_monitor(id, &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::MockHttpTransport;
    use super::*;
    use reqwest::Method;
    use serde_json::json;

    fn monitor_json() -> serde_json::Value {
        json!({
            "uuid": "mon_abc123",
            "name": "API",
            "url": "https://example.com/health",
            "protocol": "http",
            "http_method": "GET",
            "regions": ["paris", "london"],
            "check_frequency": 60,
            "request_headers": null,
            "follow_redirects": true,
            "expected_status_code": 200,
            "paused": false,
            "status": "up",
            "ssl_expiration": 42
        })
    }

    #[test]
    fn test_monitor_decodes_loose_shapes() {
        let monitor: Monitor = serde_json::from_value(monitor_json()).unwrap();
        assert_eq!(monitor.expected_status_code.as_str(), "200");
        assert!(monitor.request_headers.is_empty());
        assert_eq!(monitor.port, None);
        assert_eq!(monitor.ssl_expiration, Some(42));
    }

    #[test]
    fn test_create_request_omits_unset_fields() {
        let req = CreateMonitorRequest {
            name: "API".into(),
            url: "https://example.com".into(),
            protocol: "http".into(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"name": "API", "url": "https://example.com", "protocol": "http"})
        );
    }

    #[tokio::test]
    async fn test_list_monitors_wrapped() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v1/monitors")
            .returning(|_| Box::pin(async { ok(json!({"monitors": [monitor_json()]})) }));

        let monitors = client(mock).list_monitors().await.unwrap();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].uuid, "mon_abc123");
    }

    #[tokio::test]
    async fn test_get_monitor_not_found_is_wrapped() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| path_of(r) == "/v1/monitors/mon_gone")
            .returning(|_| Box::pin(async { status(404, json!({"error": "Monitor not found"})) }));

        let err = client(mock).get_monitor("mon_gone").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "failed to get monitor mon_gone: API error (status 404): Monitor not found"
        );
    }

    #[tokio::test]
    async fn test_invalid_id_never_hits_network() {
        let mock = MockHttpTransport::new();
        let err = client(mock).delete_monitor("../admin").await.unwrap_err();
        assert!(err.to_string().starts_with("DeleteMonitor: invalid resource ID"));
    }

    #[tokio::test]
    async fn test_create_monitor_validates_length() {
        let mock = MockHttpTransport::new();
        let req = CreateMonitorRequest {
            name: "n".repeat(256),
            url: "https://example.com".into(),
            protocol: "http".into(),
            ..Default::default()
        };
        let err = client(mock).create_monitor(&req).await.unwrap_err();
        assert!(err.to_string().starts_with("CreateMonitor: field \"name\""));
    }

    #[tokio::test]
    async fn test_pause_monitor_sends_paused_flag() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::PUT
                    && path_of(r) == "/v1/monitors/mon_abc123"
                    && r.json_body() == Some(json!({"paused": true}))
            })
            .times(1)
            .returning(|_| {
                let mut body = monitor_json();
                body["paused"] = json!(true);
                Box::pin(async move { ok(body) })
            });

        let monitor = client(mock).pause_monitor("mon_abc123").await.unwrap();
        assert!(monitor.paused);
    }

    #[tokio::test]
    async fn test_resume_monitor_clears_paused_flag() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::PUT && r.json_body() == Some(json!({"paused": false})))
            .times(1)
            .returning(|_| Box::pin(async { ok(monitor_json()) }));

        let monitor = client(mock).resume_monitor("mon_abc123").await.unwrap();
        assert!(!monitor.paused);
    }
}

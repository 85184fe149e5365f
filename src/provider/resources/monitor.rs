//! `hyperping_monitor`: an uptime check.
//!
//! The create endpoint ignores `paused`, so a monitor planned as paused is
//! paused with a second call right after it is created.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::{
    CreateMonitorRequest, HyperpingClient, ALLOWED_FREQUENCIES, ALLOWED_METHODS,
    ALLOWED_PROTOCOLS, ALLOWED_REGIONS, DEFAULT_MONITOR_FREQUENCY, MAX_NAME_LENGTH,
};
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, Block, Diagnostic, NestedBlock, Schema};
use crate::types::StateResponse;
use crate::validators::Validator;

use crate::provider::diagnostics::{
    create_error, delete_error, not_found_warning, read_after_create_error,
    read_after_update_error, read_error, update_api_error, update_error,
};
use crate::provider::diff::{headers_for_create, monitor_update};
use crate::provider::mapping::{monitor_to_state, MonitorState};
use crate::provider::{fail_on_errors, parse_state, require_id, to_state, Resource};

const RESOURCE: &str = "Monitor";

pub(crate) struct MonitorResource;

fn headers_block() -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_description("Custom HTTP headers to send with the request")
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description(
                        "Header name. Reserved headers (Authorization, Host, Cookie, ...) are not allowed.",
                    )
                    .with_validator(Validator::NoControlChars(
                        "Header names must not contain CR, LF or NUL characters",
                    ))
                    .with_validator(Validator::ReservedHeaderName),
            )
            .with_attribute(
                "value",
                Attribute::required_string()
                    .with_description("Header value")
                    .with_validator(Validator::NoControlChars(
                        "Header values must not contain CR, LF or NUL characters",
                    )),
            ),
    )
}

fn monitor_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Monitor UUID"),
        )
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_description("Name of the monitor")
                .with_validator(Validator::LengthBetween(1, MAX_NAME_LENGTH)),
        )
        .with_attribute(
            "url",
            Attribute::required_string().with_description("URL or host to check"),
        )
        .with_attribute(
            "protocol",
            Attribute::optional_computed_string()
                .with_description("One of http, port, icmp. Defaults to http.")
                .with_default(json!("http"))
                .with_validator(Validator::OneOf(ALLOWED_PROTOCOLS)),
        )
        .with_attribute(
            "http_method",
            Attribute::optional_computed_string()
                .with_description("HTTP method. Defaults to GET.")
                .with_default(json!("GET"))
                .with_validator(Validator::OneOf(ALLOWED_METHODS)),
        )
        .with_attribute(
            "check_frequency",
            Attribute::optional_computed_int64()
                .with_description("Seconds between checks. Defaults to 60.")
                .with_default(json!(DEFAULT_MONITOR_FREQUENCY))
                .with_validator(Validator::Int64OneOf(ALLOWED_FREQUENCIES)),
        )
        .with_attribute(
            "regions",
            Attribute::string_list(AttributeFlags::optional_computed())
                .with_description("Regions to check from")
                .with_validator(Validator::EachOneOf(ALLOWED_REGIONS)),
        )
        .with_block("request_headers", headers_block())
        .with_attribute(
            "request_body",
            Attribute::optional_string().with_description("Body for POST, PUT and PATCH checks"),
        )
        .with_attribute(
            "expected_status_code",
            Attribute::optional_computed_string()
                .with_description("Expected status code pattern such as 2xx or 200. Defaults to 2xx.")
                .with_default(json!("2xx")),
        )
        .with_attribute(
            "follow_redirects",
            Attribute::optional_computed_bool()
                .with_description("Follow HTTP redirects. Defaults to true.")
                .with_default(json!(true)),
        )
        .with_attribute(
            "paused",
            Attribute::optional_computed_bool()
                .with_description("Whether the monitor is paused. Defaults to false.")
                .with_default(json!(false)),
        )
        .with_attribute(
            "port",
            Attribute::optional_int64()
                .with_description("Port to check. Required when protocol is port.")
                .with_validator(Validator::Port),
        )
        .with_attribute(
            "alerts_wait",
            Attribute::optional_int64()
                .with_description("Seconds to wait before alerting on an outage"),
        )
        .with_attribute(
            "escalation_policy",
            Attribute::optional_string().with_description("Escalation policy UUID"),
        )
        .with_attribute(
            "required_keyword",
            Attribute::optional_string()
                .with_description("Keyword that must appear in the response body"),
        )
        .with_attribute(
            "status",
            Attribute::computed_string().with_description("Current status: up or down"),
        )
        .with_attribute(
            "ssl_expiration",
            Attribute::computed_int64().with_description("Days until the TLS certificate expires"),
        )
}

#[async_trait]
impl Resource for MonitorResource {
    fn type_name(&self) -> &'static str {
        "hyperping_monitor"
    }

    fn display_name(&self) -> &'static str {
        RESOURCE
    }

    fn schema(&self) -> Schema {
        monitor_schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let is_port = config.get("protocol").and_then(Value::as_str) == Some("port");
        let port = config.get("port").unwrap_or(&Value::Null);
        if is_port && port.is_null() {
            return vec![Diagnostic::error("Missing Port")
                .with_detail("port is required when protocol is 'port'")
                .with_attribute("port")];
        }
        Vec::new()
    }

    async fn create(&self, client: &HyperpingClient, planned: Value) -> Result<StateResponse> {
        let plan: MonitorState = parse_state(&planned)?;
        let mut diagnostics = Vec::new();
        let request_headers = headers_for_create(&plan, &mut diagnostics);
        let warnings = fail_on_errors(diagnostics)?;

        let req = CreateMonitorRequest {
            name: plan.name.clone().unwrap_or_default(),
            url: plan.url.clone().unwrap_or_default(),
            protocol: plan.protocol.clone().unwrap_or_else(|| "http".to_string()),
            http_method: plan.http_method.clone(),
            check_frequency: plan.check_frequency,
            regions: plan.regions.clone(),
            request_headers,
            request_body: plan.request_body.clone(),
            follow_redirects: plan.follow_redirects,
            expected_status_code: plan.expected_status_code.clone(),
            required_keyword: plan.required_keyword.clone(),
            port: plan.port,
            alerts_wait: plan.alerts_wait,
            escalation_policy: plan.escalation_policy.clone(),
            ..Default::default()
        };
        let created = client
            .create_monitor(&req)
            .await
            .map_err(|e| create_error(RESOURCE, &e))?;
        let mut monitor = client
            .get_monitor(&created.uuid)
            .await
            .map_err(|e| read_after_create_error(RESOURCE, "monitor", &created.uuid, &e))?;

        if plan.paused == Some(true) && !monitor.paused {
            client.pause_monitor(&monitor.uuid).await.map_err(|e| {
                update_error(
                    RESOURCE,
                    &monitor.uuid,
                    format!("monitor created but failed to pause: {}", e),
                )
            })?;
            monitor.paused = true;
        }

        info!(monitor_id = %monitor.uuid, "Created monitor");
        Ok(StateResponse::new(to_state(&monitor_to_state(&monitor))?).with_diagnostics(warnings))
    }

    async fn read(&self, client: &HyperpingClient, current: Value) -> Result<StateResponse> {
        let state: MonitorState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.get_monitor(&id).await {
            Ok(monitor) => Ok(StateResponse::new(to_state(&monitor_to_state(&monitor))?)),
            Err(e) if e.is_not_found() => {
                warn!(monitor_id = %id, "Monitor no longer exists, removing from state");
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
        let prior: MonitorState = parse_state(&prior)?;
        let plan: MonitorState = parse_state(&planned)?;
        let id = require_id(prior.id.as_deref(), RESOURCE)?;

        let mut diagnostics = Vec::new();
        let req = monitor_update(&plan, &prior, &mut diagnostics);
        let warnings = fail_on_errors(diagnostics)?;

        if req.is_empty() {
            debug!(monitor_id = %id, "No monitor fields changed");
        } else {
            client
                .update_monitor(&id, &req)
                .await
                .map_err(|e| update_api_error(RESOURCE, &id, &e))?;
        }
        let monitor = client
            .get_monitor(&id)
            .await
            .map_err(|e| read_after_update_error(RESOURCE, &id, &e))?;
        Ok(StateResponse::new(to_state(&monitor_to_state(&monitor))?).with_diagnostics(warnings))
    }

    async fn delete(&self, client: &HyperpingClient, current: Value) -> Result<Vec<Diagnostic>> {
        let state: MonitorState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.delete_monitor(&id).await {
            Ok(()) => {
                info!(monitor_id = %id, "Deleted monitor");
                Ok(Vec::new())
            },
            Err(e) if e.is_not_found() => Ok(vec![not_found_warning(
                RESOURCE,
                format!("Monitor {} was already deleted", id),
            )]),
            Err(e) => Err(delete_error(RESOURCE, &id, &e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{ok, path_of, status};
    use crate::client::MockHttpTransport;
    use crate::provider::test_support::tester;
    use crate::testing::{assert_has_warning, assert_plan_updates_in_place};
    use reqwest::Method;

    fn monitor_json() -> Value {
        json!({
            "uuid": "mon_abc123",
            "name": "API",
            "url": "https://example.com/health",
            "protocol": "http",
            "http_method": "GET",
            "regions": ["paris"],
            "check_frequency": 60,
            "request_headers": [{"name": "X-Trace", "value": "1"}],
            "follow_redirects": true,
            "expected_status_code": "2xx",
            "paused": false,
            "status": "up"
        })
    }

    fn state() -> Value {
        json!({
            "id": "mon_abc123",
            "name": "API",
            "url": "https://example.com/health",
            "protocol": "http",
            "http_method": "GET",
            "check_frequency": 60,
            "regions": ["paris"],
            "request_headers": [{"name": "X-Trace", "value": "1"}],
            "request_body": null,
            "expected_status_code": "2xx",
            "follow_redirects": true,
            "paused": false,
            "port": null,
            "alerts_wait": null,
            "escalation_policy": null,
            "required_keyword": null,
            "status": "up",
            "ssl_expiration": null
        })
    }

    #[test]
    fn test_port_required_for_port_protocol() {
        let resource = MonitorResource;
        let diags = resource.validate(&json!({"protocol": "port"}));
        assert_eq!(diags[0].summary, "Missing Port");
        assert!(resource
            .validate(&json!({"protocol": "port", "port": crate::types::UNKNOWN_VALUE}))
            .is_empty());
        assert!(resource.validate(&json!({"protocol": "http"})).is_empty());
    }

    #[tokio::test]
    async fn test_reserved_header_rejected() {
        let tester = tester(MockHttpTransport::new()).await;
        let err = tester
            .validate_resource_config(
                "hyperping_monitor",
                json!({
                    "name": "API",
                    "url": "https://example.com",
                    "request_headers": [{"name": "Authorization", "value": "Bearer x"}]
                }),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Reserved Header Name"));
    }

    #[tokio::test]
    async fn test_create_then_pause() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::POST
                    && path_of(r) == "/v1/monitors"
                    && r.json_body().is_some_and(|b| b.get("paused").is_none())
            })
            .times(1)
            .returning(|_| Box::pin(async { ok(monitor_json()) }));
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v1/monitors/mon_abc123")
            .times(1)
            .returning(|_| Box::pin(async { ok(monitor_json()) }));
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
        let tester = tester(mock).await;

        let plan = tester
            .plan_create(
                "hyperping_monitor",
                json!({
                    "name": "API",
                    "url": "https://example.com/health",
                    "regions": ["paris"],
                    "request_headers": [{"name": "X-Trace", "value": "1"}],
                    "paused": true
                }),
            )
            .await
            .unwrap();
        let created = tester
            .create("hyperping_monitor", plan.planned_state)
            .await
            .unwrap();
        assert_eq!(created.state["id"], "mon_abc123");
        assert_eq!(created.state["paused"], true);
        assert_eq!(created.state["request_body"], Value::Null);
    }

    #[tokio::test]
    async fn test_read_removes_missing_monitor() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| path_of(r) == "/v1/monitors/mon_abc123")
            .returning(|_| Box::pin(async { status(404, json!({"error": "Monitor not found"})) }));
        let tester = tester(mock).await;

        let read = tester.read("hyperping_monitor", state()).await.unwrap();
        assert!(read.is_removed());
    }

    #[tokio::test]
    async fn test_update_sends_only_changes() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::PUT
                    && path_of(r) == "/v1/monitors/mon_abc123"
                    && r.json_body() == Some(json!({"name": "API v2", "check_frequency": 300}))
            })
            .times(1)
            .returning(|_| Box::pin(async { ok(monitor_json()) }));
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v1/monitors/mon_abc123")
            .times(1)
            .returning(|_| {
                let mut body = monitor_json();
                body["name"] = json!("API v2");
                body["check_frequency"] = json!(300);
                Box::pin(async move { ok(body) })
            });
        let tester = tester(mock).await;

        let mut proposed = state();
        proposed["name"] = json!("API v2");
        proposed["check_frequency"] = json!(300);
        let plan = tester
            .plan_update("hyperping_monitor", state(), proposed)
            .await
            .unwrap();
        assert_plan_updates_in_place(&plan);

        let updated = tester
            .update("hyperping_monitor", state(), plan.planned_state)
            .await
            .unwrap();
        assert_eq!(updated.state["name"], "API v2");
        assert_eq!(updated.state["check_frequency"], 300);
    }

    #[tokio::test]
    async fn test_delete_already_gone_warns() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::DELETE && path_of(r) == "/v1/monitors/mon_abc123")
            .returning(|_| Box::pin(async { status(404, json!({"error": "not found"})) }));
        let tester = tester(mock).await;

        let warnings = tester.delete("hyperping_monitor", state()).await.unwrap();
        assert_has_warning(&warnings, "Monitor Not Found");
    }
}

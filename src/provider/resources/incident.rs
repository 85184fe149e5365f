//! `hyperping_incident`: an incident published on status pages.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::{
    CreateIncidentRequest, HyperpingClient, LocalizedText, ALLOWED_INCIDENT_TYPES,
    MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH,
};
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, Diagnostic, Schema};
use crate::types::StateResponse;
use crate::validators::Validator;

use crate::provider::diagnostics::{
    create_error, delete_error, not_found_warning, read_after_create_error,
    read_after_update_error, read_error, update_api_error,
};
use crate::provider::diff::incident_update;
use crate::provider::mapping::{merge_incident, IncidentState};
use crate::provider::{parse_state, require_id, to_state, Resource};

const RESOURCE: &str = "Incident";

pub(crate) struct IncidentResource;

fn incident_schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "title",
            Attribute::required_string().with_validator(Validator::LengthBetween(1, MAX_NAME_LENGTH)),
        )
        .with_attribute(
            "text",
            Attribute::required_string()
                .with_description("Initial incident message")
                .with_validator(Validator::LengthBetween(1, MAX_MESSAGE_LENGTH)),
        )
        .with_attribute(
            "type",
            Attribute::optional_computed_string()
                .with_default(json!("incident"))
                .with_validator(Validator::OneOf(ALLOWED_INCIDENT_TYPES)),
        )
        .with_attribute(
            "affected_components",
            Attribute::string_list(AttributeFlags::optional())
                .with_description("UUIDs of affected status page components"),
        )
        .with_attribute(
            "status_pages",
            Attribute::string_list(AttributeFlags::required())
                .with_description("UUIDs of the status pages to publish on"),
        )
        .with_attribute("date", Attribute::computed_string())
}

#[async_trait]
impl Resource for IncidentResource {
    fn type_name(&self) -> &'static str {
        "hyperping_incident"
    }

    fn display_name(&self) -> &'static str {
        RESOURCE
    }

    fn schema(&self) -> Schema {
        incident_schema()
    }

    async fn create(&self, client: &HyperpingClient, planned: Value) -> Result<StateResponse> {
        let mut plan: IncidentState = parse_state(&planned)?;
        let req = CreateIncidentRequest {
            title: LocalizedText::en(plan.title.clone().unwrap_or_default()),
            text: LocalizedText::en(plan.text.clone().unwrap_or_default()),
            incident_type: plan.incident_type.clone().unwrap_or_else(|| "incident".to_string()),
            affected_components: plan.affected_components.clone().unwrap_or_default(),
            status_pages: plan.status_pages.clone().unwrap_or_default(),
            date: String::new(),
        };
        let created = client
            .create_incident(&req)
            .await
            .map_err(|e| create_error(RESOURCE, &e))?;
        let incident = client
            .get_incident(&created.uuid)
            .await
            .map_err(|e| read_after_create_error(RESOURCE, "incident", &created.uuid, &e))?;

        merge_incident(&incident, &mut plan);
        info!(incident_id = %incident.uuid, "Created incident");
        Ok(StateResponse::new(to_state(&plan)?))
    }

    async fn read(&self, client: &HyperpingClient, current: Value) -> Result<StateResponse> {
        let mut state: IncidentState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.get_incident(&id).await {
            Ok(incident) => {
                merge_incident(&incident, &mut state);
                Ok(StateResponse::new(to_state(&state)?))
            },
            Err(e) if e.is_not_found() => {
                warn!(incident_id = %id, "Incident no longer exists, removing from state");
                Ok(StateResponse::removed())
            },
            Err(e) => Err(read_error(RESOURCE, &id, &e).into()),
        }
    }

    /// The text is the first timeline entry and cannot be edited; only the
    /// other fields are sent.
    async fn update(
        &self,
        client: &HyperpingClient,
        prior: Value,
        planned: Value,
    ) -> Result<StateResponse> {
        let prior: IncidentState = parse_state(&prior)?;
        let mut plan: IncidentState = parse_state(&planned)?;
        let id = require_id(prior.id.as_deref(), RESOURCE)?;

        let req = incident_update(&plan, &prior);
        if req.is_empty() {
            debug!(incident_id = %id, "No incident fields changed");
        } else {
            client
                .update_incident(&id, &req)
                .await
                .map_err(|e| update_api_error(RESOURCE, &id, &e))?;
        }

        let incident = client
            .get_incident(&id)
            .await
            .map_err(|e| read_after_update_error(RESOURCE, &id, &e))?;
        merge_incident(&incident, &mut plan);
        Ok(StateResponse::new(to_state(&plan)?))
    }

    async fn delete(&self, client: &HyperpingClient, current: Value) -> Result<Vec<Diagnostic>> {
        let state: IncidentState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.delete_incident(&id).await {
            Ok(()) => {
                info!(incident_id = %id, "Deleted incident");
                Ok(Vec::new())
            },
            Err(e) if e.is_not_found() => Ok(vec![not_found_warning(
                RESOURCE,
                format!("Incident {} was already deleted", id),
            )]),
            Err(e) => Err(delete_error(RESOURCE, &id, &e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{ok, path_of};
    use crate::client::MockHttpTransport;
    use crate::provider::test_support::tester;
    use reqwest::Method;

    fn incident_json(title: &str, text: &str) -> Value {
        json!({
            "uuid": "inc_abc123",
            "date": "2026-03-01T10:00:00.000Z",
            "title": {"en": title},
            "text": {"en": text},
            "type": "incident",
            "affectedComponents": [],
            "statuspages": ["sp_main01"],
            "updates": []
        })
    }

    #[tokio::test]
    async fn test_create_keeps_planned_text_when_not_echoed() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::POST
                    && path_of(r) == "/v3/incidents"
                    && r.json_body()
                        == Some(json!({
                            "title": {"en": "Elevated errors"},
                            "text": {"en": "We are investigating."},
                            "type": "incident",
                            "statuspages": ["sp_main01"]
                        }))
            })
            .times(1)
            .returning(|_| Box::pin(async { ok(incident_json("Elevated errors", "")) }));
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v3/incidents/inc_abc123")
            .times(1)
            .returning(|_| Box::pin(async { ok(incident_json("Elevated errors", "")) }));
        let tester = tester(mock).await;

        let plan = tester
            .plan_create(
                "hyperping_incident",
                json!({
                    "title": "Elevated errors",
                    "text": "We are investigating.",
                    "status_pages": ["sp_main01"]
                }),
            )
            .await
            .unwrap();
        let created = tester
            .create("hyperping_incident", plan.planned_state)
            .await
            .unwrap();
        assert_eq!(created.state["id"], "inc_abc123");
        assert_eq!(created.state["text"], "We are investigating.");
        assert_eq!(created.state["type"], "incident");
        assert!(created.state["affected_components"].is_null());
    }

    #[tokio::test]
    async fn test_update_sends_changed_title() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::PUT
                    && path_of(r) == "/v3/incidents/inc_abc123"
                    && r.json_body() == Some(json!({"title": {"en": "Resolved errors"}}))
            })
            .times(1)
            .returning(|_| Box::pin(async { ok(incident_json("Resolved errors", "")) }));
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v3/incidents/inc_abc123")
            .times(1)
            .returning(|_| Box::pin(async { ok(incident_json("Resolved errors", "")) }));
        let tester = tester(mock).await;

        let prior = json!({
            "id": "inc_abc123",
            "title": "Elevated errors",
            "text": "We are investigating.",
            "type": "incident",
            "status_pages": ["sp_main01"],
            "date": "2026-03-01T10:00:00.000Z"
        });
        let mut planned = prior.clone();
        planned["title"] = json!("Resolved errors");

        let updated = tester
            .update("hyperping_incident", prior, planned)
            .await
            .unwrap();
        assert_eq!(updated.state["title"], "Resolved errors");
        assert_eq!(updated.state["text"], "We are investigating.");
    }

    #[tokio::test]
    async fn test_read_removes_deleted_incident() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v3/incidents/inc_abc123")
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    crate::client::test_support::status(404, json!({"error": "not found"}))
                })
            });
        let tester = tester(mock).await;

        let read = tester
            .read("hyperping_incident", json!({"id": "inc_abc123"}))
            .await
            .unwrap();
        assert!(read.is_removed());
    }
}

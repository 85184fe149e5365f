//! `hyperping_incident_update`: one timeline entry on an incident.
//!
//! The id is `incident_id/update_uuid`. Entries are append-only on the API
//! side: destroy forgets the entry and edits are applied to state only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::client::{
    non_empty, validate_resource_id, AddIncidentUpdateRequest, HyperpingClient, LocalizedText,
    ALLOWED_INCIDENT_UPDATE_TYPES, MAX_MESSAGE_LENGTH,
};
use crate::error::Result;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::StateResponse;
use crate::validators::Validator;

use crate::provider::diagnostics::{create_error, import_error, read_error};
use crate::provider::{parse_state, require_id, to_state, Resource};

const RESOURCE: &str = "Incident Update";

pub(crate) struct IncidentUpdateResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct IncidentUpdateState {
    id: Option<String>,
    incident_id: Option<String>,
    text: Option<String>,
    #[serde(rename = "type")]
    update_type: Option<String>,
    date: Option<String>,
}

/// Split `incident_id/update_uuid`.
fn split_id(id: &str) -> Option<(&str, &str)> {
    match id.split_once('/') {
        Some((incident, update)) if !incident.is_empty() && !update.is_empty() => {
            Some((incident, update))
        },
        _ => None,
    }
}

fn incident_update_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("incident_id/update_uuid"),
        )
        .with_attribute(
            "incident_id",
            Attribute::required_string()
                .with_force_new()
                .with_validator(Validator::ResourceId),
        )
        .with_attribute(
            "text",
            Attribute::required_string()
                .with_validator(Validator::LengthBetween(1, MAX_MESSAGE_LENGTH)),
        )
        .with_attribute(
            "type",
            Attribute::required_string()
                .with_description("investigating, identified, update, monitoring or resolved")
                .with_validator(Validator::OneOf(ALLOWED_INCIDENT_UPDATE_TYPES)),
        )
        .with_attribute(
            "date",
            Attribute::optional_computed_string()
                .with_description("ISO 8601 time of the entry; defaults to now")
                .with_validator(Validator::Iso8601),
        )
}

#[async_trait]
impl Resource for IncidentUpdateResource {
    fn type_name(&self) -> &'static str {
        "hyperping_incident_update"
    }

    fn display_name(&self) -> &'static str {
        RESOURCE
    }

    fn schema(&self) -> Schema {
        incident_update_schema()
    }

    async fn create(&self, client: &HyperpingClient, planned: Value) -> Result<StateResponse> {
        let mut plan: IncidentUpdateState = parse_state(&planned)?;
        let incident_id = plan.incident_id.clone().unwrap_or_default();
        let req = AddIncidentUpdateRequest {
            text: LocalizedText::en(plan.text.clone().unwrap_or_default()),
            update_type: plan.update_type.clone().unwrap_or_default(),
            date: plan.date.clone().unwrap_or_default(),
        };
        let incident = client
            .add_incident_update(&incident_id, &req)
            .await
            .map_err(|e| create_error(RESOURCE, &e))?;

        // The new entry is the last one on the timeline.
        let Some(entry) = incident.updates.last() else {
            return Err(Diagnostic::error("Incident Update Not Returned")
                .with_detail(format!(
                    "Incident {} was updated but the response had no timeline entries",
                    incident_id
                ))
                .into());
        };
        plan.id = Some(format!("{}/{}", incident_id, entry.uuid));
        plan.date = non_empty(&entry.date).or(plan.date);

        info!(incident_id = %incident_id, update_id = %entry.uuid, "Added incident update");
        Ok(StateResponse::new(to_state(&plan)?))
    }

    async fn read(&self, client: &HyperpingClient, current: Value) -> Result<StateResponse> {
        let mut state: IncidentUpdateState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        let Some((incident_id, update_id)) = split_id(&id) else {
            return Err(Diagnostic::error("Invalid Resource ID")
                .with_detail(format!("Could not parse incident update ID: {}", id))
                .into());
        };

        let incident = match client.get_incident(incident_id).await {
            Ok(incident) => incident,
            Err(e) if e.is_not_found() => {
                warn!(incident_id, "Incident no longer exists, removing update from state");
                return Ok(StateResponse::removed());
            },
            Err(e) => return Err(read_error(RESOURCE, &id, &e).into()),
        };
        let Some(entry) = incident.updates.iter().find(|u| u.uuid == update_id) else {
            warn!(incident_id, update_id, "Incident update no longer exists, removing from state");
            return Ok(StateResponse::removed());
        };

        state.incident_id = Some(incident_id.to_string());
        state.text = Some(entry.text.en.clone());
        state.update_type = Some(entry.update_type.clone());
        state.date = non_empty(&entry.date);
        Ok(StateResponse::new(to_state(&state)?))
    }

    async fn update(
        &self,
        _client: &HyperpingClient,
        prior: Value,
        planned: Value,
    ) -> Result<StateResponse> {
        let prior: IncidentUpdateState = parse_state(&prior)?;
        let mut plan: IncidentUpdateState = parse_state(&planned)?;
        plan.id = prior.id;
        plan.date = prior.date;
        Ok(StateResponse::new(to_state(&plan)?).with_diagnostic(
            Diagnostic::warning("Update Not Fully Supported").with_detail(
                "Incident update modifications may not be fully supported by the Hyperping API. \
                 Consider destroying and recreating the resource if changes are needed.",
            ),
        ))
    }

    async fn delete(&self, _client: &HyperpingClient, current: Value) -> Result<Vec<Diagnostic>> {
        let state: IncidentUpdateState = parse_state(&current)?;
        info!(id = ?state.id, "Removing incident update from state");
        Ok(Vec::new())
    }

    async fn import(&self, client: &HyperpingClient, id: &str) -> Result<StateResponse> {
        let Some((incident_id, update_id)) = split_id(id) else {
            return Err(Diagnostic::error("Invalid Import ID")
                .with_detail(format!("Expected format: incident_id/update_id, got: {}", id))
                .into());
        };
        validate_resource_id(incident_id).map_err(|e| import_error(RESOURCE, e))?;
        validate_resource_id(update_id).map_err(|e| import_error(RESOURCE, e))?;
        self.read(client, json!({ "id": id })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{ok, path_of};
    use crate::client::MockHttpTransport;
    use crate::provider::test_support::tester;
    use crate::testing::{assert_has_warning, error_diagnostics};
    use reqwest::Method;

    fn incident_with_updates() -> Value {
        json!({
            "uuid": "inc_abc123",
            "title": {"en": "Elevated errors"},
            "text": {"en": "We are investigating."},
            "type": "incident",
            "statuspages": ["sp_main01"],
            "updates": [
                {"uuid": "upd_first1", "date": "2026-03-01T10:00:00Z", "text": {"en": "Looking"}, "type": "investigating"},
                {"uuid": "upd_second", "date": "2026-03-01T11:00:00Z", "text": {"en": "Fixed"}, "type": "resolved"}
            ]
        })
    }

    #[test]
    fn test_split_id() {
        assert_eq!(split_id("inc_1/upd_2"), Some(("inc_1", "upd_2")));
        assert_eq!(split_id("inc_1"), None);
        assert_eq!(split_id("/upd_2"), None);
    }

    #[tokio::test]
    async fn test_create_takes_last_entry() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::POST
                    && path_of(r) == "/v3/incidents/inc_abc123/updates"
                    && r.json_body()
                        == Some(json!({"text": {"en": "Fixed"}, "type": "resolved", "date": ""}))
            })
            .times(1)
            .returning(|_| Box::pin(async { ok(incident_with_updates()) }));
        let tester = tester(mock).await;

        let plan = tester
            .plan_create(
                "hyperping_incident_update",
                json!({"incident_id": "inc_abc123", "text": "Fixed", "type": "resolved"}),
            )
            .await
            .unwrap();
        let created = tester
            .create("hyperping_incident_update", plan.planned_state)
            .await
            .unwrap();
        assert_eq!(created.state["id"], "inc_abc123/upd_second");
        assert_eq!(created.state["date"], "2026-03-01T11:00:00Z");
    }

    #[tokio::test]
    async fn test_read_missing_entry_removes() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v3/incidents/inc_abc123")
            .times(2)
            .returning(|_| Box::pin(async { ok(incident_with_updates()) }));
        let tester = tester(mock).await;

        let read = tester
            .read("hyperping_incident_update", json!({"id": "inc_abc123/upd_first1"}))
            .await
            .unwrap();
        assert_eq!(read.state["type"], "investigating");
        assert_eq!(read.state["text"], "Looking");

        let gone = tester
            .read("hyperping_incident_update", json!({"id": "inc_abc123/upd_gone99"}))
            .await
            .unwrap();
        assert!(gone.is_removed());
    }

    #[tokio::test]
    async fn test_update_warns_and_keeps_identity() {
        let tester = tester(MockHttpTransport::new()).await;
        let prior = json!({
            "id": "inc_abc123/upd_first1",
            "incident_id": "inc_abc123",
            "text": "Looking",
            "type": "investigating",
            "date": "2026-03-01T10:00:00Z"
        });
        let mut planned = prior.clone();
        planned["text"] = json!("Still looking");
        planned["date"] = json!(crate::types::UNKNOWN_VALUE);

        let updated = tester
            .update("hyperping_incident_update", prior, planned)
            .await
            .unwrap();
        assert_eq!(updated.state["text"], "Still looking");
        assert_eq!(updated.state["date"], "2026-03-01T10:00:00Z");
        assert_has_warning(&updated.diagnostics, "Update Not Fully Supported");
    }

    #[tokio::test]
    async fn test_import_requires_compound_id() {
        let tester = tester(MockHttpTransport::new()).await;
        let err = tester
            .import_resource("hyperping_incident_update", "inc_abc123")
            .await
            .unwrap_err();
        assert_eq!(error_diagnostics(err)[0].summary, "Invalid Import ID");
    }
}

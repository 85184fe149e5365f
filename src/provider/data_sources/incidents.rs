//! `hyperping_incident` and `hyperping_incidents`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::{HyperpingClient, Incident};
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, Block, Diagnostic, NestedBlock, Schema};
use crate::types::StateResponse;

use crate::provider::diagnostics::{list_error, read_error};
use crate::provider::filters::{filter_block, Filter};
use crate::provider::mapping::{merge_incident, IncidentState};
use crate::provider::{to_state, DataSource};

use super::{filter_diagnostics, list_schema, list_state, lookup_id, lookup_schema};

#[derive(Debug, Serialize)]
struct UpdateItem {
    id: String,
    date: String,
    text: String,
    #[serde(rename = "type")]
    update_type: String,
}

/// An incident with its update timeline, oldest first.
#[derive(Debug, Serialize)]
struct IncidentItem {
    #[serde(flatten)]
    incident: IncidentState,
    updates: Vec<UpdateItem>,
}

impl From<&Incident> for IncidentItem {
    fn from(incident: &Incident) -> Self {
        let mut state = IncidentState::default();
        merge_incident(incident, &mut state);
        let updates = incident
            .updates
            .iter()
            .map(|u| UpdateItem {
                id: u.uuid.clone(),
                date: u.date.clone(),
                text: u.text.en.clone(),
                update_type: u.update_type.clone(),
            })
            .collect();
        Self {
            incident: state,
            updates,
        }
    }
}

fn incident_item() -> Block {
    let updates = NestedBlock::list(
        Block::new()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("date", Attribute::computed_string())
            .with_attribute("text", Attribute::computed_string())
            .with_attribute("type", Attribute::computed_string()),
    )
    .computed();
    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("title", Attribute::computed_string())
        .with_attribute("text", Attribute::computed_string())
        .with_attribute("type", Attribute::computed_string())
        .with_attribute(
            "affected_components",
            Attribute::string_list(AttributeFlags::computed()),
        )
        .with_attribute("status_pages", Attribute::string_list(AttributeFlags::computed()))
        .with_attribute("date", Attribute::computed_string())
        .with_block("updates", updates)
}

pub(crate) struct IncidentDataSource;

#[async_trait]
impl DataSource for IncidentDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_incident"
    }

    fn schema(&self) -> Schema {
        lookup_schema(incident_item())
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let id = lookup_id(&config)?;
        let incident = client
            .get_incident(&id)
            .await
            .map_err(|e| read_error("Incident", &id, &e))?;
        Ok(StateResponse::new(to_state(&IncidentItem::from(&incident))?))
    }
}

pub(crate) struct IncidentsDataSource;

#[async_trait]
impl DataSource for IncidentsDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_incidents"
    }

    fn schema(&self) -> Schema {
        list_schema(
            "incidents",
            incident_item(),
            filter_block(
                "Filter criteria for incidents; name_regex matches the English title",
                &[
                    ("status", "Type of the latest update, e.g. investigating or resolved"),
                    ("severity", "Incident type (outage, incident)"),
                ],
            ),
        )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        filter_diagnostics(config)
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let filter = Filter::from_config(&config)?;
        let incidents = client
            .list_incidents()
            .await
            .map_err(|e| list_error("Incidents", &e))?;
        let items: Vec<IncidentItem> = incidents
            .iter()
            .filter(|i| filter.matches_incident(i))
            .map(IncidentItem::from)
            .collect();
        debug!(total = incidents.len(), matched = items.len(), "Listed incidents");
        Ok(StateResponse::new(list_state(&config, "incidents", &items)?))
    }
}

#[cfg(test)]
mod tests {
    use crate::client::test_support::{ok, path_of};
    use crate::client::MockHttpTransport;
    use crate::provider::test_support::tester;
    use reqwest::Method;
    use serde_json::{json, Value};

    fn incidents_json() -> Value {
        json!({"incidents": [
            {"uuid": "inci_dbdown", "title": {"en": "Database down"}, "type": "outage",
             "statuspages": ["sp_main01"], "updates": [
                {"uuid": "upd_first1", "date": "2026-01-01T10:00:00Z", "text": {"en": "Looking"}, "type": "investigating"},
                {"uuid": "upd_second", "date": "2026-01-01T11:00:00Z", "text": {"en": "Fixed"}, "type": "resolved"}
             ]},
            {"uuid": "inci_slowapi", "title": {"en": "Slow API"}, "type": "incident",
             "statuspages": ["sp_main01"], "updates": [
                {"uuid": "upd_third1", "date": "2026-01-02T10:00:00Z", "text": {"en": "Looking"}, "type": "investigating"}
             ]}
        ]})
    }

    #[tokio::test]
    async fn test_status_is_latest_update() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v3/incidents")
            .times(2)
            .returning(|_| Box::pin(async { ok(incidents_json()) }));
        let tester = tester(mock).await;

        let read = tester
            .read_data_source("hyperping_incidents", json!({"filter": {"status": "investigating"}}))
            .await
            .unwrap();
        let items = read.state["incidents"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "inci_slowapi");

        let read = tester
            .read_data_source("hyperping_incidents", json!({"filter": {"severity": "outage"}}))
            .await
            .unwrap();
        let items = read.state["incidents"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], "Database down");
        assert_eq!(items[0]["updates"][1]["type"], "resolved");
        assert_eq!(items[0]["updates"][1]["text"], "Fixed");
    }

    #[tokio::test]
    async fn test_lookup_includes_updates() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v3/incidents/inci_dbdown")
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(json!({"uuid": "inci_dbdown", "title": {"en": "Database down"},
                              "text": {"en": "Primary unreachable"}, "type": "outage",
                              "updates": [{"uuid": "upd_first1", "type": "identified", "text": {"en": "Found it"}}]}))
                })
            });
        let tester = tester(mock).await;

        let read = tester
            .read_data_source("hyperping_incident", json!({"id": "inci_dbdown"}))
            .await
            .unwrap();
        assert_eq!(read.state["text"], "Primary unreachable");
        assert_eq!(read.state["type"], "outage");
        assert_eq!(read.state["updates"][0]["id"], "upd_first1");
        assert!(read.state["status_pages"].is_null());
    }
}

//! Status page incidents: `/v3/incidents`.

use serde::{Deserialize, Serialize};

use super::error::ClientError;
use super::models::{
    nullable, validate_localized_text, LocalizedText, MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH,
};
use super::{decode_list, validate_resource_id, HyperpingClient};

const INCIDENTS_PATH: &str = "/v3/incidents";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Incident {
    pub uuid: String,
    #[serde(deserialize_with = "nullable")]
    pub date: String,
    #[serde(deserialize_with = "nullable")]
    pub title: LocalizedText,
    #[serde(deserialize_with = "nullable")]
    pub text: LocalizedText,
    #[serde(rename = "type")]
    pub incident_type: String,
    #[serde(rename = "affectedComponents", deserialize_with = "nullable")]
    pub affected_components: Vec<String>,
    #[serde(rename = "statuspages", deserialize_with = "nullable")]
    pub status_pages: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub updates: Vec<IncidentUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentUpdate {
    pub uuid: String,
    pub date: String,
    pub text: LocalizedText,
    #[serde(rename = "type")]
    pub update_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateIncidentRequest {
    pub title: LocalizedText,
    pub text: LocalizedText,
    #[serde(rename = "type")]
    pub incident_type: String,
    #[serde(rename = "affectedComponents", skip_serializing_if = "Vec::is_empty")]
    pub affected_components: Vec<String>,
    #[serde(rename = "statuspages")]
    pub status_pages: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
}

impl CreateIncidentRequest {
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_localized_text("title", &self.title, MAX_NAME_LENGTH)?;
        validate_localized_text("text", &self.text, MAX_MESSAGE_LENGTH)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateIncidentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<LocalizedText>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub incident_type: Option<String>,
    #[serde(rename = "affectedComponents", skip_serializing_if = "Option::is_none")]
    pub affected_components: Option<Vec<String>>,
    #[serde(rename = "statuspages", skip_serializing_if = "Option::is_none")]
    pub status_pages: Option<Vec<String>>,
}

impl UpdateIncidentRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddIncidentUpdateRequest {
    pub text: LocalizedText,
    #[serde(rename = "type")]
    pub update_type: String,
    /// Empty lets the API stamp the current time.
    pub date: String,
}

impl HyperpingClient {
    pub async fn list_incidents(&self) -> Result<Vec<Incident>, ClientError> {
        let body = self
            .get_raw(INCIDENTS_PATH)
            .await
            .map_err(|e| e.context("failed to list incidents"))?;
        decode_list(&body, &["incidents", "data"])
            .map_err(|e| e.context("failed to parse incidents response"))
    }

    pub async fn get_incident(&self, id: &str) -> Result<Incident, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("GetIncident"))?;
        self.get(&format!("{}/{}", INCIDENTS_PATH, id))
            .await
            .map_err(|e| e.context(format!("failed to get incident {}", id)))
    }

    pub async fn create_incident(
        &self,
        req: &CreateIncidentRequest,
    ) -> Result<Incident, ClientError> {
        req.validate().map_err(|e| e.context("CreateIncident"))?;
        self.post(INCIDENTS_PATH, req)
            .await
            .map_err(|e| e.context("failed to create incident"))
    }

    pub async fn update_incident(
        &self,
        id: &str,
        req: &UpdateIncidentRequest,
    ) -> Result<Incident, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("UpdateIncident"))?;
        self.put(&format!("{}/{}", INCIDENTS_PATH, id), req)
            .await
            .map_err(|e| e.context(format!("failed to update incident {}", id)))
    }

    /// Post a timeline entry. The API answers with the whole incident.
    pub async fn add_incident_update(
        &self,
        id: &str,
        req: &AddIncidentUpdateRequest,
    ) -> Result<Incident, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("AddIncidentUpdate"))?;
        validate_localized_text("text", &req.text, MAX_MESSAGE_LENGTH)
            .map_err(|e| e.context("AddIncidentUpdate"))?;
        self.post(&format!("{}/{}/updates", INCIDENTS_PATH, id), req)
            .await
            .map_err(|e| e.context(format!("failed to add update to incident {}", id)))
    }

    pub async fn resolve_incident(&self, id: &str, message: &str) -> Result<Incident, ClientError> {
        let req = AddIncidentUpdateRequest {
            text: LocalizedText::en(message),
            update_type: "resolved".to_string(),
            date: String::new(),
        };
        self.add_incident_update(id, &req).await
    }

    pub async fn delete_incident(&self, id: &str) -> Result<(), ClientError> {
        validate_resource_id(id).map_err(|e| e.context("DeleteIncident"))?;
        self.delete(&format!("{}/{}", INCIDENTS_PATH, id))
            .await
            .map_err(|e| e.context(format!("failed to delete incident {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::MockHttpTransport;
    use super::*;
    use reqwest::Method;
    use serde_json::json;

    fn incident_json() -> serde_json::Value {
        json!({
            "uuid": "inci_1",
            "date": "2026-02-01T09:00:00Z",
            "title": {"en": "Checkout errors"},
            "text": {"en": "Investigating elevated 500s"},
            "type": "incident",
            "affectedComponents": null,
            "statuspages": ["sp_main"],
            "updates": [
                {"uuid": "upd_1", "date": "2026-02-01T09:05:00Z", "text": {"en": "Found it"}, "type": "identified"}
            ]
        })
    }

    #[test]
    fn test_incident_decodes() {
        let incident: Incident = serde_json::from_value(incident_json()).unwrap();
        assert_eq!(incident.title.en, "Checkout errors");
        assert!(incident.affected_components.is_empty());
        assert_eq!(incident.updates[0].update_type, "identified");
    }

    #[test]
    fn test_update_request_sends_explicit_empty_list() {
        let req = UpdateIncidentRequest {
            affected_components: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"affectedComponents": []})
        );
    }

    #[tokio::test]
    async fn test_create_incident_validates_title() {
        let req = CreateIncidentRequest {
            title: LocalizedText::en("t".repeat(256)),
            text: LocalizedText::en("body"),
            incident_type: "incident".into(),
            status_pages: vec!["sp_main".into()],
            ..Default::default()
        };
        let err = client(MockHttpTransport::new())
            .create_incident(&req)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("\"title.en\""));
    }

    #[tokio::test]
    async fn test_resolve_incident_posts_update() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::POST
                    && path_of(r) == "/v3/incidents/inci_1/updates"
                    && r.json_body()
                        == Some(json!({"text": {"en": "All clear"}, "type": "resolved", "date": ""}))
            })
            .returning(|_| Box::pin(async { ok(incident_json()) }));

        let incident = client(mock).resolve_incident("inci_1", "All clear").await.unwrap();
        assert_eq!(incident.uuid, "inci_1");
    }
}

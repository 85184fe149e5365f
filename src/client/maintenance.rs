//! Maintenance windows: `/v1/maintenance-windows`.

use serde::{Deserialize, Serialize};

use super::error::ClientError;
use super::models::{
    nullable, validate_localized_text, validate_string_length, LocalizedText, MAX_MESSAGE_LENGTH,
    MAX_NAME_LENGTH,
};
use super::{decode_list, validate_resource_id, HyperpingClient};

const MAINTENANCE_PATH: &str = "/v1/maintenance-windows";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Maintenance {
    pub uuid: String,
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub title: LocalizedText,
    #[serde(deserialize_with = "nullable")]
    pub text: LocalizedText,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub timezone: String,
    #[serde(deserialize_with = "nullable")]
    pub monitors: Vec<String>,
    #[serde(rename = "statuspages", deserialize_with = "nullable")]
    pub status_pages: Vec<String>,
    #[serde(rename = "bulkUuid")]
    pub bulk_uuid: Option<String>,
    #[serde(rename = "createdBy", deserialize_with = "nullable")]
    pub created_by: String,
    #[serde(rename = "createdAt", deserialize_with = "nullable")]
    pub created_at: String,
    #[serde(rename = "notificationOption", deserialize_with = "nullable")]
    pub notification_option: String,
    #[serde(rename = "notificationMinutes")]
    pub notification_minutes: Option<i64>,
    /// `upcoming`, `ongoing` or `completed`.
    #[serde(deserialize_with = "nullable")]
    pub status: String,
    #[serde(deserialize_with = "nullable")]
    pub updates: Vec<MaintenanceUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceUpdate {
    pub text: LocalizedText,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateMaintenanceRequest {
    pub name: String,
    pub title: LocalizedText,
    pub text: LocalizedText,
    pub start_date: String,
    pub end_date: String,
    pub monitors: Vec<String>,
    #[serde(rename = "statuspages", skip_serializing_if = "Vec::is_empty")]
    pub status_pages: Vec<String>,
    #[serde(rename = "notificationOption", skip_serializing_if = "String::is_empty")]
    pub notification_option: String,
    #[serde(rename = "notificationMinutes", skip_serializing_if = "Option::is_none")]
    pub notification_minutes: Option<i64>,
}

impl CreateMaintenanceRequest {
    pub fn validate(&self) -> Result<(), ClientError> {
        validate_string_length("name", &self.name, MAX_NAME_LENGTH)?;
        validate_localized_text("title", &self.title, MAX_NAME_LENGTH)?;
        validate_localized_text("text", &self.text, MAX_MESSAGE_LENGTH)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateMaintenanceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<LocalizedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<LocalizedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitors: Option<Vec<String>>,
}

impl UpdateMaintenanceRequest {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Deserialize)]
struct CreatedUuid {
    #[serde(default)]
    uuid: String,
}

impl HyperpingClient {
    pub async fn list_maintenance(&self) -> Result<Vec<Maintenance>, ClientError> {
        let body = self
            .get_raw(MAINTENANCE_PATH)
            .await
            .map_err(|e| e.context("failed to list maintenance windows"))?;
        decode_list(&body, &["maintenanceWindows", "data", "maintenance"])
            .map_err(|e| e.context("failed to parse maintenance response"))
    }

    pub async fn get_maintenance(&self, id: &str) -> Result<Maintenance, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("GetMaintenance"))?;
        self.get(&format!("{}/{}", MAINTENANCE_PATH, id))
            .await
            .map_err(|e| e.context(format!("failed to get maintenance {}", id)))
    }

    /// Create a window. The API answers with only `{uuid}`, so the full
    /// object is fetched afterwards.
    pub async fn create_maintenance(
        &self,
        req: &CreateMaintenanceRequest,
    ) -> Result<Maintenance, ClientError> {
        req.validate().map_err(|e| e.context("CreateMaintenance"))?;
        let created: CreatedUuid = self
            .post(MAINTENANCE_PATH, req)
            .await
            .map_err(|e| e.context("failed to create maintenance"))?;
        self.get_maintenance(&created.uuid).await.map_err(|e| {
            e.context(format!("failed to read created maintenance {}", created.uuid))
        })
    }

    pub async fn update_maintenance(
        &self,
        id: &str,
        req: &UpdateMaintenanceRequest,
    ) -> Result<Maintenance, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("UpdateMaintenance"))?;
        self.put(&format!("{}/{}", MAINTENANCE_PATH, id), req)
            .await
            .map_err(|e| e.context(format!("failed to update maintenance {}", id)))
    }

    pub async fn delete_maintenance(&self, id: &str) -> Result<(), ClientError> {
        validate_resource_id(id).map_err(|e| e.context("DeleteMaintenance"))?;
        self.delete(&format!("{}/{}", MAINTENANCE_PATH, id))
            .await
            .map_err(|e| e.context(format!("failed to delete maintenance {}", id)))
    }
}

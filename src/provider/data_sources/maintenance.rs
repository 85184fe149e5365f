//! `hyperping_maintenance_window` and `hyperping_maintenance_windows`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::client::{non_empty, HyperpingClient, Maintenance};
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, Block, Diagnostic, Schema};
use crate::types::StateResponse;

use crate::provider::diagnostics::{list_error, read_error};
use crate::provider::filters::{filter_block, Filter};
use crate::provider::mapping::{merge_maintenance, MaintenanceState};
use crate::provider::{to_state, DataSource};

use super::{filter_diagnostics, list_schema, list_state, lookup_id, lookup_schema};

#[derive(Debug, Serialize)]
struct MaintenanceItem {
    #[serde(flatten)]
    window: MaintenanceState,
    timezone: Option<String>,
    status: Option<String>,
    created_by: Option<String>,
}

impl From<&Maintenance> for MaintenanceItem {
    fn from(mw: &Maintenance) -> Self {
        let mut window = MaintenanceState::default();
        merge_maintenance(mw, &mut window);
        Self {
            window,
            timezone: non_empty(&mw.timezone),
            status: non_empty(&mw.status),
            created_by: non_empty(&mw.created_by),
        }
    }
}

fn maintenance_item() -> Block {
    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("name", Attribute::computed_string())
        .with_attribute("title", Attribute::computed_string())
        .with_attribute("text", Attribute::computed_string())
        .with_attribute("start_date", Attribute::computed_string())
        .with_attribute("end_date", Attribute::computed_string())
        .with_attribute("monitors", Attribute::string_list(AttributeFlags::computed()))
        .with_attribute("status_pages", Attribute::string_list(AttributeFlags::computed()))
        .with_attribute("notification_option", Attribute::computed_string())
        .with_attribute("notification_minutes", Attribute::computed_int64())
        .with_attribute("timezone", Attribute::computed_string())
        .with_attribute(
            "status",
            Attribute::computed_string().with_description("upcoming, ongoing or completed"),
        )
        .with_attribute("created_by", Attribute::computed_string())
}

pub(crate) struct MaintenanceWindowDataSource;

#[async_trait]
impl DataSource for MaintenanceWindowDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_maintenance_window"
    }

    fn schema(&self) -> Schema {
        lookup_schema(maintenance_item())
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let id = lookup_id(&config)?;
        let mw = client
            .get_maintenance(&id)
            .await
            .map_err(|e| read_error("Maintenance Window", &id, &e))?;
        Ok(StateResponse::new(to_state(&MaintenanceItem::from(&mw))?))
    }
}

pub(crate) struct MaintenanceWindowsDataSource;

#[async_trait]
impl DataSource for MaintenanceWindowsDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_maintenance_windows"
    }

    fn schema(&self) -> Schema {
        list_schema(
            "maintenance_windows",
            maintenance_item(),
            filter_block(
                "Filter criteria for maintenance windows; name_regex matches the title or name",
                &[("status", "Filter by status (upcoming, ongoing, completed)")],
            ),
        )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        filter_diagnostics(config)
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let filter = Filter::from_config(&config)?;
        let windows = client
            .list_maintenance()
            .await
            .map_err(|e| list_error("Maintenance Windows", &e))?;
        let items: Vec<MaintenanceItem> = windows
            .iter()
            .filter(|mw| filter.matches_maintenance(mw))
            .map(MaintenanceItem::from)
            .collect();
        debug!(total = windows.len(), matched = items.len(), "Listed maintenance windows");
        Ok(StateResponse::new(list_state(&config, "maintenance_windows", &items)?))
    }
}

#[cfg(test)]
mod tests {
    use crate::client::test_support::{ok, path_of};
    use crate::client::MockHttpTransport;
    use crate::provider::test_support::tester;
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_regex_matches_title_or_name() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v1/maintenance-windows")
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(json!({"maintenanceWindows": [
                        {"uuid": "mw_dbupgrade", "name": "db-upgrade", "title": {"en": "Database upgrade"},
                         "status": "upcoming", "timezone": "Europe/Paris", "createdBy": "ops@example.com"},
                        {"uuid": "mw_netswitch", "name": "network", "title": {"en": "Switch swap"},
                         "status": "upcoming"},
                        {"uuid": "mw_oldpatch1", "name": "db-patch", "title": {"en": "Patch"},
                         "status": "completed"}
                    ]}))
                })
            });
        let tester = tester(mock).await;

        let read = tester
            .read_data_source(
                "hyperping_maintenance_windows",
                json!({"filter": {"name_regex": "(?i)database|db-", "status": "upcoming"}}),
            )
            .await
            .unwrap();
        let items = read.state["maintenance_windows"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "mw_dbupgrade");
        assert_eq!(items[0]["timezone"], "Europe/Paris");
        assert_eq!(items[0]["created_by"], "ops@example.com");
        assert_eq!(items[0]["title"], "Database upgrade");
    }
}

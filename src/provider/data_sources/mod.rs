//! Read-only data sources.
//!
//! Singular data sources look an object up by `id`. Plural ones list every
//! object of a type and keep those matching the optional `filter` block.

mod healthchecks;
mod incidents;
mod maintenance;
mod monitors;
mod outages;
mod reports;
mod statuspages;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, Schema};
use crate::types::strip_unknown;
use crate::validators::Validator;

use super::filters::Filter;
use super::DataSource;

pub(crate) fn all() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(monitors::MonitorDataSource),
        Box::new(monitors::MonitorsDataSource),
        Box::new(healthchecks::HealthcheckDataSource),
        Box::new(healthchecks::HealthchecksDataSource),
        Box::new(outages::OutageDataSource),
        Box::new(outages::OutagesDataSource),
        Box::new(incidents::IncidentDataSource),
        Box::new(incidents::IncidentsDataSource),
        Box::new(maintenance::MaintenanceWindowDataSource),
        Box::new(maintenance::MaintenanceWindowsDataSource),
        Box::new(statuspages::StatusPageDataSource),
        Box::new(statuspages::StatusPagesDataSource),
        Box::new(statuspages::SubscribersDataSource),
        Box::new(reports::MonitorReportDataSource),
        Box::new(reports::MonitorReportsDataSource),
    ]
}

/// Schema of a lookup by id: the item's attributes with `id` as input.
fn lookup_schema(item: Block) -> Schema {
    let block = item.with_attribute(
        "id",
        Attribute::required_string().with_validator(Validator::ResourceId),
    );
    Schema { version: 0, block }
}

/// Schema of a listing: the items under `key` plus an optional filter.
fn list_schema(key: &str, item: Block, filter: NestedBlock) -> Schema {
    Schema::v0()
        .with_block(key, NestedBlock::list(item).computed())
        .with_block("filter", filter)
}

fn lookup_id(config: &Value) -> Result<String> {
    match config.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ProviderError::InvalidRequest("id is required".to_string())),
    }
}

/// The config as a map, ready to receive computed outputs.
fn config_object(config: &Value) -> Map<String, Value> {
    match strip_unknown(config) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn list_state<T: Serialize>(config: &Value, key: &str, items: &[T]) -> Result<Value> {
    let mut state = config_object(config);
    state.insert(key.to_string(), serde_json::to_value(items)?);
    Ok(Value::Object(state))
}

/// Report a bad filter at validation time rather than on read.
fn filter_diagnostics(config: &Value) -> Vec<Diagnostic> {
    Filter::from_config(config).err().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_state_keeps_config() {
        let state = list_state(
            &json!({"filter": {"name_regex": "^prod"}}),
            "monitors",
            &[json!({"id": "mon_1"})],
        )
        .unwrap();
        assert_eq!(state["filter"]["name_regex"], "^prod");
        assert_eq!(state["monitors"][0]["id"], "mon_1");
    }

    #[test]
    fn test_lookup_id_required() {
        assert_eq!(lookup_id(&json!({"id": "mon_1"})).unwrap(), "mon_1");
        assert!(lookup_id(&json!({"id": ""})).is_err());
        assert!(lookup_id(&json!({})).is_err());
    }

    #[test]
    fn test_filter_diagnostics() {
        assert!(filter_diagnostics(&json!({})).is_empty());
        let diags = filter_diagnostics(&json!({"filter": {"name_regex": "("}}));
        assert_eq!(diags[0].summary, "Invalid Filter");
    }
}

//! The optional `filter` block of the plural data sources.
//!
//! Every criterion left unset matches everything. `name_regex` is compiled
//! once per read; an invalid pattern fails the read.

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::client::{Healthcheck, Incident, Maintenance, Monitor, Outage, StatusPage};
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock};
use crate::types::strip_unknown;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFilter {
    name_regex: Option<String>,
    protocol: Option<String>,
    paused: Option<bool>,
    status: Option<String>,
    severity: Option<String>,
    monitor_uuid: Option<String>,
    hostname: Option<String>,
}

/// Parsed filter criteria. Fields a data source's schema does not declare
/// stay `None`.
#[derive(Debug, Default)]
pub struct Filter {
    name_regex: Option<Regex>,
    protocol: Option<String>,
    paused: Option<bool>,
    status: Option<String>,
    severity: Option<String>,
    monitor_uuid: Option<String>,
    hostname: Option<String>,
}

impl Filter {
    /// Parse the `filter` value of a data source config. Null or missing
    /// means no filtering.
    pub fn from_config(config: &Value) -> Result<Self, Diagnostic> {
        let raw = match strip_unknown(config.get("filter").unwrap_or(&Value::Null)) {
            Value::Null => RawFilter::default(),
            other => serde_json::from_value(other).map_err(|e| {
                Diagnostic::error("Invalid Filter")
                    .with_detail(format!("Could not parse filter: {}", e))
                    .with_attribute("filter")
            })?,
        };
        let name_regex = raw
            .name_regex
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| {
                Diagnostic::error("Invalid Filter")
                    .with_detail(format!("Failed to compile name_regex pattern: {}", e))
                    .with_attribute("filter.name_regex")
            })?;
        Ok(Self {
            name_regex,
            protocol: raw.protocol,
            paused: raw.paused,
            status: raw.status,
            severity: raw.severity,
            monitor_uuid: raw.monitor_uuid,
            hostname: raw.hostname,
        })
    }

    fn name_matches(&self, name: &str) -> bool {
        self.name_regex.as_ref().is_none_or(|re| re.is_match(name))
    }

    pub fn matches_monitor(&self, monitor: &Monitor) -> bool {
        self.name_matches(&monitor.name)
            && matches_ignore_case(&monitor.protocol, self.protocol.as_deref())
            && self.paused.is_none_or(|p| p == monitor.paused)
            && matches_exact(&monitor.status, self.status.as_deref())
    }

    /// `status` is the type of the latest update; `severity` is the
    /// incident type.
    pub fn matches_incident(&self, incident: &Incident) -> bool {
        let latest_status = incident
            .updates
            .last()
            .map(|u| u.update_type.as_str())
            .unwrap_or_default();
        self.name_matches(&incident.title.en)
            && matches_exact(latest_status, self.status.as_deref())
            && matches_exact(&incident.incident_type, self.severity.as_deref())
    }

    /// `name_regex` matches the English title or the internal name.
    pub fn matches_maintenance(&self, mw: &Maintenance) -> bool {
        (self.name_matches(&mw.title.en) || self.name_matches(&mw.name))
            && matches_exact(&mw.status, self.status.as_deref())
    }

    /// `status` is `up` or `down`; other values match everything.
    pub fn matches_healthcheck(&self, hc: &Healthcheck) -> bool {
        let status_matches = match self.status.as_deref() {
            Some("down") => hc.is_down,
            Some("up") => !hc.is_down,
            _ => true,
        };
        self.name_matches(&hc.name) && status_matches
    }

    /// `name_regex` matches the outage's monitor name.
    pub fn matches_outage(&self, outage: &Outage) -> bool {
        self.name_matches(&outage.monitor.name)
            && matches_exact(&outage.monitor.uuid, self.monitor_uuid.as_deref())
    }

    pub fn matches_status_page(&self, page: &StatusPage) -> bool {
        self.name_matches(&page.name)
            && matches_exact(
                page.hostname.as_deref().unwrap_or_default(),
                self.hostname.as_deref(),
            )
    }
}

fn matches_exact(value: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|f| f == value)
}

fn matches_ignore_case(value: &str, filter: Option<&str>) -> bool {
    filter.is_none_or(|f| f.eq_ignore_ascii_case(value))
}

fn filter_attributes(description: &str, criteria: &[(&str, &str)]) -> Block {
    let mut block = Block::new().with_description(description).with_attribute(
        "name_regex",
        Attribute::optional_string().with_description("Regular expression to match names"),
    );
    for (name, desc) in criteria {
        block = block.with_attribute(*name, Attribute::optional_string().with_description(*desc));
    }
    block
}

/// The `filter` block with `name_regex` plus the given optional string
/// criteria.
pub fn filter_block(description: &str, criteria: &[(&str, &str)]) -> NestedBlock {
    NestedBlock::single(filter_attributes(description, criteria))
}

pub fn monitor_filter_block() -> NestedBlock {
    let block = filter_attributes(
        "Filter criteria for monitors",
        &[
            ("protocol", "Filter by protocol (case-insensitive)"),
            ("status", "Filter by status (up, down)"),
        ],
    )
    .with_attribute(
        "paused",
        Attribute::optional_bool().with_description("Filter by paused status"),
    );
    NestedBlock::single(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{IncidentUpdate, LocalizedText, MonitorReference};
    use serde_json::json;

    fn filter(value: Value) -> Filter {
        Filter::from_config(&json!({ "filter": value })).unwrap()
    }

    #[test]
    fn test_missing_filter_matches_everything() {
        let f = Filter::from_config(&json!({})).unwrap();
        assert!(f.matches_monitor(&Monitor::default()));
        assert!(f.matches_healthcheck(&Healthcheck::default()));
    }

    #[test]
    fn test_invalid_regex() {
        let err = Filter::from_config(&json!({"filter": {"name_regex": "prod-["}})).unwrap_err();
        assert_eq!(err.summary, "Invalid Filter");
        assert!(err.detail.unwrap().starts_with("Failed to compile name_regex pattern"));
    }

    #[test]
    fn test_monitor_filter() {
        let f = filter(json!({"name_regex": "^prod-", "protocol": "HTTP", "paused": false}));
        let mut monitor = Monitor {
            name: "prod-api".into(),
            protocol: "http".into(),
            ..Default::default()
        };
        assert!(f.matches_monitor(&monitor));
        monitor.paused = true;
        assert!(!f.matches_monitor(&monitor));
        monitor.paused = false;
        monitor.name = "staging-api".into();
        assert!(!f.matches_monitor(&monitor));
    }

    #[test]
    fn test_incident_filter_uses_latest_update() {
        let f = filter(json!({"status": "resolved", "severity": "outage"}));
        let incident = Incident {
            incident_type: "outage".into(),
            updates: vec![
                IncidentUpdate {
                    update_type: "investigating".into(),
                    ..Default::default()
                },
                IncidentUpdate {
                    update_type: "resolved".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert!(f.matches_incident(&incident));
        assert!(!f.matches_incident(&Incident {
            incident_type: "incident".into(),
            ..incident
        }));
    }

    #[test]
    fn test_maintenance_name_regex_checks_title_then_name() {
        let f = filter(json!({"name_regex": "db"}));
        let mw = Maintenance {
            name: "db-upgrade".into(),
            title: LocalizedText::en("Scheduled work"),
            ..Default::default()
        };
        assert!(f.matches_maintenance(&mw));
    }

    #[test]
    fn test_healthcheck_status() {
        let down = Healthcheck {
            is_down: true,
            ..Default::default()
        };
        assert!(filter(json!({"status": "down"})).matches_healthcheck(&down));
        assert!(!filter(json!({"status": "up"})).matches_healthcheck(&down));
        assert!(filter(json!({"status": "paused"})).matches_healthcheck(&down));
    }

    #[test]
    fn test_outage_and_status_page_filters() {
        let outage = Outage {
            monitor: MonitorReference {
                uuid: "mon_1".into(),
                name: "prod-api".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(filter(json!({"monitor_uuid": "mon_1", "name_regex": "api"})).matches_outage(&outage));
        assert!(!filter(json!({"monitor_uuid": "mon_2"})).matches_outage(&outage));

        let page = StatusPage {
            name: "Public".into(),
            hostname: Some("status.example.com".into()),
            ..Default::default()
        };
        assert!(filter(json!({"hostname": "status.example.com"})).matches_status_page(&page));
        assert!(!filter(json!({"hostname": "other.example.com"})).matches_status_page(&page));
    }
}

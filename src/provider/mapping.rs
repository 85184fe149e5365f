//! API object to state mapping shared by resources and data sources.
//!
//! Optional strings read back as null when the API sends nothing or an empty
//! string; the API does not tell the two apart either. Empty lists read back
//! as null.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{
    non_empty, AcknowledgedByUser, Healthcheck, Incident, Maintenance, Monitor, MonitorReference,
    Outage, RequestHeader, Subscriber,
};
use crate::schema::Diagnostic;

/// `None` for a missing or empty string.
pub fn present(value: &Option<String>) -> Option<String> {
    value.as_deref().and_then(non_empty)
}

/// `None` for an empty list.
pub fn list_or_null(items: &[String]) -> Option<Vec<String>> {
    if items.is_empty() {
        None
    } else {
        Some(items.to_vec())
    }
}

/// Monitor state. Also used for every item of `hyperping_monitors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorState {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub protocol: Option<String>,
    pub http_method: Option<String>,
    pub check_frequency: Option<i64>,
    pub regions: Option<Vec<String>>,
    /// Raw list elements; see [`parse_headers`].
    pub request_headers: Option<Vec<Value>>,
    pub request_body: Option<String>,
    pub expected_status_code: Option<String>,
    pub follow_redirects: Option<bool>,
    pub paused: Option<bool>,
    pub port: Option<i64>,
    pub alerts_wait: Option<i64>,
    pub escalation_policy: Option<String>,
    pub required_keyword: Option<String>,
    pub status: Option<String>,
    pub ssl_expiration: Option<i64>,
}

pub fn monitor_to_state(monitor: &Monitor) -> MonitorState {
    MonitorState {
        id: Some(monitor.uuid.clone()),
        name: Some(monitor.name.clone()),
        url: Some(monitor.url.clone()),
        protocol: Some(monitor.protocol.clone()),
        http_method: Some(monitor.http_method.clone()),
        check_frequency: Some(monitor.check_frequency),
        regions: list_or_null(&monitor.regions),
        request_headers: headers_to_state(&monitor.request_headers),
        request_body: non_empty(&monitor.request_body),
        expected_status_code: Some(monitor.expected_status_code.to_string()),
        follow_redirects: Some(monitor.follow_redirects),
        paused: Some(monitor.paused),
        port: monitor.port,
        alerts_wait: (monitor.alerts_wait > 0).then_some(monitor.alerts_wait),
        escalation_policy: present(&monitor.escalation_policy),
        required_keyword: present(&monitor.required_keyword),
        status: non_empty(&monitor.status),
        ssl_expiration: monitor.ssl_expiration,
    }
}

pub fn headers_to_state(headers: &[RequestHeader]) -> Option<Vec<Value>> {
    if headers.is_empty() {
        return None;
    }
    Some(
        headers
            .iter()
            .map(|h| json!({"name": h.name, "value": h.value}))
            .collect(),
    )
}

/// Read `request_headers` elements. Malformed elements are reported and
/// skipped; elements with a null name or value are dropped.
pub fn parse_headers(elements: &[Value], diagnostics: &mut Vec<Diagnostic>) -> Vec<RequestHeader> {
    let mut headers = Vec::with_capacity(elements.len());
    for element in elements {
        let Value::Object(fields) = element else {
            diagnostics.push(
                Diagnostic::error("Invalid header element")
                    .with_detail("Expected object type for header element"),
            );
            continue;
        };
        let name = match fields.get("name") {
            Some(Value::String(s)) => Some(s.clone()),
            None | Some(Value::Null) => None,
            Some(_) => {
                diagnostics.push(
                    Diagnostic::error("Invalid header name")
                        .with_detail("Expected string type for header name field"),
                );
                continue;
            },
        };
        let value = match fields.get("value") {
            Some(Value::String(s)) => Some(s.clone()),
            None | Some(Value::Null) => None,
            Some(_) => {
                diagnostics.push(
                    Diagnostic::error("Invalid header value")
                        .with_detail("Expected string type for header value field"),
                );
                continue;
            },
        };
        if let (Some(name), Some(value)) = (name, value) {
            headers.push(RequestHeader { name, value });
        }
    }
    headers
}

/// Fields every healthcheck view shares.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthcheckState {
    pub id: Option<String>,
    pub name: Option<String>,
    pub ping_url: Option<String>,
    pub cron: Option<String>,
    /// IANA zone; `tz` on the wire.
    pub timezone: Option<String>,
    pub period_value: Option<i64>,
    pub period_type: Option<String>,
    pub grace_period_value: Option<i64>,
    pub grace_period_type: Option<String>,
    pub escalation_policy: Option<String>,
    pub is_paused: Option<bool>,
    pub is_down: Option<bool>,
    pub period: Option<i64>,
    pub grace_period: Option<i64>,
    pub last_ping: Option<String>,
    pub created_at: Option<String>,
}

pub fn healthcheck_to_state(hc: &Healthcheck) -> HealthcheckState {
    HealthcheckState {
        id: Some(hc.uuid.clone()),
        name: Some(hc.name.clone()),
        ping_url: Some(hc.ping_url.clone()),
        cron: non_empty(&hc.cron),
        timezone: non_empty(&hc.tz),
        period_value: hc.period_value,
        period_type: non_empty(&hc.period_type),
        grace_period_value: Some(hc.grace_period_value),
        grace_period_type: Some(hc.grace_period_type.clone()),
        escalation_policy: hc.escalation_policy.as_ref().map(|p| p.uuid.clone()),
        is_paused: Some(hc.is_paused),
        is_down: Some(hc.is_down),
        period: Some(hc.period),
        grace_period: Some(hc.grace_period),
        last_ping: non_empty(&hc.last_ping),
        created_at: non_empty(&hc.created_at),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorReferenceState {
    pub uuid: String,
    pub name: String,
    pub url: String,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcknowledgedByState {
    pub uuid: String,
    pub email: String,
    pub name: String,
}

/// The outage's monitor summary, or `None` when the API sent an all-empty
/// reference.
pub fn monitor_reference(monitor: &MonitorReference) -> Option<MonitorReferenceState> {
    if monitor.uuid.is_empty() && monitor.name.is_empty() && monitor.url.is_empty() {
        return None;
    }
    Some(MonitorReferenceState {
        uuid: monitor.uuid.clone(),
        name: monitor.name.clone(),
        url: monitor.url.clone(),
        protocol: monitor.protocol.clone(),
    })
}

pub fn acknowledged_by(user: Option<&AcknowledgedByUser>) -> Option<AcknowledgedByState> {
    user.map(|u| AcknowledgedByState {
        uuid: u.uuid.clone(),
        email: u.email.clone(),
        name: u.name.clone(),
    })
}

/// Outage state. Also used for every item of `hyperping_outages`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutageState {
    pub id: Option<String>,
    pub monitor_uuid: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status_code: Option<i64>,
    pub description: Option<String>,
    pub escalation_policy_uuid: Option<String>,
    pub outage_type: Option<String>,
    pub is_resolved: Option<bool>,
    pub duration_ms: Option<i64>,
    pub detected_location: Option<String>,
    pub monitor: Option<MonitorReferenceState>,
    pub acknowledged_by: Option<AcknowledgedByState>,
}

pub fn outage_to_state(outage: &Outage) -> OutageState {
    OutageState {
        id: Some(outage.uuid.clone()),
        monitor_uuid: Some(outage.monitor.uuid.clone()),
        start_date: Some(outage.start_date.clone()),
        end_date: outage.end_date.clone(),
        status_code: Some(outage.status_code),
        description: Some(outage.description.clone()),
        escalation_policy_uuid: outage
            .escalation_policy
            .as_ref()
            .and_then(|p| non_empty(&p.uuid)),
        outage_type: Some(outage.outage_type.clone()),
        is_resolved: Some(outage.is_resolved),
        duration_ms: Some(outage.duration_ms),
        detected_location: Some(outage.detected_location.clone()),
        monitor: monitor_reference(&outage.monitor),
        acknowledged_by: acknowledged_by(outage.acknowledged_by.as_ref()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentState {
    pub id: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub incident_type: Option<String>,
    pub affected_components: Option<Vec<String>>,
    pub status_pages: Option<Vec<String>>,
    pub date: Option<String>,
}

/// Copy an incident onto `state`. The API does not always echo `text`, so
/// an empty text keeps whatever `state` already holds.
pub fn merge_incident(incident: &Incident, state: &mut IncidentState) {
    state.id = Some(incident.uuid.clone());
    state.title = Some(incident.title.en.clone());
    if !incident.text.en.is_empty() {
        state.text = Some(incident.text.en.clone());
    }
    state.incident_type = Some(incident.incident_type.clone());
    state.date = non_empty(&incident.date);
    state.affected_components = list_or_null(&incident.affected_components);
    state.status_pages = list_or_null(&incident.status_pages);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceState {
    pub id: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub monitors: Option<Vec<String>>,
    pub status_pages: Option<Vec<String>>,
    pub notification_option: Option<String>,
    pub notification_minutes: Option<i64>,
}

/// Copy a maintenance window onto `state`. Text and notification settings
/// the API leaves out keep their planned values.
pub fn merge_maintenance(mw: &Maintenance, state: &mut MaintenanceState) {
    state.id = Some(mw.uuid.clone());
    state.name = Some(mw.name.clone());
    state.title = non_empty(&mw.title.en);
    if !mw.text.en.is_empty() {
        state.text = Some(mw.text.en.clone());
    }
    state.start_date = mw.start_date.clone();
    state.end_date = mw.end_date.clone();
    state.monitors = list_or_null(&mw.monitors);
    state.status_pages = list_or_null(&mw.status_pages);
    if !mw.notification_option.is_empty() {
        state.notification_option = Some(mw.notification_option.clone());
    }
    if mw.notification_minutes.is_some() {
        state.notification_minutes = mw.notification_minutes;
    }
}

/// One subscriber as listed by `hyperping_statuspage_subscribers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub subscriber_type: String,
    pub value: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub slack_channel: Option<String>,
    pub language: String,
    pub created_at: String,
}

pub fn subscriber_to_item(subscriber: &Subscriber) -> SubscriberItem {
    SubscriberItem {
        id: subscriber.id,
        subscriber_type: subscriber.subscriber_type.clone(),
        value: subscriber.value.clone(),
        email: present(&subscriber.email),
        phone: present(&subscriber.phone),
        slack_channel: present(&subscriber.slack_channel),
        language: subscriber.language.clone(),
        created_at: subscriber.created_at.clone(),
    }
}

//! Partial update requests built from planned and prior state.
//!
//! A field is sent only when its planned value differs from the prior one.
//! A field going from set to unset is sent as its clearing value (empty
//! string, empty list or zero); leaving it out would keep the old value.

use crate::client::{
    LocalizedText, RequestHeader, UpdateHealthcheckRequest, UpdateIncidentRequest,
    UpdateMaintenanceRequest, UpdateMonitorRequest,
};
use crate::schema::Diagnostic;

use super::mapping::{parse_headers, HealthcheckState, IncidentState, MaintenanceState, MonitorState};

fn changed<T: PartialEq + Clone>(plan: &Option<T>, prior: &Option<T>) -> Option<Option<T>> {
    (plan != prior).then(|| plan.clone())
}

/// Changed string, with null sent as `""`.
fn clearable(plan: &Option<String>, prior: &Option<String>) -> Option<String> {
    changed(plan, prior).map(Option::unwrap_or_default)
}

pub fn monitor_update(
    plan: &MonitorState,
    prior: &MonitorState,
    diagnostics: &mut Vec<Diagnostic>,
) -> UpdateMonitorRequest {
    let request_headers = changed(&plan.request_headers, &prior.request_headers).map(|headers| {
        headers
            .map(|elements| parse_headers(&elements, diagnostics))
            .unwrap_or_default()
    });

    UpdateMonitorRequest {
        name: changed(&plan.name, &prior.name).flatten(),
        url: changed(&plan.url, &prior.url).flatten(),
        protocol: changed(&plan.protocol, &prior.protocol).flatten(),
        http_method: changed(&plan.http_method, &prior.http_method).flatten(),
        check_frequency: changed(&plan.check_frequency, &prior.check_frequency).flatten(),
        expected_status_code: changed(&plan.expected_status_code, &prior.expected_status_code)
            .flatten(),
        follow_redirects: changed(&plan.follow_redirects, &prior.follow_redirects).flatten(),
        paused: changed(&plan.paused, &prior.paused).flatten(),
        regions: changed(&plan.regions, &prior.regions).map(Option::unwrap_or_default),
        request_headers,
        request_body: clearable(&plan.request_body, &prior.request_body),
        port: changed(&plan.port, &prior.port).flatten(),
        alerts_wait: changed(&plan.alerts_wait, &prior.alerts_wait).map(|w| w.unwrap_or(0)),
        escalation_policy: clearable(&plan.escalation_policy, &prior.escalation_policy),
        required_keyword: clearable(&plan.required_keyword, &prior.required_keyword),
        ..Default::default()
    }
}

/// `None` when nothing but the pause state changed.
///
/// Clearing `period_value` (switching to cron) leaves it out; the cleared
/// `period_type` tells the API to drop period scheduling.
pub fn healthcheck_update(
    plan: &HealthcheckState,
    prior: &HealthcheckState,
) -> Option<UpdateHealthcheckRequest> {
    let req = UpdateHealthcheckRequest {
        name: changed(&plan.name, &prior.name).flatten(),
        cron: clearable(&plan.cron, &prior.cron),
        tz: clearable(&plan.timezone, &prior.timezone),
        period_value: changed(&plan.period_value, &prior.period_value).flatten(),
        period_type: clearable(&plan.period_type, &prior.period_type),
        grace_period_value: changed(&plan.grace_period_value, &prior.grace_period_value).flatten(),
        grace_period_type: changed(&plan.grace_period_type, &prior.grace_period_type).flatten(),
        escalation_policy: clearable(&plan.escalation_policy, &prior.escalation_policy),
    };
    (req != UpdateHealthcheckRequest::default()).then_some(req)
}

pub fn incident_update(plan: &IncidentState, prior: &IncidentState) -> UpdateIncidentRequest {
    UpdateIncidentRequest {
        title: changed(&plan.title, &prior.title)
            .map(|t| LocalizedText::en(t.unwrap_or_default())),
        incident_type: changed(&plan.incident_type, &prior.incident_type).flatten(),
        affected_components: changed(&plan.affected_components, &prior.affected_components)
            .map(Option::unwrap_or_default),
        status_pages: changed(&plan.status_pages, &prior.status_pages)
            .map(Option::unwrap_or_default),
    }
}

/// Title and text are only sent when set; the API has no way to clear them.
pub fn maintenance_update(
    plan: &MaintenanceState,
    prior: &MaintenanceState,
) -> UpdateMaintenanceRequest {
    UpdateMaintenanceRequest {
        name: changed(&plan.name, &prior.name).flatten(),
        title: changed(&plan.title, &prior.title)
            .flatten()
            .map(LocalizedText::en),
        text: changed(&plan.text, &prior.text).flatten().map(LocalizedText::en),
        start_date: changed(&plan.start_date, &prior.start_date).flatten(),
        end_date: changed(&plan.end_date, &prior.end_date).flatten(),
        monitors: changed(&plan.monitors, &prior.monitors).map(Option::unwrap_or_default),
    }
}

/// Headers for a create request; `None` when the list is null.
pub fn headers_for_create(
    plan: &MonitorState,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Vec<RequestHeader>> {
    plan.request_headers
        .as_ref()
        .map(|elements| parse_headers(elements, diagnostics))
}

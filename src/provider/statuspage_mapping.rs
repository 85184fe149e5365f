//! Status page mapping in both directions.
//!
//! API to state filters localized maps down to the configured languages and
//! turns empty values into null. State to API parses each service row into a
//! [`ServiceSpec`]: a group never references a monitor and a flat row never
//! carries children.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{
    non_empty, AuthenticationSettingsInput, LocalizedMap, SectionInput, ServiceInput, StatusPage,
    StatusPageRequest, StatusPageSection, StatusPageService, StatusPageSettings,
    SubscribeSettingsInput,
};
use crate::schema::Diagnostic;
use crate::types::strip_unknown;

use super::mapping::{list_or_null, present};

const HOSTED_SUFFIX: &str = ".hyperping.app";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPageState {
    pub id: Option<String>,
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub hosted_subdomain: Option<String>,
    pub url: Option<String>,
    pub password: Option<String>,
    pub settings: Option<SettingsState>,
    /// Planned sections are read raw so malformed elements can be reported;
    /// see [`sections_to_input`].
    #[serde(skip_deserializing)]
    pub sections: Option<Vec<SectionState>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsState {
    pub name: Option<String>,
    pub website: Option<String>,
    pub description: Option<LocalizedMap>,
    pub languages: Option<Vec<String>>,
    pub default_language: Option<String>,
    pub theme: Option<String>,
    pub font: Option<String>,
    pub accent_color: Option<String>,
    pub auto_refresh: Option<bool>,
    pub banner_header: Option<bool>,
    pub logo: Option<String>,
    pub logo_height: Option<String>,
    pub favicon: Option<String>,
    pub hide_powered_by: Option<bool>,
    pub hide_from_search_engines: Option<bool>,
    pub google_analytics: Option<String>,
    pub subscribe: Option<SubscribeState>,
    pub authentication: Option<AuthenticationState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeState {
    pub enabled: Option<bool>,
    pub email: Option<bool>,
    pub slack: Option<bool>,
    pub teams: Option<bool>,
    pub sms: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationState {
    pub password_protection: Option<bool>,
    pub google_sso: Option<bool>,
    pub saml_sso: Option<bool>,
    pub allowed_domains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionState {
    pub name: Option<LocalizedMap>,
    pub is_split: Option<bool>,
    pub services: Option<Vec<ServiceState>>,
}

/// A top-level service row. Children of a group are one level deep in
/// state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceState {
    #[serde(flatten)]
    pub row: ServiceRow,
    pub services: Option<Vec<ServiceRow>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceRow {
    pub id: Option<String>,
    pub uuid: Option<String>,
    pub name: Option<LocalizedMap>,
    pub is_group: Option<bool>,
    pub show_uptime: Option<bool>,
    pub show_response_times: Option<bool>,
}

/// `acme.hyperping.app` and `acme` are the same subdomain.
pub fn normalize_subdomain(subdomain: &str) -> String {
    subdomain
        .strip_suffix(HOSTED_SUFFIX)
        .unwrap_or(subdomain)
        .to_string()
}

/// Keep only the configured languages. With none configured the map is
/// returned as is.
pub fn filter_localized(map: &LocalizedMap, languages: &[String]) -> LocalizedMap {
    if languages.is_empty() {
        return map.clone();
    }
    map.iter()
        .filter(|(lang, _)| languages.contains(lang))
        .map(|(lang, text)| (lang.clone(), text.clone()))
        .collect()
}

fn localized_or_null(map: &LocalizedMap, languages: &[String]) -> Option<LocalizedMap> {
    let filtered = filter_localized(map, languages);
    (!filtered.is_empty()).then_some(filtered)
}

/// Map an API status page to state. `languages` filters every localized
/// map; pass an empty slice to keep all of them.
pub fn status_page_to_state(page: &StatusPage, languages: &[String]) -> StatusPageState {
    let sections = (!page.sections.is_empty()).then(|| {
        page.sections
            .iter()
            .map(|s| section_to_state(s, languages))
            .collect()
    });
    StatusPageState {
        id: Some(page.uuid.clone()),
        name: Some(page.name.clone()),
        hostname: present(&page.hostname),
        hosted_subdomain: Some(normalize_subdomain(&page.hosted_subdomain)),
        url: Some(page.url.clone()),
        password: None,
        settings: Some(settings_to_state(&page.settings, languages)),
        sections,
    }
}

fn settings_to_state(settings: &StatusPageSettings, languages: &[String]) -> SettingsState {
    let subscribe = &settings.subscribe;
    let auth = &settings.authentication;
    SettingsState {
        name: Some(settings.name.clone()),
        website: Some(settings.website.clone()),
        description: localized_or_null(&settings.description, languages),
        languages: list_or_null(&settings.languages),
        default_language: Some(settings.default_language.clone()),
        theme: Some(settings.theme.clone()),
        font: Some(settings.font.clone()),
        accent_color: Some(settings.accent_color.clone()),
        auto_refresh: Some(settings.auto_refresh),
        banner_header: Some(settings.banner_header),
        logo: present(&settings.logo),
        logo_height: Some(settings.logo_height.clone()),
        favicon: present(&settings.favicon),
        hide_powered_by: Some(settings.hide_powered_by),
        hide_from_search_engines: Some(settings.hide_from_search_engines),
        google_analytics: present(&settings.google_analytics),
        subscribe: Some(SubscribeState {
            enabled: Some(subscribe.enabled),
            email: Some(subscribe.email),
            slack: Some(subscribe.slack),
            teams: Some(subscribe.teams),
            sms: Some(subscribe.sms),
        }),
        authentication: Some(AuthenticationState {
            password_protection: Some(auth.password_protection),
            google_sso: Some(auth.google_sso),
            saml_sso: Some(auth.saml_sso),
            allowed_domains: list_or_null(&auth.allowed_domains),
        }),
    }
}

fn section_to_state(section: &StatusPageSection, languages: &[String]) -> SectionState {
    let services = (!section.services.is_empty()).then(|| {
        section
            .services
            .iter()
            .map(|svc| ServiceState {
                row: service_row(svc, languages),
                services: (!svc.services.is_empty()).then(|| {
                    svc.services
                        .iter()
                        .map(|child| service_row(child, languages))
                        .collect()
                }),
            })
            .collect()
    });
    SectionState {
        name: localized_or_null(&section.name, languages),
        is_split: Some(section.is_split),
        services,
    }
}

fn service_row(svc: &StatusPageService, languages: &[String]) -> ServiceRow {
    ServiceRow {
        id: Some(svc.id.clone()),
        uuid: non_empty(&svc.uuid),
        name: localized_or_null(&svc.name, languages),
        is_group: Some(svc.is_group),
        show_uptime: Some(svc.show_uptime),
        show_response_times: Some(svc.show_response_times),
    }
}

/// Map a status page for a resource: languages come from the planned
/// settings, the planned `settings.name` wins over the API's, and display
/// toggles planned `true` stay `true` when the API echoes `false`.
pub fn status_page_to_resource_state(
    page: &StatusPage,
    plan: &StatusPageState,
    plan_sections: Option<&[Value]>,
) -> StatusPageState {
    let languages = plan
        .settings
        .as_ref()
        .and_then(|s| s.languages.clone())
        .unwrap_or_default();
    let mut state = status_page_to_state(page, &languages);
    state.password = plan.password.clone();

    let plan_name = plan.settings.as_ref().and_then(|s| s.name.clone());
    if let (Some(name), Some(settings)) = (plan_name, state.settings.as_mut()) {
        settings.name = Some(name);
    }

    if let (Some(planned), Some(sections)) = (plan_sections, state.sections.as_mut()) {
        preserve_service_flags(sections, planned);
    }
    state
}

/// Only applies when section and service counts line up with the plan.
fn preserve_service_flags(sections: &mut [SectionState], planned: &[Value]) {
    if sections.len() != planned.len() {
        return;
    }
    for (section, plan) in sections.iter_mut().zip(planned) {
        let Some(plan_services) = plan.get("services").and_then(Value::as_array) else {
            continue;
        };
        let Some(services) = section.services.as_mut() else {
            continue;
        };
        if services.len() != plan_services.len() {
            continue;
        }
        for (svc, plan_svc) in services.iter_mut().zip(plan_services) {
            keep_planned_true(&mut svc.row.show_uptime, plan_svc.get("show_uptime"));
            keep_planned_true(
                &mut svc.row.show_response_times,
                plan_svc.get("show_response_times"),
            );
        }
    }
}

fn keep_planned_true(value: &mut Option<bool>, planned: Option<&Value>) {
    if *value == Some(false) && planned.and_then(Value::as_bool) == Some(true) {
        *value = Some(true);
    }
}

/// Display settings shared by both kinds of service row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDisplay {
    pub name_shown: Option<String>,
    pub show_uptime: Option<bool>,
    pub show_response_times: Option<bool>,
}

/// A configured service row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceSpec {
    /// Shows a single monitor.
    Flat {
        uuid: Option<String>,
        display: ServiceDisplay,
    },
    /// A container of other rows.
    Group {
        display: ServiceDisplay,
        children: Vec<ServiceSpec>,
    },
}

impl ServiceSpec {
    /// Top-level rows reference their monitor through `monitor_uuid`;
    /// nested rows through `uuid`.
    pub fn to_input(&self, nested: bool) -> ServiceInput {
        match self {
            Self::Flat { uuid, display } => {
                let (monitor_uuid, uuid) = if nested {
                    (None, uuid.clone())
                } else {
                    (uuid.clone(), None)
                };
                ServiceInput {
                    monitor_uuid,
                    uuid,
                    name_shown: display.name_shown.clone(),
                    show_uptime: display.show_uptime,
                    show_response_times: display.show_response_times,
                    is_group: None,
                    services: Vec::new(),
                }
            },
            Self::Group { display, children } => ServiceInput {
                monitor_uuid: None,
                uuid: None,
                name_shown: display.name_shown.clone(),
                show_uptime: display.show_uptime,
                show_response_times: display.show_response_times,
                is_group: Some(true),
                services: children.iter().map(|c| c.to_input(true)).collect(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSection {
    name: Option<LocalizedMap>,
    is_split: Option<bool>,
    services: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawService {
    uuid: Option<String>,
    name: Option<LocalizedMap>,
    is_group: Option<bool>,
    show_uptime: Option<bool>,
    show_response_times: Option<bool>,
    services: Option<Vec<Value>>,
}

/// The English text, else the first one.
fn primary_text(map: &LocalizedMap) -> Option<String> {
    map.get("en").or_else(|| map.values().next()).cloned()
}

fn element_error(kind: &str, path: String, detail: String) -> Diagnostic {
    Diagnostic::error(format!("Invalid {} element", kind))
        .with_detail(detail)
        .with_attribute(path)
}

/// Parse one list element as an object. Anything else is reported and
/// skipped.
fn parse_element<T: serde::de::DeserializeOwned>(
    kind: &str,
    value: &Value,
    path: String,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<T> {
    if !value.is_object() {
        diagnostics.push(element_error(
            kind,
            path,
            format!("Expected object type for {} element", kind),
        ));
        return None;
    }
    match serde_json::from_value(strip_unknown(value)) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            diagnostics.push(element_error(kind, path, e.to_string()));
            None
        },
    }
}

/// Parse a configured service row.
pub fn parse_service(
    value: &Value,
    path: String,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ServiceSpec> {
    let raw: RawService = parse_element("service", value, path.clone(), diagnostics)?;
    let display = ServiceDisplay {
        name_shown: raw.name.as_ref().and_then(primary_text),
        show_uptime: raw.show_uptime,
        show_response_times: raw.show_response_times,
    };
    if raw.is_group == Some(true) {
        let children = parse_services(
            raw.services.as_deref().unwrap_or_default(),
            &format!("{}.services", path),
            diagnostics,
        );
        return Some(ServiceSpec::Group { display, children });
    }
    Some(ServiceSpec::Flat {
        uuid: raw.uuid.as_deref().and_then(non_empty),
        display,
    })
}

fn parse_services(
    elements: &[Value],
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ServiceSpec> {
    elements
        .iter()
        .enumerate()
        .filter_map(|(i, v)| parse_service(v, format!("{}[{}]", path, i), diagnostics))
        .collect()
}

/// Build the outbound sections from the planned `sections` list.
pub fn sections_to_input(elements: &[Value], diagnostics: &mut Vec<Diagnostic>) -> Vec<SectionInput> {
    elements
        .iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let path = format!("sections[{}]", i);
            let raw: RawSection = parse_element("section", value, path.clone(), diagnostics)?;
            let services = parse_services(
                raw.services.as_deref().unwrap_or_default(),
                &format!("{}.services", path),
                diagnostics,
            );
            Some(SectionInput {
                name: raw.name.as_ref().and_then(primary_text).unwrap_or_default(),
                is_split: raw.is_split,
                services: services.iter().map(|s| s.to_input(false)).collect(),
            })
        })
        .collect()
}

fn apply_settings(settings: &SettingsState, req: &mut StatusPageRequest) {
    req.website = settings.website.clone();
    req.theme = settings.theme.clone();
    req.font = settings.font.clone();
    req.accent_color = settings.accent_color.clone();
    req.logo = settings.logo.clone();
    req.logo_height = settings.logo_height.clone();
    req.favicon = settings.favicon.clone();
    req.google_analytics = settings.google_analytics.clone();
    req.auto_refresh = settings.auto_refresh;
    req.banner_header = settings.banner_header;
    req.hide_powered_by = settings.hide_powered_by;
    req.hide_from_search_engines = settings.hide_from_search_engines;
    req.description = settings.description.clone().unwrap_or_default();
    req.languages = settings.languages.clone().unwrap_or_default();
    req.subscribe = settings.subscribe.as_ref().map(|s| SubscribeSettingsInput {
        enabled: s.enabled,
        email: s.email,
        slack: s.slack,
        teams: s.teams,
        sms: s.sms,
    });
    req.authentication = settings
        .authentication
        .as_ref()
        .map(|a| AuthenticationSettingsInput {
            password_protection: a.password_protection,
            google_sso: a.google_sso,
            saml_sso: a.saml_sso,
            allowed_domains: a.allowed_domains.clone().unwrap_or_default(),
        });
}

/// Body for create and update. Null values are left out.
pub fn status_page_request(
    plan: &StatusPageState,
    plan_sections: Option<&[Value]>,
    diagnostics: &mut Vec<Diagnostic>,
) -> StatusPageRequest {
    let mut req = StatusPageRequest {
        name: plan.name.clone(),
        subdomain: plan.hosted_subdomain.clone(),
        hostname: plan.hostname.clone(),
        password: plan.password.clone(),
        ..Default::default()
    };
    if let Some(settings) = &plan.settings {
        apply_settings(settings, &mut req);
    }
    if let Some(sections) = plan_sections {
        req.sections = sections_to_input(sections, diagnostics);
    }
    req
}

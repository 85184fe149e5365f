//! Status pages and their subscribers: `/v2/statuspages`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::ClientError;
use super::models::{
    nullable, validate_string_length, ALLOWED_LANGUAGES, ALLOWED_SUBSCRIBER_TYPES,
    MAX_NAME_LENGTH, MAX_URL_LENGTH,
};
use super::{validate_resource_id, with_query, HyperpingClient};

const STATUSPAGES_PATH: &str = "/v2/statuspages";

/// Language code to text.
pub type LocalizedMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPage {
    pub uuid: String,
    pub name: String,
    /// Custom domain.
    pub hostname: Option<String>,
    /// e.g. `acme.hyperping.app`.
    #[serde(rename = "hostedsubdomain", deserialize_with = "nullable")]
    pub hosted_subdomain: String,
    #[serde(deserialize_with = "nullable")]
    pub url: String,
    pub password_protected: bool,
    #[serde(deserialize_with = "nullable")]
    pub settings: StatusPageSettings,
    #[serde(deserialize_with = "nullable")]
    pub sections: Vec<StatusPageSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPageSettings {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub website: String,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub description: LocalizedMap,
    #[serde(deserialize_with = "nullable")]
    pub languages: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub default_language: String,
    #[serde(deserialize_with = "nullable")]
    pub theme: String,
    #[serde(deserialize_with = "nullable")]
    pub font: String,
    #[serde(deserialize_with = "nullable")]
    pub accent_color: String,
    pub auto_refresh: bool,
    pub banner_header: bool,
    pub logo: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub logo_height: String,
    pub favicon: Option<String>,
    pub hide_powered_by: bool,
    pub hide_from_search_engines: bool,
    pub google_analytics: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub subscribe: SubscribeSettings,
    #[serde(deserialize_with = "nullable")]
    pub authentication: AuthenticationSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeSettings {
    pub enabled: bool,
    pub email: bool,
    pub slack: bool,
    pub teams: bool,
    pub sms: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationSettings {
    pub password_protection: bool,
    pub google_sso: bool,
    pub saml_sso: bool,
    #[serde(deserialize_with = "nullable")]
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPageSection {
    #[serde(deserialize_with = "nullable")]
    pub name: LocalizedMap,
    pub is_split: bool,
    #[serde(deserialize_with = "nullable")]
    pub services: Vec<StatusPageService>,
}

/// A service row as the API returns it. Groups carry nested `services` and
/// an empty `uuid`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPageService {
    #[serde(deserialize_with = "service_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub uuid: String,
    #[serde(deserialize_with = "nullable")]
    pub name: LocalizedMap,
    pub is_group: bool,
    pub show_uptime: bool,
    pub show_response_times: bool,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<StatusPageService>,
}

/// Service ids come back as strings on some pages and as numbers on
/// others. Integral numbers lose any `.0`.
fn service_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                Ok(format!("{:.0}", n.as_f64().unwrap_or_default()))
            }
        }
        other => Err(D::Error::custom(format!(
            "service id must be a string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusPageList {
    #[serde(rename = "statuspages", deserialize_with = "nullable")]
    pub status_pages: Vec<StatusPage>,
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    pub total: i64,
    pub page: i64,
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscribeSettingsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthenticationSettingsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_sso: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saml_sso: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionInput {
    /// Text in the page's default language.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_split: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceInput>,
}

/// Outbound service row. Top-level rows point at a monitor through
/// `monitor_uuid`; rows nested under a group carry their own `uuid`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_shown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_uptime: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_response_times: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceInput>,
}

/// Body for both create (POST) and update (PUT). On update every unset
/// field is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusPageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub description: LocalizedMap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_refresh: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_powered_by: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_from_search_engines: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_analytics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<SubscribeSettingsInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationSettingsInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<SectionInput>,
}

impl StatusPageRequest {
    pub fn validate(&self) -> Result<(), ClientError> {
        if let Some(name) = &self.name {
            validate_string_length("name", name, MAX_NAME_LENGTH)?;
        }
        if let Some(website) = &self.website {
            validate_string_length("website", website, MAX_URL_LENGTH)?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct StatusPageEnvelope {
    #[serde(rename = "statuspage", default)]
    status_page: StatusPage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subscriber {
    pub id: i64,
    /// `email`, `sms`, `slack` or `teams`.
    #[serde(rename = "type")]
    pub subscriber_type: String,
    #[serde(deserialize_with = "nullable")]
    pub value: String,
    #[serde(deserialize_with = "nullable")]
    pub language: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub slack_channel: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberList {
    #[serde(deserialize_with = "nullable")]
    pub subscribers: Vec<Subscriber>,
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    pub total: i64,
    pub page: i64,
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddSubscriberRequest {
    #[serde(rename = "type")]
    pub subscriber_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams_webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

fn missing(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

impl AddSubscriberRequest {
    pub fn validate(&self) -> Result<(), ClientError> {
        if !ALLOWED_SUBSCRIBER_TYPES.contains(&self.subscriber_type.as_str()) {
            return Err(ClientError::InvalidInput(format!(
                "invalid subscriber type {:?}, must be one of: {:?}",
                self.subscriber_type, ALLOWED_SUBSCRIBER_TYPES
            )));
        }
        let required = match self.subscriber_type.as_str() {
            "email" if missing(&self.email) => Some("email"),
            "sms" if missing(&self.phone) => Some("phone"),
            "teams" if missing(&self.teams_webhook_url) => Some("teams_webhook_url"),
            _ => None,
        };
        if let Some(field) = required {
            return Err(ClientError::InvalidInput(format!(
                "{} is required when type is '{}'",
                field, self.subscriber_type
            )));
        }
        if let Some(language) = &self.language {
            if !ALLOWED_LANGUAGES.contains(&language.as_str()) {
                return Err(ClientError::InvalidInput(format!(
                    "invalid language {:?}, must be one of: {:?}",
                    language, ALLOWED_LANGUAGES
                )));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct SubscriberEnvelope {
    #[serde(default)]
    subscriber: Subscriber,
}

impl HyperpingClient {
    pub async fn list_status_pages(
        &self,
        page: Option<i64>,
        search: Option<&str>,
    ) -> Result<StatusPageList, ClientError> {
        let mut params = Vec::new();
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        self.get(&with_query(STATUSPAGES_PATH.to_string(), &params))
            .await
            .map_err(|e| e.context("failed to list status pages"))
    }

    pub async fn get_status_page(&self, id: &str) -> Result<StatusPage, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("GetStatusPage"))?;
        self.get::<StatusPageEnvelope>(&format!("{}/{}", STATUSPAGES_PATH, id))
            .await
            .map(|env| env.status_page)
            .map_err(|e| e.context(format!("failed to get status page {}", id)))
    }

    pub async fn create_status_page(
        &self,
        req: &StatusPageRequest,
    ) -> Result<StatusPage, ClientError> {
        req.validate().map_err(|e| e.context("CreateStatusPage"))?;
        self.post::<_, StatusPageEnvelope>(STATUSPAGES_PATH, req)
            .await
            .map(|env| env.status_page)
            .map_err(|e| e.context("failed to create status page"))
    }

    pub async fn update_status_page(
        &self,
        id: &str,
        req: &StatusPageRequest,
    ) -> Result<StatusPage, ClientError> {
        validate_resource_id(id).map_err(|e| e.context("UpdateStatusPage"))?;
        self.put::<_, StatusPageEnvelope>(&format!("{}/{}", STATUSPAGES_PATH, id), req)
            .await
            .map(|env| env.status_page)
            .map_err(|e| e.context(format!("failed to update status page {}", id)))
    }

    pub async fn delete_status_page(&self, id: &str) -> Result<(), ClientError> {
        validate_resource_id(id).map_err(|e| e.context("DeleteStatusPage"))?;
        self.delete(&format!("{}/{}", STATUSPAGES_PATH, id))
            .await
            .map_err(|e| e.context(format!("failed to delete status page {}", id)))
    }

    /// `subscriber_type` of `all` (or `None`) lists every type.
    pub async fn list_subscribers(
        &self,
        status_page: &str,
        page: Option<i64>,
        subscriber_type: Option<&str>,
    ) -> Result<SubscriberList, ClientError> {
        validate_resource_id(status_page).map_err(|e| e.context("ListSubscribers"))?;
        let mut params = Vec::new();
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        if let Some(kind) = subscriber_type.filter(|t| !t.is_empty() && *t != "all") {
            params.push(("type", kind.to_string()));
        }
        let path = with_query(
            format!("{}/{}/subscribers", STATUSPAGES_PATH, status_page),
            &params,
        );
        self.get(&path).await.map_err(|e| {
            e.context(format!(
                "failed to list subscribers for status page {}",
                status_page
            ))
        })
    }

    pub async fn add_subscriber(
        &self,
        status_page: &str,
        req: &AddSubscriberRequest,
    ) -> Result<Subscriber, ClientError> {
        validate_resource_id(status_page).map_err(|e| e.context("AddSubscriber"))?;
        if req.subscriber_type == "slack" {
            return Err(ClientError::InvalidInput(
                "slack subscribers cannot be added via API - they must use the OAuth flow through the Hyperping dashboard"
                    .to_string(),
            ));
        }
        req.validate().map_err(|e| e.context("AddSubscriber"))?;
        self.post::<_, SubscriberEnvelope>(
            &format!("{}/{}/subscribers", STATUSPAGES_PATH, status_page),
            req,
        )
        .await
        .map(|env| env.subscriber)
        .map_err(|e| {
            e.context(format!(
                "failed to add subscriber to status page {}",
                status_page
            ))
        })
    }

    pub async fn delete_subscriber(
        &self,
        status_page: &str,
        subscriber_id: i64,
    ) -> Result<(), ClientError> {
        validate_resource_id(status_page).map_err(|e| e.context("DeleteSubscriber"))?;
        if subscriber_id <= 0 {
            return Err(ClientError::InvalidInput(format!(
                "subscriber ID must be positive (got {})",
                subscriber_id
            ))
            .context("DeleteSubscriber"));
        }
        self.delete(&format!(
            "{}/{}/subscribers/{}",
            STATUSPAGES_PATH, status_page, subscriber_id
        ))
        .await
        .map_err(|e| {
            e.context(format!(
                "failed to delete subscriber {} from status page {}",
                subscriber_id, status_page
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::MockHttpTransport;
    use super::*;
    use reqwest::Method;
    use serde_json::json;

    fn statuspage_json() -> Value {
        json!({
            "uuid": "sp_main",
            "name": "Acme Status",
            "hostname": null,
            "hostedsubdomain": "acme.hyperping.app",
            "url": "https://acme.hyperping.app",
            "password_protected": false,
            "settings": {
                "name": "Acme Status",
                "languages": ["en", "fr"],
                "default_language": "en",
                "theme": "dark",
                "font": "Inter",
                "accent_color": "#36b27e",
                "logo": null,
                "subscribe": {"enabled": true, "email": true},
                "authentication": {"allowed_domains": null}
            },
            "sections": [{
                "name": {"en": "API", "fr": "API"},
                "is_split": true,
                "services": [
                    {"id": 42, "uuid": "mon_1", "name": {"en": "REST"}, "is_group": false, "show_uptime": true},
                    {"id": "grp_1", "uuid": "", "name": {"en": "Edge"}, "is_group": true,
                     "services": [{"id": 7.0, "uuid": "mon_2", "name": {"en": "CDN"}}]}
                ]
            }]
        })
    }

    #[test]
    fn test_statuspage_decodes_mixed_service_ids() {
        let page: StatusPage = serde_json::from_value(statuspage_json()).unwrap();
        let services = &page.sections[0].services;
        assert_eq!(services[0].id, "42");
        assert_eq!(services[1].id, "grp_1");
        assert_eq!(services[1].services[0].id, "7");
        assert_eq!(page.hostname, None);
        assert!(page.settings.authentication.allowed_domains.is_empty());
    }

    #[test]
    fn test_float_service_ids_drop_decimals() {
        for (raw, expected) in [(json!(12.0), "12"), (json!(7.5), "8"), (json!(3.2), "3")] {
            let svc: StatusPageService = serde_json::from_value(json!({"id": raw})).unwrap();
            assert_eq!(svc.id, expected);
        }
    }

    #[test]
    fn test_service_id_rejects_objects() {
        let err = serde_json::from_value::<StatusPageService>(json!({"id": {"x": 1}})).unwrap_err();
        assert!(err.to_string().contains("service id must be a string or number"));
    }

    #[test]
    fn test_nested_service_input_uses_uuid_field() {
        let group = ServiceInput {
            is_group: Some(true),
            name_shown: Some("Edge".into()),
            services: vec![ServiceInput {
                uuid: Some("mon_2".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"name_shown": "Edge", "is_group": true, "services": [{"uuid": "mon_2"}]})
        );
    }

    #[tokio::test]
    async fn test_list_status_pages_query() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| path_of(r) == "/v2/statuspages?page=2&search=acme+status")
            .returning(|_| {
                Box::pin(async {
                    ok(json!({"statuspages": [statuspage_json()], "hasNextPage": true, "total": 11, "page": 2, "resultsPerPage": 10}))
                })
            });

        let list = client(mock)
            .list_status_pages(Some(2), Some("acme status"))
            .await
            .unwrap();
        assert!(list.has_next_page);
        assert_eq!(list.status_pages.len(), 1);
    }

    #[tokio::test]
    async fn test_create_status_page_unwraps_envelope() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::POST
                    && r.json_body() == Some(json!({"name": "Acme Status", "subdomain": "acme"}))
            })
            .returning(|_| {
                Box::pin(async { ok(json!({"message": "created", "statuspage": statuspage_json()})) })
            });

        let req = StatusPageRequest {
            name: Some("Acme Status".into()),
            subdomain: Some("acme".into()),
            ..Default::default()
        };
        let page = client(mock).create_status_page(&req).await.unwrap();
        assert_eq!(page.uuid, "sp_main");
    }

    #[tokio::test]
    async fn test_list_subscribers_omits_all_type() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| path_of(r) == "/v2/statuspages/sp_main/subscribers")
            .times(1)
            .returning(|_| Box::pin(async { ok(json!({"subscribers": null})) }));
        mock.expect_send()
            .withf(|r| path_of(r) == "/v2/statuspages/sp_main/subscribers?page=1&type=sms")
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(json!({"subscribers": [{"id": 3, "type": "sms", "value": "+33600000000", "phone": "+33600000000"}]}))
                })
            });

        let c = client(mock);
        assert!(c
            .list_subscribers("sp_main", None, Some("all"))
            .await
            .unwrap()
            .subscribers
            .is_empty());
        let sms = c.list_subscribers("sp_main", Some(1), Some("sms")).await.unwrap();
        assert_eq!(sms.subscribers[0].phone.as_deref(), Some("+33600000000"));
    }

    #[tokio::test]
    async fn test_add_subscriber_rules() {
        let c = client(MockHttpTransport::new());

        let slack = AddSubscriberRequest {
            subscriber_type: "slack".into(),
            ..Default::default()
        };
        let err = c.add_subscriber("sp_main", &slack).await.unwrap_err();
        assert!(err.to_string().starts_with("slack subscribers cannot be added via API"));

        let email = AddSubscriberRequest {
            subscriber_type: "email".into(),
            email: Some(String::new()),
            ..Default::default()
        };
        let err = c.add_subscriber("sp_main", &email).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "AddSubscriber: email is required when type is 'email'"
        );

        let bad_lang = AddSubscriberRequest {
            subscriber_type: "teams".into(),
            teams_webhook_url: Some("https://example.webhook.office.com/x".into()),
            language: Some("xx".into()),
            ..Default::default()
        };
        assert!(bad_lang.validate().unwrap_err().to_string().contains("invalid language \"xx\""));
    }

    #[tokio::test]
    async fn test_delete_subscriber_requires_positive_id() {
        let err = client(MockHttpTransport::new())
            .delete_subscriber("sp_main", 0)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "DeleteSubscriber: subscriber ID must be positive (got 0)"
        );
    }
}

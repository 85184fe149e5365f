//! Status page lookups and listings, plus the subscribers of a page.
//!
//! Listing is paginated by the API: `page` and `search` go to the server,
//! `filter` is applied to the returned page only.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{HyperpingClient, StatusPage};
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, Block, Diagnostic, NestedBlock, Schema};
use crate::types::StateResponse;
use crate::validators::Validator;

use crate::provider::diagnostics::{list_error, read_error};
use crate::provider::filters::{filter_block, Filter};
use crate::provider::mapping::{subscriber_to_item, SubscriberItem};
use crate::provider::statuspage_mapping::status_page_to_state;
use crate::provider::{parse_state, to_state, DataSource};

use super::{config_object, filter_diagnostics, lookup_id, lookup_schema};

const SUBSCRIBER_FILTER_TYPES: &[&str] = &["email", "sms", "slack", "teams", "all"];

/// A status page as data, without the write-only password.
fn page_value(page: &StatusPage) -> Result<Value> {
    let mut value = to_state(&status_page_to_state(page, &[]))?;
    if let Value::Object(map) = &mut value {
        map.remove("password");
    }
    Ok(value)
}

fn service_item(block: Block) -> Block {
    block
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("uuid", Attribute::computed_string())
        .with_attribute("name", Attribute::string_map(AttributeFlags::computed()))
        .with_attribute("is_group", Attribute::computed_bool())
        .with_attribute("show_uptime", Attribute::computed_bool())
        .with_attribute("show_response_times", Attribute::computed_bool())
}

fn settings_item() -> NestedBlock {
    let subscribe = NestedBlock::single(
        Block::new()
            .with_attribute("enabled", Attribute::computed_bool())
            .with_attribute("email", Attribute::computed_bool())
            .with_attribute("slack", Attribute::computed_bool())
            .with_attribute("teams", Attribute::computed_bool())
            .with_attribute("sms", Attribute::computed_bool()),
    )
    .computed();
    let authentication = NestedBlock::single(
        Block::new()
            .with_attribute("password_protection", Attribute::computed_bool())
            .with_attribute("google_sso", Attribute::computed_bool())
            .with_attribute("saml_sso", Attribute::computed_bool())
            .with_attribute(
                "allowed_domains",
                Attribute::string_list(AttributeFlags::computed()),
            ),
    )
    .computed();
    NestedBlock::single(
        Block::new()
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("website", Attribute::computed_string())
            .with_attribute("description", Attribute::string_map(AttributeFlags::computed()))
            .with_attribute("languages", Attribute::string_list(AttributeFlags::computed()))
            .with_attribute("default_language", Attribute::computed_string())
            .with_attribute("theme", Attribute::computed_string())
            .with_attribute("font", Attribute::computed_string())
            .with_attribute("accent_color", Attribute::computed_string())
            .with_attribute("auto_refresh", Attribute::computed_bool())
            .with_attribute("banner_header", Attribute::computed_bool())
            .with_attribute("logo", Attribute::computed_string())
            .with_attribute("logo_height", Attribute::computed_string())
            .with_attribute("favicon", Attribute::computed_string())
            .with_attribute("hide_powered_by", Attribute::computed_bool())
            .with_attribute("hide_from_search_engines", Attribute::computed_bool())
            .with_attribute("google_analytics", Attribute::computed_string())
            .with_block("subscribe", subscribe)
            .with_block("authentication", authentication),
    )
    .computed()
}

fn status_page_item() -> Block {
    let child = NestedBlock::list(service_item(Block::new())).computed();
    let services =
        NestedBlock::list(service_item(Block::new()).with_block("services", child)).computed();
    let sections = NestedBlock::list(
        Block::new()
            .with_attribute("name", Attribute::string_map(AttributeFlags::computed()))
            .with_attribute("is_split", Attribute::computed_bool())
            .with_block("services", services),
    )
    .computed();
    Block::new()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("name", Attribute::computed_string())
        .with_attribute("hostname", Attribute::computed_string())
        .with_attribute("hosted_subdomain", Attribute::computed_string())
        .with_attribute("url", Attribute::computed_string())
        .with_block("settings", settings_item())
        .with_block("sections", sections)
}

pub(crate) struct StatusPageDataSource;

#[async_trait]
impl DataSource for StatusPageDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_statuspage"
    }

    fn schema(&self) -> Schema {
        lookup_schema(status_page_item())
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let id = lookup_id(&config)?;
        let page = client
            .get_status_page(&id)
            .await
            .map_err(|e| read_error("Status Page", &id, &e))?;
        Ok(StateResponse::new(page_value(&page)?))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListStatusPagesConfig {
    page: Option<i64>,
    search: Option<String>,
}

pub(crate) struct StatusPagesDataSource;

#[async_trait]
impl DataSource for StatusPagesDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_statuspages"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "page",
                Attribute::optional_int64()
                    .with_description("Page number, starting at 0")
                    .with_validator(Validator::Int64AtLeast(0)),
            )
            .with_attribute(
                "search",
                Attribute::optional_string().with_description("Server-side search on name"),
            )
            .with_attribute("has_next_page", Attribute::computed_bool())
            .with_attribute("total", Attribute::computed_int64())
            .with_block(
                "statuspages",
                NestedBlock::list(status_page_item()).computed(),
            )
            .with_block(
                "filter",
                filter_block(
                    "Filter criteria applied to the returned page",
                    &[("hostname", "Exact custom domain")],
                ),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        filter_diagnostics(config)
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let input: ListStatusPagesConfig = parse_state(&config)?;
        let filter = Filter::from_config(&config)?;
        let list = client
            .list_status_pages(input.page, input.search.as_deref())
            .await
            .map_err(|e| list_error("Status Pages", &e))?;
        let pages = list
            .status_pages
            .iter()
            .filter(|p| filter.matches_status_page(p))
            .map(page_value)
            .collect::<Result<Vec<_>>>()?;
        debug!(
            returned = list.status_pages.len(),
            matched = pages.len(),
            total = list.total,
            "Listed status pages"
        );

        let mut state = config_object(&config);
        state.insert("has_next_page".to_string(), json!(list.has_next_page));
        state.insert("total".to_string(), json!(list.total));
        state.insert("statuspages".to_string(), Value::Array(pages));
        Ok(StateResponse::new(Value::Object(state)))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListSubscribersConfig {
    statuspage_uuid: String,
    #[serde(rename = "type")]
    subscriber_type: Option<String>,
    page: Option<i64>,
}

pub(crate) struct SubscribersDataSource;

#[async_trait]
impl DataSource for SubscribersDataSource {
    fn type_name(&self) -> &'static str {
        "hyperping_statuspage_subscribers"
    }

    fn schema(&self) -> Schema {
        let subscriber = Block::new()
            .with_attribute("id", Attribute::computed_int64())
            .with_attribute("type", Attribute::computed_string())
            .with_attribute("value", Attribute::computed_string())
            .with_attribute("email", Attribute::computed_string())
            .with_attribute("phone", Attribute::computed_string())
            .with_attribute("slack_channel", Attribute::computed_string())
            .with_attribute("language", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string());
        Schema::v0()
            .with_attribute(
                "statuspage_uuid",
                Attribute::required_string().with_validator(Validator::ResourceId),
            )
            .with_attribute(
                "type",
                Attribute::optional_string()
                    .with_description("Only subscribers of this type; all lists every type")
                    .with_validator(Validator::OneOf(SUBSCRIBER_FILTER_TYPES)),
            )
            .with_attribute(
                "page",
                Attribute::optional_int64().with_validator(Validator::Int64AtLeast(0)),
            )
            .with_attribute("has_next_page", Attribute::computed_bool())
            .with_attribute("total", Attribute::computed_int64())
            .with_block("subscribers", NestedBlock::list(subscriber).computed())
    }

    async fn read(&self, client: &HyperpingClient, config: Value) -> Result<StateResponse> {
        let input: ListSubscribersConfig = parse_state(&config)?;
        let list = client
            .list_subscribers(
                &input.statuspage_uuid,
                input.page,
                input.subscriber_type.as_deref(),
            )
            .await
            .map_err(|e| list_error("Subscribers", &e))?;
        let subscribers: Vec<SubscriberItem> =
            list.subscribers.iter().map(subscriber_to_item).collect();
        debug!(
            statuspage = %input.statuspage_uuid,
            count = subscribers.len(),
            "Listed subscribers"
        );

        let mut state = config_object(&config);
        state.insert("has_next_page".to_string(), json!(list.has_next_page));
        state.insert("total".to_string(), json!(list.total));
        state.insert("subscribers".to_string(), serde_json::to_value(&subscribers)?);
        Ok(StateResponse::new(Value::Object(state)))
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
    async fn test_list_applies_filter_to_page() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v2/statuspages?page=1&search=acme")
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(json!({
                        "statuspages": [
                            {"uuid": "sp_acmemain", "name": "Acme", "hostname": "status.acme.com",
                             "hostedsubdomain": "acme.hyperping.app",
                             "settings": {"languages": ["en", "fr"], "description": {"en": "Hi", "fr": "Salut"}}},
                            {"uuid": "sp_acmelabs", "name": "Acme Labs", "hostedsubdomain": "acme-labs"}
                        ],
                        "hasNextPage": true,
                        "total": 7
                    }))
                })
            });
        let tester = tester(mock).await;

        let read = tester
            .read_data_source(
                "hyperping_statuspages",
                json!({"page": 1, "search": "acme", "filter": {"hostname": "status.acme.com"}}),
            )
            .await
            .unwrap();
        assert_eq!(read.state["has_next_page"], true);
        assert_eq!(read.state["total"], 7);
        let pages = read.state["statuspages"].as_array().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0]["hosted_subdomain"], "acme");
        assert_eq!(pages[0]["settings"]["description"]["fr"], "Salut");
        assert!(pages[0].get("password").is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_id() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| r.method == Method::GET && path_of(r) == "/v2/statuspages/sp_acmemain")
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(json!({"statuspage": {"uuid": "sp_acmemain", "name": "Acme",
                        "sections": [{"name": {"en": "API"}, "services": [
                            {"id": 42, "uuid": "mon_api001", "name": {"en": "REST"}}
                        ]}]}}))
                })
            });
        let tester = tester(mock).await;

        let read = tester
            .read_data_source("hyperping_statuspage", json!({"id": "sp_acmemain"}))
            .await
            .unwrap();
        assert_eq!(read.state["name"], "Acme");
        assert_eq!(read.state["sections"][0]["services"][0]["id"], "42");
        assert!(read.state["hostname"].is_null());
    }

    #[tokio::test]
    async fn test_subscribers_all_type_lists_everything() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|r| {
                r.method == Method::GET && path_of(r) == "/v2/statuspages/sp_acmemain/subscribers"
            })
            .times(1)
            .returning(|_| {
                Box::pin(async {
                    ok(json!({
                        "subscribers": [
                            {"id": 1, "type": "email", "value": "a@example.com", "email": "a@example.com", "language": "en"},
                            {"id": 2, "type": "sms", "value": "+15550100", "phone": "+15550100", "language": "en"}
                        ],
                        "hasNextPage": false,
                        "total": 2
                    }))
                })
            });
        let tester = tester(mock).await;

        let read = tester
            .read_data_source(
                "hyperping_statuspage_subscribers",
                json!({"statuspage_uuid": "sp_acmemain", "type": "all"}),
            )
            .await
            .unwrap();
        let subscribers = read.state["subscribers"].as_array().unwrap();
        assert_eq!(subscribers.len(), 2);
        assert_eq!(subscribers[1]["phone"], "+15550100");
        assert!(subscribers[1]["email"].is_null());
        assert_eq!(read.state["total"], 2);
    }

    #[tokio::test]
    async fn test_subscribers_rejects_unknown_type() {
        let tester = tester(MockHttpTransport::new()).await;
        let result = tester
            .validate_data_source_config(
                "hyperping_statuspage_subscribers",
                json!({"statuspage_uuid": "sp_acmemain", "type": "pigeon"}),
            )
            .await;
        assert!(result.is_err());
    }
}

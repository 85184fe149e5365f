//! `hyperping_statuspage_subscriber`: an email, SMS or Teams subscriber.
//!
//! There is no single-subscriber endpoint, so reads list the page's
//! subscribers and pick by id. Every input forces replacement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::client::{
    validate_resource_id, AddSubscriberRequest, HyperpingClient, Subscriber, ALLOWED_LANGUAGES,
    ALLOWED_SUBSCRIBER_TYPES,
};
use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::types::{is_unknown, StateResponse};
use crate::validators::Validator;

use crate::provider::diagnostics::{create_error, delete_error, read_error};
use crate::provider::mapping::present;
use crate::provider::{parse_state, to_state, Resource};

const RESOURCE: &str = "Status Page Subscriber";
/// Upper bound on pages walked when looking a subscriber up.
const MAX_SUBSCRIBER_PAGES: i64 = 100;

pub(crate) struct StatusPageSubscriberResource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct SubscriberState {
    id: Option<i64>,
    statuspage_uuid: Option<String>,
    #[serde(rename = "type")]
    subscriber_type: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    teams_webhook_url: Option<String>,
    language: Option<String>,
    value: Option<String>,
    created_at: Option<String>,
}

impl SubscriberState {
    /// Overwrite with what the API reports. The webhook URL is never
    /// returned, so the current value stays.
    fn merge(&mut self, sub: &Subscriber) {
        self.id = Some(sub.id);
        self.subscriber_type = Some(sub.subscriber_type.clone());
        self.value = Some(sub.value.clone());
        self.language = Some(sub.language.clone());
        self.created_at = Some(sub.created_at.clone());
        self.email = present(&sub.email);
        self.phone = present(&sub.phone);
    }

    fn keys(&self) -> Result<(String, i64)> {
        match (&self.statuspage_uuid, self.id) {
            (Some(sp), Some(id)) => Ok((sp.clone(), id)),
            _ => Err(ProviderError::InvalidRequest(format!(
                "{} state needs statuspage_uuid and id",
                RESOURCE
            ))),
        }
    }
}

fn subscriber_schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_int64())
        .with_attribute(
            "statuspage_uuid",
            Attribute::required_string()
                .with_force_new()
                .with_validator(Validator::ResourceId),
        )
        .with_attribute(
            "type",
            Attribute::required_string()
                .with_description("email, sms or teams; slack subscribers need the dashboard OAuth flow")
                .with_force_new()
                .with_validator(Validator::NoSlackSubscriber)
                .with_validator(Validator::OneOf(ALLOWED_SUBSCRIBER_TYPES)),
        )
        .with_attribute(
            "email",
            Attribute::optional_string()
                .with_force_new()
                .with_validator(Validator::Email),
        )
        .with_attribute(
            "phone",
            Attribute::optional_string()
                .with_description("Phone number in international format")
                .with_force_new(),
        )
        .with_attribute(
            "teams_webhook_url",
            Attribute::optional_string()
                .with_force_new()
                .sensitive()
                .with_validator(Validator::Url),
        )
        .with_attribute(
            "language",
            Attribute::optional_computed_string()
                .with_default(json!("en"))
                .with_force_new()
                .with_validator(Validator::OneOf(ALLOWED_LANGUAGES)),
        )
        .with_attribute(
            "value",
            Attribute::computed_string().with_description("Email, phone or channel as stored"),
        )
        .with_attribute("created_at", Attribute::computed_string())
}

/// The contact field a subscriber type needs.
fn required_contact(subscriber_type: &str) -> Option<&'static str> {
    match subscriber_type {
        "email" => Some("email"),
        "sms" => Some("phone"),
        "teams" => Some("teams_webhook_url"),
        _ => None,
    }
}

#[async_trait]
impl Resource for StatusPageSubscriberResource {
    fn type_name(&self) -> &'static str {
        "hyperping_statuspage_subscriber"
    }

    fn display_name(&self) -> &'static str {
        RESOURCE
    }

    fn schema(&self) -> Schema {
        subscriber_schema()
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let Some(kind) = config.get("type").and_then(Value::as_str) else {
            return Vec::new();
        };
        let Some(field) = required_contact(kind) else {
            return Vec::new();
        };
        let missing = match config.get(field) {
            None | Some(Value::Null) => true,
            Some(v) if is_unknown(v) => false,
            Some(v) => v.as_str().is_some_and(str::is_empty),
        };
        if missing {
            return vec![Diagnostic::error("Missing Required Attribute")
                .with_detail(format!("{} is required when type is '{}'", field, kind))
                .with_attribute(field)];
        }
        Vec::new()
    }

    async fn create(&self, client: &HyperpingClient, planned: Value) -> Result<StateResponse> {
        let mut plan: SubscriberState = parse_state(&planned)?;
        let statuspage = plan.statuspage_uuid.clone().unwrap_or_default();
        let req = AddSubscriberRequest {
            subscriber_type: plan.subscriber_type.clone().unwrap_or_default(),
            email: plan.email.clone(),
            phone: plan.phone.clone(),
            teams_webhook_url: plan.teams_webhook_url.clone(),
            language: plan.language.clone(),
        };
        let subscriber = client
            .add_subscriber(&statuspage, &req)
            .await
            .map_err(|e| create_error(RESOURCE, &e))?;

        plan.merge(&subscriber);
        info!(status_page_id = %statuspage, subscriber_id = subscriber.id, "Added subscriber");
        Ok(StateResponse::new(to_state(&plan)?))
    }

    async fn read(&self, client: &HyperpingClient, current: Value) -> Result<StateResponse> {
        let mut state: SubscriberState = parse_state(&current)?;
        let (statuspage, id) = state.keys()?;

        let mut page = 0;
        loop {
            let list = match client
                .list_subscribers(&statuspage, (page > 0).then_some(page), None)
                .await
            {
                Ok(list) => list,
                Err(e) if e.is_not_found() => {
                    warn!(status_page_id = %statuspage, "Status page no longer exists, removing subscriber");
                    return Ok(StateResponse::removed());
                },
                Err(e) => return Err(read_error(RESOURCE, &id.to_string(), &e).into()),
            };
            if let Some(subscriber) = list.subscribers.iter().find(|s| s.id == id) {
                state.merge(subscriber);
                return Ok(StateResponse::new(to_state(&state)?));
            }
            page += 1;
            if !list.has_next_page || list.subscribers.is_empty() || page >= MAX_SUBSCRIBER_PAGES {
                break;
            }
        }

        warn!(status_page_id = %statuspage, subscriber_id = id, "Subscriber no longer exists, removing from state");
        Ok(StateResponse::removed())
    }

    /// Every attribute forces replacement, so there is nothing to send.
    async fn update(
        &self,
        _client: &HyperpingClient,
        prior: Value,
        _planned: Value,
    ) -> Result<StateResponse> {
        Ok(StateResponse::new(prior))
    }

    async fn delete(&self, client: &HyperpingClient, current: Value) -> Result<Vec<Diagnostic>> {
        let state: SubscriberState = parse_state(&current)?;
        let (statuspage, id) = state.keys()?;
        match client.delete_subscriber(&statuspage, id).await {
            Ok(()) => info!(status_page_id = %statuspage, subscriber_id = id, "Deleted subscriber"),
            Err(e) if e.is_not_found() => {},
            Err(e) => return Err(delete_error(RESOURCE, &id.to_string(), &e).into()),
        }
        Ok(Vec::new())
    }

    async fn import(&self, client: &HyperpingClient, id: &str) -> Result<StateResponse> {
        let parts: Vec<&str> = id.split(':').collect();
        let [statuspage, subscriber_id] = parts.as_slice() else {
            return Err(Diagnostic::error("Invalid Import ID")
                .with_detail(format!(
                    "Import ID must be in format 'statuspage_uuid:subscriber_id', got: {}",
                    id
                ))
                .into());
        };
        validate_resource_id(statuspage).map_err(|e| {
            Diagnostic::error("Invalid Status Page UUID")
                .with_detail(format!("Status page UUID must be valid: {}", e))
        })?;
        let subscriber_id = subscriber_id
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                Diagnostic::error("Invalid Subscriber ID").with_detail(format!(
                    "Subscriber ID must be a positive integer, got: {}",
                    subscriber_id
                ))
            })?;
        self.read(
            client,
            json!({ "id": subscriber_id, "statuspage_uuid": statuspage }),
        )
        .await
    }
}

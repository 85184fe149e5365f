//! `hyperping_statuspage`: a hosted status page with its sections.
//!
//! Localized fields are filtered to the configured `settings.languages`
//! on every read so the API filling in other locales does not show up as
//! drift.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::client::{HyperpingClient, ALLOWED_FONTS, ALLOWED_LANGUAGES, ALLOWED_THEMES, MAX_NAME_LENGTH};
use crate::error::Result;
use crate::schema::{Attribute, AttributeFlags, Block, Diagnostic, NestedBlock, Schema};
use crate::types::StateResponse;
use crate::validators::Validator;

use crate::provider::diagnostics::{
    create_error, delete_error, not_found_warning, read_error, update_api_error,
};
use crate::provider::statuspage_mapping::{
    status_page_request, status_page_to_resource_state, StatusPageState,
};
use crate::provider::{fail_on_errors, parse_state, require_id, to_state, Resource};

const RESOURCE: &str = "Status Page";

pub(crate) struct StatusPageResource;

fn subscribe_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_description("Which subscription channels visitors may use")
            .with_attribute("enabled", Attribute::optional_computed_bool())
            .with_attribute("email", Attribute::optional_computed_bool())
            .with_attribute("slack", Attribute::optional_computed_bool())
            .with_attribute("teams", Attribute::optional_computed_bool())
            .with_attribute("sms", Attribute::optional_computed_bool()),
    )
    .computed()
}

fn authentication_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_attribute("password_protection", Attribute::optional_computed_bool())
            .with_attribute("google_sso", Attribute::optional_computed_bool())
            .with_attribute("saml_sso", Attribute::optional_computed_bool())
            .with_attribute(
                "allowed_domains",
                Attribute::string_list(AttributeFlags::optional_computed())
                    .with_description("Email domains allowed through SSO"),
            ),
    )
    .computed()
}

fn settings_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("Name shown in the page header")
                    .with_validator(Validator::LengthBetween(1, MAX_NAME_LENGTH)),
            )
            .with_attribute("website", Attribute::optional_computed_string().with_validator(Validator::Url))
            .with_attribute(
                "description",
                Attribute::string_map(AttributeFlags::optional_computed())
                    .with_description("Description by language code"),
            )
            .with_attribute(
                "languages",
                Attribute::string_list(AttributeFlags::required())
                    .with_validator(Validator::EachOneOf(ALLOWED_LANGUAGES)),
            )
            .with_attribute(
                "default_language",
                Attribute::optional_computed_string()
                    .with_default(json!("en"))
                    .with_validator(Validator::OneOf(ALLOWED_LANGUAGES)),
            )
            .with_attribute(
                "theme",
                Attribute::optional_computed_string()
                    .with_default(json!("system"))
                    .with_validator(Validator::OneOf(ALLOWED_THEMES)),
            )
            .with_attribute(
                "font",
                Attribute::optional_computed_string()
                    .with_default(json!("Inter"))
                    .with_validator(Validator::OneOf(ALLOWED_FONTS)),
            )
            .with_attribute(
                "accent_color",
                Attribute::optional_computed_string()
                    .with_default(json!("#36b27e"))
                    .with_validator(Validator::HexColor),
            )
            .with_attribute("auto_refresh", Attribute::optional_computed_bool())
            .with_attribute("banner_header", Attribute::optional_computed_bool())
            .with_attribute("logo", Attribute::optional_string())
            .with_attribute("logo_height", Attribute::optional_computed_string())
            .with_attribute("favicon", Attribute::optional_string())
            .with_attribute("hide_powered_by", Attribute::optional_computed_bool())
            .with_attribute("hide_from_search_engines", Attribute::optional_computed_bool())
            .with_attribute("google_analytics", Attribute::optional_string())
            .with_block("subscribe", subscribe_block())
            .with_block("authentication", authentication_block()),
    )
    .with_min_items(1)
}

fn service_attributes(block: Block) -> Block {
    block
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "uuid",
            Attribute::optional_computed_string()
                .with_description("Monitor UUID; empty for groups"),
        )
        .with_attribute(
            "name",
            Attribute::string_map(AttributeFlags::optional_computed())
                .with_description("Display name by language code"),
        )
        .with_attribute("is_group", Attribute::optional_computed_bool())
        .with_attribute("show_uptime", Attribute::optional_computed_bool())
        .with_attribute("show_response_times", Attribute::optional_computed_bool())
}

fn sections_block() -> NestedBlock {
    let child = NestedBlock::list(service_attributes(Block::new()));
    let service = NestedBlock::list(service_attributes(Block::new()).with_block("services", child));
    NestedBlock::list(
        Block::new()
            .with_attribute(
                "name",
                Attribute::string_map(AttributeFlags::required())
                    .with_description("Section title by language code"),
            )
            .with_attribute("is_split", Attribute::optional_computed_bool())
            .with_block("services", service),
    )
    .computed()
}

fn status_page_schema() -> Schema {
    Schema::v0()
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string().with_validator(Validator::LengthBetween(1, MAX_NAME_LENGTH)),
        )
        .with_attribute(
            "hostname",
            Attribute::optional_computed_string().with_description("Custom domain"),
        )
        .with_attribute(
            "hosted_subdomain",
            Attribute::required_string().with_description("Subdomain under hyperping.app"),
        )
        .with_attribute("url", Attribute::computed_string())
        .with_attribute(
            "password",
            Attribute::optional_string()
                .with_description("Page password; never returned by the API")
                .sensitive(),
        )
        .with_block("settings", settings_block())
        .with_block("sections", sections_block())
}

fn planned_sections(planned: &Value) -> Option<&[Value]> {
    planned.get("sections").and_then(Value::as_array).map(Vec::as_slice)
}

#[async_trait]
impl Resource for StatusPageResource {
    fn type_name(&self) -> &'static str {
        "hyperping_statuspage"
    }

    fn display_name(&self) -> &'static str {
        RESOURCE
    }

    fn schema(&self) -> Schema {
        status_page_schema()
    }

    async fn create(&self, client: &HyperpingClient, planned: Value) -> Result<StateResponse> {
        let plan: StatusPageState = parse_state(&planned)?;
        let sections = planned_sections(&planned);
        let mut diagnostics = Vec::new();
        let req = status_page_request(&plan, sections, &mut diagnostics);
        let warnings = fail_on_errors(diagnostics)?;

        let page = client
            .create_status_page(&req)
            .await
            .map_err(|e| create_error(RESOURCE, &e))?;

        info!(status_page_id = %page.uuid, "Created status page");
        let state = status_page_to_resource_state(&page, &plan, sections);
        Ok(StateResponse::new(to_state(&state)?).with_diagnostics(warnings))
    }

    async fn read(&self, client: &HyperpingClient, current: Value) -> Result<StateResponse> {
        let prior: StatusPageState = parse_state(&current)?;
        let id = require_id(prior.id.as_deref(), RESOURCE)?;
        match client.get_status_page(&id).await {
            Ok(page) => {
                let state = status_page_to_resource_state(&page, &prior, planned_sections(&current));
                Ok(StateResponse::new(to_state(&state)?))
            },
            Err(e) if e.is_not_found() => {
                warn!(status_page_id = %id, "Status page no longer exists, removing from state");
                Ok(StateResponse::removed())
            },
            Err(e) => Err(read_error(RESOURCE, &id, &e).into()),
        }
    }

    /// The whole planned page is sent; the API leaves omitted fields alone.
    async fn update(
        &self,
        client: &HyperpingClient,
        prior: Value,
        planned: Value,
    ) -> Result<StateResponse> {
        let prior: StatusPageState = parse_state(&prior)?;
        let plan: StatusPageState = parse_state(&planned)?;
        let id = require_id(prior.id.as_deref(), RESOURCE)?;
        let sections = planned_sections(&planned);
        let mut diagnostics = Vec::new();
        let req = status_page_request(&plan, sections, &mut diagnostics);
        let warnings = fail_on_errors(diagnostics)?;

        let page = client
            .update_status_page(&id, &req)
            .await
            .map_err(|e| update_api_error(RESOURCE, &id, &e))?;
        let state = status_page_to_resource_state(&page, &plan, sections);
        Ok(StateResponse::new(to_state(&state)?).with_diagnostics(warnings))
    }

    async fn delete(&self, client: &HyperpingClient, current: Value) -> Result<Vec<Diagnostic>> {
        let state: StatusPageState = parse_state(&current)?;
        let id = require_id(state.id.as_deref(), RESOURCE)?;
        match client.delete_status_page(&id).await {
            Ok(()) => {
                info!(status_page_id = %id, "Deleted status page");
                Ok(Vec::new())
            },
            Err(e) if e.is_not_found() => Ok(vec![not_found_warning(
                RESOURCE,
                format!("Status page {} was already deleted", id),
            )]),
            Err(e) => Err(delete_error(RESOURCE, &id, &e).into()),
        }
    }
}

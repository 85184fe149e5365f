//! Schema-driven planning shared by every resource.
//!
//! The planned state starts from the proposed configuration. Computed-only
//! attributes keep their prior value (unknown on create); optional+computed
//! attributes left unset take their default, then their prior value, then
//! unknown. Nested blocks are planned item by item against the prior item at
//! the same position.

use serde_json::{Map, Value};
use tracing::debug;

use crate::schema::{Block, BlockNestingMode, NestedBlock, Schema};
use crate::types::{unknown, AttributeChange, PlanResult};

/// Plan a create (`prior` is `None` or null), update, or delete (`proposed`
/// is null).
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());

    if proposed.is_null() {
        let changes = prior
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(Value::Null, changes, false);
    }

    let planned = plan_block(&schema.block, proposed, prior.and_then(Value::as_object));

    let Some(prior) = prior else {
        let changes = planned
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| AttributeChange::added(k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();
        return PlanResult::with_changes(planned, changes, false);
    };

    let mut changes = Vec::new();
    let mut requires_replace = false;
    if let Some(obj) = planned.as_object() {
        for (name, after) in obj {
            let before = prior.get(name).cloned().unwrap_or(Value::Null);
            if before == *after {
                continue;
            }
            let attr = schema.block.attributes.get(name);
            let sensitive = attr.is_some_and(|a| a.flags.sensitive);
            let force_new = attr.is_some_and(|a| a.force_new);
            if sensitive {
                debug!(attribute = %name, force_new, "sensitive attribute changed");
            } else {
                debug!(attribute = %name, force_new, before = %before, after = %after, "attribute changed");
            }
            requires_replace |= force_new;
            changes.push(AttributeChange::modified(name.clone(), before, after.clone()));
        }
    }

    if changes.is_empty() {
        return PlanResult::no_change(prior.clone());
    }
    PlanResult::with_changes(planned, changes, requires_replace)
}

fn plan_block(block: &Block, config: &Value, prior: Option<&Map<String, Value>>) -> Value {
    let Some(config) = config.as_object() else {
        // Malformed elements pass through for the mappers to report.
        return config.clone();
    };

    let mut planned = Map::new();
    for (name, attr) in &block.attributes {
        let configured = config.get(name).cloned().unwrap_or(Value::Null);
        let previous = prior.and_then(|p| p.get(name)).cloned();
        let value = if attr.is_computed_only() {
            previous.unwrap_or_else(unknown)
        } else if configured.is_null() && attr.flags.computed {
            attr.default
                .clone()
                .or(previous)
                .unwrap_or_else(unknown)
        } else if configured.is_null() {
            attr.default.clone().unwrap_or(Value::Null)
        } else {
            configured
        };
        planned.insert(name.clone(), value);
    }

    for (name, nested) in &block.blocks {
        let configured = config.get(name).unwrap_or(&Value::Null);
        let previous = prior.and_then(|p| p.get(name));
        let value = plan_nested(nested, configured, previous, prior.is_some());
        planned.insert(name.clone(), value);
    }

    Value::Object(planned)
}

fn plan_nested(
    nested: &NestedBlock,
    configured: &Value,
    previous: Option<&Value>,
    has_prior: bool,
) -> Value {
    match (configured, nested.nesting_mode) {
        (Value::Null, _) if nested.computed => {
            if has_prior {
                previous.cloned().unwrap_or(Value::Null)
            } else {
                unknown()
            }
        },
        (Value::Object(_), BlockNestingMode::Single) => {
            plan_block(&nested.block, configured, previous.and_then(Value::as_object))
        },
        (Value::Array(items), BlockNestingMode::List) => {
            let prior_items = previous.and_then(Value::as_array);
            Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let prior_item = prior_items
                            .and_then(|p| p.get(i))
                            .and_then(Value::as_object);
                        plan_block(&nested.block, item, prior_item)
                    })
                    .collect(),
            )
        },
        _ => configured.clone(),
    }
}

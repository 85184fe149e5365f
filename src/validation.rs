//! Schema-driven config validation.
//!
//! Checks a `serde_json::Value` against a [`Schema`]: required attributes,
//! types, nested block cardinality, and finally each attribute's validators.
//! Computed-only attributes are skipped and unknown values pass every check.
//!
//! # Example
//!
//! ```
//! use hyperping_provider::schema::{Attribute, Schema};
//! use hyperping_provider::validation::validate;
//! use hyperping_provider::validators::Validator;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("port", Attribute::optional_int64().with_validator(Validator::Port));
//!
//! assert!(validate(&schema, &json!({"name": "db", "port": 5432})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "db", "port": 70000}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].summary, "Invalid Port Number");
//! ```

use serde_json::Value;

use crate::schema::{Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema};
use crate::types::is_unknown;

/// Every problem found in `value`; empty when it is valid.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

fn check_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let fields = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ if is_unknown(value) => return,
        _ => {
            let mut diag = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)));
            if !path.is_empty() {
                diag = diag.with_attribute(path);
            }
            diagnostics.push(diag);
            return;
        },
    };

    for (name, attr) in &block.attributes {
        check_attribute(attr, fields.get(name), &join_path(path, name), diagnostics);
    }
    for (name, nested) in &block.blocks {
        check_nested(nested, fields.get(name), &join_path(path, name), diagnostics);
    }
}

fn check_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.is_computed_only() {
        return;
    }
    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            let before = diagnostics.len();
            check_type(&attr.attr_type, v, path, diagnostics);
            // Validators assume the declared type.
            if diagnostics.len() == before {
                diagnostics.extend(attr.validators.iter().filter_map(|val| val.validate(v, path)));
            }
        },
    }
}

fn check_type(attr_type: &AttributeType, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    if is_unknown(value) {
        return;
    }
    match attr_type {
        AttributeType::String if !value.is_string() => {
            diagnostics.push(type_error(path, "string", value));
        },
        AttributeType::Int64 if !is_int64(value) => {
            diagnostics.push(type_error(path, "int64", value));
        },
        AttributeType::Float64 if !value.is_number() => {
            diagnostics.push(type_error(path, "float64", value));
        },
        AttributeType::Bool if !value.is_boolean() => {
            diagnostics.push(type_error(path, "bool", value));
        },
        AttributeType::List(element_type) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    check_type(element_type, item, &format!("{}.{}", path, i), diagnostics);
                }
            },
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Map(value_type) => match value.as_object() {
            Some(entries) => {
                for (key, item) in entries {
                    check_type(value_type, item, &format!("{}.{}", path, key), diagnostics);
                }
            },
            None => diagnostics.push(type_error(path, "map", value)),
        },
        _ => {},
    }
}

fn check_nested(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (value, nested.nesting_mode) {
        (Some(v), _) if is_unknown(v) => {},
        (None | Some(Value::Null), _) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail(format!(
                            "At least {} block(s) required",
                            nested.min_items
                        ))
                        .with_attribute(path),
                );
            }
        },
        (Some(v), BlockNestingMode::Single) => check_block(&nested.block, v, path, diagnostics),
        (Some(Value::Array(items)), BlockNestingMode::List) => {
            let len = items.len() as u32;
            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }
            for (i, item) in items.iter().enumerate() {
                check_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
        },
        (Some(v), BlockNestingMode::List) => diagnostics.push(
            Diagnostic::error(format!("Expected list for block '{}'", path))
                .with_detail(format!("Got {}", value_type_name(v)))
                .with_attribute(path),
        ),
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Integral floats such as `60.0` count; the host sends all numbers as
/// JSON numbers.
fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() => true,
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use crate::types::UNKNOWN_VALUE;
    use crate::validators::Validator;
    use serde_json::json;

    fn headers_schema() -> Schema {
        Schema::v0().with_block(
            "request_headers",
            NestedBlock::list(
                Block::new()
                    .with_attribute(
                        "name",
                        Attribute::required_string()
                            .with_validator(Validator::NoControlChars("bad header name"))
                            .with_validator(Validator::ReservedHeaderName),
                    )
                    .with_attribute(
                        "value",
                        Attribute::required_string()
                            .with_validator(Validator::NoControlChars("bad header value")),
                    ),
            ),
        )
    }

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate(&schema, &json!({"name": "API"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));

        assert_eq!(validate(&schema, &json!({"name": null})).len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let schema = Schema::v0().with_attribute("alerts_wait", Attribute::optional_int64());

        assert!(validate(&schema, &json!({"alerts_wait": 120})).is_empty());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"alerts_wait": null})).is_empty());
        assert_eq!(validate(&schema, &json!({"alerts_wait": "two"})).len(), 1);
    }

    #[test]
    fn test_computed_only_attribute_skipped() {
        let schema = Schema::v0().with_attribute("status", Attribute::computed_string());
        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"status": 123})).is_empty());
    }

    #[test]
    fn test_unknown_values_pass_type_and_validators() {
        let schema = Schema::v0()
            .with_attribute(
                "port",
                Attribute::optional_int64().with_validator(Validator::Port),
            )
            .with_attribute(
                "regions",
                Attribute::string_list(AttributeFlags::optional())
                    .with_validator(Validator::EachOneOf(&["paris"])),
            );

        let diagnostics = validate(
            &schema,
            &json!({"port": UNKNOWN_VALUE, "regions": [UNKNOWN_VALUE]}),
        );
        assert!(diagnostics.is_empty());
        assert!(validate(&headers_schema(), &json!({"request_headers": UNKNOWN_VALUE})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("check_frequency", Attribute::required_int64());

        assert!(validate(&schema, &json!({"check_frequency": 60})).is_empty());
        assert!(validate(&schema, &json!({"check_frequency": 60.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"check_frequency": 60.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"check_frequency": "60"})).len(), 1);
    }

    #[test]
    fn test_validators_run_after_type_check() {
        let schema = Schema::v0().with_attribute(
            "check_frequency",
            Attribute::optional_int64().with_validator(Validator::Int64OneOf(&[30, 60])),
        );

        let diagnostics = validate(&schema, &json!({"check_frequency": 45}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid Attribute Value Match");

        // a type error is reported alone
        let diagnostics = validate(&schema, &json!({"check_frequency": "45"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_list_attribute() {
        let schema = Schema::v0().with_attribute(
            "status_pages",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                AttributeFlags::required(),
            ),
        );

        assert!(validate(&schema, &json!({"status_pages": ["sp_1", "sp_2"]})).is_empty());
        assert!(validate(&schema, &json!({"status_pages": []})).is_empty());

        let diagnostics = validate(&schema, &json!({"status_pages": ["sp_1", 2]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("status_pages.1"));

        assert_eq!(validate(&schema, &json!({"status_pages": "sp_1"})).len(), 1);
    }

    #[test]
    fn test_validate_map_attribute() {
        let schema = Schema::v0().with_attribute(
            "description",
            Attribute::string_map(AttributeFlags::optional()),
        );

        assert!(validate(&schema, &json!({"description": {"en": "Status", "fr": "Statut"}})).is_empty());

        let diagnostics = validate(&schema, &json!({"description": {"en": "Status", "de": 1}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("description.de"));
    }

    #[test]
    fn test_nested_list_block_runs_validators() {
        let schema = headers_schema();

        let ok = json!({"request_headers": [{"name": "X-Env", "value": "prod"}]});
        assert!(validate(&schema, &ok).is_empty());

        let reserved = json!({"request_headers": [{"name": "Authorization", "value": "x"}]});
        let diagnostics = validate(&schema, &reserved);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Reserved Header Name");
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("request_headers.0.name")
        );

        let injected = json!({"request_headers": [{"name": "X-Env", "value": "a\r\nb"}]});
        let diagnostics = validate(&schema, &injected);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].detail.as_deref(), Some("bad header value"));
    }

    #[test]
    fn test_nested_block_cardinality() {
        let schema = Schema::v0().with_block(
            "sections",
            NestedBlock::list(Block::new().with_attribute("name", Attribute::required_string()))
                .with_min_items(1),
        );

        assert!(validate(&schema, &json!({"sections": [{"name": "API"}]})).is_empty());

        let diagnostics = validate(&schema, &json!({"sections": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing required block 'sections'");

        let diagnostics = validate(&schema, &json!({"sections": {"name": "a"}}));
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_single_block() {
        let schema = Schema::v0().with_block(
            "settings",
            NestedBlock::single(
                Block::new().with_attribute(
                    "accent_color",
                    Attribute::optional_string().with_validator(Validator::HexColor),
                ),
            ),
        );

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"settings": {"accent_color": "#36b27e"}})).is_empty());

        let diagnostics = validate(&schema, &json!({"settings": {"accent_color": "#fff"}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("settings.accent_color")
        );
    }

    #[test]
    fn test_deeply_nested_services() {
        let service = Block::new().with_attribute("name", Attribute::required_string());
        let schema = Schema::v0().with_block(
            "sections",
            NestedBlock::list(
                Block::new()
                    .with_attribute("name", Attribute::required_string())
                    .with_block(
                        "services",
                        NestedBlock::list(service.with_block(
                            "services",
                            NestedBlock::list(
                                Block::new().with_attribute("uuid", Attribute::required_string()),
                            ),
                        )),
                    ),
            ),
        );

        let diagnostics = validate(
            &schema,
            &json!({
                "sections": [{
                    "name": "Core",
                    "services": [{"name": "API", "services": [{"uuid": 7}]}]
                }]
            }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_deref(),
            Some("sections.0.services.0.services.0.uuid")
        );
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());
        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }
}

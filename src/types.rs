//! Protocol-level value types exchanged with the host engine.
//!
//! Configuration and state travel as JSON; these types wrap the pieces the
//! protobuf messages carry as raw bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::Diagnostic;

/// Sentinel the host uses for values that are not known until apply.
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// The protocol version for the handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// The handshake prefix printed on stdout at startup.
pub const HANDSHAKE_PREFIX: &str = "HYPERPING_PROVIDER";

/// Returns true if the value is the host's "unknown" marker.
pub fn is_unknown(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_VALUE)
}

/// Returns true if the value is null or unknown, i.e. nothing to validate yet.
pub fn is_null_or_unknown(value: &Value) -> bool {
    value.is_null() || is_unknown(value)
}

/// The unknown marker as a JSON value.
pub fn unknown() -> Value {
    Value::String(UNKNOWN_VALUE.to_string())
}

/// Replace every unknown marker in `value` with null, recursively.
///
/// Typed models deserialize from config, so a pending value must look unset.
pub fn strip_unknown(value: &Value) -> Value {
    match value {
        Value::String(_) if is_unknown(value) => Value::Null,
        Value::Array(items) => Value::Array(items.iter().map(strip_unknown).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), strip_unknown(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<Value>,
    /// The value after the change (None if deleting).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

impl From<crate::generated::AttributeChange> for AttributeChange {
    fn from(proto: crate::generated::AttributeChange) -> Self {
        let decode = |bytes: &[u8]| {
            if bytes.is_empty() {
                None
            } else {
                serde_json::from_slice(bytes).ok()
            }
        };
        Self {
            before: decode(&proto.before),
            after: decode(&proto.after),
            path: proto.path,
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        let encode = |v: Option<Value>| {
            v.map(|v| serde_json::to_vec(&v).unwrap_or_default())
                .unwrap_or_default()
        };
        Self {
            path: change.path,
            before: encode(change.before),
            after: encode(change.after),
        }
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource requires replacement.
    pub requires_replace: bool,
    /// Warnings or errors raised while planning.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
            diagnostics: Vec::new(),
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
            diagnostics: Vec::new(),
        }
    }

    /// Attach diagnostics to the plan.
    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// New state produced by create, read, update or a data source read.
///
/// A null `state` from read means the remote object is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl StateResponse {
    pub fn new(state: Value) -> Self {
        Self {
            state,
            diagnostics: Vec::new(),
        }
    }

    /// The resource no longer exists and should be dropped from state.
    pub fn removed() -> Self {
        Self::new(Value::Null)
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }

    pub fn is_removed(&self) -> bool {
        self.state.is_null()
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
    /// List of data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider supports planning destroy operations.
    pub plan_destroy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("api"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("api")));

        let removed = AttributeChange::removed("name", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("check_frequency", json!(60), json!(300));
        assert_eq!(modified.before, Some(json!(60)));
        assert_eq!(modified.after, Some(json!(300)));
    }

    #[test]
    fn test_attribute_change_conversion() {
        let change = AttributeChange::modified("url", json!("https://a"), json!("https://b"));

        let proto: crate::generated::AttributeChange = change.clone().into();
        assert_eq!(proto.path, "url");

        let back: AttributeChange = proto.into();
        assert_eq!(back, change);
    }

    #[test]
    fn test_added_change_has_empty_before_bytes() {
        let proto: crate::generated::AttributeChange =
            AttributeChange::added("paused", json!(true)).into();
        assert!(proto.before.is_empty());
        assert_eq!(proto.after, b"true");
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "mon_123"}));
        assert!(no_change.changes.is_empty());
        assert!(!no_change.requires_replace);

        let with_changes = PlanResult::with_changes(
            json!({"id": "mon_123", "name": "new"}),
            vec![AttributeChange::modified("name", json!("old"), json!("new"))],
            false,
        )
        .with_diagnostics(vec![Diagnostic::warning("Past Start Date")]);
        assert_eq!(with_changes.changes.len(), 1);
        assert_eq!(with_changes.diagnostics.len(), 1);
    }

    #[test]
    fn test_state_response_removed() {
        let resp = StateResponse::removed();
        assert!(resp.is_removed());

        let resp = StateResponse::new(json!({"id": "tok_1"}))
            .with_diagnostic(Diagnostic::warning("Outage Cannot Be Deleted"));
        assert!(!resp.is_removed());
        assert_eq!(resp.diagnostics.len(), 1);
    }

    #[test]
    fn test_unknown_detection() {
        assert!(is_unknown(&unknown()));
        assert!(is_null_or_unknown(&Value::Null));
        assert!(!is_null_or_unknown(&json!("")));
        assert!(!is_unknown(&json!(UNKNOWN_VALUE.to_lowercase())));
    }

    #[test]
    fn test_strip_unknown_recurses() {
        let value = json!({
            "id": UNKNOWN_VALUE,
            "name": "api",
            "regions": ["paris", UNKNOWN_VALUE],
            "settings": {"theme": UNKNOWN_VALUE, "font": "Inter"}
        });
        assert_eq!(
            strip_unknown(&value),
            json!({
                "id": null,
                "name": "api",
                "regions": ["paris", null],
                "settings": {"theme": null, "font": "Inter"}
            })
        );
    }

    #[test]
    fn test_protocol_constants() {
        assert_eq!(PROTOCOL_VERSION, 1);
        assert_eq!(HANDSHAKE_PREFIX, "HYPERPING_PROVIDER");
    }
}

//! Schema types describing the provider block, resources and data sources.
//!
//! Schemas drive config validation, the generic planner and the GetSchema
//! RPC. Only the shapes the Hyperping API needs are modelled: scalars,
//! string lists and maps, and single or list nested blocks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::validators::Validator;

/// Value type of an attribute. Serialized as the JSON type descriptor the
/// host engine reads, e.g. `"string"` or `{"list": "string"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int64,
    Float64,
    Bool,
    List(Box<AttributeType>),
    /// String keys, values of one type. Used for localized text.
    Map(Box<AttributeType>),
}

impl AttributeType {
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }
}

/// Who sets an attribute. `optional` + `computed` means the practitioner
/// may set it and the provider fills it in otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    /// Hidden in plan output and never logged.
    pub sensitive: bool,
}

impl AttributeFlags {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    #[serde(flatten)]
    pub flags: AttributeFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A change to this attribute replaces the resource.
    #[serde(default)]
    pub force_new: bool,
    /// Planned when the attribute is optional+computed and left unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Plan-time checks run after the type check. Never sent over the wire.
    #[serde(skip)]
    pub validators: Vec<Validator>,
}

impl Attribute {
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            default: None,
            validators: Vec::new(),
        }
    }

    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
    }

    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::required())
    }

    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::computed())
    }

    pub fn optional_computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional_computed())
    }

    pub fn computed_float64() -> Self {
        Self::new(AttributeType::Float64, AttributeFlags::computed())
    }

    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    pub fn optional_computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional_computed())
    }

    pub fn string_list(flags: AttributeFlags) -> Self {
        Self::new(AttributeType::list(AttributeType::String), flags)
    }

    /// A map of strings, e.g. text keyed by language code.
    pub fn string_map(flags: AttributeFlags) -> Self {
        Self::new(AttributeType::map(AttributeType::String), flags)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Validators run in the order they were attached.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// True for attributes only the provider sets.
    pub fn is_computed_only(&self) -> bool {
        self.flags.computed && !self.flags.optional && !self.flags.required
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// At most one block, held as a JSON object.
    #[default]
    Single,
    /// Zero or more blocks in order, held as a JSON array.
    List,
}

/// A group of attributes and nested blocks, such as a monitor's
/// `request_headers` entry or a status page's `settings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub blocks: HashMap<String, NestedBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    #[serde(flatten)]
    pub block: Block,
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// A non-zero minimum makes the block required.
    #[serde(default)]
    pub min_items: u32,
    /// The provider fills the block in when the configuration leaves it out.
    #[serde(default)]
    pub computed: bool,
}

impl NestedBlock {
    pub fn single(block: Block) -> Self {
        Self {
            block,
            nesting_mode: BlockNestingMode::Single,
            min_items: 0,
            computed: false,
        }
    }

    pub fn list(block: Block) -> Self {
        Self {
            nesting_mode: BlockNestingMode::List,
            ..Self::single(block)
        }
    }

    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Mark the block optional+computed: left out of the configuration, it
    /// keeps its prior value or is unknown until apply.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// The wire limit: one for single blocks, unlimited (zero) for lists.
    pub fn max_items(&self) -> u32 {
        match self.nesting_mode {
            BlockNestingMode::Single => 1,
            BlockNestingMode::List => 0,
        }
    }
}

/// Schema of one resource, data source or the provider block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Bumped when stored state needs upgrading.
    #[serde(default)]
    pub version: u64,
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    pub fn v0() -> Self {
        Self::new(0)
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attr);
        self
    }

    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Everything GetSchema returns: the provider block plus every resource and
/// data source keyed by type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    #[serde(default)]
    pub provider: Schema,
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Fails the operation.
    Error,
    Warning,
}

/// A message shown to the practitioner, optionally tied to an attribute
/// path such as `settings.accent_color`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn new(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, summary)
    }

    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, summary)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::plan::JsonAccessNode;

/// Prefix marking a log field name as a path into the log body.
pub const BODY_PREFIX: &str = "body.";

/// Legacy "any index" array marker carried at the end of a key name.
pub const ANY_INDEX_MARKER: &str = "[*]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldContext {
    Log,
    Attribute,
    Resource,
    Scope,
    Body,
    #[default]
    Unspecified,
}

impl FieldContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldContext::Log => "log",
            FieldContext::Attribute => "attribute",
            FieldContext::Resource => "resource",
            FieldContext::Scope => "scope",
            FieldContext::Body => "body",
            FieldContext::Unspecified => "",
        }
    }

    /// Contexts in which a name is looked up among the intrinsic log columns.
    pub fn is_log_or_unspecified(&self) -> bool { matches!(self, FieldContext::Log | FieldContext::Unspecified) }
}

impl fmt::Display for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FieldContext {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "log" | "logs" => Ok(FieldContext::Log),
            "attribute" | "attributes" | "attr" => Ok(FieldContext::Attribute),
            "resource" | "resources" => Ok(FieldContext::Resource),
            "scope" => Ok(FieldContext::Scope),
            "body" => Ok(FieldContext::Body),
            "" | "unspecified" => Ok(FieldContext::Unspecified),
            _ => Err(ParseError::UnknownContext(s.to_string())),
        }
    }
}

/// Declared data type of a logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldDataType {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "float64")]
    Float64,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "[]string")]
    ArrayString,
    #[serde(rename = "[]bool")]
    ArrayBool,
    #[serde(rename = "[]int64")]
    ArrayInt64,
    #[serde(rename = "[]float64")]
    ArrayFloat64,
    #[serde(rename = "[]number")]
    ArrayNumber,
    #[serde(rename = "[]dynamic")]
    ArrayDynamic,
    #[serde(rename = "[]object")]
    ArrayObject,
}

impl FieldDataType {
    pub const ALL: [FieldDataType; 13] = [
        FieldDataType::Unspecified,
        FieldDataType::String,
        FieldDataType::Bool,
        FieldDataType::Int64,
        FieldDataType::Float64,
        FieldDataType::Number,
        FieldDataType::ArrayString,
        FieldDataType::ArrayBool,
        FieldDataType::ArrayInt64,
        FieldDataType::ArrayFloat64,
        FieldDataType::ArrayNumber,
        FieldDataType::ArrayDynamic,
        FieldDataType::ArrayObject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldDataType::Unspecified => "",
            FieldDataType::String => "string",
            FieldDataType::Bool => "bool",
            FieldDataType::Int64 => "int64",
            FieldDataType::Float64 => "float64",
            FieldDataType::Number => "number",
            FieldDataType::ArrayString => "[]string",
            FieldDataType::ArrayBool => "[]bool",
            FieldDataType::ArrayInt64 => "[]int64",
            FieldDataType::ArrayFloat64 => "[]float64",
            FieldDataType::ArrayNumber => "[]number",
            FieldDataType::ArrayDynamic => "[]dynamic",
            FieldDataType::ArrayObject => "[]object",
        }
    }

    pub fn is_array(&self) -> bool { self.as_str().starts_with("[]") }

    pub fn is_numeric(&self) -> bool { matches!(self, FieldDataType::Int64 | FieldDataType::Float64 | FieldDataType::Number) }

    /// Element type of an array type, the type itself for scalars.
    pub fn element_type(&self) -> FieldDataType {
        match self {
            FieldDataType::ArrayString => FieldDataType::String,
            FieldDataType::ArrayBool => FieldDataType::Bool,
            FieldDataType::ArrayInt64 => FieldDataType::Int64,
            FieldDataType::ArrayFloat64 => FieldDataType::Float64,
            FieldDataType::ArrayNumber => FieldDataType::Number,
            FieldDataType::ArrayDynamic | FieldDataType::ArrayObject => FieldDataType::Unspecified,
            scalar => *scalar,
        }
    }

    pub fn array_of(&self) -> FieldDataType {
        match self {
            FieldDataType::String => FieldDataType::ArrayString,
            FieldDataType::Bool => FieldDataType::ArrayBool,
            FieldDataType::Int64 => FieldDataType::ArrayInt64,
            FieldDataType::Float64 => FieldDataType::ArrayFloat64,
            FieldDataType::Number => FieldDataType::ArrayNumber,
            FieldDataType::Unspecified => FieldDataType::ArrayDynamic,
            array => *array,
        }
    }
}

impl fmt::Display for FieldDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FieldDataType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let normalized = match lowered.as_str() {
            "unspecified" => "",
            "int" | "integer" => "int64",
            "float" | "double" => "float64",
            "boolean" => "bool",
            other => other,
        };
        FieldDataType::ALL.iter().copied().find(|t| t.as_str() == normalized).ok_or_else(|| ParseError::UnknownDataType(s.to_string()))
    }
}

/// Physical storage type of a path inside a JSON column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JsonDataType {
    String,
    Int64,
    Float64,
    Bool,
    ArrayString,
    ArrayInt64,
    ArrayFloat64,
    ArrayBool,
    ArrayDynamic,
    ArrayJson,
    Dynamic,
}

impl JsonDataType {
    /// The type literal understood by `dynamicElement`.
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonDataType::String => "String",
            JsonDataType::Int64 => "Int64",
            JsonDataType::Float64 => "Float64",
            JsonDataType::Bool => "Bool",
            JsonDataType::ArrayString => "Array(Nullable(String))",
            JsonDataType::ArrayInt64 => "Array(Nullable(Int64))",
            JsonDataType::ArrayFloat64 => "Array(Nullable(Float64))",
            JsonDataType::ArrayBool => "Array(Nullable(Bool))",
            JsonDataType::ArrayDynamic => "Array(Dynamic)",
            JsonDataType::ArrayJson => "Array(JSON)",
            JsonDataType::Dynamic => "Dynamic",
        }
    }

    /// Map a type name as recorded in the path type catalog. Unknown names are `Dynamic`.
    pub fn from_catalog(type_name: &str) -> JsonDataType {
        match type_name {
            "String" => JsonDataType::String,
            "Int64" => JsonDataType::Int64,
            "Float64" => JsonDataType::Float64,
            "Bool" => JsonDataType::Bool,
            "Array(Nullable(String))" => JsonDataType::ArrayString,
            "Array(Nullable(Int64))" => JsonDataType::ArrayInt64,
            "Array(Nullable(Float64))" => JsonDataType::ArrayFloat64,
            "Array(Nullable(Bool))" => JsonDataType::ArrayBool,
            "Array(Dynamic)" => JsonDataType::ArrayDynamic,
            t if t == "Array(JSON)" || t.starts_with("Array(JSON(") => JsonDataType::ArrayJson,
            _ => JsonDataType::Dynamic,
        }
    }

    pub fn is_array(&self) -> bool { self.as_str().starts_with("Array(") }

    /// Whether skip indexes can be declared on a path of this type.
    pub fn index_supported(&self) -> bool {
        matches!(self, JsonDataType::String | JsonDataType::Int64 | JsonDataType::Float64 | JsonDataType::Bool)
    }

    pub fn element_type(&self) -> Option<JsonDataType> {
        match self {
            JsonDataType::ArrayString => Some(JsonDataType::String),
            JsonDataType::ArrayInt64 => Some(JsonDataType::Int64),
            JsonDataType::ArrayFloat64 => Some(JsonDataType::Float64),
            JsonDataType::ArrayBool => Some(JsonDataType::Bool),
            JsonDataType::ArrayDynamic => Some(JsonDataType::Dynamic),
            _ => None,
        }
    }

    pub fn array_of(&self) -> Option<JsonDataType> {
        match self {
            JsonDataType::String => Some(JsonDataType::ArrayString),
            JsonDataType::Int64 => Some(JsonDataType::ArrayInt64),
            JsonDataType::Float64 => Some(JsonDataType::ArrayFloat64),
            JsonDataType::Bool => Some(JsonDataType::ArrayBool),
            JsonDataType::Dynamic => Some(JsonDataType::ArrayDynamic),
            _ => None,
        }
    }

    pub fn field_data_type(&self) -> FieldDataType {
        match self {
            JsonDataType::String => FieldDataType::String,
            JsonDataType::Int64 => FieldDataType::Int64,
            JsonDataType::Float64 => FieldDataType::Float64,
            JsonDataType::Bool => FieldDataType::Bool,
            JsonDataType::ArrayString => FieldDataType::ArrayString,
            JsonDataType::ArrayInt64 => FieldDataType::ArrayInt64,
            JsonDataType::ArrayFloat64 => FieldDataType::ArrayFloat64,
            JsonDataType::ArrayBool => FieldDataType::ArrayBool,
            JsonDataType::ArrayDynamic => FieldDataType::ArrayDynamic,
            JsonDataType::ArrayJson => FieldDataType::ArrayObject,
            JsonDataType::Dynamic => FieldDataType::Unspecified,
        }
    }

    pub fn from_field_data_type(data_type: FieldDataType) -> Option<JsonDataType> {
        match data_type {
            FieldDataType::String => Some(JsonDataType::String),
            FieldDataType::Int64 => Some(JsonDataType::Int64),
            FieldDataType::Float64 | FieldDataType::Number => Some(JsonDataType::Float64),
            FieldDataType::Bool => Some(JsonDataType::Bool),
            FieldDataType::ArrayString => Some(JsonDataType::ArrayString),
            FieldDataType::ArrayInt64 => Some(JsonDataType::ArrayInt64),
            FieldDataType::ArrayFloat64 | FieldDataType::ArrayNumber => Some(JsonDataType::ArrayFloat64),
            FieldDataType::ArrayBool => Some(JsonDataType::ArrayBool),
            FieldDataType::ArrayDynamic => Some(JsonDataType::ArrayDynamic),
            FieldDataType::ArrayObject => Some(JsonDataType::ArrayJson),
            FieldDataType::Unspecified => None,
        }
    }
}

impl fmt::Display for JsonDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Strict parse of a type literal, unlike [`JsonDataType::from_catalog`] which never fails.
impl FromStr for JsonDataType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match JsonDataType::from_catalog(s.trim()) {
            JsonDataType::Dynamic if s.trim() != "Dynamic" => Err(ParseError::UnknownJsonType(s.to_string())),
            data_type => Ok(data_type),
        }
    }
}

/// A skip index declared on a JSON sub-path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JsonDataTypeIndex {
    pub data_type: JsonDataType,
    pub column_expression: String,
}

/// A logical field as resolved by key metadata.
///
/// Two keys are the same field when name, context and data type match; plans, indexes and
/// materialization are attached metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryFieldKey {
    pub name: String,
    #[serde(default)]
    pub field_context: FieldContext,
    #[serde(default)]
    pub field_data_type: FieldDataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_data_type: Option<JsonDataType>,
    #[serde(default)]
    pub materialized: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub json_plan: Vec<JsonAccessNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<JsonDataTypeIndex>,
}

impl TelemetryFieldKey {
    pub fn new(name: impl Into<String>, field_context: FieldContext, field_data_type: FieldDataType) -> Self {
        Self { name: name.into(), field_context, field_data_type, ..Default::default() }
    }

    pub fn attribute(name: impl Into<String>, field_data_type: FieldDataType) -> Self {
        Self::new(name, FieldContext::Attribute, field_data_type)
    }

    pub fn resource(name: impl Into<String>) -> Self { Self::new(name, FieldContext::Resource, FieldDataType::String) }

    pub fn body(name: impl Into<String>, json_data_type: JsonDataType) -> Self {
        Self::new(name, FieldContext::Body, json_data_type.field_data_type()).with_json_data_type(json_data_type)
    }

    pub fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }

    pub fn with_json_data_type(mut self, json_data_type: JsonDataType) -> Self {
        self.json_data_type = Some(json_data_type);
        self
    }

    pub fn with_plan(mut self, plan: Vec<JsonAccessNode>) -> Self {
        self.json_plan = plan;
        self
    }

    pub fn with_index(mut self, data_type: JsonDataType, column_expression: impl Into<String>) -> Self {
        self.indexes.push(JsonDataTypeIndex { data_type, column_expression: column_expression.into() });
        self
    }

    /// A copy carrying a different declared data type, without plans or indexes.
    pub fn retyped(&self, field_data_type: FieldDataType) -> Self {
        Self {
            name: self.name.clone(),
            field_context: self.field_context,
            field_data_type,
            json_data_type: self.json_data_type,
            materialized: self.materialized,
            json_plan: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Whether this key addresses a path inside the log body.
    pub fn is_body_json(&self) -> bool {
        self.field_context == FieldContext::Body || (self.field_context.is_log_or_unspecified() && self.name.starts_with(BODY_PREFIX))
    }

    /// The path inside the body, without the `body.` prefix.
    pub fn body_path(&self) -> &str { self.name.strip_prefix(BODY_PREFIX).unwrap_or(&self.name) }

    pub fn has_any_index_marker(&self) -> bool { self.name.ends_with(ANY_INDEX_MARKER) }

    pub fn has_index(&self, data_type: JsonDataType, column_expression: &str) -> bool {
        self.indexes.iter().any(|index| index.data_type == data_type && index.column_expression == column_expression)
    }
}

impl PartialEq for TelemetryFieldKey {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.field_context == other.field_context && self.field_data_type == other.field_data_type
    }
}

impl Eq for TelemetryFieldKey {}

impl Hash for TelemetryFieldKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.field_context.hash(state);
        self.field_data_type.hash(state);
    }
}

impl fmt::Display for TelemetryFieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name={}", self.name)?;
        if self.field_context != FieldContext::Unspecified {
            write!(f, ",context={}", self.field_context)?;
        }
        if self.field_data_type != FieldDataType::Unspecified {
            write!(f, ",datatype={}", self.field_data_type)?;
        }
        Ok(())
    }
}

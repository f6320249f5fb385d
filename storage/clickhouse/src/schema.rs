//! Physical columns of the logs v2 table

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    UInt8,
    UInt32,
    UInt64,
    Float64,
    Bool,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::UInt8 => "UInt8",
            ScalarType::UInt32 => "UInt32",
            ScalarType::UInt64 => "UInt64",
            ScalarType::Float64 => "Float64",
            ScalarType::Bool => "Bool",
        }
    }

    pub fn is_unsigned(&self) -> bool { matches!(self, ScalarType::UInt8 | ScalarType::UInt32 | ScalarType::UInt64) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Scalar(ScalarType),
    LowCardinality(ScalarType),
    /// `Map(LowCardinality(String), value)`
    Map { value: ScalarType },
    /// `JSON(max_dynamic_types=.., max_dynamic_paths=..)`, parameters omitted when unset
    Json { max_dynamic_types: Option<u32>, max_dynamic_paths: Option<u32> },
}

impl ColumnType {
    pub fn is_json(&self) -> bool { matches!(self, ColumnType::Json { .. }) }

    pub fn is_map(&self) -> bool { matches!(self, ColumnType::Map { .. }) }

    /// String or LowCardinality(String)
    pub fn is_string(&self) -> bool {
        matches!(self, ColumnType::Scalar(ScalarType::String) | ColumnType::LowCardinality(ScalarType::String))
    }

    pub fn is_unsigned(&self) -> bool {
        match self {
            ColumnType::Scalar(t) | ColumnType::LowCardinality(t) => t.is_unsigned(),
            _ => false,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Scalar(t) => f.write_str(t.as_str()),
            ColumnType::LowCardinality(t) => write!(f, "LowCardinality({})", t.as_str()),
            ColumnType::Map { value } => write!(f, "Map(LowCardinality(String), {})", value.as_str()),
            ColumnType::Json { max_dynamic_types: None, max_dynamic_paths: None } => f.write_str("JSON"),
            ColumnType::Json { max_dynamic_types, max_dynamic_paths } => {
                let mut params = Vec::new();
                if let Some(types) = max_dynamic_types {
                    params.push(format!("max_dynamic_types={}", types));
                }
                if let Some(paths) = max_dynamic_paths {
                    params.push(format!("max_dynamic_paths={}", paths));
                }
                write!(f, "JSON({})", params.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
}

impl Column {
    const fn new(name: &'static str, column_type: ColumnType) -> Self { Self { name, column_type } }

    /// Dynamic type/path limits of a JSON column, defaults for unset parameters.
    pub fn json_limits(&self) -> Option<(u32, u32)> {
        match self.column_type {
            ColumnType::Json { max_dynamic_types, max_dynamic_paths } => Some((max_dynamic_types.unwrap_or(32), max_dynamic_paths.unwrap_or(1024))),
            _ => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.name, self.column_type) }
}

const STRING: ColumnType = ColumnType::Scalar(ScalarType::String);
const UINT64: ColumnType = ColumnType::Scalar(ScalarType::UInt64);

pub const TS_BUCKET_START: Column = Column::new("ts_bucket_start", UINT64);
pub const RESOURCE_FINGERPRINT: Column = Column::new("resource_fingerprint", STRING);
pub const TIMESTAMP: Column = Column::new("timestamp", UINT64);
pub const OBSERVED_TIMESTAMP: Column = Column::new("observed_timestamp", UINT64);
pub const ID: Column = Column::new("id", STRING);
pub const TRACE_ID: Column = Column::new("trace_id", STRING);
pub const SPAN_ID: Column = Column::new("span_id", STRING);
pub const TRACE_FLAGS: Column = Column::new("trace_flags", ColumnType::Scalar(ScalarType::UInt32));
pub const SEVERITY_TEXT: Column = Column::new("severity_text", ColumnType::LowCardinality(ScalarType::String));
pub const SEVERITY_NUMBER: Column = Column::new("severity_number", ColumnType::Scalar(ScalarType::UInt8));
pub const BODY: Column = Column::new("body", STRING);
pub const BODY_JSON: Column = Column::new("body_json", ColumnType::Json { max_dynamic_types: Some(32), max_dynamic_paths: Some(0) });
pub const BODY_JSON_PROMOTED: Column =
    Column::new("body_json_promoted", ColumnType::Json { max_dynamic_types: Some(32), max_dynamic_paths: Some(1024) });
pub const ATTRIBUTES_STRING: Column = Column::new("attributes_string", ColumnType::Map { value: ScalarType::String });
pub const ATTRIBUTES_NUMBER: Column = Column::new("attributes_number", ColumnType::Map { value: ScalarType::Float64 });
pub const ATTRIBUTES_BOOL: Column = Column::new("attributes_bool", ColumnType::Map { value: ScalarType::Bool });
pub const RESOURCES_STRING: Column = Column::new("resources_string", ColumnType::Map { value: ScalarType::String });
pub const RESOURCE: Column = Column::new("resource", ColumnType::Json { max_dynamic_types: None, max_dynamic_paths: None });
pub const SCOPE_NAME: Column = Column::new("scope_name", STRING);
pub const SCOPE_VERSION: Column = Column::new("scope_version", STRING);
pub const SCOPE_STRING: Column = Column::new("scope_string", ColumnType::Map { value: ScalarType::String });

/// Every column of the logs table, in table order.
pub static LOG_COLUMNS: [Column; 21] = [
    TS_BUCKET_START,
    RESOURCE_FINGERPRINT,
    TIMESTAMP,
    OBSERVED_TIMESTAMP,
    ID,
    TRACE_ID,
    SPAN_ID,
    TRACE_FLAGS,
    SEVERITY_TEXT,
    SEVERITY_NUMBER,
    BODY,
    BODY_JSON,
    BODY_JSON_PROMOTED,
    ATTRIBUTES_STRING,
    ATTRIBUTES_NUMBER,
    ATTRIBUTES_BOOL,
    RESOURCES_STRING,
    RESOURCE,
    SCOPE_NAME,
    SCOPE_VERSION,
    SCOPE_STRING,
];

/// Look up a column by its physical name.
pub fn column(name: &str) -> Option<&'static Column> { LOG_COLUMNS.iter().find(|c| c.name == name) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_types_render() {
        assert_eq!(BODY_JSON.column_type.to_string(), "JSON(max_dynamic_types=32, max_dynamic_paths=0)");
        assert_eq!(RESOURCE.column_type.to_string(), "JSON");
        assert_eq!(ATTRIBUTES_NUMBER.column_type.to_string(), "Map(LowCardinality(String), Float64)");
        assert_eq!(SEVERITY_TEXT.to_string(), "severity_text LowCardinality(String)");
    }

    #[test]
    fn test_lookup() {
        assert_eq!(column("trace_flags"), Some(&TRACE_FLAGS));
        assert!(column("attributes").is_none());
        assert_eq!(BODY_JSON_PROMOTED.json_limits(), Some((32, 1024)));
        assert!(SEVERITY_NUMBER.column_type.is_unsigned());
        assert!(SEVERITY_TEXT.column_type.is_string());
    }
}

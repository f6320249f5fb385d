//! Type inference for filter operands

use logql::{FieldDataType, FilterOperator, JsonDataType, TelemetryFieldKey, Value};

/// Classify `value` in the context of `operator` and `key`, returning the inferred type and the
/// normalized value.
///
/// Lexical operators keep strings as strings. Otherwise strings are tried as integer, float and
/// boolean, in that order. Floats with an exact integer value become integers.
pub fn infer(value: &Value, operator: FilterOperator, key: &TelemetryFieldKey) -> (FieldDataType, Value) {
    match value {
        Value::Array(values) => {
            let Some(first) = values.first() else {
                return (FieldDataType::Unspecified, value.clone());
            };
            // nested arrays have no SQL shape here
            if first.is_array() {
                return (FieldDataType::Unspecified, value.clone());
            }
            let (element_type, _) = infer_scalar(first, operator);
            let normalized = Value::Array(values.iter().map(|v| infer_scalar(v, operator).1).collect());
            if operator.takes_list() || key.field_data_type.is_array() || key.has_any_index_marker() {
                (element_type.array_of(), normalized)
            } else {
                (element_type, normalized)
            }
        }
        scalar => infer_scalar(scalar, operator),
    }
}

/// Same as [`infer`], expressed as a JSON storage type. Unknown types are `Dynamic`.
pub fn infer_json(value: &Value, operator: FilterOperator, key: &TelemetryFieldKey) -> (JsonDataType, Value) {
    let (data_type, value) = infer(value, operator, key);
    let json_type = match data_type {
        FieldDataType::Unspecified => JsonDataType::Dynamic,
        FieldDataType::Number => JsonDataType::Float64,
        other => JsonDataType::from_field_data_type(other).unwrap_or(JsonDataType::Dynamic),
    };
    (json_type, value)
}

fn infer_scalar(value: &Value, operator: FilterOperator) -> (FieldDataType, Value) {
    match value {
        Value::String(s) if operator.is_string_search() => (FieldDataType::String, Value::String(s.clone())),
        Value::String(s) => parse_str(s),
        Value::Int(i) => (FieldDataType::Int64, Value::Int(*i)),
        Value::Float(f) => match exact_int(*f) {
            Some(i) => (FieldDataType::Int64, Value::Int(i)),
            None => (FieldDataType::Float64, Value::Float(*f)),
        },
        Value::Bool(b) => (FieldDataType::Bool, Value::Bool(*b)),
        Value::Null => (FieldDataType::Unspecified, Value::Null),
        Value::Array(_) => (FieldDataType::Unspecified, value.clone()),
    }
}

fn parse_str(s: &str) -> (FieldDataType, Value) {
    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return (FieldDataType::Int64, Value::Int(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return match exact_int(f) {
                Some(i) => (FieldDataType::Int64, Value::Int(i)),
                None => (FieldDataType::Float64, Value::Float(f)),
            };
        }
    }
    match trimmed {
        "true" | "True" | "TRUE" | "t" | "T" => (FieldDataType::Bool, Value::Bool(true)),
        "false" | "False" | "FALSE" | "f" | "F" => (FieldDataType::Bool, Value::Bool(false)),
        _ => (FieldDataType::String, Value::String(s.to_string())),
    }
}

fn exact_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

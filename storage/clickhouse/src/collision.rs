//! Comparisons between a field and a value of a different type.
//!
//! The same attribute name can be stored as a string in one log and as a number in another, and
//! users type `status = 200` without knowing which. Instead of failing, the field expression is
//! cast so the comparison is well typed, or the value is turned into text.

use logql::{FieldDataType, FilterOperator, TelemetryFieldKey, Value};
use tracing::debug;

/// Rewrites `(expr, value)` into an equivalent pair whose types agree.
///
/// Injected into the condition strategies so the rules can change without touching them.
pub type CollisionRewrite = fn(&TelemetryFieldKey, &Value, &str, FilterOperator) -> (String, Value);

/// Default rewrite rules, keyed on the declared type of the field (element type for arrays).
pub fn handle_collision(key: &TelemetryFieldKey, value: &Value, expr: &str, operator: FilterOperator) -> (String, Value) {
    let data_type = key.field_data_type.element_type();

    if operator.is_string_search() && (data_type.is_numeric() || data_type == FieldDataType::Bool) {
        debug!("collision: {} {} on {} compared as text", key.name, operator, data_type);
        return (format!("toString({})", expr), value.clone());
    }

    let (rewritten, value) = match data_type {
        FieldDataType::String => match value {
            Value::Int(_) | Value::Float(_) => (format!("toFloat64OrNull({})", expr), value.clone()),
            Value::Bool(b) => (expr.to_string(), Value::String(b.to_string())),
            Value::Array(values) if all_numeric(values) => (format!("toFloat64OrNull({})", expr), value.clone()),
            Value::Array(values) => (expr.to_string(), Value::Array(values.iter().map(stringify).collect())),
            _ => return (expr.to_string(), value.clone()),
        },
        FieldDataType::Int64 | FieldDataType::Float64 | FieldDataType::Number => match value {
            Value::Int(_) | Value::Float(_) => (format!("toFloat64({})", expr), value.clone()),
            Value::String(_) => (format!("toString({})", expr), value.clone()),
            Value::Array(values) if all_numeric(values) => (format!("toFloat64({})", expr), value.clone()),
            Value::Array(values) if values.iter().any(|v| matches!(v, Value::String(_))) => {
                (format!("toString({})", expr), Value::Array(values.iter().map(stringify).collect()))
            }
            _ => return (expr.to_string(), value.clone()),
        },
        FieldDataType::Bool => match value {
            Value::String(_) => (format!("toString({})", expr), value.clone()),
            Value::Array(values) if values.iter().any(|v| matches!(v, Value::String(_))) => {
                (format!("toString({})", expr), Value::Array(values.iter().map(stringify).collect()))
            }
            _ => return (expr.to_string(), value.clone()),
        },
        _ => return (expr.to_string(), value.clone()),
    };
    debug!("collision: {} {} on {} rewritten to {} with {:?}", key.name, operator, data_type, rewritten, value);
    (rewritten, value)
}

fn all_numeric(values: &[Value]) -> bool { !values.is_empty() && values.iter().all(Value::is_numeric) }

fn stringify(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

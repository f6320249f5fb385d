//! Body paths searched inside the raw `body` string with ClickHouse JSON functions

use logql::{FieldDataType, FilterOperator, TelemetryFieldKey, Value, ANY_INDEX_MARKER};

use crate::condition::operators::{apply_operator, ScalarList};
use crate::error::ConditionError;
use crate::inference::infer;
use crate::schema;
use crate::sql_builder::SqlBuilder;
use crate::value::quote_literal;

/// JSONPath of a body key, e.g. `$."http"."status_code"` or `$."tags"[*]`.
pub fn json_path(key: &TelemetryFieldKey) -> String {
    let segments: Vec<String> = key
        .body_path()
        .split('.')
        .map(|segment| match segment.strip_suffix(ANY_INDEX_MARKER) {
            Some(name) => format!("\"{}\"{}", name, ANY_INDEX_MARKER),
            None => format!("\"{}\"", segment),
        })
        .collect();
    format!("$.{}", segments.join("."))
}

/// `JSON_EXISTS` check for EXISTS, its negation otherwise.
pub fn exists(key: &TelemetryFieldKey, operator: FilterOperator) -> String {
    let check = format!("JSON_EXISTS({}, {})", schema::BODY.name, quote_literal(&json_path(key)));
    if operator == FilterOperator::NotExists {
        format!("NOT {}", check)
    } else {
        check
    }
}

pub fn condition(key: &TelemetryFieldKey, operator: FilterOperator, value: &Value, sb: &mut SqlBuilder) -> Result<String, ConditionError> {
    if operator.is_existence() {
        return Ok(exists(key, operator));
    }

    let path = quote_literal(&json_path(key));
    let (data_type, value) = infer(value, operator, key);
    let element_type = if operator.is_string_search() { FieldDataType::String } else { data_type.element_type() };

    if key.has_any_index_marker() {
        let array = format!("JSONExtract(JSON_QUERY({}, {}), 'Array({})')", schema::BODY.name, path, extract_type(element_type).unwrap_or("String"));
        return array_condition(&array, key, operator, &value, sb);
    }

    let field = match extract_type(element_type) {
        Some(ch_type) => format!("JSONExtract(JSON_VALUE({}, {}), '{}')", schema::BODY.name, path, ch_type),
        None => format!("JSON_VALUE({}, {})", schema::BODY.name, path),
    };
    apply_operator(sb, &field, operator, &value, ScalarList::Reject)
}

fn extract_type(data_type: FieldDataType) -> Option<&'static str> {
    match data_type {
        FieldDataType::Int64 => Some("Int64"),
        FieldDataType::Float64 | FieldDataType::Number => Some("Float64"),
        FieldDataType::Bool => Some("Bool"),
        _ => None,
    }
}

/// Membership in an array addressed with `[*]`.
fn array_condition(array: &str, key: &TelemetryFieldKey, operator: FilterOperator, value: &Value, sb: &mut SqlBuilder) -> Result<String, ConditionError> {
    match operator {
        FilterOperator::Equal | FilterOperator::Contains => Ok(format!("has({}, {})", array, sb.var(value.clone()))),
        FilterOperator::NotEqual | FilterOperator::NotContains => Ok(format!("NOT has({}, {})", array, sb.var(value.clone()))),
        FilterOperator::In | FilterOperator::NotIn => {
            let values = match value.as_array() {
                Some(values) if !values.is_empty() => values,
                _ => return Err(ConditionError::InValues),
            };
            if operator == FilterOperator::In {
                let conditions: Vec<String> = values.iter().map(|v| format!("has({}, {})", array, sb.var(v.clone()))).collect();
                Ok(sb.or(conditions))
            } else {
                let conditions: Vec<String> = values.iter().map(|v| format!("NOT has({}, {})", array, sb.var(v.clone()))).collect();
                Ok(sb.and(conditions))
            }
        }
        _ => Err(ConditionError::unsupported(operator, format!("array path {}", key.name))),
    }
}

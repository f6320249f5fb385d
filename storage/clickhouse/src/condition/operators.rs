use logql::{FilterOperator, Value};

use crate::error::ConditionError;
use crate::sql_builder::SqlBuilder;
use crate::value::{contains_pattern, format_value_for_contains};

/// How IN / NOT IN treat a value that is not a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarList {
    Reject,
    /// Treat the scalar as a list of one
    Wrap,
}

/// Compile `field <operator> value`, binding every operand through `sb`.
///
/// Existence is not handled here since its shape depends on the physical column.
pub fn apply_operator(
    sb: &mut SqlBuilder,
    field: &str,
    operator: FilterOperator,
    value: &Value,
    scalar_list: ScalarList,
) -> Result<String, ConditionError> {
    use FilterOperator::*;

    let sql = match operator {
        Equal => sb.eq(field, value.clone()),
        NotEqual => sb.ne(field, value.clone()),
        GreaterThan => sb.gt(field, value.clone()),
        GreaterThanOrEqual => sb.gte(field, value.clone()),
        LessThan => sb.lt(field, value.clone()),
        LessThanOrEqual => sb.lte(field, value.clone()),
        Like => sb.like(field, value.clone()),
        NotLike => sb.not_like(field, value.clone()),
        ILike => sb.ilike(field, value.clone()),
        NotILike => sb.not_ilike(field, value.clone()),
        Regexp => format!("match({}, {})", field, sb.var(value.clone())),
        NotRegexp => format!("NOT match({}, {})", field, sb.var(value.clone())),
        Contains => sb.ilike(field, contains_pattern(&format_value_for_contains(value))),
        NotContains => sb.not_ilike(field, contains_pattern(&format_value_for_contains(value))),
        Between | NotBetween => {
            let [lower, upper] = between_bounds(value)?;
            if operator == Between {
                sb.between(field, lower.clone(), upper.clone())
            } else {
                sb.not_between(field, lower.clone(), upper.clone())
            }
        }
        In | NotIn => {
            let values = match (value, scalar_list) {
                (Value::Array(values), _) if !values.is_empty() => values.as_slice(),
                (Value::Array(_), _) | (_, ScalarList::Reject) => return Err(ConditionError::InValues),
                (scalar, ScalarList::Wrap) => std::slice::from_ref(scalar),
            };
            if operator == In {
                let conditions: Vec<String> = values.iter().map(|v| sb.eq(field, v.clone())).collect();
                sb.or(conditions)
            } else {
                let conditions: Vec<String> = values.iter().map(|v| sb.ne(field, v.clone())).collect();
                sb.and(conditions)
            }
        }
        Exists | NotExists => return Err(ConditionError::unsupported(operator, field)),
    };
    Ok(sql)
}

/// The two bounds of a BETWEEN operand.
pub fn between_bounds(value: &Value) -> Result<[&Value; 2], ConditionError> {
    match value.as_array() {
        Some([lower, upper]) => Ok([lower, upper]),
        _ => Err(ConditionError::BetweenValues),
    }
}

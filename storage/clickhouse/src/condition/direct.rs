use logql::{FilterOperator, TelemetryFieldKey, Value};

use super::operators::{apply_operator, ScalarList};
use super::ConditionStrategy;
use crate::collision::CollisionRewrite;
use crate::error::ConditionError;
use crate::field_mapper::{materialized_exists_column_name, FieldMapper};
use crate::json::{legacy, JsonConditionBuilder};
use crate::schema::{self, Column, ColumnType, ScalarType};
use crate::sql_builder::SqlBuilder;
use crate::value::quote_literal;

/// Compiles against the single expression the field mapper resolves a key to.
#[derive(Debug, Clone)]
pub struct DirectStrategy {
    mapper: FieldMapper,
    rewrite: CollisionRewrite,
    json: JsonConditionBuilder,
}

impl DirectStrategy {
    pub fn new(mapper: FieldMapper, rewrite: CollisionRewrite) -> Self { Self { mapper, rewrite, json: JsonConditionBuilder::new(rewrite) } }

    fn legacy_body(&self, key: &TelemetryFieldKey, operator: FilterOperator, value: &Value, sb: &mut SqlBuilder) -> Result<String, ConditionError> {
        let condition = legacy::condition(key, operator, value, sb)?;
        if !operator.adds_default_exists() {
            return Ok(condition);
        }
        Ok(sb.and(vec![condition, legacy::exists(key, FilterOperator::Exists)]))
    }

    /// EXISTS or NOT EXISTS, in the shape the column stores absence.
    fn exists_condition(
        &self,
        key: &TelemetryFieldKey,
        column: &Column,
        field: &str,
        operator: FilterOperator,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        let exists = operator == FilterOperator::Exists;

        match column.column_type {
            ColumnType::Json { .. } => Ok(format!("{} {}", field, if exists { "IS NOT NULL" } else { "IS NULL" })),
            t if t.is_string() => Ok(if exists { sb.ne(field, "") } else { sb.eq(field, "") }),
            t if t.is_unsigned() => Ok(if exists { sb.ne(field, 0) } else { sb.eq(field, 0) }),
            ColumnType::Map { value: ScalarType::String | ScalarType::Bool | ScalarType::Float64 } => {
                let contains = if key.materialized {
                    materialized_exists_column_name(key)
                } else {
                    format!("mapContains({}, {})", column.name, quote_literal(&key.name))
                };
                Ok(if exists { sb.eq(&contains, true) } else { sb.ne(&contains, true) })
            }
            _ => Err(ConditionError::unsupported(operator, format!("column {} of type {}", column.name, column.column_type))),
        }
    }
}

/// Plain columns and body JSON keys already carry their own absence semantics.
fn skips_default_exists(key: &TelemetryFieldKey, column: &Column) -> bool {
    match column.column_type {
        ColumnType::Scalar(_) | ColumnType::LowCardinality(_) => true,
        ColumnType::Json { .. } => key.is_body_json(),
        ColumnType::Map { .. } => false,
    }
}

impl ConditionStrategy for DirectStrategy {
    fn name(&self) -> &'static str { "direct" }

    fn can_handle(&self, _key: &TelemetryFieldKey, _column: &Column) -> bool { true }

    fn build(
        &self,
        key: &TelemetryFieldKey,
        column: &Column,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        if key.is_body_json() {
            if column.name == schema::BODY.name {
                return self.legacy_body(key, operator, value, sb);
            }
            if column.column_type.is_json() && !key.json_plan.is_empty() {
                return self.json.build_condition(key, operator, value, sb);
            }
        }

        let field = self.mapper.field_for(key)?;
        if operator.is_existence() {
            return self.exists_condition(key, column, &field, operator, sb);
        }

        let (compared, value) = (self.rewrite)(key, value, &field, operator);
        let condition = apply_operator(sb, &compared, operator, &value, ScalarList::Reject)?;
        if !operator.adds_default_exists() || skips_default_exists(key, column) {
            return Ok(condition);
        }
        let exists = self.exists_condition(key, column, &field, FilterOperator::Exists, sb)?;
        Ok(sb.and(vec![condition, exists]))
    }
}

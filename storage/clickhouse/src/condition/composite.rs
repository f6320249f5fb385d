use std::sync::Arc;

use logql::{FilterOperator, TelemetryFieldKey, Value};

use super::operators::{apply_operator, ScalarList};
use super::ConditionStrategy;
use crate::error::ConditionError;
use crate::registry::{CompositeOverride, LogicalField, LogicalFieldRegistry, PhysicalExpression};
use crate::schema::Column;
use crate::sql_builder::SqlBuilder;

/// Logical fields stored in several physical representations, e.g. the log body.
#[derive(Debug, Clone)]
pub struct CompositeStrategy {
    registry: Arc<LogicalFieldRegistry>,
}

impl CompositeStrategy {
    pub fn new(registry: Arc<LogicalFieldRegistry>) -> Self { Self { registry } }

    fn apply_override(
        &self,
        field: &LogicalField,
        canonical: &PhysicalExpression,
        handler: CompositeOverride,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        let sql = match handler {
            CompositeOverride::AnyNonEmpty => {
                let conditions: Vec<String> = field.expressions.iter().map(|e| sb.ne(&e.expression, e.empty_value.clone())).collect();
                sb.or(conditions)
            }
            CompositeOverride::AllEmpty => {
                let conditions: Vec<String> = field.expressions.iter().map(|e| sb.eq(&e.expression, e.empty_value.clone())).collect();
                sb.and(conditions)
            }
            CompositeOverride::AnyMatch => {
                let conditions: Vec<String> =
                    field.expressions.iter().map(|e| format!("match({}, {})", e.expression, sb.var(value.clone()))).collect();
                sb.or(conditions)
            }
            CompositeOverride::NoneMatch => {
                let conditions: Vec<String> =
                    field.expressions.iter().map(|e| format!("NOT match({}, {})", e.expression, sb.var(value.clone()))).collect();
                sb.and(conditions)
            }
            CompositeOverride::CaseInsensitive => match operator {
                FilterOperator::Like => sb.ilike(&canonical.expression, value.clone()),
                FilterOperator::NotLike => sb.not_ilike(&canonical.expression, value.clone()),
                _ => apply_operator(sb, &canonical.expression, operator, value, ScalarList::Reject)?,
            },
        };
        Ok(sql)
    }
}

impl ConditionStrategy for CompositeStrategy {
    fn name(&self) -> &'static str { "composite" }

    fn can_handle(&self, key: &TelemetryFieldKey, _column: &Column) -> bool {
        key.field_context.is_log_or_unspecified() && self.registry.contains(&key.name)
    }

    fn build(
        &self,
        key: &TelemetryFieldKey,
        _column: &Column,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        let field = self.registry.get(&key.name).ok_or_else(|| ConditionError::ColumnNotFound { key: key.to_string() })?;
        let canonical =
            field.canonical().ok_or_else(|| ConditionError::InvalidInput(format!("logical field {} has no physical expression", field.name)))?;

        if let Some(handler) = field.override_for(operator) {
            return self.apply_override(field, canonical, handler, operator, value, sb);
        }
        match operator {
            FilterOperator::Exists => Ok(sb.ne(&canonical.expression, canonical.empty_value.clone())),
            FilterOperator::NotExists => Ok(sb.eq(&canonical.expression, canonical.empty_value.clone())),
            _ => apply_operator(sb, &canonical.expression, operator, value, ScalarList::Reject),
        }
    }
}

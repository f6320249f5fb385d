use logql::{FilterOperator, TelemetryFieldKey, Value};

use super::ConditionStrategy;
use crate::error::ConditionError;
use crate::json::JsonConditionBuilder;
use crate::schema::Column;
use crate::sql_builder::SqlBuilder;

/// Paths that cross arrays inside a JSON column, compiled into nested `arrayExists` lambdas.
#[derive(Debug, Clone)]
pub struct LambdaStrategy {
    json: JsonConditionBuilder,
}

impl LambdaStrategy {
    pub fn new(json: JsonConditionBuilder) -> Self { Self { json } }
}

impl ConditionStrategy for LambdaStrategy {
    fn name(&self) -> &'static str { "lambda" }

    fn can_handle(&self, key: &TelemetryFieldKey, column: &Column) -> bool {
        column.column_type.is_json() && key.json_plan.first().is_some_and(|root| !root.is_terminal())
    }

    fn build(
        &self,
        key: &TelemetryFieldKey,
        _column: &Column,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        self.json.build_condition(key, operator, value, sb)
    }
}

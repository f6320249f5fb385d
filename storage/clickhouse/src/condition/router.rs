use std::sync::Arc;

use logql::{FilterOperator, TelemetryFieldKey, Value};
use tracing::debug;

use super::{CompositeStrategy, ConditionStrategy, DirectStrategy, LambdaStrategy};
use crate::collision::CollisionRewrite;
use crate::error::ConditionError;
use crate::field_mapper::FieldMapper;
use crate::json::JsonConditionBuilder;
use crate::registry::LogicalFieldRegistry;
use crate::schema::Column;
use crate::sql_builder::SqlBuilder;

/// Picks the first strategy, in priority order, that can handle a key and its column.
pub struct ConditionRouter {
    strategies: Vec<Box<dyn ConditionStrategy>>,
    fallback: DirectStrategy,
}

impl ConditionRouter {
    /// Composite, then lambda, then direct.
    pub fn new(mapper: FieldMapper, registry: Arc<LogicalFieldRegistry>, rewrite: CollisionRewrite) -> Self {
        let direct = DirectStrategy::new(mapper, rewrite);
        Self {
            strategies: vec![
                Box::new(CompositeStrategy::new(registry)),
                Box::new(LambdaStrategy::new(JsonConditionBuilder::new(rewrite))),
                Box::new(direct.clone()),
            ],
            fallback: direct,
        }
    }

    pub fn select(&self, key: &TelemetryFieldKey, column: &Column) -> &dyn ConditionStrategy {
        self.strategies.iter().find(|strategy| strategy.can_handle(key, column)).map(|strategy| &**strategy).unwrap_or(&self.fallback)
    }

    pub fn route(
        &self,
        key: &TelemetryFieldKey,
        column: &Column,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        let strategy = self.select(key, column);
        debug!("routing {} {} on column {} to the {} strategy", key.name, operator, column.name, strategy.name());
        strategy.build(key, column, operator, value, sb)
    }
}

impl std::fmt::Debug for ConditionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|strategy| strategy.name()).collect();
        f.debug_struct("ConditionRouter").field("strategies", &names).finish()
    }
}

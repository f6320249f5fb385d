//! Compiling one `(key, operator, value)` comparison into a ClickHouse predicate.

pub mod composite;
pub mod direct;
pub mod lambda;
pub mod operators;
pub mod router;

use std::sync::Arc;

use logql::{FilterOperator, TelemetryFieldKey, Value};
use tracing::debug;

use crate::collision::{handle_collision, CollisionRewrite};
use crate::config::CompilerConfig;
use crate::error::ConditionError;
use crate::field_mapper::FieldMapper;
use crate::json::{JsonFieldResolver, JsonPlanner};
use crate::schema::Column;
use crate::sql_builder::SqlBuilder;

pub use composite::CompositeStrategy;
pub use direct::DirectStrategy;
pub use lambda::LambdaStrategy;
pub use router::ConditionRouter;

/// One way of compiling a comparison against a physical representation.
pub trait ConditionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Routing looks at the key and its column only, never at the operator or value.
    fn can_handle(&self, key: &TelemetryFieldKey, column: &Column) -> bool;

    fn build(
        &self,
        key: &TelemetryFieldKey,
        column: &Column,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError>;
}

/// Entry point of the compiler.
///
/// ```rust,ignore
/// let builder = ConditionBuilder::new(CompilerConfig::default());
/// let mut sb = SqlBuilder::new();
/// let key = TelemetryFieldKey::attribute("status", FieldDataType::Number);
/// let sql = builder.condition_for(&key, FilterOperator::Equal, &Value::Int(200), &mut sb)?;
/// sb.where_(sql);
/// ```
#[derive(Debug)]
pub struct ConditionBuilder {
    mapper: FieldMapper,
    router: ConditionRouter,
    planner: Option<JsonPlanner>,
}

impl ConditionBuilder {
    pub fn new(config: CompilerConfig) -> Self { Self::with_rewrite(config, handle_collision) }

    pub fn with_rewrite(config: CompilerConfig, rewrite: CollisionRewrite) -> Self {
        let mapper = FieldMapper::new(config.body_json_enabled);
        let router = ConditionRouter::new(mapper, Arc::new(config.logical_fields), rewrite);
        Self { mapper, router, planner: None }
    }

    /// Plan body JSON keys that arrive without an access plan from the path types in `resolver`.
    pub fn with_resolver(mut self, resolver: Arc<JsonFieldResolver>) -> Self {
        self.planner = Some(JsonPlanner::new(resolver));
        self
    }

    pub fn field_mapper(&self) -> &FieldMapper { &self.mapper }

    pub fn router(&self) -> &ConditionRouter { &self.router }

    /// Compile one comparison, binding its operands through `sb`.
    ///
    /// On error `sb` holds exactly the parameters it held before the call.
    pub fn condition_for(
        &self,
        key: &TelemetryFieldKey,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        let checkpoint = sb.checkpoint();
        let result = self.compile(key, operator, value, sb);
        if result.is_err() {
            sb.rollback(checkpoint);
        }
        result
    }

    fn compile(&self, key: &TelemetryFieldKey, operator: FilterOperator, value: &Value, sb: &mut SqlBuilder) -> Result<String, ConditionError> {
        let column = self.mapper.column_for(key)?;

        match &self.planner {
            Some(planner) if column.column_type.is_json() && key.is_body_json() && key.json_plan.is_empty() => {
                debug!("planning {} before routing", key.name);
                let planned = key.clone().with_plan(planner.plan(key, operator, value)?);
                self.router.route(&planned, column, operator, value, sb)
            }
            _ => self.router.route(key, column, operator, value, sb),
        }
    }
}

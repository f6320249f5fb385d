//! ClickHouse condition compiler for logs
//!
//! Turns one `(field, operator, value)` comparison from a log filter into a ClickHouse predicate
//! with positional parameters, against the logs v2 table. The table does not look like the query
//! surface: free-form attributes live in typed maps, resources in a JSON column backed by a legacy
//! map, and the body in a JSON column whose arrays may hold typed objects or dynamically typed values.
//!
//! # Pieces
//!
//! - [`FieldMapper`] resolves a key to its physical column and the expression that reads it
//! - [`ConditionRouter`] picks a [`ConditionStrategy`]: composite fields, JSON array paths, or direct
//! - [`JsonConditionBuilder`] compiles JSON access plans into nested `arrayExists` lambdas
//! - [`JsonPlanner`] and [`JsonFieldResolver`] build those plans from a [`PathTypeCatalog`]
//! - [`SqlBuilder`] collects fragments and parameters, one `?` per parameter
//!
//! # Example
//!
//! ```rust,ignore
//! use logql::{FieldDataType, FilterOperator, TelemetryFieldKey, Value};
//! use logql_storage_clickhouse::{CompilerConfig, ConditionBuilder, SqlBuilder};
//!
//! let builder = ConditionBuilder::new(CompilerConfig::default());
//! let mut sb = SqlBuilder::new();
//! let status = TelemetryFieldKey::attribute("status", FieldDataType::Number);
//! let condition = builder.condition_for(&status, FilterOperator::Equal, &Value::Int(200), &mut sb)?;
//! // (toFloat64(attributes_number['status']) = ? AND mapContains(attributes_number, 'status') = ?)
//! ```

mod collision;
pub mod condition;
mod config;
mod error;
mod field_mapper;
mod inference;
pub mod json;
mod registry;
pub mod schema;
pub mod sql_builder;
mod value;

pub use collision::{handle_collision, CollisionRewrite};
pub use condition::{ConditionBuilder, ConditionRouter, ConditionStrategy};
pub use config::CompilerConfig;
pub use error::{CatalogError, ConditionError, ErrorKind};
pub use field_mapper::{materialized_column_name, materialized_exists_column_name, suggest_correction, FieldMapper};
pub use inference::{infer, infer_json};
pub use json::{InMemoryPathCatalog, JsonConditionBuilder, JsonFieldResolver, JsonPlanner, PathTypeCatalog};
pub use registry::{CompositeOverride, LogicalField, LogicalFieldRegistry, PhysicalExpression};
pub use sql_builder::SqlBuilder;
pub use value::{quote_identifier, quote_literal};

use std::str::FromStr;
use std::sync::Arc;

use tracing::Level;

#[allow(unused)]
pub use logql::{FieldContext, FieldDataType, FilterOperator, JsonDataType, TelemetryFieldKey, Value};
#[allow(unused)]
pub use logql_storage_clickhouse::{
    sql_builder::count_placeholders, CompilerConfig, ConditionBuilder, ConditionError, ErrorKind, InMemoryPathCatalog, JsonFieldResolver,
    SqlBuilder,
};

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// Path types of a small log corpus: users with nested education records, some stored as typed
/// objects and some as dynamic values.
#[allow(unused)]
pub fn catalog() -> InMemoryPathCatalog {
    InMemoryPathCatalog::new()
        .with_path("user.name", ["String"])
        .with_path("user.age", ["Int64"])
        .with_path("user.height", ["Float64"])
        .with_path("education", ["Array(JSON(max_dynamic_types=16, max_dynamic_paths=0))", "Array(Dynamic)"])
        .with_path("education[].name", ["String"])
        .with_path("education[].year", ["Int64"])
        .with_path("education[].awards", ["Array(JSON(max_dynamic_types=8, max_dynamic_paths=0))"])
        .with_path("education[].awards[].type", ["String"])
        .with_path("education[].scores", ["Array(Nullable(Float64))"])
        .with_path("tags", ["Array(Nullable(String))"])
        .with_path("mixed", ["Array(Dynamic)"])
}

#[allow(unused)]
pub fn planning_builder() -> ConditionBuilder {
    ConditionBuilder::new(CompilerConfig::default()).with_resolver(Arc::new(JsonFieldResolver::new(Arc::new(catalog()))))
}

/// Compile one condition on a fresh builder, checking that placeholders and parameters line up.
#[allow(unused)]
pub fn compile(builder: &ConditionBuilder, key: &TelemetryFieldKey, operator: FilterOperator, value: Value) -> Result<(String, Vec<Value>), ConditionError> {
    let mut sb = SqlBuilder::new();
    let sql = builder.condition_for(key, operator, &value, &mut sb)?;
    let params = sb.params().to_vec();
    assert_eq!(count_placeholders(&sql), params.len(), "placeholders in {}", sql);
    Ok((sql, params))
}

#[allow(unused)]
pub fn body(name: &str) -> TelemetryFieldKey { TelemetryFieldKey::new(name, FieldContext::Unspecified, FieldDataType::Unspecified) }

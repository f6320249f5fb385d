//! Builds access plans for body JSON keys from the path type catalog.

use std::sync::Arc;

use logql::{
    FilterOperator, JsonAccessKind, JsonAccessNode, JsonBranchType, JsonBranches, JsonDataType, TelemetryFieldKey, TerminalConfig, Value,
    ANY_INDEX_MARKER,
};
use tracing::debug;

use crate::error::ConditionError;
use crate::inference::infer_json;
use crate::json::resolver::JsonFieldResolver;
use crate::schema::{self, Column};

const ARRAY_HOP: &str = "[].";

#[derive(Debug, Clone)]
pub struct JsonPlanner {
    resolver: Arc<JsonFieldResolver>,
}

impl JsonPlanner {
    pub fn new(resolver: Arc<JsonFieldResolver>) -> Self { Self { resolver } }

    pub fn resolver(&self) -> &JsonFieldResolver { &self.resolver }

    /// One plan over `body_json`, and a second over `body_json_promoted` for materialized keys.
    pub fn plan(&self, key: &TelemetryFieldKey, operator: FilterOperator, value: &Value) -> Result<Vec<JsonAccessNode>, ConditionError> {
        let path = key.body_path().replace(ANY_INDEX_MARKER, "[]");
        let path = path.strip_suffix("[]").unwrap_or(&path);
        if path.is_empty() {
            return Err(ConditionError::InvalidInput(format!("empty JSON path in {}", key.name)));
        }
        let segments: Vec<&str> = path.split(ARRAY_HOP).collect();
        if segments.iter().any(|segment| segment.is_empty() || segment.contains("[]")) {
            return Err(ConditionError::InvalidInput(format!("malformed JSON path {}", key.name)));
        }

        let (value_type, _) = infer_json(value, operator, key);
        let mut plans = vec![self.plan_column(&schema::BODY_JSON, &segments, key, value_type)?];
        if key.materialized {
            plans.push(self.plan_column(&schema::BODY_JSON_PROMOTED, &segments, key, value_type)?);
        }
        debug!("planned {} over {} column(s), depth {}", key.name, plans.len(), plans[0].depth());
        Ok(plans)
    }

    fn plan_column(&self, column: &Column, segments: &[&str], key: &TelemetryFieldKey, value_type: JsonDataType) -> Result<JsonAccessNode, ConditionError> {
        let (max_types, max_paths) =
            column.json_limits().ok_or_else(|| ConditionError::InvalidInput(format!("column {} is not a JSON column", column.name)))?;
        // the first path segment is already one level below the column
        let root = JsonAccessNode::new(column.name, segments[0], max_types / 2, max_paths / 4, unplanned());
        self.plan_node(root, segments, 0, key, value_type)
    }

    fn plan_node(
        &self,
        mut node: JsonAccessNode,
        segments: &[&str],
        index: usize,
        key: &TelemetryFieldKey,
        value_type: JsonDataType,
    ) -> Result<JsonAccessNode, ConditionError> {
        let catalog_path = segments[..=index].join(ARRAY_HOP);
        let available = self.resolver.types_for(&catalog_path)?;

        if index + 1 == segments.len() {
            let elem_type = key
                .json_data_type
                .or_else(|| JsonDataType::from_field_data_type(key.field_data_type))
                .or_else(|| available.first().copied())
                .unwrap_or(JsonDataType::Dynamic);
            node.kind = JsonAccessKind::Terminal(TerminalConfig { elem_type, value_type });
            return Ok(node.with_available_types(available));
        }

        let mut branches = JsonBranches::default();
        for (branch, array_type) in [(JsonBranchType::Json, JsonDataType::ArrayJson), (JsonBranchType::Dynamic, JsonDataType::ArrayDynamic)] {
            if available.contains(&array_type) {
                let child = node.child(segments[index + 1], branch, unplanned());
                branches.set(branch, self.plan_node(child, segments, index + 1, key, value_type)?);
            }
        }
        if branches.is_empty() {
            return Err(ConditionError::InvalidInput(format!("{} is not an array of objects", catalog_path)));
        }
        node.kind = JsonAccessKind::Hop(branches);
        Ok(node.with_available_types(available))
    }
}

fn unplanned() -> JsonAccessKind { JsonAccessKind::Hop(JsonBranches::default()) }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::resolver::InMemoryPathCatalog;
    use logql::{FieldContext, FieldDataType};

    const ARRAY_JSON: &str = "Array(JSON(max_dynamic_types=16, max_dynamic_paths=0))";

    fn planner() -> JsonPlanner {
        let catalog = InMemoryPathCatalog::new()
            .with_path("user.name", ["String"])
            .with_path("education", [ARRAY_JSON, "Array(Dynamic)"])
            .with_path("education[].name", ["String"])
            .with_path("education[].awards", [ARRAY_JSON])
            .with_path("education[].awards[].type", ["String"])
            .with_path("tags", ["Array(Nullable(String))"])
            .with_path("user", ["JSON"]);
        JsonPlanner::new(Arc::new(JsonFieldResolver::new(Arc::new(catalog))))
    }

    fn key(name: &str) -> TelemetryFieldKey { TelemetryFieldKey::new(name, FieldContext::Unspecified, FieldDataType::Unspecified) }

    #[test]
    fn test_scalar_path() {
        let plans = planner().plan(&key("body.user.name"), FilterOperator::Equal, &"alice".into()).unwrap();
        assert_eq!(plans.len(), 1);
        let root = &plans[0];
        assert_eq!((root.name.as_str(), root.column.as_str()), ("user.name", "body_json"));
        assert_eq!((root.max_dynamic_types, root.max_dynamic_paths), (16, 0));
        assert_eq!(root.terminal(), Some(&TerminalConfig { elem_type: JsonDataType::String, value_type: JsonDataType::String }));
        assert_eq!(root.available_types, vec![JsonDataType::String]);
    }

    #[test]
    fn test_nested_hops() {
        let plans = planner().plan(&key("body.education[].awards[].type"), FilterOperator::Equal, &"sports".into()).unwrap();
        let education = &plans[0];
        let branches = education.branches().unwrap();
        assert!(branches.dynamic.is_some());

        let awards = branches.get(JsonBranchType::Json).unwrap();
        assert_eq!((awards.max_dynamic_types, awards.max_dynamic_paths), (8, 0));
        assert_eq!(awards.ancestors, vec!["education".to_string()]);

        let kind = awards.branches().unwrap().get(JsonBranchType::Json).unwrap();
        assert_eq!(kind.path(), "education[].awards[].type");
        assert!(kind.is_terminal());

        let via_dynamic = branches.get(JsonBranchType::Dynamic).unwrap();
        assert_eq!((via_dynamic.max_dynamic_types, via_dynamic.max_dynamic_paths), (16, 256));
        assert_eq!(education.depth(), 3);
    }

    #[test]
    fn test_materialized_key_plans_promoted_column() {
        let plans = planner().plan(&key("body.user.name").materialized(), FilterOperator::Exists, &Value::Null).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[1].column, "body_json_promoted");
        assert_eq!((plans[1].max_dynamic_types, plans[1].max_dynamic_paths), (16, 256));
        assert_eq!(plans[1].terminal().unwrap().value_type, JsonDataType::Dynamic);
    }

    #[test]
    fn test_terminal_types() {
        let planner = planner();
        let declared = TelemetryFieldKey::body("user.name", JsonDataType::Int64);
        let plans = planner.plan(&declared, FilterOperator::Equal, &Value::Int(1)).unwrap();
        assert_eq!(plans[0].terminal().unwrap().elem_type, JsonDataType::Int64);

        let plans = planner.plan(&key("body.tags[*]"), FilterOperator::Contains, &"a".into()).unwrap();
        assert_eq!(plans[0].terminal().unwrap().elem_type, JsonDataType::ArrayString);

        let plans = planner.plan(&key("body.unknown"), FilterOperator::Exists, &Value::Null).unwrap();
        assert_eq!(plans[0].terminal().unwrap().elem_type, JsonDataType::Dynamic);
    }

    #[test]
    fn test_invalid_paths() {
        let planner = planner();
        assert!(matches!(planner.plan(&key("body."), FilterOperator::Exists, &Value::Null), Err(ConditionError::InvalidInput(_))));
        assert!(matches!(planner.plan(&key("body.a[].[].b"), FilterOperator::Exists, &Value::Null), Err(ConditionError::InvalidInput(_))));
        let err = planner.plan(&key("body.user[].name"), FilterOperator::Exists, &Value::Null).unwrap_err();
        assert_eq!(err, ConditionError::InvalidInput("user is not an array of objects".into()));
    }
}

//! Predicates over JSON access plans.
//!
//! Every array hop on the way to the compared value becomes an `arrayExists` whose lambda binds
//! the hop's elements, so `education[].awards[].type = 'x'` reads "some education has some award
//! whose type is x". A hop stored both as `Array(JSON)` and `Array(Dynamic)` is checked through
//! both representations.

use logql::{FilterOperator, JsonAccessKind, JsonAccessNode, JsonDataType, TelemetryFieldKey, TerminalConfig, Value};
use tracing::debug;

use crate::collision::{handle_collision, CollisionRewrite};
use crate::condition::operators::{apply_operator, ScalarList};
use crate::error::ConditionError;
use crate::sql_builder::SqlBuilder;
use crate::value::format_value_for_contains;

#[derive(Debug, Clone, Copy)]
pub struct JsonConditionBuilder {
    rewrite: CollisionRewrite,
}

impl Default for JsonConditionBuilder {
    fn default() -> Self { Self::new(handle_collision) }
}

impl JsonConditionBuilder {
    pub fn new(rewrite: CollisionRewrite) -> Self { Self { rewrite } }

    /// OR of the condition compiled along each of the key's plans.
    ///
    /// NOT EXISTS over an array path, or over several plans, compiles as `NOT` of EXISTS.
    pub fn build_condition(&self, key: &TelemetryFieldKey, operator: FilterOperator, value: &Value, sb: &mut SqlBuilder) -> Result<String, ConditionError> {
        if key.json_plan.is_empty() {
            return Err(ConditionError::InvalidInput(format!("no JSON access plan for {}", key.name)));
        }
        if operator == FilterOperator::NotExists && !is_single_scalar(&key.json_plan) {
            let exists = self.build_condition(key, FilterOperator::Exists, value, sb)?;
            return Ok(format!("NOT {}", exists));
        }
        let mut conditions = Vec::with_capacity(key.json_plan.len());
        for root in &key.json_plan {
            conditions.push(self.recurse_array_hops(key, root, operator, value, sb)?);
        }
        Ok(sb.or(conditions))
    }

    fn recurse_array_hops(
        &self,
        key: &TelemetryFieldKey,
        node: &JsonAccessNode,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        let branches = match &node.kind {
            JsonAccessKind::Terminal(config) => return self.terminal_condition(key, node, config, operator, value, sb),
            JsonAccessKind::Hop(branches) => branches,
        };

        let alias = node.alias();
        let field_path = node.field_path();
        let mut conditions = Vec::with_capacity(2);

        if let Some(child) = branches.json.as_deref() {
            let inner = self.recurse_array_hops(key, child, operator, value, sb)?;
            conditions.push(format!(
                "arrayExists({}-> {}, dynamicElement({}, 'Array(JSON(max_dynamic_types={}, max_dynamic_paths={}))'))",
                alias, inner, field_path, node.max_dynamic_types, node.max_dynamic_paths
            ));
        }
        if let Some(child) = branches.dynamic.as_deref() {
            let inner = self.recurse_array_hops(key, child, operator, value, sb)?;
            conditions.push(format!(
                "arrayExists({}-> {}, arrayMap(x->dynamicElement(x, 'JSON'), arrayFilter(x->(dynamicType(x) = 'JSON'), dynamicElement({}, 'Array(Dynamic)'))))",
                alias, inner, field_path
            ));
        }

        if conditions.len() > 1 {
            return Ok(sb.or(conditions));
        }
        conditions.pop().ok_or_else(|| ConditionError::NavigationFailed(format!("array hop {} has no branch", node.path())))
    }

    fn terminal_condition(
        &self,
        key: &TelemetryFieldKey,
        node: &JsonAccessNode,
        config: &TerminalConfig,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        if !config.elem_type.is_array() {
            return self.primitive_condition(key, node, config, operator, value, sb);
        }
        // an array is present when it has elements, whatever their values
        let array_expr = format!("dynamicElement({}, '{}')", node.field_path(), config.elem_type);
        match operator {
            FilterOperator::Exists => return Ok(format!("length({}) > 0", array_expr)),
            FilterOperator::NotExists => return Ok(format!("length({}) = 0", array_expr)),
            _ => {}
        }

        let mut operator = operator;
        let mut conditions = Vec::with_capacity(2);
        if !config.value_type.is_array() {
            // a scalar searched in an array also matches elements textually
            if operator.is_string_search() {
                conditions.push(self.array_membership(key, node, config, operator, &format_value_for_contains(value), sb)?);
            }
            operator = match operator {
                FilterOperator::Contains | FilterOperator::In => FilterOperator::Equal,
                FilterOperator::NotContains | FilterOperator::NotIn => FilterOperator::NotEqual,
                other => other,
            };
        }
        conditions.push(self.array_membership(key, node, config, operator, value, sb)?);
        Ok(sb.or(conditions))
    }

    fn array_membership(
        &self,
        key: &TelemetryFieldKey,
        node: &JsonAccessNode,
        config: &TerminalConfig,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        let field_path = node.field_path();
        let (array_expr, element_type) = if config.elem_type == JsonDataType::ArrayDynamic {
            let element_type = config.value_type.element_type().unwrap_or(config.value_type);
            if element_type == JsonDataType::Dynamic {
                // an untyped operand is compared with every element
                (format!("dynamicElement({}, 'Array(Dynamic)')", field_path), element_type)
            } else {
                // keep the elements whose runtime type matches the value
                let expr = format!(
                    "arrayMap(x->dynamicElement(x, '{t}'), arrayFilter(x->(dynamicType(x) = '{t}'), dynamicElement({}, 'Array(Dynamic)')))",
                    field_path,
                    t = element_type
                );
                (expr, element_type)
            }
        } else {
            let element_type = config.elem_type.element_type().unwrap_or(JsonDataType::Dynamic);
            (format!("dynamicElement({}, '{}')", field_path, config.elem_type), element_type)
        };

        let element_key = key.retyped(element_type.field_data_type().array_of());
        let (element, value) = (self.rewrite)(&element_key, value, "x", operator);
        let condition = apply_json_operator(sb, &element, operator, &value)?;
        Ok(format!("arrayExists(x -> {}, {})", condition, array_expr))
    }

    fn primitive_condition(
        &self,
        key: &TelemetryFieldKey,
        node: &JsonAccessNode,
        config: &TerminalConfig,
        operator: FilterOperator,
        value: &Value,
        sb: &mut SqlBuilder,
    ) -> Result<String, ConditionError> {
        let field_path = node.field_path();
        let elem_type = config.elem_type;
        let typed_key = key.retyped(elem_type.field_data_type());
        let value = if operator.is_string_search() { format_value_for_contains(value) } else { value.clone() };
        let expr = format!("dynamicElement({}, '{}')", field_path, elem_type);

        if elem_type.index_supported() && key.has_index(elem_type, &field_path) {
            let zero = zero_value(elem_type);
            let (indexed_operator, indexed_value) = match operator {
                FilterOperator::Exists => (FilterOperator::NotEqual, zero.clone()),
                FilterOperator::NotExists => (FilterOperator::Equal, zero.clone()),
                _ => (operator, value.clone()),
            };
            debug!("{} compared through the skip index on {}", key.name, field_path);

            let indexed_expr = format!("assumeNotNull({})", expr);
            let (indexed_field, compared) = (self.rewrite)(&typed_key, &indexed_value, &indexed_expr, indexed_operator);
            let indexed = apply_json_operator(sb, &indexed_field, indexed_operator, &compared)?;

            // assumeNotNull reads a missing path as zero, so a zero comparison also needs the path present
            if operator == FilterOperator::NotExists || !is_zero(&indexed_value, &zero) {
                return Ok(indexed);
            }
            let present = apply_json_operator(sb, &expr, FilterOperator::Exists, &Value::Null)?;
            return Ok(sb.and(vec![indexed, present]));
        }

        let (field, value) = (self.rewrite)(&typed_key, &value, &expr, operator);
        apply_json_operator(sb, &field, operator, &value)
    }
}

/// Operator table for JSON sub-columns, where absence reads as NULL.
pub fn apply_json_operator(sb: &mut SqlBuilder, field: &str, operator: FilterOperator, value: &Value) -> Result<String, ConditionError> {
    match operator {
        FilterOperator::Exists => Ok(format!("{} IS NOT NULL", field)),
        FilterOperator::NotExists => Ok(format!("{} IS NULL", field)),
        _ => apply_operator(sb, field, operator, value, ScalarList::Wrap),
    }
}

fn is_single_scalar(plans: &[JsonAccessNode]) -> bool {
    match plans {
        [root] => root.terminal().is_some_and(|config| !config.elem_type.is_array()),
        _ => false,
    }
}

fn zero_value(data_type: JsonDataType) -> Value {
    match data_type {
        JsonDataType::String => Value::String(String::new()),
        JsonDataType::Bool => Value::Bool(false),
        _ => Value::Int(0),
    }
}

fn is_zero(value: &Value, zero: &Value) -> bool {
    match (value, zero) {
        (Value::Float(f), Value::Int(0)) => *f == 0.0,
        _ => value == zero,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logql::{FieldContext, FieldDataType, JsonBranchType, JsonBranches};

    fn terminal(elem_type: JsonDataType, value_type: JsonDataType) -> JsonAccessKind {
        JsonAccessKind::Terminal(TerminalConfig { elem_type, value_type })
    }

    fn body_key(name: &str, plan: Vec<JsonAccessNode>) -> TelemetryFieldKey {
        TelemetryFieldKey::new(name, FieldContext::Body, FieldDataType::Unspecified).with_plan(plan)
    }

    /// `education[].<leaf>` with the given branches present on the `education` hop.
    fn education(leaf: &str, leaf_kind: JsonAccessKind, json: bool, dynamic: bool) -> JsonAccessNode {
        let mut hop = JsonAccessNode::new("body_json", "education", 16, 0, JsonAccessKind::Hop(JsonBranches::default()));
        let mut branches = JsonBranches::default();
        if json {
            branches.set(JsonBranchType::Json, hop.child(leaf, JsonBranchType::Json, leaf_kind.clone()));
        }
        if dynamic {
            branches.set(JsonBranchType::Dynamic, hop.child(leaf, JsonBranchType::Dynamic, leaf_kind));
        }
        hop.kind = JsonAccessKind::Hop(branches);
        hop
    }

    fn compile(key: &TelemetryFieldKey, operator: FilterOperator, value: Value) -> Result<(String, Vec<Value>), ConditionError> {
        let mut sb = SqlBuilder::new();
        let sql = JsonConditionBuilder::default().build_condition(key, operator, &value, &mut sb)?;
        Ok((sql, sb.params().to_vec()))
    }

    #[test]
    fn test_scalar_root() {
        let plan = JsonAccessNode::new("body_json", "user.name", 16, 0, terminal(JsonDataType::String, JsonDataType::String));
        let key = body_key("user.name", vec![plan]);
        assert_eq!(
            compile(&key, FilterOperator::Equal, "alice".into()).unwrap(),
            ("(dynamicElement(body_json.`user.name`, 'String') = ?)".to_string(), vec![Value::from("alice")])
        );
        assert_eq!(
            compile(&key, FilterOperator::NotExists, Value::Null).unwrap().0,
            "(dynamicElement(body_json.`user.name`, 'String') IS NULL)"
        );
    }

    #[test]
    fn test_promoted_plan_is_ored() {
        let plans = vec![
            JsonAccessNode::new("body_json", "user.name", 16, 0, terminal(JsonDataType::String, JsonDataType::String)),
            JsonAccessNode::new("body_json_promoted", "user.name", 16, 256, terminal(JsonDataType::String, JsonDataType::String)),
        ];
        let key = body_key("user.name", plans).materialized();
        assert_eq!(
            compile(&key, FilterOperator::Equal, "alice".into()).unwrap(),
            (
                "(dynamicElement(body_json.`user.name`, 'String') = ? OR dynamicElement(body_json_promoted.`user.name`, 'String') = ?)".to_string(),
                vec![Value::from("alice"), Value::from("alice")]
            )
        );
    }

    #[test]
    fn test_json_branch_only() {
        let key = body_key("education[].name", vec![education("name", terminal(JsonDataType::String, JsonDataType::String), true, false)]);
        assert_eq!(
            compile(&key, FilterOperator::Contains, "IIT".into()).unwrap(),
            (
                "(arrayExists(`body_json.education`-> LOWER(dynamicElement(`body_json.education`.`name`, 'String')) LIKE LOWER(?), \
                 dynamicElement(body_json.`education`, 'Array(JSON(max_dynamic_types=16, max_dynamic_paths=0))')))"
                    .to_string(),
                vec![Value::from("%IIT%")]
            )
        );
    }

    #[test]
    fn test_both_branches() {
        let key = body_key("education[].year", vec![education("year", terminal(JsonDataType::Int64, JsonDataType::Int64), true, true)]);
        let (sql, params) = compile(&key, FilterOperator::GreaterThan, Value::Int(2010)).unwrap();
        assert_eq!(
            sql,
            "((arrayExists(`body_json.education`-> toFloat64(dynamicElement(`body_json.education`.`year`, 'Int64')) > ?, \
             dynamicElement(body_json.`education`, 'Array(JSON(max_dynamic_types=16, max_dynamic_paths=0))')) OR \
             arrayExists(`body_json.education`-> toFloat64(dynamicElement(`body_json.education`.`year`, 'Int64')) > ?, \
             arrayMap(x->dynamicElement(x, 'JSON'), arrayFilter(x->(dynamicType(x) = 'JSON'), dynamicElement(body_json.`education`, 'Array(Dynamic)'))))))"
        );
        assert_eq!(params, vec![Value::Int(2010), Value::Int(2010)]);
    }

    #[test]
    fn test_hop_without_branches_fails() {
        let hop = JsonAccessNode::new("body_json", "education", 16, 0, JsonAccessKind::Hop(JsonBranches::default()));
        let key = body_key("education[].name", vec![hop]);
        let err = compile(&key, FilterOperator::Exists, Value::Null).unwrap_err();
        assert!(err.is_internal());
        assert!(matches!(compile(&body_key("x", vec![]), FilterOperator::Exists, Value::Null), Err(ConditionError::InvalidInput(_))));
    }

    #[test]
    fn test_contains_scalar_in_typed_array() {
        let plan = JsonAccessNode::new("body_json", "scores", 16, 0, terminal(JsonDataType::ArrayFloat64, JsonDataType::Float64));
        let key = body_key("scores", vec![plan]);
        assert_eq!(
            compile(&key, FilterOperator::Contains, Value::Float(1.65)).unwrap(),
            (
                "((arrayExists(x -> LOWER(toString(x)) LIKE LOWER(?), dynamicElement(body_json.`scores`, 'Array(Nullable(Float64))')) OR \
                 arrayExists(x -> toFloat64(x) = ?, dynamicElement(body_json.`scores`, 'Array(Nullable(Float64))'))))"
                    .to_string(),
                vec![Value::from("%1.65%"), Value::Float(1.65)]
            )
        );
    }

    #[test]
    fn test_mismatched_scalars_in_typed_array() {
        let plan = JsonAccessNode::new("body_json", "scores", 16, 0, terminal(JsonDataType::ArrayFloat64, JsonDataType::Bool));
        let key = body_key("scores", vec![plan]);
        assert_eq!(
            compile(&key, FilterOperator::Equal, Value::Bool(true)).unwrap().0,
            "((arrayExists(x -> x = ?, dynamicElement(body_json.`scores`, 'Array(Nullable(Float64))'))))"
        );

        let plan = JsonAccessNode::new("body_json", "scores", 16, 0, terminal(JsonDataType::ArrayFloat64, JsonDataType::String));
        let key = body_key("scores", vec![plan]);
        assert_eq!(
            compile(&key, FilterOperator::Equal, "high".into()).unwrap().0,
            "((arrayExists(x -> toString(x) = ?, dynamicElement(body_json.`scores`, 'Array(Nullable(Float64))'))))"
        );
    }

    #[test]
    fn test_dynamic_array_filters_by_value_type() {
        let plan = JsonAccessNode::new("body_json", "tags", 16, 0, terminal(JsonDataType::ArrayDynamic, JsonDataType::ArrayString));
        let key = body_key("tags", vec![plan]);
        assert_eq!(
            compile(&key, FilterOperator::In, vec!["a", "b"].into()).unwrap(),
            (
                "((arrayExists(x -> (x = ? OR x = ?), arrayMap(x->dynamicElement(x, 'String'), \
                 arrayFilter(x->(dynamicType(x) = 'String'), dynamicElement(body_json.`tags`, 'Array(Dynamic)'))))))"
                    .to_string(),
                vec![Value::from("a"), Value::from("b")]
            )
        );
    }

    #[test]
    fn test_array_terminal_existence() {
        let plan = JsonAccessNode::new("body_json", "tags", 16, 0, terminal(JsonDataType::ArrayString, JsonDataType::Dynamic));
        let key = body_key("tags", vec![plan]);
        let exists = compile(&key, FilterOperator::Exists, Value::Null).unwrap();
        assert_eq!(exists, ("(length(dynamicElement(body_json.`tags`, 'Array(Nullable(String))')) > 0)".to_string(), vec![]));
        assert_eq!(compile(&key, FilterOperator::NotExists, Value::Null).unwrap(), (format!("NOT {}", exists.0), vec![]));

        let plan = JsonAccessNode::new("body_json", "mixed", 16, 0, terminal(JsonDataType::ArrayDynamic, JsonDataType::Dynamic));
        let key = body_key("mixed", vec![plan]);
        assert_eq!(
            compile(&key, FilterOperator::Exists, Value::Null).unwrap().0,
            "(length(dynamicElement(body_json.`mixed`, 'Array(Dynamic)')) > 0)"
        );
    }

    #[test]
    fn test_untyped_operand_sees_every_dynamic_element() {
        let plan = JsonAccessNode::new("body_json", "mixed", 16, 0, terminal(JsonDataType::ArrayDynamic, JsonDataType::Dynamic));
        let key = body_key("mixed", vec![plan]);
        let (sql, _) = compile(&key, FilterOperator::Like, "%a%".into()).unwrap();
        assert!(sql.ends_with(", dynamicElement(body_json.`mixed`, 'Array(Dynamic)'))))"), "{}", sql);
        assert!(!sql.contains("arrayFilter"));
    }

    #[test]
    fn test_not_exists_under_hop_negates_exists() {
        let key = body_key("education[].name", vec![education("name", terminal(JsonDataType::String, JsonDataType::String), true, false)]);
        let exists = compile(&key, FilterOperator::Exists, Value::Null).unwrap().0;
        assert_eq!(
            exists,
            "(arrayExists(`body_json.education`-> dynamicElement(`body_json.education`.`name`, 'String') IS NOT NULL, \
             dynamicElement(body_json.`education`, 'Array(JSON(max_dynamic_types=16, max_dynamic_paths=0))')))"
        );
        assert_eq!(compile(&key, FilterOperator::NotExists, Value::Null).unwrap().0, format!("NOT {}", exists));

        let plans = vec![
            JsonAccessNode::new("body_json", "user.name", 16, 0, terminal(JsonDataType::String, JsonDataType::String)),
            JsonAccessNode::new("body_json_promoted", "user.name", 16, 256, terminal(JsonDataType::String, JsonDataType::String)),
        ];
        let key = body_key("user.name", plans).materialized();
        assert_eq!(
            compile(&key, FilterOperator::NotExists, Value::Null).unwrap().0,
            "NOT (dynamicElement(body_json.`user.name`, 'String') IS NOT NULL OR dynamicElement(body_json_promoted.`user.name`, 'String') IS NOT NULL)"
        );
    }

    #[test]
    fn test_indexed_path() {
        let plan = JsonAccessNode::new("body_json", "user.name", 16, 0, terminal(JsonDataType::String, JsonDataType::String));
        let key = body_key("user.name", vec![plan]).with_index(JsonDataType::String, "body_json.`user.name`");

        assert_eq!(
            compile(&key, FilterOperator::Equal, "alice".into()).unwrap(),
            ("(assumeNotNull(dynamicElement(body_json.`user.name`, 'String')) = ?)".to_string(), vec![Value::from("alice")])
        );
        assert_eq!(
            compile(&key, FilterOperator::Equal, "".into()).unwrap().0,
            "((assumeNotNull(dynamicElement(body_json.`user.name`, 'String')) = ? AND dynamicElement(body_json.`user.name`, 'String') IS NOT NULL))"
        );
        assert_eq!(
            compile(&key, FilterOperator::Exists, Value::Null).unwrap(),
            (
                "((assumeNotNull(dynamicElement(body_json.`user.name`, 'String')) <> ? AND dynamicElement(body_json.`user.name`, 'String') IS NOT NULL))"
                    .to_string(),
                vec![Value::from("")]
            )
        );
        assert_eq!(
            compile(&key, FilterOperator::NotExists, Value::Null).unwrap().0,
            "(assumeNotNull(dynamicElement(body_json.`user.name`, 'String')) = ?)"
        );

        // an index on another type leaves the plain comparison
        let plan = JsonAccessNode::new("body_json", "user.name", 16, 0, terminal(JsonDataType::String, JsonDataType::String));
        let key = body_key("user.name", vec![plan]).with_index(JsonDataType::Int64, "body_json.`user.name`");
        assert_eq!(compile(&key, FilterOperator::Equal, "alice".into()).unwrap().0, "(dynamicElement(body_json.`user.name`, 'String') = ?)");
    }

    #[test]
    fn test_indexed_numeric_zero() {
        let plan = JsonAccessNode::new("body_json", "status", 16, 0, terminal(JsonDataType::Int64, JsonDataType::Int64));
        let key = body_key("status", vec![plan]).with_index(JsonDataType::Int64, "body_json.`status`");
        assert_eq!(
            compile(&key, FilterOperator::Equal, Value::Int(0)).unwrap().0,
            "((toFloat64(assumeNotNull(dynamicElement(body_json.`status`, 'Int64'))) = ? AND dynamicElement(body_json.`status`, 'Int64') IS NOT NULL))"
        );
        assert_eq!(
            compile(&key, FilterOperator::Equal, Value::Int(200)).unwrap().0,
            "(toFloat64(assumeNotNull(dynamicElement(body_json.`status`, 'Int64'))) = ?)"
        );
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let key = body_key("education[].name", vec![education("name", terminal(JsonDataType::String, JsonDataType::String), true, true)]);
        let first = compile(&key, FilterOperator::In, vec!["a", "b"].into()).unwrap();
        let second = compile(&key, FilterOperator::In, vec!["a", "b"].into()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.0.matches('?').count(), first.1.len());
    }
}

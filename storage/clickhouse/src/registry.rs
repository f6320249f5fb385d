//! Logical fields backed by several physical representations

use std::collections::BTreeMap;

use logql::{FilterOperator, Value};
use serde::{Deserialize, Serialize};

/// Operator handling that has to look at every representation of a logical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeOverride {
    /// True when any representation differs from its empty value
    AnyNonEmpty,
    /// True when every representation equals its empty value
    AllEmpty,
    /// `match` against any representation
    AnyMatch,
    /// `match` against none of the representations
    NoneMatch,
    /// LIKE and NOT LIKE on the canonical expression, ignoring case
    CaseInsensitive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalExpression {
    pub expression: String,
    /// Value the expression holds when the representation is absent
    #[serde(default = "empty_string")]
    pub empty_value: Value,
}

impl PhysicalExpression {
    pub fn new(expression: impl Into<String>, empty_value: impl Into<Value>) -> Self {
        Self { expression: expression.into(), empty_value: empty_value.into() }
    }
}

fn empty_string() -> Value { Value::String(String::new()) }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalField {
    pub name: String,
    /// Canonical expression first
    pub expressions: Vec<PhysicalExpression>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<FilterOperator, CompositeOverride>,
}

impl LogicalField {
    pub fn new(name: impl Into<String>, expressions: Vec<PhysicalExpression>) -> Self {
        Self { name: name.into(), expressions, overrides: BTreeMap::new() }
    }

    pub fn with_override(mut self, operator: FilterOperator, handler: CompositeOverride) -> Self {
        self.overrides.insert(operator, handler);
        self
    }

    pub fn canonical(&self) -> Option<&PhysicalExpression> { self.expressions.first() }

    pub fn override_for(&self, operator: FilterOperator) -> Option<CompositeOverride> { self.overrides.get(&operator).copied() }
}

/// Immutable set of logical fields, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalFieldRegistry {
    fields: BTreeMap<String, LogicalField>,
}

impl LogicalFieldRegistry {
    pub fn new(fields: impl IntoIterator<Item = LogicalField>) -> Self {
        Self { fields: fields.into_iter().map(|field| (field.name.clone(), field)).collect() }
    }

    pub fn get(&self, name: &str) -> Option<&LogicalField> { self.fields.get(name) }

    pub fn contains(&self, name: &str) -> bool { self.fields.contains_key(name) }

    pub fn len(&self) -> usize { self.fields.len() }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// The log body, stored as raw text and as JSON with an optional promoted copy.
    pub fn logs() -> Self {
        let body = LogicalField::new(
            "body",
            vec![
                PhysicalExpression::new("body", ""),
                PhysicalExpression::new("toString(body_json)", "{}"),
                PhysicalExpression::new("toString(body_json_promoted)", "{}"),
            ],
        )
        .with_override(FilterOperator::Exists, CompositeOverride::AnyNonEmpty)
        .with_override(FilterOperator::NotExists, CompositeOverride::AllEmpty)
        .with_override(FilterOperator::Regexp, CompositeOverride::AnyMatch)
        .with_override(FilterOperator::NotRegexp, CompositeOverride::NoneMatch);
        Self::new([body])
    }
}

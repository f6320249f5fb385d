use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equal,              // =
    NotEqual,           // != or <>
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
    LessThan,           // <
    LessThanOrEqual,    // <=
    Like,               // LIKE
    NotLike,            // NOT LIKE
    ILike,              // ILIKE
    NotILike,           // NOT ILIKE
    Between,            // BETWEEN
    NotBetween,         // NOT BETWEEN
    In,                 // IN
    NotIn,              // NOT IN
    Exists,             // EXISTS
    NotExists,          // NOT EXISTS
    Regexp,             // REGEXP
    NotRegexp,          // NOT REGEXP
    Contains,           // CONTAINS
    NotContains,        // NOT CONTAINS
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 20] = [
        FilterOperator::Equal,
        FilterOperator::NotEqual,
        FilterOperator::GreaterThan,
        FilterOperator::GreaterThanOrEqual,
        FilterOperator::LessThan,
        FilterOperator::LessThanOrEqual,
        FilterOperator::Like,
        FilterOperator::NotLike,
        FilterOperator::ILike,
        FilterOperator::NotILike,
        FilterOperator::Between,
        FilterOperator::NotBetween,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::Exists,
        FilterOperator::NotExists,
        FilterOperator::Regexp,
        FilterOperator::NotRegexp,
        FilterOperator::Contains,
        FilterOperator::NotContains,
    ];

    /// Lexical operators. Their operand is always treated as text.
    pub fn is_string_search(&self) -> bool {
        matches!(
            self,
            FilterOperator::Like
                | FilterOperator::NotLike
                | FilterOperator::ILike
                | FilterOperator::NotILike
                | FilterOperator::Regexp
                | FilterOperator::NotRegexp
                | FilterOperator::Contains
                | FilterOperator::NotContains
        )
    }

    /// Operators whose operand is a list of values.
    pub fn takes_list(&self) -> bool {
        matches!(self, FilterOperator::In | FilterOperator::NotIn | FilterOperator::Between | FilterOperator::NotBetween)
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            FilterOperator::GreaterThan | FilterOperator::GreaterThanOrEqual | FilterOperator::LessThan | FilterOperator::LessThanOrEqual
        )
    }

    pub fn is_existence(&self) -> bool { matches!(self, FilterOperator::Exists | FilterOperator::NotExists) }

    /// Negated operators. A row where the field is absent must still be able to match them.
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            FilterOperator::NotEqual
                | FilterOperator::NotLike
                | FilterOperator::NotILike
                | FilterOperator::NotBetween
                | FilterOperator::NotIn
                | FilterOperator::NotExists
                | FilterOperator::NotRegexp
                | FilterOperator::NotContains
        )
    }

    /// Whether a positive match implies the field is present, so an existence check can be ANDed in.
    pub fn adds_default_exists(&self) -> bool { !self.is_negative() && *self != FilterOperator::Exists }

    pub fn negate(&self) -> FilterOperator {
        match self {
            FilterOperator::Equal => FilterOperator::NotEqual,
            FilterOperator::NotEqual => FilterOperator::Equal,
            FilterOperator::GreaterThan => FilterOperator::LessThanOrEqual,
            FilterOperator::GreaterThanOrEqual => FilterOperator::LessThan,
            FilterOperator::LessThan => FilterOperator::GreaterThanOrEqual,
            FilterOperator::LessThanOrEqual => FilterOperator::GreaterThan,
            FilterOperator::Like => FilterOperator::NotLike,
            FilterOperator::NotLike => FilterOperator::Like,
            FilterOperator::ILike => FilterOperator::NotILike,
            FilterOperator::NotILike => FilterOperator::ILike,
            FilterOperator::Between => FilterOperator::NotBetween,
            FilterOperator::NotBetween => FilterOperator::Between,
            FilterOperator::In => FilterOperator::NotIn,
            FilterOperator::NotIn => FilterOperator::In,
            FilterOperator::Exists => FilterOperator::NotExists,
            FilterOperator::NotExists => FilterOperator::Exists,
            FilterOperator::Regexp => FilterOperator::NotRegexp,
            FilterOperator::NotRegexp => FilterOperator::Regexp,
            FilterOperator::Contains => FilterOperator::NotContains,
            FilterOperator::NotContains => FilterOperator::Contains,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "=",
            FilterOperator::NotEqual => "!=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::Like => "LIKE",
            FilterOperator::NotLike => "NOT LIKE",
            FilterOperator::ILike => "ILIKE",
            FilterOperator::NotILike => "NOT ILIKE",
            FilterOperator::Between => "BETWEEN",
            FilterOperator::NotBetween => "NOT BETWEEN",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NOT IN",
            FilterOperator::Exists => "EXISTS",
            FilterOperator::NotExists => "NOT EXISTS",
            FilterOperator::Regexp => "REGEXP",
            FilterOperator::NotRegexp => "NOT REGEXP",
            FilterOperator::Contains => "CONTAINS",
            FilterOperator::NotContains => "NOT CONTAINS",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FilterOperator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "=" | "==" => Ok(FilterOperator::Equal),
            "!=" | "<>" => Ok(FilterOperator::NotEqual),
            _ => FilterOperator::ALL
                .iter()
                .copied()
                .find(|op| op.as_str() == normalized)
                .ok_or_else(|| ParseError::UnknownOperator(s.to_string())),
        }
    }
}

/// A filter operand as handed over by the query parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_array(&self) -> bool { matches!(self, Value::Array(_)) }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn is_numeric(&self) -> bool { matches!(self, Value::Int(_) | Value::Float(_)) }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The list of values for list operators, a scalar counts as a list of one.
    pub fn into_list(self) -> Vec<Value> {
        match self {
            Value::Array(values) => values,
            other => vec![other],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Array(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(s) }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self { Value::Int(i) }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self { Value::Int(i as i64) }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self { Value::Float(f) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self { Value::Array(values.into_iter().map(Into::into).collect()) }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(values) => Value::Array(values.into_iter().map(Value::from).collect()),
            // Objects are not filter operands, keep their text so they can still be matched lexically
            object @ serde_json::Value::Object(_) => Value::String(object.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_from_str() {
        assert_eq!("not  like".parse::<FilterOperator>().unwrap(), FilterOperator::NotLike);
        assert_eq!("<>".parse::<FilterOperator>().unwrap(), FilterOperator::NotEqual);
        assert_eq!("==".parse::<FilterOperator>().unwrap(), FilterOperator::Equal);
        assert_eq!("not exists".parse::<FilterOperator>().unwrap(), FilterOperator::NotExists);
        assert!("~=".parse::<FilterOperator>().is_err());
    }

    #[test]
    fn test_default_exists_operators() {
        let adds: Vec<_> = FilterOperator::ALL.iter().filter(|op| op.adds_default_exists()).copied().collect();
        assert_eq!(
            adds,
            vec![
                FilterOperator::Equal,
                FilterOperator::GreaterThan,
                FilterOperator::GreaterThanOrEqual,
                FilterOperator::LessThan,
                FilterOperator::LessThanOrEqual,
                FilterOperator::Like,
                FilterOperator::ILike,
                FilterOperator::Between,
                FilterOperator::In,
                FilterOperator::Regexp,
                FilterOperator::Contains,
            ]
        );
    }

    #[test]
    fn test_negate_is_involution() {
        for op in FilterOperator::ALL {
            assert_eq!(op.negate().negate(), op);
            if !op.is_ordering() {
                assert_ne!(op.is_negative(), op.negate().is_negative(), "{}", op);
            }
        }
    }

    #[test]
    fn test_value_from_json() {
        let value: Value = serde_json::from_str(r#"["a", 1, 2.5, true, null]"#).unwrap();
        assert_eq!(value, Value::Array(vec!["a".into(), Value::Int(1), Value::Float(2.5), Value::Bool(true), Value::Null]));
        assert_eq!(Value::from(serde_json::json!({"k": 1})), Value::String(r#"{"k":1}"#.to_string()));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Float(200.0).to_string(), "200");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1 2]");
    }
}

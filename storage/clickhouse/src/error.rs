//! Error types for the ClickHouse condition compiler

use logql::FilterOperator;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConditionError {
    #[error("no column found for field {key}")]
    ColumnNotFound { key: String },

    #[error("field `{name}` not found{}", suggestion_hint(.suggestion))]
    FieldNotFound { name: String, suggestion: Option<String> },

    #[error("(not) between operator requires two values")]
    BetweenValues,

    #[error("(not) in operator requires a list of values")]
    InValues,

    #[error("unsupported operator {operator} for {target}")]
    UnsupportedOperator { operator: FilterOperator, target: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no valid types found for JSON path: {0}")]
    NoTypesForPath(String),

    #[error("JSON navigation failed: {0}")]
    NavigationFailed(String),

    #[error("type catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Coarse classification of a [`ConditionError`] for callers that report errors by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FieldNotFound,
    MalformedOperand,
    UnsupportedOperator,
    InvalidInput,
    Internal,
}

impl ConditionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConditionError::ColumnNotFound { .. } | ConditionError::FieldNotFound { .. } | ConditionError::NoTypesForPath(_) => {
                ErrorKind::FieldNotFound
            }
            ConditionError::BetweenValues | ConditionError::InValues => ErrorKind::MalformedOperand,
            ConditionError::UnsupportedOperator { .. } => ErrorKind::UnsupportedOperator,
            ConditionError::InvalidInput(_) => ErrorKind::InvalidInput,
            ConditionError::NavigationFailed(_) | ConditionError::Catalog(_) => ErrorKind::Internal,
        }
    }

    /// Internal errors point at a planning bug or an unavailable collaborator, not at the user's query.
    pub fn is_internal(&self) -> bool { self.kind() == ErrorKind::Internal }

    pub(crate) fn unsupported(operator: FilterOperator, target: impl Into<String>) -> Self {
        ConditionError::UnsupportedOperator { operator, target: target.into() }
    }
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(", did you mean `{}`?", s),
        None => String::new(),
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("path not found: {0}")]
    NotFound(String),

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

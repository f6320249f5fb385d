use thiserror::Error;

/// Errors raised while reading query vocabulary from text
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown filter operator: {0}")]
    UnknownOperator(String),
    #[error("Unknown field context: {0}")]
    UnknownContext(String),
    #[error("Unknown field data type: {0}")]
    UnknownDataType(String),
    #[error("Unknown JSON data type: {0}")]
    UnknownJsonType(String),
}

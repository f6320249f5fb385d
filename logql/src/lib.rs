//! Log query vocabulary
//!
//! Types shared between whatever parses a log filter expression and the compiler that turns each
//! `(key, operator, value)` comparison into a ClickHouse predicate:
//!
//! - [`FilterOperator`] and [`Value`], the comparison and its operand
//! - [`TelemetryFieldKey`], a logical field with its context, declared type and JSON metadata
//! - [`JsonAccessNode`], the access plan for a path that crosses arrays inside a JSON column

pub mod ast;
pub mod error;
pub mod key;
pub mod plan;

pub use ast::{FilterOperator, Value};
pub use error::ParseError;
pub use key::{FieldContext, FieldDataType, JsonDataType, JsonDataTypeIndex, TelemetryFieldKey, ANY_INDEX_MARKER, BODY_PREFIX};
pub use plan::{JsonAccessKind, JsonAccessNode, JsonBranchType, JsonBranches, TerminalConfig};

//! SQL builder for ClickHouse queries
//!
//! Accumulates predicate fragments and positional parameters. Every primitive that binds a value
//! emits exactly one `?` and pushes exactly one parameter, so parameters stay in emission order.

use logql::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqlGenerationError {
    #[error("Placeholder count mismatch: expected {expected}, found {found}")]
    PlaceholderCountMismatch { expected: usize, found: usize },
}

/// SQL builder for ClickHouse queries
#[derive(Debug)]
pub struct SqlBuilder {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl Default for SqlBuilder {
    fn default() -> Self { Self::new() }
}

impl SqlBuilder {
    pub fn new() -> Self { Self { conditions: Vec::new(), params: Vec::new() } }

    /// Bind a parameter and return its placeholder.
    pub fn var(&mut self, value: impl Into<Value>) -> &'static str {
        self.params.push(value.into());
        "?"
    }

    pub fn eq(&mut self, field: &str, value: impl Into<Value>) -> String { format!("{} = {}", field, self.var(value)) }

    pub fn ne(&mut self, field: &str, value: impl Into<Value>) -> String { format!("{} <> {}", field, self.var(value)) }

    pub fn gt(&mut self, field: &str, value: impl Into<Value>) -> String { format!("{} > {}", field, self.var(value)) }

    pub fn gte(&mut self, field: &str, value: impl Into<Value>) -> String { format!("{} >= {}", field, self.var(value)) }

    pub fn lt(&mut self, field: &str, value: impl Into<Value>) -> String { format!("{} < {}", field, self.var(value)) }

    pub fn lte(&mut self, field: &str, value: impl Into<Value>) -> String { format!("{} <= {}", field, self.var(value)) }

    pub fn like(&mut self, field: &str, value: impl Into<Value>) -> String { format!("{} LIKE {}", field, self.var(value)) }

    pub fn not_like(&mut self, field: &str, value: impl Into<Value>) -> String { format!("{} NOT LIKE {}", field, self.var(value)) }

    pub fn ilike(&mut self, field: &str, value: impl Into<Value>) -> String { format!("LOWER({}) LIKE LOWER({})", field, self.var(value)) }

    pub fn not_ilike(&mut self, field: &str, value: impl Into<Value>) -> String {
        format!("LOWER({}) NOT LIKE LOWER({})", field, self.var(value))
    }

    pub fn between(&mut self, field: &str, lower: impl Into<Value>, upper: impl Into<Value>) -> String {
        let lower = self.var(lower);
        let upper = self.var(upper);
        format!("{} BETWEEN {} AND {}", field, lower, upper)
    }

    pub fn not_between(&mut self, field: &str, lower: impl Into<Value>, upper: impl Into<Value>) -> String {
        let lower = self.var(lower);
        let upper = self.var(upper);
        format!("{} NOT BETWEEN {} AND {}", field, lower, upper)
    }

    /// `(a OR b ...)`, parenthesised even for a single condition.
    pub fn or(&self, conditions: Vec<String>) -> String { format!("({})", conditions.join(" OR ")) }

    /// `(a AND b ...)`, parenthesised even for a single condition.
    pub fn and(&self, conditions: Vec<String>) -> String { format!("({})", conditions.join(" AND ")) }

    /// Add a top level condition. Conditions are ANDed by [`SqlBuilder::build`].
    pub fn where_(&mut self, condition: impl Into<String>) -> &mut Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn params(&self) -> &[Value] { &self.params }

    /// Marker for [`SqlBuilder::rollback`].
    pub fn checkpoint(&self) -> usize { self.params.len() }

    /// Drop every parameter bound after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: usize) { self.params.truncate(checkpoint); }

    /// The WHERE clause: every condition ANDed, with its parameters in placeholder order.
    pub fn build(self) -> Result<(String, Vec<Value>), SqlGenerationError> {
        let where_clause = self.conditions.join(" AND ");
        let found = count_placeholders(&where_clause);
        if found != self.params.len() {
            return Err(SqlGenerationError::PlaceholderCountMismatch { expected: self.params.len(), found });
        }
        Ok((where_clause, self.params))
    }
}

/// Count `?` placeholders outside quoted literals and quoted identifiers.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.chars();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '`' | '"' => quote = Some(c),
                '?' => count += 1,
                _ => {}
            },
        }
    }
    count
}

use logql::Value;

/// Render `s` as a single quoted ClickHouse string literal.
pub fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Render `s` as a backquoted identifier.
pub fn quote_identifier(s: &str) -> String { format!("`{}`", s.replace('`', "\\`")) }

/// Text form of a value for lexical matching. Numbers lose their type, whole floats print as integers.
pub fn format_value_for_contains(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        Value::Null => Value::String(String::new()),
        other => Value::String(other.to_string()),
    }
}

/// `%value%` for CONTAINS, which compiles to a case insensitive LIKE.
pub fn contains_pattern(value: &Value) -> Value { Value::String(format!("%{}%", value)) }

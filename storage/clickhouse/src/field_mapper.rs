//! Resolution of logical field keys to physical columns and the expressions that read them.

use std::collections::HashMap;

use logql::{FieldContext, FieldDataType, TelemetryFieldKey};
use tracing::debug;

use crate::error::ConditionError;
use crate::schema::{self, Column, ColumnType, ScalarType};
use crate::value::{quote_identifier, quote_literal};

#[derive(Debug, Clone, Copy)]
pub struct FieldMapper {
    body_json_enabled: bool,
}

impl Default for FieldMapper {
    fn default() -> Self { Self::new(true) }
}

impl FieldMapper {
    /// With `body_json_enabled` false, body keys resolve to the raw `body` string column.
    pub fn new(body_json_enabled: bool) -> Self { Self { body_json_enabled } }

    pub fn body_json_enabled(&self) -> bool { self.body_json_enabled }

    pub fn column_for(&self, key: &TelemetryFieldKey) -> Result<&'static Column, ConditionError> {
        let column = match key.field_context {
            FieldContext::Resource => Some(&schema::RESOURCE),
            FieldContext::Scope => Some(match key.name.as_str() {
                "name" | "scope.name" | "scope_name" => &schema::SCOPE_NAME,
                "version" | "scope.version" | "scope_version" => &schema::SCOPE_VERSION,
                _ => &schema::SCOPE_STRING,
            }),
            FieldContext::Attribute => match key.field_data_type {
                FieldDataType::String => Some(&schema::ATTRIBUTES_STRING),
                FieldDataType::Int64 | FieldDataType::Float64 | FieldDataType::Number => Some(&schema::ATTRIBUTES_NUMBER),
                FieldDataType::Bool => Some(&schema::ATTRIBUTES_BOOL),
                _ => None,
            },
            FieldContext::Body => Some(self.body_column()),
            FieldContext::Log | FieldContext::Unspecified => match schema::column(&key.name) {
                Some(column) => Some(column),
                None if key.is_body_json() => Some(self.body_column()),
                None => None,
            },
        };
        column.ok_or_else(|| ConditionError::ColumnNotFound { key: key.to_string() })
    }

    /// SQL expression reading `key`.
    pub fn field_for(&self, key: &TelemetryFieldKey) -> Result<String, ConditionError> {
        let column = self.column_for(key)?;

        match column.column_type {
            ColumnType::Json { .. } if key.field_context == FieldContext::Resource => Ok(resource_expression(key)),
            ColumnType::Json { .. } if key.is_body_json() => body_json_expression(key),
            ColumnType::Json { .. } => Err(ConditionError::InvalidInput(format!(
                "only resource and body fields are supported for JSON columns, got context `{}`",
                key.field_context
            ))),
            ColumnType::LowCardinality(ScalarType::String) => Ok(column.name.to_string()),
            ColumnType::LowCardinality(other) => {
                Err(ConditionError::InvalidInput(format!("unsupported low cardinality column type {} for {}", other.as_str(), column.name)))
            }
            ColumnType::Scalar(_) => Ok(column.name.to_string()),
            ColumnType::Map { value: ScalarType::String | ScalarType::Bool | ScalarType::Float64 } => {
                if key.materialized {
                    Ok(materialized_column_name(key))
                } else {
                    Ok(format!("{}[{}]", column.name, quote_literal(&key.name)))
                }
            }
            ColumnType::Map { value } => {
                Err(ConditionError::InvalidInput(format!("unsupported map value type {} for {}", value.as_str(), column.name)))
            }
        }
    }

    /// `<expr> AS `name``, for SELECT and GROUP BY.
    ///
    /// A key whose context does not resolve is disambiguated against `keys`, every key metadata
    /// knows by name: a static column, the single known key, or the first non-empty of several.
    pub fn column_expression_for(&self, key: &TelemetryFieldKey, keys: &HashMap<String, Vec<TelemetryFieldKey>>) -> Result<String, ConditionError> {
        let expr = match self.field_for(key) {
            Ok(expr) => expr,
            Err(ConditionError::ColumnNotFound { .. }) => {
                let candidates = keys.get(&key.name).map(Vec::as_slice).unwrap_or_default();
                match candidates {
                    [] => match schema::column(&key.name) {
                        Some(column) => column.name.to_string(),
                        None => {
                            let suggestion = suggest_correction(&key.name, keys.keys().map(String::as_str));
                            return Err(ConditionError::FieldNotFound { name: key.name.clone(), suggestion });
                        }
                    },
                    [only] => self.field_for(only)?,
                    many => {
                        debug!("{} resolves to {} keys, selecting the first non-empty", key.name, many.len());
                        let mut args = Vec::with_capacity(many.len());
                        for candidate in many {
                            let expr = self.field_for(candidate)?;
                            args.push(format!("toString({}) != '', toString({})", expr, expr));
                        }
                        format!("multiIf({}, NULL)", args.join(", "))
                    }
                }
            }
            Err(err) => return Err(err),
        };
        Ok(format!("{} AS {}", expr, quote_identifier(&key.name)))
    }

    fn body_column(&self) -> &'static Column {
        if self.body_json_enabled {
            &schema::BODY_JSON
        } else {
            &schema::BODY
        }
    }
}

/// Name of the column a materialized key is stored in.
pub fn materialized_column_name(key: &TelemetryFieldKey) -> String {
    format!("`{}_{}_{}`", key.field_context, key.field_data_type, key.name.replace('.', "$$"))
}

/// Name of the boolean column recording whether a materialized key is present.
pub fn materialized_exists_column_name(key: &TelemetryFieldKey) -> String {
    format!("`{}_{}_{}_exists`", key.field_context, key.field_data_type, key.name.replace('.', "$$"))
}

/// The JSON resource column wins over the legacy map, which wins over absence.
fn resource_expression(key: &TelemetryFieldKey) -> String {
    let name = &key.name;
    let legacy = if key.materialized {
        format!("{}==true, {}", materialized_exists_column_name(key), materialized_column_name(key))
    } else {
        let map = schema::RESOURCES_STRING.name;
        format!("mapContains({}, {}), {}[{}]", map, quote_literal(name), map, quote_literal(name))
    };
    format!("multiIf({col}.`{name}` IS NOT NULL, {col}.`{name}`::String, {legacy}, NULL)", col = schema::RESOURCE.name, name = name, legacy = legacy)
}

fn body_json_expression(key: &TelemetryFieldKey) -> Result<String, ConditionError> {
    let path = key.body_path();
    if path.contains("[]") || path.contains(logql::ANY_INDEX_MARKER) {
        return Err(ConditionError::InvalidInput(format!("array paths cannot be read as a single field: {}", key.name)));
    }
    let Some(json_type) = key.json_data_type else {
        return Err(ConditionError::ColumnNotFound { key: key.to_string() });
    };

    let expr = format!("dynamicElement({}.`{}`, '{}')", schema::BODY_JSON.name, path, json_type);
    if key.materialized {
        Ok(format!("coalesce({}, dynamicElement({}.`{}`, '{}'))", expr, schema::BODY_JSON_PROMOTED.name, path, json_type))
    } else {
        Ok(expr)
    }
}

/// Closest known name to `name`, if one is within a third of its length in edits.
pub fn suggest_correction<'a>(name: &str, known: impl Iterator<Item = &'a str>) -> Option<String> {
    let lowered = name.to_lowercase();
    let needle: Vec<char> = lowered.chars().collect();
    let max_dist = (needle.len() / 3).max(1);

    let mut best: Option<(usize, &str)> = None;
    for candidate in known.chain(schema::LOG_COLUMNS.iter().map(|c| c.name)) {
        if candidate == name {
            continue;
        }
        let dist = levenshtein_with_max(&candidate.to_lowercase(), &needle, max_dist);
        if dist > max_dist {
            continue;
        }
        best = match best {
            Some((best_dist, best_name)) if (best_dist, best_name) <= (dist, candidate) => Some((best_dist, best_name)),
            _ => Some((dist, candidate)),
        };
    }
    best.map(|(_, candidate)| candidate.to_string())
}

fn levenshtein_with_max(value: &str, needle: &[char], max_dist: usize) -> usize {
    let n = needle.len();
    if n == 0 {
        return value.chars().count();
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, c) in value.chars().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for j in 1..=n {
            let cost = if c == needle[j - 1] { 0 } else { 1 };
            let d = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            curr[j] = d;
            row_min = row_min.min(d);
        }
        if row_min > max_dist {
            return max_dist + 1;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use logql::JsonDataType;

    fn mapper() -> FieldMapper { FieldMapper::default() }

    #[test]
    fn test_column_for_contexts() {
        let m = mapper();
        assert_eq!(m.column_for(&TelemetryFieldKey::resource("service.name")).unwrap().name, "resource");
        assert_eq!(m.column_for(&TelemetryFieldKey::new("scope.name", FieldContext::Scope, FieldDataType::String)).unwrap().name, "scope_name");
        assert_eq!(m.column_for(&TelemetryFieldKey::new("version", FieldContext::Scope, FieldDataType::String)).unwrap().name, "scope_version");
        assert_eq!(m.column_for(&TelemetryFieldKey::new("lib", FieldContext::Scope, FieldDataType::String)).unwrap().name, "scope_string");
        assert_eq!(m.column_for(&TelemetryFieldKey::attribute("n", FieldDataType::Int64)).unwrap().name, "attributes_number");
        assert_eq!(m.column_for(&TelemetryFieldKey::attribute("b", FieldDataType::Bool)).unwrap().name, "attributes_bool");
        assert_eq!(m.column_for(&TelemetryFieldKey::new("severity_text", FieldContext::Log, FieldDataType::String)).unwrap().name, "severity_text");
        assert_eq!(m.column_for(&TelemetryFieldKey::new("body.a.b", FieldContext::Unspecified, FieldDataType::String)).unwrap().name, "body_json");
        assert_eq!(
            FieldMapper::new(false).column_for(&TelemetryFieldKey::new("body.a.b", FieldContext::Log, FieldDataType::String)).unwrap().name,
            "body"
        );

        let missing = m.column_for(&TelemetryFieldKey::new("nonexistent", FieldContext::Log, FieldDataType::String));
        assert!(matches!(missing, Err(ConditionError::ColumnNotFound { .. })));
        let array_attribute = m.column_for(&TelemetryFieldKey::attribute("tags", FieldDataType::ArrayString));
        assert!(matches!(array_attribute, Err(ConditionError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_field_for_maps() {
        let m = mapper();
        assert_eq!(m.field_for(&TelemetryFieldKey::attribute("user.id", FieldDataType::String)).unwrap(), "attributes_string['user.id']");
        assert_eq!(
            m.field_for(&TelemetryFieldKey::attribute("http.method", FieldDataType::String).materialized()).unwrap(),
            "`attribute_string_http$$method`"
        );
        assert_eq!(m.field_for(&TelemetryFieldKey::new("trace_flags", FieldContext::Log, FieldDataType::Number)).unwrap(), "trace_flags");
    }

    #[test]
    fn test_field_for_resource() {
        let m = mapper();
        assert_eq!(
            m.field_for(&TelemetryFieldKey::resource("service.name")).unwrap(),
            "multiIf(resource.`service.name` IS NOT NULL, resource.`service.name`::String, mapContains(resources_string, 'service.name'), resources_string['service.name'], NULL)"
        );
        assert_eq!(
            m.field_for(&TelemetryFieldKey::resource("service.name").materialized()).unwrap(),
            "multiIf(resource.`service.name` IS NOT NULL, resource.`service.name`::String, `resource_string_service$$name_exists`==true, `resource_string_service$$name`, NULL)"
        );
    }

    #[test]
    fn test_field_for_body_json() {
        let m = mapper();
        assert_eq!(m.field_for(&TelemetryFieldKey::body("user.age", JsonDataType::Int64)).unwrap(), "dynamicElement(body_json.`user.age`, 'Int64')");
        assert_eq!(
            m.field_for(&TelemetryFieldKey::body("user.name", JsonDataType::String).materialized()).unwrap(),
            "coalesce(dynamicElement(body_json.`user.name`, 'String'), dynamicElement(body_json_promoted.`user.name`, 'String'))"
        );
        assert!(matches!(
            m.field_for(&TelemetryFieldKey::body("education[].name", JsonDataType::String)),
            Err(ConditionError::InvalidInput(_))
        ));
        assert!(matches!(
            m.field_for(&TelemetryFieldKey::new("user.name", FieldContext::Body, FieldDataType::String)),
            Err(ConditionError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_column_expression_for() {
        let m = mapper();
        let mut keys = HashMap::new();
        keys.insert("http.status".to_string(), vec![TelemetryFieldKey::attribute("http.status", FieldDataType::Number)]);
        keys.insert(
            "env".to_string(),
            vec![TelemetryFieldKey::attribute("env", FieldDataType::String), TelemetryFieldKey::resource("env").retyped(FieldDataType::String)],
        );

        let unscoped = |name: &str| TelemetryFieldKey::new(name, FieldContext::Unspecified, FieldDataType::Unspecified);

        assert_eq!(m.column_expression_for(&unscoped("http.status"), &keys).unwrap(), "attributes_number['http.status'] AS `http.status`");
        assert_eq!(m.column_expression_for(&unscoped("timestamp"), &keys).unwrap(), "timestamp AS `timestamp`");
        assert_eq!(
            m.column_expression_for(&unscoped("env"), &keys).unwrap(),
            "multiIf(toString(attributes_string['env']) != '', toString(attributes_string['env']), \
             toString(multiIf(resource.`env` IS NOT NULL, resource.`env`::String, mapContains(resources_string, 'env'), resources_string['env'], NULL)) != '', \
             toString(multiIf(resource.`env` IS NOT NULL, resource.`env`::String, mapContains(resources_string, 'env'), resources_string['env'], NULL)), NULL) AS `env`"
        );

        let err = m.column_expression_for(&unscoped("http.statu"), &keys).unwrap_err();
        assert_eq!(err, ConditionError::FieldNotFound { name: "http.statu".into(), suggestion: Some("http.status".into()) });

        let err = m.column_expression_for(&unscoped("zzzzzzzz"), &keys).unwrap_err();
        assert_eq!(err.to_string(), "field `zzzzzzzz` not found");
    }

    #[test]
    fn test_suggest_correction() {
        assert_eq!(suggest_correction("severity_txt", std::iter::empty()), Some("severity_text".to_string()));
        assert_eq!(suggest_correction("servce.name", ["service.name", "service.namespace"].into_iter()), Some("service.name".to_string()));
        assert_eq!(suggest_correction("abc", ["xyz"].into_iter()), None);
    }
}

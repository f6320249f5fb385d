//! Type lookups for paths inside the body JSON column

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use logql::{FilterOperator, JsonDataType, TelemetryFieldKey};
use tracing::{debug, warn};

use crate::error::{CatalogError, ConditionError};
use crate::schema;

/// Source of the storage types observed for each JSON path, as ClickHouse type names.
///
/// Paths crossing arrays are written with `[].` between segments, e.g. `education[].name`.
pub trait PathTypeCatalog: Send + Sync {
    fn query(&self, path: &str) -> Result<Vec<String>, CatalogError>;
}

/// A fixed catalog
#[derive(Debug, Clone, Default)]
pub struct InMemoryPathCatalog {
    paths: HashMap<String, Vec<String>>,
}

impl InMemoryPathCatalog {
    pub fn new() -> Self { Self::default() }

    pub fn with_path<I, S>(mut self, path: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(path, types);
        self
    }

    pub fn insert<I, S>(&mut self, path: impl Into<String>, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.entry(path.into()).or_default().extend(types.into_iter().map(Into::into));
    }
}

impl PathTypeCatalog for InMemoryPathCatalog {
    fn query(&self, path: &str) -> Result<Vec<String>, CatalogError> {
        self.paths.get(path).cloned().ok_or_else(|| CatalogError::NotFound(path.to_string()))
    }
}

/// Resolves body JSON paths to their storage types, caching every non-empty answer.
pub struct JsonFieldResolver {
    catalog: Arc<dyn PathTypeCatalog>,
    cache: DashMap<String, Vec<JsonDataType>>,
}

impl JsonFieldResolver {
    pub fn new(catalog: Arc<dyn PathTypeCatalog>) -> Self { Self { catalog, cache: DashMap::new() } }

    /// Storage types of `path` in catalog order, without duplicates. Unknown paths have none.
    pub fn types_for(&self, path: &str) -> Result<Vec<JsonDataType>, ConditionError> {
        if let Some(types) = self.cache.get(path) {
            return Ok(types.value().clone());
        }

        debug!("JSON type cache miss for {}", path);
        let names = match self.catalog.query(path) {
            Ok(names) => names,
            Err(CatalogError::NotFound(_)) => Vec::new(),
            Err(err) => {
                warn!("JSON type lookup for {} failed: {}", path, err);
                return Err(err.into());
            }
        };

        let mut types = Vec::with_capacity(names.len());
        for name in &names {
            let data_type = JsonDataType::from_catalog(name);
            if !types.contains(&data_type) {
                types.push(data_type);
            }
        }
        if !types.is_empty() {
            self.cache.insert(path.to_string(), types.clone());
        }
        Ok(types)
    }

    /// Forget cached types, for one path or all of them.
    pub fn invalidate(&self, path: Option<&str>) {
        match path {
            Some(path) => {
                self.cache.remove(path);
            }
            None => self.cache.clear(),
        }
    }

    pub fn cached_paths(&self) -> usize { self.cache.len() }

    /// Expression reading `key` for SELECT: the first scalar type, else the first array type.
    pub fn field_expression(&self, key: &TelemetryFieldKey) -> Result<String, ConditionError> {
        let (path, types) = self.resolve(key)?;
        let field = field_path(path);
        let (scalars, arrays) = split_types(&types);
        scalars
            .first()
            .or(arrays.first())
            .map(|data_type| dynamic_element(&field, *data_type))
            .ok_or_else(|| ConditionError::NoTypesForPath(path.to_string()))
    }

    /// Expression reading `key` as the left side of `operator`.
    ///
    /// For EXISTS and NOT EXISTS this is the presence test itself, the same for both: a NOT EXISTS
    /// caller negates it.
    pub fn field_expression_for_filter(&self, key: &TelemetryFieldKey, operator: FilterOperator) -> Result<String, ConditionError> {
        use FilterOperator::*;

        let (path, types) = self.resolve(key)?;
        let field = field_path(path);
        let (scalars, arrays) = split_types(&types);

        let chosen = match operator {
            Equal | NotEqual | GreaterThan | GreaterThanOrEqual | LessThan | LessThanOrEqual => scalars.first().or(arrays.first()),
            Contains | NotContains | Like | NotLike | ILike | NotILike => {
                let expressions: Vec<String> = scalars
                    .iter()
                    .map(|t| dynamic_element(&field, *t))
                    .chain(arrays.iter().map(|t| format!("arrayExists(x -> x, {})", dynamic_element(&field, *t))))
                    .collect();
                return Ok(or_all(expressions));
            }
            Exists | NotExists => {
                let expressions: Vec<String> = scalars
                    .iter()
                    .map(|t| format!("isNotNull({})", dynamic_element(&field, *t)))
                    .chain(arrays.iter().map(|t| format!("length({}) > 0", dynamic_element(&field, *t))))
                    .collect();
                return Ok(or_all(expressions));
            }
            _ => scalars.first(),
        };
        chosen.map(|data_type| dynamic_element(&field, *data_type)).ok_or_else(|| ConditionError::NoTypesForPath(path.to_string()))
    }

    fn resolve<'k>(&self, key: &'k TelemetryFieldKey) -> Result<(&'k str, Vec<JsonDataType>), ConditionError> {
        let path = key.body_path();
        let types = self.types_for(path)?;
        if types.is_empty() {
            return Err(ConditionError::NoTypesForPath(path.to_string()));
        }
        Ok((path, types))
    }
}

impl std::fmt::Debug for JsonFieldResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonFieldResolver").field("cached_paths", &self.cache.len()).finish()
    }
}

fn field_path(path: &str) -> String { format!("{}.{}", schema::BODY_JSON.name, path) }

fn dynamic_element(field: &str, data_type: JsonDataType) -> String { format!("dynamicElement({}, '{}')", field, data_type) }

fn split_types(types: &[JsonDataType]) -> (Vec<JsonDataType>, Vec<JsonDataType>) { types.iter().partition(|t| !t.is_array()) }

fn or_all(expressions: Vec<String>) -> String {
    if expressions.is_empty() {
        "false".to_string()
    } else {
        expressions.join(" OR ")
    }
}

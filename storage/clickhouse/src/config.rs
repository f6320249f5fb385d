//! Compiler configuration

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::registry::LogicalFieldRegistry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Body keys address the `body_json` column when set, the raw `body` string otherwise
    pub body_json_enabled: bool,
    pub logical_fields: LogicalFieldRegistry,
}

impl Default for CompilerConfig {
    fn default() -> Self { Self { body_json_enabled: true, logical_fields: LogicalFieldRegistry::logs() } }
}

impl CompilerConfig {
    /// Configuration for tables that only carry the raw `body` column.
    pub fn legacy_body() -> Self { Self { body_json_enabled: false, logical_fields: LogicalFieldRegistry::default() } }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(json) }

    /// Load a JSON configuration file
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).with_context(|| format!("failed to read compiler config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid compiler config {}", path.display()))
    }
}

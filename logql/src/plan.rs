//! Access plans for paths inside a JSON column.
//!
//! A path such as `education[].awards[].name` is stored as nested arrays. Every array segment is a
//! hop whose elements may be typed JSON objects, dynamically typed values holding objects, or
//! both. The plan records which representations exist so that a compiler can emit one existential
//! check per representation and descend into each.

use serde::{Deserialize, Serialize};

use crate::key::JsonDataType;

/// Which array representation a hop branch descends through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonBranchType {
    /// `Array(JSON(...))`
    Json,
    /// `Array(Dynamic)` filtered down to its JSON elements
    Dynamic,
}

impl JsonBranchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonBranchType::Json => "json",
            JsonBranchType::Dynamic => "dynamic",
        }
    }

    /// Dynamic type/path limits for a child reached through this branch.
    pub fn child_limits(&self, max_dynamic_types: u32, max_dynamic_paths: u32) -> (u32, u32) {
        match self {
            JsonBranchType::Json => (max_dynamic_types / 2, max_dynamic_paths / 4),
            // elements of Array(Dynamic) are cast to plain JSON, which carries the server defaults
            JsonBranchType::Dynamic => (16, 256),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Declared storage type at the end of the path
    pub elem_type: JsonDataType,
    /// Type inferred from the filter value
    pub value_type: JsonDataType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonBranches {
    pub json: Option<Box<JsonAccessNode>>,
    pub dynamic: Option<Box<JsonAccessNode>>,
}

impl JsonBranches {
    pub fn is_empty(&self) -> bool { self.json.is_none() && self.dynamic.is_none() }

    pub fn get(&self, branch: JsonBranchType) -> Option<&JsonAccessNode> {
        match branch {
            JsonBranchType::Json => self.json.as_deref(),
            JsonBranchType::Dynamic => self.dynamic.as_deref(),
        }
    }

    pub fn set(&mut self, branch: JsonBranchType, node: JsonAccessNode) {
        match branch {
            JsonBranchType::Json => self.json = Some(Box::new(node)),
            JsonBranchType::Dynamic => self.dynamic = Some(Box::new(node)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonAccessKind {
    Terminal(TerminalConfig),
    Hop(JsonBranches),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonAccessNode {
    /// Path segment, may contain dots (`user.name`) but never an array marker
    pub name: String,
    /// JSON column the plan is rooted at
    pub column: String,
    /// Names of the array hops above this node, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<String>,
    pub max_dynamic_types: u32,
    pub max_dynamic_paths: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_types: Vec<JsonDataType>,
    pub kind: JsonAccessKind,
}

impl JsonAccessNode {
    pub fn new(column: impl Into<String>, name: impl Into<String>, max_dynamic_types: u32, max_dynamic_paths: u32, kind: JsonAccessKind) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            ancestors: Vec::new(),
            max_dynamic_types,
            max_dynamic_paths,
            available_types: Vec::new(),
            kind,
        }
    }

    /// A node one array hop below this one, reached through `branch`.
    pub fn child(&self, name: impl Into<String>, branch: JsonBranchType, kind: JsonAccessKind) -> Self {
        let (max_dynamic_types, max_dynamic_paths) = branch.child_limits(self.max_dynamic_types, self.max_dynamic_paths);
        let mut ancestors = self.ancestors.clone();
        ancestors.push(self.name.clone());
        Self { name: name.into(), column: self.column.clone(), ancestors, max_dynamic_types, max_dynamic_paths, available_types: Vec::new(), kind }
    }

    pub fn with_available_types(mut self, available_types: Vec<JsonDataType>) -> Self {
        self.available_types = available_types;
        self
    }

    pub fn is_terminal(&self) -> bool { matches!(self.kind, JsonAccessKind::Terminal(_)) }

    pub fn terminal(&self) -> Option<&TerminalConfig> {
        match &self.kind {
            JsonAccessKind::Terminal(config) => Some(config),
            JsonAccessKind::Hop(_) => None,
        }
    }

    pub fn branches(&self) -> Option<&JsonBranches> {
        match &self.kind {
            JsonAccessKind::Hop(branches) => Some(branches),
            JsonAccessKind::Terminal(_) => None,
        }
    }

    /// Dotted path from the column to this node, with `[]` after every array hop.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for ancestor in &self.ancestors {
            path.push_str(ancestor);
            path.push_str("[].");
        }
        path.push_str(&self.name);
        path
    }

    /// Lambda parameter name bound to the elements of this node when it is an array hop.
    pub fn alias(&self) -> String { format!("`{}.{}`", self.column, self.path()) }

    /// Expression reading this node relative to its enclosing array element, or the column at the top.
    pub fn field_path(&self) -> String {
        match self.ancestors.split_last() {
            None => format!("{}.`{}`", self.column, self.name),
            Some((parent, outer)) => {
                let mut parent_path = String::new();
                for ancestor in outer {
                    parent_path.push_str(ancestor);
                    parent_path.push_str("[].");
                }
                parent_path.push_str(parent);
                format!("`{}.{}`.`{}`", self.column, parent_path, self.name)
            }
        }
    }

    /// Number of nodes on the longest path from here to a terminal.
    pub fn depth(&self) -> usize {
        match &self.kind {
            JsonAccessKind::Terminal(_) => 1,
            JsonAccessKind::Hop(branches) => {
                1 + [branches.json.as_deref(), branches.dynamic.as_deref()].into_iter().flatten().map(|n| n.depth()).max().unwrap_or(0)
            }
        }
    }
}

//! Column projection trees.
//!
//! A caller may restrict which fields of a (possibly nested) output record
//! are serialized by supplying a comma-separated column list, e.g.
//! `duration,heart_rate:avg,heart_rate:max`. Colons express nesting. The
//! parsed form is a tree where a leaf means "everything below here is
//! included" and named children mean "only these children, recursively".

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::ValidationError;

/// A node in a column projection tree. An empty node (no children) is a
/// leaf and includes everything beneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnNode {
    children: BTreeMap<String, ColumnNode>,
}

impl ColumnNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a column list expression into a projection tree.
    pub fn parse(expression: &str) -> Result<Self, ValidationError> {
        if expression.trim().is_empty() {
            return Err(ValidationError::EmptyColumnList);
        }

        let mut root = Self::new();
        for path in expression.split(',') {
            let mut node = &mut root;
            for segment in path.split(':') {
                let segment = segment.trim();
                if segment.is_empty() {
                    return Err(ValidationError::EmptyColumnName {
                        value: path.to_owned(),
                    });
                }
                node = node.children.entry(segment.to_owned()).or_default();
            }
        }

        Ok(root)
    }

    pub fn add_child(&mut self, name: impl Into<String>) -> &mut ColumnNode {
        self.children.entry(name.into()).or_default()
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn child(&self, name: &str) -> Option<&ColumnNode> {
        self.children.get(name)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ColumnNode)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Inverts [`ColumnNode::parse`]: renders the tree back into the
    /// comma-separated column list expression.
    pub fn to_list_string(&self) -> String {
        self.to_paths().join(",")
    }

    fn to_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for (name, child) in &self.children {
            if child.is_leaf() {
                paths.push(name.clone());
            } else {
                for descendant in child.to_paths() {
                    paths.push(format!("{name}:{descendant}"));
                }
            }
        }
        paths
    }

    /// Applies the projection to a JSON value.
    ///
    /// A leaf node returns the value unchanged. On objects, only the keys
    /// named by this node's children are retained, each projected through
    /// the corresponding child node. Non-object values pass through
    /// unchanged since there is nothing to filter.
    pub fn project(&self, value: &Value) -> Value {
        if self.is_leaf() {
            return value.clone();
        }

        match value {
            Value::Object(fields) => {
                let mut projected = Map::new();
                for (name, child) in &self.children {
                    if let Some(field) = fields.get(name) {
                        projected.insert(name.clone(), child.project(field));
                    }
                }
                Value::Object(projected)
            }
            other => other.clone(),
        }
    }
}

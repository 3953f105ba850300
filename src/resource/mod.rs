//! Resource graph
//!
//! The compiler's output: CloudFormation resource descriptors keyed by
//! logical id, ready to be merged into a larger deployment template.
//!
//! # Architecture
//!
//! - [`intrinsic`] - Builders for deferred references (`Fn::GetAtt`, `Ref`, ...)
//! - [`registry`] - Embedded data (default policy actions, built-in SDL)
//!
//! # Example
//!
//! ```ignore
//! use crate::resource::{Resource, ResourceGraph};
//!
//! let mut graph = ResourceGraph::new();
//! graph.insert("GraphQlApi", Resource::new("AWS::AppSync::GraphQLApi", json!({"Name": "api"})))?;
//! ```

pub mod intrinsic;
mod registry;

pub use registry::*;

use crate::error::{CompileError, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// One resource descriptor: `{Type, DeletionPolicy?, DependsOn?, Properties}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(rename = "Properties")]
    pub properties: Value,
}

impl Resource {
    /// Create a resource; `null` properties stand for "not set" and are dropped
    pub fn new(kind: &str, properties: Value) -> Self {
        Self {
            kind: kind.to_string(),
            deletion_policy: None,
            depends_on: Vec::new(),
            properties: prune_nulls(properties),
        }
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn deletion_policy(mut self, policy: &str) -> Self {
        self.deletion_policy = Some(policy.to_string());
        self
    }

    /// Look up a top-level property
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Logical id → resource, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResourceGraph {
    resources: IndexMap<String, Resource>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource. Entries are never overwritten: a second write to the
    /// same logical id means two entities sanitized to the same name.
    pub fn insert(&mut self, logical_id: impl Into<String>, resource: Resource) -> Result<()> {
        let logical_id = logical_id.into();
        if self.resources.contains_key(&logical_id) {
            return Err(CompileError::LogicalIdCollision { logical_id });
        }
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    /// Move every resource of `other` into this graph
    pub fn merge(&mut self, other: ResourceGraph) -> Result<()> {
        for (logical_id, resource) in other.resources {
            self.insert(logical_id, resource)?;
        }
        Ok(())
    }

    pub fn get(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn logical_ids(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render as a `Resources` section value
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Drop object entries whose value is `null`, recursively
pub fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_nulls).collect()),
        other => other,
    }
}

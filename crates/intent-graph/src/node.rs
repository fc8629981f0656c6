//! Functional hierarchy nodes
//!
//! Provides [`NodeId`] and [`FunctionalNode`], the metadata + adjacency
//! record authored per domain.

use crate::level::HierarchyLevel;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Ordered map of node id to node, in declaration order
pub type NodeMap = IndexMap<NodeId, FunctionalNode>;

/// Stable string identifier of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create from any string-like value
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow as `&str`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Check whether the id carries a naming marker such as `-shared`
    #[inline]
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        self.0.contains(marker)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A node of the functional hierarchy
///
/// `children` and `parents` are ordered id lists. The graph is a DAG in
/// which a node may have several parents (shared steps, unified nodes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalNode {
    /// Unique identifier
    pub id: NodeId,

    /// Hierarchy level
    pub level: HierarchyLevel,

    /// Short human-readable name; the duplicate-detection key
    pub label: String,

    /// Child node ids
    #[serde(default)]
    pub children: Vec<NodeId>,

    /// Parent node ids
    #[serde(default)]
    pub parents: Vec<NodeId>,

    /// Product codes this node is associated with
    #[serde(default)]
    pub products: Vec<String>,

    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FunctionalNode {
    /// Create a node with no edges and no products
    #[must_use]
    pub fn new(id: impl Into<NodeId>, level: HierarchyLevel, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level,
            label: label.into(),
            children: Vec::new(),
            parents: Vec::new(),
            products: Vec::new(),
            description: None,
        }
    }

    /// With product codes
    #[must_use]
    pub fn with_products<I, S>(mut self, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.products = products.into_iter().map(Into::into).collect();
        self
    }

    /// With child ids
    #[must_use]
    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    /// With parent ids
    #[must_use]
    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    /// With description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Label normalized for comparisons (trimmed, lowercase)
    #[inline]
    #[must_use]
    pub fn label_key(&self) -> String {
        self.label.trim().to_lowercase()
    }

    /// Check product membership, ignoring ASCII case
    #[must_use]
    pub fn has_product(&self, product: &str) -> bool {
        self.products.iter().any(|p| p.eq_ignore_ascii_case(product))
    }

    /// Check whether two nodes share at least one product
    #[must_use]
    pub fn shares_product_with(&self, other: &FunctionalNode) -> bool {
        self.products.iter().any(|p| other.has_product(p))
    }
}

/// Collect nodes into a [`NodeMap`] keyed by id, keeping input order
#[must_use]
pub fn node_map<I>(nodes: I) -> NodeMap
where
    I: IntoIterator<Item = FunctionalNode>,
{
    nodes.into_iter().map(|n| (n.id.clone(), n)).collect()
}

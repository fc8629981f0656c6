//! Shared-node alternatives and the duplicate relation
//!
//! [`RationalizedAlternatives`] maps each shared node to its per-product
//! duplicates. [`DuplicateIndex`] is the relation computed from it once per
//! domain, so callers never re-derive duplicate status from label strings.

use indexmap::IndexMap;
use intent_graph::{GraphQuery, IntegrityIssue, IssueKind, NodeId, NodeMap};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Product code to duplicate node id
pub type ProductAlternatives = IndexMap<String, NodeId>;

/// Shared node id to per-product duplicate node ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RationalizedAlternatives(IndexMap<NodeId, ProductAlternatives>);

impl RationalizedAlternatives {
    /// Create empty alternatives
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `duplicate` as the `product` alternative of `shared`
    pub fn insert(&mut self, shared: impl Into<NodeId>, product: impl Into<String>, duplicate: impl Into<NodeId>) {
        self.0
            .entry(shared.into())
            .or_default()
            .insert(product.into(), duplicate.into());
    }

    /// Alternatives of a shared node
    #[inline]
    #[must_use]
    pub fn get(&self, shared: &str) -> Option<&ProductAlternatives> {
        self.0.get(shared)
    }

    /// Whether `id` is a shared node with alternatives
    #[inline]
    #[must_use]
    pub fn contains_shared(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Iterate shared nodes and their alternatives
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &ProductAlternatives)> {
        self.0.iter()
    }

    /// Shared node ids, in insertion order
    pub fn shared_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.0.keys()
    }

    /// Number of shared nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no shared nodes are known
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shared node a duplicate belongs to
    #[must_use]
    pub fn shared_for(&self, duplicate: &str) -> Option<&NodeId> {
        self.0
            .iter()
            .find(|(_, alternatives)| alternatives.values().any(|id| id == duplicate))
            .map(|(shared, _)| shared)
    }

    /// Duplicate node for `product` under `shared`; product codes compare
    /// case-insensitively
    #[must_use]
    pub fn alternative_for(&self, shared: &str, product: &str) -> Option<&NodeId> {
        self.0.get(shared).and_then(|alternatives| {
            alternatives
                .iter()
                .find(|(code, _)| code.eq_ignore_ascii_case(product))
                .map(|(_, id)| id)
        })
    }

    /// All duplicate ids, deduplicated, in first-seen order
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.0
            .values()
            .flat_map(IndexMap::values)
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect()
    }

    /// Check that every referenced node exists in `nodes`
    #[must_use]
    pub fn validate(&self, nodes: &NodeMap) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        for (shared, alternatives) in &self.0 {
            if !nodes.contains_key(shared) {
                issues.push(IntegrityIssue::error(
                    IssueKind::MissingSharedNode,
                    Some(shared.clone()),
                    format!("Rationalized node {shared} doesn't exist"),
                ));
            }
            for (product, duplicate) in alternatives {
                if !nodes.contains_key(duplicate) {
                    issues.push(IntegrityIssue::error(
                        IssueKind::MissingAlternative,
                        Some(duplicate.clone()),
                        format!("Alternative node {duplicate} for product {product} doesn't exist"),
                    ));
                }
            }
        }
        issues
    }
}

impl From<IndexMap<NodeId, ProductAlternatives>> for RationalizedAlternatives {
    fn from(map: IndexMap<NodeId, ProductAlternatives>) -> Self {
        Self(map)
    }
}

impl<'a> IntoIterator for &'a RationalizedAlternatives {
    type Item = (&'a NodeId, &'a ProductAlternatives);
    type IntoIter = indexmap::map::Iter<'a, NodeId, ProductAlternatives>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Whether a node, or one of its ancestors, is a known duplicate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateStatus {
    /// Node or an ancestor is a duplicate
    pub is_duplicate: bool,
    /// The duplicate found: the node itself, else the nearest ancestor
    pub duplicate_ancestor: Option<NodeId>,
}

/// Precomputed duplicate relation
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    canonical: HashMap<NodeId, NodeId>,
}

impl DuplicateIndex {
    /// Build from alternatives
    #[must_use]
    pub fn from_alternatives(alternatives: &RationalizedAlternatives) -> Self {
        let mut canonical = HashMap::new();
        for (shared, products) in alternatives {
            for duplicate in products.values() {
                canonical.entry(duplicate.clone()).or_insert_with(|| shared.clone());
            }
        }
        Self { canonical }
    }

    /// Whether `id` is a direct duplicate
    #[inline]
    #[must_use]
    pub fn is_duplicate(&self, id: &str) -> bool {
        self.canonical.contains_key(id)
    }

    /// Shared alternative of a duplicate
    #[inline]
    #[must_use]
    pub fn canonical(&self, id: &str) -> Option<&NodeId> {
        self.canonical.get(id)
    }

    /// Number of duplicates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// True when no duplicates are known
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Duplicate status of `id` in `graph`
    #[must_use]
    pub fn status<G: GraphQuery + ?Sized>(&self, graph: &G, id: &str) -> DuplicateStatus {
        duplicate_status(id, graph, self)
    }
}

/// Node ids grouped by normalized label, built once per node map
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    by_label: HashMap<String, Vec<NodeId>>,
}

impl LabelIndex {
    /// Index every node of `nodes`, keeping declaration order per label
    #[must_use]
    pub fn from_nodes(nodes: &NodeMap) -> Self {
        let mut by_label: HashMap<String, Vec<NodeId>> = HashMap::new();
        for (id, node) in nodes {
            by_label.entry(node.label_key()).or_default().push(id.clone());
        }
        Self { by_label }
    }

    /// Ids whose label matches `label`, trimmed and case-insensitive
    #[must_use]
    pub fn ids(&self, label: &str) -> &[NodeId] {
        self.by_label
            .get(&label.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of distinct labels
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    /// True when no node was indexed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

/// Check a node, then its ancestors nearest-first, against `duplicates`
#[must_use]
pub fn duplicate_status<G: GraphQuery + ?Sized>(
    node: &str,
    graph: &G,
    duplicates: &DuplicateIndex,
) -> DuplicateStatus {
    if duplicates.is_duplicate(node) {
        return DuplicateStatus {
            is_duplicate: true,
            duplicate_ancestor: Some(NodeId::from(node)),
        };
    }

    let ancestor = graph
        .ancestors(node)
        .into_iter()
        .find(|id| duplicates.is_duplicate(id.as_str()));

    DuplicateStatus {
        is_duplicate: ancestor.is_some(),
        duplicate_ancestor: ancestor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intent_graph::{node_map, FunctionalGraph, FunctionalNode, HierarchyLevel};
    use pretty_assertions::assert_eq;

    fn alternatives() -> RationalizedAlternatives {
        let mut alts = RationalizedAlternatives::new();
        alts.insert("scenario-x-shared", "sap", "scenario-x-sap");
        alts.insert("scenario-x-shared", "analytics", "scenario-x-analytics");
        alts
    }

    #[test]
    fn lookups() {
        let alts = alternatives();
        assert_eq!(alts.shared_for("scenario-x-sap").unwrap(), "scenario-x-shared");
        assert!(alts.shared_for("scenario-y").is_none());
        assert_eq!(alts.alternative_for("scenario-x-shared", "SAP").unwrap(), "scenario-x-sap");
        assert!(alts.alternative_for("scenario-x-shared", "crm").is_none());
        assert_eq!(
            alts.duplicate_ids(),
            vec![NodeId::from("scenario-x-sap"), NodeId::from("scenario-x-analytics")]
        );
    }

    #[test]
    fn serializes_as_plain_map() {
        let json = serde_json::to_string(&alternatives()).unwrap();
        assert_eq!(
            json,
            r#"{"scenario-x-shared":{"sap":"scenario-x-sap","analytics":"scenario-x-analytics"}}"#
        );
        let back: RationalizedAlternatives = serde_json::from_str(&json).unwrap();
        assert_eq!(back, alternatives());
    }

    #[test]
    fn validate_reports_missing_references() {
        let nodes = node_map([FunctionalNode::new("scenario-x-sap", HierarchyLevel::Scenario, "X")]);
        let issues = alternatives().validate(&nodes);
        let kinds: Vec<_> = issues.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![IssueKind::MissingSharedNode, IssueKind::MissingAlternative]);
    }

    #[test]
    fn label_index_groups_case_insensitively() {
        let nodes = node_map([
            FunctionalNode::new("a", HierarchyLevel::Scenario, "Monitor KPIs"),
            FunctionalNode::new("b", HierarchyLevel::Step, "Review"),
            FunctionalNode::new("c", HierarchyLevel::Scenario, " monitor kpis "),
        ]);
        let index = LabelIndex::from_nodes(&nodes);

        assert_eq!(index.len(), 2);
        assert_eq!(index.ids("MONITOR KPIs"), &[NodeId::from("a"), NodeId::from("c")]);
        assert!(index.ids("Export").is_empty());
    }

    #[test]
    fn status_checks_self_then_ancestors() {
        let graph = FunctionalGraph::from_nodes(node_map([
            FunctionalNode::new("outcome", HierarchyLevel::Outcome, "O").with_children(["scenario-x-sap"]),
            FunctionalNode::new("scenario-x-sap", HierarchyLevel::Scenario, "X").with_children(["step"]),
            FunctionalNode::new("step", HierarchyLevel::Step, "S").with_children(["action"]),
            FunctionalNode::new("action", HierarchyLevel::Action, "A"),
        ]));
        let index = DuplicateIndex::from_alternatives(&alternatives());

        let own = index.status(&graph, "scenario-x-sap");
        assert!(own.is_duplicate);
        assert_eq!(own.duplicate_ancestor.unwrap(), "scenario-x-sap");

        let below = index.status(&graph, "action");
        assert_eq!(below.duplicate_ancestor.unwrap(), "scenario-x-sap");

        let above = index.status(&graph, "outcome");
        assert_eq!(above, DuplicateStatus::default());
        assert_eq!(index.canonical("scenario-x-analytics").unwrap(), "scenario-x-shared");
    }
}

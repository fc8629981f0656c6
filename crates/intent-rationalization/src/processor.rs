//! Rationalized graph view
//!
//! In unified mode every shared node owns the union of its duplicates'
//! children, and those children point back at the shared node in addition
//! to their existing parents. The base node map is never touched.

use crate::alternatives::RationalizedAlternatives;
use indexmap::IndexMap;
use intent_graph::{FunctionalGraph, HierarchyLevel, NodeId, NodeMap};

/// Output of [`RationalizationProcessor::process`]
#[derive(Debug, Clone, Default)]
pub struct RationalizationOutcome {
    /// Rewritten copy of the node map
    pub nodes: NodeMap,
    /// Children that still collide on label and level after unification
    pub duplicate_children: Vec<NodeId>,
    /// Non-fatal problems found while processing
    pub warnings: Vec<String>,
}

impl RationalizationOutcome {
    /// Build a graph over the rewritten nodes
    #[must_use]
    pub fn graph(&self) -> FunctionalGraph {
        FunctionalGraph::from_nodes(self.nodes.clone())
    }
}

/// Produces the unified-mode view of a node map
#[derive(Debug, Clone, Copy, Default)]
pub struct RationalizationProcessor;

impl RationalizationProcessor {
    /// Rewrite a copy of `nodes` according to `alternatives`
    #[must_use]
    pub fn process(nodes: &NodeMap, alternatives: &RationalizedAlternatives) -> RationalizationOutcome {
        let mut out = nodes.clone();
        let mut duplicate_children: Vec<NodeId> = Vec::new();
        let mut warnings = Vec::new();

        for (shared_id, products) in alternatives {
            if !out.contains_key(shared_id) {
                warnings.push(format!("Shared node {shared_id} not found in nodes"));
                continue;
            }

            let mut union: Vec<NodeId> = Vec::new();
            let mut by_label: IndexMap<(String, HierarchyLevel), Vec<NodeId>> = IndexMap::new();

            for duplicate_id in products.values() {
                let Some(duplicate) = out.get(duplicate_id) else {
                    warnings.push(format!("Duplicate node {duplicate_id} not found"));
                    continue;
                };
                for child_id in &duplicate.children {
                    if union.contains(child_id) {
                        continue;
                    }
                    union.push(child_id.clone());
                    if let Some(child) = out.get(child_id) {
                        by_label
                            .entry((child.label_key(), child.level))
                            .or_default()
                            .push(child_id.clone());
                    }
                }
            }

            for ids in by_label.values().filter(|ids| ids.len() > 1) {
                for id in ids {
                    if !duplicate_children.contains(id) {
                        duplicate_children.push(id.clone());
                    }
                }
            }

            let previous = out
                .get_mut(shared_id)
                .map(|shared| std::mem::replace(&mut shared.children, union.clone()))
                .unwrap_or_default();

            // Keep parent lists in step with the rewritten child list
            for dropped in previous.iter().filter(|id| !union.contains(id)) {
                if let Some(node) = out.get_mut(dropped) {
                    node.parents.retain(|p| p != shared_id);
                }
            }
            for child_id in &union {
                if let Some(child) = out.get_mut(child_id) {
                    if !child.parents.contains(shared_id) {
                        child.parents.push(shared_id.clone());
                    }
                }
            }

            tracing::debug!(shared = %shared_id, children = union.len(), "unified shared node children");
        }

        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        RationalizationOutcome {
            nodes: out,
            duplicate_children,
            warnings,
        }
    }

    /// Rewrite and build the rationalized graph in one step
    #[must_use]
    pub fn rationalized_graph(nodes: &NodeMap, alternatives: &RationalizedAlternatives) -> FunctionalGraph {
        FunctionalGraph::from_nodes(Self::process(nodes, alternatives).nodes)
    }
}

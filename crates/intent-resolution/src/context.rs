//! Recent-usage weighting and product lineage

use crate::config::EngineConfig;
use crate::types::RecentAction;
use indexmap::IndexMap;
use intent_graph::{GraphQuery, NodeId, NodeMap};

/// Successful recent actions counted per product
///
/// Product codes are lowercased; ignored and empty codes are skipped.
/// Iteration follows first appearance in the history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductWeights {
    counts: IndexMap<String, usize>,
}

impl ProductWeights {
    /// Count successful actions in `recent`
    #[must_use]
    pub fn from_recent(recent: &[RecentAction], config: &EngineConfig) -> Self {
        let mut counts: IndexMap<String, usize> = IndexMap::new();
        for action in recent.iter().filter(|a| a.success) {
            if config.counts_product(&action.product) {
                *counts.entry(action.product.to_lowercase()).or_default() += 1;
            }
        }
        Self { counts }
    }

    /// Weight of a product, ignoring case
    #[must_use]
    pub fn get(&self, product: &str) -> usize {
        self.counts.get(&product.to_lowercase()).copied().unwrap_or(0)
    }

    /// Sum of all weights
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// True when nothing was counted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Heaviest product accepted by `eligible`; ties keep the earliest
    pub fn best_where<F>(&self, mut eligible: F) -> Option<(&str, usize)>
    where
        F: FnMut(&str) -> bool,
    {
        let mut best: Option<(&str, usize)> = None;
        for (product, &weight) in &self.counts {
            if best.map_or(true, |(_, w)| weight > w) && eligible(product) {
                best = Some((product.as_str(), weight));
            }
        }
        best
    }

    /// Share of `product` in the total, rounded to a whole percent
    #[must_use]
    pub fn percentage(&self, product: &str) -> usize {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        (self.get(product) * 100 + total / 2) / total
    }
}

/// Products along `id` and its ancestors, first appearance wins
///
/// The first entry is the node's primary lineage product.
#[must_use]
pub fn lineage_products<G: GraphQuery + ?Sized>(
    id: &str,
    nodes: &NodeMap,
    graph: &G,
    config: &EngineConfig,
) -> Vec<String> {
    let mut products: Vec<String> = Vec::new();
    let path = std::iter::once(id.to_string()).chain(graph.ancestors(id).into_iter().map(NodeId::into_string));

    for node_id in path {
        let Some(node) = nodes.get(node_id.as_str()) else { continue };
        for product in &node.products {
            if config.counts_product(product) && !products.iter().any(|p| p.eq_ignore_ascii_case(product)) {
                products.push(product.clone());
            }
        }
    }
    products
}

/// Distinct products of the recent history, as written, ignoring `n/a`
#[must_use]
pub fn recent_products(recent: &[RecentAction], config: &EngineConfig) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for action in recent {
        if config.counts_product(&action.product) && !out.contains(&action.product) {
            out.push(action.product.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use intent_graph::{node_map, FunctionalGraph, FunctionalNode, HierarchyLevel};
    use pretty_assertions::assert_eq;

    #[test]
    fn weights_count_successes_only() {
        let config = EngineConfig::default();
        let recent = [
            RecentAction::success("SAP"),
            RecentAction::failure("analytics"),
            RecentAction::success("n/a"),
            RecentAction::success("sap"),
            RecentAction::success("analytics"),
        ];
        let weights = ProductWeights::from_recent(&recent, &config);
        assert_eq!(weights.get("sap"), 2);
        assert_eq!(weights.get("Analytics"), 1);
        assert_eq!(weights.total(), 3);
        assert_eq!(weights.percentage("sap"), 67);
    }

    #[test]
    fn best_where_prefers_earliest_on_tie() {
        let config = EngineConfig::default();
        let recent = [
            RecentAction::success("crm"),
            RecentAction::success("sap"),
            RecentAction::success("analytics"),
            RecentAction::success("analytics"),
            RecentAction::success("sap"),
        ];
        let weights = ProductWeights::from_recent(&recent, &config);

        assert_eq!(weights.best_where(|_| true), Some(("sap", 2)));
        assert_eq!(weights.best_where(|p| p != "sap"), Some(("analytics", 2)));
        assert_eq!(weights.best_where(|p| p == "crm"), Some(("crm", 1)));
        assert_eq!(weights.best_where(|_| false), None);
    }

    #[test]
    fn lineage_walks_up_and_dedupes() {
        let config = EngineConfig::default();
        let nodes = node_map([
            FunctionalNode::new("outcome", HierarchyLevel::Outcome, "O")
                .with_products(["analytics", "sap"])
                .with_children(["step"]),
            FunctionalNode::new("step", HierarchyLevel::Step, "S")
                .with_products(["n/a", "SAP"])
                .with_children(["action"]),
            FunctionalNode::new("action", HierarchyLevel::Action, "A"),
        ]);
        let graph = FunctionalGraph::from_nodes(nodes.clone());

        assert_eq!(lineage_products("action", &nodes, &graph, &config), vec!["SAP", "analytics"]);
        assert!(lineage_products("missing", &nodes, &graph, &config).is_empty());
    }

    #[test]
    fn recent_products_are_distinct() {
        let config = EngineConfig::default();
        let recent = [
            RecentAction::success("sap"),
            RecentAction::success("n/a"),
            RecentAction::failure("crm"),
            RecentAction::success("sap"),
        ];
        assert_eq!(recent_products(&recent, &config), vec!["sap", "crm"]);
    }
}

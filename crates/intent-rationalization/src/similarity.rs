//! Similarity-based duplicate detection
//!
//! A fuzzier sibling of the label-equality preprocessor: nodes at the same
//! level with disjoint products group when their label similarity reaches
//! a threshold. Useful for auditing hand-maintained alternatives.

use crate::alternatives::RationalizedAlternatives;
use crate::preprocess::{cascade, shared_node_id};
use indexmap::IndexMap;
use intent_graph::{FunctionalNode, HierarchyLevel, NodeId, NodeMap};
use serde::Serialize;
use std::collections::HashSet;

/// Weights and threshold for label similarity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityConfig {
    /// Minimum similarity to treat two labels as one concept
    pub threshold: f64,
    /// Weight of token Jaccard similarity
    pub jaccard_weight: f64,
    /// Weight of normalized Levenshtein similarity
    pub levenshtein_weight: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            jaccard_weight: 0.6,
            levenshtein_weight: 0.4,
        }
    }
}

impl SimilarityConfig {
    /// With threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Edit distance between two strings, by `char`
#[must_use]
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let n = b_chars.len();
    if a.is_empty() {
        return n;
    }
    if n == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, c) in a.chars().enumerate() {
        curr[0] = i + 1;
        for j in 1..=n {
            let cost = usize::from(c != b_chars[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Weighted label similarity in `[0, 1]`; identical normalized labels score 1
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn label_similarity(a: &str, b: &str, config: &SimilarityConfig) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a == b {
        return 1.0;
    }

    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();
    let union = tokens_a.union(&tokens_b).count();
    let jaccard = if union == 0 {
        0.0
    } else {
        tokens_a.intersection(&tokens_b).count() as f64 / union as f64
    };

    let max_len = a.chars().count().max(b.chars().count());
    let edit = if max_len == 0 {
        1.0
    } else {
        1.0 - levenshtein(&a, &b) as f64 / max_len as f64
    };

    jaccard * config.jaccard_weight + edit * config.levenshtein_weight
}

/// One member of a [`SimilarityGroup`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarMember {
    /// Node id
    pub node: NodeId,
    /// First product of the node, or `unknown`
    pub product: String,
    /// Similarity to the group's anchor (the anchor itself scores 1)
    pub similarity: f64,
}

/// Nodes detected as one concept by label similarity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityGroup {
    /// Deterministic shared-node id for the group
    pub shared_id: NodeId,
    /// Anchor label
    pub label: String,
    /// Common level
    pub level: HierarchyLevel,
    /// Anchor first, then matches
    pub members: Vec<SimilarMember>,
}

impl SimilarityGroup {
    /// Mean member similarity
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_similarity(&self) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        self.members.iter().map(|m| m.similarity).sum::<f64>() / self.members.len() as f64
    }
}

/// Difference between detected and hand-maintained alternatives
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigComparison {
    /// Shared ids present in both
    pub matches: Vec<NodeId>,
    /// Hand-maintained shared ids the detector did not find
    pub missing: Vec<NodeId>,
    /// Detected shared ids absent from the hand-maintained set
    pub extra: Vec<NodeId>,
    /// Mean similarity per detected group
    pub similarity: IndexMap<NodeId, f64>,
}

/// Threshold-based similarity detector
#[derive(Debug, Clone, Default)]
pub struct SimilarityDetector {
    config: SimilarityConfig,
    shared_marker: Option<String>,
}

impl SimilarityDetector {
    /// Create detector
    #[must_use]
    pub fn new(config: SimilarityConfig) -> Self {
        Self {
            config,
            shared_marker: None,
        }
    }

    fn marker(&self) -> &str {
        self.shared_marker.as_deref().unwrap_or("-shared")
    }

    /// Use a different marker to recognise existing shared nodes
    #[must_use]
    pub fn with_shared_marker(mut self, marker: impl Into<String>) -> Self {
        self.shared_marker = Some(marker.into());
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Group similar, product-disjoint nodes level by level
    ///
    /// Each node joins at most one group. Anchors are taken in declaration
    /// order and collect every unclaimed node that clears the threshold.
    #[must_use]
    pub fn detect(&self, nodes: &NodeMap) -> Vec<SimilarityGroup> {
        let mut by_level: IndexMap<HierarchyLevel, Vec<&FunctionalNode>> = IndexMap::new();
        for (id, node) in nodes {
            if id.has_marker(self.marker()) {
                continue;
            }
            by_level.entry(node.level).or_default().push(node);
        }

        let mut claimed: HashSet<&str> = HashSet::new();
        let mut groups = Vec::new();

        for (level, level_nodes) in &by_level {
            for (i, anchor) in level_nodes.iter().enumerate() {
                if claimed.contains(anchor.id.as_str()) {
                    continue;
                }
                let mut members: Vec<SimilarMember> = Vec::new();

                for (j, other) in level_nodes.iter().enumerate() {
                    if i == j || claimed.contains(other.id.as_str()) || anchor.shares_product_with(other) {
                        continue;
                    }
                    let similarity = label_similarity(&anchor.label, &other.label, &self.config);
                    if similarity < self.config.threshold {
                        continue;
                    }
                    if members.is_empty() {
                        members.push(member(anchor, 1.0));
                        claimed.insert(anchor.id.as_str());
                    }
                    members.push(member(other, similarity));
                    claimed.insert(other.id.as_str());
                }

                if members.len() > 1 {
                    tracing::debug!(anchor = %anchor.id, members = members.len(), "similar labels grouped");
                    groups.push(SimilarityGroup {
                        shared_id: shared_node_id(&anchor.label, *level),
                        label: anchor.label.clone(),
                        level: *level,
                        members,
                    });
                }
            }
        }

        groups
    }

    /// Alternatives implied by detected groups, keyed by each member's first product
    #[must_use]
    pub fn alternatives(groups: &[SimilarityGroup]) -> RationalizedAlternatives {
        let mut alternatives = RationalizedAlternatives::new();
        for group in groups {
            for m in &group.members {
                alternatives.insert(group.shared_id.clone(), m.product.clone(), m.node.clone());
            }
        }
        alternatives
    }

    /// Group members plus all their descendants
    #[must_use]
    pub fn duplicate_nodes(groups: &[SimilarityGroup], nodes: &NodeMap) -> Vec<NodeId> {
        let direct: Vec<NodeId> = groups
            .iter()
            .flat_map(|g| g.members.iter().map(|m| m.node.clone()))
            .collect();
        cascade(nodes, &direct)
    }

    /// Compare detection over `nodes` with hand-maintained alternatives
    #[must_use]
    pub fn compare_with(&self, nodes: &NodeMap, manual: &RationalizedAlternatives) -> ConfigComparison {
        let groups = self.detect(nodes);
        let detected: HashSet<&str> = groups.iter().map(|g| g.shared_id.as_str()).collect();

        let mut comparison = ConfigComparison::default();
        for shared in manual.shared_ids() {
            if detected.contains(shared.as_str()) {
                comparison.matches.push(shared.clone());
            } else {
                comparison.missing.push(shared.clone());
            }
        }
        for group in &groups {
            if !manual.contains_shared(group.shared_id.as_str()) {
                comparison.extra.push(group.shared_id.clone());
            }
            comparison
                .similarity
                .insert(group.shared_id.clone(), group.mean_similarity());
        }
        comparison
    }
}

fn member(node: &FunctionalNode, similarity: f64) -> SimilarMember {
    SimilarMember {
        node: node.id.clone(),
        product: node
            .products
            .first()
            .map_or_else(|| "unknown".to_string(), |p| p.to_lowercase()),
        similarity,
    }
}

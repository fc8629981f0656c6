//! Shared-node preprocessing
//!
//! Detects groups of nodes that express one functional concept in several
//! products (same level, same label, pairwise disjoint products) and
//! synthesizes a shared node per group. Original nodes keep their ids and
//! edges; the shared node is wired in additively.

use crate::alternatives::RationalizedAlternatives;
use indexmap::IndexMap;
use intent_graph::{FunctionalNode, HierarchyLevel, NodeId, NodeMap};
use std::collections::{HashMap, HashSet, VecDeque};

/// Deterministic shared-node id: `<level>-<normalized-label>-shared`
///
/// The label is lowercased and every run of characters outside `[a-z0-9]`
/// collapses to a single `-`.
#[must_use]
pub fn shared_node_id(label: &str, level: HierarchyLevel) -> NodeId {
    NodeId::new(format!("{level}-{}-shared", slug(label)))
}

pub(crate) fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_dash = false;
    for c in label.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

/// A set of same-concept nodes spread across products
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Label of the first member
    pub label: String,
    /// Shared level
    pub level: HierarchyLevel,
    /// Member ids in declaration order
    pub members: Vec<NodeId>,
}

/// Result of [`SharedNodeGenerator::generate`]
#[derive(Debug, Clone, Default)]
pub struct PreprocessOutput {
    /// Original nodes plus synthesized shared nodes
    pub nodes: NodeMap,
    /// Duplicate ids, including every descendant of a duplicate
    pub duplicate_nodes: Vec<NodeId>,
    /// Synthesized ids followed by pre-existing shared ids
    pub shared_nodes: Vec<NodeId>,
    /// Shared id to per-product duplicate
    pub alternatives: RationalizedAlternatives,
}

/// Label-based duplicate detector and shared-node synthesizer
#[derive(Debug, Clone)]
pub struct SharedNodeGenerator {
    skip_markers: Vec<String>,
}

impl Default for SharedNodeGenerator {
    fn default() -> Self {
        Self {
            skip_markers: vec!["-shared".to_string(), "-unified".to_string()],
        }
    }
}

impl SharedNodeGenerator {
    /// Create generator skipping `-shared` and `-unified` ids
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip ids containing an additional marker
    #[must_use]
    pub fn with_skip_marker(mut self, marker: impl Into<String>) -> Self {
        self.skip_markers.push(marker.into());
        self
    }

    fn is_synthesized(&self, id: &NodeId) -> bool {
        self.skip_markers.iter().any(|m| id.has_marker(m))
    }

    /// Find qualifying duplicate groups
    ///
    /// Product and workflow nodes never group. A group needs two or more
    /// members whose product sets are pairwise disjoint. Members without
    /// products are disjoint from everything, but a group where no member
    /// lists a product carries no evidence of spanning products and is
    /// skipped.
    #[must_use]
    pub fn detect_groups(&self, nodes: &NodeMap) -> Vec<DuplicateGroup> {
        let mut buckets: IndexMap<(String, HierarchyLevel), Vec<&FunctionalNode>> = IndexMap::new();

        for (id, node) in nodes {
            if self.is_synthesized(id) || node.level.is_root() {
                continue;
            }
            buckets.entry((node.label_key(), node.level)).or_default().push(node);
        }

        buckets
            .into_values()
            .filter(|members| members.len() > 1 && pairwise_disjoint(members))
            .map(|members| DuplicateGroup {
                label: members[0].label.clone(),
                level: members[0].level,
                members: members.iter().map(|n| n.id.clone()).collect(),
            })
            .collect()
    }

    /// Detect groups and synthesize shared nodes on a copy of `nodes`
    ///
    /// Running this on its own output adds no further shared nodes. Members
    /// without products are filed under the products of their nearest
    /// ancestor that has some.
    #[must_use]
    pub fn generate(&self, nodes: &NodeMap) -> PreprocessOutput {
        let mut out = nodes.clone();
        let existing_shared: Vec<NodeId> = out.keys().filter(|id| self.is_synthesized(id)).cloned().collect();

        let groups = self.detect_groups(&out);
        let parents = parent_index(nodes);
        let inferred: HashMap<NodeId, Vec<String>> = groups
            .iter()
            .flat_map(|g| &g.members)
            .filter(|id| nodes.get(*id).is_some_and(|n| n.products.is_empty()))
            .map(|id| (id.clone(), self.inferred_products(nodes, &parents, id)))
            .collect();

        let mut generated = Vec::new();
        let mut direct_duplicates = Vec::new();
        let mut alternatives = RationalizedAlternatives::new();

        for group in &groups {
            let shared_id = if let Some(id) = self.existing_shared(&out, group) {
                tracing::debug!(shared = %id, label = %group.label, "shared node already present");
                id
            } else {
                let id = self.fresh_shared_id(&out, group);
                let shared = synthesize(&out, group, id.clone(), &inferred);
                tracing::debug!(shared = %id, members = group.members.len(), "synthesized shared node");
                wire(&mut out, shared);
                generated.push(id.clone());
                id
            };

            for member in &group.members {
                direct_duplicates.push(member.clone());
                for product in member_products(&out, member, &inferred) {
                    let product = product.to_lowercase();
                    let taken = alternatives
                        .alternative_for(shared_id.as_str(), &product)
                        .is_some_and(|existing| existing != member);
                    if taken {
                        tracing::warn!(
                            shared = %shared_id,
                            product = %product,
                            duplicate = %member,
                            "product already has an alternative; keeping the first"
                        );
                        continue;
                    }
                    alternatives.insert(shared_id.clone(), product, member.clone());
                }
            }
        }

        let duplicate_nodes = cascade(&out, &direct_duplicates);
        let mut shared_nodes = generated;
        shared_nodes.extend(existing_shared);

        tracing::info!(
            groups = groups.len(),
            shared = shared_nodes.len(),
            duplicates = duplicate_nodes.len(),
            "preprocessed domain nodes"
        );

        PreprocessOutput {
            nodes: out,
            duplicate_nodes,
            shared_nodes,
            alternatives,
        }
    }

    /// Shared node already standing for `group`: same level and label
    fn existing_shared(&self, nodes: &NodeMap, group: &DuplicateGroup) -> Option<NodeId> {
        let key = group.label.trim().to_lowercase();
        let stands_for = |n: &FunctionalNode| n.level == group.level && n.label_key() == key;

        let candidate = shared_node_id(&group.label, group.level);
        if nodes.get(&candidate).is_some_and(stands_for) {
            return Some(candidate);
        }
        nodes
            .iter()
            .find(|&(id, n)| self.is_synthesized(id) && stands_for(n))
            .map(|(id, _)| id.clone())
    }

    /// Unused shared id for `group`, numbered when another concept holds the plain one
    fn fresh_shared_id(&self, nodes: &NodeMap, group: &DuplicateGroup) -> NodeId {
        let plain = shared_node_id(&group.label, group.level);
        if !nodes.contains_key(&plain) {
            return plain;
        }
        let slug = slug(&group.label);
        let id = (2usize..)
            .map(|n| NodeId::new(format!("{}-{slug}-{n}-shared", group.level)))
            .find(|id| !nodes.contains_key(id))
            .unwrap_or(plain);
        tracing::warn!(label = %group.label, shared = %id, "shared id taken by another label");
        id
    }

    /// Products of the nearest ancestors that list any, skipping shared nodes
    fn inferred_products(
        &self,
        nodes: &NodeMap,
        parents: &HashMap<&NodeId, Vec<&NodeId>>,
        id: &NodeId,
    ) -> Vec<String> {
        let mut seen: HashSet<&NodeId> = HashSet::from([id]);
        let mut queue: VecDeque<&NodeId> = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for &parent in parents.get(current).into_iter().flatten() {
                if self.is_synthesized(parent) || !seen.insert(parent) {
                    continue;
                }
                if let Some(node) = nodes.get(parent) {
                    if !node.products.is_empty() {
                        return node.products.clone();
                    }
                }
                queue.push_back(parent);
            }
        }
        Vec::new()
    }
}

/// Run the default generator
#[must_use]
pub fn preprocess(nodes: &NodeMap) -> PreprocessOutput {
    SharedNodeGenerator::new().generate(nodes)
}

/// Parents of every node, from both `parents` lists and `children` lists
fn parent_index(nodes: &NodeMap) -> HashMap<&NodeId, Vec<&NodeId>> {
    let mut index: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    for (id, node) in nodes {
        for child in &node.children {
            index.entry(child).or_default().push(id);
        }
        for parent in &node.parents {
            index.entry(id).or_default().push(parent);
        }
    }
    index
}

fn member_products(nodes: &NodeMap, id: &NodeId, inferred: &HashMap<NodeId, Vec<String>>) -> Vec<String> {
    match nodes.get(id) {
        Some(node) if !node.products.is_empty() => node.products.clone(),
        _ => inferred.get(id).cloned().unwrap_or_default(),
    }
}

fn pairwise_disjoint(members: &[&FunctionalNode]) -> bool {
    members.iter().any(|n| !n.products.is_empty())
        && members.iter().enumerate().all(|(i, a)| {
            members[i + 1..].iter().all(|b| !a.shares_product_with(b))
        })
}

fn push_unique<T: PartialEq + Clone>(target: &mut Vec<T>, items: &[T]) {
    for item in items {
        if !target.contains(item) {
            target.push(item.clone());
        }
    }
}

fn synthesize(
    nodes: &NodeMap,
    group: &DuplicateGroup,
    id: NodeId,
    inferred: &HashMap<NodeId, Vec<String>>,
) -> FunctionalNode {
    let mut shared = FunctionalNode::new(id, group.level, group.label.clone());
    let mut description = None;

    for member in group.members.iter().filter_map(|id| nodes.get(id)) {
        push_unique(&mut shared.children, &member.children);
        push_unique(&mut shared.parents, &member.parents);
        for product in member_products(nodes, &member.id, inferred) {
            if !shared.has_product(&product) {
                shared.products.push(product);
            }
        }
        if description.is_none() {
            description.clone_from(&member.description);
        }
    }

    shared.description =
        Some(description.unwrap_or_else(|| format!("Shared {} across multiple products", group.level)));
    shared
}

fn wire(nodes: &mut NodeMap, shared: FunctionalNode) {
    for parent in &shared.parents {
        if let Some(node) = nodes.get_mut(parent) {
            if !node.children.contains(&shared.id) {
                node.children.push(shared.id.clone());
            }
        }
    }
    for child in &shared.children {
        if let Some(node) = nodes.get_mut(child) {
            if !node.parents.contains(&shared.id) {
                node.parents.push(shared.id.clone());
            }
        }
    }
    nodes.insert(shared.id.clone(), shared);
}

/// Direct duplicates followed by all of their descendants, deduplicated
pub(crate) fn cascade(nodes: &NodeMap, direct: &[NodeId]) -> Vec<NodeId> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut out = Vec::new();
    for id in direct {
        if seen.insert(id.clone()) {
            out.push(id.clone());
        }
    }

    let mut stack: Vec<NodeId> = out.clone();
    while let Some(id) = stack.pop() {
        let Some(node) = nodes.get(&id) else { continue };
        for child in &node.children {
            if nodes.contains_key(child) && seen.insert(child.clone()) {
                out.push(child.clone());
                stack.push(child.clone());
            }
        }
    }
    out
}

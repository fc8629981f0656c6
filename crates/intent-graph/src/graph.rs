//! Graph store and traversal helpers
//!
//! Provides [`FunctionalGraph`], an immutable adjacency index over a
//! [`NodeMap`], and the [`GraphQuery`] trait consumed by the resolution
//! engine.
//!
//! # Traversal
//!
//! Nodes may have several parents whose ancestor chains reconverge
//! (diamonds). Every walk threads an explicit visited set, so each node
//! is reported at most once and the start node is never reported.

use crate::level::HierarchyLevel;
use crate::node::{FunctionalNode, NodeId, NodeMap};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

/// Direction of a reachability walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Follow parent edges
    Up,
    /// Follow child edges
    Down,
}

/// Read-only graph queries used during resolution
///
/// Unknown ids are never an error: they simply have no neighbours.
pub trait GraphQuery {
    /// Direct children of `id`
    fn children(&self, id: &str) -> &[NodeId];

    /// Direct parents of `id`
    fn parents(&self, id: &str) -> &[NodeId];

    /// Every node reachable through parent edges, excluding `id`
    fn ancestors(&self, id: &str) -> Vec<NodeId> {
        reachable(self, id, Direction::Up)
    }

    /// Every node reachable through child edges, excluding `id`
    fn descendants(&self, id: &str) -> Vec<NodeId> {
        reachable(self, id, Direction::Down)
    }
}

/// Breadth-first reachability from `start`, deduplicated, excluding `start`
pub fn reachable<G: GraphQuery + ?Sized>(graph: &G, start: &str, direction: Direction) -> Vec<NodeId> {
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start);

    let mut out: Vec<NodeId> = Vec::new();
    let mut queue: VecDeque<&str> = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        let next = match direction {
            Direction::Up => graph.parents(current),
            Direction::Down => graph.children(current),
        };
        for neighbour in next {
            if visited.insert(neighbour.as_str()) {
                out.push(neighbour.clone());
                queue.push_back(neighbour.as_str());
            }
        }
    }

    out
}

/// Immutable functional hierarchy graph
///
/// Adjacency is derived from the nodes' `children` lists; parent lists are
/// the mirror image, so the index is bidirectionally consistent by
/// construction. Edges to unknown ids are dropped.
#[derive(Debug, Clone, Default)]
pub struct FunctionalGraph {
    nodes: NodeMap,
    children: HashMap<NodeId, Vec<NodeId>>,
    parents: HashMap<NodeId, Vec<NodeId>>,
    roots: Vec<NodeId>,
    leaves: Vec<NodeId>,
    by_level: HashMap<HierarchyLevel, Vec<NodeId>>,
}

impl FunctionalGraph {
    /// Build the adjacency index for a node map
    #[must_use]
    pub fn from_nodes(nodes: NodeMap) -> Self {
        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::with_capacity(nodes.len());
        let mut parents: HashMap<NodeId, Vec<NodeId>> = HashMap::with_capacity(nodes.len());
        let mut by_level: HashMap<HierarchyLevel, Vec<NodeId>> = HashMap::new();

        for id in nodes.keys() {
            children.insert(id.clone(), Vec::new());
            parents.insert(id.clone(), Vec::new());
        }

        let mut dropped = 0usize;
        for (id, node) in &nodes {
            by_level.entry(node.level).or_default().push(id.clone());

            for child in &node.children {
                if !nodes.contains_key(child.as_str()) {
                    tracing::warn!(parent = %id, child = %child, "dropping edge to unknown child");
                    dropped += 1;
                    continue;
                }
                let list = children.entry(id.clone()).or_default();
                if !list.contains(child) {
                    list.push(child.clone());
                }
                let list = parents.entry(child.clone()).or_default();
                if !list.contains(id) {
                    list.push(id.clone());
                }
            }
        }

        let roots = nodes
            .keys()
            .filter(|id| parents.get(*id).map_or(true, Vec::is_empty))
            .cloned()
            .collect();
        let leaves = nodes
            .keys()
            .filter(|id| children.get(*id).map_or(true, Vec::is_empty))
            .cloned()
            .collect();

        tracing::debug!(nodes = nodes.len(), dropped, "built functional graph");

        Self {
            nodes,
            children,
            parents,
            roots,
            leaves,
            by_level,
        }
    }

    /// Node metadata by id
    #[inline]
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&FunctionalNode> {
        self.nodes.get(id)
    }

    /// All node metadata, in declaration order
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    /// Consume into the underlying node map
    #[inline]
    #[must_use]
    pub fn into_nodes(self) -> NodeMap {
        self.nodes
    }

    /// Check whether a node exists
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of parent → child edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }

    /// Nodes without parents
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Nodes without children
    #[inline]
    #[must_use]
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// All nodes at a level, in declaration order
    #[must_use]
    pub fn nodes_at_level(&self, level: HierarchyLevel) -> Vec<&FunctionalNode> {
        self.by_level
            .get(&level)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id.as_str())).collect())
            .unwrap_or_default()
    }

    /// Shortest path between two nodes, treating edges as undirected
    ///
    /// Returns `None` when either node is unknown or they are disconnected.
    #[must_use]
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<NodeId>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }

        let mut previous: HashMap<&str, &str> = HashMap::new();
        let mut visited: HashSet<&str> = HashSet::from([from]);
        let mut queue: VecDeque<&str> = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                let mut path = vec![NodeId::from(current)];
                let mut cursor = current;
                while let Some(prev) = previous.get(cursor) {
                    path.push(NodeId::from(*prev));
                    cursor = *prev;
                }
                path.reverse();
                return Some(path);
            }

            let neighbours = self.children(current).iter().chain(self.parents(current));
            for neighbour in neighbours {
                if visited.insert(neighbour.as_str()) {
                    previous.insert(neighbour.as_str(), current);
                    queue.push_back(neighbour.as_str());
                }
            }
        }

        None
    }

    /// Check for a direct parent/child edge in either direction
    #[must_use]
    pub fn are_connected(&self, a: &str, b: &str) -> bool {
        self.children(a).iter().any(|c| c == b) || self.parents(a).iter().any(|p| p == b)
    }

    /// Groups of nodes sharing a level and (case-insensitive) label
    ///
    /// Only keys with two or more nodes are returned.
    #[must_use]
    pub fn overlapping_nodes(&self) -> IndexMap<(HierarchyLevel, String), Vec<NodeId>> {
        let mut groups: IndexMap<(HierarchyLevel, String), Vec<NodeId>> = IndexMap::new();
        for node in self.nodes.values() {
            groups
                .entry((node.level, node.label_key()))
                .or_default()
                .push(node.id.clone());
        }
        groups.retain(|_, ids| ids.len() > 1);
        groups
    }

    /// Child-closure of `root` down to `max_depth` levels (unbounded if `None`)
    ///
    /// Only edges between included nodes are kept.
    #[must_use]
    pub fn subgraph(&self, root: &str, max_depth: Option<usize>) -> FunctionalGraph {
        let mut included: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();

        if self.contains(root) {
            queue.push_back((root, 0));
        }

        while let Some((id, depth)) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            included.push(id);
            if max_depth.map_or(true, |max| depth < max) {
                for child in self.children(id) {
                    queue.push_back((child.as_str(), depth + 1));
                }
            }
        }

        let nodes: NodeMap = included
            .iter()
            .filter_map(|id| self.nodes.get(*id))
            .map(|node| {
                let mut node = node.clone();
                node.children = self
                    .children(node.id.as_str())
                    .iter()
                    .filter(|c| seen.contains(c.as_str()))
                    .cloned()
                    .collect();
                node.parents = self
                    .parents(node.id.as_str())
                    .iter()
                    .filter(|p| seen.contains(p.as_str()))
                    .cloned()
                    .collect();
                (node.id.clone(), node)
            })
            .collect();

        FunctionalGraph::from_nodes(nodes)
    }
}

impl GraphQuery for FunctionalGraph {
    fn children(&self, id: &str) -> &[NodeId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn parents(&self, id: &str) -> &[NodeId] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

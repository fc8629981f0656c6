//! Integrity validation for authored node maps
//!
//! Hand-authored domains drift: children that were renamed, parents that
//! forgot the back-reference, duplicate labels without a unifying shared
//! node. [`IntegrityValidator`] reports all of these as data so a loader
//! can decide which ones are fatal.

use crate::error::GraphError;
use crate::level::HierarchyLevel;
use crate::node::{NodeId, NodeMap};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Data-integrity defect
    Error,
    /// Suspicious but usable
    Warning,
}

/// Classification of an integrity issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A `children` entry names an unknown node
    MissingChild,
    /// A `parents` entry names an unknown node
    MissingParent,
    /// An edge is listed on one side only
    InconsistentEdge,
    /// Non-root node that nothing points to
    OrphanedNode,
    /// Child edges form a cycle
    CycleDetected,
    /// Step with no action children
    StepWithoutActions,
    /// Node with an empty id or label
    MissingLabel,
    /// Same label and level twice inside one product
    DuplicateLabelSameProduct,
    /// Cross-product duplicate label with no shared node
    UnrationalizedDuplicate,
    /// Alternatives name a shared node that does not exist
    MissingSharedNode,
    /// Alternatives name a duplicate node that does not exist
    MissingAlternative,
}

/// A single integrity finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityIssue {
    /// What went wrong
    pub kind: IssueKind,
    /// How bad it is
    pub severity: Severity,
    /// Node the issue is about, if any
    pub node: Option<NodeId>,
    /// Human-readable description
    pub message: String,
}

impl IntegrityIssue {
    /// Create an error-severity issue
    pub fn error(kind: IssueKind, node: Option<NodeId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            node,
            message: message.into(),
        }
    }

    /// Create a warning-severity issue
    pub fn warning(kind: IssueKind, node: Option<NodeId>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            node,
            message: message.into(),
        }
    }
}

/// Result of validating a node map
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// All findings, in check order
    pub issues: Vec<IntegrityIssue>,
}

impl ValidationReport {
    /// Error-severity findings
    pub fn errors(&self) -> impl Iterator<Item = &IntegrityIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    /// Warning-severity findings
    pub fn warnings(&self) -> impl Iterator<Item = &IntegrityIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// True when no error-severity findings exist
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Count findings of a kind
    #[must_use]
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Append findings produced elsewhere (e.g. alternatives checks)
    pub fn extend(&mut self, issues: impl IntoIterator<Item = IntegrityIssue>) {
        self.issues.extend(issues);
    }

    /// Fail on any error-severity finding
    ///
    /// # Errors
    /// Returns [`GraphError::Integrity`] carrying the error findings
    pub fn into_result(self) -> Result<Self, GraphError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(GraphError::Integrity(self.errors().cloned().collect()))
        }
    }
}

/// Structural validator for authored node maps
#[derive(Debug, Clone)]
pub struct IntegrityValidator {
    shared_marker: String,
}

impl Default for IntegrityValidator {
    fn default() -> Self {
        Self {
            shared_marker: "-shared".to_string(),
        }
    }
}

impl IntegrityValidator {
    /// Create validator with the default `-shared` marker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different shared-node id marker
    #[inline]
    #[must_use]
    pub fn with_shared_marker(mut self, marker: impl Into<String>) -> Self {
        self.shared_marker = marker.into();
        self
    }

    /// Run every check over `nodes`
    #[must_use]
    pub fn validate(&self, nodes: &NodeMap) -> ValidationReport {
        let mut report = ValidationReport::default();
        Self::check_required(nodes, &mut report);
        Self::check_edges(nodes, &mut report);
        Self::check_orphans(nodes, &mut report);
        Self::check_cycles(nodes, &mut report);
        self.check_step_actions(nodes, &mut report);
        self.check_duplicate_labels(nodes, &mut report);
        tracing::debug!(
            issues = report.issues.len(),
            valid = report.is_valid(),
            "validated node map"
        );
        report
    }

    fn check_required(nodes: &NodeMap, report: &mut ValidationReport) {
        for (id, node) in nodes {
            if id.as_str().trim().is_empty() || node.label.trim().is_empty() {
                report.issues.push(IntegrityIssue::error(
                    IssueKind::MissingLabel,
                    Some(id.clone()),
                    format!("Node '{id}' is missing an id or label"),
                ));
            }
        }
    }

    fn check_edges(nodes: &NodeMap, report: &mut ValidationReport) {
        for (id, node) in nodes {
            for child_id in &node.children {
                match nodes.get(child_id.as_str()) {
                    None => report.issues.push(IntegrityIssue::error(
                        IssueKind::MissingChild,
                        Some(id.clone()),
                        format!("Missing child: {id} references non-existent child {child_id}"),
                    )),
                    Some(child) if !child.parents.contains(id) => {
                        report.issues.push(IntegrityIssue::error(
                            IssueKind::InconsistentEdge,
                            Some(id.clone()),
                            format!(
                                "Inconsistent relationship: {id} has child {child_id}, but {child_id} doesn't list {id} as parent"
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            }

            for parent_id in &node.parents {
                match nodes.get(parent_id.as_str()) {
                    None => report.issues.push(IntegrityIssue::error(
                        IssueKind::MissingParent,
                        Some(id.clone()),
                        format!("Missing parent: {id} references non-existent parent {parent_id}"),
                    )),
                    Some(parent) if !parent.children.contains(id) => {
                        report.issues.push(IntegrityIssue::error(
                            IssueKind::InconsistentEdge,
                            Some(id.clone()),
                            format!(
                                "Inconsistent relationship: {id} has parent {parent_id}, but {parent_id} doesn't list {id} as child"
                            ),
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
    }

    fn check_orphans(nodes: &NodeMap, report: &mut ValidationReport) {
        let referenced: HashSet<&str> = nodes
            .values()
            .flat_map(|n| n.children.iter().map(NodeId::as_str))
            .collect();

        for (id, node) in nodes {
            if node.level.is_root() {
                continue;
            }
            if node.parents.is_empty() && !referenced.contains(id.as_str()) {
                report.issues.push(IntegrityIssue::error(
                    IssueKind::OrphanedNode,
                    Some(id.clone()),
                    format!("Orphaned node: {id} ({}) - not referenced by any parent", node.label),
                ));
            }
        }
    }

    fn check_cycles(nodes: &NodeMap, report: &mut ValidationReport) {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Active,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(nodes.len());

        for start in nodes.keys() {
            if marks.contains_key(start.as_str()) {
                continue;
            }
            // Iterative DFS: (node, next child index)
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            marks.insert(start.as_str(), Mark::Active);

            while let Some((id, idx)) = stack.last().copied() {
                let children = nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[]);
                if let Some(child) = children.get(idx) {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    if !nodes.contains_key(child.as_str()) {
                        continue;
                    }
                    match marks.get(child.as_str()) {
                        Some(Mark::Active) => report.issues.push(IntegrityIssue::error(
                            IssueKind::CycleDetected,
                            Some(child.clone()),
                            format!("Circular dependency: {id} -> {child}"),
                        )),
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(child.as_str(), Mark::Active);
                            stack.push((child.as_str(), 0));
                        }
                    }
                } else {
                    marks.insert(id, Mark::Done);
                    stack.pop();
                }
            }
        }
    }

    fn check_step_actions(&self, nodes: &NodeMap, report: &mut ValidationReport) {
        for (id, node) in nodes {
            if node.level != HierarchyLevel::Step || id.has_marker(&self.shared_marker) {
                continue;
            }
            let has_action = node.children.iter().any(|c| {
                nodes
                    .get(c.as_str())
                    .is_some_and(|child| child.level == HierarchyLevel::Action)
            });
            if !has_action {
                report.issues.push(IntegrityIssue::warning(
                    IssueKind::StepWithoutActions,
                    Some(id.clone()),
                    format!("Step {id} ({}) has no action children", node.label),
                ));
            }
        }
    }

    fn check_duplicate_labels(&self, nodes: &NodeMap, report: &mut ValidationReport) {
        let mut regular: IndexMap<(HierarchyLevel, String), Vec<&NodeId>> = IndexMap::new();
        let mut shared: Vec<(HierarchyLevel, String)> = Vec::new();

        for (id, node) in nodes {
            let key = (node.level, node.label_key());
            if id.has_marker(&self.shared_marker) {
                shared.push(key);
            } else {
                regular.entry(key).or_default().push(id);
            }
        }

        for ((level, label), ids) in &regular {
            if ids.len() < 2 {
                continue;
            }
            let products: HashSet<String> = ids
                .iter()
                .filter_map(|id| nodes.get(id.as_str()))
                .flat_map(|n| n.products.iter().map(|p| p.to_lowercase()))
                .collect();
            let listed = ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ");

            if products.len() <= 1 {
                report.issues.push(IntegrityIssue::warning(
                    IssueKind::DuplicateLabelSameProduct,
                    None,
                    format!("Duplicate label \"{label}\" at {level} level within same product: {listed}"),
                ));
                continue;
            }

            let unified = shared.iter().any(|(shared_level, shared_label)| {
                shared_level == level
                    && (shared_label == label
                        || shared_label.contains(label.as_str())
                        || label.contains(shared_label.as_str()))
            });
            if !unified {
                report.issues.push(IntegrityIssue::warning(
                    IssueKind::UnrationalizedDuplicate,
                    None,
                    format!(
                        "Duplicate label \"{label}\" at {level} level across products ({listed}) without a shared node"
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{node_map, FunctionalNode};

    fn consistent_domain() -> NodeMap {
        node_map([
            FunctionalNode::new("product-a", HierarchyLevel::Product, "A").with_children(["outcome-a"]),
            FunctionalNode::new("outcome-a", HierarchyLevel::Outcome, "Outcome")
                .with_parents(["product-a"])
                .with_children(["step-a"]),
            FunctionalNode::new("step-a", HierarchyLevel::Step, "Step")
                .with_parents(["outcome-a"])
                .with_children(["action-a"]),
            FunctionalNode::new("action-a", HierarchyLevel::Action, "Act").with_parents(["step-a"]),
        ])
    }

    #[test]
    fn consistent_domain_is_valid() {
        let report = IntegrityValidator::new().validate(&consistent_domain());
        assert!(report.is_valid());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn detects_missing_child_and_parent() {
        let mut nodes = consistent_domain();
        nodes["outcome-a"].children.push(NodeId::from("ghost"));
        nodes["action-a"].parents.push(NodeId::from("phantom"));

        let report = IntegrityValidator::new().validate(&nodes);
        assert_eq!(report.count(IssueKind::MissingChild), 1);
        assert_eq!(report.count(IssueKind::MissingParent), 1);
        assert!(report.into_result().is_err());
    }

    #[test]
    fn detects_one_sided_edge() {
        let mut nodes = consistent_domain();
        nodes["action-a"].parents.clear();

        let report = IntegrityValidator::new().validate(&nodes);
        assert_eq!(report.count(IssueKind::InconsistentEdge), 1);
    }

    #[test]
    fn detects_orphans_but_not_roots() {
        let mut nodes = consistent_domain();
        nodes.insert(
            NodeId::from("workflow-x"),
            FunctionalNode::new("workflow-x", HierarchyLevel::Workflow, "Flow"),
        );
        nodes.insert(
            NodeId::from("scenario-lost"),
            FunctionalNode::new("scenario-lost", HierarchyLevel::Scenario, "Lost"),
        );

        let report = IntegrityValidator::new().validate(&nodes);
        let orphans: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::OrphanedNode)
            .collect();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].node.as_ref().unwrap(), "scenario-lost");
    }

    #[test]
    fn detects_cycles() {
        let nodes = node_map([
            FunctionalNode::new("a", HierarchyLevel::Step, "A")
                .with_children(["b"])
                .with_parents(["b"]),
            FunctionalNode::new("b", HierarchyLevel::Step, "B")
                .with_children(["a"])
                .with_parents(["a"]),
        ]);
        let report = IntegrityValidator::new().validate(&nodes);
        assert_eq!(report.count(IssueKind::CycleDetected), 1);
    }

    #[test]
    fn warns_on_step_without_actions() {
        let mut nodes = consistent_domain();
        nodes["step-a"].children.clear();
        nodes["action-a"].parents.clear();

        let report = IntegrityValidator::new().validate(&nodes);
        assert_eq!(report.count(IssueKind::StepWithoutActions), 1);
        assert!(report.warnings().any(|w| w.kind == IssueKind::StepWithoutActions));
    }

    #[test]
    fn duplicate_labels_need_shared_node() {
        let mut nodes = node_map([
            FunctionalNode::new("scenario-x-sap", HierarchyLevel::Scenario, "Monitor")
                .with_products(["sap"]),
            FunctionalNode::new("scenario-x-crm", HierarchyLevel::Scenario, "Monitor")
                .with_products(["crm"]),
        ]);
        let report = IntegrityValidator::new().validate(&nodes);
        assert_eq!(report.count(IssueKind::UnrationalizedDuplicate), 1);

        nodes.insert(
            NodeId::from("scenario-monitor-shared"),
            FunctionalNode::new("scenario-monitor-shared", HierarchyLevel::Scenario, "Monitor"),
        );
        let report = IntegrityValidator::new().validate(&nodes);
        assert_eq!(report.count(IssueKind::UnrationalizedDuplicate), 0);
    }

    #[test]
    fn duplicate_labels_inside_one_product() {
        let nodes = node_map([
            FunctionalNode::new("s1", HierarchyLevel::Step, "Review").with_products(["sap"]),
            FunctionalNode::new("s2", HierarchyLevel::Step, "Review").with_products(["sap"]),
        ]);
        let report = IntegrityValidator::new().validate(&nodes);
        assert_eq!(report.count(IssueKind::DuplicateLabelSameProduct), 1);
    }
}

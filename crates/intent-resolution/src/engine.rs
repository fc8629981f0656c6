//! Resolution engine
//!
//! Decides whether an entry node resolves and, if so, which actions and
//! products it activates. Branches are checked in a fixed order:
//!
//! 1. shared node with rationalization off (context may redirect)
//! 2. unknown entry
//! 3. duplicate label or duplicate ancestor with rationalization off
//! 4. workflow gating
//! 5. standard traversal by level
//!
//! Failures are returned as data with confidence 0; nothing here panics or
//! returns an error.

use crate::config::EngineConfig;
use crate::context::{lineage_products, recent_products, ProductWeights};
use crate::types::{
    FailureKind, Priority, ProductActivation, RecentAction, Resolution, Toggles, TraversalPath, UserContext,
};
use indexmap::IndexMap;
use intent_graph::{FunctionalNode, GraphQuery, HierarchyLevel, NodeId, NodeMap};
use intent_rationalization::{duplicate_status, DuplicateIndex, LabelIndex, RationalizedAlternatives};
use std::borrow::Cow;

const OVERLAP_FAILURE: &str = "Resolution failed: Overlapping functions in multiple products - no clear resolution possible. Enable rationalization to unify duplicate functionality.";
const NOT_FOUND_FAILURE: &str = "Resolution failed: Entry node not found";
const WORKFLOW_FAILURE: &str =
    "Resolution failed: Workflow orchestration is disabled. Enable workflows to access cross-product coordination.";

/// Per-call inputs
#[derive(Debug, Clone, Copy)]
struct Inputs<'r> {
    context: Option<&'r UserContext>,
    toggles: Toggles,
    recent: &'r [RecentAction],
}

impl Inputs<'_> {
    fn has_history(&self) -> bool {
        self.context.is_some() && !self.recent.is_empty()
    }
}

enum Ambiguity {
    Clear,
    SettledByContext(String),
    Unresolved(Resolution),
}

/// Resolution engine over one node map and graph view
///
/// The engine borrows everything and is cheap to build per call.
#[derive(Debug)]
pub struct ResolutionEngine<'a, G: ?Sized> {
    nodes: &'a NodeMap,
    alternatives: &'a RationalizedAlternatives,
    duplicates: Cow<'a, DuplicateIndex>,
    labels: Cow<'a, LabelIndex>,
    graph: &'a G,
    config: Cow<'a, EngineConfig>,
}

impl<'a, G: GraphQuery + ?Sized> ResolutionEngine<'a, G> {
    /// Create engine; duplicate and label indexes are derived from the inputs
    #[must_use]
    pub fn new(nodes: &'a NodeMap, alternatives: &'a RationalizedAlternatives, graph: &'a G) -> Self {
        Self {
            nodes,
            alternatives,
            duplicates: Cow::Owned(DuplicateIndex::from_alternatives(alternatives)),
            labels: Cow::Owned(LabelIndex::from_nodes(nodes)),
            graph,
            config: Cow::Owned(EngineConfig::default()),
        }
    }

    /// Create engine over a precomputed duplicate index
    #[must_use]
    pub fn with_index(
        nodes: &'a NodeMap,
        alternatives: &'a RationalizedAlternatives,
        duplicates: &'a DuplicateIndex,
        graph: &'a G,
    ) -> Self {
        Self {
            nodes,
            alternatives,
            duplicates: Cow::Borrowed(duplicates),
            labels: Cow::Owned(LabelIndex::from_nodes(nodes)),
            graph,
            config: Cow::Owned(EngineConfig::default()),
        }
    }

    /// With a label index built once for `nodes`
    #[must_use]
    pub fn with_labels(mut self, labels: &'a LabelIndex) -> Self {
        self.labels = Cow::Borrowed(labels);
        self
    }

    /// With configuration
    #[must_use]
    pub fn with_config(mut self, config: &'a EngineConfig) -> Self {
        self.config = Cow::Borrowed(config);
        self
    }

    /// Resolve `entry`
    #[must_use]
    pub fn resolve(
        &self,
        entry: &str,
        context: Option<&UserContext>,
        toggles: Toggles,
        recent: &[RecentAction],
    ) -> Resolution {
        let inputs = Inputs {
            context,
            toggles,
            recent,
        };
        let resolution = self.resolve_at(entry, inputs, 0);
        tracing::debug!(
            entry,
            confidence = resolution.confidence_score,
            failure = ?resolution.failure,
            actions = resolution.selected_actions.len(),
            "resolved entry node"
        );
        resolution
    }

    fn resolve_at(&self, entry: &str, inputs: Inputs<'_>, depth: usize) -> Resolution {
        if self.is_shared(entry) && !inputs.toggles.rationalize {
            return self.resolve_shared(entry, inputs, depth);
        }

        let Some(node) = self.nodes.get(entry) else {
            return Resolution::failed(entry, FailureKind::EntryNotFound, NOT_FOUND_FAILURE);
        };

        let mut context_note = None;
        if !inputs.toggles.rationalize && !self.config.is_workflow(node) {
            match self.check_ambiguity(node, inputs) {
                Ambiguity::Clear => {}
                Ambiguity::SettledByContext(note) => context_note = Some(note),
                Ambiguity::Unresolved(resolution) => return resolution,
            }
        }

        if self.config.is_workflow(node) {
            return self.resolve_workflow(node, inputs.toggles);
        }

        self.traverse(node, inputs, context_note)
    }

    fn is_shared(&self, id: &str) -> bool {
        id.contains(self.config.shared_marker.as_str()) || self.alternatives.contains_shared(id)
    }

    fn resolve_shared(&self, entry: &str, inputs: Inputs<'_>, depth: usize) -> Resolution {
        if inputs.has_history() {
            if depth >= self.config.max_redirect_depth {
                tracing::warn!(entry, depth, "context redirect depth exhausted");
            } else {
                let weights = ProductWeights::from_recent(inputs.recent, &self.config);
                let best = weights.best_where(|p| self.alternatives.alternative_for(entry, p).is_some());

                if let Some((product, weight)) = best {
                    let target = self
                        .alternatives
                        .alternative_for(entry, product)
                        .filter(|id| self.nodes.contains_key(id.as_str()));

                    if let Some(target) = target {
                        tracing::debug!(entry, %target, product, weight, "context selected alternative");
                        let mut resolution = self.resolve_at(target.as_str(), inputs, depth + 1);
                        resolution.reasoning.insert(
                            0,
                            format!(
                                "Context-based resolution: Selected {} based on recent usage ({weight} recent actions)",
                                product.to_uppercase()
                            ),
                        );
                        return resolution;
                    }
                }
            }
        }

        Resolution::failed(entry, FailureKind::OverlapUnresolved, OVERLAP_FAILURE)
    }

    fn check_ambiguity(&self, node: &FunctionalNode, inputs: Inputs<'_>) -> Ambiguity {
        let same_label = self
            .labels
            .ids(&node.label)
            .iter()
            .any(|id| id != &node.id && !self.is_shared(id.as_str()) && self.nodes.contains_key(id));
        let status = duplicate_status(node.id.as_str(), self.graph, &self.duplicates);

        if !same_label && !status.is_duplicate {
            return Ambiguity::Clear;
        }

        let ambiguous = status
            .duplicate_ancestor
            .as_ref()
            .and_then(|id| self.nodes.get(id.as_str()))
            .unwrap_or(node);
        tracing::debug!(
            entry = %node.id,
            ambiguous = %ambiguous.id,
            same_label,
            "duplicate detected with rationalization off"
        );

        if inputs.has_history() {
            let weights = ProductWeights::from_recent(inputs.recent, &self.config);
            let lineage = lineage_products(node.id.as_str(), self.nodes, self.graph, &self.config);

            if let Some(product) = lineage.first().filter(|p| weights.get(p) > 0) {
                return Ambiguity::SettledByContext(format!(
                    "Context-based resolution: Selected {} path based on {}% usage in recent actions",
                    product.to_uppercase(),
                    weights.percentage(product)
                ));
            }
        }

        let products = self.competing_products(ambiguous);
        Ambiguity::Unresolved(Resolution::failed(
            node.id.clone(),
            FailureKind::AmbiguousDuplicate,
            format!(
                "Resolution failed: Ambiguity detected - \"{}\" found in multiple products ({}). Enable context or rationalization to resolve.",
                ambiguous.label,
                products.join(", ")
            ),
        ))
    }

    /// Primary lineage product of every non-shared node labelled like `node`
    fn competing_products(&self, node: &FunctionalNode) -> Vec<String> {
        let mut products: Vec<String> = Vec::new();
        for id in self.labels.ids(&node.label) {
            if self.is_shared(id.as_str()) || !self.nodes.contains_key(id) {
                continue;
            }
            let product = lineage_products(id.as_str(), self.nodes, self.graph, &self.config)
                .into_iter()
                .next()
                .map_or_else(|| "UNKNOWN".to_string(), |p| p.to_uppercase());
            if !products.contains(&product) {
                products.push(product);
            }
        }
        products
    }

    fn is_action(&self, id: &NodeId) -> bool {
        self.nodes
            .get(id.as_str())
            .is_some_and(|n| n.level == HierarchyLevel::Action)
    }

    fn resolve_workflow(&self, node: &FunctionalNode, toggles: Toggles) -> Resolution {
        if !toggles.workflows {
            return Resolution::failed(node.id.clone(), FailureKind::WorkflowDisabled, WORKFLOW_FAILURE);
        }

        let downward = self.graph.descendants(node.id.as_str());
        let actions: Vec<NodeId> = downward.iter().filter(|id| self.is_action(id)).cloned().collect();

        let mut products: Vec<String> = Vec::new();
        for action in &actions {
            for product in lineage_products(action.as_str(), self.nodes, self.graph, &self.config) {
                if !products.iter().any(|p| p.eq_ignore_ascii_case(&product)) {
                    products.push(product);
                }
            }
        }

        let product_activation: Vec<ProductActivation> = products
            .iter()
            .map(|product| ProductActivation {
                product: product.clone(),
                priority: Priority::Primary,
                actions: actions
                    .iter()
                    .filter(|id| self.nodes.get(id.as_str()).is_some_and(|n| n.has_product(product)))
                    .cloned()
                    .collect(),
            })
            .collect();

        let mut reasoning = vec![
            "Cross-product workflow orchestration enabled".to_string(),
            format!("Coordinating across {} products: {}", products.len(), products.join(", ")),
            format!("{} actions orchestrated in workflow", actions.len()),
        ];

        let resolved = !actions.is_empty();
        if !resolved {
            reasoning.push(format!("Resolution failed: Workflow \"{}\" reaches no actions", node.label));
        }

        Resolution {
            entry_node: node.id.clone(),
            traversal_path: TraversalPath {
                upward: Vec::new(),
                downward,
            },
            selected_actions: actions,
            product_activation,
            confidence_score: u8::from(resolved),
            reasoning,
            failure: (!resolved).then_some(FailureKind::EmptyTraversal),
        }
    }

    fn traverse(&self, node: &FunctionalNode, inputs: Inputs<'_>, context_note: Option<String>) -> Resolution {
        let id = node.id.as_str();
        let mut path = TraversalPath::default();
        let mut reasoning: Vec<String> = context_note.into_iter().collect();

        let selected: Vec<NodeId> = match node.level {
            HierarchyLevel::Outcome | HierarchyLevel::Workflow => {
                path.downward = self.graph.descendants(id);
                reasoning.push(format!("Starting from {}: \"{}\"", node.level, node.label));
                reasoning.push(format!("Traversed downward through {} nodes", path.downward.len()));
                path.downward.iter().filter(|d| self.is_action(d)).cloned().collect()
            }
            HierarchyLevel::Scenario | HierarchyLevel::Step => {
                path.upward = self.graph.ancestors(id);
                path.downward = self.graph.descendants(id);
                reasoning.push(format!("Starting from {}: \"{}\"", node.level, node.label));
                reasoning.push(format!("Traversed upward through {} nodes to outcome", path.upward.len()));
                reasoning.push(format!("Traversed downward through {} nodes to actions", path.downward.len()));
                path.downward.iter().filter(|d| self.is_action(d)).cloned().collect()
            }
            HierarchyLevel::Action => {
                path.upward = self.graph.ancestors(id);
                reasoning.push(format!("Starting from action: \"{}\"", node.label));
                reasoning.push(format!("Traversed upward through {} nodes to outcome", path.upward.len()));
                vec![node.id.clone()]
            }
            HierarchyLevel::Product => {
                reasoning.push(format!(
                    "Product-level entry \"{}\" is not a resolvable intent; no traversal performed",
                    node.label
                ));
                Vec::new()
            }
        };

        let mut buckets: IndexMap<String, Vec<NodeId>> = IndexMap::new();
        for action in &selected {
            let Some(action_node) = self.nodes.get(action.as_str()) else { continue };
            for product in action_node.products.iter().filter(|p| self.config.counts_product(p)) {
                buckets.entry(product.clone()).or_default().push(action.clone());
            }
        }
        let product_activation: Vec<ProductActivation> = buckets
            .into_iter()
            .map(|(product, actions)| ProductActivation {
                product,
                priority: Priority::Primary,
                actions,
            })
            .collect();

        reasoning.push(format!("Selected {} actions for execution", selected.len()));
        if !product_activation.is_empty() {
            let names: Vec<&str> = product_activation.iter().map(|p| p.product.as_str()).collect();
            reasoning.push(format!("Activating products: {}", names.join(", ")));
        }

        match inputs.context {
            None => reasoning.push("No user context available".to_string()),
            Some(_) if !inputs.recent.is_empty() => {
                let products = recent_products(inputs.recent, &self.config);
                reasoning.push(format!("Context: Recent activity in {}", products.join(", ")));
            }
            Some(_) => reasoning.push("User context available without recent activity".to_string()),
        }

        let resolved = !selected.is_empty();
        if !resolved {
            reasoning.push(format!("Resolution failed: No actions reachable from \"{}\"", node.label));
        }

        Resolution {
            entry_node: node.id.clone(),
            traversal_path: path,
            selected_actions: selected,
            product_activation,
            confidence_score: u8::from(resolved),
            reasoning,
            failure: (!resolved).then_some(FailureKind::EmptyTraversal),
        }
    }
}

/// Resolve `entry` over explicit inputs
///
/// Free-function form of [`ResolutionEngine::resolve`] for callers that
/// hold the node map, alternatives and graph separately.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn resolve<G: GraphQuery + ?Sized>(
    entry: &str,
    context: Option<&UserContext>,
    rationalize_on: bool,
    workflows_on: bool,
    recent_actions: &[RecentAction],
    nodes: &NodeMap,
    alternatives: &RationalizedAlternatives,
    graph: &G,
) -> Resolution {
    ResolutionEngine::new(nodes, alternatives, graph).resolve(
        entry,
        context,
        Toggles {
            rationalize: rationalize_on,
            workflows: workflows_on,
        },
        recent_actions,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use intent_graph::{node_map, FunctionalGraph};
    use pretty_assertions::assert_eq;

    struct Fixture {
        nodes: NodeMap,
        alternatives: RationalizedAlternatives,
        graph: FunctionalGraph,
    }

    impl Fixture {
        fn new(nodes: NodeMap, alternatives: RationalizedAlternatives) -> Self {
            let graph = FunctionalGraph::from_nodes(nodes.clone());
            Self {
                nodes,
                alternatives,
                graph,
            }
        }

        fn resolve(&self, entry: &str, context: Option<&UserContext>, toggles: Toggles, recent: &[RecentAction]) -> Resolution {
            ResolutionEngine::new(&self.nodes, &self.alternatives, &self.graph).resolve(entry, context, toggles, recent)
        }
    }

    fn off() -> Toggles {
        Toggles::default()
    }

    fn simple() -> Fixture {
        Fixture::new(
            node_map([
                FunctionalNode::new("product-sap", HierarchyLevel::Product, "SAP").with_products(["sap"]),
                FunctionalNode::new("outcome-close", HierarchyLevel::Outcome, "Close Books")
                    .with_products(["sap"])
                    .with_children(["scenario-reconcile"]),
                FunctionalNode::new("scenario-reconcile", HierarchyLevel::Scenario, "Reconcile")
                    .with_products(["sap"])
                    .with_children(["step-match", "step-empty"]),
                FunctionalNode::new("step-match", HierarchyLevel::Step, "Match Entries")
                    .with_products(["sap"])
                    .with_children(["action-post"]),
                FunctionalNode::new("step-empty", HierarchyLevel::Step, "Nothing Here").with_products(["sap"]),
                FunctionalNode::new("action-post", HierarchyLevel::Action, "Post Entries")
                    .with_products(["sap", "n/a"]),
            ]),
            RationalizedAlternatives::new(),
        )
    }

    #[test]
    fn unknown_entry_fails() {
        let res = simple().resolve("nope", None, off(), &[]);
        assert_eq!(res.confidence_score, 0);
        assert_eq!(res.reasoning, vec![NOT_FOUND_FAILURE.to_string()]);
        assert_eq!(res.failure, Some(FailureKind::EntryNotFound));
    }

    #[test]
    fn outcome_traverses_down_only() {
        let res = simple().resolve("outcome-close", None, off(), &[]);
        assert_eq!(res.confidence_score, 1);
        assert!(res.traversal_path.upward.is_empty());
        assert_eq!(res.traversal_path.downward.len(), 4);
        assert_eq!(res.selected_actions, vec![NodeId::from("action-post")]);
        assert_eq!(res.products(), vec!["sap"]);
        assert_eq!(
            res.reasoning,
            vec![
                "Starting from outcome: \"Close Books\"".to_string(),
                "Traversed downward through 4 nodes".to_string(),
                "Selected 1 actions for execution".to_string(),
                "Activating products: sap".to_string(),
                "No user context available".to_string(),
            ]
        );
    }

    #[test]
    fn step_traverses_both_ways() {
        let res = simple().resolve("step-match", None, off(), &[]);
        assert_eq!(
            res.traversal_path.upward,
            vec![NodeId::from("scenario-reconcile"), NodeId::from("outcome-close")]
        );
        assert_eq!(res.traversal_path.downward, vec![NodeId::from("action-post")]);
        assert_eq!(res.confidence_score, 1);
    }

    #[test]
    fn action_resolves_to_itself() {
        let res = simple().resolve("action-post", None, off(), &[]);
        assert_eq!(res.selected_actions, vec![NodeId::from("action-post")]);
        assert!(res.traversal_path.downward.is_empty());
        assert_eq!(res.traversal_path.upward.len(), 3);
    }

    #[test]
    fn step_without_actions_has_zero_confidence() {
        let res = simple().resolve("step-empty", None, off(), &[]);
        assert_eq!(res.confidence_score, 0);
        assert_eq!(res.failure, Some(FailureKind::EmptyTraversal));
        assert!(res.reasoning.last().unwrap().starts_with("Resolution failed"));
    }

    #[test]
    fn product_entry_is_a_diagnostic_no_op() {
        let res = simple().resolve("product-sap", None, off(), &[]);
        assert_eq!(res.confidence_score, 0);
        assert!(res.reasoning[0].contains("Product-level entry"));
        assert_eq!(res.traversal_path, TraversalPath::default());
    }

    #[test]
    fn context_line_reflects_inputs() {
        let fx = simple();
        let ctx = UserContext::for_role("Controller");

        let res = fx.resolve("outcome-close", Some(&ctx), off(), &[]);
        assert_eq!(res.reasoning.last().unwrap(), "User context available without recent activity");

        let recent = [RecentAction::success("sap"), RecentAction::success("n/a")];
        let res = fx.resolve("outcome-close", Some(&ctx), off(), &recent);
        assert_eq!(res.reasoning.last().unwrap(), "Context: Recent activity in sap");
    }

    fn duplicated() -> Fixture {
        let nodes = node_map([
            FunctionalNode::new("outcome-sap", HierarchyLevel::Outcome, "Finance")
                .with_products(["sap"])
                .with_children(["scenario-x-sap"]),
            FunctionalNode::new("outcome-analytics", HierarchyLevel::Outcome, "Insight")
                .with_products(["analytics"])
                .with_children(["scenario-x-analytics"]),
            FunctionalNode::new("scenario-x-sap", HierarchyLevel::Scenario, "Monitor")
                .with_products(["sap"])
                .with_children(["action-sap"]),
            FunctionalNode::new("scenario-x-analytics", HierarchyLevel::Scenario, "Monitor")
                .with_products(["analytics"])
                .with_children(["action-analytics"]),
            FunctionalNode::new("scenario-x-shared", HierarchyLevel::Scenario, "Monitor")
                .with_products(["sap", "analytics"])
                .with_children(["action-sap", "action-analytics"]),
            FunctionalNode::new("action-sap", HierarchyLevel::Action, "Watch Ledger").with_products(["sap"]),
            FunctionalNode::new("action-analytics", HierarchyLevel::Action, "Watch Dashboards")
                .with_products(["analytics"]),
        ]);
        let mut alternatives = RationalizedAlternatives::new();
        alternatives.insert("scenario-x-shared", "sap", "scenario-x-sap");
        alternatives.insert("scenario-x-shared", "analytics", "scenario-x-analytics");
        Fixture::new(nodes, alternatives)
    }

    #[test]
    fn shared_node_fails_without_rationalization() {
        let res = duplicated().resolve("scenario-x-shared", None, off(), &[]);
        assert_eq!(res.confidence_score, 0);
        assert_eq!(res.reasoning, vec![OVERLAP_FAILURE.to_string()]);
        assert_eq!(res.failure, Some(FailureKind::OverlapUnresolved));
    }

    #[test]
    fn shared_node_resolves_with_rationalization() {
        let toggles = Toggles {
            rationalize: true,
            workflows: false,
        };
        let res = duplicated().resolve("scenario-x-shared", None, toggles, &[]);
        assert_eq!(res.confidence_score, 1);
        assert_eq!(res.products(), vec!["sap", "analytics"]);
    }

    #[test]
    fn context_redirects_shared_node() {
        let fx = duplicated();
        let ctx = UserContext::default();
        let recent = [RecentAction::success("analytics"), RecentAction::success("analytics")];

        let redirected = fx.resolve("scenario-x-shared", Some(&ctx), off(), &recent);
        let direct = fx.resolve("scenario-x-analytics", Some(&ctx), off(), &recent);

        assert_eq!(
            redirected.reasoning[0],
            "Context-based resolution: Selected ANALYTICS based on recent usage (2 recent actions)"
        );
        assert_eq!(redirected.reasoning[1..], direct.reasoning[..]);
        assert_eq!(redirected.selected_actions, direct.selected_actions);
        assert_eq!(redirected.entry_node, "scenario-x-analytics");
    }

    #[test]
    fn context_without_matching_product_still_fails() {
        let fx = duplicated();
        let ctx = UserContext::default();
        let recent = [RecentAction::success("crm"), RecentAction::failure("sap")];
        let res = fx.resolve("scenario-x-shared", Some(&ctx), off(), &recent);
        assert_eq!(res.failure, Some(FailureKind::OverlapUnresolved));
    }

    #[test]
    fn duplicate_without_context_is_ambiguous() {
        let res = duplicated().resolve("scenario-x-sap", None, off(), &[]);
        assert_eq!(res.failure, Some(FailureKind::AmbiguousDuplicate));
        assert_eq!(
            res.reasoning,
            vec![
                "Resolution failed: Ambiguity detected - \"Monitor\" found in multiple products (SAP, ANALYTICS). Enable context or rationalization to resolve."
                    .to_string()
            ]
        );
    }

    #[test]
    fn shared_label_index_gives_same_results() {
        let fx = duplicated();
        let labels = LabelIndex::from_nodes(&fx.nodes);
        let shared = ResolutionEngine::new(&fx.nodes, &fx.alternatives, &fx.graph).with_labels(&labels);
        let ctx = UserContext::default();
        let recent = [RecentAction::success("analytics")];

        for id in fx.nodes.keys() {
            assert_eq!(
                shared.resolve(id.as_str(), None, off(), &[]),
                fx.resolve(id.as_str(), None, off(), &[])
            );
            assert_eq!(
                shared.resolve(id.as_str(), Some(&ctx), off(), &recent),
                fx.resolve(id.as_str(), Some(&ctx), off(), &recent)
            );
        }
    }

    #[test]
    fn descendant_of_duplicate_is_ambiguous() {
        let res = duplicated().resolve("action-sap", None, off(), &[]);
        assert_eq!(res.failure, Some(FailureKind::AmbiguousDuplicate));
        assert!(res.reasoning[0].contains("\"Monitor\""));
    }

    #[test]
    fn context_settles_duplicate_for_own_lineage() {
        let fx = duplicated();
        let ctx = UserContext::default();
        let recent = [
            RecentAction::success("sap"),
            RecentAction::success("sap"),
            RecentAction::success("analytics"),
        ];
        let res = fx.resolve("scenario-x-sap", Some(&ctx), off(), &recent);
        assert_eq!(res.confidence_score, 1);
        assert_eq!(
            res.reasoning[0],
            "Context-based resolution: Selected SAP path based on 67% usage in recent actions"
        );
        assert_eq!(res.selected_actions, vec![NodeId::from("action-sap")]);

        let other = [RecentAction::success("analytics")];
        let res = fx.resolve("scenario-x-sap", Some(&ctx), off(), &other);
        assert_eq!(res.failure, Some(FailureKind::AmbiguousDuplicate));
    }

    #[test]
    fn redirect_depth_is_bounded() {
        let mut nodes = duplicated().nodes;
        nodes.insert(
            NodeId::from("loop-shared"),
            FunctionalNode::new("loop-shared", HierarchyLevel::Scenario, "Loop"),
        );
        let mut alternatives = RationalizedAlternatives::new();
        alternatives.insert("loop-shared", "sap", "loop-shared");
        let fx = Fixture::new(nodes, alternatives);

        let ctx = UserContext::default();
        let res = fx.resolve("loop-shared", Some(&ctx), off(), &[RecentAction::success("sap")]);
        assert_eq!(res.failure, Some(FailureKind::OverlapUnresolved));
        assert_eq!(res.reasoning.len(), 1 + EngineConfig::default().max_redirect_depth);
    }

    #[test]
    fn workflow_gating() {
        let nodes = node_map([
            FunctionalNode::new("close-workflow", HierarchyLevel::Workflow, "Close")
                .with_children(["step-a", "step-b"]),
            FunctionalNode::new("step-a", HierarchyLevel::Step, "A").with_products(["sap"]).with_children(["action-a"]),
            FunctionalNode::new("step-b", HierarchyLevel::Step, "B")
                .with_products(["analytics"])
                .with_children(["action-b"]),
            FunctionalNode::new("action-a", HierarchyLevel::Action, "Do A"),
            FunctionalNode::new("action-b", HierarchyLevel::Action, "Do B").with_products(["analytics"]),
        ]);
        let fx = Fixture::new(nodes, RationalizedAlternatives::new());

        let res = fx.resolve("close-workflow", None, off(), &[]);
        assert_eq!(res.failure, Some(FailureKind::WorkflowDisabled));
        assert!(res.reasoning[0].contains("Enable workflows"));

        let on = Toggles {
            rationalize: false,
            workflows: true,
        };
        let res = fx.resolve("close-workflow", None, on, &[]);
        assert_eq!(res.confidence_score, 1);
        assert_eq!(res.products(), vec!["sap", "analytics"]);
        assert!(res.product_activation.iter().all(|p| p.priority == Priority::Primary));
        // action-a carries no product of its own
        assert!(res.product_activation[0].actions.is_empty());
        assert_eq!(res.product_activation[1].actions, vec![NodeId::from("action-b")]);
        assert_eq!(res.reasoning[1], "Coordinating across 2 products: sap, analytics");
    }

    #[test]
    fn free_function_matches_engine() {
        let fx = duplicated();
        let ctx = UserContext::default();
        let recent = [RecentAction::success("sap")];
        let a = resolve(
            "scenario-x-shared",
            Some(&ctx),
            false,
            false,
            &recent,
            &fx.nodes,
            &fx.alternatives,
            &fx.graph,
        );
        let b = fx.resolve("scenario-x-shared", Some(&ctx), off(), &recent);
        assert_eq!(a, b);
    }
}

//! Testing utilities for the intent workspace
//!
//! A small two-product domain with one cross-product duplicate, a workflow
//! and a multi-product outcome, plus a proptest strategy for random
//! hierarchies.

#![allow(missing_docs)]

use intent_graph::{node_map, FunctionalGraph, FunctionalNode, HierarchyLevel, NodeId, NodeMap};
use intent_rationalization::{preprocess, DuplicateIndex, RationalizedAlternatives};
use proptest::collection::vec;
use proptest::prelude::*;

pub const SAP: &str = "sap";
pub const ANALYTICS: &str = "analytics";

pub const DUPLICATE_SAP: &str = "scenario-x-sap";
pub const DUPLICATE_ANALYTICS: &str = "scenario-x-analytics";
pub const SHARED_SCENARIO: &str = "scenario-monitor-kpis-shared";
pub const DUPLICATE_LABEL: &str = "Monitor KPIs";

pub const PLANNING_OUTCOME: &str = "outcome-planning";
pub const PLANNING_ACTIONS: [&str; 4] = [
    "action-pull-actuals",
    "action-post-accruals",
    "action-build-model",
    "action-publish-forecast",
];

pub const WORKFLOW: &str = "month-end-workflow";
pub const WORKFLOW_ACTIONS: [&str; 2] = ["action-lock-period", "action-publish-report"];

/// Nodes of the two-product domain, as authored, with parent lists filled in
#[must_use]
pub fn two_product_nodes() -> Vec<FunctionalNode> {
    use HierarchyLevel::{Action, Outcome, Product, Scenario, Step, Workflow};

    link_parents(vec![
        FunctionalNode::new("product-sap", Product, "SAP")
            .with_products([SAP])
            .with_children(["outcome-finance", PLANNING_OUTCOME]),
        FunctionalNode::new("product-analytics", Product, "Analytics")
            .with_products([ANALYTICS])
            .with_children(["outcome-insight", PLANNING_OUTCOME]),
        // duplicated scenario under two outcomes
        FunctionalNode::new("outcome-finance", Outcome, "Financial Close")
            .with_products([SAP])
            .with_children([DUPLICATE_SAP]),
        FunctionalNode::new("outcome-insight", Outcome, "Operational Insight")
            .with_products([ANALYTICS])
            .with_children([DUPLICATE_ANALYTICS]),
        FunctionalNode::new(DUPLICATE_SAP, Scenario, DUPLICATE_LABEL)
            .with_products([SAP])
            .with_children(["step-ledger-sap"]),
        FunctionalNode::new(DUPLICATE_ANALYTICS, Scenario, DUPLICATE_LABEL)
            .with_products([ANALYTICS])
            .with_children(["step-dash-analytics"]),
        FunctionalNode::new("step-ledger-sap", Step, "Review Ledger")
            .with_products([SAP])
            .with_children(["action-export-ledger"]),
        FunctionalNode::new("step-dash-analytics", Step, "Review Dashboards")
            .with_products([ANALYTICS])
            .with_children(["action-refresh-dashboard"]),
        FunctionalNode::new("action-export-ledger", Action, "Export Ledger").with_products([SAP]),
        FunctionalNode::new("action-refresh-dashboard", Action, "Refresh Dashboard").with_products([ANALYTICS]),
        // one outcome spanning both products
        FunctionalNode::new(PLANNING_OUTCOME, Outcome, "Integrated Planning")
            .with_products([SAP, ANALYTICS])
            .with_children(["scenario-forecast"]),
        FunctionalNode::new("scenario-forecast", Scenario, "Forecast Demand")
            .with_products([SAP, ANALYTICS])
            .with_children(["step-collect", "step-model"]),
        FunctionalNode::new("step-collect", Step, "Collect Actuals")
            .with_products([SAP])
            .with_children([PLANNING_ACTIONS[0], PLANNING_ACTIONS[1]]),
        FunctionalNode::new("step-model", Step, "Model Scenarios")
            .with_products([ANALYTICS])
            .with_children([PLANNING_ACTIONS[2], PLANNING_ACTIONS[3]]),
        FunctionalNode::new(PLANNING_ACTIONS[0], Action, "Pull Actuals").with_products([SAP, "n/a"]),
        FunctionalNode::new(PLANNING_ACTIONS[1], Action, "Post Accruals").with_products([SAP]),
        FunctionalNode::new(PLANNING_ACTIONS[2], Action, "Build Model").with_products([ANALYTICS]),
        FunctionalNode::new(PLANNING_ACTIONS[3], Action, "Publish Forecast").with_products([ANALYTICS]),
        // cross-product workflow
        FunctionalNode::new(WORKFLOW, Workflow, "Month End Close").with_children(["step-close-sap", "step-report-analytics"]),
        FunctionalNode::new("step-close-sap", Step, "Close Period")
            .with_products([SAP])
            .with_children([WORKFLOW_ACTIONS[0]]),
        FunctionalNode::new("step-report-analytics", Step, "Publish Close Report")
            .with_products([ANALYTICS])
            .with_children([WORKFLOW_ACTIONS[1]]),
        FunctionalNode::new(WORKFLOW_ACTIONS[0], Action, "Lock Period").with_products([SAP]),
        FunctionalNode::new(WORKFLOW_ACTIONS[1], Action, "Publish Report").with_products([ANALYTICS]),
    ])
}

/// Mirror every children list into the children's parent lists
#[must_use]
pub fn link_parents(mut nodes: Vec<FunctionalNode>) -> Vec<FunctionalNode> {
    let edges: Vec<(NodeId, NodeId)> = nodes
        .iter()
        .flat_map(|n| n.children.iter().map(move |c| (n.id.clone(), c.clone())))
        .collect();
    for (parent, child) in edges {
        if let Some(node) = nodes.iter_mut().find(|n| n.id == child) {
            if !node.parents.contains(&parent) {
                node.parents.push(parent);
            }
        }
    }
    nodes
}

/// Preprocessed domain with its derived structures
#[derive(Debug, Clone)]
pub struct Fixture {
    pub nodes: NodeMap,
    pub alternatives: RationalizedAlternatives,
    pub duplicates: DuplicateIndex,
    pub graph: FunctionalGraph,
}

impl Fixture {
    /// Preprocess `nodes` and derive alternatives, index and graph
    #[must_use]
    pub fn from_nodes(nodes: Vec<FunctionalNode>) -> Self {
        let output = preprocess(&node_map(nodes));
        let duplicates = DuplicateIndex::from_alternatives(&output.alternatives);
        let graph = FunctionalGraph::from_nodes(output.nodes.clone());
        Self {
            nodes: output.nodes,
            alternatives: output.alternatives,
            duplicates,
            graph,
        }
    }
}

/// The two-product domain, preprocessed
#[must_use]
pub fn two_product_fixture() -> Fixture {
    Fixture::from_nodes(two_product_nodes())
}

const LABELS: [&str; 4] = ["Monitor", "Reconcile", "Forecast", "Audit"];
const PRODUCTS: [&str; 3] = ["sap", "analytics", "crm"];

/// Scenario shape: label index, product index, actions per step
type ScenarioShape = (usize, usize, Vec<usize>);

/// Random layered hierarchies with repeated scenario labels across products
pub fn arb_domain() -> impl Strategy<Value = Vec<FunctionalNode>> {
    let scenario = (0..LABELS.len(), 0..PRODUCTS.len(), vec(0..3usize, 0..3));
    vec(vec(scenario, 1..4), 1..4).prop_map(|outcomes| link_parents(build_domain(&outcomes)))
}

fn build_domain(outcomes: &[Vec<ScenarioShape>]) -> Vec<FunctionalNode> {
    let mut nodes = Vec::new();

    for (o, scenarios) in outcomes.iter().enumerate() {
        let mut outcome = FunctionalNode::new(format!("outcome-{o}"), HierarchyLevel::Outcome, format!("Outcome {o}"));

        for (s, (label, product, steps)) in scenarios.iter().enumerate() {
            let product = PRODUCTS[*product];
            let scenario_id = format!("scenario-{o}-{s}");
            let mut scenario =
                FunctionalNode::new(scenario_id.as_str(), HierarchyLevel::Scenario, LABELS[*label]).with_products([product]);

            for (k, actions) in steps.iter().enumerate() {
                let step_id = format!("step-{o}-{s}-{k}");
                let mut step = FunctionalNode::new(step_id.as_str(), HierarchyLevel::Step, format!("Step {o}.{s}.{k}"))
                    .with_products([product]);
                for a in 0..*actions {
                    let action_id = format!("action-{o}-{s}-{k}-{a}");
                    step.children.push(action_id.as_str().into());
                    nodes.push(
                        FunctionalNode::new(action_id, HierarchyLevel::Action, format!("Action {o}.{s}.{k}.{a}"))
                            .with_products([product]),
                    );
                }
                scenario.children.push(step_id.as_str().into());
                nodes.push(step);
            }

            outcome.children.push(scenario_id.as_str().into());
            if !outcome.has_product(product) {
                outcome.products.push(product.to_string());
            }
            nodes.push(scenario);
        }
        nodes.push(outcome);
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_has_one_shared_scenario() {
        let fixture = two_product_fixture();
        assert_eq!(fixture.alternatives.len(), 1);
        assert!(fixture.nodes.contains_key(SHARED_SCENARIO));
        assert!(fixture.duplicates.is_duplicate(DUPLICATE_SAP));
        assert!(fixture.duplicates.is_duplicate(DUPLICATE_ANALYTICS));
    }
}

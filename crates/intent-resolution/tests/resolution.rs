use intent_graph::{HierarchyLevel, NodeId};
use intent_rationalization::RationalizationProcessor;
use intent_resolution::{FailureKind, Priority, RecentAction, Resolution, ResolutionEngine, Toggles, UserContext};
use intent_test_utils::*;
use pretty_assertions::assert_eq;

const OFF: Toggles = Toggles {
    rationalize: false,
    workflows: false,
};
const RATIONALIZED: Toggles = Toggles {
    rationalize: true,
    workflows: false,
};
const WORKFLOWS: Toggles = Toggles {
    rationalize: false,
    workflows: true,
};

fn resolve(fixture: &Fixture, entry: &str, context: Option<&UserContext>, toggles: Toggles, recent: &[RecentAction]) -> Resolution {
    if toggles.rationalize {
        let graph = RationalizationProcessor::rationalized_graph(&fixture.nodes, &fixture.alternatives);
        ResolutionEngine::with_index(graph.nodes(), &fixture.alternatives, &fixture.duplicates, &graph)
            .resolve(entry, context, toggles, recent)
    } else {
        ResolutionEngine::with_index(&fixture.nodes, &fixture.alternatives, &fixture.duplicates, &fixture.graph)
            .resolve(entry, context, toggles, recent)
    }
}

fn ids(raw: &[&str]) -> Vec<NodeId> {
    raw.iter().map(|s| NodeId::from(*s)).collect()
}

#[test]
fn unknown_entry_is_reported_not_raised() {
    let fixture = two_product_fixture();
    let res = resolve(&fixture, "does-not-exist", None, OFF, &[]);
    assert_eq!(res.confidence_score, 0);
    assert_eq!(res.failure, Some(FailureKind::EntryNotFound));
    assert_eq!(res.reasoning, vec!["Resolution failed: Entry node not found".to_string()]);
}

#[test]
fn shared_node_is_gated_by_rationalization() {
    let fixture = two_product_fixture();

    let off = resolve(&fixture, SHARED_SCENARIO, None, OFF, &[]);
    assert_eq!(off.confidence_score, 0);
    assert_eq!(off.failure, Some(FailureKind::OverlapUnresolved));
    assert!(off.reasoning[0].contains("Enable rationalization"));

    let on = resolve(&fixture, SHARED_SCENARIO, None, RATIONALIZED, &[]);
    assert_eq!(on.confidence_score, 1);
    assert_eq!(on.products(), vec![SAP, ANALYTICS]);
    assert_eq!(on.selected_actions, ids(&["action-export-ledger", "action-refresh-dashboard"]));
}

#[test]
fn recent_usage_redirects_shared_node() {
    let fixture = two_product_fixture();
    let ctx = UserContext::for_role("Controller");
    let recent = [
        RecentAction::success(SAP),
        RecentAction::success(ANALYTICS),
        RecentAction::success(SAP),
    ];

    let redirected = resolve(&fixture, SHARED_SCENARIO, Some(&ctx), OFF, &recent);
    let direct = resolve(&fixture, DUPLICATE_SAP, Some(&ctx), OFF, &recent);

    assert_eq!(
        redirected.reasoning[0],
        "Context-based resolution: Selected SAP based on recent usage (2 recent actions)"
    );
    assert_eq!(redirected.reasoning[1..], direct.reasoning[..]);
    assert_eq!(redirected.entry_node, DUPLICATE_SAP);
    assert_eq!(redirected.selected_actions, ids(&["action-export-ledger"]));
    assert_eq!(redirected.confidence_score, 1);
}

#[test]
fn failed_history_does_not_redirect() {
    let fixture = two_product_fixture();
    let ctx = UserContext::default();
    let recent = [RecentAction::failure(SAP), RecentAction::failure(ANALYTICS)];

    let res = resolve(&fixture, SHARED_SCENARIO, Some(&ctx), OFF, &recent);
    assert_eq!(res.failure, Some(FailureKind::OverlapUnresolved));
}

#[test]
fn duplicate_entry_is_ambiguous_without_context() {
    let fixture = two_product_fixture();
    let res = resolve(&fixture, DUPLICATE_SAP, None, OFF, &[]);
    assert_eq!(res.failure, Some(FailureKind::AmbiguousDuplicate));
    assert_eq!(
        res.reasoning,
        vec![format!(
            "Resolution failed: Ambiguity detected - \"{DUPLICATE_LABEL}\" found in multiple products (SAP, ANALYTICS). Enable context or rationalization to resolve."
        )]
    );

    let unified = resolve(&fixture, DUPLICATE_SAP, None, RATIONALIZED, &[]);
    assert_eq!(unified.confidence_score, 1);
}

#[test]
fn descendant_of_duplicate_inherits_ambiguity() {
    let fixture = two_product_fixture();
    let res = resolve(&fixture, "step-dash-analytics", None, OFF, &[]);
    assert_eq!(res.failure, Some(FailureKind::AmbiguousDuplicate));
    assert!(res.reasoning[0].contains(DUPLICATE_LABEL));
}

#[test]
fn context_settles_duplicate_in_favour_of_its_product() {
    let fixture = two_product_fixture();
    let ctx = UserContext::default();
    let recent = [RecentAction::success(ANALYTICS)];

    let res = resolve(&fixture, DUPLICATE_ANALYTICS, Some(&ctx), OFF, &recent);
    assert_eq!(res.confidence_score, 1);
    assert_eq!(
        res.reasoning[0],
        "Context-based resolution: Selected ANALYTICS path based on 100% usage in recent actions"
    );
    assert_eq!(res.reasoning.last().map(String::as_str), Some("Context: Recent activity in analytics"));

    let other = resolve(&fixture, DUPLICATE_SAP, Some(&ctx), OFF, &recent);
    assert_eq!(other.failure, Some(FailureKind::AmbiguousDuplicate));
}

#[test]
fn workflow_is_gated_by_toggle() {
    let fixture = two_product_fixture();

    let off = resolve(&fixture, WORKFLOW, None, OFF, &[]);
    assert_eq!(off.failure, Some(FailureKind::WorkflowDisabled));
    assert_eq!(
        off.reasoning,
        vec![
            "Resolution failed: Workflow orchestration is disabled. Enable workflows to access cross-product coordination."
                .to_string()
        ]
    );

    let on = resolve(&fixture, WORKFLOW, None, WORKFLOWS, &[]);
    assert_eq!(on.confidence_score, 1);
    assert_eq!(on.selected_actions, ids(&WORKFLOW_ACTIONS));
    assert_eq!(on.products(), vec![SAP, ANALYTICS]);
    assert_eq!(
        on.reasoning,
        vec![
            "Cross-product workflow orchestration enabled".to_string(),
            "Coordinating across 2 products: sap, analytics".to_string(),
            "2 actions orchestrated in workflow".to_string(),
        ]
    );
    assert!(on.traversal_path.upward.is_empty());
}

#[test]
fn action_resolves_to_itself() {
    let fixture = two_product_fixture();
    let res = resolve(&fixture, PLANNING_ACTIONS[1], None, OFF, &[]);

    assert_eq!(res.confidence_score, 1);
    assert_eq!(res.selected_actions, ids(&[PLANNING_ACTIONS[1]]));
    assert_eq!(
        res.traversal_path.upward,
        ids(&["step-collect", "scenario-forecast", PLANNING_OUTCOME, "product-sap", "product-analytics"])
    );
    assert!(res.traversal_path.downward.is_empty());
    assert_eq!(res.products(), vec![SAP]);
}

#[test]
fn outcome_activates_every_product_of_its_actions() {
    let fixture = two_product_fixture();
    let res = resolve(&fixture, PLANNING_OUTCOME, None, OFF, &[]);

    assert_eq!(res.confidence_score, 1);
    assert_eq!(res.selected_actions, ids(&PLANNING_ACTIONS));
    assert_eq!(res.traversal_path.downward.len(), 7);
    assert_eq!(res.product_activation.len(), 2);

    let sap = &res.product_activation[0];
    assert_eq!(sap.product, SAP);
    assert_eq!(sap.priority, Priority::Primary);
    assert_eq!(sap.actions, ids(&PLANNING_ACTIONS[..2]));

    let analytics = &res.product_activation[1];
    assert_eq!(analytics.product, ANALYTICS);
    assert_eq!(analytics.actions, ids(&PLANNING_ACTIONS[2..]));

    assert_eq!(
        res.reasoning,
        vec![
            "Starting from outcome: \"Integrated Planning\"".to_string(),
            "Traversed downward through 7 nodes".to_string(),
            "Selected 4 actions for execution".to_string(),
            "Activating products: sap, analytics".to_string(),
            "No user context available".to_string(),
        ]
    );
}

#[test]
fn scenario_traverses_both_directions() {
    let fixture = two_product_fixture();
    let res = resolve(&fixture, "scenario-forecast", None, OFF, &[]);

    assert_eq!(res.traversal_path.upward, ids(&[PLANNING_OUTCOME, "product-sap", "product-analytics"]));
    assert_eq!(res.traversal_path.downward.len(), 6);
    assert!(res.reasoning.contains(&"Traversed upward through 3 nodes to outcome".to_string()));
    assert!(res.reasoning.contains(&"Traversed downward through 6 nodes to actions".to_string()));
}

#[test]
fn selected_actions_are_always_action_level() {
    let fixture = two_product_fixture();
    for id in fixture.nodes.keys() {
        for toggles in [OFF, RATIONALIZED, WORKFLOWS] {
            let res = resolve(&fixture, id.as_str(), None, toggles, &[]);
            for action in &res.selected_actions {
                assert_eq!(fixture.nodes[action.as_str()].level, HierarchyLevel::Action);
            }
        }
    }
}

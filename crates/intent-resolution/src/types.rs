//! Resolution inputs and outputs
//!
//! Everything here serializes in camelCase so resolutions can be handed to
//! a rendering layer as-is.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use intent_graph::NodeId;
use serde::{Deserialize, Serialize};

/// Activation priority of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Primary product for the intent
    Primary,
    /// Supporting product
    Secondary,
}

/// Actions one product contributes to a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductActivation {
    /// Product code as authored
    pub product: String,
    /// Priority
    pub priority: Priority,
    /// Action ids attributed to the product
    pub actions: Vec<NodeId>,
}

/// Ancestor chain and descendant set visited during resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalPath {
    /// Ancestors of the entry node, nearest first
    pub upward: Vec<NodeId>,
    /// Descendants of the entry node, breadth first
    pub downward: Vec<NodeId>,
}

/// Why a resolution failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Entry id is not in the node map
    EntryNotFound,
    /// Shared node with rationalization off and no usable context
    OverlapUnresolved,
    /// Duplicate label or duplicate ancestor not settled by context
    AmbiguousDuplicate,
    /// Workflow entry with workflows off
    WorkflowDisabled,
    /// Valid entry that reaches no actions
    EmptyTraversal,
}

/// Result of resolving one entry node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Node the resolution was computed for
    pub entry_node: NodeId,
    /// Traversal performed
    pub traversal_path: TraversalPath,
    /// Selected action ids
    pub selected_actions: Vec<NodeId>,
    /// Per-product activation
    pub product_activation: Vec<ProductActivation>,
    /// `1` when resolved, `0` otherwise
    pub confidence_score: u8,
    /// Human-readable explanation, in order
    pub reasoning: Vec<String>,
    /// Failure classification when `confidence_score` is 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl Resolution {
    /// Failed resolution with a single reasoning line
    #[must_use]
    pub fn failed(entry: impl Into<NodeId>, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            entry_node: entry.into(),
            traversal_path: TraversalPath::default(),
            selected_actions: Vec::new(),
            product_activation: Vec::new(),
            confidence_score: 0,
            reasoning: vec![reason.into()],
            failure: Some(kind),
        }
    }

    /// Confidence is non-zero
    #[inline]
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.confidence_score > 0
    }

    /// Activated product codes, in activation order
    #[must_use]
    pub fn products(&self) -> Vec<&str> {
        self.product_activation.iter().map(|p| p.product.as_str()).collect()
    }
}

/// A past resolution attempt by the user
///
/// Only `product` and `success` influence resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAction {
    /// Product code the action ran in
    pub product: String,
    /// Whether the action resolved
    #[serde(default = "default_true")]
    pub success: bool,
    /// When it happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Free-text intent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Node the intent matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_node: Option<NodeId>,
}

fn default_true() -> bool {
    true
}

impl RecentAction {
    /// Successful action in `product`
    #[must_use]
    pub fn success(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            success: true,
            timestamp: None,
            intent: None,
            matched_node: None,
        }
    }

    /// Failed action in `product`
    #[must_use]
    pub fn failure(product: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::success(product)
        }
    }

    /// With intent text
    #[must_use]
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// With matched node
    #[must_use]
    pub fn with_matched_node(mut self, node: impl Into<NodeId>) -> Self {
        self.matched_node = Some(node.into());
        self
    }

    /// With timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Who the user is
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    /// Role
    pub role: String,
    /// Department
    pub department: String,
    /// Seniority
    pub seniority: String,
}

/// A past interaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryEntry {
    /// When
    pub timestamp: Option<DateTime<Utc>>,
    /// What was done
    pub action: String,
    /// Product used
    pub product: String,
    /// Node involved
    pub node: Option<NodeId>,
}

/// Observed usage patterns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsagePatterns {
    /// Current workflow stage
    pub workflow_stage: String,
    /// Product to usage weight
    pub product_preferences: IndexMap<String, f64>,
    /// Focus areas
    pub domain_focus: Vec<String>,
}

/// Persona and history of the user issuing the intent
///
/// Presence of a context enables history-based disambiguation; its fields
/// are carried for callers and not read by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserContext {
    /// Profile
    pub profile: UserProfile,
    /// Interaction history
    pub history: Vec<HistoryEntry>,
    /// Usage patterns
    pub patterns: UsagePatterns,
}

impl UserContext {
    /// Context with only a role
    #[must_use]
    pub fn for_role(role: impl Into<String>) -> Self {
        Self {
            profile: UserProfile {
                role: role.into(),
                ..UserProfile::default()
            },
            ..Self::default()
        }
    }
}

/// Mode switches owned by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Toggles {
    /// Unify duplicates
    pub rationalize: bool,
    /// Cross-product workflows
    pub workflows: bool,
}

/// Everything besides the entry node that a resolution depends on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolutionRequest {
    /// Optional user context
    pub context: Option<UserContext>,
    /// Toggles
    #[serde(flatten)]
    pub toggles: Toggles,
    /// Recent actions, oldest first
    pub recent_actions: Vec<RecentAction>,
}

impl ResolutionRequest {
    /// Request with no context and both toggles off
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With context
    #[must_use]
    pub fn with_context(mut self, context: UserContext) -> Self {
        self.context = Some(context);
        self
    }

    /// With rationalization toggle
    #[must_use]
    pub fn rationalized(mut self, on: bool) -> Self {
        self.toggles.rationalize = on;
        self
    }

    /// With workflow toggle
    #[must_use]
    pub fn workflows(mut self, on: bool) -> Self {
        self.toggles.workflows = on;
        self
    }

    /// With recent actions
    #[must_use]
    pub fn with_recent_actions(mut self, actions: impl IntoIterator<Item = RecentAction>) -> Self {
        self.recent_actions = actions.into_iter().collect();
        self
    }
}

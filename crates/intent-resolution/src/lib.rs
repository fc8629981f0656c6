//! Intent Resolution
//!
//! Context-aware resolution of entry nodes into actions and products.
//!
//! # Overview
//!
//! - **ResolutionEngine**: the decision procedure; failures are data
//! - **DomainCatalog**: loads, prepares and memoizes domains
//! - **TokenMatcher**: proposes entry nodes for free text
//! - **SuiteRunner**: declarative resolution test cases
//!
//! # Example
//!
//! ```rust
//! use intent_graph::{FunctionalNode, HierarchyLevel, NodeId};
//! use intent_resolution::{DomainCatalog, DomainData, RecentAction, ResolutionRequest, StaticDomainSource, UserContext};
//!
//! let data = DomainData {
//!     id: "ops".to_string(),
//!     nodes: vec![
//!         FunctionalNode::new("outcome-sap", HierarchyLevel::Outcome, "Run").with_products(["sap"]).with_children(["scenario-x-sap"]),
//!         FunctionalNode::new("outcome-crm", HierarchyLevel::Outcome, "Sell").with_products(["crm"]).with_children(["scenario-x-crm"]),
//!         FunctionalNode::new("scenario-x-sap", HierarchyLevel::Scenario, "Monitor").with_products(["sap"]).with_children(["action-sap"]),
//!         FunctionalNode::new("scenario-x-crm", HierarchyLevel::Scenario, "Monitor").with_products(["crm"]).with_children(["action-crm"]),
//!         FunctionalNode::new("action-sap", HierarchyLevel::Action, "Check Ledger").with_products(["sap"]),
//!         FunctionalNode::new("action-crm", HierarchyLevel::Action, "Check Pipeline").with_products(["crm"]),
//!     ],
//!     ..DomainData::default()
//! };
//! let catalog = DomainCatalog::new(StaticDomainSource::with_domains([data]));
//! let domain = catalog.get("ops").unwrap();
//!
//! let overlap = domain.resolve("scenario-monitor-shared", &ResolutionRequest::new());
//! assert_eq!(overlap.confidence_score, 0);
//!
//! let request = ResolutionRequest::new()
//!     .with_context(UserContext::default())
//!     .with_recent_actions([RecentAction::success("crm")]);
//! let resolved = domain.resolve("scenario-monitor-shared", &request);
//! assert_eq!(resolved.selected_actions, vec![NodeId::from("action-crm")]);
//! ```

#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod suite;
pub mod types;

// Re-exports
pub use catalog::{load_domain_file, DomainCatalog, DomainData, DomainSource, JsonDomainSource, PreparedDomain, StaticDomainSource};
pub use config::EngineConfig;
pub use context::{lineage_products, recent_products, ProductWeights};
pub use engine::{resolve, ResolutionEngine};
pub use error::ResolutionError;
pub use matcher::{GeneratedQuery, MatchConfidence, MatchResult, MatcherConfig, NodeMatcher, TokenMatcher};
pub use suite::{load_cases, ActualOutcome, CaseReport, Expectation, SuiteReport, SuiteRunner, TestCase, TestContext};
pub use types::{
    FailureKind, HistoryEntry, Priority, ProductActivation, RecentAction, Resolution, ResolutionRequest, Toggles,
    TraversalPath, UsagePatterns, UserContext, UserProfile,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

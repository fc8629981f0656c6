//! Intent Rationalization
//!
//! Duplicate detection and unification across products.
//!
//! # Overview
//!
//! - **SharedNodeGenerator**: groups same-label, product-disjoint nodes and
//!   synthesizes a shared node per group
//! - **RationalizedAlternatives**: shared node → product → duplicate node
//! - **DuplicateIndex**: the duplicate relation, computed once per domain
//! - **RationalizationProcessor**: the unified-mode graph view
//! - **SimilarityDetector**: fuzzy label matching for auditing alternatives
//!
//! # Example
//!
//! ```rust
//! use intent_graph::{node_map, FunctionalNode, HierarchyLevel};
//! use intent_rationalization::preprocess;
//!
//! let nodes = node_map([
//!     FunctionalNode::new("scenario-x-sap", HierarchyLevel::Scenario, "Monitor").with_products(["sap"]),
//!     FunctionalNode::new("scenario-x-crm", HierarchyLevel::Scenario, "Monitor").with_products(["crm"]),
//! ]);
//! let output = preprocess(&nodes);
//!
//! assert!(output.nodes.contains_key("scenario-monitor-shared"));
//! assert_eq!(output.alternatives.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod alternatives;
pub mod preprocess;
pub mod processor;
pub mod similarity;

// Re-exports
pub use alternatives::{
    duplicate_status, DuplicateIndex, DuplicateStatus, LabelIndex, ProductAlternatives, RationalizedAlternatives,
};
pub use preprocess::{preprocess, shared_node_id, DuplicateGroup, PreprocessOutput, SharedNodeGenerator};
pub use processor::{RationalizationOutcome, RationalizationProcessor};
pub use similarity::{
    label_similarity, levenshtein, ConfigComparison, SimilarMember, SimilarityConfig, SimilarityDetector,
    SimilarityGroup,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

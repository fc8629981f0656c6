//! Intent Graph
//!
//! Typed store for the functional hierarchy of a product domain.
//!
//! # Overview
//!
//! The graph crate provides:
//! - **FunctionalNode**: Authored node record with level, label, edges and products
//! - **FunctionalGraph**: Indexed DAG with upward/downward reachability
//! - **IntegrityValidator**: Structural checks over authored node maps
//!
//! # Example
//!
//! ```rust
//! use intent_graph::{node_map, FunctionalGraph, FunctionalNode, GraphQuery, HierarchyLevel};
//!
//! let nodes = node_map([
//!     FunctionalNode::new("outcome-a", HierarchyLevel::Outcome, "Grow").with_children(["step-a"]),
//!     FunctionalNode::new("step-a", HierarchyLevel::Step, "Plan").with_children(["action-a"]),
//!     FunctionalNode::new("action-a", HierarchyLevel::Action, "Export"),
//! ]);
//! let graph = FunctionalGraph::from_nodes(nodes);
//!
//! assert_eq!(graph.ancestors("action-a").len(), 2);
//! assert_eq!(graph.descendants("outcome-a").len(), 2);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod level;
pub mod node;
pub mod validation;

// Re-exports
pub use error::GraphError;
pub use graph::{reachable, Direction, FunctionalGraph, GraphQuery};
pub use level::HierarchyLevel;
pub use node::{node_map, FunctionalNode, NodeId, NodeMap};
pub use validation::{IntegrityIssue, IntegrityValidator, IssueKind, Severity, ValidationReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for graph operations
    pub use crate::{
        node_map, Direction, FunctionalGraph, FunctionalNode, GraphError, GraphQuery,
        HierarchyLevel, IntegrityValidator, NodeId, NodeMap,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Hierarchy levels
//!
//! Provides [`HierarchyLevel`], the ordered level enum of the functional
//! hierarchy (Product → Workflow → Outcome → Scenario → Step → Action).

use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level of a node in the functional hierarchy
///
/// Ordered from the top of the hierarchy to the leaves. Products and
/// workflows are roots; actions are leaves in the canonical graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyLevel {
    /// A product (root)
    Product,
    /// Cross-product orchestration (root)
    Workflow,
    /// Business outcome
    Outcome,
    /// Scenario contributing to an outcome
    Scenario,
    /// Step inside a scenario
    Step,
    /// Concrete action (leaf)
    Action,
}

impl HierarchyLevel {
    /// All levels in hierarchy order
    pub const ALL: [HierarchyLevel; 6] = [
        Self::Product,
        Self::Workflow,
        Self::Outcome,
        Self::Scenario,
        Self::Step,
        Self::Action,
    ];

    /// Lowercase name, as used in node ids and serialized data
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Workflow => "workflow",
            Self::Outcome => "outcome",
            Self::Scenario => "scenario",
            Self::Step => "step",
            Self::Action => "action",
        }
    }

    /// Root levels have no parents
    #[inline]
    #[must_use]
    pub const fn is_root(self) -> bool {
        matches!(self, Self::Product | Self::Workflow)
    }

    /// Leaf level has no children in the canonical graph
    #[inline]
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(self, Self::Action)
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HierarchyLevel {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GraphError::UnknownLevel(s.to_string()))
    }
}

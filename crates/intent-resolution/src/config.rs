//! Engine configuration

use intent_graph::{FunctionalNode, HierarchyLevel, NodeId};

/// Naming conventions and limits used by the resolution engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Product code that never counts as a product (`n/a`)
    pub ignored_product: String,
    /// Id marker of shared/unified nodes
    pub shared_marker: String,
    /// Id marker of workflow nodes
    pub workflow_marker: String,
    /// Bound on context-driven redirects
    pub max_redirect_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ignored_product: "n/a".to_string(),
            shared_marker: "-shared".to_string(),
            workflow_marker: "-workflow".to_string(),
            max_redirect_depth: 8,
        }
    }
}

impl EngineConfig {
    /// With ignored product code
    #[must_use]
    pub fn with_ignored_product(mut self, code: impl Into<String>) -> Self {
        self.ignored_product = code.into();
        self
    }

    /// With shared-node marker
    #[must_use]
    pub fn with_shared_marker(mut self, marker: impl Into<String>) -> Self {
        self.shared_marker = marker.into();
        self
    }

    /// With workflow marker
    #[must_use]
    pub fn with_workflow_marker(mut self, marker: impl Into<String>) -> Self {
        self.workflow_marker = marker.into();
        self
    }

    /// With redirect bound
    #[must_use]
    pub fn with_max_redirect_depth(mut self, depth: usize) -> Self {
        self.max_redirect_depth = depth;
        self
    }

    /// Whether a product code counts; empty and ignored codes do not
    #[inline]
    #[must_use]
    pub fn counts_product(&self, code: &str) -> bool {
        !code.trim().is_empty() && !code.eq_ignore_ascii_case(&self.ignored_product)
    }

    /// Id carries the shared marker
    #[inline]
    #[must_use]
    pub fn is_shared_id(&self, id: &NodeId) -> bool {
        id.has_marker(&self.shared_marker)
    }

    /// Workflow by level or by id marker
    #[inline]
    #[must_use]
    pub fn is_workflow(&self, node: &FunctionalNode) -> bool {
        node.level == HierarchyLevel::Workflow || node.id.has_marker(&self.workflow_marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert!(!config.counts_product("N/A"));
        assert!(!config.counts_product(" "));
        assert!(config.counts_product("sap"));
        assert!(config.is_shared_id(&NodeId::from("scenario-x-shared")));
    }

    #[test]
    fn workflow_detection() {
        let config = EngineConfig::default();
        let by_level = FunctionalNode::new("flow", HierarchyLevel::Workflow, "Flow");
        let by_marker = FunctionalNode::new("close-books-workflow", HierarchyLevel::Outcome, "Close");
        let neither = FunctionalNode::new("outcome-a", HierarchyLevel::Outcome, "A");
        assert!(config.is_workflow(&by_level));
        assert!(config.is_workflow(&by_marker));
        assert!(!config.is_workflow(&neither));
    }
}

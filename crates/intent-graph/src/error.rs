//! Error types for the graph store

use crate::validation::IntegrityIssue;

/// Graph store errors
///
/// Traversal helpers never fail; these errors only arise when parsing
/// levels or when a caller asks for strict integrity checking.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Level name not recognised
    #[error("unknown hierarchy level: '{0}'")]
    UnknownLevel(String),

    /// Node map failed integrity validation
    #[error("graph integrity violated ({} error(s)): {}", .0.len(), first_message(.0))]
    Integrity(Vec<IntegrityIssue>),
}

fn first_message(issues: &[IntegrityIssue]) -> &str {
    issues.first().map_or("", |issue| issue.message.as_str())
}

impl GraphError {
    /// Issues carried by an integrity error
    #[must_use]
    pub fn issues(&self) -> &[IntegrityIssue] {
        match self {
            Self::Integrity(issues) => issues,
            Self::UnknownLevel(_) => &[],
        }
    }
}

//! Error types for domain loading and suite execution
//!
//! Resolution itself never fails; a failed resolution is a [`Resolution`]
//! with confidence 0. These errors only cover the loading boundary.
//!
//! [`Resolution`]: crate::types::Resolution

use intent_graph::GraphError;
use std::path::PathBuf;

/// Loading and catalog errors
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// No source knows the domain
    #[error("unknown domain: '{0}'")]
    UnknownDomain(String),

    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File content could not be parsed
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Extension is not `.json`, `.yaml` or `.yml`
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Strict loading rejected the domain
    #[error("domain '{domain}' failed validation: {source}")]
    Invalid {
        /// Domain id
        domain: String,
        /// Integrity failure
        #[source]
        source: GraphError,
    },
}

impl ResolutionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

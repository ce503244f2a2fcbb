//! Error types.
//!
//! Every fallible graph operation returns [`GraphError`]. None of these are
//! fatal: a rejected mutation leaves the graph exactly as it was.

use thiserror::Error;

/// Result alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors returned by [`Graph`](crate::graph::Graph) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An operation referenced a key that was never added.
    #[error("vertex {key:?} not found")]
    VertexNotFound { key: String },

    /// The opposite edge already exists between the two vertices.
    #[error("bidirectional edge {src} ↔ {tgt} not allowed")]
    BidirectionalEdge { src: String, tgt: String },

    /// The edge would close a cycle.
    #[error("edge {src} → {tgt} would create a cycle")]
    Cycle { src: String, tgt: String },

    /// Both vertices exist but no directed path joins them.
    #[error("no path from {src} to {dst}")]
    VertexPath { src: String, dst: String },
}

impl GraphError {
    pub(crate) fn not_found(key: &str) -> Self {
        Self::VertexNotFound {
            key: key.to_string(),
        }
    }
}

/// Errors raised while loading a [`GraphConfig`](crate::config::GraphConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

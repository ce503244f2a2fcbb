//! Vertex identity and the value types handed out by the graph.
//!
//! The store keeps vertices as parallel arrays indexed by [`VertexId`]; the
//! structs here are owned snapshots materialized from those arrays. They hold
//! no references back into the graph, so callers can keep them after the lock
//! is released.

use serde::{Deserialize, Serialize};

/// Dense identifier of a vertex.
///
/// Ids are assigned in insertion order starting at zero and are never reused,
/// which lets the store index its arrays directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(usize);

impl VertexId {
    /// Get the raw index.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl From<usize> for VertexId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// Snapshot of one vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    /// Unique external key.
    pub key: String,

    /// Display label.
    pub label: String,

    /// Optional category.
    pub class: Option<String>,

    /// Current health flag.
    pub healthy: bool,

    /// Nanosecond timestamp of the last health change or refresh.
    pub last_check: i64,
}

/// A dependency edge: `source` depends on `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Synthetic key, `"{source}-{target}"`.
    pub key: String,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            key: format!("{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// A materialized piece of the graph.
///
/// Both lists are deduplicated. Their order is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subgraph {
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
}

impl Subgraph {
    /// Check whether a vertex with the given key is part of the subgraph.
    pub fn contains_vertex(&self, key: &str) -> bool {
        self.vertices.iter().any(|v| v.key == key)
    }

    /// Check whether the edge `source -> target` is part of the subgraph.
    pub fn contains_edge(&self, source: &str, target: &str) -> bool {
        self.edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }

    /// Vertex keys, sorted.
    pub fn vertex_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.vertices.iter().map(|v| v.key.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Edge keys, sorted.
    pub fn edge_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.edges.iter().map(|e| e.key.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}

/// Health and size summary of the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_vertices: usize,
    pub total_healthy_vertices: usize,
    pub total_unhealthy_vertices: usize,
    pub total_edges: usize,

    /// Every vertex currently flagged unhealthy, in id order.
    pub unhealthy_vertices: Vec<Vertex>,
}

//! Dependency Graph
//!
//! This module implements the resource dependency graph and the health state
//! that flows through it.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph (DAG) where:
//!
//! - Vertices represent resources (services, databases, queues, ...)
//! - An edge A -> B means "A depends on B"
//!
//! When B fails, everything that transitively depends on B is in its blast
//! radius. The health engine pushes failures along that direction, and the
//! query engine materializes the affected subgraphs.
//!
//! # Design Decisions
//!
//! 1. Vertices live in parallel arrays indexed by a dense [`VertexId`] rather
//!    than as linked objects. There are no ownership cycles and a snapshot is
//!    just a few array reads.
//!
//! 2. We maintain both forward (dependencies) and reverse (dependents) edges
//!    to enable efficient traversal in both directions.
//!
//! 3. The DAG property is checked when an edge is inserted. Edges are never
//!    removed, so it never needs re-validation.
//!
//! 4. One reader/writer lock guards the whole store. Mutations take the write
//!    lock for their full duration, queries take the read lock, and nothing
//!    blocks or awaits while holding it.

mod health;
mod query;
mod store;
mod vertex;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::clock::{duration_nanos, Clock, SystemClock};
use crate::config::GraphConfig;
use crate::error::Result;

pub use health::HealthReport;
pub use vertex::{Edge, Stats, Subgraph, Vertex, VertexId};

use query::Direction;
use store::{EdgeInsert, Store};

/// A thread-safe resource dependency graph.
///
/// Share it between tasks and threads as `Arc<Graph>`.
///
/// # Example
///
/// ```rust
/// use healthgraph_core::Graph;
///
/// let graph = Graph::new();
/// graph.add_vertex("api", "Public API", Some("service"), true);
/// graph.add_vertex("db", "Postgres", Some("database"), true);
/// graph.add_edge("api", "db").unwrap();
///
/// let blast_radius = graph.dependents("db", true).unwrap();
/// assert!(blast_radius.contains_vertex("api"));
/// ```
pub struct Graph {
    store: RwLock<Store>,
    clock: Arc<dyn Clock>,
    config: GraphConfig,
}

impl Graph {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create an empty graph reading time from `clock`.
    pub fn with_clock(config: GraphConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: RwLock::new(Store::with_capacity(config.initial_capacity)),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Add a vertex, or return the id of the vertex already using `key`.
    ///
    /// Insertion is idempotent: when the key exists, `label`, `class` and
    /// `healthy` are ignored and the existing vertex is left as it was.
    pub fn add_vertex(&self, key: &str, label: &str, class: Option<&str>, healthy: bool) -> VertexId {
        let mut store = self.store.write();
        let (id, created) = store.add_vertex(key, label, class, healthy, self.clock.now());
        if created {
            tracing::debug!(key, id = id.raw(), healthy, "vertex added");
        }
        id
    }

    /// Add the dependency edge `src -> tgt` ("src depends on tgt").
    ///
    /// Adding an edge that already exists is a no-op. Fails without touching
    /// the graph when either key is unknown (the source is checked first), when
    /// the opposite edge exists, or when the edge would close a cycle.
    pub fn add_edge(&self, src: &str, tgt: &str) -> Result<()> {
        let mut store = self.store.write();
        match store.add_edge(src, tgt) {
            Ok(EdgeInsert::Added) => {
                tracing::debug!(src, tgt, "edge added");
                Ok(())
            }
            Ok(EdgeInsert::AlreadyPresent) => Ok(()),
            Err(err) => {
                tracing::warn!(src, tgt, error = %err, "edge rejected");
                Err(err)
            }
        }
    }

    pub fn get_vertex(&self, key: &str) -> Result<Vertex> {
        let store = self.store.read();
        let id = store.require(key)?;
        Ok(store.vertex(id))
    }

    /// Set one vertex's health flag and refresh its last check.
    ///
    /// Only the named vertex changes; dependents pick the failure up on the
    /// next health cycle.
    pub fn set_vertex_health(&self, key: &str, healthy: bool) -> Result<()> {
        let mut store = self.store.write();
        let id = store.require(key).inspect_err(|err| {
            tracing::warn!(key, error = %err, "cannot set health");
        })?;
        store.set_health(id, healthy, self.clock.now());
        tracing::info!(key, id = id.raw(), healthy, "vertex health set");
        Ok(())
    }

    /// Mark every vertex healthy, regardless of topology.
    pub fn clear_healthy_status(&self) {
        let mut store = self.store.write();
        store.clear_health();
        tracing::debug!(vertices = store.len(), "health cleared");
    }

    pub fn stats(&self) -> Stats {
        self.store.read().stats()
    }

    /// The vertex, everything one hop away in either direction, and the
    /// connecting edges.
    pub fn neighbors(&self, key: &str) -> Result<Subgraph> {
        self.store.read().neighbors(key)
    }

    /// What `key` depends on: direct dependencies, or with `all` the induced
    /// subgraph on everything reachable along forward edges.
    pub fn dependencies(&self, key: &str, all: bool) -> Result<Subgraph> {
        self.store.read().closure(key, Direction::Dependencies, all)
    }

    /// What depends on `key`: direct dependents, or with `all` the whole
    /// blast radius.
    pub fn dependents(&self, key: &str, all: bool) -> Result<Subgraph> {
        self.store.read().closure(key, Direction::Dependents, all)
    }

    /// Union of every directed path from `src` to `tgt`.
    ///
    /// Fails with `VertexPath` when both vertices exist but `tgt` is not
    /// reachable from `src`.
    pub fn path(&self, src: &str, tgt: &str) -> Result<Subgraph> {
        self.store.read().path(src, tgt)
    }

    /// Run one health cycle: decay stale vertices, then cascade every failure
    /// to its dependents.
    ///
    /// This is what the health check loop calls on every tick.
    pub fn update_health_status_and_propagate(&self, interval: Duration) -> HealthReport {
        let mut store = self.store.write();
        let report = store.decay_and_propagate(duration_nanos(interval), self.clock.now());
        tracing::debug!(
            decayed = report.decayed.len(),
            propagated = report.propagated.len(),
            "health cycle complete"
        );
        report
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

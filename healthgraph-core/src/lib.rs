//! Healthgraph Core
//!
//! This crate provides the engine behind healthgraph: a dependency graph of
//! infrastructure resources with per-resource health tracking.
//! It implements:
//!
//! - A DAG store that rejects self-loops, bidirectional edges and cycles
//! - Time-based health decay and failure cascade along dependency edges
//! - Blast-radius queries (neighbors, dependencies, dependents, paths)
//! - A background health check loop on tokio
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: The vertex/edge store, health engine and subgraph queries
//! - `monitor`: The periodic health check task
//! - `clock`: Time source used for health timestamps
//! - `config`: Graph configuration
//! - `error`: Error types
//!
//! # Logging
//!
//! The crate reports through `tracing` and never installs a subscriber. The
//! caller decides where events go by installing one, globally or scoped with
//! `tracing::subscriber::with_default`.
//!
//! # Example
//!
//! ```rust
//! use healthgraph_core::Graph;
//!
//! let graph = Graph::new();
//! graph.add_vertex("web", "Web frontend", Some("service"), true);
//! graph.add_vertex("api", "API", Some("service"), true);
//! graph.add_vertex("db", "Postgres", Some("database"), true);
//! graph.add_edge("web", "api").unwrap();
//! graph.add_edge("api", "db").unwrap();
//!
//! // The database goes down...
//! graph.set_vertex_health("db", false).unwrap();
//!
//! // ...and the next health cycle takes everything that depends on it along.
//! graph.update_health_status_and_propagate(graph.config().check_interval());
//! assert_eq!(graph.stats().total_unhealthy_vertices, 3);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod graph;
pub mod monitor;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GraphConfig;
pub use error::{ConfigError, GraphError, Result};
pub use graph::{Edge, Graph, HealthReport, Stats, Subgraph, Vertex, VertexId};
pub use monitor::HealthCheckHandle;

//! Vertex Store
//!
//! The store owns every vertex and edge of the graph in a structure-of-arrays
//! layout. It performs no locking; [`Graph`](super::Graph) wraps it in a
//! reader/writer lock and is the only thing that touches it.
//!
//! # Layout
//!
//! - `keys` is an insertion-ordered set, so a key's position *is* its
//!   [`VertexId`]. It doubles as the identifier table in both directions.
//! - `labels`, `classes`, `healthy` and `last_check` are parallel arrays
//!   indexed by the same id.
//! - Classes are interned into `class_table`; a vertex stores the index.
//! - `dependencies` (forward, "depends on") and `dependents` (reverse, "is
//!   depended on by") map an id to the set of neighbor ids. The two maps are
//!   always exact inverses of each other.
//!
//! # Edge Rules
//!
//! Edges can only be added, so the DAG property is enforced once, at insertion:
//!
//! 1. An existing edge is accepted again as a no-op
//! 2. The opposite edge must not exist
//! 3. The new edge must not close a cycle

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::vertex::{Edge, Stats, Subgraph, Vertex, VertexId};
use crate::error::{GraphError, Result};

pub(crate) type AdjacencyMap = HashMap<VertexId, HashSet<VertexId>>;

/// Traversal worklist. Most service topologies are shallow, so the common case
/// never leaves the stack.
pub(crate) type Worklist = SmallVec<[VertexId; 16]>;

/// Outcome of a successful edge insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeInsert {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Default)]
pub(crate) struct Store {
    keys: IndexSet<String>,
    labels: Vec<String>,
    classes: Vec<Option<usize>>,
    class_table: IndexSet<String>,
    pub(super) healthy: Vec<bool>,
    pub(super) last_check: Vec<i64>,
    dependencies: AdjacencyMap,
    dependents: AdjacencyMap,
}

impl Store {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: IndexSet::with_capacity(capacity),
            labels: Vec::with_capacity(capacity),
            classes: Vec::with_capacity(capacity),
            class_table: IndexSet::new(),
            healthy: Vec::with_capacity(capacity),
            last_check: Vec::with_capacity(capacity),
            dependencies: HashMap::with_capacity(capacity),
            dependents: HashMap::with_capacity(capacity),
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Number of edges, counted over the forward map.
    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(HashSet::len).sum()
    }

    pub fn lookup(&self, key: &str) -> Option<VertexId> {
        self.keys.get_index_of(key).map(VertexId::from)
    }

    /// Look up a key, failing with `VertexNotFound`.
    pub fn require(&self, key: &str) -> Result<VertexId> {
        self.lookup(key).ok_or_else(|| GraphError::not_found(key))
    }

    pub fn key(&self, id: VertexId) -> &str {
        &self.keys[id.raw()]
    }

    /// Insert a vertex unless its key is already known.
    ///
    /// Returns the vertex id and whether a new vertex was created. An existing
    /// vertex is left untouched.
    pub fn add_vertex(
        &mut self,
        key: &str,
        label: &str,
        class: Option<&str>,
        healthy: bool,
        now: i64,
    ) -> (VertexId, bool) {
        if let Some(id) = self.lookup(key) {
            return (id, false);
        }

        let (index, _) = self.keys.insert_full(key.to_string());
        let class = class.map(|c| self.intern_class(c));

        self.labels.push(label.to_string());
        self.classes.push(class);
        self.healthy.push(healthy);
        self.last_check.push(now);

        (VertexId::from(index), true)
    }

    fn intern_class(&mut self, class: &str) -> usize {
        match self.class_table.get_index_of(class) {
            Some(index) => index,
            None => self.class_table.insert_full(class.to_string()).0,
        }
    }

    /// Add the edge `src -> tgt` after validating every edge rule.
    ///
    /// Nothing is mutated unless the call returns `Ok(EdgeInsert::Added)`.
    pub fn add_edge(&mut self, src_key: &str, tgt_key: &str) -> Result<EdgeInsert> {
        let src = self.require(src_key)?;
        let tgt = self.require(tgt_key)?;

        if self.has_edge(src, tgt) {
            return Ok(EdgeInsert::AlreadyPresent);
        }

        if self.has_edge(tgt, src) {
            return Err(GraphError::BidirectionalEdge {
                src: src_key.to_string(),
                tgt: tgt_key.to_string(),
            });
        }

        if self.would_create_cycle(src, tgt) {
            return Err(GraphError::Cycle {
                src: src_key.to_string(),
                tgt: tgt_key.to_string(),
            });
        }

        self.dependencies.entry(src).or_default().insert(tgt);
        self.dependents.entry(tgt).or_default().insert(src);

        Ok(EdgeInsert::Added)
    }

    pub fn has_edge(&self, src: VertexId, tgt: VertexId) -> bool {
        self.dependencies
            .get(&src)
            .is_some_and(|targets| targets.contains(&tgt))
    }

    /// An edge `src -> tgt` closes a cycle iff it is a self-loop or `src` is
    /// already reachable from `tgt` along forward edges.
    fn would_create_cycle(&self, src: VertexId, tgt: VertexId) -> bool {
        if src == tgt {
            return true;
        }

        let mut visited = HashSet::new();
        let mut stack = Worklist::new();
        stack.push(tgt);

        while let Some(id) = stack.pop() {
            if id == src {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.extend(self.dependencies_of(id).filter(|n| !visited.contains(n)));
        }

        false
    }

    /// Vertices `id` depends on.
    pub fn dependencies_of(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.dependencies.get(&id).into_iter().flatten().copied()
    }

    /// Vertices depending on `id`.
    pub fn dependents_of(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.dependents.get(&id).into_iter().flatten().copied()
    }

    /// Materialize a snapshot of one vertex.
    pub fn vertex(&self, id: VertexId) -> Vertex {
        let i = id.raw();
        Vertex {
            key: self.keys[i].clone(),
            label: self.labels[i].clone(),
            class: self.classes[i].map(|c| self.class_table[c].clone()),
            healthy: self.healthy[i],
            last_check: self.last_check[i],
        }
    }

    pub fn edge(&self, src: VertexId, tgt: VertexId) -> Edge {
        Edge::new(self.key(src), self.key(tgt))
    }

    /// Build a [`Subgraph`] from already deduplicated id sets.
    pub fn materialize<V, E>(&self, vertices: V, edges: E) -> Subgraph
    where
        V: IntoIterator<Item = VertexId>,
        E: IntoIterator<Item = (VertexId, VertexId)>,
    {
        Subgraph {
            vertices: vertices.into_iter().map(|id| self.vertex(id)).collect(),
            edges: edges
                .into_iter()
                .map(|(src, tgt)| self.edge(src, tgt))
                .collect(),
        }
    }

    /// Single pass over the health array plus the adjacency sizes.
    pub fn stats(&self) -> Stats {
        let unhealthy_vertices: Vec<Vertex> = self
            .healthy
            .iter()
            .enumerate()
            .filter(|(_, healthy)| !**healthy)
            .map(|(i, _)| self.vertex(VertexId::from(i)))
            .collect();

        Stats {
            total_vertices: self.len(),
            total_healthy_vertices: self.len() - unhealthy_vertices.len(),
            total_unhealthy_vertices: unhealthy_vertices.len(),
            total_edges: self.edge_count(),
            unhealthy_vertices,
        }
    }

    /// Check that the forward and reverse maps mirror each other.
    #[cfg(test)]
    pub fn adjacency_is_consistent(&self) -> bool {
        let forward = self
            .dependencies
            .iter()
            .flat_map(|(src, tgts)| tgts.iter().map(move |tgt| (*src, *tgt)));
        let reverse = self
            .dependents
            .iter()
            .flat_map(|(tgt, srcs)| srcs.iter().map(move |src| (*src, *tgt)));

        let forward: HashSet<_> = forward.collect();
        let reverse: HashSet<_> = reverse.collect();
        forward == reverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(keys: &[&str]) -> Store {
        let mut store = Store::with_capacity(keys.len());
        for key in keys {
            store.add_vertex(key, key, None, true, 0);
        }
        store
    }

    #[test]
    fn ids_are_dense_and_stable() {
        let mut store = Store::with_capacity(4);

        let (a, created_a) = store.add_vertex("A", "App", None, true, 1);
        let (b, created_b) = store.add_vertex("B", "Db", None, true, 2);
        let (again, created_again) = store.add_vertex("A", "Other", Some("x"), false, 3);

        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(again, a);
        assert!(created_a && created_b);
        assert!(!created_again);
        assert_eq!(store.len(), 2);

        let v = store.vertex(a);
        assert_eq!(v.label, "App");
        assert_eq!(v.class, None);
        assert!(v.healthy);
        assert_eq!(v.last_check, 1);
    }

    #[test]
    fn classes_are_interned() {
        let mut store = Store::with_capacity(4);
        store.add_vertex("A", "A", Some("server"), true, 0);
        store.add_vertex("B", "B", Some("server"), true, 0);
        store.add_vertex("C", "C", Some("database"), true, 0);

        assert_eq!(store.class_table.len(), 2);
        assert_eq!(store.classes, vec![Some(0), Some(0), Some(1)]);
        assert_eq!(store.vertex(VertexId::from(2)).class.as_deref(), Some("database"));
    }

    #[test]
    fn add_edge_updates_both_maps() {
        let mut store = store_with(&["A", "B"]);

        assert_eq!(store.add_edge("A", "B").unwrap(), EdgeInsert::Added);

        let a = store.lookup("A").unwrap();
        let b = store.lookup("B").unwrap();
        assert!(store.has_edge(a, b));
        assert!(!store.has_edge(b, a));
        assert_eq!(store.dependencies_of(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(store.dependents_of(b).collect::<Vec<_>>(), vec![a]);
        assert!(store.adjacency_is_consistent());
    }

    #[test]
    fn duplicate_edge_is_a_no_op() {
        let mut store = store_with(&["A", "B"]);

        store.add_edge("A", "B").unwrap();
        assert_eq!(store.add_edge("A", "B").unwrap(), EdgeInsert::AlreadyPresent);
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn missing_source_is_reported_first() {
        let mut store = store_with(&["A"]);

        assert_eq!(store.add_edge("X", "Y"), Err(GraphError::not_found("X")));
        assert_eq!(store.add_edge("A", "Y"), Err(GraphError::not_found("Y")));
        assert_eq!(store.add_edge("X", "A"), Err(GraphError::not_found("X")));
    }

    #[test]
    fn rejects_reverse_edge() {
        let mut store = store_with(&["A", "B"]);
        store.add_edge("A", "B").unwrap();

        let err = store.add_edge("B", "A").unwrap_err();
        assert_eq!(
            err,
            GraphError::BidirectionalEdge {
                src: "B".into(),
                tgt: "A".into()
            }
        );
        assert_eq!(store.edge_count(), 1);
        assert!(store.adjacency_is_consistent());
    }

    #[test]
    fn rejects_self_loop() {
        let mut store = store_with(&["A"]);

        let err = store.add_edge("A", "A").unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }));
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn rejects_cycle_through_a_diamond() {
        let mut store = store_with(&["A", "B", "C", "D", "E", "F", "G"]);
        for (src, tgt) in [
            ("B", "C"),
            ("C", "D"),
            ("C", "E"),
            ("D", "F"),
            ("E", "F"),
            ("F", "G"),
            ("A", "B"),
        ] {
            store.add_edge(src, tgt).unwrap();
        }

        let err = store.add_edge("G", "A").unwrap_err();
        assert_eq!(
            err,
            GraphError::Cycle {
                src: "G".into(),
                tgt: "A".into()
            }
        );
        assert_eq!(store.edge_count(), 7);
        assert!(store.adjacency_is_consistent());
    }

    #[test]
    fn diamond_shape_is_not_a_cycle() {
        let mut store = store_with(&["A", "B", "C", "D"]);
        store.add_edge("A", "B").unwrap();
        store.add_edge("A", "C").unwrap();
        store.add_edge("B", "D").unwrap();

        assert_eq!(store.add_edge("C", "D").unwrap(), EdgeInsert::Added);
    }

    #[test]
    fn stats_partition_by_health() {
        let mut store = Store::with_capacity(3);
        store.add_vertex("A", "A", None, true, 0);
        store.add_vertex("B", "B", None, true, 0);
        store.add_vertex("C", "C", None, false, 0);
        store.add_edge("A", "B").unwrap();
        store.add_edge("B", "C").unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_vertices, 3);
        assert_eq!(stats.total_healthy_vertices, 2);
        assert_eq!(stats.total_unhealthy_vertices, 1);
        assert_eq!(stats.total_edges, 2);
        assert_eq!(stats.unhealthy_vertices.len(), 1);
        assert_eq!(stats.unhealthy_vertices[0].key, "C");
    }
}

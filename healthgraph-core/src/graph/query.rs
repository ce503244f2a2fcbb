//! Subgraph Queries
//!
//! Read-only traversals that answer "what is affected if this fails?" style
//! questions. Each query collects vertex ids and `(source, target)` id pairs
//! into sets, then materializes them into a [`Subgraph`] in one go.
//!
//! # Algorithms
//!
//! - `neighbors`: one hop in both directions.
//! - `dependencies` / `dependents`: flood fill over the forward or reverse
//!   adjacency with an explicit stack. With `all`, the result is the induced
//!   subgraph on the reachable set.
//! - `path`: memoized depth-first search returning the union of every
//!   directed path between two vertices.

use std::collections::{HashMap, HashSet};

use super::store::{Store, Worklist};
use super::vertex::{Subgraph, VertexId};
use crate::error::{GraphError, Result};

/// Which adjacency a closure walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Follow "depends on" edges.
    Dependencies,
    /// Follow "is depended on by" edges.
    Dependents,
}

type EdgeSet = HashSet<(VertexId, VertexId)>;

impl Store {
    pub fn neighbors(&self, key: &str) -> Result<Subgraph> {
        let root = self.require(key)?;

        let mut vertices = HashSet::from([root]);
        let mut edges = EdgeSet::new();

        for tgt in self.dependencies_of(root) {
            vertices.insert(tgt);
            edges.insert((root, tgt));
        }
        for src in self.dependents_of(root) {
            vertices.insert(src);
            edges.insert((src, root));
        }

        Ok(self.materialize(vertices, edges))
    }

    /// Direct or transitive neighborhood of `key` in one direction.
    pub fn closure(&self, key: &str, direction: Direction, all: bool) -> Result<Subgraph> {
        let root = self.require(key)?;

        let mut vertices = HashSet::from([root]);
        let mut edges = EdgeSet::new();
        let mut stack = Worklist::new();
        stack.push(root);

        while let Some(id) = stack.pop() {
            for next in self.step(id, direction) {
                edges.insert(oriented(id, next, direction));
                // `insert` returning true means first visit, so each vertex
                // is expanded at most once.
                if vertices.insert(next) && all {
                    stack.push(next);
                }
            }
            if !all {
                break;
            }
        }

        Ok(self.materialize(vertices, edges))
    }

    fn step(&self, id: VertexId, direction: Direction) -> Box<dyn Iterator<Item = VertexId> + '_> {
        match direction {
            Direction::Dependencies => Box::new(self.dependencies_of(id)),
            Direction::Dependents => Box::new(self.dependents_of(id)),
        }
    }

    /// Union of every directed path from `src_key` to `tgt_key`.
    pub fn path(&self, src_key: &str, tgt_key: &str) -> Result<Subgraph> {
        let src = self.require(src_key)?;
        let dst = self.require(tgt_key)?;

        let mut vertices = HashSet::new();
        let mut edges = EdgeSet::new();

        // id -> "a path from here to dst exists"
        let mut memo: HashMap<VertexId, bool> = HashMap::new();

        // Post-order DFS: a vertex is pushed once to expand its children and
        // once more (`expanded = true`) to fold their answers. The graph is
        // acyclic, so every child is settled before its parent folds.
        let mut stack: Vec<(VertexId, bool)> = vec![(src, false)];

        while let Some((id, expanded)) = stack.pop() {
            if id == dst {
                vertices.insert(id);
                memo.insert(id, true);
                continue;
            }

            if !expanded {
                if memo.contains_key(&id) {
                    continue;
                }
                stack.push((id, true));
                stack.extend(
                    self.dependencies_of(id)
                        .filter(|child| !memo.contains_key(child))
                        .map(|child| (child, false)),
                );
                continue;
            }

            let mut found = false;
            for child in self.dependencies_of(id) {
                if memo.get(&child).copied().unwrap_or(false) {
                    found = true;
                    vertices.insert(id);
                    vertices.insert(child);
                    edges.insert((id, child));
                }
            }
            memo.insert(id, found);
        }

        if !memo.get(&src).copied().unwrap_or(false) {
            return Err(GraphError::VertexPath {
                src: src_key.to_string(),
                dst: tgt_key.to_string(),
            });
        }

        Ok(self.materialize(vertices, edges))
    }
}

fn oriented(from: VertexId, to: VertexId, direction: Direction) -> (VertexId, VertexId) {
    match direction {
        Direction::Dependencies => (from, to),
        Direction::Dependents => (to, from),
    }
}

//! Health Engine
//!
//! Each vertex carries a boolean health flag and the time it was last checked.
//! Flags change in three ways:
//!
//! - Explicitly, through `set_vertex_health`. Only the named vertex changes.
//! - In bulk, through `clear_healthy_status`, which marks everything healthy.
//! - Periodically, through the health cycle implemented here.
//!
//! # Health Cycle
//!
//! 1. **Decay.** A healthy vertex whose last check is older than the interval
//!    has missed its heartbeat. It becomes unhealthy.
//! 2. **Propagation.** Starting from every unhealthy vertex, walk the reverse
//!    adjacency and mark every dependent unhealthy. A vertex is only as healthy
//!    as the things it depends on, whatever its own heartbeat says.
//!
//! Every vertex touched by either pass gets its last check refreshed. The
//! propagation walk shares one visited set across all roots, so each vertex is
//! expanded at most once per cycle.

use std::collections::HashSet;

use super::store::{Store, Worklist};
use super::vertex::VertexId;

/// What one health cycle changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    /// Keys that went unhealthy because their heartbeat expired.
    pub decayed: Vec<String>,

    /// Keys that went unhealthy because something they depend on is unhealthy.
    pub propagated: Vec<String>,
}

impl HealthReport {
    /// True when the cycle flipped no flag.
    pub fn is_empty(&self) -> bool {
        self.decayed.is_empty() && self.propagated.is_empty()
    }
}

impl Store {
    pub fn set_health(&mut self, id: VertexId, healthy: bool, now: i64) {
        self.healthy[id.raw()] = healthy;
        self.last_check[id.raw()] = now;
    }

    pub fn clear_health(&mut self) {
        self.healthy.fill(true);
    }

    /// Run one decay pass followed by one propagation pass.
    pub fn decay_and_propagate(&mut self, interval_nanos: i64, now: i64) -> HealthReport {
        let mut report = HealthReport::default();

        for i in 0..self.len() {
            let expired = self.last_check[i].saturating_add(interval_nanos) < now;
            if self.healthy[i] && expired {
                tracing::info!(key = %self.key(VertexId::from(i)), id = i, "heartbeat expired, marking vertex unhealthy");
                self.healthy[i] = false;
                self.last_check[i] = now;
                report.decayed.push(self.key(VertexId::from(i)).to_string());
            }
        }

        let roots: Vec<VertexId> = self
            .healthy
            .iter()
            .enumerate()
            .filter(|(_, healthy)| !**healthy)
            .map(|(i, _)| VertexId::from(i))
            .collect();

        let mut visited = HashSet::with_capacity(roots.len());
        for root in roots {
            self.propagate_unhealthy(root, now, &mut visited, &mut report);
        }

        report
    }

    fn propagate_unhealthy(
        &mut self,
        root: VertexId,
        now: i64,
        visited: &mut HashSet<VertexId>,
        report: &mut HealthReport,
    ) {
        let mut stack = Worklist::new();
        stack.push(root);

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }

            let i = id.raw();
            if self.healthy[i] {
                tracing::debug!(key = %self.key(id), id = i, "dependency unhealthy, cascading");
                report.propagated.push(self.key(id).to_string());
            }
            self.healthy[i] = false;
            self.last_check[i] = now;

            stack.extend(self.dependents_of(id).filter(|d| !visited.contains(d)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: i64 = 1_000_000_000;

    fn chain(keys: &[&str], now: i64) -> Store {
        let mut store = Store::with_capacity(keys.len());
        for key in keys {
            store.add_vertex(key, key, None, true, now);
        }
        for pair in keys.windows(2) {
            store.add_edge(pair[0], pair[1]).unwrap();
        }
        store
    }

    fn healthy(store: &Store, key: &str) -> bool {
        store.vertex(store.lookup(key).unwrap()).healthy
    }

    #[test]
    fn fresh_vertices_do_not_decay() {
        let mut store = chain(&["A", "B"], 0);

        let report = store.decay_and_propagate(SECOND, SECOND / 2);

        assert!(report.is_empty());
        assert!(healthy(&store, "A"));
        assert!(healthy(&store, "B"));
    }

    #[test]
    fn boundary_is_exclusive() {
        let mut store = chain(&["A"], 0);

        store.decay_and_propagate(SECOND, SECOND);
        assert!(healthy(&store, "A"));

        store.decay_and_propagate(SECOND, SECOND + 1);
        assert!(!healthy(&store, "A"));
    }

    #[test]
    fn stale_vertices_decay_and_refresh() {
        let mut store = chain(&["A", "B"], 0);

        let report = store.decay_and_propagate(SECOND, 2 * SECOND);

        assert_eq!(report.decayed, vec!["A".to_string(), "B".to_string()]);
        assert!(report.propagated.is_empty());
        let a = store.vertex(store.lookup("A").unwrap());
        assert!(!a.healthy);
        assert_eq!(a.last_check, 2 * SECOND);
    }

    #[test]
    fn failure_cascades_to_every_dependent() {
        // A -> B -> C, D -> C; C fails.
        let mut store = chain(&["A", "B", "C"], 0);
        store.add_vertex("D", "D", None, true, 0);
        store.add_vertex("E", "E", None, true, 0);
        store.add_edge("D", "C").unwrap();
        let c = store.lookup("C").unwrap();
        store.set_health(c, false, 0);

        let mut report = store.decay_and_propagate(10 * SECOND, SECOND);
        report.propagated.sort();

        assert!(report.decayed.is_empty());
        assert_eq!(report.propagated, vec!["A", "B", "D"]);
        assert!(!healthy(&store, "A"));
        assert!(!healthy(&store, "B"));
        assert!(!healthy(&store, "D"));
        assert!(healthy(&store, "E"));
    }

    #[test]
    fn cascade_does_not_touch_dependencies() {
        let mut store = chain(&["A", "B", "C"], 0);
        let a = store.lookup("A").unwrap();
        store.set_health(a, false, 0);

        store.decay_and_propagate(10 * SECOND, SECOND);

        assert!(healthy(&store, "B"));
        assert!(healthy(&store, "C"));
    }

    #[test]
    fn clear_marks_everything_healthy() {
        let mut store = chain(&["A", "B"], 0);
        store.decay_and_propagate(SECOND, 2 * SECOND);

        store.clear_health();

        assert!(healthy(&store, "A"));
        assert!(healthy(&store, "B"));
        assert_eq!(store.stats().total_unhealthy_vertices, 0);
    }
}

//! Health Check Loop
//!
//! A background tokio task that runs the graph's health cycle on a fixed
//! period. The loop is started explicitly with
//! [`Graph::start_health_check_loop`] and stopped through the returned
//! [`HealthCheckHandle`].
//!
//! # Cancellation
//!
//! Cancelling stops the loop from scheduling further cycles. A cycle that is
//! already running finishes first; it holds the graph's write lock and never
//! awaits, so there is nothing to interrupt.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::graph::Graph;

/// Shortest period the loop accepts. `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a running health check loop.
///
/// Dropping the handle cancels the loop.
pub struct HealthCheckHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl HealthCheckHandle {
    /// Ask the loop to stop. Returns immediately.
    pub fn cancel(&self) {
        // Err only means the task already exited.
        let _ = self.cancel.send(true);
    }

    /// Cancel the loop and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "health check loop ended abnormally");
            }
        }
    }

    /// True once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for HealthCheckHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Graph {
    /// Spawn the periodic health cycle on the current tokio runtime.
    ///
    /// The first cycle runs one full `period` after the call, and each cycle
    /// decays vertices whose last check is older than `period`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start_health_check_loop(self: &Arc<Self>, period: Duration) -> HealthCheckHandle {
        let period = if period < MIN_PERIOD {
            tracing::warn!(?period, min = ?MIN_PERIOD, "health check period too short, clamping");
            MIN_PERIOD
        } else {
            period
        };

        let (cancel, mut cancelled) = watch::channel(false);
        let graph = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(?period, "health check loop started");

            loop {
                tokio::select! {
                    biased;
                    // Fires on cancel and also when the handle is gone.
                    _ = cancelled.changed() => break,
                    _ = ticker.tick() => {
                        let report = graph.update_health_status_and_propagate(period);
                        if !report.is_empty() {
                            tracing::info!(
                                decayed = ?report.decayed,
                                propagated = ?report.propagated,
                                "health cycle changed vertex state"
                            );
                        }
                    }
                }
            }

            tracing::info!("health check loop stopped");
        });

        HealthCheckHandle {
            cancel,
            task: Some(task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::GraphConfig;

    fn graph_with_clock() -> (Arc<Graph>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let graph = Arc::new(Graph::with_clock(GraphConfig::default(), clock.clone()));
        (graph, clock)
    }

    #[tokio::test]
    async fn loop_cascades_failures() {
        let (graph, clock) = graph_with_clock();
        graph.add_vertex("A", "App", None, true);
        graph.add_vertex("B", "DB", None, true);
        graph.add_edge("A", "B").unwrap();
        graph.set_vertex_health("B", false).unwrap();

        // A is still fresh; only the cascade can flip it.
        clock.set(1);
        let handle = graph.start_health_check_loop(Duration::from_millis(10));
        time::sleep(Duration::from_millis(60)).await;
        handle.shutdown().await;

        assert!(!graph.get_vertex("A").unwrap().healthy);
    }

    #[tokio::test]
    async fn loop_decays_stale_vertices() {
        let (graph, clock) = graph_with_clock();
        graph.add_vertex("A", "A", None, true);

        clock.set(Duration::from_secs(11).as_nanos() as i64);
        let handle = graph.start_health_check_loop(Duration::from_millis(10));
        time::sleep(Duration::from_millis(60)).await;
        handle.shutdown().await;

        assert!(!graph.get_vertex("A").unwrap().healthy);
    }

    #[tokio::test]
    async fn cancelled_loop_stops_running_cycles() {
        let (graph, clock) = graph_with_clock();
        graph.add_vertex("A", "A", None, true);

        let handle = graph.start_health_check_loop(Duration::from_millis(10));
        handle.cancel();
        time::sleep(Duration::from_millis(20)).await;
        assert!(handle.is_finished());

        // Would decay on the next cycle if the loop were still alive.
        clock.set(Duration::from_secs(60).as_nanos() as i64);
        time::sleep(Duration::from_millis(50)).await;

        assert!(graph.get_vertex("A").unwrap().healthy);
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels() {
        let (graph, clock) = graph_with_clock();
        graph.add_vertex("A", "A", None, true);

        drop(graph.start_health_check_loop(Duration::from_millis(10)));

        clock.set(Duration::from_secs(60).as_nanos() as i64);
        time::sleep(Duration::from_millis(50)).await;

        assert!(graph.get_vertex("A").unwrap().healthy);
    }
}

//! Live simulated readings shared between the simulator (sole writer) and the
//! trends view (reader).
//!
//! The buffer is published through a `watch` channel as immutable snapshots.
//! Every append builds a new `Vec` and swaps it in, so a reader holding a
//! snapshot never observes a partial append.
//!
//! Each simulation run is tagged with a generation number. Results of
//! requests dispatched under an earlier generation are refused, which keeps a
//! slow response from a stopped run out of the buffer even if the simulation
//! has since been restarted.

use std::sync::Arc;
use tokio::sync::watch;

use crate::simulation::ScoredReading;

#[derive(Debug, Clone, Default)]
pub struct LiveSnapshot {
    pub simulating: bool,
    pub generation: u64,
    /// Newest first.
    pub readings: Arc<Vec<ScoredReading>>,
}

#[derive(Clone)]
pub struct LiveFeed {
    tx: Arc<watch::Sender<LiveSnapshot>>,
    capacity: usize,
}

impl LiveFeed {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = watch::channel(LiveSnapshot::default());
        Self {
            tx: Arc::new(tx),
            capacity: capacity.max(1),
        }
    }

    /// Mark the simulation as running and open a new generation.
    pub fn begin_run(&self) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|state| {
            state.simulating = true;
            state.generation += 1;
            generation = state.generation;
        });
        generation
    }

    /// Mark the simulation as stopped. In-flight results of the closed
    /// generation will be refused.
    pub fn end_run(&self) {
        self.tx.send_modify(|state| {
            state.simulating = false;
            state.generation += 1;
        });
    }

    /// Prepend `reading` if `generation` is still the running one, evicting
    /// the oldest entries beyond capacity.
    ///
    /// Returns `false` when the reading was discarded as stale.
    pub fn push_from(&self, generation: u64, reading: ScoredReading) -> bool {
        let capacity = self.capacity;
        self.tx.send_if_modified(|state| {
            if !state.simulating || state.generation != generation {
                return false;
            }

            let mut next = Vec::with_capacity(capacity);
            next.push(reading);
            next.extend(state.readings.iter().take(capacity - 1).cloned());
            state.readings = Arc::new(next);
            true
        })
    }

    /// Current buffer, newest first.
    #[must_use]
    pub fn readings(&self) -> Arc<Vec<ScoredReading>> {
        Arc::clone(&self.tx.borrow().readings)
    }

    #[must_use]
    pub fn is_simulating(&self) -> bool {
        self.tx.borrow().simulating
    }

    #[must_use]
    pub fn snapshot(&self) -> LiveSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every change of the buffer or the run flag.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LiveSnapshot> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::test_support::scored;

    #[test]
    fn caps_buffer_newest_first() {
        let feed = LiveFeed::new(50);
        let generation = feed.begin_run();

        for i in 0..120 {
            assert!(feed.push_from(generation, scored(i)));
            let readings = feed.readings();
            assert!(readings.len() <= 50);
            assert_eq!(readings[0].reading.sensor_id, i);
        }

        let readings = feed.readings();
        assert_eq!(readings.len(), 50);
        assert_eq!(readings[49].reading.sensor_id, 70);
    }

    #[test]
    fn refuses_results_from_a_closed_generation() {
        let feed = LiveFeed::new(50);
        let first = feed.begin_run();
        feed.end_run();
        assert!(!feed.push_from(first, scored(1)));

        let second = feed.begin_run();
        assert_ne!(first, second);
        assert!(!feed.push_from(first, scored(1)));
        assert!(feed.push_from(second, scored(2)));

        let readings = feed.readings();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].reading.sensor_id, 2);
    }

    #[test]
    fn refuses_results_while_stopped() {
        let feed = LiveFeed::new(50);
        assert!(!feed.is_simulating());
        assert!(!feed.push_from(feed.snapshot().generation, scored(1)));
        assert!(feed.readings().is_empty());
    }

    #[test]
    fn held_snapshot_is_unaffected_by_later_appends() {
        let feed = LiveFeed::new(3);
        let generation = feed.begin_run();
        feed.push_from(generation, scored(1));

        let held = feed.readings();
        feed.push_from(generation, scored(2));

        assert_eq!(held.len(), 1);
        assert_eq!(feed.readings().len(), 2);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let feed = LiveFeed::new(5);
        let mut rx = feed.subscribe();
        let generation = feed.begin_run();
        feed.push_from(generation, scored(9));

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert!(snapshot.simulating);
        assert_eq!(snapshot.readings.len(), 1);
    }
}

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::api::Predictor;
use crate::common::{LiveFeed, TaskHandle};
use crate::error::AppResult;
use crate::simulation::{ROSTER, ScoredReading, SimulatedReading, SimulatedSensor};

/// Periodic generator of scored sensor readings.
///
/// While running, every tick picks a roster sensor at random, synthesizes a
/// reading from its severity profile and sends it for prediction. Scored
/// results are prepended to the [`LiveFeed`]. Requests run detached from the
/// schedule, so a slow backend never delays the next tick.
pub struct Simulator<P: Predictor> {
    predictor: Arc<P>,
    feed: LiveFeed,
    roster: Arc<[SimulatedSensor]>,
    interval_ms: Arc<AtomicU64>,
    seed: Option<u64>,
    schedule: Mutex<Option<TaskHandle>>,
}

impl<P: Predictor> Simulator<P> {
    pub fn new(predictor: Arc<P>, feed: LiveFeed, interval: Duration) -> Self {
        Self {
            predictor,
            feed,
            roster: Arc::from(ROSTER.as_slice()),
            interval_ms: Arc::new(AtomicU64::new(duration_ms(interval))),
            seed: None,
            schedule: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_roster(mut self, roster: Vec<SimulatedSensor>) -> Self {
        self.roster = Arc::from(roster);
        self
    }

    /// Seed the random source of every run, for reproducible traffic.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    /// Change the tick period. A tick already scheduled keeps its original
    /// deadline; the new period applies from the following one.
    pub fn set_interval(&self, interval: Duration) {
        let ms = duration_ms(interval);
        self.interval_ms.store(ms, Ordering::Relaxed);
        tracing::info!(interval_ms = ms, "Simulation interval updated");
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock_schedule().is_some()
    }

    /// Start ticking. Returns `false` if already running.
    pub fn start(&self) -> bool {
        let mut schedule = self.lock_schedule();
        if schedule.is_some() {
            return false;
        }

        let generation = self.feed.begin_run();
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(generation)),
            None => StdRng::from_os_rng(),
        };

        let run = SimulationRun {
            predictor: Arc::clone(&self.predictor),
            feed: self.feed.clone(),
            roster: Arc::clone(&self.roster),
            interval_ms: Arc::clone(&self.interval_ms),
            generation,
        };
        *schedule = Some(TaskHandle::spawn("simulation", run.run(rng)));

        tracing::info!(
            generation,
            interval_ms = self.interval_ms.load(Ordering::Relaxed),
            sensors = self.roster.len(),
            "Simulation started"
        );
        true
    }

    /// Stop ticking. The pending tick is cancelled; results of requests
    /// still in flight are discarded when they arrive. Returns `false` if
    /// not running.
    pub fn stop(&self) -> bool {
        let Some(mut handle) = self.lock_schedule().take() else {
            return false;
        };
        handle.cancel();
        self.feed.end_run();
        tracing::info!("Simulation stopped");
        true
    }

    /// Generate and score a single reading for `sensor`, outside the
    /// schedule. The live feed is not touched.
    ///
    /// # Errors
    ///
    /// Returns the predictor's error.
    pub async fn simulate_once(&self, sensor: &SimulatedSensor) -> AppResult<ScoredReading> {
        let reading = {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            SimulatedReading::generate(sensor, &mut rng, Utc::now())
        };

        let prediction = self.predictor.predict(&reading.predict_request()).await?;
        Ok(ScoredReading::new(reading, prediction))
    }

    fn lock_schedule(&self) -> MutexGuard<'_, Option<TaskHandle>> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: Predictor> Drop for Simulator<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn duration_ms(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// State captured by one start..stop run of the schedule.
struct SimulationRun<P: Predictor> {
    predictor: Arc<P>,
    feed: LiveFeed,
    roster: Arc<[SimulatedSensor]>,
    interval_ms: Arc<AtomicU64>,
    generation: u64,
}

impl<P: Predictor> SimulationRun<P> {
    async fn run(self, mut rng: StdRng) {
        loop {
            let period = Duration::from_millis(self.interval_ms.load(Ordering::Relaxed));
            tokio::time::sleep(period).await;

            let Some(sensor) = self.roster.choose(&mut rng) else {
                tracing::warn!("Simulation roster is empty, nothing to simulate");
                return;
            };
            let reading = SimulatedReading::generate(sensor, &mut rng, Utc::now());

            tracing::debug!(
                generation = self.generation,
                sensor_id = reading.sensor_id,
                region = %reading.region_name,
                level = %sensor.level,
                "Simulation tick"
            );

            tokio::spawn(submit(
                Arc::clone(&self.predictor),
                self.feed.clone(),
                self.generation,
                reading,
            ));
        }
    }
}

async fn submit<P: Predictor>(
    predictor: Arc<P>,
    feed: LiveFeed,
    generation: u64,
    reading: SimulatedReading,
) {
    let sensor_id = reading.sensor_id;
    match predictor.predict(&reading.predict_request()).await {
        Ok(prediction) => {
            let scored = ScoredReading::new(reading, prediction);
            let aqi = scored.aqi;
            if feed.push_from(generation, scored) {
                tracing::debug!(sensor_id, aqi, "Simulated reading scored");
            } else {
                tracing::debug!(
                    sensor_id,
                    generation,
                    "Discarding result from a stopped simulation run"
                );
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, sensor_id, "Simulation error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PredictRequest, Prediction};
    use crate::error::AppError;
    use crate::simulation::SeverityLevel;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Semaphore;

    /// Scores every request as AQI 100, optionally waiting on a gate first.
    struct FakePredictor {
        calls: AtomicUsize,
        gate: Option<Semaphore>,
        fail: bool,
    }

    impl FakePredictor {
        fn immediate() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: None,
                fail: false,
            })
        }

        fn gated() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Some(Semaphore::new(0)),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: None,
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn open_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.add_permits(1_000);
            }
        }
    }

    impl Predictor for FakePredictor {
        async fn predict(&self, request: &PredictRequest) -> AppResult<Prediction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail {
                return Err(AppError::Api("HTTP 500: model unavailable".to_string()));
            }
            Ok(Prediction {
                predicted_aqi: 100.0 + f64::from(request.sensor_id),
                category: "Satisfactory".to_string(),
            })
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_fill_feed_up_to_capacity() {
        let predictor = FakePredictor::immediate();
        let feed = LiveFeed::new(50);
        let simulator = Simulator::new(Arc::clone(&predictor), feed.clone(), ms(10)).with_seed(1);

        assert!(simulator.start());
        assert!(!simulator.start());
        tokio::time::sleep(ms(1_005)).await;

        assert_eq!(predictor.calls(), 100);
        let readings = feed.readings();
        assert_eq!(readings.len(), 50);
        assert!(readings.iter().all(|r| (1..=20).contains(&r.reading.sensor_id)));
        assert!(
            readings
                .iter()
                .all(|r| r.aqi == 100.0 + f64::from(r.reading.sensor_id))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn newest_reading_is_first() {
        let predictor = FakePredictor::immediate();
        let feed = LiveFeed::new(50);
        let roster = vec![SimulatedSensor::new(7, "Nashik", SeverityLevel::Low)];
        let simulator = Simulator::new(Arc::clone(&predictor), feed.clone(), ms(100))
            .with_roster(roster)
            .with_seed(5);

        simulator.start();
        tokio::time::sleep(ms(150)).await;
        let first = feed.readings()[0].clone();

        tokio::time::sleep(ms(100)).await;
        let readings = feed.readings();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1], first);
        assert!(SeverityLevel::Low.ranges().contains(&readings[0].reading.pollutants));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_schedule() {
        let predictor = FakePredictor::immediate();
        let feed = LiveFeed::new(50);
        let simulator = Simulator::new(Arc::clone(&predictor), feed.clone(), ms(100));

        simulator.start();
        tokio::time::sleep(ms(350)).await;
        assert!(simulator.stop());
        assert!(!simulator.stop());
        assert!(!feed.is_simulating());

        let calls = predictor.calls();
        assert_eq!(calls, 3);
        tokio::time::sleep(ms(1_000)).await;
        assert_eq!(predictor.calls(), calls);
        assert_eq!(feed.readings().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_result_after_restart_is_discarded() {
        let predictor = FakePredictor::gated();
        let feed = LiveFeed::new(50);
        let simulator = Simulator::new(Arc::clone(&predictor), feed.clone(), ms(100));

        simulator.start();
        tokio::time::sleep(ms(150)).await;
        assert_eq!(predictor.calls(), 1);

        // The first run's request is still waiting on the backend.
        simulator.stop();
        simulator.start();
        predictor.open_gate();
        tokio::time::sleep(ms(10)).await;
        assert!(feed.readings().is_empty());

        // The restarted run still delivers its own results.
        tokio::time::sleep(ms(100)).await;
        assert_eq!(predictor.calls(), 2);
        assert_eq!(feed.readings().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_predictions_do_not_disturb_schedule() {
        let predictor = FakePredictor::failing();
        let feed = LiveFeed::new(50);
        let simulator = Simulator::new(Arc::clone(&predictor), feed.clone(), ms(100));

        simulator.start();
        tokio::time::sleep(ms(550)).await;

        assert_eq!(predictor.calls(), 5);
        assert!(feed.readings().is_empty());
        assert!(simulator.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_applies_from_next_reschedule() {
        let predictor = FakePredictor::immediate();
        let feed = LiveFeed::new(50);
        let simulator = Simulator::new(Arc::clone(&predictor), feed.clone(), ms(100));

        simulator.start();
        tokio::time::sleep(ms(50)).await;
        simulator.set_interval(ms(1_000));
        assert_eq!(simulator.interval(), ms(1_000));

        // The tick scheduled under the old period still fires at 100ms.
        tokio::time::sleep(ms(100)).await;
        assert_eq!(predictor.calls(), 1);

        tokio::time::sleep(ms(800)).await;
        assert_eq!(predictor.calls(), 1);

        tokio::time::sleep(ms(200)).await;
        assert_eq!(predictor.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_tears_down_schedule() {
        let predictor = FakePredictor::immediate();
        let feed = LiveFeed::new(50);
        let simulator = Simulator::new(Arc::clone(&predictor), feed.clone(), ms(100));

        simulator.start();
        tokio::time::sleep(ms(150)).await;
        drop(simulator);

        assert!(!feed.is_simulating());
        tokio::time::sleep(ms(1_000)).await;
        assert_eq!(predictor.calls(), 1);
    }

    #[tokio::test]
    async fn simulate_once_scores_without_touching_feed() {
        let predictor = FakePredictor::immediate();
        let feed = LiveFeed::new(50);
        let simulator = Simulator::new(Arc::clone(&predictor), feed.clone(), ms(100)).with_seed(9);

        let sensor = SimulatedSensor::new(4, "Pune", SeverityLevel::Moderate);
        let scored = simulator.simulate_once(&sensor).await.unwrap();

        assert_eq!(scored.reading.sensor_id, 4);
        assert_eq!(scored.aqi, 104.0);
        assert!(SeverityLevel::Moderate.ranges().contains(&scored.reading.pollutants));
        assert!(feed.readings().is_empty());
    }
}

//! Request lifecycle handlers and the simulation loop.
//!
//! One `Simulation` value owns the entire per-run state: clock and event
//! queue, file registry, access queue, and cache. Constructing a fresh
//! value per run is what isolates replications from each other; nothing
//! here is shared or global. Control flow is a single logical thread:
//! pop the next event, dispatch, schedule follow-ups, repeat until the
//! horizon.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{Admission, CacheStore, EvictionPolicy};
use crate::config::{ParameterError, SimulationParameters};
use crate::events::{Event, EventKind, EventScheduler};
use crate::queue::AccessQueue;
use crate::random::{
    SeededVariates, VariateError, VariateSource, log_normal_parameters, unit_mean_pareto_minimum,
};
use crate::registry::{FileId, FileRegistry};

/// Cap on weighted redraws when picking the next requested file. Eligible
/// files vastly outnumber in-flight ones, so hitting the cap means the
/// population is effectively saturated and the run is not meaningful.
const MAX_SELECTION_ATTEMPTS: usize = 1024;

/// Errors that can occur during a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The event queue drained before the horizon. The arrival process is
    /// self-perpetuating, so this is an invariant violation, not a normal
    /// stop.
    #[error("Event scheduler drained at t={clock}s before the horizon")]
    SchedulerExhausted {
        /// Simulated time at which the scheduler ran dry.
        clock: f64,
    },

    /// Weighted selection failed to find a not-in-flight file.
    #[error("No eligible file after {attempts} weighted draws")]
    NoEligibleFile {
        /// Number of rejected draws before giving up.
        attempts: usize,
    },

    /// An event referenced a file with no registry record.
    #[error("Event referenced unknown {file}")]
    UnknownFile {
        /// The unreferenced file.
        file: FileId,
    },

    /// The variate source failed.
    #[error("Variate source failed: {0}")]
    Variate(#[from] VariateError),

    /// Parameters failed validation before the run.
    #[error("Invalid parameters: {0}")]
    Parameters(#[from] ParameterError),
}

/// Result of one completed simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Eviction policy the run was driven with.
    pub policy: EvictionPolicy,
    /// Seed used for reproduction.
    pub seed: u64,
    /// Arithmetic mean of all completed request latencies, in seconds.
    pub mean_latency: f64,
    /// Number of requests that completed before the run ended.
    pub completed: usize,
    /// Total events dispatched.
    pub events_processed: u64,
    /// Simulated time at which the loop stopped.
    pub clock: f64,
}

impl RunReport {
    /// Generates a human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Run report (policy: {})\n", self.policy));
        summary.push_str(&format!("Seed: {}\n", self.seed));
        summary.push_str(&format!("Simulated time: {:.3}s\n", self.clock));
        summary.push_str(&format!("Events processed: {}\n", self.events_processed));
        summary.push_str(&format!("Completed requests: {}\n", self.completed));
        summary.push_str(&format!("Mean latency: {:.6}s\n", self.mean_latency));
        summary
    }
}

/// Discrete-event simulation of file retrieval through a shared access
/// link fronted by a bounded cache.
pub struct Simulation<V: VariateSource> {
    params: SimulationParameters,
    policy: EvictionPolicy,
    scheduler: EventScheduler,
    registry: FileRegistry,
    queue: AccessQueue,
    cache: CacheStore,
    variates: V,
    latencies: Vec<f64>,
    events_processed: u64,
    seed: u64,
}

impl<V: VariateSource> Simulation<V> {
    /// Creates a fresh, fully isolated run over the given variate source.
    /// `seed` is carried into the report for reproduction.
    ///
    /// # Errors
    /// - `SimulationError::Parameters` - a parameter is out of range
    pub fn new(
        policy: EvictionPolicy,
        params: &SimulationParameters,
        variates: V,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        params.validate()?;

        Ok(Self {
            params: params.clone(),
            policy,
            scheduler: EventScheduler::new(),
            registry: FileRegistry::new(),
            queue: AccessQueue::new(),
            cache: CacheStore::new(params.cache_capacity),
            variates,
            latencies: Vec::new(),
            events_processed: 0,
            seed,
        })
    }

    /// Runs until the horizon and reports the mean completed latency.
    ///
    /// The loop condition is checked against the clock before each pop, so
    /// the final dispatched event may carry a time past the horizon.
    /// Requests still in flight when the loop stops contribute no sample.
    ///
    /// # Errors
    /// - `SimulationError::SchedulerExhausted` - event queue drained early
    /// - `SimulationError::NoEligibleFile` - selection retry cap exhausted
    /// - `SimulationError::Variate` - a distribution draw failed
    pub fn run(mut self) -> Result<RunReport, SimulationError> {
        info!(
            policy = %self.policy,
            seed = self.seed,
            horizon = self.params.horizon,
            "starting simulation run"
        );

        // One request at time zero seeds the self-perpetuating arrival
        // process; the very first selection has no in-flight exclusion.
        let first = FileId::new(self.variates.draw_weighted_index() as u32);
        self.scheduler.schedule(EventKind::NewRequest, first, 0.0);

        while self.scheduler.clock() < self.params.horizon {
            let event = self
                .scheduler
                .next()
                .ok_or(SimulationError::SchedulerExhausted {
                    clock: self.scheduler.clock(),
                })?;
            self.dispatch(event)?;
            self.events_processed += 1;
        }

        let mean_latency = if self.latencies.is_empty() {
            warn!("no request completed before the horizon; reporting 0.0");
            0.0
        } else {
            self.latencies.iter().sum::<f64>() / self.latencies.len() as f64
        };

        info!(
            completed = self.latencies.len(),
            events = self.events_processed,
            mean_latency,
            "simulation run complete"
        );

        Ok(RunReport {
            policy: self.policy,
            seed: self.seed,
            mean_latency,
            completed: self.latencies.len(),
            events_processed: self.events_processed,
            clock: self.scheduler.clock(),
        })
    }

    fn dispatch(&mut self, event: Event) -> Result<(), SimulationError> {
        match event.kind {
            EventKind::NewRequest => self.handle_new_request(event.file),
            EventKind::ArriveQueue => self.handle_arrive_queue(event.file),
            EventKind::DepartQueue => self.handle_depart_queue(event.file),
            EventKind::FileReceived => self.handle_file_received(event.file),
        }
    }

    /// A client requests `file`: seed its latency with either the local
    /// cache-hit service time or a drawn propagation delay, then perpetuate
    /// the arrival process with a different, not-in-flight file.
    fn handle_new_request(&mut self, file: FileId) -> Result<(), SimulationError> {
        if !self.registry.contains(file) {
            let minimum = unit_mean_pareto_minimum(self.params.file_size_shape);
            let size_mb = self
                .variates
                .draw_pareto(self.params.file_size_shape, minimum)?;
            self.registry.insert(file, size_mb);
        }

        let record = self.record_mut(file)?;
        record.in_flight = true;
        let in_cache = record.in_cache;
        let size_mb = record.size_mb;

        if in_cache {
            let delay = size_mb / self.params.network_bandwidth;
            self.scheduler.schedule(EventKind::FileReceived, file, delay);
            self.record_mut(file)?.latency = delay;
        } else {
            let (mu, sigma) =
                log_normal_parameters(self.params.delay_mean, self.params.delay_stddev);
            let delay = self.variates.draw_log_normal(mu, sigma)?;
            self.scheduler.schedule(EventKind::ArriveQueue, file, delay);
            self.record_mut(file)?.latency = delay;
        }

        let next = self.select_eligible_file()?;
        let inter_arrival = self.variates.draw_exponential(self.params.arrival_rate)?;
        self.scheduler
            .schedule(EventKind::NewRequest, next, inter_arrival);

        Ok(())
    }

    /// A miss reaches the access-link tail. The link serves one file at a
    /// time, so only a sole occupant gets its departure scheduled here;
    /// everyone else waits for the head to depart first.
    fn handle_arrive_queue(&mut self, file: FileId) -> Result<(), SimulationError> {
        let clock = self.scheduler.clock();
        self.queue.push_back(file);

        let record = self.record_mut(file)?;
        record.queue_entered = clock;
        let size_mb = record.size_mb;

        if self.queue.len() == 1 {
            let delay = size_mb / self.params.inbound_bandwidth;
            self.scheduler.schedule(EventKind::DepartQueue, file, delay);
            self.record_mut(file)?.latency += delay;
        }

        Ok(())
    }

    /// The head finishes crossing the link: offer it to the cache, start
    /// its network transfer, and put the next queued file on the link.
    fn handle_depart_queue(&mut self, file: FileId) -> Result<(), SimulationError> {
        let clock = self.scheduler.clock();
        let size_mb = self.record_mut(file)?.size_mb;

        let admission = self.cache.admit(self.policy, file, size_mb);
        self.apply_admission(file, admission)?;

        let transfer = size_mb / self.params.network_bandwidth;
        self.scheduler
            .schedule(EventKind::FileReceived, file, transfer);
        self.record_mut(file)?.latency += transfer;

        let departed = self.queue.pop_front();
        debug_assert_eq!(departed, Some(file), "departed file was not the head");

        if let Some(head) = self.queue.head() {
            let inbound_bandwidth = self.params.inbound_bandwidth;
            let head_record = self.record_mut(head)?;
            let access = head_record.size_mb / inbound_bandwidth;
            let waited = clock - head_record.queue_entered;
            head_record.latency += access + waited;
            self.scheduler.schedule(EventKind::DepartQueue, head, access);
        }

        Ok(())
    }

    /// The file is fully received: exactly one latency sample per completed
    /// request cycle, then the file becomes requestable again.
    fn handle_file_received(&mut self, file: FileId) -> Result<(), SimulationError> {
        let record = self.record_mut(file)?;
        record.in_flight = false;
        let latency = record.latency;
        self.latencies.push(latency);
        Ok(())
    }

    /// Reconciles `in_cache` flags with the store after an admit call.
    /// Admitted first, evicted second, so a file that evicted itself ends
    /// up uncached, matching the store.
    fn apply_admission(
        &mut self,
        file: FileId,
        admission: Admission,
    ) -> Result<(), SimulationError> {
        match admission {
            Admission::Admitted { evicted } => {
                self.record_mut(file)?.in_cache = true;
                for victim in evicted {
                    self.record_mut(victim)?.in_cache = false;
                    debug!(%victim, "evicted from cache");
                }
            }
            Admission::Refreshed | Admission::Bypassed => {}
            Admission::Rejected => {
                debug!(%file, "largest-first rejected admission while full");
            }
        }
        Ok(())
    }

    /// Weighted selection of the next requested file, redrawing while the
    /// candidate has a request in flight.
    fn select_eligible_file(&mut self) -> Result<FileId, SimulationError> {
        for _ in 0..MAX_SELECTION_ATTEMPTS {
            let candidate = FileId::new(self.variates.draw_weighted_index() as u32);
            if !self.registry.is_in_flight(candidate) {
                return Ok(candidate);
            }
        }
        Err(SimulationError::NoEligibleFile {
            attempts: MAX_SELECTION_ATTEMPTS,
        })
    }

    fn record_mut(
        &mut self,
        file: FileId,
    ) -> Result<&mut crate::registry::FileRecord, SimulationError> {
        self.registry
            .get_mut(file)
            .ok_or(SimulationError::UnknownFile { file })
    }
}

/// Runs one fresh simulation and returns its full report.
///
/// # Errors
/// - `SimulationError::Parameters` - a parameter is out of range
/// - `SimulationError` - the run itself failed (see [`Simulation::run`])
pub fn run_with_report(
    policy: EvictionPolicy,
    params: &SimulationParameters,
) -> Result<RunReport, SimulationError> {
    params.validate()?;
    let variates = SeededVariates::for_run(params)?;
    let seed = variates.seed();
    Simulation::new(policy, params, variates, seed)?.run()
}

/// Simulation entry point for drivers: one isolated run, one scalar mean
/// latency.
///
/// # Errors
/// - `SimulationError` - see [`run_with_report`]
pub fn run_simulation(
    policy: EvictionPolicy,
    params: &SimulationParameters,
) -> Result<f64, SimulationError> {
    Ok(run_with_report(policy, params)?.mean_latency)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Fixed-script variate source for exercising handler arithmetic
    /// without distribution noise.
    struct ScriptedVariates {
        inter_arrivals: VecDeque<f64>,
        last_inter_arrival: f64,
        size_mb: f64,
        delay: f64,
        selections: VecDeque<usize>,
        fallback_selection: usize,
    }

    impl VariateSource for ScriptedVariates {
        fn draw_exponential(&mut self, _rate: f64) -> Result<f64, VariateError> {
            Ok(self
                .inter_arrivals
                .pop_front()
                .unwrap_or(self.last_inter_arrival))
        }

        fn draw_pareto(&mut self, _shape: f64, _minimum: f64) -> Result<f64, VariateError> {
            Ok(self.size_mb)
        }

        fn draw_log_normal(&mut self, _mu: f64, _sigma: f64) -> Result<f64, VariateError> {
            Ok(self.delay)
        }

        fn draw_weighted_index(&mut self) -> usize {
            self.selections.pop_front().unwrap_or(self.fallback_selection)
        }
    }

    fn test_params() -> SimulationParameters {
        SimulationParameters {
            horizon: 10.0,
            file_population: 8,
            inbound_bandwidth: 2.0,
            network_bandwidth: 125.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_miss_latency_breakdown() {
        let variates = ScriptedVariates {
            inter_arrivals: VecDeque::from([100.0]),
            last_inter_arrival: 100.0,
            size_mb: 2.0,
            delay: 0.5,
            selections: VecDeque::from([0, 1]),
            fallback_selection: 0,
        };

        let params = test_params();
        let report = Simulation::new(EvictionPolicy::Fifo, &params, variates, 0)
            .unwrap()
            .run()
            .unwrap();

        // propagation + sole-occupant access + network transfer
        let expected = 0.5 + 2.0 / 2.0 + 2.0 / 125.0;
        assert_eq!(report.completed, 1);
        assert!((report.mean_latency - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cache_hit_skips_queue_and_propagation() {
        // file 0 misses, completes, is cached; requested again at t=6 it
        // is served locally with only the transfer delay.
        let variates = ScriptedVariates {
            inter_arrivals: VecDeque::from([3.0, 3.0, 100.0]),
            last_inter_arrival: 100.0,
            size_mb: 2.0,
            delay: 0.5,
            selections: VecDeque::from([0, 1, 0, 2]),
            fallback_selection: 0,
        };

        let params = test_params();
        let report = Simulation::new(EvictionPolicy::Fifo, &params, variates, 0)
            .unwrap()
            .run()
            .unwrap();

        // Completions: file 0 miss, file 1 miss, file 0 hit.
        assert_eq!(report.completed, 3);
        let miss = 0.5 + 2.0 / 2.0 + 2.0 / 125.0;
        let hit = 2.0 / 125.0;
        let total = report.mean_latency * report.completed as f64;
        assert!((total - (2.0 * miss + hit)).abs() < 1e-9);
    }

    #[test]
    fn test_queued_file_pays_head_wait() {
        // Two misses 0.1s apart share the link; the second waits for the
        // head to depart and is charged the waiting time.
        let variates = ScriptedVariates {
            inter_arrivals: VecDeque::from([0.1, 100.0]),
            last_inter_arrival: 100.0,
            size_mb: 2.0,
            delay: 0.5,
            selections: VecDeque::from([0, 1, 2]),
            fallback_selection: 0,
        };

        let params = test_params();
        let report = Simulation::new(EvictionPolicy::Fifo, &params, variates, 0)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.completed, 2);
        let first = 0.5 + 1.0 + 2.0 / 125.0;
        // Second arrives at t=0.6, head departs at t=1.5: waited 0.9s,
        // then its own 1.0s access and the network transfer.
        let second = 0.5 + 0.9 + 1.0 + 2.0 / 125.0;
        let total = report.mean_latency * report.completed as f64;
        assert!((total - (first + second)).abs() < 1e-9);
    }

    #[test]
    fn test_saturated_selection_is_an_error() {
        // The only scripted candidate is file 0, which is in flight when
        // the perpetuation draw happens.
        let variates = ScriptedVariates {
            inter_arrivals: VecDeque::new(),
            last_inter_arrival: 1.0,
            size_mb: 1.0,
            delay: 0.5,
            selections: VecDeque::from([0]),
            fallback_selection: 0,
        };

        let params = test_params();
        let result = Simulation::new(EvictionPolicy::Fifo, &params, variates, 0)
            .unwrap()
            .run();

        assert!(matches!(
            result,
            Err(SimulationError::NoEligibleFile { .. })
        ));
    }

    #[test]
    fn test_invalid_parameters_rejected_before_run() {
        let params = SimulationParameters {
            network_bandwidth: -1.0,
            ..Default::default()
        };

        let result = run_simulation(EvictionPolicy::Fifo, &params);
        assert!(matches!(result, Err(SimulationError::Parameters(_))));
    }

    #[test]
    fn test_disabled_policy_never_hits() {
        // Same trace as the hit test, but with caching disabled the second
        // request for file 0 pays the full miss path again.
        let variates = ScriptedVariates {
            inter_arrivals: VecDeque::from([3.0, 3.0, 100.0]),
            last_inter_arrival: 100.0,
            size_mb: 2.0,
            delay: 0.5,
            selections: VecDeque::from([0, 1, 0, 2]),
            fallback_selection: 0,
        };

        let params = test_params();
        let report = Simulation::new(EvictionPolicy::Disabled, &params, variates, 0)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.completed, 3);
        let miss = 0.5 + 2.0 / 2.0 + 2.0 / 125.0;
        let total = report.mean_latency * report.completed as f64;
        assert!((total - 3.0 * miss).abs() < 1e-9);
    }

    #[test]
    fn test_report_summary_mentions_policy_and_seed() {
        let report = RunReport {
            policy: EvictionPolicy::RecencyBiased,
            seed: 99,
            mean_latency: 1.25,
            completed: 10,
            events_processed: 40,
            clock: 50.0,
        };

        let summary = report.summary();
        assert!(summary.contains("recency-biased"));
        assert!(summary.contains("99"));
        assert!(summary.contains("1.25"));
    }
}

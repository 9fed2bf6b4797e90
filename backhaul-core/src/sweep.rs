//! Parameter-sweep driver: repeated isolated runs across one axis.
//!
//! Each (value, policy) pair gets a completely fresh simulation — clock,
//! registry, queue, and cache — so no state leaks between replications.
//! Seeds derive deterministically from the base seed, keeping a sweep
//! reproducible while keeping runs independent.

use serde::{Deserialize, Serialize};

use crate::cache::EvictionPolicy;
use crate::config::SimulationParameters;
use crate::simulation::{SimulationError, run_simulation};

/// Sweepable parameter axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum SweepParameter {
    /// Mean file requests per second.
    ArrivalRate,
    /// Pareto shape of the file-size distribution.
    FileSizeShape,
    /// Cache storage capacity in MB.
    CacheCapacity,
    /// Institution network bandwidth in MB/s.
    NetworkBandwidth,
}

impl SweepParameter {
    /// Returns the parameter's field name for report headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepParameter::ArrivalRate => "arrival_rate",
            SweepParameter::FileSizeShape => "file_size_shape",
            SweepParameter::CacheCapacity => "cache_capacity",
            SweepParameter::NetworkBandwidth => "network_bandwidth",
        }
    }

    fn apply(&self, params: &mut SimulationParameters, value: f64) {
        match self {
            SweepParameter::ArrivalRate => params.arrival_rate = value,
            SweepParameter::FileSizeShape => params.file_size_shape = value,
            SweepParameter::CacheCapacity => params.cache_capacity = value,
            SweepParameter::NetworkBandwidth => params.network_bandwidth = value,
        }
    }
}

impl std::fmt::Display for SweepParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An arithmetic progression of values for one parameter axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// Parameter being swept.
    pub parameter: SweepParameter,
    /// First value.
    pub start: f64,
    /// Increment between consecutive values.
    pub step: f64,
    /// Number of values to visit.
    pub steps: u32,
}

impl SweepPlan {
    /// Iterates the concrete parameter values of the plan.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.steps).map(move |i| self.start + self.step * f64::from(i))
    }
}

/// Mean latency per policy at one swept value.
#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    /// The swept parameter's value for this row.
    pub value: f64,
    /// One `(policy, mean latency)` pair per requested policy.
    pub results: Vec<(EvictionPolicy, f64)>,
}

/// The policies a sweep compares by default, in column order.
pub const DEFAULT_SWEEP_POLICIES: [EvictionPolicy; 3] = [
    EvictionPolicy::RecencyBiased,
    EvictionPolicy::LargestFirst,
    EvictionPolicy::Fifo,
];

/// Runs `plan` over `base`, one fresh simulation per (value, policy).
///
/// # Errors
/// - `SimulationError` - any individual run failed; the sweep stops there
pub fn run_sweep(
    base: &SimulationParameters,
    plan: &SweepPlan,
    policies: &[EvictionPolicy],
) -> Result<Vec<SweepPoint>, SimulationError> {
    base.validate()?;

    let mut points = Vec::with_capacity(plan.steps as usize);
    let mut run_index: u64 = 0;

    for value in plan.values() {
        let mut results = Vec::with_capacity(policies.len());
        for &policy in policies {
            let mut params = base.clone();
            plan.parameter.apply(&mut params, value);
            params.seed = base.seed.map(|seed| seed.wrapping_add(run_index));
            run_index += 1;

            let mean = run_simulation(policy, &params)?;
            results.push((policy, mean));
        }
        points.push(SweepPoint { value, results });
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_base() -> SimulationParameters {
        SimulationParameters {
            horizon: 5.0,
            file_population: 2_000,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_values_are_arithmetic() {
        let plan = SweepPlan {
            parameter: SweepParameter::CacheCapacity,
            start: 20.0,
            step: 20.0,
            steps: 4,
        };

        let values: Vec<f64> = plan.values().collect();
        assert_eq!(values, vec![20.0, 40.0, 60.0, 80.0]);
    }

    #[test]
    fn test_sweep_yields_one_point_per_value() {
        let plan = SweepPlan {
            parameter: SweepParameter::ArrivalRate,
            start: 10.0,
            step: 6.0,
            steps: 3,
        };

        let points = run_sweep(&small_base(), &plan, &DEFAULT_SWEEP_POLICIES).unwrap();

        assert_eq!(points.len(), 3);
        for point in &points {
            assert_eq!(point.results.len(), 3);
            for (_, mean) in &point.results {
                assert!(mean.is_finite() && *mean >= 0.0);
            }
        }
    }

    #[test]
    fn test_seeded_sweep_is_reproducible() {
        let plan = SweepPlan {
            parameter: SweepParameter::CacheCapacity,
            start: 20.0,
            step: 40.0,
            steps: 2,
        };

        let first = run_sweep(&small_base(), &plan, &[EvictionPolicy::Fifo]).unwrap();
        let second = run_sweep(&small_base(), &plan, &[EvictionPolicy::Fifo]).unwrap();

        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.results, b.results);
        }
    }

    #[test]
    fn test_sweep_rejects_invalid_base() {
        let base = SimulationParameters {
            cache_capacity: 0.0,
            ..small_base()
        };
        let plan = SweepPlan {
            parameter: SweepParameter::ArrivalRate,
            start: 10.0,
            step: 1.0,
            steps: 1,
        };

        assert!(run_sweep(&base, &plan, &DEFAULT_SWEEP_POLICIES).is_err());
    }
}

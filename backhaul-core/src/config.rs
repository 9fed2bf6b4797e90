//! Simulation parameters and their validation.
//!
//! All tunable knobs live here with the model's reference defaults so no
//! magic numbers leak into the handlers. Times are in seconds, sizes and
//! capacities in MB, bandwidths in MB/s. Out-of-range values are a caller
//! error surfaced by [`SimulationParameters::validate`] before a run
//! starts, never mid-run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A parameter failed validation before a run.
#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    /// A rate, bandwidth, capacity, or duration must be strictly positive.
    #[error("Parameter `{name}` must be positive, got {value}")]
    NotPositive {
        /// Parameter field name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// The file-size Pareto shape must exceed 1 for the mean to be finite.
    #[error("Parameter `file_size_shape` must exceed 1 for a finite mean, got {value}")]
    InfiniteMeanFileSize {
        /// Offending shape value.
        value: f64,
    },

    /// The arrival process always requests a *different* file next, so at
    /// least two files must exist.
    #[error("Parameter `file_population` must be at least 2, got {value}")]
    PopulationTooSmall {
        /// Offending population count.
        value: u32,
    },
}

/// Recognized options for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Mean file requests per second (exponential inter-arrival rate).
    pub arrival_rate: f64,
    /// Shared inbound access-link bandwidth in MB/s.
    pub inbound_bandwidth: f64,
    /// Institution network bandwidth in MB/s; also serves cache hits.
    pub network_bandwidth: f64,
    /// Pareto shape of the file-size distribution. The minimum is derived
    /// so the mean file size is exactly 1 MB.
    pub file_size_shape: f64,
    /// Pareto shape of the per-file popularity weights.
    pub popularity_shape: f64,
    /// Pareto minimum of the per-file popularity weights.
    pub popularity_minimum: f64,
    /// Cache storage capacity in MB (a byte budget, not an item count).
    pub cache_capacity: f64,
    /// Mean of the log-normal propagation delay in seconds.
    pub delay_mean: f64,
    /// Standard deviation of the log-normal propagation delay in seconds.
    pub delay_stddev: f64,
    /// Simulated time at which the run terminates, in seconds.
    pub horizon: f64,
    /// Number of files hosted by the origin servers.
    pub file_population: u32,
    /// Seed for reproducible runs; `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            arrival_rate: 100.0,
            inbound_bandwidth: 2.0,
            network_bandwidth: 125.0,
            file_size_shape: 1.01,
            popularity_shape: 1.1,
            popularity_minimum: 0.005,
            cache_capacity: 500.0,
            delay_mean: 0.5,
            delay_stddev: 0.4,
            horizon: 1000.0,
            file_population: 100_000,
            seed: None,
        }
    }
}

impl SimulationParameters {
    /// Creates parameters sized for fast deterministic tests.
    ///
    /// The reference workload overloads the access link by design, so the
    /// population must stay large relative to `arrival_rate * horizon` or
    /// in-flight requests exhaust the eligible set.
    pub fn for_testing() -> Self {
        Self {
            horizon: 20.0,
            file_population: 5_000,
            seed: Some(42),
            ..Default::default()
        }
    }

    /// Creates parameters with environment variable overrides applied.
    ///
    /// Allows runtime control of the knobs that vary between invocations
    /// while keeping the reference defaults for the rest.
    pub fn from_env() -> Self {
        let mut params = Self::default();

        if let Ok(seed) = std::env::var("BACKHAUL_SEED") {
            if let Ok(value) = seed.parse::<u64>() {
                params.seed = Some(value);
            }
        }

        if let Ok(horizon) = std::env::var("BACKHAUL_HORIZON") {
            if let Ok(value) = horizon.parse::<f64>() {
                params.horizon = value;
            }
        }

        if let Ok(population) = std::env::var("BACKHAUL_FILE_POPULATION") {
            if let Ok(value) = population.parse::<u32>() {
                params.file_population = value;
            }
        }

        params
    }

    /// Validates every parameter, surfacing the first violation.
    ///
    /// # Errors
    /// - `ParameterError::NotPositive` - a rate, size, or duration is zero, negative, or non-finite
    /// - `ParameterError::InfiniteMeanFileSize` - `file_size_shape <= 1`
    /// - `ParameterError::PopulationTooSmall` - fewer than two files
    pub fn validate(&self) -> Result<(), ParameterError> {
        let positive = [
            ("arrival_rate", self.arrival_rate),
            ("inbound_bandwidth", self.inbound_bandwidth),
            ("network_bandwidth", self.network_bandwidth),
            ("popularity_shape", self.popularity_shape),
            ("popularity_minimum", self.popularity_minimum),
            ("cache_capacity", self.cache_capacity),
            ("delay_mean", self.delay_mean),
            ("delay_stddev", self.delay_stddev),
            ("horizon", self.horizon),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ParameterError::NotPositive { name, value });
            }
        }

        if !(self.file_size_shape > 1.0 && self.file_size_shape.is_finite()) {
            return Err(ParameterError::InfiniteMeanFileSize {
                value: self.file_size_shape,
            });
        }

        if self.file_population < 2 {
            return Err(ParameterError::PopulationTooSmall {
                value: self.file_population,
            });
        }

        Ok(())
    }
}

//! Backhaul Core - Discrete-event edge-cache latency simulation.
//!
//! Evaluates average end-to-end file-retrieval latency for a simulated
//! network service under varying traffic, bandwidth, and storage-cache
//! parameters, driven by synthetic stochastic workloads.
//!
//! # Model
//!
//! Requests arrive as a self-perpetuating Poisson process over a
//! heavy-tailed file population. A cache hit is served locally; a miss
//! pays a log-normal propagation delay, crosses a single shared
//! rate-limited access link (FIFO, one file at a time), is offered to a
//! size-bounded cache under one of the interchangeable eviction policies,
//! and finally transfers at the network bandwidth. Every completed request
//! contributes exactly one latency sample; the run's metric is the
//! arithmetic mean over all samples at the horizon.
//!
//! # Example
//!
//! ```rust
//! use backhaul_core::{EvictionPolicy, SimulationParameters, run_simulation};
//!
//! # fn main() -> Result<(), backhaul_core::SimulationError> {
//! let params = SimulationParameters {
//!     seed: Some(42),
//!     horizon: 10.0,
//!     ..SimulationParameters::for_testing()
//! };
//!
//! let mean_latency = run_simulation(EvictionPolicy::Fifo, &params)?;
//! assert!(mean_latency > 0.0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]

pub mod cache;
pub mod config;
pub mod events;
pub mod queue;
pub mod random;
pub mod registry;
pub mod simulation;
pub mod sweep;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use cache::{Admission, CacheEntry, CacheStore, EvictionPolicy};
pub use config::{ParameterError, SimulationParameters};
pub use events::{Event, EventKind, EventScheduler};
pub use queue::AccessQueue;
pub use random::{SeededVariates, VariateError, VariateSource};
pub use registry::{FileId, FileRecord, FileRegistry};
pub use simulation::{RunReport, Simulation, SimulationError, run_simulation, run_with_report};
pub use sweep::{DEFAULT_SWEEP_POLICIES, SweepParameter, SweepPlan, SweepPoint, run_sweep};

//! Alsvid Stochastic Trajectory Simulator
//!
//! Estimates the output distribution of a quantum circuit executed on noisy
//! hardware by Monte-Carlo trajectory simulation: many independent seeded runs
//! of the circuit, each probabilistically injecting decoherence events
//! (amplitude damping, phase flip, depolarizing) at gate boundaries, merged
//! into an approximate measurement distribution and recorded-property
//! estimates.
//!
//! # Design
//!
//! - **Shared-nothing runs**: every trajectory owns a private state engine
//!   (created through [`alsvid_engine::EngineFactory`]) and a private seeded
//!   generator, and writes into a disjoint per-run slot; the configuration,
//!   property list, and circuit are shared read-only. No locks in the hot
//!   loop.
//! - **Deterministic aggregates**: per-run seeds derive from the master seed
//!   before dispatch and slots merge in run-id order, so results are
//!   bit-identical for a fixed (seed, run count) pair regardless of the
//!   [`WorkerPolicy`].
//! - **Bounded-error compaction**: every `step_number` operations the engine
//!   compacts the state toward `step_fidelity`, trading accuracy for
//!   representation size; performed reductions are counted in the statistics.
//!
//! # Example
//!
//! ```rust
//! use alsvid_ir::Circuit;
//! use alsvid_stoch::{StochasticSimulator, WorkerPolicy};
//!
//! let mut simulator = StochasticSimulator::builder(Circuit::bell().unwrap())
//!     .noise_effects("APD")
//!     .error_probability(0.05)
//!     .runs(500)
//!     .seed(42)
//!     .workers(WorkerPolicy::Sequential)
//!     .build()
//!     .unwrap();
//!
//! let probabilities = simulator.stoch_simulate().unwrap();
//! let counts = simulator.simulate(1000).unwrap();
//! assert_eq!(counts.values().sum::<u64>(), 1000);
//! # drop(probabilities);
//! ```

pub mod aggregate;
pub mod error;
pub mod noise;
pub mod properties;
pub mod scheduler;
pub mod simulator;

mod perfect;
mod trajectory;

pub use aggregate::AggregateStatistics;
pub use error::{StochError, StochResult};
pub use noise::{NoiseConfig, NoiseEffect};
pub use properties::{PropertyTarget, RecordedProperty, STATE_SIZE_LABEL};
pub use scheduler::WorkerPolicy;
pub use simulator::{StochasticSimulator, StochasticSimulatorBuilder};

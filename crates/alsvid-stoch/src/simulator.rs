//! The caller-visible stochastic simulator.

use std::collections::BTreeMap;
use std::time::Instant;

use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};

use alsvid_engine::{EngineFactory, VectorEngineFactory};
use alsvid_ir::Circuit;

use crate::aggregate::{self, AggregateStatistics};
use crate::error::{StochError, StochResult};
use crate::noise::NoiseConfig;
use crate::perfect;
use crate::properties::{self, RecordedProperty};
use crate::scheduler::{self, WorkerPolicy};
use crate::trajectory::{RunSlot, SimulationContext};

/// Monte-Carlo trajectory simulator for noisy circuits.
///
/// Built through [`StochasticSimulator::builder`]; configuration is validated
/// at build time and immutable afterwards. Each simulate call runs one
/// noiseless reference pass, dispatches the configured number of stochastic
/// runs across the worker pool, and aggregates their private output slots
/// after the join barrier.
pub struct StochasticSimulator<F: EngineFactory = VectorEngineFactory> {
    circuit: Circuit,
    noise: NoiseConfig,
    properties: Vec<RecordedProperty>,
    runs: u64,
    step_number: u64,
    step_fidelity: f64,
    seed: Option<u64>,
    policy: WorkerPolicy,
    factory: F,
    stats: AggregateStatistics,
}

impl StochasticSimulator<VectorEngineFactory> {
    /// Start configuring a simulator over `circuit` with the default
    /// statevector engine.
    pub fn builder(circuit: Circuit) -> StochasticSimulatorBuilder<VectorEngineFactory> {
        StochasticSimulatorBuilder {
            circuit,
            noise_effects: "APD".to_string(),
            error_probability: 0.001,
            amp_damping: None,
            multi_qubit_factor: 2.0,
            runs: 1000,
            step_number: 0,
            step_fidelity: 1.0,
            record_properties: None,
            seed: None,
            policy: WorkerPolicy::Auto,
            factory: VectorEngineFactory,
        }
    }
}

impl<F: EngineFactory> StochasticSimulator<F> {
    /// Estimate the output distribution as integer shot counts.
    ///
    /// The merged per-run distribution is rescaled so the counts sum to
    /// exactly `shots`.
    #[instrument(skip(self), fields(circuit = self.circuit.name()))]
    pub fn simulate(&mut self, shots: u64) -> StochResult<FxHashMap<String, u64>> {
        let slots = self.run_all()?;
        let counts = aggregate::merge_counts(&slots);
        Ok(aggregate::rescale_counts(&counts, shots))
    }

    /// Estimate the recorded properties as floating-point values.
    ///
    /// Returns one entry per recorded property, keyed by its label (basis
    /// bitstrings, or `state_size` for the sentinel), each the mean of the
    /// per-run samples. No shot resampling is involved.
    #[instrument(skip(self), fields(circuit = self.circuit.name()))]
    pub fn stoch_simulate(&mut self) -> StochResult<FxHashMap<String, f64>> {
        let slots = self.run_all()?;
        let means = aggregate::property_means(&slots, self.properties.len());
        Ok(self
            .properties
            .iter()
            .zip(means)
            .map(|(property, mean)| (property.label.clone(), mean))
            .collect())
    }

    /// Timing and bookkeeping of the last simulate call, string-encoded.
    pub fn additional_statistics(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("step_fidelity".to_string(), self.step_fidelity.to_string()),
            (
                "approximation_runs".to_string(),
                self.stats.approximation_runs.to_string(),
            ),
            (
                "perfect_run_time".to_string(),
                self.stats.perfect_run_time.to_string(),
            ),
            (
                "stoch_wall_time".to_string(),
                self.stats.stoch_wall_time.to_string(),
            ),
            (
                "mean_stoch_run_time".to_string(),
                self.stats.mean_stoch_run_time.to_string(),
            ),
            (
                "parallel_instances".to_string(),
                self.stats.parallel_instances.to_string(),
            ),
        ])
    }

    /// Statistics of the last simulate call.
    pub fn statistics(&self) -> &AggregateStatistics {
        &self.stats
    }

    /// Number of qubits in the circuit.
    pub fn num_qubits(&self) -> usize {
        self.circuit.num_qubits()
    }

    /// Number of operations in the circuit.
    pub fn num_ops(&self) -> usize {
        self.circuit.num_ops()
    }

    /// Display name: enabled effect codes plus the circuit name.
    pub fn name(&self) -> String {
        format!("stoch_{}_{}", self.noise.descriptor(), self.circuit.name())
    }

    /// Reference pass, dispatch, barrier; slots come back in run-id order.
    fn run_all(&mut self) -> StochResult<Vec<RunSlot>> {
        self.stats = AggregateStatistics::default();

        let perfect_run = perfect::estimate(&self.circuit, &self.properties, &self.factory)?;
        self.stats.perfect_run_time = perfect_run.as_secs_f64();

        // One seed per run id, drawn before dispatch: the aggregate depends
        // only on (master seed, run count), not on scheduling.
        let master_seed = self.seed.unwrap_or_else(rand::random);
        let mut master_rng = StdRng::seed_from_u64(master_seed);
        let seeds: Vec<u64> = (0..self.runs).map(|_| master_rng.next_u64()).collect();

        let mut slots: Vec<RunSlot> = (0..self.runs)
            .map(|_| RunSlot::new(self.properties.len()))
            .collect();
        let ctx = SimulationContext {
            circuit: &self.circuit,
            noise: &self.noise,
            properties: &self.properties,
            step_number: self.step_number,
            step_fidelity: self.step_fidelity,
            factory: &self.factory,
        };

        let start = Instant::now();
        let workers = scheduler::dispatch(&ctx, self.policy, &seeds, &mut slots)?;
        self.stats.stoch_wall_time = start.elapsed().as_secs_f64();
        self.stats.parallel_instances = workers;
        self.stats.approximation_runs = slots.iter().map(|slot| slot.approximations).sum();
        self.stats.mean_stoch_run_time = slots
            .iter()
            .map(|slot| slot.duration.as_secs_f64())
            .sum::<f64>()
            / self.runs as f64;

        debug!(
            runs = self.runs,
            workers,
            wall_time = self.stats.stoch_wall_time,
            "stochastic phase finished"
        );
        Ok(slots)
    }
}

/// Builder collecting the configuration surface of a stochastic simulation.
///
/// Defaults: effects `APD`, gate error probability `0.001`, amplitude
/// damping `2p`, multi-qubit factor `2`, 1000 runs, compaction disabled
/// (`step_number = 0`), all basis states recorded, OS-entropy master seed,
/// [`WorkerPolicy::Auto`].
pub struct StochasticSimulatorBuilder<F: EngineFactory = VectorEngineFactory> {
    circuit: Circuit,
    noise_effects: String,
    error_probability: f64,
    amp_damping: Option<f64>,
    multi_qubit_factor: f64,
    runs: i64,
    step_number: u64,
    step_fidelity: f64,
    record_properties: Option<String>,
    seed: Option<u64>,
    policy: WorkerPolicy,
    factory: F,
}

impl<F: EngineFactory> StochasticSimulatorBuilder<F> {
    /// Enabled noise effects as `A`/`P`/`D` codes.
    #[must_use]
    pub fn noise_effects(mut self, descriptor: impl Into<String>) -> Self {
        self.noise_effects = descriptor.into();
        self
    }

    /// Gate error probability for single-qubit gates.
    #[must_use]
    pub fn error_probability(mut self, probability: f64) -> Self {
        self.error_probability = probability;
        self
    }

    /// Amplitude-damping probability override (default `2p`).
    #[must_use]
    pub fn amplitude_damping_probability(mut self, probability: f64) -> Self {
        self.amp_damping = Some(probability);
        self
    }

    /// Error-scale factor for gates touching more than one qubit.
    #[must_use]
    pub fn multi_qubit_factor(mut self, factor: f64) -> Self {
        self.multi_qubit_factor = factor;
        self
    }

    /// Number of stochastic runs; must be positive.
    #[must_use]
    pub fn runs(mut self, runs: i64) -> Self {
        self.runs = runs;
        self
    }

    /// Compaction cadence: every `step_number` operations, compact toward
    /// `step_fidelity`. A step number of 0 disables compaction.
    #[must_use]
    pub fn approximation(mut self, step_number: u64, step_fidelity: f64) -> Self {
        self.step_number = step_number;
        self.step_fidelity = step_fidelity;
        self
    }

    /// Recorded-property descriptor (default: all basis states).
    #[must_use]
    pub fn record_properties(mut self, descriptor: impl Into<String>) -> Self {
        self.record_properties = Some(descriptor.into());
        self
    }

    /// Master seed for reproducible aggregates.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Worker-pool policy.
    #[must_use]
    pub fn workers(mut self, policy: WorkerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Swap in a different state-engine factory.
    #[must_use]
    pub fn engine<G: EngineFactory>(self, factory: G) -> StochasticSimulatorBuilder<G> {
        StochasticSimulatorBuilder {
            circuit: self.circuit,
            noise_effects: self.noise_effects,
            error_probability: self.error_probability,
            amp_damping: self.amp_damping,
            multi_qubit_factor: self.multi_qubit_factor,
            runs: self.runs,
            step_number: self.step_number,
            step_fidelity: self.step_fidelity,
            record_properties: self.record_properties,
            seed: self.seed,
            policy: self.policy,
            factory,
        }
    }

    /// Validate the configuration and produce an immutable simulator.
    pub fn build(self) -> StochResult<StochasticSimulator<F>> {
        let noise = NoiseConfig::new(
            &self.noise_effects,
            self.error_probability,
            self.amp_damping,
            self.multi_qubit_factor,
        )?;
        if self.runs <= 0 {
            return Err(StochError::InvalidRunCount(self.runs));
        }
        let num_qubits = self.circuit.num_qubits();
        let recorded = match &self.record_properties {
            Some(descriptor) => properties::parse(descriptor, num_qubits)?,
            None => properties::all_basis_states(num_qubits),
        };

        Ok(StochasticSimulator {
            circuit: self.circuit,
            noise,
            properties: recorded,
            runs: self.runs as u64,
            step_number: self.step_number,
            step_fidelity: self.step_fidelity,
            seed: self.seed,
            policy: self.policy,
            factory: self.factory,
            stats: AggregateStatistics {
                parallel_instances: self.policy.worker_count(),
                ..AggregateStatistics::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bell_builder() -> StochasticSimulatorBuilder<VectorEngineFactory> {
        StochasticSimulator::builder(Circuit::bell().unwrap())
    }

    #[test]
    fn test_run_count_validation() {
        assert!(matches!(
            bell_builder().runs(0).build(),
            Err(StochError::InvalidRunCount(0))
        ));
        assert!(matches!(
            bell_builder().runs(-5).build(),
            Err(StochError::InvalidRunCount(-5))
        ));
        assert!(bell_builder().runs(1).build().is_ok());
    }

    #[test]
    fn test_effect_descriptor_validation() {
        assert!(bell_builder().noise_effects("APD").build().is_ok());
        assert!(matches!(
            bell_builder().noise_effects("X").build(),
            Err(StochError::UnknownNoiseEffect('X'))
        ));
    }

    #[test]
    fn test_display_name() {
        let sim = bell_builder().noise_effects("AP").build().unwrap();
        assert_eq!(sim.name(), "stoch_AP_bell");
        assert_eq!(sim.num_qubits(), 2);
        assert_eq!(sim.num_ops(), 4);
    }

    #[test]
    fn test_statistics_before_any_run() {
        let sim = bell_builder().approximation(10, 0.995).build().unwrap();
        let stats = sim.additional_statistics();
        assert_eq!(stats["step_fidelity"], "0.995");
        assert_eq!(stats["approximation_runs"], "0");
        assert!(stats.contains_key("parallel_instances"));
    }

    #[test]
    fn test_malformed_property_descriptor_fails_build() {
        assert!(matches!(
            bell_builder().record_properties("0-").build(),
            Err(StochError::InvalidPropertyDescriptor(_))
        ));
    }
}

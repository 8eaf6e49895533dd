//! Single stochastic trajectory execution.
//!
//! A trajectory owns a private engine and a private generator; it never
//! communicates with other trajectories and writes only into its own
//! [`RunSlot`]. The run proceeds gate by gate: apply, draw noise for every
//! touched qubit, compact on cadence, then record properties and sample a
//! classical outcome at circuit end.

use std::time::{Duration, Instant};

use rand::Rng;
use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;

use alsvid_engine::vector::{pauli_x, pauli_y, pauli_z};
use alsvid_engine::{EngineFactory, StateEngine};
use alsvid_ir::{Circuit, QubitId};

use crate::error::StochResult;
use crate::noise::{NoiseConfig, NoiseEffect};
use crate::properties::{PropertyTarget, RecordedProperty};

/// Read-only inputs shared by every trajectory of one simulate call.
pub(crate) struct SimulationContext<'a, F: EngineFactory> {
    pub circuit: &'a Circuit,
    pub noise: &'a NoiseConfig,
    pub properties: &'a [RecordedProperty],
    /// Compaction cadence in operations; 0 disables compaction.
    pub step_number: u64,
    pub step_fidelity: f64,
    pub factory: &'a F,
}

/// Private output slot of one run, pre-sized before dispatch.
#[derive(Debug)]
pub(crate) struct RunSlot {
    /// Classical outcome accumulator; exactly one entry after the run.
    pub counts: FxHashMap<String, u64>,
    /// Property samples aligned to the request list.
    pub properties: Vec<f64>,
    /// Compactions that actually reduced the state.
    pub approximations: u64,
    /// Wall time of the run.
    pub duration: Duration,
}

impl RunSlot {
    pub fn new(num_properties: usize) -> Self {
        Self {
            counts: FxHashMap::default(),
            properties: vec![0.0; num_properties],
            approximations: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Execute one stochastic run seeded with `local_seed`, filling `slot`.
pub(crate) fn run<F: EngineFactory>(
    ctx: &SimulationContext<'_, F>,
    local_seed: u64,
    slot: &mut RunSlot,
) -> StochResult<()> {
    let start = Instant::now();
    let num_qubits = ctx.circuit.num_qubits();
    let mut engine = ctx.factory.new_engine(num_qubits);
    let mut rng = StdRng::seed_from_u64(local_seed);
    let unit = Uniform::from(0.0..1.0);

    let mut op_count: u64 = 0;
    for instruction in ctx.circuit.instructions() {
        if !instruction.is_gate() {
            continue;
        }
        engine.apply(instruction)?;

        let multi_qubit = instruction.qubits.len() > 1;
        for &qubit in &instruction.qubits {
            inject_noise(ctx.noise, &mut engine, &mut rng, &unit, qubit, multi_qubit)?;
        }

        op_count += 1;
        if ctx.step_number > 0
            && op_count % ctx.step_number == 0
            && engine.compact(ctx.step_fidelity)
        {
            slot.approximations += 1;
        }
    }

    // Record properties before sampling collapses the state.
    for (value, property) in slot.properties.iter_mut().zip(ctx.properties) {
        *value = match property.target {
            PropertyTarget::Basis(basis) => engine.basis_probability(basis)?,
            PropertyTarget::StateSize => engine.size_metric(),
        };
    }

    // Classical sampling: ascending qubit order, project as we go.
    let mut outcome = String::with_capacity(num_qubits);
    for index in 0..num_qubits {
        let qubit = QubitId::from(index);
        let one_probability = engine.one_probability(qubit)?;
        let bit = unit.sample(&mut rng) < one_probability;
        engine.project(qubit, bit)?;
        outcome.push(if bit { '1' } else { '0' });
    }
    *slot.counts.entry(outcome).or_insert(0) += 1;

    slot.duration = start.elapsed();
    Ok(())
}

/// Draw and, when an event fires, apply one noise operation on `qubit`.
///
/// Gates touching more than one qubit draw with the scaled multi-qubit error
/// probability and use the multi-qubit damping branches. When no event fires
/// the identity would apply; it is skipped since the operation counter
/// advances per gate, not per injected matrix.
fn inject_noise<E: StateEngine>(
    noise: &NoiseConfig,
    engine: &mut E,
    rng: &mut StdRng,
    unit: &Uniform<f64>,
    qubit: QubitId,
    multi_qubit: bool,
) -> StochResult<()> {
    let effects = noise.effects();
    if effects.is_empty() {
        return Ok(());
    }
    if unit.sample(rng) >= noise.gate_error_probability(multi_qubit) {
        return Ok(());
    }

    let effect = effects[rng.gen_range(0..effects.len())];
    match effect {
        NoiseEffect::AmplitudeDamping => {
            let occurred = unit.sample(rng) < noise.damping_probability(multi_qubit);
            let applied = occurred
                && engine.apply_branch(noise.damping_occurred(multi_qubit), qubit)?;
            if !applied {
                // Either the absent branch was drawn, or the occurred branch
                // carries no weight (qubit has no |1⟩ component).
                engine.apply_branch(noise.damping_absent(multi_qubit), qubit)?;
            }
        }
        NoiseEffect::PhaseFlip => {
            engine.apply_branch(&pauli_z(), qubit)?;
        }
        NoiseEffect::Depolarizing => {
            let pauli = match rng.gen_range(0..3) {
                0 => pauli_x(),
                1 => pauli_y(),
                _ => pauli_z(),
            };
            engine.apply_branch(&pauli, qubit)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_engine::VectorEngineFactory;
    use crate::properties;

    fn context<'a>(
        circuit: &'a Circuit,
        noise: &'a NoiseConfig,
        props: &'a [RecordedProperty],
        factory: &'a VectorEngineFactory,
    ) -> SimulationContext<'a, VectorEngineFactory> {
        SimulationContext {
            circuit,
            noise,
            properties: props,
            step_number: 0,
            step_fidelity: 1.0,
            factory,
        }
    }

    #[test]
    fn test_noiseless_run_records_exact_probabilities() {
        let circuit = Circuit::bell().unwrap();
        let noise = NoiseConfig::new("APD", 0.0, Some(0.0), 2.0).unwrap();
        let props = properties::all_basis_states(2);
        let factory = VectorEngineFactory;
        let ctx = context(&circuit, &noise, &props, &factory);

        let mut slot = RunSlot::new(props.len());
        run(&ctx, 7, &mut slot).unwrap();

        assert!((slot.properties[0] - 0.5).abs() < 1e-12);
        assert_eq!(slot.properties[1], 0.0);
        assert_eq!(slot.properties[2], 0.0);
        assert!((slot.properties[3] - 0.5).abs() < 1e-12);

        // Exactly one sampled outcome, and it is a Bell outcome.
        assert_eq!(slot.counts.len(), 1);
        let (bitstring, count) = slot.counts.iter().next().unwrap();
        assert_eq!(*count, 1);
        assert!(bitstring == "00" || bitstring == "11");
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let circuit = Circuit::ghz(3).unwrap();
        let noise = NoiseConfig::new("APD", 0.2, None, 2.0).unwrap();
        let props = properties::all_basis_states(3);
        let factory = VectorEngineFactory;
        let ctx = context(&circuit, &noise, &props, &factory);

        let mut first = RunSlot::new(props.len());
        let mut second = RunSlot::new(props.len());
        run(&ctx, 99, &mut first).unwrap();
        run(&ctx, 99, &mut second).unwrap();

        assert_eq!(first.counts, second.counts);
        assert_eq!(first.properties, second.properties);
    }

    #[test]
    fn test_compaction_cadence_counts_reductions() {
        let mut circuit = Circuit::with_size("tilt", 2, 0);
        circuit.ry(0.1, QubitId(0)).unwrap().ry(0.1, QubitId(1)).unwrap();
        let noise = NoiseConfig::new("APD", 0.0, Some(0.0), 2.0).unwrap();
        let props: [RecordedProperty; 0] = [];
        let factory = VectorEngineFactory;
        let mut ctx = context(&circuit, &noise, &props, &factory);
        ctx.step_number = 1;
        ctx.step_fidelity = 0.99;

        let mut slot = RunSlot::new(0);
        run(&ctx, 1, &mut slot).unwrap();
        // Each small rotation leaves ~0.0025 of prunable mass.
        assert!(slot.approximations >= 1);
    }
}

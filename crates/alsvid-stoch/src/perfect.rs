//! Noiseless reference pass.

use std::time::{Duration, Instant};

use alsvid_engine::{EngineFactory, StateEngine};
use alsvid_ir::Circuit;
use tracing::debug;

use crate::error::StochResult;
use crate::properties::{self, RecordedProperty};

/// Execute the circuit once with no noise.
///
/// Establishes the timing baseline for the stochastic phase and validates
/// every recorded-property request against the circuit's register before any
/// worker is dispatched.
pub(crate) fn estimate<F: EngineFactory>(
    circuit: &Circuit,
    requests: &[RecordedProperty],
    factory: &F,
) -> StochResult<Duration> {
    properties::validate(requests, circuit.num_qubits())?;

    let start = Instant::now();
    let mut engine = factory.new_engine(circuit.num_qubits());
    for instruction in circuit.instructions() {
        engine.apply(instruction)?;
    }
    let elapsed = start.elapsed();
    debug!(
        ops = circuit.num_ops(),
        elapsed_us = elapsed.as_micros() as u64,
        "perfect reference run finished"
    );
    Ok(elapsed)
}

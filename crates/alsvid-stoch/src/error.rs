//! Error types for the stochastic simulator.

use alsvid_engine::EngineError;
use thiserror::Error;

/// Errors that can occur while configuring or running a stochastic simulation.
///
/// Every configuration variant surfaces before any trajectory is dispatched;
/// `Engine` escalates a worker-side engine failure, which fails the whole
/// simulate call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StochError {
    /// Noise-effect descriptor contained an unrecognized character.
    #[error("Unknown noise effect '{0}'")]
    UnknownNoiseEffect(char),

    /// Run count must be positive.
    #[error("Number of stochastic runs must be larger than 0. Provided value: {0}")]
    InvalidRunCount(i64),

    /// Probability combination out of range.
    #[error(
        "Error probabilities are faulty!\n single qubit error probability: {single_prob} \
         multi qubit error probability: {multi_prob}\n single qubit amplitude damping \
         probability: {single_damping} multi qubit amplitude damping probability: {multi_damping}"
    )]
    InvalidProbabilities {
        /// Single-qubit gate error probability.
        single_prob: f64,
        /// Derived multi-qubit gate error probability.
        multi_prob: f64,
        /// Single-qubit amplitude-damping probability.
        single_damping: f64,
        /// Derived multi-qubit amplitude-damping probability.
        multi_damping: f64,
    },

    /// Malformed recorded-property descriptor.
    #[error("Invalid recorded-property descriptor: {0}")]
    InvalidPropertyDescriptor(String),

    /// Recorded-property target does not fit the circuit's register.
    #[error("Recorded property {basis} out of range for {num_qubits}-qubit circuit")]
    PropertyOutOfRange {
        /// The requested basis-state index.
        basis: usize,
        /// The circuit's qubit count.
        num_qubits: usize,
    },

    /// Engine failure inside a trajectory.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Result type for stochastic-simulation operations.
pub type StochResult<T> = Result<T, StochError>;

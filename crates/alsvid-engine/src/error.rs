//! Error types for the engine crate.

use alsvid_ir::QubitId;
use thiserror::Error;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Qubit index outside the engine's register.
    #[error("Qubit {qubit} out of range for {num_qubits}-qubit state")]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// The engine's register size.
        num_qubits: usize,
    },

    /// Basis-state index outside the state space.
    #[error("Basis state {basis} out of range for {num_qubits}-qubit state")]
    BasisOutOfRange {
        /// The offending basis-state index.
        basis: usize,
        /// The engine's register size.
        num_qubits: usize,
    },

    /// An operation left the state with no probability mass.
    #[error("State norm vanished while operating on qubit {qubit}")]
    VanishingNorm {
        /// The qubit being operated on.
        qubit: QubitId,
    },

    /// Gate not supported by this engine.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

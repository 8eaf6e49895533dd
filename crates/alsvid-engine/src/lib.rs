//! Alsvid State Engine
//!
//! This crate defines the contract between the Alsvid simulators and the
//! backing quantum-state representation, plus a dense statevector engine that
//! fulfils it.
//!
//! The stochastic simulator never touches amplitudes directly: every state
//! manipulation goes through [`StateEngine`], so a compressed representation
//! (e.g. a decision-diagram package) can be swapped in behind the same seam.
//! Each trajectory owns exactly one engine instance, created through an
//! [`EngineFactory`] shared across worker threads; engine resources are
//! reclaimed when the instance is dropped.
//!
//! # Example
//!
//! ```rust
//! use alsvid_engine::{EngineFactory, StateEngine, VectorEngineFactory};
//! use alsvid_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell", 2, 0);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//!
//! let mut engine = VectorEngineFactory.new_engine(2);
//! for inst in circuit.instructions() {
//!     engine.apply(inst).unwrap();
//! }
//!
//! // Bell state: P(q0 = 1) = 0.5, P(|11⟩) = 0.5
//! assert!((engine.one_probability(QubitId(0)).unwrap() - 0.5).abs() < 1e-12);
//! assert!((engine.basis_probability(3).unwrap() - 0.5).abs() < 1e-12);
//! ```

pub mod error;
pub mod vector;

pub use error::{EngineError, EngineResult};
pub use vector::{VectorEngine, VectorEngineFactory};

use alsvid_ir::{Instruction, QubitId};
use num_complex::Complex64;

/// A 2×2 complex matrix, row-major.
///
/// Used both for single-qubit gate matrices and for noise-channel branch
/// matrices, which need not be unitary.
pub type Matrix2 = [[Complex64; 2]; 2];

/// The 2×2 identity matrix.
pub const MATRIX2_ID: Matrix2 = [
    [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
    [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)],
];

/// Operations a quantum-state representation must support.
///
/// An engine holds one state, initialized to the all-zero basis state at
/// construction. All probabilities refer to the computational basis.
pub trait StateEngine {
    /// Number of qubits in the state.
    fn num_qubits(&self) -> usize;

    /// Apply a circuit instruction to the state.
    ///
    /// Measure and barrier instructions leave the state untouched; the
    /// simulator performs measurement through [`StateEngine::project`].
    fn apply(&mut self, instruction: &Instruction) -> EngineResult<()>;

    /// Apply a 2×2 channel-branch matrix to `target` and renormalize.
    ///
    /// The matrix may be non-unitary. Returns `Ok(false)` and leaves the
    /// state unchanged when the branch carries no weight in the current state
    /// (its image has vanishing norm); `Ok(true)` when it was applied.
    fn apply_branch(&mut self, matrix: &Matrix2, target: QubitId) -> EngineResult<bool>;

    /// Probability of measuring `qubit` as `1`.
    fn one_probability(&self, qubit: QubitId) -> EngineResult<f64>;

    /// Probability of measuring the whole register in basis state `basis`.
    fn basis_probability(&self, basis: usize) -> EngineResult<f64>;

    /// Project `qubit` onto a measured `outcome` and renormalize.
    fn project(&mut self, qubit: QubitId, outcome: bool) -> EngineResult<()>;

    /// Compact the representation, keeping fidelity at least `target_fidelity`.
    ///
    /// Returns whether any reduction was actually performed.
    fn compact(&mut self, target_fidelity: f64) -> bool;

    /// Engine-specific measure of representation size (nonzero amplitudes for
    /// dense vectors, node count for graph-based engines).
    fn size_metric(&self) -> f64;
}

/// Creates one engine per trajectory worker.
///
/// The factory is shared by reference across worker threads; the engines it
/// creates are thread-private.
pub trait EngineFactory: Sync {
    /// The engine type produced.
    type Engine: StateEngine;

    /// Create an engine holding the all-zero state over `num_qubits` qubits.
    fn new_engine(&self, num_qubits: usize) -> Self::Engine;
}

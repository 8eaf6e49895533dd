//! Alsvid Circuit Representation
//!
//! This crate provides the data structures for representing quantum circuits
//! consumed by the Alsvid simulators: an ordered instruction sequence over a
//! fixed set of standard gates, with a fluent builder API.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`] for addressing
//!   quantum and classical registers
//! - **Gates**: [`StandardGate`] for built-in gates (H, X, CX, etc.) with
//!   concrete rotation angles
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **Circuit**: [`Circuit`] high-level builder API over the ordered sequence
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use alsvid_ir::{Circuit, QubitId};
//!
//! // Create a new circuit with 2 qubits and 2 classical bits
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//!
//! // Build the Bell state: |00⟩ → (|00⟩ + |11⟩)/√2
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//!
//! // Add measurement
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.num_ops(), 3); // H, CX, measure
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{Instruction, InstructionKind};
pub use qubit::{ClbitId, QubitId};

//! Dense statevector engine.

use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

use alsvid_ir::{Instruction, InstructionKind, QubitId, StandardGate};

use crate::error::{EngineError, EngineResult};
use crate::{EngineFactory, Matrix2, StateEngine};

/// Norm-squared below which a state is treated as annihilated.
const NORM_TOLERANCE: f64 = 1e-12;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// The Pauli-X matrix.
pub fn pauli_x() -> Matrix2 {
    [[ZERO, ONE], [ONE, ZERO]]
}

/// The Pauli-Y matrix.
pub fn pauli_y() -> Matrix2 {
    [
        [ZERO, Complex64::new(0.0, -1.0)],
        [Complex64::new(0.0, 1.0), ZERO],
    ]
}

/// The Pauli-Z matrix.
pub fn pauli_z() -> Matrix2 {
    [[ONE, ZERO], [ZERO, Complex64::new(-1.0, 0.0)]]
}

fn hadamard() -> Matrix2 {
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    [[h, h], [h, -h]]
}

fn phase(theta: f64) -> Matrix2 {
    [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, theta)]]
}

fn rx(theta: f64) -> Matrix2 {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new(0.0, -(theta / 2.0).sin());
    [[c, s], [s, c]]
}

fn ry(theta: f64) -> Matrix2 {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new((theta / 2.0).sin(), 0.0);
    [[c, -s], [s, c]]
}

fn rz(theta: f64) -> Matrix2 {
    [
        [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, theta / 2.0)],
    ]
}

fn sqrt_x() -> Matrix2 {
    let p = Complex64::new(0.5, 0.5);
    let m = Complex64::new(0.5, -0.5);
    [[p, m], [m, p]]
}

fn sqrt_x_dg() -> Matrix2 {
    let p = Complex64::new(0.5, 0.5);
    let m = Complex64::new(0.5, -0.5);
    [[m, p], [p, m]]
}

fn u3(theta: f64, phi: f64, lambda: f64) -> Matrix2 {
    let c = (theta / 2.0).cos();
    let s = (theta / 2.0).sin();
    [
        [
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
        ],
        [
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        ],
    ]
}

/// Matrix of a single-qubit standard gate, `None` for multi-qubit gates.
fn single_qubit_matrix(gate: &StandardGate) -> Option<Matrix2> {
    use std::f64::consts::PI;
    match *gate {
        StandardGate::I => Some(crate::MATRIX2_ID),
        StandardGate::X => Some(pauli_x()),
        StandardGate::Y => Some(pauli_y()),
        StandardGate::Z => Some(pauli_z()),
        StandardGate::H => Some(hadamard()),
        StandardGate::S => Some(phase(PI / 2.0)),
        StandardGate::Sdg => Some(phase(-PI / 2.0)),
        StandardGate::T => Some(phase(PI / 4.0)),
        StandardGate::Tdg => Some(phase(-PI / 4.0)),
        StandardGate::SX => Some(sqrt_x()),
        StandardGate::SXdg => Some(sqrt_x_dg()),
        StandardGate::Rx(theta) => Some(rx(theta)),
        StandardGate::Ry(theta) => Some(ry(theta)),
        StandardGate::Rz(theta) => Some(rz(theta)),
        StandardGate::P(theta) => Some(phase(theta)),
        StandardGate::U(theta, phi, lambda) => Some(u3(theta, phi, lambda)),
        _ => None,
    }
}

/// A dense statevector implementing the [`StateEngine`] contract.
///
/// Every standard gate lowers to one (possibly controlled) 2×2 matrix
/// application or a swap permutation, so gate application and noise-branch
/// application share the same amplitude traversal.
pub struct VectorEngine {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl VectorEngine {
    /// Create an engine initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![ZERO; size];
        amplitudes[0] = ONE;
        Self {
            amplitudes,
            num_qubits,
        }
    }

    fn check_qubit(&self, qubit: QubitId) -> EngineResult<()> {
        if qubit.index() >= self.num_qubits {
            return Err(EngineError::QubitOutOfRange {
                qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    /// Apply a 2×2 matrix to `target`, restricted to states where every bit
    /// in `control_mask` is set.
    fn apply_controlled(&mut self, m: &Matrix2, control_mask: usize, target: usize) {
        let t_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if i & t_mask == 0 && i & control_mask == control_mask {
                let j = i | t_mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m[0][0] * a + m[0][1] * b;
                self.amplitudes[j] = m[1][0] * a + m[1][1] * b;
            }
        }
    }

    /// Exchange the `q1` and `q2` bits, restricted to `control_mask`.
    fn apply_swap(&mut self, control_mask: usize, q1: usize, q2: usize) {
        let m1 = 1 << q1;
        let m2 = 1 << q2;
        for i in 0..self.amplitudes.len() {
            if i & m1 != 0 && i & m2 == 0 && i & control_mask == control_mask {
                let j = (i & !m1) | m2;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_iswap(&mut self, q1: usize, q2: usize) {
        let m1 = 1 << q1;
        let m2 = 1 << q2;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..self.amplitudes.len() {
            if i & m1 != 0 && i & m2 == 0 {
                let j = (i & !m1) | m2;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    fn scale(&mut self, factor: f64) {
        for amp in &mut self.amplitudes {
            *amp *= factor;
        }
    }
}

impl StateEngine for VectorEngine {
    fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    fn apply(&mut self, instruction: &Instruction) -> EngineResult<()> {
        let InstructionKind::Gate(gate) = &instruction.kind else {
            // Measure/barrier do not modify the state here.
            return Ok(());
        };
        for &qubit in &instruction.qubits {
            self.check_qubit(qubit)?;
        }
        let q: Vec<usize> = instruction.qubits.iter().map(|q| q.index()).collect();

        if let Some(m) = single_qubit_matrix(gate) {
            self.apply_controlled(&m, 0, q[0]);
            return Ok(());
        }
        match *gate {
            StandardGate::CX => self.apply_controlled(&pauli_x(), 1 << q[0], q[1]),
            StandardGate::CY => self.apply_controlled(&pauli_y(), 1 << q[0], q[1]),
            StandardGate::CZ => self.apply_controlled(&pauli_z(), 1 << q[0], q[1]),
            StandardGate::CH => self.apply_controlled(&hadamard(), 1 << q[0], q[1]),
            StandardGate::CRz(theta) => self.apply_controlled(&rz(theta), 1 << q[0], q[1]),
            StandardGate::CP(theta) => self.apply_controlled(&phase(theta), 1 << q[0], q[1]),
            StandardGate::Swap => self.apply_swap(0, q[0], q[1]),
            StandardGate::ISwap => self.apply_iswap(q[0], q[1]),
            StandardGate::CCX => {
                self.apply_controlled(&pauli_x(), (1 << q[0]) | (1 << q[1]), q[2]);
            }
            StandardGate::CSwap => self.apply_swap(1 << q[0], q[1], q[2]),
            _ => return Err(EngineError::Unsupported(gate.name().to_string())),
        }
        Ok(())
    }

    fn apply_branch(&mut self, matrix: &Matrix2, target: QubitId) -> EngineResult<bool> {
        self.check_qubit(target)?;
        let t_mask = 1 << target.index();
        let mut next = self.amplitudes.clone();
        for i in 0..next.len() {
            if i & t_mask == 0 {
                let j = i | t_mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                next[i] = matrix[0][0] * a + matrix[0][1] * b;
                next[j] = matrix[1][0] * a + matrix[1][1] * b;
            }
        }
        let norm_sqr: f64 = next.iter().map(Complex64::norm_sqr).sum();
        if norm_sqr <= NORM_TOLERANCE {
            // Branch has no weight in the current state; leave it untouched.
            return Ok(false);
        }
        self.amplitudes = next;
        self.scale(1.0 / norm_sqr.sqrt());
        Ok(true)
    }

    fn one_probability(&self, qubit: QubitId) -> EngineResult<f64> {
        self.check_qubit(qubit)?;
        let mask = 1 << qubit.index();
        Ok(self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, amp)| amp.norm_sqr())
            .sum())
    }

    fn basis_probability(&self, basis: usize) -> EngineResult<f64> {
        if basis >= self.amplitudes.len() {
            return Err(EngineError::BasisOutOfRange {
                basis,
                num_qubits: self.num_qubits,
            });
        }
        Ok(self.amplitudes[basis].norm_sqr())
    }

    fn project(&mut self, qubit: QubitId, outcome: bool) -> EngineResult<()> {
        self.check_qubit(qubit)?;
        let mask = 1 << qubit.index();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) != outcome {
                *amp = ZERO;
            }
        }
        let norm_sqr = self.norm_sqr();
        if norm_sqr <= NORM_TOLERANCE {
            return Err(EngineError::VanishingNorm { qubit });
        }
        self.scale(1.0 / norm_sqr.sqrt());
        Ok(())
    }

    fn compact(&mut self, target_fidelity: f64) -> bool {
        let budget = 1.0 - target_fidelity;
        if budget <= 0.0 {
            return false;
        }
        let mut weights: Vec<(f64, usize)> = self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(_, amp)| amp.norm_sqr() > 0.0)
            .map(|(i, amp)| (amp.norm_sqr(), i))
            .collect();
        weights.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Drop the lightest amplitudes while the removed mass fits the
        // fidelity budget, always keeping the dominant one.
        let mut removed = 0.0;
        let mut pruned = false;
        for &(weight, index) in weights.iter().take(weights.len().saturating_sub(1)) {
            if removed + weight > budget {
                break;
            }
            removed += weight;
            self.amplitudes[index] = ZERO;
            pruned = true;
        }
        if pruned {
            let norm_sqr = self.norm_sqr();
            self.scale(1.0 / norm_sqr.sqrt());
        }
        pruned
    }

    fn size_metric(&self) -> f64 {
        self.amplitudes
            .iter()
            .filter(|amp| amp.norm_sqr() > 0.0)
            .count() as f64
    }
}

/// Factory producing [`VectorEngine`] instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorEngineFactory;

impl EngineFactory for VectorEngineFactory {
    type Engine = VectorEngine;

    fn new_engine(&self, num_qubits: usize) -> Self::Engine {
        VectorEngine::new(num_qubits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_ir::Circuit;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    fn run(circuit: &Circuit) -> VectorEngine {
        let mut engine = VectorEngine::new(circuit.num_qubits());
        for inst in circuit.instructions() {
            engine.apply(inst).unwrap();
        }
        engine
    }

    #[test]
    fn test_initial_state() {
        let engine = VectorEngine::new(2);
        assert!(approx_eq(engine.basis_probability(0).unwrap(), 1.0));
        assert!(approx_eq(engine.basis_probability(3).unwrap(), 0.0));
    }

    #[test]
    fn test_x_gate() {
        let mut circuit = Circuit::with_size("x", 1, 0);
        circuit.x(QubitId(0)).unwrap();
        let engine = run(&circuit);
        assert!(approx_eq(engine.one_probability(QubitId(0)).unwrap(), 1.0));
    }

    #[test]
    fn test_bell_state() {
        let engine = run(&Circuit::bell().unwrap());
        assert!(approx_eq(engine.basis_probability(0).unwrap(), 0.5));
        assert!(approx_eq(engine.basis_probability(1).unwrap(), 0.0));
        assert!(approx_eq(engine.basis_probability(2).unwrap(), 0.0));
        assert!(approx_eq(engine.basis_probability(3).unwrap(), 0.5));
    }

    #[test]
    fn test_ghz_state() {
        let engine = run(&Circuit::ghz(3).unwrap());
        assert!(approx_eq(engine.basis_probability(0).unwrap(), 0.5));
        assert!(approx_eq(engine.basis_probability(7).unwrap(), 0.5));
        assert!(approx_eq(engine.one_probability(QubitId(1)).unwrap(), 0.5));
    }

    #[test]
    fn test_ccx() {
        let mut circuit = Circuit::with_size("toffoli", 3, 0);
        circuit
            .x(QubitId(0))
            .unwrap()
            .x(QubitId(1))
            .unwrap()
            .ccx(QubitId(0), QubitId(1), QubitId(2))
            .unwrap();
        let engine = run(&circuit);
        assert!(approx_eq(engine.basis_probability(7).unwrap(), 1.0));
    }

    #[test]
    fn test_project_renormalizes() {
        let mut engine = run(&Circuit::bell().unwrap());
        engine.project(QubitId(0), true).unwrap();
        assert!(approx_eq(engine.basis_probability(3).unwrap(), 1.0));
        assert!(approx_eq(engine.one_probability(QubitId(1)).unwrap(), 1.0));
    }

    #[test]
    fn test_project_impossible_outcome() {
        let mut engine = VectorEngine::new(1);
        let result = engine.project(QubitId(0), true);
        assert!(matches!(result, Err(EngineError::VanishingNorm { .. })));
    }

    #[test]
    fn test_branch_with_zero_weight() {
        // Damping-occurred branch on |0⟩ has no weight: state untouched.
        let mut engine = VectorEngine::new(1);
        let damp = [[ZERO, Complex64::new(0.5, 0.0)], [ZERO, ZERO]];
        assert!(!engine.apply_branch(&damp, QubitId(0)).unwrap());
        assert!(approx_eq(engine.basis_probability(0).unwrap(), 1.0));
    }

    #[test]
    fn test_branch_renormalizes() {
        let mut circuit = Circuit::with_size("plus", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        let mut engine = run(&circuit);
        // Non-unitary damping-absent branch shrinks |1⟩, then renormalizes.
        let keep = [[ONE, ZERO], [ZERO, Complex64::new(0.5, 0.0)]];
        assert!(engine.apply_branch(&keep, QubitId(0)).unwrap());
        let p1 = engine.one_probability(QubitId(0)).unwrap();
        assert!(approx_eq(p1, 0.25 / 1.25));
        let total = engine.basis_probability(0).unwrap() + engine.basis_probability(1).unwrap();
        assert!(approx_eq(total, 1.0));
    }

    #[test]
    fn test_compact_prunes_light_amplitudes() {
        let mut circuit = Circuit::with_size("tilt", 1, 0);
        // Small rotation puts ~0.0025 mass on |1⟩.
        circuit.ry(0.1, QubitId(0)).unwrap();
        let mut engine = run(&circuit);
        assert!(engine.compact(0.99));
        assert!(approx_eq(engine.basis_probability(0).unwrap(), 1.0));
        assert_eq!(engine.size_metric(), 1.0);
    }

    #[test]
    fn test_compact_respects_fidelity_budget() {
        let mut engine = run(&Circuit::bell().unwrap());
        // Neither 0.5-weight amplitude fits a 0.01 budget.
        assert!(!engine.compact(0.99));
        assert!(approx_eq(engine.basis_probability(0).unwrap(), 0.5));
    }

    #[test]
    fn test_compact_noop_at_full_fidelity() {
        let mut engine = run(&Circuit::bell().unwrap());
        assert!(!engine.compact(1.0));
    }

    #[test]
    fn test_size_metric() {
        let engine = run(&Circuit::ghz(3).unwrap());
        assert_eq!(engine.size_metric(), 2.0);
    }
}

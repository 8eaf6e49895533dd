//! Noise configuration and derived channel matrices.

use alsvid_engine::Matrix2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{StochError, StochResult};

/// A decoherence effect injected at gate boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseEffect {
    /// Energy relaxation (T1 decay), code `A`.
    AmplitudeDamping,
    /// Z applied with the gate error probability, code `P`.
    PhaseFlip,
    /// Random Pauli (X, Y, or Z), code `D`.
    Depolarizing,
}

impl NoiseEffect {
    /// Parse a single effect code.
    pub fn from_code(code: char) -> StochResult<Self> {
        match code {
            'A' => Ok(NoiseEffect::AmplitudeDamping),
            'P' => Ok(NoiseEffect::PhaseFlip),
            'D' => Ok(NoiseEffect::Depolarizing),
            other => Err(StochError::UnknownNoiseEffect(other)),
        }
    }

    /// The single-character code of this effect.
    pub fn code(&self) -> char {
        match self {
            NoiseEffect::AmplitudeDamping => 'A',
            NoiseEffect::PhaseFlip => 'P',
            NoiseEffect::Depolarizing => 'D',
        }
    }
}

/// Validated noise parameters, immutable after construction.
///
/// Holds the enabled effect set, the single- and multi-qubit gate error
/// probabilities, the amplitude-damping probabilities, and the four derived
/// Kraus-branch matrices (damping occurred / absent × single / multi). Shared
/// read-only by every trajectory.
#[derive(Debug, Clone)]
pub struct NoiseConfig {
    effects: Vec<NoiseEffect>,
    descriptor: String,
    probability: f64,
    probability_multi: f64,
    amp_damping: f64,
    amp_damping_multi: f64,
    damping_occurred: Matrix2,
    damping_occurred_multi: Matrix2,
    damping_absent: Matrix2,
    damping_absent_multi: Matrix2,
}

fn damping_occurred_matrix(amplitude: f64) -> Matrix2 {
    let zero = Complex64::new(0.0, 0.0);
    [[zero, Complex64::new(amplitude, 0.0)], [zero, zero]]
}

fn damping_absent_matrix(amplitude: f64) -> Matrix2 {
    let zero = Complex64::new(0.0, 0.0);
    [
        [Complex64::new(1.0, 0.0), zero],
        [zero, Complex64::new(amplitude, 0.0)],
    ]
}

impl NoiseConfig {
    /// Build a validated configuration.
    ///
    /// `descriptor` names the enabled effects as `A`/`P`/`D` codes.
    /// `amp_damping` defaults to `2 * probability` when `None`; amplitude
    /// damping (T1) is typically about twice as likely as a phase flip.
    /// `multi_qubit_factor` scales the error probability of gates touching
    /// more than one qubit.
    pub fn new(
        descriptor: &str,
        probability: f64,
        amp_damping: Option<f64>,
        multi_qubit_factor: f64,
    ) -> StochResult<Self> {
        let mut effects = Vec::with_capacity(descriptor.len());
        for code in descriptor.chars() {
            effects.push(NoiseEffect::from_code(code)?);
        }

        let amp_damping = amp_damping.unwrap_or(probability * 2.0);
        if amp_damping * multi_qubit_factor > 1.0 || probability < 0.0 {
            return Err(StochError::InvalidProbabilities {
                single_prob: probability,
                multi_prob: probability * multi_qubit_factor,
                single_damping: amp_damping,
                multi_damping: amp_damping * multi_qubit_factor,
            });
        }

        let sqrt_damping = amp_damping.sqrt();
        let keep = (1.0 - amp_damping).sqrt();
        // TODO: confirm whether scaling sqrt(probability) by the factor is
        // intended here rather than sqrt(amp_damping * factor); the multi-qubit
        // branch pair does not normalize for factor != 1.
        let sqrt_damping_multi = probability.sqrt() * multi_qubit_factor;
        let keep_multi = (1.0 - multi_qubit_factor * amp_damping).sqrt();

        Ok(Self {
            effects,
            descriptor: descriptor.to_string(),
            probability,
            probability_multi: probability * multi_qubit_factor,
            amp_damping,
            amp_damping_multi: amp_damping * multi_qubit_factor,
            damping_occurred: damping_occurred_matrix(sqrt_damping),
            damping_occurred_multi: damping_occurred_matrix(sqrt_damping_multi),
            damping_absent: damping_absent_matrix(keep),
            damping_absent_multi: damping_absent_matrix(keep_multi),
        })
    }

    /// The enabled effects, in descriptor order.
    pub fn effects(&self) -> &[NoiseEffect] {
        &self.effects
    }

    /// The original effect descriptor string.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Gate error probability for a single- or multi-qubit gate.
    pub fn gate_error_probability(&self, multi_qubit: bool) -> f64 {
        if multi_qubit {
            self.probability_multi
        } else {
            self.probability
        }
    }

    /// Amplitude-damping branch probability for a single- or multi-qubit gate.
    pub fn damping_probability(&self, multi_qubit: bool) -> f64 {
        if multi_qubit {
            self.amp_damping_multi
        } else {
            self.amp_damping
        }
    }

    /// Kraus branch applied when damping occurred.
    pub fn damping_occurred(&self, multi_qubit: bool) -> &Matrix2 {
        if multi_qubit {
            &self.damping_occurred_multi
        } else {
            &self.damping_occurred
        }
    }

    /// Kraus branch applied when damping did not occur.
    pub fn damping_absent(&self, multi_qubit: bool) -> &Matrix2 {
        if multi_qubit {
            &self.damping_absent_multi
        } else {
            &self.damping_absent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_effect_codes() {
        assert_eq!(
            NoiseEffect::from_code('A').unwrap(),
            NoiseEffect::AmplitudeDamping
        );
        assert_eq!(NoiseEffect::PhaseFlip.code(), 'P');
    }

    #[test]
    fn test_descriptor_parsing() {
        let config = NoiseConfig::new("APD", 0.01, None, 2.0).unwrap();
        assert_eq!(
            config.effects(),
            &[
                NoiseEffect::AmplitudeDamping,
                NoiseEffect::PhaseFlip,
                NoiseEffect::Depolarizing
            ]
        );
        assert_eq!(config.descriptor(), "APD");
    }

    #[test]
    fn test_unknown_effect_names_offender() {
        let err = NoiseConfig::new("AXD", 0.01, None, 2.0).unwrap_err();
        assert!(matches!(err, StochError::UnknownNoiseEffect('X')));
    }

    #[test]
    fn test_damping_defaults_to_twice_probability() {
        let config = NoiseConfig::new("A", 0.1, None, 2.0).unwrap();
        assert!((config.damping_probability(false) - 0.2).abs() < 1e-12);
        assert!((config.damping_probability(true) - 0.4).abs() < 1e-12);
        assert!((config.gate_error_probability(true) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_damping_override() {
        let config = NoiseConfig::new("A", 0.1, Some(0.05), 2.0).unwrap();
        assert!((config.damping_probability(false) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_probability_combination_rejected() {
        let err = NoiseConfig::new("APD", 0.3, None, 2.0).unwrap_err();
        match err {
            StochError::InvalidProbabilities {
                single_prob,
                multi_damping,
                ..
            } => {
                assert!((single_prob - 0.3).abs() < 1e-12);
                assert!((multi_damping - 1.2).abs() < 1e-12);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_probability_rejected() {
        let err = NoiseConfig::new("P", -0.01, Some(0.0), 2.0).unwrap_err();
        assert!(matches!(err, StochError::InvalidProbabilities { .. }));
    }

    proptest! {
        /// The single-qubit damping branch pair is a valid probability split
        /// whenever the derived damping probability fits the factor bound.
        #[test]
        fn prop_damping_branch_pair_normalizes(p in 0.0..0.5f64, factor in 1.0..2.0f64) {
            let damping = p * 2.0;
            prop_assume!(damping * factor <= 1.0);
            let config = NoiseConfig::new("APD", p, None, factor).unwrap();
            let occurred = config.damping_occurred(false)[0][1].norm_sqr();
            let absent = config.damping_absent(false)[1][1].norm_sqr();
            prop_assert!((occurred + absent - 1.0).abs() < 1e-12);
        }
    }
}

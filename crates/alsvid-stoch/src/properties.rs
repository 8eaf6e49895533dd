//! Recorded-property requests.
//!
//! A descriptor string selects which per-state quantities every trajectory
//! records after its final gate: comma-separated basis-state indices
//! (optionally as inclusive ranges `a-b`) and the `-1` sentinel for the
//! engine's representation-size scalar. A basis state is labeled with its
//! zero-padded binary string, char `i` holding qubit `i`, so property keys
//! line up with classical outcome bitstrings.

use crate::error::{StochError, StochResult};

/// Label used for the whole-state sentinel request.
pub const STATE_SIZE_LABEL: &str = "state_size";

/// What a recorded property measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyTarget {
    /// Probability of one computational basis state.
    Basis(usize),
    /// The engine's representation-size scalar.
    StateSize,
}

/// One recorded-property request, immutable and shared by all trajectories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedProperty {
    /// What to record.
    pub target: PropertyTarget,
    /// Key under which the aggregated value is reported.
    pub label: String,
}

impl RecordedProperty {
    fn basis(value: usize, num_qubits: usize) -> Self {
        Self {
            target: PropertyTarget::Basis(value),
            label: bitstring(value, num_qubits),
        }
    }

    fn state_size() -> Self {
        Self {
            target: PropertyTarget::StateSize,
            label: STATE_SIZE_LABEL.to_string(),
        }
    }
}

/// Render `value` as a bitstring of `width` chars, char `i` = qubit `i`.
pub fn bitstring(value: usize, width: usize) -> String {
    (0..width)
        .map(|i| if value >> i & 1 == 1 { '1' } else { '0' })
        .collect()
}

/// Parse a recorded-property descriptor.
///
/// Whitespace is ignored. Syntax errors surface here; range checks against
/// the register happen in the perfect-run validation pass.
pub fn parse(descriptor: &str, num_qubits: usize) -> StochResult<Vec<RecordedProperty>> {
    let mut properties = Vec::new();
    for raw in descriptor.split(',') {
        let token: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if token.is_empty() {
            continue;
        }
        if let Some(stripped) = token.strip_prefix('-') {
            // A leading minus is a sentinel, not a range.
            if stripped == "1" {
                properties.push(RecordedProperty::state_size());
                continue;
            }
            return Err(StochError::InvalidPropertyDescriptor(format!(
                "unknown sentinel '{token}'"
            )));
        }
        if let Some((begin, end)) = token.split_once('-') {
            let begin = parse_index(begin)?;
            let end = parse_index(end)?;
            if end <= begin {
                return Err(StochError::InvalidPropertyDescriptor(format!(
                    "range '{token}' must be increasing"
                )));
            }
            for value in begin..=end {
                properties.push(RecordedProperty::basis(value, num_qubits));
            }
            continue;
        }
        properties.push(RecordedProperty::basis(parse_index(&token)?, num_qubits));
    }
    Ok(properties)
}

/// Record every basis state of an `num_qubits`-qubit register.
pub fn all_basis_states(num_qubits: usize) -> Vec<RecordedProperty> {
    (0..1usize << num_qubits)
        .map(|value| RecordedProperty::basis(value, num_qubits))
        .collect()
}

/// Check every basis target against the register size.
pub fn validate(properties: &[RecordedProperty], num_qubits: usize) -> StochResult<()> {
    for property in properties {
        if let PropertyTarget::Basis(basis) = property.target {
            let out_of_range =
                num_qubits < usize::BITS as usize && basis >> num_qubits != 0;
            if out_of_range {
                return Err(StochError::PropertyOutOfRange { basis, num_qubits });
            }
        }
    }
    Ok(())
}

fn parse_index(text: &str) -> StochResult<usize> {
    text.parse().map_err(|_| {
        StochError::InvalidPropertyDescriptor(format!("'{text}' is not a basis-state index"))
    })
}

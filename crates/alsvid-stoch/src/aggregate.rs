//! Result aggregation across trajectory slots.
//!
//! Slots are read only after the scheduler's join barrier and always in
//! run-id order, so floating-point accumulation order is fixed and the
//! aggregate is invariant to worker count and completion order.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::trajectory::RunSlot;

/// Timing and bookkeeping for one simulate call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateStatistics {
    /// Compactions that actually reduced a state, summed over all runs.
    pub approximation_runs: u64,
    /// Wall time of the noiseless reference pass, in seconds.
    pub perfect_run_time: f64,
    /// Wall time of the whole stochastic phase, in seconds.
    pub stoch_wall_time: f64,
    /// Mean wall time of a single trajectory, in seconds.
    pub mean_stoch_run_time: f64,
    /// Worker threads used by the scheduler.
    pub parallel_instances: usize,
}

/// Sum per-run outcome counts into one distribution.
pub(crate) fn merge_counts(slots: &[RunSlot]) -> FxHashMap<String, u64> {
    let mut merged = FxHashMap::default();
    for slot in slots {
        for (bitstring, count) in &slot.counts {
            *merged.entry(bitstring.clone()).or_insert(0) += count;
        }
    }
    merged
}

/// Mean of each recorded property, every run weighted `1/runs`.
pub(crate) fn property_means(slots: &[RunSlot], num_properties: usize) -> Vec<f64> {
    let mut sums = vec![0.0; num_properties];
    for slot in slots {
        for (sum, value) in sums.iter_mut().zip(&slot.properties) {
            *sum += value;
        }
    }
    let runs = slots.len() as f64;
    for sum in &mut sums {
        *sum /= runs;
    }
    sums
}

/// Rescale a merged count distribution to integer counts summing to `shots`.
///
/// Largest-remainder apportionment over lexicographically sorted bitstrings;
/// zero rows are omitted. Deterministic for a given distribution.
pub(crate) fn rescale_counts(counts: &FxHashMap<String, u64>, shots: u64) -> FxHashMap<String, u64> {
    let total: u64 = counts.values().sum();
    if total == 0 || shots == 0 {
        return FxHashMap::default();
    }

    let mut rows: Vec<(&String, u64, f64)> = counts
        .iter()
        .map(|(bitstring, &count)| {
            let quota = shots as f64 * count as f64 / total as f64;
            (bitstring, quota as u64, quota.fract())
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let assigned: u64 = rows.iter().map(|row| row.1).sum();

    // Hand the remaining shots to the largest fractional parts (or claw back
    // an overshoot from the smallest); the sort above breaks ties by
    // bitstring.
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| rows[b].2.total_cmp(&rows[a].2));
    if assigned <= shots {
        let mut leftover = shots - assigned;
        for index in order {
            if leftover == 0 {
                break;
            }
            rows[index].1 += 1;
            leftover -= 1;
        }
    } else {
        let mut excess = assigned - shots;
        for index in order.into_iter().rev() {
            if excess == 0 {
                break;
            }
            if rows[index].1 > 0 {
                rows[index].1 -= 1;
                excess -= 1;
            }
        }
    }

    rows.into_iter()
        .filter(|row| row.1 > 0)
        .map(|(bitstring, count, _)| (bitstring.clone(), count))
        .collect()
}

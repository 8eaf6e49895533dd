//! Trajectory scheduling across a bounded worker pool.

use std::num::NonZeroUsize;
use std::thread;

use alsvid_engine::EngineFactory;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StochResult;
use crate::trajectory::{self, RunSlot, SimulationContext};

/// Cores left to the rest of the system under [`WorkerPolicy::Auto`].
const RESERVED_THREADS: usize = 4;

/// How many worker threads execute the trajectories.
///
/// Injectable so tests can pin the pool size; the aggregate result does not
/// depend on the choice, only wall time does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerPolicy {
    /// Available parallelism minus a fixed reserve, floored at one worker.
    #[default]
    Auto,
    /// Exactly this many workers.
    Fixed(NonZeroUsize),
    /// Debug mode: every run on the caller thread, no spawning.
    Sequential,
}

impl WorkerPolicy {
    /// Number of workers this policy yields on the current machine.
    pub fn worker_count(&self) -> usize {
        match self {
            WorkerPolicy::Auto => thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
                .saturating_sub(RESERVED_THREADS)
                .max(1),
            WorkerPolicy::Fixed(count) => count.get(),
            WorkerPolicy::Sequential => 1,
        }
    }
}

/// Run every trajectory, one disjoint slot per run id, and join all workers.
///
/// Returns the number of worker threads used. Nothing is observable before
/// every worker has finished; the first worker error fails the call and a
/// worker panic propagates.
pub(crate) fn dispatch<F: EngineFactory>(
    ctx: &SimulationContext<'_, F>,
    policy: WorkerPolicy,
    seeds: &[u64],
    slots: &mut [RunSlot],
) -> StochResult<usize> {
    let runs = slots.len();
    let workers = policy.worker_count().min(runs).max(1);

    if workers <= 1 {
        for (slot, &seed) in slots.iter_mut().zip(seeds) {
            trajectory::run(ctx, seed, slot)?;
        }
        return Ok(1);
    }

    let chunk = runs.div_ceil(workers);
    debug!(runs, workers, chunk, "dispatching stochastic runs");
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for (slot_chunk, seed_chunk) in slots.chunks_mut(chunk).zip(seeds.chunks(chunk)) {
            handles.push(scope.spawn(move || -> StochResult<()> {
                for (slot, &seed) in slot_chunk.iter_mut().zip(seed_chunk) {
                    trajectory::run(ctx, seed, slot)?;
                }
                Ok(())
            }));
        }
        let spawned = handles.len();
        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        Ok(spawned)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_worker_counts() {
        assert_eq!(WorkerPolicy::Sequential.worker_count(), 1);
        assert_eq!(
            WorkerPolicy::Fixed(NonZeroUsize::new(3).unwrap()).worker_count(),
            3
        );
        assert!(WorkerPolicy::Auto.worker_count() >= 1);
    }
}

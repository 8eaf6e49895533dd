//! End-to-end properties of the stochastic simulator.

use std::num::NonZeroUsize;

use alsvid_ir::{Circuit, QubitId};
use alsvid_stoch::{StochasticSimulator, StochasticSimulatorBuilder, WorkerPolicy};

fn noiseless_bell() -> StochasticSimulatorBuilder {
    StochasticSimulator::builder(Circuit::bell().unwrap())
        .noise_effects("APD")
        .error_probability(0.0)
        .amplitude_damping_probability(0.0)
}

fn noisy_bell() -> StochasticSimulatorBuilder {
    StochasticSimulator::builder(Circuit::bell().unwrap())
        .noise_effects("APD")
        .error_probability(0.1)
}

#[test]
fn aggregate_is_invariant_to_worker_policy() {
    let policies = [
        WorkerPolicy::Sequential,
        WorkerPolicy::Fixed(NonZeroUsize::new(1).unwrap()),
        WorkerPolicy::Fixed(NonZeroUsize::new(4).unwrap()),
    ];

    let results: Vec<_> = policies
        .iter()
        .map(|&policy| {
            let mut sim = noisy_bell()
                .runs(400)
                .seed(1234)
                .workers(policy)
                .build()
                .unwrap();
            (sim.stoch_simulate().unwrap(), sim.simulate(1000).unwrap())
        })
        .collect();

    // Bit-identical maps for every policy.
    assert_eq!(results[0].0, results[1].0);
    assert_eq!(results[0].0, results[2].0);
    assert_eq!(results[0].1, results[1].1);
    assert_eq!(results[0].1, results[2].1);
}

#[test]
fn noiseless_bell_probabilities_are_exact() {
    let mut sim = noiseless_bell()
        .runs(50)
        .seed(7)
        .workers(WorkerPolicy::Sequential)
        .build()
        .unwrap();
    let result = sim.stoch_simulate().unwrap();

    assert!((result["00"] - 0.5).abs() < 1e-12);
    assert!((result["11"] - 0.5).abs() < 1e-12);
    assert_eq!(result["10"], 0.0);
    assert_eq!(result["01"], 0.0);

    // Without noise events there is no variance source: a different master
    // seed produces the same probability estimates.
    let mut reseeded = noiseless_bell()
        .runs(50)
        .seed(8)
        .workers(WorkerPolicy::Sequential)
        .build()
        .unwrap();
    assert_eq!(reseeded.stoch_simulate().unwrap()["00"], result["00"]);
}

#[test]
fn shot_counts_sum_exactly() {
    let mut sim = noisy_bell().runs(777).seed(5).build().unwrap();
    for shots in [1, 1000, 12345] {
        let counts = sim.simulate(shots).unwrap();
        assert_eq!(counts.values().sum::<u64>(), shots);
    }
}

#[test]
fn more_runs_shrink_the_standard_error() {
    let estimate = |seed: u64, runs: i64| -> f64 {
        let mut sim = noiseless_bell()
            .runs(runs)
            .seed(seed)
            .workers(WorkerPolicy::Fixed(NonZeroUsize::new(2).unwrap()))
            .build()
            .unwrap();
        let shots = runs as u64;
        let counts = sim.simulate(shots).unwrap();
        counts.get("00").copied().unwrap_or(0) as f64 / shots as f64
    };

    let spread = |runs: i64| -> f64 {
        let trials: Vec<f64> = (0..12).map(|seed| estimate(seed, runs)).collect();
        let mean = trials.iter().sum::<f64>() / trials.len() as f64;
        let variance = trials
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / (trials.len() - 1) as f64;
        variance.sqrt()
    };

    assert!(spread(10_000) < spread(100));
}

#[test]
fn noisy_bell_leakage_stays_bounded() {
    let mut sim = noisy_bell()
        .runs(2000)
        .seed(99)
        .approximation(0, 1.0)
        .build()
        .unwrap();
    let result = sim.stoch_simulate().unwrap();

    let leakage = result["10"] + result["01"];
    let mass = result["00"] + result["11"];

    // Leakage is driven by the 0.1 gate error; bound it by 3p.
    assert!(leakage > 0.01, "noise produced no leakage: {leakage}");
    assert!(leakage < 0.3, "leakage out of bounds: {leakage}");
    assert!(mass > 0.6, "Bell mass too low: {mass}");
}

#[test]
fn compaction_cadence_reports_reductions() {
    let mut tilted = Circuit::with_size("tilt", 2, 0);
    tilted
        .ry(0.1, QubitId(0))
        .unwrap()
        .ry(0.1, QubitId(1))
        .unwrap();

    let mut sim = StochasticSimulator::builder(tilted.clone())
        .noise_effects("APD")
        .error_probability(0.0)
        .amplitude_damping_probability(0.0)
        .runs(10)
        .seed(3)
        .approximation(1, 0.99)
        .workers(WorkerPolicy::Sequential)
        .build()
        .unwrap();
    sim.stoch_simulate().unwrap();
    // Both small rotations leave prunable mass in every run.
    assert_eq!(sim.statistics().approximation_runs, 20);
    assert_eq!(sim.additional_statistics()["parallel_instances"], "1");

    let mut disabled = StochasticSimulator::builder(tilted)
        .noise_effects("APD")
        .error_probability(0.0)
        .amplitude_damping_probability(0.0)
        .runs(10)
        .seed(3)
        .workers(WorkerPolicy::Sequential)
        .build()
        .unwrap();
    disabled.stoch_simulate().unwrap();
    assert_eq!(disabled.statistics().approximation_runs, 0);
}

#[test]
fn state_size_sentinel_reports_engine_metric() {
    let mut sim = noiseless_bell()
        .runs(20)
        .seed(11)
        .record_properties("-1")
        .workers(WorkerPolicy::Sequential)
        .build()
        .unwrap();
    let result = sim.stoch_simulate().unwrap();
    // A noiseless Bell state keeps exactly two nonzero amplitudes.
    assert_eq!(result["state_size"], 2.0);
}

#[test]
fn property_validation_happens_before_dispatch() {
    let mut sim = noiseless_bell()
        .runs(10)
        .seed(0)
        .record_properties("0-5")
        .build()
        .unwrap();
    let err = sim.stoch_simulate().unwrap_err();
    assert!(matches!(
        err,
        alsvid_stoch::StochError::PropertyOutOfRange { basis: 4, .. }
    ));
}

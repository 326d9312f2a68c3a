//! Convergence of CFR on rock-paper-scissors and its weighted variant.

mod common;

use common::{rock_paper_scissors, rock_paper_scissors_plus, COLUMN, ROW};
use efg_solver_core::{calculate_exploitability, CfrConfig, CfrSolver, CpuBackend};
use test_macros::timed_test;

fn assert_distribution(actual: &[f64], expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < tolerance, "{actual:?} vs {expected:?}");
    }
}

#[timed_test(10)]
fn uniform_weights_converge_to_uniform() {
    let game = rock_paper_scissors();
    for config in [CfrConfig::vanilla(), CfrConfig::cfr_plus()] {
        let mut solver = CfrSolver::with_config(&game, CpuBackend::cpu(), config);
        solver.train(1000);

        let strategies = solver.average_strategies();
        for information_set in [ROW, COLUMN] {
            assert_distribution(&strategies[information_set], &[1.0 / 3.0; 3], 0.05);
        }
        let exploitability = calculate_exploitability(&game, &solver.average_profile());
        assert!(exploitability < 0.05, "{}: {exploitability}", config.variant);
    }
}

#[timed_test(10)]
fn weighted_game_converges_with_cfr_plus() {
    let game = rock_paper_scissors_plus();
    let mut solver = CfrSolver::with_config(&game, CpuBackend::cpu(), CfrConfig::cfr_plus());
    solver.train(2000);

    for information_set in [ROW, COLUMN] {
        let rock = solver
            .average_strategy(&information_set.to_string(), &"R".to_string())
            .unwrap();
        let scissors = solver
            .average_strategy(&information_set.to_string(), &"S".to_string())
            .unwrap();
        assert!((rock - 0.4).abs() < 0.05, "{information_set}: rock {rock}");
        assert!((scissors - 0.2).abs() < 0.05, "{information_set}: scissors {scissors}");
    }
    let exploitability = calculate_exploitability(&game, &solver.average_profile());
    assert!(exploitability < 0.05, "{exploitability}");
}

#[timed_test(10)]
fn average_strategies_stay_distributions() {
    let game = rock_paper_scissors_plus();
    let mut solver = CfrSolver::new(&game, CpuBackend::cpu());
    solver.train_with_callback(200, 25, |solver| {
        for (information_set, distribution) in solver.average_strategies() {
            let total: f64 = distribution.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "{information_set} sums to {total}");
            assert!(distribution.iter().all(|&p| p >= 0.0));
        }
        for (_, distribution) in solver.current_strategies() {
            assert!((distribution.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    });
}

#[timed_test]
fn uniform_profile_of_weighted_game_is_exploitable() {
    let game = rock_paper_scissors_plus();
    let solver = CfrSolver::new(&game, CpuBackend::cpu());
    // Rock earns 1/3 a round against a uniform opponent.
    let exploitability = calculate_exploitability(&game, &solver.average_profile());
    assert!(exploitability > 0.1, "{exploitability}");
}

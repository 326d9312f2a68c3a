//! Two-player zero-sum games in sequence form, solved by self-play.

use super::minimizer::SequenceFormCfr;
use super::process::TreeFormDecisionProcess;
use crate::backend::Backend;
use crate::config::SequenceFormConfig;
use crate::progress;

/// A two-player zero-sum game given by each player's decision process and
/// the row player's utility per pair of sequences.
///
/// For realization plans `x` (row) and `y` (column) the row player earns
/// `x^T U y` and the column player its negation.
#[derive(Debug, Clone)]
pub struct TwoPlayerZeroSumGame {
    pub name: Option<String>,
    pub row: TreeFormDecisionProcess,
    pub column: TreeFormDecisionProcess,
    /// `(row sequence, column sequence, utility)`; repeated pairs add up.
    pub utilities: Vec<(usize, usize, f64)>,
}

impl TwoPlayerZeroSumGame {
    /// Row player's utility per row sequence against column plan `y`.
    #[must_use]
    pub fn row_utility(&self, y: &[f64]) -> Vec<f64> {
        let mut utility = vec![0.0; self.row.num_sequences()];
        for &(i, j, value) in &self.utilities {
            utility[i] += value * y[j];
        }
        utility
    }

    /// Column player's utility per column sequence against row plan `x`.
    #[must_use]
    pub fn column_utility(&self, x: &[f64]) -> Vec<f64> {
        let mut utility = vec![0.0; self.column.num_sequences()];
        for &(i, j, value) in &self.utilities {
            utility[j] -= value * x[i];
        }
        utility
    }

    /// Row player's expected utility `x^T U y`.
    #[must_use]
    pub fn value(&self, x: &[f64], y: &[f64]) -> f64 {
        self.utilities.iter().map(|&(i, j, value)| value * x[i] * y[j]).sum()
    }

    /// Sum of both players' best-response values against the other's plan;
    /// zero exactly at an equilibrium.
    #[must_use]
    pub fn exploitability(&self, x: &[f64], y: &[f64]) -> f64 {
        let (row_best, _) = self.row.best_response(&self.row_utility(y));
        let (column_best, _) = self.column.best_response(&self.column_utility(x));
        row_best + column_best
    }
}

/// Self-play of two [`SequenceFormCfr`] minimizers on a
/// [`TwoPlayerZeroSumGame`].
pub struct SequenceFormSolver<'g, B: Backend> {
    game: &'g TwoPlayerZeroSumGame,
    backend: B,
    config: SequenceFormConfig,
    /// Row utility, row sequences x column sequences, and its transpose.
    utility: B::Sparse,
    utility_t: B::Sparse,
    row: SequenceFormCfr<B>,
    column: SequenceFormCfr<B>,
    iteration: u64,
}

impl<'g, B: Backend> SequenceFormSolver<'g, B> {
    pub fn new(game: &'g TwoPlayerZeroSumGame, backend: B) -> Self {
        Self::with_config(game, backend, SequenceFormConfig::default())
    }

    pub fn with_config(game: &'g TwoPlayerZeroSumGame, backend: B, config: SequenceFormConfig) -> Self {
        let sp = progress::spinner(config.show_progress, "compiling decision processes...");
        let utility = backend.sparse(game.row.num_sequences(), game.column.num_sequences(), &game.utilities);
        let utility_t = backend.transpose(&utility);
        let row = SequenceFormCfr::new(&game.row, &backend, &config);
        let column = SequenceFormCfr::new(&game.column, &backend, &config);
        sp.finish_and_clear();
        log::debug!(
            "{} self-play on {}: {} x {} sequences, {} utility entries, gamma {}, {}",
            config.variant,
            backend.name(),
            game.row.num_sequences(),
            game.column.num_sequences(),
            backend.nnz(&utility),
            config.averaging_exponent,
            if config.alternate { "alternating" } else { "simultaneous" }
        );
        Self {
            game,
            backend,
            config,
            utility,
            utility_t,
            row,
            column,
            iteration: 0,
        }
    }

    /// One round of self-play.
    ///
    /// Alternating rounds let the column player observe the row player's
    /// fresh strategy before moving; the very first round has nothing to
    /// observe yet.
    pub fn iterate(&mut self) {
        let b = &self.backend;
        if self.config.alternate {
            let x = self.row.next_strategy(b);
            if self.iteration > 0 {
                let column_utility = b.scale(b.matmul(&self.utility_t, &x), -1.0);
                self.column.observe_utility(b, &column_utility);
            }
            let y = self.column.next_strategy(b);
            self.row.observe_utility(b, &b.matmul(&self.utility, &y));
        } else {
            let x = self.row.next_strategy(b);
            let y = self.column.next_strategy(b);
            self.row.observe_utility(b, &b.matmul(&self.utility, &y));
            let column_utility = b.scale(b.matmul(&self.utility_t, &x), -1.0);
            self.column.observe_utility(b, &column_utility);
        }
        self.iteration += 1;
        log::trace!("{} self-play round {} done", self.config.variant, self.iteration);
    }

    pub fn train(&mut self, iterations: u64) {
        let pb = progress::iterations(self.config.show_progress, iterations);
        for _ in 0..iterations {
            self.iterate();
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    #[must_use]
    pub fn iteration_count(&self) -> u64 {
        self.iteration
    }

    #[must_use]
    pub fn game(&self) -> &'g TwoPlayerZeroSumGame {
        self.game
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Average realization plans of the row and column player.
    #[must_use]
    pub fn average_strategies(&self) -> (Vec<f64>, Vec<f64>) {
        (
            self.backend.to_vec(self.row.average_strategy()),
            self.backend.to_vec(self.column.average_strategy()),
        )
    }

    /// Row player's value of the average plans.
    #[must_use]
    pub fn row_value(&self) -> f64 {
        let (x, y) = self.average_strategies();
        self.game.value(&x, &y)
    }

    /// Exploitability of the average plans.
    #[must_use]
    pub fn exploitability(&self) -> f64 {
        let (x, y) = self.average_strategies();
        self.game.exploitability(&x, &y)
    }

    #[must_use]
    pub fn row_minimizer(&self) -> &SequenceFormCfr<B> {
        &self.row
    }

    #[must_use]
    pub fn column_minimizer(&self) -> &SequenceFormCfr<B> {
        &self.column
    }
}

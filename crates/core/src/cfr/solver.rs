//! Vectorized CFR over a compiled extensive-form game.
//!
//! Every iteration is a fixed sequence of sparse/dense tensor operations on
//! the injected [`Backend`]:
//!
//! 1. broadcast the behavioral profile to per-node edge probabilities,
//! 2. propagate expected payoffs from the leaves up, one level at a time,
//! 3. propagate each player's counterfactual reach down, one level at a time,
//! 4. pick out the counterfactual reach of each edge's acting player,
//! 5. blend the average profile toward the current one, weighted by the
//!    share of each information set's cumulative counterfactual reach,
//! 6. fold the instantaneous regrets into their running mean (floored at
//!    zero after the update for CFR+) and regret-match the next profile.
//!
//! Iterations must run one at a time; the solver owns all mutable state.

use std::cell::OnceCell;

use rustc_hash::FxHashMap;

use super::compiled::{compile, CompiledGame};
use super::profile::BehavioralProfile;
use super::tensor_ops::{blend_average, regret_match, running_mean};
use crate::backend::Backend;
use crate::config::{CfrConfig, CfrVariant};
use crate::error::SolverError;
use crate::game::ExtensiveFormGame;
use crate::progress;
use crate::tree::Label;

/// CFR / CFR+ solver for one game instance.
pub struct CfrSolver<'g, B: Backend, V, H, A, I> {
    game: &'g ExtensiveFormGame<V, H, A, I>,
    backend: B,
    config: CfrConfig,
    compiled: CompiledGame<B>,
    /// Current behavioral profile, A x 1.
    strategy_profile: B::Dense,
    /// Counterfactual-reach-weighted average profile, A x 1.
    average_strategy_profile: B::Dense,
    /// Running mean of instantaneous counterfactual regret, A x 1.
    average_regrets: B::Dense,
    /// Cumulative counterfactual reach per information set, H x 1.
    reach_sums: B::Dense,
    /// Zero fallback for the average-strategy blend weight, H x 1.
    zero_weights: B::Dense,
    /// Expected payoffs of the last iterate, N x P.
    expected_payoffs: B::Dense,
    iteration: u64,
    current_host: OnceCell<Vec<f64>>,
    average_host: OnceCell<Vec<f64>>,
}

impl<'g, B: Backend, V, H, A, I> CfrSolver<'g, B, V, H, A, I> {
    /// Vanilla CFR with default settings.
    pub fn new(game: &'g ExtensiveFormGame<V, H, A, I>, backend: B) -> Self {
        Self::with_config(game, backend, CfrConfig::default())
    }

    /// Compile `game` and start from the uniform profile.
    pub fn with_config(game: &'g ExtensiveFormGame<V, H, A, I>, backend: B, config: CfrConfig) -> Self {
        let compiled = compile(game, &backend, config.show_progress);
        let (num_h, num_a) = (compiled.num_information_sets(), compiled.num_actions());

        let solver = Self {
            strategy_profile: compiled.uniform_strategy.clone(),
            average_strategy_profile: compiled.uniform_strategy.clone(),
            average_regrets: backend.zeros(num_a, 1),
            reach_sums: backend.zeros(num_h, 1),
            zero_weights: backend.zeros(num_h, 1),
            expected_payoffs: compiled.initial_payoffs.clone(),
            game,
            backend,
            config,
            compiled,
            iteration: 0,
            current_host: OnceCell::new(),
            average_host: OnceCell::new(),
        };
        log::debug!(
            "{} solver ready on {}: {} information sets, {} actions",
            solver.config.variant,
            solver.backend.name(),
            num_h,
            num_a
        );
        solver
    }

    /// Run one CFR iteration.
    pub fn iterate(&mut self) {
        let b = &self.backend;
        let c = &self.compiled;

        // 1. Edge probabilities: behavioral for rational edges, chance for
        //    nature edges.
        let strategies = b.add(b.matmul(&c.action_node_mask_t, &self.strategy_profile), &c.nature_strategies);

        // 2. Expected payoffs, deepest level first.
        let mut payoffs = c.initial_payoffs.clone();
        for level in c.level_graphs.iter().rev() {
            let step = b.matmul(&b.scale_columns(level, &strategies), &payoffs);
            payoffs = b.add(payoffs, &step);
        }

        // 3. Reach with each player's own edges counted as certain.
        let players = c.num_players();
        let excepted = b.mask_fill(b.broadcast_columns(&strategies, players), &c.node_player_mask, 1.0);
        let mut reach = c.initial_reach.clone();
        for level_t in &c.level_graphs_t {
            let step = b.mul(b.matmul(level_t, &reach), &excepted);
            reach = b.add(reach, &step);
        }

        // 4. Counterfactual reach of each edge for the player who chose it.
        let terms = b.sum_rows(&b.mul(c.node_player_mask.clone(), &reach));

        // 5. Average profile.
        let infoset_reach = b.mul(b.matmul(&c.infoset_node_mask, &terms), &c.inverse_action_counts);
        self.reach_sums = b.add(infoset_reach.clone(), &self.reach_sums);
        let weights = b.div_or(infoset_reach, &self.reach_sums, &self.zero_weights);
        let action_weights = b.matmul(&c.infoset_action_mask_t, &weights);
        let average = self.average_strategy_profile.clone();
        self.average_strategy_profile = blend_average(b, average, &self.strategy_profile, &action_weights);

        // 6. Regrets and the next profile.
        let parent_payoffs = b.matmul(&c.graph_t, &payoffs);
        let edge_regrets = b.sum_rows(&b.mul(c.node_player_mask.clone(), &b.sub(payoffs.clone(), &parent_payoffs)));
        let instantaneous = b.matmul(&c.action_node_mask, &b.mul(terms, &edge_regrets));
        let mean = self.average_regrets.clone();
        let mut mean = running_mean(b, mean, &instantaneous, self.iteration);
        if self.config.variant == CfrVariant::CfrPlus {
            mean = b.clamp_min(mean, 0.0);
        }
        self.strategy_profile = regret_match(
            b,
            &mean,
            &c.infoset_action_mask,
            &c.infoset_action_mask_t,
            &c.uniform_strategy,
        );
        self.average_regrets = mean;
        self.expected_payoffs = payoffs;

        // 7. Bookkeeping.
        self.iteration += 1;
        self.current_host.take();
        self.average_host.take();
        log::trace!("{} iteration {} done", self.config.variant, self.iteration);
    }

    /// Run `iterations` iterations.
    pub fn train(&mut self, iterations: u64) {
        let pb = progress::iterations(self.config.show_progress, iterations);
        for _ in 0..iterations {
            self.iterate();
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    /// Run `iterations` iterations, calling `callback(self)` after each
    /// `every` iterations and after the last one.
    pub fn train_with_callback<F>(&mut self, iterations: u64, every: u64, mut callback: F)
    where
        F: FnMut(&Self),
    {
        let every = every.max(1);
        let pb = progress::iterations(self.config.show_progress, iterations);
        for i in 0..iterations {
            self.iterate();
            pb.inc(1);
            if (i + 1) % every == 0 || i + 1 == iterations {
                callback(self);
            }
        }
        pb.finish_and_clear();
    }

    #[must_use]
    pub fn iteration_count(&self) -> u64 {
        self.iteration
    }

    #[must_use]
    pub fn game(&self) -> &'g ExtensiveFormGame<V, H, A, I> {
        self.game
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn config(&self) -> &CfrConfig {
        &self.config
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledGame<B> {
        &self.compiled
    }

    /// Current profile per compiled action.
    #[must_use]
    pub fn current_strategy_vector(&self) -> &[f64] {
        self.current_host.get_or_init(|| self.backend.to_vec(&self.strategy_profile))
    }

    /// Average profile per compiled action.
    #[must_use]
    pub fn average_strategy_vector(&self) -> &[f64] {
        self.average_host
            .get_or_init(|| self.backend.to_vec(&self.average_strategy_profile))
    }

    /// Running-mean counterfactual regret per compiled action.
    #[must_use]
    pub fn average_regret_vector(&self) -> Vec<f64> {
        self.backend.to_vec(&self.average_regrets)
    }

    /// Expected payoff at the root for each compiled player under the last
    /// iterate's profile (zeros before the first iteration).
    #[must_use]
    pub fn root_values(&self) -> Vec<f64> {
        let players = self.compiled.num_players();
        let root = self.game.initial_node();
        self.backend.to_vec(&self.expected_payoffs)[root * players..(root + 1) * players].to_vec()
    }

    /// Average profile as a strategy profile over the game.
    #[must_use]
    pub fn average_profile(&self) -> BehavioralProfile<'g, V, H, A, I> {
        self.profile_from(self.average_strategy_vector())
    }

    /// Current profile as a strategy profile over the game.
    #[must_use]
    pub fn current_profile(&self) -> BehavioralProfile<'g, V, H, A, I> {
        self.profile_from(self.current_strategy_vector())
    }

    fn profile_from(&self, values: &[f64]) -> BehavioralProfile<'g, V, H, A, I> {
        let compiled = &self.compiled;
        let game = self.game;
        BehavioralProfile::from_fn(game, |h, a| {
            compiled
                .action_id(game, h, a)
                .map_or(0.0, |id| values[id])
        })
    }
}

impl<B: Backend, V: Label, H: Label, A: Label, I: Label> CfrSolver<'_, B, V, H, A, I> {
    /// Average probability of `action` at `information_set`.
    ///
    /// Before the first iteration this is the uniform value.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if the information set is unknown or owned by
    /// nature, or the action is not available there.
    pub fn average_strategy(&self, information_set: &H, action: &A) -> Result<f64, SolverError> {
        let id = self.lookup(information_set, action)?;
        Ok(self.average_strategy_vector()[id])
    }

    /// Current probability of `action` at `information_set`.
    ///
    /// # Errors
    ///
    /// Same as [`average_strategy`](Self::average_strategy).
    pub fn current_strategy(&self, information_set: &H, action: &A) -> Result<f64, SolverError> {
        let id = self.lookup(information_set, action)?;
        Ok(self.current_strategy_vector()[id])
    }

    /// Average distribution per rational information set, aligned with its
    /// available actions.
    #[must_use]
    pub fn average_strategies(&self) -> FxHashMap<H, Vec<f64>> {
        self.per_information_set(self.average_strategy_vector())
    }

    #[must_use]
    pub fn current_strategies(&self) -> FxHashMap<H, Vec<f64>> {
        self.per_information_set(self.current_strategy_vector())
    }

    /// Running-mean regrets per rational information set.
    #[must_use]
    pub fn average_regrets(&self) -> FxHashMap<H, Vec<f64>> {
        self.per_information_set(&self.average_regret_vector())
    }

    fn per_information_set(&self, values: &[f64]) -> FxHashMap<H, Vec<f64>> {
        self.compiled
            .information_sets
            .iter()
            .enumerate()
            .map(|(hc, &h)| {
                let label = self.game.information_set(h).clone();
                (label, values[self.compiled.action_range(hc)].to_vec())
            })
            .collect()
    }

    fn lookup(&self, information_set: &H, action: &A) -> Result<usize, SolverError> {
        let h = self
            .game
            .information_set_index(information_set)
            .ok_or_else(|| SolverError::UnknownInformationSet(format!("{information_set:?}")))?;
        if self.game.is_nature_information_set(h) {
            return Err(SolverError::NatureInformationSet(format!("{information_set:?}")));
        }
        self.game
            .action_index(action)
            .and_then(|a| self.compiled.action_id(self.game, h, a))
            .ok_or_else(|| SolverError::UnknownAction {
                information_set: format!("{information_set:?}"),
                action: format!("{action:?}"),
            })
    }
}

//! Exact best response against a fixed strategy profile.
//!
//! The responder's counterfactual reach is computed top-down, ignoring the
//! responder's own choices. Best actions and expected payoffs are then
//! resolved by memoized recursion keyed by node and information-set index;
//! the recursion depth equals the tree depth.

use std::fmt::Debug;

use super::profile::StrategyProfile;
use crate::error::SolverError;
use crate::game::ExtensiveFormGame;
use crate::tree::Label;

/// Tolerance on the opponents' and nature's per-node probability sums.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// One player's best response to a profile, and the payoffs it earns.
pub struct BestResponse<'g, 'p, V, H, A, I, P: ?Sized> {
    game: &'g ExtensiveFormGame<V, H, A, I>,
    profile: &'p P,
    player: usize,
    /// Counterfactual reach per node.
    reach: Vec<f64>,
    /// Best action per information set (`None` unless owned by the player).
    actions: Vec<Option<usize>>,
    /// Responder's expected payoff per node under the completed profile.
    payoffs: Vec<f64>,
}

impl<'g, 'p, V, H, A, I, P> BestResponse<'g, 'p, V, H, A, I, P>
where
    H: Debug,
    I: Debug,
    P: StrategyProfile + ?Sized,
{
    /// Best response of `player` (a game player index) to `profile`.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::UnknownPlayer`] for an index out of range and
    /// [`SolverError::NatureResponder`] for the nature player.
    ///
    /// # Panics
    ///
    /// Panics if the probabilities `profile` assigns at some opponent or
    /// nature node do not sum to 1 within [`PROBABILITY_SUM_TOLERANCE`].
    pub fn new(
        game: &'g ExtensiveFormGame<V, H, A, I>,
        profile: &'p P,
        player: usize,
    ) -> Result<Self, SolverError> {
        if player >= game.num_players() {
            return Err(SolverError::UnknownPlayer(player.to_string()));
        }
        if game.nature() == Some(player) {
            return Err(SolverError::NatureResponder);
        }
        Ok(Self::compute(game, profile, player))
    }

    /// Best response of a player known to be rational.
    pub(crate) fn compute(game: &'g ExtensiveFormGame<V, H, A, I>, profile: &'p P, player: usize) -> Self {
        let reach = counterfactual_reach(game, profile, player);

        let mut memo = Memo {
            game,
            profile,
            player,
            reach: &reach,
            actions: vec![None; game.num_information_sets()],
            payoffs: vec![None; game.num_nodes()],
        };
        for h in 0..game.num_information_sets() {
            if game.information_set_player(h) == player {
                memo.best_action(h);
            }
        }
        let payoffs: Vec<f64> = (0..game.num_nodes()).map(|v| memo.payoff(v)).collect();
        let actions = memo.actions;

        log::debug!(
            "best response for {:?}: value {:.6}",
            game.player(player),
            payoffs[game.initial_node()]
        );
        Self {
            game,
            profile,
            player,
            reach,
            actions,
            payoffs,
        }
    }

    /// The responder (game player index).
    #[must_use]
    pub fn player(&self) -> usize {
        self.player
    }

    /// Best action (game action index) at one of the responder's
    /// information sets.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::NotBestResponder`] if the information set is
    /// acted on by someone else, [`SolverError::UnknownInformationSet`] if
    /// the index is out of range.
    pub fn best_action(&self, information_set: usize) -> Result<usize, SolverError> {
        match self.actions.get(information_set) {
            None => Err(SolverError::UnknownInformationSet(information_set.to_string())),
            Some(Some(action)) => Ok(*action),
            Some(None) => Err(SolverError::NotBestResponder {
                information_set: format!("{:?}", self.game.information_set(information_set)),
                player: format!("{:?}", self.game.player(self.player)),
            }),
        }
    }

    /// 1 for the best action at a responder information set, 0 otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`best_action`](Self::best_action).
    pub fn action_probability(&self, information_set: usize, action: usize) -> Result<f64, SolverError> {
        let best = self.best_action(information_set)?;
        Ok(if best == action { 1.0 } else { 0.0 })
    }

    /// Responder's expected payoff at `node` under the completed profile.
    #[must_use]
    pub fn expected_payoff(&self, node: usize) -> f64 {
        self.payoffs[node]
    }

    /// Responder's best-response value at the root.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.payoffs[self.game.initial_node()]
    }

    /// Probability of reaching `node` if the responder always plays toward it.
    #[must_use]
    pub fn counterfactual_reach(&self, node: usize) -> f64 {
        self.reach[node]
    }
}

impl<V, H, A, I, P> BestResponse<'_, '_, V, H, A, I, P>
where
    V: Label,
    H: Label,
    A: Label,
    I: Label,
    P: StrategyProfile + ?Sized,
{
    /// Best action by label.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::UnknownInformationSet`] for an unknown label,
    /// otherwise as [`best_action`](Self::best_action).
    pub fn best_action_label(&self, information_set: &H) -> Result<&A, SolverError> {
        let h = self
            .game
            .information_set_index(information_set)
            .ok_or_else(|| SolverError::UnknownInformationSet(format!("{information_set:?}")))?;
        Ok(self.game.action(self.best_action(h)?))
    }
}

/// The profile with the responder's choices replaced by the best response.
impl<V, H, A, I, P: StrategyProfile + ?Sized> StrategyProfile for BestResponse<'_, '_, V, H, A, I, P> {
    fn probability(&self, node: usize, action: usize) -> f64 {
        let Some(h) = self.game.node_information_set(node) else {
            return 0.0;
        };
        match self.actions[h] {
            Some(best) => f64::from(u8::from(best == action)),
            None => self.profile.probability(node, action),
        }
    }
}

fn counterfactual_reach<V, H, A, I, P: StrategyProfile + ?Sized>(
    game: &ExtensiveFormGame<V, H, A, I>,
    profile: &P,
    player: usize,
) -> Vec<f64> {
    let mut reach = vec![0.0; game.num_nodes()];
    reach[game.initial_node()] = 1.0;
    for level in game.tree().levels() {
        for &u in level {
            let own = game.node_player(u) == Some(player);
            for &v in game.successors(u) {
                let p = match game.node_action(v) {
                    Some(_) if own => 1.0,
                    Some(a) => profile.probability(u, a),
                    None => 0.0,
                };
                reach[v] = reach[u] * p;
            }
        }
    }
    reach
}

struct Memo<'a, V, H, A, I, P: ?Sized> {
    game: &'a ExtensiveFormGame<V, H, A, I>,
    profile: &'a P,
    player: usize,
    reach: &'a [f64],
    actions: Vec<Option<usize>>,
    payoffs: Vec<Option<f64>>,
}

impl<V, H, A, I, P: StrategyProfile + ?Sized> Memo<'_, V, H, A, I, P> {
    fn best_action(&mut self, h: usize) -> usize {
        if let Some(a) = self.actions[h] {
            return a;
        }
        let game = self.game;
        let available = game.available_actions(h);
        let mut totals = vec![0.0; available.len()];
        for &v in game.information_set_nodes(h) {
            let weight = self.reach[v];
            for (k, &child) in game.successors(v).iter().enumerate() {
                totals[k] += weight * self.payoff(child);
            }
        }
        // First strict maximum in declared action order.
        let mut best = 0;
        for (k, &total) in totals.iter().enumerate() {
            if total > totals[best] {
                best = k;
            }
        }
        let action = available[best];
        self.actions[h] = Some(action);
        action
    }

    fn payoff(&mut self, node: usize) -> f64 {
        if let Some(value) = self.payoffs[node] {
            return value;
        }
        let game = self.game;
        let value = match game.node_information_set(node) {
            None => game.payoff(node, self.player),
            Some(h) if game.information_set_player(h) == self.player => {
                let action = self.best_action(h);
                match game.successor(node, action) {
                    Some(child) => self.payoff(child),
                    None => unreachable!("validated action menu"),
                }
            }
            Some(_) => {
                let mut total = 0.0;
                let mut value = 0.0;
                for &child in game.successors(node) {
                    let Some(action) = game.node_action(child) else {
                        continue;
                    };
                    let p = self.profile.probability(node, action);
                    total += p;
                    value += p * self.payoff(child);
                }
                assert!(
                    (total - 1.0).abs() <= PROBABILITY_SUM_TOLERANCE,
                    "action probabilities at node {node} sum to {total}"
                );
                value
            }
        };
        self.payoffs[node] = Some(value);
        value
    }
}

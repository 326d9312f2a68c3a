//! Exact expected payoffs of a complete strategy profile.

use super::profile::StrategyProfile;
use crate::error::SolverError;
use crate::game::ExtensiveFormGame;
use crate::tree::Label;

/// Expected payoff of every node for every player.
///
/// Computed bottom-up over the breadth-first levels, deepest first, so no
/// recursion is involved.
#[derive(Debug, Clone)]
pub struct ExpectedPayoffs {
    players: usize,
    /// N x P row-major; the nature player's column stays zero.
    values: Vec<f64>,
}

impl ExpectedPayoffs {
    pub fn new<V, H, A, I, P: StrategyProfile + ?Sized>(game: &ExtensiveFormGame<V, H, A, I>, profile: &P) -> Self {
        let players = game.num_players();
        let mut values = vec![0.0; game.num_nodes() * players];
        for &v in game.terminal_nodes() {
            for i in 0..players {
                values[v * players + i] = game.payoff(v, i);
            }
        }
        for level in game.tree().levels().iter().rev() {
            for &u in level {
                for &v in game.successors(u) {
                    let Some(action) = game.node_action(v) else {
                        continue;
                    };
                    let p = profile.probability(u, action);
                    if p == 0.0 {
                        continue;
                    }
                    for i in 0..players {
                        values[u * players + i] += p * values[v * players + i];
                    }
                }
            }
        }
        Self { players, values }
    }

    /// Expected payoff of `player` at `node` (game indices); 0 outside the
    /// game.
    #[must_use]
    pub fn get(&self, node: usize, player: usize) -> f64 {
        if player >= self.players {
            return 0.0;
        }
        self.values.get(node * self.players + player).copied().unwrap_or(0.0)
    }

    /// Expected payoffs of every player at `node`.
    #[must_use]
    pub fn node(&self, node: usize) -> &[f64] {
        &self.values[node * self.players..(node + 1) * self.players]
    }

    /// Expected payoff by labels.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::UnknownNode`] or [`SolverError::UnknownPlayer`]
    /// for labels not in the game.
    pub fn payoff<V: Label, H: Label, A: Label, I: Label>(
        &self,
        game: &ExtensiveFormGame<V, H, A, I>,
        node: &V,
        player: &I,
    ) -> Result<f64, SolverError> {
        let v = game
            .node_index(node)
            .ok_or_else(|| SolverError::UnknownNode(format!("{node:?}")))?;
        let i = game
            .player_index(player)
            .ok_or_else(|| SolverError::UnknownPlayer(format!("{player:?}")))?;
        Ok(self.get(v, i))
    }
}

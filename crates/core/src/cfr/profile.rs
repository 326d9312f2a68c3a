//! Strategy profiles consumed by the exact oracles.

use crate::game::ExtensiveFormGame;

/// A complete strategy profile: the probability that whoever acts at a
/// node (nature included) picks a given action there.
///
/// Nodes and actions are game indices.
pub trait StrategyProfile {
    fn probability(&self, node: usize, action: usize) -> f64;
}

impl<F: Fn(usize, usize) -> f64> StrategyProfile for F {
    fn probability(&self, node: usize, action: usize) -> f64 {
        self(node, action)
    }
}

/// Behavioral strategies for every information set of a game.
///
/// Each information set holds one probability per available action, in
/// the order of [`ExtensiveFormGame::available_actions`]. Nature
/// information sets carry the game's chance distribution.
#[derive(Debug, Clone)]
pub struct BehavioralProfile<'g, V, H, A, I> {
    game: &'g ExtensiveFormGame<V, H, A, I>,
    probabilities: Vec<Vec<f64>>,
}

impl<'g, V, H, A, I> BehavioralProfile<'g, V, H, A, I> {
    /// Uniform play at every rational information set.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn uniform(game: &'g ExtensiveFormGame<V, H, A, I>) -> Self {
        Self::from_fn(game, |h, _| 1.0 / game.available_actions(h).len() as f64)
    }

    /// Fill rational information sets from `f(information_set, action)`.
    pub fn from_fn(
        game: &'g ExtensiveFormGame<V, H, A, I>,
        f: impl Fn(usize, usize) -> f64,
    ) -> Self {
        let probabilities = (0..game.num_information_sets())
            .map(|h| {
                if game.is_nature_information_set(h) {
                    game.nature_probabilities(h).to_vec()
                } else {
                    game.available_actions(h).iter().map(|&a| f(h, a)).collect()
                }
            })
            .collect();
        Self { game, probabilities }
    }

    #[must_use]
    pub fn game(&self) -> &'g ExtensiveFormGame<V, H, A, I> {
        self.game
    }

    /// Probability of `action` at `information_set`, zero if unavailable.
    #[must_use]
    pub fn get(&self, information_set: usize, action: usize) -> f64 {
        self.game
            .available_actions(information_set)
            .binary_search(&action)
            .map_or(0.0, |k| self.probabilities[information_set][k])
    }

    /// Distribution at an information set, aligned with its available actions.
    #[must_use]
    pub fn distribution(&self, information_set: usize) -> &[f64] {
        &self.probabilities[information_set]
    }

    /// Replace the distribution at a rational information set.
    ///
    /// # Panics
    ///
    /// Panics if `distribution` does not have one entry per available action.
    pub fn set_distribution(&mut self, information_set: usize, distribution: &[f64]) {
        let slot = &mut self.probabilities[information_set];
        assert_eq!(
            slot.len(),
            distribution.len(),
            "distribution length must match the available actions"
        );
        slot.copy_from_slice(distribution);
    }
}

impl<V, H, A, I> StrategyProfile for BehavioralProfile<'_, V, H, A, I> {
    fn probability(&self, node: usize, action: usize) -> f64 {
        self.game
            .node_information_set(node)
            .map_or(0.0, |h| self.get(h, action))
    }
}

//! Exploitability of a complete strategy profile.

use rayon::prelude::*;

use super::best_response::BestResponse;
use super::expected_payoffs::ExpectedPayoffs;
use super::profile::StrategyProfile;
use crate::game::ExtensiveFormGame;

/// Best-response value and profile value of one rational player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerGap {
    /// Game player index.
    pub player: usize,
    pub best_response_value: f64,
    pub profile_value: f64,
}

impl PlayerGap {
    /// How much the player gains by deviating to a best response.
    #[must_use]
    pub fn gap(&self) -> f64 {
        self.best_response_value - self.profile_value
    }
}

/// Per rational player, the best-response value against `profile` next to
/// the value `profile` itself earns. Players are solved in parallel.
///
/// # Panics
///
/// Panics if `profile` does not sum to 1 at some node (see
/// [`BestResponse::new`]).
pub fn best_response_values<V, H, A, I, P>(game: &ExtensiveFormGame<V, H, A, I>, profile: &P) -> Vec<PlayerGap>
where
    V: Sync,
    H: std::fmt::Debug + Sync,
    A: Sync,
    I: std::fmt::Debug + Sync,
    P: StrategyProfile + Sync + ?Sized,
{
    let payoffs = ExpectedPayoffs::new(game, profile);
    let root = game.initial_node();
    game.rational_players()
        .par_iter()
        .map(|&player| PlayerGap {
            player,
            best_response_value: BestResponse::compute(game, profile, player).value(),
            profile_value: payoffs.get(root, player),
        })
        .collect()
}

/// Sum over rational players of best-response value minus profile value.
///
/// Zero exactly at a Nash equilibrium; never negative.
///
/// # Panics
///
/// Same as [`best_response_values`].
pub fn calculate_exploitability<V, H, A, I, P>(game: &ExtensiveFormGame<V, H, A, I>, profile: &P) -> f64
where
    V: Sync,
    H: std::fmt::Debug + Sync,
    A: Sync,
    I: std::fmt::Debug + Sync,
    P: StrategyProfile + Sync + ?Sized,
{
    let gaps = best_response_values(game, profile);
    let total = gaps.iter().map(PlayerGap::gap).sum();
    log::debug!("exploitability {total:.6} over {} players", gaps.len());
    total
}

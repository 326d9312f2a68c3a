//! Convergence metrics over per-information-set exports.
//!
//! These read the maps returned by
//! [`CfrSolver::average_strategies`](super::CfrSolver::average_strategies)
//! and [`CfrSolver::average_regrets`](super::CfrSolver::average_regrets).
//! Regrets there are already running means, so no iteration count is
//! needed. The average positive regret bounds how far each player is from
//! a best response in the average profile.

#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Mean L1 distance between the distributions of information sets present
/// in both maps; 0 if they share none.
#[must_use]
pub fn strategy_delta<K, S>(prev: &HashMap<K, Vec<f64>, S>, curr: &HashMap<K, Vec<f64>, S>) -> f64
where
    K: Eq + Hash,
    S: BuildHasher,
{
    let distances: Vec<f64> = prev
        .iter()
        .filter_map(|(key, p)| {
            curr.get(key)
                .map(|c| p.iter().zip(c).map(|(a, b)| (a - b).abs()).sum())
        })
        .collect();
    mean(&distances)
}

/// Largest positive average regret over all actions; 0 when none is
/// positive.
#[must_use]
pub fn max_regret<K, S: BuildHasher>(regrets: &HashMap<K, Vec<f64>, S>) -> f64 {
    regrets
        .values()
        .flatten()
        .copied()
        .fold(0.0_f64, f64::max)
}

/// Mean absolute average regret over all actions.
#[must_use]
pub fn mean_regret<K, S: BuildHasher>(regrets: &HashMap<K, Vec<f64>, S>) -> f64 {
    let values: Vec<f64> = regrets.values().flatten().map(|r| r.abs()).collect();
    mean(&values)
}

/// Mean Shannon entropy (nats) of the per-information-set distributions.
///
/// Uniform play maximizes it; pure strategies score 0.
#[must_use]
pub fn strategy_entropy<K, S: BuildHasher>(strategies: &HashMap<K, Vec<f64>, S>) -> f64 {
    let entropies: Vec<f64> = strategies
        .values()
        .map(|probs| probs.iter().filter(|&&p| p > 0.0).map(|&p| -p * p.ln()).sum())
        .collect();
    mean(&entropies)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

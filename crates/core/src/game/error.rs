use thiserror::Error;

use crate::tree::TreeError;

/// Validation failures raised while constructing an
/// [`ExtensiveFormGame`](super::ExtensiveFormGame).
///
/// Every variant carries the offending identifier rendered with `Debug`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("invalid game tree: {0}")]
    Tree(#[from] TreeError),

    /// Information partition key missing, repeated or not a decision node.
    #[error("information partition not on decision nodes: {0}")]
    InformationPartitionDomain(String),

    #[error("undefined information set in information partition: {0}")]
    UndefinedInformationSet(String),

    /// Action partition key missing, repeated or not a non-root node.
    #[error("action partition not on non-initial nodes: {0}")]
    ActionPartitionDomain(String),

    #[error("undefined action in action partition: {0}")]
    UndefinedAction(String),

    #[error("nature {0} is not a member of the players")]
    NatureNotPlayer(String),

    #[error("player partition not on information sets: {0}")]
    PlayerPartitionDomain(String),

    #[error("undefined player in player partition: {0}")]
    UndefinedPlayer(String),

    /// Probabilities missing for a nature information set, given for a
    /// non-nature one, or not defined exactly on its available actions.
    #[error("nature probabilities not on nature actions: {0}")]
    NatureProbabilityDomain(String),

    #[error("nature probabilities at {information_set} sum to {total}, not 1")]
    NatureProbabilitySum { information_set: String, total: f64 },

    #[error("payoffs not on terminal nodes: {0}")]
    PayoffDomain(String),

    #[error("payoffs at {0} not defined exactly for the rational players")]
    PayoffPlayers(String),

    #[error("actions at decision node {0} not a bijection with its successors")]
    ActionBijection(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::timed_test;

    #[timed_test]
    fn tree_error_converts() {
        let err: GameError = TreeError::MissingParent("\"x\"".into()).into();
        assert!(matches!(err, GameError::Tree(_)));
        assert!(err.to_string().contains("invalid game tree"), "{err}");
    }

    #[timed_test]
    fn sum_error_displays_total() {
        let err = GameError::NatureProbabilitySum {
            information_set: "\"deal\"".into(),
            total: 0.75,
        };
        let msg = err.to_string();
        assert!(msg.contains("deal"), "should name the information set: {msg}");
        assert!(msg.contains("0.75"), "should show the total: {msg}");
    }
}

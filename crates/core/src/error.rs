use thiserror::Error;

/// Usage errors reported by solvers and oracles.
///
/// None of these leave the solver in a modified state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown information set: {0}")]
    UnknownInformationSet(String),

    #[error("action {action} is not available at information set {information_set}")]
    UnknownAction {
        information_set: String,
        action: String,
    },

    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    /// Information set owned by nature where a rational one is required.
    #[error("information set {0} belongs to nature")]
    NatureInformationSet(String),

    #[error("actor of information set {information_set} is not the best responder {player}")]
    NotBestResponder {
        information_set: String,
        player: String,
    },

    #[error("nature cannot be a best responder")]
    NatureResponder,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::timed_test;

    #[timed_test]
    fn not_best_responder_names_both_sides() {
        let err = SolverError::NotBestResponder {
            information_set: "\"Kb\"".into(),
            player: "1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Kb"), "should name the information set: {msg}");
        assert!(msg.contains("best responder 1"), "should name the player: {msg}");
    }

    #[timed_test]
    fn unknown_action_displays_both_labels() {
        let err = SolverError::UnknownAction {
            information_set: "\"root\"".into(),
            action: "\"Fold\"".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Fold") && msg.contains("root"), "{msg}");
    }

    #[timed_test]
    fn error_is_debug() {
        let debug_str = format!("{:?}", SolverError::NatureResponder);
        assert!(debug_str.contains("NatureResponder"));
    }
}

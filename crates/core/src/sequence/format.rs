//! JSON document format of two-player zero-sum sequence-form games.
//!
//! ```json
//! {
//!   "game_name": "kuhn_poker",
//!   "player_count": 2,
//!   "tree_form_sequential_decision_processes": [
//!     [
//!       {"parent_edge": [], "node": {"id": "o0", "type": "OBSERVATION_POINT"}},
//!       {"parent_edge": ["o0", "e0"], "node": {"id": "0", "type": "DECISION_POINT"}},
//!       {"parent_edge": ["0", "Bet"], "node": {"id": "", "type": "END_OF_THE_DECISION_PROCESS"}}
//!     ],
//!     [ ... ]
//!   ],
//!   "utilities": [
//!     {"sequences": [["0", "Bet"], []], "value": 1.0}
//!   ]
//! }
//! ```
//!
//! An empty sequence reference (`[]`) is the empty sequence.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::game::TwoPlayerZeroSumGame;
use super::process::{ProcessError, ProcessNode, Transition, TreeFormDecisionProcess};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read game file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse game document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("decision process of player {player}: {source}")]
    Process {
        player: usize,
        #[source]
        source: ProcessError,
    },

    #[error("expected 2 decision processes, found {0}")]
    PlayerCount(usize),

    #[error("malformed edge {0:?}: expected [] or [point, event]")]
    MalformedEdge(Vec<String>),

    #[error("utility record {record} references unknown sequence {sequence:?} of player {player}")]
    UnknownSequence {
        record: usize,
        player: usize,
        sequence: Vec<String>,
    },

    #[error("utility record {record} must reference exactly 2 sequences, found {found}")]
    SequenceCount { record: usize, found: usize },
}

#[derive(Debug, Deserialize)]
struct GameDocument {
    #[serde(default)]
    game_name: Option<String>,
    #[serde(default)]
    player_count: Option<usize>,
    tree_form_sequential_decision_processes: Vec<Vec<TransitionRecord>>,
    utilities: Vec<UtilityRecord>,
}

#[derive(Debug, Deserialize)]
struct TransitionRecord {
    parent_edge: Vec<String>,
    node: NodeRecord,
}

#[derive(Debug, Deserialize)]
struct NodeRecord {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: NodeKind,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum NodeKind {
    DecisionPoint,
    ObservationPoint,
    EndOfTheDecisionProcess,
}

#[derive(Debug, Deserialize)]
struct UtilityRecord {
    sequences: Vec<Vec<String>>,
    value: f64,
}

fn edge(parent_edge: Vec<String>) -> Result<Option<(String, String)>, FormatError> {
    match <[String; 2]>::try_from(parent_edge) {
        Ok([point, event]) => Ok(Some((point, event))),
        Err(rest) if rest.is_empty() => Ok(None),
        Err(rest) => Err(FormatError::MalformedEdge(rest)),
    }
}

fn process(player: usize, records: Vec<TransitionRecord>) -> Result<TreeFormDecisionProcess, FormatError> {
    let transitions = records
        .into_iter()
        .map(|TransitionRecord { parent_edge, node }| {
            let node = match node.kind {
                NodeKind::DecisionPoint => ProcessNode::Decision(node.id),
                NodeKind::ObservationPoint => ProcessNode::Observation(node.id),
                NodeKind::EndOfTheDecisionProcess => ProcessNode::End,
            };
            Ok(Transition {
                parent: edge(parent_edge)?,
                node,
            })
        })
        .collect::<Result<Vec<_>, FormatError>>()?;
    TreeFormDecisionProcess::new(transitions).map_err(|source| FormatError::Process { player, source })
}

fn sequence(
    process: &TreeFormDecisionProcess,
    record: usize,
    player: usize,
    reference: Vec<String>,
) -> Result<usize, FormatError> {
    if reference.is_empty() {
        return Ok(0);
    }
    let found = match reference.as_slice() {
        [point, action] => process.sequence_index(point, action),
        _ => None,
    };
    found.ok_or(FormatError::UnknownSequence {
        record,
        player,
        sequence: reference,
    })
}

impl TwoPlayerZeroSumGame {
    /// Parse a game document.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the JSON is invalid, a decision process
    /// is malformed, or a utility references an unknown sequence.
    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        let document: GameDocument = serde_json::from_str(json)?;
        let GameDocument {
            game_name,
            player_count,
            tree_form_sequential_decision_processes: processes,
            utilities: records,
        } = document;

        let count = player_count.unwrap_or(processes.len());
        if count != 2 || processes.len() != 2 {
            return Err(FormatError::PlayerCount(processes.len().max(count)));
        }
        let mut processes = processes.into_iter().enumerate().map(|(player, records)| process(player, records));
        let (Some(row), Some(column)) = (processes.next(), processes.next()) else {
            return Err(FormatError::PlayerCount(count));
        };
        let (row, column) = (row?, column?);

        let mut utilities = Vec::with_capacity(records.len());
        for (record, UtilityRecord { sequences, value }) in records.into_iter().enumerate() {
            let found = sequences.len();
            let Ok([row_sequence, column_sequence]) = <[Vec<String>; 2]>::try_from(sequences) else {
                return Err(FormatError::SequenceCount { record, found });
            };
            utilities.push((
                sequence(&row, record, 0, row_sequence)?,
                sequence(&column, record, 1, column_sequence)?,
                value,
            ));
        }

        log::debug!(
            "loaded {}: {} x {} sequences, {} utility entries",
            game_name.as_deref().unwrap_or("unnamed game"),
            row.num_sequences(),
            column.num_sequences(),
            utilities.len()
        );
        Ok(Self {
            name: game_name,
            row,
            column,
            utilities,
        })
    }

    /// Load a game document from a file.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Io`] if the file cannot be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, FormatError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| FormatError::Io(path.to_path_buf(), e))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_macros::timed_test;

    /// Matching pennies: the row player wins 1 on a match.
    const PENNIES: &str = r#"{
        "game_name": "matching_pennies",
        "player_count": 2,
        "tree_form_sequential_decision_processes": [
            [
                {"parent_edge": [], "node": {"id": "r", "type": "DECISION_POINT"}},
                {"parent_edge": ["r", "H"], "node": {"id": "", "type": "END_OF_THE_DECISION_PROCESS"}},
                {"parent_edge": ["r", "T"], "node": {"id": "", "type": "END_OF_THE_DECISION_PROCESS"}}
            ],
            [
                {"parent_edge": [], "node": {"id": "c", "type": "DECISION_POINT"}},
                {"parent_edge": ["c", "H"], "node": {"id": "", "type": "END_OF_THE_DECISION_PROCESS"}},
                {"parent_edge": ["c", "T"], "node": {"id": "", "type": "END_OF_THE_DECISION_PROCESS"}}
            ]
        ],
        "utilities": [
            {"sequences": [["r", "H"], ["c", "H"]], "value": 1.0},
            {"sequences": [["r", "H"], ["c", "T"]], "value": -1.0},
            {"sequences": [["r", "T"], ["c", "H"]], "value": -1.0},
            {"sequences": [["r", "T"], ["c", "T"]], "value": 1.0}
        ]
    }"#;

    #[timed_test]
    fn parses_matching_pennies() {
        let game = TwoPlayerZeroSumGame::from_json(PENNIES).unwrap();
        assert_eq!(game.name.as_deref(), Some("matching_pennies"));
        assert_eq!(game.row.num_sequences(), 3);
        assert_eq!(game.utilities[1], (1, 2, -1.0));
        let uniform = [1.0, 0.5, 0.5];
        assert!(game.exploitability(&uniform, &uniform).abs() < 1e-12);
    }

    #[timed_test]
    fn empty_sequence_references() {
        let json = PENNIES.replace(r#"[["r", "T"], ["c", "T"]]"#, r#"[[], []]"#);
        let game = TwoPlayerZeroSumGame::from_json(&json).unwrap();
        assert_eq!(game.utilities[3], (0, 0, 1.0));
    }

    #[timed_test]
    fn unknown_sequence_is_reported() {
        let json = PENNIES.replace(r#"["c", "T"]], "value": 1.0"#, r#"["c", "X"]], "value": 1.0"#);
        let err = TwoPlayerZeroSumGame::from_json(&json).unwrap_err();
        assert!(
            matches!(err, FormatError::UnknownSequence { record: 3, player: 1, .. }),
            "{err}"
        );
    }

    #[timed_test]
    fn malformed_process_is_reported() {
        let json = PENNIES.replace(r#"["c", "H"]"#, r#"["z", "H"]"#);
        let err = TwoPlayerZeroSumGame::from_json(&json).unwrap_err();
        assert!(matches!(
            err,
            FormatError::Process {
                player: 1,
                source: ProcessError::UnknownParent(_)
            }
        ));
        let json = PENNIES.replace(r#"["r", "T"], "node""#, r#"["r"], "node""#);
        assert!(matches!(
            TwoPlayerZeroSumGame::from_json(&json),
            Err(FormatError::MalformedEdge(_))
        ));
    }

    #[timed_test]
    fn wrong_player_count() {
        let json = PENNIES.replace(r#""player_count": 2"#, r#""player_count": 3"#);
        assert!(matches!(
            TwoPlayerZeroSumGame::from_json(&json),
            Err(FormatError::PlayerCount(3))
        ));
        assert!(matches!(
            TwoPlayerZeroSumGame::from_json("{\"tree_form_sequential_decision_processes\": [], \"utilities\": []}"),
            Err(FormatError::PlayerCount(0))
        ));
    }

    #[timed_test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PENNIES.as_bytes()).unwrap();
        let game = TwoPlayerZeroSumGame::load(file.path()).unwrap();
        assert_eq!(game.column.num_sequences(), 3);
        assert!(matches!(
            TwoPlayerZeroSumGame::load("/nonexistent/game.json"),
            Err(FormatError::Io(..))
        ));
    }
}

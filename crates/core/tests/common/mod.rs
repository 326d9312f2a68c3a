//! Game builders shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;

use efg_solver_core::{ExtensiveFormGame, GameDefinition, Tree};

pub type LabelledGame = ExtensiveFormGame<String, String, String, String>;
pub type LabelledDefinition = GameDefinition<String, String, String, String>;

pub const ROW: &str = "row";
pub const COLUMN: &str = "column";

const HANDS: [&str; 3] = ["R", "P", "S"];

/// Whether hand `b` beats hand `a` (paper beats rock and so on).
fn beats(b: usize, a: usize) -> bool {
    (a + 1) % 3 == b
}

/// Rock-paper-scissors as a two-level tree: the row player picks a hand at
/// the root, the column player picks one without seeing it.
///
/// A decided round is worth `weights[a] * weights[b]` to the winner.
pub fn rock_paper_scissors_definition(weights: [f64; 3]) -> LabelledDefinition {
    let root = String::new();
    let mut vertices = vec![root.clone()];
    let mut leaves = Vec::new();
    let mut parents = Vec::new();
    let mut information_partition = vec![(root.clone(), ROW.to_string())];
    let mut action_partition = Vec::new();
    let mut payoffs = Vec::new();

    for (a, first) in HANDS.iter().enumerate() {
        let vertex = (*first).to_string();
        vertices.push(vertex.clone());
        parents.push((vertex.clone(), root.clone()));
        action_partition.push((vertex.clone(), (*first).to_string()));
        information_partition.push((vertex.clone(), COLUMN.to_string()));

        for (b, second) in HANDS.iter().enumerate() {
            let leaf = format!("{first}{second}");
            vertices.push(leaf.clone());
            leaves.push(leaf.clone());
            parents.push((leaf.clone(), vertex.clone()));
            action_partition.push((leaf.clone(), (*second).to_string()));

            let weight = weights[a] * weights[b];
            let row = if beats(b, a) {
                -weight
            } else if beats(a, b) {
                weight
            } else {
                0.0
            };
            payoffs.push((leaf, vec![(ROW.to_string(), row), (COLUMN.to_string(), -row)]));
        }
    }

    GameDefinition {
        tree: Tree::new(vertices, root, leaves, parents).expect("rock-paper-scissors tree"),
        information_sets: vec![ROW.to_string(), COLUMN.to_string()],
        information_partition,
        actions: HANDS.iter().map(|&h| h.to_string()).collect(),
        action_partition,
        players: vec![ROW.to_string(), COLUMN.to_string()],
        nature: None,
        player_partition: vec![
            (ROW.to_string(), ROW.to_string()),
            (COLUMN.to_string(), COLUMN.to_string()),
        ],
        nature_probabilities: Vec::new(),
        payoffs,
    }
}

pub fn rock_paper_scissors() -> LabelledGame {
    ExtensiveFormGame::new(rock_paper_scissors_definition([1.0, 1.0, 1.0])).expect("rock-paper-scissors")
}

/// Rock-paper-scissors where rounds involving scissors count double. The
/// equilibrium plays rock 0.4, paper 0.4, scissors 0.2.
pub fn rock_paper_scissors_plus() -> LabelledGame {
    ExtensiveFormGame::new(rock_paper_scissors_definition([1.0, 1.0, 2.0])).expect("rock-paper-scissors+")
}

pub const P1: &str = "p1";
pub const P2: &str = "p2";
pub const CHANCE: &str = "chance";
pub const DEAL: &str = "deal";

/// Value of Kuhn poker to the first player.
pub const KUHN_VALUE: f64 = -1.0 / 18.0;

const CARDS: [char; 3] = ['J', 'Q', 'K'];

#[derive(Default)]
struct KuhnBuilder {
    vertices: Vec<String>,
    leaves: Vec<String>,
    parents: Vec<(String, String)>,
    information_sets: Vec<String>,
    information_partition: Vec<(String, String)>,
    action_partition: Vec<(String, String)>,
    player_partition: Vec<(String, String)>,
    payoffs: Vec<(String, Vec<(String, f64)>)>,
}

impl KuhnBuilder {
    fn child(&mut self, parent: &str, action: &str) -> String {
        let vertex = format!("{parent}{action}");
        self.vertices.push(vertex.clone());
        self.parents.push((vertex.clone(), parent.to_string()));
        self.action_partition.push((vertex.clone(), action.to_string()));
        vertex
    }

    fn decide(&mut self, vertex: &str, information_set: String, player: &str) {
        if !self.information_sets.contains(&information_set) {
            self.information_sets.push(information_set.clone());
            self.player_partition.push((information_set.clone(), player.to_string()));
        }
        self.information_partition.push((vertex.to_string(), information_set));
    }

    fn terminal(&mut self, vertex: String, first: f64) {
        self.leaves.push(vertex.clone());
        self.payoffs
            .push((vertex, vec![(P1.to_string(), first), (P2.to_string(), -first)]));
    }
}

/// Three-card Kuhn poker with an explicit chance deal at the root.
///
/// Information sets are the acting player's card followed by the betting
/// history (`c` check, `b` bet, `f` fold, `k` call).
pub fn kuhn_poker() -> LabelledGame {
    let mut builder = KuhnBuilder::default();
    let root = String::from("/");
    builder.vertices.push(root.clone());
    builder.decide(&root, DEAL.to_string(), CHANCE);

    let mut deals = Vec::new();
    for (i, &first) in CARDS.iter().enumerate() {
        for (j, &second) in CARDS.iter().enumerate() {
            if i == j {
                continue;
            }
            let deal = format!("{first}{second}");
            deals.push(deal.clone());
            let showdown = |stake: f64| if i > j { stake } else { -stake };

            let dealt = builder.child(&root, &deal);
            builder.decide(&dealt, first.to_string(), P1);

            let check = builder.child(&dealt, "c");
            builder.decide(&check, format!("{second}c"), P2);
            let both_check = builder.child(&check, "c");
            builder.terminal(both_check, showdown(1.0));
            let check_bet = builder.child(&check, "b");
            builder.decide(&check_bet, format!("{first}cb"), P1);
            let fold = builder.child(&check_bet, "f");
            builder.terminal(fold, -1.0);
            let call = builder.child(&check_bet, "k");
            builder.terminal(call, showdown(2.0));

            let bet = builder.child(&dealt, "b");
            builder.decide(&bet, format!("{second}b"), P2);
            let fold = builder.child(&bet, "f");
            builder.terminal(fold, 1.0);
            let call = builder.child(&bet, "k");
            builder.terminal(call, showdown(2.0));
        }
    }

    let mut actions = deals.clone();
    actions.extend(["c", "b", "f", "k"].map(String::from));
    let chance = 1.0 / deals.len() as f64;
    let KuhnBuilder {
        vertices,
        leaves,
        parents,
        information_sets,
        information_partition,
        action_partition,
        player_partition,
        payoffs,
    } = builder;

    ExtensiveFormGame::new(GameDefinition {
        tree: Tree::new(vertices, root, leaves, parents).expect("kuhn tree"),
        information_sets,
        information_partition,
        actions,
        action_partition,
        players: [P1, P2, CHANCE].map(String::from).to_vec(),
        nature: Some(CHANCE.to_string()),
        player_partition,
        nature_probabilities: vec![(
            DEAL.to_string(),
            deals.into_iter().map(|deal| (deal, chance)).collect(),
        )],
        payoffs,
    })
    .expect("kuhn poker")
}

pub type Board = (u16, u16);
pub type TicTacToe = ExtensiveFormGame<Vec<u8>, Board, u8, &'static str>;

const LINES: [u16; 8] = [
    0b000_000_111,
    0b000_111_000,
    0b111_000_000,
    0b001_001_001,
    0b010_010_010,
    0b100_100_100,
    0b100_010_001,
    0b001_010_100,
];

fn has_line(cells: u16) -> bool {
    LINES.iter().any(|&line| cells & line == line)
}

/// Tic-tac-toe over move histories. A player observes the board only, so
/// histories reaching the same position share an information set.
pub fn tic_tac_toe() -> TicTacToe {
    struct Builder {
        vertices: Vec<Vec<u8>>,
        leaves: Vec<Vec<u8>>,
        parents: Vec<(Vec<u8>, Vec<u8>)>,
        information_sets: Vec<Board>,
        seen: HashSet<Board>,
        information_partition: Vec<(Vec<u8>, Board)>,
        action_partition: Vec<(Vec<u8>, u8)>,
        player_partition: Vec<(Board, &'static str)>,
        payoffs: Vec<(Vec<u8>, Vec<(&'static str, f64)>)>,
    }

    fn expand(b: &mut Builder, history: Vec<u8>, board: Board) {
        let (crosses, noughts) = board;
        let outcome = if has_line(crosses) {
            Some(1.0)
        } else if has_line(noughts) {
            Some(-1.0)
        } else if history.len() == 9 {
            Some(0.0)
        } else {
            None
        };
        b.vertices.push(history.clone());
        if let Some(x) = outcome {
            b.leaves.push(history.clone());
            b.payoffs.push((history, vec![("X", x), ("O", -x)]));
            return;
        }

        if b.seen.insert(board) {
            b.information_sets.push(board);
            b.player_partition
                .push((board, if history.len() % 2 == 0 { "X" } else { "O" }));
        }
        b.information_partition.push((history.clone(), board));
        for cell in 0..9u8 {
            let bit = 1 << cell;
            if (crosses | noughts) & bit != 0 {
                continue;
            }
            let mut child = history.clone();
            child.push(cell);
            b.parents.push((child.clone(), history.clone()));
            b.action_partition.push((child.clone(), cell));
            let next = if history.len() % 2 == 0 {
                (crosses | bit, noughts)
            } else {
                (crosses, noughts | bit)
            };
            expand(b, child, next);
        }
    }

    let mut b = Builder {
        vertices: Vec::new(),
        leaves: Vec::new(),
        parents: Vec::new(),
        information_sets: Vec::new(),
        seen: HashSet::new(),
        information_partition: Vec::new(),
        action_partition: Vec::new(),
        player_partition: Vec::new(),
        payoffs: Vec::new(),
    };
    expand(&mut b, Vec::new(), (0, 0));

    ExtensiveFormGame::new(GameDefinition {
        tree: Tree::new(b.vertices, Vec::new(), b.leaves, b.parents).expect("tic-tac-toe tree"),
        information_sets: b.information_sets,
        information_partition: b.information_partition,
        actions: (0..9).collect(),
        action_partition: b.action_partition,
        players: vec!["X", "O"],
        nature: None,
        player_partition: b.player_partition,
        nature_probabilities: Vec::new(),
        payoffs: b.payoffs,
    })
    .expect("tic-tac-toe")
}

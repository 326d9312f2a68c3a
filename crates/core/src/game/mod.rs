//! Finite extensive-form games.
//!
//! An [`ExtensiveFormGame`] wraps a [`Tree`] with the information, action
//! and player partitions, nature's chance probabilities and the terminal
//! payoffs. Everything is validated once in [`ExtensiveFormGame::new`]; the
//! derived views used by the solvers and oracles are index-based and cached.
//!
//! Index conventions used throughout the crate:
//! - nodes are tree vertex indices,
//! - information sets, actions and players are positions in the
//!   de-duplicated declaration lists of [`GameDefinition`].

mod error;

use rustc_hash::{FxHashMap, FxHashSet};

pub use error::GameError;

use crate::tree::{Label, Tree};

/// Tolerance for nature distributions summing to one.
pub const NATURE_SUM_TOLERANCE: f64 = 1e-9;

/// Raw, unvalidated description of a game, produced by game adapters.
///
/// Lists of labels have set semantics (repeated entries collapse); the
/// partitions are key/value lists whose keys must be unique.
#[derive(Debug, Clone)]
pub struct GameDefinition<V, H, A, I> {
    pub tree: Tree<V>,
    pub information_sets: Vec<H>,
    /// Decision node -> information set.
    pub information_partition: Vec<(V, H)>,
    pub actions: Vec<A>,
    /// Non-root node -> action that leads into it.
    pub action_partition: Vec<(V, A)>,
    pub players: Vec<I>,
    /// Optional chance player; must also appear in `players`.
    pub nature: Option<I>,
    /// Information set -> owning player.
    pub player_partition: Vec<(H, I)>,
    /// Nature information set -> distribution over its available actions.
    pub nature_probabilities: Vec<(H, Vec<(A, f64)>)>,
    /// Terminal node -> payoff per rational player.
    pub payoffs: Vec<(V, Vec<(I, f64)>)>,
}

/// A validated finite extensive-form game.
#[derive(Debug, Clone)]
pub struct ExtensiveFormGame<V, H, A, I> {
    tree: Tree<V>,
    information_sets: Vec<H>,
    information_set_index: FxHashMap<H, usize>,
    actions: Vec<A>,
    action_index: FxHashMap<A, usize>,
    players: Vec<I>,
    player_index: FxHashMap<I, usize>,
    nature: Option<usize>,
    rational_players: Vec<usize>,
    node_information_set: Vec<Option<usize>>,
    node_action: Vec<Option<usize>>,
    information_set_player: Vec<usize>,
    information_set_nodes: Vec<Vec<usize>>,
    available_actions: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    nature_information_sets: Vec<usize>,
    nature_probabilities: Vec<Vec<f64>>,
    payoffs: Vec<Vec<f64>>,
}

fn render<T: std::fmt::Debug>(value: &T) -> String {
    format!("{value:?}")
}

/// Insertion-ordered de-duplication of a label list.
fn index_labels<T: Label>(labels: Vec<T>) -> (Vec<T>, FxHashMap<T, usize>) {
    let mut ordered = Vec::with_capacity(labels.len());
    let mut index = FxHashMap::default();
    for label in labels {
        if !index.contains_key(&label) {
            index.insert(label.clone(), ordered.len());
            ordered.push(label);
        }
    }
    (ordered, index)
}

impl<V: Label, H: Label, A: Label, I: Label> ExtensiveFormGame<V, H, A, I> {
    /// Validate a [`GameDefinition`].
    ///
    /// # Errors
    ///
    /// Returns the [`GameError`] of the first violated invariant, checked in
    /// this order: information partition domain and codomain, action
    /// partition domain and codomain, nature membership, player partition
    /// domain and codomain, nature probability and payoff domains, then the
    /// per-node action bijection, nature distributions and payoff players.
    #[allow(clippy::too_many_lines)]
    pub fn new(definition: GameDefinition<V, H, A, I>) -> Result<Self, GameError> {
        let GameDefinition {
            tree,
            information_sets,
            information_partition,
            actions,
            action_partition,
            players,
            nature,
            player_partition,
            nature_probabilities,
            payoffs,
        } = definition;

        let n = tree.len();
        let (information_sets, information_set_index) = index_labels(information_sets);
        let (actions, action_index) = index_labels(actions);
        let (players, player_index) = index_labels(players);

        // Information partition: exactly the internal vertices.
        let mut node_information_set = vec![None; n];
        let mut undefined_information_set = None;
        for (node, information_set) in &information_partition {
            let v = tree
                .index_of(node)
                .filter(|&v| !tree.is_leaf(v))
                .ok_or_else(|| GameError::InformationPartitionDomain(render(node)))?;
            if node_information_set[v].is_some() {
                return Err(GameError::InformationPartitionDomain(render(node)));
            }
            match information_set_index.get(information_set) {
                Some(&h) => node_information_set[v] = Some(h),
                None => {
                    node_information_set[v] = Some(usize::MAX);
                    undefined_information_set.get_or_insert_with(|| render(information_set));
                }
            }
        }
        if let Some(&v) = tree
            .internal_vertices()
            .iter()
            .find(|&&v| node_information_set[v].is_none())
        {
            return Err(GameError::InformationPartitionDomain(render(tree.vertex(v))));
        }
        if let Some(label) = undefined_information_set {
            return Err(GameError::UndefinedInformationSet(label));
        }

        // Action partition: exactly the non-root vertices.
        let mut node_action = vec![None; n];
        let mut undefined_action = None;
        for (node, action) in &action_partition {
            let v = tree
                .index_of(node)
                .filter(|&v| v != tree.root())
                .ok_or_else(|| GameError::ActionPartitionDomain(render(node)))?;
            if node_action[v].is_some() {
                return Err(GameError::ActionPartitionDomain(render(node)));
            }
            match action_index.get(action) {
                Some(&a) => node_action[v] = Some(a),
                None => {
                    node_action[v] = Some(usize::MAX);
                    undefined_action.get_or_insert_with(|| render(action));
                }
            }
        }
        if let Some(&v) = tree.non_roots().iter().find(|&&v| node_action[v].is_none()) {
            return Err(GameError::ActionPartitionDomain(render(tree.vertex(v))));
        }
        if let Some(label) = undefined_action {
            return Err(GameError::UndefinedAction(label));
        }

        let nature = match &nature {
            Some(label) => Some(
                *player_index
                    .get(label)
                    .ok_or_else(|| GameError::NatureNotPlayer(render(label)))?,
            ),
            None => None,
        };

        // Player partition: exactly the information sets.
        let mut information_set_player = vec![None; information_sets.len()];
        let mut undefined_player = None;
        for (information_set, player) in &player_partition {
            let h = *information_set_index
                .get(information_set)
                .ok_or_else(|| GameError::PlayerPartitionDomain(render(information_set)))?;
            if information_set_player[h].is_some() {
                return Err(GameError::PlayerPartitionDomain(render(information_set)));
            }
            match player_index.get(player) {
                Some(&i) => information_set_player[h] = Some(i),
                None => {
                    information_set_player[h] = Some(usize::MAX);
                    undefined_player.get_or_insert_with(|| render(player));
                }
            }
        }
        let information_set_player = information_set_player
            .into_iter()
            .enumerate()
            .map(|(h, player)| {
                player.ok_or_else(|| {
                    GameError::PlayerPartitionDomain(render(&information_sets[h]))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(label) = undefined_player {
            return Err(GameError::UndefinedPlayer(label));
        }

        let nature_information_sets: Vec<usize> = (0..information_sets.len())
            .filter(|&h| Some(information_set_player[h]) == nature)
            .collect();

        // Nature probabilities: keyed exactly by the nature information sets.
        let mut raw_probabilities: Vec<Option<&Vec<(A, f64)>>> = vec![None; information_sets.len()];
        for (information_set, distribution) in &nature_probabilities {
            let h = information_set_index
                .get(information_set)
                .copied()
                .filter(|&h| Some(information_set_player[h]) == nature)
                .ok_or_else(|| GameError::NatureProbabilityDomain(render(information_set)))?;
            if raw_probabilities[h].replace(distribution).is_some() {
                return Err(GameError::NatureProbabilityDomain(render(information_set)));
            }
        }
        if let Some(&h) = nature_information_sets
            .iter()
            .find(|&&h| raw_probabilities[h].is_none())
        {
            return Err(GameError::NatureProbabilityDomain(render(&information_sets[h])));
        }

        // Payoffs: keyed exactly by the terminal nodes.
        let mut raw_payoffs: Vec<Option<&Vec<(I, f64)>>> = vec![None; n];
        for (node, profile) in &payoffs {
            let v = tree
                .index_of(node)
                .filter(|&v| tree.is_leaf(v))
                .ok_or_else(|| GameError::PayoffDomain(render(node)))?;
            if raw_payoffs[v].replace(profile).is_some() {
                return Err(GameError::PayoffDomain(render(node)));
            }
        }
        if let Some(&v) = tree.leaves().iter().find(|&&v| raw_payoffs[v].is_none()) {
            return Err(GameError::PayoffDomain(render(tree.vertex(v))));
        }

        // Available actions: union of child actions over each information
        // set, in declared action order.
        let mut information_set_nodes = vec![Vec::new(); information_sets.len()];
        let mut available: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); information_sets.len()];
        for &v in tree.internal_vertices() {
            if let Some(h) = node_information_set[v] {
                information_set_nodes[h].push(v);
                available[h].extend(tree.children(v).iter().filter_map(|&c| node_action[c]));
            }
        }
        let available_actions: Vec<Vec<usize>> = available
            .into_iter()
            .map(|set| {
                let mut actions: Vec<usize> = set.into_iter().collect();
                actions.sort_unstable();
                actions
            })
            .collect();

        // Every decision node offers exactly its information set's actions,
        // each through one child.
        let mut successors = vec![Vec::new(); n];
        for &v in tree.internal_vertices() {
            let Some(h) = node_information_set[v] else { continue };
            let menu = &available_actions[h];
            let mut aligned = vec![usize::MAX; menu.len()];
            for &c in tree.children(v) {
                let slot = node_action[c].and_then(|a| menu.binary_search(&a).ok());
                match slot {
                    Some(k) if aligned[k] == usize::MAX => aligned[k] = c,
                    _ => return Err(GameError::ActionBijection(render(tree.vertex(v)))),
                }
            }
            if aligned.contains(&usize::MAX) {
                return Err(GameError::ActionBijection(render(tree.vertex(v))));
            }
            successors[v] = aligned;
        }

        // Nature distributions: defined exactly on the available actions.
        let mut aligned_probabilities = vec![Vec::new(); information_sets.len()];
        for &h in &nature_information_sets {
            let Some(distribution) = raw_probabilities[h] else { continue };
            let menu = &available_actions[h];
            let mut aligned = vec![f64::NAN; menu.len()];
            for (action, probability) in distribution {
                let slot = action_index
                    .get(action)
                    .and_then(|a| menu.binary_search(a).ok())
                    .filter(|&k| aligned[k].is_nan())
                    .ok_or_else(|| GameError::NatureProbabilityDomain(render(&information_sets[h])))?;
                aligned[slot] = *probability;
            }
            if aligned.iter().any(|p| p.is_nan()) {
                return Err(GameError::NatureProbabilityDomain(render(&information_sets[h])));
            }
            let total: f64 = aligned.iter().sum();
            let valid = aligned.iter().all(|p| p.is_finite() && *p >= 0.0);
            if !valid || (total - 1.0).abs() > NATURE_SUM_TOLERANCE {
                return Err(GameError::NatureProbabilitySum {
                    information_set: render(&information_sets[h]),
                    total,
                });
            }
            aligned_probabilities[h] = aligned;
        }

        // Payoff profiles: defined exactly for the rational players.
        let rational_players: Vec<usize> = (0..players.len()).filter(|&i| Some(i) != nature).collect();
        let mut payoff_table = vec![Vec::new(); n];
        for &v in tree.leaves() {
            let Some(profile) = raw_payoffs[v] else { continue };
            let mut row = vec![f64::NAN; players.len()];
            for (player, payoff) in profile {
                let slot = player_index
                    .get(player)
                    .copied()
                    .filter(|&i| Some(i) != nature && row[i].is_nan())
                    .ok_or_else(|| GameError::PayoffPlayers(render(tree.vertex(v))))?;
                row[slot] = *payoff;
            }
            if rational_players.iter().any(|&i| row[i].is_nan()) {
                return Err(GameError::PayoffPlayers(render(tree.vertex(v))));
            }
            if let Some(i) = nature {
                row[i] = 0.0;
            }
            payoff_table[v] = row;
        }

        log::debug!(
            "validated game: {} nodes, {} information sets, {} actions, {} players",
            n,
            information_sets.len(),
            actions.len(),
            players.len()
        );

        Ok(Self {
            tree,
            information_sets,
            information_set_index,
            actions,
            action_index,
            players,
            player_index,
            nature,
            rational_players,
            node_information_set,
            node_action,
            information_set_player,
            information_set_nodes,
            available_actions,
            successors,
            nature_information_sets,
            nature_probabilities: aligned_probabilities,
            payoffs: payoff_table,
        })
    }

    #[must_use]
    pub fn node_index(&self, node: &V) -> Option<usize> {
        self.tree.index_of(node)
    }

    #[must_use]
    pub fn information_set_index(&self, information_set: &H) -> Option<usize> {
        self.information_set_index.get(information_set).copied()
    }

    #[must_use]
    pub fn action_index(&self, action: &A) -> Option<usize> {
        self.action_index.get(action).copied()
    }

    #[must_use]
    pub fn player_index(&self, player: &I) -> Option<usize> {
        self.player_index.get(player).copied()
    }
}

impl<V, H, A, I> ExtensiveFormGame<V, H, A, I> {
    #[must_use]
    pub fn tree(&self) -> &Tree<V> {
        &self.tree
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn num_information_sets(&self) -> usize {
        self.information_sets.len()
    }

    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn node(&self, node: usize) -> &V {
        self.tree.vertex(node)
    }

    #[must_use]
    pub fn information_set(&self, information_set: usize) -> &H {
        &self.information_sets[information_set]
    }

    #[must_use]
    pub fn information_sets(&self) -> &[H] {
        &self.information_sets
    }

    #[must_use]
    pub fn action(&self, action: usize) -> &A {
        &self.actions[action]
    }

    #[must_use]
    pub fn player(&self, player: usize) -> &I {
        &self.players[player]
    }

    #[must_use]
    pub fn initial_node(&self) -> usize {
        self.tree.root()
    }

    #[must_use]
    pub fn terminal_nodes(&self) -> &[usize] {
        self.tree.leaves()
    }

    #[must_use]
    pub fn is_terminal(&self, node: usize) -> bool {
        self.tree.is_leaf(node)
    }

    /// Internal vertices, every one of which carries an information set.
    #[must_use]
    pub fn decision_nodes(&self) -> &[usize] {
        self.tree.internal_vertices()
    }

    #[must_use]
    pub fn non_initial_nodes(&self) -> &[usize] {
        self.tree.non_roots()
    }

    #[must_use]
    pub fn predecessor(&self, node: usize) -> Option<usize> {
        self.tree.parent(node)
    }

    /// Immediate successors of a decision node, aligned with
    /// [`available_actions`](Self::available_actions) of its information set.
    #[must_use]
    pub fn successors(&self, node: usize) -> &[usize] {
        &self.successors[node]
    }

    /// Child reached from `node` by `action`.
    #[must_use]
    pub fn successor(&self, node: usize, action: usize) -> Option<usize> {
        let h = self.node_information_set[node]?;
        let k = self.available_actions[h].binary_search(&action).ok()?;
        Some(self.successors[node][k])
    }

    #[must_use]
    pub fn node_information_set(&self, node: usize) -> Option<usize> {
        self.node_information_set[node]
    }

    /// Action leading into `node`; `None` for the root.
    #[must_use]
    pub fn node_action(&self, node: usize) -> Option<usize> {
        self.node_action[node]
    }

    /// Player acting at `node`; `None` for terminal nodes.
    #[must_use]
    pub fn node_player(&self, node: usize) -> Option<usize> {
        self.node_information_set[node].map(|h| self.information_set_player[h])
    }

    #[must_use]
    pub fn information_set_player(&self, information_set: usize) -> usize {
        self.information_set_player[information_set]
    }

    #[must_use]
    pub fn is_nature_information_set(&self, information_set: usize) -> bool {
        Some(self.information_set_player[information_set]) == self.nature
    }

    /// Decision nodes in the information set, in node order.
    #[must_use]
    pub fn information_set_nodes(&self, information_set: usize) -> &[usize] {
        &self.information_set_nodes[information_set]
    }

    /// Actions available at the information set, in declared action order.
    #[must_use]
    pub fn available_actions(&self, information_set: usize) -> &[usize] {
        &self.available_actions[information_set]
    }

    #[must_use]
    pub fn nature(&self) -> Option<usize> {
        self.nature
    }

    /// Players other than nature, in declaration order.
    #[must_use]
    pub fn rational_players(&self) -> &[usize] {
        &self.rational_players
    }

    #[must_use]
    pub fn nature_information_sets(&self) -> &[usize] {
        &self.nature_information_sets
    }

    /// Chance distribution of a nature information set, aligned with its
    /// available actions. Empty for rational information sets.
    #[must_use]
    pub fn nature_probabilities(&self, information_set: usize) -> &[f64] {
        &self.nature_probabilities[information_set]
    }

    #[must_use]
    pub fn nature_probability(&self, information_set: usize, action: usize) -> Option<f64> {
        let k = self.available_actions[information_set].binary_search(&action).ok()?;
        self.nature_probabilities[information_set].get(k).copied()
    }

    /// Payoff of `player` at `node`; zero away from terminal nodes and for
    /// nature.
    #[must_use]
    pub fn payoff(&self, node: usize, player: usize) -> f64 {
        self.payoffs[node].get(player).copied().unwrap_or(0.0)
    }
}

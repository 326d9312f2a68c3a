//! Game compilation to index tensors.
//!
//! [`compile`] assigns dense ids to the rational information sets, their
//! (information set, action) pairs and the rational players, then builds the
//! sparse masks and dense constants the CFR iteration runs on. Node ids are
//! the game's node indices.
//!
//! Shapes (N nodes, H information sets, A compiled actions, P players):
//! - `graph`, `level_graphs[d]`: N x N, `[u, v] = 1` iff `v` is a child of `u`
//!   (level `d` holds only edges leaving depth `d`).
//! - `action_node_mask`: A x N, keyed by each node's incoming action.
//! - `infoset_action_mask`: H x A.
//! - `node_player_mask`: N x P, row `v` set for the player who chose the
//!   action leading into `v`.
//! - `nature_strategies`: N x 1, chance probability of the edge into `v`.

use std::fmt;

use crate::backend::Backend;
use crate::game::ExtensiveFormGame;
use crate::progress;

/// Sizes of a compiled game.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompileStats {
    pub nodes: usize,
    pub information_sets: usize,
    pub actions: usize,
    pub players: usize,
    pub levels: usize,
    pub graph_nnz: usize,
    pub action_node_nnz: usize,
}

impl fmt::Display for CompileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compiled game:")?;
        writeln!(f, "  Nodes:             {}", self.nodes)?;
        writeln!(f, "  Information sets:  {}", self.information_sets)?;
        writeln!(f, "  Actions:           {}", self.actions)?;
        writeln!(f, "  Players:           {}", self.players)?;
        writeln!(f, "  Levels:            {}", self.levels)?;
        writeln!(
            f,
            "  Non-zeros:         {} (graph), {} (action-node)",
            self.graph_nnz, self.action_node_nnz
        )
    }
}

/// Index maps and tensors derived from an [`ExtensiveFormGame`].
#[derive(Debug, Clone)]
pub struct CompiledGame<B: Backend> {
    /// Game information set of each compiled information set.
    pub information_sets: Vec<usize>,
    /// Compiled id of each game information set (`None` for nature).
    pub information_set_ids: Vec<Option<usize>>,
    /// `(game information set, game action)` of each compiled action.
    pub actions: Vec<(usize, usize)>,
    /// First compiled action of each compiled information set; the last
    /// entry is the total action count.
    pub action_offsets: Vec<usize>,
    /// Game player of each compiled player.
    pub players: Vec<usize>,
    /// Compiled id of each game player (`None` for nature).
    pub player_ids: Vec<Option<usize>>,

    /// Full adjacency (N x N) and its transpose.
    pub graph: B::Sparse,
    pub graph_t: B::Sparse,
    /// Adjacency split by breadth-first depth, root level first.
    pub level_graphs: Vec<B::Sparse>,
    pub level_graphs_t: Vec<B::Sparse>,
    /// A x N and its transpose.
    pub action_node_mask: B::Sparse,
    pub action_node_mask_t: B::Sparse,
    /// H x A and its transpose.
    pub infoset_action_mask: B::Sparse,
    pub infoset_action_mask_t: B::Sparse,
    /// H x N, `infoset_action_mask @ action_node_mask`.
    pub infoset_node_mask: B::Sparse,
    /// N x P (0/1).
    pub node_player_mask: B::Dense,
    /// N x 1.
    pub nature_strategies: B::Dense,
    /// N x P, terminal payoffs and zero elsewhere.
    pub initial_payoffs: B::Dense,
    /// N x P, one on the root row.
    pub initial_reach: B::Dense,
    /// H x 1, reciprocal of each information set's action count.
    pub inverse_action_counts: B::Dense,
    /// A x 1, the uniform behavioral profile.
    pub uniform_strategy: B::Dense,

    pub stats: CompileStats,
}

impl<B: Backend> CompiledGame<B> {
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.stats.nodes
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

    /// Compiled action for a game information set and game action.
    #[must_use]
    pub fn action_id<V, H, A, I>(
        &self,
        game: &ExtensiveFormGame<V, H, A, I>,
        information_set: usize,
        action: usize,
    ) -> Option<usize> {
        let h = self.information_set_ids.get(information_set).copied().flatten()?;
        let k = game.available_actions(information_set).binary_search(&action).ok()?;
        Some(self.action_offsets[h] + k)
    }

    /// Compiled actions of compiled information set `h`.
    #[must_use]
    pub fn action_range(&self, h: usize) -> std::ops::Range<usize> {
        self.action_offsets[h]..self.action_offsets[h + 1]
    }
}

/// Compile a game for `backend`.
///
/// # Panics
///
/// Panics if the breadth-first level partition does not exhaust the tree,
/// which validated games rule out.
#[allow(clippy::cast_precision_loss, clippy::too_many_lines)]
pub fn compile<B: Backend, V, H, A, I>(
    game: &ExtensiveFormGame<V, H, A, I>,
    backend: &B,
    show_progress: bool,
) -> CompiledGame<B> {
    let sp = progress::spinner(show_progress, "assigning indices...");

    let n = game.num_nodes();
    let mut information_sets = Vec::new();
    let mut information_set_ids = vec![None; game.num_information_sets()];
    let mut actions = Vec::new();
    let mut action_offsets = vec![0];
    for h in 0..game.num_information_sets() {
        if game.is_nature_information_set(h) {
            continue;
        }
        information_set_ids[h] = Some(information_sets.len());
        information_sets.push(h);
        actions.extend(game.available_actions(h).iter().map(|&a| (h, a)));
        action_offsets.push(actions.len());
    }
    let mut player_ids = vec![None; game.num_players()];
    let players = game.rational_players().to_vec();
    for (i, &player) in players.iter().enumerate() {
        player_ids[player] = Some(i);
    }
    let (num_h, num_a, num_p) = (information_sets.len(), actions.len(), players.len());

    sp.set_message("building level graphs...");
    let mut graph_triplets = Vec::with_capacity(n.saturating_sub(1));
    let mut level_triplets = Vec::with_capacity(game.tree().levels().len());
    for level in game.tree().levels() {
        let edges: Vec<_> = level
            .iter()
            .flat_map(|&u| game.tree().children(u).iter().map(move |&v| (u, v, 1.0)))
            .collect();
        graph_triplets.extend_from_slice(&edges);
        level_triplets.push(edges);
    }
    assert!(
        level_triplets.last().is_some_and(Vec::is_empty),
        "level partition does not exhaust the tree"
    );
    level_triplets.pop();

    sp.set_message("building masks...");
    let mut action_node = Vec::new();
    let mut infoset_node = Vec::new();
    let mut node_player = vec![0.0; n * num_p];
    let mut nature_strategies = vec![0.0; n];
    for &v in game.non_initial_nodes() {
        let (Some(parent), Some(action)) = (game.predecessor(v), game.node_action(v)) else {
            continue;
        };
        let Some(h) = game.node_information_set(parent) else {
            continue;
        };
        match information_set_ids[h] {
            Some(hc) => {
                let k = game
                    .available_actions(h)
                    .binary_search(&action)
                    .unwrap_or_else(|_| unreachable!("validated action menu"));
                action_node.push((action_offsets[hc] + k, v, 1.0));
                infoset_node.push((hc, v, 1.0));
                if let Some(i) = player_ids[game.information_set_player(h)] {
                    node_player[v * num_p + i] = 1.0;
                }
            }
            None => {
                nature_strategies[v] = game.nature_probability(h, action).unwrap_or(0.0);
            }
        }
    }
    let infoset_action: Vec<_> = (0..num_h)
        .flat_map(|hc| (action_offsets[hc]..action_offsets[hc + 1]).map(move |a| (hc, a, 1.0)))
        .collect();

    let mut initial_payoffs = vec![0.0; n * num_p];
    for &v in game.terminal_nodes() {
        for (i, &player) in players.iter().enumerate() {
            initial_payoffs[v * num_p + i] = game.payoff(v, player);
        }
    }
    let mut initial_reach = vec![0.0; n * num_p];
    let root = game.initial_node();
    initial_reach[root * num_p..(root + 1) * num_p].fill(1.0);

    let action_counts: Vec<usize> = (0..num_h).map(|hc| action_offsets[hc + 1] - action_offsets[hc]).collect();
    let inverse_action_counts: Vec<f64> = action_counts
        .iter()
        .map(|&c| if c == 0 { 0.0 } else { 1.0 / c as f64 })
        .collect();
    let uniform_strategy: Vec<f64> = (0..num_h)
        .flat_map(|hc| std::iter::repeat(inverse_action_counts[hc]).take(action_counts[hc]))
        .collect();

    sp.set_message("uploading tensors...");
    let graph = backend.sparse(n, n, &graph_triplets);
    let graph_t = backend.transpose(&graph);
    let level_graphs: Vec<_> = level_triplets.iter().map(|t| backend.sparse(n, n, t)).collect();
    let level_graphs_t = level_graphs.iter().map(|g| backend.transpose(g)).collect();
    let action_node_mask = backend.sparse(num_a, n, &action_node);
    let action_node_mask_t = backend.transpose(&action_node_mask);
    let infoset_action_mask = backend.sparse(num_h, num_a, &infoset_action);
    let infoset_action_mask_t = backend.transpose(&infoset_action_mask);
    let infoset_node_mask = backend.sparse(num_h, n, &infoset_node);

    let stats = CompileStats {
        nodes: n,
        information_sets: num_h,
        actions: num_a,
        players: num_p,
        levels: level_graphs.len(),
        graph_nnz: backend.nnz(&graph),
        action_node_nnz: backend.nnz(&action_node_mask),
    };
    sp.finish_and_clear();
    log::debug!(
        "compiled game on {}: {} nodes, {} information sets, {} actions, {} players, {} levels",
        backend.name(),
        stats.nodes,
        stats.information_sets,
        stats.actions,
        stats.players,
        stats.levels
    );

    CompiledGame {
        information_sets,
        information_set_ids,
        actions,
        action_offsets,
        players,
        player_ids,
        graph,
        graph_t,
        level_graphs,
        level_graphs_t,
        action_node_mask,
        action_node_mask_t,
        infoset_action_mask,
        infoset_action_mask_t,
        infoset_node_mask,
        node_player_mask: backend.dense(n, num_p, &node_player),
        nature_strategies: backend.column(&nature_strategies),
        initial_payoffs: backend.dense(n, num_p, &initial_payoffs),
        initial_reach: backend.dense(n, num_p, &initial_reach),
        inverse_action_counts: backend.column(&inverse_action_counts),
        uniform_strategy: backend.column(&uniform_strategy),
        stats,
    }
}

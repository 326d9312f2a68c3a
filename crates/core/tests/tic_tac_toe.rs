//! Best responses on tic-tac-toe, a game too deep to enumerate by hand.

mod common;

use common::{tic_tac_toe, TicTacToe};
use efg_solver_core::cfr::ExpectedPayoffs;
use efg_solver_core::{calculate_exploitability, BestResponse};
use test_macros::timed_test;

/// Minimax play: at each position the mover picks the first action, in
/// declared order, that secures the position's value.
fn minimax_profile(game: &TicTacToe) -> impl Fn(usize, usize) -> f64 + '_ {
    let crosses = game.player_index(&"X").unwrap();
    let mut value = vec![0.0; game.num_nodes()];
    for &v in game.terminal_nodes() {
        value[v] = game.payoff(v, crosses);
    }
    for level in game.tree().levels().iter().rev() {
        for &v in level {
            let Some(h) = game.node_information_set(v) else {
                continue;
            };
            let children = game.successors(v).iter().map(|&c| value[c]);
            let best = if game.information_set_player(h) == crosses {
                children.fold(f64::NEG_INFINITY, f64::max)
            } else {
                children.fold(f64::INFINITY, f64::min)
            };
            value[v] = best;
        }
    }

    let choice: Vec<usize> = (0..game.num_information_sets())
        .map(|h| {
            let node = game.information_set_nodes(h)[0];
            game.available_actions(h)
                .iter()
                .copied()
                .find(|&a| game.successor(node, a).is_some_and(|c| value[c] == value[node]))
                .unwrap()
        })
        .collect();

    move |node, action| {
        let h = game.node_information_set(node).unwrap();
        if choice[h] == action {
            1.0
        } else {
            0.0
        }
    }
}

#[timed_test(300)]
fn best_responses_to_each_other_draw() {
    let game = tic_tac_toe();
    assert_eq!(game.num_nodes(), 549_946);
    assert_eq!(game.terminal_nodes().len(), 255_168);
    let (crosses, noughts) = (game.player_index(&"X").unwrap(), game.player_index(&"O").unwrap());

    let seed = minimax_profile(&game);
    let seed_payoffs = ExpectedPayoffs::new(&game, &seed);
    assert_eq!(seed_payoffs.node(game.initial_node()), [0.0, 0.0]);

    let x = BestResponse::new(&game, &seed, crosses).unwrap();
    let o = BestResponse::new(&game, &seed, noughts).unwrap();
    assert_eq!(x.value(), 0.0);
    assert_eq!(o.value(), 0.0);

    // Each side plays its best response; neither can force a win.
    let mutual = |node: usize, action: usize| {
        let h = game.node_information_set(node).unwrap();
        let response = if game.information_set_player(h) == crosses { &x } else { &o };
        f64::from(u8::from(response.best_action(h).unwrap() == action))
    };
    let payoffs = ExpectedPayoffs::new(&game, &mutual);
    assert_eq!(payoffs.node(game.initial_node()), [0.0, 0.0]);

    assert_eq!(calculate_exploitability(&game, &seed), 0.0);
}

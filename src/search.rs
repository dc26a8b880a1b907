//! Depth-limited negamax search, truncated to a move budget per node and
//! perturbed at the root so tied candidates don't always resolve
//! identically across games.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::action::Action;
use crate::color::Color;
use crate::evaluator::Evaluator;
use crate::pieces;
use crate::state::GameState;

/// A position evaluator, at the seam the search calls into. Implemented by
/// `Evaluator`; a separate trait so search code never depends on the
/// concrete value-table shape.
pub trait Eval {
    fn score(&self, state: &GameState, root: Color) -> i64;
}

impl Eval for Evaluator {
    fn score(&self, state: &GameState, root: Color) -> i64 {
        Evaluator::score(self, state, root)
    }
}

/// Dominates any non-terminal evaluator score; a depth bonus is added on
/// top so faster wins (and slower losses) are still preferred among
/// terminal outcomes.
const WIN_VALUE: i64 = 100_000_000;

#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub depth: u8,
    pub max_moves_per_action: usize,
    pub seed: u64,
}

/// Runs a depth-limited negamax search from `state`'s current player and
/// returns the chosen action. Returns `Action::Pass` if no legal action
/// exists (only possible when the game is already decided).
pub fn search(state: &GameState, eval: &impl Eval, params: &SearchParams) -> Action {
    if state.winner.is_some() {
        return Action::Pass;
    }
    let mover = state.current_player;
    let budget = params.max_moves_per_action.max(1);
    let candidates = order_candidates(state, state.legal_actions());
    let truncated: Vec<Action> = candidates.into_iter().take(budget).collect();
    let Some(&first) = truncated.first() else {
        return Action::Pass;
    };

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut best_action = first;
    let mut best_jittered = f64::NEG_INFINITY;

    for &action in &truncated {
        let mut child = state.clone();
        child.apply(&action);
        if child.round_number > 50 && child.winner.is_none() {
            child.resolve_timeout();
        }
        let raw = if child.current_player == mover {
            negamax(&child, eval, params.depth, budget)
        } else {
            -negamax(&child, eval, params.depth.saturating_sub(1), budget)
        };
        let jitter: f64 = rng.gen_range(-0.5..0.5);
        let jittered = raw as f64 + jitter;
        if jittered > best_jittered {
            best_jittered = jittered;
            best_action = action;
        }
    }

    best_action
}

/// Returns `state`'s negamax value from the perspective of `state`'s
/// current player.
fn negamax(state: &GameState, eval: &impl Eval, depth: u8, budget: usize) -> i64 {
    let mover = state.current_player;

    if let Some(winner) = state.winner {
        let bonus = depth as i64;
        return if winner == mover { WIN_VALUE + bonus } else { -(WIN_VALUE + bonus) };
    }
    if depth == 0 {
        return eval.score(state, mover);
    }

    let candidates = order_candidates(state, state.legal_actions());
    let mut best = i64::MIN;
    for action in candidates.into_iter().take(budget.max(1)) {
        let mut child = state.clone();
        child.apply(&action);
        if child.round_number > 50 && child.winner.is_none() {
            child.resolve_timeout();
        }
        let value = if child.current_player == mover {
            negamax(&child, eval, depth, budget)
        } else {
            -negamax(&child, eval, depth - 1, budget)
        };
        if value > best {
            best = value;
        }
    }
    best
}

/// Stably reorders `actions`: captures first, then king-relevant actions,
/// then everything else. The exact tie-breaking order among equally-good
/// actions is otherwise unconstrained; this is the single order this crate
/// commits to, exposed so tests can assert on it directly.
pub fn order_candidates(state: &GameState, mut actions: Vec<Action>) -> Vec<Action> {
    actions.sort_by_key(|a| action_priority(state, a));
    actions
}

fn action_priority(state: &GameState, action: &Action) -> u8 {
    match action {
        Action::Move { to, .. } if state.board.get(*to).is_some() => 0,
        _ if is_king_relevant(state, action) => 1,
        _ => 2,
    }
}

fn is_king_relevant(state: &GameState, action: &Action) -> bool {
    match action {
        Action::Move { from, .. } | Action::Rotate { at: from, .. } => {
            state.board.get(*from).map_or(false, |p| pieces::is_king(p.kind))
        }
        Action::Swap { a, .. } => state.board.get(*a).map_or(false, |p| pieces::is_king(p.kind)),
        Action::Rebirth { kind, .. } => pieces::is_king(*kind),
        Action::Pass | Action::Surrender => false,
    }
}

//! The tournament system: the fitness probe the evolutionary loop calls
//! once per candidate ruleset. Builds a matchup schedule across depth
//! tiers, plays every game with `search`, and aggregates the results into
//! a single fitness score.

use crate::color::Color;
use crate::ruleset::Ruleset;
use crate::search::{search, SearchParams};
use crate::state::GameState;

const MAX_ACTIONS_PER_GAME: u32 = 500;
const MOVE_BUDGET: usize = 15;

/// One depth pairing in a schedule: `depth_a` vs. `depth_b`, `games` total,
/// alternating colors by seed parity. `weight` is carried from the
/// reference schedule builder but, matching that implementation, is not
/// itself read by the fitness aggregation below -- the aggregation
/// recomputes its own depth-gap weight instead. Kept here rather than
/// dropped, since a future fitness formula may want it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchupSpec {
    pub depth_a: u8,
    pub depth_b: u8,
    pub games: u32,
    pub weight: f64,
}

/// Builds the matchup schedule for a tournament targeting `base_depth`:
/// an equal-depth matchup at every even tier up to `base_depth` (plus
/// `base_depth` itself if odd), a 1-ply handicap matchup from tier 3 up,
/// and a 2-ply handicap matchup from tier 4 up. The target tier gets extra
/// games and extra weight so the depth the ruleset will actually run at
/// gets the most scrutiny.
pub fn matchup_schedule(base_depth: u8, reduced: bool) -> Vec<MatchupSpec> {
    let target = base_depth.max(2);
    let base_games: u32 = if reduced { 2 } else { 4 };

    let mut tiers: Vec<u8> = (2..=target).step_by(2).collect();
    if !tiers.contains(&target) {
        tiers.push(target);
    }
    tiers.sort_unstable();
    tiers.dedup();

    let mut schedule = Vec::new();
    for tier in tiers {
        let is_target = tier == target;
        let (n_games, weight_equal, weight_1ply, weight_2ply) = if reduced {
            if is_target {
                (base_games * 2, 1.5, 1.5, 2.5)
            } else {
                let t = tier as f64 / 10.0;
                (base_games, 0.6 + t, 0.8 + t, 1.2 + t)
            }
        } else {
            let t = tier as f64 / 10.0;
            let (mut we, mut w1, mut w2) = (0.6 + t, 0.8 + t, 1.2 + t);
            if is_target {
                we += 0.3;
                w1 += 0.3;
                w2 += 0.5;
            }
            (base_games, we, w1, w2)
        };

        schedule.push(MatchupSpec { depth_a: tier, depth_b: tier, games: n_games, weight: weight_equal });
        if tier >= 3 {
            schedule.push(MatchupSpec { depth_a: tier, depth_b: tier - 1, games: n_games, weight: weight_1ply });
        }
        if tier >= 4 {
            schedule.push(MatchupSpec { depth_a: tier, depth_b: tier - 2, games: n_games, weight: weight_2ply });
        }
    }
    schedule
}

/// The outcome of one game.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult {
    pub white_depth: u8,
    pub black_depth: u8,
    pub winner: Option<Color>,
    pub rounds: u32,
    pub seed: u64,
}

/// Plays one game to a decision: to a legal-action-exhaustion terminal, a
/// king capture, the round-50 proximity tiebreaker, or the 500-action
/// safety cap (at which point whatever `resolve_timeout` would decide is
/// taken as final, even past round 50). Single-threaded and deterministic
/// for a fixed seed.
pub fn play_game(ruleset: &Ruleset, white_depth: u8, black_depth: u8, seed: u64) -> MatchResult {
    let mut state = GameState::from_ruleset(ruleset)
        .expect("ruleset passed to play_game should already be validated by its caller");
    let evaluator = ruleset.to_evaluator();

    let mut actions_played = 0u32;
    while state.winner.is_none() && actions_played < MAX_ACTIONS_PER_GAME {
        if state.round_number > 50 {
            state.resolve_timeout();
            if state.winner.is_some() {
                break;
            }
        }
        let depth = match state.current_player {
            Color::White => white_depth,
            Color::Black => black_depth,
        };
        let params = SearchParams {
            depth,
            max_moves_per_action: MOVE_BUDGET,
            seed: seed.wrapping_add(actions_played as u64),
        };
        let action = search(&state, &evaluator, &params);
        state.apply(&action);
        actions_played += 1;
    }
    if state.winner.is_none() {
        state.resolve_timeout();
    }

    MatchResult { white_depth, black_depth, winner: state.winner, rounds: state.round_number, seed }
}

/// Aggregate statistics for one depth pairing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchupStats {
    pub deeper_depth: u8,
    pub shallower_depth: u8,
    pub deeper_wins: u32,
    pub shallower_wins: u32,
    pub draws: u32,
    pub games_played: u32,
    pub white_wins: u32,
    pub black_wins: u32,
    pub total_rounds: u64,
}

impl MatchupStats {
    pub fn avg_rounds(&self) -> f64 {
        if self.games_played == 0 { 0.0 } else { self.total_rounds as f64 / self.games_played as f64 }
    }

    pub fn deeper_win_rate(&self) -> f64 {
        if self.games_played == 0 { 0.0 } else { self.deeper_wins as f64 / self.games_played as f64 }
    }

    pub fn white_win_rate(&self) -> f64 {
        let non_draws = self.white_wins + self.black_wins;
        if non_draws == 0 { 0.5 } else { self.white_wins as f64 / non_draws as f64 }
    }
}

/// Plays out `spec.games` games between `spec.depth_a` and `spec.depth_b`,
/// the deeper side alternating between white and black by seed parity so
/// it appears as white in half the games.
pub fn run_matchup(ruleset: &Ruleset, spec: &MatchupSpec, base_seed: u64) -> MatchupStats {
    let deeper = spec.depth_a.max(spec.depth_b);
    let shallower = spec.depth_a.min(spec.depth_b);
    let mut stats = MatchupStats { deeper_depth: deeper, shallower_depth: shallower, ..Default::default() };

    for i in 0..spec.games {
        let seed = base_seed + i as u64;
        let (white_depth, black_depth) = if i % 2 == 0 { (deeper, shallower) } else { (shallower, deeper) };
        let result = play_game(ruleset, white_depth, black_depth, seed);

        stats.games_played += 1;
        stats.total_rounds += result.rounds as u64;
        match result.winner {
            None => stats.draws += 1,
            Some(Color::White) => {
                stats.white_wins += 1;
                if result.white_depth == deeper { stats.deeper_wins += 1 } else { stats.shallower_wins += 1 }
            }
            Some(Color::Black) => {
                stats.black_wins += 1;
                if result.black_depth == deeper { stats.deeper_wins += 1 } else { stats.shallower_wins += 1 }
            }
        }
    }
    stats
}

/// The full outcome of evaluating a ruleset: the per-matchup breakdown
/// plus the aggregated fitness components.
#[derive(Debug, Clone)]
pub struct TournamentResult {
    pub matchups: Vec<(MatchupSpec, MatchupStats)>,
    pub skill_gradient: f64,
    pub color_fairness: f64,
    pub game_richness: f64,
    pub decisiveness: f64,
    pub fitness: f64,
}

/// Runs the full matchup schedule for `ruleset` at `base_depth` and
/// computes its fitness.
pub fn evaluate_ruleset(ruleset: &Ruleset, base_depth: u8, base_seed: u64, reduced: bool) -> TournamentResult {
    let schedule = matchup_schedule(base_depth, reduced);
    let mut matchups = Vec::with_capacity(schedule.len());
    let mut seed_offset = 0u64;
    let mut total_games = 0u32;
    let mut total_rounds = 0u64;
    let mut white_wins_total = 0u32;
    let mut black_wins_total = 0u32;
    let mut draws_total = 0u32;

    for spec in &schedule {
        let stats = run_matchup(ruleset, spec, base_seed + seed_offset);
        seed_offset += spec.games as u64;
        total_games += stats.games_played;
        total_rounds += stats.total_rounds;
        white_wins_total += stats.white_wins;
        black_wins_total += stats.black_wins;
        draws_total += stats.draws;
        matchups.push((*spec, stats));
    }

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (spec, stats) in &matchups {
        if spec.depth_a != spec.depth_b {
            let gap = (spec.depth_a as f64 - spec.depth_b as f64).abs();
            let weight = 1.0 + (gap - 1.0) * 0.5;
            weighted_sum += stats.deeper_win_rate() * weight;
            weight_total += weight;
        }
    }
    let skill_gradient = if weight_total > 0.0 { weighted_sum / weight_total } else { 0.5 };

    let mut equal_depth_games = 0u32;
    let mut equal_depth_balance = 0.0;
    let mut any_equal_depth_shutout = false;
    for (spec, stats) in &matchups {
        if spec.depth_a == spec.depth_b {
            equal_depth_games += stats.games_played;
            let win_rate = stats.white_win_rate();
            equal_depth_balance += (1.0 - (win_rate - 0.5).abs() * 2.0) * stats.games_played as f64;
            if stats.games_played >= 4 && (stats.white_wins == 0 || stats.black_wins == 0) {
                any_equal_depth_shutout = true;
            }
        }
    }
    let color_fairness = if equal_depth_games > 0 { equal_depth_balance / equal_depth_games as f64 } else { 0.5 };

    let avg_rounds = if total_games > 0 { total_rounds as f64 / total_games as f64 } else { 0.0 };
    let game_richness = if avg_rounds < 15.0 {
        (avg_rounds / 15.0).clamp(0.0, 1.0)
    } else if avg_rounds > 50.0 {
        (1.0 - (avg_rounds - 50.0) / 50.0).max(0.0)
    } else {
        1.0
    };

    let decisiveness = if total_games > 0 { 1.0 - draws_total as f64 / total_games as f64 } else { 0.5 };

    let skill_score = if skill_gradient >= 0.95 {
        1.0
    } else if skill_gradient >= 0.90 {
        0.9 + (skill_gradient - 0.90) * 2.0
    } else if skill_gradient >= 0.80 {
        0.6 + (skill_gradient - 0.80) * 3.0
    } else if skill_gradient >= 0.65 {
        0.3 + (skill_gradient - 0.65) * 2.0
    } else {
        skill_gradient * 0.5
    };

    let mut fitness = 0.40 * skill_score + 0.35 * color_fairness + 0.15 * game_richness + 0.10 * decisiveness;
    if any_equal_depth_shutout {
        fitness *= 0.3;
    }
    if skill_gradient < 0.80 {
        fitness *= 0.5;
    }

    TournamentResult { matchups, skill_gradient, color_fairness, game_richness, decisiveness, fitness }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::Hex;
    use crate::pieces::PieceId;
    use crate::template::TemplateId;

    fn minimal_ruleset() -> Ruleset {
        let white_zone: Vec<(i8, i8)> =
            crate::ruleset::piece_zone(Color::White).into_iter().take(8).map(|h| (h.q, h.r)).collect();
        let black_zone: Vec<(i8, i8)> =
            crate::ruleset::piece_zone(Color::Black).into_iter().take(8).map(|h| (h.q, h.r)).collect();
        Ruleset {
            white_king: PieceId("K1"),
            white_pieces: vec![PieceId("A1"); 8],
            black_king: PieceId("K1"),
            black_pieces: vec![PieceId("A1"); 8],
            white_template: TemplateId::E,
            black_template: TemplateId::E,
            white_positions: Some(
                std::iter::once((crate::ruleset::WHITE_KING_POS.q, crate::ruleset::WHITE_KING_POS.r))
                    .chain(white_zone)
                    .collect(),
            ),
            black_positions: Some(
                std::iter::once((crate::ruleset::BLACK_KING_POS.q, crate::ruleset::BLACK_KING_POS.r))
                    .chain(black_zone)
                    .collect(),
            ),
            white_facings: None,
            black_facings: None,
            name: None,
        }
    }

    #[test]
    fn target_tier_gets_a_bonus_weight_over_lower_tiers() {
        let schedule = matchup_schedule(4, false);
        let target_equal = schedule.iter().find(|s| s.depth_a == 4 && s.depth_b == 4).unwrap();
        let lower_equal = schedule.iter().find(|s| s.depth_a == 2 && s.depth_b == 2).unwrap();
        assert!(target_equal.weight > lower_equal.weight);
    }

    #[test]
    fn schedule_includes_one_and_two_ply_handicaps_from_the_right_tier() {
        let schedule = matchup_schedule(4, false);
        assert!(schedule.iter().any(|s| s.depth_a == 3 && s.depth_b == 2));
        assert!(schedule.iter().any(|s| s.depth_a == 4 && s.depth_b == 3));
        assert!(schedule.iter().any(|s| s.depth_a == 4 && s.depth_b == 2));
        assert!(!schedule.iter().any(|s| s.depth_a == 2 && s.depth_b == 1));
    }

    #[test]
    fn reduced_target_tier_doubles_games() {
        let full = matchup_schedule(2, false);
        let reduced = matchup_schedule(2, true);
        let full_games = full.iter().find(|s| s.depth_a == 2 && s.depth_b == 2).unwrap().games;
        let reduced_games = reduced.iter().find(|s| s.depth_a == 2 && s.depth_b == 2).unwrap().games;
        assert_eq!(reduced_games, 4);
        assert_eq!(full_games, 4);
    }

    #[test]
    fn run_matchup_alternates_deeper_side_between_colors() {
        let ruleset = minimal_ruleset();
        let spec = MatchupSpec { depth_a: 1, depth_b: 1, games: 2, weight: 1.0 };
        let stats = run_matchup(&ruleset, &spec, 0);
        assert_eq!(stats.games_played, 2);
        assert_eq!(stats.white_wins + stats.black_wins + stats.draws, 2);
    }

    #[test]
    fn play_game_terminates_with_a_decision() {
        let ruleset = minimal_ruleset();
        let result = play_game(&ruleset, 1, 1, 7);
        assert!(result.rounds > 0);
    }

    #[test]
    fn skill_score_is_capped_at_one_past_the_perfect_threshold() {
        // Mirrors the piecewise boost's upper clamp without running a full
        // tournament: 0.97 and 1.0 should both map to the maximum score.
        let score_of = |sg: f64| -> f64 {
            if sg >= 0.95 { 1.0 } else { 0.9 + (sg - 0.90) * 2.0 }
        };
        assert_eq!(score_of(0.97), 1.0);
        assert_eq!(score_of(1.0), 1.0);
    }
}

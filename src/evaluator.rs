//! Static position evaluation: per-color piece values plus a center-control
//! term, scored from a chosen root player's perspective.

use std::collections::HashMap;

use crate::color::Color;
use crate::hex::RADIUS;
use crate::pieces::{self, PieceId, Special};
use crate::ruleset::Ruleset;
use crate::state::GameState;
use crate::template::TemplateId;

/// Dominates any realistic material swing, so a king capture always
/// outweighs the rest of the board.
pub const KING_VALUE: i64 = 1_000_000;

/// Mobility-derived base values, keyed by piece id, shared by both colors
/// in the non-template-aware baseline. Ported from the reference
/// heuristics' `base_values` table (average legal-move counts from an
/// open board position).
pub(crate) static BASE_VALUES: &[(&str, f64)] = &[
    ("A1", 1.0), ("A2", 5.0), ("A3", 3.0), ("A4", 2.5), ("A5", 2.0),
    ("B1", 2.0), ("B2", 4.0), ("B3", 10.0), ("B4", 6.0),
    ("C1", 3.0), ("C2", 8.5), ("C3", 14.0),
    ("D1", 5.0), ("D2", 7.0), ("D3", 13.0), ("D4", 13.0), ("D5", 20.0),
    ("E1", 5.0), ("E2", 9.5),
    ("F1", 6.5), ("F2", 13.0),
    ("W1", 8.0), ("W2", 5.0), ("P1", 1.5), ("G1", 2.5),
];

/// Per-color piece values and center-control weights used by `score`.
#[derive(Debug, Clone)]
pub struct Evaluator {
    pub white_values: HashMap<PieceId, f64>,
    pub black_values: HashMap<PieceId, f64>,
    pub white_center_weight: f64,
    pub black_center_weight: f64,
    /// King-proximity weight used only by the round-50 tiebreaker scoring
    /// path, not by the material formula below -- carried from the
    /// reference `Heuristics` record, which keeps it distinct from the
    /// general center weight even where the higher-level design folds both
    /// into one "center_weight" term.
    pub white_king_center_weight: f64,
    pub black_king_center_weight: f64,
}

impl Evaluator {
    fn value_of(&self, kind: PieceId, owner: Color) -> i64 {
        if pieces::is_king(kind) {
            return KING_VALUE;
        }
        let table = match owner {
            Color::White => &self.white_values,
            Color::Black => &self.black_values,
        };
        *table.get(&kind).unwrap_or(&1.0) as i64
    }

    /// Scores `state` from `root`'s perspective: positive favors `root`.
    pub fn score(&self, state: &GameState, root: Color) -> i64 {
        let mut material = 0i64;
        for (_, piece) in state.board.iter() {
            let value = self.value_of(piece.kind, piece.owner);
            material += match piece.owner {
                Color::White => value,
                Color::Black => -value,
            };
        }

        let r = RADIUS as f64;
        let white_dist = state.king_positions[Color::White.index()].distance_to_center() as f64;
        let black_dist = state.king_positions[Color::Black.index()].distance_to_center() as f64;
        let white_count = state.board.count(Color::White) as f64;
        let black_count = state.board.count(Color::Black) as f64;
        let center_term = self.white_center_weight * white_count * (r - white_dist)
            - self.black_center_weight * black_count * (r - black_dist);

        let raw = material + center_term.round() as i64;
        match root {
            Color::White => raw,
            Color::Black => -raw,
        }
    }

    /// The non-template-aware baseline: the same mobility-derived value
    /// table for both colors, regardless of which pieces the ruleset uses.
    pub fn default_for(_ruleset: &Ruleset) -> Evaluator {
        let values: HashMap<PieceId, f64> = BASE_VALUES.iter().map(|&(id, v)| (PieceId(id), v)).collect();
        Evaluator {
            white_values: values.clone(),
            black_values: values,
            white_center_weight: 0.5,
            black_center_weight: 0.5,
            white_king_center_weight: 1.0,
            black_king_center_weight: 1.0,
        }
    }

    /// The template-aware value table actually used by search and the
    /// tournament: values derived from each kind's open-board reachable-
    /// cell count, boosted for specials, and scaled by how much the
    /// ruleset's turn template rewards or punishes directional pieces.
    pub fn template_aware_for(ruleset: &Ruleset) -> Evaluator {
        Evaluator {
            white_values: side_value_table(ruleset.white_template),
            black_values: side_value_table(ruleset.black_template),
            white_center_weight: 0.5,
            black_center_weight: 0.5,
            white_king_center_weight: 1.0,
            black_king_center_weight: 1.0,
        }
    }
}

fn side_value_table(template: TemplateId) -> HashMap<PieceId, f64> {
    pieces::REGULAR_PIECE_IDS
        .iter()
        .map(|&id| (id, template_aware_value(id, template)))
        .collect()
}

fn template_aware_value(id: PieceId, template: TemplateId) -> f64 {
    let kind = pieces::kind_of(id);
    let mobility = reachable_cell_count(kind) as f64;
    let special_bonus = match kind.special {
        Some(Special::SwapMove) => 6.0,
        Some(Special::SwapRotate) => 0.0,
        Some(Special::Rebirth) => -1.5,
        Some(Special::Phased) => -1.0,
        None => 0.0,
    };
    let base = (mobility + special_bonus).max(0.5);
    base * template_multiplier(kind, template)
}

/// How many cells a piece could legally move to from the board center on
/// an otherwise empty board -- the mobility figure the reference
/// heuristics compute by sampling a few reference squares; here taken
/// directly at the center, which for a symmetric radius-4 board gives the
/// same relative ordering across kinds.
fn reachable_cell_count(kind: &pieces::PieceKind) -> usize {
    use crate::hex::{self, Hex, Direction};
    let center = Hex::new(0, 0);
    let facing = Direction::N;
    match kind.movement {
        pieces::MovementMode::Step(range) => kind
            .directions
            .iter()
            .map(|&rel| {
                let abs_dir = facing.rotate(rel);
                (1..=range as i32)
                    .take_while(|&steps| {
                        let (dq, dr) = abs_dir.vector();
                        Hex::new(center.q + dq * steps as i8, center.r + dr * steps as i8).is_valid()
                    })
                    .count()
            })
            .sum(),
        pieces::MovementMode::Slide => kind
            .directions
            .iter()
            .map(|&rel| {
                let abs_dir = facing.rotate(rel);
                let mut count = 0usize;
                let mut cur = center;
                loop {
                    cur = cur.neighbor(abs_dir);
                    if !cur.is_valid() {
                        break;
                    }
                    count += 1;
                }
                count
            })
            .sum(),
        pieces::MovementMode::Jump(range) => {
            let omni = kind.is_omnidirectional();
            center
                .ring(range as u32)
                .filter(|c| c.is_valid())
                .filter(|c| {
                    omni || hex::in_forward_arc((c.q - center.q) as i32, (c.r - center.r) as i32, facing)
                })
                .count()
        }
        pieces::MovementMode::None_ => 0,
    }
}

fn template_multiplier(kind: &pieces::PieceKind, template: TemplateId) -> f64 {
    if kind.is_omnidirectional() {
        return 1.0;
    }
    let restrictiveness = 1.0 - (kind.directions.len() as f64 / 6.0);
    if template.allows_rotate_before_move() {
        (1.0 + restrictiveness * 1.8).min(2.5)
    } else if template.forces_move_before_rotate_different_piece() {
        (1.0 - restrictiveness * 0.48).max(0.6)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::Hex;
    use crate::state::{Board, Graveyard, Piece};
    use crate::template::TemplateId;

    fn evaluator() -> Evaluator {
        Evaluator::default_for(&Ruleset {
            white_king: PieceId("K1"),
            white_pieces: vec![PieceId("A1")],
            black_king: PieceId("K1"),
            black_pieces: vec![PieceId("A1")],
            white_template: TemplateId::E,
            black_template: TemplateId::E,
            white_positions: None,
            black_positions: None,
            white_facings: None,
            black_facings: None,
            name: None,
        })
    }

    fn bare_state() -> GameState {
        GameState {
            board: Board::new(),
            graveyards: [Graveyard::default(), Graveyard::default()],
            current_player: Color::White,
            turn_number: 0,
            round_number: 1,
            templates: [TemplateId::E, TemplateId::E],
            action_index: 0,
            last_acted: None,
            king_positions: [Hex::new(0, 0), Hex::new(0, 0)],
            winner: None,
        }
    }

    #[test]
    fn king_sentinel_dominates_material() {
        let eval = evaluator();
        let mut state = bare_state();
        state.board.place(Hex::new(0, 0), Piece { kind: PieceId("K1"), owner: Color::White, facing: crate::hex::Direction::N });
        state.king_positions[Color::White.index()] = Hex::new(0, 0);
        for i in 1..=20 {
            state.board.place(Hex::new(i, 0), Piece { kind: PieceId("D5"), owner: Color::Black, facing: crate::hex::Direction::S });
        }
        assert!(eval.score(&state, Color::White) > 0);
    }

    #[test]
    fn score_negates_across_root_perspective() {
        let eval = evaluator();
        let mut state = bare_state();
        state.board.place(Hex::new(0, 0), Piece { kind: PieceId("D5"), owner: Color::White, facing: crate::hex::Direction::N });
        assert_eq!(eval.score(&state, Color::White), -eval.score(&state, Color::Black));
    }

    #[test]
    fn omnidirectional_piece_value_is_template_invariant() {
        let a = template_aware_value(PieceId("D5"), TemplateId::E);
        let b = template_aware_value(PieceId("D5"), TemplateId::D);
        assert_eq!(a, b);
    }

    #[test]
    fn single_direction_piece_is_valued_higher_under_rotate_friendly_template() {
        let boosted = template_aware_value(PieceId("A1"), TemplateId::E);
        let penalized = template_aware_value(PieceId("A1"), TemplateId::D);
        assert!(boosted > penalized);
    }
}

//! Ruleset records: the army compositions that the evolutionary loop
//! proposes and the tournament evaluates. A `Ruleset` fully determines the
//! initial `GameState` (`GameState::from_ruleset`) and is the unit of
//! identity (`Ruleset::signature`) the fitness tracker keys on.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::RulesetError;
use crate::hex::{Direction, Hex, RADIUS};
use crate::pieces::{self, PieceId};
use crate::template::TemplateId;

/// Fixed king position used when a ruleset omits explicit positions,
/// matching the reference layout's `WHITE_KING_POS` / `BLACK_KING_POS`.
pub const WHITE_KING_POS: Hex = Hex::new(-2, 4);
pub const BLACK_KING_POS: Hex = Hex::new(2, -4);

fn white_excluded_wings() -> HashSet<Hex> {
    [(-4, 3), (-4, 2), (-3, 2), (2, 2), (1, 2), (1, 3)]
        .into_iter()
        .map(|(q, r)| Hex::new(q, r))
        .collect()
}

fn black_excluded_wings() -> HashSet<Hex> {
    [(4, -3), (4, -2), (3, -2), (-2, -2), (-1, -2), (-1, -3)]
        .into_iter()
        .map(|(q, r)| Hex::new(q, r))
        .collect()
}

/// A side's home zone: the three rows nearest its own edge.
pub fn home_zone(color: Color) -> Vec<Hex> {
    crate::hex::BoardGeometry::get()
        .all_hexes
        .iter()
        .copied()
        .filter(|h| match color {
            Color::White => h.r >= RADIUS - 2,
            Color::Black => h.r <= -(RADIUS - 2),
        })
        .collect()
}

/// The legal piece-placement zone for a side: its home zone minus the
/// excluded wing hexes minus the fixed king hex.
pub fn piece_zone(color: Color) -> HashSet<Hex> {
    let excluded = match color {
        Color::White => white_excluded_wings(),
        Color::Black => black_excluded_wings(),
    };
    let king_pos = match color {
        Color::White => WHITE_KING_POS,
        Color::Black => BLACK_KING_POS,
    };
    home_zone(color)
        .into_iter()
        .filter(|h| !excluded.contains(h) && *h != king_pos)
        .collect()
}

/// An army composition plus the turn template each side plays under.
///
/// Positions/facings are optional: when omitted, `GameState::from_ruleset`
/// assigns the fixed king hex and lets the caller supply a layout (the
/// evolutionary loop always fills these in; only externally-loaded
/// rulesets may omit them and rely on the default single-file layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ruleset {
    pub white_king: PieceId,
    pub white_pieces: Vec<PieceId>,
    pub black_king: PieceId,
    pub black_pieces: Vec<PieceId>,

    pub white_template: TemplateId,
    pub black_template: TemplateId,

    /// King first, then one entry per `*_pieces` entry, in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_positions: Option<Vec<(i8, i8)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_positions: Option<Vec<(i8, i8)>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_facings: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_facings: Option<Vec<u8>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Ruleset {
    /// Validates the piece lists, positions, and placement-zone
    /// membership, per the invariants in the data model.
    pub fn validate(&self) -> Result<(), RulesetError> {
        self.validate_side(
            Color::White,
            self.white_king,
            &self.white_pieces,
            &self.white_positions,
            &self.white_facings,
        )?;
        self.validate_side(
            Color::Black,
            self.black_king,
            &self.black_pieces,
            &self.black_positions,
            &self.black_facings,
        )?;
        Ok(())
    }

    fn validate_side(
        &self,
        color: Color,
        king: PieceId,
        pieces: &[PieceId],
        positions: &Option<Vec<(i8, i8)>>,
        facings: &Option<Vec<u8>>,
    ) -> Result<(), RulesetError> {
        const MIN_PIECES: usize = 8;
        if pieces.len() < MIN_PIECES {
            return Err(RulesetError::TooFewPieces { count: pieces.len(), min: MIN_PIECES });
        }
        if !pieces::catalog().contains_key(king) {
            return Err(RulesetError::UnknownPieceId(king.to_string()));
        }
        if !pieces::is_king(king) {
            return Err(RulesetError::NotAKing(king.to_string()));
        }
        for &p in pieces {
            if !pieces::catalog().contains_key(p) {
                return Err(RulesetError::UnknownPieceId(p.to_string()));
            }
        }

        if let Some(positions) = positions {
            if positions.len() != pieces.len() + 1 {
                return Err(RulesetError::PositionCountMismatch {
                    pieces: pieces.len() + 1,
                    positions: positions.len(),
                });
            }
            let zone = piece_zone(color);
            let king_pos = match color {
                Color::White => WHITE_KING_POS,
                Color::Black => BLACK_KING_POS,
            };
            let mut seen = HashSet::new();
            for (i, &(q, r)) in positions.iter().enumerate() {
                let hex = Hex::new(q, r);
                if !hex.is_valid() {
                    return Err(RulesetError::InvalidHex { q, r });
                }
                if !seen.insert(hex) {
                    return Err(RulesetError::DuplicatePosition { q, r });
                }
                let in_zone = if i == 0 { hex == king_pos } else { zone.contains(&hex) };
                if !in_zone {
                    return Err(RulesetError::OutsidePlacementZone { q, r });
                }
            }
        }

        if let Some(facings) = facings {
            if facings.len() != pieces.len() + 1 {
                return Err(RulesetError::PositionCountMismatch {
                    pieces: pieces.len() + 1,
                    positions: facings.len(),
                });
            }
            for &f in facings {
                if f >= 6 {
                    return Err(RulesetError::InvalidFacing(f));
                }
            }
        }
        Ok(())
    }

    /// The canonical, position-independent identity of this ruleset:
    /// `king:sorted(pieces)|king:sorted(pieces)`.
    pub fn signature(&self) -> String {
        let mut white_sorted = self.white_pieces.clone();
        white_sorted.sort();
        let mut black_sorted = self.black_pieces.clone();
        black_sorted.sort();
        format!(
            "{}:{}|{}:{}",
            self.white_king,
            white_sorted.join(","),
            self.black_king,
            black_sorted.join(","),
        )
    }

    pub fn facing_of(&self, color: Color, index: usize) -> Direction {
        let facings = match color {
            Color::White => &self.white_facings,
            Color::Black => &self.black_facings,
        };
        match facings {
            Some(f) => Direction::from_index(f[index]),
            None => default_facing(color),
        }
    }

    /// The template-aware evaluator for this ruleset's piece composition.
    /// A thin forward onto `Evaluator::template_aware_for`, kept here so
    /// callers that only have a `Ruleset` in hand don't need to import the
    /// evaluator module themselves.
    pub fn to_evaluator(&self) -> crate::evaluator::Evaluator {
        crate::evaluator::Evaluator::template_aware_for(self)
    }
}

/// White faces north, black faces south, matching the reference layout.
pub fn default_facing(color: Color) -> Direction {
    match color {
        Color::White => Direction::N,
        Color::Black => Direction::S,
    }
}

/// The "board set" external shape: a flat list of placed pieces plus an
/// optional per-side template map. `TryFrom` normalizes it into a
/// `Ruleset`, matching the loader described in the external interfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSetEntry {
    pub piece_id: PieceId,
    pub color: Color,
    pub pos: (i8, i8),
    pub facing: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSetRuleset {
    pub pieces: Vec<BoardSetEntry>,
    #[serde(default)]
    pub templates: Option<BoardSetTemplates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSetTemplates {
    pub white: TemplateId,
    pub black: TemplateId,
}

impl TryFrom<BoardSetRuleset> for Ruleset {
    type Error = RulesetError;

    fn try_from(board_set: BoardSetRuleset) -> Result<Ruleset, RulesetError> {
        let mut white_king = None;
        let mut black_king = None;
        let mut white_pieces = Vec::new();
        let mut black_pieces = Vec::new();
        let mut white_positions = vec![(0, 0)];
        let mut black_positions = vec![(0, 0)];
        let mut white_facings = vec![0u8];
        let mut black_facings = vec![0u8];

        for entry in &board_set.pieces {
            let is_king = pieces::catalog()
                .get(entry.piece_id)
                .ok_or_else(|| RulesetError::UnknownPieceId(entry.piece_id.to_string()))?
                .is_king;
            match entry.color {
                Color::White => {
                    if is_king {
                        white_king = Some(entry.piece_id);
                        white_positions[0] = entry.pos;
                        white_facings[0] = entry.facing;
                    } else {
                        white_pieces.push(entry.piece_id);
                        white_positions.push(entry.pos);
                        white_facings.push(entry.facing);
                    }
                }
                Color::Black => {
                    if is_king {
                        black_king = Some(entry.piece_id);
                        black_positions[0] = entry.pos;
                        black_facings[0] = entry.facing;
                    } else {
                        black_pieces.push(entry.piece_id);
                        black_positions.push(entry.pos);
                        black_facings.push(entry.facing);
                    }
                }
            }
        }

        let templates = board_set.templates.unwrap_or(BoardSetTemplates {
            white: TemplateId::E,
            black: TemplateId::E,
        });

        Ok(Ruleset {
            white_king: white_king
                .ok_or_else(|| RulesetError::Unusable("board set has no white king".into()))?,
            white_pieces,
            black_king: black_king
                .ok_or_else(|| RulesetError::Unusable("board set has no black king".into()))?,
            black_pieces,
            white_template: templates.white,
            black_template: templates.black,
            white_positions: Some(white_positions),
            black_positions: Some(black_positions),
            white_facings: Some(white_facings),
            black_facings: Some(black_facings),
            name: board_set.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_ruleset() -> Ruleset {
        Ruleset {
            white_king: PieceId("K1"),
            white_pieces: vec![PieceId("A1"); 8],
            black_king: PieceId("K1"),
            black_pieces: vec![PieceId("A1"); 8],
            white_template: TemplateId::E,
            black_template: TemplateId::E,
            white_positions: None,
            black_positions: None,
            white_facings: None,
            black_facings: None,
            name: None,
        }
    }

    #[test]
    fn signature_is_permutation_invariant() {
        let mut a = minimal_ruleset();
        a.white_pieces = vec![PieceId("A2"), PieceId("A1"), PieceId("A3"), PieceId("A1"), PieceId("A1"), PieceId("A1"), PieceId("A1"), PieceId("A1")];
        let mut b = a.clone();
        b.white_pieces.reverse();
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn signature_differs_on_king() {
        let mut a = minimal_ruleset();
        let mut b = minimal_ruleset();
        b.white_king = PieceId("K2");
        assert_ne!(a.signature(), b.signature());
        a.white_king = PieceId("K1");
    }

    #[test]
    fn too_few_pieces_is_rejected() {
        let mut rs = minimal_ruleset();
        rs.white_pieces.truncate(3);
        assert!(matches!(rs.validate(), Err(RulesetError::TooFewPieces { .. })));
    }

    #[test]
    fn unknown_piece_id_is_rejected() {
        let mut rs = minimal_ruleset();
        rs.white_pieces[0] = PieceId("ZZ");
        assert!(matches!(rs.validate(), Err(RulesetError::UnknownPieceId(_))));
    }

    #[test]
    fn non_king_as_king_is_rejected() {
        let mut rs = minimal_ruleset();
        rs.white_king = PieceId("A1");
        assert!(matches!(rs.validate(), Err(RulesetError::NotAKing(_))));
    }

    #[test]
    fn valid_minimal_ruleset_passes() {
        assert!(minimal_ruleset().validate().is_ok());
    }

    #[test]
    fn king_position_must_be_the_fixed_hex() {
        let mut rs = minimal_ruleset();
        let mut positions = vec![(0, 0)];
        positions.extend(piece_zone(Color::White).into_iter().take(8).map(|h| (h.q, h.r)));
        rs.white_positions = Some(positions);
        assert!(matches!(rs.validate(), Err(RulesetError::OutsidePlacementZone { .. })));
    }

    #[test]
    fn facing_out_of_range_is_rejected() {
        let mut rs = minimal_ruleset();
        rs.white_facings = Some(vec![6; 9]);
        assert!(matches!(rs.validate(), Err(RulesetError::InvalidFacing(6))));
    }

    #[test]
    fn facing_count_must_match_piece_count() {
        let mut rs = minimal_ruleset();
        rs.white_facings = Some(vec![0; 3]);
        assert!(matches!(rs.validate(), Err(RulesetError::PositionCountMismatch { .. })));
    }

    #[test]
    fn in_range_facings_pass() {
        let mut rs = minimal_ruleset();
        rs.white_facings = Some(vec![0; 9]);
        assert!(rs.validate().is_ok());
    }
}

//! Game state: the board, graveyards, turn pointer, and the legal-action
//! generator and applier that drive every game played by the search and
//! the tournament runner.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::color::Color;
use crate::error::RulesetError;
use crate::hex::{self, Direction, Hex, ALL_DIRECTIONS};
use crate::pieces::{self, PieceId, PieceKind, Special};
use crate::ruleset::{self, Ruleset};
use crate::template::{ActionKind, Constraint};

/// A piece instance. Not independently identified -- its board address is
/// its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: pieces::PieceId,
    pub owner: Color,
    pub facing: Direction,
}

/// A mapping from occupied hexes to piece instances, with invariant-checked
/// mutators. Mutations outside this type are impossible; callers can only
/// reach a board through `place`/`remove`/`relocate`/`swap_positions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board(HashMap<Hex, Piece>);

impl Board {
    pub fn new() -> Board {
        Board(HashMap::new())
    }

    pub fn get(&self, hex: Hex) -> Option<Piece> {
        self.0.get(&hex).copied()
    }

    pub fn contains(&self, hex: Hex) -> bool {
        self.0.contains_key(&hex)
    }

    pub fn place(&mut self, hex: Hex, piece: Piece) {
        debug_assert!(hex.is_valid(), "placing onto invalid hex {hex:?}");
        debug_assert!(!self.0.contains_key(&hex), "hex {hex:?} already occupied");
        self.0.insert(hex, piece);
    }

    pub fn remove(&mut self, hex: Hex) -> Option<Piece> {
        self.0.remove(&hex)
    }

    pub fn relocate(&mut self, from: Hex, to: Hex) -> Piece {
        let piece = self.0.remove(&from).unwrap_or_else(|| panic!("no piece at {from:?}"));
        debug_assert!(!self.0.contains_key(&to), "relocate target {to:?} still occupied");
        self.0.insert(to, piece);
        piece
    }

    pub fn set_facing(&mut self, hex: Hex, facing: Direction) {
        if let Some(piece) = self.0.get_mut(&hex) {
            piece.facing = facing;
        }
    }

    pub fn swap_positions(&mut self, a: Hex, b: Hex) {
        let pa = self.0.remove(&a).unwrap_or_else(|| panic!("no piece at {a:?}"));
        let pb = self.0.remove(&b).unwrap_or_else(|| panic!("no piece at {b:?}"));
        self.0.insert(a, pb);
        self.0.insert(b, pa);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Hex, Piece)> + '_ {
        self.0.iter().map(|(&h, &p)| (h, p))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Hex, Piece)> + '_ {
        self.iter().filter(move |(_, p)| p.owner == color)
    }

    pub fn count(&self, color: Color) -> usize {
        self.pieces_of(color).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-owner multiset of captured kind identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graveyard(pub Vec<pieces::PieceId>);

impl Graveyard {
    pub fn push(&mut self, kind: pieces::PieceId) {
        self.0.push(kind);
    }

    pub fn contains(&self, kind: pieces::PieceId) -> bool {
        self.0.iter().any(|&k| k == kind)
    }

    /// Removes one instance of `kind`. Returns whether one was found.
    pub fn remove_one(&mut self, kind: pieces::PieceId) -> bool {
        match self.0.iter().position(|&k| k == kind) {
            Some(i) => {
                self.0.remove(i);
                true
            }
            None => false,
        }
    }

    /// Distinct rebirth-capable kinds currently interred, in sorted order.
    pub fn rebirth_capable_kinds(&self) -> Vec<pieces::PieceId> {
        let mut kinds: Vec<_> = self
            .0
            .iter()
            .copied()
            .filter(|&k| pieces::get_special(k) == Some(Special::Rebirth))
            .collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }
}

/// The full state of a game in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub graveyards: [Graveyard; 2],
    pub current_player: Color,
    pub turn_number: u32,
    pub round_number: u32,
    pub templates: [crate::template::TemplateId; 2],
    pub action_index: usize,
    pub last_acted: Option<Hex>,
    pub king_positions: [Hex; 2],
    pub winner: Option<Color>,
}

impl GameState {
    /// Builds the initial state from a ruleset's embedded layout.
    pub fn from_ruleset(ruleset: &Ruleset) -> Result<GameState, RulesetError> {
        ruleset.validate()?;
        let white_positions = ruleset
            .white_positions
            .as_ref()
            .ok_or_else(|| RulesetError::Unusable("white positions not specified".into()))?;
        let black_positions = ruleset
            .black_positions
            .as_ref()
            .ok_or_else(|| RulesetError::Unusable("black positions not specified".into()))?;

        let mut board = Board::new();
        let mut king_positions = [Hex::new(0, 0); 2];

        for (color, king, side_pieces, positions) in [
            (Color::White, ruleset.white_king, &ruleset.white_pieces, white_positions),
            (Color::Black, ruleset.black_king, &ruleset.black_pieces, black_positions),
        ] {
            let king_hex = Hex::new(positions[0].0, positions[0].1);
            board.place(king_hex, Piece { kind: king, owner: color, facing: ruleset.facing_of(color, 0) });
            king_positions[color.index()] = king_hex;

            for (i, &kind) in side_pieces.iter().enumerate() {
                let (q, r) = positions[i + 1];
                let hex = Hex::new(q, r);
                board.place(hex, Piece { kind, owner: color, facing: ruleset.facing_of(color, i + 1) });
            }
        }

        Ok(GameState {
            board,
            graveyards: [Graveyard::default(), Graveyard::default()],
            current_player: Color::White,
            turn_number: 0,
            round_number: 1,
            templates: [ruleset.white_template, ruleset.black_template],
            action_index: 0,
            last_acted: None,
            king_positions,
            winner: None,
        })
    }

    fn active_step(&self) -> (ActionKind, Constraint) {
        self.templates[self.current_player.index()].steps()[self.action_index]
    }

    fn candidate_hexes(&self, constraint: Constraint) -> Vec<Hex> {
        match constraint {
            Constraint::Any => self.board.pieces_of(self.current_player).map(|(h, _)| h).collect(),
            Constraint::SamePiece => match self.last_acted {
                Some(hex) if self.board.get(hex).map_or(false, |p| p.owner == self.current_player) => vec![hex],
                _ => vec![],
            },
            Constraint::DifferentPiece => self
                .board
                .pieces_of(self.current_player)
                .map(|(h, _)| h)
                .filter(|&h| Some(h) != self.last_acted)
                .collect(),
        }
    }

    /// Enumerates every legal action at the current node: move/rotate/swap/
    /// rebirth candidates for the active template step, plus the
    /// always-available pass and surrender.
    pub fn legal_actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();

        if self.winner.is_none() {
            let (action_kind, constraint) = self.active_step();
            let wants_move = matches!(action_kind, ActionKind::Move | ActionKind::MoveOrRotate);
            let wants_rotate = matches!(action_kind, ActionKind::Rotate | ActionKind::MoveOrRotate);

            for hex in self.candidate_hexes(constraint) {
                let piece = self.board.get(hex).expect("candidate hex has no piece");
                let kind = pieces::kind_of(piece.kind);

                if wants_move {
                    self.push_move_destinations(hex, piece, kind, &mut actions);
                    if kind.special == Some(Special::SwapMove) {
                        self.push_swap_candidates(hex, piece, ActionKind::Move, &mut actions);
                    }
                }
                if wants_rotate {
                    if !kind.is_omnidirectional() {
                        for &facing in &ALL_DIRECTIONS {
                            actions.push(Action::Rotate { at: hex, facing });
                        }
                    }
                    if kind.special == Some(Special::SwapRotate) {
                        self.push_swap_candidates(hex, piece, ActionKind::Rotate, &mut actions);
                    }
                }
            }

            if wants_move {
                self.push_rebirth_candidates(&mut actions);
            }
        }

        actions.push(Action::Pass);
        actions.push(Action::Surrender);
        actions
    }

    fn push_move_destinations(&self, hex: Hex, piece: Piece, kind: &PieceKind, out: &mut Vec<Action>) {
        match kind.movement {
            pieces::MovementMode::Step(range) => {
                for &rel in kind.directions {
                    let abs_dir = piece.facing.rotate(rel);
                    self.walk_direction(hex, abs_dir, range as u32, piece, out);
                }
            }
            pieces::MovementMode::Slide => {
                for &rel in kind.directions {
                    let abs_dir = piece.facing.rotate(rel);
                    self.walk_direction(hex, abs_dir, u32::MAX, piece, out);
                }
            }
            pieces::MovementMode::Jump(range) => {
                self.push_jump_destinations(hex, piece, kind, range as u32, out);
            }
            pieces::MovementMode::None_ => {}
        }
    }

    /// Walks up to `max_steps` hexes in `abs_dir` from `hex`, emitting an
    /// empty-cell destination per step and, if the walk is stopped by an
    /// enemy occupant that is not phased (and the mover is not phased),
    /// one final capture destination.
    fn walk_direction(&self, hex: Hex, abs_dir: Direction, max_steps: u32, mover: Piece, out: &mut Vec<Action>) {
        let mover_phased = pieces::get_special(mover.kind) == Some(Special::Phased);
        let mut cur = hex;
        let mut steps = 0u32;
        loop {
            if steps >= max_steps {
                break;
            }
            cur = cur.neighbor(abs_dir);
            if !cur.is_valid() {
                break;
            }
            steps += 1;
            match self.board.get(cur) {
                None => out.push(Action::Move { from: hex, to: cur }),
                Some(occupant) => {
                    if occupant.owner == mover.owner {
                        break;
                    }
                    let occupant_phased = pieces::get_special(occupant.kind) == Some(Special::Phased);
                    if !mover_phased && !occupant_phased {
                        out.push(Action::Move { from: hex, to: cur });
                    }
                    break;
                }
            }
        }
    }

    fn push_jump_destinations(&self, hex: Hex, piece: Piece, kind: &PieceKind, range: u32, out: &mut Vec<Action>) {
        let omni = kind.is_omnidirectional();
        let mover_phased = pieces::get_special(piece.kind) == Some(Special::Phased);
        for candidate in hex.ring(range) {
            if !candidate.is_valid() {
                continue;
            }
            let dq = (candidate.q - hex.q) as i32;
            let dr = (candidate.r - hex.r) as i32;
            if !omni && !hex::in_forward_arc(dq, dr, piece.facing) {
                continue;
            }
            match self.board.get(candidate) {
                None => out.push(Action::Move { from: hex, to: candidate }),
                Some(occupant) => {
                    if occupant.owner == piece.owner {
                        continue;
                    }
                    let occupant_phased = pieces::get_special(occupant.kind) == Some(Special::Phased);
                    if !mover_phased && !occupant_phased {
                        out.push(Action::Move { from: hex, to: candidate });
                    }
                }
            }
        }
    }

    fn push_swap_candidates(&self, hex: Hex, piece: Piece, costs: ActionKind, out: &mut Vec<Action>) {
        for (other, _) in self.board.pieces_of(piece.owner) {
            if other != hex {
                out.push(Action::Swap { a: hex, b: other, costs });
            }
        }
    }

    fn push_rebirth_candidates(&self, out: &mut Vec<Action>) {
        let graveyard = &self.graveyards[self.current_player.index()];
        let kinds = graveyard.rebirth_capable_kinds();
        if kinds.is_empty() {
            return;
        }
        let king_hex = self.king_positions[self.current_player.index()];
        for &kind in &kinds {
            for &dir in &ALL_DIRECTIONS {
                let candidate = king_hex.neighbor(dir);
                if candidate.is_valid() && !self.board.contains(candidate) {
                    let facing = dir.opposite();
                    out.push(Action::Rebirth { kind, at: candidate, facing });
                }
            }
        }
    }

    /// Applies a legal action, mutating the state deterministically per the
    /// transition rules, and advances the turn/template pointer.
    pub fn apply(&mut self, action: &Action) {
        match *action {
            Action::Move { from, to } => {
                let mover = self.board.remove(from).expect("move source has no piece");
                if let Some(captured) = self.board.remove(to) {
                    self.graveyards[captured.owner.index()].push(captured.kind);
                    if pieces::is_king(captured.kind) {
                        self.winner = Some(self.current_player);
                    }
                }
                if pieces::is_king(mover.kind) {
                    self.king_positions[self.current_player.index()] = to;
                }
                self.board.place(to, mover);
            }
            Action::Rotate { at, facing } => {
                self.board.set_facing(at, facing);
            }
            Action::Swap { a, b, .. } => {
                self.board.swap_positions(a, b);
                if let Some(piece) = self.board.get(a) {
                    if pieces::is_king(piece.kind) {
                        self.king_positions[piece.owner.index()] = a;
                    }
                }
                if let Some(piece) = self.board.get(b) {
                    if pieces::is_king(piece.kind) {
                        self.king_positions[piece.owner.index()] = b;
                    }
                }
            }
            Action::Rebirth { kind, at, facing } => {
                let removed = self.graveyards[self.current_player.index()].remove_one(kind);
                debug_assert!(removed, "rebirth of a kind absent from the graveyard");
                self.board.place(at, Piece { kind, owner: self.current_player, facing });
            }
            Action::Pass => {
                self.end_turn();
                return;
            }
            Action::Surrender => {
                self.winner = Some(self.current_player.opponent());
                self.end_turn();
                return;
            }
        }

        self.last_acted = action.acted_hex();
        self.action_index += 1;
        if self.action_index >= self.templates[self.current_player.index()].steps().len() {
            self.end_turn();
        }
    }

    fn end_turn(&mut self) {
        self.current_player = self.current_player.opponent();
        self.action_index = 0;
        self.last_acted = None;
        self.turn_number += 1;
        if self.current_player == Color::White {
            self.round_number += 1;
        }
    }

    /// Resolves the round-50 proximity tiebreaker. No-op if the game is
    /// already decided or round 50 has not yet elapsed.
    pub fn resolve_timeout(&mut self) {
        if self.winner.is_some() || self.round_number <= 50 {
            return;
        }
        let white_dist = self.king_positions[Color::White.index()].distance_to_center();
        let black_dist = self.king_positions[Color::Black.index()].distance_to_center();
        self.winner = Some(if white_dist != black_dist {
            if white_dist < black_dist { Color::White } else { Color::Black }
        } else {
            let white_count = self.board.count(Color::White);
            let black_count = self.board.count(Color::Black);
            if white_count >= black_count { Color::White } else { Color::Black }
        });
    }
}

/// Home-zone/placement-zone helpers live in `ruleset`; re-exported here for
/// callers that only have a `GameState` in hand (e.g. rebirth candidate
/// sanity checks in tests).
pub use ruleset::piece_zone;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateId;

    fn bare_ruleset() -> Ruleset {
        let mut pieces = vec![PieceId("A1"); 8];
        pieces[0] = PieceId("D5"); // queen, slide all-directions
        Ruleset {
            white_king: PieceId("K1"),
            white_pieces: pieces,
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

    fn place(state: &mut GameState, hex: Hex, kind: pieces::PieceId, owner: Color, facing: Direction) {
        state.board.place(hex, Piece { kind, owner, facing });
        if pieces::is_king(kind) {
            state.king_positions[owner.index()] = hex;
        }
    }

    fn empty_state() -> GameState {
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
    fn empty_center_queen_capture() {
        let mut state = empty_state();
        place(&mut state, Hex::new(0, 0), PieceId("D5"), Color::White, Direction::N);
        place(&mut state, Hex::new(0, -1), PieceId("K1"), Color::Black, Direction::S);

        let actions = state.legal_actions();
        let capture = actions
            .iter()
            .find(|a| matches!(a, Action::Move { from, to } if *from == Hex::new(0,0) && *to == Hex::new(0,-1)));
        assert!(capture.is_some());

        state.apply(capture.unwrap());
        assert_eq!(state.winner, Some(Color::White));
        assert!(state.graveyards[Color::Black.index()].contains(PieceId("K1")));
    }

    #[test]
    fn phased_standoff_blocks_slide_capture() {
        let mut state = empty_state();
        place(&mut state, Hex::new(0, 0), PieceId("G1"), Color::White, Direction::N); // phased, step(2) all
        place(&mut state, Hex::new(0, 2), PieceId("D2"), Color::Black, Direction::N); // slide forward/back
        state.current_player = Color::Black;

        let actions = state.legal_actions();
        let destinations: Vec<Hex> = actions
            .iter()
            .filter_map(|a| match a {
                Action::Move { from, to } if *from == Hex::new(0, 2) => Some(*to),
                _ => None,
            })
            .collect();
        assert!(destinations.contains(&Hex::new(0, 1)));
        assert!(!destinations.contains(&Hex::new(0, 0)));
        assert!(!destinations.contains(&Hex::new(0, -1)));
    }

    #[test]
    fn rebirth_candidates_surround_the_king() {
        let mut state = empty_state();
        place(&mut state, Hex::new(0, 3), PieceId("K1"), Color::White, Direction::N);
        state.graveyards[Color::White.index()].push(PieceId("P1"));

        let actions = state.legal_actions();
        let rebirths: Vec<&Action> = actions
            .iter()
            .filter(|a| matches!(a, Action::Rebirth { .. }))
            .collect();
        assert_eq!(rebirths.len(), 6);
        for action in rebirths {
            if let Action::Rebirth { at, facing, .. } = action {
                assert_eq!(at.neighbor(*facing), Hex::new(0, 3));
            }
        }
    }

    #[test]
    fn round_50_proximity_win_favors_closer_king() {
        let mut state = empty_state();
        state.round_number = 51;
        place(&mut state, Hex::new(0, 1), PieceId("K1"), Color::White, Direction::N);
        place(&mut state, Hex::new(0, -3), PieceId("K1"), Color::Black, Direction::S);

        state.resolve_timeout();
        assert_eq!(state.winner, Some(Color::White));
    }

    #[test]
    fn omnidirectional_piece_emits_no_rotate_candidates() {
        let mut state = empty_state();
        place(&mut state, Hex::new(0, 0), PieceId("D5"), Color::White, Direction::N);

        let actions = state.legal_actions();
        assert!(!actions.iter().any(|a| matches!(a, Action::Rotate { .. })));
    }

    #[test]
    fn from_ruleset_places_kings_at_the_fixed_hexes() {
        let mut rs = bare_ruleset();
        let white_zone: Vec<(i8, i8)> = ruleset::piece_zone(Color::White).into_iter().take(8).map(|h| (h.q, h.r)).collect();
        let black_zone: Vec<(i8, i8)> = ruleset::piece_zone(Color::Black).into_iter().take(8).map(|h| (h.q, h.r)).collect();
        rs.white_positions = Some(std::iter::once((ruleset::WHITE_KING_POS.q, ruleset::WHITE_KING_POS.r)).chain(white_zone).collect());
        rs.black_positions = Some(std::iter::once((ruleset::BLACK_KING_POS.q, ruleset::BLACK_KING_POS.r)).chain(black_zone).collect());

        let state = GameState::from_ruleset(&rs).expect("well-formed ruleset should build a state");
        assert_eq!(state.king_positions[Color::White.index()], ruleset::WHITE_KING_POS);
        assert_eq!(state.king_positions[Color::Black.index()], ruleset::BLACK_KING_POS);
        assert_eq!(state.board.count(Color::White), 9);
    }

    #[test]
    fn pass_ends_the_turn_immediately() {
        let mut state = empty_state();
        place(&mut state, Hex::new(0, 0), PieceId("K1"), Color::White, Direction::N);
        state.apply(&Action::Pass);
        assert_eq!(state.current_player, Color::Black);
        assert_eq!(state.turn_number, 1);
    }
}

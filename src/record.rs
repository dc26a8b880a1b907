//! A recorded game: the initial ruleset plus the exact action sequence
//! needed to reconstruct it move-by-move. Grounded on
//! `original_source/hexwar/game_record.py`'s `MoveRecord`/`GameRecord` pair,
//! trimmed to what a Rust-native replayer needs -- the Python version's
//! step-by-step `GamePlayer` (forward/backward/goto with a state cache) is a
//! UI-navigation concern the HTTP/browser designer's playback endpoints own
//! (out of scope for this crate's core); this module keeps the data format and a
//! single straight-through `replay`.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::color::Color;
use crate::error::GameError;
use crate::hex::{Direction, Hex};
use crate::pieces::PieceId;
use crate::ruleset::Ruleset;
use crate::state::GameState;
use crate::template::ActionKind;

/// Extra data carried by a `Swap` or `Rebirth` action, recorded so replay
/// doesn't have to re-derive which special was taken from position deltas
/// alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpecialData {
    Swap { costs: ActionKind },
    Rebirth { kind: PieceId },
}

/// One action in a recorded game, tagged by the kind of `Action` it
/// represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub action_type: MoveKind,
    pub from_pos: Option<(i8, i8)>,
    pub to_pos: Option<(i8, i8)>,
    pub new_facing: Option<u8>,
    pub special_data: Option<SpecialData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveKind {
    Move,
    Rotate,
    Special,
    Pass,
    Surrender,
}

impl MoveRecord {
    pub fn from_action(action: &Action) -> MoveRecord {
        match *action {
            Action::Move { from, to } => MoveRecord {
                action_type: MoveKind::Move,
                from_pos: Some((from.q, from.r)),
                to_pos: Some((to.q, to.r)),
                new_facing: None,
                special_data: None,
            },
            Action::Rotate { at, facing } => MoveRecord {
                action_type: MoveKind::Rotate,
                from_pos: Some((at.q, at.r)),
                to_pos: None,
                new_facing: Some(facing.index()),
                special_data: None,
            },
            Action::Swap { a, b, costs } => MoveRecord {
                action_type: MoveKind::Special,
                from_pos: Some((a.q, a.r)),
                to_pos: Some((b.q, b.r)),
                new_facing: None,
                special_data: Some(SpecialData::Swap { costs }),
            },
            Action::Rebirth { kind, at, facing } => MoveRecord {
                action_type: MoveKind::Special,
                from_pos: None,
                to_pos: Some((at.q, at.r)),
                new_facing: Some(facing.index()),
                special_data: Some(SpecialData::Rebirth { kind }),
            },
            Action::Pass => MoveRecord {
                action_type: MoveKind::Pass,
                from_pos: None,
                to_pos: None,
                new_facing: None,
                special_data: None,
            },
            Action::Surrender => MoveRecord {
                action_type: MoveKind::Surrender,
                from_pos: None,
                to_pos: None,
                new_facing: None,
                special_data: None,
            },
        }
    }

    /// The inverse of `from_action`. Panics on a malformed record (missing
    /// a field its `action_type` requires) -- a `GameRecord` is only ever
    /// produced by this crate's own recorder, so a malformed record is a
    /// bug in whatever wrote the file, not a reachable runtime condition.
    pub fn to_action(&self) -> Action {
        match self.action_type {
            MoveKind::Move => Action::Move {
                from: hex_of(self.from_pos.expect("MOVE record missing from_pos")),
                to: hex_of(self.to_pos.expect("MOVE record missing to_pos")),
            },
            MoveKind::Rotate => Action::Rotate {
                at: hex_of(self.from_pos.expect("ROTATE record missing from_pos")),
                facing: Direction::from_index(self.new_facing.expect("ROTATE record missing new_facing")),
            },
            MoveKind::Special => match self.special_data.expect("SPECIAL record missing special_data") {
                SpecialData::Swap { costs } => Action::Swap {
                    a: hex_of(self.from_pos.expect("SWAP record missing from_pos")),
                    b: hex_of(self.to_pos.expect("SWAP record missing to_pos")),
                    costs,
                },
                SpecialData::Rebirth { kind } => Action::Rebirth {
                    kind,
                    at: hex_of(self.to_pos.expect("REBIRTH record missing to_pos")),
                    facing: Direction::from_index(self.new_facing.expect("REBIRTH record missing new_facing")),
                },
            },
            MoveKind::Pass => Action::Pass,
            MoveKind::Surrender => Action::Surrender,
        }
    }
}

fn hex_of((q, r): (i8, i8)) -> Hex {
    Hex::new(q, r)
}

/// Why a recorded game ended, mirroring `GameState::winner`'s three causes
/// plus the explicit surrender action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    KingCapture,
    Surrender,
    Proximity,
    Timeout,
}

/// A complete, replayable game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub version: u32,
    pub ruleset: Ruleset,
    pub white_ai_depth: u8,
    pub black_ai_depth: u8,
    pub seed: u64,
    pub moves: Vec<MoveRecord>,
    pub winner: Option<Color>,
    pub final_round: u32,
    pub end_reason: EndReason,
}

impl GameRecord {
    pub fn new(ruleset: Ruleset, white_ai_depth: u8, black_ai_depth: u8, seed: u64) -> GameRecord {
        GameRecord {
            version: 1,
            ruleset,
            white_ai_depth,
            black_ai_depth,
            seed,
            moves: Vec::new(),
            winner: None,
            final_round: 0,
            end_reason: EndReason::Timeout,
        }
    }

    pub fn push(&mut self, action: &Action) {
        self.moves.push(MoveRecord::from_action(action));
    }

    /// Rebuilds the initial state from `ruleset` and replays every move in
    /// order, returning the resulting state. Asserts in debug builds that
    /// the replayed outcome matches what was recorded, since a mismatch
    /// means either the record or the replayer disagrees with the engine
    /// about its own rules.
    pub fn replay(&self) -> Result<GameState, GameError> {
        let mut state = GameState::from_ruleset(&self.ruleset)?;
        for record in &self.moves {
            state.apply(&record.to_action());
        }
        debug_assert_eq!(state.winner, self.winner, "replay produced a different winner than was recorded");
        debug_assert_eq!(
            state.round_number, self.final_round,
            "replay produced a different final round than was recorded"
        );
        Ok(state)
    }
}

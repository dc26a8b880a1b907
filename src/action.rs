//! The action vocabulary a player can perform on their turn.

use serde::{Deserialize, Serialize};

use crate::hex::{Direction, Hex};
use crate::pieces::PieceId;
use crate::template::ActionKind;

/// A single legal action, as produced by `GameState::legal_actions` and
/// consumed by `GameState::apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Move { from: Hex, to: Hex },
    Rotate { at: Hex, facing: Direction },
    /// A positional exchange performed by a swap-capable piece. `costs`
    /// records whether it was taken as this turn's move or rotate step.
    Swap { a: Hex, b: Hex, costs: ActionKind },
    Rebirth { kind: PieceId, at: Hex, facing: Direction },
    Pass,
    Surrender,
}

impl Action {
    /// The hex of the piece that performed this action, if any (pass and
    /// surrender touch no piece). `GameState::apply` records this as
    /// `last_acted`, which the next step's `SamePiece`/`DifferentPiece`
    /// constraint is checked against.
    pub fn acted_hex(&self) -> Option<Hex> {
        match self {
            Action::Move { to, .. } => Some(*to),
            Action::Rotate { at, .. } => Some(*at),
            Action::Swap { b, .. } => Some(*b),
            Action::Rebirth { at, .. } => Some(*at),
            Action::Pass | Action::Surrender => None,
        }
    }
}

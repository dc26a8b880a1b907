//! The piece catalog: an immutable, compile-time-constant table of movement
//! and capability data for every piece kind. No runtime mutation -- the
//! catalog is built once and shared by reference across worker threads.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hex::{ALL_RELATIVE_DIRECTIONS, FORWARD_ARC, RelativeDirection};

/// A piece kind identifier, e.g. `A1` or `K3`. Wraps a static string
/// interned into the catalog; ids are never constructed outside it. A
/// plain `&'static str` type alias can't soundly derive `Deserialize` (the
/// borrowed-str impl needs the deserializer's input to outlive `'static`),
/// so this is a newtype with a custom `Deserialize` that looks the id up
/// in the catalog and rejects anything unknown at the load boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(pub &'static str);

impl PieceId {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for PieceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

impl<'de> Deserialize<'de> for PieceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<PieceId, D::Error> {
        let raw = String::deserialize(deserializer)?;
        CATALOG_TABLE
            .iter()
            .find(|k| k.id.0 == raw)
            .map(|k| k.id)
            .ok_or_else(|| D::Error::custom(format!("unknown piece id: {raw}")))
    }
}

/// How a piece kind moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementMode {
    /// Up to `range` hexes in a straight line, stopping at the board edge
    /// or the first occupant.
    Step(u8),
    /// Unbounded range along a straight line, stopping at the first
    /// occupant.
    Slide,
    /// Lands on a hex at exactly `range` distance, ignoring intermediate
    /// occupancy.
    Jump(u8),
    /// Cannot move by the standard movement rules (pure special-ability
    /// piece).
    None_,
}

/// A piece kind's special ability, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    /// Exchanges position with any friendly piece instead of moving.
    SwapMove,
    /// Exchanges position with any friendly piece instead of rotating.
    SwapRotate,
    /// When captured, may later be placed back on the board adjacent to
    /// its owner's king, consuming a move action.
    Rebirth,
    /// Neither captures nor is captured; still occupies its hex and blocks
    /// others.
    Phased,
}

/// Immutable movement/capability record for one piece kind.
#[derive(Debug, Clone, Copy)]
pub struct PieceKind {
    pub id: PieceId,
    pub name: &'static str,
    pub movement: MovementMode,
    pub directions: &'static [RelativeDirection],
    pub special: Option<Special>,
    pub is_king: bool,
}

impl PieceKind {
    /// Whether this kind's movement direction set already covers all six
    /// relative directions (omnidirectional pieces never gain anything
    /// from rotating).
    pub fn is_omnidirectional(&self) -> bool {
        self.directions.len() >= 6
    }
}

const ALL: &[RelativeDirection] = &ALL_RELATIVE_DIRECTIONS;
const ARC: &[RelativeDirection] = &FORWARD_ARC;
const STRAIGHT: &[RelativeDirection] = &[crate::hex::FORWARD];
const FORWARD_BACK: &[RelativeDirection] = &[crate::hex::FORWARD, crate::hex::BACKWARD];
const DIAGONAL: &[RelativeDirection] = &[
    crate::hex::FORWARD_LEFT,
    crate::hex::FORWARD_RIGHT,
    crate::hex::BACK_LEFT,
    crate::hex::BACK_RIGHT,
];
const FORWARD_SIDES: &[RelativeDirection] =
    &[crate::hex::FORWARD, crate::hex::FORWARD_LEFT, crate::hex::FORWARD_RIGHT];

macro_rules! kind {
    ($id:literal, $name:literal, $movement:expr, $dirs:expr, $special:expr, $king:expr) => {
        PieceKind {
            id: PieceId($id),
            name: $name,
            movement: $movement,
            directions: $dirs,
            special: $special,
            is_king: $king,
        }
    };
}

/// The full catalog: 25 non-king kinds in 6 families, plus 5 king kinds.
///
/// Per-kind direction sets and ranges were not present in the retrieval
/// pack's original source (the piece catalog itself lived in the native
/// extension, not the Python orchestration layer) and are reconstructed
/// here from the mobility commentary in `ai.py`'s default heuristics table
/// -- see DESIGN.md for the derivation of each kind.
static CATALOG_TABLE: &[PieceKind] = &[
    // --- Step-1 family ---
    kind!("A1", "Pawn", MovementMode::Step(1), STRAIGHT, None, false),
    kind!("A2", "Guard", MovementMode::Step(1), ALL, None, false),
    kind!("A3", "Scout", MovementMode::Step(1), ARC, None, false),
    kind!("A4", "Crab", MovementMode::Step(1), FORWARD_BACK, None, false),
    kind!("A5", "Flanker", MovementMode::Step(1), DIAGONAL, None, false),
    // --- Step-2 family ---
    kind!("B1", "Strider", MovementMode::Step(2), STRAIGHT, None, false),
    kind!("B2", "Dancer", MovementMode::Step(2), FORWARD_BACK, None, false),
    kind!("B3", "Ranger", MovementMode::Step(2), ALL, None, false),
    kind!("B4", "Hound", MovementMode::Step(2), ARC, None, false),
    // --- Step-3 family ---
    kind!("C1", "Lancer", MovementMode::Step(3), STRAIGHT, None, false),
    kind!("C2", "Dragoon", MovementMode::Step(3), ARC, None, false),
    kind!("C3", "Courser", MovementMode::Step(3), ALL, None, false),
    // --- Slide family ---
    kind!("D1", "Pike", MovementMode::Slide, STRAIGHT, None, false),
    kind!("D2", "Rook", MovementMode::Slide, FORWARD_BACK, None, false),
    kind!("D3", "Bishop", MovementMode::Slide, DIAGONAL, None, false),
    kind!("D4", "Chariot", MovementMode::Slide, ARC, None, false),
    kind!("D5", "Queen", MovementMode::Slide, ALL, None, false),
    // --- Jump family ---
    kind!("E1", "Knight", MovementMode::Jump(2), ALL, None, false),
    kind!("E2", "Frog", MovementMode::Jump(3), ALL, None, false),
    kind!("F1", "Locust", MovementMode::Jump(2), ARC, None, false),
    kind!("F2", "Cricket", MovementMode::Jump(3), ARC, None, false),
    // --- Special family ---
    kind!("W1", "Warper", MovementMode::None_, &[], Some(Special::SwapMove), false),
    kind!("W2", "Shifter", MovementMode::Step(1), ALL, Some(Special::SwapRotate), false),
    kind!("P1", "Phoenix", MovementMode::Step(1), FORWARD_SIDES, Some(Special::Rebirth), false),
    kind!("G1", "Ghost", MovementMode::Step(2), ALL, Some(Special::Phased), false),
    // --- Kings ---
    kind!("K1", "Guard King", MovementMode::Step(1), ALL, None, true),
    kind!("K2", "Scout King", MovementMode::Step(1), ARC, None, true),
    kind!("K3", "Ranger King", MovementMode::Step(2), ALL, None, true),
    kind!("K4", "Warder King", MovementMode::Step(1), FORWARD_BACK, None, true),
    kind!("K5", "Sentinel King", MovementMode::Step(1), DIAGONAL, None, true),
];

static CATALOG: Lazy<HashMap<PieceId, PieceKind>> = Lazy::new(|| {
    CATALOG_TABLE.iter().map(|k| (k.id, *k)).collect()
});

/// All non-king piece ids, in catalog order.
pub static REGULAR_PIECE_IDS: Lazy<Vec<PieceId>> = Lazy::new(|| {
    CATALOG_TABLE
        .iter()
        .filter(|k| !k.is_king)
        .map(|k| k.id)
        .collect()
});

/// All king piece ids, in catalog order.
pub static KING_PIECE_IDS: Lazy<Vec<PieceId>> = Lazy::new(|| {
    CATALOG_TABLE.iter().filter(|k| k.is_king).map(|k| k.id).collect()
});

/// Returns the full catalog, keyed by piece id.
pub fn catalog() -> &'static HashMap<PieceId, PieceKind> {
    &CATALOG
}

/// Looks up a piece kind by id. Panics on an unknown id: by the time a
/// lookup happens here, the id has already been validated at the
/// ruleset-load boundary, so an unknown id here is a bug, not bad input.
pub fn kind_of(id: PieceId) -> &'static PieceKind {
    CATALOG.get(&id).unwrap_or_else(|| panic!("unknown piece id in catalog: {id}"))
}

pub fn is_king(id: PieceId) -> bool {
    kind_of(id).is_king
}

pub fn has_special(id: PieceId) -> bool {
    kind_of(id).special.is_some()
}

pub fn get_special(id: PieceId) -> Option<Special> {
    kind_of(id).special
}

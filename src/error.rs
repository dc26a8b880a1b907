//! Error types for the fallible boundaries named in the design: malformed
//! rulesets rejected at load time, and worker-task failures surfaced to the
//! evolutionary driver. Invariant violations are deliberately *not*
//! modeled here -- they indicate a bug in the core itself, and are raised
//! with `debug_assert!`/`panic!` so they are loud in development and
//! reliably trip in test builds, rather than being threaded through
//! `Result` as if a caller could sensibly recover from them.

use thiserror::Error;

/// A ruleset failed validation at the load boundary and was rejected
/// before entering the population.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RulesetError {
    #[error("side has {count} pieces, fewer than the {min} piece floor")]
    TooFewPieces { count: usize, min: usize },

    #[error("piece list length {pieces} does not match position list length {positions}")]
    PositionCountMismatch { pieces: usize, positions: usize },

    #[error("position ({q}, {r}) is not a valid hex on the board")]
    InvalidHex { q: i8, r: i8 },

    #[error("position ({q}, {r}) is occupied by more than one piece on the same side")]
    DuplicatePosition { q: i8, r: i8 },

    #[error("position ({q}, {r}) is outside the legal placement zone for this side")]
    OutsidePlacementZone { q: i8, r: i8 },

    #[error("unknown piece id: {0}")]
    UnknownPieceId(String),

    #[error("king piece id {0} is not a king-flagged kind")]
    NotAKing(String),

    #[error("facing value {0} is not in 0..6")]
    InvalidFacing(u8),

    #[error("ruleset is unusable: {0}")]
    Unusable(String),
}

/// A tournament-evaluation task failed inside a worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker thread {worker_id} disconnected before completing task {task_id}")]
    Disconnected { worker_id: usize, task_id: u64 },

    #[error("evaluation of ruleset {signature} panicked: {message}")]
    Panicked { signature: String, message: String },
}

/// Raised by invariant-checking helpers. These are not meant to be caught
/// by normal control flow -- callers should treat a `GameError` as a bug
/// report, matching spec section 7.1 ("the core aborts the task").
#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid hex ({q}, {r})")]
    InvalidHex { q: i8, r: i8 },

    #[error("king missing for side {side:?} mid-game")]
    KingMissing { side: crate::color::Color },

    #[error("move budget must be at least 1, got {0}")]
    NonPositiveMoveBudget(i64),

    #[error("recorded game's ruleset no longer validates: {0}")]
    InvalidRuleset(#[from] RulesetError),
}

//! Turn templates: the ordered list of (action-kind, constraint) pairs a
//! player performs on their turn. Six templates exist; only `E` is used by
//! the production ruleset constructors, but all six remain constructible
//! and are retained for completeness (multi-action templates explode
//! search cost, which is why the evolutionary loop never selects them).

/// The kind of action a template step requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ActionKind {
    Move,
    Rotate,
    MoveOrRotate,
}

/// Which piece may perform a template step, relative to the last action
/// taken this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Any,
    SamePiece,
    DifferentPiece,
}

/// One step of a turn template.
pub type TemplateStep = (ActionKind, Constraint);

/// A = rotate-then-move-same-piece.
pub static TEMPLATE_A: &[TemplateStep] = &[
    (ActionKind::Rotate, Constraint::Any),
    (ActionKind::Move, Constraint::SamePiece),
];

/// B = move-rotate-rotate.
pub static TEMPLATE_B: &[TemplateStep] = &[
    (ActionKind::Move, Constraint::Any),
    (ActionKind::Rotate, Constraint::Any),
    (ActionKind::Rotate, Constraint::Any),
];

/// C = move-move-rotate.
pub static TEMPLATE_C: &[TemplateStep] = &[
    (ActionKind::Move, Constraint::Any),
    (ActionKind::Move, Constraint::Any),
    (ActionKind::Rotate, Constraint::Any),
];

/// D = move-then-rotate-different-piece.
pub static TEMPLATE_D: &[TemplateStep] = &[
    (ActionKind::Move, Constraint::Any),
    (ActionKind::Rotate, Constraint::DifferentPiece),
];

/// E = a single move-or-rotate action. The only template permitted in the
/// production configuration.
pub static TEMPLATE_E: &[TemplateStep] = &[(ActionKind::MoveOrRotate, Constraint::Any)];

/// F = move-then-rotate-same-piece.
pub static TEMPLATE_F: &[TemplateStep] = &[
    (ActionKind::Move, Constraint::Any),
    (ActionKind::Rotate, Constraint::SamePiece),
];

/// Identifies one of the six templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum TemplateId {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl TemplateId {
    /// The ordered action steps for this template.
    pub fn steps(&self) -> &'static [TemplateStep] {
        match self {
            TemplateId::A => TEMPLATE_A,
            TemplateId::B => TEMPLATE_B,
            TemplateId::C => TEMPLATE_C,
            TemplateId::D => TEMPLATE_D,
            TemplateId::E => TEMPLATE_E,
            TemplateId::F => TEMPLATE_F,
        }
    }

    /// Whether this template allows a rotation before any piece has moved
    /// this turn -- used by the template-aware valuation in `evaluator.rs`.
    pub fn allows_rotate_before_move(&self) -> bool {
        matches!(self.steps().first(), Some((ActionKind::Rotate, _)) | Some((ActionKind::MoveOrRotate, _)))
    }

    /// Whether this template forces a move to be followed by a rotation of
    /// a *different* piece -- the template regime that under-values
    /// single-direction pieces.
    pub fn forces_move_before_rotate_different_piece(&self) -> bool {
        matches!(self, TemplateId::D)
    }
}

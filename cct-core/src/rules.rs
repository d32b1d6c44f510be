//! Intent/Effect vocabulary for the combat tracker.
//!
//! Every user action is expressed as an [`Intent`]. The session either
//! rejects it with a [`Rejection`] (no state changed) or carries it out and
//! returns an [`Outcome`]: the list of [`Effect`]s that describe exactly what
//! changed, plus a human-readable narrative line per step.
//!
//! Front ends render from effects rather than diffing state, which is how the
//! "batch resolved" notification of the save queue reaches them.

use crate::combatant::{CombatantSubmission, SubmissionError};
use crate::conditions::{ConditionSpec, TurnBoundary};
use crate::resolution::SavePrompt;
use crate::world::{CombatantId, Condition, ConditionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Intents
// ============================================================================

/// What a user wants to happen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Intent {
    /// Sort the roster and hand the first turn out.
    StartCombat,

    /// Stop tracking; clears every condition.
    EndCombat,

    /// Add a player character or monster.
    AddCombatant(CombatantSubmission),

    /// Take a combatant out of the order.
    RemoveCombatant { id: CombatantId },

    /// Finish the active combatant's turn.
    NextTurn,

    /// Answer the pending saving-throw prompt.
    SubmitSave { success: bool },

    /// Attach a condition to a combatant.
    ApplyCondition {
        target: CombatantId,
        spec: ConditionSpec,
    },

    /// Remove one condition instance.
    RemoveCondition {
        target: CombatantId,
        condition_id: ConditionId,
    },

    /// Remove every condition on `target` sharing `label`.
    RemoveConditionsByLabel { target: CombatantId, label: String },
}

impl Intent {
    /// Short description for transcripts.
    pub fn summary(&self) -> String {
        match self {
            Intent::StartCombat => "start combat".to_string(),
            Intent::EndCombat => "end combat".to_string(),
            Intent::AddCombatant(s) => format!("add {} {} ({})", s.kind, s.name, s.initiative),
            Intent::RemoveCombatant { id } => format!("remove {id}"),
            Intent::NextTurn => "next turn".to_string(),
            Intent::SubmitSave { success: true } => "save passed".to_string(),
            Intent::SubmitSave { success: false } => "save failed".to_string(),
            Intent::ApplyCondition { target, spec } => format!("apply {} to {target}", spec.label),
            Intent::RemoveCondition {
                target,
                condition_id,
            } => format!("remove condition {condition_id} from {target}"),
            Intent::RemoveConditionsByLabel { target, label } => {
                format!("remove {label} from {target}")
            }
        }
    }
}

// ============================================================================
// Effects
// ============================================================================

/// Why a condition left its combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    /// A saving throw succeeded.
    SavedAgainst,
    /// Its duration ran out.
    Expired,
    /// Someone deleted it.
    Manual,
}

/// A concrete, already-applied state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    CombatStarted {
        round: u32,
        first: Option<CombatantId>,
    },

    CombatEnded {
        roster_cleared: bool,
    },

    CombatantAdded {
        id: CombatantId,
        label: String,
        initiative: i32,
        position: usize,
    },

    CombatantRemoved {
        id: CombatantId,
        label: String,
        /// The active combatant was removed and the turn went back to the top.
        cursor_reset: bool,
    },

    /// The order was fully re-sorted on a wrap.
    OrderResorted,

    RoundAdvanced {
        round: u32,
    },

    TurnAdvanced {
        round: u32,
        active: CombatantId,
        label: String,
    },

    ConditionApplied {
        target: CombatantId,
        condition: Condition,
    },

    ConditionRemoved {
        target: CombatantId,
        condition: Condition,
        reason: RemovalReason,
    },

    /// A timed condition lost a round and is still active.
    ConditionTicked {
        target: CombatantId,
        condition_id: ConditionId,
        remaining: u32,
    },

    /// A save is now awaiting a result.
    SavePrompted(SavePrompt),

    SaveRecorded {
        target: CombatantId,
        condition_id: ConditionId,
        label: String,
        success: bool,
    },

    /// Every condition firing at `boundary` has been answered.
    BatchResolved {
        target: CombatantId,
        boundary: TurnBoundary,
    },

    /// The batch owner left combat before every save was answered.
    BatchAbandoned {
        target: CombatantId,
        boundary: TurnBoundary,
    },
}

/// The result of carrying out an intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub effects: Vec<Effect>,
    pub narrative: String,
}

impl Outcome {
    pub fn new(narrative: impl Into<String>) -> Self {
        Self {
            effects: Vec::new(),
            narrative: narrative.into(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    pub fn push(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Append a line to the narrative.
    pub fn narrate(&mut self, line: impl AsRef<str>) {
        if !self.narrative.is_empty() {
            self.narrative.push('\n');
        }
        self.narrative.push_str(line.as_ref());
    }

    /// The save left waiting by this outcome, if any.
    pub fn pending_prompt(&self) -> Option<&SavePrompt> {
        match self.effects.last() {
            Some(Effect::SavePrompted(prompt)) => Some(prompt),
            _ => None,
        }
    }

    /// Whether a save batch finished for `boundary`.
    pub fn resolved(&self, boundary: TurnBoundary) -> bool {
        self.effects.iter().any(
            |e| matches!(e, Effect::BatchResolved { boundary: b, .. } if *b == boundary),
        )
    }
}

// ============================================================================
// Rejections
// ============================================================================

/// Why an intent was refused. A rejection never changes state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Combat has not started")]
    NotStarted,

    #[error("Combat is already in progress")]
    AlreadyStarted,

    #[error("A saving throw is still waiting for a result")]
    ResolutionInProgress,

    #[error("There is nobody in the initiative order")]
    EmptyRoster,

    #[error("No saving throw is waiting for a result")]
    NoPendingSave,

    #[error("No combatant with id {0}")]
    UnknownCombatant(CombatantId),

    #[error("No condition with id {0}")]
    UnknownCondition(ConditionId),

    #[error("No condition labeled {0:?}")]
    UnknownConditionLabel(String),

    #[error("A timed condition must last at least one round")]
    ZeroDuration,

    #[error("Invalid combatant: {0}")]
    InvalidSubmission(#[from] SubmissionError),
}

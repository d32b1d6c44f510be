//! Sequential saving-throw resolution.
//!
//! When several conditions fire at the same turn boundary they are resolved
//! one at a time: the queue holds the batch, exposes the head as the
//! condition awaiting a result, and waits for exactly one pass/fail per
//! condition before reporting the batch resolved.

use crate::conditions::{ConditionState, TurnBoundary};
use crate::world::{Ability, CombatantId, Condition, ConditionId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// A pending save, as shown to whoever rolls the dice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePrompt {
    pub combatant_id: CombatantId,
    pub combatant_label: String,
    pub condition_id: ConditionId,
    pub condition_label: String,
    pub ability: Option<Ability>,
    pub dc: Option<i32>,
    pub boundary: TurnBoundary,
    /// Conditions still queued after this one.
    pub remaining: usize,
}

impl SavePrompt {
    pub fn new(
        combatant_id: CombatantId,
        combatant_label: impl Into<String>,
        condition: &Condition,
        boundary: TurnBoundary,
        remaining: usize,
    ) -> Self {
        Self {
            combatant_id,
            combatant_label: combatant_label.into(),
            condition_id: condition.id,
            condition_label: condition.label.clone(),
            ability: condition.save_ability,
            dc: condition.save_dc,
            boundary,
            remaining,
        }
    }
}

impl fmt::Display for SavePrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ability, self.dc) {
            (Some(ability), Some(dc)) => write!(
                f,
                "Roll a DC {dc} {ability} saving throw against \"{}\". Did it succeed?",
                self.condition_label
            ),
            _ => write!(
                f,
                "Make a saving throw against \"{}\". Did it succeed?",
                self.condition_label
            ),
        }
    }
}

/// Result of feeding one pass/fail into the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveStep {
    pub owner: CombatantId,
    pub condition: Condition,
    pub success: bool,
    /// Whether the condition was actually removed from its owner.
    pub removed: bool,
    /// Set when this result drained the batch.
    pub resolved: Option<TurnBoundary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum QueueState {
    #[default]
    Idle,
    Resolving {
        owner: CombatantId,
        boundary: TurnBoundary,
        pending: VecDeque<Condition>,
    },
}

/// Serializes user-driven saves for a batch of simultaneously firing
/// conditions.
#[derive(Debug, Clone, Default)]
pub struct ConditionResolutionQueue {
    state: QueueState,
}

impl ConditionResolutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start resolving `conditions` for `owner`.
    ///
    /// Returns `false` without changing state when there is nothing to
    /// resolve; the caller then treats the boundary as resolved right away.
    /// Also returns `false` if a batch is already in flight.
    pub fn begin(
        &mut self,
        owner: CombatantId,
        conditions: Vec<Condition>,
        boundary: TurnBoundary,
    ) -> bool {
        if conditions.is_empty() {
            return false;
        }
        if self.is_resolving() {
            warn!(%owner, %boundary, "Refusing to start a second condition batch");
            return false;
        }

        debug!(%owner, %boundary, count = conditions.len(), "Condition batch started");
        self.state = QueueState::Resolving {
            owner,
            boundary,
            pending: conditions.into(),
        };
        true
    }

    /// Record the result for the condition at the head of the queue.
    ///
    /// On success the condition is removed from `conditions` (its owner's
    /// state); on failure it is left untouched. Returns `None` when idle.
    pub fn submit_result(
        &mut self,
        success: bool,
        conditions: &mut ConditionState,
    ) -> Option<SaveStep> {
        let QueueState::Resolving {
            owner,
            boundary,
            pending,
        } = &mut self.state
        else {
            return None;
        };

        let owner = *owner;
        let boundary = *boundary;
        let condition = pending.pop_front()?;
        let removed = success && conditions.remove(condition.id).is_some();
        let drained = pending.is_empty();

        debug!(
            %owner,
            condition = %condition.label,
            success,
            left = pending.len(),
            "Save recorded"
        );

        if drained {
            self.state = QueueState::Idle;
        }

        Some(SaveStep {
            owner,
            condition,
            success,
            removed,
            resolved: drained.then_some(boundary),
        })
    }

    /// Drop the batch in flight, returning whose it was and for which boundary.
    pub fn abandon(&mut self) -> Option<(CombatantId, TurnBoundary)> {
        match std::mem::take(&mut self.state) {
            QueueState::Idle => None,
            QueueState::Resolving {
                owner, boundary, ..
            } => Some((owner, boundary)),
        }
    }

    pub fn is_resolving(&self) -> bool {
        matches!(self.state, QueueState::Resolving { .. })
    }

    /// The condition currently waiting for a result.
    pub fn awaiting(&self) -> Option<&Condition> {
        match &self.state {
            QueueState::Idle => None,
            QueueState::Resolving { pending, .. } => pending.front(),
        }
    }

    pub fn owner(&self) -> Option<CombatantId> {
        match &self.state {
            QueueState::Idle => None,
            QueueState::Resolving { owner, .. } => Some(*owner),
        }
    }

    pub fn boundary(&self) -> Option<TurnBoundary> {
        match &self.state {
            QueueState::Idle => None,
            QueueState::Resolving { boundary, .. } => Some(*boundary),
        }
    }

    /// Number of conditions still waiting, including the head.
    pub fn pending_len(&self) -> usize {
        match &self.state {
            QueueState::Idle => 0,
            QueueState::Resolving { pending, .. } => pending.len(),
        }
    }
}

//! CombatSession - the primary public API for running combat.
//!
//! The session composes the initiative order, the round counter and the
//! saving-throw queue into one state machine. It is the only place where
//! combat state is mutated; every operation either returns an [`Outcome`]
//! describing what changed or a [`Rejection`] and leaves state untouched.
//!
//! A turn transition is a handshake:
//! 1. `request_next_turn` collects the active combatant's end-of-turn
//!    conditions. If there are none the turn is finalized at once.
//! 2. Otherwise each condition is prompted in turn and answered with
//!    `submit_save`. When the last one is answered the turn is finalized.
//! 3. Finalizing decrements timed conditions, advances the cursor (re-sorting
//!    and bumping the round on a wrap) and runs the same prompt cycle for the
//!    new combatant's start-of-turn conditions.

use crate::combatant::CombatantSubmission;
use crate::conditions::{ConditionSpec, TurnBoundary};
use crate::resolution::{ConditionResolutionQueue, SavePrompt};
use crate::rules::{Effect, Intent, Outcome, Rejection, RemovalReason};
use crate::turn_order::{CursorShift, TurnOrder};
use crate::world::{Combatant, CombatantId, ConditionId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Configuration for a combat session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Shown in the status header.
    pub table_name: String,

    /// Monster catalog JSON file.
    pub catalog_path: Option<PathBuf>,

    /// Keep combatants (minus their conditions) when combat ends.
    pub retain_roster_on_end: bool,
}

impl SessionConfig {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            catalog_path: None,
            retain_roster_on_end: false,
        }
    }

    /// Set the monster catalog file.
    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    /// Keep the roster when combat ends.
    pub fn with_retain_roster_on_end(mut self, retain: bool) -> Self {
        self.retain_roster_on_end = retain;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new("Encounter")
    }
}

/// Where a started combat is within the current turn transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// No save is pending; the turn can be advanced.
    Idle,
    AwaitingEndResolution,
    AwaitingStartResolution,
}

impl TurnPhase {
    fn awaiting(boundary: TurnBoundary) -> Self {
        match boundary {
            TurnBoundary::Start => TurnPhase::AwaitingStartResolution,
            TurnBoundary::End => TurnPhase::AwaitingEndResolution,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatPhase {
    NotStarted,
    InProgress(TurnPhase),
}

/// A combat encounter.
#[derive(Debug, Clone)]
pub struct CombatSession {
    config: SessionConfig,
    order: TurnOrder,
    queue: ConditionResolutionQueue,
    phase: CombatPhase,
    round: u32,
    /// Counts finalized turns; keys the wrap latch.
    turn_serial: u64,
    /// Turn serial of the last round increment.
    round_latch: Option<u64>,
}

impl CombatSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            order: TurnOrder::new(),
            queue: ConditionResolutionQueue::new(),
            phase: CombatPhase::NotStarted,
            round: 1,
            turn_serial: 0,
            round_latch: None,
        }
    }

    // ========================================================================
    // State Access
    // ========================================================================

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        matches!(self.phase, CombatPhase::InProgress(_))
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn cursor(&self) -> usize {
        self.order.cursor()
    }

    /// Combatants in their current order.
    pub fn combatants(&self) -> &[Combatant] {
        self.order.as_slice()
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.order.get(id)
    }

    /// The combatant whose turn it is, once combat has started.
    pub fn active(&self) -> Option<&Combatant> {
        if self.is_started() {
            self.order.active()
        } else {
            None
        }
    }

    /// The saving throw currently waiting for a result.
    pub fn pending_prompt(&self) -> Option<SavePrompt> {
        let owner = self.queue.owner()?;
        let boundary = self.queue.boundary()?;
        let condition = self.queue.awaiting()?;
        let label = self
            .order
            .get(owner)
            .map(|c| c.display_label.as_str())
            .unwrap_or_default();
        Some(SavePrompt::new(
            owner,
            label,
            condition,
            boundary,
            self.queue.pending_len().saturating_sub(1),
        ))
    }

    // ========================================================================
    // Intent Dispatch
    // ========================================================================

    /// Carry out any user action.
    pub fn apply(&mut self, intent: Intent) -> Result<Outcome, Rejection> {
        match intent {
            Intent::StartCombat => self.start_combat(),
            Intent::EndCombat => Ok(self.end_combat()),
            Intent::AddCombatant(submission) => self.add_combatant(submission),
            Intent::RemoveCombatant { id } => self.remove_combatant(id),
            Intent::NextTurn => self.request_next_turn(),
            Intent::SubmitSave { success } => self.submit_save(success),
            Intent::ApplyCondition { target, spec } => self.apply_condition(target, spec),
            Intent::RemoveCondition {
                target,
                condition_id,
            } => self.remove_condition(target, condition_id),
            Intent::RemoveConditionsByLabel { target, label } => {
                self.remove_conditions_by_label(target, &label)
            }
        }
    }

    // ========================================================================
    // Combat Lifecycle
    // ========================================================================

    /// Sort the roster and begin round 1 with the first combatant.
    ///
    /// No start-of-turn saves are asked for the opening turn.
    pub fn start_combat(&mut self) -> Result<Outcome, Rejection> {
        if self.is_started() {
            return Err(Rejection::AlreadyStarted);
        }

        self.order.sort_for_combat_start();
        self.round = 1;
        self.turn_serial = 0;
        self.round_latch = None;
        self.phase = CombatPhase::InProgress(TurnPhase::Idle);

        let first = self.order.active().map(|c| (c.id, c.display_label.clone()));
        info!(
            table = %self.config.table_name,
            combatants = self.order.len(),
            "Combat started"
        );

        let mut outcome = Outcome::new("Combat begins. Round 1.").with_effect(Effect::CombatStarted {
            round: 1,
            first: first.as_ref().map(|(id, _)| *id),
        });
        if let Some((_, label)) = first {
            outcome.narrate(format!("{label} acts first."));
        }
        Ok(outcome)
    }

    /// Stop combat from any state.
    ///
    /// Drops any pending save, clears every condition and, unless the
    /// session keeps its roster, every combatant.
    pub fn end_combat(&mut self) -> Outcome {
        let mut outcome = Outcome::new("Combat is over.");

        if let Some((target, boundary)) = self.queue.abandon() {
            outcome.push(Effect::BatchAbandoned { target, boundary });
        }

        for combatant in self.order.iter_mut() {
            combatant.conditions.clear();
        }

        let roster_cleared = !self.config.retain_roster_on_end;
        if roster_cleared {
            self.order.clear();
        } else {
            self.order.reset_cursor();
        }

        self.phase = CombatPhase::NotStarted;
        self.round = 1;
        self.turn_serial = 0;
        self.round_latch = None;

        info!(table = %self.config.table_name, roster_cleared, "Combat ended");
        outcome.with_effect(Effect::CombatEnded { roster_cleared })
    }

    // ========================================================================
    // Roster
    // ========================================================================

    /// Validate and insert a combatant.
    ///
    /// Before combat it is appended; during combat it is slotted in relative
    /// to the active combatant so it acts at the right point of this round.
    pub fn add_combatant(&mut self, submission: CombatantSubmission) -> Result<Outcome, Rejection> {
        let combatant = submission.validate()?.into_combatant(self.order.iter());
        let id = combatant.id;
        let label = combatant.display_label.clone();
        let initiative = combatant.initiative;

        let position = if self.is_started() {
            self.order.insert_during_combat(combatant)
        } else {
            self.order.push(combatant)
        };

        info!(%label, initiative, position, "Combatant added");
        Ok(
            Outcome::new(format!("{label} joins at initiative {initiative}.")).with_effect(
                Effect::CombatantAdded {
                    id,
                    label,
                    initiative,
                    position,
                },
            ),
        )
    }

    /// Take a combatant out of the order, keeping the turn on whoever was
    /// active.
    ///
    /// If the combatant owned the pending save batch, the batch is dropped.
    /// Removing the active combatant hands the turn to the top of the order
    /// without asking that combatant's start-of-turn saves.
    pub fn remove_combatant(&mut self, id: CombatantId) -> Result<Outcome, Rejection> {
        if self.order.position(id).is_none() {
            return Err(Rejection::UnknownCombatant(id));
        }

        let mut outcome = Outcome::default();

        if self.queue.owner() == Some(id) {
            if let Some((target, boundary)) = self.queue.abandon() {
                debug!(%target, %boundary, "Dropping save batch of removed combatant");
                outcome.push(Effect::BatchAbandoned { target, boundary });
            }
            if self.is_started() {
                self.phase = CombatPhase::InProgress(TurnPhase::Idle);
            }
        }

        let Some((removed, shift)) = self.order.remove(id) else {
            return Err(Rejection::UnknownCombatant(id));
        };

        let cursor_reset = self.is_started() && shift == CursorShift::Reset;
        info!(label = %removed.display_label, ?shift, "Combatant removed");
        outcome.narrate(format!("{} leaves combat.", removed.display_label));
        if cursor_reset {
            if let Some(active) = self.order.active() {
                outcome.narrate(format!("{}'s turn.", active.display_label));
            }
        }

        Ok(outcome.with_effect(Effect::CombatantRemoved {
            id,
            label: removed.display_label,
            cursor_reset,
        }))
    }

    // ========================================================================
    // Turn Advancement
    // ========================================================================

    /// Finish the active combatant's turn.
    ///
    /// Refused while any save is pending. If end-of-turn conditions fire the
    /// turn waits for their results; otherwise it moves on at once.
    pub fn request_next_turn(&mut self) -> Result<Outcome, Rejection> {
        match self.phase {
            CombatPhase::NotStarted => return Err(Rejection::NotStarted),
            CombatPhase::InProgress(TurnPhase::Idle) => {}
            CombatPhase::InProgress(_) => return Err(Rejection::ResolutionInProgress),
        }

        let (owner, firing) = match self.order.active() {
            Some(active) => (active.id, active.conditions.firing_at(TurnBoundary::End)),
            None => return Err(Rejection::EmptyRoster),
        };

        let outcome = Outcome::default();
        if self.queue.begin(owner, firing, TurnBoundary::End) {
            self.phase = CombatPhase::InProgress(TurnPhase::AwaitingEndResolution);
            return Ok(self.prompt_next(outcome));
        }

        Ok(self.finish_turn(outcome))
    }

    /// Answer the pending saving throw.
    ///
    /// A success removes the condition; a failure leaves it. Answering the
    /// last end-of-turn save finishes the turn.
    pub fn submit_save(&mut self, success: bool) -> Result<Outcome, Rejection> {
        let owner = self.queue.owner().ok_or(Rejection::NoPendingSave)?;
        let Some(combatant) = self.order.get_mut(owner) else {
            warn!(%owner, "Pending save belongs to a combatant no longer in the order");
            return Err(Rejection::UnknownCombatant(owner));
        };
        let label = combatant.display_label.clone();
        let step = self
            .queue
            .submit_result(success, &mut combatant.conditions)
            .ok_or(Rejection::NoPendingSave)?;

        let mut outcome = Outcome::default();
        outcome.narrate(if success {
            format!("{label} saves against {}.", step.condition.label)
        } else {
            format!("{label} fails the save against {}.", step.condition.label)
        });
        outcome.push(Effect::SaveRecorded {
            target: owner,
            condition_id: step.condition.id,
            label: step.condition.label.clone(),
            success,
        });
        if step.removed {
            outcome.push(Effect::ConditionRemoved {
                target: owner,
                condition: step.condition,
                reason: RemovalReason::SavedAgainst,
            });
        }

        match step.resolved {
            None => Ok(self.prompt_next(outcome)),
            Some(boundary) => {
                outcome.push(Effect::BatchResolved {
                    target: owner,
                    boundary,
                });
                match boundary {
                    TurnBoundary::End => Ok(self.finish_turn(outcome)),
                    TurnBoundary::Start => {
                        self.phase = CombatPhase::InProgress(TurnPhase::Idle);
                        Ok(outcome)
                    }
                }
            }
        }
    }

    /// Emit the prompt for the head of the queue.
    fn prompt_next(&self, mut outcome: Outcome) -> Outcome {
        if let Some(prompt) = self.pending_prompt() {
            outcome.narrate(format!("{}: {prompt}", prompt.combatant_label));
            outcome.push(Effect::SavePrompted(prompt));
        }
        outcome
    }

    /// Close out the active turn and open the next one.
    fn finish_turn(&mut self, mut outcome: Outcome) -> Outcome {
        let round = self.round;

        if let Some(active) = self.order.active_mut() {
            let target = active.id;
            let report = active.conditions.decrement_rounds_for_boundary(round);
            for (condition_id, remaining) in report.ticked {
                outcome.push(Effect::ConditionTicked {
                    target,
                    condition_id,
                    remaining,
                });
            }
            for condition in report.expired {
                outcome.narrate(format!(
                    "{} wears off {}.",
                    condition.label, active.display_label
                ));
                outcome.push(Effect::ConditionRemoved {
                    target,
                    condition,
                    reason: RemovalReason::Expired,
                });
            }
        }

        self.turn_serial += 1;
        let Some(advance) = self.order.advance() else {
            self.phase = CombatPhase::InProgress(TurnPhase::Idle);
            return outcome;
        };

        if advance.wrapped {
            outcome.push(Effect::OrderResorted);
            if self.round_latch != Some(self.turn_serial) {
                self.round_latch = Some(self.turn_serial);
                self.round += 1;
                info!(round = self.round, "Round advanced");
                outcome.narrate(format!("Round {}.", self.round));
                outcome.push(Effect::RoundAdvanced { round: self.round });
            }
        }

        let (active_id, active_label, firing) = match self.order.active() {
            Some(active) => (
                active.id,
                active.display_label.clone(),
                active.conditions.firing_at(TurnBoundary::Start),
            ),
            None => {
                self.phase = CombatPhase::InProgress(TurnPhase::Idle);
                return outcome;
            }
        };

        info!(round = self.round, active = %active_label, "Turn advanced");
        outcome.narrate(format!("{active_label}'s turn."));
        outcome.push(Effect::TurnAdvanced {
            round: self.round,
            active: active_id,
            label: active_label,
        });

        if self.queue.begin(active_id, firing, TurnBoundary::Start) {
            self.phase = CombatPhase::InProgress(TurnPhase::awaiting(TurnBoundary::Start));
            self.prompt_next(outcome)
        } else {
            self.phase = CombatPhase::InProgress(TurnPhase::Idle);
            outcome
        }
    }

    // ========================================================================
    // Conditions
    // ========================================================================

    /// Attach a condition, stamped with the current round.
    pub fn apply_condition(
        &mut self,
        target: CombatantId,
        spec: ConditionSpec,
    ) -> Result<Outcome, Rejection> {
        let round = self.round;
        let combatant = self
            .order
            .get_mut(target)
            .ok_or(Rejection::UnknownCombatant(target))?;
        if spec.duration_rounds == Some(0) {
            return Err(Rejection::ZeroDuration);
        }

        let condition = spec.into_condition(round);
        debug!(
            target = %combatant.display_label,
            condition = %condition.label,
            rounds = ?condition.remaining_rounds,
            "Condition applied"
        );
        let narrative = format!("{} is now {}.", combatant.display_label, condition.label);
        combatant.conditions.add(condition.clone());

        Ok(Outcome::new(narrative).with_effect(Effect::ConditionApplied { target, condition }))
    }

    /// Remove one condition instance by id.
    pub fn remove_condition(
        &mut self,
        target: CombatantId,
        condition_id: ConditionId,
    ) -> Result<Outcome, Rejection> {
        let combatant = self
            .order
            .get_mut(target)
            .ok_or(Rejection::UnknownCombatant(target))?;
        let condition = combatant
            .conditions
            .remove(condition_id)
            .ok_or(Rejection::UnknownCondition(condition_id))?;

        Ok(Outcome::new(format!(
            "{} is no longer {}.",
            combatant.display_label, condition.label
        ))
        .with_effect(Effect::ConditionRemoved {
            target,
            condition,
            reason: RemovalReason::Manual,
        }))
    }

    /// Remove every stack of a condition by label.
    pub fn remove_conditions_by_label(
        &mut self,
        target: CombatantId,
        label: &str,
    ) -> Result<Outcome, Rejection> {
        let combatant = self
            .order
            .get_mut(target)
            .ok_or(Rejection::UnknownCombatant(target))?;
        let removed = combatant.conditions.remove_by_label(label);
        if removed.is_empty() {
            return Err(Rejection::UnknownConditionLabel(label.to_string()));
        }

        Ok(Outcome::new(format!(
            "{} is no longer {label}.",
            combatant.display_label
        ))
        .with_effects(removed.into_iter().map(|condition| Effect::ConditionRemoved {
            target,
            condition,
            reason: RemovalReason::Manual,
        })))
    }
}

impl Default for CombatSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Ability, ConditionKind};

    fn add(session: &mut CombatSession, submission: CombatantSubmission) -> CombatantId {
        let outcome = session.add_combatant(submission).unwrap();
        match &outcome.effects[0] {
            Effect::CombatantAdded { id, .. } => *id,
            other => panic!("unexpected effect {other:?}"),
        }
    }

    fn labels(session: &CombatSession) -> Vec<&str> {
        session
            .combatants()
            .iter()
            .map(|c| c.display_label.as_str())
            .collect()
    }

    fn active_label(session: &CombatSession) -> &str {
        session.active().map(|c| c.display_label.as_str()).unwrap_or("")
    }

    fn scenario_a() -> CombatSession {
        let mut session = CombatSession::default();
        add(&mut session, CombatantSubmission::player("Aria", 18));
        add(&mut session, CombatantSubmission::monster("Goblin", 12));
        add(&mut session, CombatantSubmission::monster("Goblin", 12));
        session
    }

    #[test]
    fn test_start_sorts_and_sets_round() {
        let mut session = CombatSession::default();
        add(&mut session, CombatantSubmission::monster("Goblin", 12));
        add(&mut session, CombatantSubmission::player("Aria", 18));
        add(&mut session, CombatantSubmission::monster("Goblin", 12));

        let outcome = session.start_combat().unwrap();
        assert!(matches!(outcome.effects[0], Effect::CombatStarted { round: 1, .. }));
        assert_eq!(labels(&session), vec!["Aria", "Goblin #1", "Goblin #2"]);
        assert_eq!(session.round(), 1);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.phase(), CombatPhase::InProgress(TurnPhase::Idle));
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut session = scenario_a();
        session.start_combat().unwrap();
        assert_eq!(session.start_combat(), Err(Rejection::AlreadyStarted));
    }

    #[test]
    fn test_next_before_start_rejected() {
        let mut session = scenario_a();
        assert_eq!(session.request_next_turn(), Err(Rejection::NotStarted));
    }

    #[test]
    fn test_invalid_submission_changes_nothing() {
        let mut session = scenario_a();
        let err = session
            .add_combatant(CombatantSubmission::monster("Orc", "high"))
            .unwrap_err();
        assert!(matches!(err, Rejection::InvalidSubmission(_)));
        assert_eq!(session.combatants().len(), 3);
    }

    #[test]
    fn test_mid_combat_insert_after_cursor() {
        let mut session = scenario_a();
        session.start_combat().unwrap();
        session.request_next_turn().unwrap();
        assert_eq!(active_label(&session), "Goblin #1");

        add(&mut session, CombatantSubmission::monster("Orc", 15));
        assert_eq!(labels(&session), vec!["Aria", "Goblin #1", "Orc #1", "Goblin #2"]);
        assert_eq!(active_label(&session), "Goblin #1");
    }

    #[test]
    fn test_round_increments_once_per_cycle() {
        let mut session = scenario_a();
        session.start_combat().unwrap();

        session.request_next_turn().unwrap();
        session.request_next_turn().unwrap();
        assert_eq!(session.round(), 1);

        let outcome = session.request_next_turn().unwrap();
        assert_eq!(session.round(), 2);
        assert_eq!(active_label(&session), "Aria");
        assert!(outcome.effects.contains(&Effect::RoundAdvanced { round: 2 }));
        assert_eq!(
            outcome
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::RoundAdvanced { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_single_combatant_round_advances_each_wrap() {
        let mut session = CombatSession::default();
        add(&mut session, CombatantSubmission::player("Aria", 10));
        session.start_combat().unwrap();
        session.request_next_turn().unwrap();
        session.request_next_turn().unwrap();
        assert_eq!(session.round(), 3);
    }

    #[test]
    fn test_next_blocked_while_resolving() {
        let mut session = scenario_a();
        let aria = session.combatants()[0].id;
        session
            .apply_condition(aria, ConditionSpec::preset(ConditionKind::Frightened).at_turn_end())
            .unwrap();
        session.start_combat().unwrap();

        let outcome = session.request_next_turn().unwrap();
        assert!(outcome.pending_prompt().is_some());
        assert_eq!(
            session.phase(),
            CombatPhase::InProgress(TurnPhase::AwaitingEndResolution)
        );

        for _ in 0..3 {
            assert_eq!(session.request_next_turn(), Err(Rejection::ResolutionInProgress));
        }
        assert_eq!(active_label(&session), "Aria");
        assert_eq!(session.round(), 1);

        session.submit_save(false).unwrap();
        assert_eq!(active_label(&session), "Goblin #1");
        assert_eq!(session.phase(), CombatPhase::InProgress(TurnPhase::Idle));
    }

    #[test]
    fn test_submit_without_prompt_rejected() {
        let mut session = scenario_a();
        session.start_combat().unwrap();
        assert_eq!(session.submit_save(true), Err(Rejection::NoPendingSave));
    }

    #[test]
    fn test_scenario_c_failed_save_then_expiry() {
        let mut session = scenario_a();
        let aria = session.combatants()[0].id;
        session
            .apply_condition(
                aria,
                ConditionSpec::preset(ConditionKind::Poisoned)
                    .with_duration(1)
                    .at_turn_end(),
            )
            .unwrap();
        session.start_combat().unwrap();

        let outcome = session.request_next_turn().unwrap();
        let prompt = outcome.pending_prompt().unwrap();
        assert_eq!(prompt.condition_label, "Poisoned");
        assert_eq!(prompt.ability, None);

        let outcome = session.submit_save(false).unwrap();
        assert!(outcome.resolved(TurnBoundary::End));
        assert!(outcome.effects.iter().any(|e| matches!(
            e,
            Effect::ConditionRemoved {
                reason: RemovalReason::Expired,
                ..
            }
        )));
        assert!(session.combatant(aria).unwrap().conditions.is_empty());
    }

    #[test]
    fn test_start_of_turn_saves_follow_end_of_turn() {
        let mut session = scenario_a();
        let aria = session.combatants()[0].id;
        let goblin = session.combatants()[1].id;
        session
            .apply_condition(aria, ConditionSpec::preset(ConditionKind::Prone).at_turn_end())
            .unwrap();
        session
            .apply_condition(
                goblin,
                ConditionSpec::preset(ConditionKind::Paralyzed)
                    .with_save(Ability::Constitution, 14)
                    .at_turn_start(),
            )
            .unwrap();
        session
            .apply_condition(goblin, ConditionSpec::preset(ConditionKind::Blinded).at_turn_start())
            .unwrap();
        session.start_combat().unwrap();

        session.request_next_turn().unwrap();
        let outcome = session.submit_save(true).unwrap();
        assert!(outcome.resolved(TurnBoundary::End));
        let prompt = outcome.pending_prompt().unwrap();
        assert_eq!(prompt.combatant_id, goblin);
        assert_eq!(prompt.condition_label, "Paralyzed");
        assert_eq!(prompt.dc, Some(14));
        assert_eq!(prompt.remaining, 1);
        assert_eq!(
            session.phase(),
            CombatPhase::InProgress(TurnPhase::AwaitingStartResolution)
        );

        session.submit_save(true).unwrap();
        assert_eq!(session.pending_prompt().unwrap().condition_label, "Blinded");
        let outcome = session.submit_save(false).unwrap();
        assert!(outcome.resolved(TurnBoundary::Start));
        assert_eq!(session.phase(), CombatPhase::InProgress(TurnPhase::Idle));

        assert!(session.combatant(aria).unwrap().conditions.is_empty());
        let remaining: Vec<_> = session
            .combatant(goblin)
            .unwrap()
            .conditions
            .iter()
            .map(|c| c.label.clone())
            .collect();
        assert_eq!(remaining, vec!["Blinded"]);
    }

    #[test]
    fn test_scenario_d_remove_active_resets_cursor() {
        let mut session = scenario_a();
        session.start_combat().unwrap();
        session.request_next_turn().unwrap();
        let goblin = session.active().unwrap().id;

        let outcome = session.remove_combatant(goblin).unwrap();
        assert!(matches!(
            outcome.effects.last(),
            Some(Effect::CombatantRemoved {
                cursor_reset: true,
                ..
            })
        ));
        assert_eq!(session.cursor(), 0);
        assert_eq!(active_label(&session), "Aria");

        session.request_next_turn().unwrap();
        assert_eq!(active_label(&session), "Goblin #2");
    }

    #[test]
    fn test_remove_batch_owner_abandons_batch() {
        let mut session = scenario_a();
        let aria = session.combatants()[0].id;
        session
            .apply_condition(aria, ConditionSpec::preset(ConditionKind::Charmed).at_turn_end())
            .unwrap();
        session.start_combat().unwrap();
        session.request_next_turn().unwrap();

        let outcome = session.remove_combatant(aria).unwrap();
        assert!(matches!(
            outcome.effects[0],
            Effect::BatchAbandoned {
                boundary: TurnBoundary::End,
                ..
            }
        ));
        assert_eq!(session.phase(), CombatPhase::InProgress(TurnPhase::Idle));
        assert!(session.pending_prompt().is_none());
        assert_eq!(active_label(&session), "Goblin #1");
    }

    #[test]
    fn test_remove_unknown_rejected() {
        let mut session = scenario_a();
        let ghost = CombatantId::new();
        assert_eq!(
            session.remove_combatant(ghost),
            Err(Rejection::UnknownCombatant(ghost))
        );
        assert_eq!(session.combatants().len(), 3);
    }

    #[test]
    fn test_remove_everyone_leaves_combat_running() {
        let mut session = scenario_a();
        session.start_combat().unwrap();
        let ids: Vec<_> = session.combatants().iter().map(|c| c.id).collect();
        for id in ids {
            session.remove_combatant(id).unwrap();
        }
        assert!(session.is_started());
        assert_eq!(session.request_next_turn(), Err(Rejection::EmptyRoster));

        add(&mut session, CombatantSubmission::player("Bram", 7));
        assert_eq!(active_label(&session), "Bram");
        session.request_next_turn().unwrap();
        assert_eq!(session.round(), 2);
    }

    #[test]
    fn test_end_combat_clears_roster_and_conditions() {
        let mut session = scenario_a();
        let aria = session.combatants()[0].id;
        session
            .apply_condition(aria, ConditionSpec::preset(ConditionKind::Stunned).at_turn_end())
            .unwrap();
        session.start_combat().unwrap();
        session.request_next_turn().unwrap();

        let outcome = session.end_combat();
        assert!(outcome
            .effects
            .contains(&Effect::CombatEnded { roster_cleared: true }));
        assert_eq!(session.phase(), CombatPhase::NotStarted);
        assert!(session.combatants().is_empty());
        assert!(session.pending_prompt().is_none());
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn test_end_combat_can_keep_roster() {
        let mut session =
            CombatSession::new(SessionConfig::new("Keep").with_retain_roster_on_end(true));
        let aria = add(&mut session, CombatantSubmission::player("Aria", 18));
        add(&mut session, CombatantSubmission::monster("Goblin", 12));
        session
            .apply_condition(aria, ConditionSpec::preset(ConditionKind::Prone))
            .unwrap();
        session.start_combat().unwrap();
        session.request_next_turn().unwrap();

        session.end_combat();
        assert_eq!(session.combatants().len(), 2);
        assert!(session.combatant(aria).unwrap().conditions.is_empty());
        assert_eq!(session.cursor(), 0);
        assert!(session.active().is_none());
    }

    #[test]
    fn test_condition_round_added_and_label_removal() {
        let mut session = scenario_a();
        session.start_combat().unwrap();
        for _ in 0..3 {
            session.request_next_turn().unwrap();
        }
        let aria = session.active().unwrap().id;

        let outcome = session
            .apply_condition(aria, ConditionSpec::preset(ConditionKind::Poisoned))
            .unwrap();
        match &outcome.effects[0] {
            Effect::ConditionApplied { condition, .. } => assert_eq!(condition.round_added, 2),
            other => panic!("unexpected effect {other:?}"),
        }
        session
            .apply_condition(aria, ConditionSpec::preset(ConditionKind::Poisoned))
            .unwrap();

        let outcome = session.remove_conditions_by_label(aria, "Poisoned").unwrap();
        assert_eq!(outcome.effects.len(), 2);
        assert_eq!(
            session.remove_conditions_by_label(aria, "Poisoned"),
            Err(Rejection::UnknownConditionLabel("Poisoned".to_string()))
        );
    }

    #[test]
    fn test_remove_condition_by_id() {
        let mut session = scenario_a();
        let aria = session.combatants()[0].id;
        let outcome = session
            .apply_condition(aria, ConditionSpec::custom("Hexed", "#550055"))
            .unwrap();
        let Effect::ConditionApplied { condition, .. } = &outcome.effects[0] else {
            panic!("expected ConditionApplied");
        };
        let id = condition.id;

        session.remove_condition(aria, id).unwrap();
        assert_eq!(
            session.remove_condition(aria, id),
            Err(Rejection::UnknownCondition(id))
        );
    }

    #[test]
    fn test_zero_round_condition_refused() {
        let mut session = scenario_a();
        let aria = session.combatants()[0].id;
        let spec = ConditionSpec::preset(ConditionKind::Prone).with_duration(0);

        assert_eq!(
            session.apply_condition(aria, spec),
            Err(Rejection::ZeroDuration)
        );
        assert!(session.combatants()[0].conditions.is_empty());
    }

    #[test]
    fn test_timed_condition_decrements_once_per_own_turn() {
        let mut session = scenario_a();
        let aria = session.combatants()[0].id;
        session
            .apply_condition(
                aria,
                ConditionSpec::preset(ConditionKind::Restrained).with_duration(2),
            )
            .unwrap();
        session.start_combat().unwrap();

        let outcome = session.request_next_turn().unwrap();
        assert!(outcome.effects.iter().any(|e| matches!(
            e,
            Effect::ConditionTicked { remaining: 1, .. }
        )));
        session.request_next_turn().unwrap();
        session.request_next_turn().unwrap();
        assert_eq!(session.combatant(aria).unwrap().conditions.len(), 1);

        session.request_next_turn().unwrap();
        assert!(session.combatant(aria).unwrap().conditions.is_empty());
    }

    #[test]
    fn test_apply_dispatches_intents() {
        let mut session = CombatSession::default();
        session
            .apply(Intent::AddCombatant(CombatantSubmission::player("Aria", 18)))
            .unwrap();
        session.apply(Intent::StartCombat).unwrap();
        let outcome = session.apply(Intent::NextTurn).unwrap();
        assert!(outcome.effects.contains(&Effect::RoundAdvanced { round: 2 }));
        assert_eq!(
            session.apply(Intent::SubmitSave { success: true }),
            Err(Rejection::NoPendingSave)
        );
        session.apply(Intent::EndCombat).unwrap();
        assert!(!session.is_started());
    }
}

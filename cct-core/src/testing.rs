//! Testing utilities for the combat tracker.
//!
//! This module provides tools for integration testing:
//! - `TestHarness` for scripted encounters addressed by display label
//! - Assertion helpers for verifying order, round, phase and prompts

use crate::combatant::CombatantSubmission;
use crate::conditions::ConditionSpec;
use crate::rules::{Intent, Outcome, Rejection};
use crate::session::{CombatPhase, CombatSession, SessionConfig, TurnPhase};
use crate::world::CombatantId;

/// Test harness for running combat scenarios.
///
/// Builder-style steps record their result instead of failing, so a script
/// can check a rejection with [`assert_rejected`] right after the step.
pub struct TestHarness {
    /// The session under test.
    pub session: CombatSession,
    /// Result of the most recent step.
    pub last: Option<Result<Outcome, Rejection>>,
}

impl TestHarness {
    /// Create a harness with a default session.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::new("Test Table"))
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            session: CombatSession::new(config),
            last: None,
        }
    }

    /// Apply an intent and keep its result.
    pub fn step(&mut self, intent: Intent) -> &mut Self {
        self.last = Some(self.session.apply(intent));
        self
    }

    pub fn pc(&mut self, name: &str, initiative: i32) -> &mut Self {
        self.step(Intent::AddCombatant(CombatantSubmission::player(
            name, initiative,
        )))
    }

    pub fn monster(&mut self, name: &str, initiative: i32) -> &mut Self {
        self.step(Intent::AddCombatant(CombatantSubmission::monster(
            name, initiative,
        )))
    }

    pub fn start(&mut self) -> &mut Self {
        self.step(Intent::StartCombat)
    }

    pub fn end(&mut self) -> &mut Self {
        self.step(Intent::EndCombat)
    }

    pub fn next(&mut self) -> &mut Self {
        self.step(Intent::NextTurn)
    }

    pub fn pass(&mut self) -> &mut Self {
        self.step(Intent::SubmitSave { success: true })
    }

    pub fn fail(&mut self) -> &mut Self {
        self.step(Intent::SubmitSave { success: false })
    }

    /// Attach a condition to the combatant with the given label.
    #[track_caller]
    pub fn condition(&mut self, label: &str, spec: ConditionSpec) -> &mut Self {
        let target = self.id_of(label);
        self.step(Intent::ApplyCondition { target, spec })
    }

    #[track_caller]
    pub fn remove(&mut self, label: &str) -> &mut Self {
        let id = self.id_of(label);
        self.step(Intent::RemoveCombatant { id })
    }

    /// Advance turns, answering every prompt from `results` in order.
    ///
    /// Stops early once `results` runs out while a save is pending.
    pub fn advance_with(&mut self, turns: usize, results: &[bool]) -> &mut Self {
        let mut results = results.iter().copied();
        for _ in 0..turns {
            self.next();
            while self.session.pending_prompt().is_some() {
                match results.next() {
                    Some(success) => {
                        self.step(Intent::SubmitSave { success });
                    }
                    None => return self,
                }
            }
        }
        self
    }

    /// Id of the combatant with the given display label.
    #[track_caller]
    pub fn id_of(&self, label: &str) -> CombatantId {
        match self
            .session
            .combatants()
            .iter()
            .find(|c| c.display_label == label)
        {
            Some(combatant) => combatant.id,
            None => panic!("No combatant labeled '{label}'"),
        }
    }

    /// Display labels in initiative order.
    pub fn order(&self) -> Vec<String> {
        self.session
            .combatants()
            .iter()
            .map(|c| c.display_label.clone())
            .collect()
    }

    pub fn active_label(&self) -> Option<String> {
        self.session.active().map(|c| c.display_label.clone())
    }

    /// Labels of the conditions on a combatant, in insertion order.
    #[track_caller]
    pub fn conditions_of(&self, label: &str) -> Vec<String> {
        let id = self.id_of(label);
        self.session
            .combatant(id)
            .map(|c| c.conditions.iter().map(|x| x.label.clone()).collect())
            .unwrap_or_default()
    }

    /// Condition label of the pending prompt.
    pub fn prompt_label(&self) -> Option<String> {
        self.session.pending_prompt().map(|p| p.condition_label)
    }

    pub fn last_rejection(&self) -> Option<&Rejection> {
        match &self.last {
            Some(Err(rejection)) => Some(rejection),
            _ => None,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the initiative order by display label.
#[track_caller]
pub fn assert_order(harness: &TestHarness, expected: &[&str]) {
    let actual = harness.order();
    assert_eq!(actual, expected, "Unexpected initiative order");
}

/// Assert whose turn it is.
#[track_caller]
pub fn assert_active(harness: &TestHarness, label: &str) {
    let actual = harness.active_label();
    assert_eq!(
        actual.as_deref(),
        Some(label),
        "Expected it to be {label}'s turn, got {actual:?}"
    );
}

#[track_caller]
pub fn assert_round(harness: &TestHarness, round: u32) {
    let actual = harness.session.round();
    assert_eq!(actual, round, "Expected round {round}, got {actual}");
}

#[track_caller]
pub fn assert_phase(harness: &TestHarness, phase: CombatPhase) {
    let actual = harness.session.phase();
    assert_eq!(actual, phase, "Expected phase {phase:?}, got {actual:?}");
}

/// Assert the turn can be advanced.
#[track_caller]
pub fn assert_idle(harness: &TestHarness) {
    assert_phase(harness, CombatPhase::InProgress(TurnPhase::Idle));
}

/// Assert the pending prompt is for `condition_label`.
#[track_caller]
pub fn assert_prompt(harness: &TestHarness, condition_label: &str) {
    let actual = harness.prompt_label();
    assert_eq!(
        actual.as_deref(),
        Some(condition_label),
        "Expected a save against {condition_label}, got {actual:?}"
    );
}

#[track_caller]
pub fn assert_no_prompt(harness: &TestHarness) {
    let actual = harness.prompt_label();
    assert!(actual.is_none(), "Expected no pending save, got {actual:?}");
}

/// Assert the last step was rejected with `expected`.
#[track_caller]
pub fn assert_rejected(harness: &TestHarness, expected: Rejection) {
    assert_eq!(
        harness.last_rejection(),
        Some(&expected),
        "Expected the last step to be rejected"
    );
}

#[track_caller]
pub fn assert_has_condition(harness: &TestHarness, label: &str, condition: &str) {
    assert!(
        harness.conditions_of(label).iter().any(|c| c == condition),
        "Expected {label} to have {condition}"
    );
}

#[track_caller]
pub fn assert_no_condition(harness: &TestHarness, label: &str, condition: &str) {
    assert!(
        !harness.conditions_of(label).iter().any(|c| c == condition),
        "Expected {label} to NOT have {condition}"
    );
}

//! Per-combatant condition bookkeeping.
//!
//! [`ConditionState`] owns the conditions attached to one combatant and
//! answers which of them fire at a turn boundary. [`ConditionSpec`] is the
//! authoring input a front end submits; the tracker turns it into a
//! [`Condition`] by assigning an id and the round it was added in.

use crate::world::{Ability, Condition, ConditionId, ConditionKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Badge colour used when a custom condition has none.
const FALLBACK_COLOR: &str = "#FF0000";
const FALLBACK_TEXT_COLOR: &str = "#FFFFFF";
const FALLBACK_LABEL: &str = "Custom";

/// The two points in a combatant's turn at which conditions can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnBoundary {
    Start,
    End,
}

impl fmt::Display for TurnBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnBoundary::Start => write!(f, "start of turn"),
            TurnBoundary::End => write!(f, "end of turn"),
        }
    }
}

/// What a round decrement changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecrementReport {
    /// Conditions that lost a round and are still active, with the rounds left.
    pub ticked: Vec<(ConditionId, u32)>,
    /// Conditions whose duration ran out and were dropped.
    pub expired: Vec<Condition>,
}

impl DecrementReport {
    pub fn is_empty(&self) -> bool {
        self.ticked.is_empty() && self.expired.is_empty()
    }
}

/// The ordered set of conditions on one combatant.
///
/// Insertion order is preserved and is the order in which saves are
/// prompted. Stacks of the same label are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionState {
    conditions: Vec<Condition>,
}

impl ConditionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conditions flagged for `boundary`, in insertion order.
    pub fn firing_at(&self, boundary: TurnBoundary) -> Vec<Condition> {
        self.conditions
            .iter()
            .filter(|c| c.fires_at(boundary))
            .cloned()
            .collect()
    }

    pub fn add(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn remove(&mut self, id: ConditionId) -> Option<Condition> {
        let index = self.conditions.iter().position(|c| c.id == id)?;
        Some(self.conditions.remove(index))
    }

    /// Remove every condition carrying `label` and return them.
    pub fn remove_by_label(&mut self, label: &str) -> Vec<Condition> {
        let (removed, kept) = std::mem::take(&mut self.conditions)
            .into_iter()
            .partition(|c| c.label == label);
        self.conditions = kept;
        removed
    }

    /// Tick every timed condition down by one round, at most once per round.
    ///
    /// A condition already decremented in `current_round` is left alone, so
    /// calling this twice with the same round changes nothing the second
    /// time. Conditions that reach zero are dropped.
    pub fn decrement_rounds_for_boundary(&mut self, current_round: u32) -> DecrementReport {
        let mut touched = Vec::new();

        for condition in &mut self.conditions {
            let Some(remaining) = condition.remaining_rounds else {
                continue;
            };
            if condition.last_decremented_round == Some(current_round) {
                continue;
            }
            condition.remaining_rounds = Some(remaining.saturating_sub(1));
            condition.last_decremented_round = Some(current_round);
            touched.push(condition.id);
        }

        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.conditions)
            .into_iter()
            .partition(|c| c.remaining_rounds == Some(0));
        self.conditions = kept;

        let ticked = self
            .conditions
            .iter()
            .filter(|c| touched.contains(&c.id))
            .filter_map(|c| c.remaining_rounds.map(|r| (c.id, r)))
            .collect();

        DecrementReport { ticked, expired }
    }

    pub fn get(&self, id: ConditionId) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.id == id)
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.conditions.iter().any(|c| c.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }
}

/// Condition authoring input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub label: String,
    pub color: String,
    pub text_color: String,
    pub save_ability: Option<Ability>,
    pub save_dc: Option<i32>,
    pub duration_rounds: Option<u32>,
    pub fires_at_start: bool,
    pub fires_at_end: bool,
}

impl ConditionSpec {
    /// A standard condition with its preset colours.
    pub fn preset(kind: ConditionKind) -> Self {
        Self {
            label: kind.name().to_string(),
            color: kind.color().to_string(),
            text_color: kind.text_color().to_string(),
            save_ability: None,
            save_dc: None,
            duration_rounds: None,
            fires_at_start: false,
            fires_at_end: false,
        }
    }

    /// A homebrew condition.
    pub fn custom(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
            text_color: FALLBACK_TEXT_COLOR.to_string(),
            save_ability: None,
            save_dc: None,
            duration_rounds: None,
            fires_at_start: false,
            fires_at_end: false,
        }
    }

    /// Preset when `name` matches a standard condition, custom otherwise.
    pub fn named(name: &str) -> Self {
        match ConditionKind::from_name(name) {
            Some(kind) => Self::preset(kind),
            None => Self::custom(name.trim(), ""),
        }
    }

    pub fn with_save(mut self, ability: Ability, dc: i32) -> Self {
        self.save_ability = Some(ability);
        self.save_dc = Some(dc);
        self
    }

    /// Count down `rounds` of the owner's turns. Zero is refused when applied.
    pub fn with_duration(mut self, rounds: u32) -> Self {
        self.duration_rounds = Some(rounds);
        self
    }

    pub fn with_text_color(mut self, text_color: impl Into<String>) -> Self {
        self.text_color = text_color.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn at_turn_start(mut self) -> Self {
        self.fires_at_start = true;
        self
    }

    pub fn at_turn_end(mut self) -> Self {
        self.fires_at_end = true;
        self
    }

    /// Build the condition, stamping a fresh id and the round it was added.
    pub fn into_condition(self, round: u32) -> Condition {
        let label = match self.label.trim() {
            "" => FALLBACK_LABEL.to_string(),
            trimmed => trimmed.to_string(),
        };
        let color = if self.color.trim().is_empty() {
            FALLBACK_COLOR.to_string()
        } else {
            self.color
        };
        let save_dc = self.save_ability.and(self.save_dc);

        Condition {
            id: ConditionId::new(),
            label,
            color,
            text_color: self.text_color,
            save_ability: self.save_ability,
            save_dc,
            remaining_rounds: self.duration_rounds,
            fires_at_start: self.fires_at_start,
            fires_at_end: self.fires_at_end,
            round_added: round,
            last_decremented_round: None,
        }
    }
}

//! Adding combatants: input validation and display-label derivation.

use crate::catalog::MonsterRecord;
use crate::conditions::ConditionState;
use crate::world::{format_label, CombatStats, Combatant, CombatantId, CombatantKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Why an add-combatant submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Combatant name must not be empty")]
    EmptyName,

    #[error("Initiative must be a whole number, got {0:?}")]
    InvalidInitiative(String),
}

/// Raw add-combatant input as a front end collects it.
///
/// Initiative stays text until [`CombatantSubmission::validate`] so that a
/// form can hand over whatever the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantSubmission {
    pub name: String,
    pub initiative: String,
    pub kind: CombatantKind,
    pub stats: CombatStats,
    pub portrait_ref: Option<String>,
    pub monster_ref_id: Option<String>,
}

impl CombatantSubmission {
    pub fn new(kind: CombatantKind, name: impl Into<String>, initiative: impl ToString) -> Self {
        Self {
            name: name.into(),
            initiative: initiative.to_string(),
            kind,
            stats: CombatStats::default(),
            portrait_ref: None,
            monster_ref_id: None,
        }
    }

    pub fn player(name: impl Into<String>, initiative: impl ToString) -> Self {
        Self::new(CombatantKind::PlayerCharacter, name, initiative)
    }

    pub fn monster(name: impl Into<String>, initiative: impl ToString) -> Self {
        Self::new(CombatantKind::Monster, name, initiative)
    }

    pub fn with_hit_points(mut self, hp: impl Into<String>) -> Self {
        self.stats.hit_points = Some(hp.into());
        self
    }

    pub fn with_armor_class(mut self, ac: impl Into<String>) -> Self {
        self.stats.armor_class = Some(ac.into());
        self
    }

    pub fn with_speed(mut self, speed: impl Into<String>) -> Self {
        self.stats.speed = Some(speed.into());
        self
    }

    pub fn with_portrait(mut self, portrait_ref: impl Into<String>) -> Self {
        self.portrait_ref = Some(portrait_ref.into());
        self
    }

    pub fn with_monster_ref(mut self, id: impl Into<String>) -> Self {
        self.monster_ref_id = Some(id.into());
        self
    }

    /// Copy name, stats, portrait and id from a catalog entry.
    ///
    /// Fields the record leaves blank keep whatever was entered by hand.
    pub fn with_catalog_record(mut self, record: &MonsterRecord) -> Self {
        self.name = record.name.clone();
        let stats = record.combat_stats();
        self.stats.hit_points = stats.hit_points.or(self.stats.hit_points);
        self.stats.armor_class = stats.armor_class.or(self.stats.armor_class);
        self.stats.speed = stats.speed.or(self.stats.speed);
        self.portrait_ref = record.avatar_url.clone().or(self.portrait_ref);
        self.monster_ref_id = Some(record.id.clone());
        self
    }

    /// Check the submission and parse its initiative.
    pub fn validate(self) -> Result<ValidSubmission, SubmissionError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SubmissionError::EmptyName);
        }
        let initiative = self
            .initiative
            .trim()
            .parse::<i32>()
            .map_err(|_| SubmissionError::InvalidInitiative(self.initiative.clone()))?;

        Ok(ValidSubmission {
            name: name.to_string(),
            initiative,
            kind: self.kind,
            stats: self.stats,
            portrait_ref: self.portrait_ref,
            monster_ref_id: self.monster_ref_id,
        })
    }
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub name: String,
    pub initiative: i32,
    pub kind: CombatantKind,
    pub stats: CombatStats,
    pub portrait_ref: Option<String>,
    pub monster_ref_id: Option<String>,
}

impl ValidSubmission {
    /// Build the combatant, numbering monsters against those already present.
    pub fn into_combatant<'a>(self, present: impl IntoIterator<Item = &'a Combatant>) -> Combatant {
        let instance = match self.kind {
            CombatantKind::Monster => Some(next_instance_number(&self.name, present)),
            CombatantKind::PlayerCharacter => None,
        };

        Combatant {
            id: CombatantId::new(),
            display_label: format_label(&self.name, instance),
            name: self.name,
            instance,
            kind: self.kind,
            initiative: self.initiative,
            stats: self.stats,
            portrait_ref: self.portrait_ref,
            monster_ref_id: self.monster_ref_id,
            conditions: ConditionState::new(),
        }
    }
}

/// Lowest positive instance number not used by a present monster named `name`.
///
/// Numbers freed by removed monsters are handed out again.
pub fn next_instance_number<'a>(
    name: &str,
    present: impl IntoIterator<Item = &'a Combatant>,
) -> u32 {
    let used: HashSet<u32> = present
        .into_iter()
        .filter(|c| c.is_monster() && c.name == name)
        .filter_map(|c| c.instance)
        .collect();

    (1..).find(|n| !used.contains(n)).unwrap_or(1)
}

//! Combat tracker data types.
//!
//! Contains the types shared by every other module: identifiers, abilities,
//! combatants with their display-only stats, and the conditions attached to
//! them.

use crate::conditions::{ConditionState, TurnBoundary};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a single applied condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionId(pub Uuid);

impl ConditionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConditionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Abilities
// ============================================================================

/// The six abilities a saving throw can be made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }

    /// Parse a save-ability field where `"None"` means no saving throw.
    ///
    /// Returns `Ok(None)` for `"None"` (any case), `Ok(Some(_))` for an
    /// abbreviation or full name, and an error for anything else.
    pub fn parse_save_field(s: &str) -> Result<Option<Ability>, UnknownAbility> {
        if s.trim().eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        s.parse().map(Some)
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

/// Error for an ability name that matches none of the six abilities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown ability: {0}")]
pub struct UnknownAbility(pub String);

impl FromStr for Ability {
    type Err = UnknownAbility;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ability::all()
            .into_iter()
            .find(|a| {
                a.abbreviation().eq_ignore_ascii_case(trimmed) || a.name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownAbility(trimmed.to_string()))
    }
}

// ============================================================================
// Condition Presets
// ============================================================================

/// The standard D&D 5e conditions offered as presets when authoring a
/// condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    Blinded,
    Charmed,
    Deafened,
    Exhaustion,
    Frightened,
    Grappled,
    Incapacitated,
    Invisible,
    Paralyzed,
    Petrified,
    Poisoned,
    Prone,
    Restrained,
    Stunned,
    Unconscious,
}

impl ConditionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ConditionKind::Blinded => "Blinded",
            ConditionKind::Charmed => "Charmed",
            ConditionKind::Deafened => "Deafened",
            ConditionKind::Exhaustion => "Exhaustion",
            ConditionKind::Frightened => "Frightened",
            ConditionKind::Grappled => "Grappled",
            ConditionKind::Incapacitated => "Incapacitated",
            ConditionKind::Invisible => "Invisible",
            ConditionKind::Paralyzed => "Paralyzed",
            ConditionKind::Petrified => "Petrified",
            ConditionKind::Poisoned => "Poisoned",
            ConditionKind::Prone => "Prone",
            ConditionKind::Restrained => "Restrained",
            ConditionKind::Stunned => "Stunned",
            ConditionKind::Unconscious => "Unconscious",
        }
    }

    /// Badge background colour.
    pub fn color(&self) -> &'static str {
        match self {
            ConditionKind::Blinded => "#000000",
            ConditionKind::Charmed => "#FF00FF",
            ConditionKind::Deafened => "#CC6600",
            ConditionKind::Exhaustion => "#FFFF00",
            ConditionKind::Frightened => "#5B6C26",
            ConditionKind::Grappled => "#000033",
            ConditionKind::Incapacitated => "#3C96A3",
            ConditionKind::Invisible => "#FFFFFF",
            ConditionKind::Paralyzed => "#D18D82",
            ConditionKind::Petrified => "#663300",
            ConditionKind::Poisoned => "#006600",
            ConditionKind::Prone => "#003319",
            ConditionKind::Restrained => "#FF0000",
            ConditionKind::Stunned => "#000066",
            ConditionKind::Unconscious => "#330000",
        }
    }

    /// Badge text colour, chosen to stay readable on [`Self::color`].
    pub fn text_color(&self) -> &'static str {
        match self {
            ConditionKind::Exhaustion | ConditionKind::Invisible => "#000000",
            _ => "#FFFFFF",
        }
    }

    /// Short rules reference shown in the condition info overlay.
    pub fn rules_text(&self) -> &'static str {
        match self {
            ConditionKind::Blinded => {
                "Can't see and automatically fails any ability check that requires sight. \
                 Attack rolls against the creature have Advantage, and its attack rolls have Disadvantage."
            }
            ConditionKind::Charmed => {
                "Can't attack the charmer or target it with harmful abilities. \
                 The charmer has Advantage on ability checks to interact socially with the creature."
            }
            ConditionKind::Deafened => {
                "Can't hear and automatically fails any ability check that requires hearing."
            }
            ConditionKind::Exhaustion => {
                "Cumulative levels. Each level imposes a penalty on d20 tests and reduces Speed; \
                 a creature dies at the sixth level."
            }
            ConditionKind::Frightened => {
                "Has Disadvantage on ability checks and attack rolls while the source of fear is in sight, \
                 and can't willingly move closer to it."
            }
            ConditionKind::Grappled => {
                "Speed is 0. Has Disadvantage on attacks against any target other than the grappler."
            }
            ConditionKind::Incapacitated => {
                "Can't take actions, Bonus Actions, or Reactions, and can't concentrate."
            }
            ConditionKind::Invisible => {
                "Can't be seen without special senses. Attack rolls against the creature have \
                 Disadvantage, and its attack rolls have Advantage."
            }
            ConditionKind::Paralyzed => {
                "Incapacitated and can't move or speak. Automatically fails STR and DEX saves; \
                 hits from within 5 feet are critical hits."
            }
            ConditionKind::Petrified => {
                "Transformed into an inanimate substance. Incapacitated, resistant to all damage, \
                 and immune to poison."
            }
            ConditionKind::Poisoned => {
                "Has Disadvantage on attack rolls and ability checks."
            }
            ConditionKind::Prone => {
                "Can only crawl or spend movement to stand. Melee attacks against the creature have \
                 Advantage, ranged attacks have Disadvantage."
            }
            ConditionKind::Restrained => {
                "Speed is 0. Attack rolls against the creature have Advantage, its attack rolls have \
                 Disadvantage, and it has Disadvantage on DEX saves."
            }
            ConditionKind::Stunned => {
                "Incapacitated. Automatically fails STR and DEX saves, and attack rolls against it \
                 have Advantage."
            }
            ConditionKind::Unconscious => {
                "Incapacitated and Prone, drops what it holds. Automatically fails STR and DEX saves; \
                 hits from within 5 feet are critical hits."
            }
        }
    }

    pub fn all() -> &'static [ConditionKind] {
        &[
            ConditionKind::Blinded,
            ConditionKind::Charmed,
            ConditionKind::Deafened,
            ConditionKind::Exhaustion,
            ConditionKind::Frightened,
            ConditionKind::Grappled,
            ConditionKind::Incapacitated,
            ConditionKind::Invisible,
            ConditionKind::Paralyzed,
            ConditionKind::Petrified,
            ConditionKind::Poisoned,
            ConditionKind::Prone,
            ConditionKind::Restrained,
            ConditionKind::Stunned,
            ConditionKind::Unconscious,
        ]
    }

    /// Case-insensitive lookup by preset name.
    pub fn from_name(name: &str) -> Option<ConditionKind> {
        let name = name.trim();
        Self::all()
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Conditions
// ============================================================================

/// A status effect attached to exactly one combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub label: String,
    pub color: String,
    pub text_color: String,
    /// `None` means the prompt is a plain pass/fail without an ability.
    pub save_ability: Option<Ability>,
    /// Only meaningful when `save_ability` is set.
    pub save_dc: Option<i32>,
    /// `None` means permanent until removed by hand or by a save.
    pub remaining_rounds: Option<u32>,
    pub fires_at_start: bool,
    pub fires_at_end: bool,
    pub round_added: u32,
    pub last_decremented_round: Option<u32>,
}

impl Condition {
    /// Whether this condition prompts for a save at the given boundary.
    pub fn fires_at(&self, boundary: TurnBoundary) -> bool {
        match boundary {
            TurnBoundary::Start => self.fires_at_start,
            TurnBoundary::End => self.fires_at_end,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.remaining_rounds.is_none()
    }

    /// Badge text, e.g. `Poisoned (2)` for a timed condition.
    pub fn badge(&self) -> String {
        match self.remaining_rounds {
            Some(rounds) => format!("{} ({rounds})", self.label),
            None => self.label.clone(),
        }
    }
}

// ============================================================================
// Combatants
// ============================================================================

/// Whether a combatant is a player character or a monster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatantKind {
    PlayerCharacter,
    Monster,
}

impl CombatantKind {
    pub fn name(&self) -> &'static str {
        match self {
            CombatantKind::PlayerCharacter => "PC",
            CombatantKind::Monster => "Monster",
        }
    }
}

impl fmt::Display for CombatantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Display-only stats. The tracker never interprets these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    pub hit_points: Option<String>,
    pub armor_class: Option<String>,
    pub speed: Option<String>,
}

impl CombatStats {
    pub fn is_empty(&self) -> bool {
        self.hit_points.is_none() && self.armor_class.is_none() && self.speed.is_none()
    }
}

/// One participant in combat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    /// Base name as entered, shared by every instance of a monster.
    pub name: String,
    /// Computed once on insertion and never renumbered.
    pub display_label: String,
    /// Monster instance number; always `None` for player characters.
    pub instance: Option<u32>,
    pub kind: CombatantKind,
    pub initiative: i32,
    pub stats: CombatStats,
    pub portrait_ref: Option<String>,
    /// Catalog entry to re-display the full stat block from.
    pub monster_ref_id: Option<String>,
    pub conditions: ConditionState,
}

impl Combatant {
    pub fn is_monster(&self) -> bool {
        self.kind == CombatantKind::Monster
    }

    pub fn is_player(&self) -> bool {
        self.kind == CombatantKind::PlayerCharacter
    }

    /// Card heading in the `(initiative) label` form.
    pub fn card_title(&self) -> String {
        format!("({}) {}", self.initiative, self.display_label)
    }
}

/// Format a display label from a base name and an optional instance number.
pub fn format_label(name: &str, instance: Option<u32>) -> String {
    match instance {
        Some(n) => format!("{name} #{n}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_parse() {
        assert_eq!("con".parse::<Ability>().unwrap(), Ability::Constitution);
        assert_eq!("Wisdom".parse::<Ability>().unwrap(), Ability::Wisdom);
        assert!("luck".parse::<Ability>().is_err());
    }

    #[test]
    fn test_save_field_none() {
        assert_eq!(Ability::parse_save_field("None").unwrap(), None);
        assert_eq!(
            Ability::parse_save_field("DEX").unwrap(),
            Some(Ability::Dexterity)
        );
        assert!(Ability::parse_save_field("???").is_err());
    }

    #[test]
    fn test_condition_kind_lookup() {
        assert_eq!(
            ConditionKind::from_name("poisoned"),
            Some(ConditionKind::Poisoned)
        );
        assert_eq!(ConditionKind::from_name("Other"), None);
        assert_eq!(ConditionKind::all().len(), 15);
    }

    #[test]
    fn test_preset_colors() {
        assert_eq!(ConditionKind::Poisoned.color(), "#006600");
        assert_eq!(ConditionKind::Poisoned.text_color(), "#FFFFFF");
        assert_eq!(ConditionKind::Exhaustion.text_color(), "#000000");
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label("Goblin", Some(2)), "Goblin #2");
        assert_eq!(format_label("Aria", None), "Aria");
    }
}

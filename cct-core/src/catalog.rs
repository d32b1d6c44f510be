//! Read-only monster stat block catalog.
//!
//! The catalog is an externally maintained JSON array of stat blocks. The
//! tracker only pulls HP, AC, Speed, portrait and canonical id from it when a
//! monster is added, and the full record again when someone asks to see the
//! stat block. A missing or unreadable catalog simply matches nothing.

use crate::world::CombatStats;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// Errors from loading a catalog file.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The six ability scores of a stat block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityBlock {
    #[serde(rename = "STR")]
    pub strength: i32,
    #[serde(rename = "DEX")]
    pub dexterity: i32,
    #[serde(rename = "CON")]
    pub constitution: i32,
    #[serde(rename = "INT")]
    pub intelligence: i32,
    #[serde(rename = "WIS")]
    pub wisdom: i32,
    #[serde(rename = "CHA")]
    pub charisma: i32,
}

/// Preformatted ability modifiers, e.g. `"+2"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierBlock {
    #[serde(rename = "STR")]
    pub strength: String,
    #[serde(rename = "DEX")]
    pub dexterity: String,
    #[serde(rename = "CON")]
    pub constitution: String,
    #[serde(rename = "INT")]
    pub intelligence: String,
    #[serde(rename = "WIS")]
    pub wisdom: String,
    #[serde(rename = "CHA")]
    pub charisma: String,
}

/// A named rules-text entry (trait, action, reaction, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlockEntry {
    pub name: String,
    pub description: String,
}

/// One monster stat block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "text_or_list")]
    pub size: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "text_or_list")]
    pub creature_type: Option<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    pub alignment: Option<String>,
    #[serde(default, rename = "AC")]
    pub armor_class: Option<String>,
    #[serde(default, rename = "HP")]
    pub hit_points: Option<String>,
    #[serde(default, rename = "Speed")]
    pub speed: Option<String>,
    #[serde(default)]
    pub abilities: Option<AbilityBlock>,
    #[serde(default)]
    pub ability_modifiers: Option<ModifierBlock>,
    #[serde(default)]
    pub saving_throws: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub skills: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "text_or_list")]
    pub resistances: Option<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    pub immunities: Option<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    pub vulnerabilities: Option<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    pub senses: Option<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    pub languages: Option<String>,
    #[serde(default, rename = "CR")]
    pub challenge_rating: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub traits: Vec<StatBlockEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actions: Vec<StatBlockEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bonus_actions: Vec<StatBlockEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub reactions: Vec<StatBlockEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub legendary_actions: Vec<StatBlockEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lair_actions: Vec<StatBlockEntry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub regional_effects: Vec<StatBlockEntry>,
    #[serde(default, deserialize_with = "text_or_list")]
    pub environment: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl MonsterRecord {
    /// The display stats copied onto a combatant at add time.
    pub fn combat_stats(&self) -> CombatStats {
        CombatStats {
            hit_points: non_blank(&self.hit_points),
            armor_class: non_blank(&self.armor_class),
            speed: non_blank(&self.speed),
        }
    }

    /// Rules-text sections in stat block order, skipping empty ones.
    pub fn sections(&self) -> Vec<(&'static str, &[StatBlockEntry])> {
        [
            ("Traits", self.traits.as_slice()),
            ("Actions", self.actions.as_slice()),
            ("Bonus Actions", self.bonus_actions.as_slice()),
            ("Reactions", self.reactions.as_slice()),
            ("Legendary Actions", self.legendary_actions.as_slice()),
            ("Lair Actions", self.lair_actions.as_slice()),
            ("Regional Effects", self.regional_effects.as_slice()),
        ]
        .into_iter()
        .filter(|(_, entries)| !entries.is_empty())
        .collect()
    }
}

/// Display text that some converters emit as a list (`"size": ["S"]`).
fn text_or_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| flatten_text(&v)))
}

fn flatten_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// An in-memory monster catalog.
#[derive(Debug, Clone, Default)]
pub struct MonsterCatalog {
    records: Vec<MonsterRecord>,
}

impl MonsterCatalog {
    pub fn new(records: Vec<MonsterRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a catalog from a JSON array of stat blocks.
    ///
    /// Records that do not fit the stat block shape are skipped with a
    /// warning; only a file that is not a JSON array is an error.
    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let raw: Vec<Value> = serde_json::from_str(content)?;
        let mut records = Vec::with_capacity(raw.len());

        for (index, value) in raw.into_iter().enumerate() {
            let id = value
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("<no id>")
                .to_string();
            match serde_json::from_value::<MonsterRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => warn!(index, id = %id, error = %e, "Skipping unreadable stat block"),
            }
        }
        Ok(Self::new(records))
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path.as_ref()).await?;
        let catalog = Self::from_json_str(&content)?;
        debug!(path = %path.as_ref().display(), records = catalog.len(), "Monster catalog loaded");
        Ok(catalog)
    }

    /// Load from a JSON file, falling back to an empty catalog on any error.
    pub async fn load_or_empty(path: impl AsRef<Path>) -> Self {
        match Self::load_json(path.as_ref()).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(
                    path = %path.as_ref().display(),
                    error = %e,
                    "Monster catalog unavailable, monsters must be entered by hand"
                );
                Self::empty()
            }
        }
    }

    /// Exact id match, else case-insensitive exact name match.
    pub fn find(&self, key: &str) -> Option<&MonsterRecord> {
        let key = key.trim();
        self.records
            .iter()
            .find(|m| m.id == key)
            .or_else(|| self.records.iter().find(|m| m.name.eq_ignore_ascii_case(key)))
    }

    /// Look up the record behind a combatant: its catalog id first, then its name.
    pub fn find_for(&self, monster_ref_id: Option<&str>, name: &str) -> Option<&MonsterRecord> {
        monster_ref_id
            .and_then(|id| self.records.iter().find(|m| m.id == id))
            .or_else(|| self.records.iter().find(|m| m.name == name))
    }

    /// Case-insensitive substring search over ids and names, in catalog order.
    pub fn search(&self, query: &str) -> Vec<&MonsterRecord> {
        let needle = query.trim().to_lowercase();
        self.records
            .iter()
            .filter(|m| {
                m.id.to_lowercase().contains(&needle) || m.name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonsterRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Headless tracker interface for programmatic use.
//!
//! This module wraps a [`CombatSession`] and a [`MonsterCatalog`] behind a
//! small facade meant for:
//! - Script-driven encounters
//! - Terminal front ends such as the `cct` binary
//! - Integration tests
//!
//! # Example
//!
//! ```ignore
//! use cct_core::headless::HeadlessTracker;
//! use cct_core::session::SessionConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SessionConfig::new("Goblin Ambush").with_catalog_path("monsters.json");
//!     let mut tracker = HeadlessTracker::new(config).await;
//!
//!     tracker.add_player("Aria", 18).unwrap();
//!     tracker.add_monster("Goblin", 12).unwrap();
//!     tracker.start().unwrap();
//!
//!     for line in tracker.status_lines() {
//!         println!("{line}");
//!     }
//! }
//! ```

use crate::catalog::{MonsterCatalog, MonsterRecord};
use crate::combatant::CombatantSubmission;
use crate::resolution::SavePrompt;
use crate::rules::{Intent, Outcome, Rejection};
use crate::session::{CombatPhase, CombatSession, SessionConfig, TurnPhase};
use crate::world::{Combatant, CombatantId};
use tracing::debug;

/// An entry in the tracker transcript.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    /// What was attempted.
    pub action: String,
    /// Narrative or rejection message.
    pub result: String,
    pub accepted: bool,
    pub step: usize,
}

/// A combat tracker that can be controlled programmatically.
pub struct HeadlessTracker {
    session: CombatSession,
    catalog: MonsterCatalog,
    transcript: Vec<TranscriptEntry>,
}

impl HeadlessTracker {
    /// Create a tracker, loading the configured monster catalog if any.
    ///
    /// A missing or malformed catalog leaves the tracker with an empty one.
    pub async fn new(config: SessionConfig) -> Self {
        let catalog = match &config.catalog_path {
            Some(path) => MonsterCatalog::load_or_empty(path).await,
            None => MonsterCatalog::empty(),
        };
        Self::with_catalog(config, catalog)
    }

    /// Create a tracker around an already loaded catalog.
    pub fn with_catalog(config: SessionConfig, catalog: MonsterCatalog) -> Self {
        Self {
            session: CombatSession::new(config),
            catalog,
            transcript: Vec::new(),
        }
    }

    /// Carry out an intent and record it in the transcript.
    pub fn apply(&mut self, intent: Intent) -> Result<Outcome, Rejection> {
        let action = intent.summary();
        let result = self.session.apply(intent);

        self.transcript.push(TranscriptEntry {
            action,
            result: match &result {
                Ok(outcome) => outcome.narrative.clone(),
                Err(rejection) => rejection.to_string(),
            },
            accepted: result.is_ok(),
            step: self.transcript.len() + 1,
        });

        result
    }

    // ========================================================================
    // Shortcuts
    // ========================================================================

    pub fn start(&mut self) -> Result<Outcome, Rejection> {
        self.apply(Intent::StartCombat)
    }

    pub fn end(&mut self) -> Result<Outcome, Rejection> {
        self.apply(Intent::EndCombat)
    }

    pub fn next_turn(&mut self) -> Result<Outcome, Rejection> {
        self.apply(Intent::NextTurn)
    }

    pub fn submit_save(&mut self, success: bool) -> Result<Outcome, Rejection> {
        self.apply(Intent::SubmitSave { success })
    }

    /// Add a player character with no stats.
    pub fn add_player(
        &mut self,
        name: impl Into<String>,
        initiative: impl ToString,
    ) -> Result<Outcome, Rejection> {
        self.apply(Intent::AddCombatant(CombatantSubmission::player(
            name, initiative,
        )))
    }

    /// Add a monster, filling its stats from the catalog when it has a match.
    pub fn add_monster(
        &mut self,
        name: impl Into<String>,
        initiative: impl ToString,
    ) -> Result<Outcome, Rejection> {
        let mut submission = CombatantSubmission::monster(name, initiative);
        if let Some(record) = self.catalog.find(&submission.name) {
            debug!(name = %submission.name, id = %record.id, "Monster found in catalog");
            submission = submission.with_catalog_record(record);
        }
        self.apply(Intent::AddCombatant(submission))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Resolve a combatant from a 1-based position or its display label.
    ///
    /// Labels match ignoring case and whitespace, so `goblin#2` finds
    /// `Goblin #2`.
    pub fn find_target(&self, query: &str) -> Option<CombatantId> {
        let combatants = self.session.combatants();
        if let Ok(position) = query.trim().parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|i| combatants.get(i))
                .map(|c| c.id);
        }

        let wanted = normalize(query);
        combatants
            .iter()
            .find(|c| normalize(&c.display_label) == wanted)
            .map(|c| c.id)
    }

    pub fn pending_prompt(&self) -> Option<SavePrompt> {
        self.session.pending_prompt()
    }

    /// The catalog entry behind a monster, if there is one.
    pub fn stat_block(&self, id: CombatantId) -> Option<&MonsterRecord> {
        let combatant = self.session.combatant(id)?;
        if !combatant.is_monster() {
            return None;
        }
        self.catalog
            .find_for(combatant.monster_ref_id.as_deref(), &combatant.name)
    }

    pub fn search_catalog(&self, query: &str) -> Vec<&MonsterRecord> {
        self.catalog.search(query)
    }

    /// The tracker state as printable lines.
    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("== {} ==", self.session.config().table_name)];

        lines.push(match self.session.phase() {
            CombatPhase::NotStarted => "Combat not started".to_string(),
            CombatPhase::InProgress(phase) => {
                format!("Round {} | {}", self.session.round(), phase_text(phase))
            }
        });

        let active = self.session.active().map(|c| c.id);
        for (i, combatant) in self.session.combatants().iter().enumerate() {
            let marker = if Some(combatant.id) == active { ">" } else { " " };
            lines.push(format!("{marker} {}. {}", i + 1, card_line(combatant)));
        }

        if let Some(prompt) = self.pending_prompt() {
            lines.push(format!("Pending: {}: {prompt}", prompt.combatant_label));
        }

        lines
    }

    pub fn session(&self) -> &CombatSession {
        &self.session
    }

    pub fn catalog(&self) -> &MonsterCatalog {
        &self.catalog
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }
}

fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn phase_text(phase: TurnPhase) -> &'static str {
    match phase {
        TurnPhase::Idle => "ready",
        TurnPhase::AwaitingEndResolution => "end-of-turn saves",
        TurnPhase::AwaitingStartResolution => "start-of-turn saves",
    }
}

/// One roster line: title, stats, then condition badges.
fn card_line(combatant: &Combatant) -> String {
    let mut line = combatant.card_title();

    let stats = &combatant.stats;
    if let Some(hp) = &stats.hit_points {
        line.push_str(&format!("  HP {hp}"));
    }
    if let Some(ac) = &stats.armor_class {
        line.push_str(&format!("  AC {ac}"));
    }
    if let Some(speed) = &stats.speed {
        line.push_str(&format!("  Speed {speed}"));
    }

    if !combatant.conditions.is_empty() {
        let badges: Vec<String> = combatant.conditions.iter().map(|c| c.badge()).collect();
        line.push_str(&format!("  [{}]", badges.join(", ")));
    }
    line
}

/// Render a stat block as printable lines.
pub fn stat_block_lines(record: &MonsterRecord) -> Vec<String> {
    let mut lines = vec![record.name.clone()];

    let kind: Vec<&str> = [record.size.as_deref(), record.creature_type.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    let mut header = kind.join(" ");
    if let Some(alignment) = &record.alignment {
        if !header.is_empty() {
            header.push_str(", ");
        }
        header.push_str(alignment);
    }
    if !header.is_empty() {
        lines.push(header);
    }

    let fields = [
        ("Armor Class", &record.armor_class),
        ("Hit Points", &record.hit_points),
        ("Speed", &record.speed),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            lines.push(format!("{name}: {value}"));
        }
    }

    if let Some(abilities) = &record.abilities {
        lines.push(format!(
            "STR {} DEX {} CON {} INT {} WIS {} CHA {}",
            abilities.strength,
            abilities.dexterity,
            abilities.constitution,
            abilities.intelligence,
            abilities.wisdom,
            abilities.charisma
        ));
    }

    let details = [
        ("Resistances", &record.resistances),
        ("Immunities", &record.immunities),
        ("Vulnerabilities", &record.vulnerabilities),
        ("Senses", &record.senses),
        ("Languages", &record.languages),
        ("Challenge", &record.challenge_rating),
    ];
    for (name, value) in details {
        if let Some(value) = value {
            lines.push(format!("{name}: {value}"));
        }
    }

    for (title, entries) in record.sections() {
        lines.push(format!("-- {title} --"));
        for entry in entries {
            lines.push(format!("{}. {}", entry.name, entry.description));
        }
    }

    lines
}

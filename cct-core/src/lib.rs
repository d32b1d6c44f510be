//! Tabletop RPG combat tracker engine.
//!
//! This crate provides:
//! - Initiative ordering with mid-combat insertion and a turn cursor
//! - Timed conditions with start/end-of-turn saving-throw prompts
//! - Intent/Effect pipeline so every change is observable
//! - A read-only monster stat block catalog
//!
//! # Quick Start
//!
//! ```ignore
//! use cct_core::{CombatSession, CombatantSubmission, ConditionSpec, ConditionKind, SessionConfig};
//!
//! let mut session = CombatSession::new(SessionConfig::new("Goblin Ambush"));
//! session.add_combatant(CombatantSubmission::player("Aria", 18))?;
//! session.add_combatant(CombatantSubmission::monster("Goblin", 12))?;
//! session.start_combat()?;
//!
//! let aria = session.active().unwrap().id;
//! session.apply_condition(aria, ConditionSpec::preset(ConditionKind::Poisoned).at_turn_end())?;
//!
//! // Asks for Aria's save before handing the turn on.
//! let outcome = session.request_next_turn()?;
//! println!("{}", outcome.narrative);
//! session.submit_save(false)?;
//! ```

pub mod catalog;
pub mod combatant;
pub mod conditions;
pub mod headless;
pub mod resolution;
pub mod rules;
pub mod session;
pub mod testing;
pub mod turn_order;
pub mod world;

// Primary public API
pub use catalog::{CatalogError, MonsterCatalog, MonsterRecord};
pub use combatant::{CombatantSubmission, SubmissionError};
pub use conditions::{ConditionSpec, ConditionState, TurnBoundary};
pub use headless::HeadlessTracker;
pub use resolution::{ConditionResolutionQueue, SavePrompt};
pub use rules::{Effect, Intent, Outcome, Rejection, RemovalReason};
pub use session::{CombatPhase, CombatSession, SessionConfig, TurnPhase};
pub use testing::TestHarness;
pub use turn_order::TurnOrder;
pub use world::{Ability, Combatant, CombatantId, CombatantKind, Condition, ConditionId, ConditionKind};

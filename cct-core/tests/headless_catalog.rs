//! Headless tracker driven with a monster catalog loaded from disk.

use cct_core::headless::stat_block_lines;
use cct_core::{HeadlessTracker, MonsterCatalog, SessionConfig};
use std::io::Write;
use tempfile::NamedTempFile;

const CATALOG: &str = r#"[
    {
        "id": "Goblin",
        "name": "Goblin",
        "source": "MM",
        "page": 166,
        "size": "Small",
        "type": "humanoid (goblinoid)",
        "alignment": "neutral evil",
        "AC": "15 (leather armor, shield)",
        "HP": "7 (2d6)",
        "Speed": "30 ft.",
        "abilities": {"STR": 8, "DEX": 14, "CON": 10, "INT": 10, "WIS": 8, "CHA": 8},
        "abilityModifiers": {"STR": "-1", "DEX": "+2", "CON": "+0", "INT": "+0", "WIS": "-1", "CHA": "-1"},
        "skills": {"Stealth": "+6"},
        "senses": "darkvision 60 ft., passive Perception 9",
        "languages": "Common, Goblin",
        "CR": "1/4",
        "traits": [{"name": "Nimble Escape", "description": "The goblin can take the Disengage or Hide action as a bonus action."}],
        "actions": [{"name": "Scimitar", "description": "Melee Weapon Attack: +4 to hit, reach 5 ft."}],
        "avatarUrl": "img/goblin.png"
    },
    {
        "id": "Goblin Boss",
        "name": "Goblin Boss",
        "AC": "17",
        "HP": "21 (6d6)"
    }
]"#;

fn catalog_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_load_json_from_disk() {
    let file = catalog_file(CATALOG);
    let catalog = MonsterCatalog::load_json(file.path()).await.unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.search("goblin").len(), 2);
    assert_eq!(catalog.search("boss").len(), 1);
}

#[tokio::test]
async fn test_malformed_catalog_degrades_to_manual_entry() {
    let file = catalog_file("not json at all");
    assert!(MonsterCatalog::load_json(file.path()).await.is_err());

    let config = SessionConfig::new("Broken").with_catalog_path(file.path());
    let mut tracker = HeadlessTracker::new(config).await;
    assert!(tracker.catalog().is_empty());

    tracker.add_monster("Goblin", 12).unwrap();
    let goblin = &tracker.session().combatants()[0];
    assert_eq!(goblin.display_label, "Goblin #1");
    assert!(goblin.stats.is_empty());
}

#[tokio::test]
async fn test_monsters_enriched_from_catalog() {
    let file = catalog_file(CATALOG);
    let config = SessionConfig::new("Cave").with_catalog_path(file.path());
    let mut tracker = HeadlessTracker::new(config).await;

    tracker.add_player("Aria", 18).unwrap();
    tracker.add_monster("Goblin", 12).unwrap();
    tracker.add_monster("goblin boss", 14).unwrap();
    tracker.start().unwrap();

    let labels: Vec<_> = tracker
        .session()
        .combatants()
        .iter()
        .map(|c| c.display_label.as_str())
        .collect();
    assert_eq!(labels, vec!["Aria", "Goblin Boss #1", "Goblin #1"]);

    let goblin = tracker.find_target("goblin #1").unwrap();
    let record = tracker.stat_block(goblin).unwrap();
    assert_eq!(record.page, Some(166));

    let combatant = tracker.session().combatant(goblin).unwrap();
    assert_eq!(combatant.stats.hit_points.as_deref(), Some("7 (2d6)"));
    assert_eq!(combatant.portrait_ref.as_deref(), Some("img/goblin.png"));

    let lines = stat_block_lines(record);
    assert!(lines.iter().any(|l| l == "Challenge: 1/4"));
    assert!(lines.iter().any(|l| l.starts_with("Nimble Escape.")));

    let aria = tracker.find_target("1").unwrap();
    assert!(tracker.stat_block(aria).is_none());
}

#[tokio::test]
async fn test_unreadable_record_keeps_the_rest_of_the_catalog() {
    let file = catalog_file(
        r#"[
            {"id": "Goblin", "name": "Goblin", "size": ["S"], "AC": "15", "HP": "7 (2d6)", "traits": null},
            {"id": "Mimic", "name": "Mimic", "AC": {"ac": 12}}
        ]"#,
    );
    let config = SessionConfig::new("Converted").with_catalog_path(file.path());
    let mut tracker = HeadlessTracker::new(config).await;
    assert_eq!(tracker.catalog().len(), 1);

    tracker.add_monster("Goblin", 12).unwrap();
    let goblin = &tracker.session().combatants()[0];
    assert_eq!(goblin.stats.armor_class.as_deref(), Some("15"));
}

//! Headless mode for the combat tracker.
//!
//! This module provides a simple line-oriented protocol over stdin/stdout,
//! suitable for scripting and for AI agents running an encounter:
//! - Each line is one command; a leading `#` is optional
//! - Narrative output is printed as plain lines
//! - Protocol lines are tagged `[SAVE]`, `[STATUS]`, `[ERROR]`, ...

use cct_core::headless::{stat_block_lines, HeadlessTracker};
use cct_core::world::UnknownAbility;
use cct_core::{Ability, ConditionKind, ConditionSpec, Intent, Outcome, Rejection, SessionConfig};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    End,
    Next,
    Save(bool),
    AddPlayer { initiative: String, name: String },
    AddMonster { initiative: String, name: String },
    Remove(String),
    Condition { target: String, spec: ConditionSpec },
    Uncondition { target: String, label: String },
    Info(String),
    Stat(String),
    Search(String),
    Status,
    Help,
    Quit,
}

/// Why an input line could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}. Type #help for help.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown condition option: {0}")]
    BadOption(String),

    #[error("Not a number: {0}")]
    NotANumber(String),

    #[error(transparent)]
    Ability(#[from] UnknownAbility),
}

const COND_USAGE: &str =
    "#cond <target> <condition name> [save=ABIL:DC] [rounds=N] [start] [end] [color=#hex]";

/// Parse one line of input.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let line = line.strip_prefix('#').unwrap_or(line).trim_start();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "end" => Command::End,
        "next" | "n" => Command::Next,
        "pass" => Command::Save(true),
        "fail" => Command::Save(false),
        "pc" => {
            let (initiative, name) = split_initiative(rest, "#pc <initiative> <name>")?;
            Command::AddPlayer { initiative, name }
        }
        "monster" => {
            let (initiative, name) = split_initiative(rest, "#monster <initiative> <name>")?;
            Command::AddMonster { initiative, name }
        }
        "remove" | "rm" => Command::Remove(required(rest, "#remove <target>")?),
        "cond" => parse_condition(rest)?,
        "uncond" => {
            let (target, label) = rest
                .split_once(char::is_whitespace)
                .ok_or(CommandError::Usage("#uncond <target> <label>"))?;
            Command::Uncondition {
                target: target.to_string(),
                label: condition_label(label),
            }
        }
        "info" => Command::Info(required(rest, "#info <condition>")?),
        "stat" => Command::Stat(required(rest, "#stat <target>")?),
        "search" => Command::Search(rest.to_string()),
        "status" => Command::Status,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn required(rest: &str, usage: &'static str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(rest.to_string())
    }
}

/// Initiative stays text; the tracker validates it.
fn split_initiative(rest: &str, usage: &'static str) -> Result<(String, String), CommandError> {
    let (initiative, name) = rest
        .split_once(char::is_whitespace)
        .ok_or(CommandError::Usage(usage))?;
    Ok((initiative.to_string(), name.trim().to_string()))
}

/// Standard conditions are stored under their canonical spelling.
fn condition_label(name: &str) -> String {
    match ConditionKind::from_name(name) {
        Some(kind) => kind.name().to_string(),
        None => name.trim().to_string(),
    }
}

fn is_condition_option(token: &str) -> bool {
    token.contains('=') || token.eq_ignore_ascii_case("start") || token.eq_ignore_ascii_case("end")
}

fn parse_condition(rest: &str) -> Result<Command, CommandError> {
    let mut tokens = rest.split_whitespace().peekable();
    let target = tokens.next().ok_or(CommandError::Usage(COND_USAGE))?;

    // The name runs up to the first option, so "Hold Person" stays whole.
    let mut words = Vec::new();
    while let Some(word) = tokens.next_if(|t| !is_condition_option(t)) {
        words.push(word);
    }
    if words.is_empty() {
        return Err(CommandError::Usage(COND_USAGE));
    }
    let mut spec = ConditionSpec::named(&words.join(" "));

    for option in tokens {
        match option.split_once('=') {
            None if option.eq_ignore_ascii_case("start") => spec = spec.at_turn_start(),
            None if option.eq_ignore_ascii_case("end") => spec = spec.at_turn_end(),
            Some(("save", value)) => {
                let (ability, dc) = match value.split_once(':') {
                    Some((ability, dc)) => (ability, Some(parse_number::<i32>(dc)?)),
                    None => (value, None),
                };
                spec.save_ability = Ability::parse_save_field(ability)?;
                spec.save_dc = dc;
            }
            Some(("rounds", value)) => spec = spec.with_duration(parse_number(value)?),
            Some(("color", value)) => spec = spec.with_color(value),
            _ => return Err(CommandError::BadOption(option.to_string())),
        }
    }

    Ok(Command::Condition {
        target: target.to_string(),
        spec,
    })
}

fn parse_number<T: std::str::FromStr>(value: &str) -> Result<T, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::NotANumber(value.to_string()))
}

/// Run the tracker in headless mode.
pub async fn run_headless(config: SessionConfig) -> io::Result<()> {
    let mut tracker = HeadlessTracker::new(config).await;

    println!("=== Combat Tracker: {} ===", tracker.session().config().table_name);
    if !tracker.catalog().is_empty() {
        println!("Monster catalog: {} entries", tracker.catalog().len());
    }
    println!("Type #help for commands.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Quit) => {
                println!("Goodbye!");
                break;
            }
            Ok(command) => execute(&mut tracker, command),
            Err(e) => println!("[ERROR] {e}"),
        }
        stdout.flush().ok();
    }

    Ok(())
}

fn execute(tracker: &mut HeadlessTracker, command: Command) {
    match command {
        Command::Start => run(tracker, Intent::StartCombat),
        Command::End => run(tracker, Intent::EndCombat),
        Command::Next => run(tracker, Intent::NextTurn),
        Command::Save(success) => run(tracker, Intent::SubmitSave { success }),
        Command::AddPlayer { initiative, name } => {
            let result = tracker.add_player(name, initiative);
            report(tracker, result);
        }
        Command::AddMonster { initiative, name } => {
            let result = tracker.add_monster(name, initiative);
            report(tracker, result);
        }
        Command::Remove(target) => {
            if let Some(id) = target_or_error(tracker, &target) {
                run(tracker, Intent::RemoveCombatant { id });
            }
        }
        Command::Condition { target, spec } => {
            if let Some(target) = target_or_error(tracker, &target) {
                run(tracker, Intent::ApplyCondition { target, spec });
            }
        }
        Command::Uncondition { target, label } => {
            if let Some(target) = target_or_error(tracker, &target) {
                run(tracker, Intent::RemoveConditionsByLabel { target, label });
            }
        }
        Command::Info(name) => match ConditionKind::from_name(&name) {
            Some(kind) => println!("[INFO] {}: {}", kind.name(), kind.rules_text()),
            None => println!("[ERROR] {name} is not a standard condition"),
        },
        Command::Stat(target) => {
            let Some(id) = target_or_error(tracker, &target) else {
                return;
            };
            match tracker.stat_block(id) {
                Some(record) => {
                    println!("[STAT]");
                    for line in stat_block_lines(record) {
                        println!("  {line}");
                    }
                }
                None => println!("[ERROR] No stat block for {target}"),
            }
        }
        Command::Search(text) => {
            let matches = tracker.search_catalog(&text);
            println!("[CATALOG] {} match(es)", matches.len());
            for record in matches {
                println!("  {} ({})", record.name, record.id);
            }
        }
        Command::Status => {
            println!("[STATUS]");
            for line in tracker.status_lines() {
                println!("  {line}");
            }
        }
        Command::Help => print_commands(),
        Command::Quit => {}
    }
}

fn run(tracker: &mut HeadlessTracker, intent: Intent) {
    let result = tracker.apply(intent);
    report(tracker, result);
}

fn report(tracker: &HeadlessTracker, result: Result<Outcome, Rejection>) {
    match result {
        Ok(outcome) => {
            for line in outcome.narrative.lines() {
                println!("{line}");
            }
            if tracker.pending_prompt().is_some() {
                println!("[SAVE] Answer with #pass or #fail");
            }
        }
        Err(rejection) => println!("[ERROR] {rejection}"),
    }
}

fn target_or_error(tracker: &HeadlessTracker, query: &str) -> Option<cct_core::CombatantId> {
    let found = tracker.find_target(query);
    if found.is_none() {
        println!("[ERROR] No combatant matches {query:?}");
    }
    found
}

pub fn print_commands() {
    println!("[HELP]");
    println!("  #pc <init> <name>        - Add a player character");
    println!("  #monster <init> <name>   - Add a monster (stats from the catalog)");
    println!("  #remove <target>         - Remove a combatant");
    println!("  #start / #end            - Start or end combat");
    println!("  #next                    - End the current turn");
    println!("  #pass / #fail            - Answer the pending saving throw");
    println!("  {COND_USAGE}");
    println!("  #uncond <target> <label> - Remove every condition with that label");
    println!("  #info <condition>        - Rules text of a standard condition");
    println!("  #stat <target>           - Show a monster's stat block");
    println!("  #search <text>           - Search the monster catalog");
    println!("  #status                  - Show the initiative order");
    println!("  #quit                    - Exit");
    println!("  Targets are a position (1, 2, ...) or a label without spaces (goblin#2).");
}

/// Build the session configuration from environment and command line.
///
/// `CCT_CATALOG` and `CCT_RETAIN_ROSTER` seed the defaults; arguments
/// override them.
pub fn parse_config_from_args(args: &[String]) -> SessionConfig {
    let mut config = SessionConfig::default();
    if let Ok(path) = std::env::var("CCT_CATALOG") {
        if !path.trim().is_empty() {
            config = config.with_catalog_path(path);
        }
    }
    if let Ok(value) = std::env::var("CCT_RETAIN_ROSTER") {
        config = config.with_retain_roster_on_end(parse_flag(&value));
    }
    apply_args(config, args)
}

fn apply_args(mut config: SessionConfig, args: &[String]) -> SessionConfig {
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" => {
                if let Some(path) = args.get(i + 1) {
                    config = config.with_catalog_path(path);
                    i += 1;
                }
            }
            "--table" => {
                if let Some(name) = args.get(i + 1) {
                    config.table_name = name.clone();
                    i += 1;
                }
            }
            "--retain-roster" => config = config.with_retain_roster_on_end(true),
            _ => {}
        }
        i += 1;
    }
    config
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("#start").unwrap(), Command::Start);
        assert_eq!(parse_command("next").unwrap(), Command::Next);
        assert_eq!(parse_command("  #PASS ").unwrap(), Command::Save(true));
        assert_eq!(parse_command("fail").unwrap(), Command::Save(false));
        assert_eq!(parse_command("#quit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_add_commands() {
        assert_eq!(
            parse_command("#monster 12 Goblin Boss").unwrap(),
            Command::AddMonster {
                initiative: "12".to_string(),
                name: "Goblin Boss".to_string()
            }
        );
        assert_eq!(
            parse_command("#pc 18   Aria").unwrap(),
            Command::AddPlayer {
                initiative: "18".to_string(),
                name: "Aria".to_string()
            }
        );
        assert!(matches!(parse_command("#pc 18"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_parse_condition_options() {
        let command =
            parse_command("#cond goblin#1 poisoned save=CON:13 rounds=3 end color=#00FF00")
                .unwrap();
        let Command::Condition { target, spec } = command else {
            panic!("expected a condition command");
        };
        assert_eq!(target, "goblin#1");
        assert_eq!(spec.label, "Poisoned");
        assert_eq!(spec.save_ability, Some(Ability::Constitution));
        assert_eq!(spec.save_dc, Some(13));
        assert_eq!(spec.duration_rounds, Some(3));
        assert!(spec.fires_at_end);
        assert!(!spec.fires_at_start);
        assert_eq!(spec.color, "#00FF00");
    }

    #[test]
    fn test_parse_condition_save_none() {
        let Command::Condition { spec, .. } = parse_command("cond 1 Hexed save=None start").unwrap()
        else {
            panic!("expected a condition command");
        };
        assert_eq!(spec.label, "Hexed");
        assert_eq!(spec.save_ability, None);
        assert!(spec.fires_at_start);
    }

    #[test]
    fn test_parse_condition_errors() {
        assert!(matches!(
            parse_command("#cond 1"),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!(
            parse_command("#cond 1 Prone rounds=many"),
            Err(CommandError::NotANumber(_))
        ));
        assert!(matches!(
            parse_command("#cond 1 Prone save=LUCK:10"),
            Err(CommandError::Ability(_))
        ));
        assert!(matches!(
            parse_command("#cond 1 Prone sideways"),
            Err(CommandError::BadOption(_))
        ));
    }

    #[test]
    fn test_parse_condition_multi_word_name() {
        let Command::Condition { target, spec } =
            parse_command("#cond 2 Hold Person save=WIS:14 end").unwrap()
        else {
            panic!("expected a condition command");
        };
        assert_eq!(target, "2");
        assert_eq!(spec.label, "Hold Person");
        assert_eq!(spec.save_ability, Some(Ability::Wisdom));
        assert!(spec.fires_at_end);

        assert!(matches!(
            parse_command("#cond 2 rounds=3"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn test_uncond_label_matches_cond_spelling() {
        let Command::Condition { spec, .. } = parse_command("#cond 1 poisoned").unwrap() else {
            panic!("expected a condition command");
        };
        assert_eq!(
            parse_command("#uncond 1 poisoned").unwrap(),
            Command::Uncondition {
                target: "1".to_string(),
                label: spec.label,
            }
        );
        assert_eq!(
            parse_command("#uncond 1 Hold Person").unwrap(),
            Command::Uncondition {
                target: "1".to_string(),
                label: "Hold Person".to_string(),
            }
        );
    }

    #[test]
    fn test_uncond_removes_lowercase_standard_condition() {
        let mut tracker = HeadlessTracker::with_catalog(
            SessionConfig::default(),
            cct_core::MonsterCatalog::empty(),
        );
        tracker.add_player("Aria", 18).unwrap();
        execute(&mut tracker, parse_command("#cond 1 poisoned").unwrap());
        execute(&mut tracker, parse_command("#uncond 1 poisoned").unwrap());

        let aria = &tracker.session().combatants()[0];
        assert!(aria.conditions.is_empty());
        assert!(tracker.transcript().iter().all(|entry| entry.accepted));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_command("#dance").unwrap_err(),
            CommandError::Unknown("dance".to_string())
        );
    }

    #[test]
    fn test_apply_args() {
        let args: Vec<String> = ["cct", "--table", "Crypt", "--catalog", "m.json", "--retain-roster"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let config = apply_args(SessionConfig::default(), &args);
        assert_eq!(config.table_name, "Crypt");
        assert_eq!(config.catalog_path, Some(PathBuf::from("m.json")));
        assert!(config.retain_roster_on_end);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("no"));
        assert!(!parse_flag(""));
    }
}

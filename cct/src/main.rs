//! Terminal combat tracker.
//!
//! Reads one command per line from stdin and prints the encounter as it
//! unfolds. Logs go to stderr so stdout stays a clean protocol channel:
//!
//! ```bash
//! RUST_LOG=cct_core=debug cargo run -p cct -- --catalog monsters.json --table "Goblin Ambush"
//! ```

mod headless;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = headless::parse_config_from_args(&args);
    tracing::debug!(?config, "Starting tracker");

    headless::run_headless(config).await?;
    Ok(())
}

fn print_help() {
    println!("cct - initiative and condition tracker for tabletop combat");
    println!();
    println!("USAGE:");
    println!("  cct [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help          Show this help message");
    println!("  --catalog <PATH>    Monster catalog JSON file (env: CCT_CATALOG)");
    println!("  --table <NAME>      Name shown in the status header");
    println!("  --retain-roster     Keep combatants when combat ends (env: CCT_RETAIN_ROSTER)");
    println!();
    headless::print_commands();
    println!();
    println!("EXAMPLES:");
    println!("  cct --catalog monsters.json");
    println!("  printf '#pc 18 Aria\\n#monster 12 Goblin\\n#start\\n#status\\n' | cct");
}

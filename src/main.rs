mod allocate;
mod catalog;
mod config;
mod display;
mod error;
mod preferences;
mod store;
mod web;
mod week;

use std::path::Path;

use chrono::NaiveDate;

use allocate::{run_allocation, Scope};
use catalog::load_rooms;
use config::{load_config, AllocatorConfig};
use display::{print_run_report, render_week_grid, write_grid_to_file};
use preferences::{load_oasis_preferences, load_team_preferences};
use store::MemoryStore;
use week::Week;

const ROOMS_FILE: &str = "rooms.json";
const CONFIG_FILE: &str = "allocator.json";
const TEAM_CSV: &str = "data/team_preferences.csv";
const OASIS_CSV: &str = "data/oasis_preferences.csv";

const USAGE: &str =
    "usage: weekly-room-allocator <YYYY-MM-DD Monday> [project|oasis|both] [seed] | web [port]";

/// Loads any previously submitted preferences from the CSV files.
fn load_store() -> Result<MemoryStore, Box<dyn std::error::Error>> {
    let mut store = MemoryStore::new();
    if Path::new(TEAM_CSV).exists() {
        let (prefs, skipped) = load_team_preferences(TEAM_CSV)?;
        for reason in &skipped {
            tracing::warn!("skipped team preference: {}", reason);
        }
        tracing::info!("loaded {} team preference(s)", prefs.len());
        store.load_team_preferences(prefs);
    }
    if Path::new(OASIS_CSV).exists() {
        let (prefs, skipped) = load_oasis_preferences(OASIS_CSV)?;
        for reason in &skipped {
            tracing::warn!("skipped oasis preference: {}", reason);
        }
        tracing::info!("loaded {} oasis preference(s)", prefs.len());
        store.load_oasis_preferences(prefs);
    }
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let config = if Path::new(CONFIG_FILE).exists() {
        load_config(CONFIG_FILE)?
    } else {
        AllocatorConfig::default()
    };
    let catalog = load_rooms(ROOMS_FILE, &config.pool_name)?;

    // Check if we should run in web mode
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "web" {
        let port = args
            .get(2)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let password = std::env::var("ADMIN_PASSWORD")
            .unwrap_or_else(|_| "admin123".to_string()); // Default password, change this!

        let store = load_store()?;
        println!("Starting web server on port {}...", port);
        println!("Access the API at http://localhost:{}", port);

        web::start_server(
            port,
            password,
            catalog,
            config,
            store,
            TEAM_CSV.into(),
            OASIS_CSV.into(),
        )
        .await?;
        return Ok(());
    }

    // CLI mode: one allocation run for an explicit week anchor
    let anchor_arg = args.get(1).ok_or(USAGE)?;
    let week_anchor = NaiveDate::parse_from_str(anchor_arg, "%Y-%m-%d")
        .map_err(|e| format!("bad week anchor {:?}: {} ({})", anchor_arg, e, USAGE))?;
    let scope = match args.get(2) {
        Some(raw) => raw.parse::<Scope>()?,
        None => Scope::Both,
    };
    let seed: u64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(rand::random);

    let mut store = load_store()?;
    let report = run_allocation(&mut store, &catalog, &config, week_anchor, scope, seed)?;
    print_run_report(&report);

    let week = Week::from_anchor(week_anchor)?;
    let week_assignments = store.assignments_on(&week.dates());
    println!("\n{}", render_week_grid(&catalog, &week_assignments, &week));

    write_grid_to_file(&catalog, &week_assignments, &week, "week_grid.txt")?;
    println!("Grid saved to week_grid.txt");

    Ok(())
}

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use census_query::{AppConfig, CensusStore, Query, QueryEngine};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

const USAGE: &str = "\
Usage: census-query [--data <csv>] <command>

Commands:
  entities                                        list entities
  municipalities <entity>                         list municipalities of an entity
  entity <entity>                                 total population of an entity
  municipality <entity> <municipality> <min> <max>
                                                  synthetic age table
  chart <entity>                                  bar chart data
  ui                                              interactive browser (default)";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut config = AppConfig::from_env()?;

    if let Some(pos) = args.iter().position(|a| a == "--data") {
        let path = args
            .get(pos + 1)
            .cloned()
            .with_context(|| format!("--data needs a path\n\n{}", USAGE))?;
        config.data_path = PathBuf::from(path);
        args.drain(pos..=pos + 1);
    }

    if matches!(args.first().map(String::as_str), Some("-h" | "--help" | "help")) {
        println!("{}", USAGE);
        return Ok(());
    }

    let store = CensusStore::load(&config.data_path)
        .with_context(|| format!("Failed to load census dataset {:?}", config.data_path))?;
    let engine = QueryEngine::with_max_age_span(Arc::new(store), config.max_age_span);

    let rest: Vec<&str> = args.iter().map(String::as_str).collect();
    match rest.as_slice() {
        [] | ["ui"] => run_ui_mode(engine),
        ["entities"] => print_json(&engine.entities()),
        ["municipalities", entity] => print_json(&engine.municipalities(entity)),
        ["entity", entity] => {
            let response = engine.execute(&Query::Entity {
                entity: entity.to_string(),
            })?;
            print_json(&response)
        }
        ["municipality", entity, municipality, min, max] => {
            let age_min: i32 = min.parse().with_context(|| format!("invalid age {:?}", min))?;
            let age_max: i32 = max.parse().with_context(|| format!("invalid age {:?}", max))?;
            let response = engine.execute(&Query::Municipality {
                entity: entity.to_string(),
                municipality: municipality.to_string(),
                age_min,
                age_max,
            })?;
            print_json(&response)
        }
        ["chart", entity] => match engine.chart(entity) {
            Some(chart) => print_json(&chart),
            None => bail!("entity {:?} not found", entity),
        },
        _ => bail!("unrecognised command\n\n{}", USAGE),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(engine: QueryEngine) -> Result<()> {
    let info = engine.store().info();
    println!("📊 Loaded {} records ({} entities)", info.record_count, info.entity_count);
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(engine);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_engine: QueryEngine) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use one of the JSON commands (census-query --help)");
    std::process::exit(1);
}

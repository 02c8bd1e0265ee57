//! Dungeon balance simulator CLI.
//!
//! Runs batches of expeditions through the tick engine and prints a report.
//!
//! Usage:
//!   cargo run --bin simulate -- [OPTIONS]
//!
//! Examples:
//!   cargo run --bin simulate                          # 100 one-hour runs in Goblin Warren
//!   cargo run --bin simulate -- -d ember_forge --veteran
//!   cargo run --bin simulate -- --seed 42 --json      # Reproducible, JSON saved to disk

use delve::simulator::{run_simulation, SimConfig};
use delve::DungeonRegistry;
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let config = parse_args(&args);

    let registry = match DungeonRegistry::builtin() {
        Ok(registry) => registry,
        Err(err) => {
            eprintln!("Invalid dungeon content: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let Some(definition) = registry.dungeon(&config.dungeon_id) else {
        eprintln!("Unknown dungeon: {}", config.dungeon_id);
        eprintln!("Known dungeons:");
        for def in registry.dungeons() {
            eprintln!(
                "  {:<16} tier {}  power {:>3}  {}",
                def.id, def.tier, def.recommended_power, def.name
            );
        }
        return ExitCode::FAILURE;
    };

    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║              DELVE DUNGEON SIMULATOR                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Configuration:");
    println!(
        "  Dungeon:        {} (tier {}, {} floors, recommended power {})",
        definition.name, definition.tier, definition.floor_count, definition.recommended_power
    );
    println!("  Expeditions:    {}", config.num_runs);
    println!("  Duration:       {} min", config.duration_ms / 60_000);
    println!("  Tick:           {} ms", config.tick_ms);
    println!(
        "  Heroes:         level {}, attributes {}, armor {}",
        config.hero_level, config.hero_attribute, config.hero_armor
    );
    println!("  Food / Potions: {} / {}", config.food, config.potions);
    println!("  Auto-restart:   {}", config.auto_restart);
    if let Some(seed) = config.seed {
        println!("  Seed:           {}", seed);
    }
    println!();
    println!("Running simulation...");
    println!();

    let report = run_simulation(&config, &registry);

    println!("{}", report.to_text());

    if args.iter().any(|a| a == "--json") {
        let json = report.to_json();
        let filename = format!(
            "sim_report_{}.json",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        );
        if let Err(err) = std::fs::write(&filename, json) {
            eprintln!("Failed to write JSON report: {}", err);
            return ExitCode::FAILURE;
        }
        println!("JSON report saved to: {}", filename);
    }
    ExitCode::SUCCESS
}

fn parse_args(args: &[String]) -> SimConfig {
    let mut config = SimConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--dungeon" => {
                if i + 1 < args.len() {
                    config.dungeon_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "-n" | "--runs" => {
                if i + 1 < args.len() {
                    config.num_runs = args[i + 1].parse().unwrap_or(100);
                    i += 1;
                }
            }
            "-s" | "--seed" => {
                if i + 1 < args.len() {
                    config.seed = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "-m" | "--minutes" => {
                if i + 1 < args.len() {
                    if let Ok(minutes) = args[i + 1].parse::<i64>() {
                        config.duration_ms = minutes * 60_000;
                    }
                    i += 1;
                }
            }
            "--tick" => {
                if i + 1 < args.len() {
                    config.tick_ms = args[i + 1].parse().unwrap_or(1_000);
                    i += 1;
                }
            }
            "--level" => {
                if i + 1 < args.len() {
                    config.hero_level = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "--attributes" => {
                if i + 1 < args.len() {
                    config.hero_attribute = args[i + 1].parse().unwrap_or(5);
                    i += 1;
                }
            }
            "--armor" => {
                if i + 1 < args.len() {
                    config.hero_armor = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--food" => {
                if i + 1 < args.len() {
                    config.food = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--potions" => {
                if i + 1 < args.len() {
                    config.potions = args[i + 1].parse().unwrap_or(10);
                    i += 1;
                }
            }
            "--no-restart" => {
                config.auto_restart = false;
            }
            "--no-consumables" => {
                config.auto_consumables = false;
            }
            "--single" => {
                config = SimConfig::single_clear(&config.dungeon_id);
            }
            "--idle" => {
                config = SimConfig::idle_session(&config.dungeon_id, 12);
            }
            "--veteran" => {
                config = SimConfig::veteran(&config.dungeon_id);
            }
            "-v" | "--verbose" => {
                config.verbosity = 2;
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

fn print_help() {
    println!("Delve Dungeon Simulator");
    println!();
    println!("USAGE:");
    println!("    cargo run --bin simulate -- [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -d, --dungeon <ID>     Dungeon to run (default: goblin_warren)");
    println!("    -n, --runs <N>         Number of expeditions (default: 100)");
    println!("    -s, --seed <S>         Seed for reproducible run ids");
    println!("    -m, --minutes <M>      Simulated minutes per expedition (default: 60)");
    println!("        --tick <MS>        Tick size handed to the engine (default: 1000)");
    println!("        --level <L>        Combat level of every hero (default: 1)");
    println!("        --attributes <A>   Every base attribute of every hero (default: 5)");
    println!("        --armor <A>        Armor of every hero (default: 0)");
    println!("        --food <F>         Starting food (default: 200)");
    println!("        --potions <P>      Starting stock of each potion (default: 10)");
    println!("        --no-restart       Do not auto-restart after a victory");
    println!("        --no-consumables   Do not drink potions");
    println!("        --single           Preset: one clear attempt, restarts off");
    println!("        --idle             Preset: 12 hour idle session in 1 min ticks");
    println!("        --veteran          Preset: high level, well geared heroes");
    println!("    -v, --verbose          Print every expedition");
    println!("        --json             Save the report as JSON");
    println!("    -h, --help             Show this help");
    println!();
    println!("Presets replace earlier options; put -d before them.");
}

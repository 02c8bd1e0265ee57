//! Headless dungeon balance simulator.
//!
//! Runs batches of expeditions through the real tick engine to measure:
//! - Clears per hour for a dungeon and party strength
//! - Food and potion consumption
//! - Wipe and out-of-food rates
//! - Loot and combat XP yields
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin simulate -- --dungeon goblin_warren --runs 100
//! ```

mod config;
mod report;
mod runner;

pub use config::SimConfig;
pub use report::{ExpeditionStats, SimReport};
pub use runner::{run_simulation, sample_roster};

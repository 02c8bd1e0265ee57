//! Core game state, balance math and the tick drivers.

pub mod clock;
pub mod combat_math;
pub mod constants;
pub mod game_state;
pub mod offline;
pub mod progression;
pub mod rng;
pub mod tick;

pub use game_state::GameState;
pub use offline::{catch_up_to_now, process_offline_catch_up, OfflineReport};
pub use tick::{game_tick, game_tick_with_delta, TickResult};

//! Hero roster: attributes, equipment and combat skills.

pub mod attributes;
pub mod player;

pub use attributes::*;
pub use player::*;

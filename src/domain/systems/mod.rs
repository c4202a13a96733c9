pub mod physics;

pub use physics::{ArenaConfig, CircleArena, radius_for};

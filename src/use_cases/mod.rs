// Use cases layer: the coordination workflows each participant runs.

pub mod authority;
pub mod drop;
pub mod engine;
pub mod failover;
pub mod match_end;
pub mod turn;
pub mod writer;

pub use authority::SimulationAuthority;
pub use drop::DropTracker;
pub use engine::{Engine, participant_task};
pub use match_end::MatchEndMonitor;
pub use turn::{TurnController, TurnTick};
pub use writer::SessionWriter;

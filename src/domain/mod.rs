// Domain layer: the shared session document, derived events and core rules.

pub mod errors;
pub mod events;
pub mod ports;
pub mod session;
pub mod systems;
pub mod tuning;

pub use errors::{EngineError, StoreError};
pub use events::DerivedEvent;
pub use session::{
    DropRequest, ParticipantEntry, ParticipantId, ParticipantUpdate, PendingSpawn, ProjectileEntry,
    ProjectileId, RequestId, SessionDoc, SessionPatch, SessionStatus, Vec2,
};
pub use tuning::Tuning;

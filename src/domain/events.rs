// Semantic events derived from snapshot diffs. The store never delivers
// these directly; the bridge reconstructs them on every push.

use super::session::{DropRequest, ParticipantId};

#[derive(Clone, Debug, PartialEq)]
pub enum DerivedEvent {
    SessionCreated,
    MatchStarted,
    MatchEnded {
        final_score: u64,
    },
    TurnChanged {
        participant_id: ParticipantId,
        size: u8,
        x: f32,
    },
    ParticipantJoined {
        participant_id: ParticipantId,
    },
    ParticipantLeft {
        participant_id: ParticipantId,
    },
    ScoreChanged {
        participant_id: ParticipantId,
        score: u64,
    },
    DropRequested(DropRequest),
}

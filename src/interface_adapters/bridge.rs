// Event derivation bridge: turns full-snapshot pushes into a de-duplicated
// semantic event stream.
//
// The store may push the same logical state several times (retries,
// reconnects), so turn-start and drop-request emissions are guarded by
// last-EMITTED markers rather than plain changed-since-last-push diffing.
// Naive diffing would re-fire turn handlers and double-start timers.

use crate::domain::events::DerivedEvent;
use crate::domain::session::{RequestId, SessionDoc, SessionStatus};

#[derive(Default)]
pub struct EventBridge {
    previous: Option<SessionDoc>,
    // turnStartedAt value this bridge last emitted a turn_changed for.
    last_turn_emitted: Option<u64>,
    // Drop request id this bridge last surfaced.
    last_request_surfaced: Option<RequestId>,
}

impl EventBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs the snapshot against the last one seen and returns the derived
    /// events. Redundant re-pushes of the same logical state return nothing.
    pub fn ingest(&mut self, doc: &SessionDoc) -> Vec<DerivedEvent> {
        let mut events = Vec::new();

        match &self.previous {
            None => events.push(DerivedEvent::SessionCreated),
            Some(prev) => {
                if prev.status == SessionStatus::Waiting && doc.status == SessionStatus::Active {
                    events.push(DerivedEvent::MatchStarted);
                }
                if prev.status != SessionStatus::Ended && doc.status == SessionStatus::Ended {
                    events.push(DerivedEvent::MatchEnded {
                        final_score: doc.session_score,
                    });
                }

                for id in doc.participants.keys() {
                    if !prev.participants.contains_key(id) {
                        events.push(DerivedEvent::ParticipantJoined {
                            participant_id: id.clone(),
                        });
                    }
                }
                for id in prev.participants.keys() {
                    if !doc.participants.contains_key(id) {
                        events.push(DerivedEvent::ParticipantLeft {
                            participant_id: id.clone(),
                        });
                    }
                }

                for (id, entry) in &doc.participants {
                    if let Some(previous_entry) = prev.participants.get(id)
                        && previous_entry.score != entry.score
                    {
                        events.push(DerivedEvent::ScoreChanged {
                            participant_id: id.clone(),
                            score: entry.score,
                        });
                    }
                }
            }
        }

        // Turn starts compare against what this bridge emitted, not what it
        // last received.
        if doc.turn_started_at != 0
            && self.last_turn_emitted != Some(doc.turn_started_at)
            && let Some(participant_id) = doc.entitled()
        {
            let (size, x) = doc
                .pending_spawn
                .map(|spawn| (spawn.size, spawn.x))
                .unwrap_or((1, 0.0));
            events.push(DerivedEvent::TurnChanged {
                participant_id: participant_id.clone(),
                size,
                x,
            });
            self.last_turn_emitted = Some(doc.turn_started_at);
        }

        if let Some(request) = &doc.drop_request
            && self.last_request_surfaced.as_ref() != Some(&request.id)
        {
            events.push(DerivedEvent::DropRequested(request.clone()));
            self.last_request_surfaced = Some(request.id.clone());
        }

        self.previous = Some(doc.clone());
        events
    }

    /// Last snapshot this bridge has seen, if any.
    pub fn latest(&self) -> Option<&SessionDoc> {
        self.previous.as_ref()
    }
}

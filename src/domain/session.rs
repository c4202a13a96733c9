// Session document shared through the replicated store, plus the partial
// merge patch that writers use. Field names serialize in camelCase to match
// the external document schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type ParticipantId = String;
pub type ProjectileId = String;
pub type RequestId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Active,
    Ended,
}

/// Per-participant entry in the session roster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEntry {
    pub name: String,
    pub score: u64,
    pub ready: bool,
    pub is_authority: bool,
}

impl ParticipantEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: 0,
            ready: false,
            is_authority: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    pub fn add(self, other: Vec2) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

/// Replicated projectile state. Positions are the authority's rounded
/// broadcast values, not live simulation coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileEntry {
    pub x: f32,
    pub y: f32,
    pub size: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Vec2>,
    pub dropped: bool,
}

/// A non-authoritative participant asking the authority to launch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropRequest {
    pub id: RequestId,
    pub requester_id: ParticipantId,
    pub x: f32,
    pub size: u8,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub timestamp: u64,
}

/// Size and x position the next entitled participant will launch with.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSpawn {
    pub size: u8,
    pub x: f32,
}

/// Full session document as pushed to every subscriber on any change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDoc {
    pub session_id: String,
    pub status: SessionStatus,
    pub participants: BTreeMap<ParticipantId, ParticipantEntry>,
    pub turn_order: Vec<ParticipantId>,
    pub turn_index: usize,
    pub turn_started_at: u64,
    pub session_score: u64,
    pub max_size_seen: u8,
    pub projectiles: BTreeMap<ProjectileId, ProjectileEntry>,
    pub pending_spawn: Option<PendingSpawn>,
    pub drop_request: Option<DropRequest>,
    pub created_at: u64,
}

impl SessionDoc {
    pub fn new(session_id: impl Into<String>, created_at: u64) -> Self {
        Self {
            session_id: session_id.into(),
            status: SessionStatus::Waiting,
            participants: BTreeMap::new(),
            turn_order: Vec::new(),
            turn_index: 0,
            turn_started_at: 0,
            session_score: 0,
            max_size_seen: 1,
            projectiles: BTreeMap::new(),
            pending_spawn: None,
            drop_request: None,
            created_at,
        }
    }

    /// The participant whose turn it currently is.
    pub fn entitled(&self) -> Option<&ParticipantId> {
        self.turn_order.get(self.turn_index)
    }

    pub fn is_authority(&self, participant_id: &str) -> bool {
        self.participants
            .get(participant_id)
            .is_some_and(|p| p.is_authority)
    }

    pub fn has_authority(&self) -> bool {
        self.participants.values().any(|p| p.is_authority)
    }

    /// Earliest turn-order entry that is still present in the roster. This is
    /// the participant that should claim authority when the flag is absent.
    pub fn earliest_surviving(&self) -> Option<&ParticipantId> {
        self.turn_order
            .iter()
            .find(|id| self.participants.contains_key(*id))
    }
}

/// Field-level update for an existing roster entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantUpdate {
    pub score: Option<u64>,
    pub ready: Option<bool>,
    pub is_authority: Option<bool>,
}

/// Partial-field write against a session document.
///
/// Unset fields are left untouched, so two concurrent merges on disjoint
/// fields are both preserved; concurrent merges on the same field race
/// last-write-wins. Nullable document fields use a double `Option`:
/// `Some(None)` clears, `None` leaves alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub turn_index: Option<usize>,
    pub turn_started_at: Option<u64>,
    pub session_score: Option<u64>,
    pub max_size_seen: Option<u8>,
    pub pending_spawn: Option<Option<PendingSpawn>>,
    pub drop_request: Option<Option<DropRequest>>,
    pub upsert_projectiles: BTreeMap<ProjectileId, ProjectileEntry>,
    pub remove_projectiles: Vec<ProjectileId>,
    pub upsert_participants: BTreeMap<ParticipantId, ParticipantEntry>,
    pub update_participants: BTreeMap<ParticipantId, ParticipantUpdate>,
    pub remove_participants: Vec<ParticipantId>,
}

impl SessionPatch {
    pub fn is_empty(&self) -> bool {
        *self == SessionPatch::default()
    }

    /// Applies the patch in place, maintaining the roster invariants:
    /// `turn_order` only contains present participants and `turn_index`
    /// stays a valid index after removals.
    pub fn apply(&self, doc: &mut SessionDoc) {
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(turn_index) = self.turn_index {
            doc.turn_index = turn_index;
        }
        if let Some(turn_started_at) = self.turn_started_at {
            doc.turn_started_at = turn_started_at;
        }
        if let Some(session_score) = self.session_score {
            doc.session_score = session_score;
        }
        if let Some(max_size_seen) = self.max_size_seen {
            doc.max_size_seen = max_size_seen;
        }
        if let Some(pending_spawn) = self.pending_spawn {
            doc.pending_spawn = pending_spawn;
        }
        if let Some(drop_request) = &self.drop_request {
            doc.drop_request = drop_request.clone();
        }

        for (id, entry) in &self.upsert_projectiles {
            doc.projectiles.insert(id.clone(), entry.clone());
        }
        for id in &self.remove_projectiles {
            doc.projectiles.remove(id);
        }

        for (id, entry) in &self.upsert_participants {
            doc.participants.insert(id.clone(), entry.clone());
            if !doc.turn_order.contains(id) {
                doc.turn_order.push(id.clone());
            }
        }
        for (id, update) in &self.update_participants {
            if let Some(entry) = doc.participants.get_mut(id) {
                if let Some(score) = update.score {
                    entry.score = score;
                }
                if let Some(ready) = update.ready {
                    entry.ready = ready;
                }
                if let Some(is_authority) = update.is_authority {
                    entry.is_authority = is_authority;
                }
            }
        }
        for id in &self.remove_participants {
            doc.participants.remove(id);
            doc.turn_order.retain(|entry| entry != id);
        }
        if doc.turn_order.is_empty() {
            doc.turn_index = 0;
        } else if doc.turn_index >= doc.turn_order.len() {
            doc.turn_index %= doc.turn_order.len();
        }
    }
}

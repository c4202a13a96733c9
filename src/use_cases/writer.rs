// Collaborator-facing write operations against the shared session document.
//
// Apart from the session setup calls, every operation is fire-and-forget: the
// merge runs in a background task and its outcome is observed later as an
// incoming snapshot, never as a callback. A failed write is logged and left
// for the next local action to correct.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::domain::errors::{EngineError, StoreError};
use crate::domain::ports::{Clock, SessionStore};
use crate::domain::session::{
    DropRequest, ParticipantEntry, ParticipantId, ParticipantUpdate, PendingSpawn,
    ProjectileEntry, ProjectileId, SessionDoc, SessionPatch, SessionStatus, Vec2,
};

#[derive(Clone)]
pub struct SessionWriter {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    session_id: String,
    self_id: ParticipantId,
}

impl SessionWriter {
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        session_id: impl Into<String>,
        self_id: impl Into<ParticipantId>,
    ) -> Self {
        Self {
            store,
            clock,
            session_id: session_id.into(),
            self_id: self_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    fn spawn_merge(&self, patch: SessionPatch) {
        let store = self.store.clone();
        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            if let Err(error) = store.merge(&session_id, patch).await {
                warn!(session_id, ?error, "session merge failed");
            }
        });
    }

    /// Creates the session document with this participant as first roster
    /// entry and authority, and registers its disconnect cleanup hook.
    pub async fn create_session(&self, name: &str) -> Result<SessionDoc, StoreError> {
        let mut doc = SessionDoc::new(self.session_id.clone(), self.clock.now_millis());
        let mut entry = ParticipantEntry::new(name);
        entry.is_authority = true;
        doc.participants.insert(self.self_id.clone(), entry);
        doc.turn_order.push(self.self_id.clone());
        self.store.create(doc.clone()).await?;
        self.store
            .register_disconnect_cleanup(&self.session_id, &self.self_id)
            .await?;
        Ok(doc)
    }

    /// Joins the roster. Awaited (not fire-and-forget) so the caller learns
    /// about a full session before subscribing.
    pub async fn join(&self, name: &str) -> Result<(), EngineError> {
        let patch = SessionPatch {
            upsert_participants: BTreeMap::from([(
                self.self_id.clone(),
                ParticipantEntry::new(name),
            )]),
            ..Default::default()
        };
        self.store.merge(&self.session_id, patch).await?;
        self.store
            .register_disconnect_cleanup(&self.session_id, &self.self_id)
            .await?;
        Ok(())
    }

    pub fn mark_ready(&self, ready: bool) {
        let patch = SessionPatch {
            update_participants: BTreeMap::from([(
                self.self_id.clone(),
                ParticipantUpdate {
                    ready: Some(ready),
                    ..Default::default()
                },
            )]),
            ..Default::default()
        };
        self.spawn_merge(patch);
    }

    pub fn leave(&self) {
        let patch = SessionPatch {
            remove_participants: vec![self.self_id.clone()],
            ..Default::default()
        };
        self.spawn_merge(patch);
    }

    /// Flips the session to active and seeds the first turn.
    pub async fn start_match(&self, spawn: PendingSpawn) -> Result<(), StoreError> {
        let patch = SessionPatch {
            status: Some(SessionStatus::Active),
            turn_index: Some(0),
            turn_started_at: Some(self.clock.now_millis()),
            pending_spawn: Some(Some(spawn)),
            ..Default::default()
        };
        self.store.merge(&self.session_id, patch).await
    }

    /// Writes a drop request and clears the pending spawn descriptor in one
    /// merge. Returns the request so the caller can speculate locally.
    pub fn request_launch(&self, x: f32, size: u8, velocity: Vec2) -> DropRequest {
        let request = DropRequest {
            id: Uuid::new_v4().to_string(),
            requester_id: self.self_id.clone(),
            x,
            size,
            velocity_x: velocity.x,
            velocity_y: velocity.y,
            timestamp: self.clock.now_millis(),
        };
        let patch = SessionPatch {
            drop_request: Some(Some(request.clone())),
            pending_spawn: Some(None),
            ..Default::default()
        };
        self.spawn_merge(patch);
        request
    }

    /// Authority-side: writes the projectile produced for a drop request and
    /// deletes the request in the same merge.
    pub fn materialize_drop(&self, projectile_id: ProjectileId, entry: ProjectileEntry) {
        let patch = SessionPatch {
            upsert_projectiles: BTreeMap::from([(projectile_id, entry)]),
            drop_request: Some(None),
            ..Default::default()
        };
        self.spawn_merge(patch);
    }

    /// Authority-side: writes a locally launched projectile and consumes the
    /// pending spawn descriptor.
    pub fn launch_own(&self, projectile_id: ProjectileId, entry: ProjectileEntry) {
        let patch = SessionPatch {
            upsert_projectiles: BTreeMap::from([(projectile_id, entry)]),
            pending_spawn: Some(None),
            ..Default::default()
        };
        self.spawn_merge(patch);
    }

    /// Writes a merge outcome: sources removed, replacement (if any) added,
    /// plus the new session score and largest size seen.
    pub fn report_merge(
        &self,
        removed: Vec<ProjectileId>,
        spawned: Option<(ProjectileId, ProjectileEntry)>,
        session_score: u64,
        max_size_seen: u8,
    ) {
        let patch = SessionPatch {
            session_score: Some(session_score),
            max_size_seen: Some(max_size_seen),
            upsert_projectiles: spawned.into_iter().collect(),
            remove_projectiles: removed,
            ..Default::default()
        };
        self.spawn_merge(patch);
    }

    pub fn report_score(&self, participant_id: &str, score: u64) {
        let patch = SessionPatch {
            update_participants: BTreeMap::from([(
                participant_id.to_string(),
                ParticipantUpdate {
                    score: Some(score),
                    ..Default::default()
                },
            )]),
            ..Default::default()
        };
        self.spawn_merge(patch);
    }

    /// Single merge advancing the turn: next index, fresh turn start, fresh
    /// pending spawn. Only the entitled participant issues this.
    pub fn advance_turn(&self, current: &SessionDoc, spawn: PendingSpawn) {
        if current.turn_order.is_empty() {
            return;
        }
        let next_index = (current.turn_index + 1) % current.turn_order.len();
        let patch = SessionPatch {
            turn_index: Some(next_index),
            turn_started_at: Some(self.clock.now_millis()),
            pending_spawn: Some(Some(spawn)),
            ..Default::default()
        };
        self.spawn_merge(patch);
    }

    pub fn report_match_end(&self) {
        let patch = SessionPatch {
            status: Some(SessionStatus::Ended),
            ..Default::default()
        };
        self.spawn_merge(patch);
    }

    pub fn claim_authority(&self) {
        let patch = SessionPatch {
            update_participants: BTreeMap::from([(
                self.self_id.clone(),
                ParticipantUpdate {
                    is_authority: Some(true),
                    ..Default::default()
                },
            )]),
            ..Default::default()
        };
        self.spawn_merge(patch);
    }

    /// Authority-side periodic broadcast: a partial merge that only touches
    /// projectile entries (and score fields when provided), so concurrent
    /// writes to other fields are never clobbered.
    pub fn push_projectiles(
        &self,
        upserts: BTreeMap<ProjectileId, ProjectileEntry>,
        session_score: Option<u64>,
        max_size_seen: Option<u8>,
    ) {
        let patch = SessionPatch {
            session_score,
            max_size_seen,
            upsert_projectiles: upserts,
            ..Default::default()
        };
        self.spawn_merge(patch);
    }
}

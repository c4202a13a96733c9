// In-memory implementation of the `SessionStore` port.
//
// Mirrors the contract of the external replicated document store: partial
// field merges, full-snapshot pushes to every subscriber on any change, and
// disconnect cleanup hooks. Tests additionally use `repush` to simulate the
// duplicate pushes a real store produces on retries and reconnects.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tracing::info;

use crate::domain::errors::StoreError;
use crate::domain::ports::SessionStore;
use crate::domain::session::{SessionDoc, SessionPatch};

struct SessionSlot {
    doc: SessionDoc,
    snapshot_tx: broadcast::Sender<SessionDoc>,
    // Participants to drop from the roster when their connection is lost.
    cleanup_on_disconnect: HashSet<String>,
}

impl SessionSlot {
    fn push_snapshot(&self) {
        // No subscribers is fine; the next subscriber gets the next push.
        let _ = self.snapshot_tx.send(self.doc.clone());
    }
}

pub struct MemoryStore {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    snapshot_capacity: usize,
    participant_cap: usize,
}

impl MemoryStore {
    pub fn new(snapshot_capacity: usize, participant_cap: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            snapshot_capacity,
            participant_cap,
        }
    }

    /// Re-sends the current snapshot unchanged, as a real store does on
    /// reconnects and retried pushes.
    pub async fn repush(&self, session_id: &str) -> Result<(), StoreError> {
        let sessions = self.sessions.read().await;
        let slot = sessions.get(session_id).ok_or(StoreError::SessionNotFound)?;
        slot.push_snapshot();
        Ok(())
    }

    /// Simulates an abrupt network loss for one participant: runs the
    /// registered cleanup hook and pushes the healed snapshot.
    pub async fn disconnect(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions
            .get_mut(session_id)
            .ok_or(StoreError::SessionNotFound)?;
        if !slot.cleanup_on_disconnect.remove(participant_id) {
            return Ok(());
        }
        let patch = SessionPatch {
            remove_participants: vec![participant_id.to_string()],
            ..Default::default()
        };
        patch.apply(&mut slot.doc);
        info!(session_id, participant_id, "disconnect cleanup applied");
        slot.push_snapshot();
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, doc: SessionDoc) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&doc.session_id) {
            return Err(StoreError::SessionAlreadyExists);
        }
        let (snapshot_tx, _) = broadcast::channel(self.snapshot_capacity);
        let slot = SessionSlot {
            doc: doc.clone(),
            snapshot_tx,
            cleanup_on_disconnect: HashSet::new(),
        };
        slot.push_snapshot();
        sessions.insert(doc.session_id.clone(), slot);
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionDoc>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).map(|slot| slot.doc.clone()))
    }

    async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<broadcast::Receiver<SessionDoc>, StoreError> {
        let sessions = self.sessions.read().await;
        let slot = sessions.get(session_id).ok_or(StoreError::SessionNotFound)?;
        Ok(slot.snapshot_tx.subscribe())
    }

    async fn merge(&self, session_id: &str, patch: SessionPatch) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions
            .get_mut(session_id)
            .ok_or(StoreError::SessionNotFound)?;

        let joining = patch
            .upsert_participants
            .keys()
            .filter(|id| !slot.doc.participants.contains_key(*id))
            .count();
        if slot.doc.participants.len() + joining > self.participant_cap {
            return Err(StoreError::SessionFull);
        }

        patch.apply(&mut slot.doc);
        slot.push_snapshot();
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(session_id)
            .map(|_| ())
            .ok_or(StoreError::SessionNotFound)
    }

    async fn register_disconnect_cleanup(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions
            .get_mut(session_id)
            .ok_or(StoreError::SessionNotFound)?;
        slot.cleanup_on_disconnect.insert(participant_id.to_string());
        Ok(())
    }
}

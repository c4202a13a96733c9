#![allow(dead_code)]
// Shared in-process fixtures for the integration tests: one memory store and
// writers wired the way collaborator processes wire them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use merge_arena::domain::ports::{Clock, SessionStore};
use merge_arena::domain::session::{PendingSpawn, SessionDoc};
use merge_arena::domain::systems::{ArenaConfig, CircleArena};
use merge_arena::interface_adapters::MemoryStore;
use merge_arena::use_cases::SessionWriter;
use merge_arena::use_cases::engine::WorldFactory;

pub const SESSION_ID: &str = "match-1";

/// Strictly increasing millisecond clock, shared across writers so
/// consecutive turn starts never carry the same timestamp.
pub struct StepClock(AtomicU64);

impl Clock for StepClock {
    fn now_millis(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

pub fn clock() -> Arc<StepClock> {
    Arc::new(StepClock(AtomicU64::new(1_700_000_000_000)))
}

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(64, 10))
}

pub fn writer(store: &Arc<MemoryStore>, clock: &Arc<StepClock>, self_id: &str) -> SessionWriter {
    SessionWriter::new(
        store.clone() as Arc<dyn SessionStore>,
        clock.clone(),
        SESSION_ID,
        self_id,
    )
}

pub fn world_factory() -> WorldFactory {
    Box::new(|| Box::new(CircleArena::new(ArenaConfig::default())))
}

/// Creates the session with `ids[0]` as host and authority, joins the rest,
/// marks everyone ready and starts the match with a size-1 spawn.
pub async fn start_match(
    store: &Arc<MemoryStore>,
    clock: &Arc<StepClock>,
    ids: &[&str],
) -> Vec<SessionWriter> {
    let writers: Vec<SessionWriter> = ids.iter().map(|id| writer(store, clock, id)).collect();
    writers[0]
        .create_session(ids[0])
        .await
        .expect("create session");
    for (writer, id) in writers.iter().zip(ids).skip(1) {
        writer.join(id).await.expect("join");
    }
    for writer in &writers {
        writer.mark_ready(true);
    }
    drain_writes().await;
    writers[0]
        .start_match(PendingSpawn { size: 1, x: 0.0 })
        .await
        .expect("start match");
    writers
}

pub async fn doc(store: &Arc<MemoryStore>) -> SessionDoc {
    store
        .get(SESSION_ID)
        .await
        .expect("get")
        .expect("session should exist")
}

/// Lets fire-and-forget merge tasks run to completion.
pub async fn drain_writes() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

// Per-participant engine: wires the bridge, turn controller, drop protocol,
// failover check and (when this process is elected) the simulation
// authority. One engine runs per participant process, single-threaded,
// driven by the display refresh loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, broadcast};
use tracing::{info, warn};

use crate::domain::errors::EngineError;
use crate::domain::events::DerivedEvent;
use crate::domain::ports::ArenaPhysics;
use crate::domain::session::{PendingSpawn, SessionDoc, SessionStatus, Vec2};
use crate::domain::tuning::Tuning;
use crate::interface_adapters::bridge::EventBridge;
use crate::use_cases::authority::SimulationAuthority;
use crate::use_cases::drop::DropTracker;
use crate::use_cases::failover;
use crate::use_cases::match_end::MatchEndMonitor;
use crate::use_cases::turn::{TurnController, TurnTick};
use crate::use_cases::writer::SessionWriter;

pub type WorldFactory = Box<dyn Fn() -> Box<dyn ArenaPhysics> + Send + Sync>;

pub struct Engine {
    tuning: Tuning,
    writer: SessionWriter,
    bridge: EventBridge,
    turn: TurnController,
    drops: DropTracker,
    authority: Option<SimulationAuthority>,
    monitor: MatchEndMonitor,
    world_factory: WorldFactory,
    latest: Option<SessionDoc>,
    previous: Option<SessionDoc>,
    snapshot_seq: u64,
    ended: bool,
    // Launch as soon as input is enabled instead of waiting for the forced
    // drop; used by the demo driver.
    auto_launch: bool,
}

impl Engine {
    pub fn new(
        tuning: Tuning,
        writer: SessionWriter,
        world_factory: WorldFactory,
        seed: u64,
        auto_launch: bool,
    ) -> Self {
        let turn = TurnController::new(tuning, writer.self_id(), seed);
        Self {
            tuning,
            writer,
            bridge: EventBridge::new(),
            turn,
            drops: DropTracker::new(&tuning),
            authority: None,
            monitor: MatchEndMonitor::new(tuning),
            world_factory,
            latest: None,
            previous: None,
            snapshot_seq: 0,
            ended: false,
            auto_launch,
        }
    }

    pub fn self_id(&self) -> &str {
        self.writer.self_id()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_authority(&self) -> bool {
        self.authority.is_some()
    }

    pub fn authority(&self) -> Option<&SimulationAuthority> {
        self.authority.as_ref()
    }

    pub fn latest(&self) -> Option<&SessionDoc> {
        self.latest.as_ref()
    }

    pub fn may_launch(&self) -> bool {
        self.turn.may_launch()
    }

    /// Ingests one snapshot push and returns the derived events, for render
    /// and UI collaborators to react to.
    pub fn handle_snapshot(&mut self, doc: SessionDoc) -> Vec<DerivedEvent> {
        self.snapshot_seq += 1;
        let events = self.bridge.ingest(&doc);
        for event in &events {
            match event {
                DerivedEvent::TurnChanged { participant_id, .. } => {
                    self.turn.on_turn_changed(participant_id);
                }
                DerivedEvent::MatchEnded { final_score } => {
                    info!(final_score, "match ended");
                    self.ended = true;
                }
                _ => {}
            }
        }

        // Authority absence is detected on every snapshot and self-healed by
        // the deterministic claim; never surfaced as an error.
        if failover::should_claim(&doc, self.writer.self_id()) {
            info!(participant_id = %self.writer.self_id(), "claiming authority");
            self.writer.claim_authority();
        }

        let am_authority = doc.is_authority(self.writer.self_id());
        if am_authority && self.authority.is_none() && doc.status != SessionStatus::Ended {
            self.authority = Some(SimulationAuthority::from_snapshot(
                self.tuning,
                (self.world_factory)(),
                &doc,
            ));
        } else if !am_authority && self.authority.is_some() {
            self.authority = None;
        }
        if let Some(authority) = self.authority.as_mut()
            && authority.ingest_snapshot(&doc, &self.writer)
        {
            self.monitor.note_launch();
        }

        self.drops.reconcile(&doc, self.snapshot_seq);

        self.previous = std::mem::replace(&mut self.latest, Some(doc));
        events
    }

    /// One frame of protocol bookkeeping plus, on the authority, one
    /// simulation step.
    pub fn tick(&mut self, dt: f32) {
        if self.ended {
            return;
        }

        let moving = self.arena_moving();
        match self.turn.tick(moving) {
            TurnTick::ForceLaunch => self.launch_default(),
            TurnTick::Advance => self.advance_turn(),
            TurnTick::Idle => {}
        }

        if self.auto_launch && self.turn.may_launch() {
            self.launch_default();
        }

        if let Some(authority) = self.authority.as_mut() {
            authority.step(dt, &self.writer);
            let over_line = authority.any_over_line();
            if self.monitor.tick(over_line) {
                info!("dwell threshold reached, ending match");
                self.writer.report_match_end();
            }
        }
    }

    /// Collaborator-facing launch for aimed input from the entitled
    /// participant.
    pub fn request_launch(&mut self, x: f32, size: u8, velocity: Vec2) -> Result<(), EngineError> {
        let Some(doc) = &self.latest else {
            return Err(EngineError::NoSnapshotYet);
        };
        if doc.entitled().map(String::as_str) != Some(self.writer.self_id()) {
            return Err(EngineError::NotEntitled);
        }
        if !self.turn.may_launch() {
            return Err(EngineError::NotEntitled);
        }
        self.launch(x, size, velocity);
        Ok(())
    }

    /// Speculative local projectile, if one is outstanding, for optimistic
    /// rendering.
    pub fn speculative(&self) -> Option<&crate::use_cases::drop::SpeculativeProjectile> {
        self.drops.speculative()
    }

    fn launch_default(&mut self) {
        let spawn = self
            .latest
            .as_ref()
            .and_then(|doc| doc.pending_spawn)
            .unwrap_or(PendingSpawn { size: 1, x: 0.0 });
        let velocity = Vec2::new(0.0, -self.tuning.default_launch_speed);
        self.launch(spawn.x, spawn.size, velocity);
    }

    fn launch(&mut self, x: f32, size: u8, velocity: Vec2) {
        if let Some(authority) = self.authority.as_mut() {
            authority.launch(x, size, velocity, &self.writer);
            self.monitor.note_launch();
        } else {
            let request = self.writer.request_launch(x, size, velocity);
            self.drops
                .speculate(&request, self.tuning.spawn_y, self.snapshot_seq);
        }
        self.turn.note_launched();
    }

    fn advance_turn(&mut self) {
        let Some(doc) = self.latest.clone() else {
            return;
        };
        // Only the entitled participant issues the advance-turn write.
        if doc.entitled().map(String::as_str) != Some(self.writer.self_id()) {
            return;
        }
        let spawn = self.turn.next_spawn(doc.max_size_seen);
        self.writer.advance_turn(&doc, spawn);
    }

    // Motion signal for the settle counter. The authority reads its world;
    // everyone else diffs replicated positions across the last two
    // snapshots. An outstanding speculative projectile counts as motion: the
    // authoritative object has not shown up yet.
    fn arena_moving(&self) -> bool {
        if let Some(authority) = &self.authority {
            return authority.any_motion();
        }
        if self.drops.speculative().is_some() {
            return true;
        }
        let (Some(latest), Some(previous)) = (&self.latest, &self.previous) else {
            return false;
        };
        if latest.projectiles.len() != previous.projectiles.len() {
            return true;
        }
        latest.projectiles.iter().any(|(id, entry)| {
            previous.projectiles.get(id).is_none_or(|old| {
                (entry.x - old.x).abs() > self.tuning.settle_position_eps
                    || (entry.y - old.y).abs() > self.tuning.settle_position_eps
            })
        })
    }
}

/// Async participant loop: drains snapshot pushes, then runs one frame, at
/// the configured tick rate, until shutdown or match end.
pub async fn participant_task(
    mut engine: Engine,
    mut snapshots: broadcast::Receiver<SessionDoc>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) -> Engine {
    let dt = tick_interval.as_secs_f32();
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {
                loop {
                    match snapshots.try_recv() {
                        Ok(doc) => {
                            engine.handle_snapshot(doc);
                        }
                        Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                            warn!(skipped, participant_id = %engine.self_id(), "snapshot receiver lagged");
                        }
                        Err(_) => break,
                    }
                }
                engine.tick(dt);
                if engine.is_ended() {
                    break;
                }
            }
        }
    }

    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{Clock, SessionStore};
    use crate::domain::session::{ParticipantEntry, SessionPatch};
    use crate::domain::systems::{ArenaConfig, CircleArena};
    use crate::interface_adapters::store::MemoryStore;
    use std::collections::BTreeMap;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_millis(&self) -> u64 {
            1_700_000_000_000
        }
    }

    fn factory() -> WorldFactory {
        Box::new(|| Box::new(CircleArena::new(ArenaConfig::default())))
    }

    fn engine_for(store: &Arc<MemoryStore>, self_id: &str) -> Engine {
        let writer = SessionWriter::new(
            store.clone() as Arc<dyn SessionStore>,
            Arc::new(FixedClock),
            "s1",
            self_id,
        );
        Engine::new(Tuning::default(), writer, factory(), 11, false)
    }

    fn active_doc(ids: &[&str]) -> SessionDoc {
        let mut doc = SessionDoc::new("s1", 0);
        for id in ids {
            let patch = SessionPatch {
                upsert_participants: BTreeMap::from([(id.to_string(), ParticipantEntry::new(*id))]),
                ..Default::default()
            };
            patch.apply(&mut doc);
        }
        doc.status = SessionStatus::Active;
        doc.turn_started_at = 1_000;
        doc
    }

    #[tokio::test]
    async fn when_not_entitled_then_request_launch_is_rejected() {
        let store = Arc::new(MemoryStore::new(16, 10));
        store.create(active_doc(&["a", "b"])).await.expect("create");
        let mut engine = engine_for(&store, "b");

        engine.handle_snapshot(active_doc(&["a", "b"]));
        let result = engine.request_launch(0.0, 1, Vec2::new(0.0, -300.0));

        assert!(matches!(result, Err(EngineError::NotEntitled)));
    }

    #[tokio::test]
    async fn when_no_snapshot_arrived_then_request_launch_is_rejected() {
        let store = Arc::new(MemoryStore::new(16, 10));
        let mut engine = engine_for(&store, "a");

        let result = engine.request_launch(0.0, 1, Vec2::new(0.0, -300.0));

        assert!(matches!(result, Err(EngineError::NoSnapshotYet)));
    }

    #[tokio::test]
    async fn when_the_snapshot_marks_me_authority_then_a_world_is_built() {
        let store = Arc::new(MemoryStore::new(16, 10));
        let mut engine = engine_for(&store, "a");
        let mut doc = active_doc(&["a", "b"]);
        if let Some(entry) = doc.participants.get_mut("a") {
            entry.is_authority = true;
        }

        engine.handle_snapshot(doc.clone());
        assert!(engine.is_authority());

        // Losing the flag drops the world again.
        if let Some(entry) = doc.participants.get_mut("a") {
            entry.is_authority = false;
        }
        if let Some(entry) = doc.participants.get_mut("b") {
            entry.is_authority = true;
        }
        engine.handle_snapshot(doc);
        assert!(!engine.is_authority());
    }

    #[tokio::test]
    async fn when_the_match_ends_then_ticks_become_no_ops() {
        let store = Arc::new(MemoryStore::new(16, 10));
        let mut engine = engine_for(&store, "a");
        let mut doc = active_doc(&["a"]);
        engine.handle_snapshot(doc.clone());

        doc.status = SessionStatus::Ended;
        engine.handle_snapshot(doc);

        assert!(engine.is_ended());
        engine.tick(1.0 / 60.0);
    }
}

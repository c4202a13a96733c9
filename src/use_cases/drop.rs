// Drop protocol, requester side: speculative local projectile kept only for
// optimistic rendering until authoritative state catches up.

use crate::domain::session::{DropRequest, ProjectileEntry, RequestId, SessionDoc, Vec2};
use crate::domain::tuning::Tuning;

/// Local-only, unreplicated projectile mirroring an outstanding request.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeculativeProjectile {
    pub request_id: RequestId,
    pub entry: ProjectileEntry,
    /// Snapshot sequence number at the time of the request.
    created_seq: u64,
}

pub struct DropTracker {
    speculative: Option<SpeculativeProjectile>,
    max_snapshots: u64,
}

impl DropTracker {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            speculative: None,
            max_snapshots: tuning.speculative_max_snapshots,
        }
    }

    /// Current speculative projectile for rendering overlays.
    pub fn speculative(&self) -> Option<&SpeculativeProjectile> {
        self.speculative.as_ref()
    }

    /// Records a speculative projectile for a just-written request.
    pub fn speculate(&mut self, request: &DropRequest, spawn_y: f32, seq: u64) {
        self.speculative = Some(SpeculativeProjectile {
            request_id: request.id.clone(),
            entry: ProjectileEntry {
                x: request.x,
                y: spawn_y,
                size: request.size,
                velocity: Some(Vec2::new(request.velocity_x, request.velocity_y)),
                dropped: true,
            },
            created_seq: seq,
        });
    }

    /// Reconciles against an incoming snapshot. The speculative projectile is
    /// discarded once a strictly later snapshot carries any authoritative
    /// projectile data, or unconditionally after enough later snapshots (the
    /// request write may have been lost and must not pin the overlay
    /// forever). Returns true when it was discarded.
    pub fn reconcile(&mut self, doc: &SessionDoc, seq: u64) -> bool {
        let Some(speculative) = &self.speculative else {
            return false;
        };
        if seq <= speculative.created_seq {
            return false;
        }
        let has_authoritative_data = !doc.projectiles.is_empty();
        let expired = seq - speculative.created_seq > self.max_snapshots;
        if has_authoritative_data || expired {
            self.speculative = None;
            return true;
        }
        false
    }
}

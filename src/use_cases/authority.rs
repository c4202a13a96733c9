// Simulation authority: the single participant process whose physics world
// is canonical for the session. Applies launches, resolves merges, and
// periodically broadcasts rounded projectile state back to the store.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::domain::ports::{ArenaPhysics, BodySnapshot, Contact};
use crate::domain::session::{
    ParticipantId, ProjectileEntry, ProjectileId, RequestId, SessionDoc, Vec2,
};
use crate::domain::systems::radius_for;
use crate::domain::tuning::Tuning;
use crate::use_cases::writer::SessionWriter;

// Unordered pair key so a single physical contact is never processed twice.
fn pair_key(a: &str, b: &str) -> (ProjectileId, ProjectileId) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

struct MergeCandidate {
    a: ProjectileId,
    b: ProjectileId,
    size: u8,
}

pub struct SimulationAuthority {
    tuning: Tuning,
    world: Box<dyn ArenaPhysics>,
    // Typed side-table: projectile id -> size rank. Never encoded in labels.
    sizes: HashMap<ProjectileId, u8>,
    // Projectiles still in their straight-line launch phase, with the
    // velocity reapplied every frame until first contact.
    in_flight: HashMap<ProjectileId, Vec2>,
    // Contacts collected this frame, resolved on the next scheduling tick so
    // settled positions are read.
    pending_merges: Vec<MergeCandidate>,
    seen_pairs: HashSet<(ProjectileId, ProjectileId)>,
    processed_requests: HashSet<RequestId>,
    // Frame-stamped tombstones that stop lagging snapshots from resurrecting
    // deleted projectiles.
    recently_deleted: HashMap<ProjectileId, u64>,
    last_launcher: Option<ParticipantId>,
    scores: HashMap<ParticipantId, u64>,
    session_score: u64,
    max_size_seen: u8,
    frame: u64,
}

impl SimulationAuthority {
    pub fn new(tuning: Tuning, world: Box<dyn ArenaPhysics>) -> Self {
        Self {
            tuning,
            world,
            sizes: HashMap::new(),
            in_flight: HashMap::new(),
            pending_merges: Vec::new(),
            seen_pairs: HashSet::new(),
            processed_requests: HashSet::new(),
            recently_deleted: HashMap::new(),
            last_launcher: None,
            scores: HashMap::new(),
            session_score: 0,
            max_size_seen: 1,
            frame: 0,
        }
    }

    /// Builds an authority from replicated state, used when taking over
    /// mid-match after failover.
    pub fn from_snapshot(tuning: Tuning, world: Box<dyn ArenaPhysics>, doc: &SessionDoc) -> Self {
        let mut authority = Self::new(tuning, world);
        for (id, entry) in &doc.projectiles {
            authority
                .world
                .spawn(id.clone(), entry.x, entry.y, entry.size, Vec2::ZERO);
            authority.sizes.insert(id.clone(), entry.size);
        }
        authority.absorb_scores(doc);
        info!(
            session_id = %doc.session_id,
            projectiles = doc.projectiles.len(),
            "authority rebuilt from snapshot"
        );
        authority
    }

    // Scores only ever grow, so max() keeps local awards that have not
    // round-tripped through the store yet.
    fn absorb_scores(&mut self, doc: &SessionDoc) {
        for (id, entry) in &doc.participants {
            let local = self.scores.entry(id.clone()).or_insert(0);
            *local = (*local).max(entry.score);
        }
        self.session_score = self.session_score.max(doc.session_score);
        self.max_size_seen = self.max_size_seen.max(doc.max_size_seen);
    }

    pub fn session_score(&self) -> u64 {
        self.session_score
    }

    pub fn last_launcher(&self) -> Option<&ParticipantId> {
        self.last_launcher.as_ref()
    }

    /// Ingests a snapshot: materializes an unprocessed drop request and adds
    /// remote-origin projectiles to the world exactly once. Returns true when
    /// a launch happened (feeds the match-end grace window).
    pub fn ingest_snapshot(&mut self, doc: &SessionDoc, writer: &SessionWriter) -> bool {
        self.absorb_scores(doc);

        for (id, entry) in &doc.projectiles {
            if self.sizes.contains_key(id) || self.recently_deleted.contains_key(id) {
                continue;
            }
            let velocity = entry.velocity.unwrap_or(Vec2::ZERO);
            self.world
                .spawn(id.clone(), entry.x, entry.y, entry.size, velocity);
            self.sizes.insert(id.clone(), entry.size);
            debug!(projectile_id = %id, size = entry.size, "adopted remote projectile");
        }

        let mut launched = false;
        if let Some(request) = &doc.drop_request
            && !self.processed_requests.contains(&request.id)
        {
            // The request itself is proof of entitlement at write time; do
            // not gate on whose logical turn it is.
            self.processed_requests.insert(request.id.clone());
            let velocity = Vec2::new(request.velocity_x, request.velocity_y);
            let id = self.spawn_projectile(request.x, request.size, velocity, &request.requester_id);
            let entry = self.entry_for(&id);
            writer.materialize_drop(id.clone(), entry);
            info!(
                request_id = %request.id,
                requester_id = %request.requester_id,
                projectile_id = %id,
                "drop request materialized"
            );
            launched = true;
        }
        launched
    }

    /// Launches a projectile for this (authority) participant directly.
    pub fn launch(&mut self, x: f32, size: u8, velocity: Vec2, writer: &SessionWriter) {
        let launcher = writer.self_id().to_string();
        let id = self.spawn_projectile(x, size, velocity, &launcher);
        let entry = self.entry_for(&id);
        writer.launch_own(id.clone(), entry);
        info!(projectile_id = %id, size, "projectile launched");
    }

    fn spawn_projectile(
        &mut self,
        x: f32,
        size: u8,
        velocity: Vec2,
        launcher: &str,
    ) -> ProjectileId {
        let id = uuid::Uuid::new_v4().to_string();
        self.world
            .spawn(id.clone(), x, self.tuning.spawn_y, size, velocity);
        self.sizes.insert(id.clone(), size);
        self.in_flight.insert(id.clone(), velocity);
        self.last_launcher = Some(launcher.to_string());
        id
    }

    fn entry_for(&self, id: &str) -> ProjectileEntry {
        let body = self.world.body(id);
        let size = self.sizes.get(id).copied().unwrap_or(1);
        ProjectileEntry {
            x: body.as_ref().map(|b| b.x).unwrap_or(0.0),
            y: body.as_ref().map(|b| b.y).unwrap_or(self.tuning.spawn_y),
            size,
            velocity: self.in_flight.get(id).copied(),
            dropped: true,
        }
    }

    /// Advances the world one frame: launch overrides, physics step, contact
    /// collection, deferred merge resolution and the periodic broadcast.
    pub fn step(&mut self, dt: f32, writer: &SessionWriter) {
        self.frame += 1;

        // Straight-line launch phase: override integration until first
        // contact.
        for (id, velocity) in &self.in_flight {
            self.world.set_velocity(id, *velocity);
        }

        let contacts = self.world.step(dt);

        let mut next_merges = Vec::new();
        for contact in &contacts {
            match contact {
                Contact::Boundary { id } => {
                    self.in_flight.remove(id);
                }
                Contact::Projectiles { a, b } => {
                    self.in_flight.remove(a);
                    self.in_flight.remove(b);
                    let (Some(&size_a), Some(&size_b)) = (self.sizes.get(a), self.sizes.get(b))
                    else {
                        continue;
                    };
                    if size_a != size_b {
                        continue;
                    }
                    if self.seen_pairs.insert(pair_key(a, b)) {
                        next_merges.push(MergeCandidate {
                            a: a.clone(),
                            b: b.clone(),
                            size: size_a,
                        });
                    }
                }
            }
        }

        // Resolve last frame's contacts now that positions have settled.
        let due: Vec<MergeCandidate> = std::mem::replace(&mut self.pending_merges, next_merges);
        for candidate in due {
            self.resolve_merge(candidate, writer);
        }

        self.prune_tombstones();

        if self.frame % u64::from(self.tuning.broadcast_every_frames) == 0 {
            self.broadcast(writer);
        }
    }

    fn resolve_merge(&mut self, candidate: MergeCandidate, writer: &SessionWriter) {
        // Either source may already be gone (merged via another pair).
        let (Some(body_a), Some(body_b)) =
            (self.world.body(&candidate.a), self.world.body(&candidate.b))
        else {
            return;
        };

        let midpoint = Vec2::new((body_a.x + body_b.x) * 0.5, (body_a.y + body_b.y) * 0.5);
        let combined = body_a
            .velocity
            .add(body_b.velocity)
            .scale(0.5 * self.tuning.bounce_factor);

        self.remove_projectile(&candidate.a);
        self.remove_projectile(&candidate.b);

        let next_size = candidate.size + 1;
        if next_size > self.tuning.max_size {
            self.burst(midpoint, writer, candidate.size);
            writer.report_merge(
                vec![candidate.a, candidate.b],
                None,
                self.session_score,
                self.max_size_seen,
            );
            return;
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.world
            .spawn(id.clone(), midpoint.x, midpoint.y, next_size, combined);
        self.sizes.insert(id.clone(), next_size);
        self.max_size_seen = self.max_size_seen.max(next_size);
        self.award(self.tuning.rank_value(next_size), writer);

        let entry = ProjectileEntry {
            x: midpoint.x,
            y: midpoint.y,
            size: next_size,
            velocity: None,
            dropped: true,
        };
        writer.report_merge(
            vec![candidate.a.clone(), candidate.b.clone()],
            Some((id.clone(), entry)),
            self.session_score,
            self.max_size_seen,
        );
        info!(
            removed_a = %candidate.a,
            removed_b = %candidate.b,
            projectile_id = %id,
            size = next_size,
            "projectiles merged"
        );
    }

    // Terminal burst: no replacement object, radial impulse decaying to zero
    // at the radius boundary.
    fn burst(&mut self, center: Vec2, writer: &SessionWriter, size: u8) {
        self.award(self.tuning.rank_value(self.tuning.max_size), writer);
        info!(size, x = center.x, y = center.y, "max-size burst");

        for body in self.world.bodies() {
            let offset = Vec2::new(body.x - center.x, body.y - center.y);
            let distance = offset.length();
            if distance >= self.tuning.burst_radius {
                continue;
            }
            let falloff = 1.0 - distance / self.tuning.burst_radius;
            let direction = if distance > 0.001 {
                offset.scale(1.0 / distance)
            } else {
                Vec2::new(0.0, 1.0)
            };
            self.world.apply_impulse(
                &body.id,
                direction.scale(self.tuning.burst_strength * falloff),
            );
        }
    }

    fn award(&mut self, value: u64, writer: &SessionWriter) {
        self.session_score += value;
        // Credit goes to whoever launched most recently, not to either
        // merging projectile's original owner.
        if let Some(launcher) = self.last_launcher.clone() {
            let score = self.scores.entry(launcher.clone()).or_insert(0);
            *score += value;
            writer.report_score(&launcher, *score);
        }
    }

    fn remove_projectile(&mut self, id: &str) {
        self.world.remove(id);
        self.sizes.remove(id);
        self.in_flight.remove(id);
        self.recently_deleted.insert(id.to_string(), self.frame);
        self.seen_pairs
            .retain(|(a, b)| a != id && b != id);
    }

    fn prune_tombstones(&mut self) {
        let ttl = self.tuning.recently_deleted_frames;
        let frame = self.frame;
        self.recently_deleted
            .retain(|_, stamped| frame.saturating_sub(*stamped) < ttl);
    }

    fn broadcast(&self, writer: &SessionWriter) {
        let round = |value: f32| (value * 10.0).round() / 10.0;
        let mut upserts = BTreeMap::new();
        for body in self.world.bodies() {
            upserts.insert(
                body.id.clone(),
                ProjectileEntry {
                    x: round(body.x),
                    y: round(body.y),
                    size: body.size,
                    velocity: None,
                    dropped: true,
                },
            );
        }
        writer.push_projectiles(upserts, Some(self.session_score), Some(self.max_size_seen));
    }

    /// True while any body still moves faster than the motion epsilon.
    pub fn any_motion(&self) -> bool {
        self.world
            .bodies()
            .iter()
            .any(|body| body.speed() > self.tuning.motion_eps)
    }

    /// True when some projectile's leading edge crosses the overflow line
    /// while nearly motionless.
    pub fn any_over_line(&self) -> bool {
        self.world.bodies().iter().any(|body| {
            body.y + radius_for(body.size) >= self.tuning.over_line_y
                && body.speed() <= self.tuning.motion_eps
        })
    }

    /// Live body state for render collaborators on the authority process.
    pub fn body(&self, id: &str) -> Option<BodySnapshot> {
        self.world.body(id)
    }

    pub fn bodies(&self) -> Vec<BodySnapshot> {
        self.world.bodies()
    }

    #[cfg(test)]
    fn live_ids(&self) -> Vec<ProjectileId> {
        self.world.bodies().into_iter().map(|b| b.id).collect()
    }
}

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::errors::StoreError;
use super::session::{ProjectileId, SessionDoc, SessionPatch, Vec2};

// Port for the shared replicated session store.
//
// The store offers no transactional cross-field guarantee and no write
// ordering across writers; every successful mutation pushes a full snapshot
// to all subscribers, possibly more than once.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, doc: SessionDoc) -> Result<(), StoreError>;
    async fn get(&self, session_id: &str) -> Result<Option<SessionDoc>, StoreError>;
    async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<broadcast::Receiver<SessionDoc>, StoreError>;
    async fn merge(&self, session_id: &str, patch: SessionPatch) -> Result<(), StoreError>;
    async fn delete(&self, session_id: &str) -> Result<(), StoreError>;
    /// Arranges for the participant to be removed from the roster when its
    /// connection is lost, so an abrupt network drop self-heals without an
    /// explicit leave write.
    async fn register_disconnect_cleanup(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<(), StoreError>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// One body as reported by the physics world.
#[derive(Clone, Debug, PartialEq)]
pub struct BodySnapshot {
    pub id: ProjectileId,
    pub x: f32,
    pub y: f32,
    pub size: u8,
    pub velocity: Vec2,
}

impl BodySnapshot {
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Contact reported by a single simulation step.
#[derive(Clone, Debug, PartialEq)]
pub enum Contact {
    Projectiles { a: ProjectileId, b: ProjectileId },
    Boundary { id: ProjectileId },
}

// Port for the rigid-body simulator the authority owns. The coordination
// protocol treats the simulator as a black box; only the authority calls it.
pub trait ArenaPhysics: Send {
    fn spawn(&mut self, id: ProjectileId, x: f32, y: f32, size: u8, velocity: Vec2);
    fn remove(&mut self, id: &str);
    fn contains(&self, id: &str) -> bool;
    fn set_velocity(&mut self, id: &str, velocity: Vec2);
    fn apply_impulse(&mut self, id: &str, impulse: Vec2);
    /// Advances the world by one fixed step and reports every contact that
    /// occurred during it.
    fn step(&mut self, dt: f32) -> Vec<Contact>;
    fn body(&self, id: &str) -> Option<BodySnapshot>;
    fn bodies(&self) -> Vec<BodySnapshot>;
}

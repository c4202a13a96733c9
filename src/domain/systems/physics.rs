// Default arena simulator behind the `ArenaPhysics` port: circle bodies,
// gravity, wall/floor bounces and pairwise separation impulses. Coordinates
// are y-up with the floor at `floor_y` and walls at `±half_width`.

use crate::domain::ports::{ArenaPhysics, BodySnapshot, Contact};
use crate::domain::session::{ProjectileId, Vec2};

/// Collision radius for a size rank.
pub fn radius_for(size: u8) -> f32 {
    14.0 + 10.0 * f32::from(size)
}

#[derive(Debug, Clone, Copy)]
pub struct ArenaConfig {
    pub gravity: f32,
    pub half_width: f32,
    pub floor_y: f32,
    pub restitution: f32,
    /// Per-second linear damping factor.
    pub damping: f32,
    /// Speeds below this are zeroed so piles come to rest.
    pub rest_speed: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            gravity: 900.0,
            half_width: 280.0,
            floor_y: 0.0,
            restitution: 0.25,
            damping: 0.4,
            rest_speed: 1.5,
        }
    }
}

struct Body {
    id: ProjectileId,
    x: f32,
    y: f32,
    size: u8,
    vx: f32,
    vy: f32,
}

impl Body {
    fn radius(&self) -> f32 {
        radius_for(self.size)
    }
}

pub struct CircleArena {
    cfg: ArenaConfig,
    bodies: Vec<Body>,
}

impl CircleArena {
    pub fn new(cfg: ArenaConfig) -> Self {
        Self {
            cfg,
            bodies: Vec::new(),
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.bodies.iter().position(|b| b.id == id)
    }
}

impl ArenaPhysics for CircleArena {
    fn spawn(&mut self, id: ProjectileId, x: f32, y: f32, size: u8, velocity: Vec2) {
        if self.contains(&id) {
            return;
        }
        self.bodies.push(Body {
            id,
            x,
            y,
            size,
            vx: velocity.x,
            vy: velocity.y,
        });
    }

    fn remove(&mut self, id: &str) {
        self.bodies.retain(|b| b.id != id);
    }

    fn contains(&self, id: &str) -> bool {
        self.bodies.iter().any(|b| b.id == id)
    }

    fn set_velocity(&mut self, id: &str, velocity: Vec2) {
        if let Some(index) = self.index_of(id) {
            self.bodies[index].vx = velocity.x;
            self.bodies[index].vy = velocity.y;
        }
    }

    fn apply_impulse(&mut self, id: &str, impulse: Vec2) {
        if let Some(index) = self.index_of(id) {
            self.bodies[index].vx += impulse.x;
            self.bodies[index].vy += impulse.y;
        }
    }

    fn step(&mut self, dt: f32) -> Vec<Contact> {
        let mut contacts = Vec::new();
        let damp = (1.0 - self.cfg.damping * dt).max(0.0);

        // Integrate, then clamp against walls and floor.
        for body in &mut self.bodies {
            body.vy -= self.cfg.gravity * dt;
            body.vx *= damp;
            body.vy *= damp;
            body.x += body.vx * dt;
            body.y += body.vy * dt;

            let radius = body.radius();
            let mut touched_boundary = false;

            if body.x - radius < -self.cfg.half_width {
                body.x = -self.cfg.half_width + radius;
                body.vx = -body.vx * self.cfg.restitution;
                touched_boundary = true;
            } else if body.x + radius > self.cfg.half_width {
                body.x = self.cfg.half_width - radius;
                body.vx = -body.vx * self.cfg.restitution;
                touched_boundary = true;
            }

            if body.y - radius < self.cfg.floor_y {
                body.y = self.cfg.floor_y + radius;
                body.vy = -body.vy * self.cfg.restitution;
                // Ground friction so stacks stop sliding.
                body.vx *= 0.9;
                touched_boundary = true;
            }

            if (body.vx * body.vx + body.vy * body.vy).sqrt() < self.cfg.rest_speed
                && body.y - radius <= self.cfg.floor_y + 0.5
            {
                body.vx = 0.0;
                body.vy = 0.0;
            }

            if touched_boundary {
                contacts.push(Contact::Boundary {
                    id: body.id.clone(),
                });
            }
        }

        // Pairwise circle separation (naive O(n^2); arenas hold tens of
        // bodies at most).
        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                let (left, right) = self.bodies.split_at_mut(j);
                let a = &mut left[i];
                let b = &mut right[0];

                let dx = b.x - a.x;
                let dy = b.y - a.y;
                let min_dist = a.radius() + b.radius();
                let dist_sq = dx * dx + dy * dy;
                if dist_sq >= min_dist * min_dist {
                    continue;
                }

                let dist = dist_sq.sqrt().max(0.001);
                let nx = dx / dist;
                let ny = dy / dist;
                let penetration = min_dist - dist;

                a.x -= nx * penetration * 0.5;
                a.y -= ny * penetration * 0.5;
                b.x += nx * penetration * 0.5;
                b.y += ny * penetration * 0.5;

                let relative_normal = (b.vx - a.vx) * nx + (b.vy - a.vy) * ny;
                if relative_normal < 0.0 {
                    let impulse = -(1.0 + self.cfg.restitution) * relative_normal * 0.5;
                    a.vx -= nx * impulse;
                    a.vy -= ny * impulse;
                    b.vx += nx * impulse;
                    b.vy += ny * impulse;
                }

                contacts.push(Contact::Projectiles {
                    a: a.id.clone(),
                    b: b.id.clone(),
                });
            }
        }

        contacts
    }

    fn body(&self, id: &str) -> Option<BodySnapshot> {
        self.bodies.iter().find(|b| b.id == id).map(|b| BodySnapshot {
            id: b.id.clone(),
            x: b.x,
            y: b.y,
            size: b.size,
            velocity: Vec2::new(b.vx, b.vy),
        })
    }

    fn bodies(&self) -> Vec<BodySnapshot> {
        self.bodies
            .iter()
            .map(|b| BodySnapshot {
                id: b.id.clone(),
                x: b.x,
                y: b.y,
                size: b.size,
                velocity: Vec2::new(b.vx, b.vy),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn when_a_body_falls_then_it_comes_to_rest_on_the_floor() {
        let mut arena = CircleArena::new(ArenaConfig::default());
        arena.spawn("p1".into(), 0.0, 300.0, 2, Vec2::ZERO);

        for _ in 0..600 {
            arena.step(DT);
        }

        let body = arena.body("p1").expect("body should still exist");
        assert!(body.speed() < 2.0, "speed was {}", body.speed());
        assert!((body.y - radius_for(2)).abs() < 2.0, "rest y was {}", body.y);
    }

    #[test]
    fn when_two_bodies_overlap_then_a_projectile_contact_is_reported() {
        let mut arena = CircleArena::new(ArenaConfig::default());
        arena.spawn("a".into(), 0.0, 100.0, 3, Vec2::ZERO);
        arena.spawn("b".into(), 10.0, 100.0, 3, Vec2::ZERO);

        let contacts = arena.step(DT);

        assert!(contacts.iter().any(|c| matches!(
            c,
            Contact::Projectiles { a, b } if a == "a" && b == "b"
        )));
    }

    #[test]
    fn when_a_body_crosses_a_wall_then_it_is_clamped_inside() {
        let cfg = ArenaConfig::default();
        let mut arena = CircleArena::new(cfg);
        arena.spawn("p1".into(), 0.0, 200.0, 1, Vec2::new(5_000.0, 0.0));

        let contacts = arena.step(DT);

        let body = arena.body("p1").expect("body should still exist");
        assert!(body.x + radius_for(1) <= cfg.half_width + 0.01);
        assert!(contacts
            .iter()
            .any(|c| matches!(c, Contact::Boundary { id } if id == "p1")));
    }

    #[test]
    fn spawning_an_existing_id_does_not_duplicate_the_body() {
        let mut arena = CircleArena::new(ArenaConfig::default());
        arena.spawn("p1".into(), 0.0, 100.0, 1, Vec2::ZERO);
        arena.spawn("p1".into(), 50.0, 100.0, 1, Vec2::ZERO);

        assert_eq!(arena.bodies().len(), 1);
    }
}

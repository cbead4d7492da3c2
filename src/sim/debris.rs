//! Short-lived fragments thrown out when a target is destroyed

use glam::Vec3;
use rand::Rng;

use super::physics::{BodyHandle, Owner, PhysicsWorld, RigidBody, Shape};
use crate::consts::DEBRIS_PER_TARGET;

const SIZE_MIN: f32 = 0.08;
const SIZE_MAX: f32 = 0.2;
const LIFESPAN_MIN: f32 = 1.0;
const LIFESPAN_MAX: f32 = 2.5;
/// Mass per metre of edge
const DENSITY: f32 = 5.0;
const DAMPING: f32 = 0.1;
const RESTITUTION: f32 = 0.3;

/// One fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Debris {
    pub body: BodyHandle,
    /// Seconds left before removal
    pub lifespan: f32,
    pub size: f32,
    pub color: String,
}

/// All live fragments
#[derive(Debug, Clone, Default)]
pub struct DebrisField {
    pieces: Vec<Debris>,
}

impl DebrisField {
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Debris> {
        self.pieces.iter()
    }

    /// Spawn a burst of fragments flying outward from `origin`
    pub fn burst<R: Rng>(
        &mut self,
        world: &mut PhysicsWorld,
        origin: Vec3,
        strength: f32,
        color: &str,
        rng: &mut R,
    ) {
        for _ in 0..DEBRIS_PER_TARGET {
            let dir = Vec3::new(
                rng.random_range(-1.0..=1.0),
                rng.random_range(0.2..=1.0),
                rng.random_range(-1.0..=1.0),
            )
            .normalize_or(Vec3::Y);
            let speed = strength * rng.random_range(0.25..=1.0);
            let size = rng.random_range(SIZE_MIN..=SIZE_MAX);

            let body = RigidBody::dynamic(
                Shape::Box {
                    half_extents: Vec3::splat(size * 0.5),
                },
                origin,
                size * DENSITY,
            )
            .with_velocity(dir * speed)
            .with_damping(DAMPING)
            .with_restitution(RESTITUTION);

            self.pieces.push(Debris {
                body: world.add_body(body, Owner::Debris),
                lifespan: rng.random_range(LIFESPAN_MIN..=LIFESPAN_MAX),
                size,
                color: color.to_string(),
            });
        }
    }

    /// Age fragments and remove expired ones from the world
    pub fn update(&mut self, dt: f32, world: &mut PhysicsWorld) {
        self.pieces.retain_mut(|piece| {
            piece.lifespan -= dt;
            if piece.lifespan > 0.0 {
                return true;
            }
            world.remove_body(piece.body);
            false
        });
    }

    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for piece in self.pieces.drain(..) {
            world.remove_body(piece.body);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_burst_spawns_dynamic_bodies() {
        let mut world = PhysicsWorld::default();
        let mut field = DebrisField::default();
        let mut rng = Pcg32::seed_from_u64(1);
        field.burst(&mut world, Vec3::new(0.0, 1.0, 0.0), 6.0, "#ff0000", &mut rng);

        assert_eq!(field.len(), DEBRIS_PER_TARGET);
        assert_eq!(world.count_owned(|o| o == Owner::Debris), DEBRIS_PER_TARGET);
        for piece in field.iter() {
            let body = world.body(piece.body).unwrap();
            let speed = body.velocity.length();
            assert!((6.0 * 0.25 - 1e-4..=6.0 + 1e-4).contains(&speed));
            assert!(body.velocity.y > 0.0);
            assert!((LIFESPAN_MIN..=LIFESPAN_MAX).contains(&piece.lifespan));
        }
    }

    #[test]
    fn test_expired_debris_removed() {
        let mut world = PhysicsWorld::default();
        let mut field = DebrisField::default();
        let mut rng = Pcg32::seed_from_u64(2);
        field.burst(&mut world, Vec3::ZERO, 6.0, "#fff", &mut rng);

        field.update(0.5, &mut world);
        assert_eq!(field.len(), DEBRIS_PER_TARGET);
        field.update(LIFESPAN_MAX, &mut world);
        assert!(field.is_empty());
        assert!(world.is_empty());
    }
}

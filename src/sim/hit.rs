//! Hitscan resolution
//!
//! A shot is resolved in three passes:
//! 1. overlay plates (a plate hit ends the query)
//! 2. broadphase: ray vs a world AABB around each live target's hit proxy
//! 3. narrowphase: ray vs the target's OBB or sphere proxy
//!
//! Only the nearest narrowphase hit counts. Its collider is mapped back to a
//! target through the physics world's owner table; a collider with no target
//! owner is a miss.

use glam::Vec3;

use super::bounds::Ray;
use super::panels::{PanelBoard, PlateHit};
use super::physics::{BodyHandle, Owner, PhysicsWorld};
use super::target::{TargetId, TargetRegistry};

/// What a shot struck
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShotResolution {
    Plate(PlateHit),
    Target {
        id: TargetId,
        point: Vec3,
        distance: f32,
    },
    Miss,
}

/// One candidate surviving the narrowphase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub body: BodyHandle,
    pub distance: f32,
}

/// Narrowphase hits along `ray`, nearest first
pub fn candidates(ray: &Ray, max_distance: f32, targets: &mut TargetRegistry) -> Vec<Candidate> {
    let mut hits: Vec<Candidate> = targets
        .iter_mut()
        .filter(|t| t.is_alive())
        .filter_map(|target| {
            let body = target.body?;
            target.broadphase_aabb().ray_intersection(ray, max_distance)?;
            let hit = target.ray_intersection(ray, max_distance)?;
            Some(Candidate {
                body,
                distance: hit.distance,
            })
        })
        .collect();
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Resolve a shot from `origin` along `dir`.
///
/// `range` bounds this query only; `None` is unbounded.
pub fn resolve_shot(
    origin: Vec3,
    dir: Vec3,
    range: Option<f32>,
    panels: &PanelBoard,
    targets: &mut TargetRegistry,
    world: &PhysicsWorld,
) -> ShotResolution {
    let ray = Ray::new(origin, dir);
    let max_distance = range.unwrap_or(f32::INFINITY);

    if let Some(plate) = panels.raycast(&ray, max_distance) {
        return ShotResolution::Plate(plate);
    }

    let Some(nearest) = candidates(&ray, max_distance, targets).into_iter().next() else {
        return ShotResolution::Miss;
    };
    match world.owner_of(nearest.body) {
        Some(Owner::Target(id)) => ShotResolution::Target {
            id,
            point: ray.at(nearest.distance),
            distance: nearest.distance,
        },
        _ => ShotResolution::Miss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModeConfig, ModeKind, TargetConfig};
    use crate::sim::bounds::Aabb;
    use crate::sim::target::{HitProxy, PrimitiveVisuals, SpawnRequest, VisualHandle};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const PLATE_ROW_Z: f32 = 8.0;

    struct Range {
        world: PhysicsWorld,
        targets: TargetRegistry,
    }

    fn range_with(positions: &[Vec3]) -> (Range, Vec<TargetId>) {
        let mut world = PhysicsWorld::default();
        let mut targets = TargetRegistry::new();
        let mut visuals = PrimitiveVisuals::new();
        let mut rng = Pcg32::seed_from_u64(5);
        let mode = ModeConfig::for_kind(ModeKind::Prototype);
        let cfg = TargetConfig::default();
        let ids = positions
            .iter()
            .map(|&position| {
                targets.spawn(
                    &SpawnRequest {
                        position,
                        moving: false,
                        speed: 1.0,
                    },
                    &mode,
                    &cfg,
                    &mut visuals,
                    &mut world,
                    &mut rng,
                )
            })
            .collect();
        (Range { world, targets }, ids)
    }

    #[test]
    fn test_sphere_proxy_hit_outside_visual_aabb() {
        let mut world = PhysicsWorld::default();
        let mut targets = TargetRegistry::new();
        let mut visuals = PrimitiveVisuals::new();
        let mode = ModeConfig::for_kind(ModeKind::Full);
        // Tall, thin model: the sphere proxy reaches well past its AABB sideways
        for model in &mode.gltf_targets {
            visuals.register_model(
                model.url.clone(),
                VisualHandle {
                    vertex_count: 5000,
                    local_bounds: Aabb::from_center_half(Vec3::ZERO, Vec3::new(0.2, 2.0, 0.2)),
                },
            );
        }
        targets.spawn(
            &SpawnRequest {
                position: Vec3::new(0.0, 2.0, -10.0),
                moving: false,
                speed: 1.0,
            },
            &mode,
            &TargetConfig::default(),
            &mut visuals,
            &mut world,
            &mut Pcg32::seed_from_u64(3),
        );
        let target = targets.iter_mut().next().unwrap();
        assert_eq!(target.proxy, HitProxy::Sphere);
        let bounds = target.bounds();
        let offset = (bounds.aabb.half_extents().x + bounds.sphere.radius) * 0.5;
        let center = bounds.sphere.center;

        let ray = Ray::new(center + Vec3::new(offset, 0.0, 10.0), Vec3::NEG_Z);
        assert!(bounds.aabb.ray_intersection(&ray, f32::INFINITY).is_none());
        let hits = candidates(&ray, f32::INFINITY, &mut targets);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].distance < 10.0);
    }

    #[test]
    fn test_nearest_target_wins() {
        let (mut range, ids) = range_with(&[Vec3::new(0.0, 1.6, -10.0), Vec3::new(0.0, 1.6, -5.0)]);
        let shot = resolve_shot(
            Vec3::new(0.0, 1.6, 0.0),
            Vec3::NEG_Z,
            None,
            &PanelBoard::empty(),
            &mut range.targets,
            &range.world,
        );
        match shot {
            ShotResolution::Target { id, distance, .. } => {
                assert_eq!(id, ids[1]);
                assert!(distance < 5.0 && distance > 4.0);
            }
            other => panic!("expected a hit, got {other:?}"),
        }
    }

    #[test]
    fn test_range_limits_query() {
        let (mut range, _) = range_with(&[Vec3::new(0.0, 1.6, -5.0)]);
        let panels = PanelBoard::empty();
        let origin = Vec3::new(0.0, 1.6, 0.0);
        // Nearest target surface is at least 4.4 units away
        assert_eq!(
            resolve_shot(origin, Vec3::NEG_Z, Some(3.0), &panels, &mut range.targets, &range.world),
            ShotResolution::Miss
        );

        let close = Vec3::new(0.0, 1.6, -3.0);
        assert!(matches!(
            resolve_shot(close, Vec3::NEG_Z, Some(3.0), &panels, &mut range.targets, &range.world),
            ShotResolution::Target { .. }
        ));
    }

    #[test]
    fn test_plate_short_circuits() {
        let (mut range, _) = range_with(&[Vec3::new(0.0, -5.0, PLATE_ROW_Z)]);
        let shot = resolve_shot(
            Vec3::new(0.0, 1.6, PLATE_ROW_Z),
            Vec3::NEG_Y,
            None,
            &PanelBoard::sensitivity_row(PLATE_ROW_Z),
            &mut range.targets,
            &range.world,
        );
        assert!(matches!(shot, ShotResolution::Plate(PlateHit { index: 2, .. })));
    }

    #[test]
    fn test_dead_and_unmapped_targets_miss() {
        let (mut range, ids) = range_with(&[Vec3::new(0.0, 1.6, -5.0)]);
        let origin = Vec3::new(0.0, 1.6, 0.0);
        let panels = PanelBoard::empty();

        // Collider gone from the owner table
        let body = range.targets.get(ids[0]).unwrap().body.unwrap();
        range.world.remove_body(body);
        assert_eq!(
            resolve_shot(origin, Vec3::NEG_Z, None, &panels, &mut range.targets, &range.world),
            ShotResolution::Miss
        );

        range.targets.get_mut(ids[0]).unwrap().apply_damage(1000);
        assert!(candidates(&Ray::new(origin, Vec3::NEG_Z), f32::INFINITY, &mut range.targets).is_empty());
    }

    #[test]
    fn test_shot_past_target_misses() {
        let (mut range, _) = range_with(&[Vec3::new(0.0, 1.6, -5.0)]);
        assert_eq!(
            resolve_shot(
                Vec3::new(0.0, 1.6, 0.0),
                Vec3::Z,
                None,
                &PanelBoard::empty(),
                &mut range.targets,
                &range.world,
            ),
            ShotResolution::Miss
        );
    }
}

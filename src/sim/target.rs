//! Targets: health, motion and lazily cached hit bounds
//!
//! A target owns one kinematic collider in the physics world while alive.
//! Its hit proxy is picked once at spawn from the visual it was given:
//! - dense visuals (more than 100 vertices) are hit as a sphere
//! - everything else is hit as an oriented box
//!
//! Any transform change drops the cached bounds; they are rebuilt on the next
//! query from the visual's local bounding box.

use std::collections::HashMap;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::bounds::{Aabb, Obb, Ray, Sphere, SurfaceHit, Transform};
use super::debris::DebrisField;
use super::physics::{BodyHandle, Owner, PhysicsWorld, RigidBody, Shape};
use crate::config::{GeometryStyle, ModeConfig, ModelOption, TargetConfig};
use crate::consts::PROXY_VERTEX_THRESHOLD;
use crate::error::AssetError;

/// Yaw rate of moving targets (rad/s)
const SPIN_RATE: f32 = 0.6;
/// Range of the per-target oscillation amplitude
const AMPLITUDE_MIN: f32 = 1.5;
const AMPLITUDE_MAX: f32 = 2.0;

/// Unique target identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u32);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive target shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveShape {
    Sphere,
    Cube,
}

/// What to build for a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshRequest<'a> {
    Primitive(PrimitiveShape),
    Model(&'a ModelOption),
}

/// The parts of a visual the simulation reads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualHandle {
    pub vertex_count: usize,
    /// Bounding box in the visual's own (unscaled) frame
    pub local_bounds: Aabb,
}

/// Builds target visuals. Called only during spawn.
pub trait TargetVisuals {
    fn create_target_mesh(
        &mut self,
        color: &str,
        radius: f32,
        request: MeshRequest<'_>,
    ) -> Result<VisualHandle, AssetError>;
}

/// Headless visuals: exact primitive geometry stats plus a table of models
/// registered during setup.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveVisuals {
    models: HashMap<String, VisualHandle>,
}

impl PrimitiveVisuals {
    /// Sphere tessellation used by the renderer (24 × 18 segments)
    pub const SPHERE_SEGMENTS: (usize, usize) = (24, 18);
    /// Cube edge relative to the target radius
    pub const CUBE_SCALE: f32 = 1.6;

    pub fn new() -> Self {
        Self::default()
    }

    /// Make a model available for spawning
    pub fn register_model(&mut self, url: impl Into<String>, visual: VisualHandle) {
        self.models.insert(url.into(), visual);
    }

    pub fn primitive(shape: PrimitiveShape, radius: f32) -> VisualHandle {
        match shape {
            PrimitiveShape::Sphere => {
                let (w, h) = Self::SPHERE_SEGMENTS;
                VisualHandle {
                    vertex_count: (w + 1) * (h + 1),
                    local_bounds: Aabb::from_center_half(Vec3::ZERO, Vec3::splat(radius)),
                }
            }
            PrimitiveShape::Cube => VisualHandle {
                vertex_count: 24,
                local_bounds: Aabb::from_center_half(
                    Vec3::ZERO,
                    Vec3::splat(radius * Self::CUBE_SCALE * 0.5),
                ),
            },
        }
    }
}

impl TargetVisuals for PrimitiveVisuals {
    fn create_target_mesh(
        &mut self,
        _color: &str,
        radius: f32,
        request: MeshRequest<'_>,
    ) -> Result<VisualHandle, AssetError> {
        match request {
            MeshRequest::Primitive(shape) => Ok(Self::primitive(shape, radius)),
            MeshRequest::Model(model) => self
                .models
                .get(&model.url)
                .copied()
                .ok_or_else(|| AssetError::ModelUnavailable(model.url.clone())),
        }
    }
}

/// Narrowphase shape a target is hit with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitProxy {
    Obb,
    Sphere,
}

impl HitProxy {
    pub fn for_visual(visual: &VisualHandle) -> Self {
        if visual.vertex_count > PROXY_VERTEX_THRESHOLD {
            HitProxy::Sphere
        } else {
            HitProxy::Obb
        }
    }
}

/// World-space bounds derived from the current transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedBounds {
    pub aabb: Aabb,
    pub obb: Obb,
    pub sphere: Sphere,
}

/// Result of applying damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target already dead
    Ignored,
    Wounded { remaining: i32 },
    Killed,
}

/// A shootable target
#[derive(Debug, Clone)]
pub struct Target {
    pub id: TargetId,
    pub health: i32,
    alive: bool,
    pub moving: bool,
    pub speed: f32,
    /// Oscillation phase
    pub phase: f32,
    pub amplitude: f32,
    position: Vec3,
    yaw: f32,
    scale: f32,
    bounds: Option<CachedBounds>,
    pub body: Option<BodyHandle>,
    pub proxy: HitProxy,
    pub visual: VisualHandle,
    pub color: String,
}

impl Target {
    pub fn new(id: TargetId, health: i32, position: Vec3, visual: VisualHandle, scale: f32) -> Self {
        Self {
            id,
            health,
            alive: true,
            moving: false,
            speed: 0.0,
            phase: 0.0,
            amplitude: AMPLITUDE_MIN,
            position,
            yaw: 0.0,
            scale,
            bounds: None,
            body: None,
            proxy: HitProxy::for_visual(&visual),
            visual,
            color: String::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation_yaw(self.position, self.yaw).with_scale(self.scale)
    }

    pub fn set_transform(&mut self, position: Vec3, yaw: f32) {
        self.position = position;
        self.yaw = yaw;
        self.bounds = None;
    }

    pub fn has_cached_bounds(&self) -> bool {
        self.bounds.is_some()
    }

    /// Current bounds, rebuilt if the transform changed since the last query
    pub fn bounds(&mut self) -> CachedBounds {
        if let Some(bounds) = self.bounds {
            return bounds;
        }
        let transform = self.transform();
        let local = self.visual.local_bounds;
        let obb = Obb::from_local(&local, &transform);
        let bounds = CachedBounds {
            aabb: local.transformed(&transform),
            obb,
            sphere: Sphere {
                center: obb.center,
                radius: obb.half_extents.max_element(),
            },
        };
        self.bounds = Some(bounds);
        bounds
    }

    /// Broadphase box around the hit proxy. A sphere proxy can reach past
    /// the visual's AABB, so it gets its own box.
    pub fn broadphase_aabb(&mut self) -> Aabb {
        let bounds = self.bounds();
        match self.proxy {
            HitProxy::Obb => bounds.aabb,
            HitProxy::Sphere => bounds.sphere.to_aabb(),
        }
    }

    /// Narrowphase test against the target's hit proxy
    pub fn ray_intersection(&mut self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        let bounds = self.bounds();
        match self.proxy {
            HitProxy::Obb => bounds.obb.ray_intersection(ray, max_distance),
            HitProxy::Sphere => bounds.sphere.ray_intersection(ray, max_distance),
        }
    }

    /// Collider shape matching the hit proxy
    pub fn collider_shape(&mut self) -> Shape {
        let bounds = self.bounds();
        match self.proxy {
            HitProxy::Obb => Shape::Box {
                half_extents: bounds.obb.half_extents,
            },
            HitProxy::Sphere => Shape::Sphere {
                radius: bounds.sphere.radius,
            },
        }
    }

    /// Oscillate around the spawn point. Static targets never move.
    pub fn advance(&mut self, dt: f32) {
        if !self.moving || !self.alive {
            return;
        }
        self.phase += dt * self.speed;
        let offset = Vec3::new(self.phase.sin(), 0.0, self.phase.cos()) * self.amplitude * dt;
        self.set_transform(self.position + offset, self.yaw + dt * SPIN_RATE);
    }

    /// Subtract health while alive; the alive flag flips exactly once
    pub fn apply_damage(&mut self, damage: i32) -> DamageOutcome {
        if !self.alive {
            return DamageOutcome::Ignored;
        }
        self.health -= damage.max(0);
        if self.health <= 0 {
            self.alive = false;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Wounded {
                remaining: self.health,
            }
        }
    }
}

/// Where and how to spawn one target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub position: Vec3,
    pub moving: bool,
    pub speed: f32,
}

/// Live targets, sorted by id
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
    next_id: u32,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Target> {
        self.targets.iter_mut()
    }

    pub fn get(&self, id: TargetId) -> Option<&Target> {
        self.index_of(id).map(|i| &self.targets[i])
    }

    pub fn get_mut(&mut self, id: TargetId) -> Option<&mut Target> {
        self.index_of(id).map(|i| &mut self.targets[i])
    }

    pub fn is_alive(&self, id: TargetId) -> bool {
        self.get(id).is_some_and(Target::is_alive)
    }

    fn index_of(&self, id: TargetId) -> Option<usize> {
        self.targets.binary_search_by_key(&id, |t| t.id).ok()
    }

    /// Build a target, pick its visual and insert its collider.
    ///
    /// Model failures fall back to a primitive with a warning.
    pub fn spawn<R: Rng>(
        &mut self,
        request: &SpawnRequest,
        mode: &ModeConfig,
        cfg: &TargetConfig,
        visuals: &mut dyn TargetVisuals,
        world: &mut PhysicsWorld,
        rng: &mut R,
    ) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;

        let color = if mode.target_palette.is_empty() {
            String::from("#ffffff")
        } else {
            mode.target_palette[rng.random_range(0..mode.target_palette.len())].clone()
        };

        let shape = if rng.random_bool(0.5) {
            PrimitiveShape::Sphere
        } else {
            PrimitiveShape::Cube
        };
        let model = match mode.geometry_style {
            GeometryStyle::Hybrid if !mode.gltf_targets.is_empty() => {
                Some(&mode.gltf_targets[rng.random_range(0..mode.gltf_targets.len())])
            }
            _ => None,
        };

        let loaded = model.and_then(|model| {
            match visuals.create_target_mesh(&color, cfg.radius, MeshRequest::Model(model)) {
                Ok(visual) => Some((visual, model.scale)),
                Err(err) => {
                    log::warn!("{err}; target {id} falls back to a primitive");
                    None
                }
            }
        });
        let (visual, scale) = loaded.unwrap_or_else(|| {
            let visual = visuals
                .create_target_mesh(&color, cfg.radius, MeshRequest::Primitive(shape))
                .unwrap_or_else(|_| PrimitiveVisuals::primitive(shape, cfg.radius));
            (visual, 1.0)
        });

        let mut target = Target::new(id, cfg.base_health, request.position, visual, scale);
        target.moving = request.moving;
        target.speed = request.speed;
        target.phase = rng.random_range(0.0..std::f32::consts::TAU);
        target.amplitude = rng.random_range(AMPLITUDE_MIN..=AMPLITUDE_MAX);
        target.color = color;

        let body = RigidBody::kinematic(target.collider_shape(), target.bounds().obb.center)
            .with_yaw(target.yaw);
        target.body = Some(world.add_body(body, Owner::Target(id)));

        // Ids only grow, so pushing keeps the list sorted
        self.targets.push(target);
        id
    }

    /// Move targets and sync their colliders
    pub fn advance(&mut self, dt: f32, world: &mut PhysicsWorld) {
        for target in self.targets.iter_mut().filter(|t| t.moving && t.is_alive()) {
            target.advance(dt);
            if let Some(body) = target.body {
                let center = target.bounds().obb.center;
                world.set_position(body, center, target.yaw);
            }
        }
    }

    /// Damage a target. A kill removes its collider and bursts it into debris
    /// within the same call.
    pub fn damage<R: Rng>(
        &mut self,
        id: TargetId,
        amount: i32,
        world: &mut PhysicsWorld,
        debris: &mut DebrisField,
        cfg: &TargetConfig,
        rng: &mut R,
    ) -> DamageOutcome {
        let Some(target) = self.get_mut(id) else {
            return DamageOutcome::Ignored;
        };
        let outcome = target.apply_damage(amount);
        if outcome == DamageOutcome::Killed {
            if let Some(body) = target.body.take() {
                world.remove_body(body);
            }
            let origin = target.bounds().obb.center;
            let color = target.color.clone();
            debris.burst(world, origin, cfg.explosion_strength, &color, rng);
            log::debug!("target {id} destroyed");
        }
        outcome
    }

    /// Drop dead targets from the registry
    pub fn prune(&mut self, world: &mut PhysicsWorld) -> Vec<TargetId> {
        let mut removed = Vec::new();
        self.targets.retain_mut(|t| {
            if t.is_alive() {
                return true;
            }
            if let Some(body) = t.body.take() {
                world.remove_body(body);
            }
            removed.push(t.id);
            false
        });
        removed
    }

    /// Remove every target and its collider
    pub fn clear(&mut self, world: &mut PhysicsWorld) {
        for target in self.targets.drain(..) {
            if let Some(body) = target.body {
                world.remove_body(body);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModeKind;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn cube_target() -> Target {
        Target::new(
            TargetId(1),
            30,
            Vec3::new(0.0, 1.2, -5.0),
            PrimitiveVisuals::primitive(PrimitiveShape::Cube, 0.6),
            1.0,
        )
    }

    #[test]
    fn test_primitive_proxies() {
        let sphere = PrimitiveVisuals::primitive(PrimitiveShape::Sphere, 0.6);
        let cube = PrimitiveVisuals::primitive(PrimitiveShape::Cube, 0.6);
        assert_eq!(HitProxy::for_visual(&sphere), HitProxy::Sphere);
        assert_eq!(HitProxy::for_visual(&cube), HitProxy::Obb);
    }

    #[test]
    fn test_dense_model_uses_sphere() {
        let dense = VisualHandle {
            vertex_count: 101,
            local_bounds: Aabb::from_center_half(Vec3::ZERO, Vec3::ONE),
        };
        let sparse = VisualHandle {
            vertex_count: 100,
            ..dense
        };
        assert_eq!(HitProxy::for_visual(&dense), HitProxy::Sphere);
        assert_eq!(HitProxy::for_visual(&sparse), HitProxy::Obb);
    }

    #[test]
    fn test_sphere_broadphase_covers_proxy() {
        let mut target = Target::new(
            TargetId(1),
            30,
            Vec3::ZERO,
            VisualHandle {
                vertex_count: 500,
                local_bounds: Aabb::from_center_half(Vec3::ZERO, Vec3::new(0.2, 2.0, 0.2)),
            },
            1.0,
        );
        assert_eq!(target.proxy, HitProxy::Sphere);
        let broad = target.broadphase_aabb();
        assert!((broad.half_extents() - Vec3::splat(2.0)).length() < 1e-5);

        let mut cube = cube_target();
        assert_eq!(cube.broadphase_aabb(), cube.bounds().aabb);
    }

    #[test]
    fn test_bounds_cache_invalidated_on_move() {
        let mut target = cube_target();
        assert!(!target.has_cached_bounds());
        let first = target.bounds();
        assert!(target.has_cached_bounds());
        assert!((first.aabb.center() - Vec3::new(0.0, 1.2, -5.0)).length() < 1e-5);

        target.set_transform(Vec3::new(2.0, 1.2, -5.0), 0.3);
        assert!(!target.has_cached_bounds());
        let second = target.bounds();
        assert!((second.obb.center - Vec3::new(2.0, 1.2, -5.0)).length() < 1e-5);
        // Rotated cube: the AABB grows beyond the OBB half extents
        assert!(second.aabb.half_extents().x > second.obb.half_extents.x);
    }

    #[test]
    fn test_scale_applies_to_bounds() {
        let mut target = Target::new(
            TargetId(1),
            30,
            Vec3::ZERO,
            VisualHandle {
                vertex_count: 40,
                local_bounds: Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)),
            },
            0.5,
        );
        let bounds = target.bounds();
        assert!((bounds.obb.half_extents - Vec3::splat(0.5)).length() < 1e-5);
        assert!((bounds.obb.center - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_damage_kills_once() {
        let mut target = cube_target();
        assert_eq!(target.apply_damage(25), DamageOutcome::Wounded { remaining: 5 });
        assert_eq!(target.apply_damage(25), DamageOutcome::Killed);
        assert!(!target.is_alive());
        assert_eq!(target.apply_damage(25), DamageOutcome::Ignored);
        assert_eq!(target.health, -20);
    }

    #[test]
    fn test_registry_kill_removes_collider_and_spawns_debris() {
        let mut world = PhysicsWorld::default();
        let mut registry = TargetRegistry::new();
        let mut debris = DebrisField::default();
        let mut visuals = PrimitiveVisuals::new();
        let mut rng = Pcg32::seed_from_u64(7);
        let mode = ModeConfig::for_kind(ModeKind::Prototype);
        let cfg = TargetConfig::default();

        let id = registry.spawn(
            &SpawnRequest {
                position: Vec3::new(0.0, 1.2, -5.0),
                moving: false,
                speed: 1.0,
            },
            &mode,
            &cfg,
            &mut visuals,
            &mut world,
            &mut rng,
        );
        let body = registry.get(id).unwrap().body.unwrap();
        assert_eq!(world.owner_of(body), Some(Owner::Target(id)));

        let outcome = registry.damage(id, 1000, &mut world, &mut debris, &cfg, &mut rng);
        assert_eq!(outcome, DamageOutcome::Killed);
        assert!(world.owner_of(body).is_none());
        assert_eq!(debris.len(), crate::consts::DEBRIS_PER_TARGET);

        assert_eq!(registry.prune(&mut world), vec![id]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_model_falls_back_to_primitive() {
        let mut world = PhysicsWorld::default();
        let mut registry = TargetRegistry::new();
        let mut visuals = PrimitiveVisuals::new();
        let mut rng = Pcg32::seed_from_u64(3);
        let mode = ModeConfig::for_kind(ModeKind::Full);
        assert!(!mode.gltf_targets.is_empty());

        let id = registry.spawn(
            &SpawnRequest {
                position: Vec3::ZERO,
                moving: true,
                speed: 1.0,
            },
            &mode,
            &TargetConfig::default(),
            &mut visuals,
            &mut world,
            &mut rng,
        );
        let target = registry.get(id).unwrap();
        assert_eq!(target.scale(), 1.0);
        assert!(target.visual.vertex_count == 24 || target.visual.vertex_count == 475);
        assert!((AMPLITUDE_MIN..=AMPLITUDE_MAX).contains(&target.amplitude));
    }

    #[test]
    fn test_registered_model_is_used() {
        let mut world = PhysicsWorld::default();
        let mut registry = TargetRegistry::new();
        let mut visuals = PrimitiveVisuals::new();
        let mode = ModeConfig::for_kind(ModeKind::Full);
        for model in &mode.gltf_targets {
            visuals.register_model(
                model.url.clone(),
                VisualHandle {
                    vertex_count: 5000,
                    local_bounds: Aabb::from_center_half(Vec3::ZERO, Vec3::splat(1.0)),
                },
            );
        }
        let id = registry.spawn(
            &SpawnRequest {
                position: Vec3::ZERO,
                moving: false,
                speed: 1.0,
            },
            &mode,
            &TargetConfig::default(),
            &mut visuals,
            &mut world,
            &mut Pcg32::seed_from_u64(11),
        );
        let target = registry.get(id).unwrap();
        assert_eq!(target.visual.vertex_count, 5000);
        assert_eq!(target.proxy, HitProxy::Sphere);
    }

    proptest! {
        #[test]
        fn prop_static_targets_never_drift(steps in prop::collection::vec(0.0f32..0.1, 1..50)) {
            let mut target = cube_target();
            target.speed = 3.0;
            let start = target.position();
            for dt in steps {
                target.advance(dt);
            }
            prop_assert_eq!(target.position(), start);
            prop_assert_eq!(target.yaw(), 0.0);
        }

        #[test]
        fn prop_health_monotone(damages in prop::collection::vec(-10i32..60, 1..20)) {
            let mut target = cube_target();
            let mut last = target.health;
            let mut was_dead = false;
            for d in damages {
                target.apply_damage(d);
                prop_assert!(target.health <= last);
                last = target.health;
                if was_dead {
                    prop_assert!(!target.is_alive());
                }
                was_dead = !target.is_alive();
                prop_assert!(target.health > 0 || !target.is_alive());
            }
        }
    }
}

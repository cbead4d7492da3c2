//! Fixed-timestep rigid body world
//!
//! Owns every body in the arena: static level boxes, the player cylinder,
//! kinematic target colliders and short-lived debris. Only the player and
//! debris are dynamic. Collision response is positional push-out against
//! static and kinematic bodies; dynamic bodies never collide with each other.

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::bounds::{Aabb, Obb, Ray, Sphere, Transform};
use super::target::TargetId;

/// Stable identifier for a body. Stale handles resolve to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(u32);

/// Collider shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Upright cylinder centred on the body position
    Cylinder { radius: f32, half_height: f32 },
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

/// How the world treats a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Never moves
    Static,
    /// Moved by gameplay code, not by the solver
    Kinematic,
    /// Integrated and pushed out of static/kinematic geometry
    Dynamic,
}

/// Collision group bits used to filter ray queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Groups(pub u8);

impl Groups {
    pub const LEVEL: Self = Self(1 << 0);
    pub const PLAYER: Self = Self(1 << 1);
    pub const TARGET: Self = Self(1 << 2);
    pub const DEBRIS: Self = Self(1 << 3);
    pub const ALL: Self = Self(0xff);

    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for Groups {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Who a body belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Level,
    Player,
    Target(TargetId),
    Debris,
}

impl Owner {
    fn groups(self) -> Groups {
        match self {
            Owner::Level => Groups::LEVEL,
            Owner::Player => Groups::PLAYER,
            Owner::Target(_) => Groups::TARGET,
            Owner::Debris => Groups::DEBRIS,
        }
    }
}

/// A rigid body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub kind: BodyKind,
    pub shape: Shape,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Fixed orientation about +Y
    pub yaw: f32,
    /// 0 for static and kinematic bodies
    pub mass: f32,
    /// Multiplier on world gravity (the player integrates its own gravity)
    pub gravity_scale: f32,
    /// Fraction of velocity lost per second
    pub linear_damping: f32,
    /// Bounciness against static geometry
    pub restitution: f32,
}

impl RigidBody {
    pub fn fixed(shape: Shape, position: Vec3) -> Self {
        Self {
            kind: BodyKind::Static,
            shape,
            position,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            mass: 0.0,
            gravity_scale: 0.0,
            linear_damping: 0.0,
            restitution: 0.0,
        }
    }

    pub fn kinematic(shape: Shape, position: Vec3) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            ..Self::fixed(shape, position)
        }
    }

    pub fn dynamic(shape: Shape, position: Vec3, mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            mass: mass.max(f32::EPSILON),
            gravity_scale: 1.0,
            ..Self::fixed(shape, position)
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }

    /// World-space bounds of the collider
    pub fn aabb(&self) -> Aabb {
        match self.shape {
            Shape::Cylinder {
                radius,
                half_height,
            } => Aabb::from_center_half(self.position, Vec3::new(radius, half_height, radius)),
            Shape::Box { half_extents } => self.obb(half_extents).to_aabb(),
            Shape::Sphere { radius } => Aabb::from_center_half(self.position, Vec3::splat(radius)),
        }
    }

    fn obb(&self, half_extents: Vec3) -> Obb {
        let local = Aabb::from_center_half(Vec3::ZERO, half_extents);
        Obb::from_local(&local, &Transform::from_translation_yaw(self.position, self.yaw))
    }
}

/// Closest surface hit from a ray query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub body: BodyHandle,
}

/// Penetration of a dynamic body into a solid one
#[derive(Debug, Clone, Copy)]
struct Contact {
    /// Points from the solid toward the dynamic body
    normal: Vec3,
    depth: f32,
}

#[derive(Debug, Clone)]
struct Slot {
    handle: BodyHandle,
    owner: Owner,
    body: RigidBody,
}

/// The physics world
#[derive(Debug, Clone)]
pub struct PhysicsWorld {
    gravity: Vec3,
    /// Sorted by handle for deterministic iteration
    slots: Vec<Slot>,
    /// Body → owning entity; mirrors `slots`
    owners: HashMap<BodyHandle, Owner>,
    accumulator: f32,
    next_handle: u32,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -crate::consts::WORLD_GRAVITY, 0.0))
    }
}

impl PhysicsWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            slots: Vec::new(),
            owners: HashMap::new(),
            accumulator: 0.0,
            next_handle: 1,
        }
    }

    /// Insert a body and record its owner
    pub fn add_body(&mut self, body: RigidBody, owner: Owner) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.slots.push(Slot {
            handle,
            owner,
            body,
        });
        self.owners.insert(handle, owner);
        handle
    }

    /// Remove a body; removing twice is a no-op
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        self.owners.remove(&handle)?;
        let index = self.index_of(handle)?;
        Some(self.slots.remove(index).body)
    }

    /// Drop every body owned by `owner`'s category (e.g. all level geometry)
    pub fn remove_where(&mut self, mut predicate: impl FnMut(Owner) -> bool) -> usize {
        let before = self.slots.len();
        self.slots.retain(|slot| !predicate(slot.owner));
        self.owners.retain(|_, owner| !predicate(*owner));
        before - self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.owners.clear();
        self.accumulator = 0.0;
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.index_of(handle).map(|i| &self.slots[i].body)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.index_of(handle).map(|i| &mut self.slots[i].body)
    }

    /// Owning entity of a collider (O(1))
    pub fn owner_of(&self, handle: BodyHandle) -> Option<Owner> {
        self.owners.get(&handle).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn count_owned(&self, mut predicate: impl FnMut(Owner) -> bool) -> usize {
        self.slots.iter().filter(|s| predicate(s.owner)).count()
    }

    /// Move a kinematic or static body (no-op for stale handles)
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec3, yaw: f32) {
        if let Some(body) = self.body_mut(handle) {
            body.position = position;
            body.yaw = yaw;
        }
    }

    fn index_of(&self, handle: BodyHandle) -> Option<usize> {
        self.slots.binary_search_by_key(&handle, |s| s.handle).ok()
    }

    /// Advance by whole `fixed_dt` substeps drawn from accumulated frame time.
    ///
    /// Runs at most `max_substeps`; leftover time beyond the cap is dropped so
    /// a slow frame never snowballs. Returns the number of substeps taken.
    pub fn step(&mut self, fixed_dt: f32, frame_dt: f32, max_substeps: u32) -> u32 {
        if fixed_dt <= 0.0 {
            return 0;
        }
        self.accumulator += frame_dt.max(0.0);

        let mut substeps = 0;
        while self.accumulator >= fixed_dt && substeps < max_substeps {
            self.substep(fixed_dt);
            self.accumulator -= fixed_dt;
            substeps += 1;
        }

        if self.accumulator >= fixed_dt {
            log::debug!(
                "physics fell behind by {:.3}s, dropping backlog",
                self.accumulator
            );
            self.accumulator %= fixed_dt;
        }
        substeps
    }

    fn substep(&mut self, dt: f32) {
        let solids: Vec<RigidBody> = self
            .slots
            .iter()
            .filter(|s| s.body.kind != BodyKind::Dynamic)
            .map(|s| s.body.clone())
            .collect();

        for slot in self.slots.iter_mut() {
            let body = &mut slot.body;
            if body.kind != BodyKind::Dynamic {
                continue;
            }

            body.velocity += self.gravity * body.gravity_scale * dt;
            if body.linear_damping > 0.0 {
                body.velocity *= (1.0 - body.linear_damping * dt).max(0.0);
            }
            body.position += body.velocity * dt;

            for solid in &solids {
                if let Some(contact) = contact(body, solid) {
                    body.position += contact.normal * contact.depth;
                    let into = body.velocity.dot(contact.normal);
                    if into < 0.0 {
                        body.velocity -= contact.normal * into * (1.0 + body.restitution);
                    }
                }
            }
        }
    }

    /// Nearest surface hit on the segment `from → to`, filtered by group
    pub fn raycast_closest(&self, from: Vec3, to: Vec3, mask: Groups) -> Option<RayHit> {
        let (ray, length) = Ray::between(from, to);
        self.slots
            .iter()
            .filter(|slot| slot.owner.groups().intersects(mask))
            .filter_map(|slot| {
                let hit = ray_body(&ray, length, &slot.body)?;
                Some(RayHit {
                    point: ray.at(hit.0),
                    normal: hit.1,
                    distance: hit.0,
                    body: slot.handle,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

fn ray_body(ray: &Ray, max_distance: f32, body: &RigidBody) -> Option<(f32, Vec3)> {
    let hit = match body.shape {
        Shape::Box { half_extents } => body.obb(half_extents).ray_intersection(ray, max_distance),
        Shape::Sphere { radius } => Sphere {
            center: body.position,
            radius,
        }
        .ray_intersection(ray, max_distance),
        Shape::Cylinder {
            radius,
            half_height,
        } => return ray_cylinder(ray, max_distance, body.position, radius, half_height),
    }?;
    Some((hit.distance, hit.normal))
}

/// Ray against a finite upright cylinder (side wall and caps)
fn ray_cylinder(
    ray: &Ray,
    max_distance: f32,
    center: Vec3,
    radius: f32,
    half_height: f32,
) -> Option<(f32, Vec3)> {
    let (bottom, top) = (center.y - half_height, center.y + half_height);
    let mut best: Option<(f32, Vec3)> = None;
    let mut consider = |t: f32, normal: Vec3| {
        if (0.0..=max_distance).contains(&t) && best.is_none_or(|(b, _)| t < b) {
            best = Some((t, normal));
        }
    };

    // Side wall
    let ox = ray.origin.x - center.x;
    let oz = ray.origin.z - center.z;
    let a = ray.dir.x * ray.dir.x + ray.dir.z * ray.dir.z;
    if a > 1e-8 {
        let b = ox * ray.dir.x + oz * ray.dir.z;
        let c = ox * ox + oz * oz - radius * radius;
        let discriminant = b * b - a * c;
        if discriminant >= 0.0 {
            let t = (-b - discriminant.sqrt()) / a;
            let y = ray.origin.y + ray.dir.y * t;
            if (bottom..=top).contains(&y) {
                let p = ray.at(t);
                consider(
                    t,
                    Vec3::new(p.x - center.x, 0.0, p.z - center.z).normalize_or_zero(),
                );
            }
        }
    }

    // Caps
    if ray.dir.y.abs() > 1e-8 {
        for (cap_y, normal) in [(top, Vec3::Y), (bottom, Vec3::NEG_Y)] {
            let t = (cap_y - ray.origin.y) / ray.dir.y;
            let p = ray.at(t);
            let dx = p.x - center.x;
            let dz = p.z - center.z;
            if dx * dx + dz * dz <= radius * radius {
                consider(t, normal);
            }
        }
    }

    best
}

/// Push-out contact of a dynamic body against a static or kinematic body
fn contact(body: &RigidBody, solid: &RigidBody) -> Option<Contact> {
    match solid.shape {
        Shape::Box { .. } => {
            let aabb = solid.aabb();
            match body.shape {
                Shape::Cylinder {
                    radius,
                    half_height,
                } => cylinder_vs_box(body.position, radius, half_height, &aabb),
                Shape::Sphere { radius } => sphere_vs_box(body.position, radius, &aabb),
                Shape::Box { .. } => box_vs_box(&body.aabb(), &aabb),
            }
        }
        Shape::Sphere { radius } => {
            let closest = match body.shape {
                Shape::Cylinder { half_height, .. } => Vec3::new(
                    body.position.x,
                    solid
                        .position
                        .y
                        .clamp(body.position.y - half_height, body.position.y + half_height),
                    body.position.z,
                ),
                _ => body.position,
            };
            let body_radius = match body.shape {
                Shape::Cylinder { radius, .. } | Shape::Sphere { radius } => radius,
                Shape::Box { half_extents } => half_extents.max_element(),
            };
            let offset = closest - solid.position;
            let distance = offset.length();
            let reach = radius + body_radius;
            if distance >= reach {
                return None;
            }
            let normal = if distance > 1e-6 {
                offset / distance
            } else {
                Vec3::Y
            };
            Some(Contact {
                normal,
                depth: reach - distance,
            })
        }
        // Cylinders are only ever dynamic (the player)
        Shape::Cylinder { .. } => None,
    }
}

fn cylinder_vs_box(center: Vec3, radius: f32, half_height: f32, aabb: &Aabb) -> Option<Contact> {
    let push_up = aabb.max.y - (center.y - half_height);
    let push_down = (center.y + half_height) - aabb.min.y;
    if push_up <= 0.0 || push_down <= 0.0 {
        return None;
    }

    let closest_x = center.x.clamp(aabb.min.x, aabb.max.x);
    let closest_z = center.z.clamp(aabb.min.z, aabb.max.z);
    let dx = center.x - closest_x;
    let dz = center.z - closest_z;
    let dist_sq = dx * dx + dz * dz;

    let (side_normal, side_depth) = if dist_sq > 1e-12 {
        let dist = dist_sq.sqrt();
        if dist >= radius {
            return None;
        }
        (Vec3::new(dx / dist, 0.0, dz / dist), radius - dist)
    } else {
        // Centre is inside the footprint: leave through the nearest side
        let sides = [
            (Vec3::NEG_X, center.x - aabb.min.x),
            (Vec3::X, aabb.max.x - center.x),
            (Vec3::NEG_Z, center.z - aabb.min.z),
            (Vec3::Z, aabb.max.z - center.z),
        ];
        let (normal, gap) = sides
            .into_iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((Vec3::X, 0.0));
        (normal, gap + radius)
    };

    let candidates = [
        (Vec3::Y, push_up),
        (Vec3::NEG_Y, push_down),
        (side_normal, side_depth),
    ];
    candidates
        .into_iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(normal, depth)| Contact { normal, depth })
}

fn sphere_vs_box(center: Vec3, radius: f32, aabb: &Aabb) -> Option<Contact> {
    let closest = aabb.closest_point(center);
    let offset = center - closest;
    let dist_sq = offset.length_squared();
    if dist_sq > 1e-12 {
        let dist = dist_sq.sqrt();
        if dist >= radius {
            return None;
        }
        return Some(Contact {
            normal: offset / dist,
            depth: radius - dist,
        });
    }
    // Centre inside the box
    let inner = Aabb::from_center_half(center, Vec3::splat(radius));
    box_vs_box(&inner, aabb)
}

fn box_vs_box(moving: &Aabb, solid: &Aabb) -> Option<Contact> {
    if !moving.intersects(solid) {
        return None;
    }
    let faces = [
        (Vec3::X, solid.max.x - moving.min.x),
        (Vec3::NEG_X, moving.max.x - solid.min.x),
        (Vec3::Y, solid.max.y - moving.min.y),
        (Vec3::NEG_Y, moving.max.y - solid.min.y),
        (Vec3::Z, solid.max.z - moving.min.z),
        (Vec3::NEG_Z, moving.max.z - solid.min.z),
    ];
    faces
        .into_iter()
        .filter(|(_, depth)| *depth > 0.0)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(normal, depth)| Contact { normal, depth })
}

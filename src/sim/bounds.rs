//! Bounding volumes and ray queries
//!
//! Axis-aligned boxes serve as the broadphase and as static level colliders;
//! oriented boxes and spheres are the narrowphase hit proxies for targets.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A ray with a normalized direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    /// Build a ray; the direction is normalized (zero stays zero and never hits)
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    /// Ray through two points, plus the distance between them
    pub fn between(from: Vec3, to: Vec3) -> (Self, f32) {
        let delta = to - from;
        (Self::new(from, delta), delta.length())
    }

    #[inline]
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.dir * distance
    }

    fn is_degenerate(&self) -> bool {
        self.dir.length_squared() < 0.5
    }
}

/// Where a ray met a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub distance: f32,
    /// Outward surface normal at the hit
    pub normal: Vec3,
}

/// Rigid transform with uniform scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: 1.0,
        }
    }

    /// Rotation about +Y only
    pub fn from_translation_yaw(translation: Vec3, yaw: f32) -> Self {
        Self {
            translation,
            rotation: Quat::from_rotation_y(yaw),
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Local point to world space
    #[inline]
    pub fn apply(&self, local: Vec3) -> Vec3 {
        self.translation + self.rotation * (local * self.scale)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_half(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Tight box around a point set (`None` when empty)
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// World-space box enclosing this box after a transform
    pub fn transformed(&self, transform: &Transform) -> Aabb {
        let corners = self.corners().map(|c| transform.apply(c));
        Self::from_points(corners).unwrap_or(*self)
    }

    /// Closest point inside the box to `p`
    #[inline]
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    /// Slab test. A ray starting inside reports distance 0.
    pub fn ray_intersection(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        if ray.is_degenerate() {
            return None;
        }
        let mut t_min = 0.0_f32;
        let mut t_max = max_distance;
        let mut normal = -ray.dir;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < 1e-8 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            if t1 > t_min {
                t_min = t1;
                let mut n = Vec3::ZERO;
                n[axis] = -dir.signum();
                normal = n;
            }
            t_max = t_max.min(t2);

            if t_min > t_max {
                return None;
            }
        }

        Some(SurfaceHit {
            distance: t_min,
            normal,
        })
    }
}

/// Oriented bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obb {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
}

impl Obb {
    /// OBB of a local-space box placed by `transform`
    pub fn from_local(local: &Aabb, transform: &Transform) -> Self {
        Self {
            center: transform.apply(local.center()),
            half_extents: local.half_extents() * transform.scale.abs(),
            rotation: transform.rotation,
        }
    }

    /// Enclosing axis-aligned box
    pub fn to_aabb(&self) -> Aabb {
        let local = Aabb::from_center_half(Vec3::ZERO, self.half_extents);
        let corners = local.corners().map(|c| self.center + self.rotation * c);
        Aabb::from_points(corners).unwrap_or(local)
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        let local = self.rotation.inverse() * (p - self.center);
        local.abs().cmple(self.half_extents).all()
    }

    /// Ray test in the box's local frame
    pub fn ray_intersection(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        let inverse = self.rotation.inverse();
        let local_ray = Ray {
            origin: inverse * (ray.origin - self.center),
            dir: inverse * ray.dir,
        };
        let local_box = Aabb::from_center_half(Vec3::ZERO, self.half_extents);
        local_box
            .ray_intersection(&local_ray, max_distance)
            .map(|hit| SurfaceHit {
                distance: hit.distance,
                normal: self.rotation * hit.normal,
            })
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    /// Axis-aligned box around the sphere
    pub fn to_aabb(&self) -> Aabb {
        Aabb::from_center_half(self.center, Vec3::splat(self.radius))
    }

    pub fn ray_intersection(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceHit> {
        if ray.is_degenerate() {
            return None;
        }
        let m = ray.origin - self.center;
        let b = m.dot(ray.dir);
        let c = m.length_squared() - self.radius * self.radius;
        // Outside and pointing away
        if c > 0.0 && b > 0.0 {
            return None;
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let distance = (-b - discriminant.sqrt()).max(0.0);
        if distance > max_distance {
            return None;
        }
        let normal = (ray.at(distance) - self.center).normalize_or_zero();
        Some(SurfaceHit {
            distance,
            normal: if normal == Vec3::ZERO { -ray.dir } else { normal },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_aabb_ray_hit_face_normal() {
        let aabb = Aabb::from_center_half(Vec3::new(0.0, 0.0, -5.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hit = aabb.ray_intersection(&ray, f32::INFINITY).expect("should hit");
        assert!((hit.distance - 4.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);

        // Coming from the other side reports the opposite face
        let ray = Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::Z);
        let hit = aabb.ray_intersection(&ray, f32::INFINITY).expect("should hit");
        assert!((hit.distance - 4.0).abs() < 1e-5);
        assert!((hit.normal - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_aabb_ray_respects_max_distance_and_misses() {
        let aabb = Aabb::from_center_half(Vec3::new(0.0, 0.0, -5.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(aabb.ray_intersection(&ray, 3.0).is_none());
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(aabb.ray_intersection(&ray, 100.0).is_none());
        let ray = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z);
        assert!(aabb.ray_intersection(&ray, 100.0).is_none());
    }

    #[test]
    fn test_aabb_ray_from_inside() {
        let aabb = Aabb::from_center_half(Vec3::ZERO, Vec3::splat(1.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let hit = aabb.ray_intersection(&ray, 10.0).expect("inside counts as hit");
        assert_eq!(hit.distance, 0.0);
    }

    #[test]
    fn test_transformed_aabb_grows_under_rotation() {
        let local = Aabb::from_center_half(Vec3::ZERO, Vec3::new(1.0, 0.5, 1.0));
        let transform = Transform::from_translation_yaw(Vec3::new(2.0, 0.0, 0.0), FRAC_PI_4);
        let world = local.transformed(&transform);
        let expected = 2.0_f32.sqrt();
        assert!((world.half_extents().x - expected).abs() < 1e-4);
        assert!((world.half_extents().y - 0.5).abs() < 1e-5);
        assert!((world.center() - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_obb_is_tighter_than_aabb() {
        // A long thin box rotated 45°: the corner region of its AABB is empty
        let local = Aabb::from_center_half(Vec3::ZERO, Vec3::new(2.0, 0.2, 0.2));
        let transform = Transform::from_translation_yaw(Vec3::ZERO, FRAC_PI_4);
        let obb = Obb::from_local(&local, &transform);
        let aabb = obb.to_aabb();

        let corner_ray = Ray::new(Vec3::new(1.2, 5.0, 0.0), Vec3::NEG_Y);
        assert!(aabb.ray_intersection(&corner_ray, 100.0).is_some());
        assert!(obb.ray_intersection(&corner_ray, 100.0).is_none());

        let center_ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let hit = obb.ray_intersection(&center_ray, 100.0).expect("center should hit");
        assert!(hit.distance > 4.5 && hit.distance < 5.0);
    }

    #[test]
    fn test_obb_scale_and_containment() {
        let local = Aabb::from_center_half(Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5));
        let transform = Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)).with_scale(2.0);
        let obb = Obb::from_local(&local, &transform);
        assert!((obb.center - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
        assert!((obb.half_extents - Vec3::splat(1.0)).length() < 1e-5);
        assert!(obb.contains_point(Vec3::new(0.9, 2.9, -0.9)));
        assert!(!obb.contains_point(Vec3::new(0.0, 3.1, 0.0)));
    }

    #[test]
    fn test_sphere_ray() {
        let sphere = Sphere {
            center: Vec3::new(0.0, 0.0, -10.0),
            radius: 1.0,
        };
        let hit = sphere
            .ray_intersection(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), f32::INFINITY)
            .expect("should hit");
        assert!((hit.distance - 9.0).abs() < 1e-4);
        assert!((hit.normal - Vec3::Z).length() < 1e-4);

        // Grazing past the edge
        let miss = Ray::new(Vec3::new(1.1, 0.0, 0.0), Vec3::NEG_Z);
        assert!(sphere.ray_intersection(&miss, f32::INFINITY).is_none());
        // Behind the origin
        assert!(sphere
            .ray_intersection(&Ray::new(Vec3::ZERO, Vec3::Z), f32::INFINITY)
            .is_none());
    }

    #[test]
    fn test_from_points_empty() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }
}

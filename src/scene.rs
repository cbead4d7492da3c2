//! Data-driven arena descriptions
//!
//! A scene lists static boxes, target spawn points and the player spawn.
//! [`SceneBuilder`] turns one into static colliders, replacing whatever
//! level geometry the world held before.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::ModeKind;
use crate::error::ConfigError;
use crate::sim::physics::{BodyHandle, Owner, PhysicsWorld, RigidBody, Shape};

/// Thickness of the generated ground slab
const GROUND_THICKNESS: f32 = 1.0;

/// A static box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticBox {
    /// Full edge lengths
    pub size: Vec3,
    /// Centre
    pub pos: Vec3,
    #[serde(default)]
    pub color: String,
}

/// A named target spawn point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub id: String,
    pub pos: Vec3,
}

/// Arena layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub name: String,
    /// Camera position at spawn; the feet are `eye_height` below it
    pub player_spawn: Vec3,
    #[serde(default)]
    pub statics: Vec<StaticBox>,
    #[serde(default)]
    pub spawns: Vec<SpawnPoint>,
    /// Edge length of a generated ground slab with its top at y = 0
    #[serde(default)]
    pub ground_size: Option<f32>,
}

fn boxes(specs: &[([f32; 3], [f32; 3], &str)]) -> Vec<StaticBox> {
    specs
        .iter()
        .map(|(size, pos, color)| StaticBox {
            size: Vec3::from_array(*size),
            pos: Vec3::from_array(*pos),
            color: color.to_string(),
        })
        .collect()
}

fn spawns(specs: &[(&str, [f32; 3])]) -> Vec<SpawnPoint> {
    specs
        .iter()
        .map(|(id, pos)| SpawnPoint {
            id: id.to_string(),
            pos: Vec3::from_array(*pos),
        })
        .collect()
}

impl SceneConfig {
    /// Open arena with two side ledges
    pub fn prototype() -> Self {
        Self {
            name: "Prototype Arena".to_string(),
            player_spawn: Vec3::new(0.0, 1.6, 10.0),
            statics: boxes(&[
                ([15.0, 1.2, 2.0], [-10.0, 0.5, 4.0], "#3a4356"),
                ([15.0, 1.2, 2.0], [10.0, 0.5, 4.0], "#3a4356"),
            ]),
            spawns: spawns(&[
                ("p1", [-8.0, 1.2, -2.0]),
                ("p2", [-4.0, 1.2, -5.0]),
                ("p3", [0.0, 1.2, -8.0]),
                ("p4", [4.0, 1.2, -5.0]),
                ("p5", [8.0, 1.2, -2.0]),
                ("p6", [-6.0, 1.2, 2.0]),
                ("p7", [0.0, 1.2, 0.0]),
                ("p8", [6.0, 1.2, 2.0]),
            ]),
            ground_size: Some(200.0),
        }
    }

    /// Enclosed hangar with its own floor and cover blocks
    pub fn full() -> Self {
        Self {
            name: "Full Hangar".to_string(),
            player_spawn: Vec3::new(0.0, 1.6, 12.0),
            statics: boxes(&[
                ([40.0, 1.0, 40.0], [0.0, -0.5, 0.0], "#121825"),
                ([4.0, 3.0, 18.0], [0.0, 1.5, -10.0], "#1e2536"),
                ([10.0, 2.0, 2.0], [-10.0, 1.0, 2.0], "#1e2536"),
                ([10.0, 2.0, 2.0], [10.0, 1.0, 2.0], "#1e2536"),
                ([6.0, 0.8, 6.0], [0.0, 0.4, 0.0], "#1a2030"),
            ]),
            spawns: spawns(&[
                ("f1", [-10.0, 1.4, -6.0]),
                ("f2", [-5.0, 1.4, -10.0]),
                ("f3", [0.0, 1.4, -8.0]),
                ("f4", [5.0, 1.4, -10.0]),
                ("f5", [10.0, 1.4, -6.0]),
                ("f6", [-8.0, 1.4, 0.0]),
                ("f7", [0.0, 1.4, -2.0]),
                ("f8", [8.0, 1.4, 0.0]),
            ]),
            ground_size: None,
        }
    }

    pub fn for_mode(kind: ModeKind) -> Self {
        match kind {
            ModeKind::Prototype => Self::prototype(),
            ModeKind::Full => Self::full(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn spawn_points(&self) -> Vec<Vec3> {
        self.spawns.iter().map(|s| s.pos).collect()
    }
}

/// Result of building a scene into the world
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltScene {
    pub statics: Vec<BodyHandle>,
    pub spawn_points: Vec<Vec3>,
    /// Player feet position
    pub player_feet: Vec3,
}

/// Builds static level colliders from a [`SceneConfig`]
pub struct SceneBuilder;

impl SceneBuilder {
    /// Replace the world's level geometry with `scene`
    pub fn build(scene: &SceneConfig, eye_height: f32, world: &mut PhysicsWorld) -> BuiltScene {
        let removed = world.remove_where(|owner| owner == Owner::Level);
        if removed > 0 {
            log::debug!("cleared {removed} level colliders");
        }

        let mut statics = Vec::with_capacity(scene.statics.len() + 1);
        if let Some(size) = scene.ground_size.filter(|s| *s > 0.0) {
            let slab = RigidBody::fixed(
                Shape::Box {
                    half_extents: Vec3::new(size, GROUND_THICKNESS, size) * 0.5,
                },
                Vec3::new(0.0, -GROUND_THICKNESS * 0.5, 0.0),
            );
            statics.push(world.add_body(slab, Owner::Level));
        }
        for block in &scene.statics {
            let body = RigidBody::fixed(
                Shape::Box {
                    half_extents: block.size.abs() * 0.5,
                },
                block.pos,
            );
            statics.push(world.add_body(body, Owner::Level));
        }

        log::info!(
            "scene '{}' built: {} static colliders, {} spawn points",
            scene.name,
            statics.len(),
            scene.spawns.len()
        );

        BuiltScene {
            statics,
            spawn_points: scene.spawn_points(),
            player_feet: scene.player_spawn - Vec3::Y * eye_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::physics::Groups;

    #[test]
    fn test_prototype_builds_ground_and_ledges() {
        let mut world = PhysicsWorld::default();
        let built = SceneBuilder::build(&SceneConfig::prototype(), 1.6, &mut world);
        assert_eq!(built.statics.len(), 3);
        assert_eq!(built.spawn_points.len(), 8);
        assert!((built.player_feet - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-5);

        let hit = world
            .raycast_closest(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -5.0, 0.0), Groups::LEVEL)
            .unwrap();
        assert!(hit.point.y.abs() < 1e-4);
    }

    #[test]
    fn test_rebuild_replaces_level_only() {
        let mut world = PhysicsWorld::default();
        world.add_body(
            RigidBody::kinematic(Shape::Sphere { radius: 0.5 }, Vec3::ZERO),
            Owner::Debris,
        );
        SceneBuilder::build(&SceneConfig::prototype(), 1.6, &mut world);
        SceneBuilder::build(&SceneConfig::full(), 1.6, &mut world);
        assert_eq!(world.count_owned(|o| o == Owner::Level), 5);
        assert_eq!(world.count_owned(|o| o == Owner::Debris), 1);
    }

    #[test]
    fn test_scene_from_json() {
        let json = r#"{
            "name": "tiny",
            "player_spawn": [0.0, 1.6, 0.0],
            "spawns": [{"id": "a", "pos": [1.0, 1.2, -3.0]}]
        }"#;
        let scene = SceneConfig::from_json(json).unwrap();
        assert!(scene.statics.is_empty());
        assert_eq!(scene.ground_size, None);
        assert_eq!(scene.spawn_points(), vec![Vec3::new(1.0, 1.2, -3.0)]);
        assert!(SceneConfig::from_json("{").is_err());
    }
}

//! In-scene overlay plates
//!
//! A row of five flat plates at the player's feet. Shooting a side plate
//! nudges mouse sensitivity; the centre plate only displays it. Plates are
//! tested before targets and swallow the shot.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::bounds::{Aabb, Ray};
use crate::consts::{MAX_SENSITIVITY, MIN_SENSITIVITY};

const PLATE_WIDTH: f32 = 1.2;
const PLATE_DEPTH: f32 = 0.8;
const PLATE_HEIGHT: f32 = 0.1;
const PLATE_SPACING: f32 = 1.4;
const PLATE_Y: f32 = 0.05;

/// Distance of the plate row in front of the player spawn
pub const PLATE_ROW_OFFSET: f32 = 2.0;

/// One hittable plate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plate {
    pub label: String,
    /// Sensitivity change when shot; 0 for the display plate
    pub delta: f32,
    pub color: String,
    pub bounds: Aabb,
}

/// A plate struck by a shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateHit {
    pub index: usize,
    pub distance: f32,
    pub delta: f32,
}

/// All overlay plates in the scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelBoard {
    plates: Vec<Plate>,
}

impl PanelBoard {
    /// No plates at all (headless runs)
    pub fn empty() -> Self {
        Self::default()
    }

    /// The sensitivity row centred on x = 0 at depth `z`
    pub fn sensitivity_row(z: f32) -> Self {
        let layout = [
            ("-0.01", -0.001, "#ff6666"),
            ("-0.1", -0.0005, "#ffaa66"),
            ("SENS", 0.0, "#ffc800"),
            ("+0.1", 0.0005, "#66ff66"),
            ("+0.01", 0.001, "#66ffaa"),
        ];
        let plates = layout
            .iter()
            .enumerate()
            .map(|(i, (label, delta, color))| {
                let center = Vec3::new((i as f32 - 2.0) * PLATE_SPACING, PLATE_Y, z);
                Plate {
                    label: label.to_string(),
                    delta: *delta,
                    color: color.to_string(),
                    bounds: Aabb::from_center_half(
                        center,
                        Vec3::new(PLATE_WIDTH, PLATE_HEIGHT, PLATE_DEPTH) * 0.5,
                    ),
                }
            })
            .collect();
        Self { plates }
    }

    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    /// Nearest plate along the ray
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<PlateHit> {
        self.plates
            .iter()
            .enumerate()
            .filter_map(|(index, plate)| {
                plate
                    .bounds
                    .ray_intersection(ray, max_distance)
                    .map(|hit| PlateHit {
                        index,
                        distance: hit.distance,
                        delta: plate.delta,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl PlateHit {
    /// Sensitivity after this hit, clamped to the supported range
    pub fn adjust(&self, sensitivity: f32) -> f32 {
        if self.delta == 0.0 {
            return sensitivity;
        }
        (sensitivity + self.delta).clamp(MIN_SENSITIVITY, MAX_SENSITIVITY)
    }
}

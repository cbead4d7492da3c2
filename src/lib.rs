//! Range Drill - A first-person aim training range
//!
//! Core modules:
//! - `sim`: Deterministic simulation (character controller, physics, targets, waves, weapons)
//! - `config`: Gameplay, mode and weapon tuning tables
//! - `scene`: Data-driven arena descriptions turned into static colliders
//! - `platform`: Input seam and browser bindings
//! - `settings`: Player preferences (sensitivity, game mode)
//! - `history`: Per-second score timeline for the session summary

pub mod config;
pub mod error;
pub mod history;
pub mod platform;
pub mod scene;
pub mod settings;
pub mod sim;

pub use config::{GameplayConfig, ModeConfig, WeaponConfig};
pub use error::{AssetError, ConfigError};
pub use settings::{GameMode, Settings};

use glam::Vec3;

/// Simulation constants
pub mod consts {
    /// Fixed physics timestep (60 Hz)
    pub const PHYSICS_DT: f32 = 1.0 / 60.0;
    /// Maximum physics substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 5;
    /// Longest frame the session will accept before clamping (tab switches, breakpoints)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// World gravity for free bodies (debris), m/s²
    pub const WORLD_GRAVITY: f32 = 9.82;

    /// Player collider (upright cylinder)
    pub const PLAYER_RADIUS: f32 = 0.4;
    pub const PLAYER_HEIGHT: f32 = 1.8;
    /// Extra reach of the grounding ray below the collider
    pub const GROUND_PROBE_MARGIN: f32 = 0.1;
    /// Minimum vertical normal component that counts as walkable ground
    pub const GROUND_NORMAL_MIN_Y: f32 = 0.7;

    /// Pitch limit margin from straight up/down (radians)
    pub const PITCH_MARGIN: f32 = 0.05;
    /// Eye height interpolation rate (1/s)
    pub const EYE_HEIGHT_RATE: f32 = 15.0;
    /// Player body mass, kg
    pub const PLAYER_MASS: f32 = 80.0;

    /// Mouse sensitivity (radians per pixel)
    pub const DEFAULT_SENSITIVITY: f32 = 0.0025;
    pub const MIN_SENSITIVITY: f32 = 0.0001;
    pub const MAX_SENSITIVITY: f32 = 0.02;

    /// Score awarded per kill / per non-lethal hit
    pub const KILL_SCORE: u64 = 100;
    pub const HIT_SCORE: u64 = 25;

    /// Debris fragments per destroyed target
    pub const DEBRIS_PER_TARGET: usize = 10;
    /// Vertex count above which a model target collides as a sphere
    pub const PROXY_VERTEX_THRESHOLD: usize = 100;
}

/// Horizontal forward direction for a yaw angle (-Z is forward at yaw 0)
#[inline]
pub fn yaw_forward(yaw: f32) -> Vec3 {
    Vec3::new(-yaw.sin(), 0.0, -yaw.cos())
}

/// Horizontal right direction for a yaw angle
#[inline]
pub fn yaw_right(yaw: f32) -> Vec3 {
    Vec3::new(yaw.cos(), 0.0, -yaw.sin())
}

/// View direction for a yaw/pitch pair (YXZ euler order)
#[inline]
pub fn view_direction(yaw: f32, pitch: f32) -> Vec3 {
    let cos_pitch = pitch.cos();
    Vec3::new(-yaw.sin() * cos_pitch, pitch.sin(), -yaw.cos() * cos_pitch)
}

/// Accuracy percentage; zero shots yields 0
#[inline]
pub fn accuracy(hits: u32, shots: u32) -> f32 {
    if shots == 0 {
        0.0
    } else {
        hits as f32 / shots as f32 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaw_basis_is_orthonormal() {
        for yaw in [0.0_f32, 0.7, -2.1, 3.0] {
            let f = yaw_forward(yaw);
            let r = yaw_right(yaw);
            assert!((f.length() - 1.0).abs() < 1e-5);
            assert!((r.length() - 1.0).abs() < 1e-5);
            assert!(f.dot(r).abs() < 1e-5);
        }
        // At yaw 0 forward is -Z, right is +X
        assert!((yaw_forward(0.0) - Vec3::NEG_Z).length() < 1e-6);
        assert!((yaw_right(0.0) - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_view_direction_matches_yaw_when_level() {
        let yaw = 1.2;
        assert!((view_direction(yaw, 0.0) - yaw_forward(yaw)).length() < 1e-5);
        assert!(view_direction(0.0, 0.5).y > 0.0);
    }

    #[test]
    fn test_accuracy_zero_shots() {
        assert_eq!(accuracy(0, 0), 0.0);
        assert!((accuracy(3, 4) - 75.0).abs() < 1e-4);
    }
}

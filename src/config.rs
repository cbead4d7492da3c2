//! Gameplay, mode and weapon tuning tables
//!
//! Every table is an immutable value handed to the systems that need it by
//! reference. Defaults carry the shipped tuning; JSON overrides go through
//! [`GameplayConfig::from_json`], which validates before anything is built.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Player movement tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Base walk speed (m/s)
    pub move_speed: f32,
    pub sprint_multiplier: f32,
    /// Crouched movement is this fraction of normal speed
    pub crouch_speed_multiplier: f32,
    /// Crouched eye height as a fraction of standing eye height
    pub crouch_height_offset: f32,
    /// Horizontal speed clamp
    pub max_speed: f32,
    /// Blend rate toward desired velocity on the ground
    pub ground_accel: f32,
    /// Additive acceleration in the air (weak, to avoid mid-air boosts)
    pub air_accel: f32,
    pub jump_strength: f32,
    pub gravity: f32,
    pub coyote_time: f32,
    pub jump_buffer_time: f32,
    /// Standing eye height above the feet
    pub eye_height: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 7.5,
            sprint_multiplier: 1.4,
            crouch_speed_multiplier: 0.65,
            crouch_height_offset: 0.5,
            max_speed: 10.0,
            ground_accel: 30.0,
            air_accel: 1.5,
            jump_strength: 8.0,
            gravity: 18.0,
            coyote_time: 0.1,
            jump_buffer_time: 0.1,
            eye_height: 1.6,
        }
    }
}

impl PlayerConfig {
    /// Eye height while crouched
    pub fn crouch_eye_height(&self) -> f32 {
        self.eye_height * self.crouch_height_offset
    }
}

/// One wave descriptor (read-only during a session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    pub id: u32,
    /// Seconds before the wave times out
    pub duration: f32,
    /// Targets spawned at wave start
    pub targets: u32,
    /// Oscillation speed multiplier for moving targets
    pub speed: f32,
    /// Fraction of targets that move (count truncated toward zero)
    pub moving_ratio: f32,
}

impl WaveConfig {
    /// Number of moving targets in this wave
    pub fn moving_count(&self) -> u32 {
        (self.targets as f32 * self.moving_ratio).floor() as u32
    }
}

/// Shared target tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_health: i32,
    pub radius: f32,
    /// Radius of the fallback spawn arc
    pub move_radius: f32,
    /// Continuous mode respawn delay (seconds)
    pub respawn_delay: f32,
    /// Outward debris speed at full strength
    pub explosion_strength: f32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_health: 30,
            radius: 0.6,
            move_radius: 6.0,
            respawn_delay: 2.5,
            explosion_strength: 6.0,
        }
    }
}

/// Complete gameplay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Session length in seconds
    pub session_length: f32,
    pub player: PlayerConfig,
    pub waves: Vec<WaveConfig>,
    pub target: TargetConfig,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        let wave = |id, duration, targets, speed, moving_ratio| WaveConfig {
            id,
            duration,
            targets,
            speed,
            moving_ratio,
        };
        Self {
            session_length: 60.0,
            player: PlayerConfig::default(),
            waves: vec![
                wave(1, 12.0, 6, 1.0, 0.2),
                wave(2, 12.0, 8, 1.2, 0.4),
                wave(3, 14.0, 10, 1.4, 0.5),
                wave(4, 14.0, 12, 1.6, 0.6),
                wave(5, 16.0, 14, 1.8, 0.7),
            ],
            target: TargetConfig::default(),
        }
    }
}

impl GameplayConfig {
    /// Parse and validate a JSON config. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the simulation relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.waves.is_empty() {
            return Err(ConfigError::NoWaves);
        }
        for wave in &self.waves {
            if wave.duration <= 0.0 {
                return Err(ConfigError::WaveDuration {
                    id: wave.id,
                    duration: wave.duration,
                });
            }
            if !(0.0..=1.0).contains(&wave.moving_ratio) {
                return Err(ConfigError::MovingRatio {
                    id: wave.id,
                    ratio: wave.moving_ratio,
                });
            }
        }
        Ok(())
    }

    /// Wave list resized to `count`, cloning the first wave as a template for
    /// waves beyond the configured list
    pub fn waves_for(&self, count: usize) -> Vec<WaveConfig> {
        let Some(template) = self.waves.first() else {
            return Vec::new();
        };
        (0..count.max(1))
            .map(|i| match self.waves.get(i) {
                Some(wave) => wave.clone(),
                None => WaveConfig {
                    id: i as u32 + 1,
                    ..template.clone()
                },
            })
            .collect()
    }
}

/// Weapon tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponConfig {
    pub name: String,
    /// Rounds per second
    pub fire_rate: f32,
    /// Reload duration in seconds
    pub reload_time: f32,
    /// Damage per hit
    pub damage: i32,
    /// Lethal weapons deal the target's remaining health (melee)
    #[serde(default)]
    pub lethal: bool,
    /// Maximum hit distance; `None` is unbounded hitscan
    #[serde(default)]
    pub range: Option<f32>,
    /// Magazine capacity; `None` never runs dry
    #[serde(default)]
    pub magazine: Option<u32>,
}

impl WeaponConfig {
    pub fn rifle(fire_rate: f32, damage: i32) -> Self {
        Self {
            name: "rifle".to_string(),
            fire_rate,
            reload_time: 1.2,
            damage,
            lethal: false,
            range: None,
            magazine: Some(30),
        }
    }

    pub fn pistol() -> Self {
        Self {
            name: "pistol".to_string(),
            fire_rate: 4.0,
            reload_time: 1.0,
            damage: 20,
            lethal: false,
            range: None,
            magazine: Some(12),
        }
    }

    pub fn knife() -> Self {
        Self {
            name: "knife".to_string(),
            fire_rate: 2.0,
            reload_time: 0.0,
            damage: 0,
            lethal: true,
            range: Some(2.5),
            magazine: None,
        }
    }

    /// Seconds between shots
    pub fn fire_interval(&self) -> f32 {
        1.0 / self.fire_rate
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fire_rate.is_finite() && self.fire_rate > 0.0) {
            return Err(ConfigError::FireRate {
                name: self.name.clone(),
                fire_rate: self.fire_rate,
            });
        }
        Ok(())
    }
}

/// How targets are represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryStyle {
    /// Spheres and cubes only
    Primitive,
    /// Mix of glTF models and primitives
    Hybrid,
}

/// A model-based target option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOption {
    pub url: String,
    pub scale: f32,
}

/// Available game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModeKind {
    #[default]
    Prototype,
    Full,
}

impl ModeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeKind::Prototype => "prototype",
            ModeKind::Full => "full",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "prototype" => Some(ModeKind::Prototype),
            "full" => Some(ModeKind::Full),
            _ => None,
        }
    }
}

/// Per-mode presentation-independent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeConfig {
    pub kind: ModeKind,
    pub label: String,
    pub geometry_style: GeometryStyle,
    /// Target colours, picked at random per spawn
    pub target_palette: Vec<String>,
    pub gltf_targets: Vec<ModelOption>,
    /// Primary weapon for this mode
    pub weapon: WeaponConfig,
}

impl ModeConfig {
    pub fn for_kind(kind: ModeKind) -> Self {
        match kind {
            ModeKind::Prototype => Self {
                kind,
                label: "Prototype".to_string(),
                geometry_style: GeometryStyle::Primitive,
                target_palette: ["#5de6ff", "#ff9f43", "#f45d79", "#8cff6b"]
                    .map(String::from)
                    .to_vec(),
                gltf_targets: Vec::new(),
                weapon: WeaponConfig::rifle(6.0, 25),
            },
            ModeKind::Full => Self {
                kind,
                label: "Full".to_string(),
                geometry_style: GeometryStyle::Hybrid,
                target_palette: ["#6dd3ff", "#ffc857", "#ff6f61", "#c792ea"]
                    .map(String::from)
                    .to_vec(),
                gltf_targets: vec![
                    ModelOption {
                        url: "/assets/models/target_drone.glb".to_string(),
                        scale: 1.1,
                    },
                    ModelOption {
                        url: "/assets/models/target_sphere.glb".to_string(),
                        scale: 0.9,
                    },
                ],
                weapon: WeaponConfig::rifle(8.0, 30),
            },
        }
    }

    /// Look up a mode by name
    pub fn by_name(name: &str) -> Result<Self, ConfigError> {
        ModeKind::from_str(name)
            .map(Self::for_kind)
            .ok_or_else(|| ConfigError::UnknownMode(name.to_string()))
    }

    /// Weapon slots: mode weapon, pistol, knife
    pub fn loadout(&self) -> Vec<WeaponConfig> {
        vec![self.weapon.clone(), WeaponConfig::pistol(), WeaponConfig::knife()]
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self::for_kind(ModeKind::Prototype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = GameplayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.waves.len(), 5);
        assert_eq!(config.waves[0].moving_count(), 1);
        assert_eq!(config.waves[4].moving_count(), 9); // floor(14 * 0.7)
    }

    #[test]
    fn test_from_json_partial_override() {
        let config =
            GameplayConfig::from_json(r#"{ "session_length": 30.0, "player": { "gravity": 9.0 } }"#)
                .expect("partial config should parse");
        assert_eq!(config.session_length, 30.0);
        assert_eq!(config.player.gravity, 9.0);
        assert_eq!(config.player.move_speed, 7.5);
        assert_eq!(config.waves.len(), 5);
    }

    #[test]
    fn test_from_json_rejects_bad_waves() {
        assert!(matches!(
            GameplayConfig::from_json(r#"{ "waves": [] }"#),
            Err(ConfigError::NoWaves)
        ));
        let bad_ratio = r#"{ "waves": [ { "id": 1, "duration": 5.0, "targets": 3, "speed": 1.0, "moving_ratio": 1.5 } ] }"#;
        assert!(matches!(
            GameplayConfig::from_json(bad_ratio),
            Err(ConfigError::MovingRatio { id: 1, .. })
        ));
        assert!(matches!(
            GameplayConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_waves_for_extends_from_first_wave() {
        let config = GameplayConfig::default();
        let waves = config.waves_for(7);
        assert_eq!(waves.len(), 7);
        assert_eq!(waves[4], config.waves[4]);
        assert_eq!(waves[6].id, 7);
        assert_eq!(waves[6].targets, config.waves[0].targets);

        let shorter = config.waves_for(2);
        assert_eq!(shorter.len(), 2);
    }

    #[test]
    fn test_weapon_fire_rate_must_be_positive() {
        assert!(WeaponConfig::pistol().validate().is_ok());
        for rate in [0.0, -2.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                WeaponConfig::rifle(rate, 25).validate(),
                Err(ConfigError::FireRate { .. })
            ));
        }
    }

    #[test]
    fn test_mode_lookup() {
        assert_eq!(ModeConfig::by_name("FULL").unwrap().weapon.fire_rate, 8.0);
        assert!(matches!(
            ModeConfig::by_name("arcade"),
            Err(ConfigError::UnknownMode(_))
        ));
        let loadout = ModeConfig::default().loadout();
        assert_eq!(loadout.len(), 3);
        assert!(loadout[2].lethal);
        assert_eq!(loadout[2].range, Some(2.5));
    }
}

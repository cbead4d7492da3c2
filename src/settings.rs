//! Player preferences
//!
//! Persisted in LocalStorage in the browser; native builds use defaults.

use serde::{Deserialize, Serialize};

use crate::config::{GameplayConfig, ModeKind};
use crate::consts::{DEFAULT_SENSITIVITY, MAX_SENSITIVITY, MIN_SENSITIVITY};

/// How targets are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GameMode {
    /// Timed waves of increasing difficulty
    #[default]
    Wave,
    /// A fixed number of targets, respawned after each kill
    Continuous,
}

impl GameMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Wave => "wave",
            GameMode::Continuous => "continuous",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "wave" | "waves" => Some(GameMode::Wave),
            "continuous" | "endless" => Some(GameMode::Continuous),
            _ => None,
        }
    }
}

/// Player preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Mouse sensitivity, radians per pixel
    pub sensitivity: f32,
    pub game_mode: GameMode,
    /// Presentation mode (prototype or full)
    pub mode: ModeKind,
    /// Session length in seconds
    pub session_duration: f32,
    /// Number of waves; extra waves repeat the first one
    pub wave_count: usize,
    /// Targets held alive in continuous mode
    pub continuous_targets: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let gameplay = GameplayConfig::default();
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            game_mode: GameMode::Wave,
            mode: ModeKind::Prototype,
            session_duration: gameplay.session_length,
            wave_count: gameplay.waves.len(),
            continuous_targets: 5,
        }
    }
}

impl Settings {
    /// Out-of-range values are clamped silently
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = clamp_sensitivity(sensitivity);
    }

    /// Clamp every field into its supported range
    pub fn sanitized(mut self) -> Self {
        self.sensitivity = clamp_sensitivity(self.sensitivity);
        if self.session_duration.is_nan() || self.session_duration <= 0.0 {
            self.session_duration = GameplayConfig::default().session_length;
        }
        self.wave_count = self.wave_count.max(1);
        self.continuous_targets = self.continuous_targets.max(1);
        self
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "range_drill_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str::<Settings>(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings.sanitized();
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

/// Clamp a sensitivity into the supported range
pub fn clamp_sensitivity(sensitivity: f32) -> f32 {
    if sensitivity.is_nan() {
        return DEFAULT_SENSITIVITY;
    }
    sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY)
}

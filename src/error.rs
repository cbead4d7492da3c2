//! Error types for configuration and asset setup.
//!
//! The per-frame simulation never fails: misses, empty worlds and damage on
//! dead targets are ordinary outcomes. Errors only surface while parsing or
//! validating external data, and callers usually log them and keep the
//! previous configuration.

use thiserror::Error;

/// Configuration could not be parsed or failed validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON did not match the expected schema
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The wave list is empty
    #[error("wave list is empty")]
    NoWaves,

    /// A wave has a non-positive duration
    #[error("wave {id} has non-positive duration {duration}")]
    WaveDuration { id: u32, duration: f32 },

    /// A wave's moving ratio is outside [0, 1]
    #[error("wave {id} moving ratio {ratio} outside [0, 1]")]
    MovingRatio { id: u32, ratio: f32 },

    /// A weapon cannot fire
    #[error("weapon '{name}' has non-positive fire rate {fire_rate}")]
    FireRate { name: String, fire_rate: f32 },

    /// Mode name is not in the mode table
    #[error("unknown mode '{0}'")]
    UnknownMode(String),
}

/// A target visual could not be produced.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AssetError {
    /// The model was never loaded (or failed to load) during setup
    #[error("model '{0}' is not available")]
    ModelUnavailable(String),
}

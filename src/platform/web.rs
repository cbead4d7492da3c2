//! Browser bindings
//!
//! The page owns the renderer and DOM listeners; it forwards raw events here
//! and calls [`RangeDrill::frame`] from `requestAnimationFrame`. Events, HUD
//! and summaries cross the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use super::{InputSource, IntentBuffer};
use crate::config::{GameplayConfig, ModeConfig};
use crate::settings::Settings;
use crate::sim::{GameEvent, PrimitiveVisuals, Session, SessionOptions, SessionPhase};

/// Longest gap between animation frames treated as continuous, ms
const MAX_GAP_MS: f64 = 250.0;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialised".into());
    }
    log::info!("Range Drill starting...");
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// One page's training range
#[wasm_bindgen]
pub struct RangeDrill {
    session: Session,
    input: IntentBuffer,
    settings: Settings,
    last_time: f64,
}

#[wasm_bindgen]
impl RangeDrill {
    #[wasm_bindgen(constructor)]
    pub fn new() -> RangeDrill {
        let settings = Settings::load();
        let seed = js_sys::Date::now() as u64;
        let mode = ModeConfig::for_kind(settings.mode);
        log::info!("{} mode, seed {seed}", mode.label);

        let session = Session::new(
            GameplayConfig::default(),
            mode,
            SessionOptions::from_settings(&settings, seed),
            Box::new(PrimitiveVisuals::new()),
        );
        RangeDrill {
            session,
            input: IntentBuffer::new(),
            settings,
            last_time: 0.0,
        }
    }

    pub fn key_down(&mut self, code: &str) {
        self.input.key_down(code);
    }

    pub fn key_up(&mut self, code: &str) {
        self.input.key_up(code);
    }

    pub fn pointer_move(&mut self, dx: f32, dy: f32) {
        self.input.pointer_move(dx, dy);
    }

    pub fn pointer_button(&mut self, down: bool) {
        self.input.pointer_button(down);
    }

    /// Pointer lock changed. Losing it pauses a running session.
    pub fn set_pointer_locked(&mut self, locked: bool) {
        self.input.set_active(locked);
        if !locked && self.session.phase() == SessionPhase::Playing {
            self.session.pause();
            log::info!("Auto-paused (pointer lock released)");
        }
    }

    pub fn set_ui_blocked(&mut self, blocked: bool) {
        self.input.set_ui_blocked(blocked);
    }

    /// Start (or restart) with the current settings
    pub fn start(&mut self) {
        let seed = js_sys::Date::now() as u64;
        self.session
            .set_options(SessionOptions::from_settings(&self.settings, seed));
        self.session.start();
        self.last_time = 0.0;
    }

    pub fn resume(&mut self) {
        self.session.resume();
    }

    /// Returns false (and logs) for unknown modes
    pub fn apply_mode(&mut self, name: &str) -> bool {
        if !self.session.apply_mode(name) {
            return false;
        }
        self.settings.mode = self.session.mode().kind;
        self.settings.save();
        true
    }

    pub fn apply_gameplay_json(&mut self, json: &str) -> bool {
        self.session.apply_gameplay_json(json)
    }

    /// Replace the stored settings from JSON; applied on the next start
    pub fn apply_settings_json(&mut self, json: &str) -> Result<(), JsValue> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.settings = settings.sanitized();
        self.settings.save();
        Ok(())
    }

    /// Advance one animation frame; returns this frame's events as JSON
    pub fn frame(&mut self, time_ms: f64) -> Result<String, JsValue> {
        let dt = if self.last_time > 0.0 && time_ms - self.last_time < MAX_GAP_MS {
            ((time_ms - self.last_time) / 1000.0) as f32
        } else {
            crate::consts::PHYSICS_DT
        };
        self.last_time = time_ms;

        let input = self.input.poll();
        let events = self.session.frame(dt, input.as_ref()).to_vec();

        for event in &events {
            match event {
                GameEvent::SensitivityChanged { sensitivity } => {
                    self.settings.set_sensitivity(*sensitivity);
                    self.settings.save();
                }
                GameEvent::SessionEnded => {
                    log::info!("Session ended, score {}", self.session.hud().score);
                }
                _ => {}
            }
        }
        to_json(&events)
    }

    pub fn hud_json(&self) -> Result<String, JsValue> {
        to_json(&self.session.hud())
    }

    pub fn summary_json(&self) -> Result<String, JsValue> {
        to_json(&self.session.summary())
    }

    pub fn settings_json(&self) -> Result<String, JsValue> {
        to_json(&self.settings)
    }

    /// Eye position and view direction as `[x, y, z, dx, dy, dz]`
    pub fn camera(&self) -> Vec<f32> {
        let eye = self.session.eye_position();
        let dir = self.session.player().view_direction();
        vec![eye.x, eye.y, eye.z, dir.x, dir.y, dir.z]
    }
}

impl Default for RangeDrill {
    fn default() -> Self {
        Self::new()
    }
}

//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Input events (keyboard state, pointer deltas, pointer lock)
//! - Scripted input for headless runs
//! - Browser bindings (wasm only)

mod autoplay;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use autoplay::Autoplay;

use std::collections::HashSet;

use glam::Vec2;

use crate::sim::{ControllerInput, FrameInput};

/// Where a frame's player intent comes from
pub trait InputSource {
    /// x = strafe right, y = forward
    fn move_axis(&self) -> Vec2;
    /// Pointer movement since the last call, in pixels
    fn consume_look_delta(&mut self) -> Vec2;
    fn consume_jump(&mut self) -> bool;
    fn is_crouching(&self) -> bool;
    fn is_sprinting(&self) -> bool;
    fn is_firing(&self) -> bool;
    fn consume_reload(&mut self) -> bool;
    /// 0-based slot requested since the last call
    fn consume_weapon_switch(&mut self) -> Option<usize>;
    /// Pointer lock / focus held
    fn is_active(&self) -> bool;

    fn consume_pause(&mut self) -> bool {
        false
    }

    fn is_ui_blocked(&self) -> bool {
        false
    }

    /// Drain this frame's intent. An inactive source yields nothing, pause
    /// included: losing focus already pauses, and resuming goes through the
    /// overlay once the pointer is locked again.
    fn poll(&mut self) -> Option<FrameInput> {
        let pause = self.consume_pause();
        if !self.is_active() {
            // Drop stale edges so they don't fire on re-lock
            self.consume_look_delta();
            self.consume_jump();
            self.consume_reload();
            self.consume_weapon_switch();
            return None;
        }
        Some(FrameInput {
            controller: ControllerInput {
                move_axis: self.move_axis(),
                look_delta: self.consume_look_delta(),
                jump: self.consume_jump(),
                crouch: self.is_crouching(),
                sprint: self.is_sprinting(),
            },
            fire: self.is_firing(),
            reload: self.consume_reload(),
            weapon_switch: self.consume_weapon_switch(),
            pause,
            ui_blocked: self.is_ui_blocked(),
        })
    }
}

/// Keyboard and pointer state collected from DOM events between frames
#[derive(Debug, Clone, Default)]
pub struct IntentBuffer {
    /// Held keys by `KeyboardEvent.code`
    held: HashSet<String>,
    look_delta: Vec2,
    jump: bool,
    reload: bool,
    pause: bool,
    weapon_switch: Option<usize>,
    firing: bool,
    active: bool,
    ui_blocked: bool,
}

impl IntentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, code: &str) {
        // Key repeat must not re-trigger edges
        if !self.held.insert(code.to_string()) {
            return;
        }
        match code {
            "Space" => self.jump = true,
            "KeyR" => self.reload = true,
            "Escape" | "KeyP" => self.pause = true,
            "Digit1" => self.weapon_switch = Some(0),
            "Digit2" => self.weapon_switch = Some(1),
            "Digit3" => self.weapon_switch = Some(2),
            _ => {}
        }
    }

    pub fn key_up(&mut self, code: &str) {
        self.held.remove(code);
    }

    pub fn pointer_move(&mut self, dx: f32, dy: f32) {
        if self.active {
            self.look_delta += Vec2::new(dx, dy);
        }
    }

    pub fn pointer_button(&mut self, down: bool) {
        self.firing = down;
    }

    /// Pointer lock gained or lost. Losing it releases every held key.
    pub fn set_active(&mut self, active: bool) {
        if self.active && !active {
            self.held.clear();
            self.firing = false;
        }
        self.active = active;
    }

    pub fn set_ui_blocked(&mut self, blocked: bool) {
        self.ui_blocked = blocked;
    }

    fn held(&self, codes: &[&str]) -> bool {
        codes.iter().any(|c| self.held.contains(*c))
    }
}

impl InputSource for IntentBuffer {
    fn move_axis(&self) -> Vec2 {
        let axis = |neg: bool, pos: bool| (pos as i8 - neg as i8) as f32;
        let v = Vec2::new(
            axis(self.held(&["KeyA", "ArrowLeft"]), self.held(&["KeyD", "ArrowRight"])),
            axis(self.held(&["KeyS", "ArrowDown"]), self.held(&["KeyW", "ArrowUp"])),
        );
        v.normalize_or_zero()
    }

    fn consume_look_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.look_delta)
    }

    fn consume_jump(&mut self) -> bool {
        std::mem::take(&mut self.jump)
    }

    fn is_crouching(&self) -> bool {
        self.held(&["KeyC", "ControlLeft"])
    }

    fn is_sprinting(&self) -> bool {
        self.held(&["ShiftLeft", "ShiftRight"])
    }

    fn is_firing(&self) -> bool {
        self.firing
    }

    fn consume_reload(&mut self) -> bool {
        std::mem::take(&mut self.reload)
    }

    fn consume_weapon_switch(&mut self) -> Option<usize> {
        self.weapon_switch.take()
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn consume_pause(&mut self) -> bool {
        std::mem::take(&mut self.pause)
    }

    fn is_ui_blocked(&self) -> bool {
        self.ui_blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameplayConfig, ModeConfig};
    use crate::sim::{PrimitiveVisuals, Session, SessionOptions, SessionPhase};

    #[test]
    fn test_inactive_source_yields_nothing() {
        let mut input = IntentBuffer::new();
        input.key_down("KeyW");
        input.key_down("Space");
        assert_eq!(input.poll(), None);
        // The jump edge was dropped while inactive
        input.set_active(true);
        let frame = input.poll().unwrap();
        assert!(!frame.controller.jump);
    }

    #[test]
    fn test_diagonal_axis_normalized() {
        let mut input = IntentBuffer::new();
        input.set_active(true);
        input.key_down("KeyW");
        input.key_down("KeyD");
        let axis = input.poll().unwrap().controller.move_axis;
        assert!((axis.length() - 1.0).abs() < 1e-5);
        assert!(axis.x > 0.0 && axis.y > 0.0);

        input.key_down("KeyS");
        assert_eq!(input.move_axis(), Vec2::X);
    }

    #[test]
    fn test_edges_consumed_once() {
        let mut input = IntentBuffer::new();
        input.set_active(true);
        input.key_down("Space");
        input.key_down("Digit3");
        input.pointer_move(4.0, -2.0);
        input.pointer_move(1.0, 0.0);

        let frame = input.poll().unwrap();
        assert!(frame.controller.jump);
        assert_eq!(frame.weapon_switch, Some(2));
        assert_eq!(frame.controller.look_delta, Vec2::new(5.0, -2.0));

        // Held without a fresh press
        input.key_down("Space");
        let frame = input.poll().unwrap();
        assert!(!frame.controller.jump);
        assert_eq!(frame.weapon_switch, None);
        assert_eq!(frame.controller.look_delta, Vec2::ZERO);
    }

    #[test]
    fn test_pause_dropped_while_inactive() {
        let mut input = IntentBuffer::new();
        input.key_down("Escape");
        assert!(input.poll().is_none());

        // The edge is consumed, not deferred until the next lock
        input.set_active(true);
        assert!(!input.poll().unwrap().pause);
    }

    #[test]
    fn test_pause_key_while_unlocked_keeps_session_paused() {
        let mut session = Session::new(
            GameplayConfig::default(),
            ModeConfig::default(),
            SessionOptions::default(),
            Box::new(PrimitiveVisuals::new()),
        );
        session.start();
        session.pause();

        let mut input = IntentBuffer::new();
        input.key_down("KeyP");
        let frame = input.poll();
        session.frame(1.0 / 60.0, frame.as_ref());
        assert_eq!(session.phase(), SessionPhase::Paused);
    }

    #[test]
    fn test_losing_lock_releases_keys() {
        let mut input = IntentBuffer::new();
        input.set_active(true);
        input.key_down("KeyW");
        input.pointer_button(true);
        input.set_active(false);
        input.set_active(true);
        let frame = input.poll().unwrap();
        assert_eq!(frame.controller.move_axis, Vec2::ZERO);
        assert!(!frame.fire);
    }
}

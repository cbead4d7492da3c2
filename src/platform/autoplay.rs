//! Scripted player for headless runs and attract mode
//!
//! Turns toward the nearest live target at a capped rate and holds the
//! trigger once the crosshair is close. With nothing to shoot it sweeps the
//! arena. Reloads when the magazine runs dry.

use glam::Vec2;

use super::InputSource;
use crate::sim::Session;

/// Turn rate cap, rad/s
const TURN_RATE: f32 = 4.0;
/// Sweep rate with no target in sight, rad/s
const SCAN_RATE: f32 = 0.6;
/// Angular error below which the trigger is held, radians
const FIRE_CONE: f32 = 0.02;

/// Aim-bot style [`InputSource`]
#[derive(Debug, Clone, Default)]
pub struct Autoplay {
    look_delta: Vec2,
    firing: bool,
    reload: bool,
}

fn wrap_angle(a: f32) -> f32 {
    let tau = std::f32::consts::TAU;
    (a + std::f32::consts::PI).rem_euclid(tau) - std::f32::consts::PI
}

impl Autoplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan this frame's input from the current session state
    pub fn observe(&mut self, session: &Session, dt: f32) {
        let player = session.player();
        let sensitivity = player.sensitivity();
        let eye = session.eye_position();
        let (yaw, pitch) = (player.state.yaw, player.state.pitch);

        let nearest = session
            .targets()
            .iter()
            .filter(|t| t.is_alive())
            .map(|t| t.position())
            .min_by(|a, b| a.distance(eye).total_cmp(&b.distance(eye)));

        let max_turn = TURN_RATE * dt;
        let (d_yaw, d_pitch) = match nearest {
            Some(point) => {
                let d = point - eye;
                let want_yaw = (-d.x).atan2(-d.z);
                let want_pitch = (d.y / d.length().max(1e-4)).asin();
                (wrap_angle(want_yaw - yaw), want_pitch - pitch)
            }
            None => (SCAN_RATE * dt, -pitch),
        };
        let d_yaw = d_yaw.clamp(-max_turn, max_turn);
        let d_pitch = d_pitch.clamp(-max_turn, max_turn);

        // The controller subtracts pointer delta times sensitivity
        self.look_delta = Vec2::new(-d_yaw, -d_pitch) / sensitivity;
        self.firing = nearest.is_some() && d_yaw.abs() < FIRE_CONE && d_pitch.abs() < FIRE_CONE;
        self.reload = session.loadout().weapon().rounds() == Some(0);
    }
}

impl InputSource for Autoplay {
    fn move_axis(&self) -> Vec2 {
        Vec2::ZERO
    }

    fn consume_look_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.look_delta)
    }

    fn consume_jump(&mut self) -> bool {
        false
    }

    fn is_crouching(&self) -> bool {
        false
    }

    fn is_sprinting(&self) -> bool {
        false
    }

    fn is_firing(&self) -> bool {
        self.firing
    }

    fn consume_reload(&mut self) -> bool {
        std::mem::take(&mut self.reload)
    }

    fn consume_weapon_switch(&mut self) -> Option<usize> {
        None
    }

    fn is_active(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameplayConfig, ModeConfig, ModeKind};
    use crate::sim::{PrimitiveVisuals, SessionOptions};

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * std::f32::consts::PI) - std::f32::consts::PI).abs() < 1e-4
            || (wrap_angle(3.0 * std::f32::consts::PI) + std::f32::consts::PI).abs() < 1e-4);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-6);
        assert!((wrap_angle(-7.0) - (-7.0 + std::f32::consts::TAU)).abs() < 1e-5);
    }

    #[test]
    fn test_autoplay_scores() {
        let mut session = Session::new(
            GameplayConfig::default(),
            ModeConfig::for_kind(ModeKind::Prototype),
            SessionOptions {
                session_length: 10.0,
                ..Default::default()
            },
            Box::new(PrimitiveVisuals::new()),
        );
        session.start();
        let mut bot = Autoplay::new();
        let dt = 1.0 / 60.0;
        for _ in 0..600 {
            bot.observe(&session, dt);
            let input = bot.poll();
            session.frame(dt, input.as_ref());
        }
        let hud = session.hud();
        assert!(hud.hits > 0);
        assert!(hud.score > 0);
        assert!(session.summary().is_some());
    }
}

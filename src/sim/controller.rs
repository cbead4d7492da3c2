//! First-person character controller
//!
//! Runs once per rendered frame, before the physics step. It reads the
//! player's intent, writes the body's velocity and leaves integration and
//! collision to [`PhysicsWorld`]. Per frame, in order:
//! 1. look (yaw/pitch, pitch clamped short of straight up/down)
//! 2. jump buffer refresh or decay
//! 3. ground probe and coyote timer
//! 4. horizontal acceleration (ground blend or additive air control)
//! 5. gravity, then a jump if one is buffered and allowed
//! 6. eye height smoothing and the locomotion transition

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::locomotion::{Locomotion, LocomotionContext};
use super::physics::{BodyHandle, Groups, Owner, PhysicsWorld, RigidBody, Shape};
use crate::config::PlayerConfig;
use crate::consts::{
    EYE_HEIGHT_RATE, GROUND_NORMAL_MIN_Y, GROUND_PROBE_MARGIN, MAX_SENSITIVITY, MIN_SENSITIVITY,
    PITCH_MARGIN, PLAYER_HEIGHT, PLAYER_MASS, PLAYER_RADIUS,
};

/// Player intent for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerInput {
    /// x = strafe right, y = forward; each in [-1, 1]
    pub move_axis: Vec2,
    /// Raw pointer delta in pixels
    pub look_delta: Vec2,
    /// Jump pressed this frame (edge)
    pub jump: bool,
    pub crouch: bool,
    pub sprint: bool,
}

/// Events the controller reports for the frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerReport {
    pub jumped: bool,
    pub landed: bool,
}

/// Mutable player state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub body: BodyHandle,
    pub yaw: f32,
    pub pitch: f32,
    pub standing_eye_height: f32,
    pub crouch_eye_height: f32,
    /// Smoothed eye height above the feet
    pub eye_height: f32,
    pub on_ground: bool,
    pub coyote_timer: f32,
    pub jump_buffer_timer: f32,
    pub locomotion: Locomotion,
}

/// Drives the player body from input
#[derive(Debug, Clone)]
pub struct CharacterController {
    pub state: PlayerState,
    config: PlayerConfig,
    sensitivity: f32,
}

fn half_height() -> f32 {
    PLAYER_HEIGHT * 0.5
}

impl CharacterController {
    /// Insert the player body standing at `feet` and build the controller
    pub fn spawn(world: &mut PhysicsWorld, config: &PlayerConfig, feet: Vec3, sensitivity: f32) -> Self {
        let body = world.add_body(Self::body_at(feet), Owner::Player);
        Self {
            state: PlayerState {
                body,
                yaw: 0.0,
                pitch: 0.0,
                standing_eye_height: config.eye_height,
                crouch_eye_height: config.crouch_eye_height(),
                eye_height: config.eye_height,
                on_ground: true,
                coyote_timer: 0.0,
                jump_buffer_timer: 0.0,
                locomotion: Locomotion::Idle,
            },
            config: config.clone(),
            sensitivity: sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY),
        }
    }

    fn body_at(feet: Vec3) -> RigidBody {
        RigidBody::dynamic(
            Shape::Cylinder {
                radius: PLAYER_RADIUS,
                half_height: half_height(),
            },
            feet + Vec3::Y * half_height(),
            PLAYER_MASS,
        )
        // The controller owns vertical velocity
        .with_gravity_scale(0.0)
    }

    /// Put the player back at `feet`, facing -Z, at rest
    pub fn respawn(&mut self, world: &mut PhysicsWorld, feet: Vec3) {
        if world.body(self.state.body).is_none() {
            self.state.body = world.add_body(Self::body_at(feet), Owner::Player);
        } else if let Some(body) = world.body_mut(self.state.body) {
            body.position = feet + Vec3::Y * half_height();
            body.velocity = Vec3::ZERO;
        }
        let s = &mut self.state;
        s.yaw = 0.0;
        s.pitch = 0.0;
        s.eye_height = s.standing_eye_height;
        s.on_ground = true;
        s.coyote_timer = 0.0;
        s.jump_buffer_timer = 0.0;
        s.locomotion = Locomotion::Idle;
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Out-of-range values are clamped silently
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
    }

    /// Advance one frame. `None` input is simulated as no intent, so the
    /// body still falls, lands and loses ground speed.
    pub fn update(
        &mut self,
        world: &mut PhysicsWorld,
        input: Option<&ControllerInput>,
        dt: f32,
    ) -> ControllerReport {
        let mut report = ControllerReport::default();
        let idle = ControllerInput::default();
        let input = input.unwrap_or(&idle);
        let Some(body) = world.body(self.state.body) else {
            return report;
        };
        let position = body.position;
        let mut velocity = body.velocity;
        let dt = dt.max(0.0);
        let cfg = &self.config;
        let state = &mut self.state;

        // Look
        state.yaw -= input.look_delta.x * self.sensitivity;
        let pitch_limit = std::f32::consts::FRAC_PI_2 - PITCH_MARGIN;
        state.pitch =
            (state.pitch - input.look_delta.y * self.sensitivity).clamp(-pitch_limit, pitch_limit);

        // Jump buffer
        if input.jump {
            state.jump_buffer_timer = cfg.jump_buffer_time;
        } else {
            state.jump_buffer_timer = (state.jump_buffer_timer - dt).max(0.0);
        }

        // Ground probe
        let was_grounded = state.on_ground;
        let probe_end = position - Vec3::Y * (half_height() + GROUND_PROBE_MARGIN);
        let grounded = velocity.y <= 0.0
            && world
                .raycast_closest(position, probe_end, Groups::LEVEL)
                .is_some_and(|hit| hit.normal.y > GROUND_NORMAL_MIN_Y);
        state.on_ground = grounded;
        if grounded && !was_grounded {
            report.landed = true;
            log::trace!("landed at {position:?}");
        }

        if grounded {
            state.coyote_timer = cfg.coyote_time;
        } else {
            state.coyote_timer = (state.coyote_timer - dt).max(0.0);
        }

        // Horizontal
        let mut axis = input.move_axis;
        if axis.length_squared() > 1.0 {
            axis = axis.normalize();
        }
        let has_input = axis.length_squared() > 1e-6;
        let wish_dir = (crate::yaw_right(state.yaw) * axis.x + crate::yaw_forward(state.yaw) * axis.y)
            .normalize_or_zero();
        let sprint = if input.sprint && grounded {
            cfg.sprint_multiplier
        } else {
            1.0
        };
        let crouch = if input.crouch {
            cfg.crouch_speed_multiplier
        } else {
            1.0
        };
        let target_speed = cfg.move_speed * sprint * crouch;

        let mut horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
        if grounded {
            let blend = (cfg.ground_accel * dt).min(1.0);
            horizontal = horizontal.lerp(wish_dir * target_speed, blend);
        } else {
            horizontal += wish_dir * target_speed * cfg.air_accel * dt;
        }

        // Without a wish direction only the hard cap applies, so momentum
        // carried into the air is not cut to zero.
        let speed_limit = if has_input {
            let overshoot = if grounded { 1.05 } else { 1.0 };
            cfg.max_speed.min(target_speed * overshoot)
        } else {
            cfg.max_speed
        };
        let speed = horizontal.length();
        if speed > speed_limit && speed > 0.0 {
            horizontal *= speed_limit / speed;
        }
        velocity.x = horizontal.x;
        velocity.z = horizontal.z;

        // Vertical
        velocity.y -= cfg.gravity * dt;
        let can_jump = state.on_ground || state.coyote_timer > 0.0;
        if state.jump_buffer_timer > 0.0 && can_jump {
            velocity.y = cfg.jump_strength;
            state.on_ground = false;
            state.coyote_timer = 0.0;
            state.jump_buffer_timer = 0.0;
            report.jumped = true;
            log::debug!("jump");
        }

        // Eye height
        let eye_target = if input.crouch {
            state.crouch_eye_height
        } else {
            state.standing_eye_height
        };
        let t = 1.0 - (-EYE_HEIGHT_RATE * dt).exp();
        state.eye_height += (eye_target - state.eye_height) * t;

        state.locomotion = state.locomotion.transition(LocomotionContext {
            on_ground: state.on_ground,
            jumped: report.jumped,
            crouching: input.crouch,
            moving: has_input,
        });

        if let Some(body) = world.body_mut(state.body) {
            body.velocity = velocity;
        }
        report
    }

    /// Camera position: feet plus the smoothed eye height
    pub fn eye_position(&self, world: &PhysicsWorld) -> Vec3 {
        let center = world
            .body(self.state.body)
            .map(|b| b.position)
            .unwrap_or(Vec3::Y * half_height());
        center + Vec3::Y * (self.state.eye_height - half_height())
    }

    pub fn view_direction(&self) -> Vec3 {
        crate::view_direction(self.state.yaw, self.state.pitch)
    }

    pub fn velocity(&self, world: &PhysicsWorld) -> Vec3 {
        world
            .body(self.state.body)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }
}

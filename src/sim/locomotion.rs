//! Player locomotion state machine

use serde::{Deserialize, Serialize};

/// Coarse movement state, used for animation and HUD hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locomotion {
    #[default]
    Idle,
    Move,
    /// Only for the tick a jump fires
    Jump,
    Air,
    Crouch,
}

/// What the controller observed this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocomotionContext {
    pub on_ground: bool,
    pub jumped: bool,
    pub crouching: bool,
    pub moving: bool,
}

impl Locomotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locomotion::Idle => "idle",
            Locomotion::Move => "move",
            Locomotion::Jump => "jump",
            Locomotion::Air => "air",
            Locomotion::Crouch => "crouch",
        }
    }

    /// Next state. Level-triggered on the context, except `Jump` which is
    /// edge-triggered by `ctx.jumped`.
    pub fn transition(self, ctx: LocomotionContext) -> Locomotion {
        if ctx.jumped {
            return Locomotion::Jump;
        }
        match (self, ctx.on_ground) {
            (_, false) => Locomotion::Air,
            (_, true) if ctx.crouching => Locomotion::Crouch,
            (_, true) if ctx.moving => Locomotion::Move,
            (_, true) => Locomotion::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground(moving: bool, crouching: bool) -> LocomotionContext {
        LocomotionContext {
            on_ground: true,
            jumped: false,
            crouching,
            moving,
        }
    }

    #[test]
    fn test_ground_states() {
        assert_eq!(Locomotion::Idle.transition(ground(false, false)), Locomotion::Idle);
        assert_eq!(Locomotion::Idle.transition(ground(true, false)), Locomotion::Move);
        // Crouch wins over movement
        assert_eq!(Locomotion::Move.transition(ground(true, true)), Locomotion::Crouch);
    }

    #[test]
    fn test_jump_is_one_tick() {
        let jumped = LocomotionContext {
            jumped: true,
            ..Default::default()
        };
        let state = Locomotion::Move.transition(jumped);
        assert_eq!(state, Locomotion::Jump);

        let next = state.transition(LocomotionContext::default());
        assert_eq!(next, Locomotion::Air);
    }

    #[test]
    fn test_landing_leaves_air() {
        assert_eq!(Locomotion::Air.transition(ground(false, false)), Locomotion::Idle);
        assert_eq!(Locomotion::Air.as_str(), "air");
    }
}

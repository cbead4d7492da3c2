//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed physics timestep, clamped frame delta
//! - Seeded RNG only
//! - Stable iteration order (by body handle and target id)
//! - No rendering or platform dependencies; meshes come in through
//!   [`TargetVisuals`]

pub mod bounds;
pub mod controller;
pub mod debris;
pub mod hit;
pub mod locomotion;
pub mod panels;
pub mod physics;
pub mod session;
pub mod target;
pub mod wave;
pub mod weapon;

pub use bounds::{Aabb, Obb, Ray, Sphere, SurfaceHit, Transform};
pub use controller::{CharacterController, ControllerInput, ControllerReport, PlayerState};
pub use debris::{Debris, DebrisField};
pub use hit::{ShotResolution, resolve_shot};
pub use locomotion::Locomotion;
pub use panels::{PanelBoard, Plate, PlateHit};
pub use physics::{BodyHandle, BodyKind, Groups, Owner, PhysicsWorld, RayHit, RigidBody, Shape};
pub use session::{
    FrameInput, GameEvent, HudSnapshot, Session, SessionOptions, SessionPhase, SessionSummary,
};
pub use target::{
    DamageOutcome, HitProxy, MeshRequest, PrimitiveShape, PrimitiveVisuals, SpawnRequest, Target,
    TargetId, TargetRegistry, TargetVisuals, VisualHandle,
};
pub use wave::{ContinuousSpawner, SpawnLayout, WavePhase, WaveScheduler, WaveTick};
pub use weapon::{Loadout, TriggerInput, WeaponAction, WeaponPhase, WeaponState};

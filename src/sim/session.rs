//! One training session
//!
//! Owns the physics world and every gameplay system. Each rendered frame runs
//! the same pipeline:
//! 1. pause toggle and clock
//! 2. weapon switch, then the character controller (pre-physics)
//! 3. moving targets push their kinematic colliders
//! 4. fixed-step physics
//! 5. debris aging (post-physics)
//! 6. weapon FSM and hit resolution
//! 7. schedule bookkeeping (prune, advance, respawn)
//! 8. score timeline and end conditions

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::controller::{CharacterController, ControllerInput};
use super::debris::DebrisField;
use super::hit::{ShotResolution, resolve_shot};
use super::panels::{PLATE_ROW_OFFSET, PanelBoard};
use super::physics::PhysicsWorld;
use super::target::{DamageOutcome, SpawnRequest, TargetId, TargetRegistry, TargetVisuals};
use super::wave::{ContinuousSpawner, SpawnLayout, WaveScheduler, WaveTick};
use super::weapon::{Loadout, TriggerInput, WeaponAction};
use crate::config::{GameplayConfig, ModeConfig};
use crate::consts::{HIT_SCORE, KILL_SCORE, MAX_FRAME_DT, MAX_SUBSTEPS, PHYSICS_DT};
use crate::history::{ScoreSample, ScoreTimeline};
use crate::scene::{SceneBuilder, SceneConfig};
use crate::settings::{GameMode, Settings, clamp_sensitivity};

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionPhase {
    #[default]
    Menu,
    Playing,
    Paused,
    Ended,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Menu => "menu",
            SessionPhase::Playing => "playing",
            SessionPhase::Paused => "paused",
            SessionPhase::Ended => "ended",
        }
    }
}

/// Everything the player did this frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub controller: ControllerInput,
    /// Trigger held
    pub fire: bool,
    /// Reload pressed (edge)
    pub reload: bool,
    /// 0-based weapon slot requested this frame
    pub weapon_switch: Option<usize>,
    /// Pause toggle (edge)
    pub pause: bool,
    /// A DOM overlay has focus; shots are suppressed
    pub ui_blocked: bool,
}

/// Something worth telling the presentation layer about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    SessionStarted,
    WaveStarted { wave: u32 },
    TargetHit { id: TargetId, remaining: i32 },
    TargetKilled { id: TargetId, position: Vec3 },
    Missed,
    SensitivityChanged { sensitivity: f32 },
    WeaponFired,
    DryFire,
    ReloadStarted,
    ReloadFinished,
    WeaponSwitched { slot: usize, name: String },
    Jumped,
    Landed,
    Paused,
    Resumed,
    AllWavesComplete,
    SessionEnded,
}

/// Per-frame HUD values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub score: u64,
    pub hits: u32,
    pub shots: u32,
    pub accuracy: f32,
    pub time_left: f32,
    /// `None` in continuous mode (shown as ∞)
    pub wave: Option<u32>,
    /// Scheduled waves, for "wave 2/5"; `None` in continuous mode
    pub wave_count: Option<u32>,
    pub weapon: String,
    pub rounds: Option<u32>,
    pub sensitivity: f32,
    pub phase: SessionPhase,
}

/// End-of-session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub score: u64,
    /// `None` in continuous mode
    pub wave_reached: Option<u32>,
    pub accuracy: f32,
    pub hits: u32,
    pub shots: u32,
    pub history: Vec<ScoreSample>,
}

/// Session tuning picked before starting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOptions {
    pub game_mode: GameMode,
    pub session_length: f32,
    pub wave_count: usize,
    pub continuous_targets: usize,
    pub sensitivity: f32,
    pub seed: u64,
}

impl SessionOptions {
    pub fn from_settings(settings: &Settings, seed: u64) -> Self {
        Self {
            game_mode: settings.game_mode,
            session_length: settings.session_duration,
            wave_count: settings.wave_count,
            continuous_targets: settings.continuous_targets,
            sensitivity: clamp_sensitivity(settings.sensitivity),
            seed,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), 0)
    }
}

#[derive(Debug, Clone)]
enum Schedule {
    Waves(WaveScheduler),
    Continuous(ContinuousSpawner),
}

/// A running (or ready to run) training session
pub struct Session {
    gameplay: GameplayConfig,
    mode: ModeConfig,
    scene: SceneConfig,
    options: SessionOptions,

    world: PhysicsWorld,
    player: CharacterController,
    player_feet: Vec3,
    spawn_points: Vec<Vec3>,
    targets: TargetRegistry,
    debris: DebrisField,
    panels: PanelBoard,
    schedule: Schedule,
    loadout: Loadout,
    visuals: Box<dyn TargetVisuals>,
    rng: Pcg32,

    phase: SessionPhase,
    score: u64,
    hits: u32,
    shots: u32,
    time_left: f32,
    elapsed: f32,
    timeline: ScoreTimeline,
    summary: Option<SessionSummary>,
    events: Vec<GameEvent>,
}

impl Session {
    /// Build the arena for `mode`. The session waits in the menu until
    /// [`Session::start`].
    pub fn new(
        gameplay: GameplayConfig,
        mode: ModeConfig,
        options: SessionOptions,
        visuals: Box<dyn TargetVisuals>,
    ) -> Self {
        let scene = SceneConfig::for_mode(mode.kind);
        let mut world = PhysicsWorld::default();
        let built = SceneBuilder::build(&scene, gameplay.player.eye_height, &mut world);
        let player = CharacterController::spawn(
            &mut world,
            &gameplay.player,
            built.player_feet,
            options.sensitivity,
        );
        let layout = SpawnLayout::new(built.spawn_points.clone(), gameplay.target.move_radius);
        let schedule = Self::make_schedule(&gameplay, &options, layout);

        Self {
            panels: PanelBoard::sensitivity_row(built.player_feet.z - PLATE_ROW_OFFSET),
            loadout: Loadout::new(mode.loadout()),
            rng: Pcg32::seed_from_u64(options.seed),
            time_left: options.session_length,
            gameplay,
            mode,
            scene,
            options,
            world,
            player,
            player_feet: built.player_feet,
            spawn_points: built.spawn_points,
            targets: TargetRegistry::new(),
            debris: DebrisField::default(),
            schedule,
            visuals,
            phase: SessionPhase::Menu,
            score: 0,
            hits: 0,
            shots: 0,
            elapsed: 0.0,
            timeline: ScoreTimeline::new(),
            summary: None,
            events: Vec::new(),
        }
    }

    fn make_schedule(gameplay: &GameplayConfig, options: &SessionOptions, layout: SpawnLayout) -> Schedule {
        let waves = gameplay.waves_for(options.wave_count);
        match options.game_mode {
            GameMode::Wave => Schedule::Waves(WaveScheduler::new(waves, layout)),
            GameMode::Continuous => {
                let template = waves.first().cloned().unwrap_or_else(|| {
                    GameplayConfig::default().waves.swap_remove(0)
                });
                Schedule::Continuous(ContinuousSpawner::new(
                    options.continuous_targets,
                    gameplay.target.respawn_delay,
                    &template,
                    layout,
                ))
            }
        }
    }

    /// Discard every target and fragment, put the player back at the spawn
    fn reset_world(&mut self) {
        self.targets.clear(&mut self.world);
        self.debris.clear(&mut self.world);
        self.player.respawn(&mut self.world, self.player_feet);
    }

    /// Begin (or restart) a session
    pub fn start(&mut self) {
        self.reset_world();
        self.rng = Pcg32::seed_from_u64(self.options.seed);
        self.loadout = Loadout::new(self.mode.loadout());
        self.score = 0;
        self.hits = 0;
        self.shots = 0;
        self.elapsed = 0.0;
        self.time_left = self.options.session_length;
        self.timeline.clear();
        self.summary = None;
        self.events.clear();
        self.phase = SessionPhase::Playing;

        log::info!(
            "session started: {} mode, {} scheduling, {:.0}s",
            self.mode.label,
            self.options.game_mode.as_str(),
            self.options.session_length
        );
        self.events.push(GameEvent::SessionStarted);

        match &mut self.schedule {
            Schedule::Waves(scheduler) => {
                let spawns = scheduler.start();
                let wave = scheduler.current_wave_number();
                let ids = spawn_all(
                    &spawns,
                    &mut self.targets,
                    &self.mode,
                    &self.gameplay,
                    self.visuals.as_mut(),
                    &mut self.world,
                    &mut self.rng,
                );
                scheduler.register_spawned(ids);
                if scheduler.is_complete() {
                    self.events.push(GameEvent::AllWavesComplete);
                } else {
                    self.events.push(GameEvent::WaveStarted { wave });
                }
            }
            Schedule::Continuous(spawner) => {
                let spawns = spawner.start();
                let ids = spawn_all(
                    &spawns,
                    &mut self.targets,
                    &self.mode,
                    &self.gameplay,
                    self.visuals.as_mut(),
                    &mut self.world,
                    &mut self.rng,
                );
                spawner.register_spawned(ids);
            }
        }
    }

    /// Switch presentation mode by name. Unknown names are logged and ignored.
    ///
    /// A switch tears down every target, fragment and level collider, rebuilds
    /// the mode's scene and returns to the menu.
    pub fn apply_mode(&mut self, name: &str) -> bool {
        let mode = match ModeConfig::by_name(name) {
            Ok(mode) => mode,
            Err(err) => {
                log::warn!("{err}; keeping mode '{}'", self.mode.kind.as_str());
                return false;
            }
        };

        self.targets.clear(&mut self.world);
        self.debris.clear(&mut self.world);
        self.scene = SceneConfig::for_mode(mode.kind);
        let built = SceneBuilder::build(&self.scene, self.gameplay.player.eye_height, &mut self.world);
        self.player_feet = built.player_feet;
        self.spawn_points = built.spawn_points;
        self.player.respawn(&mut self.world, self.player_feet);
        self.panels = PanelBoard::sensitivity_row(self.player_feet.z - PLATE_ROW_OFFSET);
        self.rebuild_schedule();
        self.loadout = Loadout::new(mode.loadout());
        log::info!("mode changed to {}", mode.label);
        self.mode = mode;
        self.phase = SessionPhase::Menu;
        true
    }

    /// Replace the gameplay config from JSON. Invalid configs are logged and
    /// the current one kept. Takes effect on the next [`Session::start`].
    pub fn apply_gameplay_json(&mut self, json: &str) -> bool {
        match GameplayConfig::from_json(json) {
            Ok(config) => {
                self.gameplay = config;
                self.rebuild_schedule();
                true
            }
            Err(err) => {
                log::warn!("{err}; keeping current gameplay config");
                false
            }
        }
    }

    /// Replace session options; takes effect on the next start
    pub fn set_options(&mut self, options: SessionOptions) {
        self.player.set_sensitivity(options.sensitivity);
        self.options = options;
        self.options.sensitivity = self.player.sensitivity();
        self.rebuild_schedule();
    }

    fn rebuild_schedule(&mut self) {
        let layout = SpawnLayout::new(self.spawn_points.clone(), self.gameplay.target.move_radius);
        self.schedule = Self::make_schedule(&self.gameplay, &self.options, layout);
    }

    /// Run one rendered frame. `None` input means no active input source:
    /// the player has no intent but still falls and lands with the world.
    pub fn frame(&mut self, dt: f32, input: Option<&FrameInput>) -> &[GameEvent] {
        self.events.clear();
        let dt = dt.clamp(0.0, MAX_FRAME_DT);

        if input.is_some_and(|i| i.pause) {
            self.toggle_pause();
        }
        if self.phase != SessionPhase::Playing {
            return &self.events;
        }

        self.elapsed += dt;
        self.time_left -= dt;

        if let Some(slot) = input.and_then(|i| i.weapon_switch) {
            if self.loadout.switch_to(slot) {
                self.events.push(GameEvent::WeaponSwitched {
                    slot,
                    name: self.loadout.weapon().config().name.clone(),
                });
            }
        }

        let report = self
            .player
            .update(&mut self.world, input.map(|i| &i.controller), dt);
        if report.jumped {
            self.events.push(GameEvent::Jumped);
        }
        if report.landed {
            self.events.push(GameEvent::Landed);
        }

        self.targets.advance(dt, &mut self.world);
        self.world.step(PHYSICS_DT, dt, MAX_SUBSTEPS);
        self.debris.update(dt, &mut self.world);

        let trigger = input
            .map(|i| TriggerInput {
                fire: i.fire && !i.ui_blocked,
                reload: i.reload,
            })
            .unwrap_or_default();
        match self.loadout.weapon_mut().step(dt, trigger) {
            WeaponAction::Fired => {
                self.events.push(GameEvent::WeaponFired);
                self.resolve_fire();
            }
            WeaponAction::DryFire => self.events.push(GameEvent::DryFire),
            WeaponAction::ReloadStarted => self.events.push(GameEvent::ReloadStarted),
            WeaponAction::ReloadFinished => self.events.push(GameEvent::ReloadFinished),
            WeaponAction::Idle => {}
        }

        self.update_schedule(dt);
        self.timeline.record(self.elapsed, self.score);

        if self.time_left <= 0.0 {
            self.time_left = 0.0;
            self.finish();
        }
        &self.events
    }

    fn toggle_pause(&mut self) {
        match self.phase {
            SessionPhase::Playing => self.pause(),
            SessionPhase::Paused => self.resume(),
            SessionPhase::Menu | SessionPhase::Ended => {}
        }
    }

    /// Freeze a running session (focus loss, menu overlay)
    pub fn pause(&mut self) {
        if self.phase == SessionPhase::Playing {
            self.phase = SessionPhase::Paused;
            self.events.push(GameEvent::Paused);
            log::info!("session paused");
        }
    }

    pub fn resume(&mut self) {
        if self.phase == SessionPhase::Paused {
            self.phase = SessionPhase::Playing;
            self.events.push(GameEvent::Resumed);
            log::info!("session resumed");
        }
    }

    fn resolve_fire(&mut self) {
        let weapon = self.loadout.weapon().config().clone();
        let origin = self.player.eye_position(&self.world);
        let dir = self.player.view_direction();

        let resolution = resolve_shot(
            origin,
            dir,
            weapon.range,
            &self.panels,
            &mut self.targets,
            &self.world,
        );
        match resolution {
            ShotResolution::Plate(plate) => {
                let sensitivity = plate.adjust(self.player.sensitivity());
                self.player.set_sensitivity(sensitivity);
                self.options.sensitivity = self.player.sensitivity();
                self.events.push(GameEvent::SensitivityChanged {
                    sensitivity: self.options.sensitivity,
                });
            }
            ShotResolution::Miss => {
                self.shots += 1;
                self.events.push(GameEvent::Missed);
            }
            ShotResolution::Target { id, .. } => {
                self.shots += 1;
                let damage = if weapon.lethal {
                    self.targets.get(id).map_or(0, |t| t.health)
                } else {
                    weapon.damage
                };
                let position = self.targets.get(id).map(|t| t.position());
                let outcome = self.targets.damage(
                    id,
                    damage,
                    &mut self.world,
                    &mut self.debris,
                    &self.gameplay.target,
                    &mut self.rng,
                );
                match outcome {
                    DamageOutcome::Killed => {
                        self.hits += 1;
                        self.score += KILL_SCORE;
                        self.events.push(GameEvent::TargetKilled {
                            id,
                            position: position.unwrap_or(origin),
                        });
                    }
                    DamageOutcome::Wounded { remaining } => {
                        self.hits += 1;
                        self.score += HIT_SCORE;
                        self.events.push(GameEvent::TargetHit { id, remaining });
                    }
                    DamageOutcome::Ignored => self.events.push(GameEvent::Missed),
                }
            }
        }
    }

    fn update_schedule(&mut self, dt: f32) {
        self.targets.prune(&mut self.world);
        let targets = &self.targets;

        match &mut self.schedule {
            Schedule::Waves(scheduler) => match scheduler.update(dt, |id| targets.is_alive(id)) {
                WaveTick::Continue => {}
                WaveTick::Advance { wave, spawns } => {
                    let ids = spawn_all(
                        &spawns,
                        &mut self.targets,
                        &self.mode,
                        &self.gameplay,
                        self.visuals.as_mut(),
                        &mut self.world,
                        &mut self.rng,
                    );
                    scheduler.register_spawned(ids);
                    self.events.push(GameEvent::WaveStarted { wave });
                }
                WaveTick::Complete => {
                    self.events.push(GameEvent::AllWavesComplete);
                    self.finish();
                }
            },
            Schedule::Continuous(spawner) => {
                let spawns = spawner.update(dt, |id| targets.is_alive(id));
                if !spawns.is_empty() {
                    let ids = spawn_all(
                        &spawns,
                        &mut self.targets,
                        &self.mode,
                        &self.gameplay,
                        self.visuals.as_mut(),
                        &mut self.world,
                        &mut self.rng,
                    );
                    spawner.register_spawned(ids);
                }
            }
        }
    }

    /// End the session and build the summary (idempotent)
    pub fn finish(&mut self) {
        if self.phase == SessionPhase::Ended {
            return;
        }
        self.phase = SessionPhase::Ended;
        let summary = SessionSummary {
            score: self.score,
            wave_reached: self.wave(),
            accuracy: crate::accuracy(self.hits, self.shots),
            hits: self.hits,
            shots: self.shots,
            history: self.timeline.samples().to_vec(),
        };
        log::info!(
            "session ended: score {}, accuracy {:.1}%, wave {}",
            summary.score,
            summary.accuracy,
            summary
                .wave_reached
                .map_or_else(|| "∞".to_string(), |w| w.to_string())
        );
        self.summary = Some(summary);
        self.events.push(GameEvent::SessionEnded);
    }

    fn wave(&self) -> Option<u32> {
        match &self.schedule {
            Schedule::Waves(scheduler) => Some(scheduler.current_wave_number()),
            Schedule::Continuous(_) => None,
        }
    }

    fn wave_count(&self) -> Option<u32> {
        match &self.schedule {
            Schedule::Waves(scheduler) => Some(scheduler.wave_count() as u32),
            Schedule::Continuous(_) => None,
        }
    }

    pub fn hud(&self) -> HudSnapshot {
        let weapon = self.loadout.weapon();
        HudSnapshot {
            score: self.score,
            hits: self.hits,
            shots: self.shots,
            accuracy: crate::accuracy(self.hits, self.shots),
            time_left: self.time_left.max(0.0),
            wave: self.wave(),
            wave_count: self.wave_count(),
            weapon: weapon.config().name.clone(),
            rounds: weapon.rounds(),
            sensitivity: self.player.sensitivity(),
            phase: self.phase,
        }
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn player(&self) -> &CharacterController {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut CharacterController {
        &mut self.player
    }

    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    pub fn debris(&self) -> &DebrisField {
        &self.debris
    }

    pub fn panels(&self) -> &PanelBoard {
        &self.panels
    }

    pub fn mode(&self) -> &ModeConfig {
        &self.mode
    }

    pub fn scene(&self) -> &SceneConfig {
        &self.scene
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn loadout(&self) -> &Loadout {
        &self.loadout
    }

    pub fn eye_position(&self) -> Vec3 {
        self.player.eye_position(&self.world)
    }
}

fn spawn_all(
    spawns: &[SpawnRequest],
    targets: &mut TargetRegistry,
    mode: &ModeConfig,
    gameplay: &GameplayConfig,
    visuals: &mut dyn TargetVisuals,
    world: &mut PhysicsWorld,
    rng: &mut Pcg32,
) -> Vec<TargetId> {
    spawns
        .iter()
        .map(|request| targets.spawn(request, mode, &gameplay.target, visuals, world, rng))
        .collect()
}

//! Target spawning schedules
//!
//! Two schedules share the same spawn layout:
//! - [`WaveScheduler`]: fixed list of timed waves, each ending on timeout or
//!   when every target it spawned is dead
//! - [`ContinuousSpawner`]: keeps a fixed number of targets up, replacing
//!   each kill after a delay
//!
//! Neither ever kills a target. They only read liveness and prune.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::target::{SpawnRequest, TargetId};
use crate::config::WaveConfig;

/// Height of arc spawns
const FALLBACK_SPAWN_Y: f32 = 1.2;
/// Distance of the arc in front of the origin
const FALLBACK_SPAWN_OFFSET: f32 = 5.0;

/// Where targets appear
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnLayout {
    /// Configured points, used round-robin
    pub points: Vec<Vec3>,
    /// Radius of the fallback arc
    pub move_radius: f32,
}

impl SpawnLayout {
    pub fn new(points: Vec<Vec3>, move_radius: f32) -> Self {
        Self {
            points,
            move_radius,
        }
    }

    /// Position of the `i`th of `total` spawns
    pub fn position(&self, i: usize, total: usize) -> Vec3 {
        if !self.points.is_empty() {
            return self.points[i % self.points.len()];
        }
        let angle = i as f32 / total.max(1) as f32 * std::f32::consts::PI - std::f32::consts::FRAC_PI_2;
        Vec3::new(
            angle.cos() * self.move_radius,
            FALLBACK_SPAWN_Y,
            -(angle.sin() * self.move_radius).abs() - FALLBACK_SPAWN_OFFSET,
        )
    }
}

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhase {
    /// Requests issued, waiting for the spawned ids
    Spawning,
    Active,
    /// Terminal
    Complete,
}

/// Result of a scheduler tick
#[derive(Debug, Clone, PartialEq)]
pub enum WaveTick {
    Continue,
    /// The next wave began; spawn these
    Advance { wave: u32, spawns: Vec<SpawnRequest> },
    /// The last wave ended
    Complete,
}

/// Timed wave progression
#[derive(Debug, Clone)]
pub struct WaveScheduler {
    waves: Vec<WaveConfig>,
    layout: SpawnLayout,
    index: usize,
    elapsed: f32,
    active: Vec<TargetId>,
    phase: WavePhase,
}

impl WaveScheduler {
    pub fn new(waves: Vec<WaveConfig>, layout: SpawnLayout) -> Self {
        Self {
            waves,
            layout,
            index: 0,
            elapsed: 0.0,
            active: Vec::new(),
            phase: WavePhase::Complete,
        }
    }

    /// Reset to the first wave and return its spawns
    pub fn start(&mut self) -> Vec<SpawnRequest> {
        self.index = 0;
        self.begin_wave()
    }

    fn begin_wave(&mut self) -> Vec<SpawnRequest> {
        self.elapsed = 0.0;
        self.active.clear();
        let Some(wave) = self.waves.get(self.index) else {
            self.phase = WavePhase::Complete;
            return Vec::new();
        };
        self.phase = WavePhase::Spawning;

        let total = wave.targets as usize;
        let moving = wave.moving_count() as usize;
        log::info!(
            "wave {} starting: {} targets ({} moving), {:.0}s",
            wave.id,
            total,
            moving,
            wave.duration
        );
        (0..total)
            .map(|i| SpawnRequest {
                position: self.layout.position(i, total),
                moving: i < moving,
                speed: wave.speed,
            })
            .collect()
    }

    /// Record the ids created for the current wave's requests
    pub fn register_spawned(&mut self, ids: impl IntoIterator<Item = TargetId>) {
        self.active.extend(ids);
        if self.phase == WavePhase::Spawning {
            self.phase = WavePhase::Active;
        }
    }

    /// Advance the clock, prune dead targets and move to the next wave when
    /// this one times out or is cleared.
    pub fn update(&mut self, dt: f32, is_alive: impl Fn(TargetId) -> bool) -> WaveTick {
        if self.phase != WavePhase::Active {
            return WaveTick::Continue;
        }
        let Some(wave) = self.waves.get(self.index) else {
            self.phase = WavePhase::Complete;
            return WaveTick::Complete;
        };

        self.elapsed += dt;
        self.active.retain(|&id| is_alive(id));

        let expired = self.elapsed >= wave.duration;
        let cleared = self.active.is_empty();
        if !expired && !cleared {
            return WaveTick::Continue;
        }

        if self.index + 1 < self.waves.len() {
            self.index += 1;
            let spawns = self.begin_wave();
            WaveTick::Advance {
                wave: self.current_wave_number(),
                spawns,
            }
        } else {
            log::info!("all waves complete");
            self.phase = WavePhase::Complete;
            WaveTick::Complete
        }
    }

    /// 1-based wave number
    pub fn current_wave_number(&self) -> u32 {
        self.index as u32 + 1
    }

    pub fn phase(&self) -> WavePhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == WavePhase::Complete
    }

    pub fn active(&self) -> &[TargetId] {
        &self.active
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }
}

/// Endless mode: hold `target_count` targets alive
#[derive(Debug, Clone)]
pub struct ContinuousSpawner {
    target_count: usize,
    respawn_delay: f32,
    speed: f32,
    moving_ratio: f32,
    layout: SpawnLayout,
    active: Vec<TargetId>,
    /// Countdown per pending respawn
    pending: Vec<f32>,
    /// Round-robin cursor into the layout
    cursor: usize,
}

impl ContinuousSpawner {
    /// Speed and moving ratio come from `template` (usually the first wave)
    pub fn new(target_count: usize, respawn_delay: f32, template: &WaveConfig, layout: SpawnLayout) -> Self {
        Self {
            target_count,
            respawn_delay,
            speed: template.speed,
            moving_ratio: template.moving_ratio,
            layout,
            active: Vec::new(),
            pending: Vec::new(),
            cursor: 0,
        }
    }

    pub fn start(&mut self) -> Vec<SpawnRequest> {
        self.active.clear();
        self.pending.clear();
        self.cursor = 0;
        log::info!("continuous mode: holding {} targets", self.target_count);
        (0..self.target_count).map(|_| self.next_request()).collect()
    }

    fn next_request(&mut self) -> SpawnRequest {
        let i = self.cursor;
        self.cursor += 1;
        let slot = i % self.target_count.max(1);
        let moving_slots = (self.target_count as f32 * self.moving_ratio).floor() as usize;
        SpawnRequest {
            position: self.layout.position(slot, self.target_count),
            moving: slot < moving_slots,
            speed: self.speed,
        }
    }

    pub fn register_spawned(&mut self, ids: impl IntoIterator<Item = TargetId>) {
        self.active.extend(ids);
    }

    /// Prune kills, count down their replacements and return any now due
    pub fn update(&mut self, dt: f32, is_alive: impl Fn(TargetId) -> bool) -> Vec<SpawnRequest> {
        let before = self.active.len();
        self.active.retain(|&id| is_alive(id));
        let killed = before - self.active.len();
        self.pending
            .extend(std::iter::repeat_n(self.respawn_delay, killed));

        for timer in &mut self.pending {
            *timer -= dt;
        }
        let due = self.pending.iter().filter(|t| **t <= 0.0).count();
        self.pending.retain(|t| *t > 0.0);
        (0..due).map(|_| self.next_request()).collect()
    }

    pub fn active(&self) -> &[TargetId] {
        &self.active
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn wave(id: u32, duration: f32, targets: u32, moving_ratio: f32) -> WaveConfig {
        WaveConfig {
            id,
            duration,
            targets,
            speed: 1.0,
            moving_ratio,
        }
    }

    fn ids(n: u32, offset: u32) -> Vec<TargetId> {
        (0..n).map(|i| TargetId(offset + i)).collect()
    }

    #[test]
    fn test_first_wave_spawn_counts() {
        let mut scheduler = WaveScheduler::new(vec![wave(1, 12.0, 6, 0.2)], SpawnLayout::new(Vec::new(), 6.0));
        let spawns = scheduler.start();
        assert_eq!(spawns.len(), 6);
        assert_eq!(spawns.iter().filter(|s| s.moving).count(), 1);
        // Moving targets are the first spawned
        assert!(spawns[0].moving);
        assert_eq!(scheduler.phase(), WavePhase::Spawning);
        assert_eq!(scheduler.current_wave_number(), 1);
    }

    #[test]
    fn test_advance_on_timeout() {
        let mut scheduler = WaveScheduler::new(
            vec![wave(1, 10.0, 2, 0.0), wave(2, 10.0, 3, 0.0)],
            SpawnLayout::new(Vec::new(), 6.0),
        );
        scheduler.start();
        scheduler.register_spawned(ids(2, 1));

        assert_eq!(scheduler.update(9.9, |_| true), WaveTick::Continue);
        match scheduler.update(0.2, |_| true) {
            WaveTick::Advance { wave, spawns } => {
                assert_eq!(wave, 2);
                assert_eq!(spawns.len(), 3);
            }
            other => panic!("expected advance, got {other:?}"),
        }
        assert_eq!(scheduler.elapsed(), 0.0);
    }

    #[test]
    fn test_advance_on_clear() {
        let mut scheduler = WaveScheduler::new(
            vec![wave(1, 30.0, 2, 0.0), wave(2, 30.0, 1, 0.0)],
            SpawnLayout::new(Vec::new(), 6.0),
        );
        scheduler.start();
        scheduler.register_spawned(ids(2, 1));

        let dead: HashSet<TargetId> = [TargetId(1)].into();
        assert_eq!(scheduler.update(0.1, |id| !dead.contains(&id)), WaveTick::Continue);
        assert_eq!(scheduler.active(), &[TargetId(2)]);
        assert!(matches!(scheduler.update(0.1, |_| false), WaveTick::Advance { wave: 2, .. }));
    }

    #[test]
    fn test_last_wave_completes_and_stays_complete() {
        let mut scheduler = WaveScheduler::new(vec![wave(1, 1.0, 1, 0.0)], SpawnLayout::new(Vec::new(), 6.0));
        scheduler.start();
        scheduler.register_spawned(ids(1, 1));
        assert_eq!(scheduler.update(2.0, |_| true), WaveTick::Complete);
        assert!(scheduler.is_complete());
        assert_eq!(scheduler.update(2.0, |_| true), WaveTick::Continue);
        assert_eq!(scheduler.current_wave_number(), 1);
    }

    #[test]
    fn test_empty_wave_list_is_complete() {
        let mut scheduler = WaveScheduler::new(Vec::new(), SpawnLayout::default());
        assert!(scheduler.start().is_empty());
        assert!(scheduler.is_complete());
    }

    #[test]
    fn test_round_robin_spawn_points() {
        let points = vec![Vec3::X, Vec3::Y];
        let layout = SpawnLayout::new(points, 6.0);
        assert_eq!(layout.position(0, 3), Vec3::X);
        assert_eq!(layout.position(1, 3), Vec3::Y);
        assert_eq!(layout.position(2, 3), Vec3::X);
    }

    #[test]
    fn test_fallback_arc_in_front() {
        let layout = SpawnLayout::new(Vec::new(), 6.0);
        let first = layout.position(0, 4);
        // angle -90°: straight ahead at full radius
        assert!(first.x.abs() < 1e-4);
        assert!((first.z + 11.0).abs() < 1e-4);
        for i in 0..4 {
            let p = layout.position(i, 4);
            assert!(p.z <= -5.0);
            assert_eq!(p.y, 1.2);
        }
    }

    #[test]
    fn test_continuous_respawns_after_delay() {
        let mut spawner = ContinuousSpawner::new(3, 2.5, &wave(1, 10.0, 3, 0.0), SpawnLayout::new(Vec::new(), 6.0));
        assert_eq!(spawner.start().len(), 3);
        spawner.register_spawned(ids(3, 1));

        let dead: HashSet<TargetId> = [TargetId(2)].into();
        assert!(spawner.update(1.0, |id| !dead.contains(&id)).is_empty());
        assert_eq!(spawner.pending(), 1);
        assert!(spawner.update(1.0, |id| !dead.contains(&id)).is_empty());
        let due = spawner.update(1.0, |id| !dead.contains(&id));
        assert_eq!(due.len(), 1);
        assert_eq!(spawner.pending(), 0);
        assert_eq!(spawner.active().len(), 2);
    }
}

//! Weapon fire-rate and reload state machine
//!
//! `Ready → Cooldown → Ready` on each shot and `Ready | Cooldown → Reload →
//! Ready` on a reload. A reload requested in the same frame as a trigger
//! pull wins. Switching weapons throws the old machine away.

use serde::{Deserialize, Serialize};

use crate::config::WeaponConfig;

/// Weapon phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeaponPhase {
    Ready,
    Cooldown { remaining: f32 },
    Reload { remaining: f32 },
}

impl WeaponPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeaponPhase::Ready => "ready",
            WeaponPhase::Cooldown { .. } => "cooldown",
            WeaponPhase::Reload { .. } => "reload",
        }
    }
}

/// Trigger intent for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerInput {
    pub fire: bool,
    pub reload: bool,
}

/// What the weapon did this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponAction {
    Idle,
    Fired,
    ReloadStarted,
    ReloadFinished,
    /// Trigger pulled on an empty magazine
    DryFire,
}

/// One equipped weapon
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponState {
    config: WeaponConfig,
    phase: WeaponPhase,
    /// `None` for weapons without a magazine
    rounds: Option<u32>,
}

/// Count down; `None` once the timer runs out
fn tick_down(remaining: f32, dt: f32) -> Option<f32> {
    let left = remaining - dt;
    if left > 0.0 { Some(left) } else { None }
}

impl WeaponState {
    pub fn new(config: WeaponConfig) -> Self {
        Self {
            rounds: config.magazine,
            config,
            phase: WeaponPhase::Ready,
        }
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    pub fn phase(&self) -> WeaponPhase {
        self.phase
    }

    pub fn rounds(&self) -> Option<u32> {
        self.rounds
    }

    pub fn is_ready(&self) -> bool {
        self.phase == WeaponPhase::Ready
    }

    /// Advance timers, then act on the trigger
    pub fn step(&mut self, dt: f32, input: TriggerInput) -> WeaponAction {
        let mut finished_reload = false;
        self.phase = match self.phase {
            WeaponPhase::Ready => WeaponPhase::Ready,
            WeaponPhase::Cooldown { remaining } => tick_down(remaining, dt)
                .map_or(WeaponPhase::Ready, |remaining| WeaponPhase::Cooldown { remaining }),
            WeaponPhase::Reload { remaining } => match tick_down(remaining, dt) {
                Some(remaining) => WeaponPhase::Reload { remaining },
                None => {
                    self.rounds = self.config.magazine;
                    finished_reload = true;
                    WeaponPhase::Ready
                }
            },
        };

        if input.reload && self.start_reload() {
            return WeaponAction::ReloadStarted;
        }
        if input.fire {
            if let Some(action) = self.try_fire() {
                return action;
            }
        }
        if finished_reload {
            WeaponAction::ReloadFinished
        } else {
            WeaponAction::Idle
        }
    }

    /// Fire if ready. `None` means the trigger pull was ignored.
    pub fn try_fire(&mut self) -> Option<WeaponAction> {
        if self.phase != WeaponPhase::Ready {
            return None;
        }
        if let Some(rounds) = self.rounds.as_mut() {
            if *rounds == 0 {
                return Some(WeaponAction::DryFire);
            }
            *rounds -= 1;
        }
        self.phase = WeaponPhase::Cooldown {
            remaining: self.config.fire_interval(),
        };
        Some(WeaponAction::Fired)
    }

    /// Begin reloading unless already reloading, full, or magazine-less
    pub fn start_reload(&mut self) -> bool {
        if matches!(self.phase, WeaponPhase::Reload { .. }) || self.rounds == self.config.magazine {
            return false;
        }
        self.phase = WeaponPhase::Reload {
            remaining: self.config.reload_time,
        };
        true
    }
}

/// Weapon slots with one live state machine for the equipped slot
#[derive(Debug, Clone)]
pub struct Loadout {
    slots: Vec<WeaponConfig>,
    equipped: usize,
    state: WeaponState,
}

impl Loadout {
    /// Equips slot 0. Weapons that fail validation are dropped with a
    /// warning; an empty slot list falls back to a default rifle.
    pub fn new(slots: Vec<WeaponConfig>) -> Self {
        let mut slots: Vec<WeaponConfig> = slots
            .into_iter()
            .filter(|weapon| match weapon.validate() {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("{err}; dropping weapon");
                    false
                }
            })
            .collect();
        if slots.is_empty() {
            slots.push(WeaponConfig::rifle(6.0, 25));
        }
        let state = WeaponState::new(slots[0].clone());
        Self {
            slots,
            equipped: 0,
            state,
        }
    }

    pub fn weapon(&self) -> &WeaponState {
        &self.state
    }

    pub fn weapon_mut(&mut self) -> &mut WeaponState {
        &mut self.state
    }

    pub fn equipped_slot(&self) -> usize {
        self.equipped
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Switch to a 0-based slot with a fresh state machine. Unknown or
    /// already equipped slots are ignored.
    pub fn switch_to(&mut self, slot: usize) -> bool {
        if slot == self.equipped || slot >= self.slots.len() {
            return false;
        }
        self.equipped = slot;
        self.state = WeaponState::new(self.slots[slot].clone());
        log::debug!("switched to {}", self.state.config().name);
        true
    }
}

//! Consumer-side view of the emulator: drives, warp, session, and speed.

use std::time::Duration;

use core_abi::{ProtocolViolation, SlotLimits};

use crate::speedometer::Speedometer;
use crate::types::{Action, FollowUps, Intent, IntentPriority, ViolationPolicy, WarpMode};

/// Status ticks between two speed updates.
pub const SPEED_UPDATE_TICKS: u64 = 4;

/// Front-end preferences and limits the router consults.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouterConfig {
    pub limits: SlotLimits,
    pub violation_policy: ViolationPolicy,
    /// Play head-step clicks.
    pub drive_noise: bool,
    /// Stay quiet for head polling even when drive noise is on.
    pub drive_noise_no_poll: bool,
    pub warp_mode: WarpMode,
    /// In `WarpMode::Auto`, warp while a floppy motor spins.
    pub warp_load: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            limits: SlotLimits::default(),
            violation_policy: ViolationPolicy::default(),
            drive_noise: true,
            drive_noise_no_poll: false,
            warp_mode: WarpMode::Auto,
            warp_load: true,
        }
    }
}

/// Counters for events the router refused.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorldHealth {
    /// Protocol violations dropped under `ViolationPolicy::LogAndSkip`.
    pub skipped_violations: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub config: RouterConfig,
    /// Bit `n` set while floppy `n` is connected.
    pub connected_drives: u8,
    /// Bit `n` set while hard drive `n` is connected.
    pub connected_hard_drives: u8,
    /// Bit `n` set while floppy `n`'s motor spins.
    pub spinning: u8,
    /// Last warp state reported by the core.
    pub warp: bool,
    /// Last warp state requested from the core.
    pub warp_requested: Option<bool>,
    /// Set once the machine has run since the session was last saved.
    pub needs_saving: bool,
    pub running: bool,
    pub powered_on: bool,
    pub animation_counter: u64,
    pub speedometer: Speedometer,
    pub health: WorldHealth,
}

impl World {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            connected_drives: 0,
            connected_hard_drives: 0,
            spinning: 0,
            warp: false,
            warp_requested: None,
            needs_saving: false,
            running: false,
            powered_on: false,
            animation_counter: 0,
            speedometer: Speedometer::new(),
            health: WorldHealth::default(),
        }
    }

    pub fn limits(&self) -> SlotLimits {
        self.config.limits
    }

    pub fn any_motor_spinning(&self) -> bool {
        self.spinning != 0
    }

    pub fn mark_saved(&mut self) {
        self.needs_saving = false;
    }

    /// Warp state the current policy asks for.
    pub fn desired_warp(&self) -> bool {
        match self.config.warp_mode {
            WarpMode::Auto => self.any_motor_spinning() && self.config.warp_load,
            WarpMode::On => true,
            WarpMode::Off => false,
        }
    }

    /// Queues a warp change if the policy disagrees with the last request.
    pub(crate) fn update_warp(&mut self, follow_ups: &mut FollowUps) {
        let desired = self.desired_warp();
        if self.warp_requested != Some(desired) {
            self.warp_requested = Some(desired);
            follow_ups.push_deferred_intent(IntentPriority::P1, Intent::SetWarp(desired));
        }
    }

    /// Advances the status animation by one tick.
    ///
    /// Every [`SPEED_UPDATE_TICKS`] ticks the speedometer is fed the CPU
    /// cycle count (a quarter of the master clock) and the frame count.
    pub fn tick(&mut self, master_clock: u64, frames: u64, now: Duration) -> FollowUps {
        self.animation_counter += 1;
        let mut follow_ups = FollowUps::new();
        if self.animation_counter % SPEED_UPDATE_TICKS == 0 {
            let sample = self.speedometer.update(master_clock / 4, frames, now);
            follow_ups.push_immediate(Action::ShowSpeed(sample));
        }
        follow_ups
    }

    /// Applies the configured policy to an event that cannot be routed.
    pub(crate) fn reject(&mut self, violation: ProtocolViolation) -> FollowUps {
        match self.config.violation_policy {
            ViolationPolicy::Abort => panic!("event protocol violation: {violation}"),
            ViolationPolicy::LogAndSkip => {
                log::error!("skipping event: {violation}");
                self.health.skipped_violations += 1;
                FollowUps::new()
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

/// Slots past the mask width are not tracked.
pub(crate) fn set_bit(mask: &mut u8, slot: usize, on: bool) {
    let Some(bit) = u32::try_from(slot).ok().and_then(|s| 1u8.checked_shl(s)) else {
        return;
    };
    if on {
        *mask |= bit;
    } else {
        *mask &= !bit;
    }
}

//! Narrow interfaces to the presentation layer.
//!
//! Each trait covers one widget or subsystem the router can touch. All calls
//! happen on the consumer context; implementations use interior mutability.

use core_abi::BridgeError;
use world::{DeviceSlot, PowerLed, SerialDirection, SoundCue, SpeedSample};

pub trait StatusBar: Send + Sync {
    /// Redraws drive, warp, and media indicators from current core state.
    fn refresh(&self);
    fn show_speed(&self, sample: SpeedSample);
}

pub trait DeviceLeds: Send + Sync {
    fn set_drive_led(&self, slot: usize, on: bool);
    fn set_power_led(&self, led: PowerLed);
    /// Shows or hides the menu entry for a connected drive.
    fn set_drive_visible(&self, slot: DeviceSlot, visible: bool);
}

pub trait SoundCues: Send + Sync {
    fn play(&self, cue: SoundCue);
}

pub trait Toolbar: Send + Sync {
    /// Re-evaluates which toolbar items are enabled.
    fn validate(&self);
}

pub trait SerialLog: Send + Sync {
    fn append(&self, direction: SerialDirection, byte: u8);
    fn clear(&self);
}

pub trait Inspector: Send + Sync {
    /// Full refresh of every inspector panel.
    fn refresh(&self);
}

pub trait Preferences: Send + Sync {
    fn open(&self);
}

/// Surfaces command failures to the user.
pub trait Notices: Send + Sync {
    fn notify(&self, error: &BridgeError);
}

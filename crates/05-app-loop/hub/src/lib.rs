//! Collaborator hub and the typed command surface.

use std::sync::Arc;

use anyhow::{anyhow, Result};

pub mod collaborators;
pub mod commands;

pub use collaborators::{
    DeviceLeds, Inspector, Notices, Preferences, SerialLog, SoundCues, StatusBar, Toolbar,
};
pub use commands::Commands;
pub use world::{
    Action, CoreCmd, EventRouter, FollowUps, Intent, IntentPriority, IntentReducer, World,
};

/// Default budget for processing intents per scheduler pass.
pub const DEFAULT_INTENT_BUDGET: usize = 3;
/// Default budget for draining events per scheduler pass.
pub const DEFAULT_EVENT_BUDGET: usize = 64;

/// Aggregates the presentation-layer collaborators the router drives.
#[derive(Clone)]
pub struct Collaborators {
    status: Arc<dyn StatusBar>,
    leds: Arc<dyn DeviceLeds>,
    sounds: Arc<dyn SoundCues>,
    toolbar: Arc<dyn Toolbar>,
    serial: Arc<dyn SerialLog>,
    inspector: Arc<dyn Inspector>,
    preferences: Arc<dyn Preferences>,
    notices: Arc<dyn Notices>,
}

impl Collaborators {
    /// Creates a new builder for constructing a hub.
    pub fn builder() -> CollaboratorsBuilder {
        CollaboratorsBuilder::new()
    }

    /// Forwards one routed action to the collaborator that owns it.
    pub fn apply(&self, action: Action) {
        match action {
            Action::RefreshStatus => self.status.refresh(),
            Action::ShowSpeed(sample) => self.status.show_speed(sample),
            Action::RefreshInspector => self.inspector.refresh(),
            Action::ValidateToolbar => self.toolbar.validate(),
            Action::SetDriveLed { slot, on } => self.leds.set_drive_led(slot, on),
            Action::SetPowerLed(led) => self.leds.set_power_led(led),
            Action::SetDriveVisible { slot, visible } => self.leds.set_drive_visible(slot, visible),
            Action::PlaySound(cue) => self.sounds.play(cue),
            Action::AppendSerial { direction, byte } => self.serial.append(direction, byte),
            Action::ClearSerial => self.serial.clear(),
            Action::OpenPreferences => self.preferences.open(),
        }
    }

    /// Applies every immediate action in order.
    pub fn apply_all(&self, actions: impl IntoIterator<Item = Action>) {
        for action in actions {
            self.apply(action);
        }
    }

    pub fn notices(&self) -> &dyn Notices {
        self.notices.as_ref()
    }
}

/// Builder for assembling [`Collaborators`] from individual handles.
#[derive(Default)]
pub struct CollaboratorsBuilder {
    status: Option<Arc<dyn StatusBar>>,
    leds: Option<Arc<dyn DeviceLeds>>,
    sounds: Option<Arc<dyn SoundCues>>,
    toolbar: Option<Arc<dyn Toolbar>>,
    serial: Option<Arc<dyn SerialLog>>,
    inspector: Option<Arc<dyn Inspector>>,
    preferences: Option<Arc<dyn Preferences>>,
    notices: Option<Arc<dyn Notices>>,
}

impl CollaboratorsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_bar(mut self, status: Arc<dyn StatusBar>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn leds(mut self, leds: Arc<dyn DeviceLeds>) -> Self {
        self.leds = Some(leds);
        self
    }

    pub fn sounds(mut self, sounds: Arc<dyn SoundCues>) -> Self {
        self.sounds = Some(sounds);
        self
    }

    pub fn toolbar(mut self, toolbar: Arc<dyn Toolbar>) -> Self {
        self.toolbar = Some(toolbar);
        self
    }

    pub fn serial(mut self, serial: Arc<dyn SerialLog>) -> Self {
        self.serial = Some(serial);
        self
    }

    pub fn inspector(mut self, inspector: Arc<dyn Inspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn preferences(mut self, preferences: Arc<dyn Preferences>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn notices(mut self, notices: Arc<dyn Notices>) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Builds [`Collaborators`], returning an error if any handle is missing.
    pub fn build(self) -> Result<Collaborators> {
        Ok(Collaborators {
            status: self.status.ok_or_else(|| anyhow!("missing status bar"))?,
            leds: self.leds.ok_or_else(|| anyhow!("missing device LEDs"))?,
            sounds: self.sounds.ok_or_else(|| anyhow!("missing sound cues"))?,
            toolbar: self.toolbar.ok_or_else(|| anyhow!("missing toolbar"))?,
            serial: self.serial.ok_or_else(|| anyhow!("missing serial log"))?,
            inspector: self.inspector.ok_or_else(|| anyhow!("missing inspector"))?,
            preferences: self
                .preferences
                .ok_or_else(|| anyhow!("missing preferences"))?,
            notices: self.notices.ok_or_else(|| anyhow!("missing notices"))?,
        })
    }
}

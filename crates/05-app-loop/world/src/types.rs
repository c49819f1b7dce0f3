//! Intent, command, and follow-up types shared by the router and scheduler.

use serde::Deserialize;
use smallvec::SmallVec;

/// Priority level for intent scheduling (P0 is highest).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentPriority {
    /// Lifecycle changes the user is waiting on.
    P0,
    /// Follow-ups produced while routing events.
    P1,
    /// Preference-driven adjustments.
    P2,
}

/// How warp (unthrottled) speed is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarpMode {
    /// Warp while a floppy motor spins, if warp-on-load is enabled.
    #[default]
    Auto,
    On,
    Off,
}

/// What the router does with an event that breaks the closed-world contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationPolicy {
    /// Panic with the violation. A core emitting such events is defective.
    #[default]
    Abort,
    /// Log at error level and route nothing.
    LogAndSkip,
}

/// Intent emitted by the front end, the scheduler, or deferred follow-ups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Run,
    Pause,
    PowerOn,
    PowerOff,
    /// Request warp on or off directly.
    SetWarp(bool),
    /// Switch warp policy and re-evaluate it.
    SetWarpMode(WarpMode),
}

impl Intent {
    /// Returns the scheduler priority for this intent.
    pub fn priority(&self) -> IntentPriority {
        match self {
            Intent::Run | Intent::Pause | Intent::PowerOn | Intent::PowerOff => IntentPriority::P0,
            Intent::SetWarp(_) => IntentPriority::P1,
            Intent::SetWarpMode(_) => IntentPriority::P2,
        }
    }
}

/// Command the scheduler issues to the core through the typed command surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoreCmd {
    Run,
    Pause,
    PowerOn,
    PowerOff,
    SetWarp(bool),
}

/// Which device a slot-bearing action refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceSlot {
    Floppy(usize),
    HardDrive(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerLed {
    On,
    Dim,
    Off,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundCue {
    /// Mechanical click of a drive head stepping.
    HeadStep(DeviceSlot),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerialDirection {
    In,
    Out,
}

/// Smoothed emulation speed shown on the status bar.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpeedSample {
    pub mhz: f64,
    pub fps: f64,
}

/// Immediate collaborator update produced while routing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    RefreshStatus,
    RefreshInspector,
    ValidateToolbar,
    SetDriveLed { slot: usize, on: bool },
    SetPowerLed(PowerLed),
    SetDriveVisible { slot: DeviceSlot, visible: bool },
    PlaySound(SoundCue),
    AppendSerial { direction: SerialDirection, byte: u8 },
    ClearSerial,
    OpenPreferences,
    ShowSpeed(SpeedSample),
}

/// Follow-up actions produced while reducing events.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FollowUps {
    /// Collaborator updates applied right away, in order.
    pub immediate: SmallVec<[Action; 8]>,
    /// Intents to enqueue for the next scheduler pass.
    pub deferred_intents: SmallVec<[(IntentPriority, Intent); 4]>,
}

impl FollowUps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_immediate(&mut self, action: Action) {
        self.immediate.push(action);
    }

    pub fn push_deferred_intent(&mut self, priority: IntentPriority, intent: Intent) {
        self.deferred_intents.push((priority, intent));
    }

    pub fn is_empty(&self) -> bool {
        self.immediate.is_empty() && self.deferred_intents.is_empty()
    }

    pub fn extend(&mut self, other: FollowUps) {
        self.immediate.extend(other.immediate);
        self.deferred_intents.extend(other.deferred_intents);
    }
}

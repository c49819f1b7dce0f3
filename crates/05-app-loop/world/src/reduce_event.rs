//! Closed-world event router.
//!
//! Every [`EventKind`] has an arm below, including the ones that do nothing.
//! A new kind added to `core-abi` fails to compile here until it is routed.

use core_abi::{Event, EventKind, Payload, RawEvent};

use crate::types::{
    Action, DeviceSlot, FollowUps, Intent, IntentPriority, PowerLed, SerialDirection, SoundCue,
};
use crate::world::{set_bit, World};

/// Trait for turning core events into collaborator updates.
pub trait EventRouter {
    /// Routes one event. Must run on the consumer context.
    fn reduce_event(&mut self, raw: RawEvent) -> FollowUps;
}

impl EventRouter for World {
    fn reduce_event(&mut self, raw: RawEvent) -> FollowUps {
        let event = match Event::decode(raw, self.limits()) {
            Ok(event) => event,
            Err(violation) => return self.reject(violation),
        };
        log::trace!("routing {} {:?}", event.kind, event.payload);

        let mut follow_ups = FollowUps::new();
        match event.kind {
            EventKind::Config
            | EventKind::MemLayout
            | EventKind::BreakpointConfig
            | EventKind::BreakpointReached
            | EventKind::WatchpointReached
            | EventKind::HardBreakpointReached
            | EventKind::IllegalInstruction
            | EventKind::Reset
            | EventKind::SnapshotRestored => {
                follow_ups.push_immediate(Action::RefreshInspector);
            }

            EventKind::DiskInsert
            | EventKind::DiskEject
            | EventKind::DiskUnsaved
            | EventKind::DiskSaved
            | EventKind::DiskProtected
            | EventKind::DiskUnprotected => {
                follow_ups.push_immediate(Action::RefreshStatus);
            }
            EventKind::WarpOn | EventKind::WarpOff => {
                self.warp = event.kind == EventKind::WarpOn;
                follow_ups.push_immediate(Action::RefreshStatus);
            }

            EventKind::DriveLedOn | EventKind::DriveLedOff => {
                follow_ups.push_immediate(Action::SetDriveLed {
                    slot: slot(&event),
                    on: event.kind == EventKind::DriveLedOn,
                });
            }

            EventKind::DriveMotorOn | EventKind::DriveMotorOff => {
                let on = event.kind == EventKind::DriveMotorOn;
                set_bit(&mut self.spinning, slot(&event), on);
                self.update_warp(&mut follow_ups);
                follow_ups.push_immediate(Action::RefreshStatus);
            }

            EventKind::DriveHead => {
                if self.config.drive_noise {
                    follow_ups.push_immediate(head_step(&event));
                }
            }
            EventKind::DriveHeadPoll => {
                if self.config.drive_noise && !self.config.drive_noise_no_poll {
                    follow_ups.push_immediate(head_step(&event));
                }
            }
            EventKind::HdStep => {
                if self.config.drive_noise {
                    follow_ups.push_immediate(head_step(&event));
                }
            }

            EventKind::DriveConnect | EventKind::DriveDisconnect => {
                let visible = event.kind == EventKind::DriveConnect;
                set_bit(&mut self.connected_drives, slot(&event), visible);
                follow_ups.push_immediate(Action::SetDriveVisible {
                    slot: device(&event),
                    visible,
                });
                follow_ups.push_immediate(Action::RefreshStatus);
            }
            EventKind::HdConnect | EventKind::HdDisconnect => {
                let visible = event.kind == EventKind::HdConnect;
                set_bit(&mut self.connected_hard_drives, slot(&event), visible);
                follow_ups.push_immediate(Action::SetDriveVisible {
                    slot: device(&event),
                    visible,
                });
                follow_ups.push_immediate(Action::RefreshStatus);
            }

            EventKind::SerialIn | EventKind::SerialOut => {
                if let Some(byte) = event.serial_byte() {
                    let direction = if event.kind == EventKind::SerialIn {
                        SerialDirection::In
                    } else {
                        SerialDirection::Out
                    };
                    follow_ups.push_immediate(Action::AppendSerial { direction, byte });
                }
            }

            EventKind::ReadyToPowerOn => {
                follow_ups.push_deferred_intent(IntentPriority::P0, Intent::Run);
            }
            EventKind::Run => {
                self.running = true;
                self.needs_saving = true;
                follow_ups.push_immediate(Action::ValidateToolbar);
                follow_ups.push_immediate(Action::RefreshInspector);
            }
            EventKind::Pause => {
                self.running = false;
                follow_ups.push_immediate(Action::ValidateToolbar);
                follow_ups.push_immediate(Action::RefreshInspector);
            }
            EventKind::PowerOn => {
                self.powered_on = true;
                follow_ups.push_immediate(Action::ClearSerial);
                follow_ups.push_immediate(Action::ValidateToolbar);
                follow_ups.push_immediate(Action::RefreshInspector);
            }
            EventKind::PowerOff => {
                self.powered_on = false;
                self.running = false;
                follow_ups.push_immediate(Action::ValidateToolbar);
                follow_ups.push_immediate(Action::RefreshInspector);
            }

            EventKind::PowerLedOn => follow_ups.push_immediate(Action::SetPowerLed(PowerLed::On)),
            EventKind::PowerLedDim => follow_ups.push_immediate(Action::SetPowerLed(PowerLed::Dim)),
            EventKind::PowerLedOff => follow_ups.push_immediate(Action::SetPowerLed(PowerLed::Off)),

            EventKind::RomMissing => follow_ups.push_immediate(Action::OpenPreferences),

            EventKind::DmaDebugOn
            | EventKind::DmaDebugOff
            | EventKind::SnapshotTaken
            | EventKind::CpuOk
            | EventKind::SoftBreakpointReached
            | EventKind::Shutdown => {}
        }

        follow_ups
    }
}

/// Slot of a slot-carrying kind. Decoding guarantees the payload shape.
fn slot(event: &Event) -> usize {
    match event.payload {
        Payload::DriveSlot(slot) | Payload::HardDriveSlot(slot) => slot,
        Payload::None | Payload::SerialByte(_) => {
            unreachable!("{} decoded without a slot", event.kind)
        }
    }
}

fn device(event: &Event) -> DeviceSlot {
    match event.payload {
        Payload::HardDriveSlot(slot) => DeviceSlot::HardDrive(slot),
        _ => DeviceSlot::Floppy(slot(event)),
    }
}

fn head_step(event: &Event) -> Action {
    Action::PlaySound(SoundCue::HeadStep(device(event)))
}

//! Event vocabulary reported by the simulation core.
//!
//! The core hands the dispatch queue a [`RawEvent`] (wire code plus a small
//! integer). Decoding into a typed [`Event`] happens on the consumer side so a
//! code outside the closed [`EventKind`] set, or a slot outside the configured
//! device range, surfaces as a [`ProtocolViolation`] instead of a silent drop.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Describes which payload, if any, an event kind carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PayloadClass {
    /// The payload is ignored.
    None,
    /// Floppy drive slot index (DF0..DFn).
    DriveSlot,
    /// Hard drive slot index (HD0..HDn).
    HardDriveSlot,
    /// One serial byte; only the low 8 bits are significant.
    SerialByte,
}

macro_rules! event_kinds {
    ($( $(#[$meta:meta])* $name:ident = $code:literal => $payload:ident, )*) => {
        /// Closed set of state-change categories emitted by the core.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
        #[repr(u16)]
        pub enum EventKind {
            $( $(#[$meta])* $name = $code, )*
        }

        impl EventKind {
            /// Every kind, in wire-code order.
            pub const ALL: &'static [EventKind] = &[$( EventKind::$name, )*];

            /// Looks up a kind by wire code.
            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $( $code => Some(EventKind::$name), )*
                    _ => None,
                }
            }

            /// Payload carried by this kind.
            pub const fn payload_class(self) -> PayloadClass {
                match self {
                    $( EventKind::$name => PayloadClass::$payload, )*
                }
            }

            /// Stable name used in logs and CLI output.
            pub const fn name(self) -> &'static str {
                match self {
                    $( EventKind::$name => stringify!($name), )*
                }
            }
        }
    };
}

event_kinds! {
    /// Configuration of the emulated machine changed.
    Config = 1 => None,
    /// Memory layout changed.
    MemLayout = 2 => None,
    /// Core finished initialising and may be launched.
    ReadyToPowerOn = 3 => None,
    /// Emulation thread entered the running state.
    Run = 4 => None,
    /// Emulation thread paused.
    Pause = 5 => None,
    PowerOn = 6 => None,
    PowerOff = 7 => None,
    Reset = 8 => None,
    /// Emulation thread is shutting down.
    Shutdown = 9 => None,

    WarpOn = 20 => None,
    WarpOff = 21 => None,

    PowerLedOn = 30 => None,
    PowerLedDim = 31 => None,
    PowerLedOff = 32 => None,

    DmaDebugOn = 40 => None,
    DmaDebugOff = 41 => None,

    DriveConnect = 50 => DriveSlot,
    DriveDisconnect = 51 => DriveSlot,
    DiskInsert = 52 => DriveSlot,
    DiskEject = 53 => DriveSlot,
    DiskUnsaved = 54 => DriveSlot,
    DiskSaved = 55 => DriveSlot,
    DiskProtected = 56 => DriveSlot,
    DiskUnprotected = 57 => DriveSlot,
    DriveLedOn = 58 => DriveSlot,
    DriveLedOff = 59 => DriveSlot,
    DriveMotorOn = 60 => DriveSlot,
    DriveMotorOff = 61 => DriveSlot,
    /// Drive head moved by one cylinder.
    DriveHead = 62 => DriveSlot,
    /// Periodic head movement caused by the OS polling for a disk.
    DriveHeadPoll = 63 => DriveSlot,

    HdConnect = 70 => HardDriveSlot,
    HdDisconnect = 71 => HardDriveSlot,
    HdStep = 72 => HardDriveSlot,

    SerialIn = 80 => SerialByte,
    SerialOut = 81 => SerialByte,

    BreakpointConfig = 90 => None,
    BreakpointReached = 91 => None,
    WatchpointReached = 92 => None,
    CpuOk = 93 => None,
    SoftBreakpointReached = 94 => None,
    HardBreakpointReached = 95 => None,
    IllegalInstruction = 96 => None,

    /// Kickstart ROM is missing; the machine cannot power on.
    RomMissing = 100 => None,
    SnapshotTaken = 101 => None,
    SnapshotRestored = 102 => None,
}

impl EventKind {
    /// Wire code of this kind.
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event as handed over by the producer, before closed-world validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RawEvent {
    /// Wire code of the event kind.
    pub code: u16,
    /// Kind-dependent payload.
    pub payload: u32,
}

impl RawEvent {
    /// Builds a raw event from a known kind.
    pub const fn new(kind: EventKind, payload: u32) -> Self {
        Self {
            code: kind.code(),
            payload,
        }
    }
}

/// Number of device slots the consumer knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SlotLimits {
    /// Floppy drive slots (DF0..DFn).
    pub drives: usize,
    /// Hard drive slots (HD0..HDn).
    pub hard_drives: usize,
}

impl Default for SlotLimits {
    fn default() -> Self {
        Self {
            drives: 4,
            hard_drives: 4,
        }
    }
}

/// Validated payload of an [`Event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Payload {
    None,
    DriveSlot(usize),
    HardDriveSlot(usize),
    SerialByte(u8),
}

/// Immutable record of one state change, validated against the closed kind set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub payload: Payload,
}

impl Event {
    /// Decodes a raw event, rejecting unknown kinds and out-of-range slots.
    pub fn decode(raw: RawEvent, limits: SlotLimits) -> Result<Self, ProtocolViolation> {
        let kind =
            EventKind::from_code(raw.code).ok_or(ProtocolViolation::UnknownKind { code: raw.code })?;
        let payload = match kind.payload_class() {
            PayloadClass::None => Payload::None,
            PayloadClass::DriveSlot => {
                Payload::DriveSlot(check_slot(kind, raw.payload, limits.drives)?)
            }
            PayloadClass::HardDriveSlot => {
                Payload::HardDriveSlot(check_slot(kind, raw.payload, limits.hard_drives)?)
            }
            // SERDAT carries stop bits above the data byte.
            PayloadClass::SerialByte => Payload::SerialByte((raw.payload & 0xFF) as u8),
        };
        Ok(Self { kind, payload })
    }

    /// Device slot for slot-carrying kinds.
    pub fn slot(&self) -> Option<usize> {
        match self.payload {
            Payload::DriveSlot(slot) | Payload::HardDriveSlot(slot) => Some(slot),
            Payload::None | Payload::SerialByte(_) => None,
        }
    }

    /// Serial byte for `SerialIn`/`SerialOut`.
    pub fn serial_byte(&self) -> Option<u8> {
        match self.payload {
            Payload::SerialByte(byte) => Some(byte),
            _ => None,
        }
    }
}

fn check_slot(kind: EventKind, payload: u32, limit: usize) -> Result<usize, ProtocolViolation> {
    let slot = payload as usize;
    if slot < limit {
        Ok(slot)
    } else {
        Err(ProtocolViolation::SlotOutOfRange {
            kind,
            slot: payload,
            limit,
        })
    }
}

/// Mismatch between what the core emitted and what the consumer understands.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("unknown event code {code}")]
    UnknownKind { code: u16 },

    #[error("{kind} carries slot {slot}, but only {limit} slots exist")]
    SlotOutOfRange {
        kind: EventKind,
        slot: u32,
        limit: usize,
    },
}

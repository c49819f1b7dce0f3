//! Boundary types shared between the simulation core and the presentation layer.
//!
//! This crate defines the protocol boundary between the emulator core (layer 04)
//! and the consumer-side app loop (layer 05): the closed event vocabulary, the
//! error taxonomy, the fallible call adapter, and the `EmulatorCore` command
//! surface. It has no knowledge of collaborators or scheduling.

/// Fallible call adapter and the closed operation set.
pub mod call;
/// Raw error codes, error slots, and the typed error taxonomy.
pub mod error;
/// Event kinds, raw events, and payload decoding.
pub mod event;
/// Command surface implemented by simulation cores.
pub mod surface;

pub use crate::call::{call, call_value, Operation};
pub use crate::surface::{
    BootBlock, EmulatorCore, FileKind, Geometry, HardDriveSource, MediaFile, RecordingRequest,
    RomSource, VolumeType,
};
pub use crate::error::{classify, BridgeError, BridgeResult, ErrorCode, ErrorSlot, RawCode};
pub use crate::event::{
    Event, EventKind, Payload, PayloadClass, ProtocolViolation, RawEvent, SlotLimits,
};

//! Command surface of a simulation core.
//!
//! Methods mirror the core's native calling convention: fallible operations
//! receive an [`ErrorSlot`] alongside their arguments and report failure by
//! filling it in. Consumers never call these directly; they go through the
//! adapter in [`crate::call`].

use crate::error::ErrorSlot;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Media container types understood by the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    /// Amiga floppy disk.
    Adf,
    /// Extended Amiga floppy disk.
    Eadf,
    /// PC floppy disk.
    Img,
    /// Amiga hard drive image.
    Hdf,
    /// Kickstart ROM.
    Rom,
    /// Extension ROM.
    ExtRom,
    Snapshot,
}

impl FileKind {
    /// Whether the kind can be inserted into a floppy drive.
    pub fn is_floppy(self) -> bool {
        matches!(self, FileKind::Adf | FileKind::Eadf | FileKind::Img)
    }
}

/// Opaque media file produced by the core's factory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaFile {
    kind: FileKind,
    bytes: Arc<[u8]>,
}

impl MediaFile {
    pub fn new(kind: FileKind, bytes: Arc<[u8]>) -> Self {
        Self { kind, bytes }
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Where ROM data is loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RomSource {
    File(PathBuf),
    Buffer(Arc<[u8]>),
    Media(MediaFile),
}

/// Hard drive geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub cylinders: u32,
    pub heads: u32,
    pub sectors: u32,
    /// Block size in bytes.
    pub bsize: u32,
}

impl Geometry {
    pub fn new(cylinders: u32, heads: u32, sectors: u32) -> Self {
        Self {
            cylinders,
            heads,
            sectors,
            bsize: 512,
        }
    }

    /// Capacity described by the geometry.
    pub fn num_bytes(&self) -> u64 {
        u64::from(self.cylinders)
            * u64::from(self.heads)
            * u64::from(self.sectors)
            * u64::from(self.bsize)
    }
}

/// What gets attached to a hard drive slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HardDriveSource {
    File(PathBuf),
    Media(MediaFile),
    /// A blank drive with the given geometry.
    Blank(Geometry),
}

/// File system used when formatting new volumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VolumeType {
    Ofs,
    Ffs,
    NoDos,
}

/// Boot block written to freshly formatted floppies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BootBlock {
    None,
    AmigaDos13,
    AmigaDos20,
}

/// Parameters for the screen recorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RecordingRequest {
    /// Capture rectangle as `(x, y, width, height)`.
    pub rect: (u32, u32, u32, u32),
    pub bit_rate: u32,
    pub aspect_x: u32,
    pub aspect_y: u32,
}

/// Operations exposed by a simulation core.
///
/// Implementations run their own execution context and are responsible for
/// serialising concurrent mutations; every method is callable through a
/// shared reference.
pub trait EmulatorCore: Send + Sync {
    // Lifecycle
    fn is_ready(&self, err: &mut ErrorSlot);
    fn run(&self, err: &mut ErrorSlot);
    fn pause(&self, err: &mut ErrorSlot);
    fn power_on(&self, err: &mut ErrorSlot);
    fn power_off(&self, err: &mut ErrorSlot);
    fn set_warp(&self, enabled: bool, err: &mut ErrorSlot);
    fn export_config(&self, path: &Path, err: &mut ErrorSlot);
    fn load_snapshot(&self, media: &MediaFile, err: &mut ErrorSlot);

    // Observation (never fails)
    fn is_running(&self) -> bool;
    fn is_powered_on(&self) -> bool;
    /// Master clock in cycles.
    fn master_clock(&self) -> u64;
    /// Frames produced since power-on.
    fn frame_count(&self) -> u64;

    // Memory
    fn load_rom(&self, source: &RomSource, err: &mut ErrorSlot);
    fn load_ext(&self, source: &RomSource, err: &mut ErrorSlot);
    fn save_rom(&self, path: &Path, err: &mut ErrorSlot);
    fn save_wom(&self, path: &Path, err: &mut ErrorSlot);
    fn save_ext(&self, path: &Path, err: &mut ErrorSlot);

    // Media factory
    fn make_media(&self, bytes: &[u8], kind: FileKind, err: &mut ErrorSlot) -> Option<MediaFile>;
    /// Writes a media file to the host and returns the number of bytes written.
    fn write_media(&self, media: &MediaFile, path: &Path, err: &mut ErrorSlot) -> usize;

    // Floppy drives
    fn insert_disk(&self, drive: usize, media: &MediaFile, protected: bool, err: &mut ErrorSlot);
    fn insert_blank_disk(
        &self,
        drive: usize,
        fs: VolumeType,
        boot: BootBlock,
        name: &str,
        err: &mut ErrorSlot,
    );
    fn eject_disk(&self, drive: usize, err: &mut ErrorSlot);
    fn export_disk(&self, drive: usize, kind: FileKind, err: &mut ErrorSlot) -> Option<MediaFile>;

    // Hard drives
    fn attach_hard_drive(&self, slot: usize, source: &HardDriveSource, err: &mut ErrorSlot);
    fn format_hard_drive(&self, slot: usize, fs: VolumeType, name: &str, err: &mut ErrorSlot);
    fn change_geometry(&self, slot: usize, geometry: Geometry, err: &mut ErrorSlot);
    fn write_hard_drive(&self, slot: usize, path: &Path, err: &mut ErrorSlot);
    fn enable_write_through(&self, slot: usize, err: &mut ErrorSlot);

    // File systems
    fn export_file_system(
        &self,
        media: &MediaFile,
        partition: usize,
        dir: &Path,
        err: &mut ErrorSlot,
    );

    // Recorder
    fn start_recording(&self, request: &RecordingRequest, err: &mut ErrorSlot);
}

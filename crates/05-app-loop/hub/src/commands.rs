//! Typed command surface over an [`EmulatorCore`].
//!
//! Every method routes through [`call`] or [`call_value`], so callers only
//! ever see `Result<T, BridgeError>`. Device slots are checked here, before
//! the core is involved.

use std::path::Path;
use std::sync::Arc;

use core_abi::{
    call, call_value, BootBlock, BridgeError, BridgeResult, EmulatorCore, ErrorCode, FileKind,
    Geometry, HardDriveSource, MediaFile, Operation, RecordingRequest, RomSource, SlotLimits,
    VolumeType,
};
use world::CoreCmd;

pub struct Commands<C: EmulatorCore> {
    core: Arc<C>,
    limits: SlotLimits,
}

impl<C: EmulatorCore> Clone for Commands<C> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            limits: self.limits,
        }
    }
}

impl<C: EmulatorCore> Commands<C> {
    pub fn new(core: Arc<C>, limits: SlotLimits) -> Self {
        Self { core, limits }
    }

    pub fn core(&self) -> &Arc<C> {
        &self.core
    }

    /// Executes a scheduler command.
    pub fn execute(&self, cmd: CoreCmd) -> BridgeResult<()> {
        match cmd {
            CoreCmd::Run => self.run(),
            CoreCmd::Pause => self.pause(),
            CoreCmd::PowerOn => self.power_on(),
            CoreCmd::PowerOff => self.power_off(),
            CoreCmd::SetWarp(on) => self.set_warp(on),
        }
    }

    // Lifecycle

    /// Succeeds if the machine could power on with its current configuration.
    pub fn is_ready(&self) -> BridgeResult<()> {
        call(Operation::IsReady, |err| self.core.is_ready(err))
    }

    pub fn run(&self) -> BridgeResult<()> {
        call(Operation::Run, |err| self.core.run(err))
    }

    pub fn pause(&self) -> BridgeResult<()> {
        call(Operation::Pause, |err| self.core.pause(err))
    }

    pub fn power_on(&self) -> BridgeResult<()> {
        call(Operation::PowerOn, |err| self.core.power_on(err))
    }

    pub fn power_off(&self) -> BridgeResult<()> {
        call(Operation::PowerOff, |err| self.core.power_off(err))
    }

    pub fn set_warp(&self, enabled: bool) -> BridgeResult<()> {
        call(Operation::SetWarp, |err| self.core.set_warp(enabled, err))
    }

    pub fn export_config(&self, path: &Path) -> BridgeResult<()> {
        call(Operation::ExportConfig, |err| self.core.export_config(path, err))
    }

    pub fn load_snapshot(&self, media: &MediaFile) -> BridgeResult<()> {
        call(Operation::LoadSnapshot, |err| self.core.load_snapshot(media, err))
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub fn is_powered_on(&self) -> bool {
        self.core.is_powered_on()
    }

    pub fn master_clock(&self) -> u64 {
        self.core.master_clock()
    }

    pub fn frame_count(&self) -> u64 {
        self.core.frame_count()
    }

    // ROMs

    pub fn load_rom(&self, source: &RomSource) -> BridgeResult<()> {
        call(Operation::LoadRom, |err| self.core.load_rom(source, err))
    }

    pub fn load_ext(&self, source: &RomSource) -> BridgeResult<()> {
        call(Operation::LoadExt, |err| self.core.load_ext(source, err))
    }

    pub fn save_rom(&self, path: &Path) -> BridgeResult<()> {
        call(Operation::SaveRom, |err| self.core.save_rom(path, err))
    }

    pub fn save_wom(&self, path: &Path) -> BridgeResult<()> {
        call(Operation::SaveWom, |err| self.core.save_wom(path, err))
    }

    pub fn save_ext(&self, path: &Path) -> BridgeResult<()> {
        call(Operation::SaveExt, |err| self.core.save_ext(path, err))
    }

    // Media

    pub fn make_media(&self, bytes: &[u8], kind: FileKind) -> BridgeResult<MediaFile> {
        call_value(Operation::MakeMedia, |err| self.core.make_media(bytes, kind, err))
    }

    /// Returns the number of bytes written.
    pub fn write_media(&self, media: &MediaFile, path: &Path) -> BridgeResult<usize> {
        call(Operation::WriteMedia, |err| self.core.write_media(media, path, err))
    }

    // Floppy drives

    pub fn insert_disk(&self, drive: usize, media: &MediaFile, protected: bool) -> BridgeResult<()> {
        let op = Operation::InsertDisk;
        let drive = self.df(op, drive)?;
        call(op, |err| self.core.insert_disk(drive, media, protected, err))
    }

    pub fn insert_blank_disk(
        &self,
        drive: usize,
        fs: VolumeType,
        boot: BootBlock,
        name: &str,
    ) -> BridgeResult<()> {
        let op = Operation::InsertBlankDisk;
        let drive = self.df(op, drive)?;
        call(op, |err| self.core.insert_blank_disk(drive, fs, boot, name, err))
    }

    pub fn eject_disk(&self, drive: usize) -> BridgeResult<()> {
        let op = Operation::EjectDisk;
        let drive = self.df(op, drive)?;
        call(op, |err| self.core.eject_disk(drive, err))
    }

    pub fn export_disk(&self, drive: usize, kind: FileKind) -> BridgeResult<MediaFile> {
        let op = Operation::ExportDisk;
        let drive = self.df(op, drive)?;
        call_value(op, |err| self.core.export_disk(drive, kind, err))
    }

    // Hard drives

    pub fn attach_hard_drive(&self, slot: usize, source: &HardDriveSource) -> BridgeResult<()> {
        let op = Operation::AttachHardDrive;
        let slot = self.hd(op, slot)?;
        call(op, |err| self.core.attach_hard_drive(slot, source, err))
    }

    pub fn format_hard_drive(&self, slot: usize, fs: VolumeType, name: &str) -> BridgeResult<()> {
        let op = Operation::FormatHardDrive;
        let slot = self.hd(op, slot)?;
        call(op, |err| self.core.format_hard_drive(slot, fs, name, err))
    }

    pub fn change_geometry(&self, slot: usize, geometry: Geometry) -> BridgeResult<()> {
        let op = Operation::ChangeGeometry;
        let slot = self.hd(op, slot)?;
        call(op, |err| self.core.change_geometry(slot, geometry, err))
    }

    pub fn write_hard_drive(&self, slot: usize, path: &Path) -> BridgeResult<()> {
        let op = Operation::WriteHardDrive;
        let slot = self.hd(op, slot)?;
        call(op, |err| self.core.write_hard_drive(slot, path, err))
    }

    pub fn enable_write_through(&self, slot: usize) -> BridgeResult<()> {
        let op = Operation::EnableWriteThrough;
        let slot = self.hd(op, slot)?;
        call(op, |err| self.core.enable_write_through(slot, err))
    }

    // File systems and recorder

    pub fn export_file_system(
        &self,
        media: &MediaFile,
        partition: usize,
        dir: &Path,
    ) -> BridgeResult<()> {
        call(Operation::ExportFileSystem, |err| {
            self.core.export_file_system(media, partition, dir, err)
        })
    }

    pub fn start_recording(&self, request: &RecordingRequest) -> BridgeResult<()> {
        call(Operation::StartRecording, |err| {
            self.core.start_recording(request, err)
        })
    }

    fn df(&self, op: Operation, drive: usize) -> BridgeResult<usize> {
        check_slot(op, "df", drive, self.limits.drives)
    }

    fn hd(&self, op: Operation, slot: usize) -> BridgeResult<usize> {
        check_slot(op, "hd", slot, self.limits.hard_drives)
    }
}

fn check_slot(op: Operation, prefix: &str, slot: usize, limit: usize) -> BridgeResult<usize> {
    if slot < limit {
        Ok(slot)
    } else {
        Err(BridgeError::new(
            ErrorCode::IncompatibleConfiguration,
            op,
            format!("no such device {prefix}{slot} ({limit} configured)"),
        ))
    }
}

//! In-process stand-in for the emulator core.
//!
//! `SimCore` keeps just enough machine state to validate commands the way a
//! real core does and to emit the matching events. It does not emulate a CPU.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use core_abi::{
    BootBlock, EmulatorCore, ErrorSlot, EventKind, FileKind, Geometry, HardDriveSource,
    MediaFile, RawCode, RawEvent, RecordingRequest, RomSource, SlotLimits, VolumeType,
};
use log::{debug, trace};
use parking_lot::Mutex;
use transport::EventSink;

use crate::media::{self, Reject};

/// PAL master clock in Hz.
pub const PAL_MASTER_CLOCK: u64 = 28_375_160;
const FRAME: Duration = Duration::from_millis(20);
/// Speed factor applied while warp is on.
const WARP_FACTOR: u32 = 4;
/// Queued drive events emitted per step.
const ACTIVITY_PER_STEP: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimConfig {
    pub limits: SlotLimits,
    /// Floppy drives connected at launch (DF0 upwards).
    pub connected_drives: usize,
    /// Whether a screen recorder can be launched.
    pub recorder: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            limits: SlotLimits::default(),
            connected_drives: 2,
            recorder: false,
        }
    }
}

#[derive(Clone, Debug)]
struct Disk {
    image: Arc<[u8]>,
    kind: FileKind,
    protected: bool,
}

#[derive(Clone, Debug, Default)]
struct Floppy {
    connected: bool,
    disk: Option<Disk>,
}

#[derive(Clone, Debug)]
struct HardDrive {
    image: Vec<u8>,
    geometry: Geometry,
    write_through: bool,
}

#[derive(Debug, Default)]
struct Machine {
    powered_on: bool,
    running: bool,
    warp: bool,
    rom: Option<Arc<[u8]>>,
    ext: Option<Arc<[u8]>>,
    floppies: Vec<Floppy>,
    hard_drives: Vec<Option<HardDrive>>,
    master_clock: u64,
    frames: u64,
    frame_time: Duration,
    activity: VecDeque<RawEvent>,
    serial_out: VecDeque<u8>,
    recording: bool,
}

pub struct SimCore {
    sink: EventSink,
    config: SimConfig,
    machine: Mutex<Machine>,
}

impl SimCore {
    pub fn new(sink: EventSink, config: SimConfig) -> Self {
        let mut machine = Machine {
            floppies: vec![Floppy::default(); config.limits.drives],
            hard_drives: vec![None; config.limits.hard_drives],
            ..Machine::default()
        };
        for floppy in machine.floppies.iter_mut().take(config.connected_drives) {
            floppy.connected = true;
        }
        Self {
            sink,
            config,
            machine: Mutex::new(machine),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Announces the machine to the observer, as a core does after start-up.
    pub fn launch(&self) {
        let m = self.machine.lock();
        for (slot, floppy) in m.floppies.iter().enumerate() {
            if floppy.connected {
                self.emit(EventKind::DriveConnect, slot as u32);
            }
        }
        self.emit(EventKind::Config, 0);
        self.emit(EventKind::MemLayout, 0);
        if m.rom.is_some() {
            self.emit(EventKind::ReadyToPowerOn, 0);
        } else {
            self.emit(EventKind::RomMissing, 0);
        }
    }

    /// Advances emulated time by `elapsed` and emits any pending activity.
    /// Does nothing while paused.
    pub fn step(&self, elapsed: Duration) {
        let mut m = self.machine.lock();
        if !m.running {
            return;
        }
        let elapsed = if m.warp { elapsed * WARP_FACTOR } else { elapsed };
        m.master_clock += (PAL_MASTER_CLOCK as u128 * elapsed.as_nanos() / 1_000_000_000) as u64;
        m.frame_time += elapsed;
        while m.frame_time >= FRAME {
            m.frame_time -= FRAME;
            m.frames += 1;
        }

        for _ in 0..ACTIVITY_PER_STEP {
            match m.activity.pop_front() {
                Some(event) => {
                    self.sink.emit_raw(event);
                }
                None => break,
            }
        }
        if let Some(byte) = m.serial_out.pop_front() {
            self.emit(EventKind::SerialOut, u32::from(byte));
        }
        // Empty drives are polled by the OS for a disk change.
        for (slot, floppy) in m.floppies.iter().enumerate() {
            if floppy.connected && floppy.disk.is_none() {
                self.emit(EventKind::DriveHeadPoll, slot as u32);
            }
        }
    }

    /// Queues bytes the emulated machine writes to its serial port.
    pub fn queue_serial_out(&self, bytes: &[u8]) {
        self.machine.lock().serial_out.extend(bytes.iter().copied());
    }

    /// Delivers a byte to the emulated serial port.
    pub fn receive_serial(&self, byte: u8) {
        self.emit(EventKind::SerialIn, u32::from(byte));
    }

    /// Emits an arbitrary raw event, as a defective or newer core might.
    pub fn emit_raw(&self, event: RawEvent) {
        self.sink.emit_raw(event);
    }

    /// Connects or disconnects a floppy drive.
    pub fn set_drive_connected(&self, drive: usize, connected: bool) -> bool {
        let mut m = self.machine.lock();
        let Some(floppy) = m.floppies.get_mut(drive) else {
            return false;
        };
        if floppy.connected == connected {
            return true;
        }
        floppy.connected = connected;
        if !connected {
            floppy.disk = None;
        }
        let kind = if connected {
            EventKind::DriveConnect
        } else {
            EventKind::DriveDisconnect
        };
        self.emit(kind, drive as u32);
        true
    }

    pub fn has_disk(&self, drive: usize) -> bool {
        self.machine
            .lock()
            .floppies
            .get(drive)
            .is_some_and(|f| f.disk.is_some())
    }

    pub fn has_hard_drive(&self, slot: usize) -> bool {
        self.machine
            .lock()
            .hard_drives
            .get(slot)
            .is_some_and(Option::is_some)
    }

    pub fn is_warp(&self) -> bool {
        self.machine.lock().warp
    }

    /// Geometry of the drive attached at `slot`, and whether writes go
    /// through to the host.
    pub fn hard_drive_info(&self, slot: usize) -> Option<(Geometry, bool)> {
        self.machine
            .lock()
            .hard_drives
            .get(slot)
            .and_then(Option::as_ref)
            .map(|hd| (hd.geometry, hd.write_through))
    }

    pub fn is_recording(&self) -> bool {
        self.machine.lock().recording
    }

    fn emit(&self, kind: EventKind, payload: u32) {
        trace!("sim emits {kind} {payload}");
        self.sink.emit(kind, payload);
    }

    fn power_on_locked(&self, m: &mut Machine) -> Result<(), Reject> {
        if m.powered_on {
            return Ok(());
        }
        ready(m)?;
        m.powered_on = true;
        m.master_clock = 0;
        m.frames = 0;
        debug!("sim powered on");
        self.emit(EventKind::PowerOn, 0);
        self.emit(EventKind::PowerLedOn, 0);
        Ok(())
    }

    fn pause_locked(&self, m: &mut Machine) {
        if m.running {
            m.running = false;
            self.emit(EventKind::Pause, 0);
            self.emit(EventKind::PowerLedDim, 0);
        }
    }

    /// Queues the drive activity of the OS reading a freshly inserted disk.
    fn queue_disk_access(&self, m: &mut Machine, drive: usize) {
        if !m.powered_on {
            return;
        }
        let slot = drive as u32;
        let seq = [
            EventKind::DriveLedOn,
            EventKind::DriveMotorOn,
            EventKind::DriveHead,
            EventKind::DriveHead,
            EventKind::DriveHead,
            EventKind::DriveMotorOff,
            EventKind::DriveLedOff,
        ];
        m.activity
            .extend(seq.into_iter().map(|kind| RawEvent::new(kind, slot)));
    }

    fn floppy<'a>(&self, m: &'a mut Machine, drive: usize) -> Result<&'a mut Floppy, Reject> {
        match m.floppies.get_mut(drive) {
            Some(floppy) if floppy.connected => Ok(floppy),
            _ => Err((RawCode::OptInvArg, format!("df{drive} is not connected"))),
        }
    }

    fn hard_drive<'a>(
        &self,
        m: &'a mut Machine,
        slot: usize,
    ) -> Result<&'a mut HardDrive, Reject> {
        m.hard_drives
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or_else(|| (RawCode::OptInvArg, format!("hd{slot} is not attached")))
    }

    fn insert_locked(
        &self,
        m: &mut Machine,
        drive: usize,
        disk: Disk,
    ) -> Result<(), Reject> {
        let protected = disk.protected;
        let floppy = self.floppy(m, drive)?;
        let had_disk = floppy.disk.replace(disk).is_some();
        let slot = drive as u32;
        if had_disk {
            self.emit(EventKind::DiskEject, slot);
        }
        self.emit(EventKind::DiskInsert, slot);
        self.emit(
            if protected {
                EventKind::DiskProtected
            } else {
                EventKind::DiskUnprotected
            },
            slot,
        );
        self.queue_disk_access(m, drive);
        Ok(())
    }
}

fn ready(m: &Machine) -> Result<(), Reject> {
    if m.rom.is_none() {
        return Err((RawCode::RomMissing, "no Kickstart ROM installed".into()));
    }
    Ok(())
}

fn powered_off(m: &Machine) -> Result<(), Reject> {
    if m.powered_on {
        Err((RawCode::PoweredOn, "power off the machine first".into()))
    } else {
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, Reject> {
    std::fs::read(path).map_err(|err| media::io_reject(&err, path, false))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), Reject> {
    std::fs::write(path, bytes).map_err(|err| media::io_reject(&err, path, true))
}

fn rom_bytes(source: &RomSource, kind: FileKind) -> Result<Arc<[u8]>, Reject> {
    let bytes: Arc<[u8]> = match source {
        RomSource::File(path) => read_file(path)?.into(),
        RomSource::Buffer(bytes) => Arc::clone(bytes),
        RomSource::Media(media) if media.kind() == kind => Arc::clone(media.bytes()),
        RomSource::Media(media) => {
            return Err((
                RawCode::FileTypeMismatch,
                format!("{:?} is not a {kind:?}", media.kind()),
            ))
        }
    };
    media::check_media(kind, &bytes)?;
    Ok(bytes)
}

/// Fills `err` on failure; the caller gets `None` back.
fn settle<T>(err: &mut ErrorSlot, result: Result<T, Reject>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err((code, what)) => {
            err.fail(code, what);
            None
        }
    }
}

impl EmulatorCore for SimCore {
    fn is_ready(&self, err: &mut ErrorSlot) {
        settle(err, ready(&self.machine.lock()));
    }

    fn run(&self, err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        let result = self.power_on_locked(&mut m).map(|()| {
            if !m.running {
                m.running = true;
                self.emit(EventKind::Run, 0);
                self.emit(EventKind::PowerLedOn, 0);
            }
        });
        settle(err, result);
    }

    fn pause(&self, _err: &mut ErrorSlot) {
        self.pause_locked(&mut self.machine.lock());
    }

    fn power_on(&self, err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        let result = self.power_on_locked(&mut m);
        settle(err, result);
    }

    fn power_off(&self, _err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        if !m.powered_on {
            return;
        }
        self.pause_locked(&mut m);
        m.powered_on = false;
        m.activity.clear();
        m.serial_out.clear();
        self.emit(EventKind::PowerOff, 0);
        self.emit(EventKind::PowerLedOff, 0);
    }

    fn set_warp(&self, enabled: bool, _err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        if m.warp != enabled {
            m.warp = enabled;
            self.emit(
                if enabled {
                    EventKind::WarpOn
                } else {
                    EventKind::WarpOff
                },
                0,
            );
        }
    }

    fn export_config(&self, path: &Path, err: &mut ErrorSlot) {
        let text = {
            let m = self.machine.lock();
            let drives = m.floppies.iter().filter(|f| f.connected).count();
            let hard_drives = m.hard_drives.iter().filter(|h| h.is_some()).count();
            format!(
                "# simulated machine\nrom={}\next={}\nfloppy_drives={drives}\nhard_drives={hard_drives}\nwarp={}\n",
                m.rom.is_some(),
                m.ext.is_some(),
                m.warp
            )
        };
        settle(err, write_file(path, text.as_bytes()));
    }

    fn load_snapshot(&self, snapshot: &MediaFile, err: &mut ErrorSlot) {
        let result = if snapshot.kind() == FileKind::Snapshot {
            media::check_snapshot(snapshot.bytes())
        } else {
            Err((RawCode::FileTypeMismatch, "not a snapshot".into()))
        };
        if settle(err, result).is_some() {
            self.emit(EventKind::SnapshotRestored, 0);
        }
    }

    fn is_running(&self) -> bool {
        self.machine.lock().running
    }

    fn is_powered_on(&self) -> bool {
        self.machine.lock().powered_on
    }

    fn master_clock(&self) -> u64 {
        self.machine.lock().master_clock
    }

    fn frame_count(&self) -> u64 {
        self.machine.lock().frames
    }

    fn load_rom(&self, source: &RomSource, err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        let result = powered_off(&m).and_then(|()| rom_bytes(source, FileKind::Rom));
        if let Some(rom) = settle(err, result) {
            debug!("sim installed {} byte ROM", rom.len());
            m.rom = Some(rom);
            self.emit(EventKind::Config, 0);
        }
    }

    fn load_ext(&self, source: &RomSource, err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        let result = powered_off(&m).and_then(|()| rom_bytes(source, FileKind::ExtRom));
        if let Some(ext) = settle(err, result) {
            m.ext = Some(ext);
            self.emit(EventKind::Config, 0);
        }
    }

    fn save_rom(&self, path: &Path, err: &mut ErrorSlot) {
        let rom = self.machine.lock().rom.clone();
        let result = rom
            .ok_or_else(|| (RawCode::RomMissing, "no Kickstart ROM installed".to_string()))
            .and_then(|rom| write_file(path, &rom));
        settle(err, result);
    }

    fn save_wom(&self, _path: &Path, err: &mut ErrorSlot) {
        err.fail(RawCode::OptUnsupported, "machine has no WOM");
    }

    fn save_ext(&self, path: &Path, err: &mut ErrorSlot) {
        let ext = self.machine.lock().ext.clone();
        let result = ext
            .ok_or_else(|| (RawCode::ArosNoExtrom, "no extension ROM installed".to_string()))
            .and_then(|ext| write_file(path, &ext));
        settle(err, result);
    }

    fn make_media(&self, bytes: &[u8], kind: FileKind, err: &mut ErrorSlot) -> Option<MediaFile> {
        let media = settle(err, media::check_media(kind, bytes))
            .map(|()| MediaFile::new(kind, Arc::from(bytes)));
        // A real core may hand back a partially built object alongside an
        // error; mimic that so the adapter's precedence is exercised.
        media.or_else(|| (!err.is_ok()).then(|| MediaFile::new(kind, Arc::from(&[][..]))))
    }

    fn write_media(&self, media: &MediaFile, path: &Path, err: &mut ErrorSlot) -> usize {
        settle(err, write_file(path, media.bytes()))
            .map(|()| media.len())
            .unwrap_or(0)
    }

    fn insert_disk(&self, drive: usize, media: &MediaFile, protected: bool, err: &mut ErrorSlot) {
        let result = if !media.kind().is_floppy() {
            Err((
                RawCode::FileTypeMismatch,
                format!("{:?} cannot go into a floppy drive", media.kind()),
            ))
        } else if media.kind() == FileKind::Adf && media.len() == media::ADF_HD_BYTES {
            Err((RawCode::DiskIncompatible, "HD disk in a DD drive".to_string()))
        } else {
            media::check_media(media.kind(), media.bytes())
        };
        let mut m = self.machine.lock();
        let result = result.and_then(|()| {
            self.insert_locked(
                &mut m,
                drive,
                Disk {
                    image: Arc::clone(media.bytes()),
                    kind: media.kind(),
                    protected,
                },
            )
        });
        settle(err, result);
    }

    fn insert_blank_disk(
        &self,
        drive: usize,
        fs: VolumeType,
        boot: BootBlock,
        name: &str,
        err: &mut ErrorSlot,
    ) {
        let result = if name.len() > 30 {
            Err((RawCode::OptInvArg, "volume names are at most 30 characters".to_string()))
        } else if fs == VolumeType::NoDos && boot != BootBlock::None {
            Err((RawCode::OptInvArg, "boot blocks need a DOS volume".to_string()))
        } else {
            let mut image = vec![0u8; media::ADF_DD_BYTES];
            if fs != VolumeType::NoDos {
                image[..3].copy_from_slice(b"DOS");
                image[3] = u8::from(fs == VolumeType::Ffs);
            }
            Ok(Disk {
                image: image.into(),
                kind: FileKind::Adf,
                protected: false,
            })
        };
        let mut m = self.machine.lock();
        let result = result.and_then(|disk| self.insert_locked(&mut m, drive, disk));
        if settle(err, result).is_some() {
            self.emit(EventKind::DiskUnsaved, drive as u32);
        }
    }

    fn eject_disk(&self, drive: usize, err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        let result = self.floppy(&mut m, drive).and_then(|floppy| {
            floppy
                .disk
                .take()
                .map(|_| ())
                .ok_or_else(|| (RawCode::DiskMissing, format!("df{drive} is empty")))
        });
        if settle(err, result).is_some() {
            self.emit(EventKind::DiskEject, drive as u32);
        }
    }

    fn export_disk(&self, drive: usize, kind: FileKind, err: &mut ErrorSlot) -> Option<MediaFile> {
        let mut m = self.machine.lock();
        let result = self.floppy(&mut m, drive).and_then(|floppy| {
            let disk = floppy
                .disk
                .as_ref()
                .ok_or_else(|| (RawCode::DiskMissing, format!("df{drive} is empty")))?;
            if disk.kind != kind {
                return Err((
                    RawCode::FileTypeUnsupported,
                    format!("cannot convert {:?} to {kind:?}", disk.kind),
                ));
            }
            Ok(MediaFile::new(kind, Arc::clone(&disk.image)))
        });
        let exported = settle(err, result);
        if exported.is_some() {
            self.emit(EventKind::DiskSaved, drive as u32);
        }
        exported
    }

    fn attach_hard_drive(&self, slot: usize, source: &HardDriveSource, err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        let result = powered_off(&m).and_then(|()| {
            if slot >= m.hard_drives.len() {
                return Err((RawCode::OptInvArg, format!("no hard drive slot {slot}")));
            }
            let (image, geometry) = match source {
                HardDriveSource::Blank(geometry) => {
                    media::check_geometry(geometry)?;
                    (vec![0u8; geometry.num_bytes() as usize], *geometry)
                }
                HardDriveSource::File(path) => {
                    let image = read_file(path)?;
                    let geometry = media::guess_geometry(image.len() as u64)?;
                    (image, geometry)
                }
                HardDriveSource::Media(media) if media.kind() == FileKind::Hdf => {
                    let geometry = media::guess_geometry(media.len() as u64)?;
                    (media.bytes().to_vec(), geometry)
                }
                HardDriveSource::Media(media) => {
                    return Err((
                        RawCode::FileTypeMismatch,
                        format!("{:?} is not a hard drive image", media.kind()),
                    ))
                }
            };
            m.hard_drives[slot] = Some(HardDrive {
                image,
                geometry,
                write_through: false,
            });
            Ok(())
        });
        if settle(err, result).is_some() {
            self.emit(EventKind::HdConnect, slot as u32);
        }
    }

    fn format_hard_drive(&self, slot: usize, fs: VolumeType, name: &str, err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        let result = self.hard_drive(&mut m, slot).and_then(|hd| {
            if name.is_empty() || name.len() > 30 {
                return Err((RawCode::OptInvArg, format!("invalid volume name {name:?}")));
            }
            hd.image.fill(0);
            if fs != VolumeType::NoDos {
                hd.image[..3].copy_from_slice(b"DOS");
                hd.image[3] = u8::from(fs == VolumeType::Ffs);
            }
            Ok(())
        });
        if settle(err, result).is_some() {
            self.emit(EventKind::HdStep, slot as u32);
        }
    }

    fn change_geometry(&self, slot: usize, geometry: Geometry, err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        let result = self.hard_drive(&mut m, slot).and_then(|hd| {
            media::check_geometry(&geometry)?;
            if geometry.num_bytes() != hd.image.len() as u64 {
                return Err((
                    RawCode::HdrUnmatchedGeometry,
                    format!(
                        "{} bytes described, image holds {}",
                        geometry.num_bytes(),
                        hd.image.len()
                    ),
                ));
            }
            hd.geometry = geometry;
            Ok(())
        });
        if settle(err, result).is_some() {
            self.emit(EventKind::Config, 0);
        }
    }

    fn write_hard_drive(&self, slot: usize, path: &Path, err: &mut ErrorSlot) {
        let image = self.hard_drive(&mut self.machine.lock(), slot).map(|hd| hd.image.clone());
        settle(err, image.and_then(|image| write_file(path, &image)));
    }

    fn enable_write_through(&self, slot: usize, err: &mut ErrorSlot) {
        let mut m = self.machine.lock();
        let result = self.hard_drive(&mut m, slot).map(|hd| hd.write_through = true);
        settle(err, result);
    }

    fn export_file_system(
        &self,
        media: &MediaFile,
        partition: usize,
        dir: &Path,
        err: &mut ErrorSlot,
    ) {
        let result = (|| {
            if !matches!(media.kind(), FileKind::Adf | FileKind::Hdf) {
                return Err((
                    RawCode::FileTypeMismatch,
                    format!("{:?} holds no file system", media.kind()),
                ));
            }
            if partition != 0 {
                return Err((RawCode::OptInvArg, format!("no partition {partition}")));
            }
            if !media.bytes().starts_with(b"DOS") {
                return Err((RawCode::FsUnformatted, "volume is not formatted".to_string()));
            }
            if !dir.is_dir() {
                return Err((RawCode::DirNotFound, dir.display().to_string()));
            }
            write_file(&dir.join(format!("partition{partition}.img")), media.bytes())
        })();
        settle(err, result);
    }

    fn start_recording(&self, request: &RecordingRequest, err: &mut ErrorSlot) {
        let (_, _, width, height) = request.rect;
        let result = if width == 0 || height == 0 {
            Err((RawCode::OptInvArg, "empty capture area".to_string()))
        } else if !self.config.recorder {
            Err((RawCode::RecLaunch, "no screen recorder available".to_string()))
        } else {
            self.machine.lock().recording = true;
            Ok(())
        };
        settle(err, result);
    }
}

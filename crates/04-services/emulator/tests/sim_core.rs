use std::sync::Arc;
use std::time::Duration;

use core_abi::{
    call, call_value, EmulatorCore, ErrorCode, EventKind, FileKind, Geometry, HardDriveSource,
    MediaFile, Operation, RawEvent, RecordingRequest, RomSource,
};
use services_emulator::media::{ADF_DD_BYTES, ROM_SIZES};
use services_emulator::{SimConfig, SimCore, SimDriver, PAL_MASTER_CLOCK};
use transport::{DispatchConfig, EventBus, EventStream};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rig(config: SimConfig) -> (EventBus, EventStream, SimCore) {
    init_logging();
    let bus = EventBus::new(DispatchConfig {
        head_poll_interval: Duration::ZERO,
    });
    let stream = bus.register();
    let core = SimCore::new(bus.sink(), config);
    (bus, stream, core)
}

fn drain(stream: &EventStream) -> Vec<RawEvent> {
    std::iter::from_fn(|| stream.try_next()).collect()
}

fn ev(kind: EventKind, payload: u32) -> RawEvent {
    RawEvent::new(kind, payload)
}

fn rom() -> RomSource {
    RomSource::Buffer(vec![0u8; ROM_SIZES[1]].into())
}

fn adf() -> MediaFile {
    MediaFile::new(FileKind::Adf, vec![0u8; ADF_DD_BYTES].into())
}

fn powered(core: &SimCore, stream: &EventStream) {
    call(Operation::LoadRom, |err| core.load_rom(&rom(), err)).unwrap();
    call(Operation::Run, |err| core.run(err)).unwrap();
    drain(stream);
}

#[test]
fn launch_announces_drives_and_missing_rom() {
    let (_bus, stream, core) = rig(SimConfig::default());
    core.launch();
    assert_eq!(
        drain(&stream),
        vec![
            ev(EventKind::DriveConnect, 0),
            ev(EventKind::DriveConnect, 1),
            ev(EventKind::Config, 0),
            ev(EventKind::MemLayout, 0),
            ev(EventKind::RomMissing, 0),
        ]
    );
}

#[test]
fn power_on_requires_a_rom() {
    let (_bus, stream, core) = rig(SimConfig::default());
    let err = call(Operation::PowerOn, |err| core.power_on(err)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingResource);
    assert_eq!(err.operation(), Operation::PowerOn);
    assert!(!core.is_powered_on());
    assert!(drain(&stream).is_empty());

    let err = call(Operation::IsReady, |err| core.is_ready(err)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingResource);
}

#[test]
fn run_powers_on_first() {
    let (_bus, stream, core) = rig(SimConfig::default());
    call(Operation::LoadRom, |err| core.load_rom(&rom(), err)).unwrap();
    call(Operation::Run, |err| core.run(err)).unwrap();
    assert!(core.is_running() && core.is_powered_on());
    assert_eq!(
        drain(&stream),
        vec![
            ev(EventKind::Config, 0),
            ev(EventKind::PowerOn, 0),
            ev(EventKind::PowerLedOn, 0),
            ev(EventKind::Run, 0),
            ev(EventKind::PowerLedOn, 0),
        ]
    );

    call(Operation::PowerOff, |err| core.power_off(err)).unwrap();
    assert_eq!(
        drain(&stream),
        vec![
            ev(EventKind::Pause, 0),
            ev(EventKind::PowerLedDim, 0),
            ev(EventKind::PowerOff, 0),
            ev(EventKind::PowerLedOff, 0),
        ]
    );
}

#[test]
fn rom_cannot_change_while_powered_on() {
    let (_bus, stream, core) = rig(SimConfig::default());
    powered(&core, &stream);
    let err = call(Operation::LoadRom, |err| core.load_rom(&rom(), err)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IncompatibleConfiguration);
}

#[test]
fn rom_from_a_missing_file_is_a_missing_resource() {
    let (_bus, _stream, core) = rig(SimConfig::default());
    let source = RomSource::File("/nonexistent/kick13.rom".into());
    let err = call(Operation::LoadRom, |err| core.load_rom(&source, err)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingResource);
    assert!(err.message().contains("kick13.rom"));
}

#[test]
fn odd_sized_rom_is_invalid_format() {
    let (_bus, _stream, core) = rig(SimConfig::default());
    let source = RomSource::Buffer(vec![0u8; 1000].into());
    let err = call(Operation::LoadRom, |err| core.load_rom(&source, err)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidFormat);
}

#[test]
fn make_media_yields_value_or_error() {
    let (_bus, _stream, core) = rig(SimConfig::default());
    let media = call_value(Operation::MakeMedia, |err| {
        core.make_media(&vec![0u8; ADF_DD_BYTES], FileKind::Adf, err)
    })
    .unwrap();
    assert_eq!(media.len(), ADF_DD_BYTES);

    let err = call_value(Operation::MakeMedia, |err| {
        core.make_media(&[1, 2, 3], FileKind::Adf, err)
    })
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidFormat);
}

#[test]
fn inserting_a_disk_reports_and_queues_drive_activity() {
    let (_bus, stream, core) = rig(SimConfig::default());
    powered(&core, &stream);

    call(Operation::InsertDisk, |err| core.insert_disk(0, &adf(), false, err)).unwrap();
    assert!(core.has_disk(0));
    assert_eq!(
        drain(&stream),
        vec![ev(EventKind::DiskInsert, 0), ev(EventKind::DiskUnprotected, 0)]
    );

    core.step(Duration::from_millis(20));
    assert_eq!(
        drain(&stream),
        vec![
            ev(EventKind::DriveLedOn, 0),
            ev(EventKind::DriveMotorOn, 0),
            ev(EventKind::DriveHead, 0),
            ev(EventKind::DriveHead, 0),
            ev(EventKind::DriveHeadPoll, 1),
        ]
    );
    core.step(Duration::from_millis(20));
    assert_eq!(
        drain(&stream),
        vec![
            ev(EventKind::DriveHead, 0),
            ev(EventKind::DriveMotorOff, 0),
            ev(EventKind::DriveLedOff, 0),
            ev(EventKind::DriveHeadPoll, 1),
        ]
    );
}

#[test]
fn replacing_a_disk_ejects_the_old_one() {
    let (_bus, stream, core) = rig(SimConfig::default());
    call(Operation::InsertDisk, |err| core.insert_disk(1, &adf(), false, err)).unwrap();
    drain(&stream);
    call(Operation::InsertDisk, |err| core.insert_disk(1, &adf(), true, err)).unwrap();
    assert_eq!(
        drain(&stream),
        vec![
            ev(EventKind::DiskEject, 1),
            ev(EventKind::DiskInsert, 1),
            ev(EventKind::DiskProtected, 1),
        ]
    );
}

#[test]
fn insert_failures_leave_the_drive_empty() {
    let (_bus, stream, core) = rig(SimConfig::default());

    // DF3 exists but is not connected.
    let err = call(Operation::InsertDisk, |err| core.insert_disk(3, &adf(), false, err)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IncompatibleConfiguration);

    let rom = MediaFile::new(FileKind::Rom, vec![0u8; ROM_SIZES[0]].into());
    let err = call(Operation::InsertDisk, |err| core.insert_disk(0, &rom, false, err)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidFormat);

    let short = MediaFile::new(FileKind::Adf, vec![0u8; 4096].into());
    let err = call(Operation::InsertDisk, |err| core.insert_disk(0, &short, false, err)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidFormat);

    assert!(!core.has_disk(0));
    assert!(drain(&stream).is_empty());
}

#[test]
fn ejecting_an_empty_drive_is_missing_resource() {
    let (_bus, _stream, core) = rig(SimConfig::default());
    let err = call(Operation::EjectDisk, |err| core.eject_disk(0, err)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingResource);
}

#[test]
fn export_disk_returns_the_inserted_image() {
    let (_bus, _stream, core) = rig(SimConfig::default());
    call(Operation::InsertDisk, |err| core.insert_disk(0, &adf(), false, err)).unwrap();
    let exported =
        call_value(Operation::ExportDisk, |err| core.export_disk(0, FileKind::Adf, err)).unwrap();
    assert_eq!(exported, adf());
    let err = call_value(Operation::ExportDisk, |err| core.export_disk(0, FileKind::Img, err))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidFormat);
}

#[test]
fn hard_drive_geometry_must_match_the_image() {
    let (_bus, stream, core) = rig(SimConfig::default());
    let geometry = Geometry::new(64, 2, 32);
    let source = HardDriveSource::Blank(geometry);
    call(Operation::AttachHardDrive, |err| core.attach_hard_drive(0, &source, err)).unwrap();
    assert_eq!(drain(&stream), vec![ev(EventKind::HdConnect, 0)]);
    assert_eq!(core.hard_drive_info(0), Some((geometry, false)));

    let err = call(Operation::ChangeGeometry, |err| {
        core.change_geometry(0, Geometry::new(64, 4, 32), err)
    })
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::IncompatibleConfiguration);

    let same_size = Geometry::new(128, 1, 32);
    call(Operation::ChangeGeometry, |err| core.change_geometry(0, same_size, err)).unwrap();
    call(Operation::EnableWriteThrough, |err| core.enable_write_through(0, err)).unwrap();
    assert_eq!(core.hard_drive_info(0), Some((same_size, true)));
}

#[test]
fn oversized_blank_hard_drive_is_rejected() {
    let (_bus, _stream, core) = rig(SimConfig::default());
    let source = HardDriveSource::Blank(Geometry::new(16_384, 16, 63));
    let err = call(Operation::AttachHardDrive, |err| core.attach_hard_drive(1, &source, err))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::IncompatibleConfiguration);
    assert!(!core.has_hard_drive(1));
}

#[test]
fn recorder_availability_is_configurable() {
    let request = RecordingRequest {
        rect: (0, 0, 640, 512),
        bit_rate: 512,
        aspect_x: 768,
        aspect_y: 702,
    };
    let (_bus, _stream, core) = rig(SimConfig::default());
    let err = call(Operation::StartRecording, |err| core.start_recording(&request, err))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::IoFailure);

    let (_bus, _stream, core) = rig(SimConfig {
        recorder: true,
        ..SimConfig::default()
    });
    call(Operation::StartRecording, |err| core.start_recording(&request, err)).unwrap();
    assert!(core.is_recording());
}

#[test]
fn clock_advances_only_while_running() {
    let (_bus, stream, core) = rig(SimConfig::default());
    core.step(Duration::from_secs(1));
    assert_eq!(core.master_clock(), 0);

    powered(&core, &stream);
    core.step(Duration::from_secs(1));
    assert_eq!(core.master_clock(), PAL_MASTER_CLOCK);
    assert_eq!(core.frame_count(), 50);

    call(Operation::SetWarp, |err| core.set_warp(true, err)).unwrap();
    core.step(Duration::from_secs(1));
    assert_eq!(core.master_clock(), 5 * PAL_MASTER_CLOCK);
    assert_eq!(core.frame_count(), 250);
}

#[test]
fn serial_output_is_emitted_one_byte_per_step() {
    let (_bus, stream, core) = rig(SimConfig {
        connected_drives: 0,
        ..SimConfig::default()
    });
    powered(&core, &stream);
    core.queue_serial_out(b"ok");
    core.step(Duration::from_millis(20));
    core.step(Duration::from_millis(20));
    core.step(Duration::from_millis(20));
    assert_eq!(
        drain(&stream),
        vec![
            ev(EventKind::SerialOut, u32::from(b'o')),
            ev(EventKind::SerialOut, u32::from(b'k')),
        ]
    );
}

#[test]
fn driver_steps_on_its_own_thread() {
    let (_bus, stream, core) = rig(SimConfig::default());
    let core = Arc::new(core);
    powered(&core, &stream);
    let driver = SimDriver::spawn_with_interval(Arc::clone(&core), Duration::from_millis(1)).unwrap();
    while core.master_clock() == 0 {
        std::thread::yield_now();
    }
    assert!(driver.stop() > 0);
}

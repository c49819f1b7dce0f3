use std::sync::Arc;
use std::thread;
use std::time::Duration;

use core_abi::{
    BridgeResult, ErrorCode, EventKind, FileKind, Geometry, HardDriveSource, MediaFile, Operation,
    RawEvent, RomSource, SlotLimits,
};
use hub::Commands;
use services_emulator::media::{ADF_DD_BYTES, ROM_SIZES};
use services_emulator::{SimConfig, SimCore, SimDriver};
use transport::{DispatchConfig, EventBus, EventStream};

struct Rig {
    _bus: EventBus,
    stream: EventStream,
    commands: Commands<SimCore>,
    driver: SimDriver,
}

fn rig() -> Rig {
    crate::init_logging();
    let bus = EventBus::new(DispatchConfig::default());
    let stream = bus.register();
    let sim = Arc::new(SimCore::new(
        bus.sink(),
        SimConfig {
            connected_drives: 4,
            ..SimConfig::default()
        },
    ));
    let driver = SimDriver::spawn_with_interval(Arc::clone(&sim), Duration::from_millis(1))
        .expect("spawn sim-core");
    Rig {
        _bus: bus,
        stream,
        commands: Commands::new(sim, SlotLimits::default()),
        driver,
    }
}

fn adf() -> MediaFile {
    MediaFile::new(FileKind::Adf, vec![0u8; ADF_DD_BYTES].into())
}

fn error_code<T>(result: BridgeResult<T>) -> ErrorCode {
    match result {
        Ok(_) => panic!("expected a failure"),
        Err(err) => err.code(),
    }
}

fn drained(stream: &EventStream) -> Vec<RawEvent> {
    std::iter::from_fn(|| stream.try_next()).collect()
}

#[test]
fn successful_insert_yields_value_and_event() {
    let rig = rig();
    assert_eq!(rig.commands.insert_disk(0, &adf(), false), Ok(()));
    assert!(drained(&rig.stream).contains(&RawEvent::new(EventKind::DiskInsert, 0)));
    rig.driver.stop();
}

#[test]
fn malformed_disk_is_invalid_format() {
    let rig = rig();
    let media = MediaFile::new(FileKind::Adf, vec![0u8; 1234].into());
    let err = rig.commands.insert_disk(0, &media, false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidFormat);
    assert_eq!(err.operation(), Operation::InsertDisk);
    assert!(err.is_user_visible());

    assert_eq!(
        error_code(rig.commands.make_media(&[0u8; 10], FileKind::Adf)),
        ErrorCode::InvalidFormat
    );
}

#[test]
fn rom_from_missing_file_is_missing_resource() {
    let rig = rig();
    let source = RomSource::File("/nonexistent/kick.rom".into());
    assert_eq!(error_code(rig.commands.load_rom(&source)), ErrorCode::MissingResource);
    assert_eq!(error_code(rig.commands.power_on()), ErrorCode::MissingResource);
}

#[test]
fn hard_drive_with_incompatible_geometry_is_rejected() {
    let rig = rig();
    let oversized = HardDriveSource::Blank(Geometry::new(16_384, 16, 63));
    assert_eq!(
        error_code(rig.commands.attach_hard_drive(0, &oversized)),
        ErrorCode::IncompatibleConfiguration
    );

    let geometry = Geometry::new(32, 1, 32);
    assert_eq!(
        rig.commands.attach_hard_drive(0, &HardDriveSource::Blank(geometry)),
        Ok(())
    );
    assert_eq!(
        error_code(rig.commands.change_geometry(0, Geometry::new(32, 2, 32))),
        ErrorCode::IncompatibleConfiguration
    );
}

#[test]
fn out_of_range_slot_never_reaches_the_core() {
    let rig = rig();
    let err = rig.commands.insert_disk(9, &adf(), false).unwrap_err();
    assert_eq!(err.code(), ErrorCode::IncompatibleConfiguration);
    assert!(err.message().contains("df9"));
    assert!(!rig.commands.core().has_disk(0));
}

#[test]
fn calls_from_many_threads_each_get_their_own_outcome() {
    let rig = rig();
    let rom = RomSource::Buffer(vec![0u8; ROM_SIZES[1]].into());
    rig.commands.load_rom(&rom).unwrap();
    rig.commands.run().unwrap();

    let workers: Vec<_> = (0..4)
        .map(|drive| {
            let commands = rig.commands.clone();
            thread::spawn(move || {
                let good = commands.insert_disk(drive, &adf(), drive % 2 == 0);
                let bad = commands.insert_disk(
                    drive,
                    &MediaFile::new(FileKind::Img, vec![0u8; 7].into()),
                    false,
                );
                (good, bad.map_err(|e| e.code()))
            })
        })
        .collect();
    for worker in workers {
        let (good, bad) = worker.join().unwrap();
        assert_eq!(good, Ok(()));
        assert_eq!(bad, Err(ErrorCode::InvalidFormat));
    }
    for drive in 0..4 {
        assert!(rig.commands.core().has_disk(drive));
    }
}

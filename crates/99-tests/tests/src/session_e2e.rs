//! Full sessions: the core runs on its own thread, the scheduler on the test
//! thread.

use std::sync::Arc;
use std::time::{Duration, Instant};

use app::{BridgeConfig, Scheduler};
use core_abi::{EmulatorCore, ErrorCode, EventKind, FileKind, MediaFile, RawEvent, RomSource};
use hub::Intent;
use mock::{make_collaborators, Record, Recorder};
use services_emulator::media::{ADF_DD_BYTES, ROM_SIZES};
use services_emulator::{SimConfig, SimCore, SimDriver};
use transport::EventBus;
use world::{DeviceSlot, PowerLed, SerialDirection, SoundCue};

const TIMEOUT: Duration = Duration::from_secs(10);

struct Session {
    bus: EventBus,
    sim: Arc<SimCore>,
    recorder: Arc<Recorder>,
    scheduler: Scheduler<SimCore>,
    _driver: SimDriver,
}

fn session(config: &BridgeConfig, rom: bool) -> Session {
    crate::init_logging();
    let bus = EventBus::new(config.dispatch_config());
    let sim = Arc::new(SimCore::new(
        bus.sink(),
        SimConfig {
            limits: config.slot_limits(),
            ..SimConfig::default()
        },
    ));
    let (hub, recorder) = make_collaborators();
    let scheduler = Scheduler::from_config(config, &bus, hub, Arc::clone(&sim));
    if rom {
        let rom = RomSource::Buffer(vec![0u8; ROM_SIZES[1]].into());
        scheduler.commands().load_rom(&rom).unwrap();
    }
    sim.launch();
    let driver = SimDriver::spawn_with_interval(Arc::clone(&sim), Duration::from_millis(2))
        .expect("spawn sim-core");
    Session {
        bus,
        sim,
        recorder,
        scheduler,
        _driver: driver,
    }
}

impl Session {
    /// Runs passes until `done` holds. Panics after [`TIMEOUT`].
    fn pump_until(&mut self, what: &str, done: impl Fn(&Self) -> bool) {
        let deadline = Instant::now() + TIMEOUT;
        while !done(self) {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            self.scheduler.run_once();
            std::thread::yield_now();
        }
    }
}

#[test]
fn ready_core_boots_and_reports_its_drives() {
    let mut s = session(&BridgeConfig::default(), true);
    s.pump_until("run", |s| s.scheduler.world().running);

    assert!(s.sim.is_running());
    assert_eq!(s.scheduler.world().connected_drives, 0b11);
    let records = s.recorder.records();
    assert!(records.contains(&Record::DriveVisible {
        slot: DeviceSlot::Floppy(1),
        visible: true,
    }));
    assert_eq!(s.recorder.power_led(), Some(PowerLed::On));
    assert!(s.recorder.notices().is_empty());
}

#[test]
fn missing_rom_opens_preferences_and_run_is_refused() {
    let mut s = session(&BridgeConfig::default(), false);
    s.pump_until("preferences", |s| s.recorder.records().contains(&Record::Preferences));

    s.scheduler.enqueue_intent(Intent::Run);
    s.pump_until("notice", |s| !s.recorder.notices().is_empty());
    assert_eq!(s.recorder.notice_codes(), vec![ErrorCode::MissingResource]);
    assert!(s.scheduler.health().flags.command_failed);
}

#[test]
fn disk_load_lights_the_led_and_warps_while_the_motor_spins() {
    let mut s = session(&BridgeConfig::default(), true);
    s.pump_until("run", |s| s.scheduler.world().running);

    let disk = MediaFile::new(FileKind::Adf, vec![0u8; ADF_DD_BYTES].into());
    s.scheduler.commands().insert_disk(0, &disk, false).unwrap();

    s.pump_until("motor off", |s| {
        s.recorder.drive_led(0) == Some(false) && !s.scheduler.world().any_motor_spinning()
    });
    let records = s.recorder.records();
    assert!(records.contains(&Record::DriveLed { slot: 0, on: true }));
    assert!(records.contains(&Record::Sound(SoundCue::HeadStep(DeviceSlot::Floppy(0)))));

    // Warp followed the motor on and back off.
    s.pump_until("warp off", |s| !s.sim.is_warp() && !s.scheduler.world().warp);
    assert_eq!(s.scheduler.world().warp_requested, Some(false));
}

#[test]
fn serial_bytes_arrive_in_order() {
    let mut s = session(&BridgeConfig::default(), true);
    s.pump_until("run", |s| s.scheduler.world().running);
    s.sim.queue_serial_out(b"READY.\n");
    s.sim.receive_serial(b'x');
    s.pump_until("serial", |s| s.recorder.serial_text(SerialDirection::Out).len() == 7);
    assert_eq!(s.recorder.serial_text(SerialDirection::Out), "READY.\n");
    assert_eq!(s.recorder.serial_text(SerialDirection::In), "x");
}

#[test]
fn head_polls_are_thinned_before_delivery() {
    let mut s = session(&BridgeConfig::default(), true);
    s.pump_until("run", |s| s.scheduler.world().running);
    std::thread::sleep(Duration::from_millis(150));
    s.scheduler.run_until_idle(64);
    let metrics = s.bus.metrics();
    assert!(metrics.coalesced > 0, "{metrics:?}");
}

#[test]
#[should_panic(expected = "event protocol violation")]
fn out_of_range_slot_is_fatal_by_default() {
    let mut s = session(&BridgeConfig::default(), true);
    s.sim.emit_raw(RawEvent::new(EventKind::DriveLedOn, 4));
    s.pump_until("never", |_| false);
}

#[test]
fn skip_policy_counts_and_continues() {
    let config =
        BridgeConfig::from_toml_str("[router]\nviolation_policy = \"log-and-skip\"").unwrap();
    let mut s = session(&config, true);
    s.sim.emit_raw(RawEvent::new(EventKind::DriveLedOn, 4));
    s.sim.emit_raw(RawEvent { code: 12345, payload: 0 });
    s.pump_until("run", |s| s.scheduler.world().running);
    assert_eq!(s.scheduler.world().health.skipped_violations, 2);
}

//! Scripted driver for the event bridge.
//!
//! Starts the simulated core on its own thread, runs the consumer-side
//! scheduler on the main thread, and prints every collaborator call the
//! router produces.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use app::{BridgeConfig, Scheduler};
use clap::{Parser, Subcommand};
use core_abi::{
    BootBlock, BridgeResult, EmulatorCore, FileKind, HardDriveSource, RomSource, VolumeType,
};
use hub::Intent;
use mock::{make_collaborators, Record, Recorder};
use services_emulator::{SimConfig, SimCore, SimDriver};
use transport::{EventBus, ModalRegistry};

mod script;

use script::Step;

/// Spacing of scheduler passes while waiting.
const PUMP_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive the event bridge against a simulated core")]
struct Cli {
    /// Bridge configuration (TOML). Built-in defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a session script, or the built-in demo when none is given.
    Run {
        #[arg(value_name = "SCRIPT")]
        script: Option<PathBuf>,
        /// Only print the summary.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Print the effective configuration and exit.
    Config,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };

    match cli.command {
        Command::Config => {
            println!("{config:#?}");
            Ok(())
        }
        Command::Run { script, quiet } => {
            let text = match &script {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("failed to read script {path:?}"))?,
                None => script::DEMO.to_string(),
            };
            let steps = script::parse(&text)?;
            let mut session = Session::start(&config, quiet)?;
            for step in steps {
                session.execute(step)?;
                session.pump(PUMP_INTERVAL);
            }
            session.finish();
            Ok(())
        }
    }
}

struct Session {
    bus: EventBus,
    sim: Arc<SimCore>,
    driver: SimDriver,
    scheduler: Scheduler<SimCore>,
    recorder: Arc<Recorder>,
    modals: ModalRegistry,
    quiet: bool,
}

impl Session {
    fn start(config: &BridgeConfig, quiet: bool) -> Result<Self> {
        let bus = EventBus::new(config.dispatch_config());
        let sim = Arc::new(SimCore::new(
            bus.sink(),
            SimConfig {
                limits: config.slot_limits(),
                ..SimConfig::default()
            },
        ));
        let (hub, recorder) = make_collaborators();
        // Register before the core announces itself.
        let scheduler = Scheduler::from_config(config, &bus, hub, Arc::clone(&sim));
        sim.launch();
        let driver = SimDriver::spawn(Arc::clone(&sim)).context("failed to start sim-core")?;
        let mut session = Self {
            bus,
            sim,
            driver,
            scheduler,
            recorder,
            modals: ModalRegistry::new(),
            quiet,
        };
        session.pump(PUMP_INTERVAL);
        Ok(session)
    }

    fn execute(&mut self, step: Step) -> Result<()> {
        log::debug!("step {step:?}");
        if !self.quiet {
            println!("> {step:?}");
        }
        let commands = self.scheduler.commands().clone();
        match step {
            Step::BlankRom(kib) => {
                let rom = RomSource::Buffer(vec![0u8; kib * 1024].into());
                self.report(commands.load_rom(&rom));
            }
            Step::Rom(path) => self.report(commands.load_rom(&RomSource::File(path))),
            Step::Insert { drive, path } => {
                let bytes = fs::read(&path).with_context(|| format!("failed to read {path:?}"))?;
                let result = commands
                    .make_media(&bytes, disk_kind(&path))
                    .and_then(|media| commands.insert_disk(drive, &media, false));
                self.report(result);
            }
            Step::InsertBlank { drive, name } => self.report(commands.insert_blank_disk(
                drive,
                VolumeType::Ofs,
                BootBlock::AmigaDos13,
                &name,
            )),
            Step::Eject(drive) => self.report(commands.eject_disk(drive)),
            Step::AttachHd { slot, geometry } => {
                self.report(commands.attach_hard_drive(slot, &HardDriveSource::Blank(geometry)))
            }
            Step::Run => self.scheduler.enqueue_intent(Intent::Run),
            Step::Pause => self.scheduler.enqueue_intent(Intent::Pause),
            Step::PowerOff => self.scheduler.enqueue_intent(Intent::PowerOff),
            Step::Warp(mode) => self.scheduler.enqueue_intent(Intent::SetWarpMode(mode)),
            Step::Serial(text) => self.sim.queue_serial_out(text.as_bytes()),
            Step::Wait(duration) => self.pump(duration),
            Step::Modal { label, after } => self.modal(&label, after)?,
        }
        Ok(())
    }

    /// Shows a modal, waits for it on a helper thread, and closes it from
    /// here once `after` has passed.
    fn modal(&mut self, label: &str, after: Duration) -> Result<()> {
        let handle = self.modals.open(label);
        self.modals.show(&handle);
        if let Err(err) = handle.join() {
            println!("  owner join refused: {err}");
        }
        let waiter = handle.clone();
        let joiner = thread::Builder::new()
            .name("modal-waiter".into())
            .spawn(move || waiter.join())
            .context("failed to start modal waiter")?;
        self.pump(after);
        self.modals.close(&handle);
        let outcome = joiner
            .join()
            .map_err(|_| anyhow!("modal waiter panicked"))??;
        println!("  modal {label} -> {outcome:?}");
        Ok(())
    }

    /// Runs scheduler passes for `duration`, printing what they route.
    fn pump(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            self.scheduler.run_once();
            self.print_records();
            if Instant::now() >= deadline {
                break;
            }
            thread::sleep(PUMP_INTERVAL);
        }
    }

    fn report<T>(&self, result: BridgeResult<T>) {
        if let Err(err) = result {
            err.log();
            println!("  error: {err}");
        }
    }

    fn print_records(&self) {
        for record in self.recorder.take() {
            if !self.quiet {
                println!("  {}", describe(&record));
            }
        }
    }

    fn finish(mut self) {
        self.scheduler.run_until_idle(16);
        self.print_records();
        let steps = self.driver.stop();
        let metrics = self.bus.metrics();
        let health = self.scheduler.health();
        println!(
            "core stepped {steps} times, {} cycles, {} frames",
            self.sim.master_clock(),
            self.sim.frame_count()
        );
        println!(
            "events: {} accepted, {} coalesced, {} delivered",
            metrics.accepted, metrics.coalesced, metrics.delivered
        );
        println!(
            "commands: {} failed, flags {:?}, {} events skipped",
            health.failures,
            health.flags,
            self.scheduler.world().health.skipped_violations
        );
    }
}

fn disk_kind(path: &Path) -> FileKind {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("img" | "ima") => FileKind::Img,
        _ => FileKind::Adf,
    }
}

fn describe(record: &Record) -> String {
    match record {
        Record::Speed(sample) => format!("speed {:.2} MHz {:.1} fps", sample.mhz, sample.fps),
        Record::Notice(err) => format!("notice: {err}"),
        Record::Serial(direction, byte) => format!("serial {direction:?} {:?}", char::from(*byte)),
        other => format!("{other:?}"),
    }
}

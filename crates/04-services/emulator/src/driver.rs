//! Background thread that keeps a [`SimCore`] ticking.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::sim::SimCore;

/// Default pacing of the emulation thread (one PAL frame).
pub const STEP_INTERVAL: Duration = Duration::from_millis(20);

/// Owns the emulation thread. Dropping the driver stops and joins it.
pub struct SimDriver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl SimDriver {
    pub fn spawn(core: Arc<SimCore>) -> io::Result<Self> {
        Self::spawn_with_interval(core, STEP_INTERVAL)
    }

    pub fn spawn_with_interval(core: Arc<SimCore>, interval: Duration) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("sim-core".into())
            .spawn(move || {
                let mut steps = 0u64;
                let mut last = Instant::now();
                while !flag.load(Ordering::Acquire) {
                    thread::sleep(interval);
                    let now = Instant::now();
                    core.step(now - last);
                    last = now;
                    steps += 1;
                }
                log::debug!("sim-core stopped after {steps} steps");
                steps
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the thread and returns how many steps it ran.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.stop.store(true, Ordering::Release);
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(steps)) => steps,
            Some(Err(_)) => {
                log::error!("sim-core thread panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

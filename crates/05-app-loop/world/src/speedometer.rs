//! Emulation speed estimate from successive clock and frame samples.

use std::time::Duration;

use crate::types::SpeedSample;

/// Weight of the newest measurement in the running average.
const SMOOTHING: f64 = 0.5;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Speedometer {
    last: Option<(u64, u64, Duration)>,
    current: SpeedSample,
}

impl Speedometer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a `(cycle, frame)` pair observed at `now` and returns the
    /// smoothed estimate. The first sample only primes the meter.
    pub fn update(&mut self, cycle: u64, frame: u64, now: Duration) -> SpeedSample {
        if let Some((prev_cycle, prev_frame, prev_at)) = self.last {
            let elapsed = now.saturating_sub(prev_at).as_secs_f64();
            if elapsed > 0.0 {
                let mhz = cycle.saturating_sub(prev_cycle) as f64 / elapsed / 1_000_000.0;
                let fps = frame.saturating_sub(prev_frame) as f64 / elapsed;
                self.current = SpeedSample {
                    mhz: blend(self.current.mhz, mhz),
                    fps: blend(self.current.fps, fps),
                };
            }
        }
        self.last = Some((cycle, frame, now));
        self.current
    }

    pub fn current(&self) -> SpeedSample {
        self.current
    }
}

fn blend(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        new
    } else {
        old * (1.0 - SMOOTHING) + new * SMOOTHING
    }
}

//! Health tracking for commands the scheduler issues on the consumer's behalf.
//!
//! The scheduler latches coarse flags so the front end can tell a core that
//! keeps refusing commands from one that failed once.

use core_abi::{BridgeError, ErrorCode};

/// Consecutive failures after which the core is considered unresponsive.
pub const UNRESPONSIVE_AFTER: u8 = 3;

/// Latch-style health indicators exported to the UI layer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HealthFlags {
    /// The last scheduler-issued command failed.
    pub command_failed: bool,
    /// An `Internal` error was seen since the last reset.
    pub internal_error: bool,
    /// Several commands in a row have failed.
    pub unresponsive: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub flags: HealthFlags,
    pub failures: u64,
    pub consecutive_failures: u8,
}

impl Health {
    pub fn record_failure(&mut self, error: &BridgeError) {
        self.failures = self.failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.flags.command_failed = true;
        if error.code() == ErrorCode::Internal {
            self.flags.internal_error = true;
        }
        if self.consecutive_failures >= UNRESPONSIVE_AFTER {
            self.flags.unresponsive = true;
        }
    }

    /// Clears the per-command flags after a successful command.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.flags.command_failed = false;
        self.flags.unresponsive = false;
    }
}

//! Bridge configuration, loadable from TOML.
//!
//! ```toml
//! [dispatch]
//! head_poll_interval_ms = 100
//! event_budget = 64
//!
//! [router]
//! drive_slots = 4
//! violation_policy = "log-and-skip"
//!
//! [frontend]
//! tick_hz = 12
//! warp_mode = "auto"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use core_abi::SlotLimits;
use serde::Deserialize;
use thiserror::Error;
use transport::DispatchConfig;
use world::{RouterConfig, ViolationPolicy, WarpMode};

/// Device slots a status bar can show per kind.
pub const MAX_SLOTS: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("frontend.tick_hz must be positive")]
    ZeroTickRate,

    #[error("{what} must be positive")]
    ZeroBudget { what: &'static str },

    #[error("{what} must be between 1 and 8, got {count}")]
    SlotCount { what: &'static str, count: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub dispatch: DispatchSection,
    pub router: RouterSection,
    pub frontend: FrontendSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchSection {
    /// Minimum spacing of head-poll events per drive. Zero disables thinning.
    pub head_poll_interval_ms: u64,
    /// Events routed per scheduler pass.
    pub event_budget: usize,
    /// Intents executed per scheduler pass.
    pub intent_budget: usize,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            head_poll_interval_ms: 100,
            event_budget: hub::DEFAULT_EVENT_BUDGET,
            intent_budget: hub::DEFAULT_INTENT_BUDGET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterSection {
    pub drive_slots: usize,
    pub hard_drive_slots: usize,
    pub violation_policy: ViolationPolicy,
}

impl Default for RouterSection {
    fn default() -> Self {
        let limits = SlotLimits::default();
        Self {
            drive_slots: limits.drives,
            hard_drive_slots: limits.hard_drives,
            violation_policy: ViolationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontendSection {
    /// Status animation rate.
    pub tick_hz: u32,
    pub drive_noise: bool,
    pub drive_noise_no_poll: bool,
    pub warp_mode: WarpMode,
    pub warp_load: bool,
}

impl Default for FrontendSection {
    fn default() -> Self {
        Self {
            tick_hz: 12,
            drive_noise: true,
            drive_noise_no_poll: false,
            warp_mode: WarpMode::Auto,
            warp_load: true,
        }
    }
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frontend.tick_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.dispatch.event_budget == 0 {
            return Err(ConfigError::ZeroBudget {
                what: "dispatch.event_budget",
            });
        }
        if self.dispatch.intent_budget == 0 {
            return Err(ConfigError::ZeroBudget {
                what: "dispatch.intent_budget",
            });
        }
        check_slots("router.drive_slots", self.router.drive_slots)?;
        check_slots("router.hard_drive_slots", self.router.hard_drive_slots)?;
        Ok(())
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            head_poll_interval: Duration::from_millis(self.dispatch.head_poll_interval_ms),
        }
    }

    pub fn slot_limits(&self) -> SlotLimits {
        SlotLimits {
            drives: self.router.drive_slots,
            hard_drives: self.router.hard_drive_slots,
        }
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            limits: self.slot_limits(),
            violation_policy: self.router.violation_policy,
            drive_noise: self.frontend.drive_noise,
            drive_noise_no_poll: self.frontend.drive_noise_no_poll,
            warp_mode: self.frontend.warp_mode,
            warp_load: self.frontend.warp_load,
        }
    }

    /// Spacing of status ticks. Only meaningful on a validated config.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frontend.tick_hz.max(1)
    }
}

fn check_slots(what: &'static str, count: usize) -> Result<(), ConfigError> {
    if (1..=MAX_SLOTS).contains(&count) {
        Ok(())
    } else {
        Err(ConfigError::SlotCount { what, count })
    }
}

//! Simulated emulator core.
//!
//! [`SimCore`] implements [`core_abi::EmulatorCore`] over a small machine
//! model and reports state changes through a [`transport::EventSink`].
//! [`SimDriver`] runs it on its own thread the way a real core runs its
//! emulation loop.

pub mod driver;
pub mod media;
pub mod sim;

pub use driver::{SimDriver, STEP_INTERVAL};
pub use sim::{SimConfig, SimCore, PAL_MASTER_CLOCK};

//! Producer-to-consumer plumbing between an emulation core and its front end.
//!
//! * [`EventBus`] / [`EventSink`] / [`EventStream`] – single-listener, ordered,
//!   non-blocking notification queue.
//! * [`RateGate`] – producer-side thinning of noisy event kinds.
//! * [`ModalRegistry`] / [`ModalHandle`] – blocking join on interactions the
//!   consumer shows asynchronously.

mod coalesce;
mod dispatch;
mod metrics;
mod modal;
pub mod wait;

pub use coalesce::RateGate;
pub use dispatch::{DispatchConfig, EventBus, EventSink, EventStream, RegistrationToken};
pub use metrics::{DispatchMetricsSnapshot, EmitOutcome};
pub use modal::{ModalError, ModalHandle, ModalOutcome, ModalRegistry, ModalState};

//! Consumer-side state and the reducers that drive it.
//!
//! The `world` crate turns core events into collaborator actions
//! ([`EventRouter`]) and scheduler intents into core commands
//! ([`IntentReducer`]). It never touches collaborators or the core directly.

/// Pure intent reducer.
pub mod reduce_intent;
/// Closed-world event router.
pub mod reduce_event;
/// Speed estimate shown on the status bar.
pub mod speedometer;
/// Intent, command, and follow-up types.
pub mod types;
/// World state container.
pub mod world;

pub use crate::reduce_event::EventRouter;
pub use crate::reduce_intent::IntentReducer;
pub use crate::speedometer::Speedometer;
pub use crate::types::{
    Action, CoreCmd, DeviceSlot, FollowUps, Intent, IntentPriority, PowerLed, SerialDirection,
    SoundCue, SpeedSample, ViolationPolicy, WarpMode,
};
pub use crate::world::{RouterConfig, World, WorldHealth, SPEED_UPDATE_TICKS};

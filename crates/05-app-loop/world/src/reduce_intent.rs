//! Intent reducer: turns scheduler intents into core commands.

use smallvec::{smallvec, SmallVec};

use crate::types::{CoreCmd, FollowUps, Intent};
use crate::world::World;

/// Trait for handling intents and producing core commands.
pub trait IntentReducer {
    /// Reduces an intent into zero or more core commands.
    fn reduce_intent(&mut self, intent: Intent) -> SmallVec<[CoreCmd; 2]>;
}

impl IntentReducer for World {
    fn reduce_intent(&mut self, intent: Intent) -> SmallVec<[CoreCmd; 2]> {
        match intent {
            Intent::Run => smallvec![CoreCmd::Run],
            Intent::Pause => smallvec![CoreCmd::Pause],
            Intent::PowerOn => smallvec![CoreCmd::PowerOn],
            Intent::PowerOff => smallvec![CoreCmd::PowerOff],
            Intent::SetWarp(on) => {
                self.warp_requested = Some(on);
                smallvec![CoreCmd::SetWarp(on)]
            }
            Intent::SetWarpMode(mode) => {
                self.config.warp_mode = mode;
                let mut follow_ups = FollowUps::new();
                self.update_warp(&mut follow_ups);
                follow_ups
                    .deferred_intents
                    .into_iter()
                    .flat_map(|(_, intent)| self.reduce_intent(intent))
                    .collect()
            }
        }
    }
}

//! Consumer-side scheduler.
//!
//! One [`Scheduler`] runs on the presentation thread. Each pass executes a
//! bounded number of queued intents, advances the status tick when it is due,
//! and routes a bounded batch of core events to the collaborators.

use std::sync::Arc;
use std::time::{Duration, Instant};

use core_abi::{BridgeResult, EmulatorCore};
use hub::{
    Collaborators, Commands, EventRouter, FollowUps, Intent, IntentPriority, IntentReducer,
    DEFAULT_EVENT_BUDGET, DEFAULT_INTENT_BUDGET,
};
use transport::{EventBus, EventStream};
use world::World;

pub mod config;
pub mod health;
pub mod priority;

pub use config::{BridgeConfig, ConfigError};
pub use health::{Health, HealthFlags};
use priority::PQueues;

/// Default status tick spacing (12 Hz).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 12);

/// What one scheduler pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    pub intents: usize,
    pub events: usize,
    pub ticked: bool,
}

pub struct Scheduler<C: EmulatorCore> {
    world: World,
    stream: EventStream,
    hub: Collaborators,
    commands: Commands<C>,
    intents: PQueues<Intent>,
    intent_budget: usize,
    event_budget: usize,
    tick_interval: Duration,
    next_tick: Duration,
    epoch: Instant,
    health: Health,
}

impl<C: EmulatorCore> Scheduler<C> {
    pub fn new(world: World, stream: EventStream, hub: Collaborators, commands: Commands<C>) -> Self {
        Self {
            world,
            stream,
            hub,
            commands,
            intents: PQueues::with_capacity(16),
            intent_budget: DEFAULT_INTENT_BUDGET,
            event_budget: DEFAULT_EVENT_BUDGET,
            tick_interval: DEFAULT_TICK_INTERVAL,
            next_tick: DEFAULT_TICK_INTERVAL,
            epoch: Instant::now(),
            health: Health::default(),
        }
    }

    /// Registers on `bus` and wires every piece from a validated config.
    pub fn from_config(
        config: &BridgeConfig,
        bus: &EventBus,
        hub: Collaborators,
        core: Arc<C>,
    ) -> Self {
        let world = World::new(config.router_config());
        let commands = Commands::new(core, config.slot_limits());
        let mut scheduler = Self::new(world, bus.register(), hub, commands);
        scheduler.intent_budget = config.dispatch.intent_budget;
        scheduler.event_budget = config.dispatch.event_budget;
        scheduler.set_tick_interval(config.tick_interval());
        log::debug!(
            "scheduler listening as {} (events {}/pass, ticks every {:?})",
            scheduler.stream.token().get(),
            scheduler.event_budget,
            scheduler.tick_interval
        );
        scheduler
    }

    pub fn with_budgets(mut self, intent_budget: usize, event_budget: usize) -> Self {
        self.intent_budget = intent_budget;
        self.event_budget = event_budget;
        self
    }

    pub fn set_tick_interval(&mut self, interval: Duration) {
        self.tick_interval = interval;
        self.next_tick = interval;
    }

    pub fn enqueue_intent(&mut self, intent: Intent) {
        self.intents.push(intent);
    }

    pub fn enqueue_intent_at(&mut self, priority: IntentPriority, intent: Intent) {
        self.intents.enqueue(priority, intent);
    }

    pub fn pending_intents(&self) -> [usize; 3] {
        self.intents.len_per_priority()
    }

    /// Events waiting in this scheduler's registration.
    pub fn pending_events(&self) -> usize {
        self.stream.pending()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn commands(&self) -> &Commands<C> {
        &self.commands
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn stream(&self) -> &EventStream {
        &self.stream
    }

    /// Runs one pass using wall-clock time since the scheduler was created.
    pub fn run_once(&mut self) -> PassStats {
        let now = self.epoch.elapsed();
        self.run_once_at(now)
    }

    /// Runs one pass as if `now` had elapsed since the scheduler was created.
    pub fn run_once_at(&mut self, now: Duration) -> PassStats {
        let intents = self.process_intents();
        let ticked = self.process_tick(now);
        let events = self.process_events();
        PassStats {
            intents,
            events,
            ticked,
        }
    }

    /// Runs passes until no intents or events remain, up to `max_passes`.
    pub fn run_until_idle(&mut self, max_passes: usize) -> usize {
        let mut passes = 0;
        while passes < max_passes {
            let stats = self.run_once();
            passes += 1;
            if stats.intents == 0 && stats.events == 0 && self.intents.is_empty() {
                break;
            }
        }
        passes
    }

    fn process_intents(&mut self) -> usize {
        let mut done = 0;
        while done < self.intent_budget {
            let Some(intent) = self.intents.pop_next() else {
                break;
            };
            done += 1;
            for cmd in self.world.reduce_intent(intent) {
                log::debug!("issuing {cmd:?} for {intent:?}");
                let result = self.commands.execute(cmd);
                self.settle(result);
            }
        }
        done
    }

    fn process_tick(&mut self, now: Duration) -> bool {
        if now < self.next_tick {
            return false;
        }
        self.next_tick += self.tick_interval;
        if self.next_tick <= now {
            // Fell behind; resume the cadence from now rather than bursting.
            self.next_tick = now + self.tick_interval;
        }
        let follow_ups = self.world.tick(
            self.commands.master_clock(),
            self.commands.frame_count(),
            now,
        );
        self.apply(follow_ups);
        true
    }

    fn process_events(&mut self) -> usize {
        let events = self.stream.drain(self.event_budget);
        let routed = events.len();
        for raw in events {
            let follow_ups = self.world.reduce_event(raw);
            self.apply(follow_ups);
        }
        routed
    }

    fn apply(&mut self, follow_ups: FollowUps) {
        self.hub.apply_all(follow_ups.immediate);
        for (priority, intent) in follow_ups.deferred_intents {
            self.intents.enqueue(priority, intent);
        }
    }

    /// Records a command outcome and surfaces failures.
    fn settle(&mut self, result: BridgeResult<()>) {
        match result {
            Ok(()) => self.health.record_success(),
            Err(err) => {
                err.log();
                self.health.record_failure(&err);
                if err.is_user_visible() {
                    self.hub.notices().notify(&err);
                }
            }
        }
    }
}

//! Listener registration and the ordered dispatch queue.
//!
//! The producer (simulation thread) holds an [`EventSink`]; the consumer holds
//! the [`EventStream`] returned by [`EventBus::register`]. Each registration
//! owns its own unbounded channel, so events from one producer stream arrive in
//! FIFO order and the producer never blocks or runs consumer code. Only one
//! registration is live per bus; registering again retires the previous stream.

use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use core_abi::{EventKind, RawEvent};
use crossbeam_channel::{Receiver, Sender};
use smallvec::SmallVec;

use crate::coalesce::RateGate;
use crate::metrics::{DispatchMetrics, DispatchMetricsSnapshot, EmitOutcome};

/// Identifies one listener registration. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationToken(u64);

impl RegistrationToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Tuning knobs for the dispatch queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Minimum spacing of `DriveHeadPoll` events per drive. Zero disables.
    pub head_poll_interval: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            head_poll_interval: Duration::from_millis(100),
        }
    }
}

struct Listener {
    token: RegistrationToken,
    tx: Sender<RawEvent>,
}

struct Shared {
    listener: ArcSwapOption<Listener>,
    next_token: AtomicU64,
    head_poll: RateGate,
    metrics: DispatchMetrics,
}

impl Shared {
    fn current_token(&self) -> Option<RegistrationToken> {
        let guard = self.listener.load();
        (*guard).as_ref().map(|listener| listener.token)
    }

    fn retire(&self, token: RegistrationToken) -> bool {
        let prev = self.listener.rcu(|current| match current {
            Some(listener) if listener.token == token => None,
            other => other.clone(),
        });
        matches!(prev, Some(listener) if listener.token == token)
    }
}

/// Owner of the single listener slot.
#[derive(Clone)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl EventBus {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                listener: ArcSwapOption::empty(),
                next_token: AtomicU64::new(1),
                head_poll: RateGate::new(config.head_poll_interval),
                metrics: DispatchMetrics::default(),
            }),
        }
    }

    /// Producer handle. Cheap to clone and safe to move to the core's thread.
    pub fn sink(&self) -> EventSink {
        EventSink {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Registers the calling context as the one consumer, replacing any
    /// previous registration.
    ///
    /// The returned stream is pinned to the thread that registered it.
    pub fn register(&self) -> EventStream {
        let token = RegistrationToken(self.shared.next_token.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = crossbeam_channel::unbounded();
        let prev = self
            .shared
            .listener
            .swap(Some(Arc::new(Listener { token, tx })));
        match prev {
            Some(old) => log::debug!(
                "listener {} replaced by {}",
                old.token.get(),
                token.get()
            ),
            None => log::debug!("listener {} registered", token.get()),
        }
        EventStream {
            token,
            rx,
            shared: Arc::clone(&self.shared),
            _consumer: PhantomData,
        }
    }

    /// Ends a registration. Returns `false` if `token` was not the live one.
    ///
    /// Once this returns, the stream for `token` delivers nothing further;
    /// events still queued for it are discarded.
    pub fn unregister(&self, token: RegistrationToken) -> bool {
        let retired = self.shared.retire(token);
        if retired {
            log::debug!("listener {} unregistered", token.get());
        }
        retired
    }

    /// Token of the live registration, if any.
    pub fn current(&self) -> Option<RegistrationToken> {
        self.shared.current_token()
    }

    pub fn metrics(&self) -> DispatchMetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

/// Producer-side handle used by the simulation core.
#[derive(Clone)]
pub struct EventSink {
    shared: Arc<Shared>,
}

impl EventSink {
    /// Fire-and-forget notification. Never blocks.
    pub fn emit(&self, kind: EventKind, payload: u32) -> EmitOutcome {
        self.emit_raw(RawEvent::new(kind, payload))
    }

    /// Emits an event by wire code, for cores that speak the raw protocol.
    pub fn emit_raw(&self, event: RawEvent) -> EmitOutcome {
        let outcome = self.offer(event);
        self.shared.metrics.record(outcome);
        outcome
    }

    fn offer(&self, event: RawEvent) -> EmitOutcome {
        if event.code == EventKind::DriveHeadPoll.code()
            && !self.shared.head_poll.admit(event.payload)
        {
            return EmitOutcome::Coalesced;
        }
        let guard = self.shared.listener.load();
        match &*guard {
            // Unbounded: a send only fails once the stream is gone.
            Some(listener) if listener.tx.send(event).is_ok() => EmitOutcome::Accepted,
            _ => EmitOutcome::Unobserved,
        }
    }
}

/// Consumer-side end of one registration.
///
/// `!Send`: events are only ever handled on the context that registered.
/// Dropping the stream unregisters it.
pub struct EventStream {
    token: RegistrationToken,
    rx: Receiver<RawEvent>,
    shared: Arc<Shared>,
    _consumer: PhantomData<Rc<()>>,
}

impl EventStream {
    pub fn token(&self) -> RegistrationToken {
        self.token
    }

    /// Whether this stream is still the bus's live registration.
    pub fn is_active(&self) -> bool {
        self.shared.current_token() == Some(self.token)
    }

    /// Events queued and not yet delivered.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Takes the next event, or `None` when the queue is empty or the
    /// registration has ended.
    pub fn try_next(&self) -> Option<RawEvent> {
        if !self.is_active() {
            self.discard_pending();
            return None;
        }
        let event = self.rx.try_recv().ok()?;
        self.shared.metrics.record_delivered(1);
        Some(event)
    }

    /// Takes up to `budget` events in production order.
    pub fn drain(&self, budget: usize) -> SmallVec<[RawEvent; 16]> {
        let mut out = SmallVec::new();
        while out.len() < budget {
            match self.try_next() {
                Some(event) => out.push(event),
                None => break,
            }
        }
        out
    }

    fn discard_pending(&self) {
        let dropped = self.rx.try_iter().count();
        if dropped > 0 {
            log::debug!(
                "listener {} discarded {dropped} in-flight event(s)",
                self.token.get()
            );
            self.shared.metrics.record_discarded(dropped);
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if self.shared.retire(self.token) {
            log::debug!("listener {} dropped", self.token.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn no_gating() -> DispatchConfig {
        DispatchConfig {
            head_poll_interval: Duration::ZERO,
        }
    }

    #[test]
    fn events_without_listener_are_unobserved() {
        let bus = EventBus::new(no_gating());
        let sink = bus.sink();
        assert_eq!(sink.emit(EventKind::Run, 0), EmitOutcome::Unobserved);
        assert_eq!(bus.metrics().unobserved, 1);
    }

    #[test]
    fn delivers_in_order_within_budget() {
        let bus = EventBus::new(no_gating());
        let stream = bus.register();
        let sink = bus.sink();
        for slot in 0..4 {
            sink.emit(EventKind::DriveLedOn, slot);
        }
        let first = stream.drain(3);
        assert_eq!(
            first.iter().map(|e| e.payload).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(stream.drain(8).len(), 1);
        assert!(stream.drain(8).is_empty());
        assert_eq!(bus.metrics().delivered, 4);
    }

    #[test]
    fn unregister_discards_in_flight_events() {
        let bus = EventBus::new(no_gating());
        let stream = bus.register();
        let sink = bus.sink();
        sink.emit(EventKind::Pause, 0);
        sink.emit(EventKind::Run, 0);

        assert!(bus.unregister(stream.token()));
        assert_eq!(sink.emit(EventKind::Reset, 0), EmitOutcome::Unobserved);

        assert!(stream.try_next().is_none());
        assert!(stream.drain(16).is_empty());
        let metrics = bus.metrics();
        assert_eq!(metrics.delivered, 0);
        assert_eq!(metrics.discarded, 2);
        assert!(!bus.unregister(stream.token()));
    }

    #[test]
    fn reregistering_retires_previous_stream() {
        let bus = EventBus::new(no_gating());
        let old = bus.register();
        let sink = bus.sink();
        sink.emit(EventKind::PowerOn, 0);

        let new = bus.register();
        sink.emit(EventKind::PowerOff, 0);

        assert!(!old.is_active());
        assert!(old.drain(8).is_empty());
        let got = new.drain(8);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].code, EventKind::PowerOff.code());
        assert!(new.token() > old.token());
    }

    #[test]
    fn dropping_the_stream_unregisters() {
        let bus = EventBus::new(no_gating());
        let stream = bus.register();
        let token = stream.token();
        drop(stream);
        assert_eq!(bus.current(), None);
        assert!(!bus.unregister(token));
        assert_eq!(bus.sink().emit(EventKind::Run, 0), EmitOutcome::Unobserved);
    }

    #[test]
    fn dropping_a_replaced_stream_keeps_the_new_one() {
        let bus = EventBus::new(no_gating());
        let old = bus.register();
        let new = bus.register();
        drop(old);
        assert_eq!(bus.current(), Some(new.token()));
    }

    #[test]
    fn head_poll_is_coalesced_at_the_producer() {
        let bus = EventBus::new(DispatchConfig {
            head_poll_interval: Duration::from_secs(60),
        });
        let stream = bus.register();
        let sink = bus.sink();
        assert_eq!(sink.emit(EventKind::DriveHeadPoll, 0), EmitOutcome::Accepted);
        assert_eq!(sink.emit(EventKind::DriveHeadPoll, 0), EmitOutcome::Coalesced);
        assert_eq!(sink.emit(EventKind::DriveHeadPoll, 1), EmitOutcome::Accepted);
        assert_eq!(sink.emit(EventKind::DriveHead, 0), EmitOutcome::Accepted);
        assert_eq!(stream.drain(16).len(), 3);
        assert_eq!(bus.metrics().coalesced, 1);
    }

    #[test]
    fn producer_thread_never_blocks_on_a_slow_consumer() {
        const COUNT: u32 = 50_000;
        let bus = EventBus::new(no_gating());
        let stream = bus.register();
        let sink = bus.sink();
        let producer = thread::spawn(move || {
            for i in 0..COUNT {
                sink.emit(EventKind::SerialOut, i);
            }
        });
        producer.join().unwrap();
        assert_eq!(stream.pending(), COUNT as usize);

        let mut expected = 0u32;
        loop {
            let batch = stream.drain(1024);
            if batch.is_empty() {
                break;
            }
            for event in batch {
                assert_eq!(event.payload, expected);
                expected += 1;
            }
        }
        assert_eq!(expected, COUNT);
    }
}

use std::thread;
use std::time::{Duration, Instant};

use core_abi::{EventKind, RawEvent};
use transport::{DispatchConfig, EventBus, EventStream};

const N: u32 = 10_000;
const TIMEOUT: Duration = Duration::from_secs(10);

fn bus() -> EventBus {
    crate::init_logging();
    EventBus::new(DispatchConfig {
        head_poll_interval: Duration::ZERO,
    })
}

fn collect(stream: &EventStream, count: usize) -> Vec<RawEvent> {
    let deadline = Instant::now() + TIMEOUT;
    let mut seen = Vec::with_capacity(count);
    while seen.len() < count {
        assert!(Instant::now() < deadline, "only {} of {count} events arrived", seen.len());
        match stream.try_next() {
            Some(event) => seen.push(event),
            None => thread::yield_now(),
        }
    }
    seen
}

#[test]
fn single_producer_order_is_preserved() {
    let bus = bus();
    let stream = bus.register();
    let sink = bus.sink();
    let producer = thread::spawn(move || {
        for i in 0..N {
            sink.emit(EventKind::Config, i);
        }
    });

    let seen = collect(&stream, N as usize);
    producer.join().unwrap();
    let payloads: Vec<u32> = seen.iter().map(|e| e.payload).collect();
    assert_eq!(payloads, (0..N).collect::<Vec<_>>());
    assert!(stream.try_next().is_none());
    assert_eq!(bus.metrics().accepted, u64::from(N));
}

#[test]
fn each_producer_keeps_its_own_order() {
    const PRODUCERS: u32 = 4;
    let bus = bus();
    let stream = bus.register();
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let sink = bus.sink();
            thread::spawn(move || {
                for i in 0..N {
                    sink.emit(EventKind::Config, (p << 24) | i);
                }
            })
        })
        .collect();

    let seen = collect(&stream, (PRODUCERS * N) as usize);
    for producer in producers {
        producer.join().unwrap();
    }
    for p in 0..PRODUCERS {
        let mine: Vec<u32> = seen
            .iter()
            .filter(|e| e.payload >> 24 == p)
            .map(|e| e.payload & 0x00FF_FFFF)
            .collect();
        assert_eq!(mine, (0..N).collect::<Vec<_>>(), "producer {p}");
    }
}

#[test]
fn nothing_is_delivered_after_unregister() {
    let bus = bus();
    let stream = bus.register();
    let sink = bus.sink();
    let producer = thread::spawn(move || {
        for i in 0..N {
            sink.emit(EventKind::SerialOut, i & 0xFF);
        }
    });

    let before = collect(&stream, 10);
    assert_eq!(before.len(), 10);
    assert!(bus.unregister(stream.token()));
    assert!(!stream.is_active());
    producer.join().unwrap();

    assert!(stream.try_next().is_none());
    assert!(stream.drain(usize::MAX).is_empty());
    let metrics = bus.metrics();
    assert_eq!(
        metrics.accepted + metrics.unobserved,
        u64::from(N),
        "every emit is accounted for"
    );
}

#[test]
fn replacement_listener_sees_only_later_events() {
    let bus = bus();
    let sink = bus.sink();
    let first = bus.register();
    sink.emit(EventKind::Run, 0);

    let second = bus.register();
    assert!(!first.is_active());
    assert_eq!(bus.current(), Some(second.token()));

    let producer = thread::spawn(move || {
        sink.emit(EventKind::Pause, 0);
    });
    producer.join().unwrap();

    assert!(first.try_next().is_none());
    assert_eq!(collect(&second, 1), vec![RawEvent::new(EventKind::Pause, 0)]);
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use transport::{ModalError, ModalOutcome, ModalRegistry, ModalState};

#[test]
fn join_blocks_until_the_owner_closes() {
    crate::init_logging();
    let registry = ModalRegistry::new();
    let handle = registry.open("insert disk");
    assert!(registry.show(&handle));

    let closed = Arc::new(AtomicBool::new(false));
    let waiter = {
        let handle = handle.clone();
        let closed = Arc::clone(&closed);
        thread::spawn(move || {
            let outcome = handle.join();
            (outcome, closed.load(Ordering::SeqCst))
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!waiter.is_finished());
    closed.store(true, Ordering::SeqCst);
    assert!(registry.close(&handle));

    let (outcome, saw_close) = waiter.join().unwrap();
    assert_eq!(outcome, Ok(ModalOutcome::Completed));
    assert!(saw_close, "join returned before close");
    assert!(registry.is_idle());
}

#[test]
fn cancel_wakes_the_waiter_with_cancelled() {
    let registry = ModalRegistry::new();
    let handle = registry.open("eject");
    registry.show(&handle);
    let waiter = {
        let handle = handle.clone();
        thread::spawn(move || handle.join())
    };
    thread::sleep(Duration::from_millis(10));
    assert!(registry.cancel(&handle));
    assert_eq!(waiter.join().unwrap(), Ok(ModalOutcome::Cancelled));
}

#[test]
fn second_close_is_harmless_and_late_join_returns_at_once() {
    let registry = ModalRegistry::new();
    let handle = registry.open("export");
    registry.show(&handle);
    assert!(registry.close(&handle));
    assert!(!registry.close(&handle));
    assert!(!registry.cancel(&handle));
    assert_eq!(handle.state(), ModalState::Completed);

    let late = thread::spawn(move || handle.join());
    assert_eq!(late.join().unwrap(), Ok(ModalOutcome::Completed));
}

#[test]
fn owner_cannot_join_its_own_modal() {
    let registry = ModalRegistry::new();
    let handle = registry.open("preferences");
    assert_eq!(handle.join(), Err(ModalError::NotShown(handle.id())));
    registry.show(&handle);
    assert_eq!(handle.join(), Err(ModalError::WouldDeadlock(handle.id())));
    registry.close(&handle);
    assert_eq!(handle.join(), Ok(ModalOutcome::Completed));
}

#[test]
fn registry_lists_shown_modals() {
    let registry = ModalRegistry::new();
    let a = registry.open("a");
    let b = registry.open("b");
    registry.show(&a);
    registry.show(&b);
    let labels: Vec<String> = registry.active().iter().map(|h| h.label().to_string()).collect();
    assert_eq!(labels, ["a", "b"]);
    registry.cancel(&a);
    assert_eq!(registry.active().len(), 1);
    assert_eq!(registry.active()[0].id(), b.id());
}

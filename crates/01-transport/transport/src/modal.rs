//! Blocking join on asynchronously shown interactions.
//!
//! A [`ModalRegistry`] lives on the consumer context and opens handles for
//! interactions such as dialogs. A scripted driver or test harness on another
//! thread may [`ModalHandle::join`] a shown handle and sleeps until the
//! consumer closes or cancels it. Each handle walks
//! `Created -> Shown -> Completed | Cancelled` exactly once.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use thiserror::Error;

use crate::wait::{wait_while_eq, wake_all};

const CREATED: u32 = 0;
const SHOWN: u32 = 1;
const COMPLETED: u32 = 2;
const CANCELLED: u32 = 3;

/// Lifecycle position of a modal interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModalState {
    Created,
    Shown,
    Completed,
    Cancelled,
}

impl ModalState {
    fn from_raw(raw: u32) -> Self {
        match raw {
            CREATED => ModalState::Created,
            SHOWN => ModalState::Shown,
            COMPLETED => ModalState::Completed,
            _ => ModalState::Cancelled,
        }
    }
}

/// How a joined interaction ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModalOutcome {
    Completed,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ModalError {
    #[error("modal {0} has not been shown yet")]
    NotShown(u64),

    #[error("modal {0} already has a waiter")]
    JoinInProgress(u64),

    #[error("joining modal {0} from its owning context would deadlock")]
    WouldDeadlock(u64),
}

struct ModalInner {
    id: u64,
    label: String,
    state: AtomicU32,
    joining: AtomicBool,
    owner: ThreadId,
}

/// Shared reference to one interaction. Clone it into the waiting thread.
#[derive(Clone)]
pub struct ModalHandle {
    inner: Arc<ModalInner>,
}

impl ModalHandle {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn state(&self) -> ModalState {
        ModalState::from_raw(self.inner.state.load(Ordering::Acquire))
    }

    /// Blocks until the interaction is closed or cancelled.
    ///
    /// Returns immediately if that already happened. Must not be called from
    /// the context that owns the registry while the handle is shown.
    pub fn join(&self) -> Result<ModalOutcome, ModalError> {
        let id = self.inner.id;
        match self.state() {
            ModalState::Created => return Err(ModalError::NotShown(id)),
            ModalState::Completed => return Ok(ModalOutcome::Completed),
            ModalState::Cancelled => return Ok(ModalOutcome::Cancelled),
            ModalState::Shown => {}
        }
        if thread::current().id() == self.inner.owner {
            return Err(ModalError::WouldDeadlock(id));
        }
        if self.inner.joining.swap(true, Ordering::AcqRel) {
            return Err(ModalError::JoinInProgress(id));
        }

        log::debug!("modal {id} ({}): waiting until closed", self.inner.label);
        let raw = wait_while_eq(&self.inner.state, SHOWN);
        self.inner.joining.store(false, Ordering::Release);

        Ok(match ModalState::from_raw(raw) {
            ModalState::Completed => ModalOutcome::Completed,
            _ => ModalOutcome::Cancelled,
        })
    }
}

impl std::fmt::Debug for ModalHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalHandle")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("state", &self.state())
            .finish()
    }
}

/// Tracks the interactions currently shown by the consumer.
pub struct ModalRegistry {
    owner: ThreadId,
    next_id: AtomicU64,
    active: Mutex<Vec<ModalHandle>>,
}

impl ModalRegistry {
    /// Creates a registry owned by the calling thread.
    pub fn new() -> Self {
        Self {
            owner: thread::current().id(),
            next_id: AtomicU64::new(1),
            active: Mutex::new(Vec::new()),
        }
    }

    /// Creates a handle in the `Created` state.
    pub fn open(&self, label: impl Into<String>) -> ModalHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        ModalHandle {
            inner: Arc::new(ModalInner {
                id,
                label: label.into(),
                state: AtomicU32::new(CREATED),
                joining: AtomicBool::new(false),
                owner: self.owner,
            }),
        }
    }

    /// Marks the interaction as displayed. Returns `false` unless it was `Created`.
    pub fn show(&self, handle: &ModalHandle) -> bool {
        let shown = handle
            .inner
            .state
            .compare_exchange(CREATED, SHOWN, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if shown {
            self.active.lock().push(handle.clone());
            log::debug!("modal {} ({}): shown", handle.id(), handle.label());
        }
        shown
    }

    /// Completes the interaction and releases any waiter.
    ///
    /// Returns `false` if the handle was already closed; nothing is released twice.
    pub fn close(&self, handle: &ModalHandle) -> bool {
        self.finish(handle, COMPLETED)
    }

    /// Cancels the interaction and releases any waiter.
    pub fn cancel(&self, handle: &ModalHandle) -> bool {
        self.finish(handle, CANCELLED)
    }

    fn finish(&self, handle: &ModalHandle, target: u32) -> bool {
        let state = &handle.inner.state;
        let mut current = state.load(Ordering::Acquire);
        loop {
            if current != CREATED && current != SHOWN {
                log::trace!("modal {}: already closed", handle.id());
                return false;
            }
            match state.compare_exchange(current, target, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        self.active.lock().retain(|h| h.id() != handle.id());
        wake_all(state);
        log::debug!(
            "modal {} ({}): {:?}",
            handle.id(),
            handle.label(),
            ModalState::from_raw(target)
        );
        true
    }

    /// Handles currently shown, in the order they were shown.
    pub fn active(&self) -> Vec<ModalHandle> {
        self.active.lock().clone()
    }

    pub fn is_idle(&self) -> bool {
        self.active.lock().is_empty()
    }
}

impl Default for ModalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Cross-thread end-to-end tests for the event bridge.

#[cfg(test)]
mod bridged_calls;

#[cfg(test)]
mod modal_wait;

#[cfg(test)]
mod session_e2e;

#[cfg(test)]
mod threaded_dispatch;

#[cfg(test)]
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

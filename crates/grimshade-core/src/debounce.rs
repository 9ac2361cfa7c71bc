//! Coalescing timer for burst edits.

use std::cell::RefCell;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Coalesces bursts of values into a single delayed delivery.
///
/// Arming while a timer is pending cancels the pending timer and re-arms,
/// so across N arms within the delay window the receiver sees at most one
/// value: the last one, after the window of post-edit quiescence.
/// Cancellation only stops the timer; it never aborts work the receiver
/// already started.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    pending: RefCell<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Must be dropped or armed inside a tokio runtime; `arm` spawns the
    /// timer task.
    pub fn new(delay: Duration, tx: mpsc::UnboundedSender<T>) -> Self {
        Self {
            delay,
            tx,
            pending: RefCell::new(None),
        }
    }

    /// Re-arm the timer with a fresh value, superseding any pending one.
    pub fn arm(&self, value: T) {
        if let Some(handle) = self.pending.borrow_mut().take() {
            handle.abort();
        }
        let tx = self.tx.clone();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(value);
        });
        *self.pending.borrow_mut() = Some(handle);
    }

    /// Drop the pending timer, if any, without firing.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.borrow_mut().take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.borrow_mut().take() {
            handle.abort();
        }
    }
}

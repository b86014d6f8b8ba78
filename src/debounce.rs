//! Delay-and-coalesce primitives for rapidly changing input.
//!
//! [`Debouncer`] schedules one callback per quiet period; starting it again
//! cancels whatever was pending. [`DebouncedValue`] builds on it to expose the
//! settled value through a `watch` channel.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::sleep;

/// Handle to one scheduled emission
#[derive(Debug, Clone)]
pub struct CancelHandle {
    task: AbortHandle,
}

impl CancelHandle {
    /// Drop the pending emission. No-op once it has fired.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Cancellable single-slot timer. Must be used inside a tokio runtime.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<CancelHandle>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `value` to `callback` after `delay`, unless started again or
    /// cancelled first.
    pub fn start<T, F>(&mut self, value: T, delay: Duration, callback: F) -> CancelHandle
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        self.cancel();

        let task = tokio::spawn(async move {
            sleep(delay).await;
            callback(value);
        });

        let handle = CancelHandle {
            task: task.abort_handle(),
        };
        self.pending = Some(handle.clone());
        handle
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A value whose observers only see it after it has stopped changing
#[derive(Debug)]
pub struct DebouncedValue<T> {
    delay: Duration,
    latest: T,
    debouncer: Debouncer,
    settled: Arc<watch::Sender<T>>,
}

impl<T> DebouncedValue<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (settled, _) = watch::channel(initial.clone());
        Self {
            delay,
            latest: initial,
            debouncer: Debouncer::new(),
            settled: Arc::new(settled),
        }
    }

    /// Record a new raw value and restart the quiet period.
    /// Setting the value it already holds is not a change.
    pub fn set(&mut self, value: T) {
        if value == self.latest {
            return;
        }
        self.latest = value.clone();

        let settled = Arc::clone(&self.settled);
        self.debouncer.start(value, self.delay, move |value| {
            settled.send_if_modified(|current| {
                if *current == value {
                    return false;
                }
                *current = value;
                true
            });
        });
    }

    /// Skip the quiet period and settle on `value` right away
    pub fn set_now(&mut self, value: T) {
        self.debouncer.cancel();
        self.latest = value.clone();
        self.settled.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// The most recent raw value, settled or not
    pub fn raw(&self) -> &T {
        &self.latest
    }

    pub fn settled(&self) -> T {
        self.settled.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.settled.subscribe()
    }

    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }
}

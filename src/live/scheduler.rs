//! Repeating timers with explicit cancellation.
//!
//! Every timer is a tokio task that sleeps for a freshly drawn delay, runs its
//! task, and repeats until its [`TimerHandle`] is cancelled or dropped. Tests
//! drive it with tokio's paused clock instead of real waits.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::error::{PulseError, PulseResult};

#[derive(Clone)]
pub struct Scheduler {
    runtime: Handle,
    active: Arc<AtomicUsize>,
}

impl Scheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind to the runtime the caller is running on.
    pub fn from_current() -> PulseResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| PulseError::ConfigError(format!("No tokio runtime available: {}", e)))?;
        Ok(Self::new(runtime))
    }

    /// Run `task` after every `next_delay()`; the delay is drawn again each cycle.
    pub fn schedule_repeating<D, F>(&self, label: &str, mut next_delay: D, mut task: F) -> TimerHandle
    where
        D: FnMut() -> Duration + Send + 'static,
        F: FnMut() + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let task_label = label.to_string();

        self.active.fetch_add(1, Ordering::SeqCst);
        self.runtime.spawn(async move {
            loop {
                let delay = next_delay();
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => break,
                    _ = tokio::time::sleep(delay) => {}
                }

                // Cancelled while the sleep was completing.
                if !matches!(cancel_rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)) {
                    break;
                }

                trace!("Timer {} fired after {:?}", task_label, delay);
                task();
            }
            debug!("Timer {} stopped", task_label);
        });

        TimerHandle {
            label: label.to_string(),
            cancel: Some(cancel_tx),
            active: self.active.clone(),
        }
    }

    /// Number of timers whose handles have not been cancelled.
    pub fn active_timers(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Owning handle of a repeating timer. Dropping it cancels the timer.
pub struct TimerHandle {
    label: String,
    cancel: Option<oneshot::Sender<()>>,
    active: Arc<AtomicUsize>,
}

impl TimerHandle {
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

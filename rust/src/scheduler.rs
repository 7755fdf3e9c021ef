//! Delay scheduler: immediate sends inline, delayed sends as one-shot timer tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::command::ActionValue;
use crate::lock::lock_or_recover;
use crate::sink::OutboundSink;

/// One resolved send request produced by the action executor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSend {
    pub address: String,
    pub value: ActionValue,
    pub delay: Duration,
}

impl ScheduledSend {
    pub fn new(address: impl Into<String>, value: ActionValue, delay: Duration) -> Self {
        Self {
            address: address.into(),
            value,
            delay,
        }
    }

    pub fn immediate(address: impl Into<String>, value: ActionValue) -> Self {
        Self::new(address, value, Duration::ZERO)
    }
}

/// Runs sends against the outbound sink.
///
/// Delayed sends are independent tasks on the tokio runtime: they are not
/// ordered relative to each other and cannot be cancelled once scheduled. The
/// in-flight list is locked while a timer is spawned, never while one runs.
pub struct DelayScheduler {
    sink: Arc<dyn OutboundSink>,
    runtime: Handle,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl DelayScheduler {
    pub fn new(sink: Arc<dyn OutboundSink>, runtime: Handle) -> Self {
        Self {
            sink,
            runtime,
            in_flight: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn schedule(&self, send: ScheduledSend) {
        if self.closed.load(Ordering::Acquire) {
            tracing::warn!(address = %send.address, "scheduler closed; dropping send");
            return;
        }
        if send.delay.is_zero() {
            deliver(self.sink.as_ref(), &send.address, &send.value);
            return;
        }

        // `shutdown` marks the scheduler closed before draining this list, so
        // checking again under the lock means every spawned timer gets drained.
        let mut in_flight = lock_or_recover(&self.in_flight, "scheduler in-flight");
        if self.closed.load(Ordering::Acquire) {
            tracing::warn!(address = %send.address, "scheduler closed; dropping send");
            return;
        }
        let sink = Arc::clone(&self.sink);
        tracing::debug!(
            address = %send.address,
            delay_ms = send.delay.as_millis() as u64,
            "send scheduled"
        );
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(send.delay).await;
            deliver(sink.as_ref(), &send.address, &send.value);
        });
        in_flight.retain(|task| !task.is_finished());
        in_flight.push(handle);
    }

    /// Number of delayed sends that have not fired yet.
    pub fn pending(&self) -> usize {
        let mut in_flight = lock_or_recover(&self.in_flight, "scheduler in-flight");
        in_flight.retain(|task| !task.is_finished());
        in_flight.len()
    }

    /// Stop accepting sends, let timers finish within `grace`, then abort the rest.
    ///
    /// Returns how many delayed sends were abandoned.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        self.closed.store(true, Ordering::Release);
        let mut tasks = std::mem::take(&mut *lock_or_recover(
            &self.in_flight,
            "scheduler shutdown",
        ));
        let deadline = tokio::time::Instant::now() + grace;
        let mut abandoned = 0;
        for task in &mut tasks {
            if task.is_finished() {
                continue;
            }
            if tokio::time::timeout_at(deadline, &mut *task).await.is_err() {
                task.abort();
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            tracing::info!(abandoned, "abandoned delayed sends at shutdown");
        }
        abandoned
    }
}

fn deliver(sink: &dyn OutboundSink, address: &str, value: &ActionValue) {
    match sink.send(address, value) {
        Ok(()) => tracing::debug!(address, %value, "sent"),
        Err(err) => tracing::warn!(address, error = %err, "send failed; not retrying"),
    }
}

//! Breaker state-change notifications.
//!
//! The router publishes a [`BreakerEvent`] for every circuit transition it
//! causes. Consumers subscribe to the bus; the built-in one logs the change and
//! updates the breaker-state gauge.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::metrics;
use crate::resilience::{CircuitState, Transition};

/// A circuit transition on one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerEvent {
    pub backend: String,
    pub from: CircuitState,
    pub to: CircuitState,
    pub consecutive_failures: u32,
}

impl BreakerEvent {
    pub fn new(backend: &str, transition: Transition) -> Self {
        Self {
            backend: backend.to_string(),
            from: transition.from,
            to: transition.to,
            consecutive_failures: transition.consecutive_failures,
        }
    }
}

/// Broadcast channel of breaker events. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BreakerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: BreakerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Spawn the task that turns breaker events into logs and gauges.
///
/// The task ends when every `EventBus` clone has been dropped.
pub fn spawn_event_logger(mut rx: broadcast::Receiver<BreakerEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Breaker event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &BreakerEvent) {
    metrics::record_breaker_state(&event.backend, event.to);
    match event.to {
        CircuitState::Open => tracing::warn!(
            backend = %event.backend,
            from = %event.from,
            consecutive_failures = event.consecutive_failures,
            "Circuit opened"
        ),
        CircuitState::HalfOpen => tracing::info!(
            backend = %event.backend,
            "Circuit half-open, probing backend"
        ),
        CircuitState::Closed => tracing::info!(
            backend = %event.backend,
            from = %event.from,
            "Circuit closed, backend recovered"
        ),
    }
}

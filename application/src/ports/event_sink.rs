//! Agent event sink port
//!
//! Agents publish [`AgentEvent`]s through an [`EventPublisher`]: a bounded
//! channel drained by a dedicated task that forwards each event to the sink.
//! Publishing never waits. When the channel is full the event is dropped and
//! counted; when the sink task has died the channel is closed and events are
//! discarded.

use async_trait::async_trait;
use conductor_domain::AgentEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default channel capacity per agent.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Consumer of agent events (progress display, JSONL log, ...).
#[async_trait]
pub trait AgentEventSink: Send + Sync {
    async fn handle(&self, event: AgentEvent);
}

/// Discards every event.
pub struct NoEventSink;

#[async_trait]
impl AgentEventSink for NoEventSink {
    async fn handle(&self, _event: AgentEvent) {}
}

/// Forwards every event to each inner sink in order.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn AgentEventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn AgentEventSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl AgentEventSink for FanoutSink {
    async fn handle(&self, event: AgentEvent) {
        for sink in &self.sinks {
            sink.handle(event.clone()).await;
        }
    }
}

/// Non-blocking handle for publishing events to a sink task.
pub struct EventPublisher {
    tx: Option<mpsc::Sender<AgentEvent>>,
    worker: Option<JoinHandle<()>>,
    dropped: AtomicU64,
}

impl EventPublisher {
    /// Spawn the sink task. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn AgentEventSink>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<AgentEvent>(capacity.max(1));
        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                sink.handle(event).await;
            }
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
            dropped: AtomicU64::new(0),
        }
    }

    /// Publisher that discards everything without spawning a task.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            worker: None,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: AgentEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(event = event.event_type(), "Event channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Number of events that could not be delivered.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the channel and give the sink task up to `grace` to drain it.
    pub async fn close(mut self, grace: Duration) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            match tokio::time::timeout(grace, worker).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Event sink task failed: {}", e),
                Err(_) => debug!("Event sink still draining after {:?}", grace),
            }
        }
        let dropped = self.dropped();
        if dropped > 0 {
            warn!(dropped, "Agent events were dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::{AgentEventKind, AgentId};
    use std::sync::Mutex;

    struct Collecting {
        events: Mutex<Vec<AgentEvent>>,
    }

    #[async_trait]
    impl AgentEventSink for Collecting {
        async fn handle(&self, event: AgentEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Stalled;

    #[async_trait]
    impl AgentEventSink for Stalled {
        async fn handle(&self, _event: AgentEvent) {
            std::future::pending::<()>().await;
        }
    }

    struct Panicking;

    #[async_trait]
    impl AgentEventSink for Panicking {
        async fn handle(&self, _event: AgentEvent) {
            panic!("sink exploded");
        }
    }

    fn event(step: u32) -> AgentEvent {
        AgentEvent::new(AgentId::new("a"), AgentEventKind::StepStart { step })
    }

    #[tokio::test]
    async fn delivers_events_in_order() {
        let sink = Arc::new(Collecting {
            events: Mutex::new(Vec::new()),
        });
        let publisher = EventPublisher::spawn(sink.clone(), 8);
        for step in 1..=3 {
            publisher.publish(event(step));
        }
        publisher.close(Duration::from_secs(1)).await;

        let events = sink.events.lock().unwrap();
        let steps: Vec<u32> = events
            .iter()
            .map(|e| match e.kind {
                AgentEventKind::StepStart { step } => step,
                _ => 0,
            })
            .collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn stalled_sink_never_blocks_publisher() {
        let publisher = EventPublisher::spawn(Arc::new(Stalled), 2);
        for step in 0..50 {
            publisher.publish(event(step));
        }
        assert!(publisher.dropped() > 0);
        publisher.close(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn panicking_sink_is_contained() {
        let publisher = EventPublisher::spawn(Arc::new(Panicking), 4);
        publisher.publish(event(1));
        tokio::task::yield_now().await;
        for step in 2..10 {
            publisher.publish(event(step));
        }
        publisher.close(Duration::from_millis(100)).await;
    }

    #[test]
    fn disabled_publisher_discards() {
        let publisher = EventPublisher::disabled();
        publisher.publish(event(1));
        assert_eq!(publisher.dropped(), 0);
    }
}

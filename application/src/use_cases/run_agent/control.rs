//! External control handle for a running agent.

use conductor_domain::AgentStatus;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// Cloneable handle: stop or pause an agent from another task and observe
/// its progress. Requests take effect at the next iteration boundary.
#[derive(Clone, Debug)]
pub struct AgentControl {
    cancel: CancellationToken,
    pause_requested: Arc<AtomicBool>,
    status: Arc<RwLock<AgentStatus>>,
    steps: Arc<AtomicU32>,
}

impl AgentControl {
    pub(crate) fn new(cancel: CancellationToken, status: AgentStatus, steps: u32) -> Self {
        Self {
            cancel,
            pause_requested: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(status)),
            steps: Arc::new(AtomicU32::new(steps)),
        }
    }

    /// Request termination; the agent ends as `interrupted`.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Request a pause; the agent ends its run as `paused` and can be
    /// resumed from its state.
    pub fn pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }

    pub fn status(&self) -> AgentStatus {
        match self.status.read() {
            Ok(status) => *status,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn step_count(&self) -> u32 {
        self.steps.load(Ordering::SeqCst)
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Consume a pending pause request.
    pub(crate) fn take_pause_request(&self) -> bool {
        self.pause_requested.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn publish(&self, status: AgentStatus, steps: u32) {
        match self.status.write() {
            Ok(mut current) => *current = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
        self.steps.store(steps, Ordering::SeqCst);
    }
}

//! Type definitions for the agent use case.

use crate::ports::event_sink::{AgentEventSink, NoEventSink};
use crate::ports::executor::Executor;
use crate::ports::llm_provider::LlmProvider;
use crate::services::permission_manager::PermissionManager;
use crate::services::tool_registry::ToolRegistry;
use conductor_domain::{AgentStatus, DomainError, RoleConfig};
use std::sync::Arc;
use thiserror::Error;

/// Errors from agent lifecycle operations (the run itself never errors; its
/// outcome is reported in the [`AgentResult`](conductor_domain::AgentResult)).
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation not allowed while agent is {0}")]
    InvalidState(AgentStatus),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Live handles an agent runs against. Rebuilt fresh on resume.
#[derive(Clone)]
pub struct AgentCollaborators {
    pub provider: Arc<dyn LlmProvider>,
    pub tools: Arc<ToolRegistry>,
    pub executor: Arc<dyn Executor>,
    pub permissions: Arc<PermissionManager>,
    pub events: Arc<dyn AgentEventSink>,
    /// Role profile restricting tools and supplying prompt and budget defaults
    pub role: Option<RoleConfig>,
}

impl AgentCollaborators {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        executor: Arc<dyn Executor>,
        permissions: Arc<PermissionManager>,
    ) -> Self {
        Self {
            provider,
            tools,
            executor,
            permissions,
            events: Arc::new(NoEventSink),
            role: None,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn AgentEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_role(mut self, role: RoleConfig) -> Self {
        self.role = Some(role);
        self
    }
}

/// Tunables that are not part of [`AgentConfig`](conductor_domain::AgentConfig).
#[derive(Debug, Clone)]
pub struct AgentOptions {
    /// Event channel capacity
    pub event_capacity: usize,
    /// Longest observation fed back to the provider, in bytes
    pub max_observation_bytes: usize,
    /// Default timeout for commands started by tools
    pub command_timeout_ms: Option<u64>,
    /// Time the event sink gets to drain after a run ends
    pub event_drain_ms: u64,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            event_capacity: crate::ports::event_sink::DEFAULT_EVENT_CAPACITY,
            max_observation_bytes: 50_000,
            command_timeout_ms: None,
            event_drain_ms: 1_000,
        }
    }
}

//! Tool port
//!
//! A [`Tool`] is a named capability with a static definition and an async
//! body that runs against the [`Executor`] in its [`ToolContext`].

use crate::ports::executor::Executor;
use async_trait::async_trait;
use conductor_domain::{AgentId, AgentRole, ToolCall, ToolDefinition, ToolResult};
use std::sync::Arc;

/// Everything a tool may use while it runs.
#[derive(Clone)]
pub struct ToolContext {
    pub executor: Arc<dyn Executor>,
    pub role: Option<AgentRole>,
    pub agent_id: Option<AgentId>,
    /// Default timeout for commands started by the tool
    pub command_timeout_ms: Option<u64>,
}

impl ToolContext {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            executor,
            role: None,
            agent_id: None,
            command_timeout_ms: None,
        }
    }

    pub fn with_role(mut self, role: AgentRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_agent_id(mut self, agent_id: AgentId) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_command_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.command_timeout_ms = Some(timeout_ms);
        self
    }

    /// Current working directory of the executor.
    pub fn cwd(&self) -> String {
        self.executor.cwd()
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("mode", &self.executor.mode())
            .field("cwd", &self.executor.cwd())
            .field("role", &self.role)
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

/// A single tool.
///
/// `execute` reports every failure as a failed [`ToolResult`]; argument
/// validation has already happened in the registry when it is called.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> &ToolDefinition;

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult;
}

//! Application layer for conductor
//!
//! This crate contains the ports adapters implement, the services shared by
//! use cases (tool registry, permission manager, executor guard) and the use
//! cases themselves: a single agent, task decomposition and workflow
//! orchestration. It depends only on the domain layer.

pub mod ports;
pub mod services;
pub mod use_cases;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use ports::{
    event_sink::{AgentEventSink, EventPublisher, FanoutSink, NoEventSink},
    executor::{
        DirEntry, ExecOptions, ExecOutput, Executor, ExecutorError, ExecutorFactory, ExecutorMode,
        TIMEOUT_EXIT_CODE,
    },
    llm_provider::{LlmProvider, ProviderError},
    permission_prompt::{AutoApprovePrompt, AutoDenyPrompt, PermissionPrompt},
    tool::{Tool, ToolContext},
};
pub use services::{
    executor_guard::ExecutorGuard,
    permission_manager::{AuditEntry, DecisionSource, PermissionManager},
    tool_registry::{ToolRegistry, tool_schema},
};
pub use use_cases::decompose_task::{DecomposeError, TaskDecomposer};
pub use use_cases::run_agent::{Agent, AgentCollaborators, AgentControl, AgentError, AgentOptions};
pub use use_cases::run_workflow::{
    AgentSnapshot, OrchestratorConfig, OrchestratorError, WorkflowOrchestrator, WorkflowResult,
};

//! Domain layer for conductor
//!
//! Pure entities, value objects and policies for an autonomous coding-agent
//! runtime. No I/O and no async: everything here can be unit tested in
//! isolation and serialised where it crosses a process boundary.
//!
//! # Subdomains
//!
//! - [`tool`]: tool definitions, calls, results and argument validation
//! - [`permission`]: risk assessment and acceptance policy for tool calls
//! - [`role`]: agent roles, enforcement rules and loop patterns
//! - [`agent`]: budgets, steps, results and the pause/resume payload
//! - [`workflow`]: decomposed task plans and the shared workflow context
//! - [`session`]: provider-neutral messages and chat responses

pub mod agent;
pub mod config;
pub mod core;
pub mod permission;
pub mod prompt;
pub mod role;
pub mod session;
pub mod tool;
pub mod util;
pub mod workflow;

pub use agent::{
    AgentAction, AgentBudget, AgentConfig, AgentConfigPatch, AgentEvent, AgentEventKind, AgentId,
    AgentResult, AgentState, AgentStatus, AgentStep, BudgetUsage, BudgetViolation, ToolExchange,
};
pub use config::{ConfigIssue, ConfigIssueCode, Severity};
pub use core::error::DomainError;
pub use permission::{
    PermissionContext, PermissionDecision, PermissionPolicy, PermissionRequest, PermissionResult,
    RiskAssessor, RiskRule,
};
pub use prompt::{AgentPromptTemplate, DecomposerPromptTemplate};
pub use role::{
    AgentRole, EnforcementCheck, EnforcementEngine, EnforcementRule, EnforcementTiming,
    EnforcementTrigger, LoopMatch, LoopPattern, RoleConfig, RoleError, RoleRegistry,
    StateCondition, ToolAccessLevel, TriggerCategory,
};
pub use session::{ChatResponse, ContentBlock, Message, StopReason, TokenUsage};
pub use tool::{
    DefaultToolValidator, FINISH_TOOL, RiskLevel, ToolCall, ToolDefinition, ToolError,
    ToolParameter, ToolResult, ToolResultMetadata, ToolSpec, ToolValidator,
    finish_tool_definition,
};
pub use workflow::{
    ExecutionMode, PlanError, SharedState, WorkflowContext, WorkflowPlan, WorkflowTask,
    fallback_plan, parse_workflow_plan,
};

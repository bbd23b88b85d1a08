//! Type definitions for the workflow use case.

use crate::use_cases::run_agent::AgentOptions;
use conductor_domain::{
    AgentBudget, AgentId, AgentResult, AgentRole, AgentStatus, PlanError, RoleError, SharedState,
    TokenUsage, WorkflowPlan,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Invalid plan: {0}")]
    InvalidPlan(#[from] PlanError),

    #[error(transparent)]
    Role(#[from] RoleError),
}

/// Scheduling and agent defaults for a workflow.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    /// Cap on concurrently running agents (DAG mode); `None` is unbounded
    pub max_concurrency: Option<usize>,
    /// Run the plan exactly as given, without enforcement rules
    pub skip_enforcement: bool,
    /// Caps applied where a role's own budget leaves them unset
    pub default_budget: AgentBudget,
    pub agent_options: AgentOptions,
}

impl OrchestratorConfig {
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    pub fn with_skip_enforcement(mut self, skip: bool) -> Self {
        self.skip_enforcement = skip;
        self
    }

    pub fn with_default_budget(mut self, budget: AgentBudget) -> Self {
        self.default_budget = budget;
        self
    }

    pub fn with_agent_options(mut self, options: AgentOptions) -> Self {
        self.agent_options = options;
        self
    }
}

/// Progress view of one task's agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub task_id: String,
    pub role: AgentRole,
    pub status: AgentStatus,
    pub step_count: u32,
    /// Set once the agent has been created
    pub agent_id: Option<AgentId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    /// The plan as executed, including enforcement additions
    pub plan: WorkflowPlan,
    /// Outcome per task id; tasks that never ran carry a failed result
    pub results: BTreeMap<String, AgentResult>,
    pub success: bool,
    pub interrupted: bool,
    pub total_tokens: TokenUsage,
    pub total_cost: f64,
    pub duration_ms: u64,
    pub shared_state: SharedState,
}

impl WorkflowResult {
    pub fn result(&self, task_id: &str) -> Option<&AgentResult> {
        self.results.get(task_id)
    }

    pub fn failed_tasks(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| !r.success)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

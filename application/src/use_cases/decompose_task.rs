//! Task decomposition use case
//!
//! Asks the provider to split a task into a [`WorkflowPlan`] of role-tagged
//! subtasks. Anything short of a valid plan (unparseable output, cycles,
//! dangling dependencies) degrades to a single-task fallback plan.

use crate::ports::llm_provider::{LlmProvider, ProviderError};
use crate::use_cases::shared::{ChatOutcome, chat_cancellable};
use conductor_domain::core::string::truncate;
use conductor_domain::{
    AgentRole, DecomposerPromptTemplate, Message, RoleRegistry, WorkflowPlan, fallback_plan,
    parse_workflow_plan,
};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum DecomposeError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Operation cancelled")]
    Cancelled,
}

pub struct TaskDecomposer {
    provider: Arc<dyn LlmProvider>,
    roles: Arc<RoleRegistry>,
    cancellation_token: Option<CancellationToken>,
}

impl TaskDecomposer {
    pub fn new(provider: Arc<dyn LlmProvider>, roles: Arc<RoleRegistry>) -> Self {
        Self {
            provider,
            roles,
            cancellation_token: None,
        }
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub async fn plan_workflow(&self, task: &str) -> Result<WorkflowPlan, DecomposeError> {
        let roles = self.roles.roles();
        let messages = vec![
            Message::system(DecomposerPromptTemplate::system(&roles)),
            Message::user(DecomposerPromptTemplate::user(task)),
        ];

        let response = match chat_cancellable(
            self.provider.as_ref(),
            &messages,
            &[],
            self.cancellation_token.as_ref(),
            None,
        )
        .await?
        {
            ChatOutcome::Response(response) => response,
            ChatOutcome::Cancelled => return Err(DecomposeError::Cancelled),
            ChatOutcome::DeadlineExceeded => return Err(ProviderError::Timeout.into()),
        };

        let text = response.text_content();
        debug!(response = %truncate(&text, 500), "Decomposition response");

        let Some(mut plan) = parse_workflow_plan(&text, task) else {
            warn!("Decomposition response had no usable plan; falling back to a single task");
            return Ok(fallback_plan(task));
        };

        if let Err(e) = plan.validate() {
            warn!(error = %e, "Decomposed plan is invalid; falling back to a single task");
            return Ok(fallback_plan(task));
        }

        for t in &mut plan.tasks {
            if !self.roles.has(&t.role) {
                debug!(task = %t.id, role = %t.role, "Role not registered, using general");
                t.role = AgentRole::General;
            }
        }

        info!(
            plan_id = %plan.id,
            tasks = plan.tasks.len(),
            mode = %plan.execution_mode,
            "Task decomposed"
        );
        Ok(plan)
    }
}

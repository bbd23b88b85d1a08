//! Agent use case
//!
//! A single autonomous agent: a ReAct loop that alternates between asking the
//! provider for the next move and executing the tool calls it proposes.
//!
//! | Phase      | Status      | What happens                                        |
//! |------------|-------------|-----------------------------------------------------|
//! | Boundary   | (unchanged) | cancellation, pause and budget checks               |
//! | Reasoning  | `reasoning` | provider `chat` with the full history and schemas   |
//! | Acting     | `acting`    | permission gate, then the tool registry             |
//! | Observing  | `observing` | tool results appended to the history                |
//!
//! A response calling `finish`, or one with no tool call at all, completes
//! the run. Tool failures, unknown tools and permission denials are fed back
//! to the provider as failed observations; provider errors end the run.

mod control;
mod types;

pub use control::AgentControl;
pub use types::{AgentCollaborators, AgentError, AgentOptions};

use crate::ports::event_sink::EventPublisher;
use crate::ports::tool::ToolContext;
use crate::services::permission_manager::PermissionManager;
use crate::services::tool_registry::{ToolRegistry, tool_schema};
use crate::use_cases::shared::{ChatOutcome, chat_cancellable, usage_for};
use conductor_domain::core::string::{single_line, truncate};
use conductor_domain::util::now_millis;
use conductor_domain::{
    AgentAction, AgentConfig, AgentConfigPatch, AgentEvent, AgentEventKind, AgentId,
    AgentPromptTemplate, AgentResult, AgentState, AgentStatus, AgentStep, BudgetViolation,
    FINISH_TOOL, Message, PermissionContext, ToolCall, ToolExchange, ToolResult,
    finish_tool_definition,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a run ended, before it is folded into an [`AgentResult`].
enum Outcome {
    Completed(String),
    Failed(String),
    BudgetExceeded(BudgetViolation),
    Interrupted,
    Paused,
}

pub struct Agent {
    state: AgentState,
    collaborators: AgentCollaborators,
    options: AgentOptions,
    control: AgentControl,
    context_summary: Option<String>,
    publisher: EventPublisher,
}

impl Agent {
    /// New idle agent for `task`.
    ///
    /// With a role profile, the tool registry is narrowed to the role's tools
    /// and unset budget caps are filled from the role's defaults.
    pub fn new(task: impl Into<String>, config: AgentConfig, collaborators: AgentCollaborators) -> Self {
        let state = AgentState::new(AgentId::generate(), task, config);
        Self::from_state(state, collaborators)
    }

    /// Rebuild an agent from a paused (or idle) state with fresh
    /// collaborators. Step numbering and counters continue where they left
    /// off.
    pub fn resume(state: AgentState, collaborators: AgentCollaborators) -> Result<Self, AgentError> {
        if state.status.is_terminal() {
            return Err(AgentError::InvalidState(state.status));
        }
        info!(
            agent_id = %state.agent_id,
            steps = state.step_count(),
            "Resuming agent"
        );
        Ok(Self::from_state(state, collaborators))
    }

    fn from_state(mut state: AgentState, mut collaborators: AgentCollaborators) -> Self {
        if let Some(role) = &collaborators.role {
            let allowed: Vec<&str> = collaborators
                .tools
                .names()
                .into_iter()
                .filter(|name| role.permits(name))
                .collect();
            let narrowed = collaborators.tools.subset(&allowed);
            collaborators.tools = Arc::new(narrowed);
            state.config.budget = state.config.budget.merge_defaults(&role.default_budget);
        }
        let control = AgentControl::new(CancellationToken::new(), state.status, state.step_count());
        Self {
            state,
            collaborators,
            options: AgentOptions::default(),
            control,
            context_summary: None,
            publisher: EventPublisher::disabled(),
        }
    }

    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    /// Results of prerequisite tasks, included in the first user message.
    pub fn with_context_summary(mut self, summary: impl Into<String>) -> Self {
        self.context_summary = Some(summary.into());
        self
    }

    /// Tie the agent to an outer cancellation token (e.g. the workflow's).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.control = AgentControl::new(token, self.state.status, self.state.step_count());
        self
    }

    pub fn id(&self) -> &AgentId {
        &self.state.agent_id
    }

    pub fn status(&self) -> AgentStatus {
        self.state.status
    }

    pub fn config(&self) -> &AgentConfig {
        &self.state.config
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.collaborators.tools
    }

    pub fn control(&self) -> AgentControl {
        self.control.clone()
    }

    /// Snapshot of the serializable state. Has no effect on the agent; to
    /// pause a running agent use [`AgentControl::pause`].
    pub fn pause(&self) -> AgentState {
        self.state.clone()
    }

    /// Apply a config patch. Only allowed while idle or paused.
    pub fn update_config(&mut self, patch: AgentConfigPatch) -> Result<(), AgentError> {
        if !matches!(self.state.status, AgentStatus::Idle | AgentStatus::Paused) {
            return Err(AgentError::InvalidState(self.state.status));
        }
        self.state.config = self.state.config.apply(patch)?;
        debug!(agent_id = %self.state.agent_id, "Agent config updated");
        Ok(())
    }

    /// Run until the agent completes, fails, is interrupted or pauses.
    ///
    /// Calling `run` again after a pause continues the same conversation.
    pub async fn run(&mut self) -> AgentResult {
        if self.state.status.is_terminal() {
            return self.result(self.terminal_outcome());
        }

        let started = Instant::now();
        let elapsed_before = self.state.usage.elapsed_ms;
        self.publisher = EventPublisher::spawn(self.collaborators.events.clone(), self.options.event_capacity);

        self.prepare_messages();
        info!(
            agent_id = %self.state.agent_id,
            role = %self.state.config.role,
            resumed = self.state.step_count() > 0,
            "Agent run started"
        );

        let outcome = self.run_loop(started, elapsed_before).await;

        self.state.usage.elapsed_ms = elapsed_before + started.elapsed().as_millis() as u64;
        let result = self.result(outcome);
        match result.status {
            AgentStatus::Completed => info!(
                agent_id = %result.agent_id,
                steps = result.step_count(),
                tokens = result.total_tokens.total(),
                "Agent completed"
            ),
            AgentStatus::Paused => info!(agent_id = %result.agent_id, steps = result.step_count(), "Agent paused"),
            status => warn!(
                agent_id = %result.agent_id,
                status = %status,
                error = result.error.as_deref().unwrap_or(""),
                "Agent did not complete"
            ),
        }

        let publisher = std::mem::replace(&mut self.publisher, EventPublisher::disabled());
        publisher.close(Duration::from_millis(self.options.event_drain_ms)).await;
        result
    }

    async fn run_loop(&mut self, started: Instant, elapsed_before: u64) -> Outcome {
        let mut schemas = self.collaborators.tools.schemas();
        schemas.push(tool_schema(&finish_tool_definition()));

        loop {
            self.state.usage.elapsed_ms = elapsed_before + started.elapsed().as_millis() as u64;

            if self.control.is_stopped() {
                self.set_status(AgentStatus::Interrupted);
                return Outcome::Interrupted;
            }
            if self.control.take_pause_request() {
                self.set_status(AgentStatus::Paused);
                return Outcome::Paused;
            }
            if let Some(violation) = self.state.config.budget.check(&self.state.usage) {
                return self.exceed_budget(violation);
            }

            self.set_status(AgentStatus::Reasoning);
            let step_number = self.state.step_count() + 1;
            let step_started = now_millis();
            self.emit(AgentEventKind::StepStart { step: step_number });

            let provider = self.collaborators.provider.clone();
            let deadline = self
                .state
                .config
                .budget
                .remaining_duration_ms(self.state.usage.elapsed_ms)
                .map(Duration::from_millis);
            let response = match chat_cancellable(
                provider.as_ref(),
                &self.state.messages,
                &schemas,
                Some(self.control.token()),
                deadline,
            )
            .await
            {
                Ok(ChatOutcome::Response(response)) => response,
                Ok(ChatOutcome::Cancelled) => {
                    self.set_status(AgentStatus::Interrupted);
                    return Outcome::Interrupted;
                }
                Ok(ChatOutcome::DeadlineExceeded) => {
                    self.state.usage.elapsed_ms = elapsed_before + started.elapsed().as_millis() as u64;
                    let limit_ms = self.state.config.budget.max_duration_ms.unwrap_or_default();
                    let violation = BudgetViolation::Duration {
                        limit_ms,
                        elapsed_ms: self.state.usage.elapsed_ms.max(limit_ms),
                    };
                    return self.exceed_budget(violation);
                }
                Err(e) => {
                    warn!(agent_id = %self.state.agent_id, "Provider error: {}", e);
                    self.set_status(AgentStatus::Failed);
                    return Outcome::Failed(e.to_string());
                }
            };

            let usage = usage_for(provider.as_ref(), &self.state.messages, &response);
            let cost = provider.calculate_cost(usage.input_tokens, usage.output_tokens);

            // Spend from this response counts before its finish or tool calls are accepted.
            self.state.usage.elapsed_ms = elapsed_before + started.elapsed().as_millis() as u64;
            let mut projected = self.state.usage;
            projected.add_spend(usage.input_tokens, usage.output_tokens, cost);
            if let Some(violation) = self.state.config.budget.check_spend(&projected) {
                self.state.usage = projected;
                return self.exceed_budget(violation);
            }
            let thought = response.text_content();
            if !thought.is_empty() {
                self.emit(AgentEventKind::Thought {
                    step: step_number,
                    text: thought.clone(),
                });
            }

            let calls = response.tool_calls();
            let finish = calls.iter().find(|c| c.tool_name == FINISH_TOOL);

            if calls.is_empty() || finish.is_some() {
                let final_response = finish
                    .and_then(|c| c.get_string("response"))
                    .map(str::to_string)
                    .unwrap_or_else(|| thought.clone());
                self.state.messages.push(Message::assistant(final_response.clone()));
                self.record_step(AgentStep {
                    step_number,
                    timestamp: step_started,
                    thought,
                    action: AgentAction::Finish {
                        response: final_response.clone(),
                    },
                    observation: None,
                    additional: Vec::new(),
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                    cost,
                });
                self.set_status(AgentStatus::Completed);
                return Outcome::Completed(final_response);
            }

            self.set_status(AgentStatus::Acting);
            self.state
                .messages
                .push(Message::assistant_with_calls(thought.clone(), calls.clone()));

            let mut exchanges = Vec::with_capacity(calls.len());
            for call in calls {
                self.emit(AgentEventKind::Action {
                    step: step_number,
                    tool: call.tool_name.clone(),
                    arguments: serde_json::to_value(&call.arguments).unwrap_or_default(),
                });
                let result = self.act(&call).await;
                debug!(
                    agent_id = %self.state.agent_id,
                    step = step_number,
                    tool = %call.tool_name,
                    success = result.is_success(),
                    "Tool call finished"
                );
                let observation = result.to_observation_text();
                self.emit(AgentEventKind::Observation {
                    step: step_number,
                    tool: result.tool_name.clone(),
                    success: result.is_success(),
                    summary: truncate(&single_line(&observation), 200),
                });
                self.state.messages.push(Message::tool_result(
                    call.id.clone(),
                    truncate(&observation, self.options.max_observation_bytes),
                ));
                exchanges.push(ToolExchange { call, result });
            }

            self.set_status(AgentStatus::Observing);
            let mut exchanges = exchanges.into_iter();
            let Some(primary) = exchanges.next() else {
                continue;
            };
            self.record_step(AgentStep {
                step_number,
                timestamp: step_started,
                thought,
                action: AgentAction::ToolCall(primary.call),
                observation: Some(primary.result),
                additional: exchanges.collect(),
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                cost,
            });
        }
    }

    fn exceed_budget(&mut self, violation: BudgetViolation) -> Outcome {
        warn!(
            agent_id = %self.state.agent_id,
            dimension = violation.dimension(),
            "{}: {}",
            violation.reason(),
            violation
        );
        self.set_status(AgentStatus::Failed);
        Outcome::BudgetExceeded(violation)
    }

    /// Permission gate, then the registry. Never fails: every problem becomes
    /// a failed [`ToolResult`].
    async fn act(&self, call: &ToolCall) -> ToolResult {
        let tools = &self.collaborators.tools;
        let Some(canonical) = tools.resolve(&call.tool_name) else {
            return ToolResult::failure(
                &call.tool_name,
                conductor_domain::ToolError::tool_not_found(&call.tool_name),
            );
        };

        let mut gated = call.clone();
        gated.tool_name = canonical.to_string();
        let context = PermissionContext {
            agent_id: Some(self.state.agent_id.to_string()),
            role: Some(self.state.config.role.to_string()),
            cwd: Some(self.collaborators.executor.cwd()),
        };
        let decision = self.collaborators.permissions.authorize(&gated, context).await;
        if !decision.is_allowed() {
            return PermissionManager::denied_result(&gated, &decision);
        }

        let mut ctx = ToolContext::new(self.collaborators.executor.clone())
            .with_role(self.state.config.role.clone())
            .with_agent_id(self.state.agent_id.clone());
        if let Some(timeout) = self.options.command_timeout_ms {
            ctx = ctx.with_command_timeout_ms(timeout);
        }
        tools.execute(&gated, &ctx).await
    }

    fn prepare_messages(&mut self) {
        if self.state.messages.is_empty() {
            let system = match &self.state.config.system_prompt {
                Some(prompt) => prompt.clone(),
                None => AgentPromptTemplate::agent_system(
                    self.collaborators.tools.spec(),
                    self.collaborators.role.as_ref(),
                ),
            };
            self.state.messages.push(Message::system(system));
            self.state.messages.push(Message::user(AgentPromptTemplate::task(
                &self.state.task,
                self.context_summary.as_deref(),
            )));
        } else if self.state.status == AgentStatus::Paused {
            self.state
                .messages
                .push(Message::user(AgentPromptTemplate::resumed()));
        }
    }

    fn record_step(&mut self, step: AgentStep) {
        self.state
            .usage
            .record_step(step.input_tokens, step.output_tokens, step.cost);
        self.emit(AgentEventKind::StepEnd {
            step: step.step_number,
            input_tokens: step.input_tokens,
            output_tokens: step.output_tokens,
            cost: step.cost,
        });
        self.state.steps.push(step);
        self.emit(AgentEventKind::Progress {
            steps: self.state.step_count(),
            total_tokens: self.state.usage.total_tokens(),
            cost: self.state.usage.cost,
            elapsed_ms: self.state.usage.elapsed_ms,
        });
        self.control.publish(self.state.status, self.state.step_count());
    }

    fn set_status(&mut self, next: AgentStatus) {
        let current = self.state.status;
        if current == next {
            return;
        }
        match current.transition(next) {
            Ok(next) => {
                self.state.status = next;
                self.emit(AgentEventKind::Status { from: current, to: next });
                self.control.publish(next, self.state.step_count());
            }
            Err(e) => warn!(agent_id = %self.state.agent_id, "{}", e),
        }
    }

    fn emit(&self, kind: AgentEventKind) {
        self.publisher
            .publish(AgentEvent::new(self.state.agent_id.clone(), kind));
    }

    /// Outcome of a run that already ended, for repeated `run` calls.
    fn terminal_outcome(&self) -> Outcome {
        match self.state.status {
            AgentStatus::Completed => Outcome::Completed(
                self.state
                    .steps
                    .last()
                    .and_then(|s| match &s.action {
                        AgentAction::Finish { response } => Some(response.clone()),
                        AgentAction::ToolCall(_) => None,
                    })
                    .unwrap_or_default(),
            ),
            AgentStatus::Interrupted => Outcome::Interrupted,
            _ => match self.state.config.budget.check(&self.state.usage) {
                Some(violation) => Outcome::BudgetExceeded(violation),
                None => Outcome::Failed("Agent already failed".to_string()),
            },
        }
    }

    fn result(&self, outcome: Outcome) -> AgentResult {
        let (success, response, error, budget_violation) = match outcome {
            Outcome::Completed(response) => (true, response, None, None),
            Outcome::Failed(error) => (false, String::new(), Some(error), None),
            Outcome::BudgetExceeded(violation) => (
                false,
                String::new(),
                Some(violation.reason().to_string()),
                Some(violation),
            ),
            Outcome::Interrupted => (false, String::new(), Some("Interrupted".to_string()), None),
            Outcome::Paused => (false, String::new(), Some("Paused".to_string()), None),
        };
        AgentResult {
            agent_id: self.state.agent_id.clone(),
            role: self.state.config.role.clone(),
            success,
            status: self.state.status,
            response,
            steps: self.state.steps.clone(),
            total_tokens: self.state.total_tokens(),
            cost: self.state.usage.cost,
            duration_ms: self.state.usage.elapsed_ms,
            error,
            budget_violation,
        }
    }
}

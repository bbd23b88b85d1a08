//! Workflow orchestration use case
//!
//! Runs a [`WorkflowPlan`] as a set of role-specialized agents. The plan is
//! validated and enforced first, then scheduled either sequentially or as a
//! dependency graph with bounded concurrency. Each task gets its own
//! executor, cleaned up when the task ends, and sees the results of the
//! tasks it depends on.

mod types;


pub use types::{AgentSnapshot, OrchestratorConfig, OrchestratorError, WorkflowResult};

use crate::ports::event_sink::{AgentEventSink, NoEventSink};
use crate::ports::executor::ExecutorFactory;
use crate::ports::llm_provider::LlmProvider;
use crate::services::executor_guard::ExecutorGuard;
use crate::services::permission_manager::PermissionManager;
use crate::services::tool_registry::ToolRegistry;
use crate::use_cases::run_agent::{Agent, AgentCollaborators, AgentControl, AgentOptions};
use conductor_domain::{
    AgentBudget, AgentConfig, AgentId, AgentResult, AgentRole, AgentStatus, EnforcementEngine,
    ExecutionMode, RoleRegistry, TokenUsage, WorkflowContext, WorkflowPlan, WorkflowTask,
};
use futures::FutureExt;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Progress record for one task.
struct AgentSlot {
    role: AgentRole,
    control: Option<AgentControl>,
    agent_id: Option<AgentId>,
    finished: Option<(AgentStatus, u32)>,
}

type AgentTable = Arc<StdMutex<BTreeMap<String, AgentSlot>>>;

/// Everything a spawned task needs to build and run its agent.
#[derive(Clone)]
struct TaskRunner {
    provider: Arc<dyn LlmProvider>,
    roles: Arc<RoleRegistry>,
    tools: Arc<ToolRegistry>,
    executors: Arc<dyn ExecutorFactory>,
    permissions: Arc<PermissionManager>,
    events: Arc<dyn AgentEventSink>,
    default_budget: AgentBudget,
    agent_options: AgentOptions,
    agents: AgentTable,
}

impl TaskRunner {
    async fn run(self, task: WorkflowTask, context_summary: String, cancel: CancellationToken) -> AgentResult {
        let role_config = match self.roles.get_or_err(&task.role) {
            Ok(config) => config.clone(),
            Err(e) => return AgentResult::not_started(task.role.clone(), e.to_string()),
        };

        let executor = match self.executors.create(&task.id) {
            Ok(executor) => executor,
            Err(e) => {
                warn!(task = %task.id, "Failed to create executor: {}", e);
                return AgentResult::not_started(task.role.clone(), format!("Executor error: {}", e));
            }
        };

        let budget = role_config.default_budget.merge_defaults(&self.default_budget);
        let config = AgentConfig::for_role(task.id.clone(), &role_config).with_budget(budget);
        let agents = self.agents.clone();
        let task_id = task.id.clone();
        let role = task.role.clone();

        let outcome = ExecutorGuard::scoped(executor, move |executor| async move {
            let collaborators =
                AgentCollaborators::new(self.provider, self.tools, executor, self.permissions)
                    .with_events(self.events)
                    .with_role(role_config);
            let mut agent = Agent::new(task.description.clone(), config, collaborators)
                .with_options(self.agent_options)
                .with_context_summary(context_summary)
                .with_cancellation(cancel);

            if let Ok(mut table) = agents.lock()
                && let Some(slot) = table.get_mut(&task.id)
            {
                slot.control = Some(agent.control());
                slot.agent_id = Some(agent.id().clone());
            }

            agent.run().await
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(task = %task_id, "Executor failed to initialize: {}", e);
                AgentResult::not_started(role, format!("Executor error: {}", e))
            }
        }
    }
}

/// Schedules the agents of a workflow plan.
///
/// One orchestrator runs one workflow at a time; [`interrupt`](Self::interrupt)
/// is permanent for the instance.
pub struct WorkflowOrchestrator {
    provider: Arc<dyn LlmProvider>,
    roles: Arc<RoleRegistry>,
    tools: Arc<ToolRegistry>,
    executors: Arc<dyn ExecutorFactory>,
    permissions: Arc<PermissionManager>,
    events: Arc<dyn AgentEventSink>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
    agents: AgentTable,
}

impl WorkflowOrchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        roles: Arc<RoleRegistry>,
        tools: Arc<ToolRegistry>,
        executors: Arc<dyn ExecutorFactory>,
        permissions: Arc<PermissionManager>,
    ) -> Self {
        Self {
            provider,
            roles,
            tools,
            executors,
            permissions,
            events: Arc::new(NoEventSink),
            config: OrchestratorConfig::default(),
            cancel: CancellationToken::new(),
            agents: Arc::new(StdMutex::new(BTreeMap::new())),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn AgentEventSink>) -> Self {
        self.events = events;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Stop dispatching new tasks and cancel every running agent.
    pub fn interrupt(&self) {
        info!("Workflow interrupt requested");
        self.cancel.cancel();
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Per-task progress of the current (or last) workflow, in task id order.
    pub fn agents(&self) -> Vec<AgentSnapshot> {
        let Ok(table) = self.agents.lock() else {
            return Vec::new();
        };
        table
            .iter()
            .map(|(task_id, slot)| {
                let (status, step_count) = match (&slot.finished, &slot.control) {
                    (Some((status, steps)), _) => (*status, *steps),
                    (None, Some(control)) => (control.status(), control.step_count()),
                    (None, None) => (AgentStatus::Idle, 0),
                };
                AgentSnapshot {
                    task_id: task_id.clone(),
                    role: slot.role.clone(),
                    status,
                    step_count,
                    agent_id: slot.agent_id.clone(),
                }
            })
            .collect()
    }

    /// The plan with enforcement rules applied (unchanged in skip mode).
    pub fn enforce(&self, plan: &WorkflowPlan) -> WorkflowPlan {
        self.engine().enforce(plan, &WorkflowContext::new())
    }

    fn engine(&self) -> EnforcementEngine {
        EnforcementEngine::new(&self.roles).skip_enforcement(self.config.skip_enforcement)
    }

    fn runner(&self) -> TaskRunner {
        TaskRunner {
            provider: self.provider.clone(),
            roles: self.roles.clone(),
            tools: self.tools.clone(),
            executors: self.executors.clone(),
            permissions: self.permissions.clone(),
            events: self.events.clone(),
            default_budget: self.config.default_budget,
            agent_options: self.config.agent_options.clone(),
            agents: self.agents.clone(),
        }
    }

    /// Validate, enforce and run `plan`.
    ///
    /// Structural problems (cycles, dangling dependencies, unregistered
    /// roles) are reported before any agent starts. Task failures are not
    /// errors; they show up in the returned [`WorkflowResult`]. Conditional
    /// enforcement rules are re-evaluated after every task, so follow-ups
    /// owed to the live shared state join the run as it goes.
    pub async fn execute(&self, plan: &WorkflowPlan) -> Result<WorkflowResult, OrchestratorError> {
        plan.validate()?;
        let engine = self.engine();
        let mut plan = engine.enforce(plan, &WorkflowContext::new());
        let topological = plan.topological_order()?;
        for task in &plan.tasks {
            self.roles.get_or_err(&task.role)?;
        }
        let mut order = match plan.execution_mode {
            ExecutionMode::Sequential => plan.tasks.iter().map(|t| t.id.clone()).collect(),
            ExecutionMode::Dag => topological,
        };

        self.reset_agents(&plan);
        info!(
            plan_id = %plan.id,
            tasks = plan.tasks.len(),
            mode = %plan.execution_mode,
            max_concurrency = ?self.config.max_concurrency,
            "Workflow started"
        );

        let started = Instant::now();
        let mut run = WorkflowRun::new(&plan, engine);
        match plan.execution_mode {
            ExecutionMode::Sequential => self.run_sequential(&mut plan, &mut order, &mut run).await,
            ExecutionMode::Dag => self.run_dag(&mut plan, &mut order, &mut run).await,
        }

        self.sync_agents(&run.results);
        let result = run.finish(plan, self.cancel.is_cancelled(), started.elapsed().as_millis() as u64).await;
        if result.success {
            info!(
                tasks = result.results.len(),
                tokens = result.total_tokens.total(),
                cost = result.total_cost,
                duration_ms = result.duration_ms,
                "Workflow completed"
            );
        } else {
            warn!(
                failed = ?result.failed_tasks(),
                interrupted = result.interrupted,
                "Workflow finished with failures"
            );
        }
        Ok(result)
    }

    fn reset_agents(&self, plan: &WorkflowPlan) {
        if let Ok(mut table) = self.agents.lock() {
            table.clear();
        }
        for task in &plan.tasks {
            self.register_agent(task);
        }
    }

    fn register_agent(&self, task: &WorkflowTask) {
        if let Ok(mut table) = self.agents.lock() {
            table.insert(
                task.id.clone(),
                AgentSlot {
                    role: task.role.clone(),
                    control: None,
                    agent_id: None,
                    finished: None,
                },
            );
        }
    }

    fn mark_finished(&self, task_id: &str, result: &AgentResult) {
        if let Ok(mut table) = self.agents.lock()
            && let Some(slot) = table.get_mut(task_id)
        {
            slot.finished = Some((result.status, result.steps.len() as u32));
            if slot.agent_id.is_none() {
                slot.agent_id = Some(result.agent_id.clone());
            }
        }
    }

    /// Give tasks that never started a terminal snapshot.
    fn sync_agents(&self, results: &BTreeMap<String, AgentResult>) {
        if let Ok(mut table) = self.agents.lock() {
            for (task_id, result) in results {
                if let Some(slot) = table.get_mut(task_id)
                    && slot.finished.is_none()
                {
                    slot.finished = Some((result.status, result.steps.len() as u32));
                }
            }
        }
    }

    /// Append the follow-up tasks conditional rules owe to the current
    /// shared state. A follow-up whose dependencies already failed is
    /// skipped on arrival.
    async fn extend_plan(&self, plan: &mut WorkflowPlan, order: &mut Vec<String>, run: &mut WorkflowRun) {
        if self.cancel.is_cancelled() {
            return;
        }
        let added = run.follow_ups(plan).await;
        if added.is_empty() {
            return;
        }
        for task in added {
            info!(task = %task.id, role = %task.role, "Enforcement added follow-up task");
            self.register_agent(&task);
            run.track(&task);
            order.push(task.id.clone());
            if let Some(failed) = run.failed_dependency(&task) {
                run.skip(&task, format!("Dependency '{}' failed", failed), false);
            }
            plan.tasks.push(task);
        }
        plan.recompute_complexity();
    }

    /// One task at a time in declaration order; the first failure halts the
    /// rest.
    async fn run_sequential(&self, plan: &mut WorkflowPlan, order: &mut Vec<String>, run: &mut WorkflowRun) {
        let runner = self.runner();
        let mut halted_by: Option<String> = None;
        let mut next = 0;

        while next < order.len() {
            let id = order[next].clone();
            next += 1;
            let Some(task) = plan.task(&id).cloned() else { continue };
            if !run.is_pending(&id) {
                continue;
            }
            if self.cancel.is_cancelled() {
                run.skip(&task, "Workflow interrupted", false);
                continue;
            }
            if let Some(failed) = &halted_by {
                run.skip(&task, format!("Skipped after task '{}' failed", failed), false);
                continue;
            }

            let summary = run.summary_for(&task).await;
            debug!(task = %task.id, role = %task.role, "Dispatching task");
            run.start(&id, task.parallelizable);
            let result = guarded(runner.clone(), task, summary, self.cancel.child_token()).await;
            let success = result.success;
            self.mark_finished(&id, &result);
            run.complete(&id, result).await;
            if success {
                self.extend_plan(plan, order, run).await;
            } else {
                halted_by = Some(id);
            }
        }
    }

    async fn run_dag(&self, plan: &mut WorkflowPlan, order: &mut Vec<String>, run: &mut WorkflowRun) {
        let runner = self.runner();
        let semaphore = self
            .config
            .max_concurrency
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        let mut running: JoinSet<(String, AgentResult)> = JoinSet::new();

        loop {
            if self.cancel.is_cancelled() {
                for id in order.iter() {
                    if let Some(task) = plan.task(id)
                        && run.is_pending(id)
                        && !run.is_running(id)
                    {
                        run.skip(task, "Workflow interrupted", false);
                    }
                }
            } else {
                for id in order.iter() {
                    if run.exclusive_running() {
                        break;
                    }
                    let Some(task) = plan.task(id) else { continue };
                    if !run.is_pending(id) || run.is_running(id) || !run.is_ready(task) {
                        continue;
                    }
                    if !task.parallelizable && run.has_running() {
                        // wait for the running tasks to drain
                        break;
                    }

                    let summary = run.summary_for(task).await;
                    debug!(task = %task.id, role = %task.role, "Dispatching task");
                    run.start(id, task.parallelizable);
                    let runner = runner.clone();
                    let task = task.clone();
                    let token = self.cancel.child_token();
                    let semaphore = semaphore.clone();
                    running.spawn(async move {
                        let _permit = match semaphore {
                            Some(semaphore) => semaphore.acquire_owned().await.ok(),
                            None => None,
                        };
                        let id = task.id.clone();
                        (id, guarded(runner, task, summary, token).await)
                    });
                }
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (id, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    // guarded() turns panics into results; only an abort lands here
                    warn!("Workflow task aborted: {}", e);
                    continue;
                }
            };
            self.mark_finished(&id, &result);
            let success = result.success;
            let status = result.status;
            run.complete(&id, result).await;

            if success {
                self.extend_plan(plan, order, run).await;
                continue;
            }
            let reason = if self.cancel.is_cancelled() {
                "Workflow interrupted".to_string()
            } else if status == AgentStatus::Interrupted {
                format!("Dependency '{}' was interrupted", id)
            } else {
                format!("Dependency '{}' failed", id)
            };
            for dependent in plan.dependents_of(&id) {
                if let Some(task) = plan.task(&dependent)
                    && run.is_pending(&dependent)
                {
                    run.skip(task, reason.clone(), false);
                }
            }
        }

        // tasks stranded by an aborted join
        for id in order.iter() {
            if let Some(task) = plan.task(id)
                && run.is_pending(id)
            {
                run.skip(task, "Dependency did not complete", false);
            }
        }
    }
}

/// Run a task, turning a panic inside the agent into a failed result.
async fn guarded(runner: TaskRunner, task: WorkflowTask, summary: String, cancel: CancellationToken) -> AgentResult {
    let role = task.role.clone();
    let id = task.id.clone();
    match AssertUnwindSafe(runner.run(task, summary, cancel)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            warn!(task = %id, "Agent panicked");
            AgentResult::not_started(role, "Agent panicked")
        }
    }
}

/// Mutable bookkeeping for one `execute` call.
struct WorkflowRun {
    engine: EnforcementEngine,
    context: Mutex<WorkflowContext>,
    results: BTreeMap<String, AgentResult>,
    /// Tasks dropped because their loop pattern ended; not counted as failures
    loop_skipped: BTreeSet<String>,
    plan_roles: HashMap<String, AgentRole>,
    /// Dispatched and not yet complete, with their parallelizable flag
    running: HashMap<String, bool>,
}

impl WorkflowRun {
    fn new(plan: &WorkflowPlan, engine: EnforcementEngine) -> Self {
        Self {
            engine,
            context: Mutex::new(WorkflowContext::new()),
            results: BTreeMap::new(),
            loop_skipped: BTreeSet::new(),
            plan_roles: plan
                .tasks
                .iter()
                .map(|t| (t.id.clone(), t.role.clone()))
                .collect(),
            running: HashMap::new(),
        }
    }

    /// No result recorded yet. Running tasks are pending too.
    fn is_pending(&self, id: &str) -> bool {
        !self.results.contains_key(id)
    }

    fn start(&mut self, id: &str, parallelizable: bool) {
        self.running.insert(id.to_string(), parallelizable);
    }

    fn is_running(&self, id: &str) -> bool {
        self.running.contains_key(id)
    }

    fn has_running(&self) -> bool {
        !self.running.is_empty()
    }

    /// A non-parallelizable task holds the run to itself.
    fn exclusive_running(&self) -> bool {
        self.running.values().any(|parallel| !parallel)
    }

    fn track(&mut self, task: &WorkflowTask) {
        self.plan_roles.insert(task.id.clone(), task.role.clone());
    }

    fn failed_dependency(&self, task: &WorkflowTask) -> Option<String> {
        task.depends_on
            .iter()
            .find(|dep| self.results.get(dep.as_str()).is_some_and(|r| !r.success))
            .cloned()
    }

    async fn follow_ups(&self, plan: &WorkflowPlan) -> Vec<WorkflowTask> {
        let context = self.context.lock().await;
        self.engine.follow_ups(plan, &context)
    }

    /// Every dependency finished successfully.
    fn is_ready(&self, task: &WorkflowTask) -> bool {
        task.depends_on
            .iter()
            .all(|dep| self.results.get(dep).is_some_and(|r| r.success))
    }

    async fn summary_for(&self, task: &WorkflowTask) -> String {
        self.context.lock().await.summary_for(&task.depends_on)
    }

    fn skip(&mut self, task: &WorkflowTask, reason: impl Into<String>, loop_break: bool) {
        self.skip_id(&task.id, &task.role, reason.into(), loop_break);
    }

    fn skip_id(&mut self, id: &str, role: &AgentRole, reason: String, loop_break: bool) {
        debug!(task = %id, reason = %reason, "Task skipped");
        if loop_break {
            self.loop_skipped.insert(id.to_string());
        }
        self.results
            .insert(id.to_string(), AgentResult::not_started(role.clone(), reason));
    }

    /// Record a finished task and bound any role loop it closes.
    async fn complete(&mut self, id: &str, result: AgentResult) {
        info!(
            task = %id,
            role = %result.role,
            status = %result.status,
            steps = result.step_count(),
            "Task finished"
        );
        self.running.remove(id);
        let broken = {
            let mut context = self.context.lock().await;
            context.record_result(id, result.clone());
            match self.engine.detect_loop(&context.call_stack) {
                Some(found) if self.engine.should_break_loop(&context.call_stack, &context.shared_state) => {
                    Some(found)
                }
                Some(found) => {
                    debug!(pattern = %found.pattern, repetitions = found.repetitions, "Loop pattern detected");
                    None
                }
                None => None,
            }
        };
        self.results.insert(id.to_string(), result);

        let Some(found) = broken else { return };
        let Some(pattern) = self.engine.loop_pattern(&found.pattern).cloned() else {
            return;
        };
        let limit_reached = found.repetitions >= found.max_iterations;
        let reason = if limit_reached {
            format!("Loop pattern '{}' limit reached", pattern.name)
        } else {
            format!("Loop pattern '{}' break condition met", pattern.name)
        };
        warn!(
            pattern = %pattern.name,
            repetitions = found.repetitions,
            max_iterations = found.max_iterations,
            "{}",
            reason
        );

        let to_skip: Vec<(String, AgentRole)> = self
            .plan_roles
            .iter()
            .filter(|(task_id, role)| {
                self.is_pending(task_id) && !self.is_running(task_id) && pattern.roles.contains(role)
            })
            .map(|(task_id, role)| (task_id.clone(), role.clone()))
            .collect();
        for (task_id, role) in to_skip {
            self.skip_id(&task_id, &role, reason.clone(), !limit_reached);
        }
    }

    async fn finish(self, plan: WorkflowPlan, interrupted: bool, duration_ms: u64) -> WorkflowResult {
        let mut total_tokens = TokenUsage::default();
        let mut total_cost = 0.0;
        for result in self.results.values() {
            total_tokens = total_tokens + result.total_tokens;
            total_cost += result.cost;
        }
        let success = !interrupted
            && self
                .results
                .iter()
                .all(|(id, r)| r.success || self.loop_skipped.contains(id));
        let shared_state = self.context.into_inner().shared_state;

        WorkflowResult {
            plan,
            results: self.results,
            success,
            interrupted,
            total_tokens,
            total_cost,
            duration_ms,
            shared_state,
        }
    }
}

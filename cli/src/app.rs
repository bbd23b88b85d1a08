//! Dependency wiring for the CLI commands

use crate::commands::Cli;
use anyhow::{Context, Result, bail};
use conductor_application::{
    Agent, AgentCollaborators, AgentEventSink, ExecutorFactory, ExecutorGuard, ExecutorMode,
    LlmProvider, NoEventSink, PermissionManager, TaskDecomposer, ToolRegistry,
    WorkflowOrchestrator, WorkflowResult,
};
use conductor_domain::{
    AgentConfig, AgentResult, AgentRole, ConfigIssue, RiskAssessor, RoleRegistry, WorkflowPlan,
};
use conductor_infrastructure::{
    DefaultExecutorFactory, DockerCliRuntime, FileConfig, JsonlEventLogger, ScriptedProvider,
    builtin_tools,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(mode) = &cli.executor {
        config.executor.mode = mode.clone();
    }
    if let Some(workspace) = &cli.workspace {
        config.executor.workspace = Some(workspace.clone());
    }
}

/// Log warnings and fail on the first error-level issue.
pub fn check_issues(issues: &[ConfigIssue]) -> Result<()> {
    for issue in issues.iter().filter(|i| !i.is_error()) {
        warn!("{}", issue);
    }
    let errors: Vec<String> = issues
        .iter()
        .filter(|i| i.is_error())
        .map(|i| i.to_string())
        .collect();
    if !errors.is_empty() {
        bail!("Invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(())
}

/// Everything a command needs, built once from config.
pub struct App {
    config: FileConfig,
    provider: Arc<dyn LlmProvider>,
    roles: Arc<RoleRegistry>,
    tools: Arc<ToolRegistry>,
    executors: Arc<dyn ExecutorFactory>,
    permissions: Arc<PermissionManager>,
    events: Arc<dyn AgentEventSink>,
    cancellation: CancellationToken,
}

impl App {
    pub fn build(
        config: FileConfig,
        script: Option<&PathBuf>,
        cancellation: CancellationToken,
    ) -> Result<Self> {
        let Some(script) = script else {
            bail!(
                "No model provider configured. Pass --script <file> to replay recorded responses."
            );
        };
        let provider = ScriptedProvider::from_file(script)
            .with_context(|| format!("Failed to load script {}", script.display()))?;

        let (policy, _) = config.permissions.to_policy();
        let (prompt_mode, _) = config.permissions.parse_prompt_mode();
        let permissions =
            PermissionManager::new(RiskAssessor::default(), policy).with_prompt(prompt_mode.prompt());

        let executors = build_executor_factory(&config)?;

        let events: Arc<dyn AgentEventSink> = match &config.logging.events_jsonl {
            Some(path) => match JsonlEventLogger::new(path) {
                Some(logger) => {
                    info!(path = %path.display(), "Writing agent events");
                    Arc::new(logger)
                }
                None => Arc::new(NoEventSink),
            },
            None => Arc::new(NoEventSink),
        };

        Ok(Self {
            config,
            provider: Arc::new(provider),
            roles: Arc::new(RoleRegistry::with_builtin_roles()),
            tools: Arc::new(builtin_tools()),
            executors,
            permissions: Arc::new(permissions),
            events,
            cancellation,
        })
    }

    /// Run one agent with the given role in a fresh executor.
    pub async fn run_agent(&self, task: &str, role: &str) -> Result<AgentResult> {
        let role = AgentRole::parse(role);
        let role_config = self.roles.get_or_err(&role)?.clone();

        let budget = role_config
            .default_budget
            .merge_defaults(&self.config.agent.to_budget());
        let mut agent_config = AgentConfig::for_role(role.to_string(), &role_config).with_budget(budget);
        if let (Some(t), _) = self.config.agent.parse_temperature() {
            agent_config = agent_config.with_temperature(t);
        }
        let options = self
            .config
            .agent
            .to_agent_options(self.config.executor.command_timeout_ms);

        let executor = self.executors.create(role.as_str())?;
        info!(role = %role, mode = %self.executors.mode(), "Running agent");

        let result = ExecutorGuard::scoped(executor, |executor| {
            let collaborators = AgentCollaborators::new(
                self.provider.clone(),
                self.tools.clone(),
                executor,
                self.permissions.clone(),
            )
            .with_events(self.events.clone())
            .with_role(role_config);
            let mut agent = Agent::new(task, agent_config, collaborators)
                .with_options(options)
                .with_cancellation(self.cancellation.clone());
            async move { agent.run().await }
        })
        .await
        .context("Failed to prepare the executor")?;

        Ok(result)
    }

    /// Decompose `task` into a plan, optionally with enforcement applied.
    pub async fn plan(&self, task: &str, enforce: bool) -> Result<WorkflowPlan> {
        let plan = TaskDecomposer::new(self.provider.clone(), self.roles.clone())
            .with_cancellation(self.cancellation.clone())
            .plan_workflow(task)
            .await
            .context("Task decomposition failed")?;

        if enforce {
            Ok(self.orchestrator(None, false).enforce(&plan))
        } else {
            Ok(plan)
        }
    }

    /// Decompose `task` and execute the plan.
    pub async fn workflow(
        &self,
        task: &str,
        max_concurrency: Option<usize>,
        skip_enforcement: bool,
    ) -> Result<WorkflowResult> {
        let plan = self.plan(task, false).await?;
        info!(plan_id = %plan.id, tasks = plan.tasks.len(), "Executing workflow");
        let result = self
            .orchestrator(max_concurrency, skip_enforcement)
            .execute(&plan)
            .await?;
        Ok(result)
    }

    fn orchestrator(&self, max_concurrency: Option<usize>, skip_enforcement: bool) -> WorkflowOrchestrator {
        let mut config = self.config.to_orchestrator_config();
        if let Some(n) = max_concurrency.filter(|n| *n > 0) {
            config = config.with_max_concurrency(n);
        }
        if skip_enforcement {
            config = config.with_skip_enforcement(true);
        }
        WorkflowOrchestrator::new(
            self.provider.clone(),
            self.roles.clone(),
            self.tools.clone(),
            self.executors.clone(),
            self.permissions.clone(),
        )
        .with_config(config)
        .with_events(self.events.clone())
        .with_cancellation(self.cancellation.clone())
    }
}

fn build_executor_factory(config: &FileConfig) -> Result<Arc<dyn ExecutorFactory>> {
    let executor = &config.executor;
    let workspace = executor.workspace_dir();
    let workspace = std::fs::canonicalize(&workspace)
        .with_context(|| format!("Workspace {} is not accessible", workspace.display()))?;

    let factory = match executor.parse_mode().0 {
        ExecutorMode::Native => DefaultExecutorFactory::native(workspace),
        ExecutorMode::Docker => {
            let runtime = DockerCliRuntime::new().with_binary(executor.docker_binary.clone());
            let factory =
                DefaultExecutorFactory::docker(Arc::new(runtime), executor.container_config());
            if executor.mount_workspace {
                factory.with_workspace_mount(workspace)
            } else {
                factory
            }
        }
    };

    Ok(Arc::new(match executor.command_timeout_ms {
        Some(ms) => factory.with_command_timeout_ms(ms),
        None => factory,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use conductor_domain::ConfigIssueCode;

    #[test]
    fn overrides_replace_executor_settings() {
        let cli = Cli::parse_from([
            "conductor",
            "--executor",
            "docker",
            "--workspace",
            "/tmp/ws",
            "config",
        ]);
        let mut config = FileConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.executor.mode, "docker");
        assert_eq!(config.executor.workspace, Some(PathBuf::from("/tmp/ws")));
    }

    #[test]
    fn warnings_pass_errors_fail() {
        let warning = ConfigIssue::warning(ConfigIssueCode::UnknownExecutorMode, "odd mode");
        assert!(check_issues(&[warning.clone()]).is_ok());

        let error = ConfigIssue::error(ConfigIssueCode::ZeroTimeout, "zero timeout");
        let err = check_issues(&[warning, error]).unwrap_err();
        assert!(err.to_string().contains("zero timeout"));
    }

    #[test]
    fn build_requires_a_script() {
        let err = App::build(FileConfig::default(), None, CancellationToken::new())
            .err()
            .unwrap();
        assert!(err.to_string().contains("--script"));
    }
}

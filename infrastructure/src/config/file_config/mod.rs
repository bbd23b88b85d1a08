//! Raw TOML configuration data types
//!
//! These structs mirror the TOML file. Enum-like values stay strings here
//! and are parsed by the `parse_*` helpers, which fall back to defaults and
//! report a [`ConfigIssue`] instead of failing.

mod agent;
mod executor;
mod logging;
mod orchestrator;
mod permissions;

pub use agent::FileAgentConfig;
pub use executor::FileExecutorConfig;
pub use logging::FileLoggingConfig;
pub use orchestrator::FileOrchestratorConfig;
pub use permissions::{FilePermissionsConfig, PromptMode};

use conductor_application::OrchestratorConfig;
use conductor_domain::ConfigIssue;
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub agent: FileAgentConfig,
    pub permissions: FilePermissionsConfig,
    pub executor: FileExecutorConfig,
    pub orchestrator: FileOrchestratorConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.agent.parse_temperature().1);
        issues.extend(self.permissions.to_policy().1);
        issues.extend(self.permissions.parse_prompt_mode().1);
        issues.extend(self.executor.parse_mode().1);
        issues.extend(self.executor.parse_network().1);
        issues.extend(self.executor.validate_timeout());
        issues.extend(self.orchestrator.validate());
        issues
    }

    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::default()
            .with_skip_enforcement(self.orchestrator.skip_enforcement)
            .with_default_budget(self.agent.to_budget())
            .with_agent_options(self.agent.to_agent_options(self.executor.command_timeout_ms));
        if let Some(n) = self.orchestrator.max_concurrency.filter(|n| *n > 0) {
            config = config.with_max_concurrency(n);
        }
        config
    }
}

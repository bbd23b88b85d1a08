//! Orchestrator configuration from TOML (`[orchestrator]` section)

use conductor_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};

/// ```toml
/// [orchestrator]
/// max_concurrency = 4        # omit for unbounded
/// skip_enforcement = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    pub max_concurrency: Option<usize>,
    pub skip_enforcement: bool,
}

impl FileOrchestratorConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        match self.max_concurrency {
            Some(0) => vec![ConfigIssue::error(
                ConfigIssueCode::ZeroConcurrency,
                "orchestrator.max_concurrency: must be at least 1",
            )],
            _ => vec![],
        }
    }
}

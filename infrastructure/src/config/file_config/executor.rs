//! Executor configuration from TOML (`[executor]` section)

use crate::executor::{ContainerConfig, NetworkMode};
use conductor_application::ExecutorMode;
use conductor_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw executor configuration from TOML
///
/// # Example
///
/// ```toml
/// [executor]
/// mode = "docker"                  # native, docker
/// workspace = "."                  # host directory agents work in
/// image = "rust:1.85-slim"
/// cpu_limit = 2.0
/// memory_limit = "4g"
/// network = "none"                 # none, bridge, host
/// command_timeout_ms = 120000
/// mount_workspace = false          # opt in to bind-mounting `workspace` read-write
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutorConfig {
    pub mode: String,
    /// Defaults to the current directory
    pub workspace: Option<PathBuf>,
    pub image: String,
    pub cpu_limit: Option<f64>,
    pub memory_limit: Option<String>,
    pub network: String,
    pub command_timeout_ms: Option<u64>,
    /// Off by default: a mounted workspace lets container agents edit host files
    pub mount_workspace: bool,
    /// Docker-compatible CLI binary
    pub docker_binary: String,
}

impl Default for FileExecutorConfig {
    fn default() -> Self {
        Self {
            mode: "native".to_string(),
            workspace: None,
            image: ContainerConfig::default().image,
            cpu_limit: None,
            memory_limit: None,
            network: "none".to_string(),
            command_timeout_ms: Some(120_000),
            mount_workspace: false,
            docker_binary: "docker".to_string(),
        }
    }
}

impl FileExecutorConfig {
    pub fn parse_mode(&self) -> (ExecutorMode, Vec<ConfigIssue>) {
        match self.mode.parse::<ExecutorMode>() {
            Ok(mode) => (mode, vec![]),
            Err(_) => (
                ExecutorMode::default(),
                vec![ConfigIssue::warning(
                    ConfigIssueCode::UnknownExecutorMode,
                    format!("executor.mode: unknown value '{}', falling back to 'native'", self.mode),
                )],
            ),
        }
    }

    pub fn parse_network(&self) -> (NetworkMode, Vec<ConfigIssue>) {
        match self.network.parse::<NetworkMode>() {
            Ok(network) => (network, vec![]),
            Err(_) => (
                NetworkMode::default(),
                vec![ConfigIssue::warning(
                    ConfigIssueCode::UnknownNetworkMode,
                    format!("executor.network: unknown value '{}', falling back to 'none'", self.network),
                )],
            ),
        }
    }

    /// A zero timeout would fail every command.
    pub fn validate_timeout(&self) -> Vec<ConfigIssue> {
        match self.command_timeout_ms {
            Some(0) => vec![ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout,
                "executor.command_timeout_ms: must be greater than zero",
            )],
            _ => vec![],
        }
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.workspace.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Container settings, without the workspace mount.
    pub fn container_config(&self) -> ContainerConfig {
        let mut config = ContainerConfig::new(self.image.clone()).with_network(self.parse_network().0);
        if let Some(cpus) = self.cpu_limit {
            config = config.with_cpu_limit(cpus);
        }
        if let Some(memory) = &self.memory_limit {
            config = config.with_memory_limit(memory.clone());
        }
        config
    }
}

//! Executor port
//!
//! Where commands run and files live. Tools never touch the host directly;
//! they go through an [`Executor`], which is either the host itself (native)
//! or an isolated container (docker). Every agent run gets its own executor
//! from an [`ExecutorFactory`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Exit code reported for a command killed by its timeout (as `timeout(1)`).
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Executor not initialized")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path escapes the workspace: {0}")]
    PathEscape(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    #[default]
    Native,
    Docker,
}

impl ExecutorMode {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutorMode::Native => "native",
            ExecutorMode::Docker => "docker",
        }
    }
}

impl fmt::Display for ExecutorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExecutorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" | "local" | "host" => Ok(ExecutorMode::Native),
            "docker" | "container" => Ok(ExecutorMode::Docker),
            other => Err(format!("unknown executor mode '{}'", other)),
        }
    }
}

/// Per-command options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Working directory, relative to the executor's cwd
    pub cwd: Option<String>,
    /// Overrides the executor's default command timeout
    pub timeout_ms: Option<u64>,
}

impl ExecOptions {
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
}

impl ExecOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            timed_out: false,
        }
    }

    /// Output of a command killed by its timeout.
    pub fn timed_out(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code: TIMEOUT_EXIT_CODE,
            timed_out: true,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: Option<u64>,
}

/// Command and filesystem access for one agent.
///
/// Paths are relative to [`cwd`](Executor::cwd) unless absolute; an
/// implementation may reject paths outside its workspace with
/// [`ExecutorError::PathEscape`]. `cleanup` must be idempotent.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Prepare the environment (create the container, check the root exists).
    async fn initialize(&self) -> Result<(), ExecutorError>;

    /// Run a shell command. A timeout is not an error: it yields
    /// [`ExecOutput::timed_out`].
    async fn execute(&self, command: &str, options: ExecOptions) -> Result<ExecOutput, ExecutorError>;

    async fn read_file(&self, path: &str) -> Result<String, ExecutorError>;

    /// Create or overwrite a file, creating parent directories.
    async fn write_file(&self, path: &str, content: &str) -> Result<(), ExecutorError>;

    async fn exists(&self, path: &str) -> Result<bool, ExecutorError>;

    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, ExecutorError>;

    async fn delete_file(&self, path: &str) -> Result<(), ExecutorError>;

    fn mode(&self) -> ExecutorMode;

    fn cwd(&self) -> String;

    fn set_cwd(&self, cwd: &str) -> Result<(), ExecutorError>;

    /// Release everything `initialize` acquired.
    async fn cleanup(&self) -> Result<(), ExecutorError>;
}

/// Builds a fresh, unshared executor per agent run.
pub trait ExecutorFactory: Send + Sync {
    /// `label` identifies the run (used e.g. in container names).
    fn create(&self, label: &str) -> Result<Arc<dyn Executor>, ExecutorError>;

    fn mode(&self) -> ExecutorMode;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("native".parse::<ExecutorMode>().unwrap(), ExecutorMode::Native);
        assert_eq!("Docker".parse::<ExecutorMode>().unwrap(), ExecutorMode::Docker);
        assert_eq!("container".parse::<ExecutorMode>().unwrap(), ExecutorMode::Docker);
        assert!("vm".parse::<ExecutorMode>().is_err());
    }

    #[test]
    fn timed_out_output_uses_124() {
        let out = ExecOutput::timed_out("partial", "");
        assert_eq!(out.exit_code, TIMEOUT_EXIT_CODE);
        assert!(out.timed_out);
        assert!(!out.success());
        assert!(ExecOutput::new("ok", "", 0).success());
    }
}

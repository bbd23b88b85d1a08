//! Container runtime port
//!
//! The operations [`ContainerExecutor`](super::ContainerExecutor) needs from
//! a container engine. [`DockerCliRuntime`](super::DockerCliRuntime) is the
//! production implementation; tests substitute in-memory runtimes.

use async_trait::async_trait;
use conductor_application::{ExecOptions, ExecOutput};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Size of a multiplexed stream frame header.
const FRAME_HEADER_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Container runtime unavailable: {0}")]
    Unavailable(String),

    #[error("No such container: {0}")]
    NoSuchContainer(String),

    #[error("Runtime command failed: {0}")]
    CommandFailed(String),

    #[error("Invalid runtime output: {0}")]
    InvalidOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Errors meaning the container is already gone or stopped.
    pub fn is_already_gone(&self) -> bool {
        match self {
            RuntimeError::NoSuchContainer(_) => true,
            RuntimeError::CommandFailed(msg) => {
                let lower = msg.to_lowercase();
                lower.contains("no such container") || lower.contains("is not running")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// No network access
    #[default]
    None,
    Bridge,
    Host,
}

impl NetworkMode {
    pub fn as_str(&self) -> &str {
        match self {
            NetworkMode::None => "none",
            NetworkMode::Bridge => "bridge",
            NetworkMode::Host => "host",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NetworkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" | "closed" => Ok(NetworkMode::None),
            "bridge" | "open" => Ok(NetworkMode::Bridge),
            "host" => Ok(NetworkMode::Host),
            other => Err(format!("unknown network mode '{}'", other)),
        }
    }
}

/// How a container is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub image: String,
    /// CPU quota in cores (`--cpus`)
    pub cpu_limit: Option<f64>,
    /// Memory limit in docker notation, e.g. `512m`
    pub memory_limit: Option<String>,
    pub network: NetworkMode,
    pub env: BTreeMap<String, String>,
    /// Bind mounts as `host:container[:opts]`
    pub volumes: Vec<String>,
    pub working_dir: String,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            image: "debian:bookworm-slim".to_string(),
            cpu_limit: None,
            memory_limit: None,
            network: NetworkMode::None,
            env: BTreeMap::new(),
            volumes: Vec::new(),
            working_dir: "/workspace".to_string(),
        }
    }
}

impl ContainerConfig {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    pub fn with_cpu_limit(mut self, cpus: f64) -> Self {
        self.cpu_limit = Some(cpus);
        self
    }

    pub fn with_memory_limit(mut self, memory: impl Into<String>) -> Self {
        self.memory_limit = Some(memory.into());
        self
    }

    pub fn with_network(mut self, network: NetworkMode) -> Self {
        self.network = network;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volumes.push(volume.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = dir.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Stopped,
    Error(String),
}

/// Command output as a runtime reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawExecOutput {
    Separate {
        stdout: Vec<u8>,
        stderr: Vec<u8>,
        exit_code: i32,
    },
    /// stdout and stderr interleaved in 8-byte-header frames
    Multiplexed { stream: Vec<u8>, exit_code: i32 },
}

impl RawExecOutput {
    pub fn into_exec_output(self) -> Result<ExecOutput, RuntimeError> {
        let (stdout, stderr, exit_code) = match self {
            RawExecOutput::Separate {
                stdout,
                stderr,
                exit_code,
            } => (stdout, stderr, exit_code),
            RawExecOutput::Multiplexed { stream, exit_code } => {
                let (stdout, stderr) = demultiplex(&stream)?;
                (stdout, stderr, exit_code)
            }
        };
        Ok(ExecOutput::new(
            String::from_utf8_lossy(&stdout),
            String::from_utf8_lossy(&stderr),
            exit_code,
        ))
    }
}

/// Split a multiplexed attach stream into stdout and stderr.
///
/// Each frame is `[stream, 0, 0, 0, len_be_u32]` followed by `len` payload
/// bytes; stream 1 is stdout, 2 is stderr and 0 (stdin) is dropped.
pub fn demultiplex(stream: &[u8]) -> Result<(Vec<u8>, Vec<u8>), RuntimeError> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut rest = stream;

    while !rest.is_empty() {
        if rest.len() < FRAME_HEADER_LEN {
            return Err(RuntimeError::InvalidOutput(format!(
                "truncated frame header ({} bytes)",
                rest.len()
            )));
        }
        let len = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let body = &rest[FRAME_HEADER_LEN..];
        if body.len() < len {
            return Err(RuntimeError::InvalidOutput(format!(
                "frame declares {} bytes, {} available",
                len,
                body.len()
            )));
        }
        let (payload, next) = body.split_at(len);
        match rest[0] {
            0 => {}
            1 => stdout.extend_from_slice(payload),
            2 => stderr.extend_from_slice(payload),
            other => {
                return Err(RuntimeError::InvalidOutput(format!("unknown stream type {}", other)));
            }
        }
        rest = next;
    }

    Ok((stdout, stderr))
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError>;

    /// Create (but do not start) a container; returns its id.
    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<String, RuntimeError>;

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Run `command` through `sh -c` inside the container.
    async fn execute_command(
        &self,
        id: &str,
        command: &str,
        options: &ExecOptions,
    ) -> Result<RawExecOutput, RuntimeError>;

    async fn container_status(&self, id: &str) -> Result<ContainerStatus, RuntimeError>;

    fn name(&self) -> &str {
        "container"
    }
}

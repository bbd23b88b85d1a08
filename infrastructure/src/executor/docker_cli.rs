//! [`ContainerRuntime`] backed by the `docker` command line client.

use super::runtime::{ContainerConfig, ContainerRuntime, ContainerStatus, RawExecOutput, RuntimeError};
use async_trait::async_trait;
use conductor_application::ExecOptions;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

pub struct DockerCliRuntime {
    binary: String,
}

impl DockerCliRuntime {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    /// Use another docker-compatible binary (e.g. `podman`).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output, RuntimeError> {
        debug!(binary = %self.binary, args = ?args, "Running container CLI");
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    RuntimeError::Unavailable(format!("'{}' not found in PATH", self.binary))
                }
                _ => RuntimeError::Io(e),
            })
    }

    /// Run and require a zero exit, returning trimmed stdout.
    async fn run_ok(&self, args: &[String]) -> Result<String, RuntimeError> {
        let output = self.run(args).await?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("No such container") {
            return Err(RuntimeError::NoSuchContainer(stderr));
        }
        Err(RuntimeError::CommandFailed(stderr))
    }
}

impl Default for DockerCliRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments for `docker create`. The container idles on `sleep infinity`
/// and work is sent to it with `docker exec`.
pub fn build_create_args(name: &str, config: &ContainerConfig) -> Vec<String> {
    let mut args = vec!["create".to_string(), "--name".to_string(), name.to_string()];
    if let Some(cpus) = config.cpu_limit {
        args.push("--cpus".to_string());
        args.push(cpus.to_string());
    }
    if let Some(memory) = &config.memory_limit {
        args.push("--memory".to_string());
        args.push(memory.clone());
    }
    args.push("--network".to_string());
    args.push(config.network.as_str().to_string());
    for (key, value) in &config.env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }
    for volume in &config.volumes {
        args.push("-v".to_string());
        args.push(volume.clone());
    }
    args.push("-w".to_string());
    args.push(config.working_dir.clone());
    args.push(config.image.clone());
    args.push("sleep".to_string());
    args.push("infinity".to_string());
    args
}

/// Arguments for `docker exec` running `command` through `sh -c`.
pub fn build_exec_args(id: &str, command: &str, options: &ExecOptions) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if let Some(cwd) = &options.cwd {
        args.push("-w".to_string());
        args.push(cwd.clone());
    }
    args.push(id.to_string());
    args.push("sh".to_string());
    args.push("-c".to_string());
    args.push(command.to_string());
    args
}

fn parse_status(state: &str) -> ContainerStatus {
    match state {
        "running" => ContainerStatus::Running,
        "created" | "exited" | "paused" => ContainerStatus::Stopped,
        other => ContainerStatus::Error(other.to_string()),
    }
}

#[async_trait]
impl ContainerRuntime for DockerCliRuntime {
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        self.run_ok(&["pull".to_string(), image.to_string()]).await?;
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool, RuntimeError> {
        let output = self
            .run(&["image".to_string(), "inspect".to_string(), image.to_string()])
            .await?;
        Ok(output.status.success())
    }

    async fn create_container(&self, name: &str, config: &ContainerConfig) -> Result<String, RuntimeError> {
        let id = self.run_ok(&build_create_args(name, config)).await?;
        if id.is_empty() {
            return Err(RuntimeError::InvalidOutput("docker create printed no id".into()));
        }
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.run_ok(&["start".to_string(), id.to_string()]).await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.run_ok(&["stop".to_string(), "-t".to_string(), "2".to_string(), id.to_string()])
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.run_ok(&["rm".to_string(), "-f".to_string(), id.to_string()])
            .await?;
        Ok(())
    }

    async fn execute_command(
        &self,
        id: &str,
        command: &str,
        options: &ExecOptions,
    ) -> Result<RawExecOutput, RuntimeError> {
        let output = self.run(&build_exec_args(id, command, options)).await?;
        Ok(RawExecOutput::Separate {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn container_status(&self, id: &str) -> Result<ContainerStatus, RuntimeError> {
        let state = self
            .run_ok(&[
                "inspect".to_string(),
                "-f".to_string(),
                "{{.State.Status}}".to_string(),
                id.to_string(),
            ])
            .await?;
        Ok(parse_status(&state))
    }

    fn name(&self) -> &str {
        &self.binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::runtime::NetworkMode;

    #[test]
    fn create_args_carry_limits_and_mounts() {
        let config = ContainerConfig::new("rust:1.85")
            .with_cpu_limit(1.5)
            .with_memory_limit("2g")
            .with_network(NetworkMode::Bridge)
            .with_env("RUST_LOG", "debug")
            .with_volume("/src:/workspace")
            .with_working_dir("/workspace");

        let args = build_create_args("conductor-1", &config);

        assert_eq!(&args[..3], &["create", "--name", "conductor-1"]);
        assert!(args.windows(2).any(|w| w == ["--cpus", "1.5"]));
        assert!(args.windows(2).any(|w| w == ["--memory", "2g"]));
        assert!(args.windows(2).any(|w| w == ["--network", "bridge"]));
        assert!(args.windows(2).any(|w| w == ["-e", "RUST_LOG=debug"]));
        assert!(args.windows(2).any(|w| w == ["-v", "/src:/workspace"]));
        assert!(args.windows(2).any(|w| w == ["-w", "/workspace"]));
        assert_eq!(&args[args.len() - 3..], &["rust:1.85", "sleep", "infinity"]);
    }

    #[test]
    fn default_config_has_no_network() {
        let args = build_create_args("c", &ContainerConfig::default());
        assert!(args.windows(2).any(|w| w == ["--network", "none"]));
        assert!(!args.contains(&"--cpus".to_string()));
        assert!(!args.contains(&"--memory".to_string()));
    }

    #[test]
    fn exec_args_wrap_command_in_shell() {
        let options = ExecOptions {
            cwd: Some("/workspace/src".into()),
            timeout_ms: None,
        };
        let args = build_exec_args("abc", "ls -la | wc -l", &options);
        assert_eq!(args, vec!["exec", "-w", "/workspace/src", "abc", "sh", "-c", "ls -la | wc -l"]);
    }

    #[test]
    fn status_strings_map() {
        assert_eq!(parse_status("running"), ContainerStatus::Running);
        assert_eq!(parse_status("exited"), ContainerStatus::Stopped);
        assert!(matches!(parse_status("dead"), ContainerStatus::Error(_)));
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let runtime = DockerCliRuntime::new().with_binary("conductor-no-such-binary");
        assert!(matches!(
            runtime.image_exists("x").await,
            Err(RuntimeError::Unavailable(_))
        ));
    }
}

//! Executor running everything inside a dedicated container.

use super::runtime::{ContainerConfig, ContainerRuntime, RuntimeError};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use conductor_application::{DirEntry, ExecOptions, ExecOutput, Executor, ExecutorError, ExecutorMode};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Base64 characters sent per exec. A multiple of 4, and far below the
/// kernel's 128 KiB limit on a single argument.
const WRITE_CHUNK: usize = 64 * 1024;

/// Quote `s` for a POSIX shell.
pub(crate) fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn runtime_error(e: RuntimeError) -> ExecutorError {
    match e {
        RuntimeError::Io(io) => ExecutorError::Io(io),
        other => ExecutorError::Runtime(other.to_string()),
    }
}

/// One container per executor. `initialize` pulls the image when missing,
/// then creates and starts the container; file operations run as shell
/// commands inside it.
pub struct ContainerExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    config: ContainerConfig,
    name: String,
    container_id: Mutex<Option<String>>,
    cwd: RwLock<String>,
    default_timeout_ms: Option<u64>,
}

impl ContainerExecutor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: ContainerConfig, name: impl Into<String>) -> Self {
        Self {
            cwd: RwLock::new(config.working_dir.clone()),
            runtime,
            config,
            name: name.into(),
            container_id: Mutex::new(None),
            default_timeout_ms: None,
        }
    }

    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container_id(&self) -> Option<String> {
        match self.container_id.lock() {
            Ok(id) => id.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_container_id(&self, id: Option<String>) -> Option<String> {
        match self.container_id.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, id),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), id),
        }
    }

    fn current_dir(&self) -> String {
        match self.cwd.read() {
            Ok(cwd) => cwd.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", self.current_dir().trim_end_matches('/'), path)
        }
    }

    /// Run a helper command, failing on a non-zero exit.
    async fn run_checked(&self, command: &str, path: &str) -> Result<ExecOutput, ExecutorError> {
        let output = self.execute(command, ExecOptions::default()).await?;
        if output.success() {
            return Ok(output);
        }
        if output.stderr.contains("No such file") {
            return Err(ExecutorError::NotFound(path.to_string()));
        }
        Err(ExecutorError::Runtime(format!(
            "'{}' exited with {}: {}",
            command,
            output.exit_code,
            output.stderr.trim()
        )))
    }
}

#[async_trait]
impl Executor for ContainerExecutor {
    async fn initialize(&self) -> Result<(), ExecutorError> {
        if self.container_id().is_some() {
            return Ok(());
        }
        let image = &self.config.image;
        if !self.runtime.image_exists(image).await.map_err(runtime_error)? {
            info!(image = %image, "Pulling container image");
            self.runtime.pull_image(image).await.map_err(runtime_error)?;
        }

        let id = self
            .runtime
            .create_container(&self.name, &self.config)
            .await
            .map_err(runtime_error)?;
        if let Err(e) = self.runtime.start_container(&id).await {
            if let Err(remove_err) = self.runtime.remove_container(&id).await {
                warn!(container = %id, "Failed to remove unstarted container: {}", remove_err);
            }
            return Err(runtime_error(e));
        }

        info!(
            container = %id,
            name = %self.name,
            image = %image,
            network = %self.config.network,
            "Container started"
        );
        self.set_container_id(Some(id));
        Ok(())
    }

    async fn execute(&self, command: &str, options: ExecOptions) -> Result<ExecOutput, ExecutorError> {
        let id = self.container_id().ok_or(ExecutorError::NotInitialized)?;
        let cwd = options
            .cwd
            .as_deref()
            .map(|dir| self.resolve(dir))
            .unwrap_or_else(|| self.current_dir());
        let timeout_ms = options.timeout_ms.or(self.default_timeout_ms);
        let options = ExecOptions {
            cwd: Some(cwd),
            timeout_ms,
        };

        debug!(container = %id, command = %command, "Container exec");
        let exec = self.runtime.execute_command(&id, command, &options);
        let raw = match timeout_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), exec).await {
                Ok(raw) => raw,
                Err(_) => {
                    warn!(container = %id, timeout_ms = ms, command = %command, "Command timed out");
                    return Ok(ExecOutput::timed_out(
                        "",
                        format!("Command timed out after {}ms", ms),
                    ));
                }
            },
            None => exec.await,
        };
        raw.and_then(|raw| raw.into_exec_output()).map_err(runtime_error)
    }

    async fn read_file(&self, path: &str) -> Result<String, ExecutorError> {
        let target = self.resolve(path);
        let output = self
            .run_checked(&format!("cat -- {}", shell_quote(&target)), path)
            .await?;
        Ok(output.stdout)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), ExecutorError> {
        let target = self.resolve(path);
        let parent = match target.rfind('/') {
            Some(0) | None => "/".to_string(),
            Some(i) => target[..i].to_string(),
        };
        let encoded = BASE64.encode(content);

        // base64 is ASCII, and whole 4-char groups decode on their own
        let mut start = 0;
        loop {
            let end = (start + WRITE_CHUNK).min(encoded.len());
            let chunk = shell_quote(&encoded[start..end]);
            let command = if start == 0 {
                format!(
                    "mkdir -p -- {} && printf '%s' {} | base64 -d > {}",
                    shell_quote(&parent),
                    chunk,
                    shell_quote(&target)
                )
            } else {
                format!("printf '%s' {} | base64 -d >> {}", chunk, shell_quote(&target))
            };
            self.run_checked(&command, path).await?;
            if end == encoded.len() {
                return Ok(());
            }
            start = end;
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, ExecutorError> {
        let target = self.resolve(path);
        let output = self
            .execute(&format!("test -e {}", shell_quote(&target)), ExecOptions::default())
            .await?;
        Ok(output.success())
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, ExecutorError> {
        let target = self.resolve(path);
        let output = self
            .run_checked(&format!("ls -1Ap -- {}", shell_quote(&target)), path)
            .await?;
        let mut entries: Vec<DirEntry> = output
            .stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| match line.strip_suffix('/') {
                Some(dir) => DirEntry {
                    name: dir.to_string(),
                    is_dir: true,
                    size: None,
                },
                None => DirEntry {
                    name: line.to_string(),
                    is_dir: false,
                    size: None,
                },
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn delete_file(&self, path: &str) -> Result<(), ExecutorError> {
        let target = self.resolve(path);
        self.run_checked(&format!("rm -- {}", shell_quote(&target)), path)
            .await?;
        Ok(())
    }

    fn mode(&self) -> ExecutorMode {
        ExecutorMode::Docker
    }

    fn cwd(&self) -> String {
        self.current_dir()
    }

    fn set_cwd(&self, cwd: &str) -> Result<(), ExecutorError> {
        let resolved = self.resolve(cwd);
        match self.cwd.write() {
            Ok(mut current) => *current = resolved,
            Err(poisoned) => *poisoned.into_inner() = resolved,
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ExecutorError> {
        let Some(id) = self.set_container_id(None) else {
            return Ok(());
        };
        if let Err(e) = self.runtime.stop_container(&id).await
            && !e.is_already_gone()
        {
            warn!(container = %id, "Failed to stop container: {}", e);
        }
        match self.runtime.remove_container(&id).await {
            Ok(()) => {
                info!(container = %id, "Container removed");
                Ok(())
            }
            Err(e) if e.is_already_gone() => Ok(()),
            Err(e) => Err(runtime_error(e)),
        }
    }
}

//! Host executor confined to a workspace directory.

use async_trait::async_trait;
use conductor_application::{DirEntry, ExecOptions, ExecOutput, Executor, ExecutorError, ExecutorMode};
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::RwLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs commands with `sh -c` on the host and touches files with
/// `tokio::fs`. Every path is resolved against the current directory and
/// must stay inside the workspace root.
pub struct NativeExecutor {
    workspace: PathBuf,
    /// Canonical workspace root, set by `initialize`
    root: RwLock<Option<PathBuf>>,
    cwd: RwLock<PathBuf>,
    default_timeout_ms: Option<u64>,
}

impl NativeExecutor {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let workspace = workspace.into();
        Self {
            cwd: RwLock::new(workspace.clone()),
            workspace,
            root: RwLock::new(None),
            default_timeout_ms: None,
        }
    }

    /// Timeout for commands that do not set their own.
    pub fn with_default_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.default_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    fn root(&self) -> Result<PathBuf, ExecutorError> {
        match self.root.read() {
            Ok(root) => root.clone().ok_or(ExecutorError::NotInitialized),
            Err(poisoned) => poisoned.into_inner().clone().ok_or(ExecutorError::NotInitialized),
        }
    }

    fn current_dir(&self) -> PathBuf {
        match self.cwd.read() {
            Ok(cwd) => cwd.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Absolute path for `path`, rejected when it leaves the root.
    ///
    /// `..` is resolved lexically; existing paths are also canonicalized so
    /// symlinks cannot point outside.
    fn resolve(&self, path: &str) -> Result<PathBuf, ExecutorError> {
        let root = self.root()?;
        let joined = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.current_dir().join(path)
        };
        let normalized = normalize(&joined);
        if !normalized.starts_with(&root) {
            return Err(ExecutorError::PathEscape(path.to_string()));
        }
        if let Ok(real) = std::fs::canonicalize(&normalized)
            && !real.starts_with(&root)
        {
            return Err(ExecutorError::PathEscape(path.to_string()));
        }
        Ok(normalized)
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn not_found_or_io(path: &str, e: std::io::Error) -> ExecutorError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ExecutorError::NotFound(path.to_string())
    } else {
        ExecutorError::Io(e)
    }
}

#[async_trait]
impl Executor for NativeExecutor {
    async fn initialize(&self) -> Result<(), ExecutorError> {
        let root = tokio::fs::canonicalize(&self.workspace)
            .await
            .map_err(|e| not_found_or_io(&self.workspace.display().to_string(), e))?;
        if !tokio::fs::metadata(&root).await?.is_dir() {
            return Err(ExecutorError::Runtime(format!(
                "workspace is not a directory: {}",
                root.display()
            )));
        }
        debug!(root = %root.display(), "Native executor ready");
        match self.cwd.write() {
            Ok(mut cwd) => *cwd = root.clone(),
            Err(poisoned) => *poisoned.into_inner() = root.clone(),
        }
        match self.root.write() {
            Ok(mut slot) => *slot = Some(root),
            Err(poisoned) => *poisoned.into_inner() = Some(root),
        }
        Ok(())
    }

    async fn execute(&self, command: &str, options: ExecOptions) -> Result<ExecOutput, ExecutorError> {
        let cwd = match &options.cwd {
            Some(dir) => self.resolve(dir)?,
            None => {
                self.root()?;
                self.current_dir()
            }
        };

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match options.timeout_ms.or(self.default_timeout_ms) {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    // dropping the wait future kills the child
                    warn!(timeout_ms = ms, command = %command, "Command timed out");
                    return Ok(ExecOutput::timed_out(
                        "",
                        format!("Command timed out after {}ms", ms),
                    ));
                }
            },
            None => child.wait_with_output().await?,
        };

        Ok(ExecOutput::new(
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
            output.status.code().unwrap_or(-1),
        ))
    }

    async fn read_file(&self, path: &str) -> Result<String, ExecutorError> {
        let resolved = self.resolve(path)?;
        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| not_found_or_io(path, e))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), ExecutorError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&resolved, content).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, ExecutorError> {
        let resolved = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&resolved).await?)
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<DirEntry>, ExecutorError> {
        let resolved = self.resolve(path)?;
        let mut reader = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| not_found_or_io(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size: metadata.is_file().then(|| metadata.len()),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn delete_file(&self, path: &str) -> Result<(), ExecutorError> {
        let resolved = self.resolve(path)?;
        tokio::fs::remove_file(&resolved)
            .await
            .map_err(|e| not_found_or_io(path, e))
    }

    fn mode(&self) -> ExecutorMode {
        ExecutorMode::Native
    }

    fn cwd(&self) -> String {
        self.current_dir().display().to_string()
    }

    fn set_cwd(&self, cwd: &str) -> Result<(), ExecutorError> {
        let resolved = self.resolve(cwd)?;
        if !resolved.is_dir() {
            return Err(ExecutorError::NotFound(cwd.to_string()));
        }
        match self.cwd.write() {
            Ok(mut current) => *current = resolved,
            Err(poisoned) => *poisoned.into_inner() = resolved,
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ExecutorError> {
        // nothing to release on the host
        Ok(())
    }
}

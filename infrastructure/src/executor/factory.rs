//! Builds one isolated executor per agent run.

use super::container::ContainerExecutor;
use super::native::NativeExecutor;
use super::runtime::{ContainerConfig, ContainerRuntime};
use conductor_application::{Executor, ExecutorError, ExecutorFactory, ExecutorMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

enum Backend {
    Native {
        workspace: PathBuf,
    },
    Docker {
        runtime: Arc<dyn ContainerRuntime>,
        config: ContainerConfig,
    },
}

pub struct DefaultExecutorFactory {
    backend: Backend,
    command_timeout_ms: Option<u64>,
    sequence: AtomicU64,
}

impl DefaultExecutorFactory {
    /// Native executors rooted at `workspace`.
    pub fn native(workspace: impl Into<PathBuf>) -> Self {
        Self::from_backend(Backend::Native {
            workspace: workspace.into(),
        })
    }

    /// One fresh container per run.
    pub fn docker(runtime: Arc<dyn ContainerRuntime>, config: ContainerConfig) -> Self {
        Self::from_backend(Backend::Docker { runtime, config })
    }

    fn from_backend(backend: Backend) -> Self {
        Self {
            backend,
            command_timeout_ms: None,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn with_command_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.command_timeout_ms = Some(timeout_ms);
        self
    }

    /// Bind-mount `host_dir` at the container's working directory.
    /// No effect for native executors.
    pub fn with_workspace_mount(mut self, host_dir: impl Into<PathBuf>) -> Self {
        if let Backend::Docker { config, .. } = &mut self.backend {
            let mount = format!("{}:{}", host_dir.into().display(), config.working_dir);
            config.volumes.push(mount);
        }
        self
    }

    fn container_name(&self, label: &str) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let label: String = label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .take(40)
            .collect();
        format!("conductor-{}-{}-{}", std::process::id(), seq, label)
    }
}

impl ExecutorFactory for DefaultExecutorFactory {
    fn create(&self, label: &str) -> Result<Arc<dyn Executor>, ExecutorError> {
        let executor: Arc<dyn Executor> = match &self.backend {
            Backend::Native { workspace } => {
                let mut executor = NativeExecutor::new(workspace.clone());
                if let Some(ms) = self.command_timeout_ms {
                    executor = executor.with_default_timeout_ms(ms);
                }
                Arc::new(executor)
            }
            Backend::Docker { runtime, config } => {
                let mut executor =
                    ContainerExecutor::new(runtime.clone(), config.clone(), self.container_name(label));
                if let Some(ms) = self.command_timeout_ms {
                    executor = executor.with_default_timeout_ms(ms);
                }
                Arc::new(executor)
            }
        };
        Ok(executor)
    }

    fn mode(&self) -> ExecutorMode {
        match self.backend {
            Backend::Native { .. } => ExecutorMode::Native,
            Backend::Docker { .. } => ExecutorMode::Docker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DockerCliRuntime;

    #[test]
    fn native_factory_reports_mode() {
        let factory = DefaultExecutorFactory::native("/tmp");
        let executor = factory.create("task-1").unwrap();
        assert_eq!(factory.mode(), ExecutorMode::Native);
        assert_eq!(executor.mode(), ExecutorMode::Native);
    }

    #[test]
    fn container_names_are_unique_and_sanitized() {
        let factory = DefaultExecutorFactory::docker(Arc::new(DockerCliRuntime::new()), ContainerConfig::default());
        let a = factory.container_name("task 1/a");
        let b = factory.container_name("task 1/a");
        assert_ne!(a, b);
        assert!(a.ends_with("task-1-a"));
        assert!(a.starts_with("conductor-"));
    }

    #[test]
    fn workspace_mount_targets_working_dir() {
        let factory = DefaultExecutorFactory::docker(Arc::new(DockerCliRuntime::new()), ContainerConfig::default())
            .with_workspace_mount("/home/me/project");
        let Backend::Docker { config, .. } = &factory.backend else {
            panic!("expected docker backend");
        };
        assert_eq!(config.volumes, vec!["/home/me/project:/workspace".to_string()]);
        assert_eq!(factory.mode(), ExecutorMode::Docker);
    }
}

//! Executors never observe each other's files: two native workspaces, two
//! containers, and native versus container.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use conductor_application::{ExecOptions, Executor, ExecutorError, ExecutorFactory, ExecutorMode};
use conductor_infrastructure::executor::{
    ContainerConfig, ContainerExecutor, ContainerRuntime, ContainerStatus, DefaultExecutorFactory,
    NativeExecutor, RawExecOutput, RuntimeError,
};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Longest single argument the kernel accepts (`MAX_ARG_STRLEN`).
const ARG_MAX: usize = 128 * 1024;

/// Container runtime keeping one in-memory filesystem per container and
/// understanding the handful of shell forms the container executor sends.
#[derive(Default)]
struct InMemoryRuntime {
    containers: Mutex<HashMap<String, BTreeMap<String, String>>>,
    next_id: AtomicUsize,
}

fn output(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> RawExecOutput {
    RawExecOutput::Separate {
        stdout: stdout.into().into_bytes(),
        stderr: stderr.into().into_bytes(),
        exit_code,
    }
}

impl InMemoryRuntime {
    fn container_count(&self) -> usize {
        self.containers.lock().unwrap().len()
    }

    fn interpret(files: &mut BTreeMap<String, String>, command: &str) -> RawExecOutput {
        let cat = Regex::new(r"^cat -- '([^']*)'$").unwrap();
        let test = Regex::new(r"^test -e '([^']*)'$").unwrap();
        let write = Regex::new(r"^mkdir -p -- '[^']*' && printf '%s' '([A-Za-z0-9+/=]*)' \| base64 -d > '([^']*)'$").unwrap();
        let append = Regex::new(r"^printf '%s' '([A-Za-z0-9+/=]*)' \| base64 -d >> '([^']*)'$").unwrap();
        let rm = Regex::new(r"^rm -- '([^']*)'$").unwrap();
        let ls = Regex::new(r"^ls -1Ap -- '([^']*)'$").unwrap();

        if command.len() > ARG_MAX {
            return output("", "sh: Argument list too long", 126);
        }
        if let Some(c) = cat.captures(command) {
            return match files.get(&c[1]) {
                Some(content) => output(content.clone(), "", 0),
                None => output("", format!("cat: {}: No such file or directory", &c[1]), 1),
            };
        }
        if let Some(c) = test.captures(command) {
            let prefix = format!("{}/", c[1].trim_end_matches('/'));
            let exists = files.contains_key(&c[1]) || files.keys().any(|k| k.starts_with(&prefix));
            return output("", "", if exists { 0 } else { 1 });
        }
        if let Some(c) = write.captures(command) {
            let content = String::from_utf8(BASE64.decode(&c[1]).unwrap()).unwrap();
            files.insert(c[2].to_string(), content);
            return output("", "", 0);
        }
        if let Some(c) = append.captures(command) {
            let content = String::from_utf8(BASE64.decode(&c[1]).unwrap()).unwrap();
            files.entry(c[2].to_string()).or_default().push_str(&content);
            return output("", "", 0);
        }
        if let Some(c) = rm.captures(command) {
            return match files.remove(&c[1]) {
                Some(_) => output("", "", 0),
                None => output("", format!("rm: cannot remove '{}': No such file or directory", &c[1]), 1),
            };
        }
        if let Some(c) = ls.captures(command) {
            let prefix = format!("{}/", c[1].trim_end_matches('/'));
            let mut names: Vec<String> = files
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .map(|rest| match rest.split_once('/') {
                    Some((dir, _)) => format!("{}/", dir),
                    None => rest.to_string(),
                })
                .collect();
            names.dedup();
            return output(names.join("\n"), "", 0);
        }
        output("", format!("sh: unsupported command: {}", command), 127)
    }
}

#[async_trait]
impl ContainerRuntime for InMemoryRuntime {
    async fn pull_image(&self, _image: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn image_exists(&self, _image: &str) -> Result<bool, RuntimeError> {
        Ok(true)
    }

    async fn create_container(&self, _name: &str, _config: &ContainerConfig) -> Result<String, RuntimeError> {
        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.containers.lock().unwrap().insert(id.clone(), BTreeMap::new());
        Ok(id)
    }

    async fn start_container(&self, _id: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn stop_container(&self, _id: &str) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        match self.containers.lock().unwrap().remove(id) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::NoSuchContainer(id.to_string())),
        }
    }

    async fn execute_command(
        &self,
        id: &str,
        command: &str,
        _options: &ExecOptions,
    ) -> Result<RawExecOutput, RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        let files = containers
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NoSuchContainer(id.to_string()))?;
        Ok(Self::interpret(files, command))
    }

    async fn container_status(&self, id: &str) -> Result<ContainerStatus, RuntimeError> {
        match self.containers.lock().unwrap().contains_key(id) {
            true => Ok(ContainerStatus::Running),
            false => Err(RuntimeError::NoSuchContainer(id.to_string())),
        }
    }
}

async fn native(dir: &tempfile::TempDir) -> NativeExecutor {
    let executor = NativeExecutor::new(dir.path());
    executor.initialize().await.unwrap();
    executor
}

#[tokio::test]
async fn native_workspaces_are_isolated() {
    let (dir_a, dir_b) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
    let (a, b) = (native(&dir_a).await, native(&dir_b).await);

    a.write_file("secret.txt", "from a").await.unwrap();

    assert!(a.exists("secret.txt").await.unwrap());
    assert!(!b.exists("secret.txt").await.unwrap());
    assert!(matches!(b.read_file("secret.txt").await, Err(ExecutorError::NotFound(_))));

    let relative = format!("../{}/secret.txt", dir_a.path().file_name().unwrap().to_string_lossy());
    assert!(matches!(b.read_file(&relative).await, Err(ExecutorError::PathEscape(_))));
}

#[tokio::test]
async fn containers_are_isolated_from_each_other() {
    let runtime = Arc::new(InMemoryRuntime::default());
    let a = ContainerExecutor::new(runtime.clone(), ContainerConfig::default(), "a");
    let b = ContainerExecutor::new(runtime.clone(), ContainerConfig::default(), "b");
    a.initialize().await.unwrap();
    b.initialize().await.unwrap();

    a.write_file("src/lib.rs", "pub fn a() {}").await.unwrap();

    assert_eq!(a.read_file("src/lib.rs").await.unwrap(), "pub fn a() {}");
    assert!(a.exists("src").await.unwrap());
    assert!(!b.exists("src/lib.rs").await.unwrap());
    assert!(matches!(b.read_file("src/lib.rs").await, Err(ExecutorError::NotFound(_))));

    let entries = a.list_dir("src").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "lib.rs");

    a.cleanup().await.unwrap();
    b.cleanup().await.unwrap();
    assert_eq!(runtime.container_count(), 0);
}

#[tokio::test]
async fn native_and_container_do_not_share_files() {
    let dir = tempfile::tempdir().unwrap();
    let host = native(&dir).await;
    let runtime = Arc::new(InMemoryRuntime::default());
    let container = ContainerExecutor::new(runtime, ContainerConfig::default(), "iso");
    container.initialize().await.unwrap();

    host.write_file("host.txt", "host").await.unwrap();
    container.write_file("box.txt", "box").await.unwrap();

    assert!(!container.exists("host.txt").await.unwrap());
    assert!(!host.exists("box.txt").await.unwrap());
    assert!(!dir.path().join("box.txt").exists());
    assert_eq!(host.mode(), ExecutorMode::Native);
    assert_eq!(container.mode(), ExecutorMode::Docker);

    container.delete_file("box.txt").await.unwrap();
    assert!(!container.exists("box.txt").await.unwrap());
    container.cleanup().await.unwrap();
}

#[tokio::test]
async fn large_container_write_round_trips() {
    let runtime = Arc::new(InMemoryRuntime::default());
    let executor = ContainerExecutor::new(runtime, ContainerConfig::default(), "big");
    executor.initialize().await.unwrap();
    let content = "line of generated code\n".repeat(10_000);

    executor.write_file("gen/out.rs", &content).await.unwrap();

    assert_eq!(executor.read_file("gen/out.rs").await.unwrap(), content);
    executor.write_file("gen/out.rs", "short").await.unwrap();
    assert_eq!(executor.read_file("gen/out.rs").await.unwrap(), "short");
    executor.cleanup().await.unwrap();
}

#[tokio::test]
async fn factory_hands_out_fresh_containers() {
    let runtime = Arc::new(InMemoryRuntime::default());
    let factory = DefaultExecutorFactory::docker(runtime.clone(), ContainerConfig::default());

    let first = factory.create("task-1").unwrap();
    let second = factory.create("task-2").unwrap();
    first.initialize().await.unwrap();
    second.initialize().await.unwrap();
    assert_eq!(runtime.container_count(), 2);

    first.write_file("out.txt", "1").await.unwrap();
    assert!(!second.exists("out.txt").await.unwrap());

    first.cleanup().await.unwrap();
    second.cleanup().await.unwrap();
    assert_eq!(runtime.container_count(), 0);
}

#[tokio::test]
async fn commands_fail_after_cleanup() {
    let runtime = Arc::new(InMemoryRuntime::default());
    let executor = ContainerExecutor::new(runtime, ContainerConfig::default(), "gone");
    executor.initialize().await.unwrap();
    executor.cleanup().await.unwrap();

    assert!(matches!(
        executor.execute("true", ExecOptions::default()).await,
        Err(ExecutorError::NotInitialized)
    ));
}

//! In-test doubles shared by the use case and service tests.

use crate::ports::executor::{DirEntry, ExecOptions, ExecOutput, Executor, ExecutorError, ExecutorFactory, ExecutorMode};
use crate::ports::llm_provider::{LlmProvider, ProviderError};
use crate::ports::tool::{Tool, ToolContext};
use async_trait::async_trait;
use conductor_domain::{ChatResponse, Message, RiskLevel, ToolCall, ToolDefinition, ToolParameter, ToolResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Provider replaying queued responses; answers `fallback` once empty.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    fallback: String,
    cost_per_token: f64,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            fallback: "done".to_string(),
            cost_per_token: 0.0,
            delay: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_results(results: Vec<Result<ChatResponse, ProviderError>>) -> Self {
        let provider = Self::new(Vec::new());
        *provider.responses.lock().unwrap() = results.into_iter().collect();
        provider
    }

    pub fn with_fallback(mut self, text: &str) -> Self {
        self.fallback = text.to_string();
        self
    }

    pub fn with_cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = cost;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat(&self, messages: &[Message], _tools: &[serde_json::Value]) -> Result<ChatResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(ChatResponse::from_text(self.fallback.clone())))
    }

    fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens + output_tokens) as f64 * self.cost_per_token
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_name(&self) -> &str {
        "test"
    }
}

/// A response that calls one tool.
pub fn tool_use(id: &str, tool: &str, input: serde_json::Value) -> ChatResponse {
    ChatResponse::default().with_tool_use(id, tool, input).with_usage(10, 5)
}

/// A response that calls `finish`.
pub fn finish(response: &str) -> ChatResponse {
    ChatResponse::default()
        .with_tool_use("fin", "finish", serde_json::json!({ "response": response }))
        .with_usage(10, 5)
}

/// Executor keeping files in memory; commands echo back.
#[derive(Default)]
pub struct MemoryExecutor {
    pub files: Mutex<HashMap<String, String>>,
    pub commands: Mutex<Vec<String>>,
    pub initialized: AtomicUsize,
    pub cleaned: AtomicUsize,
    pub fail_initialize: bool,
    pub cwd: Mutex<String>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self {
            cwd: Mutex::new("/workspace".to_string()),
            ..Default::default()
        }
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.files.lock().unwrap().insert(path.to_string(), content.to_string());
        self
    }
}

#[async_trait]
impl Executor for MemoryExecutor {
    async fn initialize(&self) -> Result<(), ExecutorError> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize {
            return Err(ExecutorError::Runtime("boom".into()));
        }
        Ok(())
    }

    async fn execute(&self, command: &str, _options: ExecOptions) -> Result<ExecOutput, ExecutorError> {
        self.commands.lock().unwrap().push(command.to_string());
        Ok(ExecOutput::new(format!("ran: {}", command), "", 0))
    }

    async fn read_file(&self, path: &str) -> Result<String, ExecutorError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ExecutorError::NotFound(path.to_string()))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<(), ExecutorError> {
        self.files.lock().unwrap().insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, ExecutorError> {
        Ok(self.files.lock().unwrap().contains_key(path))
    }

    async fn list_dir(&self, _path: &str) -> Result<Vec<DirEntry>, ExecutorError> {
        let mut entries: Vec<DirEntry> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(name, content)| DirEntry {
                name: name.clone(),
                is_dir: false,
                size: Some(content.len() as u64),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn delete_file(&self, path: &str) -> Result<(), ExecutorError> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ExecutorError::NotFound(path.to_string()))
    }

    fn mode(&self) -> ExecutorMode {
        ExecutorMode::Native
    }

    fn cwd(&self) -> String {
        self.cwd.lock().unwrap().clone()
    }

    fn set_cwd(&self, cwd: &str) -> Result<(), ExecutorError> {
        *self.cwd.lock().unwrap() = cwd.to_string();
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ExecutorError> {
        self.cleaned.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory handing out fresh [`MemoryExecutor`]s and remembering them.
#[derive(Default)]
pub struct MemoryExecutorFactory {
    pub created: Mutex<Vec<(String, Arc<MemoryExecutor>)>>,
}

impl ExecutorFactory for MemoryExecutorFactory {
    fn create(&self, label: &str) -> Result<Arc<dyn Executor>, ExecutorError> {
        let executor = Arc::new(MemoryExecutor::new());
        self.created
            .lock()
            .unwrap()
            .push((label.to_string(), executor.clone()));
        Ok(executor)
    }

    fn mode(&self) -> ExecutorMode {
        ExecutorMode::Native
    }
}

/// Tool that reads and writes through the executor, with a configurable risk.
pub struct FileTool {
    definition: ToolDefinition,
}

impl FileTool {
    pub fn read() -> Self {
        Self {
            definition: ToolDefinition::new("read_file", "Read a file", RiskLevel::Low)
                .with_parameter(ToolParameter::new("path", "File path", true).with_type("path")),
        }
    }

    pub fn write() -> Self {
        Self {
            definition: ToolDefinition::new("write_file", "Write a file", RiskLevel::Medium)
                .with_parameter(ToolParameter::new("path", "File path", true).with_type("path"))
                .with_parameter(ToolParameter::new("content", "Content", true)),
        }
    }
}

#[async_trait]
impl Tool for FileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let path = call.get_string("path").unwrap_or_default();
        let outcome = match call.get_string("content") {
            Some(content) => ctx.executor.write_file(path, content).await.map(|_| "written".to_string()),
            None => ctx.executor.read_file(path).await,
        };
        match outcome {
            Ok(text) => ToolResult::success(&self.definition.name, text).with_path(path),
            Err(e) => ToolResult::failure(
                &self.definition.name,
                conductor_domain::ToolError::execution_failed(e.to_string()),
            ),
        }
    }
}

/// Tool running its `command` argument through the executor.
pub struct CommandTool {
    definition: ToolDefinition,
}

impl CommandTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new("run_command", "Run a shell command", RiskLevel::Medium)
                .with_parameter(ToolParameter::new("command", "Command", true)),
        }
    }
}

#[async_trait]
impl Tool for CommandTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let command = call.get_string("command").unwrap_or_default();
        match ctx.executor.execute(command, ExecOptions::default()).await {
            Ok(out) => ToolResult::success("run_command", out.stdout),
            Err(e) => ToolResult::failure(
                "run_command",
                conductor_domain::ToolError::execution_failed(e.to_string()),
            ),
        }
    }
}

/// Tool whose body panics.
pub struct PanickingTool {
    definition: ToolDefinition,
}

impl PanickingTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new("explode", "Always panics", RiskLevel::Low),
        }
    }
}

#[async_trait]
impl Tool for PanickingTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _call: &ToolCall, _ctx: &ToolContext) -> ToolResult {
        panic!("tool exploded")
    }
}

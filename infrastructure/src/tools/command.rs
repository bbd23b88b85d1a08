//! Command execution tool: run_command

use super::{executor_failure, truncate_output};
use async_trait::async_trait;
use conductor_application::{ExecOptions, ExecOutput, Tool, ToolContext};
use conductor_domain::tool::{
    entities::{RiskLevel, ToolCall, ToolDefinition, ToolParameter},
    value_objects::{ToolError, ToolResult, ToolResultMetadata},
};
use std::time::Instant;
use tracing::debug;

pub const RUN_COMMAND: &str = "run_command";

pub struct RunCommandTool {
    definition: ToolDefinition,
}

impl RunCommandTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                RUN_COMMAND,
                "Execute a shell command and return its output. A non-zero exit code is reported, not treated as an error.",
                RiskLevel::Medium,
            )
            .with_parameter(ToolParameter::new("command", "The command to execute", true).with_type("string"))
            .with_parameter(
                ToolParameter::new("working_dir", "Working directory for the command", false).with_type("path"),
            )
            .with_parameter(
                ToolParameter::new("timeout_ms", "Timeout in milliseconds", false).with_type("integer"),
            ),
        }
    }
}

impl Default for RunCommandTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Stdout, then stderr under a separator.
pub(crate) fn combine_output(output: &ExecOutput) -> String {
    let mut combined = output.stdout.clone();
    if !output.stderr.is_empty() {
        if !combined.is_empty() {
            combined.push_str("\n--- stderr ---\n");
        }
        combined.push_str(&output.stderr);
    }
    combined
}

#[async_trait]
impl Tool for RunCommandTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let started = Instant::now();
        let command = match call.require_string("command") {
            Ok(c) => c,
            Err(e) => return ToolResult::failure(RUN_COMMAND, ToolError::invalid_argument(e)),
        };

        let timeout_ms = call
            .get_i64("timeout_ms")
            .filter(|ms| *ms > 0)
            .map(|ms| ms as u64)
            .or(ctx.command_timeout_ms);
        let options = ExecOptions {
            cwd: call.get_string("working_dir").map(str::to_string),
            timeout_ms,
        };

        debug!(command = %command, cwd = %ctx.cwd(), "Running command");
        let output = match ctx.executor.execute(command, options).await {
            Ok(o) => o,
            Err(e) => return executor_failure(RUN_COMMAND, call.get_string("working_dir").unwrap_or("."), e),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        if output.timed_out {
            return ToolResult::failure(
                RUN_COMMAND,
                ToolError::timeout(format!(
                    "Command timed out after {}ms: {}",
                    timeout_ms.unwrap_or_default(),
                    command
                )),
            )
            .with_duration(duration_ms);
        }

        let combined = truncate_output(combine_output(&output));
        let text = if output.exit_code == 0 {
            combined
        } else {
            format!("Command exited with code {}\n{}", output.exit_code, combined)
        };

        ToolResult::success(RUN_COMMAND, text.as_str()).with_metadata(ToolResultMetadata {
            duration_ms: Some(duration_ms),
            bytes: Some(text.len()),
            exit_code: Some(output.exit_code),
            ..Default::default()
        })
    }
}

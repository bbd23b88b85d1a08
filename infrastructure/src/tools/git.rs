//! Read-only git tools: git_status, git_diff

use super::command::combine_output;
use super::{executor_failure, truncate_output};
use crate::executor::shell_quote;
use async_trait::async_trait;
use conductor_application::{ExecOptions, Tool, ToolContext};
use conductor_domain::tool::{
    entities::{RiskLevel, ToolCall, ToolDefinition, ToolParameter},
    value_objects::{ToolError, ToolResult, ToolResultMetadata},
};

pub const GIT_STATUS: &str = "git_status";
pub const GIT_DIFF: &str = "git_diff";

/// Run a git command and turn a non-zero exit into a failure.
async fn run_git(tool: &str, command: String, ctx: &ToolContext) -> ToolResult {
    let options = ExecOptions {
        cwd: None,
        timeout_ms: ctx.command_timeout_ms,
    };
    let output = match ctx.executor.execute(&command, options).await {
        Ok(o) => o,
        Err(e) => return executor_failure(tool, ".", e),
    };
    if output.timed_out {
        return ToolResult::failure(tool, ToolError::timeout(command));
    }
    if output.exit_code != 0 {
        return ToolResult::failure(
            tool,
            ToolError::execution_failed(format!("git exited with code {}", output.exit_code))
                .with_details(output.stderr.trim().to_string()),
        );
    }

    let text = truncate_output(combine_output(&output));
    ToolResult::success(tool, text.as_str()).with_metadata(ToolResultMetadata {
        bytes: Some(text.len()),
        exit_code: Some(0),
        ..Default::default()
    })
}

pub struct GitStatusTool {
    definition: ToolDefinition,
}

impl GitStatusTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                GIT_STATUS,
                "Show the working tree status (short format with branch)",
                RiskLevel::Low,
            ),
        }
    }
}

impl Default for GitStatusTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GitStatusTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        run_git(GIT_STATUS, "git status --short --branch".to_string(), ctx).await
    }
}

pub struct GitDiffTool {
    definition: ToolDefinition,
}

impl GitDiffTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(GIT_DIFF, "Show uncommitted changes as a unified diff", RiskLevel::Low)
                .with_parameter(
                    ToolParameter::new("path", "Limit the diff to this path", false).with_type("path"),
                )
                .with_parameter(
                    ToolParameter::new("staged", "Show staged changes instead of the working tree", false)
                        .with_type("boolean"),
                ),
        }
    }
}

impl Default for GitDiffTool {
    fn default() -> Self {
        Self::new()
    }
}

/// The `git diff` invocation for a call.
fn diff_command(call: &ToolCall) -> String {
    let mut command = "git --no-pager diff --no-color".to_string();
    if call.get_bool("staged").unwrap_or(false) {
        command.push_str(" --cached");
    }
    if let Some(path) = call.get_string("path") {
        command.push_str(" -- ");
        command.push_str(&shell_quote(path));
    }
    command
}

#[async_trait]
impl Tool for GitDiffTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let mut result = run_git(GIT_DIFF, diff_command(call), ctx).await;
        if result.is_success() && result.to_observation_text().is_empty() {
            result.output = Some("No changes".into());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context;
    use conductor_domain::tool::value_objects::codes;

    #[test]
    fn diff_command_quotes_path() {
        let call = ToolCall::new(GIT_DIFF)
            .with_arg("path", "src/it's.rs")
            .with_arg("staged", true);
        assert_eq!(
            diff_command(&call),
            r"git --no-pager diff --no-color --cached -- 'src/it'\''s.rs'"
        );
        assert_eq!(diff_command(&ToolCall::new(GIT_DIFF)), "git --no-pager diff --no-color");
    }

    #[tokio::test]
    async fn status_outside_a_repository_fails() {
        let (_dir, ctx) = context().await;
        // git missing entirely also yields a non-zero exit from the shell
        let result = GitStatusTool::new().execute(&ToolCall::new(GIT_STATUS), &ctx).await;
        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code, codes::EXECUTION_FAILED);
    }

    #[test]
    fn git_tools_are_read_only() {
        assert!(GitStatusTool::new().definition().is_read_only());
        assert!(GitDiffTool::new().definition().is_read_only());
    }
}

//! Built-in tools
//!
//! Every tool performs its side effects through the [`Executor`] in its
//! [`ToolContext`](conductor_application::ToolContext), so the same tools
//! work on the host and inside a container.
//!
//! [`Executor`]: conductor_application::Executor

pub mod command;
pub mod file;
pub mod git;
pub mod search;

use conductor_application::{ExecutorError, ToolRegistry};
use conductor_domain::util::truncate_str;
use conductor_domain::{ToolError, ToolResult};
use std::sync::Arc;

pub use command::RunCommandTool;
pub use file::{DeleteFileTool, ListDirTool, ReadFileTool, WriteFileTool};
pub use git::{GitDiffTool, GitStatusTool};
pub use search::{GlobSearchTool, GrepSearchTool};

/// Maximum size of any tool output handed back to the model (1 MiB)
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Registry with every built-in tool and the default aliases.
pub fn builtin_tools() -> ToolRegistry {
    ToolRegistry::new()
        .register(Arc::new(ReadFileTool::new()))
        .register(Arc::new(WriteFileTool::new()))
        .register(Arc::new(ListDirTool::new()))
        .register(Arc::new(DeleteFileTool::new()))
        .register(Arc::new(RunCommandTool::new()))
        .register(Arc::new(GlobSearchTool::new()))
        .register(Arc::new(GrepSearchTool::new()))
        .register(Arc::new(GitStatusTool::new()))
        .register(Arc::new(GitDiffTool::new()))
        .with_default_aliases()
}

/// Cut `output` to [`MAX_OUTPUT_BYTES`] on a char boundary, marking the cut.
pub(crate) fn truncate_output(mut output: String) -> String {
    if output.len() <= MAX_OUTPUT_BYTES {
        return output;
    }
    let end = truncate_str(&output, MAX_OUTPUT_BYTES).len();
    output.truncate(end);
    output.push_str("\n... (output truncated)");
    output
}

/// Map an executor error to a failed tool result.
pub(crate) fn executor_failure(tool: &str, path: &str, error: ExecutorError) -> ToolResult {
    let error = match error {
        ExecutorError::NotFound(_) => ToolError::not_found(path),
        ExecutorError::PathEscape(p) => {
            ToolError::permission_denied(format!("'{}' is outside the workspace", p))
        }
        ExecutorError::Timeout(ms) => ToolError::timeout(format!("{} after {}ms", tool, ms)),
        other => ToolError::execution_failed(other.to_string()),
    };
    ToolResult::failure(tool, error)
}

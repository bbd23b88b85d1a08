//! File tools: read_file, write_file, list_dir, delete_file

use super::{executor_failure, truncate_output};
use async_trait::async_trait;
use conductor_application::{Tool, ToolContext};
use conductor_domain::tool::{
    entities::{RiskLevel, ToolCall, ToolDefinition, ToolParameter},
    value_objects::{ToolError, ToolResult, ToolResultMetadata},
};

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_DIR: &str = "list_dir";
pub const DELETE_FILE: &str = "delete_file";

pub struct ReadFileTool {
    definition: ToolDefinition,
}

impl ReadFileTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                READ_FILE,
                "Read the contents of a file at the specified path",
                RiskLevel::Low,
            )
            .with_parameter(ToolParameter::new("path", "Path to the file to read", true).with_type("path"))
            .with_parameter(
                ToolParameter::new("offset", "Line number to start reading from (0-indexed)", false)
                    .with_type("integer"),
            )
            .with_parameter(
                ToolParameter::new("limit", "Maximum number of lines to read", false).with_type("integer"),
            ),
        }
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Select `limit` lines starting at `offset`.
fn slice_lines(content: &str, offset: usize, limit: Option<usize>) -> String {
    let lines = content.lines().skip(offset);
    match limit {
        Some(limit) => lines.take(limit).collect::<Vec<_>>().join("\n"),
        None => lines.collect::<Vec<_>>().join("\n"),
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let path = match call.require_string("path") {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(READ_FILE, ToolError::invalid_argument(e)),
        };

        let content = match ctx.executor.read_file(path).await {
            Ok(c) => c,
            Err(e) => return executor_failure(READ_FILE, path, e),
        };

        let offset = call.get_i64("offset").unwrap_or(0).max(0) as usize;
        let limit = call.get_i64("limit").map(|l| l.max(0) as usize);
        let output = if offset > 0 || limit.is_some() {
            slice_lines(&content, offset, limit)
        } else {
            content
        };
        let output = truncate_output(output);

        ToolResult::success(READ_FILE, output.as_str()).with_metadata(ToolResultMetadata {
            bytes: Some(output.len()),
            path: Some(path.to_string()),
            ..Default::default()
        })
    }
}

pub struct WriteFileTool {
    definition: ToolDefinition,
}

impl WriteFileTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                WRITE_FILE,
                "Write content to a file. Creates the file and any missing parent directories, or overwrites it.",
                RiskLevel::Medium,
            )
            .with_parameter(ToolParameter::new("path", "Path to the file to write", true).with_type("path"))
            .with_parameter(
                ToolParameter::new("content", "Content to write to the file", true).with_type("string"),
            ),
        }
    }
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let (path, content) = match (call.require_string("path"), call.require_string("content")) {
            (Ok(p), Ok(c)) => (p, c),
            (Err(e), _) | (_, Err(e)) => {
                return ToolResult::failure(WRITE_FILE, ToolError::invalid_argument(e));
            }
        };

        if let Err(e) = ctx.executor.write_file(path, content).await {
            return executor_failure(WRITE_FILE, path, e);
        }

        ToolResult::success(WRITE_FILE, format!("Wrote {} bytes to {}", content.len(), path)).with_metadata(
            ToolResultMetadata {
                bytes: Some(content.len()),
                path: Some(path.to_string()),
                ..Default::default()
            },
        )
    }
}

pub struct ListDirTool {
    definition: ToolDefinition,
}

impl ListDirTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(
                LIST_DIR,
                "List the entries of a directory. Directories are shown with a trailing '/'.",
                RiskLevel::Low,
            )
            .with_parameter(
                ToolParameter::new("path", "Directory to list (default: current directory)", false)
                    .with_type("path"),
            ),
        }
    }
}

impl Default for ListDirTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ListDirTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let path = call.get_string("path").unwrap_or(".");
        let entries = match ctx.executor.list_dir(path).await {
            Ok(entries) => entries,
            Err(e) => return executor_failure(LIST_DIR, path, e),
        };

        let count = entries.len();
        let output = if entries.is_empty() {
            "(empty directory)".to_string()
        } else {
            entries
                .iter()
                .map(|entry| match (entry.is_dir, entry.size) {
                    (true, _) => format!("{}/", entry.name),
                    (false, Some(size)) => format!("{} ({} bytes)", entry.name, size),
                    (false, None) => entry.name.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        ToolResult::success(LIST_DIR, truncate_output(output)).with_metadata(ToolResultMetadata {
            path: Some(path.to_string()),
            match_count: Some(count),
            ..Default::default()
        })
    }
}

pub struct DeleteFileTool {
    definition: ToolDefinition,
}

impl DeleteFileTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition::new(DELETE_FILE, "Delete a single file", RiskLevel::High)
                .with_parameter(
                    ToolParameter::new("path", "Path to the file to delete", true).with_type("path"),
                ),
        }
    }
}

impl Default for DeleteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let path = match call.require_string("path") {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(DELETE_FILE, ToolError::invalid_argument(e)),
        };

        match ctx.executor.delete_file(path).await {
            Ok(()) => ToolResult::success(DELETE_FILE, format!("Deleted {}", path)).with_path(path),
            Err(e) => executor_failure(DELETE_FILE, path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context;
    use conductor_domain::tool::value_objects::codes;
    use serde_json::json;

    #[tokio::test]
    async fn write_then_read_with_offset_and_limit() {
        let (_dir, ctx) = context().await;
        let write = ToolCall::new(WRITE_FILE)
            .with_arg("path", "notes/todo.txt")
            .with_arg("content", "one\ntwo\nthree\nfour");
        let result = WriteFileTool::new().execute(&write, &ctx).await;
        assert!(result.is_success());
        assert_eq!(result.metadata.bytes, Some(18));

        let read = ToolCall::new(READ_FILE)
            .with_arg("path", "notes/todo.txt")
            .with_arg("offset", json!(1))
            .with_arg("limit", json!(2));
        let result = ReadFileTool::new().execute(&read, &ctx).await;
        assert_eq!(result.to_observation_text(), "two\nthree");
        assert_eq!(result.metadata.path.as_deref(), Some("notes/todo.txt"));
    }

    #[tokio::test]
    async fn offset_past_end_is_empty() {
        let (_dir, ctx) = context().await;
        ctx.executor.write_file("a.txt", "x\ny").await.unwrap();
        let call = ToolCall::new(READ_FILE).with_arg("path", "a.txt").with_arg("offset", json!(10));
        let result = ReadFileTool::new().execute(&call, &ctx).await;
        assert_eq!(result.to_observation_text(), "");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let (_dir, ctx) = context().await;
        let call = ToolCall::new(READ_FILE).with_arg("path", "nope.txt");
        let result = ReadFileTool::new().execute(&call, &ctx).await;
        assert!(!result.is_success());
        assert_eq!(result.error().unwrap().code, codes::NOT_FOUND);
    }

    #[tokio::test]
    async fn escaping_the_workspace_is_denied() {
        let (_dir, ctx) = context().await;
        let call = ToolCall::new(READ_FILE).with_arg("path", "../../etc/passwd");
        let result = ReadFileTool::new().execute(&call, &ctx).await;
        assert!(result.error().unwrap().is_permission_denied());
    }

    #[tokio::test]
    async fn list_dir_marks_directories() {
        let (_dir, ctx) = context().await;
        ctx.executor.write_file("src/main.rs", "fn main() {}").await.unwrap();
        ctx.executor.write_file("README.md", "hi").await.unwrap();

        let result = ListDirTool::new().execute(&ToolCall::new(LIST_DIR), &ctx).await;
        assert_eq!(result.to_observation_text(), "README.md (2 bytes)\nsrc/");
        assert_eq!(result.metadata.match_count, Some(2));
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let (dir, ctx) = context().await;
        ctx.executor.write_file("tmp.txt", "x").await.unwrap();

        let call = ToolCall::new(DELETE_FILE).with_arg("path", "tmp.txt");
        assert!(DeleteFileTool::new().execute(&call, &ctx).await.is_success());
        assert!(!dir.path().join("tmp.txt").exists());

        let again = DeleteFileTool::new().execute(&call, &ctx).await;
        assert_eq!(again.error().unwrap().code, codes::NOT_FOUND);
    }

    #[test]
    fn delete_is_high_risk() {
        assert_eq!(DeleteFileTool::new().definition().risk_level, RiskLevel::High);
        assert!(ReadFileTool::new().definition().is_read_only());
    }
}

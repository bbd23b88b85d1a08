//! Tool domain value objects: immutable result and error types
//!
//! A tool call is binary: it either succeeds with a structured output payload
//! or fails with a [`ToolError`]. There is no partial-success representation.
//! Failed results are fed back to the agent as observations, so the error code
//! tells the model what kind of correction is possible.

use serde::{Deserialize, Serialize};

/// Error codes carried by [`ToolError::code`].
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const EXECUTION_FAILED: &str = "EXECUTION_FAILED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
    pub const TIMEOUT: &str = "TIMEOUT";
}

/// Error that occurred during tool execution.
///
/// | Code | Description |
/// |------|-------------|
/// | `INVALID_ARGUMENT` | Missing/wrong parameters, the model can fix |
/// | `NOT_FOUND` | Unknown tool or resource |
/// | `EXECUTION_FAILED` | Runtime failure (I/O error, non-zero exit) |
/// | `PERMISSION_DENIED` | Blocked by the permission gate |
/// | `TIMEOUT` | Operation timed out |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "PERMISSION_DENIED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(codes::NOT_FOUND, format!("{} not found", resource.into()))
    }

    pub fn tool_not_found(name: &str) -> Self {
        Self::new(codes::NOT_FOUND, format!("Tool '{}' not found", name))
    }

    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::new(
            codes::PERMISSION_DENIED,
            format!("Permission denied: {}", reason.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_ARGUMENT, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(codes::EXECUTION_FAILED, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            codes::TIMEOUT,
            format!("Operation timed out: {}", operation.into()),
        )
    }

    pub fn is_permission_denied(&self) -> bool {
        self.code == codes::PERMISSION_DENIED
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Structured output payload (successful execution only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Error information (failed execution only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Metadata about the execution
    #[serde(default)]
    pub metadata: ToolResultMetadata,
}

/// Structured metadata about tool execution.
///
/// | Tool | `duration_ms` | `bytes` | `path` | `exit_code` | `match_count` |
/// |------|:---:|:---:|:---:|:---:|:---:|
/// | `read_file` | - | yes | yes | - | - |
/// | `write_file` | - | yes | yes | - | - |
/// | `run_command` | yes | yes | - | yes | - |
/// | `glob_search` | yes | - | - | - | yes |
/// | `grep_search` | yes | - | - | yes | yes |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
}

impl ToolResult {
    /// Create a successful result with a structured payload
    pub fn success(tool_name: impl Into<String>, output: impl Into<serde_json::Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output.into()),
            error: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            metadata: ToolResultMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ToolResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.metadata.path = Some(path.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&serde_json::Value> {
        self.output.as_ref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Render the result as the text fed back to the model.
    ///
    /// String payloads are returned verbatim; structured payloads are
    /// serialized as JSON. Failures are prefixed with `Error:`.
    pub fn to_observation_text(&self) -> String {
        match (&self.output, &self.error) {
            (_, Some(err)) if !self.success => format!("Error: {}", err),
            (Some(serde_json::Value::String(s)), _) => s.clone(),
            (Some(value), _) => value.to_string(),
            (None, _) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_error() {
        let err = ToolError::not_found("/path/to/file").with_details("File does not exist");

        assert_eq!(err.code, codes::NOT_FOUND);
        assert!(err.message.contains("/path/to/file"));
        assert!(err.details.is_some());
    }

    #[test]
    fn test_tool_not_found_message() {
        let err = ToolError::tool_not_found("nonexistent_tool");
        assert!(err.message.contains("not found"));
        assert!(err.message.contains("nonexistent_tool"));
    }

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("read_file", json!({"content": "hi"}))
            .with_path("/test/file.txt");

        assert!(result.is_success());
        assert_eq!(result.output().unwrap()["content"], "hi");
        assert!(result.error().is_none());
        assert_eq!(result.metadata.path, Some("/test/file.txt".to_string()));
    }

    #[test]
    fn test_tool_result_failure() {
        let result = ToolResult::failure("write_file", ToolError::permission_denied("/etc/passwd"));

        assert!(!result.is_success());
        assert!(result.output().is_none());
        assert!(result.error().unwrap().is_permission_denied());
    }

    #[test]
    fn test_observation_text() {
        assert_eq!(ToolResult::success("t", "plain").to_observation_text(), "plain");
        assert_eq!(
            ToolResult::success("t", json!({"a": 1})).to_observation_text(),
            r#"{"a":1}"#
        );
        let failed = ToolResult::failure("t", ToolError::timeout("sleep"));
        assert!(failed.to_observation_text().starts_with("Error: [TIMEOUT]"));
    }
}

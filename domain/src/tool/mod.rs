//! Tool domain module
//!
//! Defines how agents interact with their execution environment (file I/O,
//! commands, searches) in a validated, risk-aware manner.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolSpec     │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (catalogue)  │    │ (invocation) │    │ (output)     │
//! └──────┬───────┘    └──────────────┘    └──────────────┘
//!        │
//!        ├─ aliases: "bash" → "run_command"
//!        └─ tools:   "run_command" → ToolDefinition
//! ```
//!
//! Each definition carries a base [`RiskLevel`]; the permission subdomain
//! escalates it per call based on the actual arguments.
//!
//! The async `Tool` trait and the `ToolRegistry` that dispatches calls live in
//! the application layer; concrete tools live in infrastructure and perform all
//! side effects through an `Executor`.

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::{RiskLevel, ToolCall, ToolDefinition, ToolParameter, ToolSpec};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolResult, ToolResultMetadata};

/// Name of the built-in completion tool every agent is offered.
pub const FINISH_TOOL: &str = "finish";

/// Definition of the explicit completion signal.
pub fn finish_tool_definition() -> ToolDefinition {
    ToolDefinition::new(
        FINISH_TOOL,
        "Call when the task is complete. Provide the final answer in `response`.",
        RiskLevel::Low,
    )
    .with_parameter(ToolParameter::new(
        "response",
        "Final answer or summary of the work done",
        true,
    ))
}

//! Permission subdomain: risk assessment and acceptance policy.
//!
//! Every tool call passes through this gate between the agent's "act" phase
//! and the tool registry:
//!
//! ```text
//! ToolCall ──▶ RiskAssessor::assess ──▶ PermissionRequest ──▶ PermissionPolicy::evaluate
//!                                                               ├─ Allow → dispatch
//!                                                               ├─ Deny  → failed ToolResult
//!                                                               └─ Ask   → PermissionPrompt port
//! ```
//!
//! Both pieces are pure; logging and the interactive prompt live in the
//! application layer's `PermissionManager`.

pub mod policy;
pub mod risk;

pub use policy::{
    PermissionContext, PermissionDecision, PermissionPolicy, PermissionRequest, PermissionResult,
};
pub use risk::{RiskAssessor, RiskRule, RuleTarget};

//! Workflow domain: decomposed task graphs and their shared run context.
//!
//! ```text
//! provider text ──▶ plan_parser ──▶ WorkflowPlan ──validate()──▶ orchestrator
//!                        │                                          │
//!                        └── fallback_plan (single task)            ▼
//!                                                            WorkflowContext
//! ```

pub mod context;
pub mod entities;
pub mod plan_parser;

pub use context::{SharedState, WorkflowContext};
pub use entities::{ExecutionMode, PlanError, WorkflowPlan, WorkflowTask};
pub use plan_parser::{extract_json_block, fallback_plan, parse_workflow_plan, parse_workflow_plan_json};

//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod decompose_task;
pub mod run_agent;
pub mod run_workflow;
pub(crate) mod shared;

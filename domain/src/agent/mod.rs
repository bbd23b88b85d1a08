//! Agent domain: the data a ReAct loop produces and consumes.
//!
//! The loop itself lives in the application layer; everything here is plain
//! data so a paused run can be serialised and later re-bound to fresh
//! collaborators.
//!
//! - [`AgentConfig`] / [`AgentConfigPatch`]: settings and explicit updates
//! - [`AgentBudget`] / [`BudgetUsage`]: caps checked at iteration boundaries
//! - [`AgentStep`] / [`AgentResult`]: append-only history and terminal summary
//! - [`AgentState`]: pause/resume payload
//! - [`AgentEvent`]: observational stream for UIs and logs

pub mod budget;
pub mod entities;
pub mod event;
pub mod value_objects;

pub use budget::{AgentBudget, BudgetUsage, BudgetViolation};
pub use entities::{
    AgentAction, AgentConfig, AgentConfigPatch, AgentResult, AgentState, AgentStatus, AgentStep,
    ToolExchange,
};
pub use event::{AgentEvent, AgentEventKind};
pub use value_objects::AgentId;

//! Roles: capability profiles for specialised agents.
//!
//! A [`RoleConfig`] restricts which tools an agent may call (coarse
//! [`ToolAccessLevel`] plus explicit allow and deny lists), and carries a
//! default budget, a model hint and a system prompt addendum.
//!
//! The [`RoleRegistry`] also holds the [`EnforcementRule`]s that inject
//! mandatory follow-up tasks into plans, and the [`LoopPattern`]s that bound
//! repeated hand-offs between roles. [`EnforcementEngine`] applies both.

pub mod builtin;
pub mod enforcement;
pub mod entities;
pub mod registry;

pub use enforcement::{
    EnforcementAddition, EnforcementCheck, EnforcementEngine, EnforcementRule, EnforcementTiming,
    EnforcementTrigger, LoopMatch, LoopPattern, StateCondition, TriggerCategory,
};
pub use entities::{AgentRole, RoleConfig, ToolAccessLevel};
pub use registry::{RoleError, RoleRegistry};

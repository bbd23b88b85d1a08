//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod event_sink;
pub mod executor;
pub mod llm_provider;
pub mod permission_prompt;
pub mod tool;

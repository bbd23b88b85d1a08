//! Prompt domain
//!
//! Templates for the agent loop and for task decomposition.

pub mod agent;
pub mod decomposer;

pub use agent::AgentPromptTemplate;
pub use decomposer::DecomposerPromptTemplate;

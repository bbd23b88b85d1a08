//! LLM provider adapters
//!
//! Vendor clients are external crates implementing
//! [`LlmProvider`](conductor_application::LlmProvider); this module holds
//! the replay provider used for dry runs and tests.

mod scripted;

pub use scripted::{ScriptError, ScriptedProvider};

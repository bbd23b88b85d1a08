//! Conversation domain.
//!
//! - [`entities::Message`]: a single message sent to a provider
//! - [`response::ChatResponse`]: a provider reply (text and tool-use blocks)

pub mod entities;
pub mod response;

pub use entities::{Message, Role};
pub use response::{ChatResponse, ContentBlock, StopReason, TokenUsage};

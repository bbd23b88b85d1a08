//! Logging infrastructure: structured agent event logging.
//!
//! Provides [`JsonlEventLogger`], a JSONL file writer that implements the
//! [`AgentEventSink`](conductor_application::AgentEventSink) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlEventLogger;

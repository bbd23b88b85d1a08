//! Application services shared by the use cases.

pub mod executor_guard;
pub mod permission_manager;
pub mod tool_registry;

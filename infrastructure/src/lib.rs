//! Infrastructure layer for conductor
//!
//! Adapters implementing the ports defined in the application layer:
//! native and container executors, the docker CLI runtime, built-in tools,
//! configuration loading, the JSONL event log and the scripted provider.

pub mod config;
pub mod executor;
pub mod logging;
pub mod providers;
pub mod tools;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, FileConfig, PromptMode};
pub use executor::{
    ContainerConfig, ContainerExecutor, ContainerRuntime, DefaultExecutorFactory, DockerCliRuntime,
    NativeExecutor, NetworkMode, RuntimeError,
};
pub use logging::JsonlEventLogger;
pub use providers::{ScriptError, ScriptedProvider};
pub use tools::builtin_tools;

//! Configuration loading for conductor
//!
//! Sources are merged with [figment](https://docs.rs/figment), lowest
//! priority first:
//!
//! 1. Default values
//! 2. Global: `$XDG_CONFIG_HOME/conductor/config.toml`
//! 3. Project root: `./conductor.toml` or `./.conductor.toml`
//! 4. `--config <path>` specified file
//! 5. `CONDUCTOR_*` environment variables (`CONDUCTOR_EXECUTOR__MODE=docker`)

mod file_config;
mod loader;

pub use file_config::{
    FileAgentConfig, FileConfig, FileExecutorConfig, FileLoggingConfig, FileOrchestratorConfig,
    FilePermissionsConfig, PromptMode,
};
pub use loader::{ConfigError, ConfigLoader};

//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ```toml
/// [logging]
/// dir = "~/.local/state/conductor/logs"   # daily rolling tracing log
/// events_jsonl = "events.jsonl"           # agent event stream
/// level = "info"                          # used when neither -v nor RUST_LOG is set
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    pub dir: Option<PathBuf>,
    pub events_jsonl: Option<PathBuf>,
    pub level: Option<String>,
}

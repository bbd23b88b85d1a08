//! JSONL file writer for agent events.
//!
//! Each [`AgentEvent`] becomes one JSON line carrying `type`, `agent_id`,
//! an RFC 3339 `timestamp` and the event `data`, appended through a
//! buffered writer.

use async_trait::async_trait;
use conductor_application::AgentEventSink;
use conductor_domain::AgentEvent;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL event logger that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every line and
/// on `Drop`.
pub struct JsonlEventLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventLogger {
    /// Create a logger writing to `path`, truncating any existing file.
    ///
    /// Creates parent directories as needed. Returns `None` (after logging a
    /// warning) if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create event log directory {}: {}", parent.display(), e);
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create event log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: &AgentEvent) -> serde_json::Value {
        let timestamp = chrono::DateTime::from_timestamp_millis(event.timestamp as i64)
            .unwrap_or_else(chrono::Utc::now)
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let mut record = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        match record.as_object_mut() {
            Some(map) => {
                map.insert("type".to_string(), event.event_type().into());
                map.insert("timestamp".to_string(), timestamp.into());
                record
            }
            None => serde_json::json!({
                "type": event.event_type(),
                "agent_id": event.agent_id.as_str(),
                "timestamp": timestamp,
            }),
        }
    }

    fn write_line(&self, line: &str) {
        let mut writer = match self.writer.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            warn!(path = %self.path.display(), "Failed to write event: {}", e);
        }
    }
}

#[async_trait]
impl AgentEventSink for JsonlEventLogger {
    async fn handle(&self, event: AgentEvent) {
        let Ok(line) = serde_json::to_string(&Self::record(&event)) else {
            return;
        };
        self.write_line(&line);
    }
}

impl Drop for JsonlEventLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

//! Exchange log: one JSON object per line, appended as requests are relayed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            message: message.into(),
            request_id: None,
            context: None,
        }
    }

    pub fn for_request(mut self, id: Uuid) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }
}

struct Logger {
    writer: BufWriter<File>,
}

impl Logger {
    fn open(file_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn log(&mut self, entry: &LogEntry) {
        if let Ok(json) = serde_json::to_string(entry) {
            let _ = writeln!(self.writer, "{}", json);
            let _ = self.writer.flush();
        }
    }
}

#[derive(Clone)]
pub struct SharedLogger(Arc<Mutex<Logger>>);

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Logger::open(file_path.as_ref())?))))
    }

    pub fn log(&self, entry: LogEntry) {
        if let Ok(mut logger) = self.0.lock() {
            logger.log(&entry);
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    pub fn warn(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, component, message));
    }

    /// Log a line tied to one relayed exchange.
    pub fn request(
        &self,
        level: LogLevel,
        request_id: Uuid,
        component: impl Into<String>,
        message: impl Into<String>,
        context: serde_json::Value,
    ) {
        self.log(
            LogEntry::new(level, component, message)
                .for_request(request_id)
                .with_context(context),
        );
    }
}

impl std::fmt::Debug for SharedLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLogger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn read_entries(path: &Path) -> Vec<LogEntry> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_entries_are_appended_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("relay.log");

        let id = Uuid::new_v4();
        {
            let logger = SharedLogger::new(&path).unwrap();
            logger.info("startup", "first");
        }
        let logger = SharedLogger::new(&path).unwrap();
        logger.request(
            LogLevel::Warn,
            id,
            "relay",
            "upstream returned 429",
            serde_json::json!({ "status": 429 }),
        );

        let entries = read_entries(&path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "first");
        assert!(entries[0].request_id.is_none());
        assert!(entries[0].context.is_none());
        assert_eq!(entries[1].message, "upstream returned 429");
        assert_eq!(entries[1].request_id, Some(id));
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(entries[1].context, Some(serde_json::json!({ "status": 429 })));
    }

    #[test]
    fn test_wire_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.log");
        let logger = SharedLogger::new(&path).unwrap();
        logger.warn("server", "Rejected request body");

        let line = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(json["level"], "warn");
        assert_eq!(json["component"], "server");
        assert!(json.get("request_id").is_none());
    }
}

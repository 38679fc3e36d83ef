//! Log entries and their output sinks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Log level for hook traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
        }
    }
}

/// A structured log entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Log level.
    pub level: LogLevel,
    /// Log message.
    pub message: String,
    /// Hook the entry is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook: Option<String>,
    /// Additional structured fields.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl LogEntry {
    /// Create an entry without fields.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            hook: None,
            fields: BTreeMap::new(),
        }
    }

    /// Set the hook.
    pub fn with_hook(mut self, hook: impl Into<String>) -> Self {
        self.hook = Some(hook.into());
        self
    }

    /// Add a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    /// Format as human-readable string.
    pub fn to_human(&self) -> String {
        let mut s = format!("[{}] {}", self.level, self.message);

        if !self.fields.is_empty() {
            s.push_str(" | ");
            let fields: Vec<String> = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            s.push_str(&fields.join(" "));
        }

        s
    }
}

/// Output format for stderr logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON lines (for log aggregation).
    #[default]
    Json,
    /// Human-readable lines (for development).
    Human,
}

/// Destination of log entries.
pub trait LogSink: Send + Sync {
    /// Write one entry.
    fn write(&self, entry: &LogEntry);
}

/// Emits entries as `tracing` events with target `vise::hook`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, entry: &LogEntry) {
        let hook = entry.hook.as_deref().unwrap_or_default();
        match entry.level {
            LogLevel::Debug => tracing::debug!(target: "vise::hook", hook, "{}", entry.message),
            LogLevel::Info => tracing::info!(target: "vise::hook", hook, "{}", entry.message),
            LogLevel::Warn => tracing::warn!(target: "vise::hook", hook, "{}", entry.message),
        }
    }
}

/// Writes entries to stderr.
#[derive(Debug, Clone, Copy)]
pub struct StderrSink {
    format: LogFormat,
    min_level: LogLevel,
}

impl StderrSink {
    /// Create a stderr sink with the given format, at info level.
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            min_level: LogLevel::Info,
        }
    }

    /// Set minimum log level.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Format an entry, or `None` when it is below the minimum level.
    pub fn render(&self, entry: &LogEntry) -> Option<String> {
        if entry.level < self.min_level {
            return None;
        }
        Some(match self.format {
            LogFormat::Json => entry.to_json(),
            LogFormat::Human => entry.to_human(),
        })
    }
}

impl LogSink for StderrSink {
    fn write(&self, entry: &LogEntry) {
        if let Some(line) = self.render(entry) {
            eprintln!("{}", line);
        }
    }
}

/// Keeps entries in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries written so far.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages of the entries at or above `level`.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level >= level)
            .map(|entry| entry.message)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
    }
}

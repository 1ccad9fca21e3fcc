//! Store and log sinks the bridge writes into.
//!
//! Both are injected at construction. The bridge calls them sequentially from
//! whichever task drives it, so implementations only need `Send + Sync`.

use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::commands::StoreCommand;

/// Receives store commands. Fire-and-forget.
pub trait StoreSink: Send + Sync {
    fn dispatch(&self, command: StoreCommand);
}

impl<F> StoreSink for F
where
    F: Fn(StoreCommand) + Send + Sync,
{
    fn dispatch(&self, command: StoreCommand) {
        self(command)
    }
}

/// Severity accepted by a [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info    => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error   => write!(f, "error"),
        }
    }
}

/// Diagnostic sink: `log(level, message, payload?)`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, payload: Option<&Value>);
}

/// Default [`LogSink`]: forwards to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn log(&self, level: LogLevel, message: &str, payload: Option<&Value>) {
        match (level, payload) {
            (LogLevel::Info, Some(p))    => info!(payload = %p, "{message}"),
            (LogLevel::Info, None)       => info!("{message}"),
            (LogLevel::Warning, Some(p)) => warn!(payload = %p, "{message}"),
            (LogLevel::Warning, None)    => warn!("{message}"),
            (LogLevel::Error, Some(p))   => error!(payload = %p, "{message}"),
            (LogLevel::Error, None)      => error!("{message}"),
        }
    }
}

/// Forwards commands over an unbounded tokio channel.
///
/// A closed receiver is not an error for the bridge; the command is dropped.
#[derive(Debug, Clone)]
pub struct ChannelStore {
    tx: mpsc::UnboundedSender<StoreCommand>,
}

impl ChannelStore {
    pub fn new(tx: mpsc::UnboundedSender<StoreCommand>) -> Self {
        Self { tx }
    }

    /// Create a store together with the receiver its commands arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StoreCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StoreSink for ChannelStore {
    fn dispatch(&self, command: StoreCommand) {
        if let Err(e) = self.tx.send(command) {
            debug!(command = %e.0, "store receiver closed, dropping command");
        }
    }
}

/// Records every dispatched command in order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    commands: Mutex<Vec<StoreCommand>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all commands dispatched so far.
    pub fn commands(&self) -> Vec<StoreCommand> {
        self.commands.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.commands.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<StoreCommand> {
        self.commands
            .lock()
            .map(|mut g| std::mem::take(&mut *g))
            .unwrap_or_default()
    }
}

impl StoreSink for MemoryStore {
    fn dispatch(&self, command: StoreCommand) {
        if let Ok(mut guard) = self.commands.lock() {
            guard.push(command);
        }
    }
}

/// One line captured by [`MemoryLog`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub payload: Option<Value>,
}

/// Records every log line in order.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Records at exactly `level`.
    pub fn at(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .collect()
    }

    pub fn take(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|mut g| std::mem::take(&mut *g))
            .unwrap_or_default()
    }
}

impl LogSink for MemoryLog {
    fn log(&self, level: LogLevel, message: &str, payload: Option<&Value>) {
        if let Ok(mut guard) = self.records.lock() {
            guard.push(LogRecord {
                level,
                message: message.to_string(),
                payload: payload.cloned(),
            });
        }
    }
}

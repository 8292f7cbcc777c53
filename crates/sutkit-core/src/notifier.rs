//! Notification sinks.
//!
//! `notify` is a single synchronous call. Sinks that need buffering or async
//! delivery own it; a failing sink logs and carries on.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::messages::Message;

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &Message);
}

/// Writes a one-line summary of each message through `tracing`.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &Message) {
        match message {
            Message::TestResult(m) => tracing::info!(
                message_type = "TestResult",
                name = %m.name,
                status = %m.status,
                elapsed = m.elapsed,
                "{}",
                m.message
            ),
            Message::SubTestResult(m) => tracing::info!(
                message_type = "SubTestResult",
                parent = %m.parent_test,
                name = %m.name,
                status = %m.status,
                "{}",
                m.message
            ),
            Message::Performance(m) => tracing::info!(
                message_type = "Performance",
                tool = %m.tool,
                test_case_name = %m.test_case_name,
                data_path = %m.data_path,
            ),
            other => tracing::info!(message_type = other.type_name()),
        }
    }
}

/// Appends every message as one JSON line to a file.
#[derive(Debug)]
pub struct JsonLinesNotifier {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesNotifier {
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Notifier for JsonLinesNotifier {
    fn notify(&self, message: &Message) {
        let line = match serde_json::to_string(message) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, message_type = message.type_name(), "cannot serialize message");
                return;
            }
        };
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(file, "{line}") {
            tracing::warn!(error = %err, path = %self.path.display(), "cannot write message");
        }
    }
}

/// Fans each message out to every registered notifier, in order.
#[derive(Default, Clone)]
pub struct NotifierSet {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Notifier for NotifierSet {
    fn notify(&self, message: &Message) {
        for notifier in &self.notifiers {
            notifier.notify(message);
        }
    }
}

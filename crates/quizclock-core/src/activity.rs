//! Fire-and-forget activity notifications.
//!
//! The controller reports what happens during a session to an injected
//! [`ActivitySink`]. Delivery is best-effort: a failing sink is logged and
//! otherwise ignored, it never changes session state or the report.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::Mode;

/// Something worth telling the activity feed about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ActivityEvent {
    SessionStarted {
        mode: Mode,
        question_count: usize,
        duration_seconds: u32,
    },
    QuestionAnswered {
        index: usize,
        question_id: String,
        option: usize,
        elapsed_seconds: u32,
    },
    HintUsed {
        index: usize,
        question_id: String,
    },
    Navigated {
        from: usize,
        to: usize,
    },
    Paused {
        remaining_seconds: u32,
    },
    Resumed {
        remaining_seconds: u32,
    },
    SessionCompleted {
        score: u8,
        correct_count: usize,
        total_questions: usize,
        /// `true` when the countdown forced the submission.
        timed_out: bool,
    },
}

/// Receiver for activity events.
pub trait ActivitySink: Send + Sync {
    /// Deliver one event. Errors are logged by the caller and never retried.
    fn notify(&self, event: &ActivityEvent) -> Result<()>;
}

/// Sink that drops everything.
pub struct NoopSink;

impl ActivitySink for NoopSink {
    fn notify(&self, _: &ActivityEvent) -> Result<()> {
        Ok(())
    }
}

/// Sink that forwards events to `tracing` at debug level.
pub struct TracingSink;

impl ActivitySink for TracingSink {
    fn notify(&self, event: &ActivityEvent) -> Result<()> {
        tracing::debug!(target: "quizclock::activity", ?event, "activity");
        Ok(())
    }
}

/// In-memory sink that keeps every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ActivityEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far, oldest first.
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ActivitySink for RecordingSink {
    fn notify(&self, event: &ActivityEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("recording sink poisoned"))?
            .push(event.clone());
        Ok(())
    }
}

/// Appends one JSON object per event to a file.
pub struct JsonLinesSink {
    file: Mutex<File>,
}

impl JsonLinesSink {
    /// Open (or create) `path` for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open activity log {}", path.display()))?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl ActivitySink for JsonLinesSink {
    fn notify(&self, event: &ActivityEvent) -> Result<()> {
        let line = serde_json::to_string(event).context("failed to serialize activity event")?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("activity log poisoned"))?;
        writeln!(file, "{line}").context("failed to write activity event")?;
        Ok(())
    }
}

/// Deliver `event`, logging instead of propagating a sink failure.
pub(crate) fn emit(sink: &Arc<dyn ActivitySink>, event: ActivityEvent) {
    if let Err(e) = sink.notify(&event) {
        tracing::warn!("activity sink rejected {event:?}: {e:#}");
    }
}

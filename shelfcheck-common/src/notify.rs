//! Staff-facing notifications
//!
//! The session engine reports progress and failures through the [`Notifier`]
//! capability: one method, a leveled message. Delivery (toast, status bar,
//! terminal) belongs to whoever hosts the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Message level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Status,
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Status => "status",
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A single emitted message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Capability to emit a leveled message to staff
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, text: &str);
}

/// Writes notices to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, text: &str) {
        match level {
            NoticeLevel::Error => tracing::error!(target: "shelfcheck::notice", "{}", text),
            NoticeLevel::Warning => tracing::warn!(target: "shelfcheck::notice", "{}", text),
            _ => tracing::info!(target: "shelfcheck::notice", level = level.as_str(), "{}", text),
        }
    }
}

/// Broadcasts notices to any number of subscribers
///
/// Notices emitted while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notice>,
    capacity: usize,
}

impl BroadcastNotifier {
    /// Creates a notifier buffering up to `capacity` notices per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future notices
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, level: NoticeLevel, text: &str) {
        let _ = self.tx.send(Notice {
            level,
            text: text.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Keeps every notice in memory; used by tests and by hosts that render a log
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// Texts of all notices at `level`, oldest first
    pub fn texts(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.text)
            .collect()
    }

    /// True if any notice at `level` contains `needle`
    pub fn contains(&self, level: NoticeLevel, needle: &str) -> bool {
        self.texts(level).iter().any(|t| t.contains(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.clear();
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, text: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(Notice {
                level,
                text: text.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}

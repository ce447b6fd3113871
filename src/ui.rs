//! Outbound event channel for whatever presents the session to the user.
//!
//! The orchestrator never renders anything itself. Log lines, action banners,
//! detections and notifications are published on a broadcast channel and any
//! number of subscribers (a terminal printer, a GUI, a test) may listen.
//! Publishing without subscribers is a silent no-op.

use crate::connection::ConnectionState;
use crate::model::{EmotionalState, Gesture, Obstacle, VocalMetrics};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::trace;

const UI_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSender {
    User,
    Agent,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Text,
    Action,
    Alert,
}

/// A line in the conversation and activity log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub sender: LogSender,
    pub message: String,
    pub kind: LogKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Log(LogEntry),
    /// Short banner describing an action just taken.
    Action(String),
    ObstaclesDetected(Vec<Obstacle>),
    GestureDetected(Gesture),
    LanguageChanged(String),
    EmotionalStateUpdate(EmotionalState),
    VocalMetricsUpdate(VocalMetrics),
    MedicationVerified(String),
    GenerateVisualAid { description: String, reasoning: String },
    ConnectionStateChanged(ConnectionState),
    /// Must be acknowledged by the user before anything else is shown.
    BlockingAlert(String),
    FamilyNotification { title: String, body: String },
}

/// Cheap, cloneable handle for publishing [`UiEvent`]s.
#[derive(Debug, Clone)]
pub struct UiPublisher {
    tx: broadcast::Sender<UiEvent>,
}

impl Default for UiPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl UiPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(UI_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            trace!("No UI subscribers, event dropped");
        }
    }

    pub fn log(&self, sender: LogSender, message: impl Into<String>, kind: LogKind) {
        self.publish(UiEvent::Log(LogEntry {
            timestamp: Utc::now(),
            sender,
            message: message.into(),
            kind,
        }));
    }

    pub fn action(&self, banner: impl Into<String>) {
        self.publish(UiEvent::Action(banner.into()));
    }
}

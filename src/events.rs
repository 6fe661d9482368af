//! Progress notifications emitted while an attempt runs.
//!
//! Events are for display only. Dropping them, or having no listener at
//! all, never changes what the orchestrator does.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    Submitting,
    ResolvingConflict,
    Verifying,
    Redirecting,
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressPhase::Submitting => write!(f, "submitting"),
            ProgressPhase::ResolvingConflict => write!(f, "resolving_conflict"),
            ProgressPhase::Verifying => write!(f, "verifying"),
            ProgressPhase::Redirecting => write!(f, "redirecting"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(phase: ProgressPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

/// Receives progress events. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        // A closed receiver only means nobody is watching.
        let _ = self.send(event);
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn phases(&self) -> Vec<ProgressPhase> {
        self.events().into_iter().map(|e| e.phase).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.emit(ProgressEvent::new(ProgressPhase::Submitting, "a"));
        sink.emit(ProgressEvent::new(ProgressPhase::Verifying, "b"));
        assert_eq!(
            sink.phases(),
            vec![ProgressPhase::Submitting, ProgressPhase::Verifying]
        );
        assert_eq!(sink.events()[1].message, "b");
    }

    #[tokio::test]
    async fn test_mpsc_sink_delivers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.emit(ProgressEvent::new(ProgressPhase::Redirecting, "go"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.phase, ProgressPhase::Redirecting);
    }

    #[test]
    fn test_mpsc_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel::<ProgressEvent>();
        drop(rx);
        tx.emit(ProgressEvent::new(ProgressPhase::Submitting, "nobody listening"));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(ProgressPhase::ResolvingConflict.to_string(), "resolving_conflict");
    }
}

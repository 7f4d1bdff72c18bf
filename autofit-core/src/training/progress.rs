//! Progress reporting from the orchestrator's submission loop.

use serde::{Deserialize, Serialize};

/// "Now training model `current` of `total`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub model: String,
    pub step: String,
}

impl ProgressEvent {
    pub fn training(current: usize, total: usize, model: impl Into<String>) -> Self {
        Self {
            current,
            total,
            model: model.into(),
            step: "training".into(),
        }
    }
}

/// Receiver of progress events. Called before each model is submitted.
#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_progress(&self, event: &ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

#[async_trait::async_trait]
impl ProgressSink for NoopProgress {
    async fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: tokio::sync::Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ProgressSink for RecordingProgress {
    async fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().await.push(event.clone());
    }
}

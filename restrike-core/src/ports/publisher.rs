//! Outbound edge for regeneration work messages.

use std::sync::Arc;

use async_trait::async_trait;
use restrike_model::WorkMessage;
use tokio::sync::Mutex;

use crate::error::{RecoveryError, Result};

/// Publish port for work messages bound for the processing queue.
///
/// Delivery is at-least-once from the orchestrator's point of view;
/// consumers are expected to treat redelivered messages as idempotent.
#[async_trait]
pub trait WorkPublisher: Send + Sync {
    async fn publish(&self, message: WorkMessage) -> Result<()>;
}

#[derive(Debug, Default)]
struct RecordingState {
    published: Vec<WorkMessage>,
    fail_with: Option<String>,
}

/// Capturing publisher for tests and embedded use.
///
/// Records every message in publish order and can be switched into a
/// failing mode to exercise error paths.
#[derive(Clone, Debug, Default)]
pub struct RecordingPublisher {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    pub async fn published(&self) -> Vec<WorkMessage> {
        let guard = self.state.lock().await;
        guard.published.clone()
    }

    pub async fn clear(&self) {
        let mut guard = self.state.lock().await;
        guard.published.clear();
    }

    /// `Some(reason)` makes subsequent publishes fail with that reason;
    /// `None` restores normal operation.
    pub async fn set_failure(&self, reason: Option<String>) {
        let mut guard = self.state.lock().await;
        guard.fail_with = reason;
    }
}

#[async_trait]
impl WorkPublisher for RecordingPublisher {
    async fn publish(&self, message: WorkMessage) -> Result<()> {
        let mut guard = self.state.lock().await;
        if let Some(reason) = &guard.fail_with {
            return Err(RecoveryError::Publish(reason.clone()));
        }
        guard.published.push(message);
        Ok(())
    }
}

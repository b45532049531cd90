// aidcore/src/embeddings/progress.rs
//
// Load progress reporting

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

/// Snapshot of a load sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProgress {
    /// 0..=100
    pub progress: u8,
    pub stage: String,
}

impl LoadProgress {
    pub fn new(progress: u8, stage: impl Into<String>) -> Self {
        Self {
            progress: progress.min(100),
            stage: stage.into(),
        }
    }

    pub fn idle() -> Self {
        Self::new(0, "Idle")
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }
}

impl Default for LoadProgress {
    fn default() -> Self {
        Self::idle()
    }
}

/// Publishes progress to any number of watchers.
///
/// Within one load sequence the value never decreases; `reset` starts a new
/// sequence.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<LoadProgress>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LoadProgress::idle());
        Self { tx }
    }

    pub fn report(&self, progress: u8, stage: impl Into<String>) {
        let stage = stage.into();
        let progress = progress.min(100);
        debug!(progress, stage = %stage, "Load progress");
        self.tx.send_modify(|current| {
            current.progress = current.progress.max(progress);
            current.stage = stage;
        });
    }

    pub fn reset(&self) {
        self.tx.send_replace(LoadProgress::idle());
    }

    pub fn current(&self) -> LoadProgress {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadProgress> {
        self.tx.subscribe()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

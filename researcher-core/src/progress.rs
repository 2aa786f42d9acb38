//! Progress reporting for concurrent research jobs.
//!
//! Provider tasks push [`ProgressUpdate`]s through a fire-and-forget sink;
//! the observer side owns a [`ProgressTracker`] holding the latest snapshot
//! per provider and renders it however it likes. Updates are
//! last-write-wins per provider; a disabled sink changes nothing about
//! provider behavior.

use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Phase of one provider's research job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Pending,
    Submitting,
    Polling,
    Completed,
    Failed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Pending => write!(f, "pending"),
            JobPhase::Submitting => write!(f, "submitting"),
            JobPhase::Polling => write!(f, "polling"),
            JobPhase::Completed => write!(f, "completed"),
            JobPhase::Failed => write!(f, "failed"),
        }
    }
}

/// One push-only status update from a provider task.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub provider: String,
    pub phase: JobPhase,
    pub message: String,
}

/// Sender handle passed into provider tasks.
///
/// Cheap to clone. `update` never blocks and never fails; if the observer
/// has gone away (or the sink was built disabled) the update is dropped.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
}

impl ProgressSink {
    /// A sink that discards every update.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Create a connected sink and the receiver the observer drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Push an update. Safe to call at any rate.
    pub fn update(&self, provider: &str, phase: JobPhase, message: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressUpdate {
                provider: provider.to_string(),
                phase,
                message: message.into(),
            });
        }
    }
}

/// Latest known state of one provider's job.
#[derive(Debug, Clone)]
pub struct ProviderProgress {
    pub provider: String,
    pub phase: JobPhase,
    pub message: String,
    pub started_at: Option<Instant>,
}

impl ProviderProgress {
    /// Time since the job started submitting, if it has.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }
}

/// Snapshot table of per-provider progress, in request order.
#[derive(Debug)]
pub struct ProgressTracker {
    rows: Vec<ProviderProgress>,
}

impl ProgressTracker {
    pub fn new(providers: &[String]) -> Self {
        let rows = providers
            .iter()
            .map(|p| ProviderProgress {
                provider: p.clone(),
                phase: JobPhase::Pending,
                message: "Waiting to start...".to_string(),
                started_at: None,
            })
            .collect();
        Self { rows }
    }

    /// Fold one update into the snapshot. Unknown providers are ignored.
    pub fn apply(&mut self, update: &ProgressUpdate) {
        let Some(row) = self.rows.iter_mut().find(|r| r.provider == update.provider) else {
            return;
        };
        row.phase = update.phase;
        if !update.message.is_empty() {
            row.message = update.message.clone();
        }
        if update.phase == JobPhase::Submitting && row.started_at.is_none() {
            row.started_at = Some(Instant::now());
        }
    }

    pub fn snapshot(&self) -> &[ProviderProgress] {
        &self.rows
    }
}

/// Render a duration as `Xm YYs`, the way elapsed time is shown in the
/// progress table.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let (minutes, secs) = (seconds / 60, seconds % 60);
    format!("{}m {:02}s", minutes, secs)
}

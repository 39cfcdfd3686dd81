//! Notification hook fired on lifecycle transitions.
//!
//! Delivery is best-effort: a failing notifier is logged and never fails the
//! transition that triggered it.

use crate::core::error::CharterError;
use crate::core::time;
use crate::plugins::proposal::Proposal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowEvent {
    ReviewStarted,
    VotingStarted,
    VotingCompleted,
}

impl WorkflowEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowEvent::ReviewStarted => "review-started",
            WorkflowEvent::VotingStarted => "voting-started",
            WorkflowEvent::VotingCompleted => "voting-completed",
        }
    }
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, proposal: &Proposal, event: WorkflowEvent);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub ts: String,
    pub event_id: String,
    pub event: WorkflowEvent,
    pub proposal_id: String,
    pub title: String,
    pub status: String,
}

/// Appends one JSON line per event to `amendment.events.jsonl`.
pub struct EventLogNotifier {
    path: PathBuf,
}

impl EventLogNotifier {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn append(&self, record: &NotificationRecord) -> Result<(), CharterError> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<NotificationRecord>, CharterError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(raw
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

impl Notifier for EventLogNotifier {
    fn notify(&self, proposal: &Proposal, event: WorkflowEvent) {
        let record = NotificationRecord {
            // Transition time, which follows the workflow clock.
            ts: time::iso(&proposal.updated_at),
            event_id: time::new_event_id(),
            event,
            proposal_id: proposal.id.clone(),
            title: proposal.title.clone(),
            status: proposal.status.to_string(),
        };
        if let Err(e) = self.append(&record) {
            tracing::warn!(proposal_id = %proposal.id, %event, error = %e, "notification not delivered");
        }
    }
}

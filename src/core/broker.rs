//! Serialized access to `charter.db` with an append-only audit trail.
//!
//! Every store operation (proposal read, CAS write, history append) runs
//! inside [`DbBroker::with_conn`] and leaves one [`AuditEvent`] line in
//! `broker.events.jsonl`, including the failures.

use crate::core::db;
use crate::core::error::CharterError;
use crate::core::time;
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

pub const AUDIT_LOG_NAME: &str = "broker.events.jsonl";

/// One connection at a time per process; the version column handles
/// writers in other processes.
static CONN_GATE: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    /// Database file name, e.g. `charter.db`.
    pub db: String,
    pub outcome: Outcome,
    pub elapsed_us: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct DbBroker {
    log_path: PathBuf,
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            log_path: root.join(AUDIT_LOG_NAME),
        }
    }

    /// Run `f` on a fresh connection to `db_path` and audit the result under `actor`/`op`.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op: &str,
        f: F,
    ) -> Result<R, CharterError>
    where
        F: FnOnce(&mut Connection) -> Result<R, CharterError>,
    {
        let _gate = CONN_GATE.lock().unwrap_or_else(|p| p.into_inner());
        let started = Instant::now();

        let result = db::db_connect(&db_path.to_string_lossy()).and_then(|mut conn| f(&mut conn));

        let event = AuditEvent {
            ts: time::iso_exact(&Utc::now()),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db: db_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            outcome: if result.is_ok() {
                Outcome::Ok
            } else {
                Outcome::Failed
            },
            elapsed_us: started.elapsed().as_micros() as u64,
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        // `f` has already committed or rolled back; its result stands.
        if let Err(e) = self.append(&event) {
            tracing::error!(op, actor, outcome = ?event.outcome, error = %e, "audit log append failed");
        }
        tracing::trace!(op, actor, outcome = ?event.outcome, elapsed_us = event.elapsed_us, "store op");

        result
    }

    fn append(&self, event: &AuditEvent) -> Result<(), CharterError> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        writeln!(f, "{}", serde_json::to_string(event)?)?;
        Ok(())
    }

    /// The audit trail, oldest first. Lines that fail to parse are skipped.
    pub fn read_events(&self) -> Result<Vec<AuditEvent>, CharterError> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.log_path)?;
        Ok(raw
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

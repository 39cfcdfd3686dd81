//! Durable proposal storage and the amendment-history ledger.
//!
//! `proposals.document` holds the canonical JSON of a [`Proposal`]; the
//! `version` column is bumped on every write and `update` only succeeds when
//! the caller's expected version still matches (compare-and-swap).

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::CharterError;
use crate::core::time;
use crate::plugins::proposal::{Proposal, ProposalFilter};
use crate::plugins::tally::VotingResult;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A proposal together with the store version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProposal {
    pub proposal: Proposal,
    pub version: u64,
}

pub trait ProposalStore: Send + Sync {
    fn create(&self, proposal: &Proposal) -> Result<StoredProposal, CharterError>;
    fn get(&self, id: &str) -> Result<StoredProposal, CharterError>;
    /// Whole-record overwrite, applied only if the stored version equals `expected_version`.
    fn update(&self, proposal: &Proposal, expected_version: u64) -> Result<u64, CharterError>;
    fn list(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>, CharterError>;
    /// Version-checked overwrite plus the history append, committed together or not at all.
    fn finalize(
        &self,
        proposal: &Proposal,
        expected_version: u64,
        entry: &HistoryEntry,
    ) -> Result<u64, CharterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinalOutcome {
    Approved,
    Rejected,
}

impl FinalOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            FinalOutcome::Approved => "approved",
            FinalOutcome::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub proposal_id: String,
    pub title: String,
    pub result: FinalOutcome,
    pub voting_result: VotingResult,
    pub finalized_date: DateTime<Utc>,
}

pub trait HistoryLog: Send + Sync {
    fn record(&self, entry: &HistoryEntry) -> Result<(), CharterError>;
    /// All entries, oldest first.
    fn entries(&self) -> Result<Vec<HistoryEntry>, CharterError>;
}

/// SQLite-backed implementation of both [`ProposalStore`] and [`HistoryLog`].
pub struct SqliteProposalStore {
    root: PathBuf,
    db_path: PathBuf,
    actor: String,
}

impl SqliteProposalStore {
    /// Open (and initialize if needed) the store under `root`.
    pub fn open(root: &Path) -> Result<Self, CharterError> {
        db::initialize_charter_db(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            db_path: db::charter_db_path(root),
            actor: "charter".to_string(),
        })
    }

    /// Attribute audit-log entries to `actor` instead of the default.
    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    fn broker(&self) -> DbBroker {
        DbBroker::new(&self.root)
    }

    /// Raw stored document, exactly as persisted.
    pub fn document(&self, id: &str) -> Result<String, CharterError> {
        self.broker()
            .with_conn(&self.db_path, &self.actor, "proposal.document", |conn| {
                conn.query_row(
                    "SELECT document FROM proposals WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
                .ok_or_else(|| CharterError::ProposalNotFound(id.to_string()))
            })
    }
}

fn decode(document: &str) -> Result<Proposal, CharterError> {
    Ok(serde_json::from_str(document)?)
}

/// `UPDATE ... WHERE version = expected`; zero rows is either a missing id or a lost race.
fn cas_write(
    conn: &Connection,
    proposal: &Proposal,
    document: &str,
    expected_version: u64,
) -> Result<u64, CharterError> {
    let changed = conn.execute(
        "UPDATE proposals
         SET document = ?1, status = ?2, impact = ?3, type = ?4, proposer = ?5,
             updated_at = ?6, version = version + 1
         WHERE id = ?7 AND version = ?8",
        params![
            document,
            proposal.status.as_str(),
            proposal.impact.as_str(),
            proposal.kind.as_str(),
            proposal.proposer,
            time::iso_exact(&proposal.updated_at),
            proposal.id,
            expected_version as i64,
        ],
    )?;
    if changed == 0 {
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM proposals WHERE id = ?1",
            params![proposal.id],
            |row| row.get(0),
        )?;
        return Err(if exists == 0 {
            CharterError::ProposalNotFound(proposal.id.clone())
        } else {
            CharterError::VersionConflict {
                id: proposal.id.clone(),
                expected: expected_version,
            }
        });
    }
    Ok(expected_version + 1)
}

fn insert_history(
    conn: &Connection,
    entry: &HistoryEntry,
    voting_result: &str,
) -> Result<(), CharterError> {
    conn.execute(
        "INSERT INTO amendment_history(proposal_id, title, result, voting_result, finalized_at)
         VALUES(?1, ?2, ?3, ?4, ?5)",
        params![
            entry.proposal_id,
            entry.title,
            entry.result.as_str(),
            voting_result,
            time::iso_exact(&entry.finalized_date),
        ],
    )?;
    Ok(())
}

impl ProposalStore for SqliteProposalStore {
    fn create(&self, proposal: &Proposal) -> Result<StoredProposal, CharterError> {
        let document = serde_json::to_string(proposal)?;
        self.broker()
            .with_conn(&self.db_path, &self.actor, "proposal.create", |conn| {
                let exists: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM proposals WHERE id = ?1",
                    params![proposal.id],
                    |row| row.get(0),
                )?;
                if exists > 0 {
                    return Err(CharterError::DuplicateProposal(proposal.id.clone()));
                }
                conn.execute(
                    "INSERT INTO proposals(id, status, impact, type, proposer, document, version, created_at, updated_at)
                     VALUES(?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8)",
                    params![
                        proposal.id,
                        proposal.status.as_str(),
                        proposal.impact.as_str(),
                        proposal.kind.as_str(),
                        proposal.proposer,
                        document,
                        time::iso_exact(&proposal.created_at),
                        time::iso_exact(&proposal.updated_at),
                    ],
                )?;
                Ok(())
            })?;
        Ok(StoredProposal {
            proposal: proposal.clone(),
            version: 1,
        })
    }

    fn get(&self, id: &str) -> Result<StoredProposal, CharterError> {
        let (document, version) =
            self.broker()
                .with_conn(&self.db_path, &self.actor, "proposal.get", |conn| {
                    conn.query_row(
                        "SELECT document, version FROM proposals WHERE id = ?1",
                        params![id],
                        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                    )
                    .optional()?
                    .ok_or_else(|| CharterError::ProposalNotFound(id.to_string()))
                })?;
        Ok(StoredProposal {
            proposal: decode(&document)?,
            version: version as u64,
        })
    }

    fn update(&self, proposal: &Proposal, expected_version: u64) -> Result<u64, CharterError> {
        let document = serde_json::to_string(proposal)?;
        self.broker()
            .with_conn(&self.db_path, &self.actor, "proposal.update", |conn| {
                let tx = conn.transaction()?;
                let version = cas_write(&tx, proposal, &document, expected_version)?;
                tx.commit()?;
                Ok(version)
            })
    }

    fn finalize(
        &self,
        proposal: &Proposal,
        expected_version: u64,
        entry: &HistoryEntry,
    ) -> Result<u64, CharterError> {
        let document = serde_json::to_string(proposal)?;
        let voting_result = serde_json::to_string(&entry.voting_result)?;
        self.broker()
            .with_conn(&self.db_path, &self.actor, "proposal.finalize", |conn| {
                let tx = conn.transaction()?;
                let version = cas_write(&tx, proposal, &document, expected_version)?;
                insert_history(&tx, entry, &voting_result)?;
                tx.commit()?;
                Ok(version)
            })
    }

    fn list(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>, CharterError> {
        let documents = self
            .broker()
            .with_conn(&self.db_path, &self.actor, "proposal.list", |conn| {
                let mut conditions: Vec<String> = vec![];
                let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

                if let Some(status) = filter.status {
                    conditions.push(format!("status = ?{}", param_values.len() + 1));
                    param_values.push(Box::new(status.as_str()));
                }
                if let Some(impact) = filter.impact {
                    conditions.push(format!("impact = ?{}", param_values.len() + 1));
                    param_values.push(Box::new(impact.as_str()));
                }
                if let Some(kind) = filter.kind {
                    conditions.push(format!("type = ?{}", param_values.len() + 1));
                    param_values.push(Box::new(kind.as_str()));
                }
                if let Some(proposer) = &filter.proposer {
                    conditions.push(format!("proposer = ?{}", param_values.len() + 1));
                    param_values.push(Box::new(proposer.clone()));
                }

                let where_clause = if conditions.is_empty() {
                    String::new()
                } else {
                    format!(" WHERE {}", conditions.join(" AND "))
                };
                let sql = format!(
                    "SELECT document FROM proposals{} ORDER BY created_at DESC, id DESC",
                    where_clause
                );

                let mut stmt = conn.prepare(&sql)?;
                let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                    param_values.iter().map(|p| p.as_ref()).collect();
                let documents = stmt
                    .query_map(params_refs.as_slice(), |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(documents)
            })?;

        documents.iter().map(|d| decode(d)).collect()
    }
}

impl HistoryLog for SqliteProposalStore {
    fn record(&self, entry: &HistoryEntry) -> Result<(), CharterError> {
        let voting_result = serde_json::to_string(&entry.voting_result)?;
        self.broker()
            .with_conn(&self.db_path, &self.actor, "history.append", |conn| {
                insert_history(conn, entry, &voting_result)
            })
    }

    fn entries(&self) -> Result<Vec<HistoryEntry>, CharterError> {
        let rows = self
            .broker()
            .with_conn(&self.db_path, &self.actor, "history.list", |conn| {
                let mut stmt = conn.prepare(
                    "SELECT proposal_id, title, result, voting_result, finalized_at
                     FROM amendment_history ORDER BY seq",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })?;

        rows.into_iter()
            .map(|(proposal_id, title, result, voting_result, finalized_at)| {
                let result = match result.as_str() {
                    "approved" => FinalOutcome::Approved,
                    "rejected" => FinalOutcome::Rejected,
                    other => {
                        return Err(CharterError::ValidationError(format!(
                            "Corrupt history row for '{}': result '{}'",
                            proposal_id, other
                        )));
                    }
                };
                let finalized_date = time::parse_iso(&finalized_at).ok_or_else(|| {
                    CharterError::ValidationError(format!(
                        "Corrupt history row for '{}': finalized_at '{}'",
                        proposal_id, finalized_at
                    ))
                })?;
                Ok(HistoryEntry {
                    proposal_id,
                    title,
                    result,
                    voting_result: serde_json::from_str(&voting_result)?,
                    finalized_date,
                })
            })
            .collect()
    }
}

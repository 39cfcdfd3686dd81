use crate::core::time::iso;
use chrono::{DateTime, Utc};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CharterError {
    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),
    #[error("Proposal '{id}' is incomplete; missing required fields: {}", .missing.join(", "))]
    IncompleteProposal { id: String, missing: Vec<String> },
    #[error("Review period for '{id}' has not elapsed: review ends {}, now is {}", iso(.ends), iso(.now))]
    ReviewPeriodNotElapsed {
        id: String,
        ends: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    #[error("Voting on '{id}' is closed: voting ended {}, now is {}", iso(.ended), iso(.now))]
    VotingClosed {
        id: String,
        ended: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    #[error("Voting period for '{id}' has not elapsed: voting ends {}, now is {}", iso(.ends), iso(.now))]
    VotingPeriodNotElapsed {
        id: String,
        ends: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    #[error("Voter '{voter}' is not eligible to vote on '{id}'")]
    IneligibleVoter { id: String, voter: String },
    #[error("Voter '{voter}' already voted on '{id}' at {}", iso(.cast_at))]
    DuplicateVote {
        id: String,
        voter: String,
        cast_at: DateTime<Utc>,
    },
    #[error("Cannot {operation} proposal '{id}': status is '{actual}', expected one of [{}]", .expected.join(", "))]
    InvalidStateTransition {
        id: String,
        operation: String,
        expected: Vec<String>,
        actual: String,
    },
    #[error("Proposal already exists: {0}")]
    DuplicateProposal(String),
    #[error("Concurrent update on '{id}': stored version moved past {expected}")]
    VersionConflict { id: String, expected: u64 },
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Coarse classification callers use to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    GuardFailed,
    StoreError,
    /// Missing store or malformed `config.toml`; needs an operator fix.
    Config,
}

impl CharterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CharterError::ProposalNotFound(_) => ErrorKind::NotFound,
            CharterError::IncompleteProposal { .. }
            | CharterError::ReviewPeriodNotElapsed { .. }
            | CharterError::VotingClosed { .. }
            | CharterError::VotingPeriodNotElapsed { .. }
            | CharterError::IneligibleVoter { .. }
            | CharterError::DuplicateVote { .. }
            | CharterError::InvalidStateTransition { .. }
            | CharterError::DuplicateProposal(_)
            | CharterError::ValidationError(_) => ErrorKind::GuardFailed,
            CharterError::VersionConflict { .. }
            | CharterError::RusqliteError(_)
            | CharterError::IoError(_)
            | CharterError::JsonError(_) => ErrorKind::StoreError,
            CharterError::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Store errors are transient; everything else needs the caller to change something first.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StoreError
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::NotFound => 2,
            ErrorKind::GuardFailed => 3,
            ErrorKind::StoreError => 4,
            ErrorKind::Config => 5,
        }
    }
}

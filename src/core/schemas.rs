//! Database schema definitions for Charter's SQLite store.
//!
//! A single `charter.db` holds two tables:
//! 1. proposals: one canonical JSON document per proposal plus filter columns
//!    and an optimistic-concurrency version counter.
//! 2. amendment_history: append-only ledger written once per finalization.

pub const CHARTER_DB_NAME: &str = "charter.db";
pub const CHARTER_SCHEMA_VERSION: u32 = 1;

pub const CHARTER_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const CHARTER_DB_SCHEMA_PROPOSALS: &str = "
    CREATE TABLE IF NOT EXISTS proposals (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        impact TEXT NOT NULL,
        type TEXT NOT NULL,
        proposer TEXT NOT NULL,
        document TEXT NOT NULL,
        version INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

pub const CHARTER_DB_SCHEMA_HISTORY: &str = "
    CREATE TABLE IF NOT EXISTS amendment_history (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        proposal_id TEXT NOT NULL,
        title TEXT NOT NULL,
        result TEXT NOT NULL,
        voting_result TEXT NOT NULL,
        finalized_at TEXT NOT NULL
    )
";

pub const CHARTER_DB_INDEX_PROPOSALS_STATUS: &str =
    "CREATE INDEX IF NOT EXISTS idx_proposals_status ON proposals(status)";
pub const CHARTER_DB_INDEX_PROPOSALS_IMPACT: &str =
    "CREATE INDEX IF NOT EXISTS idx_proposals_impact ON proposals(impact)";
pub const CHARTER_DB_INDEX_HISTORY_PROPOSAL: &str =
    "CREATE INDEX IF NOT EXISTS idx_history_proposal ON amendment_history(proposal_id)";

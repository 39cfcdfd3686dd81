use crate::core::broker::DbBroker;
use crate::core::error::CharterError;
use crate::core::schemas;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, CharterError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

pub fn charter_db_path(root: &Path) -> PathBuf {
    root.join(schemas::CHARTER_DB_NAME)
}

/// Create the charter database and its tables. Safe to call repeatedly.
pub fn initialize_charter_db(root: &Path) -> Result<(), CharterError> {
    fs::create_dir_all(root)?;
    let db_path = charter_db_path(root);

    let broker = DbBroker::new(root);
    broker.with_conn(&db_path, "charter", "charter.init", |conn| {
        conn.execute_batch(schemas::CHARTER_DB_SCHEMA_META)?;
        conn.execute_batch(schemas::CHARTER_DB_SCHEMA_PROPOSALS)?;
        conn.execute_batch(schemas::CHARTER_DB_SCHEMA_HISTORY)?;
        conn.execute_batch(schemas::CHARTER_DB_INDEX_PROPOSALS_STATUS)?;
        conn.execute_batch(schemas::CHARTER_DB_INDEX_PROPOSALS_IMPACT)?;
        conn.execute_batch(schemas::CHARTER_DB_INDEX_HISTORY_PROPOSAL)?;
        conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES('schema_version', ?1)",
            params![schemas::CHARTER_SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    })
}

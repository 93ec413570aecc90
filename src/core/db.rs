use crate::core::error::ShotdeckError;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &Path) -> Result<Connection, ShotdeckError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

pub fn ledger_db_path(root: &Path) -> PathBuf {
    root.join(schemas::LEDGER_DB_NAME)
}

/// Create the ledger database under `root` with all tables present.
/// Idempotent; safe to call on every project open.
pub fn initialize_ledger_db(root: &Path) -> Result<(), ShotdeckError> {
    fs::create_dir_all(root)?;
    let conn = db_connect(&ledger_db_path(root))?;
    for ddl in schemas::LEDGER_SCHEMAS {
        conn.execute(ddl, [])?;
    }
    Ok(())
}

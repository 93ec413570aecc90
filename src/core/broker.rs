use crate::core::db;
use crate::core::error::ShotdeckError;
use crate::core::schemas;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The ledger broker is the single mutation path for a project.
///
/// Every operation that touches the version ledger, the shot registry, or
/// the metadata tables goes through [`LedgerBroker::with_conn`], which holds
/// a process-wide lock for the duration of the closure and appends one audit
/// event per operation. Concurrent upload + reorder + rename therefore can
/// never interleave partial writes.
pub struct LedgerBroker {
    db_path: PathBuf,
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LedgerEvent {
    pub ts: String,
    pub event_id: String,
    pub op: String,
    pub shot: Option<String>,
    pub status: String,
}

impl LedgerBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            db_path: db::ledger_db_path(root),
            audit_log_path: root.join(schemas::LEDGER_EVENTS_NAME),
        }
    }

    /// Execute a closure with a serialized connection to the project ledger.
    pub fn with_conn<F, R>(
        &self,
        op_name: &str,
        shot: Option<&str>,
        f: F,
    ) -> Result<R, ShotdeckError>
    where
        F: FnOnce(&mut Connection) -> Result<R, ShotdeckError>,
    {
        static LEDGER_LOCK: Mutex<()> = Mutex::new(());
        let _lock = LEDGER_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut conn = db::db_connect(&self.db_path)?;
        let result = f(&mut conn);

        // The operation has already committed or failed; a broken audit
        // sink must not change that outcome.
        let status = if result.is_ok() { "success" } else { "error" };
        if let Err(e) = self.log_event(op_name, shot, status) {
            eprintln!("warning: audit event for {} not recorded: {}", op_name, e);
        }

        result
    }

    fn log_event(&self, op: &str, shot: Option<&str>, status: &str) -> Result<(), ShotdeckError> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let ev = LedgerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            op: op.to_string(),
            shot: shot.map(|s| s.to_string()),
            status: status.to_string(),
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)?;
        let line = serde_json::to_string(&ev)
            .map_err(|e| ShotdeckError::Validation(format!("audit event serialization: {}", e)))?;
        writeln!(f, "{}", line)?;
        Ok(())
    }
}

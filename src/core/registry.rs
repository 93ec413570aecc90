//! Shot identity and ordering.
//!
//! The registry owns shot names, the active ordering, and the archive
//! partition. Names are zero-padded sequential codes stepping by 10
//! (`SH010`, `SH020`, ...); a retired code is never handed out again
//! because generation always starts past the numeric maximum of every
//! name that has ever been recorded. Ordering is owned by `order_index`,
//! fully decoupled from the code itself.

use crate::core::broker::LedgerBroker;
use crate::core::db;
use crate::core::error::ShotdeckError;
use crate::core::layout::ProjectLayout;
use crate::core::media;
use crate::core::metadata;
use crate::core::time;
use crate::core::version_store;
use rusqlite::{Connection, OptionalExtension, params};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct ShotRow {
    pub name: String,
    pub display_name: Option<String>,
    pub notes: String,
    pub archived: bool,
    pub order_index: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ShotRegistry {
    layout: ProjectLayout,
    broker: Arc<LedgerBroker>,
}

impl ShotRegistry {
    pub fn new(layout: ProjectLayout, broker: Arc<LedgerBroker>) -> Self {
        Self { layout, broker }
    }

    /// Create a new shot, inserted at the head of the active ordering when
    /// no anchor is given, otherwise directly after `after`. The anchor is
    /// looked up globally by name; archived shots keep their retained index
    /// for position math but are never renumbered.
    pub fn create(&self, after: Option<&str>) -> Result<ShotRow, ShotdeckError> {
        if let Some(anchor) = after {
            media::validate_shot_name(anchor)?;
        }
        let layout = self.layout.clone();
        let after = after.map(|s| s.to_string());
        self.broker.with_conn("registry.create", None, move |conn| {
            let tx = conn.transaction()?;
            let name = next_shot_name(&tx)?;

            let active = active_names(&tx)?;
            let position = match after.as_deref() {
                None => 0,
                Some(anchor) => {
                    let anchor_index: Option<i64> = tx
                        .query_row(
                            "SELECT order_index FROM shots WHERE name = ?1",
                            params![anchor],
                            |row| row.get(0),
                        )
                        .optional()?;
                    let anchor_index = anchor_index
                        .ok_or_else(|| ShotdeckError::ShotNotFound(anchor.to_string()))?;
                    let pos: i64 = tx.query_row(
                        "SELECT COUNT(*) FROM shots WHERE archived = 0 AND order_index <= ?1",
                        params![anchor_index],
                        |row| row.get(0),
                    )?;
                    pos as usize
                }
            };

            let ts = time::now_epoch_z();
            tx.execute(
                "INSERT INTO shots(name, display_name, notes, archived, order_index, created_at, updated_at)
                 VALUES(?1, NULL, '', 0, ?2, ?3, ?3)",
                params![name, position as i64, ts],
            )?;

            let mut order = active;
            order.insert(position.min(order.len()), name.clone());
            renumber_active(&tx, &order)?;

            layout.ensure_shot_dirs(&name)?;
            tx.commit()?;
            get_row(conn, &name)
        })
    }

    /// Atomic identity change across all three stores. Media files move
    /// first; the single ledger transaction then rekeys the registry row
    /// (cascading into version keys), version file paths, and metadata.
    /// A failed transaction rolls the files back; an unrecoverable
    /// half-state is reported as `PartialRename`.
    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<ShotRow, ShotdeckError> {
        media::validate_shot_name(old_name)?;
        media::validate_shot_name(new_name)?;
        let layout = self.layout.clone();
        let old = old_name.to_string();
        let new = new_name.to_string();
        self.broker
            .with_conn("registry.rename", Some(old_name), move |conn| {
                if !shot_exists(conn, &old)? {
                    return Err(ShotdeckError::ShotNotFound(old.clone()));
                }
                if shot_exists(conn, &new)? || layout.shot_dir(&new).exists() {
                    return Err(ShotdeckError::NameConflict(new.clone()));
                }

                version_store::migrate_files(&layout, &old, &new)?;

                let db_result = (|| -> Result<(), ShotdeckError> {
                    let tx = conn.transaction()?;
                    tx.execute(
                        "UPDATE shots SET name = ?1, updated_at = ?2 WHERE name = ?3",
                        params![new, time::now_epoch_z(), old],
                    )?;
                    version_store::rekey_paths_tx(&tx, &old, &new)?;
                    metadata::rekey_tx(&tx, &old, &new)?;
                    tx.commit()?;
                    Ok(())
                })();

                if let Err(db_err) = db_result {
                    if let Err(fs_err) = version_store::migrate_files(&layout, &new, &old) {
                        return Err(ShotdeckError::PartialRename(format!(
                            "{} -> {}: ledger rekey failed ({}) and file rollback failed ({})",
                            old, new, db_err, fs_err
                        )));
                    }
                    return Err(db_err);
                }
                get_row(conn, &new)
            })
    }

    /// Toggle the archive partition flag. `order_index` is retained so the
    /// shot keeps its place if it comes back.
    pub fn set_archived(&self, name: &str, archived: bool) -> Result<ShotRow, ShotdeckError> {
        let name_owned = name.to_string();
        self.broker
            .with_conn("registry.set_archived", Some(name), move |conn| {
                let updated = conn.execute(
                    "UPDATE shots SET archived = ?1, updated_at = ?2 WHERE name = ?3",
                    params![archived as i64, time::now_epoch_z(), name_owned],
                )?;
                if updated == 0 {
                    return Err(ShotdeckError::ShotNotFound(name_owned.clone()));
                }
                get_row(conn, &name_owned)
            })
    }

    /// Replace the active ordering with the given sequence, all-or-nothing.
    /// The sequence must be a permutation of the active shot names; archived
    /// names may trail as no-ops. Unknown, duplicated, or missing names
    /// reject the whole call with `OrderMismatch`.
    pub fn reorder(&self, names: &[String]) -> Result<(), ShotdeckError> {
        let names = names.to_vec();
        self.broker.with_conn("registry.reorder", None, move |conn| {
            let tx = conn.transaction()?;
            let active: FxHashSet<String> = active_names(&tx)?.into_iter().collect();

            let mut seen: FxHashSet<&str> = FxHashSet::default();
            let mut sequence: Vec<&str> = Vec::with_capacity(active.len());
            for name in &names {
                if !seen.insert(name.as_str()) {
                    return Err(ShotdeckError::OrderMismatch(format!(
                        "duplicate name {}",
                        name
                    )));
                }
                if active.contains(name.as_str()) {
                    sequence.push(name.as_str());
                } else if !shot_exists(&tx, name)? {
                    return Err(ShotdeckError::OrderMismatch(format!(
                        "unknown shot {}",
                        name
                    )));
                }
                // known archived names are accepted as no-ops
            }
            if sequence.len() != active.len() {
                return Err(ShotdeckError::OrderMismatch(format!(
                    "sequence covers {} of {} active shots",
                    sequence.len(),
                    active.len()
                )));
            }

            renumber_active(&tx, &sequence)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Active shots in order, then archived shots in their retained order.
    pub fn list(&self) -> Result<Vec<ShotRow>, ShotdeckError> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, display_name, notes, archived, order_index, created_at, updated_at
             FROM shots ORDER BY archived ASC, order_index ASC, name ASC",
        )?;
        let rows = stmt
            .query_map([], row_from_sql)?
            .collect::<Result<Vec<ShotRow>, _>>()?;
        Ok(rows)
    }

    pub fn get(&self, name: &str) -> Result<ShotRow, ShotdeckError> {
        let conn = self.read_conn()?;
        get_row(&conn, name)
    }

    pub fn exists(&self, name: &str) -> Result<bool, ShotdeckError> {
        let conn = self.read_conn()?;
        shot_exists(&conn, name)
    }

    fn read_conn(&self) -> Result<Connection, ShotdeckError> {
        db::db_connect(&db::ledger_db_path(self.layout.root()))
    }
}

fn row_from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShotRow> {
    Ok(ShotRow {
        name: row.get(0)?,
        display_name: row.get(1)?,
        notes: row.get(2)?,
        archived: row.get::<_, i64>(3)? != 0,
        order_index: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn get_row(conn: &Connection, name: &str) -> Result<ShotRow, ShotdeckError> {
    conn.query_row(
        "SELECT name, display_name, notes, archived, order_index, created_at, updated_at
         FROM shots WHERE name = ?1",
        params![name],
        row_from_sql,
    )
    .optional()?
    .ok_or_else(|| ShotdeckError::ShotNotFound(name.to_string()))
}

fn shot_exists(conn: &Connection, name: &str) -> Result<bool, ShotdeckError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM shots WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn active_names(conn: &Connection) -> Result<Vec<String>, ShotdeckError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM shots WHERE archived = 0 ORDER BY order_index ASC, name ASC",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

fn renumber_active<S: AsRef<str>>(conn: &Connection, order: &[S]) -> Result<(), ShotdeckError> {
    let mut stmt = conn.prepare("UPDATE shots SET order_index = ?1 WHERE name = ?2")?;
    for (index, name) in order.iter().enumerate() {
        stmt.execute(params![index as i64, name.as_ref()])?;
    }
    Ok(())
}

fn next_shot_name(conn: &Connection) -> Result<String, ShotdeckError> {
    let mut stmt = conn.prepare("SELECT name FROM shots")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<String>, _>>()?;
    next_name_from(names.iter().map(|n| n.as_str()))
}

/// Next unused base code: numeric max of every recorded name plus 10,
/// starting at `SH010`. Sub-shot names contribute their base segment.
fn next_name_from<'a>(names: impl Iterator<Item = &'a str>) -> Result<String, ShotdeckError> {
    let max_base = names
        .filter_map(|n| n.get(2..5))
        .filter_map(|digits| digits.parse::<i64>().ok())
        .max()
        .unwrap_or(0);
    let next = max_base + 10;
    if next > 999 {
        return Err(ShotdeckError::Validation(
            "no available shot numbers left".to_string(),
        ));
    }
    Ok(format!("SH{:03}", next))
}

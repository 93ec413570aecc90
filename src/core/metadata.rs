//! Non-binary per-shot and per-version metadata.
//!
//! Prompts are keyed by (shot, slot, version); captions by (shot, slot);
//! notes and display names live on the shot row. Absence reads back as an
//! empty string, never an error, and writing an empty string clears.

use crate::core::broker::LedgerBroker;
use crate::core::db;
use crate::core::error::ShotdeckError;
use crate::core::layout::ProjectLayout;
use crate::core::media::AssetSlot;
use crate::core::time;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::sync::Arc;

pub struct MetadataStore {
    layout: ProjectLayout,
    broker: Arc<LedgerBroker>,
}

impl MetadataStore {
    pub fn new(layout: ProjectLayout, broker: Arc<LedgerBroker>) -> Self {
        Self { layout, broker }
    }

    pub fn set_prompt(
        &self,
        shot: &str,
        slot: AssetSlot,
        version: i64,
        text: &str,
    ) -> Result<(), ShotdeckError> {
        let shot_owned = shot.to_string();
        let text = text.to_string();
        self.broker
            .with_conn("metadata.set_prompt", Some(shot), move |conn| {
                require_shot(conn, &shot_owned)?;
                if text.is_empty() {
                    conn.execute(
                        "DELETE FROM prompts WHERE shot = ?1 AND slot = ?2 AND version = ?3",
                        params![shot_owned, slot.key(), version],
                    )?;
                } else {
                    conn.execute(
                        "INSERT INTO prompts(shot, slot, version, text) VALUES(?1, ?2, ?3, ?4)
                         ON CONFLICT(shot, slot, version) DO UPDATE SET text = excluded.text",
                        params![shot_owned, slot.key(), version, text],
                    )?;
                }
                Ok(())
            })
    }

    pub fn get_prompt(
        &self,
        shot: &str,
        slot: AssetSlot,
        version: i64,
    ) -> Result<String, ShotdeckError> {
        let conn = self.read_conn()?;
        get_prompt_conn(&conn, shot, slot, version)
    }

    /// Versions of a slot that carry a non-empty prompt, ascending.
    pub fn prompt_versions(&self, shot: &str, slot: AssetSlot) -> Result<Vec<i64>, ShotdeckError> {
        let conn = self.read_conn()?;
        let mut stmt = conn.prepare(
            "SELECT version FROM prompts WHERE shot = ?1 AND slot = ?2 ORDER BY version ASC",
        )?;
        let versions = stmt
            .query_map(params![shot, slot.key()], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(versions)
    }

    /// Captions apply across all versions of a slot, and may be set before
    /// any asset has been uploaded.
    pub fn set_caption(&self, shot: &str, slot: AssetSlot, text: &str) -> Result<(), ShotdeckError> {
        let shot_owned = shot.to_string();
        let text = text.to_string();
        self.broker
            .with_conn("metadata.set_caption", Some(shot), move |conn| {
                require_shot(conn, &shot_owned)?;
                if text.is_empty() {
                    conn.execute(
                        "DELETE FROM captions WHERE shot = ?1 AND slot = ?2",
                        params![shot_owned, slot.key()],
                    )?;
                } else {
                    conn.execute(
                        "INSERT INTO captions(shot, slot, text) VALUES(?1, ?2, ?3)
                         ON CONFLICT(shot, slot) DO UPDATE SET text = excluded.text",
                        params![shot_owned, slot.key(), text],
                    )?;
                }
                Ok(())
            })
    }

    pub fn get_caption(&self, shot: &str, slot: AssetSlot) -> Result<String, ShotdeckError> {
        let conn = self.read_conn()?;
        let caption: Option<String> = conn
            .query_row(
                "SELECT text FROM captions WHERE shot = ?1 AND slot = ?2",
                params![shot, slot.key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(caption.unwrap_or_default())
    }

    pub fn set_notes(&self, shot: &str, text: &str) -> Result<(), ShotdeckError> {
        let shot_owned = shot.to_string();
        let text = text.to_string();
        self.broker
            .with_conn("metadata.set_notes", Some(shot), move |conn| {
                let updated = conn.execute(
                    "UPDATE shots SET notes = ?1, updated_at = ?2 WHERE name = ?3",
                    params![text, time::now_epoch_z(), shot_owned],
                )?;
                if updated == 0 {
                    return Err(ShotdeckError::ShotNotFound(shot_owned.clone()));
                }
                Ok(())
            })
    }

    pub fn get_notes(&self, shot: &str) -> Result<String, ShotdeckError> {
        let conn = self.read_conn()?;
        let notes: Option<String> = conn
            .query_row(
                "SELECT notes FROM shots WHERE name = ?1",
                params![shot],
                |row| row.get(0),
            )
            .optional()?;
        Ok(notes.unwrap_or_default())
    }

    pub fn set_display_name(
        &self,
        shot: &str,
        display_name: Option<&str>,
    ) -> Result<(), ShotdeckError> {
        let shot_owned = shot.to_string();
        let display_name = display_name
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(|d| d.to_string());
        self.broker
            .with_conn("metadata.set_display_name", Some(shot), move |conn| {
                let updated = conn.execute(
                    "UPDATE shots SET display_name = ?1, updated_at = ?2 WHERE name = ?3",
                    params![display_name, time::now_epoch_z(), shot_owned],
                )?;
                if updated == 0 {
                    return Err(ShotdeckError::ShotNotFound(shot_owned.clone()));
                }
                Ok(())
            })
    }

    fn read_conn(&self) -> Result<Connection, ShotdeckError> {
        db::db_connect(&db::ledger_db_path(self.layout.root()))
    }
}

pub(crate) fn get_prompt_conn(
    conn: &Connection,
    shot: &str,
    slot: AssetSlot,
    version: i64,
) -> Result<String, ShotdeckError> {
    let prompt: Option<String> = conn
        .query_row(
            "SELECT text FROM prompts WHERE shot = ?1 AND slot = ?2 AND version = ?3",
            params![shot, slot.key(), version],
            |row| row.get(0),
        )
        .optional()?;
    Ok(prompt.unwrap_or_default())
}

fn require_shot(conn: &Connection, shot: &str) -> Result<(), ShotdeckError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM shots WHERE name = ?1",
            params![shot],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(ShotdeckError::ShotNotFound(shot.to_string()));
    }
    Ok(())
}

/// Move every prompt and caption row under the new shot identity. Runs
/// inside the rename transaction so metadata can never move partially.
/// Notes and display name ride along on the `shots` row itself.
pub fn rekey_tx(
    tx: &Transaction<'_>,
    old_name: &str,
    new_name: &str,
) -> Result<(), ShotdeckError> {
    tx.execute(
        "UPDATE prompts SET shot = ?1 WHERE shot = ?2",
        params![new_name, old_name],
    )?;
    tx.execute(
        "UPDATE captions SET shot = ?1 WHERE shot = ?2",
        params![new_name, old_name],
    )?;
    Ok(())
}

//! Per-(shot, slot) version ledger.
//!
//! Versions are contiguous positive integers assigned by append-only
//! increment. Numbers are never reassigned or compacted, so prompt and
//! caption rows keyed by version stay valid across promotion and newer
//! uploads. The promoted ("current") version is mirrored into the
//! `latest_*` directories so external tools always see one flat file per
//! slot.

use crate::core::broker::LedgerBroker;
use crate::core::error::ShotdeckError;
use crate::core::layout::ProjectLayout;
use crate::core::media::{self, AssetSlot, LipsyncTrack};
use crate::core::time;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct VersionRecord {
    pub shot: String,
    pub slot: String,
    pub version: i64,
    pub max_version: i64,
    pub file: PathBuf,
    pub thumbnail: Option<PathBuf>,
}

pub struct VersionStore {
    layout: ProjectLayout,
    broker: Arc<LedgerBroker>,
}

impl VersionStore {
    pub fn new(layout: ProjectLayout, broker: Arc<LedgerBroker>) -> Self {
        Self { layout, broker }
    }

    /// Allocate the next version for a slot, store the media blob, and make
    /// the new version current ("latest wins"). The thumbnail reference is
    /// attached later via [`VersionStore::attach_thumbnail`] so generation
    /// happens outside the ledger lock.
    pub fn add_version(
        &self,
        shot: &str,
        slot: AssetSlot,
        source: &Path,
    ) -> Result<VersionRecord, ShotdeckError> {
        check_slot_enabled(slot)?;
        let kind = media::classify(source);
        if kind != slot.expected_kind() {
            return Err(ShotdeckError::UnsupportedMediaKind(format!(
                "{} does not accept '{}' files",
                slot,
                source
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("(none)")
            )));
        }
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                ShotdeckError::UnsupportedMediaKind("file has no extension".to_string())
            })?;

        let layout = self.layout.clone();
        let shot_owned = shot.to_string();
        self.broker.with_conn("version.add", Some(shot), move |conn| {
            let tx = conn.transaction()?;
            require_shot(&tx, &shot_owned)?;

            let next = max_version(&tx, &shot_owned, slot)? + 1;
            let wip_dir = layout.slot_wip_dir(&shot_owned, slot);
            fs::create_dir_all(&wip_dir)?;
            let filename = format!("{}_v{:03}.{}", slot.file_base(&shot_owned), next, ext);
            let wip_path = wip_dir.join(filename);
            fs::copy(source, &wip_path)?;

            tx.execute(
                "INSERT INTO versions(shot, slot, version, file_path, thumbnail_path, created_at)
                 VALUES(?1, ?2, ?3, ?4, NULL, ?5)",
                params![
                    shot_owned,
                    slot.key(),
                    next,
                    layout.relativize(&wip_path),
                    time::now_epoch_z()
                ],
            )?;
            set_current(&tx, &shot_owned, slot, next)?;
            tx.commit()?;

            // The mirror is derived state; refresh it only once the ledger
            // row is durable.
            refresh_latest(&layout, &shot_owned, slot, &wip_path)?;

            Ok(VersionRecord {
                shot: shot_owned.clone(),
                slot: slot.key().to_string(),
                version: next,
                max_version: next,
                file: wip_path,
                thumbnail: None,
            })
        })
    }

    /// Repoint the current-version pointer. Non-destructive, reversible,
    /// and a no-op success when `version` is already current.
    pub fn promote(
        &self,
        shot: &str,
        slot: AssetSlot,
        version: i64,
    ) -> Result<VersionRecord, ShotdeckError> {
        check_slot_enabled(slot)?;
        let layout = self.layout.clone();
        let shot_owned = shot.to_string();
        self.broker
            .with_conn("version.promote", Some(shot), move |conn| {
                let tx = conn.transaction()?;
                let record = promote_tx(&tx, &layout, &shot_owned, slot, version)?;
                tx.commit()?;
                refresh_latest(&layout, &shot_owned, slot, &record.file)?;
                Ok(record)
            })
    }

    /// Advance the current pointer to `(current % max) + 1`. Returns `None`
    /// when the slot has no versions yet.
    pub fn cycle(
        &self,
        shot: &str,
        slot: AssetSlot,
    ) -> Result<Option<VersionRecord>, ShotdeckError> {
        check_slot_enabled(slot)?;
        let layout = self.layout.clone();
        let shot_owned = shot.to_string();
        self.broker
            .with_conn("version.cycle", Some(shot), move |conn| {
                let tx = conn.transaction()?;
                require_shot(&tx, &shot_owned)?;
                let max = max_version(&tx, &shot_owned, slot)?;
                if max == 0 {
                    return Ok(None);
                }
                let next = current_version(&tx, &shot_owned, slot)? % max + 1;
                let record = promote_tx(&tx, &layout, &shot_owned, slot, next)?;
                tx.commit()?;
                refresh_latest(&layout, &shot_owned, slot, &record.file)?;
                Ok(Some(record))
            })
    }

    /// Storage locations for a version, defaulting to the current one.
    /// Reads take a plain snapshot connection, no ledger lock.
    pub fn resolve(
        &self,
        shot: &str,
        slot: AssetSlot,
        version: Option<i64>,
    ) -> Result<VersionRecord, ShotdeckError> {
        let conn = self.read_conn()?;
        require_shot(&conn, shot)?;
        let version = match version {
            Some(v) => v,
            None => current_version(&conn, shot, slot)?,
        };
        record(&conn, &self.layout, shot, slot, version)
    }

    pub fn slot_state(&self, shot: &str, slot: AssetSlot) -> Result<(i64, i64), ShotdeckError> {
        let conn = self.read_conn()?;
        Ok((
            current_version(&conn, shot, slot)?,
            max_version(&conn, shot, slot)?,
        ))
    }

    /// Current record for a slot, or `None` when nothing has been uploaded.
    pub fn current(
        &self,
        shot: &str,
        slot: AssetSlot,
    ) -> Result<Option<VersionRecord>, ShotdeckError> {
        let conn = self.read_conn()?;
        let current = current_version(&conn, shot, slot)?;
        if current == 0 {
            return Ok(None);
        }
        record(&conn, &self.layout, shot, slot, current).map(Some)
    }

    /// Follow-up update attaching a thumbnail reference after the version
    /// row has been committed.
    pub fn attach_thumbnail(
        &self,
        shot: &str,
        slot: AssetSlot,
        version: i64,
        thumbnail: &Path,
    ) -> Result<(), ShotdeckError> {
        let rel = self.layout.relativize(thumbnail);
        let shot_owned = shot.to_string();
        self.broker
            .with_conn("version.attach_thumbnail", Some(shot), move |conn| {
                let updated = conn.execute(
                    "UPDATE versions SET thumbnail_path = ?1 WHERE shot = ?2 AND slot = ?3 AND version = ?4",
                    params![rel, shot_owned, slot.key(), version],
                )?;
                if updated == 0 {
                    return Err(ShotdeckError::VersionNotFound {
                        shot: shot_owned.clone(),
                        slot: slot.key().to_string(),
                        version,
                    });
                }
                Ok(())
            })
    }

    fn read_conn(&self) -> Result<Connection, ShotdeckError> {
        crate::core::db::db_connect(&crate::core::db::ledger_db_path(self.layout.root()))
    }
}

fn check_slot_enabled(slot: AssetSlot) -> Result<(), ShotdeckError> {
    if !slot.enabled() {
        return Err(ShotdeckError::UnsupportedMediaKind(format!(
            "slot '{}' is disabled",
            slot
        )));
    }
    Ok(())
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

fn max_version(conn: &Connection, shot: &str, slot: AssetSlot) -> Result<i64, ShotdeckError> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(version) FROM versions WHERE shot = ?1 AND slot = ?2",
        params![shot, slot.key()],
        |row| row.get(0),
    )?;
    Ok(max.unwrap_or(0))
}

/// 0 is the sentinel for "no asset uploaded yet".
fn current_version(conn: &Connection, shot: &str, slot: AssetSlot) -> Result<i64, ShotdeckError> {
    let current: Option<i64> = conn
        .query_row(
            "SELECT version FROM current_versions WHERE shot = ?1 AND slot = ?2",
            params![shot, slot.key()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(current.unwrap_or(0))
}

fn set_current(
    conn: &Connection,
    shot: &str,
    slot: AssetSlot,
    version: i64,
) -> Result<(), ShotdeckError> {
    conn.execute(
        "INSERT INTO current_versions(shot, slot, version) VALUES(?1, ?2, ?3)
         ON CONFLICT(shot, slot) DO UPDATE SET version = excluded.version",
        params![shot, slot.key(), version],
    )?;
    Ok(())
}

fn record(
    conn: &Connection,
    layout: &ProjectLayout,
    shot: &str,
    slot: AssetSlot,
    version: i64,
) -> Result<VersionRecord, ShotdeckError> {
    let row: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT file_path, thumbnail_path FROM versions
             WHERE shot = ?1 AND slot = ?2 AND version = ?3",
            params![shot, slot.key(), version],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let (file_rel, thumb_rel) = row.ok_or_else(|| ShotdeckError::VersionNotFound {
        shot: shot.to_string(),
        slot: slot.key().to_string(),
        version,
    })?;
    Ok(VersionRecord {
        shot: shot.to_string(),
        slot: slot.key().to_string(),
        version,
        max_version: max_version(conn, shot, slot)?,
        file: layout.resolve_rel(&file_rel),
        thumbnail: thumb_rel.map(|t| layout.resolve_rel(&t)),
    })
}

fn promote_tx(
    tx: &Transaction<'_>,
    layout: &ProjectLayout,
    shot: &str,
    slot: AssetSlot,
    version: i64,
) -> Result<VersionRecord, ShotdeckError> {
    require_shot(tx, shot)?;
    let max = max_version(tx, shot, slot)?;
    if version < 1 || version > max {
        return Err(ShotdeckError::VersionNotFound {
            shot: shot.to_string(),
            slot: slot.key().to_string(),
            version,
        });
    }
    let rec = record(tx, layout, shot, slot, version)?;
    set_current(tx, shot, slot, version)?;
    Ok(rec)
}

/// Mirror `file` as `<latest dir>/<base>.<ext>`, dropping stale mirrors of
/// the same base with a different extension.
fn refresh_latest(
    layout: &ProjectLayout,
    shot: &str,
    slot: AssetSlot,
    file: &Path,
) -> Result<(), ShotdeckError> {
    let latest_dir = layout.latest_dir(shot, slot);
    fs::create_dir_all(&latest_dir)?;
    let base = slot.file_base(shot);
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let target = latest_dir.join(format!("{}.{}", base, ext));

    for entry in fs::read_dir(&latest_dir)? {
        let entry = entry?;
        let path = entry.path();
        let stem_matches = path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s == base)
            .unwrap_or(false);
        if stem_matches && path != target {
            fs::remove_file(&path)?;
        }
    }
    fs::copy(file, &target)?;
    Ok(())
}

/// Rewrite ledger-relative paths after a shot rename. Runs inside the
/// rename transaction; row keys themselves follow the `shots` row via
/// `ON UPDATE CASCADE`.
pub fn rekey_paths_tx(
    tx: &Transaction<'_>,
    old_name: &str,
    new_name: &str,
) -> Result<(), ShotdeckError> {
    tx.execute(
        "UPDATE versions SET
             file_path = replace(file_path, ?1, ?2),
             thumbnail_path = replace(thumbnail_path, ?1, ?2)
         WHERE shot = ?3",
        params![old_name, new_name, new_name],
    )?;
    Ok(())
}

/// Rename every media file and directory carrying the old shot name.
/// Called before the rename transaction; reversed best-effort on failure.
pub fn migrate_files(
    layout: &ProjectLayout,
    old_name: &str,
    new_name: &str,
) -> Result<(), ShotdeckError> {
    let old_dir = layout.shot_dir(old_name);
    let new_dir = layout.shot_dir(new_name);
    if old_dir.exists() {
        fs::rename(&old_dir, &new_dir)?;
    }

    for sub in ["images", "videos", "lipsync"] {
        rename_prefixed(&new_dir.join(sub), old_name, new_name)?;
    }
    rename_prefixed(&layout.latest_images_dir(), old_name, new_name)?;
    rename_prefixed(&layout.latest_videos_dir(), old_name, new_name)?;
    rename_prefixed(&layout.thumbnails_dir(), old_name, new_name)?;
    Ok(())
}

/// Ownership is matched against the shot's slot file bases, never a bare
/// `<shot>_` prefix: a sub-shot like `SH010_050` shares that prefix with
/// `SH010` but its files belong to the sub-shot alone.
fn rename_prefixed(dir: &Path, old_name: &str, new_name: &str) -> Result<(), ShotdeckError> {
    if !dir.exists() {
        return Ok(());
    }
    let slots = [
        AssetSlot::FirstImage,
        AssetSlot::LastImage,
        AssetSlot::Video,
        AssetSlot::Lipsync(LipsyncTrack::Driver),
        AssetSlot::Lipsync(LipsyncTrack::Target),
        AssetSlot::Lipsync(LipsyncTrack::Result),
    ];
    let mut prefixes = Vec::with_capacity(slots.len() * 2);
    for slot in slots {
        let base = slot.file_base(old_name);
        // `<base>.<ext>` mirrors, `<base>_v###...` versions and thumbnails.
        prefixes.push(format!("{}.", base));
        prefixes.push(format!("{}_v", base));
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            let renamed = name.replacen(old_name, new_name, 1);
            fs::rename(entry.path(), dir.join(renamed))?;
        }
    }
    Ok(())
}

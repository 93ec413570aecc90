use rusqlite;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShotdeckError {
    #[error("Shot not found: {0}")]
    ShotNotFound(String),
    #[error("Shot already exists: {0}")]
    NameConflict(String),
    #[error("Version {version} not found for {shot}/{slot}")]
    VersionNotFound {
        shot: String,
        slot: String,
        version: i64,
    },
    #[error("Unsupported media kind: {0}")]
    UnsupportedMediaKind(String),
    #[error("Reorder mismatch: {0}")]
    OrderMismatch(String),
    #[error("Partial rename, stores inconsistent: {0}")]
    PartialRename(String),
    #[error("SQLite error: {0}")]
    Persistence(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Thumbnail generation failed: {0}")]
    ThumbnailGeneration(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("No project open: {0}")]
    NoProject(String),
}

//! Centralized schema definitions for the per-project ledger database.
//!
//! One SQLite database lives under each project root. It is the source of
//! truth for shot identity/ordering, version numbering, current-version
//! pointers, and all textual metadata. Media blobs stay in the file tree;
//! the ledger only records their paths.

pub const LEDGER_DB_NAME: &str = "shotdeck.db";
pub const LEDGER_EVENTS_NAME: &str = "ledger.events.jsonl";

pub const LEDGER_SCHEMA_SHOTS: &str = "
    CREATE TABLE IF NOT EXISTS shots (
        name TEXT PRIMARY KEY,
        display_name TEXT,
        notes TEXT NOT NULL DEFAULT '',
        archived INTEGER NOT NULL DEFAULT 0,
        order_index INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";

pub const LEDGER_SCHEMA_VERSIONS: &str = "
    CREATE TABLE IF NOT EXISTS versions (
        shot TEXT NOT NULL,
        slot TEXT NOT NULL,
        version INTEGER NOT NULL CHECK(version >= 1),
        file_path TEXT NOT NULL,
        thumbnail_path TEXT,
        created_at TEXT NOT NULL,
        PRIMARY KEY(shot, slot, version),
        FOREIGN KEY(shot) REFERENCES shots(name) ON UPDATE CASCADE
    )
";

pub const LEDGER_SCHEMA_CURRENT_VERSIONS: &str = "
    CREATE TABLE IF NOT EXISTS current_versions (
        shot TEXT NOT NULL,
        slot TEXT NOT NULL,
        version INTEGER NOT NULL CHECK(version >= 1),
        PRIMARY KEY(shot, slot),
        FOREIGN KEY(shot, slot, version) REFERENCES versions(shot, slot, version) ON UPDATE CASCADE
    )
";

pub const LEDGER_SCHEMA_PROMPTS: &str = "
    CREATE TABLE IF NOT EXISTS prompts (
        shot TEXT NOT NULL,
        slot TEXT NOT NULL,
        version INTEGER NOT NULL,
        text TEXT NOT NULL,
        PRIMARY KEY(shot, slot, version)
    )
";

pub const LEDGER_SCHEMA_CAPTIONS: &str = "
    CREATE TABLE IF NOT EXISTS captions (
        shot TEXT NOT NULL,
        slot TEXT NOT NULL,
        text TEXT NOT NULL,
        PRIMARY KEY(shot, slot)
    )
";

pub const LEDGER_SCHEMA_PROJECT_INFO: &str = "
    CREATE TABLE IF NOT EXISTS project_info (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const LEDGER_SCHEMA_INDEX_VERSIONS: &str =
    "CREATE INDEX IF NOT EXISTS idx_versions_shot_slot ON versions(shot, slot)";

pub const LEDGER_SCHEMAS: &[&str] = &[
    LEDGER_SCHEMA_SHOTS,
    LEDGER_SCHEMA_VERSIONS,
    LEDGER_SCHEMA_CURRENT_VERSIONS,
    LEDGER_SCHEMA_PROMPTS,
    LEDGER_SCHEMA_CAPTIONS,
    LEDGER_SCHEMA_PROJECT_INFO,
    LEDGER_SCHEMA_INDEX_VERSIONS,
];

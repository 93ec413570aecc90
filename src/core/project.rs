//! Project lifecycle: open/create, per-project session state, project
//! info, and the global recent-projects config.
//!
//! A `ProjectSession` owns one instance each of the registry and the two
//! stores, all bound to one project root. Switching projects means
//! dropping the session and opening another; nothing ambient survives.

use crate::core::broker::LedgerBroker;
use crate::core::db;
use crate::core::error::ShotdeckError;
use crate::core::layout::ProjectLayout;
use crate::core::metadata::MetadataStore;
use crate::core::registry::ShotRegistry;
use crate::core::time;
use crate::core::version_store::VersionStore;
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_RECENT_PROJECTS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub path: PathBuf,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub created: String,
    pub updated: String,
}

pub struct ProjectSession {
    layout: ProjectLayout,
    broker: Arc<LedgerBroker>,
    pub registry: ShotRegistry,
    pub versions: VersionStore,
    pub metadata: MetadataStore,
}

impl ProjectSession {
    /// Create `<parent>/<name>` with the full directory skeleton and an
    /// initialized ledger, then open it.
    pub fn create(parent: &Path, name: &str) -> Result<Self, ShotdeckError> {
        let root = parent.join(name);
        fs::create_dir_all(&root)?;
        ProjectLayout::new(&root).ensure()?;
        Self::open(&root)
    }

    /// Open an existing project. The directory must already look like a
    /// project (a `shots/` tree or a ledger database).
    pub fn open(root: &Path) -> Result<Self, ShotdeckError> {
        let root = fs::canonicalize(root)?;
        if !root.join("shots").exists() && !db::ledger_db_path(&root).exists() {
            return Err(ShotdeckError::NoProject(format!(
                "no recognizable project structure at {}",
                root.display()
            )));
        }
        let layout = ProjectLayout::new(&root);
        layout.ensure()?;
        db::initialize_ledger_db(&root)?;

        let broker = Arc::new(LedgerBroker::new(&root));
        let session = Self {
            registry: ShotRegistry::new(layout.clone(), Arc::clone(&broker)),
            versions: VersionStore::new(layout.clone(), Arc::clone(&broker)),
            metadata: MetadataStore::new(layout.clone(), Arc::clone(&broker)),
            layout,
            broker,
        };
        session.seed_info()?;
        Ok(session)
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn name(&self) -> String {
        self.root()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root().display().to_string())
    }

    pub fn info(&self) -> Result<ProjectInfo, ShotdeckError> {
        let conn = db::db_connect(&db::ledger_db_path(self.root()))?;
        let get = |key: &str| -> Result<Option<String>, ShotdeckError> {
            Ok(conn
                .query_row(
                    "SELECT value FROM project_info WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        };
        let tags: Vec<String> = get("tags")?
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Ok(ProjectInfo {
            name: self.name(),
            path: self.root().to_path_buf(),
            title: get("title")?.unwrap_or_default(),
            description: get("description")?.unwrap_or_default(),
            tags,
            created: get("created")?.unwrap_or_default(),
            updated: get("updated")?.unwrap_or_default(),
        })
    }

    pub fn set_info(
        &self,
        title: Option<&str>,
        description: Option<&str>,
        tags: Option<&[String]>,
    ) -> Result<ProjectInfo, ShotdeckError> {
        let title = title.map(|s| s.to_string());
        let description = description.map(|s| s.to_string());
        let tags_json = match tags {
            Some(tags) => Some(
                serde_json::to_string(tags)
                    .map_err(|e| ShotdeckError::Validation(format!("tags: {}", e)))?,
            ),
            None => None,
        };
        self.broker.with_conn("project.set_info", None, move |conn| {
            let mut upsert = |key: &str, value: &str| -> Result<(), ShotdeckError> {
                conn.execute(
                    "INSERT INTO project_info(key, value) VALUES(?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    params![key, value],
                )?;
                Ok(())
            };
            if let Some(title) = &title {
                upsert("title", title)?;
            }
            if let Some(description) = &description {
                upsert("description", description)?;
            }
            if let Some(tags_json) = &tags_json {
                upsert("tags", tags_json)?;
            }
            upsert("updated", &time::now_epoch_z())?;
            Ok(())
        })?;
        self.info()
    }

    fn seed_info(&self) -> Result<(), ShotdeckError> {
        self.broker.with_conn("project.seed_info", None, |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO project_info(key, value) VALUES('created', ?1)",
                params![time::now_epoch_z()],
            )?;
            Ok(())
        })
    }
}

/// Global pointer to the current project plus a capped recents list,
/// persisted as `projects.json` in the user config directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectsConfig {
    pub current_project: Option<PathBuf>,
    pub recent_projects: Vec<PathBuf>,
}

impl ProjectsConfig {
    pub fn config_path() -> PathBuf {
        let dir = std::env::var_os("SHOTDECK_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = std::env::var_os("HOME")
                    .or_else(|| std::env::var_os("USERPROFILE"))
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."));
                home.join(".shotdeck")
            });
        dir.join("projects.json")
    }

    /// Missing or unreadable config is treated as empty, never an error.
    pub fn load() -> Self {
        let path = Self::config_path();
        fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), ShotdeckError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| ShotdeckError::Validation(format!("projects config: {}", e)))?;
        fs::write(&path, raw)?;
        Ok(())
    }

    pub fn set_current(&mut self, root: &Path) -> Result<(), ShotdeckError> {
        let root = root.to_path_buf();
        self.recent_projects.retain(|p| p != &root);
        self.recent_projects.insert(0, root.clone());
        self.recent_projects.truncate(MAX_RECENT_PROJECTS);
        self.current_project = Some(root);
        self.save()
    }

    /// The current project root, falling back to the first recent path
    /// that still looks like a project.
    pub fn resolve_current(&mut self) -> Option<PathBuf> {
        let looks_like_project = |p: &Path| p.join("shots").exists();
        if let Some(current) = &self.current_project {
            if looks_like_project(current) {
                return Some(current.clone());
            }
        }
        let fallback = self
            .recent_projects
            .iter()
            .find(|p| looks_like_project(p))
            .cloned()?;
        let _ = self.set_current(&fallback);
        Some(fallback)
    }
}

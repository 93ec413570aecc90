//! On-disk layout of a project directory.
//!
//! ```text
//! <root>/
//!   shotdeck.db              version ledger + metadata
//!   ledger.events.jsonl      mutation audit trail
//!   shots/
//!     wip/<shot>/{images,videos,lipsync}/   versioned originals
//!     latest_images/         mirror of each image slot's current version
//!     latest_videos/         mirror of each video slot's current version
//!   .shotdeck/thumbnails/    regenerable thumbnail cache
//! ```

use crate::core::error::ShotdeckError;
use crate::core::media::AssetSlot;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn shots_dir(&self) -> PathBuf {
        self.root.join("shots")
    }

    pub fn wip_dir(&self) -> PathBuf {
        self.shots_dir().join("wip")
    }

    pub fn shot_dir(&self, shot: &str) -> PathBuf {
        self.wip_dir().join(shot)
    }

    pub fn slot_wip_dir(&self, shot: &str, slot: AssetSlot) -> PathBuf {
        self.shot_dir(shot).join(slot.wip_subdir())
    }

    pub fn latest_images_dir(&self) -> PathBuf {
        self.shots_dir().join("latest_images")
    }

    pub fn latest_videos_dir(&self) -> PathBuf {
        self.shots_dir().join("latest_videos")
    }

    /// Directory holding the "current version" mirror copy for a slot.
    /// Lipsync keeps its mirror next to the versioned files.
    pub fn latest_dir(&self, shot: &str, slot: AssetSlot) -> PathBuf {
        match slot {
            AssetSlot::FirstImage | AssetSlot::LastImage => self.latest_images_dir(),
            AssetSlot::Video => self.latest_videos_dir(),
            AssetSlot::Lipsync(_) => self.slot_wip_dir(shot, slot),
        }
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join(".shotdeck").join("thumbnails")
    }

    /// Create the base directory skeleton. Idempotent.
    pub fn ensure(&self) -> Result<(), ShotdeckError> {
        fs::create_dir_all(self.wip_dir())?;
        fs::create_dir_all(self.latest_images_dir())?;
        fs::create_dir_all(self.latest_videos_dir())?;
        fs::create_dir_all(self.thumbnails_dir())?;
        Ok(())
    }

    /// Create the per-shot subfolders. Idempotent.
    pub fn ensure_shot_dirs(&self, shot: &str) -> Result<(), ShotdeckError> {
        let dir = self.shot_dir(shot);
        fs::create_dir_all(dir.join("images"))?;
        fs::create_dir_all(dir.join("videos"))?;
        fs::create_dir_all(dir.join("lipsync"))?;
        Ok(())
    }

    /// Join a ledger-relative path back to an absolute one.
    pub fn resolve_rel(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Express `path` relative to the project root for ledger storage.
    /// Paths are stored relative so a project directory can be moved.
    pub fn relativize(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.to_string_lossy().replace('\\', "/")
    }
}

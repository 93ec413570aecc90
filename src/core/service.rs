//! Orchestration over the registry and both stores.
//!
//! The service is the one caller-facing surface: every operation returns a
//! refreshed [`Shot`] snapshot assembled by joining registry rows with
//! version-ledger and metadata state, so the presentation layer never
//! reads the stores directly.

use crate::core::error::ShotdeckError;
use crate::core::layout::ProjectLayout;
use crate::core::media::{self, AssetSlot, MediaKind};
use crate::core::project::ProjectSession;
use crate::core::prompt_import;
use crate::core::registry::ShotRow;
use crate::core::thumbs::{DiskThumbnailer, ThumbnailGenerator};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One slot of a shot as the presentation layer sees it. `version` 0 with
/// no file means nothing has been uploaded yet.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub file: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
    pub version: i64,
    pub max_version: i64,
    pub prompt: String,
    pub caption: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Shot {
    pub name: String,
    pub display_name: Option<String>,
    pub notes: String,
    pub archived: bool,
    pub order_index: i64,
    pub first_image: SlotView,
    pub last_image: SlotView,
    pub video: SlotView,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptEditing {
    pub text: String,
    /// Prior version's prompt offered as a copy source, populated only when
    /// the requested version is the newest and has no prompt of its own.
    pub suggested_copy_from: Option<String>,
}

pub struct ShotService {
    session: ProjectSession,
    thumbs: Box<dyn ThumbnailGenerator>,
}

impl ShotService {
    pub fn new(session: ProjectSession) -> Self {
        let thumbs = DiskThumbnailer::new(session.layout().thumbnails_dir());
        Self::with_thumbnailer(session, Box::new(thumbs))
    }

    pub fn with_thumbnailer(session: ProjectSession, thumbs: Box<dyn ThumbnailGenerator>) -> Self {
        Self { session, thumbs }
    }

    pub fn session(&self) -> &ProjectSession {
        &self.session
    }

    pub fn layout(&self) -> &ProjectLayout {
        self.session.layout()
    }

    pub fn shot(&self, name: &str) -> Result<Shot, ShotdeckError> {
        let row = self.session.registry.get(name)?;
        self.assemble(row)
    }

    pub fn list(&self) -> Result<Vec<Shot>, ShotdeckError> {
        self.session
            .registry
            .list()?
            .into_iter()
            .map(|row| self.assemble(row))
            .collect()
    }

    pub fn create_shot(&self, after: Option<&str>) -> Result<Shot, ShotdeckError> {
        let row = self.session.registry.create(after)?;
        self.assemble(row)
    }

    /// Store a new version of `source` in a slot. Thumbnail generation and
    /// PNG prompt import run after the version commits; neither can fail
    /// the upload.
    pub fn upload(
        &self,
        shot: &str,
        slot: AssetSlot,
        source: &Path,
    ) -> Result<Shot, ShotdeckError> {
        let record = self.session.versions.add_version(shot, slot, source)?;

        match self.thumbs.generate(&record.file, slot.expected_kind()) {
            Ok(thumb) => {
                self.session
                    .versions
                    .attach_thumbnail(shot, slot, record.version, &thumb)?;
            }
            Err(e) => eprintln!("warning: thumbnail skipped for {}: {}", record.file.display(), e),
        }

        if slot.expected_kind() == MediaKind::Image {
            self.import_png_prompt(shot, slot, record.version, &record.file);
        }

        self.shot(shot)
    }

    /// Create a shot and populate it in one step. Creation and population
    /// are deliberately independent: if the upload fails the new shot
    /// stays, matching the create-then-fill workflow.
    pub fn upload_to_new_shot(
        &self,
        after: Option<&str>,
        source: &Path,
    ) -> Result<Shot, ShotdeckError> {
        let row = self.session.registry.create(after)?;
        let slot = match media::classify(source) {
            MediaKind::Image => AssetSlot::FirstImage,
            MediaKind::Video => AssetSlot::Video,
            MediaKind::Unsupported => {
                return Err(ShotdeckError::UnsupportedMediaKind(format!(
                    "cannot determine a slot for {}",
                    source.display()
                )));
            }
        };
        self.upload(&row.name, slot, source)
    }

    pub fn promote(
        &self,
        shot: &str,
        slot: AssetSlot,
        version: i64,
    ) -> Result<Shot, ShotdeckError> {
        self.session.versions.promote(shot, slot, version)?;
        self.shot(shot)
    }

    pub fn cycle(&self, shot: &str, slot: AssetSlot) -> Result<Shot, ShotdeckError> {
        self.session.versions.cycle(shot, slot)?;
        self.shot(shot)
    }

    pub fn rename(&self, old_name: &str, new_name: &str) -> Result<Shot, ShotdeckError> {
        let row = self.session.registry.rename(old_name, new_name)?;
        self.assemble(row)
    }

    pub fn set_archived(&self, name: &str, archived: bool) -> Result<Shot, ShotdeckError> {
        let row = self.session.registry.set_archived(name, archived)?;
        self.assemble(row)
    }

    pub fn reorder(&self, names: &[String]) -> Result<Vec<Shot>, ShotdeckError> {
        self.session.registry.reorder(names)?;
        self.list()
    }

    /// Prompt text for an editor, with the "copy previous prompt"
    /// affordance: when the newest version has no prompt yet, the nearest
    /// earlier non-empty prompt is offered as a suggested value.
    pub fn get_prompt_for_editing(
        &self,
        shot: &str,
        slot: AssetSlot,
        version: i64,
    ) -> Result<PromptEditing, ShotdeckError> {
        self.session.registry.get(shot)?;
        let text = self.session.metadata.get_prompt(shot, slot, version)?;
        let (_, max) = self.session.versions.slot_state(shot, slot)?;

        let mut suggested_copy_from = None;
        if text.is_empty() && version == max && version > 1 {
            let earlier = self
                .session
                .metadata
                .prompt_versions(shot, slot)?
                .into_iter()
                .filter(|v| *v < version)
                .max();
            if let Some(prior) = earlier {
                let prior_text = self.session.metadata.get_prompt(shot, slot, prior)?;
                if !prior_text.is_empty() {
                    suggested_copy_from = Some(prior_text);
                }
            }
        }
        Ok(PromptEditing {
            text,
            suggested_copy_from,
        })
    }

    /// Regenerate thumbnails for every slot's current version. Used after
    /// project open, when the cache has been cleared.
    pub fn refresh_thumbnails(&self) -> Result<usize, ShotdeckError> {
        let mut refreshed = 0;
        for row in self.session.registry.list()? {
            for slot in AssetSlot::ACTIVE {
                let Some(record) = self.session.versions.current(&row.name, *slot)? else {
                    continue;
                };
                match self.thumbs.generate(&record.file, slot.expected_kind()) {
                    Ok(thumb) => {
                        self.session.versions.attach_thumbnail(
                            &row.name,
                            *slot,
                            record.version,
                            &thumb,
                        )?;
                        refreshed += 1;
                    }
                    Err(e) => {
                        eprintln!(
                            "warning: thumbnail skipped for {}: {}",
                            record.file.display(),
                            e
                        );
                    }
                }
            }
        }
        Ok(refreshed)
    }

    fn import_png_prompt(&self, shot: &str, slot: AssetSlot, version: i64, file: &Path) {
        let is_png = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("png"))
            .unwrap_or(false);
        if !is_png {
            return;
        }
        let Some(extracted) = prompt_import::extract_prompt_from_png(file) else {
            return;
        };
        let text = extracted.compose();
        if text.is_empty() {
            return;
        }
        if let Err(e) = self.session.metadata.set_prompt(shot, slot, version, &text) {
            eprintln!("warning: failed to save imported prompt: {}", e);
        }
    }

    fn assemble(&self, row: ShotRow) -> Result<Shot, ShotdeckError> {
        Ok(Shot {
            first_image: self.slot_view(&row.name, AssetSlot::FirstImage)?,
            last_image: self.slot_view(&row.name, AssetSlot::LastImage)?,
            video: self.slot_view(&row.name, AssetSlot::Video)?,
            name: row.name,
            display_name: row.display_name,
            notes: row.notes,
            archived: row.archived,
            order_index: row.order_index,
        })
    }

    fn slot_view(&self, shot: &str, slot: AssetSlot) -> Result<SlotView, ShotdeckError> {
        let (current, max) = self.session.versions.slot_state(shot, slot)?;
        let record = self.session.versions.current(shot, slot)?;
        let prompt = if current > 0 {
            self.session.metadata.get_prompt(shot, slot, current)?
        } else {
            String::new()
        };
        Ok(SlotView {
            file: record.as_ref().map(|r| r.file.clone()),
            thumbnail: record.and_then(|r| r.thumbnail),
            version: current,
            max_version: max,
            prompt,
            caption: self.session.metadata.get_caption(shot, slot)?,
        })
    }
}

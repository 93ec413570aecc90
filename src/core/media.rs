//! Media classification and the asset-slot model.
//!
//! A shot owns a fixed set of slots. The lipsync family exists in the type
//! system so re-enabling it stays mechanical, but every active code path
//! rejects it (`AssetSlot::enabled`).

use crate::core::error::ShotdeckError;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];

/// Shot names are `SH###` with an optional single `_###` sub-shot segment.
/// Deeper nesting is not allowed, and `SH000` is reserved.
static SHOT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SH\d{3}(?:_\d{3})?$").unwrap());

pub fn validate_shot_name(name: &str) -> Result<(), ShotdeckError> {
    if !SHOT_NAME_RE.is_match(name) || name == "SH000" {
        return Err(ShotdeckError::Validation(format!(
            "Invalid shot name: {}",
            name
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Unsupported,
}

/// Map a filename to its media kind by extension alone.
pub fn classify(path: &Path) -> MediaKind {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_ascii_lowercase(),
        None => return MediaKind::Unsupported,
    };
    if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Image
    } else if ALLOWED_VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else {
        MediaKind::Unsupported
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LipsyncTrack {
    Driver,
    Target,
    Result,
}

impl LipsyncTrack {
    pub fn key(&self) -> &'static str {
        match self {
            LipsyncTrack::Driver => "driver",
            LipsyncTrack::Target => "target",
            LipsyncTrack::Result => "result",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetSlot {
    FirstImage,
    LastImage,
    Video,
    Lipsync(LipsyncTrack),
}

impl AssetSlot {
    /// The three slots with live code paths.
    pub const ACTIVE: &[AssetSlot] = &[AssetSlot::FirstImage, AssetSlot::LastImage, AssetSlot::Video];

    /// Stable key used in ledger rows and CLI arguments.
    pub fn key(&self) -> &'static str {
        match self {
            AssetSlot::FirstImage => "first_image",
            AssetSlot::LastImage => "last_image",
            AssetSlot::Video => "video",
            AssetSlot::Lipsync(LipsyncTrack::Driver) => "lipsync_driver",
            AssetSlot::Lipsync(LipsyncTrack::Target) => "lipsync_target",
            AssetSlot::Lipsync(LipsyncTrack::Result) => "lipsync_result",
        }
    }

    /// Lipsync is dormant capability: modeled, never reachable.
    pub fn enabled(&self) -> bool {
        !matches!(self, AssetSlot::Lipsync(_))
    }

    pub fn expected_kind(&self) -> MediaKind {
        match self {
            AssetSlot::FirstImage | AssetSlot::LastImage => MediaKind::Image,
            AssetSlot::Video | AssetSlot::Lipsync(_) => MediaKind::Video,
        }
    }

    /// Subdirectory under `shots/wip/<shot>/` holding this slot's versions.
    pub fn wip_subdir(&self) -> &'static str {
        match self {
            AssetSlot::FirstImage | AssetSlot::LastImage => "images",
            AssetSlot::Video => "videos",
            AssetSlot::Lipsync(_) => "lipsync",
        }
    }

    /// Filename stem for versioned files, e.g. `SH010_first` or `SH010`.
    pub fn file_base(&self, shot: &str) -> String {
        match self {
            AssetSlot::FirstImage => format!("{}_first", shot),
            AssetSlot::LastImage => format!("{}_last", shot),
            AssetSlot::Video => shot.to_string(),
            AssetSlot::Lipsync(track) => format!("{}_{}", shot, track.key()),
        }
    }
}

impl fmt::Display for AssetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AssetSlot {
    type Err = ShotdeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_image" | "first" => Ok(AssetSlot::FirstImage),
            "last_image" | "last" => Ok(AssetSlot::LastImage),
            "video" => Ok(AssetSlot::Video),
            other => Err(ShotdeckError::UnsupportedMediaKind(format!(
                "unknown slot '{}' (expected first_image, last_image, or video)",
                other
            ))),
        }
    }
}

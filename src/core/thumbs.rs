//! Thumbnail generation for image and video assets.
//!
//! Thumbnails are a regenerable cache: generation failure must never fail
//! the enclosing upload, and a version without a thumbnail renders as a
//! plain placeholder. Video frames are grabbed with `ffmpeg` when the
//! binary is on PATH; without it video thumbnails are simply skipped.

use crate::core::error::ShotdeckError;
use crate::core::media::MediaKind;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{RgbImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default thumbnail resolution (width, height).
pub const THUMBNAIL_SIZE: (u32, u32) = (240, 180);
const JPEG_QUALITY: u8 = 85;
const MATTE_GRAY: [u8; 3] = [64, 64, 64];

pub trait ThumbnailGenerator {
    fn generate(&self, file: &Path, kind: MediaKind) -> Result<PathBuf, ShotdeckError>;
}

pub struct DiskThumbnailer {
    cache_dir: PathBuf,
}

impl DiskThumbnailer {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Remove every cached thumbnail. Called on project open so stale
    /// entries from a previous project never leak through.
    pub fn clear_cache(&self) -> Result<(), ShotdeckError> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
            return Ok(());
        }
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    fn thumb_path(&self, file: &Path, suffix: &str) -> PathBuf {
        let stem = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("asset");
        self.cache_dir.join(format!("{}_{}.jpg", stem, suffix))
    }

    fn image_thumbnail(&self, file: &Path) -> Result<PathBuf, ShotdeckError> {
        let img = image::open(file)
            .map_err(|e| ShotdeckError::ThumbnailGeneration(format!("{}: {}", file.display(), e)))?;
        let out = self.thumb_path(file, "thumb");
        fs::create_dir_all(&self.cache_dir)?;
        write_jpeg_thumbnail(&img, &out)?;
        Ok(out)
    }

    fn video_thumbnail(&self, file: &Path) -> Result<PathBuf, ShotdeckError> {
        let ffmpeg = ffmpeg_path().ok_or_else(|| {
            ShotdeckError::ThumbnailGeneration("ffmpeg not found on PATH".to_string())
        })?;
        fs::create_dir_all(&self.cache_dir)?;
        let tmp = self.thumb_path(file, "frame.tmp");
        let status = Command::new(ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(file)
            .args(["-frames:v", "1"])
            .arg(&tmp)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            let _ = fs::remove_file(&tmp);
            return Err(ShotdeckError::ThumbnailGeneration(format!(
                "ffmpeg exited with {} for {}",
                status,
                file.display()
            )));
        }
        let result = image::open(&tmp)
            .map_err(|e| ShotdeckError::ThumbnailGeneration(format!("{}: {}", tmp.display(), e)))
            .and_then(|frame| {
                let out = self.thumb_path(file, "vthumb");
                write_jpeg_thumbnail(&frame, &out)?;
                Ok(out)
            });
        let _ = fs::remove_file(&tmp);
        result
    }
}

impl ThumbnailGenerator for DiskThumbnailer {
    fn generate(&self, file: &Path, kind: MediaKind) -> Result<PathBuf, ShotdeckError> {
        match kind {
            MediaKind::Image => self.image_thumbnail(file),
            MediaKind::Video => self.video_thumbnail(file),
            MediaKind::Unsupported => Err(ShotdeckError::ThumbnailGeneration(format!(
                "unsupported media: {}",
                file.display()
            ))),
        }
    }
}

/// Downscale, flatten any alpha onto a dark gray matte, save as JPEG.
fn write_jpeg_thumbnail(img: &DynamicImage, out: &Path) -> Result<(), ShotdeckError> {
    let (w, h) = THUMBNAIL_SIZE;
    let scaled = img.resize(w, h, FilterType::Lanczos3);
    let flat = flatten_onto_matte(&scaled.to_rgba8());

    let mut writer = fs::File::create(out)?;
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
        .encode_image(&flat)
        .map_err(|e| ShotdeckError::ThumbnailGeneration(format!("{}: {}", out.display(), e)))?;
    Ok(())
}

fn flatten_onto_matte(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let px = rgba.get_pixel(x, y);
        let a = px[3] as u32;
        let blend = |fg: u8, bg: u8| ((fg as u32 * a + bg as u32 * (255 - a)) / 255) as u8;
        image::Rgb([
            blend(px[0], MATTE_GRAY[0]),
            blend(px[1], MATTE_GRAY[1]),
            blend(px[2], MATTE_GRAY[2]),
        ])
    })
}

fn ffmpeg_path() -> Option<PathBuf> {
    let exe = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(exe))
        .find(|candidate| candidate.is_file())
}

//! Wallpaper application sinks.

use crate::assets::{Bitmap, ResourceId};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Errors that can occur while setting the wallpaper.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode wallpaper: {0}")]
    Encode(#[from] image::ImageError),
}

/// Trait for wallpaper sinks. No retries on failure.
pub trait WallpaperSink: Send + Sync {
    fn apply(&self, bitmap: &Bitmap) -> Result<(), ApplyError>;
}

/// Writes the selected wallpaper to a PNG file.
///
/// The image is written next to the target and renamed into place, so
/// readers never see a partial file.
#[derive(Debug, Clone)]
pub struct PngFileSink {
    path: PathBuf,
}

impl PngFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WallpaperSink for PngFileSink {
    fn apply(&self, bitmap: &Bitmap) -> Result<(), ApplyError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let staging = self.path.with_extension("png.partial");
        let written = bitmap
            .image()
            .save_with_format(&staging, ImageFormat::Png)
            .map_err(ApplyError::from)
            .and_then(|()| std::fs::rename(&staging, &self.path).map_err(ApplyError::from));

        if let Err(err) = written {
            // Staging file may not exist if the create itself failed.
            let _ = std::fs::remove_file(&staging);
            return Err(err);
        }

        tracing::debug!(path = %self.path.display(), resource = %bitmap.resource(), "Wallpaper written");
        Ok(())
    }
}

/// Sink that records applied resources, for tests and dry runs.
///
/// Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    applied: Arc<Mutex<Vec<ResourceId>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent applications fail with a permission error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Resources applied so far, oldest first.
    pub fn applied(&self) -> Vec<ResourceId> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl WallpaperSink for RecordingSink {
    fn apply(&self, bitmap: &Bitmap) -> Result<(), ApplyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApplyError::PermissionDenied("SET_WALLPAPER not granted".into()));
        }

        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bitmap.resource());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn bitmap() -> Bitmap {
        Bitmap::new(
            ResourceId::SleepyCat,
            RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])),
        )
    }

    #[test]
    fn test_png_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("wallpaper.png");
        let sink = PngFileSink::new(&path);

        sink.apply(&bitmap()).unwrap();

        let written = image::open(&path).unwrap().to_rgba8();
        assert_eq!(written.dimensions(), (3, 2));
        assert_eq!(written.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
        assert!(!path.with_extension("png.partial").exists());
    }

    #[test]
    fn test_png_sink_failed_rename_removes_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallpaper.png");
        // A non-empty directory at the target makes the rename fail.
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();
        let sink = PngFileSink::new(&path);

        assert!(matches!(sink.apply(&bitmap()), Err(ApplyError::Io(_))));
        assert!(!path.with_extension("png.partial").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_recording_sink_records_and_fails() {
        let sink = RecordingSink::new();

        sink.apply(&bitmap()).unwrap();
        sink.set_failing(true);
        assert!(matches!(
            sink.apply(&bitmap()),
            Err(ApplyError::PermissionDenied(_))
        ));

        assert_eq!(sink.applied(), vec![ResourceId::SleepyCat]);
    }
}

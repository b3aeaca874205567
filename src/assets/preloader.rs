//! Asset preloading abstraction.
//!
//! Decoding happens behind a trait so the controller can be driven by
//! the embedded resources in production and by synthetic bitmaps in tests.

use super::{Bitmap, PreloadedAssets, ResourceId};
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

const LIVELY_CAT_PNG: &[u8] = include_bytes!("../../resources/lively_cat.png");
const SLEEPY_CAT_PNG: &[u8] = include_bytes!("../../resources/sleepy_cat.png");

/// Errors that can occur while loading wallpaper assets.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    #[error("failed to decode resource {resource}: {reason}")]
    Decode {
        resource: ResourceId,
        reason: String,
    },
}

/// Trait for lock-time asset loaders.
pub trait AssetPreloader: Send + Sync {
    /// Decodes both wallpapers.
    fn preload(&self) -> Result<PreloadedAssets, AssetError>;
}

/// Decodes the two PNG resources compiled into the binary.
#[derive(Debug)]
pub struct EmbeddedPreloader {
    lively: &'static [u8],
    sleepy: &'static [u8],
    sequence: AtomicU64,
}

impl Default for EmbeddedPreloader {
    fn default() -> Self {
        Self::with_sources(LIVELY_CAT_PNG, SLEEPY_CAT_PNG)
    }
}

impl EmbeddedPreloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a preloader over custom encoded images.
    pub fn with_sources(lively: &'static [u8], sleepy: &'static [u8]) -> Self {
        Self {
            lively,
            sleepy,
            sequence: AtomicU64::new(0),
        }
    }

    fn decode(resource: ResourceId, bytes: &[u8]) -> Result<Bitmap, AssetError> {
        let image = image::load_from_memory(bytes).map_err(|e| AssetError::Decode {
            resource,
            reason: e.to_string(),
        })?;
        Ok(Bitmap::new(resource, image.to_rgba8()))
    }
}

impl AssetPreloader for EmbeddedPreloader {
    fn preload(&self) -> Result<PreloadedAssets, AssetError> {
        let lively = Self::decode(ResourceId::LivelyCat, self.lively)?;
        let sleepy = Self::decode(ResourceId::SleepyCat, self.sleepy)?;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;

        tracing::debug!(
            sequence,
            width = lively.width(),
            height = lively.height(),
            "Decoded wallpaper assets"
        );

        Ok(PreloadedAssets::new(lively, sleepy, sequence))
    }
}

/// Mock preloader for testing that produces solid-colour bitmaps.
///
/// Clones share state, so a test can keep a handle after moving one
/// into a controller.
#[derive(Debug, Clone, Default)]
pub struct MockPreloader {
    failing: Arc<AtomicBool>,
    loads: Arc<AtomicU64>,
}

impl MockPreloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent preloads fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the number of successful preloads.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }
}

impl AssetPreloader for MockPreloader {
    fn preload(&self) -> Result<PreloadedAssets, AssetError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AssetError::Decode {
                resource: ResourceId::LivelyCat,
                reason: "mock decode failure".into(),
            });
        }

        let sequence = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        let lively = RgbaImage::from_pixel(2, 2, Rgba([240, 160, 40, 255]));
        let sleepy = RgbaImage::from_pixel(2, 2, Rgba([60, 80, 160, 255]));

        Ok(PreloadedAssets::new(
            Bitmap::new(ResourceId::LivelyCat, lively),
            Bitmap::new(ResourceId::SleepyCat, sleepy),
            sequence,
        ))
    }
}

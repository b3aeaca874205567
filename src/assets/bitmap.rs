//! Decoded bitmap handles and the lock-time asset pair.

use image::RgbaImage;
use std::fmt;
use std::sync::Arc;

/// Compiled-in image resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// The cheerful cat, selected by bit 0.
    LivelyCat,
    /// The drowsy cat, selected by bit 1.
    SleepyCat,
}

impl ResourceId {
    /// Returns the resource name as packaged.
    pub fn name(self) -> &'static str {
        match self {
            Self::LivelyCat => "lively_cat",
            Self::SleepyCat => "sleepy_cat",
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded RGBA image ready to hand to a wallpaper sink.
///
/// Cloning is cheap: pixel data is shared, never mutated.
#[derive(Clone)]
pub struct Bitmap {
    resource: ResourceId,
    image: Arc<RgbaImage>,
}

impl Bitmap {
    /// Wraps a decoded image.
    pub fn new(resource: ResourceId, image: RgbaImage) -> Self {
        Self {
            resource,
            image: Arc::new(image),
        }
    }

    /// Returns the resource this bitmap was decoded from.
    #[inline]
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Returns the bitmap width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Returns the bitmap height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Returns the raw RGBA pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Returns the underlying image.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("resource", &self.resource)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// The pair of wallpapers decoded at lock time.
#[derive(Debug, Clone)]
pub struct PreloadedAssets {
    lively: Bitmap,
    sleepy: Bitmap,
    /// Monotonic load number assigned by the preloader.
    sequence: u64,
}

impl PreloadedAssets {
    pub fn new(lively: Bitmap, sleepy: Bitmap, sequence: u64) -> Self {
        Self {
            lively,
            sleepy,
            sequence,
        }
    }

    /// Bitmap selected by bit 0.
    pub fn lively(&self) -> &Bitmap {
        &self.lively
    }

    /// Bitmap selected by bit 1.
    pub fn sleepy(&self) -> &Bitmap {
        &self.sleepy
    }

    /// Returns the load sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

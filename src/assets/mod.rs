//! Wallpaper assets and lock-time preloading.
//!
//! The two wallpaper images are compiled into the binary and decoded
//! when the device locks, so the unlock path never pays for decoding.

mod bitmap;
mod preloader;

pub use bitmap::{Bitmap, PreloadedAssets, ResourceId};
pub use preloader::{AssetError, AssetPreloader, EmbeddedPreloader, MockPreloader};

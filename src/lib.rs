//! Unlock Wallpaper Library
//!
//! Picks one of two preloaded wallpapers every time the device is
//! unlocked, using a two-stage randomness scheme.
//!
//! # Architecture
//!
//! ```text
//! lock ──► assets (decode) ─┐
//!      └─► entropy (roll) ──┴─► selection session
//!
//! unlock ─► platform (online?) ─► entropy (remote | local bit)
//!        └─► selection (bit → wallpaper) ─► platform (sink)
//! ```
//!
//! # Design Principles
//!
//! - **Never blocks on the network**: one bounded remote attempt, then the local CSPRNG
//! - **No decoding on unlock**: assets are decoded when the device locks
//! - **Epoch-scoped state**: a late result from a superseded cycle is dropped
//! - **Platform at the edges**: connectivity and the wallpaper sink are traits
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use unlock_wallpaper::{
//!     assets::EmbeddedPreloader,
//!     entropy::{LocalRandomSource, QrngClient, DEFAULT_QRNG_ENDPOINT},
//!     platform::{PngFileSink, SharedConnectivity},
//!     selection::{ControllerConfig, SelectionController},
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let connectivity = SharedConnectivity::new(true);
//! let mut controller = SelectionController::new(
//!     ControllerConfig::default(),
//!     EmbeddedPreloader::new(),
//!     connectivity.clone(),
//!     Arc::new(QrngClient::new(DEFAULT_QRNG_ENDPOINT)?),
//!     LocalRandomSource::from_os_entropy(),
//!     PngFileSink::new("wallpaper.png"),
//! );
//!
//! controller.on_lock()?;
//! let outcome = controller.on_unlock().await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod assets;
pub mod config;
pub mod entropy;
pub mod metrics;
pub mod platform;
pub mod selection;

// Re-export commonly used types at crate root
pub use analysis::{UniformityResult, UniformityTest};
pub use assets::{AssetError, AssetPreloader, Bitmap, EmbeddedPreloader, PreloadedAssets};
pub use config::FileConfig;
pub use entropy::{Bit, FetchError, LocalRandomSource, QrngClient, RemoteSource, Roll};
pub use platform::{ApplyError, ConnectivityProbe, SharedConnectivity, WallpaperSink};
pub use selection::{
    LifecycleDriver, LifecycleEvent, SelectionController, SelectionError, SelectionResult,
    UnlockOutcome,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

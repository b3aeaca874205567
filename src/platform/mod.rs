//! Platform collaborators.
//!
//! The host supplies connectivity status and a way to set the system
//! wallpaper. Both sit behind traits so the selection logic runs
//! unchanged against the device, a desktop file, or a test double.

mod connectivity;
mod sink;

pub use connectivity::{ConnectivityProbe, SharedConnectivity};
pub use sink::{ApplyError, PngFileSink, RecordingSink, WallpaperSink};

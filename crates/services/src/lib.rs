#![forbid(unsafe_code)]

pub mod error;
pub mod playback;
pub mod tracker;

pub use edutube_core::Clock;

pub use error::TrackerError;
pub use playback::{PlaybackObserver, PlaybackSource, PlaybackState, SAMPLE_INTERVAL};
pub use tracker::ProgressTracker;

//! Moodring: a concurrent camera pipeline producing per-face affective-state
//! annotations.
//!
//! Live frames flow from a mutex-guarded shared camera through one of two
//! mutually-exclusive analysis loops: a discrete per-face emotion classifier
//! or a face-mesh geometry path deriving valence/arousal from landmark
//! ratios. Each loop decimates frames for inference, smooths the per-face
//! traffic-light color over a short history, and emits a structured
//! [`payload::FramePayload`] to a pluggable transport sink.
//!
//! Detector backends, the capture device, and the transport are seam traits
//! ([`detect::EmotionClassifier`], [`landmark::FaceLandmarker`],
//! [`camera::CameraBackend`], [`sink::FrameSink`]); a V4L2 capture backend
//! ships in [`camera::v4l2`].
//!
//! Every per-face history (temporal features, zone memory, color smoothing)
//! is keyed by the face's position in the detector output of the current
//! frame. That position is not a stable identity: if the detector reorders
//! its output between frames, the histories of the affected faces mix
//! silently.

use log::LevelFilter;

pub mod affect;
pub mod camera;
pub mod color;
pub mod config;
pub mod controller;
pub mod decimate;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod landmark;
pub mod payload;
pub mod sink;
pub mod temporal;
pub mod timer;

pub use error::Error;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this crate log at *debug* level; `RUST_LOG`
/// overrides apply on top. If a global logger is already registered, this
/// macro does nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}

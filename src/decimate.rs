//! Frame decimation and inference downscaling.
//!
//! Detector inference dominates per-frame latency, so only every Nth frame
//! runs through a detector, on an aspect-preserving downscale. Intervening
//! frames reuse the most recent results; coordinates divide back by the
//! scale factor to land in full-resolution pixel space.

use crate::frame::Frame;

/// Decides which frames run through the detector.
pub struct Decimator {
    interval: u32,
    count: u32,
}

impl Decimator {
    /// Creates a decimator that selects every `interval`-th frame, starting
    /// with the first one.
    pub fn new(interval: u32) -> Self {
        assert!(interval > 0);
        Self { interval, count: 0 }
    }

    /// Advances the frame counter and reports whether this frame should be
    /// processed.
    pub fn should_process(&mut self) -> bool {
        let process = self.count % self.interval == 0;
        self.count = self.count.wrapping_add(1);
        process
    }
}

/// Produces the downscaled copy a detector runs on.
pub struct InferenceScaler {
    target_width: u32,
}

impl InferenceScaler {
    pub fn new(target_width: u32) -> Self {
        assert!(target_width > 0);
        Self { target_width }
    }

    /// Returns the inference-sized copy and the scale factor that detection
    /// coordinates must be divided by to map back to `frame`'s resolution.
    ///
    /// Frames already at or below the target width pass through with a scale
    /// factor of 1.0.
    pub fn prepare(&self, frame: &Frame) -> (Frame, f32) {
        let scaled = frame.scale_to_width(self.target_width);
        let scale = scaled.width() as f32 / frame.width() as f32;
        (scaled, scale)
    }
}

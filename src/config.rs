//! Pipeline tunables.

use std::fs;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Tunables shared by both analysis loops.
///
/// The defaults are the values the pipeline was calibrated with; individual
/// deployments can override them from a TOML file via [`PipelineConfig::load`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run the detector on every Nth captured frame.
    pub process_every_n_frames: u32,
    /// Width that detector inputs are downscaled to, preserving aspect ratio.
    pub inference_width: u32,
    /// Number of recent colors averaged per face slot.
    pub color_window: usize,
    /// Detections whose dominant confidence is at or below this produce no
    /// annotation.
    pub min_confidence: f32,
    /// Trailing window for temporal feature statistics, in seconds.
    pub temporal_window_secs: f32,
    /// Hard cap on samples retained per (face, feature) series.
    pub temporal_capacity: usize,
    /// Number of instantaneous FPS samples averaged for the payload.
    pub fps_window: usize,
    /// JPEG quality of the emitted image, 1-100.
    pub jpeg_quality: u8,
    /// Sleep between loop iterations, in milliseconds.
    pub idle_sleep_ms: u64,
    /// How long `start` waits for a previous loop of the same kind to exit,
    /// in seconds.
    pub stop_wait_secs: f32,
    /// Camera open attempts before giving up.
    pub open_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            process_every_n_frames: 3,
            inference_width: 320,
            color_window: 5,
            min_confidence: 0.25,
            temporal_window_secs: 3.0,
            temporal_capacity: 90,
            fps_window: 30,
            jpeg_quality: 85,
            idle_sleep_ms: 10,
            stop_wait_secs: 2.0,
            open_attempts: 3,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    pub fn stop_wait(&self) -> Duration {
        Duration::from_secs_f32(self.stop_wait_secs)
    }

    pub fn temporal_window(&self) -> Duration {
        Duration::from_secs_f32(self.temporal_window_secs)
    }
}

//! Sliding-window statistics over per-face feature series.
//!
//! Each (face index, feature) pair owns a bounded ring buffer of timestamped
//! samples. The capacity bound (90 samples) is applied at write time; the
//! trailing time window (3 s) is applied at read time, so the two bounds stay
//! independent. Series are keyed by the face's position in the detector
//! output, which is not a stable identity; a reordering of detector output
//! silently mixes the series of the affected faces.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::geometry::{Feature, GeometryFeatures};

/// Statistics over the windowed samples of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureStats {
    pub mean: f32,
    pub std: f32,
    pub velocity: f32,
}

impl FeatureStats {
    const ZERO: FeatureStats = FeatureStats {
        mean: 0.0,
        std: 0.0,
        velocity: 0.0,
    };
}

/// Windowed statistics of the four expression features, as emitted in mesh
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemporalFeatures {
    pub mouth_openness: FeatureStats,
    pub smile_amplitude: FeatureStats,
    pub eye_openness: FeatureStats,
    pub eyebrow_raise: FeatureStats,
}

/// Bounded ring buffer of (value, timestamp) samples for one series.
#[derive(Debug, Clone)]
pub struct TemporalWindow {
    samples: VecDeque<(f32, Instant)>,
    capacity: usize,
}

impl TemporalWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest one once at capacity.
    pub fn push(&mut self, value: f32, at: Instant) {
        self.samples.push_back((value, at));
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Computes statistics over the samples no older than `window` before
    /// `now`.
    ///
    /// Fewer than two windowed samples is not an error: a single sample
    /// reports itself as the mean with zero variability, and an empty window
    /// reports all zeros.
    pub fn stats(&self, now: Instant, window: Duration) -> FeatureStats {
        let windowed: Vec<(f32, Instant)> = self
            .samples
            .iter()
            .filter(|(_, ts)| now.saturating_duration_since(*ts) <= window)
            .copied()
            .collect();

        match windowed.as_slice() {
            [] => FeatureStats::ZERO,
            [(value, _)] => FeatureStats {
                mean: *value,
                std: 0.0,
                velocity: 0.0,
            },
            samples => {
                let n = samples.len() as f32;
                let mean = samples.iter().map(|(v, _)| v).sum::<f32>() / n;
                let variance =
                    samples.iter().map(|(v, _)| (v - mean) * (v - mean)).sum::<f32>() / n;

                let (first_value, first_ts) = samples[0];
                let (last_value, last_ts) = samples[samples.len() - 1];
                let dt = last_ts.saturating_duration_since(first_ts).as_secs_f32();
                let velocity = if dt > 0.0 {
                    (last_value - first_value) / dt
                } else {
                    0.0
                };

                FeatureStats {
                    mean,
                    std: variance.sqrt(),
                    velocity,
                }
            }
        }
    }
}

/// Per-face, per-feature temporal series for one running loop.
pub struct TemporalAggregator {
    capacity: usize,
    window: Duration,
    series: HashMap<(usize, Feature), TemporalWindow>,
}

impl TemporalAggregator {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            window,
            series: HashMap::new(),
        }
    }

    /// Records all features of one face at the given instant.
    pub fn record(&mut self, face: usize, features: &GeometryFeatures, at: Instant) {
        for feature in Feature::ALL {
            self.series
                .entry((face, feature))
                .or_insert_with(|| TemporalWindow::new(self.capacity))
                .push(features.get(feature), at);
        }
    }

    /// Windowed statistics for one series.
    pub fn stats(&self, face: usize, feature: Feature, now: Instant) -> FeatureStats {
        self.series
            .get(&(face, feature))
            .map(|window| window.stats(now, self.window))
            .unwrap_or(FeatureStats::ZERO)
    }

    /// Statistics of the four expression features of one face, the subset
    /// emitted in mesh payloads.
    pub fn expression_stats(&self, face: usize, now: Instant) -> TemporalFeatures {
        TemporalFeatures {
            mouth_openness: self.stats(face, Feature::MouthOpenness, now),
            smile_amplitude: self.stats(face, Feature::SmileAmplitude, now),
            eye_openness: self.stats(face, Feature::EyeOpenness, now),
            eyebrow_raise: self.stats(face, Feature::EyebrowRaise, now),
        }
    }

    /// Number of distinct (face, feature) series with recorded samples.
    pub fn series_count(&self) -> usize {
        self.series.len()
    }
}

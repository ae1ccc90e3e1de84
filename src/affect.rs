//! Valence/arousal mapping and traffic-light zone tracking.
//!
//! Valence (pleasantness, [-1, 1]) is driven by smile and eyebrow geometry;
//! arousal (activation, [0, 1]) by eye and mouth openness. The two scalars
//! discretize into a four-quadrant emotion label and a three-level color
//! zone. Zone memory is keyed by face index and lives for the lifetime of
//! one loop.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::color::Color;
use crate::geometry::GeometryFeatures;

const AROUSAL_THRESHOLD: f32 = 0.5;
const VALENCE_THRESHOLD: f32 = 0.0;
const ZONE_POSITIVE_ABOVE: f32 = 0.2;
const ZONE_NEGATIVE_BELOW: f32 = -0.2;

/// Computes (valence, arousal) from one face's geometry features.
///
/// Both values clamp exactly to their ranges; raw formula excursions never
/// leak into the output.
pub fn valence_arousal(features: &GeometryFeatures) -> (f32, f32) {
    // Smile is weighted heavily; the -0.5 recenters a relaxed face near 0.
    let valence = (2.0 * features.smile_amplitude + 0.5 * features.eyebrow_raise - 0.5)
        .clamp(-1.0, 1.0);
    let arousal = (2.0 * features.eye_openness + 1.5 * features.mouth_openness).clamp(0.0, 1.0);
    (valence, arousal)
}

/// Quadrant of the valence/arousal plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quadrant {
    Excited,
    Tense,
    Calm,
    Sad,
}

impl Quadrant {
    pub fn classify(valence: f32, arousal: f32) -> Self {
        match (arousal > AROUSAL_THRESHOLD, valence > VALENCE_THRESHOLD) {
            (true, true) => Quadrant::Excited,
            (true, false) => Quadrant::Tense,
            (false, true) => Quadrant::Calm,
            (false, false) => Quadrant::Sad,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quadrant::Excited => "Excited",
            Quadrant::Tense => "Tense",
            Quadrant::Calm => "Calm",
            Quadrant::Sad => "Sad",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Quadrant::Excited => "😄",
            Quadrant::Tense => "😠",
            Quadrant::Calm => "😌",
            Quadrant::Sad => "😢",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Discretized valence bucket used for color coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Positive,
    Neutral,
    Negative,
}

impl Zone {
    pub fn classify(valence: f32) -> Self {
        if valence > ZONE_POSITIVE_ABOVE {
            Zone::Positive
        } else if valence < ZONE_NEGATIVE_BELOW {
            Zone::Negative
        } else {
            Zone::Neutral
        }
    }

    /// Raw traffic-light color of the zone, before smoothing.
    pub fn color(self) -> Color {
        match self {
            Zone::Positive => Color::GREEN,
            Zone::Neutral => Color::YELLOW,
            Zone::Negative => Color::RED,
        }
    }
}

/// The affective state of one face in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffectState {
    pub valence: f32,
    pub arousal: f32,
    pub quadrant: Quadrant,
    pub zone: Zone,
    pub zone_changed: bool,
}

impl AffectState {
    /// Derives the full state for the face at `index`, updating `tracker`'s
    /// zone memory.
    pub fn compute(features: &GeometryFeatures, index: usize, tracker: &mut ZoneTracker) -> Self {
        let (valence, arousal) = valence_arousal(features);
        let zone = Zone::classify(valence);
        Self {
            valence,
            arousal,
            quadrant: Quadrant::classify(valence, arousal),
            zone,
            zone_changed: tracker.observe(index, zone),
        }
    }
}

/// Last-seen zone per face index.
#[derive(Default)]
pub struct ZoneTracker {
    previous: HashMap<usize, Zone>,
}

impl ZoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `zone` for the face at `index` and reports whether it differs
    /// from the previously recorded one. The first observation of a face
    /// never reports a change.
    pub fn observe(&mut self, index: usize, zone: Zone) -> bool {
        let previous = self.previous.insert(index, zone);
        previous.is_some_and(|old| old != zone)
    }
}

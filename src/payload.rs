//! The emission unit assembled once per loop iteration.
//!
//! Payloads are transport-agnostic: the JPEG bytes and annotation list are
//! handed to a [`crate::sink::FrameSink`] and have no identity beyond the
//! moment of emission. Colors are carried in RGB channel order; the internal
//! smoothing histories are BGR and convert at assembly.

use serde::Serialize;

use crate::affect::{AffectState, Quadrant, Zone};
use crate::color::Color;
use crate::detect::{BoundingBox, DetectionResult, Emotion};
use crate::geometry::GeometryFeatures;
use crate::landmark::Landmarks;
use crate::temporal::TemporalFeatures;

/// One (emotion, score) pair of a classifier annotation's top list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmotionScore {
    pub emotion: Emotion,
    pub score: f32,
}

/// Annotation for one face on the classifier path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifierAnnotation {
    pub index: usize,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
    pub dominant: Emotion,
    pub confidence: f32,
    pub top_emotions: Vec<EmotionScore>,
    /// Smoothed display color, RGB.
    pub color: [u8; 3],
}

impl ClassifierAnnotation {
    /// Builds the annotation for the detection at `index`, carrying the top
    /// three emotions.
    pub fn new(index: usize, result: &DetectionResult, color: Color) -> Self {
        let (dominant, confidence) = result.scores.dominant();
        Self {
            index,
            bounding_box: result.bounding_box,
            dominant,
            confidence,
            top_emotions: result
                .scores
                .top(3)
                .into_iter()
                .map(|(emotion, score)| EmotionScore { emotion, score })
                .collect(),
            color: color.to_rgb(),
        }
    }
}

/// Annotation for one face on the mesh path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshAnnotation {
    pub index: usize,
    pub landmarks: Vec<[f32; 3]>,
    pub geometry_features: GeometryFeatures,
    pub temporal_features: TemporalFeatures,
    pub valence: f32,
    pub arousal: f32,
    pub zone: Zone,
    pub emotion_label: Quadrant,
    pub emotion_emoji: String,
    pub zone_changed: bool,
    /// Smoothed display color, RGB.
    pub color: [u8; 3],
}

impl MeshAnnotation {
    pub fn new(
        index: usize,
        landmarks: &Landmarks,
        geometry: GeometryFeatures,
        temporal: TemporalFeatures,
        affect: AffectState,
        color: Color,
    ) -> Self {
        Self {
            index,
            landmarks: landmarks.positions().to_vec(),
            geometry_features: geometry,
            temporal_features: temporal,
            valence: affect.valence,
            arousal: affect.arousal,
            zone: affect.zone,
            emotion_label: affect.quadrant,
            emotion_emoji: affect.quadrant.emoji().to_owned(),
            zone_changed: affect.zone_changed,
            color: color.to_rgb(),
        }
    }
}

/// A per-face annotation of either analysis path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FaceAnnotation {
    Classifier(ClassifierAnnotation),
    Mesh(MeshAnnotation),
}

/// Everything one loop iteration emits.
///
/// `face_count` counts all detections in the frame; `faces` lists only the
/// ones that produced an annotation, so the two can differ on the classifier
/// path when low-confidence detections are suppressed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramePayload {
    /// JPEG-encoded full-resolution frame.
    pub image: Vec<u8>,
    pub faces: Vec<FaceAnnotation>,
    pub fps: f32,
    pub face_count: usize,
}

//! Discrete emotion classification: result types, the classifier seam, and
//! the emotion-to-color table.

use anyhow::Result;
use itertools::Itertools;
use serde::Serialize;

use crate::color::Color;
use crate::frame::Frame;

/// The emotion classes of the discrete classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    pub fn name(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Traffic-light color of the emotion: happy and surprise are green,
    /// neutral is yellow, everything else is red.
    pub fn traffic_light(self) -> Color {
        match self {
            Emotion::Happy | Emotion::Surprise => Color::GREEN,
            Emotion::Neutral => Color::YELLOW,
            _ => Color::RED,
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-emotion confidence scores for one face, in classifier output order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmotionScores {
    scores: Vec<(Emotion, f32)>,
}

impl EmotionScores {
    pub fn new(scores: Vec<(Emotion, f32)>) -> Self {
        Self { scores }
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// The highest-confidence emotion.
    ///
    /// An empty score map reports `(Neutral, 0.0)`. Ties keep the earliest
    /// entry in classifier output order.
    pub fn dominant(&self) -> (Emotion, f32) {
        let mut best: Option<(Emotion, f32)> = None;
        for &(emotion, score) in &self.scores {
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((emotion, score)),
            }
        }
        best.unwrap_or((Emotion::Neutral, 0.0))
    }

    /// The `n` highest-confidence (emotion, score) pairs, descending.
    pub fn top(&self, n: usize) -> Vec<(Emotion, f32)> {
        self.scores
            .iter()
            .copied()
            .sorted_by(|a, b| b.1.total_cmp(&a.1))
            .take(n)
            .collect()
    }
}

impl FromIterator<(Emotion, f32)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (Emotion, f32)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// An axis-aligned face bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// Maps a box detected on a downscaled frame back to full resolution by
    /// dividing every component by `scale`.
    pub fn div_scale(self, scale: f32) -> Self {
        Self {
            x: (self.x as f32 / scale) as i32,
            y: (self.y as f32 / scale) as i32,
            width: (self.width as f32 / scale) as i32,
            height: (self.height as f32 / scale) as i32,
        }
    }
}

/// One face as reported by the classifier: a box plus the score map.
///
/// Ephemeral; the face's index in the classifier's output list is its only
/// identity, and only for the frame it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub bounding_box: BoundingBox,
    pub scores: EmotionScores,
}

/// A discrete per-face emotion classifier backend.
pub trait EmotionClassifier: Send + Sync {
    fn detect_emotions(&self, frame: &Frame) -> Result<Vec<DetectionResult>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traffic_light_table() {
        assert_eq!(Emotion::Happy.traffic_light(), Color::GREEN);
        assert_eq!(Emotion::Surprise.traffic_light(), Color::GREEN);
        assert_eq!(Emotion::Neutral.traffic_light(), Color::YELLOW);
        for other in [Emotion::Angry, Emotion::Disgust, Emotion::Fear, Emotion::Sad] {
            assert_eq!(other.traffic_light(), Color::RED);
        }
    }

    #[test]
    fn dominant_of_empty_scores_is_neutral_zero() {
        assert_eq!(EmotionScores::default().dominant(), (Emotion::Neutral, 0.0));
    }

    #[test]
    fn dominant_picks_the_argmax() {
        let scores: EmotionScores = [
            (Emotion::Happy, 0.8),
            (Emotion::Sad, 0.1),
            (Emotion::Neutral, 0.1),
        ]
        .into_iter()
        .collect();
        assert_eq!(scores.dominant(), (Emotion::Happy, 0.8));
    }

    #[test]
    fn dominant_tie_keeps_earliest_entry() {
        let scores: EmotionScores = [
            (Emotion::Fear, 0.4),
            (Emotion::Angry, 0.4),
            (Emotion::Neutral, 0.2),
        ]
        .into_iter()
        .collect();
        assert_eq!(scores.dominant(), (Emotion::Fear, 0.4));
    }

    #[test]
    fn top_sorts_descending_and_truncates() {
        let scores: EmotionScores = [
            (Emotion::Sad, 0.1),
            (Emotion::Happy, 0.7),
            (Emotion::Neutral, 0.15),
            (Emotion::Angry, 0.05),
        ]
        .into_iter()
        .collect();
        let top = scores.top(3);
        assert_eq!(
            top,
            vec![
                (Emotion::Happy, 0.7),
                (Emotion::Neutral, 0.15),
                (Emotion::Sad, 0.1),
            ]
        );
    }

    #[test]
    fn bounding_box_scales_back_to_full_resolution() {
        let small = BoundingBox {
            x: 10,
            y: 20,
            width: 30,
            height: 40,
        };
        assert_eq!(
            small.div_scale(0.5),
            BoundingBox {
                x: 20,
                y: 40,
                width: 60,
                height: 80,
            }
        );
    }
}

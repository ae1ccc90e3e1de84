//! Geometric expression features derived from face-mesh landmarks.
//!
//! Every feature is normalized by the face width (the 2D distance between the
//! leftmost and rightmost face-outline landmarks), which makes the values
//! comparable across faces at different distances from the camera. Vertical
//! differences use image-space y, which grows downwards.

use anyhow::{ensure, Result};
use nalgebra::Vector2;
use serde::Serialize;

use crate::landmark::{LandmarkIdx, Landmarks, NUM_LANDMARKS};

/// Names of the per-face scalar features, used to key temporal series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    MouthOpenness,
    SmileAmplitude,
    EyeOpenness,
    EyebrowRaise,
    HeadPitch,
    HeadYaw,
    HeadRoll,
    FaceDepth,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::MouthOpenness,
        Feature::SmileAmplitude,
        Feature::EyeOpenness,
        Feature::EyebrowRaise,
        Feature::HeadPitch,
        Feature::HeadYaw,
        Feature::HeadRoll,
        Feature::FaceDepth,
    ];

    /// The four expression features whose temporal statistics are emitted.
    pub const EXPRESSION: [Feature; 4] = [
        Feature::MouthOpenness,
        Feature::SmileAmplitude,
        Feature::EyeOpenness,
        Feature::EyebrowRaise,
    ];
}

/// The scalar features extracted from one face in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeometryFeatures {
    pub mouth_openness: f32,
    pub smile_amplitude: f32,
    pub eye_openness: f32,
    pub eyebrow_raise: f32,
    pub head_pitch: f32,
    pub head_yaw: f32,
    pub head_roll: f32,
    pub face_depth: f32,
}

impl GeometryFeatures {
    /// Computes all features for one face.
    ///
    /// Fails if the landmark set is shorter than the full mesh topology; the
    /// loop treats that as an isolated per-face detection failure.
    pub fn extract(landmarks: &Landmarks) -> Result<Self> {
        ensure!(
            landmarks.len() >= NUM_LANDMARKS,
            "landmark set has {} points, expected {NUM_LANDMARKS}",
            landmarks.len(),
        );

        let face_left = landmarks.get(LandmarkIdx::FaceLeft);
        let face_right = landmarks.get(LandmarkIdx::FaceRight);
        // Clamped to 1 px so that degenerate detections cannot divide by zero.
        let face_width = dist2(face_left, face_right).max(1.0);

        let mouth_top = landmarks.get(LandmarkIdx::MouthTop);
        let mouth_bottom = landmarks.get(LandmarkIdx::MouthBottom);
        let mouth_openness = dist2(mouth_top, mouth_bottom) / face_width;

        // Smile is mouth width relative to face width plus the upward lift of
        // the corners relative to the mouth center (y grows downwards, so a
        // lifted corner has a *smaller* y than the center).
        let corner_left = landmarks.get(LandmarkIdx::MouthCornerLeft);
        let corner_right = landmarks.get(LandmarkIdx::MouthCornerRight);
        let width_ratio = dist2(corner_left, corner_right) / face_width;
        let mouth_center_y = (mouth_top[1] + mouth_bottom[1]) / 2.0;
        let corner_avg_y = (corner_left[1] + corner_right[1]) / 2.0;
        let smile_amplitude = width_ratio + (mouth_center_y - corner_avg_y) / face_width;

        let left_eye_top = landmarks.get(LandmarkIdx::LeftEyeTop);
        let left_eye_bottom = landmarks.get(LandmarkIdx::LeftEyeBottom);
        let right_eye_top = landmarks.get(LandmarkIdx::RightEyeTop);
        let right_eye_bottom = landmarks.get(LandmarkIdx::RightEyeBottom);
        let eye_openness = (dist2(left_eye_top, left_eye_bottom)
            + dist2(right_eye_top, right_eye_bottom))
            / (2.0 * face_width);

        let left_eyebrow = landmarks.get(LandmarkIdx::LeftEyebrowTop);
        let right_eyebrow = landmarks.get(LandmarkIdx::RightEyebrowTop);
        let eyebrow_raise = ((left_eye_top[1] - left_eyebrow[1])
            + (right_eye_top[1] - right_eyebrow[1]))
            / (2.0 * face_width);

        let nose_tip = landmarks.get(LandmarkIdx::NoseTip);
        let nose_bridge = landmarks.get(LandmarkIdx::NoseBridge);
        let head_pitch = (nose_tip[1] - nose_bridge[1]).atan2(nose_tip[2] - nose_bridge[2]);
        let head_yaw = (nose_tip[0] - nose_bridge[0]).atan2(nose_tip[2] - nose_bridge[2]);
        let head_roll = (face_right[1] - face_left[1]).atan2(face_right[0] - face_left[0]);

        let face_top = landmarks.get(LandmarkIdx::FaceTop);
        let face_bottom = landmarks.get(LandmarkIdx::FaceBottom);
        let face_depth = (face_left[2] + face_right[2] + face_top[2] + face_bottom[2]) / 4.0;

        Ok(Self {
            mouth_openness,
            smile_amplitude,
            eye_openness,
            eyebrow_raise,
            head_pitch,
            head_yaw,
            head_roll,
            face_depth,
        })
    }

    /// Value of the named feature.
    pub fn get(&self, feature: Feature) -> f32 {
        match feature {
            Feature::MouthOpenness => self.mouth_openness,
            Feature::SmileAmplitude => self.smile_amplitude,
            Feature::EyeOpenness => self.eye_openness,
            Feature::EyebrowRaise => self.eyebrow_raise,
            Feature::HeadPitch => self.head_pitch,
            Feature::HeadYaw => self.head_yaw,
            Feature::HeadRoll => self.head_roll,
            Feature::FaceDepth => self.face_depth,
        }
    }
}

/// 2D Euclidean distance; z is ignored for all width/height measurements.
fn dist2(a: [f32; 3], b: [f32; 3]) -> f32 {
    Vector2::new(a[0] - b[0], a[1] - b[1]).norm()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    /// A synthetic face with all geometry landmarks at known positions.
    ///
    /// Face outline spans x 100..300 (width 200), everything else is placed
    /// so that the expected ratios can be computed by hand.
    fn synthetic_face() -> Landmarks {
        let mut positions = vec![[0.0f32; 3]; NUM_LANDMARKS];
        let mut set = |idx: LandmarkIdx, pos: [f32; 3]| positions[idx as usize] = pos;

        set(LandmarkIdx::FaceLeft, [100.0, 200.0, 4.0]);
        set(LandmarkIdx::FaceRight, [300.0, 200.0, 4.0]);
        set(LandmarkIdx::FaceTop, [200.0, 100.0, 2.0]);
        set(LandmarkIdx::FaceBottom, [200.0, 300.0, 6.0]);

        set(LandmarkIdx::MouthTop, [200.0, 250.0, 0.0]);
        set(LandmarkIdx::MouthBottom, [200.0, 270.0, 0.0]);
        set(LandmarkIdx::MouthCornerLeft, [160.0, 255.0, 0.0]);
        set(LandmarkIdx::MouthCornerRight, [240.0, 255.0, 0.0]);

        set(LandmarkIdx::LeftEyeTop, [150.0, 180.0, 0.0]);
        set(LandmarkIdx::LeftEyeBottom, [150.0, 190.0, 0.0]);
        set(LandmarkIdx::RightEyeTop, [250.0, 180.0, 0.0]);
        set(LandmarkIdx::RightEyeBottom, [250.0, 192.0, 0.0]);

        set(LandmarkIdx::LeftEyebrowTop, [150.0, 160.0, 0.0]);
        set(LandmarkIdx::RightEyebrowTop, [250.0, 164.0, 0.0]);

        set(LandmarkIdx::NoseBridge, [200.0, 170.0, -10.0]);
        set(LandmarkIdx::NoseTip, [205.0, 210.0, -30.0]);

        Landmarks::new(positions)
    }

    #[test]
    fn mouth_and_eye_ratios() {
        let features = GeometryFeatures::extract(&synthetic_face()).unwrap();
        // mouth height 20 / face width 200
        assert_relative_eq!(features.mouth_openness, 0.1);
        // eye heights 10 and 12, averaged over 2 * 200
        assert_relative_eq!(features.eye_openness, 22.0 / 400.0);
    }

    #[test]
    fn smile_combines_width_and_corner_lift() {
        let features = GeometryFeatures::extract(&synthetic_face()).unwrap();
        // width ratio 80/200, mouth center y 260, corner avg y 255
        assert_relative_eq!(features.smile_amplitude, 80.0 / 200.0 + 5.0 / 200.0);
    }

    #[test]
    fn eyebrow_raise_uses_signed_vertical_difference() {
        let features = GeometryFeatures::extract(&synthetic_face()).unwrap();
        // (180-160) and (180-164), averaged over 2 * 200
        assert_relative_eq!(features.eyebrow_raise, 36.0 / 400.0);
    }

    #[test]
    fn head_angles() {
        let features = GeometryFeatures::extract(&synthetic_face()).unwrap();
        assert_relative_eq!(features.head_pitch, 40.0f32.atan2(-20.0));
        assert_relative_eq!(features.head_yaw, 5.0f32.atan2(-20.0));
        // Outline extremes are level, so there is no roll.
        assert_relative_eq!(features.head_roll, 0.0);
    }

    #[test]
    fn face_depth_averages_outline_z() {
        let features = GeometryFeatures::extract(&synthetic_face()).unwrap();
        assert_relative_eq!(features.face_depth, 4.0);
    }

    #[test]
    fn face_width_clamps_to_one_pixel() {
        let mut positions = vec![[0.0f32; 3]; NUM_LANDMARKS];
        positions[LandmarkIdx::MouthTop as usize] = [0.0, 0.0, 0.0];
        positions[LandmarkIdx::MouthBottom as usize] = [0.0, 3.0, 0.0];
        // Outline landmarks coincide; the denominator must clamp, not explode.
        let features = GeometryFeatures::extract(&Landmarks::new(positions)).unwrap();
        assert_relative_eq!(features.mouth_openness, 3.0);
    }

    #[test]
    fn short_landmark_set_is_rejected() {
        let landmarks = Landmarks::new(vec![[0.0; 3]; 10]);
        assert!(GeometryFeatures::extract(&landmarks).is_err());
    }

    #[test]
    fn feature_lookup_matches_fields() {
        let features = GeometryFeatures::extract(&synthetic_face()).unwrap();
        for feature in Feature::ALL {
            // Mostly a guard against a copy-paste mismatch in `get`.
            let value = features.get(feature);
            assert!(value.is_finite(), "{feature:?} produced {value}");
        }
        assert_eq!(features.get(Feature::MouthOpenness), features.mouth_openness);
        assert_eq!(features.get(Feature::FaceDepth), features.face_depth);
    }
}

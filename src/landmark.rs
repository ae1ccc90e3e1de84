//! Facial landmark types and the detector seam.
//!
//! Landmarks follow the MediaPipe [Face Mesh] topology: 468 3D points per
//! face, with x/y in pixel space of the analyzed frame and z as a
//! width-normalized depth proxy. Faces are indexed by their position in the
//! detector's output; that position is not a stable identity across frames.
//!
//! [Face Mesh]: https://google.github.io/mediapipe/solutions/face_mesh.html

use anyhow::Result;

use crate::frame::Frame;

/// Number of landmarks in the face mesh topology.
pub const NUM_LANDMARKS: usize = 468;

/// The mesh indices of the landmarks the geometry features are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    NoseTip = 1,
    FaceTop = 10,
    MouthTop = 13,
    MouthBottom = 14,
    MouthCornerLeft = 61,
    LeftEyebrowTop = 105,
    LeftEyeBottom = 145,
    FaceBottom = 152,
    LeftEyeTop = 159,
    NoseBridge = 168,
    FaceLeft = 234,
    MouthCornerRight = 291,
    RightEyebrowTop = 334,
    RightEyeBottom = 374,
    RightEyeTop = 386,
    FaceRight = 454,
}

/// The landmark positions of one detected face.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    positions: Vec<[f32; 3]>,
}

impl Landmarks {
    /// Wraps raw landmark positions as produced by a detector backend.
    ///
    /// The pipeline expects [`NUM_LANDMARKS`] entries; shorter outputs are
    /// accepted here and rejected during feature extraction, which isolates
    /// the failure to the affected face.
    pub fn new(positions: Vec<[f32; 3]>) -> Self {
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of the landmark at `idx`.
    ///
    /// Panics if `idx` is out of bounds; call sites validate [`Landmarks::len`]
    /// against [`NUM_LANDMARKS`] first.
    pub fn get(&self, idx: LandmarkIdx) -> [f32; 3] {
        self.positions[idx as usize]
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    /// Maps positions detected on a downscaled frame back to full resolution
    /// by dividing every component by `scale`.
    ///
    /// The z component is proportional to frame width, so it maps back the
    /// same way x and y do.
    pub fn div_scale(&mut self, scale: f32) {
        if scale == 1.0 {
            return;
        }
        for pos in &mut self.positions {
            pos[0] /= scale;
            pos[1] /= scale;
            pos[2] /= scale;
        }
    }
}

/// A face-mesh detector backend.
///
/// Returns one [`Landmarks`] set per detected face, in the backend's output
/// order. Implementations run arbitrary third-party inference code, so the
/// seam reports failures as [`anyhow::Error`]s; the loop wraps them into the
/// pipeline taxonomy.
pub trait FaceLandmarker: Send + Sync {
    fn detect_landmarks(&self, frame: &Frame) -> Result<Vec<Landmarks>>;
}

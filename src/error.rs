//! Pipeline error taxonomy.
//!
//! Backend seams ([`crate::camera::VideoSource`], [`crate::detect::EmotionClassifier`],
//! [`crate::landmark::FaceLandmarker`], [`crate::sink::FrameSink`]) run arbitrary
//! third-party code and report [`anyhow::Error`]s; the pipeline wraps those into
//! this taxonomy at the call site.

use thiserror::Error;

use crate::controller::LoopKind;

/// Errors surfaced by the capture and analysis pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The camera device could not be opened, even after retrying.
    #[error("camera {index} could not be opened after {attempts} attempts: {cause}")]
    DeviceUnavailable {
        index: u32,
        attempts: u32,
        cause: anyhow::Error,
    },

    /// The camera is held by a loop of the other kind.
    ///
    /// A running loop is never stopped implicitly; stop the holder first,
    /// then retry.
    #[error("camera is held by the {held_by} loop")]
    CameraBusy { held_by: LoopKind },

    /// A previous loop of the same kind did not exit within the stop window.
    #[error("previous {kind} loop did not exit in time")]
    LoopBusy { kind: LoopKind },

    /// A frame was requested from a camera slot that has been released.
    #[error("camera handle is closed")]
    CameraClosed,

    /// The camera stopped delivering frames. Ends the loop.
    #[error("frame read failed: {0}")]
    ReadFailure(anyhow::Error),

    /// A detector backend failed. Isolated to the affected frame or face.
    #[error("detection failed: {0}")]
    Detection(anyhow::Error),

    /// The payload sink rejected a frame. Logged and ignored by the loop.
    #[error("payload emission failed: {0}")]
    Emission(anyhow::Error),

    /// The loop thread could not be spawned.
    #[error("failed to spawn {kind} loop thread: {cause}")]
    Spawn {
        kind: LoopKind,
        #[source]
        cause: std::io::Error,
    },
}

//! Loop lifecycle state machine and the two analysis loop bodies.
//!
//! One controller exists per loop kind; both share the same
//! [`SharedCamera`]. `start` opens the camera and spawns a background thread
//! that runs read → decimate/detect → extract → aggregate → map → smooth →
//! encode → emit until cancelled or the camera stops delivering frames.
//! `stop` flips the cooperative cancellation token and returns without
//! joining; callers needing synchronous shutdown poll [`LoopController::status`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;

use crate::affect::{AffectState, ZoneTracker};
use crate::camera::{CameraBackend, SharedCamera};
use crate::color::ColorSmoother;
use crate::config::PipelineConfig;
use crate::decimate::{Decimator, InferenceScaler};
use crate::detect::{DetectionResult, EmotionClassifier};
use crate::error::Error;
use crate::frame::Frame;
use crate::geometry::GeometryFeatures;
use crate::landmark::FaceLandmarker;
use crate::payload::{ClassifierAnnotation, FaceAnnotation, FramePayload, MeshAnnotation};
use crate::sink::FrameSink;
use crate::temporal::TemporalAggregator;
use crate::timer::SmoothedFps;

/// The two mutually-exclusive analysis modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopKind {
    Classifier,
    Mesh,
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopKind::Classifier => f.write_str("classifier"),
            LoopKind::Mesh => f.write_str("mesh"),
        }
    }
}

/// Lifecycle state of one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Idle,
    Starting,
    Running,
    Stopping,
}

/// Cooperative cancellation flag, checked once per loop iteration.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

enum Mode {
    Classifier(Arc<dyn EmotionClassifier>),
    Mesh(Arc<dyn FaceLandmarker>),
}

impl Clone for Mode {
    fn clone(&self) -> Self {
        match self {
            Mode::Classifier(c) => Mode::Classifier(c.clone()),
            Mode::Mesh(m) => Mode::Mesh(m.clone()),
        }
    }
}

#[derive(Default)]
struct Control {
    token: Option<CancelToken>,
    exit: Option<Receiver<()>>,
}

/// Lifecycle controller for one loop kind.
pub struct LoopController {
    kind: LoopKind,
    config: PipelineConfig,
    camera: Arc<SharedCamera>,
    backend: Arc<dyn CameraBackend>,
    mode: Mode,
    sink: Arc<dyn FrameSink>,
    state: Arc<Mutex<LoopState>>,
    control: Mutex<Control>,
}

impl LoopController {
    /// Creates the controller for the discrete-classifier loop.
    pub fn classifier(
        camera: Arc<SharedCamera>,
        backend: Arc<dyn CameraBackend>,
        classifier: Arc<dyn EmotionClassifier>,
        sink: Arc<dyn FrameSink>,
        config: PipelineConfig,
    ) -> Self {
        Self::new(LoopKind::Classifier, camera, backend, Mode::Classifier(classifier), sink, config)
    }

    /// Creates the controller for the landmark-geometry loop.
    pub fn mesh(
        camera: Arc<SharedCamera>,
        backend: Arc<dyn CameraBackend>,
        landmarker: Arc<dyn FaceLandmarker>,
        sink: Arc<dyn FrameSink>,
        config: PipelineConfig,
    ) -> Self {
        Self::new(LoopKind::Mesh, camera, backend, Mode::Mesh(landmarker), sink, config)
    }

    fn new(
        kind: LoopKind,
        camera: Arc<SharedCamera>,
        backend: Arc<dyn CameraBackend>,
        mode: Mode,
        sink: Arc<dyn FrameSink>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            kind,
            config,
            camera,
            backend,
            mode,
            sink,
            state: Arc::new(Mutex::new(LoopState::Idle)),
            control: Mutex::new(Control::default()),
        }
    }

    pub fn kind(&self) -> LoopKind {
        self.kind
    }

    /// Starts the loop against the camera at `camera_index`.
    ///
    /// A previous loop of the same kind is signalled to stop and given a
    /// bounded wait to exit first; if it does not make it in time, this fails
    /// with [`Error::LoopBusy`] and the old loop keeps running. Opening the
    /// camera retries per [`SharedCamera::open`] and fails with
    /// [`Error::CameraBusy`] while the other loop kind holds it.
    pub fn start(&self, camera_index: u32) -> Result<(), Error> {
        let mut control = self.control.lock().unwrap();

        if let Some(token) = control.token.take() {
            token.cancel();
            if let Some(exit) = control.exit.take() {
                match exit.recv_timeout(self.config.stop_wait()) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
                    Err(RecvTimeoutError::Timeout) => {
                        log::error!("previous {} loop did not exit in time", self.kind);
                        control.token = Some(token);
                        control.exit = Some(exit);
                        return Err(Error::LoopBusy { kind: self.kind });
                    }
                }
            }
        }

        self.set_state(LoopState::Starting);
        if let Err(e) = self.camera.open(
            &*self.backend,
            camera_index,
            self.kind,
            self.config.open_attempts,
        ) {
            self.set_state(LoopState::Idle);
            return Err(e);
        }

        let token = CancelToken::new();
        let (exit_tx, exit_rx) = channel::bounded(1);
        let ctx = LoopCtx {
            kind: self.kind,
            config: self.config.clone(),
            camera: self.camera.clone(),
            mode: self.mode.clone(),
            sink: self.sink.clone(),
            token: token.clone(),
            state: self.state.clone(),
            exit: exit_tx,
        };
        // Running must be recorded before the thread exists, so the loop's
        // terminal Idle write cannot be overwritten by a late store here even
        // if the loop dies on its very first read.
        self.set_state(LoopState::Running);
        let spawned = thread::Builder::new()
            .name(format!("{}-loop", self.kind))
            .spawn(move || run(ctx));
        match spawned {
            Ok(_handle) => {
                control.token = Some(token);
                control.exit = Some(exit_rx);
                log::info!("{} loop started on camera {camera_index}", self.kind);
                Ok(())
            }
            Err(cause) => {
                self.camera.release(self.kind);
                self.set_state(LoopState::Idle);
                Err(Error::Spawn {
                    kind: self.kind,
                    cause,
                })
            }
        }
    }

    /// Signals the loop to stop and returns immediately.
    ///
    /// The loop thread exits at its next iteration boundary, releasing the
    /// camera itself; the camera must not be assumed free when this returns.
    pub fn stop(&self) {
        let control = self.control.lock().unwrap();
        if let Some(token) = &control.token {
            token.cancel();
            let mut state = self.state.lock().unwrap();
            if *state == LoopState::Running {
                *state = LoopState::Stopping;
            }
            log::info!("{} loop stop requested", self.kind);
        }
    }

    /// The loop's current lifecycle state. This is the poll surface for
    /// callers that need to observe shutdown.
    pub fn status(&self) -> LoopState {
        *self.state.lock().unwrap()
    }

    pub fn is_running(&self) -> bool {
        self.status() == LoopState::Running
    }

    fn set_state(&self, state: LoopState) {
        *self.state.lock().unwrap() = state;
    }
}

/// Everything a loop thread owns.
struct LoopCtx {
    kind: LoopKind,
    config: PipelineConfig,
    camera: Arc<SharedCamera>,
    mode: Mode,
    sink: Arc<dyn FrameSink>,
    token: CancelToken,
    state: Arc<Mutex<LoopState>>,
    exit: Sender<()>,
}

fn run(ctx: LoopCtx) {
    log::info!("{} loop running", ctx.kind);
    match ctx.mode.clone() {
        Mode::Classifier(classifier) => run_classifier(&ctx, &*classifier),
        Mode::Mesh(landmarker) => run_mesh(&ctx, &*landmarker),
    }
    ctx.camera.release(ctx.kind);
    *ctx.state.lock().unwrap() = LoopState::Idle;
    ctx.exit.send(()).ok();
    log::info!("{} loop exited", ctx.kind);
}

fn run_classifier(ctx: &LoopCtx, classifier: &dyn EmotionClassifier) {
    let cfg = &ctx.config;
    let mut decimator = Decimator::new(cfg.process_every_n_frames);
    let scaler = InferenceScaler::new(cfg.inference_width);
    let mut smoother = ColorSmoother::new(cfg.color_window);
    let mut fps = SmoothedFps::new(cfg.fps_window);
    let mut emitted = 0u64;
    // Stale results carry over decimated frames for overlay purposes.
    let mut last_results: Vec<DetectionResult> = Vec::new();

    while !ctx.token.is_cancelled() {
        let frame = match ctx.camera.read(ctx.kind) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("{} loop: {e}", ctx.kind);
                break;
            }
        };

        if decimator.should_process() {
            let (small, scale) = scaler.prepare(&frame);
            match classifier.detect_emotions(&small) {
                Ok(mut results) => {
                    for result in &mut results {
                        result.bounding_box = result.bounding_box.div_scale(scale);
                    }
                    last_results = results;
                }
                Err(e) => log::warn!("{} loop: {}", ctx.kind, Error::Detection(e)),
            }
        }

        let mut faces = Vec::new();
        for (index, result) in last_results.iter().enumerate() {
            let (dominant, confidence) = result.scores.dominant();
            // The color history advances even for faces below the confidence
            // threshold; only the annotation is suppressed.
            let color = smoother.push(index, dominant.traffic_light());
            if confidence > cfg.min_confidence {
                faces.push(FaceAnnotation::Classifier(ClassifierAnnotation::new(
                    index, result, color,
                )));
            }
        }

        emit(ctx, &mut fps, &frame, faces, last_results.len(), &mut emitted);
        thread::sleep(cfg.idle_sleep());
    }
}

fn run_mesh(ctx: &LoopCtx, landmarker: &dyn FaceLandmarker) {
    let cfg = &ctx.config;
    let mut decimator = Decimator::new(cfg.process_every_n_frames);
    let scaler = InferenceScaler::new(cfg.inference_width);
    let mut smoother = ColorSmoother::new(cfg.color_window);
    let mut fps = SmoothedFps::new(cfg.fps_window);
    let mut emitted = 0u64;
    let mut aggregator = TemporalAggregator::new(cfg.temporal_capacity, cfg.temporal_window());
    let mut zones = ZoneTracker::new();
    // Assembled annotations are reused verbatim on decimated frames; the
    // histories only advance on processed frames.
    let mut last_annotations: Vec<FaceAnnotation> = Vec::new();
    let mut last_face_count = 0;

    while !ctx.token.is_cancelled() {
        let frame = match ctx.camera.read(ctx.kind) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("{} loop: {e}", ctx.kind);
                break;
            }
        };

        if decimator.should_process() {
            let (small, scale) = scaler.prepare(&frame);
            match landmarker.detect_landmarks(&small) {
                Ok(mut faces) => {
                    for landmarks in &mut faces {
                        landmarks.div_scale(scale);
                    }
                    let now = frame.timestamp();
                    let mut annotations = Vec::new();
                    for (index, landmarks) in faces.iter().enumerate() {
                        let geometry = match GeometryFeatures::extract(landmarks) {
                            Ok(geometry) => geometry,
                            Err(e) => {
                                log::warn!("{} loop: face {index} skipped: {e}", ctx.kind);
                                continue;
                            }
                        };
                        aggregator.record(index, &geometry, now);
                        let temporal = aggregator.expression_stats(index, now);
                        let affect = AffectState::compute(&geometry, index, &mut zones);
                        let color = smoother.push(index, affect.zone.color());
                        annotations.push(FaceAnnotation::Mesh(MeshAnnotation::new(
                            index, landmarks, geometry, temporal, affect, color,
                        )));
                    }
                    last_face_count = faces.len();
                    last_annotations = annotations;
                }
                Err(e) => log::warn!("{} loop: {}", ctx.kind, Error::Detection(e)),
            }
        }

        emit(
            ctx,
            &mut fps,
            &frame,
            last_annotations.clone(),
            last_face_count,
            &mut emitted,
        );
        thread::sleep(cfg.idle_sleep());
    }
}

/// Encodes and pushes one payload. Emission failures are logged and ignored;
/// the loop continues to the next iteration either way.
fn emit(
    ctx: &LoopCtx,
    fps: &mut SmoothedFps,
    frame: &Frame,
    faces: Vec<FaceAnnotation>,
    face_count: usize,
    emitted: &mut u64,
) {
    let image = match frame.encode_jpeg(ctx.config.jpeg_quality) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("{} loop: frame encode failed: {e}", ctx.kind);
            return;
        }
    };
    let payload = FramePayload {
        image,
        faces,
        fps: fps.tick(Instant::now()),
        face_count,
    };
    if let Err(e) = ctx.sink.emit(payload) {
        log::warn!("{} loop: {}", ctx.kind, Error::Emission(e));
    }
    *emitted += 1;
    if *emitted == 1 {
        log::debug!("{} loop: first frame emitted", ctx.kind);
    }
}

//! The shared camera resource and the capture seams.
//!
//! The camera device may be driven by at most one active reader at a time,
//! so every open/read/release goes through the single mutex inside
//! [`SharedCamera`]. The slot records which loop kind opened it; a loop of
//! the other kind asking for the camera fails explicitly instead of racing
//! the holder.

pub mod v4l2;

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::controller::LoopKind;
use crate::error::Error;
use crate::frame::Frame;

/// Device indices probed by [`list_devices`].
const PROBE_RANGE: std::ops::Range<u32> = 0..5;
/// Pause between open attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(300);
/// Pause after releasing a prior handle, before reopening. Capture drivers
/// need a moment before the device can be acquired again.
const RELEASE_SETTLE: Duration = Duration::from_millis(200);

/// A blocking source of captured frames.
///
/// `read` blocks until the next frame is available. Implementations run
/// driver and decoder code, so failures surface as [`anyhow::Error`]s.
pub trait VideoSource: Send {
    fn read(&mut self) -> Result<Frame>;
}

/// Opens capture devices by index.
pub trait CameraBackend: Send + Sync {
    fn open(&self, index: u32) -> Result<Box<dyn VideoSource>>;
}

/// Metadata of one usable capture device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Probes candidate device indices and lists the ones that open and deliver
/// a frame.
pub fn list_devices(backend: &dyn CameraBackend) -> Vec<CameraInfo> {
    let mut cameras = Vec::new();
    for index in PROBE_RANGE {
        let mut source = match backend.open(index) {
            Ok(source) => source,
            Err(e) => {
                log::debug!("camera {index} not available: {e}");
                continue;
            }
        };
        match source.read() {
            Ok(frame) => {
                let (width, height) = frame.resolution();
                log::info!("camera {index} found: {width}x{height}");
                cameras.push(CameraInfo {
                    index,
                    name: format!("Camera {index}"),
                    width,
                    height,
                });
            }
            Err(e) => log::debug!("camera {index} opened but delivered no frame: {e}"),
        }
    }
    cameras
}

enum CameraSlot {
    Closed,
    Open {
        owner: LoopKind,
        source: Box<dyn VideoSource>,
    },
}

/// The single mutex-guarded camera slot shared by both loop types.
pub struct SharedCamera {
    slot: Mutex<CameraSlot>,
}

impl Default for SharedCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedCamera {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(CameraSlot::Closed),
        }
    }

    /// Opens the device at `index` for `owner`, retrying up to `attempts`
    /// times with a short backoff.
    ///
    /// A slot already held by the same owner is released first and given a
    /// moment to settle. A slot held by the *other* loop kind fails with
    /// [`Error::CameraBusy`]; the holder is never stopped implicitly.
    pub fn open(
        &self,
        backend: &dyn CameraBackend,
        index: u32,
        owner: LoopKind,
        attempts: u32,
    ) -> Result<(), Error> {
        let mut slot = self.slot.lock().unwrap();
        if let CameraSlot::Open { owner: holder, .. } = &*slot {
            if *holder != owner {
                return Err(Error::CameraBusy { held_by: *holder });
            }
            *slot = CameraSlot::Closed;
            thread::sleep(RELEASE_SETTLE);
        }

        let mut last_error = anyhow!("no open attempt was made");
        for attempt in 1..=attempts.max(1) {
            match backend.open(index) {
                Ok(source) => {
                    log::info!("camera {index} opened on attempt {attempt}");
                    *slot = CameraSlot::Open { owner, source };
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("attempt {attempt} to open camera {index} failed: {e}");
                    last_error = e;
                    if attempt < attempts {
                        thread::sleep(RETRY_BACKOFF);
                    }
                }
            }
        }

        log::error!("failed to open camera {index} after {attempts} attempts");
        Err(Error::DeviceUnavailable {
            index,
            attempts,
            cause: last_error,
        })
    }

    /// Reads the next frame for `owner`.
    ///
    /// A closed slot, or one no longer held by `owner`, reports
    /// [`Error::CameraClosed`]; the calling loop treats that as its exit
    /// condition.
    pub fn read(&self, owner: LoopKind) -> Result<Frame, Error> {
        let mut slot = self.slot.lock().unwrap();
        match &mut *slot {
            CameraSlot::Open { owner: holder, source } if *holder == owner => {
                source.read().map_err(Error::ReadFailure)
            }
            _ => Err(Error::CameraClosed),
        }
    }

    /// Releases the slot if it is held by `owner`. Idempotent; releasing a
    /// closed slot or another owner's slot does nothing, so a controller
    /// racing the loop's own cleanup is harmless.
    pub fn release(&self, owner: LoopKind) {
        let mut slot = self.slot.lock().unwrap();
        if let CameraSlot::Open { owner: holder, .. } = &*slot {
            if *holder == owner {
                *slot = CameraSlot::Closed;
                log::info!("camera released by {owner} loop");
            }
        }
    }

    /// The loop kind currently holding the camera, if any.
    pub fn holder(&self) -> Option<LoopKind> {
        match &*self.slot.lock().unwrap() {
            CameraSlot::Open { owner, .. } => Some(*owner),
            CameraSlot::Closed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use anyhow::bail;
    use image::RgbImage;

    use super::*;

    struct BlankSource;

    impl VideoSource for BlankSource {
        fn read(&mut self) -> Result<Frame> {
            Ok(Frame::new(RgbImage::new(64, 48)))
        }
    }

    /// Opens only index 0, and only after `fail_first` failures.
    struct FlakyBackend {
        fail_first: u32,
        calls: AtomicU32,
    }

    impl CameraBackend for FlakyBackend {
        fn open(&self, index: u32) -> Result<Box<dyn VideoSource>> {
            if index != 0 {
                bail!("no device at index {index}");
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                bail!("device busy");
            }
            Ok(Box::new(BlankSource))
        }
    }

    #[test]
    fn open_retries_until_the_backend_cooperates() {
        let backend = FlakyBackend {
            fail_first: 2,
            calls: AtomicU32::new(0),
        };
        let camera = SharedCamera::new();
        camera
            .open(&backend, 0, LoopKind::Classifier, 3)
            .expect("third attempt succeeds");
        assert_eq!(camera.holder(), Some(LoopKind::Classifier));
    }

    #[test]
    fn open_gives_up_after_bounded_attempts() {
        let backend = FlakyBackend {
            fail_first: u32::MAX,
            calls: AtomicU32::new(0),
        };
        let camera = SharedCamera::new();
        let err = camera.open(&backend, 0, LoopKind::Classifier, 3).unwrap_err();
        assert!(matches!(
            err,
            Error::DeviceUnavailable { index: 0, attempts: 3, .. }
        ));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(camera.holder(), None);
    }

    #[test]
    fn other_loop_kind_is_rejected_while_held() {
        let backend = FlakyBackend {
            fail_first: 0,
            calls: AtomicU32::new(0),
        };
        let camera = SharedCamera::new();
        camera.open(&backend, 0, LoopKind::Mesh, 1).unwrap();
        let err = camera.open(&backend, 0, LoopKind::Classifier, 1).unwrap_err();
        assert!(matches!(
            err,
            Error::CameraBusy { held_by: LoopKind::Mesh }
        ));
    }

    #[test]
    fn same_owner_reopen_replaces_the_handle() {
        let backend = FlakyBackend {
            fail_first: 0,
            calls: AtomicU32::new(0),
        };
        let camera = SharedCamera::new();
        camera.open(&backend, 0, LoopKind::Mesh, 1).unwrap();
        camera.open(&backend, 0, LoopKind::Mesh, 1).unwrap();
        assert_eq!(camera.holder(), Some(LoopKind::Mesh));
    }

    #[test]
    fn read_and_release_are_owner_scoped() {
        let backend = FlakyBackend {
            fail_first: 0,
            calls: AtomicU32::new(0),
        };
        let camera = SharedCamera::new();
        camera.open(&backend, 0, LoopKind::Classifier, 1).unwrap();
        assert!(camera.read(LoopKind::Classifier).is_ok());
        assert!(matches!(
            camera.read(LoopKind::Mesh),
            Err(Error::CameraClosed)
        ));

        // Releasing as the wrong owner is a no-op.
        camera.release(LoopKind::Mesh);
        assert_eq!(camera.holder(), Some(LoopKind::Classifier));
        camera.release(LoopKind::Classifier);
        assert_eq!(camera.holder(), None);
        // And releasing again is harmless.
        camera.release(LoopKind::Classifier);
        assert!(matches!(
            camera.read(LoopKind::Classifier),
            Err(Error::CameraClosed)
        ));
    }

    #[test]
    fn listing_skips_absent_devices() {
        let backend = FlakyBackend {
            fail_first: 0,
            calls: AtomicU32::new(0),
        };
        let cameras = list_devices(&backend);
        assert_eq!(cameras.len(), 1);
        assert_eq!(
            cameras[0],
            CameraInfo {
                index: 0,
                name: "Camera 0".into(),
                width: 64,
                height: 48,
            }
        );
    }
}

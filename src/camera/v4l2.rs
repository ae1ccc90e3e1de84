//! V4L2 capture backend.
//!
//! Only `VIDEO_CAPTURE` devices yielding JFIF JPEG or Motion JPEG frames are
//! supported; frames are decoded to RGB on read.

use std::ffi::OsString;

use anyhow::{bail, Result};
use image::RgbImage;
use linuxvideo::{
    format::{PixFormat, PixelFormat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device,
};

use crate::camera::{CameraBackend, VideoSource};
use crate::frame::Frame;
use crate::timer::Timer;

/// Resolution requested from the driver; V4L2 adjusts it to the nearest
/// format the device supports.
const REQUESTED_WIDTH: u32 = 1280;
const REQUESTED_HEIGHT: u32 = 720;

/// Opens `/dev/videoN` devices via V4L2.
pub struct V4l2Backend;

impl CameraBackend for V4l2Backend {
    fn open(&self, index: u32) -> Result<Box<dyn VideoSource>> {
        let device_name = OsString::from(format!("video{index}"));
        for res in linuxvideo::list()? {
            let dev = match res {
                Ok(dev) => dev,
                Err(e) => {
                    log::warn!("{e}");
                    continue;
                }
            };
            if dev.path()?.file_name() != Some(device_name.as_os_str()) {
                continue;
            }
            return Ok(Box::new(V4l2Source::open(dev)?));
        }
        bail!("no V4L2 device found at index {index}")
    }
}

/// Reads between capture timer log lines. Displaying a [`Timer`] drains its
/// recordings, so this also bounds their memory.
const TIMER_LOG_INTERVAL: u64 = 100;

struct V4l2Source {
    stream: ReadStream,
    width: u32,
    height: u32,
    reads: u64,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl V4l2Source {
    fn open(dev: Device) -> Result<Self> {
        let caps = dev.capabilities()?;
        if !caps.device_capabilities().contains(CapabilityFlags::VIDEO_CAPTURE) {
            bail!("device {} is not a capture device", caps.card());
        }

        let mut pixel_format = None;
        for format in dev.formats(BufType::VIDEO_CAPTURE) {
            let format = format?;
            if format.pixel_format() == PixelFormat::JPEG || format.pixel_format() == PixelFormat::MJPG {
                pixel_format = Some(format.pixel_format());
                break;
            }
        }
        let Some(pixel_format) = pixel_format else {
            bail!("device {} has no supported pixel format", caps.card());
        };

        let path = dev.path()?;
        let capture =
            dev.video_capture(PixFormat::new(REQUESTED_WIDTH, REQUESTED_HEIGHT, pixel_format))?;
        let format = capture.format();
        let (width, height) = (format.width(), format.height());
        log::info!("opened {} ({}), {width}x{height}", caps.card(), path.display());

        let stream = capture.into_stream()?;
        Ok(Self {
            stream,
            width,
            height,
            reads: 0,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        })
    }
}

impl VideoSource for V4l2Source {
    fn read(&mut self) -> Result<Frame> {
        self.reads += 1;
        if self.reads % TIMER_LOG_INTERVAL == 0 {
            log::trace!("{}, {}", self.t_dequeue, self.t_decode);
        }
        let dequeue_guard = self.t_dequeue.start();
        self.stream
            .dequeue(|buf| {
                drop(dequeue_guard);
                let frame = match self.t_decode.time(|| Frame::decode(&buf)) {
                    Ok(frame) => frame,
                    Err(e) => {
                        // Even high-quality webcams produce occasional corrupted
                        // MJPG frames. Hand back a blank frame instead of
                        // skipping, which would cause 2x latency spikes.
                        log::error!("webcam decode error: {e}");
                        Frame::new(RgbImage::new(self.width, self.height))
                    }
                };
                Ok(frame)
            })
            .map_err(Into::into)
    }
}

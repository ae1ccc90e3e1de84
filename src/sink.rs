//! The push-transport seam payloads are emitted through.
//!
//! Emission is best effort: the loop logs a failed emit and moves on to the
//! next iteration, and no backpressure contract exists. Sinks must therefore
//! never block the loop for long.

use anyhow::{anyhow, Result};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::payload::FramePayload;

/// Accepts one [`FramePayload`] per loop iteration.
pub trait FrameSink: Send + Sync {
    fn emit(&self, payload: FramePayload) -> Result<()>;
}

/// A sink backed by a bounded channel.
///
/// When the consumer falls behind and the channel is full, the payload is
/// dropped silently; a stale frame is worth less than a stalled loop. A
/// disconnected consumer is reported as an error, which the loop logs and
/// ignores.
pub struct ChannelSink {
    sender: Sender<FramePayload>,
}

impl ChannelSink {
    /// Creates a sink and the receiving end, holding at most `capacity`
    /// undelivered payloads.
    pub fn new(capacity: usize) -> (Self, Receiver<FramePayload>) {
        let (sender, receiver) = channel::bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl FrameSink for ChannelSink {
    fn emit(&self, payload: FramePayload) -> Result<()> {
        match self.sender.try_send(payload) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                log::debug!("frame sink full, dropping payload");
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(anyhow!("frame sink disconnected")),
        }
    }
}

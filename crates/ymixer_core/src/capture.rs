//! Capture Source
//!
//! Owns one open capture stream. Samples never pass through this type: the
//! backend's callback writes straight into the jitter buffer on the OS audio
//! thread. What stays here is the device handle and the stream's lifetime.

use tracing::debug;

use crate::backend::{ActiveStream, AudioBackend, ErrorCallback};
use crate::config::StreamConfig;
use crate::device::{AudioDeviceHandle, CaptureTarget, DeviceState};
use crate::error::{EngineError, EngineResult};
use crate::jitter::JitterWriter;

pub struct CaptureSource {
    stream: Option<Box<dyn ActiveStream>>,
    handle: AudioDeviceHandle,
}

impl CaptureSource {
    /// Open `target` and start delivering into `writer`
    ///
    /// Busy, missing and permission-denied devices all come back as
    /// [`EngineError::Capture`].
    pub fn start<B: AudioBackend + ?Sized>(
        backend: &mut B,
        target: &CaptureTarget,
        config: &StreamConfig,
        writer: JitterWriter,
        on_error: ErrorCallback,
    ) -> EngineResult<Self> {
        let stream = backend
            .open_capture(target, config, writer, on_error)
            .map_err(|e| match e {
                EngineError::Capture(_) => e,
                other => EngineError::Capture(other.to_string()),
            })?;

        let handle = AudioDeviceHandle::open(target.kind(), stream.device_name(), config);
        debug!("Capture source open: {:?}", handle);

        Ok(Self {
            stream: Some(stream),
            handle,
        })
    }

    /// Release the device. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("Capture source '{}' stopped", self.handle.name);
        }
        self.handle.state = DeviceState::Closed;
    }

    pub fn handle(&self) -> &AudioDeviceHandle {
        &self.handle
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.stop();
    }
}

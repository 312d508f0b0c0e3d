//! Audio Backends
//!
//! The pipeline talks to audio hardware through [`AudioBackend`]. The cpal
//! implementation drives real devices; the mock (behind the `mock` feature)
//! lets tests script device failures and pump samples by hand.
//!
//! Streams are returned as boxed [`ActiveStream`]s. Dropping one stops the
//! device. They are not `Send` (cpal streams aren't on every platform), so
//! they stay on the thread that opened them.

mod host;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use host::CpalBackend;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockBackend;

use crate::config::StreamConfig;
use crate::device::{CaptureTarget, InputDeviceInfo};
use crate::error::EngineResult;
use crate::jitter::JitterWriter;

/// Render callback: fill the whole slice with interleaved output samples
pub type RenderCallback = Box<dyn FnMut(&mut [f32]) + Send + 'static>;

/// Called from the OS audio thread when a running stream fails
pub type ErrorCallback = Box<dyn FnMut(String) + Send + 'static>;

/// A running device stream. Dropping it releases the device.
pub trait ActiveStream {
    /// Name of the device this stream runs on
    fn device_name(&self) -> &str;
}

/// Opens capture and playback streams
pub trait AudioBackend: Send {
    /// Open a capture stream on `target`, feeding `writer`
    ///
    /// For [`CaptureTarget::Loopback`] the default output device is captured
    /// as an input. Any failure (busy, missing, no permission) is reported as
    /// [`crate::EngineError::Capture`].
    fn open_capture(
        &mut self,
        target: &CaptureTarget,
        config: &StreamConfig,
        writer: JitterWriter,
        on_error: ErrorCallback,
    ) -> EngineResult<Box<dyn ActiveStream>>;

    /// Enumerate input devices in backend order
    fn input_devices(&mut self) -> EngineResult<Vec<InputDeviceInfo>>;

    /// Open the default output device, pulling samples through `render`
    fn open_output(
        &mut self,
        config: &StreamConfig,
        render: RenderCallback,
        on_error: ErrorCallback,
    ) -> EngineResult<Box<dyn ActiveStream>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn open_capture(
        &mut self,
        target: &CaptureTarget,
        config: &StreamConfig,
        writer: JitterWriter,
        on_error: ErrorCallback,
    ) -> EngineResult<Box<dyn ActiveStream>> {
        (**self).open_capture(target, config, writer, on_error)
    }

    fn input_devices(&mut self) -> EngineResult<Vec<InputDeviceInfo>> {
        (**self).input_devices()
    }

    fn open_output(
        &mut self,
        config: &StreamConfig,
        render: RenderCallback,
        on_error: ErrorCallback,
    ) -> EngineResult<Box<dyn ActiveStream>> {
        (**self).open_output(config, render, on_error)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

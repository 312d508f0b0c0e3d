//! Scriptable in-memory backend
//!
//! Stands in for audio hardware in tests and benchmarks. Failures are set up
//! front (or between restarts), and samples are pumped by hand: `deliver()`
//! plays the capture callback, `render()` plays the output callback.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{ActiveStream, AudioBackend, ErrorCallback, RenderCallback};
use crate::config::StreamConfig;
use crate::device::{CaptureTarget, DeviceKind, InputDeviceInfo};
use crate::error::{EngineError, EngineResult};
use crate::jitter::JitterWriter;

/// Name reported for the loopback device
pub const MOCK_LOOPBACK_NAME: &str = "Mock Speakers (loopback)";

/// Name reported for the output device
pub const MOCK_OUTPUT_NAME: &str = "Mock Speakers";

/// One successful open, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOpen {
    Capture {
        kind: DeviceKind,
        name: String,
        config: StreamConfig,
    },
    Output {
        config: StreamConfig,
    },
}

struct CaptureSlot {
    id: u64,
    writer: JitterWriter,
    on_error: ErrorCallback,
}

struct OutputSlot {
    id: u64,
    render: RenderCallback,
    on_error: ErrorCallback,
}

#[derive(Default)]
struct MockState {
    loopback_error: Option<String>,
    output_error: Option<String>,
    enumerate_error: Option<String>,
    failing_inputs: Vec<String>,
    inputs: Vec<InputDeviceInfo>,
    capture: Option<CaptureSlot>,
    output: Option<OutputSlot>,
    opened: Vec<MockOpen>,
    enumerations: usize,
    next_id: u64,
}

#[derive(Clone, Copy)]
enum SlotKind {
    Capture,
    Output,
}

struct MockStream {
    id: u64,
    slot: SlotKind,
    device_name: String,
    state: Arc<Mutex<MockState>>,
}

impl ActiveStream for MockStream {
    fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        match self.slot {
            SlotKind::Capture => {
                if state.capture.as_ref().map(|c| c.id) == Some(self.id) {
                    state.capture = None;
                }
            }
            SlotKind::Output => {
                if state.output.as_ref().map(|o| o.id) == Some(self.id) {
                    state.output = None;
                }
            }
        }
    }
}

/// Cloneable handle to a shared mock device set
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Working loopback and output, no input devices
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs(self, inputs: Vec<InputDeviceInfo>) -> Self {
        self.state.lock().inputs = inputs;
        self
    }

    pub fn with_loopback_failure(self, message: &str) -> Self {
        self.set_loopback_failure(Some(message));
        self
    }

    pub fn with_output_failure(self, message: &str) -> Self {
        self.state.lock().output_error = Some(message.to_string());
        self
    }

    pub fn with_enumeration_failure(self, message: &str) -> Self {
        self.state.lock().enumerate_error = Some(message.to_string());
        self
    }

    /// Make opening the named input device fail
    pub fn with_failing_input(self, name: &str) -> Self {
        self.state.lock().failing_inputs.push(name.to_string());
        self
    }

    pub fn set_loopback_failure(&self, message: Option<&str>) {
        self.state.lock().loopback_error = message.map(str::to_string);
    }

    /// Push samples through the open capture stream's callback
    ///
    /// Returns the number stored, or `None` when nothing is capturing.
    pub fn deliver(&self, samples: &[f32]) -> Option<usize> {
        let mut state = self.state.lock();
        state.capture.as_mut().map(|c| c.writer.push(samples))
    }

    /// Run the output callback for `len` samples
    pub fn render(&self, len: usize) -> Option<Vec<f32>> {
        let mut state = self.state.lock();
        state.output.as_mut().map(|o| {
            let mut buffer = vec![0.0_f32; len];
            (o.render)(&mut buffer);
            buffer
        })
    }

    /// Report an OS error on the running capture stream
    pub fn fail_capture(&self, message: &str) -> bool {
        let mut state = self.state.lock();
        match state.capture.as_mut() {
            Some(c) => {
                (c.on_error)(message.to_string());
                true
            }
            None => false,
        }
    }

    /// Report an OS error on the running output stream
    pub fn fail_output(&self, message: &str) -> bool {
        let mut state = self.state.lock();
        match state.output.as_mut() {
            Some(o) => {
                (o.on_error)(message.to_string());
                true
            }
            None => false,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.state.lock().capture.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().output.is_some()
    }

    /// Every successful open so far
    pub fn opened(&self) -> Vec<MockOpen> {
        self.state.lock().opened.clone()
    }

    /// How many times input devices were enumerated
    pub fn enumerations(&self) -> usize {
        self.state.lock().enumerations
    }

    fn next_id(state: &mut MockState) -> u64 {
        state.next_id += 1;
        state.next_id
    }
}

impl AudioBackend for MockBackend {
    fn open_capture(
        &mut self,
        target: &CaptureTarget,
        config: &StreamConfig,
        writer: JitterWriter,
        on_error: ErrorCallback,
    ) -> EngineResult<Box<dyn ActiveStream>> {
        let mut state = self.state.lock();

        let device_name = match target {
            CaptureTarget::Loopback => {
                if let Some(message) = &state.loopback_error {
                    return Err(EngineError::Capture(message.clone()));
                }
                MOCK_LOOPBACK_NAME.to_string()
            }
            CaptureTarget::Microphone(info) => {
                if state.failing_inputs.contains(&info.name) {
                    return Err(EngineError::Capture(format!("'{}' is busy", info.name)));
                }
                info.name.clone()
            }
        };

        let id = Self::next_id(&mut state);
        state.capture = Some(CaptureSlot {
            id,
            writer,
            on_error,
        });
        state.opened.push(MockOpen::Capture {
            kind: target.kind(),
            name: device_name.clone(),
            config: *config,
        });

        Ok(Box::new(MockStream {
            id,
            slot: SlotKind::Capture,
            device_name,
            state: Arc::clone(&self.state),
        }))
    }

    fn input_devices(&mut self) -> EngineResult<Vec<InputDeviceInfo>> {
        let mut state = self.state.lock();
        state.enumerations += 1;
        match &state.enumerate_error {
            Some(message) => Err(EngineError::Capture(message.clone())),
            None => Ok(state.inputs.clone()),
        }
    }

    fn open_output(
        &mut self,
        config: &StreamConfig,
        render: RenderCallback,
        on_error: ErrorCallback,
    ) -> EngineResult<Box<dyn ActiveStream>> {
        let mut state = self.state.lock();
        if let Some(message) = &state.output_error {
            return Err(EngineError::Playback(message.clone()));
        }

        let id = Self::next_id(&mut state);
        state.output = Some(OutputSlot {
            id,
            render,
            on_error,
        });
        state.opened.push(MockOpen::Output { config: *config });

        Ok(Box::new(MockStream {
            id,
            slot: SlotKind::Output,
            device_name: MOCK_OUTPUT_NAME.to_string(),
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

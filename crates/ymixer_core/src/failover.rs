//! Device Failover Controller
//!
//! Builds the capture → jitter buffer → equalizer → playback chain and keeps
//! it alive. Loopback capture is tried first; if it can't be opened, or dies
//! while running, the whole chain is rebuilt once on the first input device
//! that reports any channels.
//!
//! ```text
//! Uninitialized ─▶ TryingLoopback ─┬─▶ Running
//!                                  └─▶ TryingMicrophone ─┬─▶ Running
//!                                                        └─▶ Failed
//! ```
//!
//! There is no retry loop. `Failed` is terminal until the user restarts.

use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::{debug, error, info, warn};
use ymixer_dsp::{EqParams, EqualizerEngine};

use crate::backend::{AudioBackend, ErrorCallback};
use crate::capture::CaptureSource;
use crate::config::{EngineConfig, StreamConfig, DEFAULT_SAMPLE_RATE};
use crate::device::{AudioDeviceHandle, CaptureTarget, DeviceKind};
use crate::error::{EngineError, EngineResult};
use crate::jitter::{BoundedJitterBuffer, JitterStats};
use crate::message::{EngineStatus, Event, FailoverState};
use crate::playback::{PlaybackSink, PlaybackStream};

/// Stream failures reported from OS audio threads
///
/// `epoch` identifies the pipeline the stream belonged to, so errors from a
/// torn-down pipeline can be told apart from live ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamNotice {
    CaptureFailed { epoch: u64, message: String },
    PlaybackFailed { epoch: u64, message: String },
}

// Field order is drop order: capture stops before playback
struct Pipeline {
    capture: CaptureSource,
    playback: PlaybackStream,
    jitter: Arc<JitterStats>,
}

pub struct DeviceFailoverController<B> {
    backend: B,
    config: EngineConfig,
    params: Arc<EqParams>,
    events: Sender<Event>,
    notices: Sender<StreamNotice>,
    state: FailoverState,
    pipeline: Option<Pipeline>,
    epoch: u64,
}

impl<B: AudioBackend> DeviceFailoverController<B> {
    /// Create an idle controller. Nothing is opened until [`start`](Self::start).
    pub fn new(
        backend: B,
        config: EngineConfig,
        params: Arc<EqParams>,
        events: Sender<Event>,
        notices: Sender<StreamNotice>,
    ) -> Self {
        Self {
            backend,
            config,
            params,
            events,
            notices,
            state: FailoverState::Uninitialized,
            pipeline: None,
            epoch: 0,
        }
    }

    /// Bring the pipeline up, falling back to a microphone if needed
    pub fn start(&mut self) -> FailoverState {
        if self.state == FailoverState::Running {
            debug!("Pipeline already running");
            return self.state;
        }

        self.state = FailoverState::TryingLoopback;
        info!("Opening loopback capture via {} backend", self.backend.name());

        let stream = self.config.stream;
        match self.build(CaptureTarget::Loopback, stream) {
            Ok(pipeline) => self.run(pipeline),
            Err(e) => {
                warn!("Loopback capture failed: {}", e);
                self.emit(Event::FailoverStarted {
                    reason: e.to_string(),
                });
                self.fall_back_to_microphone();
            }
        }
        self.state
    }

    /// Tear everything down and return to `Uninitialized`
    pub fn stop(&mut self) {
        if self.pipeline.take().is_some() {
            info!("Pipeline stopped");
        }
        self.state = FailoverState::Uninitialized;
        self.emit(Event::Stopped);
    }

    /// Manual re-trigger, also from `Failed`
    pub fn restart(&mut self) -> FailoverState {
        self.stop();
        self.start()
    }

    /// React to a failure reported by a running stream
    pub fn handle_notice(&mut self, notice: StreamNotice) {
        match notice {
            StreamNotice::CaptureFailed { epoch, message } if epoch == self.epoch => {
                let kind = self.device().map(|d| d.kind);
                match (self.state, kind) {
                    (FailoverState::Running, Some(DeviceKind::LoopbackOutput)) => {
                        warn!("Loopback capture stopped: {}", message);
                        self.emit(Event::FailoverStarted { reason: message });
                        self.fall_back_to_microphone();
                    }
                    (FailoverState::Running, Some(DeviceKind::MicrophoneInput)) => {
                        self.fail(format!("Microphone capture stopped: {}", message));
                    }
                    _ => debug!("Capture error in state {:?} ignored: {}", self.state, message),
                }
            }
            StreamNotice::PlaybackFailed { epoch, message } if epoch == self.epoch => {
                error!("Playback stream error: {}", message);
                self.emit(Event::Error { message });
            }
            stale => debug!("Ignoring notice from an old pipeline: {:?}", stale),
        }
    }

    pub fn state(&self) -> FailoverState {
        self.state
    }

    /// The capture device in use, if running
    pub fn device(&self) -> Option<&AudioDeviceHandle> {
        self.pipeline.as_ref().map(|p| p.capture.handle())
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state,
            device: self.device().cloned(),
            dropped_samples: self
                .pipeline
                .as_ref()
                .map_or(0, |p| p.jitter.dropped_samples()),
            underruns: self
                .pipeline
                .as_ref()
                .map_or(0, |p| p.playback.stats().underruns()),
        }
    }

    fn fall_back_to_microphone(&mut self) {
        self.state = FailoverState::TryingMicrophone;
        self.pipeline = None;

        let devices = match self.backend.input_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Input device enumeration failed: {}", e);
                Vec::new()
            }
        };

        let Some(mic) = devices.into_iter().find(|d| d.is_capable()) else {
            self.fail(EngineError::NoCapableDevice.to_string());
            return;
        };

        info!("Falling back to microphone '{}' ({}ch)", mic.name, mic.channels);
        let stream = StreamConfig::new(DEFAULT_SAMPLE_RATE, mic.channels);
        match self.build(CaptureTarget::Microphone(mic), stream) {
            Ok(pipeline) => self.run(pipeline),
            Err(e) => self.fail(format!("Fallback to microphone input failed: {}", e)),
        }
    }

    fn run(&mut self, pipeline: Pipeline) {
        let device = pipeline.capture.handle().clone();
        info!(
            "Pipeline running on '{}' ({:?}, {}Hz, {}ch) -> '{}'",
            device.name,
            device.kind,
            device.sample_rate,
            device.channels,
            pipeline.playback.device_name()
        );
        self.pipeline = Some(pipeline);
        self.state = FailoverState::Running;
        self.emit(Event::Running { device });
    }

    fn fail(&mut self, message: String) {
        self.pipeline = None;
        self.state = FailoverState::Failed;
        error!("Audio pipeline failed: {}", message);
        self.emit(Event::Fatal { message });
    }

    /// Open capture and playback for `target`, sized to `stream`
    ///
    /// The equalizer designs its filters for the capture sample rate, and
    /// playback opens with the capture channel count.
    fn build(&mut self, target: CaptureTarget, stream: StreamConfig) -> EngineResult<Pipeline> {
        stream.validate().map_err(EngineError::Config)?;

        self.epoch += 1;
        let epoch = self.epoch;

        let on_capture_error = self.capture_error_callback(epoch);
        let on_playback_error = self.playback_error_callback(epoch);

        let (writer, reader) =
            BoundedJitterBuffer::for_stream(&stream, self.config.jitter_buffer_ms);
        let jitter = Arc::clone(writer.stats());

        let capture =
            CaptureSource::start(&mut self.backend, &target, &stream, writer, on_capture_error)?;

        let equalizer =
            EqualizerEngine::new(reader, stream.sample_rate as f32, Arc::clone(&self.params));
        let playback =
            PlaybackSink::new(equalizer).start(&mut self.backend, &stream, on_playback_error)?;

        Ok(Pipeline {
            capture,
            playback,
            jitter,
        })
    }

    fn capture_error_callback(&self, epoch: u64) -> ErrorCallback {
        let notices = self.notices.clone();
        Box::new(move |message| {
            let _ = notices.try_send(StreamNotice::CaptureFailed { epoch, message });
        })
    }

    fn playback_error_callback(&self, epoch: u64) -> ErrorCallback {
        let notices = self.notices.clone();
        Box::new(move |message| {
            let _ = notices.try_send(StreamNotice::PlaybackFailed { epoch, message });
        })
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }
}

//! YMixer Core - Audio Engine
//!
//! This crate provides the device side of YMixer:
//! - Loopback capture with a one-shot microphone fallback
//! - A bounded jitter buffer between the capture and render callbacks
//! - Playback of the equalized stream on the default output device
//! - Equalizer presets and application settings on disk
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UI Thread                            │
//! │  (CLI) ──commands──▶ AudioEngine ◀──events── (CLI)          │
//! │          └──────── EqParams (atomics) ────────┐             │
//! └───────────────────────────────────────────────┼─────────────┘
//!                   │ crossbeam-channel            │
//!                   ▼                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   ymixer-audio thread: DeviceFailoverController             │
//! │                                                             │
//! │   Capture ──rtrb──▶ EqualizerEngine ──▶ PlaybackSink        │
//! │              (Zero allocation in this path)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
mod capture;
mod config;
mod device;
mod engine;
mod error;
mod failover;
mod jitter;
mod message;
mod playback;
mod presets;
mod settings;

pub use backend::{ActiveStream, AudioBackend, CpalBackend};
#[cfg(any(test, feature = "mock"))]
pub use backend::MockBackend;
pub use capture::CaptureSource;
pub use config::{EngineConfig, StreamConfig, DEFAULT_SAMPLE_RATE};
pub use device::{AudioDeviceHandle, CaptureTarget, DeviceKind, DeviceState, InputDeviceInfo};
pub use engine::AudioEngine;
pub use error::{EngineError, EngineResult};
pub use failover::{DeviceFailoverController, StreamNotice};
pub use jitter::{BoundedJitterBuffer, JitterReader, JitterStats, JitterWriter};
pub use message::{Command, EngineStatus, Event, FailoverState};
pub use playback::{PlaybackSink, PlaybackStats, PlaybackStream};
pub use presets::{Preset, PresetMap, PresetScope, PresetStore, PRESETS_FILE_NAME};
pub use settings::{AppSettings, SettingsStore, SETTINGS_FILE_NAME};

// Re-export DSP types for convenience
pub use ymixer_dsp::{EqParams, EqualizerConfig, BAND_COUNT, EQ_BANDS};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify public API is accessible
        let _config = EngineConfig::default();
        let _scope = PresetScope::default();
        assert_eq!(EQ_BANDS.len(), BAND_COUNT);
    }
}

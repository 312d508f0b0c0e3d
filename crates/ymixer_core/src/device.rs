//! Audio Device Descriptions
//!
//! Backend-neutral descriptions of the devices the pipeline opens. The cpal
//! specifics live in [`crate::backend`].

use serde::{Deserialize, Serialize};

use crate::config::StreamConfig;

/// Where captured audio comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    /// The default output device, captured as an input (system audio)
    LoopbackOutput,
    /// A physical input device
    MicrophoneInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    Open,
    Closed,
}

/// An opened capture device and the format it was opened with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDeviceHandle {
    pub kind: DeviceKind,
    pub name: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub state: DeviceState,
}

impl AudioDeviceHandle {
    pub fn open(kind: DeviceKind, name: impl Into<String>, config: &StreamConfig) -> Self {
        Self {
            kind,
            name: name.into(),
            channels: config.channels,
            sample_rate: config.sample_rate,
            state: DeviceState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == DeviceState::Open
    }

    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig::new(self.sample_rate, self.channels)
    }
}

/// An input device as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDeviceInfo {
    /// Human-readable device name (also used as its identifier)
    pub name: String,

    /// Native channel count (0 if the device could not be queried)
    pub channels: u16,

    /// Whether this is the system default input
    pub is_default: bool,
}

impl InputDeviceInfo {
    /// Whether the device can feed the pipeline at all
    pub fn is_capable(&self) -> bool {
        self.channels > 0
    }
}

/// What a capture stream should be opened on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    Loopback,
    Microphone(InputDeviceInfo),
}

impl CaptureTarget {
    pub fn kind(&self) -> DeviceKind {
        match self {
            CaptureTarget::Loopback => DeviceKind::LoopbackOutput,
            CaptureTarget::Microphone(_) => DeviceKind::MicrophoneInput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_kind_serialization() {
        let kind = DeviceKind::MicrophoneInput;
        let json = serde_json::to_string(&kind).unwrap();
        let deserialized: DeviceKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, deserialized);
    }

    #[test]
    fn test_handle_from_config() {
        let handle = AudioDeviceHandle::open(
            DeviceKind::LoopbackOutput,
            "Speakers",
            &StreamConfig::new(44100, 2),
        );

        assert!(handle.is_open());
        assert_eq!(handle.channels, 2);
        assert_eq!(handle.stream_config(), StreamConfig::new(44100, 2));
    }

    #[test]
    fn test_capable_device() {
        let mut info = InputDeviceInfo {
            name: "USB Mic".to_string(),
            channels: 1,
            is_default: false,
        };
        assert!(info.is_capable());

        info.channels = 0;
        assert!(!info.is_capable());
    }

    #[test]
    fn test_capture_target_kind() {
        assert_eq!(CaptureTarget::Loopback.kind(), DeviceKind::LoopbackOutput);
        let mic = InputDeviceInfo {
            name: "Mic".into(),
            channels: 2,
            is_default: true,
        };
        assert_eq!(CaptureTarget::Microphone(mic).kind(), DeviceKind::MicrophoneInput);
    }
}

//! Message Types for Thread Communication
//!
//! Commands flow from UI thread -> Audio thread
//! Events flow from Audio thread -> UI thread
//!
//! EQ parameters don't travel as commands: the UI writes them straight into
//! the shared `EqParams` atomics.

use serde::{Deserialize, Serialize};

use crate::device::AudioDeviceHandle;

/// Commands sent from UI thread to Audio engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open devices (loopback first, microphone on failure)
    Start,

    /// Close devices
    Stop,

    /// Stop, then start again. The only way out of the failed state.
    Restart,

    /// Request current state (triggers StateUpdate event)
    RequestState,

    /// Shutdown the engine
    Shutdown,
}

/// Where the failover state machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailoverState {
    Uninitialized,
    TryingLoopback,
    TryingMicrophone,
    Running,
    Failed,
}

/// Snapshot of the pipeline for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: FailoverState,
    pub device: Option<AudioDeviceHandle>,
    /// Samples the jitter buffer discarded on overflow
    pub dropped_samples: u64,
    /// Output callbacks padded with silence
    pub underruns: u64,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            state: FailoverState::Uninitialized,
            device: None,
            dropped_samples: 0,
            underruns: 0,
        }
    }
}

/// Events sent from Audio engine to UI thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Capture and playback are running on `device`
    Running { device: AudioDeviceHandle },

    /// Loopback capture failed; trying the first capable microphone
    FailoverStarted { reason: String },

    /// No capture source could be opened. Nothing retries until a restart.
    Fatal { message: String },

    /// Engine stopped
    Stopped,

    /// Non-fatal error occurred
    Error { message: String },

    /// Current state snapshot
    StateUpdate(EngineStatus),
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::device::DeviceKind;

    #[test]
    fn test_event_serialization() {
        let event = Event::Running {
            device: AudioDeviceHandle::open(
                DeviceKind::MicrophoneInput,
                "USB Mic",
                &StreamConfig::new(44100, 1),
            ),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("Running"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_error_event() {
        let event = Event::error("Test error message");
        if let Event::Error { message } = event {
            assert_eq!(message, "Test error message");
        } else {
            panic!("Should be Error variant");
        }
    }

    #[test]
    fn test_state_update_serialization() {
        let event = Event::StateUpdate(EngineStatus {
            state: FailoverState::Failed,
            ..Default::default()
        });

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        if let Event::StateUpdate(status) = deserialized {
            assert_eq!(status.state, FailoverState::Failed);
            assert!(status.device.is_none());
        } else {
            panic!("Wrong variant");
        }
    }
}

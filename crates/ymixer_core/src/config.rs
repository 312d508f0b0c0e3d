//! Engine and Stream Configuration

use serde::{Deserialize, Serialize};

/// Sample rate every pipeline runs at, loopback and microphone alike
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Audio stream configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of interleaved channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 2,
        }
    }
}

impl StreamConfig {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Number of interleaved samples covering `ms` milliseconds
    pub fn samples_for_ms(&self, ms: u32) -> usize {
        let frames = (self.sample_rate as u64 * ms as u64 + 999) / 1000;
        frames as usize * self.channels as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > 8 {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        Ok(())
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Format requested for loopback capture and playback
    pub stream: StreamConfig,

    /// Jitter buffer capacity in milliseconds
    pub jitter_buffer_ms: u32,

    /// Whether to open devices as soon as the engine is created
    pub auto_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            jitter_buffer_ms: 50,
            auto_start: false,
        }
    }
}

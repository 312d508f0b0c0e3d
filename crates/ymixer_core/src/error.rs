//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the audio engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Opening or starting a capture device failed (busy, missing, or permission denied)
    #[error("Capture device unavailable: {0}")]
    Capture(String),

    #[error("No input device with a usable channel count")]
    NoCapableDevice,

    #[error("Playback device unavailable: {0}")]
    Playback(String),

    #[error("Stream configuration error: {0}")]
    Config(String),

    #[error("Invalid preset: {0}")]
    InvalidPreset(String),

    #[error("Failed to spawn audio thread: {0}")]
    Thread(String),

    #[error("DSP error: {0}")]
    Dsp(#[from] ymixer_dsp::DspError),

    #[error("Channel send error - receiver dropped")]
    ChannelSend,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

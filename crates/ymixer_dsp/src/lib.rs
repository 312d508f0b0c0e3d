//! YMixer DSP - Digital Signal Processing Module
//!
//! This crate provides the playback-path transform for YMixer:
//! - 10-band peaking equalizer using BiQuad filters, cascaded low to high
//! - Bass boost on the three lowest bands
//! - Volume boost, fixed pre-amp and an output limiter
//! - Lock-free parameter updates from the UI thread
//!
//! # Architecture
//!
//! Stages are pull-based [`SampleSource`]s. The render path follows a strict
//! "no allocation, no locks in audio callback" rule: the UI writes
//! [`EqParams`] atomics and the [`EqualizerEngine`] picks changes up between
//! buffers.

mod config;
mod engine;
mod eq;
mod error;
mod limiter;
mod params;
mod processor;

pub use config::{
    EqualizerConfig, BASS_BOOST_BANDS, MAX_BASS_BOOST_DB, MAX_VOLUME_BOOST,
    MAX_VOLUME_BOOST_PERCENT,
};
pub use engine::EqualizerEngine;
pub use eq::{
    clamp_gain_db, Band, FilterBank, ACTIVE_THRESHOLD_DB, BAND_COUNT, BAND_Q, EQ_BANDS,
    MAX_GAIN_DB, MIN_GAIN_DB,
};
pub use error::DspError;
pub use limiter::{hard_clamp, output_stage, soft_clip, PRE_AMP};
pub use params::EqParams;
pub use processor::SampleSource;

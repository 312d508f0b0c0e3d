//! Playback Sink
//!
//! The last stage of the chain. On every output callback it pulls processed
//! samples from the equalizer and zero-fills whatever the chain could not
//! produce. A short read is an underrun, counted but never an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;
use ymixer_dsp::SampleSource;

use crate::backend::{ActiveStream, AudioBackend, ErrorCallback};
use crate::config::StreamConfig;
use crate::error::{EngineError, EngineResult};

/// Render-side counters, readable from the control thread
#[derive(Debug, Default)]
pub struct PlaybackStats {
    underruns: AtomicU64,
    rendered: AtomicU64,
}

impl PlaybackStats {
    /// Callbacks that had to pad with silence
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Samples delivered to the device, silence included
    pub fn rendered_samples(&self) -> u64 {
        self.rendered.load(Ordering::Relaxed)
    }
}

pub struct PlaybackSink<S> {
    source: S,
    stats: Arc<PlaybackStats>,
}

impl<S: SampleSource> PlaybackSink<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            stats: Arc::new(PlaybackStats::default()),
        }
    }

    /// Pull up to `out.len()` processed samples; may return fewer
    pub fn read(&mut self, out: &mut [f32]) -> usize {
        self.source.read(out)
    }

    /// Fill all of `out`, padding a short read with silence
    ///
    /// # Real-time Safety
    /// No allocations, no locks.
    pub fn render(&mut self, out: &mut [f32]) {
        let produced = self.read(out);
        if produced < out.len() {
            out[produced..].fill(0.0);
            self.stats.underruns.fetch_add(1, Ordering::Relaxed);
        }
        self.stats
            .rendered
            .fetch_add(out.len() as u64, Ordering::Relaxed);
    }

    pub fn stats(&self) -> &Arc<PlaybackStats> {
        &self.stats
    }

    /// Hand the sink to the output device's render callback
    pub fn start<B: AudioBackend + ?Sized>(
        self,
        backend: &mut B,
        config: &StreamConfig,
        on_error: ErrorCallback,
    ) -> EngineResult<PlaybackStream>
    where
        S: 'static,
    {
        let stats = Arc::clone(&self.stats);
        let mut sink = self;

        let stream = backend
            .open_output(config, Box::new(move |out: &mut [f32]| sink.render(out)), on_error)
            .map_err(|e| match e {
                EngineError::Playback(_) => e,
                other => EngineError::Playback(other.to_string()),
            })?;
        debug!("Playback sink open on '{}'", stream.device_name());

        Ok(PlaybackStream { stream, stats })
    }
}

/// A sink running on an output device. Dropping it stops playback.
pub struct PlaybackStream {
    stream: Box<dyn ActiveStream>,
    stats: Arc<PlaybackStats>,
}

impl PlaybackStream {
    pub fn device_name(&self) -> &str {
        self.stream.device_name()
    }

    pub fn stats(&self) -> &Arc<PlaybackStats> {
        &self.stats
    }
}

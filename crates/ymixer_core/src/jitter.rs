//! Bounded Jitter Buffer
//!
//! Absorbs the rate mismatch between the capture callback and the render
//! callback. The two halves live on different OS audio threads and share an
//! `rtrb` SPSC ring, so neither side ever blocks or allocates.
//!
//! Nominal capacity is a fixed duration of audio (50ms by default). The ring
//! itself is much larger (`STALL_HEADROOM` times the capacity on top of it),
//! so the writer never meets a full ring while the reader is running. The
//! reader discards whatever sits above the nominal capacity before each pull,
//! which makes overflow cost the OLDEST samples. Discards are rounded up to
//! whole frames to keep channels aligned.
//!
//! Only a reader that stops pulling for longer than the headroom lets the
//! ring fill. The writer cannot advance the consumer, so from then on it keeps
//! the newest frames that fit and drops the rest of each push.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};
use ymixer_dsp::SampleSource;

use crate::config::StreamConfig;

/// Extra ring space, in multiples of the nominal capacity
const STALL_HEADROOM: usize = 16;

/// Counters shared by both halves
#[derive(Debug, Default)]
pub struct JitterStats {
    dropped: AtomicU64,
}

impl JitterStats {
    /// Samples discarded because the buffer was full
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self, samples: usize) {
        self.dropped.fetch_add(samples as u64, Ordering::Relaxed);
    }
}

/// Constructor namespace for the writer/reader pair
pub struct BoundedJitterBuffer;

impl BoundedJitterBuffer {
    /// Create a buffer holding `capacity` interleaved samples
    ///
    /// The capacity is rounded up to a whole number of frames.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(capacity: usize, channels: u16) -> (JitterWriter, JitterReader) {
        Self::with_headroom(capacity, channels, STALL_HEADROOM)
    }

    /// Ring of `capacity * (1 + headroom)` samples behind a nominal `capacity`
    pub(crate) fn with_headroom(
        capacity: usize,
        channels: u16,
        headroom: usize,
    ) -> (JitterWriter, JitterReader) {
        let channels = channels.max(1) as usize;
        let capacity = round_up_to_frame(capacity.max(1), channels);
        let (producer, consumer) = RingBuffer::<f32>::new(capacity * (1 + headroom));
        let stats = Arc::new(JitterStats::default());

        (
            JitterWriter {
                producer,
                channels,
                stats: Arc::clone(&stats),
            },
            JitterReader {
                consumer,
                capacity,
                channels,
                stats,
            },
        )
    }

    /// Buffer sized for `ms` milliseconds of `config`'s format
    pub fn for_stream(config: &StreamConfig, ms: u32) -> (JitterWriter, JitterReader) {
        Self::new(config.samples_for_ms(ms), config.channels)
    }
}

fn round_up_to_frame(samples: usize, channels: usize) -> usize {
    (samples + channels - 1) / channels * channels
}

/// Capture-side half
pub struct JitterWriter {
    producer: Producer<f32>,
    channels: usize,
    stats: Arc<JitterStats>,
}

impl JitterWriter {
    /// Append samples, returning how many were stored
    ///
    /// Anything above the nominal capacity is trimmed by the reader on its
    /// next pull. Only when the ring itself is full (the reader has stalled)
    /// is the head of `samples` dropped here, keeping the newest tail. Never
    /// blocks.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        self.push_iter(samples.iter().copied())
    }

    /// Append converted samples without an intermediate buffer
    pub fn push_iter<I>(&mut self, samples: I) -> usize
    where
        I: IntoIterator<Item = f32>,
        I::IntoIter: ExactSizeIterator,
    {
        let mut samples = samples.into_iter();
        let incoming = samples.len();
        let free = self.producer.slots();

        let keep = if incoming <= free {
            incoming
        } else {
            free - free % self.channels
        };

        let skip = incoming - keep;
        if skip > 0 {
            self.stats.record_drop(skip);
            samples.by_ref().take(skip).for_each(drop);
        }
        if keep == 0 {
            return 0;
        }

        match self.producer.write_chunk_uninit(keep) {
            Ok(chunk) => chunk.fill_from_iter(samples),
            Err(_) => 0,
        }
    }

    pub fn stats(&self) -> &Arc<JitterStats> {
        &self.stats
    }
}

/// Render-side half
pub struct JitterReader {
    consumer: Consumer<f32>,
    capacity: usize,
    channels: usize,
    stats: Arc<JitterStats>,
}

impl JitterReader {
    /// Remove up to `out.len()` samples, oldest first
    ///
    /// Returns the number written to the front of `out`; 0 when empty.
    pub fn pull(&mut self, out: &mut [f32]) -> usize {
        self.discard_excess();

        let count = out.len().min(self.consumer.slots());
        if count == 0 {
            return 0;
        }

        match self.consumer.read_chunk(count) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                out[..first.len()].copy_from_slice(first);
                out[first.len()..count].copy_from_slice(second);
                chunk.commit_all();
                count
            }
            Err(_) => 0,
        }
    }

    // Drop the oldest samples above nominal capacity
    fn discard_excess(&mut self) {
        let available = self.consumer.slots();
        if available <= self.capacity {
            return;
        }

        let excess = round_up_to_frame(available - self.capacity, self.channels).min(available);
        if let Ok(chunk) = self.consumer.read_chunk(excess) {
            chunk.commit_all();
            self.stats.record_drop(excess);
        }
    }

    /// Nominal capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples currently queued (may briefly exceed capacity until the next pull)
    pub fn buffered(&self) -> usize {
        self.consumer.slots()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn stats(&self) -> &Arc<JitterStats> {
        &self.stats
    }
}

impl SampleSource for JitterReader {
    fn read(&mut self, buffer: &mut [f32]) -> usize {
        self.pull(buffer)
    }
}

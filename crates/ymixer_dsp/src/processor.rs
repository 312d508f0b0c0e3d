//! Pull-Based Sample Sources
//!
//! The playback path is a chain of sources, each pulling from the one before
//! it: jitter buffer → equalizer → playback sink.

use std::collections::VecDeque;

/// A producer of interleaved `f32` samples, pulled by the stage after it
///
/// # Real-time Safety Contract
///
/// Implementors used on the render path MUST follow these rules in `read()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - NO unbounded loops
///
/// Violating these rules causes audio dropouts ("glitches").
pub trait SampleSource: Send {
    /// Fill the front of `buffer` and return how many samples were written
    ///
    /// Returning fewer than `buffer.len()` (including zero) is not an error;
    /// the caller treats the remainder as silence.
    fn read(&mut self, buffer: &mut [f32]) -> usize;
}

// Handy for tests and offline processing. Draining never reallocates.
impl SampleSource for VecDeque<f32> {
    fn read(&mut self, buffer: &mut [f32]) -> usize {
        let count = buffer.len().min(self.len());
        for (slot, sample) in buffer.iter_mut().zip(self.drain(..count)) {
            *slot = sample;
        }
        count
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read(&mut self, buffer: &mut [f32]) -> usize {
        (**self).read(buffer)
    }
}

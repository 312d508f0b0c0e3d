//! Live Equalizer Parameters
//!
//! Shared between the control thread (slider changes, preset loads) and the
//! render thread. Every field is an independent atomic, so the render thread
//! never blocks on the control thread.
//!
//! Rust pattern: AtomicF32 doesn't exist, so floats are stored as `u32` bits.
//!
//! A band update is two writes: the gain/frequency, then a bump of the band's
//! generation counter (Release). The render thread checks generations once per
//! buffer (Acquire) and rebuilds only the bands that changed. A reader racing a
//! writer sees at worst one stale buffer for that band.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::eq::{clamp_gain_db, BAND_COUNT, EQ_BANDS};

/// Upper bound of the volume boost scalar (300%)
pub const MAX_VOLUME_BOOST: f32 = 3.0;

/// Clamp a volume boost to [0, 3]. NaN collapses to unity.
#[inline]
pub fn clamp_volume_boost(boost: f32) -> f32 {
    if boost.is_nan() {
        1.0
    } else {
        boost.clamp(0.0, MAX_VOLUME_BOOST)
    }
}

/// Lock-free equalizer state written by the UI and read by the audio callback
pub struct EqParams {
    gain_bits: [AtomicU32; BAND_COUNT],
    frequency_bits: [AtomicU32; BAND_COUNT],
    generation: [AtomicU32; BAND_COUNT],
    volume_boost_bits: AtomicU32,
}

impl EqParams {
    /// Neutral parameters: every band at 0dB, volume boost 1.0
    pub fn new() -> Self {
        Self {
            gain_bits: core::array::from_fn(|_| AtomicU32::new(0.0_f32.to_bits())),
            frequency_bits: core::array::from_fn(|i| AtomicU32::new(EQ_BANDS[i].to_bits())),
            generation: core::array::from_fn(|_| AtomicU32::new(0)),
            volume_boost_bits: AtomicU32::new(1.0_f32.to_bits()),
        }
    }

    /// Request a band update
    ///
    /// The filter is rebuilt by the render thread at the start of its next
    /// buffer, even if the gain did not change. Out-of-range indices are
    /// ignored.
    pub fn update_band(&self, index: usize, frequency: f32, gain_db: f32) {
        if index >= BAND_COUNT {
            return;
        }
        self.frequency_bits[index].store(frequency.to_bits(), Ordering::Relaxed);
        self.gain_bits[index].store(clamp_gain_db(gain_db).to_bits(), Ordering::Relaxed);
        self.generation[index].fetch_add(1, Ordering::Release);
    }

    pub fn set_volume_boost(&self, boost: f32) {
        self.volume_boost_bits
            .store(clamp_volume_boost(boost).to_bits(), Ordering::Relaxed);
    }

    pub fn volume_boost(&self) -> f32 {
        f32::from_bits(self.volume_boost_bits.load(Ordering::Relaxed))
    }

    /// Current gain of a band (0.0 for out-of-range indices)
    pub fn band_gain(&self, index: usize) -> f32 {
        self.gain_bits
            .get(index)
            .map_or(0.0, |g| f32::from_bits(g.load(Ordering::Relaxed)))
    }

    /// Snapshot of all band gains (for UI sync)
    pub fn gains(&self) -> [f32; BAND_COUNT] {
        core::array::from_fn(|i| self.band_gain(i))
    }

    /// Generation counter of a band, bumped on every update
    #[inline]
    pub fn generation(&self, index: usize) -> u32 {
        self.generation[index].load(Ordering::Acquire)
    }

    /// (frequency, gain_db) of a band
    #[inline]
    pub fn band(&self, index: usize) -> (f32, f32) {
        (
            f32::from_bits(self.frequency_bits[index].load(Ordering::Relaxed)),
            f32::from_bits(self.gain_bits[index].load(Ordering::Relaxed)),
        )
    }
}

impl Default for EqParams {
    fn default() -> Self {
        Self::new()
    }
}

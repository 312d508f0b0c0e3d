//! 10-Band Peaking Equalizer
//!
//! Implements a cascade of BiQuad peaking filters for audio equalization.
//! Based on the RBJ (Robert Bristow-Johnson) Audio EQ Cookbook.
//!
//! A band whose gain is within [`ACTIVE_THRESHOLD_DB`] of 0dB has no filter at
//! all: it is skipped in the cascade instead of being run as a 0dB filter.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, Hertz, Type};

use crate::error::DspError;

/// Number of EQ bands
pub const BAND_COUNT: usize = 10;

/// Band centre frequencies (Hz), one octave apart
pub const EQ_BANDS: [f32; BAND_COUNT] = [
    32.0,    // Sub-bass
    64.0,    // Bass
    125.0,   // Low-mid
    250.0,   // Mid
    500.0,   // Mid
    1000.0,  // Upper-mid
    2000.0,  // Presence
    4000.0,  // Brilliance
    8000.0,  // High
    16000.0, // Air
];

/// Fixed Q shared by every band
pub const BAND_Q: f32 = 1.0;

/// Lowest gain a band accepts (dB)
pub const MIN_GAIN_DB: f32 = -24.0;

/// Highest gain a band accepts (dB)
pub const MAX_GAIN_DB: f32 = 24.0;

/// Gains at or below this magnitude deactivate the band
pub const ACTIVE_THRESHOLD_DB: f32 = 0.01;

/// Clamp a gain to the band range. NaN collapses to 0dB.
#[inline]
pub fn clamp_gain_db(gain_db: f32) -> f32 {
    if gain_db.is_nan() {
        0.0
    } else {
        gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
    }
}

/// Coefficients of a filter that passes its input through unchanged
pub fn unity_coefficients() -> Coefficients<f32> {
    Coefficients {
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    }
}

/// Single EQ band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub index: usize,
    pub frequency: f32,
    pub q: f32,
    pub gain_db: f32,
}

impl Band {
    /// Neutral band at the standard centre frequency for `index`
    ///
    /// Returns `None` if `index >= BAND_COUNT`.
    pub fn new(index: usize) -> Option<Self> {
        EQ_BANDS.get(index).map(|&frequency| Self::neutral(index, frequency))
    }

    fn neutral(index: usize, frequency: f32) -> Self {
        Self {
            index,
            frequency,
            q: BAND_Q,
            gain_db: 0.0,
        }
    }

    /// Whether this band contributes a filter to the cascade
    pub fn is_active(&self) -> bool {
        self.gain_db.abs() > ACTIVE_THRESHOLD_DB
    }

    /// Design peaking coefficients for this band at `sample_rate`
    pub fn coefficients(&self, sample_rate: f32) -> Result<Coefficients<f32>, DspError> {
        let invalid = || DspError::InvalidCoefficients {
            frequency: self.frequency,
            sample_rate,
        };

        if !sample_rate.is_finite() || !self.frequency.is_finite() {
            return Err(invalid());
        }

        let fs = Hertz::<f32>::from_hz(sample_rate).map_err(|_| invalid())?;
        let f0 = Hertz::<f32>::from_hz(self.frequency).map_err(|_| invalid())?;

        let coeffs = Coefficients::<f32>::from_params(Type::PeakingEQ(self.gain_db), fs, f0, self.q)
            .map_err(|_| invalid())?;

        let finite = [coeffs.a1, coeffs.a2, coeffs.b0, coeffs.b1, coeffs.b2]
            .iter()
            .all(|c| c.is_finite());
        if !finite {
            return Err(invalid());
        }

        Ok(coeffs)
    }
}

/// The cascade of ten peaking filters
///
/// Each band owns its own filter history; nothing is shared between bands.
/// One bank processes every sample slot of an interleaved stream, so all
/// channels run through the same filter history.
pub struct FilterBank {
    bands: [Band; BAND_COUNT],
    // None = band inactive (passthrough)
    filters: [Option<DirectForm2Transposed<f32>>; BAND_COUNT],
    sample_rate: f32,
}

impl FilterBank {
    /// Create a bank with every band inactive
    pub fn new(sample_rate: f32) -> Self {
        Self {
            bands: core::array::from_fn(|i| Band::neutral(i, EQ_BANDS[i])),
            filters: core::array::from_fn(|_| None),
            sample_rate,
        }
    }

    /// Set a band's gain and rebuild (or drop) its filter
    ///
    /// Rebuilding discards the band's filter history, so a gain change is
    /// audible as a short transient. Out-of-range indices are ignored.
    pub fn update_band(&mut self, index: usize, frequency: f32, gain_db: f32) {
        if index >= BAND_COUNT {
            return;
        }

        let band = &mut self.bands[index];
        band.frequency = frequency;
        band.gain_db = clamp_gain_db(gain_db);

        self.filters[index] = if band.is_active() {
            let coeffs = band
                .coefficients(self.sample_rate)
                .unwrap_or_else(|_| unity_coefficients());
            Some(DirectForm2Transposed::<f32>::new(coeffs))
        } else {
            None
        };
    }

    /// Run one sample through every active band, lowest frequency first
    ///
    /// A band whose output overflows is reset and passes that sample through
    /// unchanged, so an inf or NaN never stays in a filter's history.
    ///
    /// # Real-time Safety
    /// No allocations, no syscalls, O(1).
    #[inline]
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        let mut x = sample;
        for filter in self.filters.iter_mut().flatten() {
            let y = filter.run(x);
            if y.is_finite() {
                x = y;
            } else {
                filter.reset_state();
            }
        }
        x
    }

    /// Get a band's current state
    pub fn band(&self, index: usize) -> Option<&Band> {
        self.bands.get(index)
    }

    /// Whether the band at `index` currently has a filter
    pub fn is_active(&self, index: usize) -> bool {
        self.filters.get(index).map_or(false, Option::is_some)
    }

    /// Number of bands with a filter
    pub fn active_count(&self) -> usize {
        self.filters.iter().filter(|f| f.is_some()).count()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Clear the delay lines of every active filter
    pub fn reset(&mut self) {
        for filter in self.filters.iter_mut().flatten() {
            filter.reset_state();
        }
    }
}

//! Equalizer Configuration
//!
//! The user-facing EQ state: ten base gains, a volume boost and a bass boost.
//! Base gains are never modified by the boosts; the effective per-band gain
//! is derived on demand and pushed into [`EqParams`].

use crate::eq::{clamp_gain_db, BAND_COUNT, EQ_BANDS, MAX_GAIN_DB};
use crate::error::DspError;
use crate::params::{clamp_volume_boost, EqParams};

pub use crate::params::MAX_VOLUME_BOOST;

/// Upper bound of the bass boost, in dB
pub const MAX_BASS_BOOST_DB: f32 = MAX_GAIN_DB;

/// Bands 0..BASS_BOOST_BANDS receive the bass boost (32, 64 and 125 Hz)
pub const BASS_BOOST_BANDS: usize = 3;

/// Volume boost range as exposed to the UI, in percent
pub const MAX_VOLUME_BOOST_PERCENT: i32 = 300;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualizerConfig {
    gains: [f32; BAND_COUNT],
    volume_boost: f32,
    bass_boost: f32,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            gains: [0.0; BAND_COUNT],
            volume_boost: 1.0,
            bass_boost: 0.0,
        }
    }
}

impl EqualizerConfig {
    /// Set the base gain for a band (0-9), clamped to [-24, 24]
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Result<(), DspError> {
        let slot = self
            .gains
            .get_mut(index)
            .ok_or(DspError::InvalidBandIndex(index))?;
        *slot = clamp_gain_db(gain_db);
        Ok(())
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.gains.get(index).copied()
    }

    pub fn gains(&self) -> [f32; BAND_COUNT] {
        self.gains
    }

    /// Replace every base gain (each clamped)
    pub fn set_gains(&mut self, gains: [f32; BAND_COUNT]) {
        self.gains = gains.map(clamp_gain_db);
    }

    pub fn volume_boost(&self) -> f32 {
        self.volume_boost
    }

    /// Linear volume scalar, clamped to [0, 3]
    pub fn set_volume_boost(&mut self, boost: f32) {
        self.volume_boost = clamp_volume_boost(boost);
    }

    /// Volume boost from the UI percentage (0-300)
    pub fn set_volume_boost_percent(&mut self, percent: i32) {
        let percent = percent.clamp(0, MAX_VOLUME_BOOST_PERCENT);
        self.volume_boost = percent as f32 / 100.0;
    }

    pub fn volume_boost_percent(&self) -> i32 {
        (self.volume_boost * 100.0).round() as i32
    }

    pub fn bass_boost(&self) -> f32 {
        self.bass_boost
    }

    /// Bass boost in dB, clamped to [0, 24]. NaN collapses to 0.
    pub fn set_bass_boost(&mut self, boost_db: f32) {
        self.bass_boost = if boost_db.is_nan() {
            0.0
        } else {
            boost_db.clamp(0.0, MAX_BASS_BOOST_DB)
        };
    }

    /// Gain actually sent to the filter for `index`
    ///
    /// Bands 0-2 get the bass boost added and the sum re-clamped. Returns 0.0
    /// for out-of-range indices.
    pub fn effective_gain(&self, index: usize) -> f32 {
        match self.gains.get(index) {
            Some(&g) if index < BASS_BOOST_BANDS => clamp_gain_db(g + self.bass_boost),
            Some(&g) => g,
            None => 0.0,
        }
    }

    pub fn effective_gains(&self) -> [f32; BAND_COUNT] {
        core::array::from_fn(|i| self.effective_gain(i))
    }

    /// Push one band's effective gain to the live parameters
    pub fn apply_band(&self, index: usize, params: &EqParams) {
        if index < BAND_COUNT {
            params.update_band(index, EQ_BANDS[index], self.effective_gain(index));
        }
    }

    /// Push the whole configuration to the live parameters
    ///
    /// Every band is rebuilt, so all filter histories restart.
    pub fn apply(&self, params: &EqParams) {
        for index in 0..BAND_COUNT {
            self.apply_band(index, params);
        }
        params.set_volume_boost(self.volume_boost);
    }

    /// Flat gains, unity volume, no bass boost
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_neutral() {
        let config = EqualizerConfig::default();
        assert!(config.is_neutral());
        assert_eq!(config.volume_boost_percent(), 100);
        assert_eq!(config.effective_gains(), [0.0; BAND_COUNT]);
    }

    #[test]
    fn test_set_band_gain() {
        let mut config = EqualizerConfig::default();
        config.set_band_gain(4, 6.0).unwrap();
        assert_eq!(config.band_gain(4), Some(6.0));

        config.set_band_gain(4, 50.0).unwrap();
        assert_eq!(config.band_gain(4), Some(24.0));

        config.set_band_gain(4, -50.0).unwrap();
        assert_eq!(config.band_gain(4), Some(-24.0));
    }

    #[test]
    fn test_invalid_band_index() {
        let mut config = EqualizerConfig::default();
        assert_eq!(
            config.set_band_gain(10, 3.0),
            Err(DspError::InvalidBandIndex(10))
        );
        assert_eq!(config.band_gain(10), None);
    }

    #[test]
    fn test_bass_boost_only_low_bands() {
        let mut config = EqualizerConfig::default();
        config.set_gains([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        config.set_bass_boost(6.0);

        let effective = config.effective_gains();
        assert_eq!(&effective[..3], &[7.0, 8.0, 9.0]);
        assert_eq!(&effective[3..], &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);

        // Base gains untouched
        assert_eq!(config.gains()[0], 1.0);
    }

    #[test]
    fn test_bass_boost_reclamped() {
        let mut config = EqualizerConfig::default();
        config.set_gains([20.0; BAND_COUNT]);
        config.set_bass_boost(24.0);

        assert_eq!(config.effective_gain(0), 24.0);
        assert_eq!(config.effective_gain(2), 24.0);
        assert_eq!(config.effective_gain(3), 20.0);

        config.set_gains([-24.0; BAND_COUNT]);
        assert_eq!(config.effective_gain(1), 0.0);
    }

    #[test]
    fn test_bass_boost_clamped() {
        let mut config = EqualizerConfig::default();
        config.set_bass_boost(30.0);
        assert_eq!(config.bass_boost(), 24.0);
        config.set_bass_boost(-3.0);
        assert_eq!(config.bass_boost(), 0.0);
    }

    #[test]
    fn test_volume_boost_percent() {
        let mut config = EqualizerConfig::default();

        config.set_volume_boost_percent(250);
        assert!((config.volume_boost() - 2.5).abs() < 1e-6);
        assert_eq!(config.volume_boost_percent(), 250);

        config.set_volume_boost_percent(900);
        assert_eq!(config.volume_boost(), 3.0);

        config.set_volume_boost_percent(-10);
        assert_eq!(config.volume_boost(), 0.0);
    }

    #[test]
    fn test_apply_pushes_effective_gains() {
        let params = EqParams::new();
        let mut config = EqualizerConfig::default();
        config.set_band_gain(0, 3.0).unwrap();
        config.set_band_gain(9, -6.0).unwrap();
        config.set_bass_boost(2.0);
        config.set_volume_boost(0.5);

        config.apply(&params);

        assert_eq!(params.band_gain(0), 5.0);
        assert_eq!(params.band_gain(1), 2.0);
        assert_eq!(params.band_gain(3), 0.0);
        assert_eq!(params.band_gain(9), -6.0);
        assert_eq!(params.volume_boost(), 0.5);
        for i in 0..BAND_COUNT {
            assert_eq!(params.generation(i), 1);
        }
    }

    #[test]
    fn test_apply_band_touches_one_band() {
        let params = EqParams::new();
        let mut config = EqualizerConfig::default();
        config.set_band_gain(5, 4.0).unwrap();

        config.apply_band(5, &params);
        config.apply_band(42, &params);

        assert_eq!(params.generation(5), 1);
        assert_eq!(params.generation(4), 0);
        assert_eq!(params.band_gain(5), 4.0);
    }
}

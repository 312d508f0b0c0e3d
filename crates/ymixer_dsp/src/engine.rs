//! Equalizer Engine
//!
//! Pulls samples from an upstream [`SampleSource`] and transforms them in
//! place: EQ cascade → volume boost → pre-amp → soft clip → hard clamp.
//!
//! Parameters live in a shared [`EqParams`]. At the start of every buffer the
//! engine compares each band's generation counter with the last one it saw
//! and rebuilds only the filters that changed.

use std::sync::Arc;

use crate::eq::{FilterBank, BAND_COUNT};
use crate::limiter::output_stage;
use crate::params::EqParams;
use crate::processor::SampleSource;

pub struct EqualizerEngine<S> {
    source: S,
    bank: FilterBank,
    params: Arc<EqParams>,
    // Last generation applied per band. None forces a rebuild on first use.
    seen: [Option<u32>; BAND_COUNT],
}

impl<S: SampleSource> EqualizerEngine<S> {
    /// Wrap `source`, designing filters for `sample_rate`
    ///
    /// The current contents of `params` are applied on the first buffer, so a
    /// rebuilt pipeline picks up whatever the user last set.
    pub fn new(source: S, sample_rate: f32, params: Arc<EqParams>) -> Self {
        Self {
            source,
            bank: FilterBank::new(sample_rate),
            params,
            seen: [None; BAND_COUNT],
        }
    }

    /// Rebuild filters whose parameters changed since the last buffer
    ///
    /// # Real-time Safety
    /// Atomic loads only; a rebuild is a coefficient computation, no allocation.
    pub fn sync_params(&mut self) {
        for (index, seen) in self.seen.iter_mut().enumerate() {
            let generation = self.params.generation(index);
            if *seen != Some(generation) {
                let (frequency, gain_db) = self.params.band(index);
                self.bank.update_band(index, frequency, gain_db);
                *seen = Some(generation);
            }
        }
    }

    /// Transform `buffer` in place
    ///
    /// Every element goes through the same filter bank, whatever channel slot
    /// it occupies.
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.sync_params();
        let volume_boost = self.params.volume_boost();

        for sample in buffer.iter_mut() {
            *sample = output_stage(self.bank.process_sample(*sample), volume_boost);
        }
    }

    pub fn bank(&self) -> &FilterBank {
        &self.bank
    }

    pub fn params(&self) -> &Arc<EqParams> {
        &self.params
    }

    pub fn sample_rate(&self) -> f32 {
        self.bank.sample_rate()
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: SampleSource> SampleSource for EqualizerEngine<S> {
    fn read(&mut self, buffer: &mut [f32]) -> usize {
        let produced = self.source.read(buffer);
        self.process(&mut buffer[..produced]);
        produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EqualizerConfig;
    use crate::eq::EQ_BANDS;
    use std::collections::VecDeque;

    const RATE: f32 = 44100.0;

    fn engine_with(samples: Vec<f32>) -> (EqualizerEngine<VecDeque<f32>>, Arc<EqParams>) {
        let params = Arc::new(EqParams::new());
        let engine = EqualizerEngine::new(VecDeque::from(samples), RATE, Arc::clone(&params));
        (engine, params)
    }

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.25 * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE).sin())
            .collect()
    }

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_reference_scenario() {
        let (mut engine, _params) = engine_with(vec![0.5, -0.5, 1.0, -1.0]);
        let mut out = [0.0_f32; 4];

        assert_eq!(engine.read(&mut out), 4);

        let expected = [0.6, -0.6, 1.0, -1.0];
        for (got, want) in out.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {}, want {}", got, want);
        }
        assert_eq!(engine.bank().active_count(), 0);
    }

    #[test]
    fn test_short_read_leaves_tail() {
        let (mut engine, _params) = engine_with(vec![0.5, 0.5]);
        let mut out = [7.0_f32; 4];

        assert_eq!(engine.read(&mut out), 2);
        assert_eq!(&out[2..], &[7.0, 7.0], "tail belongs to the caller");
    }

    #[test]
    fn test_zero_volume_is_exact_silence() {
        let (mut engine, params) = engine_with(sine(1000.0, 512));
        let mut config = EqualizerConfig::default();
        config.set_gains([12.0; BAND_COUNT]);
        config.set_volume_boost(0.0);
        config.apply(&params);

        let mut out = vec![1.0_f32; 512];
        engine.read(&mut out);

        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_output_bounded_with_extreme_settings() {
        let mut input = sine(60.0, 2048);
        input.extend([50.0, -50.0, 1e20, -1e20]);
        // Overflows every active band; the signal after it must survive
        input.extend([f32::MAX, 0.1, 0.1, 0.1]);
        input.extend(sine(60.0, 512));
        let len = input.len();
        let (mut engine, params) = engine_with(input);

        let mut config = EqualizerConfig::default();
        config.set_gains([24.0; BAND_COUNT]);
        config.set_bass_boost(24.0);
        config.set_volume_boost(3.0);
        config.apply(&params);

        let mut out = vec![0.0_f32; len];
        engine.read(&mut out);

        for s in &out {
            assert!(s.is_finite() && s.abs() <= 1.0, "sample {} out of bounds", s);
        }
        assert!(peak(&out[len - 512..]) > 0.5, "bands stuck after overflow");
    }

    #[test]
    fn test_bass_boost_lifts_low_end_only() {
        let low = sine(64.0, 8820);
        let high = sine(4000.0, 8820);

        let run = |input: &[f32], bass: f32| {
            let (mut engine, params) = engine_with(input.to_vec());
            let mut config = EqualizerConfig::default();
            // Keep the signal well under the limiter
            config.set_volume_boost(0.25);
            config.set_bass_boost(bass);
            config.apply(&params);
            let mut out = vec![0.0_f32; input.len()];
            engine.read(&mut out);
            peak(&out[4410..])
        };

        assert!(run(&low, 12.0) > run(&low, 0.0) * 2.0);
        assert!((run(&high, 12.0) - run(&high, 0.0)).abs() < 0.01);
    }

    #[test]
    fn test_params_picked_up_on_next_buffer() {
        let (mut engine, params) = engine_with(vec![0.1; 64]);
        let mut out = [0.0_f32; 32];
        engine.read(&mut out);
        assert_eq!(engine.bank().active_count(), 0);

        // Another thread's view of the same parameters
        let ui = Arc::clone(&params);
        ui.update_band(5, EQ_BANDS[5], 6.0);
        ui.set_volume_boost(2.0);

        engine.read(&mut out);
        assert!(engine.bank().is_active(5));
        assert_eq!(engine.bank().active_count(), 1);
        assert_eq!(engine.params().volume_boost(), 2.0);

        ui.update_band(5, EQ_BANDS[5], 0.0);
        engine.read(&mut out);
        assert_eq!(engine.bank().active_count(), 0);
    }

    #[test]
    fn test_existing_params_applied_on_construction() {
        let params = Arc::new(EqParams::new());
        params.update_band(2, EQ_BANDS[2], -8.0);

        let mut engine = EqualizerEngine::new(VecDeque::from(vec![0.0; 8]), 48000.0, params);
        engine.read(&mut [0.0_f32; 8]);

        assert!(engine.bank().is_active(2));
        assert_eq!(engine.sample_rate(), 48000.0);
    }

    #[test]
    fn test_updates_from_another_thread() {
        use std::thread;

        let (mut engine, params) = engine_with(Vec::new());
        let writer = thread::spawn(move || {
            for i in 0..1000 {
                params.update_band(i % BAND_COUNT, EQ_BANDS[i % BAND_COUNT], (i % 25) as f32);
                params.set_volume_boost(3.0);
            }
        });

        let mut buffer = sine(440.0, 256);
        for _ in 0..200 {
            engine.source_mut().extend(buffer.iter().copied());
            engine.read(&mut buffer);
            assert!(buffer.iter().all(|s| s.abs() <= 1.0));
        }
        writer.join().unwrap();
    }
}

//! Output Stage: Pre-Amp and Limiter
//!
//! After the EQ cascade every sample is scaled by the volume boost and a fixed
//! pre-amp, then bounded twice:
//!
//! 1. soft clip: `sign(x) * min(1, |x|)`
//! 2. hard clamp to [-1, 1]
//!
//! The hard clamp can never change a finite value that left the soft clip.
//! Both stages are kept; together they define the exact output curve.
//! Infinities saturate like any other large value. NaN becomes silence.

/// Fixed gain applied after the volume boost
pub const PRE_AMP: f32 = 1.2;

/// Saturate magnitude at 1.0 while preserving sign
#[inline]
pub fn soft_clip(sample: f32) -> f32 {
    sample.signum() * sample.abs().min(1.0)
}

/// Bound a sample to [-1, 1]
#[inline]
pub fn hard_clamp(sample: f32) -> f32 {
    sample.clamp(-1.0, 1.0)
}

/// Full output stage for one sample
///
/// # Real-time Safety
/// No allocations, no syscalls, O(1) time.
#[inline]
pub fn output_stage(sample: f32, volume_boost: f32) -> f32 {
    let boosted = sample * volume_boost * PRE_AMP;
    if boosted.is_nan() {
        return 0.0;
    }
    hard_clamp(soft_clip(boosted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_clip_passes_in_range() {
        for x in [0.0, 0.3, -0.3, 0.999, -0.999, 1.0, -1.0] {
            assert_eq!(soft_clip(x), x);
        }
    }

    #[test]
    fn test_soft_clip_saturates_and_preserves_sign() {
        assert_eq!(soft_clip(1.5), 1.0);
        assert_eq!(soft_clip(-1.5), -1.0);
        assert_eq!(soft_clip(1000.0), 1.0);
        assert_eq!(soft_clip(-1000.0), -1.0);
    }

    #[test]
    fn test_hard_clamp() {
        assert_eq!(hard_clamp(2.0), 1.0);
        assert_eq!(hard_clamp(-2.0), -1.0);
        assert_eq!(hard_clamp(0.25), 0.25);
    }

    #[test]
    fn test_output_stage_reference_values() {
        // 1.2 * 0.5 = 0.6 stays, 1.2 * 1.0 clips to 1.0
        let out: Vec<f32> = [0.5, -0.5, 1.0, -1.0]
            .iter()
            .map(|&x| output_stage(x, 1.0))
            .collect();

        assert!((out[0] - 0.6).abs() < 1e-6);
        assert!((out[1] + 0.6).abs() < 1e-6);
        assert_eq!(out[2], 1.0);
        assert_eq!(out[3], -1.0);
    }

    #[test]
    fn test_zero_volume_is_silence() {
        for x in [0.0, 0.5, -0.9, 3.0, -100.0] {
            assert_eq!(output_stage(x, 0.0), 0.0);
        }
    }

    #[test]
    fn test_non_finite_input() {
        assert_eq!(output_stage(f32::NAN, 1.0), 0.0);
        assert_eq!(output_stage(f32::INFINITY, 2.0), 1.0);
        assert_eq!(output_stage(f32::NEG_INFINITY, 2.0), -1.0);
        // inf * 0 is NaN
        assert_eq!(output_stage(f32::INFINITY, 0.0), 0.0);
        assert_eq!(output_stage(f32::MAX, 3.0), 1.0);
    }

    #[test]
    fn test_never_exceeds_one() {
        for boost in [0.0, 0.5, 1.0, 2.0, 3.0] {
            for x in [10.0, 100.0, 1e30, -10.0, -1e30, 0.9, -0.9] {
                let y = output_stage(x, boost);
                assert!(y.abs() <= 1.0, "{} * {} gave {}", x, boost, y);
            }
        }
    }
}

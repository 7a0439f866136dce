//! Channel selection and resampling utilities.
//!
//! The matcher compares MFCC patterns extracted from **8 kHz mono** audio
//! on the signed 16-bit scale.  This module provides the conversion steps:
//!
//! 1. [`select_channel`] — pick one channel out of interleaved audio.  Call
//!    recordings carry the far end on the left channel, so channel 0 is the
//!    default.
//! 2. [`resample`] — resample from any source rate to the target rate.
//! 3. [`to_i16_scale`] — map `[-1.0, 1.0]` floats onto the 16-bit range.

// ---------------------------------------------------------------------------
// select_channel
// ---------------------------------------------------------------------------

/// Extract `channel` from interleaved `samples` with `channels` channels.
///
/// * If `channels == 1` the input is returned as an owned `Vec`.
/// * If `channels == 0` or `channel >= channels` an empty vector is returned.
///
/// # Example
///
/// ```rust
/// use televoice::audio::select_channel;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, -0.2]; // L R L R
/// assert_eq!(select_channel(&stereo, 2, 0), vec![0.5, 0.2]);
/// assert_eq!(select_channel(&stereo, 2, 1), vec![-0.5, -0.2]);
/// ```
pub fn select_channel(samples: &[f32], channels: usize, channel: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        _ if channel >= channels => Vec::new(),
        1 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .map(|frame| frame[channel])
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample `samples` from `source_rate` Hz to `target_rate` Hz using linear
/// interpolation.
///
/// * If the rates match the input is cloned and returned unchanged.
/// * If `samples` is empty or either rate is zero an empty vector is
///   returned.
///
/// The output length is `ceil(samples.len() * target_rate / source_rate)`.
///
/// # Example
///
/// ```rust
/// use televoice::audio::resample;
///
/// // Downsample from 44.1 kHz to 8 kHz
/// let hi = vec![0.5_f32; 441];
/// let lo = resample(&hi, 44_100, 8_000);
/// assert_eq!(lo.len(), 80);
/// ```
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate {
        return samples.to_vec();
    }

    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac as f32) + samples[idx + 1] * frac as f32
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// to_i16_scale
// ---------------------------------------------------------------------------

/// Map normalised `[-1.0, 1.0]` samples onto `[-32768.0, 32767.0]`,
/// clamping anything outside that range.
pub fn to_i16_scale(samples: &mut [f32]) {
    for s in samples.iter_mut() {
        *s = (*s * 32_768.0).clamp(i16::MIN as f32, i16::MAX as f32);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Mel-frequency cepstral coefficients.
//!
//! ## Algorithm
//!
//! 1. Pre-emphasis `y[n] = x[n] − 0.97·x[n−1]`.
//! 2. Split into 25 ms frames every 10 ms (rectangular window); the last
//!    frame is zero-padded.
//! 3. Power spectrum `|FFT|² / nfft` over `nfft` points.
//! 4. 26 triangular mel filters between `low_freq` and `high_freq`;
//!    natural log of each filter energy (zero energies become `f64::EPSILON`).
//! 5. Orthonormal DCT-II, keep the first 13 coefficients.
//! 6. Sinusoidal cepstral lifter with `L = 22`.
//!
//! Coefficient 0 is kept as is (it is *not* replaced by the frame log
//! energy).

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use super::extractor::{ExtractError, FeatureExtractor};
use super::sequence::FeatureSequence;
use crate::audio::PcmSignal;

// ---------------------------------------------------------------------------
// MfccParams
// ---------------------------------------------------------------------------

/// All parameters of the MFCC front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MfccParams {
    /// Analysis window length in seconds.
    pub win_len_secs: f64,
    /// Step between successive windows in seconds.
    pub win_step_secs: f64,
    /// Number of cepstral coefficients kept per frame.
    pub num_cep: usize,
    /// Number of mel filters.
    pub num_filters: usize,
    /// FFT size; `None` picks the next power of two ≥ the frame length.
    pub nfft: Option<usize>,
    /// Lowest filter edge in Hz.
    pub low_freq: f64,
    /// Highest filter edge in Hz; `None` means Nyquist.
    pub high_freq: Option<f64>,
    /// Pre-emphasis coefficient; `0.0` disables the filter.
    pub pre_emphasis: f64,
    /// Lifter parameter; `0` disables liftering.
    pub cep_lifter: usize,
}

impl Default for MfccParams {
    fn default() -> Self {
        Self {
            win_len_secs: 0.025,
            win_step_secs: 0.01,
            num_cep: 13,
            num_filters: 26,
            nfft: None,
            low_freq: 0.0,
            high_freq: None,
            pre_emphasis: 0.97,
            cep_lifter: 22,
        }
    }
}

// ---------------------------------------------------------------------------
// MfccExtractor
// ---------------------------------------------------------------------------

/// Production [`FeatureExtractor`] producing `num_cep`-dimension frames.
///
/// ```
/// use televoice::audio::PcmSignal;
/// use televoice::features::{FeatureExtractor, MfccExtractor};
///
/// let tone: Vec<f32> = (0..8_000)
///     .map(|i| (i as f32 * 0.3).sin() * 8_000.0)
///     .collect();
/// let seq = MfccExtractor::default()
///     .extract(&PcmSignal::new(8_000, tone))
///     .unwrap();
/// assert_eq!(seq.dim(), 13);
/// assert_eq!(seq.len(), 99);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MfccExtractor {
    params: MfccParams,
}

impl MfccExtractor {
    pub fn new(params: MfccParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MfccParams {
        &self.params
    }
}

impl FeatureExtractor for MfccExtractor {
    fn extract(&self, signal: &PcmSignal) -> Result<FeatureSequence, ExtractError> {
        let p = &self.params;

        if signal.samples.is_empty() {
            return Err(ExtractError::EmptySignal);
        }
        if signal.sample_rate == 0 {
            return Err(ExtractError::InvalidParams("sample rate is 0".into()));
        }
        if p.num_cep == 0 || p.num_cep > p.num_filters {
            return Err(ExtractError::InvalidParams(format!(
                "num_cep must be in 1..={} (got {})",
                p.num_filters, p.num_cep
            )));
        }

        let rate = signal.sample_rate as f64;
        let frame_len = round_half_up(p.win_len_secs * rate);
        let frame_step = round_half_up(p.win_step_secs * rate);
        if frame_len == 0 || frame_step == 0 {
            return Err(ExtractError::InvalidParams(format!(
                "window {frame_len} / step {frame_step} samples at {rate} Hz"
            )));
        }

        let nfft = p.nfft.unwrap_or_else(|| frame_len.next_power_of_two());
        if nfft < 2 {
            return Err(ExtractError::InvalidParams(format!("nfft {nfft} is too small")));
        }
        let high_freq = p.high_freq.unwrap_or(rate / 2.0);
        if high_freq > rate / 2.0 || p.low_freq < 0.0 || p.low_freq >= high_freq {
            return Err(ExtractError::InvalidParams(format!(
                "filter range {}..{} Hz is outside 0..{} Hz",
                p.low_freq,
                high_freq,
                rate / 2.0
            )));
        }

        // ── Pre-emphasis + framing ────────────────────────────────────────
        let emphasized = pre_emphasize(&signal.samples, p.pre_emphasis);
        let num_frames = frame_count(emphasized.len(), frame_len, frame_step);
        let mut padded = emphasized;
        padded.resize((num_frames - 1) * frame_step + frame_len, 0.0);

        // ── Static tables ─────────────────────────────────────────────────
        let bank = mel_filterbank(p.num_filters, nfft, rate, p.low_freq, high_freq);
        let dct = dct_matrix(p.num_filters, p.num_cep);
        let lift = lifter(p.num_cep, p.cep_lifter);

        let fft = FftPlanner::<f64>::new().plan_fft_forward(nfft);
        let mut spectrum: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); nfft];
        let mut power = vec![0.0_f64; nfft / 2 + 1];
        let mut log_energies = vec![0.0_f64; p.num_filters];
        let mut data = Vec::with_capacity(num_frames * p.num_cep);

        // Frames longer than nfft are truncated to nfft samples.
        let used = frame_len.min(nfft);

        for f in 0..num_frames {
            let frame = &padded[f * frame_step..f * frame_step + used];
            for (slot, &x) in spectrum.iter_mut().zip(frame) {
                *slot = Complex::new(x, 0.0);
            }
            for slot in spectrum.iter_mut().skip(used) {
                *slot = Complex::new(0.0, 0.0);
            }
            fft.process(&mut spectrum);

            for (pw, c) in power.iter_mut().zip(&spectrum) {
                *pw = c.norm_sqr() / nfft as f64;
            }

            for (energy, filter) in log_energies.iter_mut().zip(&bank) {
                let e: f64 = filter.iter().zip(&power).map(|(w, pw)| w * pw).sum();
                let e = if e == 0.0 { f64::EPSILON } else { e };
                *energy = e.ln();
            }

            for (row, l) in dct.iter().zip(&lift) {
                let c: f64 = row.iter().zip(&log_energies).map(|(d, e)| d * e).sum();
                data.push(c * l);
            }
        }

        Ok(FeatureSequence::new(p.num_cep, data)?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Round half away from zero, as sample counts are always non-negative.
fn round_half_up(x: f64) -> usize {
    (x + 0.5).floor().max(0.0) as usize
}

fn pre_emphasize(samples: &[f32], coef: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(samples.len());
    let mut prev = 0.0_f64;
    for (i, &s) in samples.iter().enumerate() {
        let s = s as f64;
        out.push(if i == 0 { s } else { s - coef * prev });
        prev = s;
    }
    out
}

/// Number of frames: one if the signal fits in a frame, otherwise enough
/// frames to cover every sample.
fn frame_count(len: usize, frame_len: usize, frame_step: usize) -> usize {
    if len <= frame_len {
        1
    } else {
        1 + (len - frame_len).div_ceil(frame_step)
    }
}

fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// `num_filters` triangular filters over `nfft / 2 + 1` spectrum bins.
fn mel_filterbank(num_filters: usize, nfft: usize, rate: f64, low: f64, high: f64) -> Vec<Vec<f64>> {
    let low_mel = hz_to_mel(low);
    let high_mel = hz_to_mel(high);
    let points = num_filters + 2;
    let bins: Vec<usize> = (0..points)
        .map(|i| {
            let mel = low_mel + (high_mel - low_mel) * i as f64 / (points - 1) as f64;
            ((nfft + 1) as f64 * mel_to_hz(mel) / rate).floor() as usize
        })
        .collect();

    let width = nfft / 2 + 1;
    (0..num_filters)
        .map(|j| {
            let (left, center, right) = (bins[j], bins[j + 1], bins[j + 2]);
            let mut filter = vec![0.0; width];
            for i in left..center.min(width) {
                filter[i] = (i - left) as f64 / (center - left) as f64;
            }
            for i in center..right.min(width) {
                filter[i] = (right - i) as f64 / (right - center) as f64;
            }
            filter
        })
        .collect()
}

/// First `num_cep` rows of the orthonormal DCT-II matrix of size `n`.
fn dct_matrix(n: usize, num_cep: usize) -> Vec<Vec<f64>> {
    let nf = n as f64;
    (0..num_cep)
        .map(|k| {
            let scale = if k == 0 { (1.0 / nf).sqrt() } else { (2.0 / nf).sqrt() };
            (0..n)
                .map(|i| {
                    scale
                        * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * nf))
                            .cos()
                })
                .collect()
        })
        .collect()
}

fn lifter(num_cep: usize, l: usize) -> Vec<f64> {
    if l == 0 {
        return vec![1.0; num_cep];
    }
    let lf = l as f64;
    (0..num_cep)
        .map(|n| 1.0 + (lf / 2.0) * (std::f64::consts::PI * n as f64 / lf).sin())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize, freq: f32, rate: f32) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin() * 10_000.0)
            .collect()
    }

    #[test]
    fn frame_count_matches_padding_rule() {
        assert_eq!(frame_count(100, 200, 80), 1);
        assert_eq!(frame_count(200, 200, 80), 1);
        assert_eq!(frame_count(201, 200, 80), 2);
        assert_eq!(frame_count(8_000, 200, 80), 99);
    }

    #[test]
    fn one_second_at_8k_yields_99_frames_of_13() {
        let seq = MfccExtractor::default()
            .extract(&PcmSignal::new(8_000, tone(8_000, 440.0, 8_000.0)))
            .unwrap();
        assert_eq!(seq.dim(), 13);
        assert_eq!(seq.len(), 99);
        assert!(seq.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn extraction_is_deterministic() {
        let signal = PcmSignal::new(8_000, tone(4_000, 350.0, 8_000.0));
        let ex = MfccExtractor::default();
        assert_eq!(ex.extract(&signal).unwrap(), ex.extract(&signal).unwrap());
    }

    #[test]
    fn silence_does_not_produce_nan() {
        let seq = MfccExtractor::default()
            .extract(&PcmSignal::new(8_000, vec![0.0; 800]))
            .unwrap();
        assert!(seq.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn different_tones_differ() {
        let ex = MfccExtractor::default();
        let a = ex.extract(&PcmSignal::new(8_000, tone(1_600, 440.0, 8_000.0))).unwrap();
        let b = ex.extract(&PcmSignal::new(8_000, tone(1_600, 2_000.0, 8_000.0))).unwrap();
        let dist: f64 = a
            .as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| (x - y).powi(2))
            .sum();
        assert!(dist > 1.0);
    }

    #[test]
    fn empty_signal_is_rejected() {
        let err = MfccExtractor::default()
            .extract(&PcmSignal::new(8_000, vec![]))
            .unwrap_err();
        assert_eq!(err, ExtractError::EmptySignal);
    }

    #[test]
    fn too_many_coefficients_is_rejected() {
        let params = MfccParams {
            num_cep: 40,
            ..MfccParams::default()
        };
        let err = MfccExtractor::new(params)
            .extract(&PcmSignal::new(8_000, vec![1.0; 800]))
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidParams(_)));
    }

    #[test]
    fn filterbank_is_triangular_and_bounded() {
        let bank = mel_filterbank(26, 256, 8_000.0, 0.0, 4_000.0);
        assert_eq!(bank.len(), 26);
        for filter in &bank {
            assert_eq!(filter.len(), 129);
            assert!(filter.iter().all(|&w| (0.0..=1.0).contains(&w)));
        }
    }

    #[test]
    fn dct_rows_are_orthonormal() {
        let dct = dct_matrix(26, 13);
        for a in 0..13 {
            for b in 0..13 {
                let dot: f64 = dct[a].iter().zip(&dct[b]).map(|(x, y)| x * y).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-9, "rows {a},{b}: {dot}");
            }
        }
    }

    #[test]
    fn lifter_zero_is_identity() {
        assert_eq!(lifter(3, 0), vec![1.0, 1.0, 1.0]);
        let l = lifter(13, 22);
        assert!((l[0] - 1.0).abs() < 1e-12);
        assert!(l[11] > l[1]);
    }

    #[test]
    fn mel_scale_round_trips() {
        for hz in [0.0, 300.0, 1_000.0, 4_000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
    }
}

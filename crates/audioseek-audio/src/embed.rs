//! Embedding provider trait and the built-in spectral embedder.
//!
//! The provider is an injected capability object, never a process-wide
//! singleton: build and query paths receive an `&dyn Embedder` and the
//! same instance serves both modalities. Audio and text are assumed by
//! contract to land in one shared D-dimensional space; raw outputs are not
//! assumed unit-norm (normalization is the index's job).

use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{AudioError, AudioResult};
use crate::wav::Waveform;

/// Maps audio and text into one fixed-dimension vector space.
pub trait Embedder {
    /// Output vector dimension.
    fn dim(&self) -> usize;

    /// Sample rate the provider expects canonicalized audio at.
    fn sample_rate(&self) -> u32;

    /// Embeds a canonicalized (mono, provider-rate) waveform.
    fn embed_audio(&self, track: &Waveform) -> AudioResult<Vec<f32>>;

    /// Embeds free-text queries, one vector per string.
    fn embed_text(&self, texts: &[String]) -> AudioResult<Vec<Vec<f32>>>;
}

/// Number of log-spaced spectral energy bands.
const SPECTRAL_BANDS: usize = 16;

/// Number of temporal RMS envelope frames.
const ENVELOPE_FRAMES: usize = 16;

/// Number of spectral/temporal shape features.
const SHAPE_FEATURES: usize = 16;

/// Total embedding dimension of [`SpectralEmbedder`].
pub const EMBEDDING_DIM: usize = SPECTRAL_BANDS + ENVELOPE_FRAMES + SHAPE_FEATURES;

/// Canonical input rate for [`SpectralEmbedder`].
pub const CANONICAL_RATE: u32 = 48_000;

/// Deterministic DSP feature embedder.
///
/// Audio features: 16 log-spaced spectral band energies, 16 RMS envelope
/// frames, 16 spectral/temporal shape features. Text queries are embedded
/// by feature hashing word tokens into the same bins; the shared-space
/// guarantee of a learned audio/text encoder is out of scope here, so text
/// retrieval with this embedder is a deterministic stand-in.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralEmbedder;

impl Embedder for SpectralEmbedder {
    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn sample_rate(&self) -> u32 {
        CANONICAL_RATE
    }

    fn embed_audio(&self, track: &Waveform) -> AudioResult<Vec<f32>> {
        if track.is_empty() {
            return Err(AudioError::invalid_input("cannot embed an empty waveform"));
        }

        let mut features = Vec::with_capacity(EMBEDDING_DIM);
        let spectrum = magnitude_spectrum(&track.samples);
        features.extend(spectral_bands(&spectrum, track.sample_rate));
        features.extend(rms_envelope(&track.samples));
        features.extend(shape_features(&track.samples, &spectrum, track.sample_rate));
        Ok(features)
    }

    fn embed_text(&self, texts: &[String]) -> AudioResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_text(t, EMBEDDING_DIM)).collect())
    }
}

/// Hann-windowed magnitude spectrum of up to the first 4096 samples.
struct Spectrum {
    magnitudes: Vec<f32>,
    freq_resolution: f32,
}

fn magnitude_spectrum(samples: &[f32]) -> Spectrum {
    let fft_size = samples.len().next_power_of_two().clamp(64, 4096);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);

    let mut buffer: Vec<Complex<f32>> = (0..fft_size)
        .map(|i| {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            let window =
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / fft_size as f32).cos());
            Complex::new(sample * window, 0.0)
        })
        .collect();
    fft.process(&mut buffer);

    let nyquist = fft_size / 2;
    Spectrum {
        magnitudes: buffer
            .iter()
            .take(nyquist)
            .map(|c| (c.re * c.re + c.im * c.im).sqrt())
            .collect(),
        freq_resolution: 1.0 / fft_size as f32,
    }
}

/// Energy in 16 log-spaced bands from 20 Hz to min(Nyquist, 20 kHz),
/// normalized so the loudest band is 1.0.
fn spectral_bands(spectrum: &Spectrum, sample_rate: u32) -> Vec<f32> {
    let nyquist_bins = spectrum.magnitudes.len();
    let bin_hz = sample_rate as f32 * spectrum.freq_resolution;

    let base_freq = 20.0f32;
    let max_freq = (sample_rate as f32 / 2.0).min(20_000.0);
    let ratio = (max_freq / base_freq).powf(1.0 / SPECTRAL_BANDS as f32);

    let mut bands = vec![0.0f32; SPECTRAL_BANDS];
    for (band_idx, band) in bands.iter_mut().enumerate() {
        let low = base_freq * ratio.powi(band_idx as i32);
        let high = base_freq * ratio.powi(band_idx as i32 + 1);
        let low_bin = ((low / bin_hz) as usize).max(1);
        let high_bin = ((high / bin_hz) as usize).min(nyquist_bins);
        if low_bin < high_bin {
            let energy: f32 = spectrum.magnitudes[low_bin..high_bin]
                .iter()
                .map(|m| m * m)
                .sum();
            *band = energy.sqrt();
        }
    }

    let peak = bands.iter().cloned().fold(0.0f32, f32::max);
    if peak > 0.0 {
        for band in &mut bands {
            *band /= peak;
        }
    }
    bands
}

/// RMS over 16 equal time frames, normalized so the loudest frame is 1.0.
fn rms_envelope(samples: &[f32]) -> Vec<f32> {
    let frame_size = samples.len() / ENVELOPE_FRAMES;
    if frame_size == 0 {
        return vec![frame_rms(samples); ENVELOPE_FRAMES];
    }

    let mut envelope = Vec::with_capacity(ENVELOPE_FRAMES);
    for i in 0..ENVELOPE_FRAMES {
        let start = i * frame_size;
        let end = if i == ENVELOPE_FRAMES - 1 {
            samples.len()
        } else {
            (i + 1) * frame_size
        };
        envelope.push(frame_rms(&samples[start..end]));
    }

    let peak = envelope.iter().cloned().fold(0.0f32, f32::max);
    if peak > 0.0 {
        for value in &mut envelope {
            *value /= peak;
        }
    }
    envelope
}

fn frame_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}

/// Sixteen spectral and temporal shape features, each scaled into [0, 1].
fn shape_features(samples: &[f32], spectrum: &Spectrum, sample_rate: u32) -> Vec<f32> {
    let mags = &spectrum.magnitudes;
    let nyquist_bins = mags.len();
    let bin_hz = sample_rate as f32 * spectrum.freq_resolution;

    let total_mag: f32 = mags.iter().sum();
    let total_energy: f32 = mags.iter().map(|m| m * m).sum();

    let mut features = vec![0.0f32; SHAPE_FEATURES];
    if nyquist_bins == 0 {
        return features;
    }

    let centroid = if total_mag > 0.0 {
        mags.iter()
            .enumerate()
            .map(|(i, m)| i as f32 * m)
            .sum::<f32>()
            / total_mag
    } else {
        0.0
    };

    // 0: spectral centroid
    features[0] = centroid / nyquist_bins as f32;

    // 1: spectral spread
    if total_mag > 0.0 {
        let spread = mags
            .iter()
            .enumerate()
            .map(|(i, m)| (i as f32 - centroid).powi(2) * m)
            .sum::<f32>()
            / total_mag;
        features[1] = spread.sqrt() / nyquist_bins as f32;
    }

    // 2: rolloff frequency below which 85% of the energy lies
    if total_energy > 0.0 {
        let threshold = total_energy * 0.85;
        let mut cumulative = 0.0f32;
        for (i, m) in mags.iter().enumerate() {
            cumulative += m * m;
            if cumulative >= threshold {
                features[2] = i as f32 / nyquist_bins as f32;
                break;
            }
        }
    }

    // 3: spectral flatness (geometric over arithmetic mean)
    if total_mag > 0.0 {
        let log_sum: f32 = mags.iter().map(|m| (m + 1e-10).ln()).sum();
        let geometric = (log_sum / nyquist_bins as f32).exp();
        let arithmetic = total_mag / nyquist_bins as f32;
        features[3] = (geometric / arithmetic).min(1.0);
    }

    // 4: spectral crest
    if total_energy > 0.0 {
        let peak_mag = mags.iter().cloned().fold(0.0f32, f32::max);
        let rms_mag = (total_energy / nyquist_bins as f32).sqrt();
        features[4] = (peak_mag / rms_mag).min(10.0) / 10.0;
    }

    // 5: zero crossing rate
    features[5] = (zero_crossing_rate(samples)).min(0.5) * 2.0;

    // 6: temporal peak
    let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    features[6] = peak.min(1.0);

    // 7: temporal RMS
    let rms = frame_rms(samples);
    features[7] = rms.min(1.0);

    // 8: temporal crest factor
    if rms > 0.0 {
        features[8] = (peak / rms).min(10.0) / 10.0;
    }

    // 9: DC offset
    let dc: f64 = samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64;
    features[9] = (dc.abs() as f32).min(1.0);

    // 10-12: low / mid / high band energy ratios
    let low_cutoff = ((250.0 / bin_hz) as usize).min(nyquist_bins);
    let mid_cutoff = ((4000.0 / bin_hz) as usize).min(nyquist_bins);
    if total_energy > 0.0 {
        let low: f32 = mags[..low_cutoff].iter().map(|m| m * m).sum();
        let mid: f32 = mags[low_cutoff..mid_cutoff.max(low_cutoff)]
            .iter()
            .map(|m| m * m)
            .sum();
        let high: f32 = mags[mid_cutoff.max(low_cutoff)..].iter().map(|m| m * m).sum();
        features[10] = low / total_energy;
        features[11] = mid / total_energy;
        features[12] = high / total_energy;
    }

    // 13: spectral entropy
    if total_mag > 0.0 {
        let entropy: f32 = mags
            .iter()
            .map(|m| {
                let p = m / total_mag;
                if p > 0.0 {
                    -p * p.ln()
                } else {
                    0.0
                }
            })
            .sum();
        let max_entropy = (nyquist_bins as f32).ln();
        if max_entropy > 0.0 {
            features[13] = (entropy / max_entropy).min(1.0);
        }
    }

    // 14: dominant frequency bin
    if total_mag > 0.0 {
        let mut dominant = 1usize.min(nyquist_bins - 1);
        for i in dominant..nyquist_bins {
            if mags[i] > mags[dominant] {
                dominant = i;
            }
        }
        features[14] = dominant as f32 / nyquist_bins as f32;
    }

    // 15: bandwidth around the centroid
    if total_mag > 0.0 {
        let bandwidth = mags
            .iter()
            .enumerate()
            .map(|(i, m)| (i as f32 - centroid).abs() * m)
            .sum::<f32>()
            / total_mag;
        features[15] = bandwidth / nyquist_bins as f32;
    }

    features
}

fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

/// Feature-hashes word tokens into `dim` bins. Each token's BLAKE3 hash
/// selects a bin and a sign, so identical queries always produce identical
/// vectors.
fn hash_text(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dim];
    let lowered = text.to_lowercase();
    for token in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let hash = blake3::hash(token.as_bytes());
        let bytes = hash.as_bytes();
        let bin = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize % dim;
        let sign = if bytes[4] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bin] += sign;
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Waveform {
        let n = (sample_rate as f32 * seconds) as usize;
        let samples = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        Waveform::new(samples, sample_rate)
    }

    #[test]
    fn test_audio_embedding_dimension() {
        let embedder = SpectralEmbedder;
        let v = embedder.embed_audio(&sine(440.0, 48000, 0.2)).unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert_eq!(embedder.dim(), EMBEDDING_DIM);
    }

    #[test]
    fn test_audio_embedding_deterministic() {
        let embedder = SpectralEmbedder;
        let track = sine(440.0, 48000, 0.2);
        let a = embedder.embed_audio(&track).unwrap();
        let b = embedder.embed_audio(&track).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_audio_embedding_values_bounded() {
        let embedder = SpectralEmbedder;
        let v = embedder.embed_audio(&sine(880.0, 48000, 0.1)).unwrap();
        for (i, &value) in v.iter().enumerate() {
            assert!(value.is_finite(), "feature {i} not finite");
            assert!((-0.001..=1.001).contains(&value), "feature {i} = {value}");
        }
    }

    #[test]
    fn test_distinct_signals_embed_differently() {
        let embedder = SpectralEmbedder;
        let tone = embedder.embed_audio(&sine(220.0, 48000, 0.2)).unwrap();

        let mut rng = Pcg32::seed_from_u64(7);
        let noise = Waveform::new(
            (0..9600).map(|_| rng.gen_range(-0.8f32..0.8)).collect(),
            48000,
        );
        let noisy = embedder.embed_audio(&noise).unwrap();
        assert_ne!(tone, noisy);
    }

    #[test]
    fn test_empty_waveform_rejected() {
        let embedder = SpectralEmbedder;
        let err = embedder
            .embed_audio(&Waveform::new(vec![], 48000))
            .unwrap_err();
        assert!(matches!(err, AudioError::InvalidAudioInput { .. }));
    }

    #[test]
    fn test_text_embedding_shape_and_determinism() {
        let embedder = SpectralEmbedder;
        let texts = vec!["punchy kick drum".to_string(), "soft pad".to_string()];
        let vectors = embedder.embed_text(&texts).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), EMBEDDING_DIM);
        assert_ne!(vectors[0], vectors[1]);

        let again = embedder.embed_text(&texts).unwrap();
        assert_eq!(vectors, again);
    }

    #[test]
    fn test_text_hashing_ignores_case_and_punctuation() {
        let a = hash_text("Kick Drum!", EMBEDDING_DIM);
        let b = hash_text("kick drum", EMBEDDING_DIM);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = hash_text("", EMBEDDING_DIM);
        assert!(v.iter().all(|&x| x == 0.0));
    }
}

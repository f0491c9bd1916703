//! Deterministic linear-interpolation resampling.
//!
//! Canonicalization resamples a mono waveform to the embedding provider's
//! required rate before hashing or embedding, so the same audio content
//! yields the same cache key regardless of its original sample rate.

use crate::wav::Waveform;

/// Resamples using linear interpolation.
///
/// Simple and deterministic; quality is adequate for feature extraction.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < samples.len() {
            let s0 = samples[src_idx];
            let s1 = samples[src_idx + 1];
            s0 + (s1 - s0) * frac
        } else {
            samples[src_idx.min(samples.len() - 1)]
        };
        output.push(sample);
    }

    output
}

/// Produces the canonical form of a waveform for hashing and embedding:
/// mono (already guaranteed by [`Waveform`]) at `target_rate`.
pub fn canonicalize(track: &Waveform, target_rate: u32) -> Waveform {
    Waveform::new(
        resample_linear(&track.samples, track.sample_rate, target_rate),
        target_rate,
    )
}

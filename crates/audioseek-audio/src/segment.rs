//! Temporal segmentation of mono waveforms.
//!
//! A waveform is split into contiguous, non-overlapping spans. Boundary
//! detection runs on an onset-strength envelope (half-wave-rectified
//! spectral flux over Hann-windowed frames); two interchangeable strategies
//! turn that envelope into interior boundaries:
//!
//! - [`SegmentationStrategy::Onsets`] - each picked envelope peak is a
//!   boundary (inter-onset intervals become segments)
//! - [`SegmentationStrategy::Beats`] - a tempo period is estimated by
//!   autocorrelation of the envelope and beats snapped to nearby peaks
//!   (inter-beat intervals become segments)
//!
//! Both strategies share one boundary-assembly rule: prepend frame 0,
//! append the final frame (`ceil(n_samples / hop)`), convert frames to
//! seconds, and pair consecutive boundaries. Zero detected boundaries
//! degrade to a single whole-clip span.

use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{AudioError, AudioResult};
use crate::wav::Waveform;

/// Analysis hop in samples. Boundaries land on this grid.
pub const HOP: usize = 512;

/// FFT window length for the onset-strength envelope.
const WIN: usize = 1024;

/// Minimum spacing between picked onsets, in frames.
const MIN_ONSET_GAP: usize = 4;

/// Tempo search range for beat tracking, in BPM.
const MIN_BPM: f32 = 30.0;
const MAX_BPM: f32 = 240.0;

/// A detected beat must carry at least this fraction of the anchor peak's
/// envelope energy; keeps the beat grid out of silent regions.
const BEAT_ENERGY_FLOOR: f32 = 0.1;

/// Center of the log-Gaussian tempo prior, in BPM.
const TEMPO_PRIOR_BPM: f32 = 120.0;

/// Width of the tempo prior in octaves.
const TEMPO_PRIOR_OCTAVES: f32 = 1.0;

/// One time span in seconds. Spans produced by [`segment`] are contiguous:
/// each span's `end` equals the next span's `start`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    /// Start in seconds.
    pub start: f64,
    /// End in seconds. Always greater than `start`.
    pub end: f64,
}

/// Boundary-detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationStrategy {
    /// Transient attack points; each inter-onset interval is a segment.
    Onsets,
    /// Rhythmic beat positions; each inter-beat interval is a segment.
    Beats,
}

/// Splits a mono waveform into an ordered sequence of contiguous spans.
///
/// The first span starts at 0, the last ends at the final analysis frame
/// (at or after the true duration), and `spans[i].end == spans[i+1].start`
/// throughout - no gaps, no overlaps. Sparse detection is not an error: a
/// clip with no detected boundaries comes back as one whole-clip span.
///
/// # Errors
/// [`AudioError::InvalidAudioInput`] for an empty waveform.
pub fn segment(track: &Waveform, strategy: SegmentationStrategy) -> AudioResult<Vec<Span>> {
    if track.is_empty() {
        return Err(AudioError::invalid_input("empty waveform"));
    }

    let envelope = onset_envelope(&track.samples);
    let interior = match strategy {
        SegmentationStrategy::Onsets => pick_onsets(&envelope),
        SegmentationStrategy::Beats => track_beats(&envelope, track.sample_rate),
    };

    Ok(assemble_spans(&interior, track.len(), track.sample_rate))
}

/// Onset-strength envelope: one value per hop, the half-wave-rectified
/// spectral flux between consecutive Hann-windowed magnitude spectra.
fn onset_envelope(samples: &[f32]) -> Vec<f32> {
    let n_frames = frame_count(samples.len());
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(WIN);

    let mut prev = vec![0.0f32; WIN / 2];
    let mut envelope = Vec::with_capacity(n_frames);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); WIN];

    for frame in 0..n_frames {
        let offset = frame * HOP;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = samples.get(offset + i).copied().unwrap_or(0.0);
            let window =
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / WIN as f32).cos());
            *slot = Complex::new(sample * window, 0.0);
        }
        fft.process(&mut buffer);

        let mut flux = 0.0f32;
        for (bin, slot) in buffer.iter().take(WIN / 2).enumerate() {
            let magnitude = (slot.re * slot.re + slot.im * slot.im).sqrt();
            flux += (magnitude - prev[bin]).max(0.0);
            prev[bin] = magnitude;
        }
        envelope.push(flux);
    }

    envelope
}

/// Number of analysis frames covering `n_samples`, rounded up.
fn frame_count(n_samples: usize) -> usize {
    (n_samples + HOP - 1) / HOP
}

/// Picks envelope peaks above `mean + std`, keeping local maxima separated
/// by at least [`MIN_ONSET_GAP`] frames.
fn pick_onsets(envelope: &[f32]) -> Vec<usize> {
    let n = envelope.len();
    if n < 3 {
        return Vec::new();
    }

    let mean = envelope.iter().sum::<f32>() / n as f32;
    let variance = envelope.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n as f32;
    let threshold = mean + variance.sqrt();

    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;
    for frame in 1..n - 1 {
        if envelope[frame] <= threshold {
            continue;
        }
        if envelope[frame] < envelope[frame - 1] || envelope[frame] < envelope[frame + 1] {
            continue;
        }
        if let Some(prev) = last {
            if frame - prev < MIN_ONSET_GAP {
                continue;
            }
        }
        peaks.push(frame);
        last = Some(frame);
    }
    peaks
}

/// Beat tracking: autocorrelation tempo estimate over the 30-240 BPM lag
/// range, grid anchored on the strongest envelope peak, each beat snapped
/// to the local envelope maximum near its grid position.
fn track_beats(envelope: &[f32], sample_rate: u32) -> Vec<usize> {
    let n = envelope.len();
    let frames_per_second = sample_rate as f32 / HOP as f32;
    let min_lag = (frames_per_second * 60.0 / MAX_BPM).round() as usize;
    let max_lag = ((frames_per_second * 60.0 / MIN_BPM).round() as usize).min(n.saturating_sub(1));
    if min_lag < 1 || min_lag >= max_lag {
        return Vec::new();
    }

    // Tempo period = lag with the strongest envelope self-similarity,
    // weighted by a log-Gaussian prior around 120 BPM so octave-doubled
    // lags do not win on sparse envelopes.
    let prior_lag = frames_per_second * 60.0 / TEMPO_PRIOR_BPM;
    let mut best_lag = 0usize;
    let mut best_score = 0.0f32;
    for lag in min_lag..=max_lag {
        let correlation = envelope
            .iter()
            .zip(envelope[lag..].iter())
            .map(|(a, b)| a * b)
            .sum::<f32>()
            / (n - lag) as f32;
        let octaves = (lag as f32 / prior_lag).log2();
        let prior = (-0.5 * (octaves / TEMPO_PRIOR_OCTAVES).powi(2)).exp();
        let score = correlation * prior;
        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }
    if best_lag == 0 || best_score <= 0.0 {
        return Vec::new();
    }
    let period = best_lag as f32;

    let anchor = argmax(envelope);
    let anchor_energy = envelope[anchor];
    if anchor_energy <= 0.0 {
        return Vec::new();
    }
    let tolerance = ((period * 0.15).round() as usize).max(2);

    // Walk the grid in both directions from the anchor, snapping each beat
    // to the strongest envelope frame within the tolerance window.
    let mut beats = Vec::new();
    let mut grid = anchor as f32;
    while grid >= -(tolerance as f32) {
        push_snapped(&mut beats, envelope, grid, tolerance, anchor_energy);
        grid -= period;
    }
    let mut grid = anchor as f32 + period;
    while grid <= (n - 1) as f32 + tolerance as f32 {
        push_snapped(&mut beats, envelope, grid, tolerance, anchor_energy);
        grid += period;
    }

    beats.sort_unstable();
    beats.dedup();
    beats
}

/// Snaps one grid position to the local envelope maximum and records it if
/// it clears the energy floor.
fn push_snapped(
    beats: &mut Vec<usize>,
    envelope: &[f32],
    grid: f32,
    tolerance: usize,
    anchor_energy: f32,
) {
    let n = envelope.len();
    let center = grid.round();
    let lo = (center - tolerance as f32).max(0.0) as usize;
    let hi = ((center + tolerance as f32) as usize).min(n - 1);
    if lo > hi {
        return;
    }

    let mut snapped = lo;
    for frame in lo..=hi {
        if envelope[frame] > envelope[snapped] {
            snapped = frame;
        }
    }
    if envelope[snapped] >= BEAT_ENERGY_FLOOR * anchor_energy {
        beats.push(snapped);
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0usize;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Shared boundary-assembly rule: interior frames bounded by frame 0 and
/// the final frame, converted to seconds and paired.
fn assemble_spans(interior: &[usize], n_samples: usize, sample_rate: u32) -> Vec<Span> {
    let last = frame_count(n_samples);

    let mut bounds = vec![0usize];
    bounds.extend(interior.iter().copied().filter(|&f| f > 0 && f < last));
    bounds.sort_unstable();
    bounds.dedup();
    bounds.push(last);

    let to_seconds = |frame: usize| frame as f64 * HOP as f64 / sample_rate as f64;
    bounds
        .windows(2)
        .map(|pair| Span {
            start: to_seconds(pair[0]),
            end: to_seconds(pair[1]),
        })
        .collect()
}

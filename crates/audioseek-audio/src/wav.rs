//! WAV decoding to mono float waveforms, and span slicing.
//!
//! Multi-channel audio is down-mixed by per-frame channel averaging before
//! anything else sees it; every `Waveform` in the system is mono.

use std::path::Path;

use crate::error::{AudioError, AudioResult};

/// A mono waveform with its sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Waveform {
    /// Wraps samples at the given rate.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Loads a WAV file as a mono [`Waveform`].
///
/// Supports 8/16/24/32-bit integer PCM. Multi-channel input is averaged to
/// mono per frame; samples are normalized to [-1.0, 1.0] by bit depth.
///
/// # Errors
/// - [`AudioError::UnsupportedFormat`] for non-integer encodings or unknown
///   bit depths
/// - [`AudioError::Decode`] when the file cannot be read as WAV
/// - [`AudioError::InvalidAudioInput`] when the file holds zero samples
pub fn load_wav(path: &Path) -> AudioResult<Waveform> {
    let display = path.display().to_string();
    let mut reader =
        hound::WavReader::open(path).map_err(|e| AudioError::decode(&display, e.to_string()))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int {
        return Err(AudioError::unsupported(
            &display,
            format!("only integer PCM is supported, got {:?}", spec.sample_format),
        ));
    }

    let samples = match spec.bits_per_sample {
        8 => {
            let raw: Result<Vec<i8>, _> = reader.samples::<i8>().collect();
            let raw = raw.map_err(|e| AudioError::decode(&display, e.to_string()))?;
            downmix_mono(&raw, spec.channels, spec.bits_per_sample)
        }
        16 => {
            let raw: Result<Vec<i16>, _> = reader.samples::<i16>().collect();
            let raw = raw.map_err(|e| AudioError::decode(&display, e.to_string()))?;
            downmix_mono(&raw, spec.channels, spec.bits_per_sample)
        }
        24 | 32 => {
            let raw: Result<Vec<i32>, _> = reader.samples::<i32>().collect();
            let raw = raw.map_err(|e| AudioError::decode(&display, e.to_string()))?;
            downmix_mono(&raw, spec.channels, spec.bits_per_sample)
        }
        bits => {
            return Err(AudioError::unsupported(
                &display,
                format!("{bits}-bit samples (supported: 8, 16, 24, 32)"),
            ));
        }
    };

    if samples.is_empty() {
        return Err(AudioError::invalid_input(format!(
            "'{display}' holds no samples"
        )));
    }

    Ok(Waveform::new(samples, spec.sample_rate))
}

/// Averages interleaved channels to mono and normalizes to [-1.0, 1.0].
fn downmix_mono<T>(raw: &[T], channels: u16, bits_per_sample: u16) -> Vec<f32>
where
    T: Copy + Into<i32>,
{
    if channels <= 1 {
        return raw
            .iter()
            .map(|&s| normalize_sample(s.into(), bits_per_sample))
            .collect();
    }

    let channels = channels as usize;
    let frame_count = raw.len() / channels;
    let mut mono = Vec::with_capacity(frame_count);
    for frame in 0..frame_count {
        let mut sum = 0i64;
        for ch in 0..channels {
            sum += raw[frame * channels + ch].into() as i64;
        }
        mono.push(normalize_sample(
            (sum / channels as i64) as i32,
            bits_per_sample,
        ));
    }
    mono
}

/// Scales an integer sample to [-1.0, 1.0] by bit depth.
fn normalize_sample(sample: i32, bits_per_sample: u16) -> f32 {
    let max_value = match bits_per_sample {
        8 => 128.0,
        16 => 32768.0,
        24 => 8388608.0,
        _ => 2147483648.0,
    };
    (sample as f64 / max_value) as f32
}

/// Cuts the `[start, end)` span (seconds) out of a track.
///
/// `expected_rate` must equal the track's rate; a mismatch is a caller bug
/// and fails with [`AudioError::SampleRateMismatch`]. The end index is
/// clamped to the track length, since the final span of a segmentation may
/// end slightly past the true duration (frames round up).
pub fn slice_span(
    track: &Waveform,
    start: f64,
    end: f64,
    expected_rate: u32,
) -> AudioResult<Waveform> {
    if expected_rate != track.sample_rate {
        return Err(AudioError::SampleRateMismatch {
            expected: expected_rate,
            found: track.sample_rate,
        });
    }
    if end <= start || start < 0.0 {
        return Err(AudioError::invalid_input(format!(
            "span [{start}, {end}) is empty or negative"
        )));
    }

    let rate = track.sample_rate as f64;
    let start_idx = (start * rate) as usize;
    let end_idx = ((end * rate) as usize).min(track.len());
    if start_idx >= end_idx {
        return Err(AudioError::invalid_input(format!(
            "span [{start}, {end}) lies past the end of the track"
        )));
    }

    Ok(Waveform::new(
        track.samples[start_idx..end_idx].to_vec(),
        track.sample_rate,
    ))
}

//! Error types for the audio backend.

use thiserror::Error;

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors that can occur while decoding, segmenting, or embedding audio.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Input audio is empty or spans no time.
    #[error("invalid audio input: {reason}")]
    InvalidAudioInput {
        /// What made the input invalid.
        reason: String,
    },

    /// An operation was handed a sample rate inconsistent with its source.
    /// Signals a caller bug, not a data problem.
    #[error("sample rate mismatch: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch {
        /// Rate the operation was told to assume.
        expected: u32,
        /// Rate the source actually has.
        found: u32,
    },

    /// WAV encoding this backend does not read.
    #[error("unsupported audio format in '{path}': {reason}")]
    UnsupportedFormat {
        /// Offending file.
        path: String,
        /// Which part of the encoding is unsupported.
        reason: String,
    },

    /// WAV decode failure.
    #[error("failed to decode '{path}': {reason}")]
    Decode {
        /// Offending file.
        path: String,
        /// Decoder message.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    /// Creates an invalid-input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidAudioInput {
            reason: reason.into(),
        }
    }

    /// Creates an unsupported-format error.
    pub fn unsupported(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

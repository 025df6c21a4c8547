//! # Transcode Error Types
//!
//! Error types for the streaming adapters.
//!
//! End of stream is never an error: adapters report it as a zero-length read.

use bridge_traits::{AudioFormat, BridgeError};
use std::io;
use thiserror::Error;

/// Errors that can occur while decoding, encoding or converting a stream.
#[derive(Error, Debug)]
pub enum TranscodeError {
    // ========================================================================
    // Format Errors
    // ========================================================================
    /// Stream format is missing, invalid, or unusable for byte arithmetic.
    #[error("Invalid audio format: {0}")]
    Format(String),

    /// The native decoder announced a new output format mid-stream.
    #[error(
        "Output format changed mid-stream to {} Hz, {} ch, {} bit",
        new_format.sample_rate,
        new_format.channels,
        new_format.bits_per_sample
    )]
    FormatChangedMidStream { new_format: AudioFormat },

    // ========================================================================
    // Native Transform Errors
    // ========================================================================
    /// The native transform reported a failure.
    #[error("Native transform failed: {0}")]
    NativeTransform(String),

    /// Seeking was requested on a source that cannot seek.
    #[error("Seeking not supported by the native source")]
    SeekUnsupported,

    /// Error raised by a native bridge call.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    // ========================================================================
    // Lifecycle & Configuration Errors
    // ========================================================================
    /// The adapter was disposed and its native resources released.
    #[error("Adapter has been disposed")]
    Disposed,

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal contract violation (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TranscodeError {
    /// Returns `true` if a seek can bring the stream back to a usable state.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TranscodeError::NativeTransform(_) | TranscodeError::Bridge(_)
        )
    }

    /// Returns `true` if this error is related to the stream format.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            TranscodeError::Format(_)
                | TranscodeError::FormatChangedMidStream { .. }
                | TranscodeError::Bridge(BridgeError::InvalidFormat(_))
        )
    }
}

impl From<TranscodeError> for io::Error {
    fn from(err: TranscodeError) -> Self {
        let kind = match &err {
            TranscodeError::Io(inner) => inner.kind(),
            TranscodeError::SeekUnsupported => io::ErrorKind::Unsupported,
            TranscodeError::Format(_)
            | TranscodeError::FormatChangedMidStream { .. }
            | TranscodeError::InvalidConfig(_) => io::ErrorKind::InvalidData,
            TranscodeError::Disposed => io::ErrorKind::NotConnected,
            _ => io::ErrorKind::Other,
        };
        match err {
            TranscodeError::Io(inner) => inner,
            other => io::Error::new(kind, other),
        }
    }
}

/// Result type for transcode operations.
pub type Result<T> = std::result::Result<T, TranscodeError>;

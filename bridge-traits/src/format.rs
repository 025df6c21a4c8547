//! Audio format descriptors shared between the adapters and native backends.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};

/// Number of 100-nanosecond ticks in one second.
///
/// Every timestamp and duration exchanged with a native transform is expressed
/// in this time base.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Sample encoding carried by a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// Integer PCM
    Pcm,
    /// 32-bit IEEE float PCM
    IeeeFloat,
    /// MPEG-1/2 Audio Layer III
    Mp3,
    /// Advanced Audio Coding
    Aac,
    /// Windows Media Audio
    Wma,
    /// Raw format tag of an encoding without a dedicated variant
    Other(u16),
}

impl AudioEncoding {
    /// Returns `true` for uncompressed sample encodings.
    pub fn is_pcm(&self) -> bool {
        matches!(self, AudioEncoding::Pcm | AudioEncoding::IeeeFloat)
    }
}

/// Layout of a byte-oriented audio stream.
///
/// `block_align` is the size of one sample frame across all channels. All
/// byte counts handed to a native transform must be a multiple of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Bits per sample (e.g., 16, 24, 32)
    pub bits_per_sample: u16,
    /// Number of interleaved channels
    pub channels: u16,
    /// Bytes per sample frame across all channels
    pub block_align: u16,
    /// Sample encoding
    pub encoding: AudioEncoding,
}

impl AudioFormat {
    /// Create a PCM-style format, deriving `block_align` from the sample size
    /// and channel count.
    pub fn new(sample_rate: u32, bits_per_sample: u16, channels: u16, encoding: AudioEncoding) -> Self {
        let block_align = (bits_per_sample / 8).saturating_mul(channels);
        Self {
            sample_rate,
            bits_per_sample,
            channels,
            block_align,
            encoding,
        }
    }

    /// Integer PCM format.
    pub fn pcm(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Self {
        Self::new(sample_rate, bits_per_sample, channels, AudioEncoding::Pcm)
    }

    /// 32-bit float PCM format.
    pub fn ieee_float(sample_rate: u32, channels: u16) -> Self {
        Self::new(sample_rate, 32, channels, AudioEncoding::IeeeFloat)
    }

    /// Standard CD quality (44.1 kHz, 16-bit stereo)
    pub fn cd_quality() -> Self {
        Self::pcm(44100, 16, 2)
    }

    /// Override the block alignment (compressed formats define their own).
    pub fn with_block_align(mut self, block_align: u16) -> Self {
        self.block_align = block_align;
        self
    }

    /// Bytes per second of stream data: `sample_rate * block_align`.
    pub fn bytes_per_second(&self) -> u64 {
        self.sample_rate as u64 * self.block_align as u64
    }

    /// Round `bytes` down to a whole number of sample frames.
    pub fn align_down(&self, bytes: usize) -> usize {
        let align = self.block_align.max(1) as usize;
        bytes - bytes % align
    }

    /// Returns `true` if `bytes` is a whole number of sample frames.
    pub fn is_aligned(&self, bytes: usize) -> bool {
        self.block_align != 0 && bytes % self.block_align as usize == 0
    }

    /// Validate that every field needed for byte/time arithmetic is non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(BridgeError::InvalidFormat("sample_rate must be > 0".to_string()));
        }
        if self.bits_per_sample == 0 {
            return Err(BridgeError::InvalidFormat(
                "bits_per_sample must be > 0".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(BridgeError::InvalidFormat("channels must be > 0".to_string()));
        }
        if self.block_align == 0 {
            return Err(BridgeError::InvalidFormat("block_align must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cd_quality_layout() {
        let format = AudioFormat::cd_quality();
        assert_eq!(format.block_align, 4);
        assert_eq!(format.bytes_per_second(), 176_400);
        assert!(format.validate().is_ok());
    }

    #[test]
    fn test_align_down() {
        let format = AudioFormat::pcm(48000, 24, 2);
        assert_eq!(format.block_align, 6);
        assert_eq!(format.align_down(13), 12);
        assert_eq!(format.align_down(5), 0);
        assert!(format.is_aligned(600));
        assert!(!format.is_aligned(601));
    }

    #[test]
    fn test_validate_rejects_zero_fields() {
        assert!(AudioFormat::pcm(0, 16, 2).validate().is_err());
        assert!(AudioFormat::pcm(44100, 16, 0).validate().is_err());
        assert!(AudioFormat::pcm(44100, 4, 1).validate().is_err());

        let compressed = AudioFormat::new(44100, 16, 2, AudioEncoding::Mp3).with_block_align(1);
        assert!(compressed.validate().is_ok());
        assert!(!compressed.encoding.is_pcm());
    }

    #[test]
    fn test_serde_roundtrip_keeps_encoding() {
        let format = AudioFormat::ieee_float(48000, 2);
        let json = serde_json::to_string(&format).unwrap();
        assert!(json.contains("ieeefloat"));
        let back: AudioFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, format);
    }
}

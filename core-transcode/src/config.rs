//! # Adapter Configuration
//!
//! Tunables for the decode, encode and conversion adapters.

use crate::error::{Result, TranscodeError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Combined adapter configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscodeConfig {
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
}

impl TranscodeConfig {
    /// Smaller encoder chunks and a shorter finalize wait.
    pub fn low_latency() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            encoder: EncoderConfig {
                max_chunk_seconds: 1,
                finalize_poll_interval_ms: 5,
                finalize_max_backoff_ms: 50,
                finalize_timeout_ms: 2_000,
            },
            conversion: ConversionConfig {
                min_source_buffer_bytes: 16 * 1024,
            },
        }
    }

    /// Larger chunks and a more patient finalize wait.
    pub fn high_quality() -> Self {
        Self {
            decoder: DecoderConfig {
                max_empty_units: 256,
            },
            encoder: EncoderConfig {
                max_chunk_seconds: 8,
                finalize_poll_interval_ms: 10,
                finalize_max_backoff_ms: 250,
                finalize_timeout_ms: 15_000,
            },
            conversion: ConversionConfig {
                min_source_buffer_bytes: 256 * 1024,
            },
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TranscodeError::InvalidConfig(format!("Malformed config: {}", e)))?;
        config.validate().map_err(TranscodeError::InvalidConfig)?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.decoder.validate()?;
        self.encoder.validate()?;
        self.conversion.validate()
    }
}

/// Decode adapter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Consecutive empty units tolerated before the stream is treated as
    /// faulted.
    ///
    /// Default: 64.
    #[serde(default = "default_max_empty_units")]
    pub max_empty_units: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_empty_units: default_max_empty_units(),
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_empty_units == 0 {
            return Err("max_empty_units must be > 0".to_string());
        }
        Ok(())
    }
}

/// Encode adapter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Upper bound on a single chunk handed to the sink, in seconds of audio.
    ///
    /// Default: 4 seconds.
    #[serde(default = "default_max_chunk_seconds")]
    pub max_chunk_seconds: u32,

    /// First wait between polls of the sink queue during finish.
    ///
    /// Default: 10 ms.
    #[serde(default = "default_finalize_poll_interval_ms")]
    pub finalize_poll_interval_ms: u64,

    /// Cap for the doubling poll interval.
    ///
    /// Default: 100 ms.
    #[serde(default = "default_finalize_max_backoff_ms")]
    pub finalize_max_backoff_ms: u64,

    /// Total time allowed for the sink queue to drain before finalizing
    /// anyway.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_finalize_timeout_ms")]
    pub finalize_timeout_ms: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_chunk_seconds: default_max_chunk_seconds(),
            finalize_poll_interval_ms: default_finalize_poll_interval_ms(),
            finalize_max_backoff_ms: default_finalize_max_backoff_ms(),
            finalize_timeout_ms: default_finalize_timeout_ms(),
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_chunk_seconds == 0 {
            return Err("max_chunk_seconds must be > 0".to_string());
        }

        if self.finalize_poll_interval_ms == 0 {
            return Err("finalize_poll_interval_ms must be > 0".to_string());
        }

        if self.finalize_max_backoff_ms < self.finalize_poll_interval_ms {
            return Err(
                "finalize_max_backoff_ms cannot be less than finalize_poll_interval_ms"
                    .to_string(),
            );
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.finalize_poll_interval_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.finalize_max_backoff_ms)
    }

    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_millis(self.finalize_timeout_ms)
    }
}

/// Format conversion buffer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Lower bound on the source buffer size. The buffer also holds at
    /// least one second of source audio.
    ///
    /// Default: 64 KB.
    #[serde(default = "default_min_source_buffer_bytes")]
    pub min_source_buffer_bytes: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            min_source_buffer_bytes: default_min_source_buffer_bytes(),
        }
    }
}

impl ConversionConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.min_source_buffer_bytes == 0 {
            return Err("min_source_buffer_bytes must be > 0".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_max_empty_units() -> u32 {
    64
}

fn default_max_chunk_seconds() -> u32 {
    4
}

fn default_finalize_poll_interval_ms() -> u64 {
    10
}

fn default_finalize_max_backoff_ms() -> u64 {
    100
}

fn default_finalize_timeout_ms() -> u64 {
    5_000
}

fn default_min_source_buffer_bytes() -> usize {
    64 * 1024
}

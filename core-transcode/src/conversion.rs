//! # Block-Aligned Format Conversion
//!
//! [`FormatConversionBuffer`] feeds a fixed-size native conversion stream
//! (an ACM-style converter) one block at a time. The source buffer is sized
//! to at least one second of audio and the destination buffer is sized once,
//! from the converter's own output-size query.
//!
//! Each conversion runs inside a [`HeaderGuard`] so the native buffer
//! registration is undone on every path, including native failures.

use crate::config::ConversionConfig;
use crate::error::{Result, TranscodeError};
use bridge_traits::{AudioFormat, BlockConversion, ConvertFlags, NativeBlockConverter};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::fmt;
use tracing::{debug, error, info, instrument, warn};

/// Outcome of one [`FormatConversionBuffer::convert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionResult {
    /// Source bytes the converter consumed.
    pub source_used: usize,
    /// Destination bytes the converter produced.
    pub destination_used: usize,
    /// The converter filled the whole destination buffer.
    pub destination_filled: bool,
    /// Input bytes dropped by alignment or capacity clamping.
    pub truncated_bytes: usize,
    pub has_error: bool,
}

/// Registers conversion buffers with the native stream for one call.
struct HeaderGuard<'a> {
    converter: &'a mut dyn NativeBlockConverter,
}

impl<'a> HeaderGuard<'a> {
    fn prepare(
        converter: &'a mut dyn NativeBlockConverter,
        source_len: usize,
        destination_len: usize,
    ) -> bridge_traits::error::Result<Self> {
        converter.prepare_header(source_len, destination_len)?;
        Ok(Self { converter })
    }

    fn convert(
        &mut self,
        source: &[u8],
        destination: &mut [u8],
        flags: ConvertFlags,
    ) -> bridge_traits::error::Result<BlockConversion> {
        self.converter.convert_block(source, destination, flags)
    }
}

impl Drop for HeaderGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.converter.unprepare_header() {
            warn!("Failed to unprepare conversion header: {}", err);
        }
    }
}

struct ConversionInner {
    converter: Option<Box<dyn NativeBlockConverter>>,
    source: Vec<u8>,
    destination: Vec<u8>,
    /// Destination bytes produced by the last conversion.
    produced: usize,
    started: bool,
}

/// Block-aligned buffer in front of a native conversion stream.
pub struct FormatConversionBuffer {
    source_format: AudioFormat,
    source_capacity: usize,
    destination_capacity: usize,
    inner: Mutex<ConversionInner>,
}

impl FormatConversionBuffer {
    pub fn new(converter: Box<dyn NativeBlockConverter>, source_format: AudioFormat) -> Result<Self> {
        Self::with_config(converter, source_format, ConversionConfig::default())
    }

    #[instrument(skip(converter, config), fields(block_align = source_format.block_align))]
    pub fn with_config(
        converter: Box<dyn NativeBlockConverter>,
        source_format: AudioFormat,
        config: ConversionConfig,
    ) -> Result<Self> {
        config.validate().map_err(TranscodeError::InvalidConfig)?;
        source_format
            .validate()
            .map_err(|e| TranscodeError::Format(format!("conversion source: {}", e)))?;

        let one_second = usize::try_from(source_format.bytes_per_second()).unwrap_or(usize::MAX);
        let source_capacity =
            source_format.align_down(config.min_source_buffer_bytes.max(one_second));
        if source_capacity == 0 {
            return Err(TranscodeError::Format(
                "source block is smaller than one sample frame".to_string(),
            ));
        }

        let destination_capacity = converter.query_output_size(source_capacity)?;
        if destination_capacity == 0 {
            return Err(TranscodeError::Format(format!(
                "converter reports no output for {} source bytes",
                source_capacity
            )));
        }

        info!(
            source_capacity,
            destination_capacity, "Conversion buffer allocated"
        );

        Ok(Self {
            source_format,
            source_capacity,
            destination_capacity,
            inner: Mutex::new(ConversionInner {
                converter: Some(converter),
                source: vec![0; source_capacity],
                destination: vec![0; destination_capacity],
                produced: 0,
                started: false,
            }),
        })
    }

    /// Convert one block of `source`.
    ///
    /// The submitted length is `source.len()` rounded down to whole sample
    /// frames and clamped to [`source_capacity`](Self::source_capacity). Pass
    /// `is_final` for the last block of a stream, which may legitimately
    /// produce a short output.
    pub fn convert(&self, source: &[u8], is_final: bool) -> Result<ConversionResult> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(converter) = inner.converter.as_mut() else {
            return Err(TranscodeError::Disposed);
        };

        let submitted = self
            .source_format
            .align_down(source.len())
            .min(self.source_capacity);
        let truncated_bytes = source.len() - submitted;
        if truncated_bytes > 0 {
            warn!(
                requested = source.len(),
                submitted, truncated_bytes, "Conversion input truncated"
            );
        }

        inner.produced = 0;
        if submitted == 0 {
            return Ok(ConversionResult {
                truncated_bytes,
                ..ConversionResult::default()
            });
        }

        inner.source[..submitted].copy_from_slice(&source[..submitted]);
        let flags = if inner.started {
            ConvertFlags::next_block()
        } else {
            ConvertFlags::first_block()
        };

        let outcome = HeaderGuard::prepare(
            &mut **converter,
            self.source_capacity,
            self.destination_capacity,
        )
        .and_then(|mut header| {
            header.convert(&inner.source[..submitted], &mut inner.destination, flags)
        });

        match outcome {
            Ok(block) => {
                inner.started = true;
                let source_used = block.consumed.min(submitted);
                let destination_used = block.produced.min(self.destination_capacity);
                inner.produced = destination_used;

                let expected = (self.destination_capacity as u128 * submitted as u128
                    / self.source_capacity as u128) as usize;
                let short = !is_final && destination_used < expected;
                if short {
                    warn!(
                        produced = destination_used,
                        expected, "Converter produced a short block"
                    );
                }

                debug!(
                    submitted,
                    consumed = source_used,
                    produced = destination_used,
                    "Block converted"
                );

                Ok(ConversionResult {
                    source_used,
                    destination_used,
                    destination_filled: destination_used == self.destination_capacity,
                    truncated_bytes,
                    has_error: short,
                })
            }
            Err(err) => {
                error!(submitted, "Native conversion failed: {}", err);
                inner.destination.fill(0);
                Ok(ConversionResult {
                    truncated_bytes,
                    has_error: true,
                    ..ConversionResult::default()
                })
            }
        }
    }

    /// Bytes produced by the most recent conversion.
    pub fn destination(&self) -> MappedMutexGuard<'_, [u8]> {
        MutexGuard::map(self.inner.lock(), |inner| {
            let produced = inner.produced;
            &mut inner.destination[..produced]
        })
    }

    /// Close the native stream. Idempotent.
    pub fn release(&self) -> Result<()> {
        let Some(mut converter) = self.inner.lock().converter.take() else {
            return Ok(());
        };
        converter.close()?;
        info!("Conversion stream closed");
        Ok(())
    }

    pub fn source_capacity(&self) -> usize {
        self.source_capacity
    }

    pub fn destination_capacity(&self) -> usize {
        self.destination_capacity
    }

    pub fn source_format(&self) -> AudioFormat {
        self.source_format
    }

    pub fn is_released(&self) -> bool {
        self.inner.lock().converter.is_none()
    }
}

impl fmt::Debug for FormatConversionBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatConversionBuffer")
            .field("source_format", &self.source_format)
            .field("source_capacity", &self.source_capacity)
            .field("destination_capacity", &self.destination_capacity)
            .finish_non_exhaustive()
    }
}

impl Drop for FormatConversionBuffer {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            error!("Closing conversion stream on drop failed: {}", err);
        }
    }
}

/// Converts whole blocks into caller-owned buffers.
pub struct FormatConverter {
    buffer: FormatConversionBuffer,
}

impl FormatConverter {
    pub fn new(buffer: FormatConversionBuffer) -> Self {
        Self { buffer }
    }

    /// Convert `source` into `destination`.
    ///
    /// Returns `None` and zero-fills `destination` when the block could not
    /// be converted completely. Otherwise returns the number of bytes copied,
    /// which is capped at `destination.len()`.
    pub fn convert(&self, source: &[u8], destination: &mut [u8]) -> Result<Option<usize>> {
        let result = self.buffer.convert(source, false)?;
        if result.has_error {
            destination.fill(0);
            return Ok(None);
        }

        let produced = self.buffer.destination();
        let copied = produced.len().min(destination.len());
        destination[..copied].copy_from_slice(&produced[..copied]);
        Ok(Some(copied))
    }

    pub fn buffer(&self) -> &FormatConversionBuffer {
        &self.buffer
    }

    pub fn into_inner(self) -> FormatConversionBuffer {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::BridgeError;
    use mockall::{mock, predicate::*, Sequence};

    mock! {
        pub Converter {}

        impl NativeBlockConverter for Converter {
            fn query_output_size(&self, input_bytes: usize) -> BridgeResult<usize>;
            fn prepare_header(&mut self, source_len: usize, destination_len: usize) -> BridgeResult<()>;
            fn convert_block(
                &mut self,
                source: &[u8],
                destination: &mut [u8],
                flags: ConvertFlags,
            ) -> BridgeResult<BlockConversion>;
            fn unprepare_header(&mut self) -> BridgeResult<()>;
            fn close(&mut self) -> BridgeResult<()>;
        }
    }

    #[test]
    fn test_buffer_sizes_use_one_second_minimum() {
        let mut converter = MockConverter::new();
        converter
            .expect_query_output_size()
            .with(eq(176_400))
            .times(1)
            .returning(|n| Ok(n / 2));
        converter.expect_close().times(1).returning(|| Ok(()));

        let buffer =
            FormatConversionBuffer::new(Box::new(converter), AudioFormat::cd_quality()).unwrap();
        assert_eq!(buffer.source_capacity(), 176_400);
        assert_eq!(buffer.destination_capacity(), 88_200);
    }

    #[test]
    fn test_zero_output_size_is_format_error() {
        let mut converter = MockConverter::new();
        converter.expect_query_output_size().returning(|_| Ok(0));

        let result = FormatConversionBuffer::new(Box::new(converter), AudioFormat::cd_quality());
        assert!(matches!(result, Err(TranscodeError::Format(_))));
    }

    #[test]
    fn test_header_released_when_conversion_fails() {
        let mut seq = Sequence::new();
        let mut converter = MockConverter::new();
        converter.expect_query_output_size().returning(|n| Ok(n));
        converter
            .expect_prepare_header()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        converter
            .expect_convert_block()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(BridgeError::native("acmStreamConvert", 512)));
        converter
            .expect_unprepare_header()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        converter.expect_close().times(1).returning(|| Ok(()));

        let buffer =
            FormatConversionBuffer::new(Box::new(converter), AudioFormat::cd_quality()).unwrap();
        let result = buffer.convert(&[1u8; 400], false).unwrap();

        assert!(result.has_error);
        assert_eq!(result.destination_used, 0);
        assert!(buffer.destination().is_empty());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut converter = MockConverter::new();
        converter.expect_query_output_size().returning(|n| Ok(n));
        converter.expect_close().times(1).returning(|| Ok(()));

        let buffer =
            FormatConversionBuffer::new(Box::new(converter), AudioFormat::cd_quality()).unwrap();
        buffer.release().unwrap();
        buffer.release().unwrap();
        assert!(buffer.is_released());
        assert!(matches!(
            buffer.convert(&[0u8; 4], false),
            Err(TranscodeError::Disposed)
        ));
    }
}

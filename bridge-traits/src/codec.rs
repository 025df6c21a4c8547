//! Native codec transform contracts.
//!
//! These traits are the minimum primitive surface the streaming adapters need
//! from a native codec layer (source readers, sink writers, block conversion
//! streams, or pure-Rust stand-ins). Implementations own whatever handles and
//! calling conventions the backend requires; the adapters never see them.
//!
//! All methods are synchronous. A call blocks until the native transform
//! returns; the adapters serialize access so an implementation is never
//! entered from two threads at once.

use crate::{
    attributes::{PresentationAttribute, PropVariant},
    error::Result,
    format::AudioFormat,
};
use bytes::Bytes;

// ============================================================================
// Decode
// ============================================================================

/// Outcome of one native decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    /// A unit of decoded audio was produced.
    Ok,
    /// The source is exhausted; no data accompanies this status.
    EndOfStream,
    /// The output layout changed; the caller must re-initialize.
    FormatChanged,
    /// The transform failed to produce this unit.
    Error,
}

/// One discrete chunk of decoded audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedUnit {
    /// Decoded bytes in the decoder's output format.
    pub data: Bytes,
    /// Presentation timestamp in ticks. Negative when the codec could not
    /// report one.
    pub timestamp: i64,
    pub status: UnitStatus,
}

impl DecodedUnit {
    /// Timestamp value used by codecs that cannot report a position.
    pub const UNKNOWN_TIMESTAMP: i64 = -1;

    pub fn new(data: impl Into<Bytes>, timestamp: i64) -> Self {
        Self {
            data: data.into(),
            timestamp,
            status: UnitStatus::Ok,
        }
    }

    pub fn end_of_stream() -> Self {
        Self::with_status(UnitStatus::EndOfStream)
    }

    pub fn format_changed() -> Self {
        Self::with_status(UnitStatus::FormatChanged)
    }

    pub fn error() -> Self {
        Self::with_status(UnitStatus::Error)
    }

    fn with_status(status: UnitStatus) -> Self {
        Self {
            data: Bytes::new(),
            timestamp: Self::UNKNOWN_TIMESTAMP,
            status,
        }
    }

    /// Timestamp, if the codec reported a valid one.
    pub fn valid_timestamp(&self) -> Option<i64> {
        (self.timestamp >= 0).then_some(self.timestamp)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Pull-model native decoder (source reader).
pub trait NativeDecoder: Send {
    /// Format of the bytes carried by produced units.
    fn output_format(&self) -> Result<AudioFormat>;

    /// Decode the next unit.
    ///
    /// Returning `Err` is equivalent to a unit with [`UnitStatus::Error`], but
    /// carries the native failure for diagnostics.
    fn next_unit(&mut self) -> Result<DecodedUnit>;

    /// Reposition the source to `ticks`. The next unit may start at a nearby
    /// frame boundary rather than the exact position requested.
    fn seek(&mut self, ticks: i64) -> Result<()>;

    /// Whether [`seek`](Self::seek) is supported.
    fn can_seek(&self) -> bool;

    /// Query a presentation attribute such as the total duration.
    fn presentation_attribute(&self, attribute: PresentationAttribute) -> Result<PropVariant>;
}

// ============================================================================
// Encode
// ============================================================================

/// Push-model native sample sink (sink writer).
pub trait NativeSampleSink: Send {
    /// Hand one sample of `data` to the encoder, stamped with its start time
    /// and duration in ticks.
    fn accept_sample(&mut self, data: &[u8], start_ticks: i64, duration_ticks: i64) -> Result<()>;

    /// Number of bytes accepted but not yet processed by the encoder.
    fn queued_byte_count(&self) -> Result<u64>;

    /// Flush the encoder and finish the container. Called at most once.
    fn finalize(&mut self) -> Result<()>;
}

// ============================================================================
// Block conversion
// ============================================================================

/// Flags attached to one conversion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConvertFlags {
    /// First block of the stream; the converter resets its internal state.
    pub start: bool,
    /// Only whole source blocks may be consumed.
    pub block_align: bool,
}

impl ConvertFlags {
    pub fn first_block() -> Self {
        Self {
            start: true,
            block_align: true,
        }
    }

    pub fn next_block() -> Self {
        Self {
            start: false,
            block_align: true,
        }
    }
}

/// Byte counts reported by one conversion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockConversion {
    /// Source bytes consumed.
    pub consumed: usize,
    /// Destination bytes produced.
    pub produced: usize,
}

/// Fixed-size native block conversion stream (e.g., an ACM stream).
pub trait NativeBlockConverter: Send {
    /// Destination size required to convert `input_bytes` source bytes.
    fn query_output_size(&self, input_bytes: usize) -> Result<usize>;

    /// Register the conversion buffers with the native stream.
    fn prepare_header(&mut self, source_len: usize, destination_len: usize) -> Result<()>;

    /// Convert `source` into `destination`.
    fn convert_block(
        &mut self,
        source: &[u8],
        destination: &mut [u8],
        flags: ConvertFlags,
    ) -> Result<BlockConversion>;

    /// Undo [`prepare_header`](Self::prepare_header).
    fn unprepare_header(&mut self) -> Result<()>;

    /// Close the native stream. Called at most once.
    fn close(&mut self) -> Result<()>;
}

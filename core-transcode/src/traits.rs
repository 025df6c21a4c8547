//! # Byte-Stream Traits
//!
//! The byte-oriented contract the adapters expose to their callers. These
//! differ from the `bridge-traits` definitions, which describe the frame- and
//! sample-oriented native collaborators the adapters wrap.
//!
//! ## Threading Model
//!
//! All methods take `&self`. Implementations serialize concurrent callers
//! behind an internal lock, so an adapter can be shared through an `Arc`
//! between a reader and a control thread (for example one issuing seeks).
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use core_transcode::{WaveSink, WaveSource};
//!
//! fn copy_all(source: &dyn WaveSource, sink: &dyn WaveSink) -> core_transcode::Result<()> {
//!     let mut buf = vec![0u8; 64 * 1024];
//!     loop {
//!         let n = source.read(&mut buf)?;
//!         if n == 0 {
//!             break;
//!         }
//!         sink.write(&buf[..n])?;
//!     }
//!     sink.finish()
//! }
//! ```

use crate::error::Result;
use bridge_traits::AudioFormat;

/// Total length of a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLength {
    /// Known length in bytes.
    Fixed(u64),
    /// Live or unbounded source.
    Unknown,
}

impl StreamLength {
    pub fn bytes(&self) -> Option<u64> {
        match self {
            StreamLength::Fixed(bytes) => Some(*bytes),
            StreamLength::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, StreamLength::Fixed(_))
    }
}

/// Readable, optionally seekable stream of audio bytes.
pub trait WaveSource: Send + Sync {
    /// Read up to `buf.len()` bytes.
    ///
    /// Returns 0 only at end of stream or for an empty `buf`.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Bytes delivered so far, in this source's byte format.
    fn position(&self) -> u64;

    /// Move to `position` (bytes). Unaligned positions are rounded down to a
    /// whole sample frame.
    fn set_position(&self, position: u64) -> Result<()>;

    fn length(&self) -> StreamLength;

    fn can_seek(&self) -> bool;

    /// Format of the bytes returned by [`read`](Self::read).
    fn format(&self) -> AudioFormat;
}

/// Writable stream of audio bytes.
pub trait WaveSink: Send + Sync {
    /// Consume all of `buf` or fail.
    fn write(&self, buf: &[u8]) -> Result<()>;

    /// Flush and finalize the stream. Idempotent.
    fn finish(&self) -> Result<()>;

    /// Format expected by [`write`](Self::write).
    fn format(&self) -> AudioFormat;
}

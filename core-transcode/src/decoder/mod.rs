//! # Decoding
//!
//! The pull-model [`DecodeAdapter`] and, behind the `symphonia-backend`
//! feature, a pure-Rust [`NativeDecoder`](bridge_traits::NativeDecoder)
//! backend.
//!
//! ## Architecture
//!
//! ```text
//! MediaSource → FormatReader → Decoder ─┐            (SymphoniaDecoder)
//!                                       ▼
//!                              NativeDecoder::next_unit
//!                                       ▼
//!                 FrameBufferCursor + PositionTracker  (DecodeAdapter)
//!                                       ▼
//!                                read(&mut [u8])
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use core_transcode::decoder::{DecodeAdapter, OutputSample, SymphoniaDecoder};
//!
//! # fn example() -> core_transcode::Result<()> {
//! let native = SymphoniaDecoder::open_file("/path/to/song.flac", OutputSample::Pcm16)?;
//! let adapter = DecodeAdapter::new(Box::new(native))?;
//!
//! let mut buf = vec![0u8; 16 * 1024];
//! loop {
//!     let n = adapter.read(&mut buf)?;
//!     if n == 0 {
//!         break;
//!     }
//!     // consume buf[..n]
//! }
//! # Ok(())
//! # }
//! ```

mod adapter;

#[cfg(feature = "symphonia-backend")]
mod format_detector;

#[cfg(feature = "symphonia-backend")]
mod sample_converter;

#[cfg(feature = "symphonia-backend")]
mod symphonia;

pub use adapter::{DecodeAdapter, DecodeState};

#[cfg(feature = "symphonia-backend")]
pub use self::symphonia::SymphoniaDecoder;

#[cfg(feature = "symphonia-backend")]
pub use format_detector::{FormatDetector, SourceCodec};

#[cfg(feature = "symphonia-backend")]
pub use sample_converter::{OutputSample, SampleConverter};

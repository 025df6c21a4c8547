//! # Core Transcode Module
//!
//! Streaming adapters that present native media transforms as plain byte
//! streams.
//!
//! ## Overview
//!
//! Native codec layers work in discrete units: a decoder hands out decoded
//! frames with timestamps, an encoder accepts timestamped samples, and a
//! conversion stream works on fixed-size aligned blocks. Callers usually want
//! a byte stream instead. This crate bridges the two:
//!
//! - [`DecodeAdapter`]: pull model. Repackages decoded units into arbitrary
//!   sized reads, tracks the byte position, and resynchronizes it from unit
//!   timestamps after a seek.
//! - [`ChunkedEncodeAdapter`]: push model. Slices writes into bounded,
//!   duration-stamped chunks for a sample sink.
//! - [`FormatConversionBuffer`] / [`FormatConverter`]: block-aligned feeding
//!   of a fixed-size conversion stream.
//! - [`pipeline`]: whole-stream helpers chaining the above.
//!
//! Native collaborators are the traits in `bridge-traits`. The
//! `symphonia-backend` feature (on by default) provides a pure-Rust decoder
//! implementing them.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use core_transcode::{pipeline, ChunkedEncodeAdapter, DecodeAdapter};
//!
//! let source = DecodeAdapter::new(native_decoder)?;
//! let sink = ChunkedEncodeAdapter::new(native_sink, source.format())?;
//! let bytes = pipeline::encode_whole_source(&source, &sink)?;
//! ```

pub mod config;
pub mod conversion;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod pipeline;
pub mod position;
pub mod traits;

pub use config::{ConversionConfig, DecoderConfig, EncoderConfig, TranscodeConfig};
pub use conversion::{ConversionResult, FormatConversionBuffer, FormatConverter};
pub use cursor::FrameBufferCursor;
pub use decoder::{DecodeAdapter, DecodeState};
pub use encoder::ChunkedEncodeAdapter;
pub use error::{Result, TranscodeError};
pub use position::{PositionAccuracy, PositionTracker};
pub use traits::{StreamLength, WaveSink, WaveSource};

#[cfg(feature = "symphonia-backend")]
pub use decoder::{OutputSample, SymphoniaDecoder};

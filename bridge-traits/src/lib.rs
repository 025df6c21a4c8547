//! # Native Bridge Traits
//!
//! Contract between the streaming adapters and the native codec layer.
//!
//! ## Overview
//!
//! The adapters in `core-transcode` never call a codec API directly. Each
//! native capability they consume is expressed as a trait here, and every
//! backend (a platform media framework, a block conversion driver, or a
//! pure-Rust decoder) ships an implementation of the traits it supports.
//!
//! ## Traits
//!
//! ### Codec transforms
//! - [`NativeDecoder`](codec::NativeDecoder) - Pull-model decoder producing timestamped units
//! - [`NativeSampleSink`](codec::NativeSampleSink) - Push-model encoder accepting stamped samples
//! - [`NativeBlockConverter`](codec::NativeBlockConverter) - Fixed-size block conversion stream
//!
//! ### Runtime
//! - [`NativeRuntime`](runtime::NativeRuntime) - Process-wide startup/shutdown hooks
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Data Types
//!
//! - [`AudioFormat`](format::AudioFormat) - Byte layout of a stream (`block_align`, byte rate)
//! - [`DecodedUnit`](codec::DecodedUnit) - One decoded chunk plus timestamp and status
//! - [`PropVariant`](attributes::PropVariant) - Tagged native attribute value
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type.
//! Implementations should convert raw native result codes with
//! [`BridgeError::native`] so the failing entry point is preserved.
//!
//! ## Thread Safety
//!
//! Codec traits require `Send`: an adapter may be moved to
//! a worker thread, and it serializes all calls behind its own lock.
//! `NativeRuntime` and `LoggerSink` are shared and require `Send + Sync`.

pub mod attributes;
pub mod codec;
pub mod error;
pub mod format;
pub mod log;
pub mod runtime;

pub use error::BridgeError;

// Re-export commonly used types
pub use attributes::{PresentationAttribute, PropVariant};
pub use codec::{
    BlockConversion, ConvertFlags, DecodedUnit, NativeBlockConverter, NativeDecoder,
    NativeSampleSink, UnitStatus,
};
pub use format::{AudioEncoding, AudioFormat, TICKS_PER_SECOND};
pub use log::{LogEntry, LogLevel, LoggerSink};
pub use runtime::{NativeRuntime, NoopRuntime};

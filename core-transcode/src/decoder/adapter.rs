//! # Pull-Model Decode Adapter
//!
//! Turns "give me N bytes" into as many "decode one unit" calls as needed.
//!
//! ```text
//! caller ── read(buf) ──▶ DecodeAdapter ── next_unit() ──▶ NativeDecoder
//!                           │  FrameBufferCursor (unit tail)
//!                           │  PositionTracker   (byte position, resync)
//! ```
//!
//! ## Read loop
//!
//! Pending bytes from the previous unit are served first. When the cursor is
//! empty the native decoder is asked for the next unit, until the request is
//! satisfied or the stream halts:
//!
//! - end of stream: the bytes copied so far are returned, later reads return 0
//!   without touching the native decoder;
//! - format change or native failure: if bytes were already copied in this
//!   call they are returned and the error is raised by the next call,
//!   otherwise the error is returned immediately.
//!
//! A seek discards buffered bytes, re-anchors the position from the next
//! unit's timestamp, and clears end-of-stream and fault conditions. A format
//! change is terminal for the adapter: the caller must open a new one for the
//! new format.

use crate::config::DecoderConfig;
use crate::cursor::FrameBufferCursor;
use crate::error::{Result, TranscodeError};
use crate::position::{nearest_block_offset, to_ticks, PositionAccuracy, PositionTracker};
use crate::traits::{StreamLength, WaveSource};
use bridge_traits::{
    AudioFormat, BridgeError, NativeDecoder, PresentationAttribute, PropVariant, UnitStatus,
};
use core_runtime::RuntimeGuard;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use tracing::{debug, error, info, instrument, warn};

/// Observable state of a [`DecodeAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Nothing buffered; the next read pulls a fresh unit. Initial state and
    /// state after a seek.
    Ready,
    /// Bytes of the current unit are pending.
    Draining,
    /// The current unit was fully consumed.
    AwaitingUnit,
    /// The native decoder reported end of stream.
    Ended,
    /// The native output format changed; the adapter is halted.
    FormatChanged,
    /// The native decoder failed; a seek restarts the stream.
    Faulted,
}

impl DecodeState {
    /// Returns `true` if reads can no longer produce data without a seek.
    pub fn is_halted(&self) -> bool {
        matches!(
            self,
            DecodeState::Ended | DecodeState::FormatChanged | DecodeState::Faulted
        )
    }
}

struct DecodeInner {
    decoder: Option<Box<dyn NativeDecoder>>,
    cursor: FrameBufferCursor,
    tracker: PositionTracker,
    state: DecodeState,
    /// Error raised by the previous call after it had already copied bytes.
    deferred: Option<TranscodeError>,
    fault: Option<String>,
    new_format: Option<AudioFormat>,
    units_decoded: u64,
    runtime: Option<RuntimeGuard>,
}

impl DecodeInner {
    /// Error to report for reads attempted in a halted state.
    fn halted_error(&self) -> Option<TranscodeError> {
        match self.state {
            DecodeState::FormatChanged => self
                .new_format
                .map(|new_format| TranscodeError::FormatChangedMidStream { new_format }),
            DecodeState::Faulted => Some(TranscodeError::NativeTransform(format!(
                "stream is faulted ({}); seek to recover",
                self.fault.as_deref().unwrap_or("unknown failure")
            ))),
            _ => None,
        }
    }

    fn fault(&mut self, message: String) {
        self.state = DecodeState::Faulted;
        self.fault = Some(message);
    }
}

/// Byte-stream reader over a frame-oriented native decoder.
pub struct DecodeAdapter {
    format: AudioFormat,
    length: StreamLength,
    can_seek: bool,
    config: DecoderConfig,
    inner: Mutex<DecodeInner>,
}

impl DecodeAdapter {
    /// Wrap `decoder` with the default configuration.
    pub fn new(decoder: Box<dyn NativeDecoder>) -> Result<Self> {
        Self::with_config(decoder, DecoderConfig::default())
    }

    /// Wrap `decoder`.
    ///
    /// Queries the output format (which must describe a usable byte layout),
    /// seek support and the total duration once.
    #[instrument(skip_all)]
    pub fn with_config(decoder: Box<dyn NativeDecoder>, config: DecoderConfig) -> Result<Self> {
        config.validate().map_err(TranscodeError::InvalidConfig)?;

        let format = decoder.output_format()?;
        format
            .validate()
            .map_err(|e| TranscodeError::Format(format!("decoder output: {}", e)))?;

        let can_seek = decoder.can_seek();
        let length = query_length(decoder.as_ref(), &format);

        info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            bits = format.bits_per_sample,
            can_seek,
            length = ?length,
            "Decode adapter opened"
        );

        Ok(Self {
            format,
            length,
            can_seek,
            config,
            inner: Mutex::new(DecodeInner {
                decoder: Some(decoder),
                cursor: FrameBufferCursor::new(),
                tracker: PositionTracker::new(format),
                state: DecodeState::Ready,
                deferred: None,
                fault: None,
                new_format: None,
                units_decoded: 0,
                runtime: None,
            }),
        })
    }

    /// Keep the native runtime alive for as long as this adapter holds its
    /// decoder.
    pub fn with_runtime(mut self, guard: RuntimeGuard) -> Self {
        self.inner.get_mut().runtime = Some(guard);
        self
    }

    /// Read up to `buf.len()` bytes of decoded audio.
    ///
    /// Returns 0 at end of stream or when `buf` is empty.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.decoder.is_none() {
            return Err(TranscodeError::Disposed);
        }
        if let Some(err) = inner.deferred.take() {
            return Err(err);
        }
        if inner.state == DecodeState::Ended {
            return Ok(0);
        }
        if let Some(err) = inner.halted_error() {
            return Err(err);
        }

        let mut copied = 0usize;
        let mut empty_units = 0u32;
        let mut halt: Option<TranscodeError> = None;

        while copied < buf.len() {
            if !inner.cursor.is_empty() {
                let n = inner.cursor.drain(&mut buf[copied..]);
                copied += n;
                inner.tracker.advance(n);
                continue;
            }

            let Some(decoder) = inner.decoder.as_mut() else {
                return Err(TranscodeError::Disposed);
            };

            let unit = match decoder.next_unit() {
                Ok(unit) => unit,
                Err(err) => {
                    error!("Native decoder failed: {}", err);
                    inner.fault(err.to_string());
                    halt = Some(TranscodeError::Bridge(err));
                    break;
                }
            };

            match unit.status {
                UnitStatus::Ok if unit.is_empty() => {
                    empty_units += 1;
                    if empty_units > self.config.max_empty_units {
                        let message =
                            format!("{} consecutive empty units from decoder", empty_units);
                        error!("{}", message);
                        inner.fault(message.clone());
                        halt = Some(TranscodeError::NativeTransform(message));
                        break;
                    }
                }
                UnitStatus::Ok => {
                    inner.units_decoded += 1;
                    debug!(
                        bytes = unit.len(),
                        timestamp = unit.timestamp,
                        "Decoded unit"
                    );
                    inner.tracker.observe_unit(unit.valid_timestamp());
                    inner.cursor.fill(unit.data)?;
                    empty_units = 0;
                }
                UnitStatus::EndOfStream => {
                    info!(
                        position = inner.tracker.position(),
                        units = inner.units_decoded,
                        "Decoder reached end of stream"
                    );
                    inner.state = DecodeState::Ended;
                    break;
                }
                UnitStatus::FormatChanged => {
                    match decoder.output_format() {
                        Ok(new_format) => {
                            warn!(
                                sample_rate = new_format.sample_rate,
                                channels = new_format.channels,
                                "Decoder output format changed mid-stream"
                            );
                            inner.state = DecodeState::FormatChanged;
                            inner.new_format = Some(new_format);
                            halt = Some(TranscodeError::FormatChangedMidStream { new_format });
                        }
                        Err(err) => {
                            error!("Format change announced but new format unavailable: {}", err);
                            inner.fault(err.to_string());
                            halt = Some(TranscodeError::Bridge(err));
                        }
                    }
                    break;
                }
                UnitStatus::Error => {
                    let message = "decoder reported an error unit".to_string();
                    error!("{}", message);
                    inner.fault(message.clone());
                    halt = Some(TranscodeError::NativeTransform(message));
                    break;
                }
            }
        }

        if !inner.state.is_halted() {
            inner.state = if inner.cursor.is_empty() {
                DecodeState::AwaitingUnit
            } else {
                DecodeState::Draining
            };
        }

        if let Some(err) = halt {
            if copied == 0 {
                return Err(err);
            }
            debug!(copied, "Deferring decoder error to the next read");
            inner.deferred = Some(err);
        }

        Ok(copied)
    }

    /// Bytes delivered so far, or the pending seek target.
    pub fn position(&self) -> u64 {
        self.inner.lock().tracker.position()
    }

    /// Seek to `position` bytes, rounded down to a whole sample frame.
    #[instrument(skip(self))]
    pub fn set_position(&self, position: u64) -> Result<()> {
        if !self.can_seek {
            return Err(TranscodeError::SeekUnsupported);
        }

        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.state == DecodeState::FormatChanged {
            if let Some(err) = inner.halted_error() {
                return Err(err);
            }
        }

        let Some(decoder) = inner.decoder.as_mut() else {
            return Err(TranscodeError::Disposed);
        };

        let block = self.format.block_align as u64;
        let aligned = position - position % block;
        let ticks = to_ticks(aligned, &self.format);

        decoder.seek(ticks).map_err(|err| {
            error!(ticks, "Native seek failed: {}", err);
            TranscodeError::Bridge(err)
        })?;

        inner.cursor.clear();
        inner.tracker.begin_seek(aligned);
        inner.state = DecodeState::Ready;
        inner.deferred = None;
        inner.fault = None;

        debug!(requested = position, aligned, ticks, "Seek issued");
        Ok(())
    }

    pub fn length(&self) -> StreamLength {
        self.length
    }

    pub fn can_seek(&self) -> bool {
        self.can_seek
    }

    /// Format of the bytes returned by [`read`](Self::read).
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn state(&self) -> DecodeState {
        self.inner.lock().state
    }

    pub fn position_accuracy(&self) -> PositionAccuracy {
        self.inner.lock().tracker.accuracy()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().decoder.is_none()
    }

    /// Release the native decoder and any buffered unit. Idempotent.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        if let Some(decoder) = inner.decoder.take() {
            drop(decoder);
            inner.cursor.clear();
            inner.deferred = None;
            info!(
                position = inner.tracker.position(),
                units = inner.units_decoded,
                "Decode adapter disposed"
            );
        }
        inner.runtime.take();
    }
}

/// Total stream length from the native duration attribute.
fn query_length(decoder: &dyn NativeDecoder, format: &AudioFormat) -> StreamLength {
    match decoder.presentation_attribute(PresentationAttribute::Duration) {
        Ok(value) => match value.as_i64() {
            Some(ticks) if ticks >= 0 => StreamLength::Fixed(nearest_block_offset(ticks, format)),
            _ if value == PropVariant::Empty => StreamLength::Unknown,
            _ => {
                warn!(
                    kind = value.type_name(),
                    "Duration attribute has an unexpected type; length unknown"
                );
                StreamLength::Unknown
            }
        },
        Err(BridgeError::AttributeNotFound(_)) => StreamLength::Unknown,
        Err(err) => {
            warn!("Duration query failed; length unknown: {}", err);
            StreamLength::Unknown
        }
    }
}

impl WaveSource for DecodeAdapter {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        DecodeAdapter::read(self, buf)
    }

    fn position(&self) -> u64 {
        DecodeAdapter::position(self)
    }

    fn set_position(&self, position: u64) -> Result<()> {
        DecodeAdapter::set_position(self, position)
    }

    fn length(&self) -> StreamLength {
        self.length
    }

    fn can_seek(&self) -> bool {
        self.can_seek
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}

impl io::Read for DecodeAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        DecodeAdapter::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Seek for DecodeAdapter {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => Some(offset),
            io::SeekFrom::Current(delta) => self.position().checked_add_signed(delta),
            io::SeekFrom::End(delta) => match self.length {
                StreamLength::Fixed(len) => len.checked_add_signed(delta),
                StreamLength::Unknown => {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        "stream length is unknown",
                    ))
                }
            },
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of stream")
        })?;

        DecodeAdapter::set_position(self, target)?;
        Ok(self.position())
    }
}

impl fmt::Debug for DecodeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("DecodeAdapter")
            .field("format", &self.format)
            .field("length", &self.length)
            .field("state", &inner.state)
            .field("position", &inner.tracker.position())
            .field("disposed", &inner.decoder.is_none())
            .finish()
    }
}

impl Drop for DecodeAdapter {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{error::Result as BridgeResult, DecodedUnit};
    use bytes::Bytes;
    use std::collections::VecDeque;

    /// Decoder that plays back a fixed script of units.
    struct ScriptedDecoder {
        format: AudioFormat,
        units: VecDeque<BridgeResult<DecodedUnit>>,
    }

    impl ScriptedDecoder {
        fn boxed(units: Vec<BridgeResult<DecodedUnit>>) -> Box<dyn NativeDecoder> {
            Box::new(Self {
                format: AudioFormat::cd_quality(),
                units: units.into(),
            })
        }
    }

    impl NativeDecoder for ScriptedDecoder {
        fn output_format(&self) -> BridgeResult<AudioFormat> {
            Ok(self.format)
        }

        fn next_unit(&mut self) -> BridgeResult<DecodedUnit> {
            self.units
                .pop_front()
                .unwrap_or_else(|| Ok(DecodedUnit::end_of_stream()))
        }

        fn seek(&mut self, _ticks: i64) -> BridgeResult<()> {
            Ok(())
        }

        fn can_seek(&self) -> bool {
            false
        }

        fn presentation_attribute(
            &self,
            attribute: PresentationAttribute,
        ) -> BridgeResult<PropVariant> {
            Err(BridgeError::AttributeNotFound(attribute.name().to_string()))
        }
    }

    fn unit(len: usize, fill: u8) -> BridgeResult<DecodedUnit> {
        Ok(DecodedUnit::new(Bytes::from(vec![fill; len]), 0))
    }

    #[test]
    fn test_empty_request_returns_zero() {
        let adapter = DecodeAdapter::new(ScriptedDecoder::boxed(vec![unit(8, 1)])).unwrap();
        assert_eq!(adapter.read(&mut []).unwrap(), 0);
        assert_eq!(adapter.state(), DecodeState::Ready);
    }

    #[test]
    fn test_state_follows_cursor() {
        let adapter = DecodeAdapter::new(ScriptedDecoder::boxed(vec![unit(8, 1)])).unwrap();
        let mut buf = [0u8; 4];

        assert_eq!(adapter.read(&mut buf).unwrap(), 4);
        assert_eq!(adapter.state(), DecodeState::Draining);

        assert_eq!(adapter.read(&mut buf).unwrap(), 4);
        assert_eq!(adapter.state(), DecodeState::AwaitingUnit);

        assert_eq!(adapter.read(&mut buf).unwrap(), 0);
        assert_eq!(adapter.state(), DecodeState::Ended);
        assert!(adapter.state().is_halted());
    }

    #[test]
    fn test_empty_units_are_skipped_within_bound() {
        let mut script: Vec<_> = (0..3).map(|_| unit(0, 0)).collect();
        script.push(unit(4, 9));
        let adapter = DecodeAdapter::new(ScriptedDecoder::boxed(script)).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(adapter.read(&mut buf).unwrap(), 4);
        assert_eq!(buf, [9; 4]);
    }

    #[test]
    fn test_too_many_empty_units_fault() {
        let script: Vec<_> = (0..5).map(|_| unit(0, 0)).collect();
        let config = DecoderConfig { max_empty_units: 3 };
        let adapter = DecodeAdapter::with_config(ScriptedDecoder::boxed(script), config).unwrap();

        let mut buf = [0u8; 4];
        assert!(matches!(
            adapter.read(&mut buf),
            Err(TranscodeError::NativeTransform(_))
        ));
        assert_eq!(adapter.state(), DecodeState::Faulted);
    }

    #[test]
    fn test_invalid_output_format_rejected() {
        let decoder = Box::new(ScriptedDecoder {
            format: AudioFormat::cd_quality().with_block_align(0),
            units: VecDeque::new(),
        });
        assert!(matches!(
            DecodeAdapter::new(decoder),
            Err(TranscodeError::Format(_))
        ));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let adapter = DecodeAdapter::new(ScriptedDecoder::boxed(vec![unit(8, 1)])).unwrap();
        adapter.dispose();
        adapter.dispose();
        assert!(adapter.is_disposed());

        let mut buf = [0u8; 4];
        assert!(matches!(adapter.read(&mut buf), Err(TranscodeError::Disposed)));
    }

    #[test]
    fn test_seek_unsupported_has_no_effect() {
        let adapter = DecodeAdapter::new(ScriptedDecoder::boxed(vec![unit(8, 1)])).unwrap();
        let mut buf = [0u8; 4];
        adapter.read(&mut buf).unwrap();

        assert!(matches!(
            adapter.set_position(0),
            Err(TranscodeError::SeekUnsupported)
        ));
        assert_eq!(adapter.position(), 4);
        assert_eq!(adapter.state(), DecodeState::Draining);
    }
}

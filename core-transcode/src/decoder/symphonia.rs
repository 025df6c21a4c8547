//! # Symphonia Decoder Backend
//!
//! [`NativeDecoder`] implementation on top of the pure-Rust symphonia
//! library, for hosts without a platform media framework and for tests that
//! need real encoded input.

use crate::decoder::format_detector::{FormatDetector, SourceCodec};
use crate::decoder::sample_converter::{OutputSample, SampleConverter};
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::{
    AudioFormat, DecodedUnit, NativeDecoder, PresentationAttribute, PropVariant, TICKS_PER_SECOND,
};
use bytes::Bytes;
use core_runtime::logging::strip_path;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo, Track};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use tracing::{debug, error, info, instrument, warn};

/// Corrupt packets skipped in a row before a unit is reported as failed.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Decoder producing interleaved little-endian PCM from any container and
/// codec symphonia understands.
///
/// Unit timestamps come from packet timestamps in the track time base, so
/// the adapter can resynchronize its byte position after a seek.
pub struct SymphoniaDecoder {
    /// Format reader (demuxer) - owns the media source stream
    format_reader: Box<dyn FormatReader>,

    decoder: Box<dyn Decoder>,

    track_id: u32,

    time_base: Option<TimeBase>,

    codec: SourceCodec,

    output: OutputSample,

    /// Announced output format
    format: AudioFormat,

    duration_ticks: Option<i64>,

    seekable: bool,

    /// Unit decoded ahead of time while resolving the channel layout
    pending: Option<DecodedUnit>,

    /// False until the channel layout is known
    layout_resolved: bool,

    eof: bool,

    source_info: String,
}

impl SymphoniaDecoder {
    /// Open a file on disk, guessing the container from its extension.
    #[instrument(skip_all)]
    pub fn open_file(path: impl AsRef<Path>, output: OutputSample) -> Result<Self> {
        let path = path.as_ref();
        let source_info = strip_path(&path.to_string_lossy()).to_string();
        info!(file = %source_info, "Opening source file");

        let file = std::fs::File::open(path).map_err(|e| {
            error!("Failed to open source file: {}", e);
            BridgeError::Io(e)
        })?;

        let hint = FormatDetector::hint_from_path(path);
        Self::from_media_source(Box::new(file), hint, output, source_info)
    }

    /// Decode an in-memory encoded stream.
    pub fn from_bytes(data: Bytes, hint: Hint, output: OutputSample) -> Result<Self> {
        let cursor = Cursor::new(data);
        Self::from_media_source(Box::new(cursor), hint, output, "memory buffer".to_string())
    }

    /// Decode any symphonia media source.
    pub fn from_media_source(
        source: Box<dyn MediaSource>,
        hint: Hint,
        output: OutputSample,
        source_info: String,
    ) -> Result<Self> {
        let seekable = source.is_seekable();
        let stream = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!("Format probe failed: {}", e);
                BridgeError::InvalidFormat(format!("Failed to probe format: {}", e))
            })?;

        let format_reader = probed.format;

        let track = select_track(format_reader.tracks()).ok_or_else(|| {
            error!("No supported audio tracks found");
            BridgeError::InvalidFormat("No supported audio tracks".to_string())
        })?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        let codec = FormatDetector::detect_codec(params.codec);
        FormatDetector::validate_codec_support(codec)?;

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| BridgeError::InvalidFormat("Missing sample rate".to_string()))?;

        let time_base = params.time_base;
        let duration_ticks = duration_ticks(&params, sample_rate);

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| {
                error!("Failed to create decoder: {}", e);
                BridgeError::NotAvailable(format!("Failed to create codec decoder: {}", e))
            })?;

        // Channel layout may only be known after the first packet (AAC in MP4)
        let channels = params.channels.map(|ch| ch.count() as u16);

        let mut this = Self {
            format_reader,
            decoder,
            track_id,
            time_base,
            codec,
            output,
            format: output.format(sample_rate, channels.unwrap_or(2)),
            duration_ticks,
            seekable,
            pending: None,
            layout_resolved: channels.is_some(),
            eof: false,
            source_info,
        };

        if channels.is_none() {
            debug!("Channel count unknown, decoding first packet to resolve it");
            let first = this.decode_next()?;
            this.pending = Some(first);
        }

        info!(
            source = %this.source_info,
            codec = ?codec,
            sample_rate = this.format.sample_rate,
            channels = this.format.channels,
            bits = output.bits_per_sample(),
            "Symphonia decoder initialized"
        );

        Ok(this)
    }

    pub fn codec(&self) -> SourceCodec {
        self.codec
    }

    /// Re-select the audio track after the reader asked for a reset and
    /// rebuild the codec decoder, so `output_format` reports the new layout.
    fn reload_track(&mut self) -> Result<()> {
        let track = select_track(self.format_reader.tracks())
            .ok_or_else(|| BridgeError::InvalidFormat("No supported audio tracks".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let format = track_format(&params, self.output)?;
        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| {
                BridgeError::NotAvailable(format!("Failed to create codec decoder: {}", e))
            })?;

        self.track_id = track_id;
        self.time_base = params.time_base;
        self.codec = FormatDetector::detect_codec(params.codec);
        self.duration_ticks = duration_ticks(&params, format.sample_rate);
        self.decoder = decoder;
        self.format = format;
        self.layout_resolved = true;
        self.pending = None;
        Ok(())
    }

    fn packet_ticks(&self, ts: u64) -> i64 {
        match self.time_base {
            Some(tb) => time_base_to_ticks(ts, tb),
            None => frames_to_ticks(ts, self.format.sample_rate),
        }
    }

    /// Read and decode the next packet of the selected track.
    ///
    /// Corrupt packets are skipped up to [`MAX_CONSECUTIVE_ERRORS`] times in a
    /// row before an error unit is returned.
    fn decode_next(&mut self) -> Result<DecodedUnit> {
        if self.eof {
            return Ok(DecodedUnit::end_of_stream());
        }

        let mut consecutive_errors = 0;

        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    return match self.reload_track() {
                        Ok(()) => {
                            warn!(
                                sample_rate = self.format.sample_rate,
                                channels = self.format.channels,
                                "Track list changed, reporting format change"
                            );
                            Ok(DecodedUnit::format_changed())
                        }
                        Err(e) => {
                            error!("Track list changed and could not be re-read: {}", e);
                            Ok(DecodedUnit::error())
                        }
                    };
                }
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream");
                    self.eof = true;
                    return Ok(DecodedUnit::end_of_stream());
                }
                Err(SymphoniaError::IoError(e)) => {
                    consecutive_errors += 1;
                    warn!(
                        "I/O error reading packet (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!("Too many consecutive I/O errors, giving up");
                        return Ok(DecodedUnit::error());
                    }
                    continue;
                }
                Err(e) => {
                    error!("Fatal format reader error: {}", e);
                    return Err(BridgeError::OperationFailed(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            while !self.format_reader.metadata().is_latest() {
                self.format_reader.metadata().pop();
            }

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let channels = spec.channels.count() as u16;
                    if !self.layout_resolved {
                        self.format = self.output.format(spec.rate, channels);
                        self.layout_resolved = true;
                    } else if spec.rate != self.format.sample_rate
                        || channels != self.format.channels
                    {
                        warn!(
                            rate = spec.rate,
                            channels, "Decoded signal diverges from announced format"
                        );
                        self.format = self.output.format(spec.rate, channels);
                        return Ok(DecodedUnit::format_changed());
                    }

                    let data = SampleConverter::to_interleaved_bytes(&decoded, self.output);
                    let timestamp = self.packet_ticks(packet.ts());
                    return Ok(DecodedUnit::new(data, timestamp));
                }
                Err(SymphoniaError::IoError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping corrupted packet (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!("Too many consecutive decode errors, stream may be corrupted");
                        return Ok(DecodedUnit::error());
                    }
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping packet with decode error (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!("Too many consecutive decode errors, codec may be incompatible");
                        return Ok(DecodedUnit::error());
                    }
                }
                Err(e) => {
                    error!("Fatal decode error: {}", e);
                    return Err(BridgeError::OperationFailed(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }
    }
}

impl NativeDecoder for SymphoniaDecoder {
    fn output_format(&self) -> Result<AudioFormat> {
        Ok(self.format)
    }

    fn next_unit(&mut self) -> Result<DecodedUnit> {
        if let Some(unit) = self.pending.take() {
            return Ok(unit);
        }
        self.decode_next()
    }

    fn seek(&mut self, ticks: i64) -> Result<()> {
        if !self.seekable {
            return Err(BridgeError::NotAvailable("Source is not seekable".to_string()));
        }

        let ticks = ticks.max(0);
        let time = Time::new(
            (ticks / TICKS_PER_SECOND) as u64,
            (ticks % TICKS_PER_SECOND) as f64 / TICKS_PER_SECOND as f64,
        );

        let seeked = self
            .format_reader
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time,
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| {
                error!("Seek failed: {}", e);
                BridgeError::OperationFailed(format!("Seek failed: {}", e))
            })?;

        self.decoder.reset();
        self.pending = None;
        self.eof = false;

        debug!(
            ticks,
            required_ts = seeked.required_ts,
            actual_ts = seeked.actual_ts,
            "Seek completed"
        );
        Ok(())
    }

    fn can_seek(&self) -> bool {
        self.seekable
    }

    fn presentation_attribute(&self, attribute: PresentationAttribute) -> Result<PropVariant> {
        match attribute {
            PresentationAttribute::Duration => self
                .duration_ticks
                .map(PropVariant::Int64)
                .ok_or_else(|| BridgeError::AttributeNotFound(attribute.name().to_string())),
            PresentationAttribute::MimeType => Ok(PropVariant::String(
                FormatDetector::codec_mime_type(self.codec).to_string(),
            )),
            PresentationAttribute::AverageBitrate => {
                Err(BridgeError::AttributeNotFound(attribute.name().to_string()))
            }
        }
    }
}

fn select_track(tracks: &[Track]) -> Option<&Track> {
    tracks.iter().find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
}

/// Output format announced for a track whose layout is fully described.
fn track_format(params: &CodecParameters, output: OutputSample) -> Result<AudioFormat> {
    let sample_rate = params
        .sample_rate
        .ok_or_else(|| BridgeError::InvalidFormat("Missing sample rate".to_string()))?;
    let channels = params
        .channels
        .map(|ch| ch.count() as u16)
        .ok_or_else(|| BridgeError::InvalidFormat("Missing channel layout".to_string()))?;
    Ok(output.format(sample_rate, channels))
}

fn duration_ticks(params: &CodecParameters, sample_rate: u32) -> Option<i64> {
    params.n_frames.map(|frames| match params.time_base {
        Some(tb) => time_base_to_ticks(frames, tb),
        None => frames_to_ticks(frames, sample_rate),
    })
}

fn time_base_to_ticks(ts: u64, tb: TimeBase) -> i64 {
    if tb.denom == 0 {
        return 0;
    }
    let ticks = ts as u128 * tb.numer as u128 * TICKS_PER_SECOND as u128 / tb.denom as u128;
    i64::try_from(ticks).unwrap_or(i64::MAX)
}

fn frames_to_ticks(frames: u64, sample_rate: u32) -> i64 {
    time_base_to_ticks(frames, TimeBase::new(1, sample_rate.max(1)))
}

//! Integration tests for the whole-stream pipeline helpers.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    AudioFormat, BlockConversion, BridgeError, ConvertFlags, DecodedUnit, NativeBlockConverter,
    NativeDecoder, NativeSampleSink, PresentationAttribute, PropVariant,
};
use bytes::Bytes;
use core_transcode::pipeline::{convert_and_encode, encode_whole_source};
use core_transcode::{
    ChunkedEncodeAdapter, DecodeAdapter, FormatConversionBuffer, Result, StreamLength,
    TranscodeError, WaveSink, WaveSource,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Fakes
// ============================================================================

/// In-memory source serving a fixed byte vector.
struct MemorySource {
    data: Vec<u8>,
    position: Mutex<usize>,
    format: AudioFormat,
}

impl MemorySource {
    fn new(data: Vec<u8>, format: AudioFormat) -> Self {
        Self {
            data,
            position: Mutex::new(0),
            format,
        }
    }
}

impl WaveSource for MemorySource {
    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut position = self.position.lock();
        let n = buf.len().min(self.data.len() - *position);
        buf[..n].copy_from_slice(&self.data[*position..*position + n]);
        *position += n;
        Ok(n)
    }

    fn position(&self) -> u64 {
        *self.position.lock() as u64
    }

    fn set_position(&self, position: u64) -> Result<()> {
        *self.position.lock() = (position as usize).min(self.data.len());
        Ok(())
    }

    fn length(&self) -> StreamLength {
        StreamLength::Fixed(self.data.len() as u64)
    }

    fn can_seek(&self) -> bool {
        true
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Sink collecting everything written to it.
struct CollectingSink {
    data: Mutex<Vec<u8>>,
    finished: AtomicBool,
    format: AudioFormat,
}

impl CollectingSink {
    fn new(format: AudioFormat) -> Self {
        Self {
            data: Mutex::new(Vec::new()),
            finished: AtomicBool::new(false),
            format,
        }
    }
}

impl WaveSink for CollectingSink {
    fn write(&self, buf: &[u8]) -> Result<()> {
        self.data.lock().extend_from_slice(buf);
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}

/// Averages stereo 16-bit frames into mono, optionally consuming only part
/// of each block.
struct DownmixConverter {
    max_frames_per_call: Option<usize>,
}

impl NativeBlockConverter for DownmixConverter {
    fn query_output_size(&self, input_bytes: usize) -> BridgeResult<usize> {
        Ok(input_bytes / 2)
    }

    fn prepare_header(&mut self, _source_len: usize, _destination_len: usize) -> BridgeResult<()> {
        Ok(())
    }

    fn convert_block(
        &mut self,
        source: &[u8],
        destination: &mut [u8],
        _flags: ConvertFlags,
    ) -> BridgeResult<BlockConversion> {
        let mut frames = source.len() / 4;
        if let Some(max) = self.max_frames_per_call {
            frames = frames.min(max);
        }
        for (i, frame) in source.chunks_exact(4).take(frames).enumerate() {
            let left = i16::from_le_bytes([frame[0], frame[1]]) as i32;
            let right = i16::from_le_bytes([frame[2], frame[3]]) as i32;
            let mono = ((left + right) / 2) as i16;
            destination[i * 2..i * 2 + 2].copy_from_slice(&mono.to_le_bytes());
        }
        Ok(BlockConversion {
            consumed: frames * 4,
            produced: frames * 2,
        })
    }

    fn unprepare_header(&mut self) -> BridgeResult<()> {
        Ok(())
    }

    fn close(&mut self) -> BridgeResult<()> {
        Ok(())
    }
}

/// Stereo frames where both channels carry the frame index, so the mono
/// downmix equals the index.
fn indexed_stereo(frames: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(frames * 4);
    for i in 0..frames {
        let sample = (i % 30_000) as i16;
        data.extend_from_slice(&sample.to_le_bytes());
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}

fn indexed_mono(frames: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        data.extend_from_slice(&((i % 30_000) as i16).to_le_bytes());
    }
    data
}

fn mono() -> AudioFormat {
    AudioFormat::pcm(44_100, 16, 1)
}

// ============================================================================
// encode_whole_source
// ============================================================================

#[test]
fn test_encode_whole_source_copies_everything() {
    let data: Vec<u8> = (0..1_764_000u32).map(|i| (i % 256) as u8).collect();
    let source = MemorySource::new(data.clone(), AudioFormat::cd_quality());
    let sink = CollectingSink::new(AudioFormat::cd_quality());

    let written = encode_whole_source(&source, &sink).unwrap();

    assert_eq!(written, 1_764_000);
    assert_eq!(*sink.data.lock(), data);
    assert!(sink.finished.load(Ordering::SeqCst));
}

#[test]
fn test_decode_to_encode_round_trip() {
    struct UnitDecoder {
        units: Vec<Bytes>,
    }

    impl NativeDecoder for UnitDecoder {
        fn output_format(&self) -> BridgeResult<AudioFormat> {
            Ok(AudioFormat::cd_quality())
        }

        fn next_unit(&mut self) -> BridgeResult<DecodedUnit> {
            if self.units.is_empty() {
                return Ok(DecodedUnit::end_of_stream());
            }
            Ok(DecodedUnit::new(self.units.remove(0), 0))
        }

        fn seek(&mut self, _ticks: i64) -> BridgeResult<()> {
            Err(BridgeError::NotAvailable("seek".to_string()))
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

    #[derive(Default)]
    struct Collected {
        data: Vec<u8>,
        finalized: bool,
    }

    struct SharedSink(Arc<Mutex<Collected>>);

    impl NativeSampleSink for SharedSink {
        fn accept_sample(&mut self, data: &[u8], _start: i64, _duration: i64) -> BridgeResult<()> {
            self.0.lock().data.extend_from_slice(data);
            Ok(())
        }

        fn queued_byte_count(&self) -> BridgeResult<u64> {
            Ok(0)
        }

        fn finalize(&mut self) -> BridgeResult<()> {
            self.0.lock().finalized = true;
            Ok(())
        }
    }

    let units: Vec<Bytes> = (0..20u8).map(|i| Bytes::from(vec![i; 44_100])).collect();
    let expected: Vec<u8> = units.iter().flat_map(|u| u.to_vec()).collect();

    let source = DecodeAdapter::new(Box::new(UnitDecoder { units })).unwrap();
    let collected = Arc::new(Mutex::new(Collected::default()));
    let encoder = ChunkedEncodeAdapter::new(
        Box::new(SharedSink(collected.clone())),
        source.format(),
    )
    .unwrap();

    let written = encode_whole_source(&source, &encoder).unwrap();

    assert_eq!(written, expected.len() as u64);
    let collected = collected.lock();
    assert_eq!(collected.data, expected);
    assert!(collected.finalized);
    assert!(encoder.is_finished());
}

// ============================================================================
// convert_and_encode
// ============================================================================

#[test]
fn test_convert_and_encode_downmixes() {
    let frames = 100_000;
    let mut data = indexed_stereo(frames);
    // Stray bytes that never complete a frame
    data.extend_from_slice(&[9, 9]);

    let source = MemorySource::new(data, AudioFormat::cd_quality());
    let converter = FormatConversionBuffer::new(
        Box::new(DownmixConverter {
            max_frames_per_call: None,
        }),
        AudioFormat::cd_quality(),
    )
    .unwrap();
    let sink = CollectingSink::new(mono());

    let written = convert_and_encode(&source, &converter, &sink).unwrap();

    assert_eq!(written, (frames * 2) as u64);
    assert_eq!(*sink.data.lock(), indexed_mono(frames));
    assert!(sink.finished.load(Ordering::SeqCst));
}

#[test]
fn test_convert_and_encode_carries_unconsumed_bytes() {
    let frames = 50_000;
    let source = MemorySource::new(indexed_stereo(frames), AudioFormat::cd_quality());
    let converter = FormatConversionBuffer::new(
        Box::new(DownmixConverter {
            max_frames_per_call: Some(7_000),
        }),
        AudioFormat::cd_quality(),
    )
    .unwrap();
    let sink = CollectingSink::new(mono());

    convert_and_encode(&source, &converter, &sink).unwrap();

    assert_eq!(*sink.data.lock(), indexed_mono(frames));
}

#[test]
fn test_convert_and_encode_rejects_format_mismatch() {
    let source = MemorySource::new(vec![0u8; 64], mono());
    let converter = FormatConversionBuffer::new(
        Box::new(DownmixConverter {
            max_frames_per_call: None,
        }),
        AudioFormat::cd_quality(),
    )
    .unwrap();
    let sink = CollectingSink::new(mono());

    let err = convert_and_encode(&source, &converter, &sink).unwrap_err();
    assert!(matches!(err, TranscodeError::Format(_)));
    assert!(!sink.finished.load(Ordering::SeqCst));
}

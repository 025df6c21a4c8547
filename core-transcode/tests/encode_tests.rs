//! Integration tests for the push-model encode adapter.

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{AudioFormat, BridgeError, NativeSampleSink, NoopRuntime, TICKS_PER_SECOND};
use core_runtime::RuntimeLifecycle;
use core_transcode::{ChunkedEncodeAdapter, EncoderConfig, TranscodeError, WaveSink};
use mockall::{mock, Sequence};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
struct Sample {
    data: Vec<u8>,
    start: i64,
    duration: i64,
}

#[derive(Default)]
struct SinkLog {
    samples: Vec<Sample>,
    finalized: u32,
}

/// Sink that records every sample and accepts them immediately.
struct RecordingSink {
    log: Arc<Mutex<SinkLog>>,
    reject_after: Option<usize>,
}

impl NativeSampleSink for RecordingSink {
    fn accept_sample(&mut self, data: &[u8], start: i64, duration: i64) -> BridgeResult<()> {
        let mut log = self.log.lock();
        if self.reject_after == Some(log.samples.len()) {
            return Err(BridgeError::native("WriteSample", -2));
        }
        log.samples.push(Sample {
            data: data.to_vec(),
            start,
            duration,
        });
        Ok(())
    }

    fn queued_byte_count(&self) -> BridgeResult<u64> {
        Ok(0)
    }

    fn finalize(&mut self) -> BridgeResult<()> {
        self.log.lock().finalized += 1;
        Ok(())
    }
}

mock! {
    pub Sink {}

    impl NativeSampleSink for Sink {
        fn accept_sample(&mut self, data: &[u8], start_ticks: i64, duration_ticks: i64) -> BridgeResult<()>;
        fn queued_byte_count(&self) -> BridgeResult<u64>;
        fn finalize(&mut self) -> BridgeResult<()>;
    }
}

fn recording_adapter() -> (ChunkedEncodeAdapter, Arc<Mutex<SinkLog>>) {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let sink = RecordingSink {
        log: log.clone(),
        reject_after: None,
    };
    let adapter = ChunkedEncodeAdapter::new(Box::new(sink), AudioFormat::cd_quality()).unwrap();
    (adapter, log)
}

fn fast_finish_config() -> EncoderConfig {
    EncoderConfig {
        finalize_poll_interval_ms: 1,
        finalize_max_backoff_ms: 4,
        finalize_timeout_ms: 50,
        ..EncoderConfig::default()
    }
}

// ============================================================================
// Chunking
// ============================================================================

#[test]
fn test_three_max_chunks_split_evenly() {
    let (adapter, log) = recording_adapter();
    let max = adapter.max_chunk_bytes();

    adapter.write(&vec![1u8; 3 * max]).unwrap();

    let log = log.lock();
    assert_eq!(log.samples.len(), 3);
    let four_seconds = 4 * TICKS_PER_SECOND;
    for (i, sample) in log.samples.iter().enumerate() {
        assert_eq!(sample.data.len(), max);
        assert_eq!(sample.duration, four_seconds);
        assert_eq!(sample.start, i as i64 * four_seconds);
    }
    assert_eq!(adapter.encoded_duration(), Duration::from_secs(12));
    assert_eq!(adapter.chunks_written(), 3);
}

#[test]
fn test_long_write_ends_with_short_chunk() {
    let (adapter, log) = recording_adapter();

    // 10 seconds of audio
    adapter.write(&vec![0u8; 1_764_000]).unwrap();

    let sizes: Vec<usize> = log.lock().samples.iter().map(|s| s.data.len()).collect();
    assert_eq!(sizes, vec![705_600, 705_600, 352_800]);
    assert_eq!(adapter.running_position(), 10 * TICKS_PER_SECOND);
}

#[test]
fn test_timeline_is_sum_of_chunk_durations() {
    let (adapter, log) = recording_adapter();

    for len in [1000usize, 3, 70_001, 9, 176_400, 4, 1_000_003] {
        adapter.write(&vec![7u8; len]).unwrap();
    }

    let log = log.lock();
    let mut expected_start = 0i64;
    for sample in &log.samples {
        assert_eq!(sample.data.len() % 4, 0);
        assert!(sample.data.len() <= adapter.max_chunk_bytes());
        assert_eq!(sample.start, expected_start);
        expected_start += sample.duration;
    }
    assert_eq!(adapter.running_position(), expected_start);

    let written: usize = log.samples.iter().map(|s| s.data.len()).sum();
    assert_eq!(written as u64, adapter.bytes_written());
    assert_eq!(written + adapter.pending_bytes(), 1000 + 3 + 70_001 + 9 + 176_400 + 4 + 1_000_003);
}

#[test]
fn test_partial_frames_join_across_writes() {
    let (adapter, log) = recording_adapter();

    adapter.write(&[1, 2, 3, 4, 5]).unwrap();
    adapter.write(&[6, 7, 8]).unwrap();
    adapter.write(&[9]).unwrap();

    let log = log.lock();
    let data: Vec<Vec<u8>> = log.samples.iter().map(|s| s.data.clone()).collect();
    assert_eq!(data, vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
    assert_eq!(adapter.pending_bytes(), 1);
}

#[test]
fn test_empty_write_is_noop() {
    let (adapter, log) = recording_adapter();
    adapter.write(&[]).unwrap();
    assert!(log.lock().samples.is_empty());
}

#[test]
fn test_rejected_chunk_does_not_advance_timeline() {
    let log = Arc::new(Mutex::new(SinkLog::default()));
    let sink = RecordingSink {
        log: log.clone(),
        reject_after: Some(1),
    };
    let adapter = ChunkedEncodeAdapter::new(Box::new(sink), AudioFormat::cd_quality()).unwrap();
    let max = adapter.max_chunk_bytes();

    let err = adapter.write(&vec![0u8; 2 * max]).unwrap_err();
    assert!(matches!(err, TranscodeError::Bridge(BridgeError::NativeCall { .. })));
    assert_eq!(adapter.chunks_written(), 1);
    assert_eq!(adapter.running_position(), 4 * TICKS_PER_SECOND);
}

#[test]
fn test_failed_write_discards_partial_frame() {
    let accepted = Arc::new(Mutex::new(Vec::<Vec<u8>>::new()));
    let seen = accepted.clone();
    let mut calls = 0;
    let mut sink = MockSink::new();
    sink.expect_accept_sample().returning(move |data, _, _| {
        calls += 1;
        if calls == 2 {
            return Err(BridgeError::native("WriteSample", -2));
        }
        seen.lock().push(data.to_vec());
        Ok(())
    });
    sink.expect_queued_byte_count().returning(|| Ok(0));
    sink.expect_finalize().returning(|| Ok(()));

    let adapter = ChunkedEncodeAdapter::new(Box::new(sink), AudioFormat::cd_quality()).unwrap();
    let max = adapter.max_chunk_bytes();

    let mut buf = vec![0u8; 2 * max + 2];
    buf[2 * max..].copy_from_slice(&[0xEE, 0xEE]);
    assert!(adapter.write(&buf).is_err());
    assert_eq!(adapter.pending_bytes(), 0);

    adapter.write(&[0x11, 0x22, 0x33, 0x44]).unwrap();
    let accepted = accepted.lock();
    assert_eq!(accepted.len(), 2);
    assert_eq!(accepted[1], vec![0x11, 0x22, 0x33, 0x44]);
}

#[test]
fn test_std_io_write() {
    let (mut adapter, log) = recording_adapter();
    adapter.write_all(&[0u8; 4096]).unwrap();
    adapter.flush().unwrap();
    assert_eq!(log.lock().samples.len(), 1);
}

// ============================================================================
// Finish
// ============================================================================

#[test]
fn test_finish_waits_for_queue_then_finalizes() {
    let mut seq = Sequence::new();
    let mut sink = MockSink::new();
    sink.expect_accept_sample().times(1).returning(|_, _, _| Ok(()));
    sink.expect_queued_byte_count()
        .times(2)
        .in_sequence(&mut seq)
        .returning(|| Ok(4000));
    sink.expect_queued_byte_count()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(0));
    sink.expect_finalize()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(()));

    let adapter =
        ChunkedEncodeAdapter::with_config(Box::new(sink), AudioFormat::cd_quality(), fast_finish_config())
            .unwrap();
    adapter.write(&[0u8; 400]).unwrap();
    adapter.finish().unwrap();
    adapter.finish().unwrap();
    assert!(adapter.is_finished());
}

#[test]
fn test_finish_forces_finalize_after_timeout() {
    let mut sink = MockSink::new();
    sink.expect_accept_sample().returning(|_, _, _| Ok(()));
    sink.expect_queued_byte_count().returning(|| Ok(1));
    sink.expect_finalize().times(1).returning(|| Ok(()));

    let adapter =
        ChunkedEncodeAdapter::with_config(Box::new(sink), AudioFormat::cd_quality(), fast_finish_config())
            .unwrap();
    adapter.write(&[0u8; 400]).unwrap();

    let started = Instant::now();
    adapter.finish().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_finish_skips_finalize_when_nothing_written() {
    let mut sink = MockSink::new();
    sink.expect_queued_byte_count().returning(|| Ok(0));
    sink.expect_finalize().times(0);

    let adapter = ChunkedEncodeAdapter::new(Box::new(sink), AudioFormat::cd_quality()).unwrap();
    adapter.finish().unwrap();
}

#[test]
fn test_finish_drops_incomplete_frame() {
    let (adapter, log) = recording_adapter();
    adapter.write(&[0u8; 10]).unwrap();
    assert_eq!(adapter.pending_bytes(), 2);

    adapter.finish().unwrap();
    assert_eq!(adapter.pending_bytes(), 0);
    assert_eq!(log.lock().finalized, 1);
    assert!(matches!(adapter.write(&[0u8; 4]), Err(TranscodeError::Disposed)));
}

#[test]
fn test_finalize_failure_is_reported_once() {
    let mut sink = MockSink::new();
    sink.expect_accept_sample().returning(|_, _, _| Ok(()));
    sink.expect_queued_byte_count().returning(|| Ok(0));
    sink.expect_finalize()
        .times(1)
        .returning(|| Err(BridgeError::OperationFailed("finalize".to_string())));

    let adapter = ChunkedEncodeAdapter::new(Box::new(sink), AudioFormat::cd_quality()).unwrap();
    adapter.write(&[0u8; 4]).unwrap();

    assert!(adapter.finish().is_err());
    assert!(adapter.finish().is_ok());
}

#[test]
fn test_wave_sink_contract() {
    let (adapter, log) = recording_adapter();
    let sink: &dyn WaveSink = &adapter;

    sink.write(&[0u8; 176_400]).unwrap();
    sink.finish().unwrap();

    assert_eq!(sink.format(), AudioFormat::cd_quality());
    assert_eq!(log.lock().samples[0].duration, TICKS_PER_SECOND);
}

#[test]
fn test_runtime_released_at_finish() {
    let lifecycle = RuntimeLifecycle::new(Arc::new(NoopRuntime));
    let (adapter, _log) = recording_adapter();
    let adapter = adapter.with_runtime(lifecycle.acquire().unwrap());

    assert_eq!(lifecycle.active_guards(), 1);
    adapter.finish().unwrap();
    assert_eq!(lifecycle.active_guards(), 0);
}

#[test]
fn test_invalid_config_rejected() {
    let sink = RecordingSink {
        log: Arc::new(Mutex::new(SinkLog::default())),
        reject_after: None,
    };
    let config = EncoderConfig {
        max_chunk_seconds: 0,
        ..EncoderConfig::default()
    };
    assert!(matches!(
        ChunkedEncodeAdapter::with_config(Box::new(sink), AudioFormat::cd_quality(), config),
        Err(TranscodeError::InvalidConfig(_))
    ));
}

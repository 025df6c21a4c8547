//! # Push-Model Encode Adapter
//!
//! Slices arbitrary writes into bounded, duration-stamped chunks for a native
//! sample sink.
//!
//! Every chunk handed to the sink is a whole number of sample frames and at
//! most `max_chunk_seconds` of audio. Each chunk is stamped with the running
//! presentation position and its own duration; the position advances by that
//! duration once the sink accepts the chunk, so the stamped timeline is the
//! exact sum of chunk durations.
//!
//! Bytes that do not complete a sample frame are held back and prefixed to
//! the next write.

use crate::config::EncoderConfig;
use crate::error::{Result, TranscodeError};
use crate::position::to_ticks;
use crate::traits::WaveSink;
use bridge_traits::{AudioFormat, NativeSampleSink, TICKS_PER_SECOND};
use core_runtime::RuntimeGuard;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

struct EncodeInner {
    sink: Option<Box<dyn NativeSampleSink>>,
    /// Presentation position of the next chunk, in ticks.
    running_position: i64,
    /// Leading bytes of an incomplete sample frame.
    carry: Vec<u8>,
    chunks_written: u64,
    bytes_written: u64,
    finished: bool,
    runtime: Option<RuntimeGuard>,
}

/// Byte-stream writer over a sample-oriented native encoder.
pub struct ChunkedEncodeAdapter {
    format: AudioFormat,
    config: EncoderConfig,
    max_chunk_bytes: usize,
    inner: Mutex<EncodeInner>,
}

impl ChunkedEncodeAdapter {
    /// Wrap `sink`, which expects input in `format`.
    pub fn new(sink: Box<dyn NativeSampleSink>, format: AudioFormat) -> Result<Self> {
        Self::with_config(sink, format, EncoderConfig::default())
    }

    #[instrument(skip(sink, config), fields(sample_rate = format.sample_rate))]
    pub fn with_config(
        sink: Box<dyn NativeSampleSink>,
        format: AudioFormat,
        config: EncoderConfig,
    ) -> Result<Self> {
        config.validate().map_err(TranscodeError::InvalidConfig)?;
        format
            .validate()
            .map_err(|e| TranscodeError::Format(format!("encoder input: {}", e)))?;

        let per_chunk = format
            .bytes_per_second()
            .saturating_mul(config.max_chunk_seconds as u64);
        let per_chunk = usize::try_from(per_chunk).unwrap_or(usize::MAX);
        let max_chunk_bytes = format
            .align_down(per_chunk)
            .max(format.block_align as usize);

        info!(max_chunk_bytes, "Encode adapter opened");

        Ok(Self {
            format,
            config,
            max_chunk_bytes,
            inner: Mutex::new(EncodeInner {
                sink: Some(sink),
                running_position: 0,
                carry: Vec::new(),
                chunks_written: 0,
                bytes_written: 0,
                finished: false,
                runtime: None,
            }),
        })
    }

    /// Keep the native runtime alive until the sink is released.
    pub fn with_runtime(mut self, guard: RuntimeGuard) -> Self {
        self.inner.get_mut().runtime = Some(guard);
        self
    }

    /// Hand all of `buf` to the sink in bounded chunks.
    pub fn write(&self, buf: &[u8]) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.finished {
            return Err(TranscodeError::Disposed);
        }
        let Some(sink) = inner.sink.as_mut() else {
            return Err(TranscodeError::Disposed);
        };
        if buf.is_empty() {
            return Ok(());
        }

        let data: Cow<'_, [u8]> = if inner.carry.is_empty() {
            Cow::Borrowed(buf)
        } else {
            let mut joined = std::mem::take(&mut inner.carry);
            joined.extend_from_slice(buf);
            Cow::Owned(joined)
        };

        let aligned = self.format.align_down(data.len());

        for chunk in data[..aligned].chunks(self.max_chunk_bytes) {
            let duration = to_ticks(chunk.len() as u64, &self.format);

            sink.accept_sample(chunk, inner.running_position, duration)
                .map_err(|err| {
                    error!(
                        start = inner.running_position,
                        bytes = chunk.len(),
                        "Sink rejected sample: {}",
                        err
                    );
                    TranscodeError::Bridge(err)
                })?;

            debug!(
                start = inner.running_position,
                duration,
                bytes = chunk.len(),
                "Chunk written"
            );

            inner.running_position += duration;
            inner.chunks_written += 1;
            inner.bytes_written += chunk.len() as u64;
        }

        // Only a fully accepted buffer leaves its partial frame for the next write
        inner.carry.extend_from_slice(&data[aligned..]);
        Ok(())
    }

    /// Drain the sink queue, finalize, and release the sink. Idempotent.
    ///
    /// The sink is finalized only if it received or still holds data.
    #[instrument(skip(self))]
    pub fn finish(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.finished {
            return Ok(());
        }
        inner.finished = true;

        let Some(mut sink) = inner.sink.take() else {
            return Ok(());
        };

        if !inner.carry.is_empty() {
            warn!(
                bytes = inner.carry.len(),
                "Dropping incomplete sample frame at finish"
            );
            inner.carry.clear();
        }

        let queued = self.wait_for_queue(&*sink);
        let result = if inner.bytes_written > 0 || queued > 0 {
            sink.finalize().map_err(|err| {
                error!("Sink finalize failed: {}", err);
                TranscodeError::Bridge(err)
            })
        } else {
            debug!("Nothing written, skipping finalize");
            Ok(())
        };

        drop(sink);
        inner.runtime.take();

        info!(
            chunks = inner.chunks_written,
            bytes = inner.bytes_written,
            duration_ticks = inner.running_position,
            "Encode adapter finished"
        );
        result
    }

    /// Poll the sink queue with exponential backoff until it drains or the
    /// finalize timeout passes. Returns the queue size seen on the first poll.
    fn wait_for_queue(&self, sink: &dyn NativeSampleSink) -> u64 {
        let initial = match sink.queued_byte_count() {
            Ok(queued) => queued,
            Err(err) => {
                warn!("Cannot query sink queue, finalizing immediately: {}", err);
                return 0;
            }
        };

        let deadline = Instant::now() + self.config.finalize_timeout();
        let mut interval = self.config.poll_interval();
        let mut queued = initial;

        while queued > 0 {
            let now = Instant::now();
            if now >= deadline {
                warn!(queued, "Sink queue did not drain in time, forcing finalize");
                break;
            }
            thread::sleep(interval.min(deadline - now));
            interval = (interval * 2).min(self.config.max_backoff());

            queued = match sink.queued_byte_count() {
                Ok(queued) => queued,
                Err(err) => {
                    warn!("Cannot query sink queue: {}", err);
                    break;
                }
            };
        }

        initial
    }

    /// Total presentation time handed to the sink.
    pub fn encoded_duration(&self) -> Duration {
        let ticks = self.inner.lock().running_position.max(0) as u64;
        let nanos_per_tick = 1_000_000_000 / TICKS_PER_SECOND as u64;
        Duration::from_nanos(ticks * nanos_per_tick)
    }

    /// Presentation position of the next chunk, in ticks.
    pub fn running_position(&self) -> i64 {
        self.inner.lock().running_position
    }

    pub fn chunks_written(&self) -> u64 {
        self.inner.lock().chunks_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.inner.lock().bytes_written
    }

    /// Bytes of an incomplete sample frame waiting for the next write.
    pub fn pending_bytes(&self) -> usize {
        self.inner.lock().carry.len()
    }

    pub fn max_chunk_bytes(&self) -> usize {
        self.max_chunk_bytes
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn is_finished(&self) -> bool {
        self.inner.lock().finished
    }
}

impl WaveSink for ChunkedEncodeAdapter {
    fn write(&self, buf: &[u8]) -> Result<()> {
        ChunkedEncodeAdapter::write(self, buf)
    }

    fn finish(&self) -> Result<()> {
        ChunkedEncodeAdapter::finish(self)
    }

    fn format(&self) -> AudioFormat {
        self.format
    }
}

impl io::Write for ChunkedEncodeAdapter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ChunkedEncodeAdapter::write(self, buf)?;
        Ok(buf.len())
    }

    /// Chunks are pushed synchronously, so there is nothing to flush.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for ChunkedEncodeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ChunkedEncodeAdapter")
            .field("format", &self.format)
            .field("max_chunk_bytes", &self.max_chunk_bytes)
            .field("running_position", &inner.running_position)
            .field("chunks_written", &inner.chunks_written)
            .field("finished", &inner.finished)
            .finish()
    }
}

impl Drop for ChunkedEncodeAdapter {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            error!("Finishing encoder on drop failed: {}", err);
        }
    }
}

//! Whole-stream helpers that drive a source into a sink.

use crate::conversion::FormatConversionBuffer;
use crate::error::{Result, TranscodeError};
use crate::traits::{WaveSink, WaveSource};
use tracing::{debug, info, instrument};

/// Seconds of audio moved per read.
const READ_SECONDS: u64 = 4;

/// Read `source` to end of stream, writing every byte into `sink`, then
/// finish the sink. Returns the number of bytes written.
#[instrument(skip_all)]
pub fn encode_whole_source(source: &dyn WaveSource, sink: &dyn WaveSink) -> Result<u64> {
    let format = source.format();
    let per_read = usize::try_from(format.bytes_per_second() * READ_SECONDS).unwrap_or(usize::MAX);
    let mut buffer = vec![0u8; format.align_down(per_read).max(format.block_align as usize)];
    let mut written = 0u64;

    loop {
        let read = source.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        sink.write(&buffer[..read])?;
        written += read as u64;
        debug!(written, position = source.position(), "Encoding progress");
    }

    sink.finish()?;
    info!(bytes = written, "Source encoded");
    Ok(written)
}

/// Like [`encode_whole_source`], with `converter` applied to the source bytes
/// before they reach `sink`.
///
/// Source bytes the converter does not consume in one block are carried into
/// the next. A trailing fragment shorter than one sample frame is dropped.
/// Returns the number of converted bytes written.
#[instrument(skip_all)]
pub fn convert_and_encode(
    source: &dyn WaveSource,
    converter: &FormatConversionBuffer,
    sink: &dyn WaveSink,
) -> Result<u64> {
    if source.format() != converter.source_format() {
        return Err(TranscodeError::Format(format!(
            "source produces {:?} but converter expects {:?}",
            source.format(),
            converter.source_format()
        )));
    }

    let capacity = converter.source_capacity();
    let mut pending = vec![0u8; capacity];
    let mut filled = 0usize;
    let mut end_of_source = false;
    let mut written = 0u64;

    loop {
        while !end_of_source && filled < capacity {
            let read = source.read(&mut pending[filled..])?;
            if read == 0 {
                end_of_source = true;
            } else {
                filled += read;
            }
        }
        if filled == 0 {
            break;
        }

        let result = converter.convert(&pending[..filled], end_of_source)?;
        if result.has_error && result.destination_used == 0 {
            return Err(TranscodeError::NativeTransform(format!(
                "conversion of {} bytes failed",
                filled
            )));
        }

        if result.destination_used > 0 {
            let converted = converter.destination();
            sink.write(&converted)?;
            written += converted.len() as u64;
        }

        if result.source_used == 0 {
            if end_of_source {
                debug!(bytes = filled, "Dropping unconvertible tail");
                break;
            }
            return Err(TranscodeError::NativeTransform(
                "converter consumed no input".to_string(),
            ));
        }

        pending.copy_within(result.source_used..filled, 0);
        filled -= result.source_used;
        debug!(written, carried = filled, "Conversion progress");
    }

    sink.finish()?;
    info!(bytes = written, "Source converted and encoded");
    Ok(written)
}

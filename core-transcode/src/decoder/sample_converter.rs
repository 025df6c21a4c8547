//! # Sample Format Converter
//!
//! Turns symphonia's planar buffers into the interleaved little-endian byte
//! layout handed out by the decode adapter.

use bridge_traits::{AudioEncoding, AudioFormat};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;
use tracing::warn;

/// Byte layout of decoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputSample {
    /// 16-bit signed integer PCM
    #[default]
    Pcm16,
    /// 32-bit IEEE float PCM
    Float32,
}

impl OutputSample {
    pub fn bits_per_sample(&self) -> u16 {
        match self {
            OutputSample::Pcm16 => 16,
            OutputSample::Float32 => 32,
        }
    }

    /// Output format for a stream with the given rate and channel count.
    pub fn format(&self, sample_rate: u32, channels: u16) -> AudioFormat {
        match self {
            OutputSample::Pcm16 => AudioFormat::pcm(sample_rate, 16, channels),
            OutputSample::Float32 => AudioFormat::ieee_float(sample_rate, channels),
        }
    }

    pub fn encoding(&self) -> AudioEncoding {
        match self {
            OutputSample::Pcm16 => AudioEncoding::Pcm,
            OutputSample::Float32 => AudioEncoding::IeeeFloat,
        }
    }
}

/// Sample converter that normalizes decoded audio.
pub struct SampleConverter;

impl SampleConverter {
    /// Convert a decoded buffer to interleaved bytes in `output` layout.
    pub fn to_interleaved_bytes(buffer: &AudioBufferRef<'_>, output: OutputSample) -> Vec<u8> {
        // 16-bit sources pass through untouched
        if let (AudioBufferRef::S16(buf), OutputSample::Pcm16) = (buffer, output) {
            let samples = Self::convert_and_interleave(&**buf, |sample: i16| sample);
            let mut bytes = Vec::with_capacity(samples.len() * 2);
            for sample in samples {
                bytes.extend_from_slice(&sample.to_le_bytes());
            }
            return bytes;
        }

        let samples = Self::to_interleaved_f32(buffer);
        match output {
            OutputSample::Float32 => {
                let mut bytes = Vec::with_capacity(samples.len() * 4);
                for sample in samples {
                    bytes.extend_from_slice(&sample.to_le_bytes());
                }
                bytes
            }
            OutputSample::Pcm16 => {
                let mut bytes = Vec::with_capacity(samples.len() * 2);
                for sample in samples {
                    let value: i16 = sample.into_sample();
                    bytes.extend_from_slice(&value.to_le_bytes());
                }
                bytes
            }
        }
    }

    /// Convert a decoded buffer to interleaved f32 samples in [-1.0, 1.0].
    pub fn to_interleaved_f32(buffer: &AudioBufferRef<'_>) -> Vec<f32> {
        match buffer {
            AudioBufferRef::F32(buf) => Self::interleave_f32_planes(&**buf),
            AudioBufferRef::F64(buf) => {
                Self::convert_and_interleave(&**buf, |sample: f64| sample.into_sample())
            }
            AudioBufferRef::S32(buf) => {
                Self::convert_and_interleave(&**buf, |sample: i32| sample.into_sample())
            }
            AudioBufferRef::S16(buf) => {
                Self::convert_and_interleave(&**buf, |sample: i16| sample.into_sample())
            }
            AudioBufferRef::S24(buf) => {
                Self::convert_and_interleave(&**buf, |sample| IntoSample::into_sample(sample))
            }
            AudioBufferRef::S8(buf) => {
                Self::convert_and_interleave(&**buf, |sample: i8| sample.into_sample())
            }
            AudioBufferRef::U32(buf) => {
                Self::convert_and_interleave(&**buf, |sample: u32| sample.into_sample())
            }
            AudioBufferRef::U16(buf) => {
                Self::convert_and_interleave(&**buf, |sample: u16| sample.into_sample())
            }
            AudioBufferRef::U24(buf) => {
                Self::convert_and_interleave(&**buf, |sample| IntoSample::into_sample(sample))
            }
            AudioBufferRef::U8(buf) => {
                Self::convert_and_interleave(&**buf, |sample: u8| sample.into_sample())
            }
        }
    }

    /// Interleave an f32 planar buffer (LLLL...RRRR... to LRLR...).
    fn interleave_f32_planes(buf: &AudioBuffer<f32>) -> Vec<f32> {
        Self::convert_and_interleave(buf, |sample| sample)
    }

    fn convert_and_interleave<T, U>(buf: &AudioBuffer<T>, convert: fn(T) -> U) -> Vec<U>
    where
        T: Sample + Copy,
    {
        let num_channels = buf.spec().channels.count();
        let num_frames = buf.frames();
        let mut interleaved = Vec::with_capacity(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for chan_idx in 0..num_channels {
                interleaved.push(convert(buf.chan(chan_idx)[frame_idx]));
            }
        }

        interleaved
    }

    /// Count samples outside [-1.0, 1.0], warning if any are found.
    pub fn validate_samples(samples: &[f32]) -> usize {
        let clipped = samples.iter().filter(|&&s| !(-1.0..=1.0).contains(&s)).count();

        if clipped > 0 {
            warn!(
                "Detected {} clipped samples ({:.2}% of total)",
                clipped,
                (clipped as f64 / samples.len() as f64) * 100.0
            );
        }

        clipped
    }
}

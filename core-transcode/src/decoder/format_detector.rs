//! # Format Detection Module
//!
//! Probe hints and codec identification for the symphonia backend.

use bridge_traits::BridgeError;
use std::path::Path;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Codec of the compressed source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCodec {
    Mp3,
    Aac,
    Flac,
    Vorbis,
    Opus,
    Alac,
    /// Integer or float PCM in a WAV/AIFF container
    Pcm,
    Unknown,
}

/// Format detector for audio streams.
pub struct FormatDetector;

impl FormatDetector {
    /// Create a probe hint from a file path's extension.
    ///
    /// ```rust
    /// use core_transcode::decoder::FormatDetector;
    /// use std::path::Path;
    ///
    /// let hint = FormatDetector::hint_from_path(Path::new("/music/song.mp3"));
    /// ```
    pub fn hint_from_path(path: &Path) -> Hint {
        let mut hint = Hint::new();

        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            debug!("Setting probe hint extension: {}", extension);
            hint.with_extension(extension);
        } else {
            debug!("No file extension found, probe will auto-detect");
        }

        hint
    }

    /// Create a probe hint from an extension without the leading dot.
    pub fn hint_from_extension(extension: &str) -> Hint {
        let mut hint = Hint::new();
        hint.with_extension(extension.trim_start_matches('.'));
        hint
    }

    /// Create a probe hint from a MIME type such as `audio/mpeg`.
    pub fn hint_from_mime_type(mime_type: &str) -> Hint {
        let mut hint = Hint::new();
        debug!("Creating probe hint from MIME type: {}", mime_type);
        hint.mime_type(mime_type);
        hint
    }

    /// Identify the codec behind a symphonia codec type.
    pub fn detect_codec(codec_type: CodecType) -> SourceCodec {
        use symphonia::core::codecs::*;

        if codec_type == CODEC_TYPE_MP3 {
            SourceCodec::Mp3
        } else if codec_type == CODEC_TYPE_AAC {
            SourceCodec::Aac
        } else if codec_type == CODEC_TYPE_FLAC {
            SourceCodec::Flac
        } else if codec_type == CODEC_TYPE_VORBIS {
            SourceCodec::Vorbis
        } else if codec_type == CODEC_TYPE_OPUS {
            SourceCodec::Opus
        } else if codec_type == CODEC_TYPE_ALAC {
            SourceCodec::Alac
        } else if codec_type == CODEC_TYPE_PCM_S16LE
            || codec_type == CODEC_TYPE_PCM_S16BE
            || codec_type == CODEC_TYPE_PCM_S24LE
            || codec_type == CODEC_TYPE_PCM_S24BE
            || codec_type == CODEC_TYPE_PCM_S32LE
            || codec_type == CODEC_TYPE_PCM_S32BE
            || codec_type == CODEC_TYPE_PCM_F32LE
            || codec_type == CODEC_TYPE_PCM_F32BE
            || codec_type == CODEC_TYPE_PCM_F64LE
            || codec_type == CODEC_TYPE_PCM_F64BE
            || codec_type == CODEC_TYPE_PCM_U8
            || codec_type == CODEC_TYPE_PCM_S8
        {
            SourceCodec::Pcm
        } else {
            warn!("Unknown codec type: {:?}", codec_type);
            SourceCodec::Unknown
        }
    }

    /// Reject codecs the backend cannot decode.
    pub fn validate_codec_support(codec: SourceCodec) -> Result<(), BridgeError> {
        match codec {
            SourceCodec::Unknown => Err(BridgeError::NotAvailable(
                "No decoder for this codec".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Common file extension for a codec.
    pub fn codec_extension(codec: SourceCodec) -> &'static str {
        match codec {
            SourceCodec::Mp3 => "mp3",
            SourceCodec::Aac => "m4a",
            SourceCodec::Flac => "flac",
            SourceCodec::Vorbis => "ogg",
            SourceCodec::Opus => "opus",
            SourceCodec::Pcm => "wav",
            SourceCodec::Alac => "m4a",
            SourceCodec::Unknown => "bin",
        }
    }

    /// MIME type for a codec.
    pub fn codec_mime_type(codec: SourceCodec) -> &'static str {
        match codec {
            SourceCodec::Mp3 => "audio/mpeg",
            SourceCodec::Aac => "audio/mp4",
            SourceCodec::Flac => "audio/flac",
            SourceCodec::Vorbis => "audio/ogg",
            SourceCodec::Opus => "audio/opus",
            SourceCodec::Pcm => "audio/wav",
            SourceCodec::Alac => "audio/mp4",
            SourceCodec::Unknown => "application/octet-stream",
        }
    }
}

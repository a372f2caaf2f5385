use thiserror::Error;

/// Main error type for the transcoder
///
/// Every variant is fatal. The "not yet" conditions of the pipeline
/// (decoder/encoder needs input, sample buffer too short) are carried by the
/// signal enums in [`crate::transcode`], never by this type.
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] FfmpegError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Encoder not found: {0}")]
    EncoderNotFound(String),

    #[error("Encoder {codec} does not support sample rate {requested} (supported: {supported:?})")]
    UnsupportedSampleRate {
        codec: String,
        requested: u32,
        supported: Vec<u32>,
    },

    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),
}

/// FFmpeg-specific errors, one per collaborator operation
#[derive(Error, Debug)]
pub enum FfmpegError {
    #[error("FFmpeg initialization failed: {0}")]
    InitFailed(String),

    #[error("Failed to open input file: {0}")]
    OpenInput(String),

    #[error("Failed to create decoder: {0}")]
    DecoderCreate(String),

    #[error("Failed to create encoder: {0}")]
    EncoderCreate(String),

    #[error("Failed to create resampler: {0}")]
    ResamplerCreate(String),

    #[error("Failed to create muxer: {0}")]
    MuxerCreate(String),

    #[error("Failed to write header: {0}")]
    WriteHeader(String),

    #[error("Failed to write packet: {0}")]
    WritePacket(String),

    #[error("Failed to write trailer: {0}")]
    WriteTrailer(String),

    #[error("Failed to read packet: {0}")]
    ReadPacket(String),

    #[error("Failed to decode packet: {0}")]
    DecodePacket(String),

    #[error("Failed to receive frame: {0}")]
    ReceiveFrame(String),

    #[error("Failed to convert frame: {0}")]
    Convert(String),

    #[error("Failed to dequeue samples: {0}")]
    Dequeue(String),

    #[error("Failed to encode frame: {0}")]
    EncodeFrame(String),

    #[error("Failed to receive packet: {0}")]
    ReceivePacket(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TranscodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_error_names_operation() {
        let err: TranscodeError = FfmpegError::WritePacket("Invalid argument".into()).into();
        let text = err.to_string();
        assert!(text.contains("write packet"));
        assert!(text.contains("Invalid argument"));
    }

    #[test]
    fn test_unsupported_rate_lists_supported() {
        let err = TranscodeError::UnsupportedSampleRate {
            codec: "libopus".into(),
            requested: 44100,
            supported: vec![48000, 24000],
        };
        assert_eq!(
            err.to_string(),
            "Encoder libopus does not support sample rate 44100 (supported: [48000, 24000])"
        );
    }
}

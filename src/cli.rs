//! Command-line arguments
//!
//! `audio-transcode <INPUT> <OUTPUT> <CODEC> <SAMPLE_RATE> [CONFIG]`

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};

use crate::error::{Result, TranscodeError};

/// One transcode job as requested on the command line
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "audio-transcode", version, about, long_about = None)]
pub struct TranscodeRequest {
    /// Input media file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file; the container is picked from its extension
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// FFmpeg encoder name, e.g. `aac`, `libopus`, `flac`
    #[arg(value_name = "CODEC", value_parser = clap::builder::NonEmptyStringValueParser::new())]
    pub codec: String,

    /// Output sample rate in Hz
    #[arg(value_name = "SAMPLE_RATE", value_parser = clap::value_parser!(u32).range(1..))]
    pub sample_rate: u32,

    /// Optional TOML config file
    #[arg(value_name = "CONFIG")]
    pub config: Option<PathBuf>,
}

impl TranscodeRequest {
    /// Parse a full argument list, program name first.
    pub fn from_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(usage_error)
    }
}

/// Usage line printed when the arguments are wrong
pub fn usage() -> String {
    TranscodeRequest::command().render_usage().to_string()
}

/// First line of a clap error, without its `error: ` prefix
pub fn usage_error(err: clap::Error) -> TranscodeError {
    let text = err.to_string();
    let line = text.lines().next().unwrap_or_default();
    TranscodeError::Usage(line.trim_start_matches("error: ").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = "audio-transcode";

    #[test]
    fn test_parse_four_arguments() {
        let req =
            TranscodeRequest::from_args([PROGRAM, "in.flac", "out.m4a", "aac", "48000"]).unwrap();
        assert_eq!(req.input, PathBuf::from("in.flac"));
        assert_eq!(req.output, PathBuf::from("out.m4a"));
        assert_eq!(req.codec, "aac");
        assert_eq!(req.sample_rate, 48000);
        assert_eq!(req.config, None);
    }

    #[test]
    fn test_parse_optional_config() {
        let args = [PROGRAM, "a.wav", "b.ogg", "libvorbis", "44100", "t.toml"];
        let req = TranscodeRequest::from_args(args).unwrap();
        assert_eq!(req.config, Some(PathBuf::from("t.toml")));
    }

    #[test]
    fn test_too_few_arguments() {
        let args = [PROGRAM, "a.wav", "b.ogg", "libvorbis"];
        let err = TranscodeRequest::from_args(args).unwrap_err();
        assert!(matches!(err, TranscodeError::Usage(_)));
    }

    #[test]
    fn test_too_many_arguments() {
        let args = [PROGRAM, "a", "b", "aac", "48000", "c.toml", "extra"];
        let err = TranscodeRequest::from_args(args).unwrap_err();
        assert!(matches!(err, TranscodeError::Usage(_)));
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn test_bad_sample_rate() {
        for rate in ["fast", "0", "-44100", ""] {
            let err = TranscodeRequest::from_args([PROGRAM, "a", "b", "aac", rate]).unwrap_err();
            assert!(matches!(err, TranscodeError::Usage(_)), "rate {:?}", rate);
        }
    }

    #[test]
    fn test_empty_codec_rejected() {
        let err = TranscodeRequest::from_args([PROGRAM, "a", "b", "", "48000"]).unwrap_err();
        assert!(matches!(err, TranscodeError::Usage(_)));
    }

    #[test]
    fn test_usage_error_drops_prefix() {
        let err = TranscodeRequest::from_args([PROGRAM]).unwrap_err();
        assert!(!err.to_string().contains("error: "));
    }

    #[test]
    fn test_usage_names_program() {
        assert!(usage().starts_with("Usage: audio-transcode <INPUT>"));
    }

    #[test]
    fn test_command_definition() {
        TranscodeRequest::command().debug_assert();
    }
}

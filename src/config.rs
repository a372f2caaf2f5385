//! Transcoder configuration
//!
//! Everything the command line does not carry: encoder tuning, sample-rate
//! policy and logging. Loaded from an optional TOML file; every key has a
//! default so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TranscodeError};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "audio-transcode.toml";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is unset
    pub level: String,

    /// Output format (pretty, json)
    pub format: String,

    /// FFmpeg's own log level (quiet, error, warning, info, debug)
    pub ffmpeg_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            ffmpeg_level: "warning".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Whether structured JSON output was requested
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Transcoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Encoder bitrate in bps
    pub bit_rate: u64,

    /// Block size used when the encoder accepts any frame size (reports 0)
    pub fallback_frame_size: usize,

    /// Reject output sample rates the encoder does not list as supported
    pub strict_sample_rate: bool,

    /// Allow encoders FFmpeg marks as experimental
    pub experimental_codecs: bool,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            bit_rate: 128_000,
            fallback_frame_size: 1024,
            strict_sample_rate: true,
            experimental_codecs: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl TranscodeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: TranscodeConfig = toml::from_str(&content).map_err(|e| {
            TranscodeError::Config(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicit path must load. Without one, [`DEFAULT_CONFIG_FILE`] is
    /// used when it exists, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TranscodeError::Config(format!("cannot serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.fallback_frame_size == 0 {
            return Err(TranscodeError::Config(
                "fallback_frame_size must be greater than zero".into(),
            ));
        }
        if self.bit_rate == 0 {
            return Err(TranscodeError::Config(
                "bit_rate must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TranscodeConfig::default();
        assert_eq!(config.bit_rate, 128_000);
        assert_eq!(config.fallback_frame_size, 1024);
        assert!(config.strict_sample_rate);
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bit_rate = 96000\n\n[logging]\nformat = \"json\"").unwrap();

        let config = TranscodeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bit_rate, 96_000);
        assert_eq!(config.fallback_frame_size, 1024);
        assert!(config.logging.is_json());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bit_rate = \"fast\"").unwrap();

        let err = TranscodeConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, TranscodeError::Config(_)));
    }

    #[test]
    fn test_zero_frame_size_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fallback_frame_size = 0").unwrap();

        assert!(TranscodeConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let err = TranscodeConfig::load(Some(Path::new("/nonexistent/transcode.toml")));
        assert!(matches!(err, Err(TranscodeError::Io(_))));
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = TranscodeConfig {
            strict_sample_rate: false,
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let loaded = TranscodeConfig::from_file(&path).unwrap();
        assert!(!loaded.strict_sample_rate);
    }
}

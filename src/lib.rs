//! Single-stream audio transcoder
//!
//! Decodes the best audio stream of an input file, converts it to the
//! encoder's sample format and rate, re-encodes it in fixed-size blocks and
//! writes the result into a new container.

pub mod cli;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod transcode;

#[cfg(test)]
pub(crate) mod tests;

pub use cli::TranscodeRequest;
pub use config::TranscodeConfig;
pub use error::{FfmpegError, Result, TranscodeError};
pub use ffmpeg::version_info as ffmpeg_version_info;
pub use ffmpeg::{init, install_log_filter};
pub use transcode::{Pipeline, PipelineState, TranscodeSummary};

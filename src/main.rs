//! Audio transcoder command line
//!
//! `audio-transcode <INPUT> <OUTPUT> <CODEC> <SAMPLE_RATE> [CONFIG]`
//!
//! Progress lines go to stdout prefixed `INFO:`, failures to stderr prefixed
//! `ERROR:`. Diagnostic logging goes through `tracing` on stderr.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audio_transcode::config::{LoggingConfig, TranscodeConfig};
use audio_transcode::error::Result;
use audio_transcode::transcode::file;
use audio_transcode::{cli, ffmpeg, TranscodeRequest};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "audio-transcode";

fn main() -> ExitCode {
    let request = match TranscodeRequest::try_parse() {
        Ok(request) => request,
        Err(e) if !e.use_stderr() => {
            // --help and --version
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("ERROR: {}", cli::usage_error(e));
            eprintln!("{}", cli::usage());
            return ExitCode::FAILURE;
        }
    };

    let config = match TranscodeConfig::load(request.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging);
    tracing::debug!("{} v{} starting, {}", APP_NAME, VERSION, ffmpeg::version_info());

    match run(&request, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(request: &TranscodeRequest, config: &TranscodeConfig) -> Result<()> {
    ffmpeg::init()?;
    let level = ffmpeg::parse_log_level(&config.logging.ffmpeg_level).unwrap_or_else(|| {
        tracing::warn!(
            level = %config.logging.ffmpeg_level,
            "unknown FFmpeg log level, using warning"
        );
        ffmpeg_next::util::log::Level::Warning
    });
    ffmpeg::install_log_filter(level);

    let mut transcode = file::open(request, config)?;
    println!("INFO: Input file opened, decoder {}", transcode.decoder);
    println!("INFO: Output file opened, encoder {}", transcode.encoder);

    let summary = transcode.pipeline.run()?;
    println!("INFO: Decoded {} frames", summary.frames_decoded);
    println!("INFO: Encoded {} frames", summary.blocks_encoded);
    Ok(())
}

/// Initialize logging with tracing
///
/// `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("audio_transcode={},ffmpeg={}", logging.level, logging.level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

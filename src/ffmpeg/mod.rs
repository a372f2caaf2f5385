//! FFmpeg module - provides wrappers and utilities for FFmpeg library access
//!
//! This module handles:
//! - FFmpeg initialization
//! - Routing FFmpeg's own log output through `tracing`
//! - Raw-field helpers for codec capabilities `ffmpeg-next` does not expose

pub mod helpers;
pub mod utils;

pub use ffmpeg_next as ffmpeg;

use ffmpeg::util::log::Level;

/// Initialize the FFmpeg library.
///
/// Must be called once before any collaborator is opened.
pub fn init() -> Result<(), crate::error::FfmpegError> {
    ffmpeg::init().map_err(|e| {
        crate::error::FfmpegError::InitFailed(format!("ffmpeg::init() failed: {}", e))
    })?;

    tracing::debug!("FFmpeg initialized");

    Ok(())
}

/// Map a config level name onto FFmpeg's log level.
pub fn parse_log_level(name: &str) -> Option<Level> {
    match name.to_ascii_lowercase().as_str() {
        "quiet" => Some(Level::Quiet),
        "error" => Some(Level::Error),
        "warning" | "warn" => Some(Level::Warning),
        "info" => Some(Level::Info),
        "verbose" => Some(Level::Verbose),
        "debug" => Some(Level::Debug),
        "trace" => Some(Level::Trace),
        _ => None,
    }
}

/// Set FFmpeg's log level and install a callback that forwards its messages
/// to `tracing`, dropping known-noisy lines.
///
/// Must be called after `init()` and before any collaborator is opened,
/// because the log callback is global FFmpeg state.
pub fn install_log_filter(level: Level) {
    ffmpeg::util::log::set_level(level);
    // SAFETY: modifies global FFmpeg state; called once at startup before any
    // codec or format context exists.
    unsafe {
        ffmpeg::ffi::av_log_set_callback(Some(ffmpeg_log_callback));
    }
}

/// Messages that are expected for ordinary inputs and should be suppressed.
const SUPPRESSED_MESSAGES: &[&str] = &[
    "Estimating duration from bitrate, this may be inaccurate",
    "Could not update timestamps for skipped samples",
    "Could not update timestamps for discarded samples",
];

unsafe extern "C" fn ffmpeg_log_callback(
    avcl: *mut std::ffi::c_void,
    level: std::ffi::c_int,
    fmt: *const std::ffi::c_char,
    vl: ffmpeg::ffi::va_list,
) {
    use std::ffi::CStr;

    if level > unsafe { ffmpeg::ffi::av_log_get_level() } {
        return;
    }

    let mut buf = [0 as std::ffi::c_char; 1024];
    let mut print_prefix: std::ffi::c_int = 1;
    ffmpeg::ffi::av_log_format_line(
        avcl,
        level,
        fmt,
        vl,
        buf.as_mut_ptr(),
        buf.len() as std::ffi::c_int,
        &mut print_prefix,
    );

    let msg = CStr::from_ptr(buf.as_ptr()).to_string_lossy();
    let msg = msg.trim_end();
    if msg.is_empty() || SUPPRESSED_MESSAGES.iter().any(|s| msg.contains(s)) {
        return;
    }

    if level <= ffmpeg::ffi::AV_LOG_ERROR as std::ffi::c_int {
        tracing::error!(target: "ffmpeg", "{}", msg);
    } else if level <= ffmpeg::ffi::AV_LOG_WARNING as std::ffi::c_int {
        tracing::warn!(target: "ffmpeg", "{}", msg);
    } else {
        tracing::debug!(target: "ffmpeg", "{}", msg);
    }
}

/// Get the version information of the linked FFmpeg libraries.
pub fn version_info() -> String {
    let version = unsafe { ffmpeg::ffi::avcodec_version() };
    format!(
        "libavcodec {}.{}.{}",
        version >> 16,
        (version >> 8) & 0xff,
        version & 0xff
    )
}

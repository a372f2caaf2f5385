//! Safe wrappers around FFmpeg FFI calls.
//!
//! Every function in this module is `pub` and **safe** to call. All `unsafe`
//! blocks are contained here with explicit safety arguments.

use std::ffi::{c_int, c_void};
use std::ptr;

use ffmpeg_next as ffmpeg;
use ffmpeg::ffi;
use ffmpeg::util::channel_layout::ChannelLayout;
use ffmpeg::util::format::sample::Sample;

// ── Encoder capabilities ─────────────────────────────────────────────────────

/// Query one `AVCodecConfig` list for `codec`.
///
/// Returns `None` when FFmpeg reports no restriction (any value accepted) or
/// the query fails.
fn supported_config(
    codec: &ffmpeg::Codec,
    config: ffi::AVCodecConfig,
) -> Option<(*const c_void, usize)> {
    let mut configs: *const c_void = ptr::null();
    let mut count: c_int = 0;
    // SAFETY: `codec.as_ptr()` is a pointer into FFmpeg's static codec
    // registry and outlives this call. A null context is explicitly allowed.
    // The returned array is owned by FFmpeg (static or codec-lifetime data),
    // so callers only read it.
    let ret = unsafe {
        ffi::avcodec_get_supported_config(
            ptr::null(),
            codec.as_ptr(),
            config,
            0,
            &mut configs,
            &mut count,
        )
    };
    if ret < 0 || configs.is_null() || count <= 0 {
        return None;
    }
    Some((configs, count as usize))
}

/// Sample rates the encoder accepts, or `None` if it accepts any rate.
pub fn supported_sample_rates(codec: &ffmpeg::Codec) -> Option<Vec<u32>> {
    let (configs, count) =
        supported_config(codec, ffi::AVCodecConfig::AV_CODEC_CONFIG_SAMPLE_RATE)?;
    // SAFETY: for AV_CODEC_CONFIG_SAMPLE_RATE FFmpeg returns `count` ints.
    let rates = unsafe { std::slice::from_raw_parts(configs as *const c_int, count) };
    Some(rates.iter().filter(|r| **r > 0).map(|r| *r as u32).collect())
}

/// Sample formats the encoder accepts, in the encoder's order of preference.
pub fn supported_sample_formats(codec: &ffmpeg::Codec) -> Option<Vec<Sample>> {
    let (configs, count) =
        supported_config(codec, ffi::AVCodecConfig::AV_CODEC_CONFIG_SAMPLE_FORMAT)?;
    // SAFETY: for AV_CODEC_CONFIG_SAMPLE_FORMAT FFmpeg returns `count`
    // AVSampleFormat values.
    let formats =
        unsafe { std::slice::from_raw_parts(configs as *const ffi::AVSampleFormat, count) };
    Some(formats.iter().map(|f| Sample::from(*f)).collect())
}

// ── Codec-context field accessors ────────────────────────────────────────────

/// Allow encoders FFmpeg marks as experimental on this context.
///
/// `ffmpeg-next` does not expose `strict_std_compliance` through a setter.
pub fn set_experimental_compliance(context: &mut ffmpeg::codec::Context) {
    // SAFETY: `context.as_mut_ptr()` is valid for the lifetime of `context`;
    // `strict_std_compliance` is a plain int field.
    unsafe {
        (*context.as_mut_ptr()).strict_std_compliance =
            ffi::FF_COMPLIANCE_EXPERIMENTAL as c_int;
    }
}

/// Allocate a fresh `AVCodecParameters`, copy the encoder context into it,
/// and return it as a safe `ffmpeg::codec::Parameters`.
///
/// Used to describe the output stream to the muxer.
pub fn encoder_codec_parameters(
    encoder: &ffmpeg::codec::encoder::Audio,
) -> Result<ffmpeg::codec::Parameters, ffmpeg::Error> {
    use std::ops::Deref;
    use std::rc::Rc;
    let ctx: &ffmpeg::codec::Context = encoder.deref();
    // SAFETY: `avcodec_parameters_from_context` copies fields from a valid,
    // open encoder context into a freshly allocated, non-null `params`.
    // Ownership of `params` moves into the wrapper on success and is freed
    // here on failure.
    unsafe {
        let mut params = ffi::avcodec_parameters_alloc();
        if params.is_null() {
            return Err(ffmpeg::Error::Unknown);
        }
        let ret = ffi::avcodec_parameters_from_context(params, ctx.as_ptr());
        if ret < 0 {
            ffi::avcodec_parameters_free(&mut params);
            return Err(ffmpeg::Error::from(ret));
        }
        Ok(ffmpeg::codec::Parameters::wrap(
            params,
            None::<Rc<dyn std::any::Any>>,
        ))
    }
}

// ── Resampler access ─────────────────────────────────────────────────────────

/// Upper bound of output samples the resampler may produce for `in_samples`
/// more input samples, counting what it already buffers.
pub fn resampler_out_samples(
    context: &ffmpeg::software::resampling::Context,
    in_samples: usize,
) -> usize {
    // SAFETY: `context.as_ptr()` is valid for the lifetime of `context`.
    // `swr_get_out_samples` only reads counters despite its non-const
    // signature.
    let n = unsafe { ffi::swr_get_out_samples(context.as_ptr() as *mut _, in_samples as c_int) };
    n.max(0) as usize
}

// ── Sample FIFO ──────────────────────────────────────────────────────────────

/// Owned `AVAudioFifo`: a sample queue in one format that reads back exactly
/// the number of samples asked for.
pub struct AudioFifo {
    ptr: *mut ffi::AVAudioFifo,
    format: Sample,
}

impl AudioFifo {
    pub fn new(format: Sample, channels: u16) -> Result<Self, ffmpeg::Error> {
        // SAFETY: plain allocation; the result is checked for null.
        let ptr = unsafe { ffi::av_audio_fifo_alloc(format.into(), c_int::from(channels), 1) };
        if ptr.is_null() {
            return Err(ffmpeg::Error::Unknown);
        }
        Ok(Self { ptr, format })
    }

    /// Samples per channel currently queued.
    pub fn len(&self) -> usize {
        // SAFETY: `self.ptr` is a live fifo owned by `self`.
        let n = unsafe { ffi::av_audio_fifo_size(self.ptr) };
        n.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append every sample of `frame`, which must be in the fifo's format
    /// and channel count.
    pub fn push(&mut self, frame: &ffmpeg::util::frame::Audio) -> Result<(), ffmpeg::Error> {
        let samples = frame.samples();
        if samples == 0 {
            return Ok(());
        }
        // SAFETY: `extended_data` holds one readable plane per channel (or
        // one interleaved plane) of at least `samples` samples.
        let ret = unsafe {
            ffi::av_audio_fifo_write(
                self.ptr,
                (*frame.as_ptr()).extended_data as _,
                samples as c_int,
            )
        };
        if ret < 0 {
            return Err(ffmpeg::Error::from(ret));
        }
        if (ret as usize) != samples {
            return Err(ffmpeg::Error::Bug);
        }
        Ok(())
    }

    /// Remove exactly `count` samples into a new frame, or `None` with the
    /// queue untouched when fewer are queued.
    pub fn pop(
        &mut self,
        count: usize,
        layout: ChannelLayout,
    ) -> Result<Option<ffmpeg::util::frame::Audio>, ffmpeg::Error> {
        if count == 0 || self.len() < count {
            return Ok(None);
        }
        let mut frame = ffmpeg::util::frame::Audio::new(self.format, count, layout);
        // SAFETY: `frame` was allocated with `count` samples in the fifo's
        // format, so `extended_data` holds writable planes of that size.
        let ret = unsafe {
            ffi::av_audio_fifo_read(
                self.ptr,
                (*frame.as_mut_ptr()).extended_data as _,
                count as c_int,
            )
        };
        if ret < 0 {
            return Err(ffmpeg::Error::from(ret));
        }
        if (ret as usize) != count {
            return Err(ffmpeg::Error::Bug);
        }
        Ok(Some(frame))
    }
}

impl Drop for AudioFifo {
    fn drop(&mut self) {
        // SAFETY: `self.ptr` came from `av_audio_fifo_alloc` and is freed once.
        unsafe { ffi::av_audio_fifo_free(self.ptr) }
    }
}

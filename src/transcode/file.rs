//! Path-to-path transcode
//!
//! Opens the FFmpeg-backed collaborators in acquisition order and hands them
//! to a [`Pipeline`]. If any step fails, whatever was already opened is
//! dropped (closed) before the error is returned.

use crate::cli::TranscodeRequest;
use crate::config::TranscodeConfig;
use crate::error::Result;

use super::decoder::AudioDecoder;
use super::encoder::{AudioEncoder, EncoderSpec};
use super::muxer::FileMuxer;
use super::pipeline::Pipeline;
use super::resampler::ResampleBuffer;
use super::source::InputSource;

pub type FilePipeline =
    Pipeline<InputSource, AudioDecoder, ResampleBuffer, AudioEncoder, FileMuxer>;

/// A pipeline ready to run, with the codec names the caller reports
pub struct FileTranscode {
    pub decoder: String,
    pub encoder: String,
    pub pipeline: FilePipeline,
}

/// Open input, decoder, output, encoder and resampler for `request`.
///
/// The encoder name and sample rate are checked before the input is touched.
pub fn open(request: &TranscodeRequest, config: &TranscodeConfig) -> Result<FileTranscode> {
    let spec = EncoderSpec::resolve(&request.codec, request.sample_rate, config)?;

    let demuxer = InputSource::open(&request.input)?;
    let decoder = AudioDecoder::open(&demuxer.stream()?)?;
    tracing::info!(
        path = %request.input.display(),
        stream_index = decoder.stream_index(),
        codec = decoder.codec_name(),
        sample_rate = decoder.sample_rate(),
        channels = decoder.channels(),
        "input opened"
    );

    let mut muxer = FileMuxer::create(&request.output)?;
    let encoder = AudioEncoder::open(&spec, &decoder, muxer.needs_global_header(), config)?;
    muxer.start(&encoder)?;
    tracing::info!(
        path = %muxer.path().display(),
        codec = encoder.codec_name(),
        sample_rate = encoder.sample_rate(),
        "output opened"
    );

    let buffer = ResampleBuffer::between(&decoder, &encoder)?;

    let decoder_name = decoder.codec_name().to_string();
    let encoder_name = encoder.codec_name().to_string();
    let pipeline = Pipeline::new(demuxer, decoder, muxer, encoder, buffer)?;

    Ok(FileTranscode {
        decoder: decoder_name,
        encoder: encoder_name,
        pipeline,
    })
}

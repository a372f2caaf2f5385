//! Audio encoder for the transcoding pipeline
//!
//! Wraps an FFmpeg `AVCodecContext` to encode fixed-size PCM blocks with any
//! audio encoder FFmpeg knows by name (`aac`, `libopus`, `flac`, …).

use crate::config::TranscodeConfig;
use crate::error::{FfmpegError, Result, TranscodeError};
use crate::ffmpeg::helpers;
use crate::ffmpeg::utils::is_again;
use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec;
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::sample::Sample;

use super::decoder::AudioDecoder;
use super::{EncoderInput, Receive, StreamPacket};

/// Check `requested` against the encoder's supported rates.
///
/// `supported == None` means the encoder accepts any rate. Outside strict
/// mode an unsupported rate is only logged and the run continues.
pub fn validate_sample_rate(
    codec_name: &str,
    requested: u32,
    supported: Option<&[u32]>,
    strict: bool,
) -> Result<()> {
    let Some(supported) = supported else {
        return Ok(());
    };
    if supported.contains(&requested) {
        return Ok(());
    }

    if strict {
        return Err(TranscodeError::UnsupportedSampleRate {
            codec: codec_name.to_string(),
            requested,
            supported: supported.to_vec(),
        });
    }

    tracing::error!(
        codec = codec_name,
        requested,
        ?supported,
        "encoder does not support sample rate, continuing"
    );
    Ok(())
}

/// Encoder choice resolved before any media is opened
pub struct EncoderSpec {
    codec: ffmpeg::Codec,
    sample_rate: u32,
    format: Sample,
}

impl EncoderSpec {
    /// Look up encoder `name`, check `sample_rate` against its supported set
    /// and pick its preferred sample format.
    pub fn resolve(name: &str, sample_rate: u32, config: &TranscodeConfig) -> Result<Self> {
        let codec = ffmpeg::encoder::find_by_name(name)
            .ok_or_else(|| TranscodeError::EncoderNotFound(name.to_string()))?;

        if codec.medium() != ffmpeg::media::Type::Audio {
            return Err(TranscodeError::EncoderNotFound(format!(
                "{} is not an audio encoder",
                name
            )));
        }

        validate_sample_rate(
            codec.name(),
            sample_rate,
            helpers::supported_sample_rates(&codec).as_deref(),
            config.strict_sample_rate,
        )?;

        let format = helpers::supported_sample_formats(&codec)
            .and_then(|formats| formats.into_iter().next())
            .ok_or_else(|| {
                FfmpegError::EncoderCreate(format!("{} lists no sample formats", name))
            })?;

        Ok(Self {
            codec,
            sample_rate,
            format,
        })
    }

    pub fn name(&self) -> &str {
        self.codec.name()
    }
}

/// Audio encoder backed by a real FFmpeg codec context
pub struct AudioEncoder {
    encoder: ffmpeg::encoder::Audio,
    name: String,
    frame_size: usize,
    channel_layout: ChannelLayout,
    time_base: ffmpeg::Rational,
}

impl AudioEncoder {
    /// Open the encoder described by `spec`, keeping the decoder's channel
    /// layout.
    ///
    /// `global_header` must be set when the output container stores codec
    /// headers out of band.
    pub fn open(
        spec: &EncoderSpec,
        decoder: &AudioDecoder,
        global_header: bool,
        config: &TranscodeConfig,
    ) -> Result<Self> {
        let time_base = ffmpeg::Rational::new(1, spec.sample_rate as i32);
        let channel_layout = decoder.channel_layout();

        // Build context and configure the audio encoder BEFORE opening
        let mut context = codec::Context::new_with_codec(spec.codec);
        context.set_time_base(time_base);
        if config.experimental_codecs {
            helpers::set_experimental_compliance(&mut context);
        }
        if global_header {
            context.set_flags(codec::flag::Flags::GLOBAL_HEADER);
        }

        let mut audio_enc = context.encoder().audio().map_err(|e| {
            FfmpegError::EncoderCreate(format!(
                "{}: cannot get audio encoder handle: {}",
                spec.name(),
                e
            ))
        })?;

        audio_enc.set_rate(spec.sample_rate as i32);
        audio_enc.set_format(spec.format);
        audio_enc.set_channel_layout(channel_layout);
        audio_enc.set_bit_rate(config.bit_rate as usize);

        let encoder = audio_enc
            .open_as(spec.codec)
            .map_err(|e| FfmpegError::EncoderCreate(format!("{}: {}", spec.name(), e)))?;

        let reported = encoder.frame_size() as usize;
        let frame_size = if reported == 0 {
            config.fallback_frame_size
        } else {
            reported
        };

        tracing::debug!(
            codec = spec.name(),
            sample_rate = spec.sample_rate,
            format = ?spec.format,
            frame_size,
            variable_frame_size = reported == 0,
            "opened encoder"
        );

        Ok(Self {
            encoder,
            name: spec.name().to_string(),
            frame_size,
            channel_layout,
            time_base,
        })
    }

    pub fn codec_name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.encoder.rate()
    }

    pub fn format(&self) -> Sample {
        self.encoder.format()
    }

    pub fn channel_layout(&self) -> ChannelLayout {
        self.channel_layout
    }

    /// The encoder timebase (1 / sample_rate); packet timestamps use it.
    pub fn time_base(&self) -> ffmpeg::Rational {
        self.time_base
    }

    /// Codec parameters for the encoded stream (for muxer stream setup).
    pub fn codec_parameters(
        &self,
    ) -> std::result::Result<ffmpeg::codec::Parameters, ffmpeg::Error> {
        helpers::encoder_codec_parameters(&self.encoder)
    }
}

impl super::Encoder for AudioEncoder {
    type Samples = ffmpeg::util::frame::Audio;
    type Packet = ffmpeg::Packet;

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn send(&mut self, input: EncoderInput<ffmpeg::util::frame::Audio>) -> Result<()> {
        let sent = match input {
            EncoderInput::Block(block) => {
                let mut frame = block.samples;
                frame.set_pts(Some(block.pts));
                self.encoder.send_frame(&frame)
            }
            EncoderInput::Flush => self.encoder.send_eof(),
        };
        sent.map_err(|e| FfmpegError::EncodeFrame(format!("{}: {}", self.name, e)).into())
    }

    fn receive_packet(&mut self) -> Result<Receive<ffmpeg::Packet>> {
        let mut packet = ffmpeg::Packet::empty();
        match self.encoder.receive_packet(&mut packet) {
            Ok(()) => Ok(Receive::Ready(packet)),
            Err(ffmpeg::Error::Eof) => Ok(Receive::EndOfStream),
            Err(ref e) if is_again(e) => Ok(Receive::NeedsInput),
            Err(e) => Err(FfmpegError::ReceivePacket(format!("{}: {}", self.name, e)).into()),
        }
    }
}

impl StreamPacket for ffmpeg::Packet {
    fn set_stream_index(&mut self, index: usize) {
        self.set_stream(index);
    }
}

impl Drop for AudioEncoder {
    fn drop(&mut self) {
        tracing::debug!(codec = %self.name, "closing encoder");
    }
}

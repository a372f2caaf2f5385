//! Audio decoder for the transcoding pipeline
//!
//! Wraps an FFmpeg `AVCodecContext` to decode compressed audio packets
//! (AC-3, Opus, MP3, FLAC, …) into raw PCM `AVFrame`s.

use crate::error::{FfmpegError, Result};
use crate::ffmpeg::utils::{codec_name, is_again, layout_or_default};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::util::channel_layout::ChannelLayout;

use super::{Decoder, Receive};

/// Audio decoder backed by a FFmpeg codec context
pub struct AudioDecoder {
    decoder: ffmpeg::decoder::Audio,
    /// Stream index in the source file
    stream_index: usize,
}

impl AudioDecoder {
    /// Open a decoder for the given stream.
    ///
    /// Uses the stream's own codec parameters to initialise the context so no
    /// external configuration is needed.
    pub fn open(stream: &ffmpeg::format::stream::Stream) -> Result<Self> {
        let stream_index = stream.index();
        let context =
            ffmpeg::codec::Context::from_parameters(stream.parameters()).map_err(|e| {
                FfmpegError::DecoderCreate(format!(
                    "codec context for stream {}: {}",
                    stream_index, e
                ))
            })?;

        let decoder = context.decoder().audio().map_err(|e| {
            FfmpegError::DecoderCreate(format!(
                "audio decoder for stream {}: {}",
                stream_index, e
            ))
        })?;

        tracing::debug!(
            stream_index,
            codec = codec_name(decoder.id()),
            sample_rate = decoder.rate(),
            channels = decoder.channels(),
            "opened decoder"
        );

        Ok(Self {
            decoder,
            stream_index,
        })
    }

    /// Name of the decoding codec.
    pub fn codec_name(&self) -> &'static str {
        codec_name(self.decoder.id())
    }

    /// The source stream index.
    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    /// Sample rate of decoded frames.
    pub fn sample_rate(&self) -> u32 {
        self.decoder.rate()
    }

    /// Channel count of decoded frames.
    pub fn channels(&self) -> u16 {
        self.decoder.channels()
    }

    /// Sample format of decoded frames.
    pub fn format(&self) -> ffmpeg::util::format::sample::Sample {
        self.decoder.format()
    }

    /// Channel layout of decoded frames, guessed from the channel count when
    /// the container leaves it unset.
    pub fn channel_layout(&self) -> ChannelLayout {
        layout_or_default(self.decoder.channel_layout(), self.channels())
    }
}

impl Decoder for AudioDecoder {
    type Packet = ffmpeg::Packet;
    type Frame = ffmpeg::util::frame::Audio;

    fn send_packet(&mut self, packet: &ffmpeg::Packet) -> Result<()> {
        self.decoder.send_packet(packet).map_err(|e| {
            FfmpegError::DecodePacket(format!("stream {}: {}", self.stream_index, e)).into()
        })
    }

    fn send_eof(&mut self) -> Result<()> {
        match self.decoder.send_eof() {
            Ok(()) => Ok(()),
            // Already draining
            Err(ffmpeg::Error::Eof) => Ok(()),
            Err(e) => Err(FfmpegError::DecodePacket(format!(
                "send_eof on stream {}: {}",
                self.stream_index, e
            ))
            .into()),
        }
    }

    fn receive_frame(&mut self) -> Result<Receive<ffmpeg::util::frame::Audio>> {
        let mut frame = ffmpeg::util::frame::Audio::empty();
        match self.decoder.receive_frame(&mut frame) {
            Ok(()) => Ok(Receive::Ready(frame)),
            Err(ffmpeg::Error::Eof) => Ok(Receive::EndOfStream),
            Err(ref e) if is_again(e) => Ok(Receive::NeedsInput),
            Err(e) => Err(FfmpegError::ReceiveFrame(format!(
                "stream {}: {}",
                self.stream_index, e
            ))
            .into()),
        }
    }
}

impl Drop for AudioDecoder {
    fn drop(&mut self) {
        tracing::debug!(stream_index = self.stream_index, "closing decoder");
    }
}

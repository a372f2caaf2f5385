//! Audio resampler for the transcoding pipeline
//!
//! Converts decoded PCM frames to the encoder's sample format, rate and
//! channel layout. Converted samples are queued in an `AVAudioFifo` until the
//! dequeuer draws an encoder-sized block out of it, so the queued count is
//! exact and a draw never comes back short.

use crate::error::{FfmpegError, Result};
use crate::ffmpeg::helpers::{resampler_out_samples, AudioFifo};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::software::resampling;
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::sample::Sample;

use super::decoder::AudioDecoder;
use super::encoder::AudioEncoder;
use super::{Dequeue, SampleBuffer};

/// One side of a conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFormat {
    pub format: Sample,
    pub layout: ChannelLayout,
    pub channels: u16,
    pub rate: u32,
}

/// Sample buffer: FFmpeg's `SwrContext` for conversion, a FIFO for queueing
pub struct ResampleBuffer {
    context: resampling::Context,
    fifo: AudioFifo,
    input: AudioFormat,
    output: AudioFormat,
    frames_ingested: u64,
}

impl ResampleBuffer {
    /// Create a converter from `input` to `output`.
    pub fn new(input: AudioFormat, output: AudioFormat) -> Result<Self> {
        let context = resampling::Context::get(
            input.format,
            input.layout,
            input.rate,
            output.format,
            output.layout,
            output.rate,
        )
        .map_err(|e| FfmpegError::ResamplerCreate(e.to_string()))?;

        let fifo = AudioFifo::new(output.format, output.channels)
            .map_err(|e| FfmpegError::ResamplerCreate(format!("sample fifo: {}", e)))?;

        tracing::debug!(
            in_rate = input.rate,
            in_format = ?input.format,
            out_rate = output.rate,
            out_format = ?output.format,
            channels = output.channels,
            "opened resampler"
        );

        Ok(Self {
            context,
            fifo,
            input,
            output,
            frames_ingested: 0,
        })
    }

    /// Converter between what `decoder` produces and what `encoder` accepts.
    pub fn between(decoder: &AudioDecoder, encoder: &AudioEncoder) -> Result<Self> {
        Self::new(
            AudioFormat {
                format: decoder.format(),
                layout: decoder.channel_layout(),
                channels: decoder.channels(),
                rate: decoder.sample_rate(),
            },
            AudioFormat {
                format: encoder.format(),
                layout: encoder.channel_layout(),
                channels: decoder.channels(),
                rate: encoder.sample_rate(),
            },
        )
    }
}

impl SampleBuffer for ResampleBuffer {
    type Frame = ffmpeg::util::frame::Audio;
    type Samples = ffmpeg::util::frame::Audio;

    fn ingest(&mut self, mut frame: ffmpeg::util::frame::Audio) -> Result<()> {
        // The converter checks every frame against its configured input
        if frame.channel_layout().bits() == 0 {
            frame.set_channel_layout(self.input.layout);
        }

        // Room for everything the converter can emit, so nothing piles up
        // inside it between frames
        let capacity = resampler_out_samples(&self.context, frame.samples()).max(1);
        let mut converted =
            ffmpeg::util::frame::Audio::new(self.output.format, capacity, self.output.layout);

        self.context.run(&frame, &mut converted).map_err(|e| {
            FfmpegError::Convert(format!("frame {}: {}", self.frames_ingested, e))
        })?;
        self.fifo.push(&converted).map_err(|e| {
            FfmpegError::Convert(format!("queue frame {}: {}", self.frames_ingested, e))
        })?;

        self.frames_ingested += 1;
        Ok(())
    }

    fn delay(&self) -> usize {
        self.fifo.len()
    }

    fn dequeue(&mut self, count: usize) -> Result<Dequeue<ffmpeg::util::frame::Audio>> {
        let popped = self
            .fifo
            .pop(count, self.output.layout)
            .map_err(|e| FfmpegError::Dequeue(format!("{} samples: {}", count, e)))?;

        Ok(match popped {
            Some(mut frame) => {
                frame.set_rate(self.output.rate);
                Dequeue::Ready(frame)
            }
            None => Dequeue::Insufficient,
        })
    }
}

impl Drop for ResampleBuffer {
    fn drop(&mut self) {
        tracing::debug!(
            frames_ingested = self.frames_ingested,
            queued = self.fifo.len(),
            "closing resampler"
        );
    }
}

//! Source reader
//!
//! Pull adapter between the input container and the decoder: the decoder
//! decides when another packet is needed, and only then is one read.
//! Also holds the FFmpeg-backed [`Demuxer`], `InputSource`.

use std::path::{Path, PathBuf};

use ffmpeg_next as ffmpeg;

use crate::error::{FfmpegError, Result, TranscodeError};

use super::{Decoder, Demuxer, Receive};

/// Outcome of asking the source reader for the next decoded frame.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome<F> {
    Frame(F),
    EndOfStream,
}

/// Drives a [`Decoder`] from a [`Demuxer`], one decoded frame at a time.
#[derive(Debug)]
pub struct SourceReader {
    stream_index: usize,
    input_exhausted: bool,
    packets_read: u64,
    packets_skipped: u64,
}

impl SourceReader {
    /// Reader keeping only packets of `stream_index`.
    pub fn new(stream_index: usize) -> Self {
        Self {
            stream_index,
            input_exhausted: false,
            packets_read: 0,
            packets_skipped: 0,
        }
    }

    pub fn packets_read(&self) -> u64 {
        self.packets_read
    }

    pub fn packets_skipped(&self) -> u64 {
        self.packets_skipped
    }

    /// Produce the next decoded frame, reading packets only while the
    /// decoder asks for input.
    ///
    /// When the container runs dry, the decoder is told so once and drained;
    /// `EndOfStream` is returned when it has nothing left.
    pub fn next_decoded_frame<D, Dec>(
        &mut self,
        demuxer: &mut D,
        decoder: &mut Dec,
    ) -> Result<ReadOutcome<Dec::Frame>>
    where
        D: Demuxer,
        Dec: Decoder<Packet = D::Packet>,
    {
        loop {
            match decoder.receive_frame()? {
                Receive::Ready(frame) => return Ok(ReadOutcome::Frame(frame)),
                Receive::EndOfStream => return Ok(ReadOutcome::EndOfStream),
                Receive::NeedsInput if self.input_exhausted => {
                    return Ok(ReadOutcome::EndOfStream)
                }
                Receive::NeedsInput => {}
            }

            match demuxer.read_packet()? {
                None => {
                    tracing::debug!(
                        packets_read = self.packets_read,
                        packets_skipped = self.packets_skipped,
                        "input exhausted, draining decoder"
                    );
                    self.input_exhausted = true;
                    decoder.send_eof()?;
                }
                Some((index, _)) if index != self.stream_index => {
                    self.packets_skipped += 1;
                }
                Some((_, packet)) => {
                    self.packets_read += 1;
                    decoder.send_packet(&packet)?;
                }
            }
        }
    }
}

/// Input container opened on its best audio stream
pub struct InputSource {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    source_path: PathBuf,
}

impl InputSource {
    /// Open a media file and select its best audio stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let input = ffmpeg::format::input(&path)
            .map_err(|e| FfmpegError::OpenInput(format!("{}: {}", path.display(), e)))?;

        let stream_index = input
            .streams()
            .best(ffmpeg::media::Type::Audio)
            .map(|s| s.index())
            .ok_or_else(|| {
                TranscodeError::StreamNotFound(format!(
                    "no audio stream in {}",
                    path.display()
                ))
            })?;

        tracing::debug!(path = %path.display(), stream_index, "opened input");

        Ok(Self {
            input,
            stream_index,
            source_path: path.to_path_buf(),
        })
    }

    /// The selected audio stream
    pub fn stream(&self) -> Result<ffmpeg::Stream<'_>> {
        self.input.stream(self.stream_index).ok_or_else(|| {
            TranscodeError::StreamNotFound(format!("audio stream {}", self.stream_index))
        })
    }
}

impl Demuxer for InputSource {
    type Packet = ffmpeg::Packet;

    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn read_packet(&mut self) -> Result<Option<(usize, ffmpeg::Packet)>> {
        let mut packet = ffmpeg::Packet::empty();
        match packet.read(&mut self.input) {
            Ok(()) => Ok(Some((packet.stream(), packet))),
            Err(ffmpeg::Error::Eof) => Ok(None),
            Err(e) => Err(FfmpegError::ReadPacket(format!(
                "{}: {}",
                self.source_path.display(),
                e
            ))
            .into()),
        }
    }
}

impl Drop for InputSource {
    fn drop(&mut self) {
        tracing::debug!(path = %self.source_path.display(), "closing input");
    }
}

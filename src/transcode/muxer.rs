//! Output container for the transcoded stream

use std::path::{Path, PathBuf};

use crate::error::{FfmpegError, Result, TranscodeError};
use ffmpeg_next as ffmpeg;

use super::encoder::AudioEncoder;
use super::Muxer;

/// Muxer writing one audio stream to a file; the container is guessed from
/// the file name.
pub struct FileMuxer {
    output: ffmpeg::format::context::Output,
    path: PathBuf,
    /// Output stream index and the time base packets arrive in
    stream: Option<(usize, ffmpeg::Rational)>,
    /// Time base the muxer settled on when writing the header
    stream_time_base: ffmpeg::Rational,
    finalized: bool,
}

impl FileMuxer {
    /// Create the output file. No stream exists until [`FileMuxer::start`].
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let output = ffmpeg::format::output(&path)
            .map_err(|e| FfmpegError::MuxerCreate(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), format = output.format().name(), "opened output");

        Ok(Self {
            output,
            path: path.to_path_buf(),
            stream: None,
            stream_time_base: ffmpeg::Rational::new(0, 1),
            finalized: false,
        })
    }

    /// Whether the container wants codec headers out of band. Must be
    /// known before the encoder is opened.
    pub fn needs_global_header(&self) -> bool {
        self.output
            .format()
            .flags()
            .contains(ffmpeg::format::flag::Flags::GLOBAL_HEADER)
    }

    /// Add the audio stream described by `encoder` and write the header.
    pub fn start(&mut self, encoder: &AudioEncoder) -> Result<usize> {
        if self.stream.is_some() {
            return Err(TranscodeError::InvalidState("output stream already added".into()));
        }

        let parameters = encoder
            .codec_parameters()
            .map_err(|e| FfmpegError::MuxerCreate(format!("encoder parameters: {}", e)))?;

        let mut out_stream = self
            .output
            .add_stream(ffmpeg::encoder::find(ffmpeg::codec::Id::None))
            .map_err(|e| FfmpegError::MuxerCreate(format!("add audio stream: {}", e)))?;
        out_stream.set_parameters(parameters);
        out_stream.set_time_base(encoder.time_base());
        let index = out_stream.index();

        self.output
            .write_header()
            .map_err(|e| FfmpegError::WriteHeader(format!("{}: {}", self.path.display(), e)))?;

        // The muxer may replace the requested time base while writing the header
        self.stream_time_base = self
            .output
            .stream(index)
            .map(|s| s.time_base())
            .unwrap_or_else(|| encoder.time_base());
        self.stream = Some((index, encoder.time_base()));

        tracing::debug!(
            stream_index = index,
            time_base = ?self.stream_time_base,
            "wrote output header"
        );

        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Muxer for FileMuxer {
    type Packet = ffmpeg::Packet;

    fn stream_index(&self) -> usize {
        self.stream.map(|(index, _)| index).unwrap_or(0)
    }

    fn write_packet(&mut self, mut packet: ffmpeg::Packet) -> Result<()> {
        let (_, packet_time_base) = self
            .stream
            .ok_or_else(|| TranscodeError::InvalidState("packet written before header".into()))?;

        packet.rescale_ts(packet_time_base, self.stream_time_base);
        packet.set_position(-1);
        packet
            .write_interleaved(&mut self.output)
            .map_err(|e| FfmpegError::WritePacket(format!("{}: {}", self.path.display(), e)).into())
    }

    fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.output
            .write_trailer()
            .map_err(|e| FfmpegError::WriteTrailer(format!("{}: {}", self.path.display(), e)))?;
        self.finalized = true;
        tracing::debug!(path = %self.path.display(), "wrote output trailer");
        Ok(())
    }
}

impl Drop for FileMuxer {
    fn drop(&mut self) {
        if !self.finalized {
            tracing::warn!(path = %self.path.display(), "closing output without trailer");
        } else {
            tracing::debug!(path = %self.path.display(), "closing output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_guessed_from_name() {
        let _ = ffmpeg::init();
        let dir = tempfile::tempdir().unwrap();

        let muxer = FileMuxer::create(dir.path().join("out.wav")).unwrap();
        assert!(!muxer.needs_global_header());
        assert_eq!(muxer.output.format().name(), "wav");
    }

    #[test]
    fn test_unknown_extension_fails() {
        let _ = ffmpeg::init();
        let dir = tempfile::tempdir().unwrap();
        let err = FileMuxer::create(dir.path().join("out.not-a-container")).err();
        assert!(matches!(
            err,
            Some(TranscodeError::Ffmpeg(FfmpegError::MuxerCreate(_)))
        ));
    }
}

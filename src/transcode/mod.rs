//! Audio transcoding pipeline
//!
//! One audio stream flows strictly one way:
//! compressed packet → decoded frame → converted samples → encoder-sized
//! block → encoded packet → container.
//!
//! The pipeline only talks to its collaborators through the traits below.
//! The FFmpeg-backed implementations live next to the component that drives
//! them; `file` wires them together for a path-to-path run.

pub mod decoder;
pub mod dequeue;
pub mod encoder;
pub mod file;
pub mod muxer;
pub mod pipeline;
pub mod resampler;
pub mod source;
pub mod stage;

use crate::error::Result;

pub use dequeue::{EncodeBlock, FrameDequeuer, TimestampCounter};
pub use pipeline::{Pipeline, PipelineState, TranscodeSummary};
pub use source::{ReadOutcome, SourceReader};
pub use stage::{DrainStatus, EncodeWriteStage, StageOutput};

/// Answer of a decoder or encoder asked for its next output.
#[derive(Debug, PartialEq, Eq)]
pub enum Receive<T> {
    Ready(T),
    /// Nothing to emit until more input is fed. Not an error.
    NeedsInput,
    /// Fully drained after end-of-input was signalled.
    EndOfStream,
}

/// Answer of a draw from the sample buffer.
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeue<T> {
    Ready(T),
    /// Fewer samples queued than requested; nothing was removed.
    Insufficient,
}

impl<T> Dequeue<T> {
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Dequeue::Insufficient)
    }
}

/// What the encoder is fed: one block, or the end-of-input signal.
#[derive(Debug)]
pub enum EncoderInput<S> {
    Block(EncodeBlock<S>),
    Flush,
}

/// Input container, opened on one selected audio stream.
pub trait Demuxer {
    type Packet;

    /// Index of the audio stream selected at open time.
    fn stream_index(&self) -> usize;

    /// Next packet of any stream, tagged with its stream index.
    /// `None` once the container is exhausted.
    fn read_packet(&mut self) -> Result<Option<(usize, Self::Packet)>>;
}

/// Packet-in, frame-out audio decoder.
pub trait Decoder {
    type Packet;
    type Frame;

    fn send_packet(&mut self, packet: &Self::Packet) -> Result<()>;

    /// Signal that no more packets will arrive.
    fn send_eof(&mut self) -> Result<()>;

    fn receive_frame(&mut self) -> Result<Receive<Self::Frame>>;
}

/// Format/rate/layout converter holding converted samples in a queue that is
/// decoupled from input frame boundaries.
pub trait SampleBuffer {
    type Frame;
    type Samples;

    /// Convert `frame` and append the result to the queue.
    fn ingest(&mut self, frame: Self::Frame) -> Result<()>;

    /// Converted samples (per channel) currently queued.
    fn delay(&self) -> usize;

    /// Remove exactly `count` samples, or report `Insufficient` and leave the
    /// queue untouched when fewer are queued.
    fn dequeue(&mut self, count: usize) -> Result<Dequeue<Self::Samples>>;
}

/// Block-in, packet-out audio encoder with a fixed block size.
pub trait Encoder {
    type Samples;
    type Packet;

    /// Samples per channel every block must carry.
    fn frame_size(&self) -> usize;

    fn send(&mut self, input: EncoderInput<Self::Samples>) -> Result<()>;

    fn receive_packet(&mut self) -> Result<Receive<Self::Packet>>;
}

/// Encoded packet that can be re-targeted at an output stream.
pub trait StreamPacket {
    fn set_stream_index(&mut self, index: usize);
}

/// Output container with one audio stream; header already written.
pub trait Muxer {
    type Packet;

    /// Index of the audio stream created at open time.
    fn stream_index(&self) -> usize;

    fn write_packet(&mut self, packet: Self::Packet) -> Result<()>;

    /// Write the trailer. Called once, after the encoder is drained.
    fn finalize(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dequeue_is_insufficient() {
        assert!(Dequeue::<()>::Insufficient.is_insufficient());
        assert!(!Dequeue::Ready(1).is_insufficient());
    }
}

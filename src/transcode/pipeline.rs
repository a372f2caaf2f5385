//! Pipeline orchestrator
//!
//! Owns every collaborator and drives them through
//! `Running → DrainingBuffer → FlushingEncoder → Finalizing → Done`, or to
//! `Failed` on the first fatal error.
//!
//! Collaborators are released when the pipeline is dropped, in reverse
//! acquisition order: sample buffer, encoder, muxer, decoder, demuxer.
//! This holds on every exit path, including a failed run.

use std::fmt;

use crate::error::{Result, TranscodeError};

use super::{
    Decoder, Demuxer, Dequeue, DrainStatus, EncodeWriteStage, Encoder, EncoderInput,
    FrameDequeuer, Muxer, ReadOutcome, SampleBuffer, SourceReader, StreamPacket,
    TimestampCounter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Opened, `run` not called yet
    Ready,
    Running,
    DrainingBuffer,
    FlushingEncoder,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Ready => "ready",
            PipelineState::Running => "running",
            PipelineState::DrainingBuffer => "draining buffer",
            PipelineState::FlushingEncoder => "flushing encoder",
            PipelineState::Finalizing => "finalizing",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counters reported after a completed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeSummary {
    pub frames_decoded: u64,
    pub blocks_encoded: u64,
    pub packets_written: u64,
    /// Converted samples left over after the last full block; not encoded.
    pub tail_samples_dropped: usize,
}

/// Single-stream transcode over five collaborators.
///
/// Field order is the release order.
pub struct Pipeline<Dmx, Dec, Buf, Enc, Mux> {
    buffer: Buf,
    encoder: Enc,
    muxer: Mux,
    decoder: Dec,
    demuxer: Dmx,
    reader: SourceReader,
    dequeuer: FrameDequeuer,
    stage: EncodeWriteStage,
    pts: TimestampCounter,
    state: PipelineState,
    summary: TranscodeSummary,
}

impl<Dmx, Dec, Buf, Enc, Mux> Pipeline<Dmx, Dec, Buf, Enc, Mux>
where
    Dmx: Demuxer,
    Dec: Decoder<Packet = Dmx::Packet>,
    Buf: SampleBuffer<Frame = Dec::Frame>,
    Enc: Encoder<Samples = Buf::Samples>,
    Enc::Packet: StreamPacket,
    Mux: Muxer<Packet = Enc::Packet>,
{
    /// Take ownership of opened collaborators, given in acquisition order.
    ///
    /// On error every collaborator is released before returning.
    pub fn new(demuxer: Dmx, decoder: Dec, muxer: Mux, encoder: Enc, buffer: Buf) -> Result<Self> {
        let dequeuer = FrameDequeuer::new(encoder.frame_size())?;
        let reader = SourceReader::new(demuxer.stream_index());
        let stage = EncodeWriteStage::new(muxer.stream_index());

        Ok(Self {
            buffer,
            encoder,
            muxer,
            decoder,
            demuxer,
            reader,
            dequeuer,
            stage,
            pts: TimestampCounter::new(),
            state: PipelineState::Ready,
            summary: TranscodeSummary::default(),
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Counters so far; complete once `run` returned `Ok`.
    pub fn summary(&self) -> TranscodeSummary {
        self.summary
    }

    /// Transcode the whole input, then write the trailer.
    ///
    /// A pipeline runs once; a second call is an `InvalidState` error.
    pub fn run(&mut self) -> Result<TranscodeSummary> {
        if self.state != PipelineState::Ready {
            return Err(TranscodeError::InvalidState(format!(
                "pipeline already {}",
                self.state
            )));
        }

        match self.drive() {
            Ok(()) => {
                self.transition(PipelineState::Done);
                tracing::info!(
                    frames_decoded = self.summary.frames_decoded,
                    blocks_encoded = self.summary.blocks_encoded,
                    packets_written = self.summary.packets_written,
                    "transcode complete"
                );
                Ok(self.summary)
            }
            Err(e) => {
                tracing::error!(state = %self.state, error = %e, "transcode failed");
                self.transition(PipelineState::Failed);
                Err(e)
            }
        }
    }

    fn drive(&mut self) -> Result<()> {
        self.transition(PipelineState::Running);
        loop {
            match self
                .reader
                .next_decoded_frame(&mut self.demuxer, &mut self.decoder)?
            {
                ReadOutcome::Frame(frame) => {
                    self.summary.frames_decoded += 1;
                    self.buffer.ingest(frame)?;
                    self.encode_ready_blocks()?;
                }
                ReadOutcome::EndOfStream => break,
            }
        }

        self.transition(PipelineState::DrainingBuffer);
        self.encode_ready_blocks()?;
        self.summary.tail_samples_dropped = self.buffer.delay();
        if self.summary.tail_samples_dropped > 0 {
            tracing::debug!(
                samples = self.summary.tail_samples_dropped,
                frame_size = self.dequeuer.frame_size(),
                "dropping buffered tail shorter than one block"
            );
        }

        self.transition(PipelineState::FlushingEncoder);
        let flushed = self.stage.encode_and_write(
            &mut self.encoder,
            &mut self.muxer,
            EncoderInput::Flush,
        )?;
        self.summary.packets_written = self.stage.packets_written();
        if flushed.status != DrainStatus::EndOfStream {
            return Err(TranscodeError::InvalidState(
                "encoder asked for more input after flush".into(),
            ));
        }

        self.transition(PipelineState::Finalizing);
        self.muxer.finalize()
    }

    /// Encode blocks until the buffer holds less than one.
    fn encode_ready_blocks(&mut self) -> Result<()> {
        loop {
            let block = match self.dequeuer.try_make_block(&mut self.buffer, &mut self.pts)? {
                Dequeue::Ready(block) => block,
                Dequeue::Insufficient => return Ok(()),
            };
            self.summary.blocks_encoded += 1;
            self.stage.encode_and_write(
                &mut self.encoder,
                &mut self.muxer,
                EncoderInput::Block(block),
            )?;
            self.summary.packets_written = self.stage.packets_written();
        }
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }
}

impl<Dmx, Dec, Buf, Enc, Mux> Drop for Pipeline<Dmx, Dec, Buf, Enc, Mux> {
    fn drop(&mut self) {
        tracing::debug!(state = %self.state, "releasing transcode resources");
    }
}

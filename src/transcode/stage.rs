//! Encode/write stage
//!
//! Feeds one block (or the flush signal) to the encoder, then drains every
//! packet the encoder is ready to emit into the output container.

use crate::error::{Result, TranscodeError};

use super::{Encoder, EncoderInput, Muxer, Receive, StreamPacket};

/// Why a drain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// The encoder wants more blocks. Normal during steady state.
    NeedsInput,
    /// The encoder is fully drained. Only reachable after a flush.
    EndOfStream,
}

/// Result of one `encode_and_write` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageOutput {
    pub written: usize,
    pub status: DrainStatus,
}

#[derive(Debug)]
pub struct EncodeWriteStage {
    stream_index: usize,
    flushed: bool,
    finished: bool,
    packets_written: u64,
}

impl EncodeWriteStage {
    /// Stage writing to output stream `stream_index`.
    pub fn new(stream_index: usize) -> Self {
        Self {
            stream_index,
            flushed: false,
            finished: false,
            packets_written: 0,
        }
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// Feed `input` to the encoder and write out everything it emits.
    ///
    /// Once the encoder reached end-of-stream, a repeated flush reports
    /// `EndOfStream` again without touching the encoder; a block is rejected.
    pub fn encode_and_write<E, M>(
        &mut self,
        encoder: &mut E,
        muxer: &mut M,
        input: EncoderInput<E::Samples>,
    ) -> Result<StageOutput>
    where
        E: Encoder,
        E::Packet: StreamPacket,
        M: Muxer<Packet = E::Packet>,
    {
        match input {
            EncoderInput::Flush if self.flushed => return self.drain(encoder, muxer),
            EncoderInput::Block(_) if self.flushed => {
                return Err(TranscodeError::InvalidState(
                    "block sent to encoder after flush".into(),
                ))
            }
            EncoderInput::Flush => {
                encoder.send(EncoderInput::Flush)?;
                self.flushed = true;
            }
            block => encoder.send(block)?,
        }
        self.drain(encoder, muxer)
    }

    /// Receive and write packets until the encoder needs input or is drained.
    pub fn drain<E, M>(&mut self, encoder: &mut E, muxer: &mut M) -> Result<StageOutput>
    where
        E: Encoder,
        E::Packet: StreamPacket,
        M: Muxer<Packet = E::Packet>,
    {
        let mut written = 0;
        if self.finished {
            return Ok(StageOutput {
                written,
                status: DrainStatus::EndOfStream,
            });
        }

        loop {
            match encoder.receive_packet()? {
                Receive::Ready(mut packet) => {
                    packet.set_stream_index(self.stream_index);
                    muxer.write_packet(packet)?;
                    written += 1;
                    self.packets_written += 1;
                }
                Receive::NeedsInput => {
                    return Ok(StageOutput {
                        written,
                        status: DrainStatus::NeedsInput,
                    })
                }
                Receive::EndOfStream if self.flushed => {
                    self.finished = true;
                    tracing::debug!(
                        packets_written = self.packets_written,
                        "encoder drained"
                    );
                    return Ok(StageOutput {
                        written,
                        status: DrainStatus::EndOfStream,
                    });
                }
                Receive::EndOfStream => {
                    return Err(TranscodeError::InvalidState(
                        "encoder reported end of stream before flush".into(),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::EncodeBlock;
    use crate::tests::fixtures::{Ledger, TestEncoder, TestMuxer};

    fn block(pts: i64) -> EncoderInput<Vec<f32>> {
        EncoderInput::Block(EncodeBlock {
            samples: vec![0.0; 4],
            pts,
        })
    }

    #[test]
    fn test_packets_stamped_with_output_stream() {
        let ledger = Ledger::new();
        let mut encoder = TestEncoder::open(&ledger, 4);
        let mut muxer = TestMuxer::open(&ledger, 3);
        let mut stage = EncodeWriteStage::new(3);

        let out = stage.encode_and_write(&mut encoder, &mut muxer, block(0)).unwrap();
        assert_eq!(out, StageOutput { written: 1, status: DrainStatus::NeedsInput });
        assert_eq!(muxer.written()[0].stream_index, 3);
        assert_eq!(muxer.written()[0].pts, 0);
    }

    #[test]
    fn test_delayed_encoder_emits_on_flush() {
        let ledger = Ledger::new();
        let mut encoder = TestEncoder::open(&ledger, 4).with_delay(2);
        let mut muxer = TestMuxer::open(&ledger, 0);
        let mut stage = EncodeWriteStage::new(0);

        for pts in [0, 4, 8] {
            stage.encode_and_write(&mut encoder, &mut muxer, block(pts)).unwrap();
        }
        assert_eq!(muxer.written().len(), 1);

        let out = stage
            .encode_and_write(&mut encoder, &mut muxer, EncoderInput::Flush)
            .unwrap();
        assert_eq!(out, StageOutput { written: 2, status: DrainStatus::EndOfStream });
        let pts: Vec<i64> = muxer.written().iter().map(|p| p.pts).collect();
        assert_eq!(pts, vec![0, 4, 8]);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let ledger = Ledger::new();
        let mut encoder = TestEncoder::open(&ledger, 4).with_delay(1);
        let mut muxer = TestMuxer::open(&ledger, 0);
        let mut stage = EncodeWriteStage::new(0);

        stage.encode_and_write(&mut encoder, &mut muxer, block(0)).unwrap();
        let first = stage
            .encode_and_write(&mut encoder, &mut muxer, EncoderInput::Flush)
            .unwrap();
        assert_eq!(first.status, DrainStatus::EndOfStream);
        assert_eq!(first.written, 1);

        let again = stage
            .encode_and_write(&mut encoder, &mut muxer, EncoderInput::Flush)
            .unwrap();
        assert_eq!(again, StageOutput { written: 0, status: DrainStatus::EndOfStream });
        let drained = stage.drain(&mut encoder, &mut muxer).unwrap();
        assert_eq!(drained.status, DrainStatus::EndOfStream);
        assert_eq!(muxer.written().len(), 1);
        assert_eq!(encoder.flush_count(), 1);
    }

    #[test]
    fn test_block_after_flush_rejected() {
        let ledger = Ledger::new();
        let mut encoder = TestEncoder::open(&ledger, 4);
        let mut muxer = TestMuxer::open(&ledger, 0);
        let mut stage = EncodeWriteStage::new(0);

        stage
            .encode_and_write(&mut encoder, &mut muxer, EncoderInput::Flush)
            .unwrap();
        let err = stage.encode_and_write(&mut encoder, &mut muxer, block(0));
        assert!(matches!(err, Err(TranscodeError::InvalidState(_))));
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let ledger = Ledger::new();
        let mut encoder = TestEncoder::open(&ledger, 4);
        let mut muxer = TestMuxer::open(&ledger, 0).fail_on_write(0);
        let mut stage = EncodeWriteStage::new(0);

        assert!(stage.encode_and_write(&mut encoder, &mut muxer, block(0)).is_err());
        assert_eq!(stage.packets_written(), 0);
    }
}

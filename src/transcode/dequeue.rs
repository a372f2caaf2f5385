//! Frame dequeuer
//!
//! Decides whether an encoder-sized block may be drawn from the sample buffer
//! and stamps it with the next timestamp. Blocks are never partial: a draw is
//! only attempted when a full `frame_size` is queued.

use crate::error::{Result, TranscodeError};

use super::{Dequeue, SampleBuffer};

/// Monotonic block timestamp, in output samples.
///
/// Starts at 0 and advances by exactly `frame_size` per emitted block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimestampCounter {
    next: i64,
}

impl TimestampCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp the next block will receive.
    pub fn peek(&self) -> i64 {
        self.next
    }

    fn advance(&mut self, samples: usize) -> i64 {
        let pts = self.next;
        self.next += samples as i64;
        pts
    }
}

/// Encoder-ready span of converted samples.
#[derive(Debug)]
pub struct EncodeBlock<S> {
    pub samples: S,
    pub pts: i64,
}

/// Draws fixed-size blocks from a [`SampleBuffer`].
#[derive(Debug, Clone, Copy)]
pub struct FrameDequeuer {
    frame_size: usize,
}

impl FrameDequeuer {
    pub fn new(frame_size: usize) -> Result<Self> {
        if frame_size == 0 {
            return Err(TranscodeError::InvalidState(
                "encoder frame size must be greater than zero".into(),
            ));
        }
        Ok(Self { frame_size })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Draw one block if `frame_size` samples are queued.
    ///
    /// `Insufficient` leaves both the buffer and `pts` untouched. A draw that
    /// removes anything other than `frame_size` samples is an error.
    pub fn try_make_block<B: SampleBuffer>(
        &self,
        buffer: &mut B,
        pts: &mut TimestampCounter,
    ) -> Result<Dequeue<EncodeBlock<B::Samples>>> {
        let queued = buffer.delay();
        if queued < self.frame_size {
            return Ok(Dequeue::Insufficient);
        }

        match buffer.dequeue(self.frame_size)? {
            Dequeue::Ready(samples) => {
                let drawn = queued.saturating_sub(buffer.delay());
                if drawn != self.frame_size {
                    return Err(TranscodeError::InvalidState(format!(
                        "sample buffer returned {} samples for a block of {}",
                        drawn, self.frame_size
                    )));
                }
                Ok(Dequeue::Ready(EncodeBlock {
                    samples,
                    pts: pts.advance(self.frame_size),
                }))
            }
            Dequeue::Insufficient => Ok(Dequeue::Insufficient),
        }
    }
}

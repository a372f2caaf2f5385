//! Orchestrator runs over in-memory collaborators

use crate::error::{FfmpegError, TranscodeError};
use crate::tests::fixtures::{
    Ledger, TestDecoder, TestDemuxer, TestEncoder, TestMuxer, TestSampleBuffer,
};
use crate::transcode::{Pipeline, PipelineState, TranscodeSummary};

type TestPipeline = Pipeline<TestDemuxer, TestDecoder, TestSampleBuffer, TestEncoder, TestMuxer>;

const RELEASE_ORDER: [&str; 5] = ["buffer", "encoder", "muxer", "decoder", "demuxer"];

/// Split a 0, 1, 2, … ramp into frames of the given sizes.
fn ramp_frames(sizes: &[usize]) -> Vec<Vec<f32>> {
    let mut next = 0.0;
    sizes
        .iter()
        .map(|&n| {
            (0..n)
                .map(|_| {
                    let v = next;
                    next += 1.0;
                    v
                })
                .collect()
        })
        .collect()
}

fn demuxer_with(ledger: &Ledger, frames: &[Vec<f32>]) -> TestDemuxer {
    frames
        .iter()
        .fold(TestDemuxer::open(ledger, 0), |d, f| d.packet(0, f.clone()))
}

/// Open all five collaborators in acquisition order.
fn open_pipeline(ledger: &Ledger, frames: &[Vec<f32>], frame_size: usize) -> TestPipeline {
    let demuxer = demuxer_with(ledger, frames);
    let decoder = TestDecoder::open(ledger);
    let muxer = TestMuxer::open(ledger, 0);
    let encoder = TestEncoder::open(ledger, frame_size);
    let buffer = TestSampleBuffer::open(ledger);
    Pipeline::new(demuxer, decoder, muxer, encoder, buffer).unwrap()
}

fn written_samples(ledger: &Ledger) -> Vec<f32> {
    ledger
        .written()
        .into_iter()
        .flat_map(|p| p.samples)
        .collect()
}

#[test]
fn test_two_blocks_from_three_frames() {
    let ledger = Ledger::new();
    let frames = ramp_frames(&[3, 3, 2]);
    let mut pipeline = open_pipeline(&ledger, &frames, 4);

    let summary = pipeline.run().unwrap();
    assert_eq!(
        summary,
        TranscodeSummary {
            frames_decoded: 3,
            blocks_encoded: 2,
            packets_written: 2,
            tail_samples_dropped: 0,
        }
    );
    assert_eq!(pipeline.state(), PipelineState::Done);

    let pts: Vec<i64> = ledger.written().iter().map(|p| p.pts).collect();
    assert_eq!(pts, vec![0, 4]);
    assert_eq!(written_samples(&ledger), frames.concat());
    assert_eq!(ledger.count("finalize:muxer"), 1);
}

#[test]
fn test_empty_input_still_flushes_and_finalizes() {
    let ledger = Ledger::new();
    let mut pipeline = open_pipeline(&ledger, &[], 1024);

    let summary = pipeline.run().unwrap();
    assert_eq!(summary, TranscodeSummary::default());
    assert!(ledger.written().is_empty());
    assert_eq!(ledger.count("eof:decoder"), 1);
    assert_eq!(ledger.count("flush:encoder"), 1);
    assert_eq!(ledger.count("finalize:muxer"), 1);

    let events = ledger.events();
    let flush = events.iter().position(|e| e == "flush:encoder").unwrap();
    let finalize = events.iter().position(|e| e == "finalize:muxer").unwrap();
    assert!(flush < finalize);
}

#[test]
fn test_timestamps_step_by_frame_size() {
    let ledger = Ledger::new();
    let frames = ramp_frames(&[5; 10]);
    let mut pipeline = open_pipeline(&ledger, &frames, 4);

    let summary = pipeline.run().unwrap();
    assert_eq!(summary.blocks_encoded, 12);
    assert_eq!(summary.tail_samples_dropped, 2);

    for (n, packet) in ledger.written().iter().enumerate() {
        assert_eq!(packet.pts, n as i64 * 4);
        assert_eq!(packet.samples.len(), 4);
        assert_eq!(packet.stream_index, 0);
    }
}

#[test]
fn test_blocks_independent_of_frame_boundaries() {
    let ledger = Ledger::new();
    let frames = ramp_frames(&[1, 7, 2, 9, 3]);
    let mut pipeline = open_pipeline(&ledger, &frames, 5);

    let summary = pipeline.run().unwrap();
    assert_eq!(summary.blocks_encoded, 4);
    assert_eq!(summary.tail_samples_dropped, 2);

    let all = frames.concat();
    assert_eq!(written_samples(&ledger), all[..20].to_vec());
}

#[test]
fn test_input_shorter_than_one_block() {
    let ledger = Ledger::new();
    let frames = ramp_frames(&[100]);
    let mut pipeline = open_pipeline(&ledger, &frames, 1024);

    let summary = pipeline.run().unwrap();
    assert_eq!(summary.frames_decoded, 1);
    assert_eq!(summary.blocks_encoded, 0);
    assert_eq!(summary.tail_samples_dropped, 100);
    assert_eq!(ledger.count("flush:encoder"), 1);
    assert_eq!(ledger.count("finalize:muxer"), 1);
}

#[test]
fn test_delayed_encoder_output_written_at_flush() {
    let ledger = Ledger::new();
    let frames = ramp_frames(&[4, 4, 4]);
    let demuxer = demuxer_with(&ledger, &frames);
    let decoder = TestDecoder::open(&ledger).with_delay(2);
    let muxer = TestMuxer::open(&ledger, 1);
    let encoder = TestEncoder::open(&ledger, 4).with_delay(8);
    let buffer = TestSampleBuffer::open(&ledger);
    let mut pipeline = Pipeline::new(demuxer, decoder, muxer, encoder, buffer).unwrap();

    let summary = pipeline.run().unwrap();
    assert_eq!(summary.blocks_encoded, 3);
    assert_eq!(summary.packets_written, 3);

    let written = ledger.written();
    assert!(written.iter().all(|p| p.stream_index == 1));
    assert_eq!(written_samples(&ledger), frames.concat());
}

#[test]
fn test_release_in_reverse_acquisition_order() {
    let ledger = Ledger::new();
    let mut pipeline = open_pipeline(&ledger, &ramp_frames(&[8]), 4);
    pipeline.run().unwrap();
    assert!(ledger.closed().is_empty());

    drop(pipeline);
    assert_eq!(ledger.closed(), RELEASE_ORDER);

    let mut opened = ledger.opened();
    opened.reverse();
    assert_eq!(opened, ledger.closed());
}

#[test]
fn test_write_failure_releases_everything() {
    let ledger = Ledger::new();
    let demuxer = demuxer_with(&ledger, &ramp_frames(&[4, 4, 4]));
    let decoder = TestDecoder::open(&ledger);
    let muxer = TestMuxer::open(&ledger, 0).fail_on_write(1);
    let encoder = TestEncoder::open(&ledger, 4);
    let buffer = TestSampleBuffer::open(&ledger);
    let mut pipeline = Pipeline::new(demuxer, decoder, muxer, encoder, buffer).unwrap();

    let err = pipeline.run().unwrap_err();
    assert!(matches!(
        err,
        TranscodeError::Ffmpeg(FfmpegError::WritePacket(_))
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(ledger.written().len(), 1);
    assert_eq!(ledger.count("flush:encoder"), 0);
    assert_eq!(ledger.count("finalize:muxer"), 0);

    drop(pipeline);
    assert_eq!(ledger.closed(), RELEASE_ORDER);
    for name in RELEASE_ORDER {
        assert_eq!(ledger.count(&format!("close:{}", name)), 1);
    }
}

#[test]
fn test_decode_failure_stops_before_finalize() {
    let ledger = Ledger::new();
    let demuxer = demuxer_with(&ledger, &ramp_frames(&[4, 4, 4]));
    let decoder = TestDecoder::open(&ledger).fail_on_packet(1);
    let muxer = TestMuxer::open(&ledger, 0);
    let encoder = TestEncoder::open(&ledger, 4);
    let buffer = TestSampleBuffer::open(&ledger);
    let mut pipeline = Pipeline::new(demuxer, decoder, muxer, encoder, buffer).unwrap();

    let err = pipeline.run().unwrap_err();
    assert!(matches!(
        err,
        TranscodeError::Ffmpeg(FfmpegError::DecodePacket(_))
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(pipeline.summary().frames_decoded, 1);
    assert_eq!(ledger.count("finalize:muxer"), 0);
}

#[test]
fn test_read_failure_is_fatal() {
    let ledger = Ledger::new();
    let demuxer = demuxer_with(&ledger, &ramp_frames(&[4, 4])).fail_after(1);
    let decoder = TestDecoder::open(&ledger);
    let muxer = TestMuxer::open(&ledger, 0);
    let encoder = TestEncoder::open(&ledger, 4);
    let buffer = TestSampleBuffer::open(&ledger);
    let mut pipeline = Pipeline::new(demuxer, decoder, muxer, encoder, buffer).unwrap();

    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, TranscodeError::Ffmpeg(FfmpegError::ReadPacket(_))));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(ledger.count("eof:decoder"), 0);
}

#[test]
fn test_encoder_asking_for_input_after_flush_fails() {
    let ledger = Ledger::new();
    let demuxer = demuxer_with(&ledger, &ramp_frames(&[4]));
    let decoder = TestDecoder::open(&ledger);
    let muxer = TestMuxer::open(&ledger, 0);
    let encoder = TestEncoder::open(&ledger, 4).stalls_after_flush();
    let buffer = TestSampleBuffer::open(&ledger);
    let mut pipeline = Pipeline::new(demuxer, decoder, muxer, encoder, buffer).unwrap();

    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, TranscodeError::InvalidState(_)));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert_eq!(ledger.count("finalize:muxer"), 0);
}

#[test]
fn test_second_run_rejected() {
    let ledger = Ledger::new();
    let mut pipeline = open_pipeline(&ledger, &ramp_frames(&[4]), 4);
    assert_eq!(pipeline.state(), PipelineState::Ready);
    pipeline.run().unwrap();

    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, TranscodeError::InvalidState(_)));
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(ledger.count("flush:encoder"), 1);
    assert_eq!(ledger.count("finalize:muxer"), 1);
}

#[test]
fn test_zero_frame_size_releases_collaborators() {
    let ledger = Ledger::new();
    let demuxer = TestDemuxer::open(&ledger, 0);
    let decoder = TestDecoder::open(&ledger);
    let muxer = TestMuxer::open(&ledger, 0);
    let encoder = TestEncoder::open(&ledger, 0);
    let buffer = TestSampleBuffer::open(&ledger);

    assert!(Pipeline::new(demuxer, decoder, muxer, encoder, buffer).is_err());
    assert_eq!(ledger.closed(), RELEASE_ORDER);
    assert_eq!(ledger.reads(), 0);
}

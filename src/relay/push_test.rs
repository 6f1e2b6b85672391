use std::cell::RefCell;
use std::rc::Rc;

use ffmpeg_next::Rational;
use ffmpeg_relay::encoder::EncoderPoll;
use ffmpeg_relay::packet::RawPacket;

use super::{PushSink, SinkCodec, SinkTransport};
use crate::relay::error::PushError;
use crate::relay::{ConnectionState, FrameSink, Geometry};

const GEOMETRY: Geometry = Geometry {
    width: 64,
    height: 48,
};

fn frame(width: u32, height: u32) -> ffmpeg_next::frame::Video {
    ffmpeg_next::frame::Video::new(ffmpeg_next::format::Pixel::YUV420P, width, height)
}

fn packet(pts: i64) -> RawPacket {
    let mut p = ffmpeg_next::codec::packet::Packet::empty();
    p.set_pts(Some(pts));
    p.set_dts(Some(pts));
    RawPacket::from((p, Rational::new(1, 25)))
}

#[derive(Default)]
struct Record {
    submitted_pts: Vec<i64>,
    polls: u32,
    eofs: u32,
    written_pts: Vec<i64>,
    finishes: u32,
}

type Shared = Rc<RefCell<Record>>;

/// Emits exactly one packet per submitted frame, then reports need-more.
/// After EOF it reports finished immediately.
struct OnePacketCodec {
    record: Shared,
    pending: Option<i64>,
    flushed: bool,
}

impl OnePacketCodec {
    fn new(record: Shared) -> Self {
        Self {
            record,
            pending: None,
            flushed: false,
        }
    }
}

impl SinkCodec for OnePacketCodec {
    fn submit(&mut self, _frame: &ffmpeg_next::frame::Video, pts: i64) -> Result<(), PushError> {
        self.record.borrow_mut().submitted_pts.push(pts);
        self.pending = Some(pts);
        Ok(())
    }

    fn submit_eof(&mut self) -> Result<(), PushError> {
        self.record.borrow_mut().eofs += 1;
        self.flushed = true;
        Ok(())
    }

    fn poll(&mut self) -> Result<EncoderPoll, PushError> {
        self.record.borrow_mut().polls += 1;
        match self.pending.take() {
            Some(pts) => Ok(EncoderPoll::Packet(packet(pts))),
            None if self.flushed => Ok(EncoderPoll::Finished),
            None => Ok(EncoderPoll::NeedMore),
        }
    }
}

/// Never produces a packet; models a wedged encoder.
struct StalledCodec {
    record: Shared,
}

impl SinkCodec for StalledCodec {
    fn submit(&mut self, _frame: &ffmpeg_next::frame::Video, pts: i64) -> Result<(), PushError> {
        self.record.borrow_mut().submitted_pts.push(pts);
        Ok(())
    }

    fn submit_eof(&mut self) -> Result<(), PushError> {
        self.record.borrow_mut().eofs += 1;
        Ok(())
    }

    fn poll(&mut self) -> Result<EncoderPoll, PushError> {
        self.record.borrow_mut().polls += 1;
        Ok(EncoderPoll::NeedMore)
    }
}

struct RecordingTransport {
    record: Shared,
    fail_writes: bool,
}

impl RecordingTransport {
    fn new(record: Shared) -> Self {
        Self {
            record,
            fail_writes: false,
        }
    }
}

impl SinkTransport for RecordingTransport {
    fn write(&mut self, packet: RawPacket) -> Result<(), PushError> {
        if self.fail_writes {
            return Err(PushError::Write("connection reset".to_string()));
        }
        self.record
            .borrow_mut()
            .written_pts
            .push(packet.pts().unwrap_or(i64::MIN));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PushError> {
        self.record.borrow_mut().finishes += 1;
        Ok(())
    }
}

fn one_packet_sink(record: &Shared) -> PushSink<OnePacketCodec, RecordingTransport> {
    PushSink::from_parts(
        OnePacketCodec::new(record.clone()),
        RecordingTransport::new(record.clone()),
        GEOMETRY,
        10,
    )
}

#[test]
fn test_size_mismatch_rejected_without_side_effects() {
    let record = Shared::default();
    let mut sink = one_packet_sink(&record);

    let wrong = frame(100, 100);
    for _ in 0..2 {
        match sink.push_frame(&wrong) {
            Err(PushError::SizeMismatch { expected, actual }) => {
                assert_eq!(expected, GEOMETRY);
                assert_eq!(
                    actual,
                    Geometry {
                        width: 100,
                        height: 100
                    }
                );
            }
            other => panic!("expected SizeMismatch, got {:?}", other),
        }
    }
    assert_eq!(sink.frames_pushed(), 0);
    assert_eq!(sink.state(), ConnectionState::Open);
    assert!(record.borrow().submitted_pts.is_empty());

    // A correctly sized frame still goes through afterwards.
    sink.push_frame(&frame(GEOMETRY.width, GEOMETRY.height))
        .unwrap();
    assert_eq!(sink.frames_pushed(), 1);
}

#[test]
fn test_frame_counter_strictly_increasing() {
    let record = Shared::default();
    let mut sink = one_packet_sink(&record);
    let f = frame(GEOMETRY.width, GEOMETRY.height);

    for _ in 0..5 {
        sink.push_frame(&f).unwrap();
    }
    assert_eq!(record.borrow().submitted_pts, vec![0, 1, 2, 3, 4]);
    assert_eq!(sink.frames_pushed(), 5);
}

#[test]
fn test_stalled_encoder_fails_after_exact_ceiling() {
    let record = Shared::default();
    let mut sink = PushSink::from_parts(
        StalledCodec {
            record: record.clone(),
        },
        RecordingTransport::new(record.clone()),
        GEOMETRY,
        7,
    );

    let result = sink.push_frame(&frame(GEOMETRY.width, GEOMETRY.height));
    match result {
        Err(PushError::EncoderStalled { attempts }) => assert_eq!(attempts, 7),
        other => panic!("expected EncoderStalled, got {:?}", other),
    }
    assert_eq!(record.borrow().polls, 7);
    assert!(record.borrow().written_pts.is_empty());
}

#[test]
fn test_hundred_frames_written_in_order_and_clean_flush() {
    let record = Shared::default();
    let mut sink = one_packet_sink(&record);
    let f = frame(GEOMETRY.width, GEOMETRY.height);

    for _ in 0..100 {
        sink.push_frame(&f).unwrap();
    }
    {
        let r = record.borrow();
        assert_eq!(r.written_pts.len(), 100);
        assert!(r.written_pts.windows(2).all(|w| w[0] <= w[1]));
    }

    sink.close();
    let r = record.borrow();
    assert_eq!(r.eofs, 1);
    assert_eq!(r.written_pts.len(), 100, "flush must emit no extra packets");
    assert_eq!(r.finishes, 1);
}

#[test]
fn test_write_failure_is_fatal() {
    let record = Shared::default();
    let mut sink = PushSink::from_parts(
        OnePacketCodec::new(record.clone()),
        RecordingTransport {
            record: record.clone(),
            fail_writes: true,
        },
        GEOMETRY,
        10,
    );

    let result = sink.push_frame(&frame(GEOMETRY.width, GEOMETRY.height));
    assert!(matches!(result, Err(PushError::Write(_))));
}

#[test]
fn test_close_is_idempotent() {
    let record = Shared::default();
    let mut sink = one_packet_sink(&record);

    sink.close();
    sink.close();
    let r = record.borrow();
    assert_eq!(r.eofs, 1);
    assert_eq!(r.finishes, 1);
    drop(r);

    let result = sink.push_frame(&frame(GEOMETRY.width, GEOMETRY.height));
    assert!(matches!(result, Err(PushError::Closed)));
}

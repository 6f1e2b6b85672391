use super::CaptureSource;
use crate::relay::error::ReadError;
use crate::relay::{ConnectionState, FrameSource};

#[test]
fn test_new_source_starts_closed() {
    let source = CaptureSource::new("rtsp://localhost:8554/cam");
    assert_eq!(source.state(), ConnectionState::Closed);
    assert!(source.geometry().is_none());
}

#[test]
fn test_read_before_open_is_rejected() {
    let mut source = CaptureSource::new("rtsp://localhost:8554/cam");
    assert!(matches!(source.read_frame(), Err(ReadError::NotOpen)));
}

#[test]
fn test_close_is_idempotent() {
    let mut source = CaptureSource::new("rtsp://localhost:8554/cam");
    source.close();
    source.close();
    assert_eq!(source.state(), ConnectionState::Closed);
}

#[test]
fn test_failed_open_leaves_error_state() {
    // Nothing listens here; open must fail without panicking and leave
    // the source reopenable.
    let mut source = CaptureSource::new("/nonexistent/stream.sdp");
    assert!(source.open().is_err());
    assert_eq!(source.state(), ConnectionState::Error);
    assert!(matches!(source.read_frame(), Err(ReadError::NotOpen)));

    source.close();
    assert_eq!(source.state(), ConnectionState::Closed);
}

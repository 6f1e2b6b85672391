pub mod capture;
pub mod error;
pub mod pace;
pub mod push;
pub mod reconnect;
pub mod retry;
pub mod runner;

pub use capture::CaptureSource;
pub use error::{InitError, OpenError, PushError, ReadError, RelayError};
pub use pace::Pacer;
pub use push::PushSink;
pub use reconnect::ReconnectSupervisor;
pub use runner::RelayLoop;

/// Negotiated video dimensions, fixed for a connection's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Connection lifecycle, tracked independently by the capture and push
/// sides. Reads and pushes are only valid in `Open`; `close` is valid
/// from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Opening,
    Open,
    Error,
}

/// The capture seam the relay loop drives. Implemented by
/// `CaptureSource`; stubbed in loop tests.
pub trait FrameSource {
    fn open(&mut self) -> Result<Geometry, OpenError>;

    /// Pulls and decodes the next video frame. The returned reference is
    /// valid until the next call; the sink copies out of it.
    fn read_frame(&mut self) -> Result<&ffmpeg_next::frame::Video, ReadError>;

    fn close(&mut self);
}

/// The push seam the relay loop drives. Implemented by `PushSink`;
/// stubbed in loop tests.
pub trait FrameSink {
    fn push_frame(&mut self, frame: &ffmpeg_next::frame::Video) -> Result<(), PushError>;

    fn close(&mut self);
}

use ffmpeg_next::Dictionary;
use ffmpeg_next::format::Pixel;

use ffmpeg_relay::decoder::{DecodePoll, VideoDecoder};
use ffmpeg_relay::input::AvInput;
use ffmpeg_relay::scaler::Scaler;

use super::error::{OpenError, ReadError};
use super::{ConnectionState, FrameSource, Geometry};

/// Pixel format every frame leaving the capture side is converted to, so
/// the sink always receives a uniform layout.
pub const INTERMEDIATE_FORMAT: Pixel = Pixel::YUV420P;

/// Everything tied to one input connection. Field order is drop order:
/// frame buffers, then conversion and codec contexts, then the format
/// context.
struct OpenedCapture {
    decode_frame: ffmpeg_next::frame::Video,
    out_frame: ffmpeg_next::frame::Video,
    scaler: Scaler,
    decoder: VideoDecoder,
    input: AvInput,
    geometry: Geometry,
}

impl OpenedCapture {
    fn connect(url: &str) -> anyhow::Result<Self> {
        let input = AvInput::open(url, input_options())?;
        let decoder = VideoDecoder::new(input.video_stream())?;

        let geometry = Geometry {
            width: decoder.width(),
            height: decoder.height(),
        };
        let scaler = Scaler::new(
            decoder.format(),
            geometry.width,
            geometry.height,
            INTERMEDIATE_FORMAT,
            geometry.width,
            geometry.height,
        )?;
        let out_frame =
            ffmpeg_next::frame::Video::new(INTERMEDIATE_FORMAT, geometry.width, geometry.height);

        Ok(Self {
            decode_frame: ffmpeg_next::frame::Video::empty(),
            out_frame,
            scaler,
            decoder,
            input,
            geometry,
        })
    }
}

/// Transport options for the input connection: bounded read timeout,
/// generous buffering, TCP transport for rtsp sources.
fn input_options() -> Dictionary<'static> {
    let mut options = Dictionary::new();
    options.set("buffer_size", "4096000");
    options.set("rtsp_transport", "tcp");
    options.set("stimeout", "10000000");
    options.set("max_delay", "500000");
    options
}

/// Owns the input connection and decodes one video frame per call. Never
/// retries on its own; every failure surfaces to the caller, which
/// decides whether to reopen.
pub struct CaptureSource {
    url: String,
    state: ConnectionState,
    inner: Option<OpenedCapture>,
}

impl CaptureSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: ConnectionState::Closed,
            inner: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn geometry(&self) -> Option<Geometry> {
        self.inner.as_ref().map(|o| o.geometry)
    }
}

impl FrameSource for CaptureSource {
    fn open(&mut self) -> Result<Geometry, OpenError> {
        self.close();
        self.state = ConnectionState::Opening;
        match OpenedCapture::connect(&self.url) {
            Ok(opened) => {
                let geometry = opened.geometry;
                log::info!("capture open: {} ({})", self.url, geometry);
                self.inner = Some(opened);
                self.state = ConnectionState::Open;
                Ok(geometry)
            }
            Err(e) => {
                self.state = ConnectionState::Error;
                Err(OpenError::new(format!("open {}: {:#}", self.url, e)))
            }
        }
    }

    fn read_frame(&mut self) -> Result<&ffmpeg_next::frame::Video, ReadError> {
        if self.state != ConnectionState::Open {
            return Err(ReadError::NotOpen);
        }
        let Some(inner) = self.inner.as_mut() else {
            return Err(ReadError::NotOpen);
        };

        loop {
            match inner.decoder.receive_frame_into(&mut inner.decode_frame) {
                Ok(DecodePoll::Frame) => {
                    inner
                        .scaler
                        .run(&inner.decode_frame, &mut inner.out_frame)
                        .map_err(|e| {
                            self.state = ConnectionState::Error;
                            ReadError::Decode(format!("convert: {:#}", e))
                        })?;
                    inner.out_frame.set_pts(inner.decode_frame.pts());
                    return Ok(&inner.out_frame);
                }
                Ok(DecodePoll::NeedPacket) => match inner.input.read_video_packet() {
                    Some(packet) => {
                        inner.decoder.send_packet(packet).map_err(|e| {
                            self.state = ConnectionState::Error;
                            ReadError::Decode(format!("send packet: {:#}", e))
                        })?;
                    }
                    None => {
                        // Flush the decoder so frames it still buffers come
                        // out before Eof is reported.
                        if let Err(e) = inner.decoder.send_eof() {
                            self.state = ConnectionState::Error;
                            return Err(ReadError::Decode(format!("send eof: {:#}", e)));
                        }
                    }
                },
                Ok(DecodePoll::Finished) => {
                    self.state = ConnectionState::Error;
                    return Err(ReadError::Eof);
                }
                Err(e) => {
                    self.state = ConnectionState::Error;
                    return Err(ReadError::Decode(format!("{:#}", e)));
                }
            }
        }
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            log::debug!("capture closed: {}", self.url);
        }
        self.state = ConnectionState::Closed;
    }
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod capture_test;

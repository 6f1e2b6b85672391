use ffmpeg_next::Dictionary;

use ffmpeg_relay::encoder::{EncoderPoll, Settings, VideoEncoder};
use ffmpeg_relay::output::AvOutput;
use ffmpeg_relay::packet::RawPacket;
use ffmpeg_relay::scaler::Scaler;

use crate::config::{SinkProtocol, StreamConfig};

use super::error::{InitError, PushError};
use super::retry::{self, Attempt, RetryError};
use super::{ConnectionState, FrameSink, Geometry};

/// How many consecutive need-more polls a single push tolerates while
/// waiting for the frame's first packet.
pub const DEFAULT_STALL_CEILING: u32 = 10;

/// Encoder seam of the push side. The ffmpeg implementation converts into
/// its own encode buffer; stubs drive the drain-protocol tests.
pub trait SinkCodec {
    fn submit(&mut self, frame: &ffmpeg_next::frame::Video, pts: i64) -> Result<(), PushError>;
    fn submit_eof(&mut self) -> Result<(), PushError>;
    fn poll(&mut self) -> Result<EncoderPoll, PushError>;
}

/// Transport seam of the push side. `write` owns rescaling into the
/// output stream's time base and tagging the stream index.
pub trait SinkTransport {
    fn write(&mut self, packet: RawPacket) -> Result<(), PushError>;
    fn finish(&mut self) -> Result<(), PushError>;
}

/// ffmpeg-backed codec seam: pixel conversion into a reused encode frame,
/// then encoder submission with the caller's presentation time.
pub struct AvSinkCodec {
    encode_frame: ffmpeg_next::frame::Video,
    scaler: Option<Scaler>,
    encoder: VideoEncoder,
}

impl AvSinkCodec {
    fn new(encoder: VideoEncoder, geometry: Geometry) -> Self {
        let encode_frame =
            ffmpeg_next::frame::Video::new(encoder.format(), geometry.width, geometry.height);
        Self {
            encode_frame,
            scaler: None,
            encoder,
        }
    }
}

impl SinkCodec for AvSinkCodec {
    fn submit(&mut self, frame: &ffmpeg_next::frame::Video, pts: i64) -> Result<(), PushError> {
        // Rebuilt only when the incoming pixel format changes; dimensions
        // are gated before submit is reached.
        let rebuild = match &self.scaler {
            Some(_) if self.encode_frame.format() == frame.format() => false,
            Some(_) => true,
            None => true,
        };
        if rebuild {
            self.scaler = Some(
                Scaler::new(
                    frame.format(),
                    frame.width(),
                    frame.height(),
                    self.encoder.format(),
                    self.encode_frame.width(),
                    self.encode_frame.height(),
                )
                .map_err(|e| PushError::Encode(format!("scaler: {:#}", e)))?,
            );
        }
        if let Some(scaler) = self.scaler.as_mut() {
            scaler
                .run(frame, &mut self.encode_frame)
                .map_err(|e| PushError::Encode(format!("convert: {:#}", e)))?;
        }
        self.encode_frame.set_pts(Some(pts));
        self.encoder
            .send_frame(&self.encode_frame)
            .map_err(|e| PushError::Encode(format!("{:#}", e)))
    }

    fn submit_eof(&mut self) -> Result<(), PushError> {
        self.encoder
            .send_eof()
            .map_err(|e| PushError::Encode(format!("{:#}", e)))
    }

    fn poll(&mut self) -> Result<EncoderPoll, PushError> {
        self.encoder
            .receive_packet()
            .map_err(|e| PushError::Encode(format!("{:#}", e)))
    }
}

/// ffmpeg-backed transport seam over the output container.
pub struct AvSinkTransport {
    output: AvOutput,
}

impl SinkTransport for AvSinkTransport {
    fn write(&mut self, packet: RawPacket) -> Result<(), PushError> {
        self.output
            .write_packet(packet)
            .map_err(|e| PushError::Write(format!("{:#}", e)))
    }

    fn finish(&mut self) -> Result<(), PushError> {
        self.output
            .finish()
            .map_err(|e| PushError::Write(format!("{:#}", e)))
    }
}

/// Owns the output connection. Accepts one raw frame per call, drives it
/// through the encoder and writes the resulting packets in order. Created
/// once per run; the capture side may come and go underneath it.
///
/// Field order is drop order: encode buffers and codec context before the
/// format context.
pub struct PushSink<C: SinkCodec, T: SinkTransport> {
    codec: C,
    transport: T,
    geometry: Geometry,
    frame_count: i64,
    stall_ceiling: u32,
    state: ConnectionState,
}

impl PushSink<AvSinkCodec, AvSinkTransport> {
    /// Allocates the output, opens the encoder with the configured
    /// parameters and writes the container header.
    pub fn open(config: &StreamConfig) -> Result<Self, InitError> {
        config
            .validate()
            .map_err(|e| InitError::new(format!("{:#}", e)))?;

        let settings = Settings {
            width: config.width,
            height: config.height,
            frame_rate: config.frame_rate,
            ..Settings::default()
        };
        let encoder =
            VideoEncoder::new(&settings).map_err(|e| InitError::new(format!("encoder: {:#}", e)))?;

        let mut output = AvOutput::open(
            &config.sink_url,
            config.protocol.container_format(),
            output_options(config.protocol),
        )
        .map_err(|e| InitError::new(format!("open {}: {:#}", config.sink_url, e)))?;
        output
            .begin(&encoder)
            .map_err(|e| InitError::new(format!("write header: {:#}", e)))?;

        let geometry = Geometry {
            width: config.width,
            height: config.height,
        };
        log::info!(
            "push sink open: {} ({}, {} @ {} fps)",
            config.sink_url,
            config.protocol,
            geometry,
            config.frame_rate
        );
        Ok(Self::from_parts(
            AvSinkCodec::new(encoder, geometry),
            AvSinkTransport { output },
            geometry,
            DEFAULT_STALL_CEILING,
        ))
    }
}

/// Muxer-level options per sink protocol, mirroring the transport tuning
/// on the capture side.
fn output_options(protocol: SinkProtocol) -> Dictionary<'static> {
    let mut options = Dictionary::new();
    match protocol {
        SinkProtocol::Rtsp => {
            options.set("rtsp_transport", "tcp");
        }
        SinkProtocol::Rtmp => {
            options.set("flvflags", "no_duration_filesize");
        }
    }
    options
}

impl<C: SinkCodec, T: SinkTransport> PushSink<C, T> {
    pub fn from_parts(codec: C, transport: T, geometry: Geometry, stall_ceiling: u32) -> Self {
        Self {
            codec,
            transport,
            geometry,
            frame_count: 0,
            stall_ceiling,
            state: ConnectionState::Open,
        }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Frames pushed so far; doubles as the next presentation timestamp in
    /// the encoder time base.
    pub fn frames_pushed(&self) -> i64 {
        self.frame_count
    }

    fn drain(&mut self) -> Result<(), PushError> {
        // The frame's first packet must appear within the stall ceiling;
        // with zero-latency tuning the encoder emits one packet per frame,
        // so exhausting the ceiling means it is wedged.
        let first = retry::bounded(self.stall_ceiling, || match self.codec.poll() {
            Ok(EncoderPoll::Packet(p)) => Attempt::Ready(Some(p)),
            Ok(EncoderPoll::Finished) => Attempt::Ready(None),
            Ok(EncoderPoll::NeedMore) => Attempt::Transient,
            Err(e) => Attempt::Fatal(e),
        });
        match first {
            Ok(Some(packet)) => self.transport.write(packet)?,
            Ok(None) => return Ok(()),
            Err(RetryError::Exhausted { attempts }) => {
                return Err(PushError::EncoderStalled { attempts });
            }
            Err(RetryError::Fatal(e)) => return Err(e),
        }

        // Whatever else is already queued goes out too; a need-more here
        // just ends the drain for this call.
        loop {
            match self.codec.poll()? {
                EncoderPoll::Packet(packet) => self.transport.write(packet)?,
                EncoderPoll::NeedMore | EncoderPoll::Finished => return Ok(()),
            }
        }
    }
}

impl<C: SinkCodec, T: SinkTransport> FrameSink for PushSink<C, T> {
    fn push_frame(&mut self, frame: &ffmpeg_next::frame::Video) -> Result<(), PushError> {
        if self.state != ConnectionState::Open {
            return Err(PushError::Closed);
        }
        let actual = Geometry {
            width: frame.width(),
            height: frame.height(),
        };
        if actual != self.geometry {
            // Rejection leaves the sink untouched, counter included.
            return Err(PushError::SizeMismatch {
                expected: self.geometry,
                actual,
            });
        }

        let pts = self.frame_count;
        self.codec.submit(frame, pts)?;
        self.frame_count += 1;

        self.drain()
    }

    /// Flushes the encoder, writes the trailer and releases everything.
    /// Idempotent; failures during teardown are logged, not returned.
    fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;

        if let Err(e) = self.codec.submit_eof() {
            log::warn!("encoder flush: {}", e);
        } else {
            loop {
                match self.codec.poll() {
                    Ok(EncoderPoll::Packet(packet)) => {
                        if let Err(e) = self.transport.write(packet) {
                            log::warn!("flush write: {}", e);
                            break;
                        }
                    }
                    Ok(EncoderPoll::NeedMore) | Ok(EncoderPoll::Finished) => break,
                    Err(e) => {
                        log::warn!("encoder flush: {}", e);
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.transport.finish() {
            log::warn!("write trailer: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "push_test.rs"]
mod push_test;

use clap::ValueEnum;

/// Frame rate the relay paces output at when the source does not dictate
/// one. Matches the encoder time base of 1/25.
pub const DEFAULT_FRAME_RATE: u32 = 25;

/// Protocol tag for the sink endpoint. Decides the container format and
/// the transport options passed to the muxer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkProtocol {
    Rtmp,
    Rtsp,
}

impl SinkProtocol {
    pub fn container_format(&self) -> &'static str {
        match self {
            SinkProtocol::Rtmp => "flv",
            SinkProtocol::Rtsp => "rtsp",
        }
    }
}

impl std::fmt::Display for SinkProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkProtocol::Rtmp => write!(f, "rtmp"),
            SinkProtocol::Rtsp => write!(f, "rtsp"),
        }
    }
}

/// Immutable per-run configuration. Geometry is filled in from whatever
/// the capture side negotiated; the sink cannot be reconfigured once
/// opened.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub source_url: String,
    pub sink_url: String,
    pub protocol: SinkProtocol,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl StreamConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("invalid geometry {}x{}", self.width, self.height);
        }
        if self.frame_rate == 0 {
            anyhow::bail!("frame rate must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::config::{DEFAULT_FRAME_RATE, SinkProtocol, StreamConfig};
use crate::relay::{
    CaptureSource, FrameSource, Pacer, PushSink, ReconnectSupervisor, RelayLoop,
};

mod config;
mod relay;

/// Relays one live video stream: pull, re-encode, push.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Source stream URL to pull from
    source_url: String,
    /// Sink protocol
    #[arg(value_enum)]
    protocol: SinkProtocol,
    /// Sink stream URL to push to
    sink_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    ffmpeg_relay::init()?;

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutdown requested");
            cancel_clone.cancel();
        }
    });

    tokio::task::spawn_blocking(move || run_relay(args, cancel)).await?
}

/// Blocking relay body: open capture, open sink against the negotiated
/// geometry, then hand control to the relay loop.
fn run_relay(args: Args, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut source = CaptureSource::new(&args.source_url);
    let geometry = source.open()?;

    let config = StreamConfig {
        source_url: args.source_url,
        sink_url: args.sink_url,
        protocol: args.protocol,
        width: geometry.width,
        height: geometry.height,
        frame_rate: DEFAULT_FRAME_RATE,
    };

    let sink = match PushSink::open(&config) {
        Ok(sink) => sink,
        Err(e) => {
            source.close();
            return Err(e.into());
        }
    };

    log::info!(
        "relaying {} -> {} ({} @ {} fps)",
        config.source_url,
        config.sink_url,
        geometry,
        config.frame_rate
    );

    RelayLoop::new(
        source,
        sink,
        geometry,
        Pacer::new(config.frame_rate),
        ReconnectSupervisor::default(),
        cancel,
    )
    .run()
    .map_err(Into::into)
}

/// Registers FFmpeg components (formats, codecs, network protocols).
/// Call once at startup before opening any input or output.
pub fn init() -> anyhow::Result<()> {
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("ffmpeg_next init: {}", e))
}

pub mod decoder;
pub mod encoder;
pub mod input;
pub mod output;
pub mod packet;
pub mod scaler;
pub mod stream;

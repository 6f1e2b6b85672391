use ffmpeg_next::{Dictionary, Rational};

use crate::{encoder::VideoEncoder, packet::RawPacket};

/// An output connection for a single encoded video stream. Header and
/// trailer writes are guarded so `finish` stays idempotent and a never
/// started output tears down cleanly.
pub struct AvOutput {
    inner: ffmpeg_next::format::context::Output,
    stream_index: usize,
    stream_time_base: Rational,
    have_written_header: bool,
    have_written_trailer: bool,
}

impl AvOutput {
    /// Allocates the output context for `format` and opens the transport.
    pub fn open(url: &str, format: &str, options: Dictionary) -> anyhow::Result<Self> {
        let output = ffmpeg_next::format::output_as_with(url, format, options)?;
        Ok(Self {
            inner: output,
            stream_index: 0,
            stream_time_base: Rational::new(1, 1),
            have_written_header: false,
            have_written_trailer: false,
        })
    }

    /// Adds a stream carrying the encoder's parameters and writes the
    /// container header. Must run once, before any packet is written.
    pub fn begin(&mut self, encoder: &VideoEncoder) -> anyhow::Result<()> {
        if self.have_written_header {
            anyhow::bail!("output header already written");
        }
        let index = {
            let mut stream = self.inner.add_stream(encoder.inner().codec())?;
            stream.set_parameters(encoder.inner());
            stream.index()
        };
        self.inner.write_header()?;
        // The muxer may override the requested time base; read back what it
        // actually settled on.
        self.stream_index = index;
        self.stream_time_base = self
            .inner
            .stream(index)
            .map(|s| s.time_base())
            .unwrap_or(encoder.time_base());
        self.have_written_header = true;
        Ok(())
    }

    pub fn stream_index(&self) -> usize {
        self.stream_index
    }

    pub fn stream_time_base(&self) -> Rational {
        self.stream_time_base
    }

    /// Rescales the packet into the output stream's time base, tags it with
    /// the output stream index and writes it interleaved.
    pub fn write_packet(&mut self, mut packet: RawPacket) -> anyhow::Result<()> {
        if !self.have_written_header {
            anyhow::bail!("write_packet before header");
        }
        let time_base = packet.time_base();
        let p = packet.get_mut();
        p.set_stream(self.stream_index);
        p.set_position(-1);
        p.rescale_ts(time_base, self.stream_time_base);
        p.write_interleaved(&mut self.inner)?;
        Ok(())
    }

    /// Writes the container trailer. Idempotent; a no-op when the header
    /// was never written.
    pub fn finish(&mut self) -> anyhow::Result<()> {
        if self.have_written_header && !self.have_written_trailer {
            self.have_written_trailer = true;
            self.inner.write_trailer()?;
        }
        Ok(())
    }
}

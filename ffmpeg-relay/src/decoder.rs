use ffmpeg_next::Rational;

use crate::{packet::RawPacket, stream::AvStream};

/// Outcome of a single decoder poll.
pub enum DecodePoll {
    /// The provided frame was filled with decoded data.
    Frame,
    /// The decoder needs another packet before it can emit a frame.
    NeedPacket,
    /// The decoder was flushed and has nothing further to emit.
    Finished,
}

pub struct VideoDecoder {
    inner: ffmpeg_next::codec::decoder::Video,
    decoder_time_base: Rational,
}

impl VideoDecoder {
    pub fn new(stream: &AvStream) -> anyhow::Result<Self> {
        let mut decoder_ctx = ffmpeg_next::codec::Context::new();
        unsafe {
            (*decoder_ctx.as_mut_ptr()).time_base = stream.time_base().into();
        }
        decoder_ctx.set_parameters(stream.parameters().clone())?;

        let video_decoder = decoder_ctx.decoder().video()?;
        let decoder_time_base = video_decoder.time_base();

        if video_decoder.format() == ffmpeg_next::format::Pixel::None
            || video_decoder.width() == 0
            || video_decoder.height() == 0
        {
            return Err(anyhow::anyhow!("missing codec parameters"));
        }

        Ok(Self {
            inner: video_decoder,
            decoder_time_base,
        })
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn format(&self) -> ffmpeg_next::format::Pixel {
        self.inner.format()
    }

    pub fn send_packet(&mut self, mut packet: RawPacket) -> anyhow::Result<()> {
        let time_base = packet.time_base();
        let packet = packet.get_mut();
        packet.rescale_ts(time_base, self.decoder_time_base);
        self.inner.send_packet(packet)?;
        Ok(())
    }

    pub fn send_eof(&mut self) -> anyhow::Result<()> {
        self.inner.send_eof()?;
        Ok(())
    }

    /// Polls the decoder, reusing `frame` as the destination buffer.
    pub fn receive_frame_into(
        &mut self,
        frame: &mut ffmpeg_next::frame::Video,
    ) -> anyhow::Result<DecodePoll> {
        match self.inner.receive_frame(frame) {
            Ok(()) => Ok(DecodePoll::Frame),
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(DecodePoll::NeedPacket)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(DecodePoll::Finished),
            Err(err) => Err(err.into()),
        }
    }
}

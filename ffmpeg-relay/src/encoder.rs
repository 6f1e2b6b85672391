use ffmpeg_next::{Dictionary, Rational};

use crate::packet::RawPacket;

/// Outcome of a single encoder poll.
pub enum EncoderPoll {
    Packet(RawPacket),
    /// The encoder is buffering and needs more input before it emits.
    NeedMore,
    /// The encoder was flushed and has nothing further to emit.
    Finished,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub bitrate: usize,
    pub max_bitrate: usize,
    pub buffer_size: usize,
    pub gop: u32,
    pub max_b_frames: usize,
    pub codec: String,
    pub pixel_format: ffmpeg_next::format::Pixel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 25,
            bitrate: 1_024_000,
            max_bitrate: 2_048_000,
            buffer_size: 4_096_000,
            gop: 50,
            max_b_frames: 1,
            codec: "libx264".to_string(),
            pixel_format: ffmpeg_next::format::Pixel::YUV420P,
        }
    }
}

pub struct VideoEncoder {
    inner: ffmpeg_next::codec::encoder::Video,
    encoder_time_base: Rational,
}

impl VideoEncoder {
    /// Opens an encoder with the given settings. The global-header flag is
    /// always set so containers that carry codec configuration out of band
    /// (flv among them) get it.
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let codec = ffmpeg_next::encoder::find_by_name(&settings.codec)
            .ok_or_else(|| anyhow::anyhow!("codec not found: {}", settings.codec))?;
        let context = ffmpeg_next::codec::Context::new_with_codec(codec);

        let mut encoder = context.encoder().video()?;
        encoder.set_width(settings.width);
        encoder.set_height(settings.height);
        encoder.set_format(settings.pixel_format);
        encoder.set_time_base(Rational::new(1, settings.frame_rate as i32));
        encoder.set_frame_rate(Some(Rational::new(settings.frame_rate as i32, 1)));
        encoder.set_bit_rate(settings.bitrate);
        encoder.set_max_bit_rate(settings.max_bitrate);
        encoder.set_gop(settings.gop);
        encoder.set_max_b_frames(settings.max_b_frames);
        unsafe {
            let ptr = encoder.as_mut_ptr();
            (*ptr).rc_buffer_size = settings.buffer_size as i32;
            (*ptr).flags |= ffmpeg_next::ffi::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
        }

        let mut opts = Dictionary::new();
        opts.set("preset", "ultrafast");
        opts.set("tune", "zerolatency");
        let encoder = encoder.open_with(opts)?;
        log::info!("encoder opened: {}", settings.codec);

        let encoder_time_base: Rational = unsafe { (*encoder.0.as_ptr()).time_base.into() };

        Ok(Self {
            inner: encoder,
            encoder_time_base,
        })
    }

    pub fn time_base(&self) -> Rational {
        self.encoder_time_base
    }

    pub fn format(&self) -> ffmpeg_next::format::Pixel {
        self.inner.format()
    }

    pub fn inner(&self) -> &ffmpeg_next::codec::encoder::Video {
        &self.inner
    }

    pub fn send_frame(&mut self, frame: &ffmpeg_next::frame::Video) -> anyhow::Result<()> {
        self.inner.send_frame(frame)?;
        Ok(())
    }

    pub fn send_eof(&mut self) -> anyhow::Result<()> {
        self.inner.send_eof()?;
        Ok(())
    }

    pub fn receive_packet(&mut self) -> anyhow::Result<EncoderPoll> {
        let mut packet = ffmpeg_next::codec::packet::Packet::empty();
        match self.inner.receive_packet(&mut packet) {
            Ok(()) => Ok(EncoderPoll::Packet(RawPacket::from((
                packet,
                self.encoder_time_base,
            )))),
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(EncoderPoll::NeedMore)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(EncoderPoll::Finished),
            Err(err) => Err(err.into()),
        }
    }
}

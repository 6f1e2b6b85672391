use std::path::Path;

use ffmpeg_next::Dictionary;

use crate::{packet::RawPacket, stream::AvStream};

/// An opened input connection, narrowed to its best video stream.
pub struct AvInput {
    inner: ffmpeg_next::format::context::Input,
    video_stream: AvStream,
}

impl AvInput {
    /// Opens `url` with the given transport options and negotiates the
    /// best available video stream. Fails when the connection cannot be
    /// established or the input carries no video.
    pub fn open(url: &str, options: Dictionary) -> anyhow::Result<Self> {
        let input = ffmpeg_next::format::input_with_dictionary(Path::new(url), options)?;

        let video_stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .map(AvStream::from)
            .ok_or_else(|| anyhow::anyhow!("no video stream in {}", url))?;

        Ok(Self {
            inner: input,
            video_stream,
        })
    }

    pub fn video_stream(&self) -> &AvStream {
        &self.video_stream
    }

    /// Pulls the next packet belonging to the video stream, discarding
    /// packets of any other stream. `None` means end of stream; transient
    /// read conditions are absorbed by the packet iterator.
    pub fn read_video_packet(&mut self) -> Option<RawPacket> {
        let video_index = self.video_stream.index();
        loop {
            match self.inner.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != video_index {
                        continue;
                    }
                    return Some((packet, stream.time_base()).into());
                }
                None => return None,
            }
        }
    }
}

//! FFmpeg utility functions

use ffmpeg_next as ffmpeg;
use ffmpeg::util::channel_layout::ChannelLayout;

/// True for `AVERROR(EAGAIN)`, FFmpeg's "needs more input" answer.
pub fn is_again(err: &ffmpeg::Error) -> bool {
    matches!(err, ffmpeg::Error::Other { errno } if *errno == ffmpeg::error::EAGAIN)
}

/// Use `layout` if it is set, otherwise FFmpeg's default layout for the
/// channel count.
pub fn layout_or_default(layout: ChannelLayout, channels: u16) -> ChannelLayout {
    if layout.bits() != 0 {
        return layout;
    }
    ChannelLayout::default(i32::from(channels))
}

/// Get the codec name for a codec ID
pub fn codec_name(codec_id: ffmpeg::codec::Id) -> &'static str {
    codec_id.name()
}

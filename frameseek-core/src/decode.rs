//! # Seek-Decode Primitive
//!
//! Turns a timestamp or frame index into one decoded, converted frame:
//!
//! 1. seek backward to the nearest position at or before the target and
//!    flush both decoders
//! 2. read packets, feed those of the stream of interest, drain the decoder
//!    and discard everything presented before the target
//! 3. convert the first frame at or after the target into scratch, then copy
//!    it into a caller-owned buffer
//!
//! End of stream before a qualifying frame is [`FrameError::NotFound`]. The
//! container is left wherever exhaustion put it.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::backend::{RawPayload, ReadStatus, ReceiveStatus};
use crate::convert::{ConvertError, OUTPUT_CHANNELS};
use crate::error::FrameError;
use crate::frame::{frame_index, AudioFrame, MediaKind, VideoFrame};
use crate::session::MediaSession;

/// Fallible copy into a fresh allocation.
fn copy_out<T: Copy>(src: &[T]) -> Result<Vec<T>, FrameError> {
    let mut out = Vec::new();
    out.try_reserve_exact(src.len())
        .map_err(|_| FrameError::OutOfMemory {
            bytes: std::mem::size_of_val(src),
        })?;
    out.extend_from_slice(src);
    Ok(out)
}

/// Fresh copy of an already delivered frame.
pub(crate) fn duplicate_frame(frame: &VideoFrame) -> Result<VideoFrame, FrameError> {
    Ok(VideoFrame {
        data: copy_out(&frame.data)?,
        width: frame.width,
        height: frame.height,
        stride: frame.stride,
        pts_ms: frame.pts_ms,
        index: frame.index,
    })
}

// ============================================================================
// Ranges
// ============================================================================

/// A sequential video fetch. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "lowercase")]
pub enum VideoRange {
    /// Frame numbers `start..=end`
    Index { start: i64, end: i64 },
    /// Timestamps `start_ms, start_ms + step_ms, ...` up to `end_ms`
    Time {
        start_ms: i64,
        end_ms: i64,
        step_ms: i64,
    },
}

/// A validated range bound to the session's frame rate.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RangePlan {
    range: VideoRange,
    fps: f64,
    count: usize,
}

impl RangePlan {
    pub fn len(&self) -> usize {
        self.count
    }

    /// Target of the `k`-th frame.
    pub fn target_ms(&self, k: usize) -> i64 {
        match self.range {
            VideoRange::Index { start, .. } => index_to_ms(start + k as i64, self.fps),
            VideoRange::Time {
                start_ms, step_ms, ..
            } => start_ms + k as i64 * step_ms,
        }
    }
}

/// Rounded down so a frame exactly on the target is never skipped.
fn index_to_ms(index: i64, fps: f64) -> i64 {
    (index as f64 * 1000.0 / fps).floor() as i64
}

/// Far-out indices clamp to the ends of the timeline instead of wrapping.
fn saturate_i64(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

// ============================================================================
// Primitive
// ============================================================================

impl MediaSession {
    fn require(&self, kind: MediaKind) -> Result<(), FrameError> {
        let present = match kind {
            MediaKind::Video => self.video.is_some(),
            MediaKind::Audio => self.audio.is_some(),
        };
        if present {
            Ok(())
        } else {
            Err(FrameError::NoStream(kind))
        }
    }

    /// `index / fps * 1000`, failing when the frame rate is unknown.
    pub fn video_index_to_ms(&self, index: i64) -> Result<i64, FrameError> {
        let video = self.video.as_ref().ok_or(FrameError::NoStream(MediaKind::Video))?;
        if video.fps <= 0.0 {
            return Err(FrameError::UnknownRate(MediaKind::Video));
        }
        Ok(index_to_ms(index, video.fps))
    }

    /// `index * samples_per_frame * 1000 / sample_rate`. Exact only for
    /// codecs with a constant frame size.
    pub fn audio_index_to_ms(&self, index: i64) -> Result<i64, FrameError> {
        let audio = self.audio.as_ref().ok_or(FrameError::NoStream(MediaKind::Audio))?;
        if audio.sample_rate == 0 {
            return Err(FrameError::UnknownRate(MediaKind::Audio));
        }
        let ms = index as i128 * audio.samples_per_frame as i128 * 1000 / audio.sample_rate as i128;
        Ok(saturate_i64(ms))
    }

    pub fn video_frame_at(&mut self, target_ms: i64) -> Result<VideoFrame, FrameError> {
        self.require(MediaKind::Video)?;
        self.seek(target_ms, Some(MediaKind::Video))?;
        self.decode_video_until(target_ms)
    }

    pub fn video_frame_at_index(&mut self, index: i64) -> Result<VideoFrame, FrameError> {
        let target_ms = self.video_index_to_ms(index)?;
        self.video_frame_at(target_ms)
    }

    pub fn audio_frame_at(&mut self, target_ms: i64) -> Result<AudioFrame, FrameError> {
        self.require(MediaKind::Audio)?;
        self.seek(target_ms, Some(MediaKind::Audio))?;
        self.decode_audio_until(target_ms)
    }

    pub fn audio_frame_at_index(&mut self, index: i64) -> Result<AudioFrame, FrameError> {
        let target_ms = self.audio_index_to_ms(index)?;
        self.audio_frame_at(target_ms)
    }

    /// Validate `range` against the open media.
    pub(crate) fn plan_range(&self, range: VideoRange) -> Result<RangePlan, FrameError> {
        let video = self.video.as_ref().ok_or(FrameError::NoStream(MediaKind::Video))?;

        let count = match range {
            VideoRange::Index { start, end } => {
                if video.fps <= 0.0 {
                    return Err(FrameError::UnknownRate(MediaKind::Video));
                }
                if start < 0 || end < start {
                    return Err(FrameError::InvalidRange(format!("frames {start}..={end}")));
                }
                (end - start).checked_add(1)
            }
            VideoRange::Time {
                start_ms,
                end_ms,
                step_ms,
            } => {
                if step_ms <= 0 || end_ms < start_ms {
                    return Err(FrameError::InvalidRange(format!(
                        "{start_ms}..={end_ms} ms step {step_ms}"
                    )));
                }
                end_ms
                    .checked_sub(start_ms)
                    .and_then(|span| (span / step_ms).checked_add(1))
            }
        };

        let count = count
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| FrameError::InvalidRange(format!("{range:?} is too long")))?;
        Ok(RangePlan {
            range,
            fps: video.fps,
            count,
        })
    }

    /// One step of a range: the first frame at or after `target_ms`, decoding
    /// forward from the current position.
    ///
    /// When the previously delivered frame already satisfies the target it is
    /// delivered again as a fresh copy.
    pub(crate) fn range_step(
        &mut self,
        target_ms: i64,
        previous: Option<&VideoFrame>,
    ) -> Result<VideoFrame, FrameError> {
        match previous {
            Some(prev) if prev.pts_ms >= target_ms => duplicate_frame(prev),
            _ => self.decode_video_until(target_ms),
        }
    }

    /// Decode forward from the current position until a video frame at or
    /// after `target_ms` appears.
    pub(crate) fn decode_video_until(&mut self, target_ms: i64) -> Result<VideoFrame, FrameError> {
        let video = self
            .video
            .as_mut()
            .ok_or(FrameError::NoStream(MediaKind::Video))?;
        let stream_index = video.stream.index;
        let time_base = video.stream.time_base;

        loop {
            // Drain everything the decoder already holds
            loop {
                match video
                    .decoder
                    .receive_frame(&mut self.video_scratch)
                    .map_err(FrameError::Decode)?
                {
                    ReceiveStatus::Frame => {
                        let Some(pts) = self.video_scratch.pts else {
                            trace!("video frame without pts skipped");
                            continue;
                        };
                        let pts_ms = time_base.ticks_to_ms(pts);
                        if pts_ms < target_ms {
                            continue;
                        }

                        let RawPayload::Picture(picture) = &self.video_scratch.payload else {
                            return Err(ConvertError::WrongPayload { expected: "picture" }.into());
                        };
                        video.converter.convert(picture, &mut self.rgba)?;

                        let (width, height) = video.converter.dimensions();
                        let size = width as usize * height as usize * 4;
                        return Ok(VideoFrame {
                            data: copy_out(&self.rgba[..size])?,
                            width,
                            height,
                            stride: width as usize * 4,
                            pts_ms,
                            index: frame_index(pts_ms, video.fps),
                        });
                    }
                    ReceiveStatus::NeedMore => break,
                    ReceiveStatus::EndOfStream => {
                        return Err(FrameError::NotFound { target_ms });
                    }
                }
            }

            match self
                .container
                .read_packet(&mut self.packet)
                .map_err(FrameError::Read)?
            {
                ReadStatus::Packet if self.packet.stream_index == stream_index => {
                    video
                        .decoder
                        .send_packet(&self.packet)
                        .map_err(FrameError::Decode)?;
                }
                ReadStatus::Packet => {}
                ReadStatus::EndOfStream => {
                    video.decoder.send_eof().map_err(FrameError::Decode)?;
                }
            }
        }
    }

    /// Audio counterpart of [`decode_video_until`](Self::decode_video_until).
    pub(crate) fn decode_audio_until(&mut self, target_ms: i64) -> Result<AudioFrame, FrameError> {
        let audio = self
            .audio
            .as_mut()
            .ok_or(FrameError::NoStream(MediaKind::Audio))?;
        let stream_index = audio.stream.index;
        let time_base = audio.stream.time_base;

        loop {
            loop {
                match audio
                    .decoder
                    .receive_frame(&mut self.audio_scratch)
                    .map_err(FrameError::Decode)?
                {
                    ReceiveStatus::Frame => {
                        let Some(pts) = self.audio_scratch.pts else {
                            trace!("audio frame without pts skipped");
                            continue;
                        };
                        let pts_ms = time_base.ticks_to_ms(pts);
                        if pts_ms < target_ms {
                            continue;
                        }

                        let RawPayload::Samples(samples) = &self.audio_scratch.payload else {
                            return Err(ConvertError::WrongPayload { expected: "samples" }.into());
                        };
                        let sample_count = audio.resampler.convert(samples, &mut self.pcm)?;
                        return Ok(AudioFrame {
                            samples: copy_out(&self.pcm)?,
                            sample_count,
                            channels: OUTPUT_CHANNELS,
                            sample_rate: audio.resampler.sample_rate(),
                            pts_ms,
                        });
                    }
                    ReceiveStatus::NeedMore => break,
                    ReceiveStatus::EndOfStream => {
                        return Err(FrameError::NotFound { target_ms });
                    }
                }
            }

            match self
                .container
                .read_packet(&mut self.packet)
                .map_err(FrameError::Read)?
            {
                ReadStatus::Packet if self.packet.stream_index == stream_index => {
                    audio
                        .decoder
                        .send_packet(&self.packet)
                        .map_err(FrameError::Decode)?;
                }
                ReadStatus::Packet => {}
                ReadStatus::EndOfStream => {
                    audio.decoder.send_eof().map_err(FrameError::Decode)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::synthetic::{luma_for_index, sample_for_packet, SyntheticBackend};
    use crate::config::EngineConfig;

    fn open(locator: &str) -> MediaSession {
        MediaSession::open(&SyntheticBackend::new(), locator, &EngineConfig::default()).unwrap()
    }

    /// Gray level a flat YUV picture of luma `y` converts to.
    fn gray(y: u8) -> u8 {
        ((y as i32 - 16) * 298 >> 8).clamp(0, 255) as u8
    }

    #[test]
    fn test_frame_at_middle() {
        let mut session = open("synthetic://clip?fps=30&gop=12");
        let frame = session.video_frame_at(5000).unwrap();
        assert!(frame.pts_ms >= 5000 && (frame.pts_ms as f64) < 5033.4);
        assert_eq!(frame.index, Some(150));
        assert_eq!(frame.data.len(), 64 * 48 * 4);
        assert_eq!(frame.pixel(3, 3).unwrap()[0], gray(luma_for_index(150)));
    }

    #[test]
    fn test_frame_between_frames_rounds_up() {
        let mut session = open("synthetic://clip?fps=10");
        let frame = session.video_frame_at(1050).unwrap();
        assert_eq!(frame.pts_ms, 1100);
        assert_eq!(frame.index, Some(11));
    }

    #[test]
    fn test_frame_past_end_is_not_found() {
        let mut session = open("synthetic://clip?fps=30");
        let err = session.video_frame_at(999_999).unwrap_err();
        assert!(err.is_not_found());
        // Session remains usable
        assert!(session.video_frame_at(0).is_ok());
    }

    #[test]
    fn test_last_frame_needs_decoder_drain() {
        let mut session = open("synthetic://clip?duration_ms=1000&fps=10&delay=3");
        let frame = session.video_frame_at(900).unwrap();
        assert_eq!(frame.index, Some(9));
    }

    #[test]
    fn test_negative_target_clamps_to_first_frame() {
        let mut session = open("synthetic://clip?fps=30");
        let frame = session.video_frame_at(-500).unwrap();
        assert_eq!(frame.pts_ms, 0);
    }

    #[test]
    fn test_index_round_trip() {
        let mut session = open("synthetic://clip?fps=30000/1001&duration_ms=5000");
        for index in [0, 1, 7, 29, 30, 119] {
            let frame = session.video_frame_at_index(index).unwrap();
            let got = frame.index.unwrap();
            assert!((got - index).abs() <= 1, "index {index} came back as {got}");
        }
    }

    #[test]
    fn test_unknown_fps_rejects_index() {
        let mut session = open("synthetic://clip?fps_known=0");
        assert!(matches!(
            session.video_frame_at_index(3),
            Err(FrameError::UnknownRate(MediaKind::Video))
        ));
        let frame = session.video_frame_at(1000).unwrap();
        assert_eq!(frame.index, None);
    }

    #[test]
    fn test_pixel_formats_convert_to_gray() {
        for pix in ["yuv420p", "nv12", "rgb24", "rgba", "bgra"] {
            let mut session = open(&format!("synthetic://clip?pix={pix}&width=7&height=5"));
            let frame = session.video_frame_at(1000).unwrap();
            let luma = luma_for_index(30);
            let expected = if pix == "yuv420p" || pix == "nv12" { gray(luma) } else { luma };
            let px = frame.pixel(6, 4).unwrap();
            assert_eq!(px, [expected, expected, expected, 255], "format {pix}");
        }
    }

    #[test]
    fn test_audio_frame_at() {
        let mut session = open("synthetic://a?video=0&audio_rate=8000&audio_frame=800&audio_channels=1");
        let frame = session.audio_frame_at(250).unwrap();
        // Packets cover 100 ms each
        assert_eq!(frame.pts_ms, 300);
        assert_eq!(frame.sample_count, 800);
        assert_eq!(frame.channels, 2);
        assert_eq!(frame.samples.len(), 1600);
        assert_eq!(frame.samples[0], sample_for_packet(3));
        assert_eq!(frame.samples[1], sample_for_packet(3));
    }

    #[test]
    fn test_audio_index_uses_frame_size() {
        let session = open("synthetic://a?video=0&audio_rate=48000&audio_frame=1024");
        assert_eq!(session.audio_index_to_ms(0).unwrap(), 0);
        assert_eq!(session.audio_index_to_ms(75).unwrap(), 1600);
    }

    #[test]
    fn test_huge_index_saturates_past_end() {
        let mut session = open("synthetic://a?video=0&audio_rate=48000&audio_frame=1024");
        assert_eq!(session.audio_index_to_ms(i64::MAX).unwrap(), i64::MAX);
        assert_eq!(session.audio_index_to_ms(i64::MIN).unwrap(), i64::MIN);
        assert!(session.audio_frame_at_index(i64::MAX).unwrap_err().is_not_found());
        assert_eq!(session.audio_frame_at_index(i64::MIN).unwrap().pts_ms, 0);

        let mut video = open("synthetic://clip?fps=30");
        assert!(video.video_frame_at_index(i64::MAX).unwrap_err().is_not_found());
    }

    #[test]
    fn test_missing_stream_does_not_touch_container() {
        let backend = SyntheticBackend::new();
        let stats = backend.stats();
        let mut session = MediaSession::open(
            &backend,
            "synthetic://a?video=0&audio_rate=8000",
            &EngineConfig::default(),
        )
        .unwrap();

        for result in [session.video_frame_at(0), session.video_frame_at_index(0)] {
            assert!(matches!(result, Err(FrameError::NoStream(MediaKind::Video))));
        }
        assert!(matches!(
            session.plan_range(VideoRange::Index { start: 0, end: 3 }),
            Err(FrameError::NoStream(MediaKind::Video))
        ));
        assert_eq!(stats.seeks(), 0);
        assert_eq!(stats.packets_read(), 0);
    }

    #[test]
    fn test_range_plan_targets() {
        let session = open("synthetic://clip?fps=25");
        let plan = session.plan_range(VideoRange::Index { start: 2, end: 4 }).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.target_ms(0), 80);
        assert_eq!(plan.target_ms(2), 160);

        let plan = session
            .plan_range(VideoRange::Time {
                start_ms: 100,
                end_ms: 350,
                step_ms: 100,
            })
            .unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.target_ms(2), 300);

        assert!(session.plan_range(VideoRange::Index { start: 5, end: 4 }).is_err());
        assert!(session
            .plan_range(VideoRange::Time {
                start_ms: 0,
                end_ms: 10,
                step_ms: 0,
            })
            .is_err());
    }

    #[test]
    fn test_range_step_repeats_previous_frame() {
        let mut session = open("synthetic://clip?fps=10");
        session.seek(0, Some(MediaKind::Video)).unwrap();
        let first = session.range_step(0, None).unwrap();
        assert_eq!(first.pts_ms, 0);

        let second = session.range_step(30, Some(&first)).unwrap();
        assert_eq!(second.pts_ms, 100);

        let repeated = session.range_step(60, Some(&second)).unwrap();
        assert_eq!(repeated.pts_ms, 100);
        assert_eq!(repeated.data, second.data);
        assert_ne!(repeated.data.as_ptr(), second.data.as_ptr());

        let next = session.range_step(120, Some(&repeated)).unwrap();
        assert_eq!(next.pts_ms, 200);
    }
}

//! # Media Session
//!
//! One opened container plus everything derived from it: the chosen video and
//! audio streams, their decoders and converters, the reusable packet, one
//! scratch decoded frame per media type and the cached [`MediaInfo`].
//!
//! A session is only ever touched through `&mut`, which the engine hands out
//! while holding its session lock.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::backend::{
    BackendError, Container, MediaBackend, Packet, RawFrame, SeekTarget, StreamDecoder,
    StreamInfo, StreamParams,
};
use crate::config::EngineConfig;
use crate::convert::{rgba_buffer_size, PixelConverter, Resampler, OUTPUT_CHANNELS};
use crate::error::{FrameError, OpenError};
use crate::frame::{MediaInfo, MediaKind};

/// Source of seek epochs. Shared by all sessions so a reopened session never
/// repeats an epoch a range task has already seen.
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

fn next_epoch() -> u64 {
    NEXT_EPOCH.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Per-Stream State
// ============================================================================

// Field order is drop order: decoders go before the converters fed by them.

pub(crate) struct VideoState {
    pub decoder: Box<dyn StreamDecoder>,
    pub converter: PixelConverter,
    pub stream: StreamInfo,
    pub width: u32,
    pub height: u32,
    /// Average frame rate, 0.0 when the container does not define one
    pub fps: f64,
    pub frame_count: Option<u64>,
}

pub(crate) struct AudioState {
    pub decoder: Box<dyn StreamDecoder>,
    pub resampler: Resampler,
    pub stream: StreamInfo,
    pub sample_rate: u32,
    pub channels: u32,
    /// Samples per channel in one coded frame (codec value or fallback)
    pub samples_per_frame: u32,
}

enum Pick<T> {
    Ready(T),
    /// No decoder for this codec, try the next stream of the same type
    Skip,
    /// Setup failed, drop the whole media type
    Drop,
}

fn pick_video(
    container: &dyn Container,
    stream: &StreamInfo,
    config: &EngineConfig,
) -> Pick<VideoState> {
    let StreamParams::Video(params) = &stream.params else {
        return Pick::Skip;
    };

    let decoder = match container.open_decoder(stream) {
        Ok(d) => d,
        Err(BackendError::UnsupportedCodec(codec)) => {
            debug!(stream = stream.index, %codec, "no video decoder, trying next stream");
            return Pick::Skip;
        }
        Err(e) => {
            warn!(stream = stream.index, "video decoder setup failed, dropping video: {e}");
            return Pick::Drop;
        }
    };

    let converter = match PixelConverter::new(
        params.pixel_format,
        params.width,
        params.height,
        config.color_space,
    ) {
        Ok(c) => c,
        Err(e) => {
            warn!(stream = stream.index, "RGBA converter setup failed, dropping video: {e}");
            return Pick::Drop;
        }
    };

    debug!(stream = stream.index, decoder = decoder.name(), "video decoder ready");
    let rate = params.avg_frame_rate.as_f64();
    Pick::Ready(VideoState {
        decoder,
        converter,
        stream: stream.clone(),
        width: params.width,
        height: params.height,
        fps: if rate.is_finite() && rate > 0.0 { rate } else { 0.0 },
        frame_count: params.frame_count.filter(|n| *n > 0),
    })
}

fn pick_audio(
    container: &dyn Container,
    stream: &StreamInfo,
    config: &EngineConfig,
) -> Pick<AudioState> {
    let StreamParams::Audio(params) = &stream.params else {
        return Pick::Skip;
    };

    let decoder = match container.open_decoder(stream) {
        Ok(d) => d,
        Err(BackendError::UnsupportedCodec(codec)) => {
            debug!(stream = stream.index, %codec, "no audio decoder, trying next stream");
            return Pick::Skip;
        }
        Err(e) => {
            warn!(stream = stream.index, "audio decoder setup failed, dropping audio: {e}");
            return Pick::Drop;
        }
    };

    let resampler = match Resampler::new(params.channels, params.sample_rate) {
        Ok(r) => r,
        Err(e) => {
            warn!(stream = stream.index, "resampler setup failed, dropping audio: {e}");
            return Pick::Drop;
        }
    };

    debug!(stream = stream.index, decoder = decoder.name(), "audio decoder ready");
    Pick::Ready(AudioState {
        decoder,
        resampler,
        stream: stream.clone(),
        sample_rate: params.sample_rate,
        channels: params.channels,
        samples_per_frame: params
            .frame_size
            .filter(|n| *n > 0)
            .unwrap_or(config.audio_fallback_frame_size),
    })
}

/// First stream of `kind` whose setup succeeds.
fn first_decodable<T>(
    container: &dyn Container,
    kind: MediaKind,
    mut pick: impl FnMut(&StreamInfo) -> Pick<T>,
) -> Option<T> {
    for stream in container.streams().iter().filter(|s| s.kind() == Some(kind)) {
        match pick(stream) {
            Pick::Ready(state) => return Some(state),
            Pick::Skip => continue,
            Pick::Drop => return None,
        }
    }
    None
}

// ============================================================================
// Session
// ============================================================================

pub struct MediaSession {
    pub(crate) video: Option<VideoState>,
    pub(crate) audio: Option<AudioState>,
    pub(crate) container: Box<dyn Container>,
    pub(crate) packet: Packet,
    pub(crate) video_scratch: RawFrame,
    pub(crate) audio_scratch: RawFrame,
    /// RGBA conversion target, `width * height * 4` bytes
    pub(crate) rgba: Vec<u8>,
    /// Stereo f32 conversion target
    pub(crate) pcm: Vec<f32>,
    info: MediaInfo,
    locator: String,
    epoch: u64,
}

impl MediaSession {
    /// Open `locator` and set up the first decodable video and audio stream.
    pub fn open(
        backend: &dyn MediaBackend,
        locator: &str,
        config: &EngineConfig,
    ) -> Result<Self, OpenError> {
        let mut container = backend.open(locator).map_err(|source| OpenError::OpenFailed {
            locator: locator.to_string(),
            source,
        })?;
        container.probe().map_err(OpenError::ProbeFailed)?;

        let mut video = first_decodable(container.as_ref(), MediaKind::Video, |s| {
            pick_video(container.as_ref(), s, config)
        });
        let mut audio = first_decodable(container.as_ref(), MediaKind::Audio, |s| {
            pick_audio(container.as_ref(), s, config)
        });

        let mut rgba = Vec::new();
        if let Some(v) = &video {
            let size = rgba_buffer_size(v.width, v.height);
            if let Err(e) = rgba.try_reserve_exact(size) {
                warn!(size, "RGBA scratch allocation failed, dropping video: {e}");
                video = None;
            } else {
                rgba.resize(size, 0);
            }
        }

        // Grows on demand if a decoder hands out a larger frame
        let mut pcm = Vec::new();
        if let Some(a) = &audio {
            let size = a.samples_per_frame as usize * OUTPUT_CHANNELS as usize;
            if let Err(e) = pcm.try_reserve_exact(size) {
                warn!(size, "PCM scratch allocation failed, dropping audio: {e}");
                audio = None;
            }
        }

        let packet = Packet::with_capacity(config.packet_capacity)
            .map_err(|e| OpenError::AllocFailed(format!("packet buffer: {e}")))?;

        let info = Self::derive_info(container.as_ref(), video.as_ref(), audio.as_ref());

        info!(
            locator,
            backend = backend.name(),
            video = video.as_ref().map(|v| v.stream.index),
            audio = audio.as_ref().map(|a| a.stream.index),
            duration_ms = info.duration_ms,
            "media opened"
        );

        Ok(Self {
            video,
            audio,
            container,
            packet,
            video_scratch: RawFrame::default(),
            audio_scratch: RawFrame::default(),
            rgba,
            pcm,
            info,
            locator: locator.to_string(),
            epoch: next_epoch(),
        })
    }

    fn derive_info(
        container: &dyn Container,
        video: Option<&VideoState>,
        audio: Option<&AudioState>,
    ) -> MediaInfo {
        let duration_ms = container.duration_us().map(|us| us / 1000);
        let mut info = MediaInfo {
            duration_ms,
            ..Default::default()
        };

        if let Some(v) = video {
            info.width = v.width;
            info.height = v.height;
            info.fps = v.fps;
            info.total_frames = match (v.frame_count, duration_ms) {
                (Some(n), _) => n as i64,
                (None, Some(ms)) => (ms as f64 / 1000.0 * v.fps) as i64,
                (None, None) => 0,
            };
        }

        if let Some(a) = audio {
            info.audio_sample_rate = a.sample_rate;
            info.audio_channels = a.channels;
        }

        info
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn video_stream_index(&self) -> Option<usize> {
        self.video.as_ref().map(|v| v.stream.index)
    }

    pub fn audio_stream_index(&self) -> Option<usize> {
        self.audio.as_ref().map(|a| a.stream.index)
    }

    /// Changes every time the read position is moved by a seek.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // ========================================================================
    // Positioning
    // ========================================================================

    /// Seek backward to the nearest position at or before `target_ms` and
    /// flush both decoders.
    ///
    /// The stream of `prefer` is tried first; if the backend rejects a
    /// stream-specific seek, a container-global seek is attempted.
    pub fn seek(&mut self, target_ms: i64, prefer: Option<MediaKind>) -> Result<(), FrameError> {
        let stream_index = match prefer {
            Some(MediaKind::Video) => self.video_stream_index(),
            Some(MediaKind::Audio) => self.audio_stream_index(),
            None => None,
        };

        let target = SeekTarget {
            stream_index,
            timestamp_ms: target_ms,
        };
        if let Err(e) = self.container.seek(target) {
            if stream_index.is_none() {
                return Err(FrameError::Seek {
                    target_ms,
                    source: e,
                });
            }
            debug!(target_ms, "stream seek rejected, retrying globally: {e}");
            self.container
                .seek(SeekTarget {
                    stream_index: None,
                    timestamp_ms: target_ms,
                })
                .map_err(|source| FrameError::Seek { target_ms, source })?;
        }

        if let Some(v) = self.video.as_mut() {
            v.decoder.flush();
        }
        if let Some(a) = self.audio.as_mut() {
            a.decoder.flush();
        }
        self.video_scratch.unref();
        self.audio_scratch.unref();
        self.epoch = next_epoch();
        Ok(())
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        debug!(locator = %self.locator, "closing media session");
        // Decoders first, then converters and scratch buffers
        self.video = None;
        self.audio = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::synthetic::SyntheticBackend;

    fn open(locator: &str) -> Result<MediaSession, OpenError> {
        MediaSession::open(&SyntheticBackend::new(), locator, &EngineConfig::default())
    }

    #[test]
    fn test_open_derives_info() {
        let session = open("synthetic://clip?fps=30&width=32&height=16&audio_rate=44100").unwrap();
        let info = session.info();
        assert_eq!(info.duration_ms, Some(10_000));
        assert_eq!((info.width, info.height), (32, 16));
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.total_frames, 300);
        assert_eq!(info.audio_sample_rate, 44_100);
        assert_eq!(info.audio_channels, 2);
        assert_eq!(session.video_stream_index(), Some(0));
        assert_eq!(session.audio_stream_index(), Some(1));
        assert_eq!(session.rgba.len(), 32 * 16 * 4);
    }

    #[test]
    fn test_total_frames_falls_back_to_duration() {
        let session = open("synthetic://clip?duration_ms=2000&fps=25&frame_count_known=0").unwrap();
        assert_eq!(session.info().total_frames, 50);

        let unknown = open("synthetic://clip?frame_count_known=0&duration_known=0").unwrap();
        assert_eq!(unknown.info().total_frames, 0);
        assert_eq!(unknown.info().duration_ms, None);
    }

    #[test]
    fn test_open_failures_map_to_codes() {
        assert_eq!(open("synthetic://clip?open=fail").err().map(|e| e.code()), Some(-1));
        assert_eq!(open("synthetic://clip?probe=fail").err().map(|e| e.code()), Some(-2));
    }

    #[test]
    fn test_unsupported_codec_tries_next_stream() {
        let session = open("synthetic://clip?video=unsupported&video_streams=2&width=8&height=8")
            .unwrap();
        assert_eq!(session.video_stream_index(), Some(1));
        assert_eq!(session.info().width, 16);
    }

    #[test]
    fn test_broken_codec_drops_only_that_type() {
        let session = open("synthetic://clip?video=broken&video_streams=2&audio_rate=8000").unwrap();
        assert_eq!(session.video_stream_index(), None);
        assert_eq!(session.audio_stream_index(), Some(2));
        assert_eq!(session.info().width, 0);
        assert_eq!(session.info().fps, 0.0);
    }

    #[test]
    fn test_audio_frame_size_fallback() {
        let config = EngineConfig {
            audio_fallback_frame_size: 960,
            ..Default::default()
        };
        let session = MediaSession::open(
            &SyntheticBackend::new(),
            "synthetic://a?video=0&audio_rate=48000&audio_frame_known=0",
            &config,
        )
        .unwrap();
        assert_eq!(session.audio.as_ref().map(|a| a.samples_per_frame), Some(960));
        assert!(session.pcm.capacity() >= 960 * OUTPUT_CHANNELS as usize);
    }

    #[test]
    fn test_seek_falls_back_to_global() {
        let backend = SyntheticBackend::new();
        let stats = backend.stats();
        let mut session = MediaSession::open(
            &backend,
            "synthetic://clip?seek=stream_fail",
            &EngineConfig::default(),
        )
        .unwrap();
        let before = session.epoch();
        session.seek(1000, Some(MediaKind::Video)).unwrap();
        assert_eq!(stats.seeks(), 2);
        assert_ne!(session.epoch(), before);
    }

    #[test]
    fn test_seek_failure_keeps_session() {
        let mut session = open("synthetic://clip?seek=fail").unwrap();
        let before = session.epoch();
        let err = session.seek(1000, Some(MediaKind::Video)).unwrap_err();
        assert!(matches!(err, FrameError::Seek { target_ms: 1000, .. }));
        assert_eq!(session.epoch(), before);
    }
}

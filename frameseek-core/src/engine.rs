//! # Media Engine
//!
//! The synchronous entry points. One engine owns one session slot behind a
//! mutex; every request locks it for the duration of its decode work, so
//! concurrent callers are serialized against the single backend decoder.
//!
//! ```no_run
//! use frameseek_core::MediaEngine;
//!
//! let engine = MediaEngine::new();
//! engine.open("synthetic://clip?fps=30")?;
//! let frame = engine.video_frame_at(5000)?;
//! assert_eq!(frame.index, Some(150));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::backend::{default_backend, MediaBackend};
use crate::config::EngineConfig;
use crate::decode::VideoRange;
use crate::error::{FrameError, OpenError};
use crate::frame::{AudioFrame, MediaInfo, MediaKind, VideoFrame, VideoFrameBatch};
use crate::session::MediaSession;

pub struct MediaEngine {
    backend: Arc<dyn MediaBackend>,
    config: EngineConfig,
    session: Mutex<Option<MediaSession>>,
}

impl Default for MediaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaEngine {
    pub fn new() -> Self {
        Self::with_backend(default_backend(), EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_backend(default_backend(), config)
    }

    pub fn with_backend(backend: Arc<dyn MediaBackend>, config: EngineConfig) -> Self {
        Self {
            backend,
            config,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `f` against the open session while holding the session lock.
    pub(crate) fn with_session<R>(
        &self,
        f: impl FnOnce(&mut MediaSession) -> Result<R, FrameError>,
    ) -> Result<R, FrameError> {
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(FrameError::NotOpen)?;
        f(session)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open `locator`, closing whatever was open before.
    ///
    /// On failure the engine is left with nothing open.
    pub fn open(&self, locator: &str) -> Result<(), OpenError> {
        let mut guard = self.session.lock();
        if let Some(previous) = guard.take() {
            debug!(locator = previous.locator(), "replacing open session");
            drop(previous);
        }
        *guard = Some(MediaSession::open(self.backend.as_ref(), locator, &self.config)?);
        Ok(())
    }

    /// Release the open session. No-op when nothing is open.
    pub fn stop(&self) {
        if let Some(session) = self.session.lock().take() {
            info!(locator = session.locator(), "media stopped");
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Summary of the open media, or the "unknown" default when nothing is open.
    pub fn info(&self) -> MediaInfo {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.info().clone())
            .unwrap_or_default()
    }

    pub fn video_stream_index(&self) -> Option<usize> {
        self.session.lock().as_ref().and_then(|s| s.video_stream_index())
    }

    pub fn audio_stream_index(&self) -> Option<usize> {
        self.session.lock().as_ref().and_then(|s| s.audio_stream_index())
    }

    // ========================================================================
    // Positioning
    // ========================================================================

    /// Move the read position to at or before `target_ms` and flush decoders.
    pub fn seek(&self, target_ms: i64) -> Result<(), FrameError> {
        self.with_session(|s| {
            let prefer = if s.video_stream_index().is_some() {
                MediaKind::Video
            } else if s.audio_stream_index().is_some() {
                MediaKind::Audio
            } else {
                return Err(FrameError::NoStream(MediaKind::Video));
            };
            s.seek(target_ms, Some(prefer))
        })
    }

    /// [`seek`](Self::seek) to the time of video frame `index`.
    pub fn seek_frame(&self, index: i64) -> Result<(), FrameError> {
        self.with_session(|s| {
            let target_ms = s.video_index_to_ms(index)?;
            s.seek(target_ms, Some(MediaKind::Video))
        })
    }

    // ========================================================================
    // Single Frames
    // ========================================================================

    pub fn video_frame_at(&self, target_ms: i64) -> Result<VideoFrame, FrameError> {
        self.with_session(|s| s.video_frame_at(target_ms))
    }

    pub fn video_frame_at_index(&self, index: i64) -> Result<VideoFrame, FrameError> {
        self.with_session(|s| s.video_frame_at_index(index))
    }

    pub fn audio_frame_at(&self, target_ms: i64) -> Result<AudioFrame, FrameError> {
        self.with_session(|s| s.audio_frame_at(target_ms))
    }

    pub fn audio_frame_at_index(&self, index: i64) -> Result<AudioFrame, FrameError> {
        self.with_session(|s| s.audio_frame_at_index(index))
    }

    // ========================================================================
    // Ranges
    // ========================================================================

    /// Frames `start..=end` with a single seek.
    pub fn video_frames_by_index(&self, start: i64, end: i64) -> Result<VideoFrameBatch, FrameError> {
        self.video_frames(VideoRange::Index { start, end })
    }

    /// Frames at `start_ms, start_ms + step_ms, ...` up to `end_ms` with a
    /// single seek.
    pub fn video_frames_by_time(
        &self,
        start_ms: i64,
        end_ms: i64,
        step_ms: i64,
    ) -> Result<VideoFrameBatch, FrameError> {
        self.video_frames(VideoRange::Time {
            start_ms,
            end_ms,
            step_ms,
        })
    }

    /// Fetch a whole range under one lock acquisition.
    ///
    /// Errors before the first decode (nothing open, no video, bad range,
    /// failed seek) are returned directly. A failure mid-range ends the batch
    /// early and is recorded in [`VideoFrameBatch::stopped_by`].
    pub fn video_frames(&self, range: VideoRange) -> Result<VideoFrameBatch, FrameError> {
        self.with_session(|s| {
            let plan = s.plan_range(range)?;
            s.seek(plan.target_ms(0), Some(MediaKind::Video))?;

            let mut frames: Vec<VideoFrame> = Vec::new();
            let mut stopped_by = None;
            for k in 0..plan.len() {
                match s.range_step(plan.target_ms(k), frames.last()) {
                    Ok(frame) => {
                        if let Err(e) = frames.try_reserve(1) {
                            debug!("range buffer growth failed: {e}");
                            stopped_by = Some(FrameError::OutOfMemory {
                                bytes: std::mem::size_of::<VideoFrame>(),
                            });
                            break;
                        }
                        frames.push(frame);
                    }
                    Err(e) => {
                        debug!(k, "range ended early: {e}");
                        stopped_by = Some(e);
                        break;
                    }
                }
            }

            Ok(VideoFrameBatch {
                frames,
                requested: plan.len(),
                stopped_by,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::synthetic::SyntheticBackend;
    use std::thread;

    fn engine() -> (MediaEngine, Arc<crate::backend::synthetic::SyntheticStats>) {
        let backend = SyntheticBackend::new();
        let stats = backend.stats();
        (
            MediaEngine::with_backend(Arc::new(backend), EngineConfig::default()),
            stats,
        )
    }

    #[test]
    fn test_nothing_open() {
        let (engine, _) = engine();
        assert!(!engine.is_open());
        assert_eq!(engine.info(), MediaInfo::default());
        assert_eq!(engine.info().duration_ms, None);
        assert!(matches!(engine.video_frame_at(0), Err(FrameError::NotOpen)));
        assert!(matches!(engine.video_frames_by_index(0, 3), Err(FrameError::NotOpen)));
        engine.stop();
        engine.stop();
    }

    #[test]
    fn test_reopen_yields_identical_info() {
        let (engine, _) = engine();
        engine.open("synthetic://clip?fps=24&audio_rate=48000").unwrap();
        let first = engine.info();
        assert_eq!(first, engine.info());
        engine.stop();
        assert!(!engine.is_open());
        engine.open("synthetic://clip?fps=24&audio_rate=48000").unwrap();
        assert_eq!(first, engine.info());
    }

    #[test]
    fn test_failed_open_leaves_nothing_open() {
        let (engine, _) = engine();
        engine.open("synthetic://clip").unwrap();
        let err = engine.open("synthetic://clip?probe=fail").unwrap_err();
        assert_eq!(err.code(), -2);
        assert!(!engine.is_open());
        assert_eq!(engine.info(), MediaInfo::default());
    }

    #[test]
    fn test_ten_second_clip() {
        let (engine, _) = engine();
        engine.open("synthetic://clip?duration_ms=10000&fps=30").unwrap();

        let frame = engine.video_frame_at(5000).unwrap();
        assert!(frame.pts_ms >= 5000 && (frame.pts_ms as f64) < 5033.3);
        assert!(engine.video_frame_at(999_999).unwrap_err().is_not_found());
    }

    #[test]
    fn test_audio_only_video_requests() {
        let (engine, stats) = engine();
        engine.open("synthetic://a?video=0&audio_rate=44100").unwrap();
        let (seeks, packets) = (stats.seeks(), stats.packets_read());

        assert!(matches!(
            engine.video_frame_at(100),
            Err(FrameError::NoStream(MediaKind::Video))
        ));
        assert!(matches!(
            engine.video_frames_by_time(0, 100, 10),
            Err(FrameError::NoStream(MediaKind::Video))
        ));
        assert!(matches!(
            engine.seek_frame(3),
            Err(FrameError::NoStream(MediaKind::Video))
        ));
        assert_eq!((stats.seeks(), stats.packets_read()), (seeks, packets));

        assert!(engine.audio_frame_at(100).is_ok());
        assert!(engine.seek(0).is_ok());
    }

    #[test]
    fn test_range_by_index() {
        let (engine, stats) = engine();
        engine.open("synthetic://clip?duration_ms=10000&fps=30").unwrap();
        let seeks = stats.seeks();

        let batch = engine.video_frames_by_index(10, 19).unwrap();
        assert!(batch.is_complete());
        assert_eq!(batch.len(), 10);
        assert_eq!(stats.seeks(), seeks + 1);

        let indices: Vec<_> = batch.frames.iter().map(|f| f.index.unwrap()).collect();
        assert_eq!(indices, (10..=19).collect::<Vec<_>>());
        assert!(batch.frames.windows(2).all(|w| w[0].pts_ms < w[1].pts_ms));
    }

    #[test]
    fn test_range_short_at_end() {
        let (engine, _) = engine();
        engine.open("synthetic://clip?duration_ms=1000&fps=10").unwrap();

        let batch = engine.video_frames_by_index(7, 20).unwrap();
        assert_eq!(batch.requested, 14);
        assert_eq!(batch.len(), 3);
        assert!(batch.stopped_by.as_ref().is_some_and(|e| e.is_not_found()));
    }

    #[test]
    fn test_range_by_time_repeats_frames() {
        let (engine, _) = engine();
        engine.open("synthetic://clip?fps=10").unwrap();

        let batch = engine.video_frames_by_time(0, 200, 50).unwrap();
        let pts: Vec<_> = batch.frames.iter().map(|f| f.pts_ms).collect();
        assert_eq!(pts, vec![0, 100, 100, 200, 200]);
    }

    #[test]
    fn test_range_rejects_bad_input() {
        let (engine, _) = engine();
        engine.open("synthetic://clip?fps_known=0").unwrap();
        assert!(matches!(
            engine.video_frames_by_index(0, 3),
            Err(FrameError::UnknownRate(MediaKind::Video))
        ));
        assert!(matches!(
            engine.video_frames_by_time(100, 0, 10),
            Err(FrameError::InvalidRange(_))
        ));
        // Time ranges do not need a frame rate
        assert_eq!(engine.video_frames_by_time(0, 99, 33).unwrap().len(), 4);
    }

    #[test]
    fn test_seek_frame_then_decode() {
        let (engine, _) = engine();
        engine.open("synthetic://clip?fps=30").unwrap();
        engine.seek_frame(90).unwrap();
        assert_eq!(engine.video_frame_at_index(90).unwrap().index, Some(90));
    }

    #[test]
    fn test_concurrent_callers_get_consistent_frames() {
        let (engine, _) = engine();
        engine.open("synthetic://clip?fps=30&gop=15").unwrap();
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for i in 0..20 {
                        let index = (t * 37 + i * 11) % 300;
                        let frame = engine.video_frame_at_index(index).unwrap();
                        assert_eq!(frame.index, Some(index));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[cfg(feature = "symphonia-backend")]
    #[test]
    fn test_wav_file_through_default_backend() {
        use crate::backend::symphonia_file::tests::write_wav;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 8000, 1, 2.0, 8192);

        let engine = MediaEngine::new();
        engine.open(path.to_str().unwrap()).unwrap();
        let info = engine.info();
        assert_eq!(info.duration_ms, Some(2000));
        assert_eq!(info.audio_sample_rate, 8000);
        assert_eq!(info.audio_channels, 1);
        assert_eq!(info.total_frames, 0);

        let frame = engine.audio_frame_at(500).unwrap();
        assert!(frame.pts_ms >= 500 && frame.pts_ms < 700, "pts {}", frame.pts_ms);
        assert_eq!(frame.channels, 2);
        assert!((frame.samples[0] - 0.25).abs() < 1e-3);
        assert!((frame.samples[1] - 0.25).abs() < 1e-3);

        assert!(matches!(
            engine.video_frame_at(0),
            Err(FrameError::NoStream(MediaKind::Video))
        ));
        assert!(engine.audio_frame_at(60_000).unwrap_err().is_not_found());
    }

    #[test]
    fn test_open_missing_file_fails() {
        let engine = MediaEngine::new();
        let err = engine.open("/no/such/clip.wav").unwrap_err();
        assert_eq!(err.code(), -1);
        assert!(!engine.is_open());
    }

    #[test]
    fn test_frames_outlive_session() {
        let (engine, _) = engine();
        engine.open("synthetic://clip").unwrap();
        let frame = engine.video_frame_at(0).unwrap();
        engine.stop();
        assert_eq!(frame.data.len(), 64 * 48 * 4);
        frame.release();
    }
}

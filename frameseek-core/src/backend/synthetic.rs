//! # Synthetic Backend
//!
//! Deterministic test-pattern container. Every property the engine reacts to
//! (frame rate, GOP length, decoder delay, pixel/sample layout, codec support,
//! probe failure) is chosen through the locator query string:
//!
//! ```text
//! synthetic://clip?duration_ms=10000&fps=30&width=64&height=48&gop=12
//! synthetic://tone?video=0&audio_rate=48000&audio_channels=6&sample_fmt=s16
//! ```
//!
//! Video frame `i` is a flat picture whose luma is [`luma_for_index`]`(i)`;
//! audio packet `k` holds the constant sample [`sample_for_packet`]`(k)`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use url::Url;

use super::{
    AudioParams, BackendError, Container, MediaBackend, Packet, RawFrame, RawPayload,
    RawPicture, RawSamples, Rational, ReadStatus, ReceiveStatus, SeekTarget, StreamDecoder,
    StreamInfo, StreamParams, VideoParams,
};
use crate::convert::{PixelFormat, SampleData, SampleFormat};

pub const SCHEME: &str = "synthetic://";

const VIDEO_TIME_BASE: Rational = Rational::new(1, 90_000);
const VIDEO_CODEC: &str = "synth-video";
const AUDIO_CODEC: &str = "synth-audio";

/// Luma painted into video frame `index`.
pub fn luma_for_index(index: u64) -> u8 {
    16 + (index % 220) as u8
}

/// Sample value carried by audio packet `index`.
pub fn sample_for_packet(index: u64) -> f32 {
    (index % 50) as f32 / 100.0
}

// ============================================================================
// Clip Description
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecBehavior {
    Supported,
    /// No decoder exists
    Unsupported,
    /// Decoder exists but fails to open
    Broken,
}

impl CodecBehavior {
    fn parse(value: &str) -> Result<Self, BackendError> {
        match value {
            "1" | "synth" => Ok(Self::Supported),
            "unsupported" => Ok(Self::Unsupported),
            "broken" => Ok(Self::Broken),
            other => Err(BackendError::UnsupportedLocator(format!("codec behavior {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticVideo {
    /// Real spacing of frames
    pub rate: Rational,
    /// Whether the stream reports its average frame rate
    pub rate_known: bool,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub gop: u64,
    /// Frames held back by the decoder before output
    pub delay: usize,
    pub codec: CodecBehavior,
    pub frame_count_known: bool,
    pub streams: usize,
}

impl Default for SyntheticVideo {
    fn default() -> Self {
        Self {
            rate: Rational::new(30, 1),
            rate_known: true,
            width: 64,
            height: 48,
            pixel_format: PixelFormat::YUV420P,
            gop: 12,
            delay: 1,
            codec: CodecBehavior::Supported,
            frame_count_known: true,
            streams: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticAudio {
    pub sample_rate: u32,
    pub channels: u32,
    pub frame_size: u32,
    pub frame_size_known: bool,
    pub sample_format: SampleFormat,
    pub codec: CodecBehavior,
}

impl Default for SyntheticAudio {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            frame_size: 1024,
            frame_size_known: true,
            sample_format: SampleFormat::F32Planar,
            codec: CodecBehavior::Supported,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticClip {
    pub duration_ms: i64,
    pub duration_known: bool,
    pub video: Option<SyntheticVideo>,
    pub audio: Option<SyntheticAudio>,
    pub fail_open: bool,
    pub fail_probe: bool,
    /// Reject stream-specific seeks (global seeks still work)
    pub fail_stream_seek: bool,
    /// Reject every seek
    pub fail_seek: bool,
}

impl Default for SyntheticClip {
    fn default() -> Self {
        Self {
            duration_ms: 10_000,
            duration_known: true,
            video: Some(SyntheticVideo::default()),
            audio: None,
            fail_open: false,
            fail_probe: false,
            fail_stream_seek: false,
            fail_seek: false,
        }
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, BackendError> {
    value
        .parse()
        .map_err(|_| BackendError::UnsupportedLocator(format!("bad value for {key}: {value}")))
}

fn parse_rate(value: &str) -> Result<Rational, BackendError> {
    let rate = match value.split_once('/') {
        Some((num, den)) => Rational::new(parse_num("fps", num)?, parse_num("fps", den)?),
        None => Rational::new(parse_num("fps", value)?, 1),
    };
    if rate.num <= 0 || rate.den <= 0 {
        return Err(BackendError::UnsupportedLocator(format!("fps {value}")));
    }
    Ok(rate)
}

fn parse_flag(key: &str, value: &str) -> Result<bool, BackendError> {
    match value {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(BackendError::UnsupportedLocator(format!("bad flag {key}={other}"))),
    }
}

impl SyntheticClip {
    pub fn from_locator(locator: &str) -> Result<Self, BackendError> {
        let url = Url::parse(locator)
            .map_err(|e| BackendError::UnsupportedLocator(format!("{locator}: {e}")))?;
        if url.scheme() != "synthetic" {
            return Err(BackendError::UnsupportedLocator(locator.to_string()));
        }

        let mut clip = SyntheticClip::default();
        let mut video = SyntheticVideo::default();
        let mut audio = SyntheticAudio::default();
        let mut want_video = true;
        let mut want_audio = false;

        for (key, value) in url.query_pairs() {
            let value = value.as_ref();
            match key.as_ref() {
                "duration_ms" => clip.duration_ms = parse_num(&key, value)?,
                "duration_known" => clip.duration_known = parse_flag(&key, value)?,
                "open" => clip.fail_open = value == "fail",
                "probe" => clip.fail_probe = value == "fail",
                "seek" => match value {
                    "fail" => clip.fail_seek = true,
                    "stream_fail" => clip.fail_stream_seek = true,
                    _ => {}
                },
                "video" => match value {
                    "0" | "none" => want_video = false,
                    other => video.codec = CodecBehavior::parse(other)?,
                },
                "fps" => video.rate = parse_rate(value)?,
                "fps_known" => video.rate_known = parse_flag(&key, value)?,
                "width" => video.width = parse_num(&key, value)?,
                "height" => video.height = parse_num(&key, value)?,
                "pix" => {
                    video.pixel_format = PixelFormat::from_name(value).ok_or_else(|| {
                        BackendError::UnsupportedLocator(format!("pixel format {value}"))
                    })?
                }
                "gop" => video.gop = parse_num::<u64>(&key, value)?.max(1),
                "delay" => video.delay = parse_num(&key, value)?,
                "frame_count_known" => video.frame_count_known = parse_flag(&key, value)?,
                "video_streams" => video.streams = parse_num::<usize>(&key, value)?.max(1),
                "audio" => match value {
                    "0" | "none" => want_audio = false,
                    other => {
                        want_audio = true;
                        audio.codec = CodecBehavior::parse(other)?;
                    }
                },
                "audio_rate" => {
                    want_audio = true;
                    audio.sample_rate = parse_num(&key, value)?;
                }
                "audio_channels" => audio.channels = parse_num(&key, value)?,
                "audio_frame" => audio.frame_size = parse_num::<u32>(&key, value)?.max(1),
                "audio_frame_known" => audio.frame_size_known = parse_flag(&key, value)?,
                "sample_fmt" => {
                    audio.sample_format = SampleFormat::from_name(value).ok_or_else(|| {
                        BackendError::UnsupportedLocator(format!("sample format {value}"))
                    })?
                }
                other => {
                    return Err(BackendError::UnsupportedLocator(format!("unknown key {other}")))
                }
            }
        }

        clip.video = want_video.then_some(video);
        clip.audio = want_audio.then_some(audio);
        Ok(clip)
    }

    fn video_frame_count(&self) -> u64 {
        match &self.video {
            Some(v) => {
                (self.duration_ms.max(0) as i128 * v.rate.num as i128 / (1000 * v.rate.den as i128))
                    as u64
            }
            None => 0,
        }
    }

    fn audio_total_samples(&self) -> u64 {
        match &self.audio {
            Some(a) => (self.duration_ms.max(0) as u64) * a.sample_rate as u64 / 1000,
            None => 0,
        }
    }

    fn audio_packet_count(&self) -> u64 {
        match &self.audio {
            Some(a) => self.audio_total_samples().div_ceil(a.frame_size as u64),
            None => 0,
        }
    }

    fn video_pts(&self, index: u64) -> i64 {
        let v = self.video.as_ref().map(|v| v.rate).unwrap_or(Rational::new(1, 1));
        (index as i128 * VIDEO_TIME_BASE.den as i128 * v.den as i128
            / (VIDEO_TIME_BASE.num as i128 * v.num as i128)) as i64
    }

    fn video_ms(&self, index: u64) -> i64 {
        VIDEO_TIME_BASE.ticks_to_ms(self.video_pts(index))
    }

    fn audio_pts(&self, index: u64) -> i64 {
        let frame_size = self.audio.as_ref().map(|a| a.frame_size).unwrap_or(1);
        index as i64 * frame_size as i64
    }

    fn audio_ms(&self, index: u64) -> i64 {
        let rate = self.audio.as_ref().map(|a| a.sample_rate).unwrap_or(1).max(1);
        Rational::new(1, rate as i64).ticks_to_ms(self.audio_pts(index))
    }

    /// Last item in `0..count` whose time is at or before `target_ms`.
    fn last_at_or_before(count: u64, target_ms: i64, time_of: impl Fn(u64) -> i64) -> u64 {
        if count == 0 {
            return 0;
        }
        let (mut lo, mut hi) = (0u64, count - 1);
        if time_of(lo) > target_ms {
            return 0;
        }
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if time_of(mid) <= target_ms {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        lo
    }

    fn streams(&self) -> Vec<StreamInfo> {
        let mut streams = Vec::new();

        if let Some(v) = &self.video {
            for n in 0..v.streams {
                let codec = if n == 0 { v.codec } else { CodecBehavior::Supported };
                streams.push(StreamInfo {
                    index: streams.len(),
                    codec: codec_name(VIDEO_CODEC, codec),
                    time_base: VIDEO_TIME_BASE,
                    params: StreamParams::Video(VideoParams {
                        // Secondary streams are double size so they are distinguishable
                        width: v.width * (n as u32 + 1),
                        height: v.height * (n as u32 + 1),
                        pixel_format: v.pixel_format,
                        avg_frame_rate: if v.rate_known { v.rate } else { Rational::new(0, 0) },
                        frame_count: v.frame_count_known.then(|| self.video_frame_count()),
                    }),
                });
            }
        }

        if let Some(a) = &self.audio {
            streams.push(StreamInfo {
                index: streams.len(),
                codec: codec_name(AUDIO_CODEC, a.codec),
                time_base: Rational::new(1, a.sample_rate.max(1) as i64),
                params: StreamParams::Audio(AudioParams {
                    sample_rate: a.sample_rate,
                    channels: a.channels,
                    sample_format: a.sample_format,
                    frame_size: a.frame_size_known.then_some(a.frame_size),
                }),
            });
        }

        streams
    }
}

fn codec_name(base: &str, behavior: CodecBehavior) -> String {
    match behavior {
        CodecBehavior::Supported => base.to_string(),
        CodecBehavior::Unsupported => format!("{base}-unsupported"),
        CodecBehavior::Broken => format!("{base}-broken"),
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Counters shared by every container a backend opens.
#[derive(Debug, Default)]
pub struct SyntheticStats {
    pub opens: AtomicU64,
    pub packets_read: AtomicU64,
    pub seeks: AtomicU64,
}

impl SyntheticStats {
    pub fn packets_read(&self) -> u64 {
        self.packets_read.load(Ordering::SeqCst)
    }

    pub fn seeks(&self) -> u64 {
        self.seeks.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct SyntheticBackend {
    stats: Arc<SyntheticStats>,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Arc<SyntheticStats> {
        self.stats.clone()
    }
}

impl MediaBackend for SyntheticBackend {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn open(&self, locator: &str) -> Result<Box<dyn Container>, BackendError> {
        let clip = SyntheticClip::from_locator(locator)?;
        if clip.fail_open {
            return Err(BackendError::NotFound(locator.to_string()));
        }
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticContainer {
            clip,
            stats: self.stats.clone(),
            streams: Vec::new(),
            probed: false,
            next_video: 0,
            next_video_stream: 0,
            next_audio: 0,
        }))
    }
}

// ============================================================================
// Container
// ============================================================================

struct SyntheticContainer {
    clip: SyntheticClip,
    stats: Arc<SyntheticStats>,
    streams: Vec<StreamInfo>,
    probed: bool,
    next_video: u64,
    next_video_stream: usize,
    next_audio: u64,
}

impl SyntheticContainer {
    fn audio_stream_index(&self) -> usize {
        self.clip.video.as_ref().map(|v| v.streams).unwrap_or(0)
    }

    fn write_video_packet(&mut self, packet: &mut Packet) {
        let index = self.next_video;
        let gop = self.clip.video.as_ref().map(|v| v.gop).unwrap_or(1);
        let streams = self.clip.video.as_ref().map(|v| v.streams).unwrap_or(1);

        packet.stream_index = self.next_video_stream;
        packet.pts = Some(self.clip.video_pts(index));
        packet.duration = self.clip.video_pts(index + 1) - self.clip.video_pts(index);
        packet.keyframe = index % gop == 0;
        packet.data.extend_from_slice(&index.to_le_bytes());
        packet.data.push(packet.keyframe as u8);

        self.next_video_stream += 1;
        if self.next_video_stream == streams {
            self.next_video_stream = 0;
            self.next_video += 1;
        }
    }

    fn write_audio_packet(&mut self, packet: &mut Packet) {
        let index = self.next_audio;
        let frame_size = self.clip.audio.as_ref().map(|a| a.frame_size).unwrap_or(1) as u64;
        let remaining = self.clip.audio_total_samples() - index * frame_size;
        let frames = remaining.min(frame_size) as u32;

        packet.stream_index = self.audio_stream_index();
        packet.pts = Some(self.clip.audio_pts(index));
        packet.duration = frames as i64;
        packet.keyframe = true;
        packet.data.extend_from_slice(&index.to_le_bytes());
        packet.data.extend_from_slice(&frames.to_le_bytes());

        self.next_audio += 1;
    }

    fn video_keyframe_at_or_before(&self, target_ms: i64) -> u64 {
        let count = self.clip.video_frame_count();
        let gop = self.clip.video.as_ref().map(|v| v.gop).unwrap_or(1);
        let frame = SyntheticClip::last_at_or_before(count, target_ms, |i| self.clip.video_ms(i));
        frame / gop * gop
    }

    fn audio_packet_at_or_before(&self, target_ms: i64) -> u64 {
        let count = self.clip.audio_packet_count();
        SyntheticClip::last_at_or_before(count, target_ms, |i| self.clip.audio_ms(i))
    }
}

impl Container for SyntheticContainer {
    fn probe(&mut self) -> Result<(), BackendError> {
        if self.clip.fail_probe {
            return Err(BackendError::InvalidData("synthetic probe failure".into()));
        }
        self.streams = self.clip.streams();
        self.probed = true;
        Ok(())
    }

    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn duration_us(&self) -> Option<i64> {
        (self.probed && self.clip.duration_known).then(|| self.clip.duration_ms * 1000)
    }

    fn read_packet(&mut self, packet: &mut Packet) -> Result<ReadStatus, BackendError> {
        packet.clear();

        let video_left = self.next_video < self.clip.video_frame_count();
        let audio_left = self.next_audio < self.clip.audio_packet_count();

        let take_video = match (video_left, audio_left) {
            (false, false) => return Ok(ReadStatus::EndOfStream),
            (true, false) => true,
            (false, true) => false,
            (true, true) => {
                self.clip.video_ms(self.next_video) <= self.clip.audio_ms(self.next_audio)
            }
        };

        if take_video {
            self.write_video_packet(packet);
        } else {
            self.write_audio_packet(packet);
        }
        self.stats.packets_read.fetch_add(1, Ordering::SeqCst);
        Ok(ReadStatus::Packet)
    }

    fn seek(&mut self, target: SeekTarget) -> Result<(), BackendError> {
        self.stats.seeks.fetch_add(1, Ordering::SeqCst);
        if self.clip.fail_seek {
            return Err(BackendError::Seek("synthetic seek failure".into()));
        }

        let target_ms = target.timestamp_ms.max(0);
        let stream_kind = match target.stream_index {
            Some(index) => {
                if self.clip.fail_stream_seek {
                    return Err(BackendError::Seek(format!("stream {index} not seekable")));
                }
                let stream = self
                    .streams
                    .get(index)
                    .ok_or_else(|| BackendError::Seek(format!("no stream {index}")))?;
                stream.kind()
            }
            None => None,
        };

        let anchor_on_audio = matches!(stream_kind, Some(crate::frame::MediaKind::Audio))
            || self.clip.video.is_none();

        if anchor_on_audio {
            let packet = self.audio_packet_at_or_before(target_ms);
            let anchor_ms = self.clip.audio_ms(packet);
            self.next_audio = packet;
            self.next_video = self.video_keyframe_at_or_before(anchor_ms);
        } else {
            let key = self.video_keyframe_at_or_before(target_ms);
            let anchor_ms = self.clip.video_ms(key);
            self.next_video = key;
            self.next_audio = self.audio_packet_at_or_before(anchor_ms);
        }
        self.next_video_stream = 0;
        Ok(())
    }

    fn open_decoder(&self, stream: &StreamInfo) -> Result<Box<dyn StreamDecoder>, BackendError> {
        if stream.codec.ends_with("-unsupported") {
            return Err(BackendError::UnsupportedCodec(stream.codec.clone()));
        }
        if stream.codec.ends_with("-broken") {
            return Err(BackendError::Codec(format!("{} failed to open", stream.codec)));
        }

        match &stream.params {
            StreamParams::Video(params) => {
                let delay = self.clip.video.as_ref().map(|v| v.delay).unwrap_or(0);
                Ok(Box::new(SyntheticVideoDecoder::new(params.clone(), delay)))
            }
            StreamParams::Audio(params) => {
                Ok(Box::new(SyntheticAudioDecoder::new(params.clone())))
            }
            StreamParams::Other => Err(BackendError::UnsupportedCodec(stream.codec.clone())),
        }
    }
}

// ============================================================================
// Decoders
// ============================================================================

fn read_u64(data: &[u8]) -> Result<u64, BackendError> {
    let bytes: [u8; 8] = data
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| BackendError::InvalidData("truncated synthetic packet".into()))?;
    Ok(u64::from_le_bytes(bytes))
}

fn read_u32(data: &[u8]) -> Result<u32, BackendError> {
    let bytes: [u8; 4] = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| BackendError::InvalidData("truncated synthetic packet".into()))?;
    Ok(u32::from_le_bytes(bytes))
}

struct SyntheticVideoDecoder {
    params: VideoParams,
    delay: usize,
    /// (pts, frame index) held back by the simulated reorder delay
    pending: VecDeque<(Option<i64>, u64)>,
    ready: VecDeque<(Option<i64>, u64)>,
    waiting_for_key: bool,
    eof: bool,
}

impl SyntheticVideoDecoder {
    fn new(params: VideoParams, delay: usize) -> Self {
        Self {
            params,
            delay,
            pending: VecDeque::new(),
            ready: VecDeque::new(),
            waiting_for_key: true,
            eof: false,
        }
    }

    fn paint(&self, index: u64) -> RawPicture {
        let luma = luma_for_index(index);
        let (w, h) = (self.params.width as usize, self.params.height as usize);
        let (cw, ch) = ((w + 1) / 2, (h + 1) / 2);
        let format = self.params.pixel_format;

        let (planes, strides) = match format {
            PixelFormat::YUV420P => (
                vec![vec![luma; w * h], vec![128; cw * ch], vec![128; cw * ch]],
                vec![w, cw, cw],
            ),
            PixelFormat::NV12 => (vec![vec![luma; w * h], vec![128; cw * 2 * ch]], vec![w, cw * 2]),
            PixelFormat::RGB24 => (vec![vec![luma; w * h * 3]], vec![w * 3]),
            PixelFormat::RGBA32 | PixelFormat::BGRA32 => {
                let mut data = vec![luma; w * h * 4];
                data.iter_mut().skip(3).step_by(4).for_each(|a| *a = 255);
                (vec![data], vec![w * 4])
            }
        };

        RawPicture {
            format,
            width: self.params.width,
            height: self.params.height,
            planes,
            strides,
        }
    }
}

impl StreamDecoder for SyntheticVideoDecoder {
    fn name(&self) -> &str {
        VIDEO_CODEC
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<(), BackendError> {
        if self.eof {
            return Err(BackendError::InvalidData("packet after end of stream".into()));
        }
        let index = read_u64(&packet.data)?;
        let keyframe = packet.data.get(8).copied().unwrap_or(0) != 0;

        if self.waiting_for_key && !keyframe {
            // Undecodable without a reference frame
            return Ok(());
        }
        self.waiting_for_key = false;

        self.pending.push_back((packet.pts, index));
        while self.pending.len() > self.delay {
            if let Some(frame) = self.pending.pop_front() {
                self.ready.push_back(frame);
            }
        }
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        self.ready.extend(self.pending.drain(..));
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self, frame: &mut RawFrame) -> Result<ReceiveStatus, BackendError> {
        match self.ready.pop_front() {
            Some((pts, index)) => {
                frame.pts = pts;
                frame.payload = RawPayload::Picture(self.paint(index));
                Ok(ReceiveStatus::Frame)
            }
            None if self.eof => Ok(ReceiveStatus::EndOfStream),
            None => Ok(ReceiveStatus::NeedMore),
        }
    }

    fn flush(&mut self) {
        self.pending.clear();
        self.ready.clear();
        self.waiting_for_key = true;
        self.eof = false;
    }
}

struct SyntheticAudioDecoder {
    params: AudioParams,
    ready: VecDeque<(Option<i64>, u64, u32)>,
    eof: bool,
}

impl SyntheticAudioDecoder {
    fn new(params: AudioParams) -> Self {
        Self {
            params,
            ready: VecDeque::new(),
            eof: false,
        }
    }

    fn render(&self, index: u64, frames: usize) -> SampleData {
        let value = sample_for_packet(index);
        let channels = self.params.channels as usize;
        let as_s16 = (value * 32768.0) as i16;
        match self.params.sample_format {
            SampleFormat::F32 => SampleData::F32(vec![value; frames * channels]),
            SampleFormat::F32Planar => SampleData::F32Planar(vec![vec![value; frames]; channels]),
            SampleFormat::S16 => SampleData::S16(vec![as_s16; frames * channels]),
            SampleFormat::S16Planar => SampleData::S16Planar(vec![vec![as_s16; frames]; channels]),
        }
    }
}

impl StreamDecoder for SyntheticAudioDecoder {
    fn name(&self) -> &str {
        AUDIO_CODEC
    }

    fn send_packet(&mut self, packet: &Packet) -> Result<(), BackendError> {
        let index = read_u64(&packet.data)?;
        let frames = read_u32(packet.data.get(8..).unwrap_or_default())?;
        self.ready.push_back((packet.pts, index, frames));
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self, frame: &mut RawFrame) -> Result<ReceiveStatus, BackendError> {
        match self.ready.pop_front() {
            Some((pts, index, frames)) => {
                frame.pts = pts;
                frame.payload = RawPayload::Samples(RawSamples {
                    sample_rate: self.params.sample_rate,
                    channels: self.params.channels,
                    frames: frames as usize,
                    data: self.render(index, frames as usize),
                });
                Ok(ReceiveStatus::Frame)
            }
            None if self.eof => Ok(ReceiveStatus::EndOfStream),
            None => Ok(ReceiveStatus::NeedMore),
        }
    }

    fn flush(&mut self) {
        self.ready.clear();
        self.eof = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(locator: &str) -> Box<dyn Container> {
        let mut container = SyntheticBackend::new().open(locator).unwrap();
        container.probe().unwrap();
        container
    }

    #[test]
    fn test_locator_defaults() {
        let clip = SyntheticClip::from_locator("synthetic://clip").unwrap();
        assert_eq!(clip.duration_ms, 10_000);
        assert!(clip.video.is_some());
        assert!(clip.audio.is_none());
        assert_eq!(clip.video_frame_count(), 300);
        assert_eq!(clip.video_ms(150), 5000);
    }

    #[test]
    fn test_locator_rejects_unknown_keys() {
        assert!(SyntheticClip::from_locator("synthetic://clip?bogus=1").is_err());
        assert!(SyntheticClip::from_locator("synthetic://clip?fps=0").is_err());
        assert!(SyntheticClip::from_locator("file:///tmp/a.wav").is_err());
    }

    #[test]
    fn test_ntsc_rate() {
        let clip = SyntheticClip::from_locator("synthetic://clip?fps=30000/1001&duration_ms=1001")
            .unwrap();
        assert_eq!(clip.video_frame_count(), 30);
        assert_eq!(clip.video_pts(1), 3003);
    }

    #[test]
    fn test_packets_interleave_in_time_order() {
        let mut container = open("synthetic://av?duration_ms=200&fps=25&audio_rate=8000&audio_frame=400");
        let mut packet = Packet::default();
        let mut last_ms = [i64::MIN; 2];
        let mut counts = [0usize; 2];

        while container.read_packet(&mut packet).unwrap() == ReadStatus::Packet {
            let stream = &container.streams()[packet.stream_index];
            let ms = stream.time_base.ticks_to_ms(packet.pts.unwrap());
            assert!(ms >= last_ms[packet.stream_index]);
            last_ms[packet.stream_index] = ms;
            counts[packet.stream_index] += 1;
        }
        // 5 video frames at 25 fps, 1600 samples / 400 per packet
        assert_eq!(counts, [5, 4]);
    }

    #[test]
    fn test_seek_lands_on_keyframe() {
        let mut container = open("synthetic://clip?gop=10");
        container
            .seek(SeekTarget {
                stream_index: Some(0),
                timestamp_ms: 5000,
            })
            .unwrap();
        let mut packet = Packet::default();
        container.read_packet(&mut packet).unwrap();
        assert!(packet.keyframe);
        assert_eq!(read_u64(&packet.data).unwrap(), 150);

        container
            .seek(SeekTarget {
                stream_index: Some(0),
                timestamp_ms: 5100,
            })
            .unwrap();
        container.read_packet(&mut packet).unwrap();
        assert_eq!(read_u64(&packet.data).unwrap(), 150);
    }

    #[test]
    fn test_decoder_waits_for_keyframe_and_delays() {
        let container = open("synthetic://clip?gop=4&delay=1");
        let mut decoder = container.open_decoder(&container.streams()[0]).unwrap();
        let mut frame = RawFrame::default();

        let packet = |index: u64, key: bool| {
            let mut data = index.to_le_bytes().to_vec();
            data.push(key as u8);
            Packet {
                stream_index: 0,
                pts: Some(index as i64 * 3000),
                duration: 3000,
                keyframe: key,
                data,
            }
        };

        decoder.send_packet(&packet(1, false)).unwrap();
        assert_eq!(decoder.receive_frame(&mut frame).unwrap(), ReceiveStatus::NeedMore);

        decoder.send_packet(&packet(4, true)).unwrap();
        assert_eq!(decoder.receive_frame(&mut frame).unwrap(), ReceiveStatus::NeedMore);
        decoder.send_packet(&packet(5, false)).unwrap();
        assert_eq!(decoder.receive_frame(&mut frame).unwrap(), ReceiveStatus::Frame);
        assert_eq!(frame.pts, Some(12_000));

        decoder.send_eof().unwrap();
        assert_eq!(decoder.receive_frame(&mut frame).unwrap(), ReceiveStatus::Frame);
        assert_eq!(frame.pts, Some(15_000));
        assert_eq!(decoder.receive_frame(&mut frame).unwrap(), ReceiveStatus::EndOfStream);

        decoder.flush();
        assert_eq!(decoder.receive_frame(&mut frame).unwrap(), ReceiveStatus::NeedMore);
    }

    #[test]
    fn test_codec_behaviors() {
        let container = open("synthetic://clip?video=unsupported&video_streams=2");
        let streams = container.streams().to_vec();
        assert!(matches!(
            container.open_decoder(&streams[0]),
            Err(BackendError::UnsupportedCodec(_))
        ));
        assert!(container.open_decoder(&streams[1]).is_ok());

        let broken = open("synthetic://clip?video=broken");
        assert!(matches!(
            broken.open_decoder(&broken.streams()[0]),
            Err(BackendError::Codec(_))
        ));
    }

    #[test]
    fn test_open_and_probe_failures() {
        let backend = SyntheticBackend::new();
        assert!(backend.open("synthetic://clip?open=fail").is_err());
        let mut container = backend.open("synthetic://clip?probe=fail").unwrap();
        assert!(container.probe().is_err());
        assert_eq!(backend.stats().opens.load(Ordering::SeqCst), 1);
    }
}

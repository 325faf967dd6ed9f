//! # Demux / Decode Backend
//!
//! The narrow capability the engine drives: open a container, enumerate its
//! streams, pull compressed packets, push them through a per-stream decoder
//! and reposition the read cursor.
//!
//! ## Implementations
//! - [`synthetic::SyntheticBackend`] - deterministic test-pattern container
//!   addressed with `synthetic://` locators
//! - [`symphonia_file::SymphoniaBackend`] - local audio files through symphonia
//! - [`RoutingBackend`] - picks one of the above by locator scheme

pub mod synthetic;
#[cfg(feature = "symphonia-backend")]
pub mod symphonia_file;

use std::collections::TryReserveError;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::{PixelFormat, SampleFormat, SampleData};
use crate::frame::MediaKind;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unsupported locator: {0}")]
    UnsupportedLocator(String),
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),
    #[error("Codec negotiation failed: {0}")]
    Codec(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Seek failed: {0}")]
    Seek(String),
    #[error("Allocation failed: {0}")]
    Alloc(String),
}

impl From<TryReserveError> for BackendError {
    fn from(e: TryReserveError) -> Self {
        BackendError::Alloc(e.to_string())
    }
}

// ============================================================================
// Time Base
// ============================================================================

/// Rational number used for stream time bases and frame rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub num: i64,
    pub den: i64,
}

impl Rational {
    pub const fn new(num: i64, den: i64) -> Self {
        Self { num, den }
    }

    /// Value as a float, zero when the denominator is zero.
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }

    /// Convert a timestamp in this time base to milliseconds.
    pub fn ticks_to_ms(&self, ticks: i64) -> i64 {
        if self.den == 0 {
            return 0;
        }
        let ms = ticks as i128 * 1000 * self.num as i128 / self.den as i128;
        ms.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

// ============================================================================
// Streams
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub avg_frame_rate: Rational,
    /// Frame count reported by the container, if any
    pub frame_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioParams {
    pub sample_rate: u32,
    pub channels: u32,
    pub sample_format: SampleFormat,
    /// Samples per channel in one coded frame, if the codec reports it
    pub frame_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamParams {
    Video(VideoParams),
    Audio(AudioParams),
    Other,
}

/// One elementary stream as reported by the container.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub index: usize,
    pub codec: String,
    pub time_base: Rational,
    pub params: StreamParams,
}

impl StreamInfo {
    pub fn kind(&self) -> Option<MediaKind> {
        match self.params {
            StreamParams::Video(_) => Some(MediaKind::Video),
            StreamParams::Audio(_) => Some(MediaKind::Audio),
            StreamParams::Other => None,
        }
    }
}

// ============================================================================
// Packets and Frames
// ============================================================================

/// One compressed unit. Reused across reads; `clear` keeps the allocation.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub duration: i64,
    pub keyframe: bool,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        Ok(Self {
            data,
            ..Default::default()
        })
    }

    pub fn clear(&mut self) {
        self.stream_index = 0;
        self.pts = None;
        self.duration = 0;
        self.keyframe = false;
        self.data.clear();
    }
}

/// Decoded picture in the decoder's native layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPicture {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub planes: Vec<Vec<u8>>,
    pub strides: Vec<usize>,
}

/// Decoded audio in the decoder's native layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSamples {
    pub sample_rate: u32,
    pub channels: u32,
    /// Samples per channel
    pub frames: usize,
    pub data: SampleData,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawPayload {
    #[default]
    Empty,
    Picture(RawPicture),
    Samples(RawSamples),
}

/// Scratch frame a decoder writes into. Owned by the session and reused.
#[derive(Debug, Clone, Default)]
pub struct RawFrame {
    pub pts: Option<i64>,
    pub payload: RawPayload,
}

impl RawFrame {
    /// Drop the payload reference so nothing stale survives a seek.
    pub fn unref(&mut self) {
        self.pts = None;
        self.payload = RawPayload::Empty;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Packet,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStatus {
    Frame,
    NeedMore,
    EndOfStream,
}

/// Backward seek request. `stream_index: None` means container-global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekTarget {
    pub stream_index: Option<usize>,
    pub timestamp_ms: i64,
}

// ============================================================================
// Traits
// ============================================================================

/// Opens media resources.
pub trait MediaBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Open the resource. Stream information is not available until `probe`.
    fn open(&self, locator: &str) -> Result<Box<dyn Container>, BackendError>;
}

/// An opened container.
pub trait Container: Send {
    /// Read enough of the container to populate `streams` and `duration_us`.
    fn probe(&mut self) -> Result<(), BackendError>;

    fn streams(&self) -> &[StreamInfo];

    fn duration_us(&self) -> Option<i64>;

    /// Fill `packet` with the next compressed unit of any stream.
    fn read_packet(&mut self, packet: &mut Packet) -> Result<ReadStatus, BackendError>;

    /// Move the read cursor to the nearest position at or before the target.
    fn seek(&mut self, target: SeekTarget) -> Result<(), BackendError>;

    /// Create a decoder for `stream`. `UnsupportedCodec` means no decoder exists.
    fn open_decoder(&self, stream: &StreamInfo) -> Result<Box<dyn StreamDecoder>, BackendError>;
}

/// Per-stream decoder with send/receive semantics.
pub trait StreamDecoder: Send {
    fn name(&self) -> &str;

    fn send_packet(&mut self, packet: &Packet) -> Result<(), BackendError>;

    /// Signal end of input so delayed frames can be drained.
    fn send_eof(&mut self) -> Result<(), BackendError>;

    fn receive_frame(&mut self, frame: &mut RawFrame) -> Result<ReceiveStatus, BackendError>;

    /// Drop all buffered state; required after a seek.
    fn flush(&mut self);
}

// ============================================================================
// Routing
// ============================================================================

/// Dispatches `synthetic://` locators to the synthetic backend and
/// everything else to the file backend.
pub struct RoutingBackend {
    synthetic: synthetic::SyntheticBackend,
    #[cfg(feature = "symphonia-backend")]
    files: symphonia_file::SymphoniaBackend,
}

impl RoutingBackend {
    pub fn new() -> Self {
        Self {
            synthetic: synthetic::SyntheticBackend::new(),
            #[cfg(feature = "symphonia-backend")]
            files: symphonia_file::SymphoniaBackend::new(),
        }
    }
}

impl Default for RoutingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for RoutingBackend {
    fn name(&self) -> &str {
        "routing"
    }

    fn open(&self, locator: &str) -> Result<Box<dyn Container>, BackendError> {
        if locator.starts_with(synthetic::SCHEME) {
            return self.synthetic.open(locator);
        }

        #[cfg(feature = "symphonia-backend")]
        {
            self.files.open(locator)
        }
        #[cfg(not(feature = "symphonia-backend"))]
        {
            Err(BackendError::UnsupportedLocator(locator.to_string()))
        }
    }
}

/// Backend used when none is given explicitly.
pub fn default_backend() -> Arc<dyn MediaBackend> {
    Arc::new(RoutingBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_to_ms() {
        let tb = Rational::new(1, 90_000);
        assert_eq!(tb.ticks_to_ms(90_000), 1000);
        assert_eq!(tb.ticks_to_ms(3000), 33);
        assert_eq!(tb.ticks_to_ms(i64::MAX), i64::MAX);
        assert_eq!(Rational::new(1000, 1).ticks_to_ms(i64::MIN), i64::MIN);

        let broken = Rational::new(1, 0);
        assert_eq!(broken.ticks_to_ms(12345), 0);
        assert_eq!(broken.as_f64(), 0.0);
    }

    #[test]
    fn test_packet_clear_keeps_allocation() {
        let mut packet = Packet::with_capacity(4096).unwrap();
        packet.data.extend_from_slice(&[1, 2, 3]);
        packet.pts = Some(7);
        packet.clear();
        assert!(packet.data.is_empty());
        assert!(packet.data.capacity() >= 4096);
        assert_eq!(packet.pts, None);
    }

    #[test]
    fn test_routing_rejects_missing_file() {
        let backend = RoutingBackend::new();
        assert!(backend.open("/definitely/not/here.wav").is_err());
        assert!(backend.open("synthetic://clip?fps=30").is_ok());
    }
}

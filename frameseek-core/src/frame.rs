//! # Caller-Owned Frames
//!
//! Everything handed to a caller lives here. Each frame owns its buffer
//! outright; nothing in this module can borrow from a session's scratch
//! space, so a returned frame can outlive the session that produced it.

use std::fmt;

use serde::Serialize;

use crate::error::FrameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Audio => f.write_str("audio"),
        }
    }
}

/// Nearest frame number for a presentation time, `None` when fps is unknown.
pub fn frame_index(pts_ms: i64, fps: f64) -> Option<i64> {
    if fps > 0.0 {
        Some((pts_ms as f64 / 1000.0 * fps).round() as i64)
    } else {
        None
    }
}

// ============================================================================
// Video
// ============================================================================

/// A decoded video frame as packed RGBA.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Packed RGBA, `stride * height` bytes
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub stride: usize,
    /// Presentation time in milliseconds
    pub pts_ms: i64,
    /// Derived frame number, `None` if the stream has no usable frame rate
    pub index: Option<i64>,
}

impl VideoFrame {
    /// RGBA value at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * 4;
        let px = self.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Release the frame's memory. Equivalent to dropping it.
    pub fn release(self) {}
}

// ============================================================================
// Audio
// ============================================================================

/// A decoded audio frame as interleaved `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Interleaved samples, `sample_count * channels` values
    pub samples: Vec<f32>,
    /// Samples per channel
    pub sample_count: usize,
    pub channels: u32,
    pub sample_rate: u32,
    /// Presentation time in milliseconds
    pub pts_ms: i64,
}

impl AudioFrame {
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count as f64 * 1000.0 / self.sample_rate as f64
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Release the frame's memory. Equivalent to dropping it.
    pub fn release(self) {}
}

// ============================================================================
// Batches
// ============================================================================

/// Result of a sequential range fetch.
///
/// `frames` may be shorter than `requested`; `stopped_by` says why.
#[derive(Debug)]
pub struct VideoFrameBatch {
    pub frames: Vec<VideoFrame>,
    pub requested: usize,
    pub stopped_by: Option<FrameError>,
}

impl VideoFrameBatch {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.frames.len() == self.requested
    }

    /// Release every frame and the batch itself.
    pub fn release(self) {}
}

impl IntoIterator for VideoFrameBatch {
    type Item = VideoFrame;
    type IntoIter = std::vec::IntoIter<VideoFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}

// ============================================================================
// Media Info
// ============================================================================

/// Summary of the opened media. `Default` is the "nothing open" state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaInfo {
    /// `None` when unknown or when nothing is open
    pub duration_ms: Option<i64>,
    pub width: u32,
    pub height: u32,
    /// Average frame rate, 0.0 when undefined
    pub fps: f64,
    /// Container frame count, else `duration * fps`, else 0
    pub total_frames: i64,
    pub audio_sample_rate: u32,
    pub audio_channels: u32,
}

impl MediaInfo {
    pub fn is_known(&self) -> bool {
        self.duration_ms.is_some()
    }
}

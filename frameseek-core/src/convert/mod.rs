//! # Converters
//!
//! Turn decoder-native frames into the two fixed output layouts:
//! packed RGBA for video and interleaved stereo `f32` for audio.

pub mod audio;
pub mod video;

use thiserror::Error;

pub use audio::{Resampler, SampleData, SampleFormat, OUTPUT_CHANNELS};
pub use video::{rgba_buffer_size, ColorSpace, PixelConverter, PixelFormat};

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Picture has zero width or height")]
    EmptyPicture,
    #[error("Format mismatch: converter built for {expected:?}, frame is {actual:?}")]
    FormatMismatch {
        expected: PixelFormat,
        actual: PixelFormat,
    },
    #[error("Size mismatch: converter built for {expected:?}, frame is {actual:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Plane {0} missing")]
    MissingPlane(usize),
    #[error("Plane {plane} stride {stride} is below the row size {min}")]
    BadStride { plane: usize, stride: usize, min: usize },
    #[error("Plane {plane} too short: need {needed} bytes, have {have}")]
    ShortPlane {
        plane: usize,
        needed: usize,
        have: usize,
    },
    #[error("Output buffer too small: need {needed}, have {have}")]
    ShortOutput { needed: usize, have: usize },
    #[error("Channel mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: u32, actual: u32 },
    #[error("Sample buffer too short for {frames} frames x {channels} channels")]
    ShortSamples { frames: usize, channels: u32 },
    #[error("Sample rate must be positive")]
    InvalidSampleRate,
    #[error("Expected a {expected} payload")]
    WrongPayload { expected: &'static str },
}

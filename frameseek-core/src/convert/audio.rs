//! Sample format / channel layout conversion.
//!
//! Whatever the decoder produces, callers get interleaved stereo `f32` at the
//! source sample rate. Mono is duplicated, surround layouts are folded down
//! with fixed -3 dB weights for center and surround channels.

use serde::{Deserialize, Serialize};

use super::ConvertError;
use crate::backend::RawSamples;

/// Output channel count. Fixed.
pub const OUTPUT_CHANNELS: u32 = 2;

const MINUS_3DB: f32 = std::f32::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    F32,
    F32Planar,
    S16,
    S16Planar,
}

impl SampleFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "f32" | "flt" => Some(Self::F32),
            "f32p" | "fltp" => Some(Self::F32Planar),
            "s16" => Some(Self::S16),
            "s16p" => Some(Self::S16Planar),
            _ => None,
        }
    }
}

/// Decoded samples in one of the supported layouts.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    F32(Vec<f32>),
    F32Planar(Vec<Vec<f32>>),
    S16(Vec<i16>),
    S16Planar(Vec<Vec<i16>>),
}

impl SampleData {
    pub fn format(&self) -> SampleFormat {
        match self {
            SampleData::F32(_) => SampleFormat::F32,
            SampleData::F32Planar(_) => SampleFormat::F32Planar,
            SampleData::S16(_) => SampleFormat::S16,
            SampleData::S16Planar(_) => SampleFormat::S16Planar,
        }
    }

    fn sample(&self, channels: usize, frame: usize, channel: usize) -> f32 {
        match self {
            SampleData::F32(data) => data[frame * channels + channel],
            SampleData::F32Planar(planes) => planes[channel][frame],
            SampleData::S16(data) => data[frame * channels + channel] as f32 / 32768.0,
            SampleData::S16Planar(planes) => planes[channel][frame] as f32 / 32768.0,
        }
    }

    fn holds(&self, channels: usize, frames: usize) -> bool {
        match self {
            SampleData::F32(data) => data.len() >= channels * frames,
            SampleData::S16(data) => data.len() >= channels * frames,
            SampleData::F32Planar(planes) => {
                planes.len() >= channels && planes.iter().take(channels).all(|p| p.len() >= frames)
            }
            SampleData::S16Planar(planes) => {
                planes.len() >= channels && planes.iter().take(channels).all(|p| p.len() >= frames)
            }
        }
    }
}

/// (left, right) weight for each input channel.
fn downmix_weights(channels: u32) -> Vec<(f32, f32)> {
    let mut weights = match channels {
        1 => vec![(1.0, 1.0)],
        2 => vec![(1.0, 0.0), (0.0, 1.0)],
        // FL FR FC
        3 => vec![(1.0, 0.0), (0.0, 1.0), (MINUS_3DB, MINUS_3DB)],
        // FL FR BL BR
        4 => vec![(1.0, 0.0), (0.0, 1.0), (MINUS_3DB, 0.0), (0.0, MINUS_3DB)],
        // FL FR FC (LFE) BL BR
        _ => {
            let mut w = vec![(1.0, 0.0), (0.0, 1.0), (MINUS_3DB, MINUS_3DB)];
            if channels >= 6 {
                w.push((0.0, 0.0));
            }
            w.push((MINUS_3DB, 0.0));
            w.push((0.0, MINUS_3DB));
            w
        }
    };

    // Extra channels alternate sides at half gain
    for extra in weights.len()..channels as usize {
        weights.push(if extra % 2 == 0 { (0.5, 0.0) } else { (0.0, 0.5) });
    }
    weights.truncate(channels as usize);

    if channels > 2 {
        let left: f32 = weights.iter().map(|w| w.0).sum();
        let right: f32 = weights.iter().map(|w| w.1).sum();
        let norm = left.max(right);
        for w in weights.iter_mut() {
            w.0 /= norm;
            w.1 /= norm;
        }
    }
    weights
}

/// Converts one stream's decoded samples to interleaved stereo `f32`.
pub struct Resampler {
    in_channels: u32,
    sample_rate: u32,
    weights: Vec<(f32, f32)>,
}

impl Resampler {
    pub fn new(in_channels: u32, sample_rate: u32) -> Result<Self, ConvertError> {
        if in_channels == 0 {
            return Err(ConvertError::ChannelMismatch {
                expected: 1,
                actual: 0,
            });
        }
        if sample_rate == 0 {
            return Err(ConvertError::InvalidSampleRate);
        }
        Ok(Self {
            in_channels,
            sample_rate,
            weights: downmix_weights(in_channels),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Convert `src` into `out` (cleared first). Returns samples per channel.
    pub fn convert(&self, src: &RawSamples, out: &mut Vec<f32>) -> Result<usize, ConvertError> {
        if src.channels != self.in_channels {
            return Err(ConvertError::ChannelMismatch {
                expected: self.in_channels,
                actual: src.channels,
            });
        }
        let channels = src.channels as usize;
        if !src.data.holds(channels, src.frames) {
            return Err(ConvertError::ShortSamples {
                frames: src.frames,
                channels: src.channels,
            });
        }

        out.clear();
        let needed = src.frames * OUTPUT_CHANNELS as usize;
        out.try_reserve(needed).map_err(|_| ConvertError::ShortOutput {
            needed,
            have: out.capacity(),
        })?;

        for frame in 0..src.frames {
            let mut left = 0.0f32;
            let mut right = 0.0f32;
            for (channel, (wl, wr)) in self.weights.iter().enumerate() {
                let s = src.data.sample(channels, frame, channel);
                left += s * wl;
                right += s * wr;
            }
            out.push(left);
            out.push(right);
        }
        Ok(src.frames)
    }
}

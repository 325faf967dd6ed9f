//! # Error Types
//!
//! Every failure a caller can observe, grouped by where it happens:
//! opening media, fetching a frame, or talking to the task queue.
//! Each public error carries a stable negative `code()` for callers on the
//! other side of a language boundary.

use thiserror::Error;

use crate::backend::BackendError;
use crate::convert::ConvertError;
use crate::frame::MediaKind;

/// Failure of [`MediaEngine::open`](crate::MediaEngine::open).
///
/// No partial session is left behind when one of these is returned.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Failed to open input {locator}: {source}")]
    OpenFailed {
        locator: String,
        #[source]
        source: BackendError,
    },
    #[error("Failed to find stream info: {0}")]
    ProbeFailed(#[source] BackendError),
    #[error("Allocation failed: {0}")]
    AllocFailed(String),
}

impl OpenError {
    pub fn code(&self) -> i32 {
        match self {
            OpenError::OpenFailed { .. } => -1,
            OpenError::ProbeFailed(_) => -2,
            OpenError::AllocFailed(_) => -3,
        }
    }
}

/// Failure of a single frame request.
///
/// None of these tear down the session; the next request starts from
/// wherever the backend was left.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("No media is open")]
    NotOpen,
    #[error("No {0} stream in the opened media")]
    NoStream(MediaKind),
    #[error("Unknown or non-positive {0} rate, cannot address by index")]
    UnknownRate(MediaKind),
    #[error("No frame at or after {target_ms} ms before end of stream")]
    NotFound { target_ms: i64 },
    #[error("Seek to {target_ms} ms failed: {source}")]
    Seek {
        target_ms: i64,
        #[source]
        source: BackendError,
    },
    #[error("Read failed: {0}")]
    Read(#[source] BackendError),
    #[error("Decode failed: {0}")]
    Decode(#[source] BackendError),
    #[error("Conversion failed: {0}")]
    Convert(#[from] ConvertError),
    #[error("Out of memory copying {bytes} bytes")]
    OutOfMemory { bytes: usize },
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error("Task panicked: {0}")]
    TaskPanicked(String),
}

impl FrameError {
    pub fn code(&self) -> i32 {
        match self {
            FrameError::NotFound { .. } => -1,
            FrameError::NotOpen => -10,
            FrameError::NoStream(_) => -11,
            FrameError::UnknownRate(_) => -12,
            FrameError::InvalidRange(_) => -13,
            FrameError::Seek { .. } => -20,
            FrameError::Read(_) => -21,
            FrameError::Decode(_) => -22,
            FrameError::Convert(_) => -23,
            FrameError::OutOfMemory { .. } => -30,
            FrameError::TaskPanicked(_) => -40,
        }
    }

    /// True for "ran off the end of the media", as opposed to a hard error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FrameError::NotFound { .. })
    }
}

/// Failure to talk to the asynchronous task queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Task queue has been released")]
    Released,
    #[error("Failed to spawn decode worker: {0}")]
    Spawn(#[from] std::io::Error),
}

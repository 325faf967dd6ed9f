//! # frameseek Core
//!
//! Timestamp-addressed frame extraction from a single opened media file.
//!
//! - [`MediaEngine`] - synchronous single-frame and range requests
//! - [`TaskQueue`] - FIFO of asynchronous requests served by one worker thread
//! - [`backend`] - the demux/decode capability the engine drives
//!
//! Every frame handed out is an owned copy in a fixed layout: packed RGBA for
//! video, interleaved stereo `f32` for audio.

// ============================================================================
// Backend / Conversion
// ============================================================================
pub mod backend;
pub mod convert;

// ============================================================================
// Session / Decode
// ============================================================================
pub mod session;
pub mod decode;
pub mod frame;

// ============================================================================
// Request APIs
// ============================================================================
pub mod engine;
pub mod queue;

// ============================================================================
// Support
// ============================================================================
pub mod config;
pub mod error;

pub use config::EngineConfig;
pub use decode::VideoRange;
pub use engine::MediaEngine;
pub use error::{FrameError, OpenError, QueueError};
pub use frame::{AudioFrame, MediaInfo, MediaKind, VideoFrame, VideoFrameBatch};
pub use queue::{RangeCallbacks, RangeProgress, RangeSummary, RequestId, TaskQueue};
pub use session::MediaSession;

// ============================================================================
// Version
// ============================================================================
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

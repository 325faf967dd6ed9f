//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::ColorSpace;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Samples per audio frame when the codec does not report one
    pub audio_fallback_frame_size: u32,
    /// Initial capacity of the reusable packet buffer (bytes)
    pub packet_capacity: usize,
    /// YUV matrix used for RGBA conversion
    pub color_space: ColorSpace,
    /// Name given to the decode worker thread
    pub worker_thread_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            audio_fallback_frame_size: 1024,
            packet_capacity: 64 * 1024,
            color_space: ColorSpace::BT709,
            worker_thread_name: "frameseek-decode".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio_fallback_frame_size == 0 {
            return Err(ConfigError::Invalid(
                "audio_fallback_frame_size must be positive".into(),
            ));
        }
        if self.worker_thread_name.is_empty() {
            return Err(ConfigError::Invalid("worker_thread_name is empty".into()));
        }
        Ok(())
    }
}

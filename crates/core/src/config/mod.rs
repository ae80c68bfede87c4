use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CaptureSettings, LavaError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub playback: PlaybackConfig,
    pub capture: CaptureSettings,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.playback.frame_rate == 0 {
            return Err(LavaError::msg("playback frame rate must be non-zero"));
        }
        let stop = self.playback.stop_after_seconds;
        if stop.is_nan() || stop <= 0.0 {
            return Err(LavaError::msg("playback stop point must be positive"));
        }
        self.capture.validate()
    }
}

/// Configuration of the headless frame loop and the timeline stop point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub frame_rate: u32,
    pub stop_after_seconds: f32,
    pub record_duration_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            stop_after_seconds: crate::timeline::STOP_AFTER_SECONDS,
            record_duration_ms: 6_500,
        }
    }
}

impl PlaybackConfig {
    pub fn frame_delta(&self) -> f32 {
        1.0 / self.frame_rate as f32
    }
}

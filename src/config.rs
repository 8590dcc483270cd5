use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{ClipBatchError, Result};

fn default_extension() -> String {
    "mp4".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub media: MediaConfig,
    pub trim: TrimConfig,
    pub timelapse: TimelapseConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Value passed to ffmpeg's -loglevel. Progress percentages need the input
    /// dump (`Duration:`), which ffmpeg only prints at `info` or above.
    pub log_level: String,
    /// Additional options appended to every invocation just before the output path
    pub extra_args: Vec<String>,
    /// Merge policy: stream copy (fast, lossless) or re-encode with faststart
    pub merge_mode: MergeMode,
    /// Video encoder used whenever a filter forces re-encoding
    pub video_codec: String,
    /// Encoder speed preset (ultrafast, veryfast, fast, medium, slow)
    pub preset: String,
    /// Constant rate factor (0-51, lower = better quality)
    pub crf: u8,
    /// Audio encoder used when audio must be re-encoded
    pub audio_codec: String,
    /// Audio bitrate in kb/s
    pub audio_bitrate_kbps: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Concatenate streams without re-encoding (-c copy)
    Copy,
    /// Re-encode the joined stream and move the moov atom to the front
    Reencode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrimConfig {
    /// Start offset in seconds used when a request omits trimStart
    pub default_start: f64,
    /// Window length in seconds used when a request omits trimDuration
    pub default_duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelapseConfig {
    /// Output frame rate used when a request omits targetFps
    pub default_fps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// File extension (without dot) listed as a video, matched case-insensitively
    #[serde(default = "default_extension")]
    pub extension: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// Optional compiled gettext catalog (.mo) for user-facing messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                log_level: "info".to_string(),
                extra_args: vec![
                    // Example options users can add:
                    // "-pix_fmt".to_string(), "yuv420p".to_string(),
                    // "-threads".to_string(), "4".to_string(),
                ],
                merge_mode: MergeMode::Copy,
                video_codec: "libx264".to_string(),
                preset: "fast".to_string(),
                crf: 23,
                audio_codec: "aac".to_string(),
                audio_bitrate_kbps: 128,
            },
            trim: TrimConfig {
                default_start: 0.0,
                default_duration: 30.0,
            },
            timelapse: TimelapseConfig { default_fps: 60 },
            library: LibraryConfig::default(),
            messages: MessagesConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ClipBatchError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.media.binary_path.trim().is_empty() {
            return Err(ClipBatchError::Config(
                "media.binary_path must not be empty".to_string(),
            ));
        }
        if self.media.crf > 51 {
            return Err(ClipBatchError::Config(format!(
                "media.crf must be between 0 and 51, got {}",
                self.media.crf
            )));
        }
        if !(self.trim.default_start >= 0.0) || !(self.trim.default_duration > 0.0) {
            return Err(ClipBatchError::Config(
                "trim.default_start must be >= 0 and trim.default_duration > 0".to_string(),
            ));
        }
        if self.timelapse.default_fps == 0 {
            return Err(ClipBatchError::Config(
                "timelapse.default_fps must be positive".to_string(),
            ));
        }
        if matches!(
            self.media.log_level.as_str(),
            "quiet" | "panic" | "fatal" | "error" | "warning"
        ) {
            warn!(
                "media.log_level = {} hides the input duration; progress will only show completion",
                self.media.log_level
            );
        }
        Ok(())
    }
}

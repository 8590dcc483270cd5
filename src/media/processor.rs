use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{ClipBatchError, Result};
use super::{DiagnosticBuffer, MediaCommand, MediaCommandBuilder, MediaExecutor, ProgressTracker};

/// Concrete implementation of media executor (FFmpeg-based)
pub struct FfmpegExecutor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegExecutor {
    /// Create a new ffmpeg executor
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(config.clone());

        Self {
            config,
            command_builder,
        }
    }
}

#[async_trait]
impl MediaExecutor for FfmpegExecutor {
    async fn execute(&self, command: &MediaCommand, mut progress: ProgressTracker) -> Result<()> {
        debug!("Executing media processing command: {}", command.command_line());
        debug!("Description: {}", command.description);

        let mut child = Command::new(&command.binary_path)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ClipBatchError::tool_execution(
                        format!("FFmpeg not found at path: {}", command.binary_path),
                        e.to_string(),
                    )
                } else {
                    ClipBatchError::tool_execution(
                        format!("Failed to start {}", command.binary_path),
                        e.to_string(),
                    )
                }
            })?;

        let mut diagnostic = DiagnosticBuffer::default();

        if let Some(stderr) = child.stderr.take() {
            // ffmpeg may print non-UTF-8 file names, so split on raw bytes
            let mut segments = BufReader::new(stderr).split(b'\n');
            loop {
                match segments.next_segment().await {
                    Ok(Some(segment)) => {
                        let line = String::from_utf8_lossy(&segment);
                        let line = line.trim_end();
                        if line.is_empty() {
                            continue;
                        }
                        if !progress.observe_line(line) {
                            diagnostic.push(line);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        diagnostic.push(format!("<stderr read error: {}>", e));
                        break;
                    }
                }
            }
        }

        let status = child.wait().await.map_err(|e| {
            ClipBatchError::tool_execution(
                format!("{} failed: could not wait for ffmpeg", command.description),
                e.to_string(),
            )
        })?;

        if !status.success() {
            let exit = match status.code() {
                Some(code) => format!("exit code {}", code),
                None => "termination by signal".to_string(),
            };
            return Err(ClipBatchError::tool_execution(
                format!("{} failed: ffmpeg ended with {}", command.description, exit),
                diagnostic.into_string(),
            ));
        }

        Ok(())
    }

    /// Check if media processor is available
    fn check_availability(&self) -> Result<()> {
        let command = self.command_builder.version_check();
        let output = std::process::Command::new(&command.binary_path)
            .args(&command.args)
            .output()
            .map_err(|e| {
                ClipBatchError::tool_execution(
                    format!("FFmpeg not found at path: {}", self.config.binary_path),
                    e.to_string(),
                )
            })?;

        if output.status.success() {
            info!("FFmpeg is available");
            Ok(())
        } else {
            Err(ClipBatchError::tool_execution(
                "FFmpeg version check failed",
                String::from_utf8_lossy(&output.stderr).to_string(),
            ))
        }
    }

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let command = self.command_builder.version_check();
        let output = Command::new(&command.binary_path)
            .args(&command.args)
            .output()
            .await
            .map_err(|e| {
                ClipBatchError::tool_execution("Failed to execute ffmpeg", e.to_string())
            })?;

        if output.status.success() {
            let version_info = String::from_utf8_lossy(&output.stdout);
            // The first line carries the version
            let first_line = version_info.lines().next().unwrap_or("Unknown version");
            Ok(first_line.to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ClipBatchError::tool_execution(
                "FFmpeg version check failed",
                stderr.to_string(),
            ))
        }
    }
}

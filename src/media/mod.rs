// Media processing layer
//
// - Commands: ffmpeg argument builders for every batch operation
// - Progress: stderr interpretation (progress percentage, diagnostic capture)
// - Processor: FFmpeg-backed executor spawning one process per command

pub mod commands;
pub mod processor;
pub mod progress;

use async_trait::async_trait;
use std::sync::Arc;

pub use commands::*;
pub use processor::*;
pub use progress::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Runs ffmpeg commands on behalf of the job runner
#[async_trait]
pub trait MediaExecutor: Send + Sync {
    /// Run one command to completion, feeding its output through `progress`.
    ///
    /// A non-zero exit is reported as a tool execution error carrying the
    /// captured diagnostic output.
    async fn execute(&self, command: &MediaCommand, progress: ProgressTracker) -> Result<()>;

    /// Check if the executor's binary is available
    fn check_availability(&self) -> Result<()>;

    /// Get version information of the underlying tool
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media executor instances
pub struct MediaExecutorFactory;

impl MediaExecutorFactory {
    /// Create the default media executor implementation (FFmpeg-based)
    pub fn create_executor(config: MediaConfig) -> Arc<dyn MediaExecutor> {
        Arc::new(processor::FfmpegExecutor::new(config))
    }
}

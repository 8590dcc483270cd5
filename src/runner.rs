use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info, warn};

use crate::error::{ClipBatchError, ErrorKind};
use crate::events::{self, EventSender, JobEvent};
use crate::invocation::Invocation;
use crate::media::{MediaExecutor, ProgressTracker};

/// Terminal result of one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Success(JobSuccess),
    Failure(JobFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSuccess {
    pub output_file_name: String,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub diagnostic: String,
}

impl From<&ClipBatchError> for JobFailure {
    fn from(err: &ClipBatchError) -> Self {
        let message = match err {
            ClipBatchError::ToolExecution { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            kind: err.kind(),
            message,
            diagnostic: err.diagnostic(),
        }
    }
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Executes invocations one at a time. Each call starts at most one ffmpeg process
/// and never retries.
#[derive(Clone)]
pub struct JobRunner {
    executor: Arc<dyn MediaExecutor>,
    events: Option<EventSender>,
}

impl JobRunner {
    pub fn new(executor: Arc<dyn MediaExecutor>) -> Self {
        Self {
            executor,
            events: None,
        }
    }

    /// Forward job lifecycle signals to `events`
    pub fn with_events(mut self, events: Option<EventSender>) -> Self {
        self.events = events;
        self
    }

    pub async fn run(&self, invocation: Invocation) -> JobOutcome {
        let Invocation {
            job_id,
            description,
            command,
            output_file_name,
            output_path,
            list_artifact,
            timing,
            ..
        } = invocation;

        if let Some(artifact) = &list_artifact {
            if let Err(e) = fs::write(&artifact.path, &artifact.contents).await {
                error!("Failed to write {}: {}", artifact.path.display(), e);
                // a short write can leave a truncated list behind
                remove_artifact(&artifact.path).await;
                let failure = JobFailure {
                    kind: ErrorKind::IoFailure,
                    message: "Failed to create video list file".to_string(),
                    diagnostic: e.to_string(),
                };
                self.emit(JobEvent::Failed {
                    job_id,
                    message: failure.message.clone(),
                });
                return JobOutcome::Failure(failure);
            }
        }

        info!("Starting {} -> {}", description, output_path.display());
        self.emit(JobEvent::Started {
            job_id,
            description: description.clone(),
            command_line: command.command_line(),
        });

        let progress = ProgressTracker::new(job_id, timing, self.events.clone());
        let result = self.executor.execute(&command, progress).await;

        if let Some(artifact) = &list_artifact {
            remove_artifact(&artifact.path).await;
        }

        match result {
            Ok(()) => {
                info!("{} finished: {}", description, output_path.display());
                self.emit(JobEvent::Completed {
                    job_id,
                    output_path: output_path.clone(),
                });
                JobOutcome::Success(JobSuccess {
                    output_file_name,
                    output_path,
                })
            }
            Err(e) => {
                error!("{} failed: {}", description, e);
                let failure = JobFailure::from(&e);
                self.emit(JobEvent::Failed {
                    job_id,
                    message: failure.message.clone(),
                });
                JobOutcome::Failure(failure)
            }
        }
    }

    fn emit(&self, event: JobEvent) {
        events::emit(self.events.as_ref(), event);
    }
}

/// Best effort: a leftover manifest never turns a job result into a failure.
async fn remove_artifact(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!("Error cleaning up temp file {}: {}", path.display(), e);
    }
}

use std::path::PathBuf;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Lifecycle signals of a single ffmpeg job.
///
/// Every job emits one `Started`, any number of `Progress`, and exactly one of
/// `Completed` or `Failed`. A job whose list artifact cannot be written never
/// starts and only emits `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Started {
        job_id: Uuid,
        description: String,
        command_line: String,
    },
    /// Advisory completion percentage in `0.0..=100.0`.
    Progress { job_id: Uuid, percent: f32 },
    Completed { job_id: Uuid, output_path: PathBuf },
    Failed { job_id: Uuid, message: String },
}

impl JobEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            Self::Started { job_id, .. }
            | Self::Progress { job_id, .. }
            | Self::Completed { job_id, .. }
            | Self::Failed { job_id, .. } => *job_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

pub type EventSender = mpsc::UnboundedSender<JobEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<JobEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event if anyone is listening; a dropped receiver is not an error.
pub(crate) fn emit(events: Option<&EventSender>, event: JobEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

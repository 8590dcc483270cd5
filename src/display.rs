//! Terminal progress bars driven by job events.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::events::{EventReceiver, JobEvent};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}";

/// Render events until every sender is dropped.
pub fn spawn(mut events: EventReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut bars: HashMap<Uuid, ProgressBar> = HashMap::new();
        while let Some(event) = events.recv().await {
            apply(&mut bars, event);
        }
        for (_, bar) in bars.drain() {
            bar.abandon();
        }
    })
}

fn apply(bars: &mut HashMap<Uuid, ProgressBar>, event: JobEvent) {
    match event {
        JobEvent::Started {
            job_id,
            description,
            ..
        } => {
            let bar = ProgressBar::new(100);
            bar.set_style(bar_style());
            bar.set_message(description);
            bars.insert(job_id, bar);
        }
        JobEvent::Progress { job_id, percent } => {
            if let Some(bar) = bars.get(&job_id) {
                bar.set_position(percent.clamp(0.0, 100.0) as u64);
            }
        }
        JobEvent::Completed { job_id, output_path } => {
            if let Some(bar) = bars.remove(&job_id) {
                bar.set_position(100);
                bar.finish_with_message(format!("done: {}", output_path.display()));
            }
        }
        JobEvent::Failed { job_id, message } => match bars.remove(&job_id) {
            Some(bar) => bar.abandon_with_message(message),
            // failed before the process started
            None => eprintln!("{}", message),
        },
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

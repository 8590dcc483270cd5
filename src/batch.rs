use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ClipBatchError, Result};
use crate::invocation::Invocation;
use crate::runner::{JobFailure, JobOutcome, JobRunner};

/// One successfully processed item of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub original: String,
    pub output: String,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchResult {
    Completed {
        processed_count: usize,
        results: Vec<ItemResult>,
        output_directory: PathBuf,
    },
    Failed {
        failed_item: String,
        failure: JobFailure,
        /// Items completed before the failure, in order
        partial_results: Vec<ItemResult>,
        output_directory: PathBuf,
    },
}

/// Drives a batch item by item, strictly in order, through a single runner.
pub struct BatchSequencer<'a> {
    runner: &'a JobRunner,
}

impl<'a> BatchSequencer<'a> {
    pub fn new(runner: &'a JobRunner) -> Self {
        Self { runner }
    }

    /// Run every item; stop at the first failure and keep what already succeeded.
    ///
    /// An empty item list is rejected before anything runs.
    pub async fn run_batch<F>(
        &self,
        items: &[String],
        output_directory: &Path,
        mut build_invocation: F,
    ) -> Result<BatchResult>
    where
        F: FnMut(&str) -> Result<Invocation>,
    {
        if items.is_empty() {
            return Err(ClipBatchError::invalid_request("No videos selected"));
        }

        let total = items.len();
        let mut results = Vec::with_capacity(total);

        for (index, item) in items.iter().enumerate() {
            info!("Processing {}/{}: {}", index + 1, total, item);

            let outcome = match build_invocation(item) {
                Ok(invocation) => self.runner.run(invocation).await,
                Err(e) => JobOutcome::Failure(JobFailure::from(&e)),
            };

            match outcome {
                JobOutcome::Success(success) => results.push(ItemResult {
                    original: item.clone(),
                    output: success.output_file_name,
                    output_path: success.output_path,
                }),
                JobOutcome::Failure(failure) => {
                    warn!(
                        "Stopping batch at {}/{} ({}): {}",
                        index + 1,
                        total,
                        item,
                        failure.message
                    );
                    return Ok(BatchResult::Failed {
                        failed_item: item.clone(),
                        failure,
                        partial_results: results,
                        output_directory: output_directory.to_path_buf(),
                    });
                }
            }
        }

        info!("Batch finished: {} videos processed", results.len());
        Ok(BatchResult::Completed {
            processed_count: results.len(),
            results,
            output_directory: output_directory.to_path_buf(),
        })
    }
}

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::batch::{BatchResult, ItemResult};
use crate::error::{ClipBatchError, ErrorKind};
use crate::messages::MessageCatalog;
use crate::request::OperationKind;
use crate::runner::{JobFailure, JobOutcome};

/// External-facing response for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransformResponse {
    Job(JobResponse),
    Batch(BatchResponse),
    Failure(FailureResponse),
}

impl TransformResponse {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure(_))
    }
}

/// Single-output operations (merge, trim)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub message: String,
    pub output_file_name: String,
    pub output_path: PathBuf,
    pub output_directory: PathBuf,
}

/// Per-item operations (speedup, timelapse)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub message: String,
    pub processed_count: usize,
    pub results: Vec<ItemResult>,
    pub output_directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub error_kind: ErrorKind,
    /// Localized headline
    pub error_message: String,
    /// What went wrong, as reported by the failing stage
    pub details: String,
    /// Raw diagnostic output (ffmpeg stderr, system error text)
    pub diagnostic_detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_results: Option<Vec<ItemResult>>,
}

pub struct ResultReporter<'a> {
    messages: &'a MessageCatalog,
    operation: OperationKind,
}

impl<'a> ResultReporter<'a> {
    pub fn new(messages: &'a MessageCatalog, operation: OperationKind) -> Self {
        Self {
            messages,
            operation,
        }
    }

    pub fn job(&self, outcome: JobOutcome, output_directory: &Path) -> TransformResponse {
        match outcome {
            JobOutcome::Success(success) => TransformResponse::Job(JobResponse {
                message: self.messages.success(self.operation),
                output_file_name: success.output_file_name,
                output_path: success.output_path,
                output_directory: output_directory.to_path_buf(),
            }),
            JobOutcome::Failure(failure) => self.failure(failure, None, None),
        }
    }

    pub fn batch(&self, result: BatchResult) -> TransformResponse {
        match result {
            BatchResult::Completed {
                processed_count,
                results,
                output_directory,
            } => TransformResponse::Batch(BatchResponse {
                message: self.messages.success(self.operation),
                processed_count,
                results,
                output_directory,
            }),
            BatchResult::Failed {
                failed_item,
                failure,
                partial_results,
                ..
            } => self.failure(failure, Some(failed_item), Some(partial_results)),
        }
    }

    /// Response for a request that failed before or outside job execution
    pub fn rejected(&self, error: &ClipBatchError) -> TransformResponse {
        let partial_results = self.operation.is_batch().then(Vec::new);
        self.failure(JobFailure::from(error), None, partial_results)
    }

    /// Response for input that could not be parsed into a request at all.
    /// The operation is used when it could still be read from the input.
    pub fn malformed(
        messages: &MessageCatalog,
        operation: Option<OperationKind>,
        error: &ClipBatchError,
    ) -> TransformResponse {
        match operation {
            Some(operation) => ResultReporter::new(messages, operation).rejected(error),
            None => {
                let failure = JobFailure::from(error);
                TransformResponse::Failure(FailureResponse {
                    error_kind: failure.kind,
                    error_message: messages.invalid_request(),
                    details: failure.message,
                    diagnostic_detail: failure.diagnostic,
                    failed_item: None,
                    partial_results: None,
                })
            }
        }
    }

    fn failure(
        &self,
        failure: JobFailure,
        failed_item: Option<String>,
        partial_results: Option<Vec<ItemResult>>,
    ) -> TransformResponse {
        TransformResponse::Failure(FailureResponse {
            error_kind: failure.kind,
            error_message: self.messages.failure(failure.kind, self.operation),
            details: failure.message,
            diagnostic_detail: failure.diagnostic,
            failed_item,
            partial_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::JobSuccess;
    use serde_json::json;

    #[test]
    fn test_job_success_shape() {
        let messages = MessageCatalog::new();
        let reporter = ResultReporter::new(&messages, OperationKind::Merge);
        let response = reporter.job(
            JobOutcome::Success(JobSuccess {
                output_file_name: "merged-1.mp4".to_string(),
                output_path: PathBuf::from("/v/merged_output/merged-1.mp4"),
            }),
            Path::new("/v/merged_output"),
        );

        assert!(response.is_success());
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "message": "Merge successful",
                "outputFileName": "merged-1.mp4",
                "outputPath": "/v/merged_output/merged-1.mp4",
                "outputDirectory": "/v/merged_output",
            })
        );
    }

    #[test]
    fn test_batch_failure_carries_partial_results() {
        let messages = MessageCatalog::new();
        let reporter = ResultReporter::new(&messages, OperationKind::Speedup);
        let done = ItemResult {
            original: "a.mp4".to_string(),
            output: "2x-1-a.mp4".to_string(),
            output_path: PathBuf::from("/v/out/2x-1-a.mp4"),
        };
        let response = reporter.batch(BatchResult::Failed {
            failed_item: "b.mp4".to_string(),
            failure: JobFailure {
                kind: ErrorKind::ToolExecutionFailure,
                message: "Speed up b.mp4 by 2x failed: ffmpeg ended with exit code 1".to_string(),
                diagnostic: "moov atom not found".to_string(),
            },
            partial_results: vec![done],
            output_directory: PathBuf::from("/v/out"),
        });

        assert!(!response.is_success());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["errorKind"], "tool_execution_failure");
        assert_eq!(value["errorMessage"], "Speed change failed");
        assert_eq!(value["diagnosticDetail"], "moov atom not found");
        assert_eq!(value["failedItem"], "b.mp4");
        assert_eq!(value["partialResults"][0]["original"], "a.mp4");
        assert_eq!(value["partialResults"][0]["outputPath"], "/v/out/2x-1-a.mp4");
    }

    #[test]
    fn test_malformed_request() {
        let messages = MessageCatalog::new();
        let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ClipBatchError::from(parse_error);

        let response = ResultReporter::malformed(&messages, None, &err);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["errorKind"], "invalid_request");
        assert_eq!(value["errorMessage"], "The request is invalid");
        assert!(value.get("partialResults").is_none());

        let response = ResultReporter::malformed(&messages, Some(OperationKind::Timelapse), &err);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["partialResults"], json!([]));
    }

    #[test]
    fn test_rejected_request() {
        let messages = MessageCatalog::new();
        let err = ClipBatchError::invalid_request("Invalid speed factor 3. Allowed: 2, 4, 8");

        let batch = ResultReporter::new(&messages, OperationKind::Speedup).rejected(&err);
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["errorKind"], "invalid_request");
        assert_eq!(value["partialResults"], json!([]));
        assert!(value["details"].as_str().unwrap().contains("speed factor 3"));

        let single = ResultReporter::new(&messages, OperationKind::Trim).rejected(&err);
        let value = serde_json::to_value(&single).unwrap();
        assert!(value.get("partialResults").is_none());
    }
}
